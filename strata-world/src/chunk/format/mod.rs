//! One codec per on-disk chunk generation.
//!
//! Generations are totally ordered by the first data version using them. Every codec
//! implements [`ChunkCodec`], whose default methods delegate to the shared functions in
//! [`base`] so a generation only overrides the parts of the layout that changed.

use std::ops::RangeInclusive;

use enum_dispatch::enum_dispatch;
use strata_nbt::NbtCompound;

use crate::data_version::{
    DataVersion, ANVIL, EXTENDED_HEIGHT, FLATTENING, MCREGION, PALETTED_BIOMES,
};

use super::{
    palette::{BiomePalette, BlockPalette},
    Chunk, ChunkParsingError, ChunkSerializingError, Section,
};

pub mod alpha;
pub mod base;
pub mod entities;
pub mod flattened;
pub mod legacy;
pub mod modern;

pub use flattened::Flattened;
pub use legacy::{AnvilNumeric, McRegion};
pub use modern::{ExtendedHeight, PalettedBiomes};

#[enum_dispatch]
pub trait ChunkCodec {
    /// First data version written in this layout.
    fn min_version(&self) -> DataVersion;

    /// Section indices this layout can store.
    fn section_range(&self) -> RangeInclusive<i8>;

    /// Whether chunk data lives in a `Level` compound under the root.
    fn nests_in_level(&self) -> bool {
        true
    }

    fn sections_key(&self) -> &'static str {
        "Sections"
    }

    fn block_entities_key(&self) -> &'static str {
        "TileEntities"
    }

    fn entities_key(&self) -> &'static str {
        "Entities"
    }

    /// Sections without light arrays get zero-filled ones on write.
    fn requires_light(&self) -> bool {
        false
    }

    /// Keeps air sections carrying only light just below and above the block range, written
    /// with their light and nothing else.
    fn writes_light_only_sections(&self) -> bool {
        false
    }

    fn read_chunk(
        &self,
        root: &NbtCompound,
        version: DataVersion,
    ) -> Result<Chunk, ChunkParsingError> {
        base::read_chunk(self, root, version)
    }

    fn write_chunk(
        &self,
        chunk: &Chunk,
        version: DataVersion,
    ) -> Result<NbtCompound, ChunkSerializingError> {
        base::write_chunk(self, chunk, version)
    }

    fn read_sections(
        &self,
        level: &NbtCompound,
        chunk: &mut Chunk,
        version: DataVersion,
    ) -> Result<(), ChunkParsingError> {
        base::read_sections(self, level, chunk, version)
    }

    fn write_sections(
        &self,
        chunk: &Chunk,
        level: &mut NbtCompound,
        version: DataVersion,
    ) -> Result<(), ChunkSerializingError> {
        base::write_sections(self, chunk, level, version)
    }

    fn read_section_blocks(
        &self,
        section: &NbtCompound,
        version: DataVersion,
    ) -> Result<BlockPalette, ChunkParsingError>;

    fn write_section_blocks(
        &self,
        section: &Section,
        nbt: &mut NbtCompound,
        version: DataVersion,
    ) -> Result<(), ChunkSerializingError>;

    fn read_section_biomes(
        &self,
        _section: &NbtCompound,
        _version: DataVersion,
    ) -> Result<Option<BiomePalette>, ChunkParsingError> {
        Ok(None)
    }

    fn write_section_biomes(
        &self,
        _chunk: &Chunk,
        _section_y: i8,
        _nbt: &mut NbtCompound,
        _version: DataVersion,
    ) -> Result<(), ChunkSerializingError> {
        Ok(())
    }

    /// Biomes stored for the whole chunk rather than per section.
    fn read_biomes(
        &self,
        _level: &NbtCompound,
        _chunk: &mut Chunk,
        _version: DataVersion,
    ) -> Result<(), ChunkParsingError> {
        Ok(())
    }

    fn write_biomes(
        &self,
        _chunk: &Chunk,
        _level: &mut NbtCompound,
        _version: DataVersion,
    ) -> Result<(), ChunkSerializingError> {
        Ok(())
    }

    fn read_block_entities(&self, level: &NbtCompound, chunk: &mut Chunk) {
        base::read_block_entities(self, level, chunk)
    }

    fn write_block_entities(
        &self,
        chunk: &Chunk,
        level: &mut NbtCompound,
    ) -> Result<(), ChunkSerializingError> {
        base::write_block_entities(self, chunk, level)
    }

    fn read_entities(&self, level: &NbtCompound, chunk: &mut Chunk) {
        base::read_entities(self, level, chunk)
    }

    fn write_entities(
        &self,
        chunk: &Chunk,
        level: &mut NbtCompound,
        version: DataVersion,
    ) -> Result<(), ChunkSerializingError> {
        base::write_entities(self, chunk, level, version)
    }

    fn read_bookkeeping(&self, level: &NbtCompound, chunk: &mut Chunk, version: DataVersion) {
        base::read_bookkeeping(level, chunk, version)
    }

    fn write_bookkeeping(&self, chunk: &Chunk, level: &mut NbtCompound, version: DataVersion) {
        base::write_bookkeeping(chunk, level, version)
    }

    /// Fields the game expects but that are recomputed on load, like height maps.
    fn write_placeholders(&self, _chunk: &Chunk, _level: &mut NbtCompound, _version: DataVersion) {
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[enum_dispatch(ChunkCodec)]
pub enum ChunkFormat {
    McRegion(McRegion),
    AnvilNumeric(AnvilNumeric),
    Flattened(Flattened),
    PalettedBiomes(PalettedBiomes),
    ExtendedHeight(ExtendedHeight),
}

impl ChunkFormat {
    /// The newest generation whose first version is not after `version`.
    pub fn for_version(version: DataVersion) -> Result<Self, ChunkParsingError> {
        Ok(match version {
            v if v >= EXTENDED_HEIGHT => ExtendedHeight.into(),
            v if v >= PALETTED_BIOMES => PalettedBiomes.into(),
            v if v >= FLATTENING => Flattened.into(),
            v if v >= ANVIL => AnvilNumeric.into(),
            MCREGION => McRegion.into(),
            _ => return Err(ChunkParsingError::UnsupportedVersion(version)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_version::{BIOMES_3D, DATA_VERSION_TAG, LATEST};

    #[test]
    fn selects_latest_generation_not_after_version() {
        let cases = [
            (MCREGION, ChunkFormat::McRegion(McRegion)),
            (ANVIL, ChunkFormat::AnvilNumeric(AnvilNumeric)),
            (DATA_VERSION_TAG, ChunkFormat::AnvilNumeric(AnvilNumeric)),
            (FLATTENING - 1, ChunkFormat::AnvilNumeric(AnvilNumeric)),
            (FLATTENING, ChunkFormat::Flattened(Flattened)),
            (BIOMES_3D, ChunkFormat::Flattened(Flattened)),
            (PALETTED_BIOMES, ChunkFormat::PalettedBiomes(PalettedBiomes)),
            (EXTENDED_HEIGHT - 1, ChunkFormat::PalettedBiomes(PalettedBiomes)),
            (EXTENDED_HEIGHT, ChunkFormat::ExtendedHeight(ExtendedHeight)),
            (LATEST + 100, ChunkFormat::ExtendedHeight(ExtendedHeight)),
        ];
        for (version, expected) in cases {
            let format = ChunkFormat::for_version(version).unwrap();
            assert_eq!(format, expected, "version {version}");
            assert!(format.min_version() <= version);
        }
        assert!(matches!(
            ChunkFormat::for_version(-2),
            Err(ChunkParsingError::UnsupportedVersion(-2))
        ));
    }
}
