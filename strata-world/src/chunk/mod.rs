use std::collections::BTreeMap;

use bytes::Bytes;
use strata_nbt::{Nbt, NbtCompound};
use strata_util::{
    math::{position::BlockPos, vector2::Vector2},
    packing::PackingError,
};
use thiserror::Error;

use crate::{
    biome::Biome,
    block::{entities::BlockEntity, BlockState},
    data_version::{DataVersion, BIOMES_3D, MCREGION, PALETTED_BIOMES},
    entity::Entity,
};

use format::{ChunkCodec, ChunkFormat};
use palette::{BiomePalette, BlockPalette, PaletteError};

pub mod format;
pub mod palette;
pub mod region;
pub mod status;

pub use format::entities::ChunkEntityData;
pub use status::ChunkStatus;

pub const CHUNK_WIDTH: usize = 16;
pub const CHUNK_AREA: usize = CHUNK_WIDTH * CHUNK_WIDTH;
pub const SUBCHUNK_VOLUME: usize = CHUNK_AREA * 16;
/// Number of 4x4x4 biome cells in a chunk using the 3D biome array.
pub const BIOME_CELLS: usize = 1024;

#[derive(Error, Debug)]
pub enum ChunkReadingError {
    #[error("Io error: {0}")]
    IoError(std::io::ErrorKind),
    #[error("Invalid header")]
    InvalidHeader,
    #[error("Invalid region file name {0:?}")]
    InvalidFileName(String),
    #[error("Slot {index} is corrupt: {reason}")]
    SlotCorruption { index: usize, reason: String },
    #[error("Compression error {0}")]
    Compression(CompressionError),
    #[error("Tried to read chunk which does not exist")]
    ChunkNotExist,
    #[error("Failed to parse Chunk from bytes: {0}")]
    ParsingError(ChunkParsingError),
    #[error("Reading was cancelled")]
    Cancelled,
}

#[derive(Error, Debug)]
pub enum ChunkWritingError {
    #[error("Io error: {0}")]
    IoError(std::io::ErrorKind),
    #[error("Compression error {0}")]
    Compression(CompressionError),
    #[error("Chunk serializing error: {0}")]
    ChunkSerializingError(ChunkSerializingError),
    #[error("Chunk in slot {index} needs {sectors} sectors, at most 255 fit")]
    TooLarge { index: usize, sectors: usize },
    #[error("Chunk {chunk} does not belong to region {region}")]
    WrongRegion {
        chunk: Vector2<i32>,
        region: Vector2<i32>,
    },
    #[error("Writing was cancelled")]
    Cancelled,
}

#[derive(Error, Debug)]
pub enum ChunkParsingError {
    #[error("Data version {0} has no chunk format")]
    UnsupportedVersion(DataVersion),
    #[error("Chunk has no DataVersion and no version hint was given")]
    MissingVersion,
    #[error("Malformed NBT: {0}")]
    Nbt(#[from] strata_nbt::Error),
    #[error("Malformed packed array: {0}")]
    Packing(#[from] PackingError),
    #[error("Malformed palette: {0}")]
    Palette(#[from] PaletteError),
    #[error("Error deserializing chunk: {0}")]
    ErrorDeserializingChunk(String),
}

#[derive(Error, Debug)]
pub enum ChunkSerializingError {
    #[error("Data version {0} has no chunk format")]
    UnsupportedVersion(DataVersion),
    #[error("Error serializing chunk: {0}")]
    ErrorSerializingChunk(#[from] strata_nbt::Error),
    #[error("Error packing indices: {0}")]
    Packing(#[from] PackingError),
}

#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("Compression scheme {0} not recognised")]
    UnknownCompression(u8),
    #[error("Error while working with zlib compression: {0}")]
    ZlibError(std::io::Error),
    #[error("Error while working with Gzip compression: {0}")]
    GZipError(std::io::Error),
}

/// A 16 block tall slice of a chunk.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Section {
    pub block_states: BlockPalette,
    /// Only present in formats with per-section biomes.
    pub biomes: Option<BiomePalette>,
    /// Nibble arrays, kept exactly as read.
    pub block_light: Option<Box<[u8]>>,
    pub sky_light: Option<Box<[u8]>>,
}

impl Section {
    pub fn with_biomes() -> Self {
        Self {
            biomes: Some(BiomePalette::new()),
            ..Default::default()
        }
    }

    pub fn get_block(&self, x: usize, y: usize, z: usize) -> &BlockState {
        self.block_states.get(x, y, z)
    }

    pub fn set_block(&mut self, x: usize, y: usize, z: usize, state: BlockState) {
        self.block_states.set(x, y, z, state);
    }

    /// True if the section only contains air.
    pub fn is_air(&self) -> bool {
        self.block_states.all(BlockState::is_air)
    }

    /// An air section with light but no biomes, like the ones bordering a chunk vertically.
    pub fn is_light_only(&self) -> bool {
        self.biomes.is_none()
            && (self.block_light.is_some() || self.sky_light.is_some())
            && self.is_air()
    }
}

/// Where a chunk keeps its biomes. The layout follows the version the chunk was read as.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkBiomes {
    Absent,
    /// One biome per column, indexed `z * 16 + x`.
    Columns(Box<[Biome]>),
    /// One biome per 4x4x4 cell of a 256 block tall chunk.
    Cells(Box<[Biome]>),
    /// Stored in each section.
    Sectioned,
}

impl ChunkBiomes {
    pub fn for_version(version: DataVersion) -> Self {
        match version {
            MCREGION => Self::Absent,
            v if v >= PALETTED_BIOMES => Self::Sectioned,
            v if v >= BIOMES_3D => Self::Cells(vec![Biome::default(); BIOME_CELLS].into()),
            _ => Self::Columns(vec![Biome::default(); CHUNK_AREA].into()),
        }
    }

    #[inline]
    pub const fn column_index(x: usize, z: usize) -> usize {
        z * CHUNK_WIDTH + x
    }

    #[inline]
    pub const fn cell_index(x: usize, y: i32, z: usize) -> usize {
        ((((y >> 2) & 63) as usize) << 4) | ((z >> 2) << 2) | (x >> 2)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Chunk coordinates, not block coordinates.
    pub position: Vector2<i32>,
    /// Version the chunk was read as, and is written as by default.
    pub data_version: DataVersion,
    pub status: ChunkStatus,
    pub sections: BTreeMap<i8, Section>,
    pub biomes: ChunkBiomes,
    pub block_entities: BTreeMap<BlockPos, BlockEntity>,
    pub entities: Vec<Entity>,
    pub inhabited_time: i64,
    pub last_update: i64,
    pub dirty: bool,
}

impl Chunk {
    pub fn new(position: Vector2<i32>, data_version: DataVersion) -> Self {
        Self {
            position,
            data_version,
            status: ChunkStatus::Empty,
            sections: BTreeMap::new(),
            biomes: ChunkBiomes::for_version(data_version),
            block_entities: BTreeMap::new(),
            entities: Vec::new(),
            inhabited_time: 0,
            last_update: 0,
            dirty: true,
        }
    }

    fn section_y(y: i32) -> Option<i8> {
        i8::try_from(y >> 4).ok()
    }

    /// `x` and `z` are relative to the chunk, `y` is absolute.
    pub fn get_block(&self, x: usize, y: i32, z: usize) -> Option<&BlockState> {
        let section = self.sections.get(&Self::section_y(y)?)?;
        Some(section.get_block(x, (y & 15) as usize, z))
    }

    /// Creates the section if it does not exist yet.
    pub fn set_block(&mut self, x: usize, y: i32, z: usize, state: BlockState) {
        let Some(section) = self.section_mut(y) else {
            log::warn!("Block height {y} is outside any section, ignoring");
            return;
        };
        section.set_block(x, (y & 15) as usize, z, state);
        self.dirty = true;
    }

    fn section_mut(&mut self, y: i32) -> Option<&mut Section> {
        let section_y = Self::section_y(y)?;
        let sectioned = matches!(self.biomes, ChunkBiomes::Sectioned);
        Some(self.sections.entry(section_y).or_insert_with(|| {
            if sectioned {
                Section::with_biomes()
            } else {
                Section::default()
            }
        }))
    }

    pub fn get_biome(&self, x: usize, y: i32, z: usize) -> Option<&Biome> {
        match &self.biomes {
            ChunkBiomes::Absent => None,
            ChunkBiomes::Columns(columns) => columns.get(ChunkBiomes::column_index(x, z)),
            ChunkBiomes::Cells(cells) => cells.get(ChunkBiomes::cell_index(x, y, z)),
            ChunkBiomes::Sectioned => {
                let section = self.sections.get(&Self::section_y(y)?)?;
                section
                    .biomes
                    .as_ref()
                    .map(|biomes| biomes.get(x >> 2, ((y & 15) >> 2) as usize, z >> 2))
            }
        }
    }

    /// Columns ignore `y`. A chunk without biomes starts storing columns.
    pub fn set_biome(&mut self, x: usize, y: i32, z: usize, biome: Biome) {
        if matches!(self.biomes, ChunkBiomes::Sectioned) {
            let Some(section) = self.section_mut(y) else {
                log::warn!("Biome height {y} is outside any section, ignoring");
                return;
            };
            section.biomes.get_or_insert_with(BiomePalette::new).set(
                x >> 2,
                ((y & 15) >> 2) as usize,
                z >> 2,
                biome,
            );
            self.dirty = true;
            return;
        }

        if matches!(self.biomes, ChunkBiomes::Absent) {
            self.biomes = ChunkBiomes::Columns(vec![Biome::default(); CHUNK_AREA].into());
        }
        match &mut self.biomes {
            ChunkBiomes::Columns(columns) => columns[ChunkBiomes::column_index(x, z)] = biome,
            ChunkBiomes::Cells(cells) => cells[ChunkBiomes::cell_index(x, y, z)] = biome,
            // Both handled above
            ChunkBiomes::Absent | ChunkBiomes::Sectioned => return,
        }
        self.dirty = true;
    }

    pub fn add_block_entity(&mut self, block_entity: BlockEntity) {
        self.block_entities
            .insert(block_entity.position, block_entity);
        self.dirty = true;
    }

    /// Parses a chunk. An embedded `DataVersion` wins over the hint.
    pub fn from_nbt(nbt: &NbtCompound, hint: Option<DataVersion>) -> Result<Self, ChunkParsingError> {
        let version = nbt
            .get_int("DataVersion")
            .or(hint)
            .ok_or(ChunkParsingError::MissingVersion)?;
        ChunkFormat::for_version(version)?.read_chunk(nbt, version)
    }

    /// Parses uncompressed NBT bytes.
    pub fn from_bytes(bytes: &[u8], hint: Option<DataVersion>) -> Result<Self, ChunkParsingError> {
        let nbt = Nbt::read_from_slice(bytes)?;
        Self::from_nbt(&nbt.root_tag, hint)
    }

    pub fn to_nbt(&self) -> Result<NbtCompound, ChunkSerializingError> {
        self.to_nbt_as(self.data_version)
    }

    /// Writes the chunk in the layout of another version.
    pub fn to_nbt_as(&self, version: DataVersion) -> Result<NbtCompound, ChunkSerializingError> {
        let format = ChunkFormat::for_version(version)
            .map_err(|_| ChunkSerializingError::UnsupportedVersion(version))?;
        format.write_chunk(self, version)
    }

    pub fn to_bytes(&self) -> Result<Bytes, ChunkSerializingError> {
        Ok(Nbt::new(String::new(), self.to_nbt()?).write()?)
    }
}

/// Something stored in a region slot.
pub trait ChunkPayload: Sized + Send + Sync {
    fn parse(nbt: &NbtCompound, hint: Option<DataVersion>) -> Result<Self, ChunkParsingError>;

    fn serialize(&self) -> Result<NbtCompound, ChunkSerializingError>;

    fn position(&self) -> Vector2<i32>;
}

impl ChunkPayload for Chunk {
    fn parse(nbt: &NbtCompound, hint: Option<DataVersion>) -> Result<Self, ChunkParsingError> {
        Chunk::from_nbt(nbt, hint)
    }

    fn serialize(&self) -> Result<NbtCompound, ChunkSerializingError> {
        self.to_nbt()
    }

    fn position(&self) -> Vector2<i32> {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_version::{FLATTENING, LATEST};

    #[test]
    fn set_block_creates_sections() {
        let mut chunk = Chunk::new(Vector2::new(0, 0), LATEST);
        assert_eq!(chunk.get_block(0, -60, 0), None);
        chunk.set_block(1, -60, 2, BlockState::new("minecraft:deepslate"));
        assert_eq!(
            chunk.get_block(1, -60, 2),
            Some(&BlockState::new("minecraft:deepslate"))
        );
        assert!(chunk.get_block(0, -60, 0).unwrap().is_air());
        assert!(chunk.sections.contains_key(&-4));
        assert!(chunk.sections[&-4].biomes.is_some());
    }

    #[test]
    fn biome_layouts() {
        let desert = Biome::new("minecraft:desert");

        let mut columns = Chunk::new(Vector2::new(0, 0), FLATTENING);
        columns.set_biome(3, 0, 5, desert.clone());
        assert_eq!(columns.get_biome(3, 200, 5), Some(&desert));

        let mut cells = Chunk::new(Vector2::new(0, 0), BIOMES_3D);
        cells.set_biome(4, 64, 8, desert.clone());
        assert_eq!(cells.get_biome(7, 67, 11), Some(&desert));
        assert_eq!(cells.get_biome(7, 68, 11), Some(&Biome::default()));
        assert_eq!(ChunkBiomes::cell_index(4, 64, 8), (16 << 4) | (2 << 2) | 1);

        let mut sectioned = Chunk::new(Vector2::new(0, 0), LATEST);
        assert_eq!(sectioned.get_biome(0, 0, 0), None);
        sectioned.set_biome(15, -1, 15, desert.clone());
        assert_eq!(sectioned.get_biome(12, -4, 12), Some(&desert));
        assert_eq!(sectioned.get_biome(12, -5, 12), Some(&Biome::default()));

        let mut absent = Chunk::new(Vector2::new(0, 0), MCREGION);
        assert_eq!(absent.get_biome(0, 0, 0), None);
        absent.set_biome(0, 0, 0, desert.clone());
        assert_eq!(absent.get_biome(0, 0, 0), Some(&desert));
    }

    #[test]
    fn missing_version_without_hint() {
        let mut nbt = NbtCompound::new();
        nbt.put_compound("Level", NbtCompound::new());
        assert!(matches!(
            Chunk::from_nbt(&nbt, None),
            Err(ChunkParsingError::MissingVersion)
        ));
        assert!(matches!(
            Chunk::from_nbt(&nbt, Some(-7)),
            Err(ChunkParsingError::UnsupportedVersion(-7))
        ));
    }
}
