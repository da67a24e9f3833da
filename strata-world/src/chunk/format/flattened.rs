use std::ops::RangeInclusive;

use strata_nbt::NbtCompound;

use crate::{
    biome::Biome,
    block::legacy::{biome_from_id, biome_to_id},
    chunk::{
        palette::{BlockPalette, BLOCK_DISK_MIN_BITS},
        Chunk, ChunkBiomes, ChunkParsingError, ChunkSerializingError, Section, BIOME_CELLS,
        CHUNK_AREA, CHUNK_WIDTH,
    },
    data_version::{block_packing, has_3d_biomes, DataVersion, FLATTENING},
};

use super::{base, ChunkCodec};

/// Namespaced block palettes with numeric biomes, from 17w47a until biomes moved into
/// the sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flattened;

impl ChunkCodec for Flattened {
    fn min_version(&self) -> DataVersion {
        FLATTENING
    }

    fn section_range(&self) -> RangeInclusive<i8> {
        0..=15
    }

    fn writes_light_only_sections(&self) -> bool {
        true
    }

    fn read_section_blocks(
        &self,
        section: &NbtCompound,
        version: DataVersion,
    ) -> Result<BlockPalette, ChunkParsingError> {
        let Some(palette) = section.get_list("Palette") else {
            // Light only sections
            return Ok(BlockPalette::new());
        };
        let palette = base::block_palette_from_nbt(palette)?;
        Ok(BlockPalette::from_disk(
            palette,
            section.get_long_array("BlockStates"),
            BLOCK_DISK_MIN_BITS,
            block_packing(version),
        )?)
    }

    fn write_section_blocks(
        &self,
        section: &Section,
        nbt: &mut NbtCompound,
        version: DataVersion,
    ) -> Result<(), ChunkSerializingError> {
        let (palette, data) = section
            .block_states
            .to_disk(BLOCK_DISK_MIN_BITS, block_packing(version))?;
        nbt.put_list("Palette", base::block_palette_to_nbt(&palette)?);
        if let Some(data) = data {
            nbt.put_long_array("BlockStates", data);
        }
        Ok(())
    }

    fn read_biomes(
        &self,
        level: &NbtCompound,
        chunk: &mut Chunk,
        _version: DataVersion,
    ) -> Result<(), ChunkParsingError> {
        let Some(ids) = level.get_int_array("Biomes") else {
            return Ok(());
        };
        let biomes = ids.iter().map(|id| biome_from_id(*id)).collect();
        match ids.len() {
            CHUNK_AREA => chunk.biomes = ChunkBiomes::Columns(biomes),
            BIOME_CELLS => chunk.biomes = ChunkBiomes::Cells(biomes),
            len => log::warn!(
                "Chunk {} has {len} biomes, expected {CHUNK_AREA} or {BIOME_CELLS}. Ignoring them",
                chunk.position
            ),
        }
        Ok(())
    }

    fn write_biomes(
        &self,
        chunk: &Chunk,
        level: &mut NbtCompound,
        version: DataVersion,
    ) -> Result<(), ChunkSerializingError> {
        if matches!(chunk.biomes, ChunkBiomes::Absent) {
            return Ok(());
        }
        let sample = |x: usize, y: i32, z: usize| {
            chunk
                .get_biome(x, y, z)
                .map_or_else(|| biome_to_id(&Biome::default()), biome_to_id)
        };
        let ids: Vec<i32> = if has_3d_biomes(version) {
            (0..BIOME_CELLS)
                .map(|i| sample((i & 3) << 2, ((i >> 4) << 2) as i32, ((i >> 2) & 3) << 2))
                .collect()
        } else {
            (0..CHUNK_AREA)
                .map(|i| sample(i % CHUNK_WIDTH, 64, i / CHUNK_WIDTH))
                .collect()
        };
        level.put_int_array("Biomes", ids);
        Ok(())
    }

    fn write_placeholders(&self, _chunk: &Chunk, level: &mut NbtCompound, _version: DataVersion) {
        level.put_compound("Heightmaps", NbtCompound::new());
        let mut structures = NbtCompound::new();
        structures.put_compound("References", NbtCompound::new());
        structures.put_compound("Starts", NbtCompound::new());
        level.put_compound("Structures", structures);
    }
}

#[cfg(test)]
mod tests {
    use strata_util::math::vector2::Vector2;

    use super::*;
    use crate::{
        block::BlockState,
        chunk::ChunkStatus,
        data_version::{ALIGNED_PACKING, BIOMES_3D},
    };

    fn sample_chunk(version: DataVersion) -> Chunk {
        let mut chunk = Chunk::new(Vector2::new(-1, 7), version);
        for x in 0..16 {
            chunk.set_block(x, 3, 0, BlockState::new(format!("minecraft:test_{x}")));
        }
        chunk.set_block(4, 200, 4, BlockState::new("minecraft:glass"));
        chunk.set_biome(8, 100, 8, Biome::new("minecraft:desert"));
        chunk.status = ChunkStatus::Features;
        chunk.inhabited_time = 99;
        chunk
    }

    #[test]
    fn round_trip_every_packing_cutover() {
        for version in [FLATTENING, BIOMES_3D, ALIGNED_PACKING] {
            let chunk = sample_chunk(version);
            let nbt = chunk.to_nbt().unwrap();
            assert_eq!(nbt.get_int("DataVersion"), Some(version));

            let mut read = Chunk::from_nbt(&nbt, None).unwrap();
            assert!(!read.dirty);
            read.dirty = true;
            // Freshly created sections carry no light and none is written
            assert_eq!(read, chunk, "version {version}");
        }
    }

    #[test]
    fn single_entry_sections_omit_indices() {
        let mut chunk = Chunk::new(Vector2::new(0, 0), FLATTENING);
        chunk.set_block(0, 16, 0, BlockState::air());
        let nbt = chunk.to_nbt().unwrap();
        let section = nbt
            .get_compound("Level")
            .and_then(|level| level.get_list("Sections"))
            .and_then(|sections| sections.get(0))
            .and_then(|tag| tag.extract_compound())
            .unwrap();
        assert_eq!(section.get_list("Palette").map(|p| p.len()), Some(1));
        assert!(!section.contains_key("BlockStates"));
        assert!(!section.contains_key("Blocks"));
    }

    #[test]
    fn biome_arrays_follow_version() {
        let columns = sample_chunk(FLATTENING).to_nbt().unwrap();
        let cells = sample_chunk(BIOMES_3D).to_nbt().unwrap();
        let len = |nbt: &NbtCompound| {
            nbt.get_compound("Level")
                .and_then(|level| level.get_int_array("Biomes"))
                .map(|biomes| biomes.len())
        };
        assert_eq!(len(&columns), Some(CHUNK_AREA));
        assert_eq!(len(&cells), Some(BIOME_CELLS));

        // Writing a column chunk as a 3D one samples the columns
        let upgraded = sample_chunk(FLATTENING).to_nbt_as(BIOMES_3D).unwrap();
        let read = Chunk::from_nbt(&upgraded, None).unwrap();
        assert_eq!(read.get_biome(8, 0, 8), Some(&Biome::new("minecraft:desert")));
        assert_eq!(read.get_biome(0, 0, 0), Some(&Biome::default()));
    }

    #[test]
    fn status_and_placeholders() {
        let nbt = sample_chunk(FLATTENING).to_nbt().unwrap();
        let level = nbt.get_compound("Level").unwrap();
        assert_eq!(level.get_string("Status").map(String::as_str), Some("decorated"));
        assert!(level.get_compound("Heightmaps").is_some());
        assert!(level
            .get_compound("Structures")
            .is_some_and(|structures| structures.contains_key("Starts")));
        assert_eq!(level.get_long("InhabitedTime"), Some(99));
    }
}
