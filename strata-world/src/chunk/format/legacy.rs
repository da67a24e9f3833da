//! The two generations storing blocks as numeric ids with a metadata nibble.

use std::{collections::HashMap, ops::RangeInclusive};

use itertools::iproduct;
use strata_nbt::NbtCompound;
use strata_util::packing::{pack_nibbles, unpack_nibbles};

use crate::{
    biome::Biome,
    block::legacy::{biome_from_id, biome_to_id, numeric_to_state, state_to_numeric, NumericId},
    chunk::{
        palette::BlockPalette, Chunk, ChunkBiomes, ChunkParsingError, ChunkSerializingError,
        Section, CHUNK_AREA, CHUNK_WIDTH, SUBCHUNK_VOLUME,
    },
    data_version::{DataVersion, ANVIL, MCREGION},
};

use super::{base, ChunkCodec};

/// McRegion chunks are a single 128 block tall column.
const COLUMN_HEIGHT: usize = 128;
const COLUMN_VOLUME: usize = CHUNK_AREA * COLUMN_HEIGHT;
/// Column biome id meaning "not generated yet".
const UNSET_BIOME: u8 = 255;

/// Flat column arrays indexed x, z, y with y varying fastest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct McRegion;

/// Sixteen sections of numeric ids, indexed y, z, x.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnvilNumeric;

impl ChunkCodec for McRegion {
    fn min_version(&self) -> DataVersion {
        MCREGION
    }

    fn section_range(&self) -> RangeInclusive<i8> {
        0..=7
    }

    fn read_sections(
        &self,
        level: &NbtCompound,
        chunk: &mut Chunk,
        version: DataVersion,
    ) -> Result<(), ChunkParsingError> {
        let Some(blocks) = level.get_byte_array("Blocks") else {
            log::debug!("Chunk {} has no blocks", chunk.position);
            return Ok(());
        };
        expect_len("Blocks", blocks, COLUMN_VOLUME)?;
        let data = optional_nibbles(level, "Data", COLUMN_VOLUME);
        let block_light = optional_nibbles(level, "BlockLight", COLUMN_VOLUME);
        let sky_light = optional_nibbles(level, "SkyLight", COLUMN_VOLUME);

        for section_y in self.section_range() {
            let base_y = section_y as usize * 16;
            let mut section_blocks = vec![0u8; SUBCHUNK_VOLUME];
            let mut section_data = vec![0u8; SUBCHUNK_VOLUME];
            let mut section_block_light = vec![0u8; SUBCHUNK_VOLUME];
            let mut section_sky_light = vec![0u8; SUBCHUNK_VOLUME];

            for (y, z, x) in iproduct!(0..16, 0..CHUNK_WIDTH, 0..CHUNK_WIDTH) {
                let column = column_index(x, base_y + y, z);
                let local = section_index(x, y, z);
                section_blocks[local] = blocks[column];
                for (source, target) in [
                    (&data, &mut section_data),
                    (&block_light, &mut section_block_light),
                    (&sky_light, &mut section_sky_light),
                ] {
                    if let Some(source) = source {
                        target[local] = source[column];
                    }
                }
            }

            // The column always stores all eight sections, only keep the used ones
            if section_blocks.iter().all(|id| *id == 0) {
                continue;
            }

            let mut nbt = NbtCompound::new();
            nbt.put_byte_array("Blocks", section_blocks);
            nbt.put_byte_array("Data", pack_nibbles(&section_data));
            let section = Section {
                block_states: self.read_section_blocks(&nbt, version)?,
                biomes: None,
                block_light: block_light
                    .is_some()
                    .then(|| pack_nibbles(&section_block_light)),
                sky_light: sky_light.is_some().then(|| pack_nibbles(&section_sky_light)),
            };
            chunk.sections.insert(section_y, section);
        }
        Ok(())
    }

    fn write_sections(
        &self,
        chunk: &Chunk,
        level: &mut NbtCompound,
        version: DataVersion,
    ) -> Result<(), ChunkSerializingError> {
        let range = self.section_range();
        let mut blocks = vec![0u8; COLUMN_VOLUME];
        let mut data = vec![0u8; COLUMN_VOLUME];
        let mut block_light = vec![0u8; COLUMN_VOLUME];
        let mut sky_light = vec![0u8; COLUMN_VOLUME];

        for (&section_y, section) in &chunk.sections {
            if !range.contains(&section_y) {
                base::warn_dropped_section(chunk, section_y, section, &range);
                continue;
            }

            let mut nbt = NbtCompound::new();
            self.write_section_blocks(section, &mut nbt, version)?;
            let section_blocks = nbt.get_byte_array("Blocks").unwrap_or_default();
            let section_data = unpack_nibbles(nbt.get_byte_array("Data").unwrap_or_default());
            let section_block_light = section.block_light.as_deref().map(unpack_nibbles);
            let section_sky_light = section.sky_light.as_deref().map(unpack_nibbles);

            let base_y = section_y as usize * 16;
            for (y, z, x) in iproduct!(0..16, 0..CHUNK_WIDTH, 0..CHUNK_WIDTH) {
                let column = column_index(x, base_y + y, z);
                let local = section_index(x, y, z);
                blocks[column] = section_blocks.get(local).copied().unwrap_or(0);
                data[column] = section_data.get(local).copied().unwrap_or(0);
                for (source, target) in [
                    (&section_block_light, &mut block_light),
                    (&section_sky_light, &mut sky_light),
                ] {
                    if let Some(source) = source {
                        target[column] = source.get(local).copied().unwrap_or(0);
                    }
                }
            }
        }

        level.put_byte_array("Blocks", blocks);
        level.put_byte_array("Data", pack_nibbles(&data));
        level.put_byte_array("BlockLight", pack_nibbles(&block_light));
        level.put_byte_array("SkyLight", pack_nibbles(&sky_light));
        Ok(())
    }

    fn read_section_blocks(
        &self,
        section: &NbtCompound,
        _version: DataVersion,
    ) -> Result<BlockPalette, ChunkParsingError> {
        read_numeric_blocks(section)
    }

    fn write_section_blocks(
        &self,
        section: &Section,
        nbt: &mut NbtCompound,
        _version: DataVersion,
    ) -> Result<(), ChunkSerializingError> {
        write_numeric_blocks(section, nbt);
        Ok(())
    }

    fn read_biomes(
        &self,
        level: &NbtCompound,
        chunk: &mut Chunk,
        _version: DataVersion,
    ) -> Result<(), ChunkParsingError> {
        read_column_biomes(level, chunk);
        Ok(())
    }

    fn write_biomes(
        &self,
        chunk: &Chunk,
        level: &mut NbtCompound,
        _version: DataVersion,
    ) -> Result<(), ChunkSerializingError> {
        write_column_biomes(chunk, level);
        Ok(())
    }

    fn write_placeholders(&self, _chunk: &Chunk, level: &mut NbtCompound, _version: DataVersion) {
        level.put_byte_array("HeightMap", vec![0u8; CHUNK_AREA]);
    }
}

impl ChunkCodec for AnvilNumeric {
    fn min_version(&self) -> DataVersion {
        ANVIL
    }

    fn section_range(&self) -> RangeInclusive<i8> {
        0..=15
    }

    fn requires_light(&self) -> bool {
        true
    }

    fn read_section_blocks(
        &self,
        section: &NbtCompound,
        _version: DataVersion,
    ) -> Result<BlockPalette, ChunkParsingError> {
        if section.contains_key("Add") {
            log::debug!("Ignoring block id extension nibbles, ids above 255 are not mapped");
        }
        read_numeric_blocks(section)
    }

    fn write_section_blocks(
        &self,
        section: &Section,
        nbt: &mut NbtCompound,
        _version: DataVersion,
    ) -> Result<(), ChunkSerializingError> {
        write_numeric_blocks(section, nbt);
        Ok(())
    }

    fn read_biomes(
        &self,
        level: &NbtCompound,
        chunk: &mut Chunk,
        _version: DataVersion,
    ) -> Result<(), ChunkParsingError> {
        read_column_biomes(level, chunk);
        Ok(())
    }

    fn write_biomes(
        &self,
        chunk: &Chunk,
        level: &mut NbtCompound,
        _version: DataVersion,
    ) -> Result<(), ChunkSerializingError> {
        write_column_biomes(chunk, level);
        Ok(())
    }

    fn write_placeholders(&self, _chunk: &Chunk, level: &mut NbtCompound, _version: DataVersion) {
        level.put_int_array("HeightMap", vec![0i32; CHUNK_AREA]);
    }
}

#[inline]
const fn column_index(x: usize, y: usize, z: usize) -> usize {
    (x << 11) | (z << 7) | y
}

#[inline]
const fn section_index(x: usize, y: usize, z: usize) -> usize {
    (y << 8) | (z << 4) | x
}

fn expect_len(key: &str, array: &[u8], len: usize) -> Result<(), ChunkParsingError> {
    if array.len() != len {
        return Err(ChunkParsingError::ErrorDeserializingChunk(format!(
            "{key} holds {} bytes instead of {len}",
            array.len()
        )));
    }
    Ok(())
}

/// Unpacked nibbles of an optional array. A wrongly sized array is ignored.
fn optional_nibbles(nbt: &NbtCompound, key: &str, count: usize) -> Option<Box<[u8]>> {
    let bytes = nbt.get_byte_array(key)?;
    if bytes.len() * 2 != count {
        log::warn!(
            "{key} holds {} bytes instead of {}, ignoring it",
            bytes.len(),
            count / 2
        );
        return None;
    }
    Some(unpack_nibbles(bytes))
}

/// Builds a palette from `Blocks` and `Data`, looking every distinct pair up once.
fn read_numeric_blocks(section: &NbtCompound) -> Result<BlockPalette, ChunkParsingError> {
    let blocks = section.try_get::<Box<[u8]>>("Blocks")?;
    expect_len("Blocks", &blocks, SUBCHUNK_VOLUME)?;
    let data = optional_nibbles(section, "Data", SUBCHUNK_VOLUME);

    let mut container = BlockPalette::new();
    let mut cache: HashMap<NumericId, usize> = HashMap::new();
    for (index, id) in blocks.iter().enumerate() {
        let meta = data.as_ref().map_or(0, |data| data[index]);
        let numeric = NumericId::new(*id, meta);
        let palette_index = *cache
            .entry(numeric)
            .or_insert_with(|| container.add(numeric_to_state(numeric)));
        container.set_index_at(index, palette_index)?;
    }
    Ok(container)
}

fn write_numeric_blocks(section: &Section, nbt: &mut NbtCompound) {
    let numerics: Vec<NumericId> = section
        .block_states
        .palette()
        .iter()
        .map(state_to_numeric)
        .collect();
    let indices = section.block_states.indices();

    let blocks: Vec<u8> = indices
        .iter()
        .map(|index| numerics[*index as usize].id)
        .collect();
    let metas: Vec<u8> = indices
        .iter()
        .map(|index| numerics[*index as usize].meta)
        .collect();
    nbt.put_byte_array("Blocks", blocks);
    nbt.put_byte_array("Data", pack_nibbles(&metas));
}

fn read_column_biomes(level: &NbtCompound, chunk: &mut Chunk) {
    let Some(ids) = level.get_byte_array("Biomes") else {
        return;
    };
    if ids.len() != CHUNK_AREA {
        log::warn!(
            "Chunk {} has {} column biomes instead of {CHUNK_AREA}, ignoring them",
            chunk.position,
            ids.len()
        );
        return;
    }
    let biomes = ids
        .iter()
        .map(|id| match *id {
            UNSET_BIOME => Biome::default(),
            id => biome_from_id(id as i32),
        })
        .collect();
    chunk.biomes = ChunkBiomes::Columns(biomes);
}

fn write_column_biomes(chunk: &Chunk, level: &mut NbtCompound) {
    if matches!(chunk.biomes, ChunkBiomes::Absent) {
        return;
    }
    let ids: Vec<u8> = (0..CHUNK_AREA)
        .map(|index| {
            let (x, z) = (index % CHUNK_WIDTH, index / CHUNK_WIDTH);
            let biome = chunk.get_biome(x, 64, z).cloned().unwrap_or_default();
            u8::try_from(biome_to_id(&biome)).unwrap_or_else(|_| {
                log::warn!("Biome {biome} has no byte sized id, using {}", Biome::default());
                biome_to_id(&Biome::default()) as u8
            })
        })
        .collect();
    level.put_byte_array("Biomes", ids);
}

#[cfg(test)]
mod tests {
    use strata_util::math::vector2::Vector2;

    use super::*;
    use crate::{block::BlockState, chunk::ChunkStatus};

    fn sample_chunk(version: DataVersion) -> Chunk {
        let mut chunk = Chunk::new(Vector2::new(3, -2), version);
        chunk.set_block(0, 0, 0, BlockState::new("minecraft:bedrock"));
        chunk.set_block(5, 70, 9, BlockState::new("minecraft:stone"));
        chunk.set_block(
            5,
            71,
            9,
            BlockState::new("minecraft:spruce_log").with_property("axis", "x"),
        );
        chunk.status = ChunkStatus::Full;
        chunk
    }

    #[test]
    fn anvil_numeric_round_trip() {
        let chunk = sample_chunk(ANVIL);
        let nbt = chunk.to_nbt().unwrap();
        let level = nbt.get_compound("Level").unwrap();
        assert!(!nbt.contains_key("DataVersion"));
        assert_eq!(level.get_bool("TerrainPopulated"), Some(true));

        let sections = level.get_list("Sections").unwrap();
        assert_eq!(sections.len(), 2);
        let first = sections.get(0).and_then(|tag| tag.extract_compound()).unwrap();
        assert_eq!(first.get_byte_array("Blocks").map(|b| b.len()), Some(4096));
        assert_eq!(first.get_byte_array("SkyLight").map(|b| b.len()), Some(2048));
        assert_eq!(first.get_byte_array("Blocks").unwrap()[0], 7);

        let read = Chunk::from_nbt(&nbt, Some(ANVIL)).unwrap();
        assert_eq!(read.get_block(5, 70, 9), Some(&BlockState::new("minecraft:stone")));
        assert_eq!(
            read.get_block(5, 71, 9).and_then(|state| state.property("axis")),
            Some("x")
        );
        assert_eq!(read.status, ChunkStatus::Full);
        assert!(!read.dirty);
    }

    #[test]
    fn stone_is_one_zero() {
        let mut section = Section::default();
        section.set_block(0, 0, 0, BlockState::new("minecraft:stone"));
        section.set_block(1, 0, 0, BlockState::new("minecraft:granite"));
        let mut nbt = NbtCompound::new();
        write_numeric_blocks(&section, &mut nbt);
        let blocks = nbt.get_byte_array("Blocks").unwrap();
        assert_eq!(&blocks[..3], &[1, 1, 0]);
        assert_eq!(nbt.get_byte_array("Data").unwrap()[0], 0x10);
    }

    #[test]
    fn unknown_pairs_fall_back() {
        let mut blocks = vec![0u8; SUBCHUNK_VOLUME];
        // Cobblestone has no variants, air has no id 250
        blocks[0] = 4;
        blocks[1] = 250;
        let mut data = vec![0u8; SUBCHUNK_VOLUME];
        data[0] = 9;
        let mut nbt = NbtCompound::new();
        nbt.put_byte_array("Blocks", blocks);
        nbt.put_byte_array("Data", pack_nibbles(&data));

        let palette = read_numeric_blocks(&nbt).unwrap();
        assert_eq!(palette.get_at(0), &BlockState::new("minecraft:cobblestone"));
        assert!(palette.get_at(1).is_air());
    }

    #[test]
    fn mcregion_column_layout() {
        let mut chunk = sample_chunk(MCREGION);
        chunk.set_block(0, 140, 0, BlockState::new("minecraft:stone"));
        let nbt = chunk.to_nbt().unwrap();
        let level = nbt.get_compound("Level").unwrap();
        let blocks = level.get_byte_array("Blocks").unwrap();
        assert_eq!(blocks.len(), COLUMN_VOLUME);
        assert_eq!(blocks[column_index(5, 70, 9)], 1);
        assert_eq!(level.get_byte_array("HeightMap").map(|h| h.len()), Some(256));
        // The chunk never had biomes
        assert!(!level.contains_key("Biomes"));

        let read = Chunk::from_nbt(&nbt, Some(MCREGION)).unwrap();
        assert_eq!(read.sections.keys().copied().collect::<Vec<_>>(), [0, 4]);
        assert_eq!(read.get_block(0, 0, 0), Some(&BlockState::new("minecraft:bedrock")));
        assert_eq!(
            read.get_block(5, 71, 9),
            Some(&BlockState::new("minecraft:spruce_log").with_property("axis", "x"))
        );
        assert_eq!(read.get_block(0, 140, 0), None);
    }

    #[test]
    fn column_biomes() {
        let mut chunk = sample_chunk(ANVIL);
        chunk.set_biome(2, 0, 3, Biome::new("minecraft:desert"));
        let nbt = chunk.to_nbt().unwrap();
        let biomes = nbt
            .get_compound("Level")
            .and_then(|level| level.get_byte_array("Biomes"))
            .unwrap();
        assert_eq!(biomes[3 * 16 + 2], 2);
        assert_eq!(biomes[0], 1);

        let mut level = NbtCompound::new();
        level.put_byte_array("Biomes", vec![UNSET_BIOME; CHUNK_AREA]);
        let mut read = Chunk::new(Vector2::new(0, 0), ANVIL);
        read_column_biomes(&level, &mut read);
        assert_eq!(read.get_biome(0, 0, 0), Some(&Biome::default()));
    }
}
