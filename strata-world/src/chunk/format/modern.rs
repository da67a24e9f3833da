//! Generations storing biomes as a palette in every section.

use std::ops::RangeInclusive;

use strata_nbt::{NbtCompound, NbtList, NbtTag};

use crate::{
    biome::Biome,
    chunk::{
        palette::{BiomePalette, BlockPalette, BIOME_DISK_MIN_BITS, BLOCK_DISK_MIN_BITS},
        Chunk, ChunkBiomes, ChunkParsingError, ChunkSerializingError, Section,
    },
    data_version::{biome_packing, block_packing, DataVersion, EXTENDED_HEIGHT, PALETTED_BIOMES},
};

use super::{base, ChunkCodec};

/// Lowest section of a 384 block tall chunk.
const MIN_SECTION: i8 = -4;
const MAX_SECTION: i8 = 19;

/// Sectioned biomes with the chunk still nested in `Level`, only used by the 1.18
/// experimental snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PalettedBiomes;

/// The current layout with the chunk data at the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedHeight;

impl ChunkCodec for PalettedBiomes {
    fn min_version(&self) -> DataVersion {
        PALETTED_BIOMES
    }

    fn section_range(&self) -> RangeInclusive<i8> {
        MIN_SECTION..=MAX_SECTION
    }

    fn writes_light_only_sections(&self) -> bool {
        true
    }

    fn read_section_blocks(
        &self,
        section: &NbtCompound,
        version: DataVersion,
    ) -> Result<BlockPalette, ChunkParsingError> {
        read_block_states(section, version)
    }

    fn write_section_blocks(
        &self,
        section: &Section,
        nbt: &mut NbtCompound,
        version: DataVersion,
    ) -> Result<(), ChunkSerializingError> {
        write_block_states(section, nbt, version)
    }

    fn read_section_biomes(
        &self,
        section: &NbtCompound,
        version: DataVersion,
    ) -> Result<Option<BiomePalette>, ChunkParsingError> {
        read_biome_palette(section, version)
    }

    fn write_section_biomes(
        &self,
        chunk: &Chunk,
        section_y: i8,
        nbt: &mut NbtCompound,
        version: DataVersion,
    ) -> Result<(), ChunkSerializingError> {
        write_biome_palette(chunk, section_y, nbt, version)
    }

    fn write_placeholders(&self, _chunk: &Chunk, level: &mut NbtCompound, _version: DataVersion) {
        level.put_compound("Heightmaps", NbtCompound::new());
        let mut structures = NbtCompound::new();
        structures.put_compound("References", NbtCompound::new());
        structures.put_compound("Starts", NbtCompound::new());
        level.put_compound("Structures", structures);
    }
}

impl ChunkCodec for ExtendedHeight {
    fn min_version(&self) -> DataVersion {
        EXTENDED_HEIGHT
    }

    fn section_range(&self) -> RangeInclusive<i8> {
        MIN_SECTION..=MAX_SECTION
    }

    fn writes_light_only_sections(&self) -> bool {
        true
    }

    fn nests_in_level(&self) -> bool {
        false
    }

    fn sections_key(&self) -> &'static str {
        "sections"
    }

    fn block_entities_key(&self) -> &'static str {
        "block_entities"
    }

    fn entities_key(&self) -> &'static str {
        "entities"
    }

    fn read_section_blocks(
        &self,
        section: &NbtCompound,
        version: DataVersion,
    ) -> Result<BlockPalette, ChunkParsingError> {
        read_block_states(section, version)
    }

    fn write_section_blocks(
        &self,
        section: &Section,
        nbt: &mut NbtCompound,
        version: DataVersion,
    ) -> Result<(), ChunkSerializingError> {
        write_block_states(section, nbt, version)
    }

    fn read_section_biomes(
        &self,
        section: &NbtCompound,
        version: DataVersion,
    ) -> Result<Option<BiomePalette>, ChunkParsingError> {
        read_biome_palette(section, version)
    }

    fn write_section_biomes(
        &self,
        chunk: &Chunk,
        section_y: i8,
        nbt: &mut NbtCompound,
        version: DataVersion,
    ) -> Result<(), ChunkSerializingError> {
        write_biome_palette(chunk, section_y, nbt, version)
    }

    fn write_bookkeeping(&self, chunk: &Chunk, level: &mut NbtCompound, version: DataVersion) {
        base::write_bookkeeping(chunk, level, version);
        level.put_int("yPos", MIN_SECTION as i32);
    }

    fn write_placeholders(&self, _chunk: &Chunk, level: &mut NbtCompound, _version: DataVersion) {
        level.put_compound("Heightmaps", NbtCompound::new());
        let mut structures = NbtCompound::new();
        structures.put_compound("References", NbtCompound::new());
        structures.put_compound("starts", NbtCompound::new());
        level.put_compound("structures", structures);
    }
}

fn read_block_states(
    section: &NbtCompound,
    version: DataVersion,
) -> Result<BlockPalette, ChunkParsingError> {
    let Some(block_states) = section.get_compound("block_states") else {
        return Ok(BlockPalette::new());
    };
    let palette = base::block_palette_from_nbt(&block_states.try_get::<NbtList>("palette")?)?;
    Ok(BlockPalette::from_disk(
        palette,
        block_states.get_long_array("data"),
        BLOCK_DISK_MIN_BITS,
        block_packing(version),
    )?)
}

fn write_block_states(
    section: &Section,
    nbt: &mut NbtCompound,
    version: DataVersion,
) -> Result<(), ChunkSerializingError> {
    let (palette, data) = section
        .block_states
        .to_disk(BLOCK_DISK_MIN_BITS, block_packing(version))?;
    let mut block_states = NbtCompound::new();
    block_states.put_list("palette", base::block_palette_to_nbt(&palette)?);
    if let Some(data) = data {
        block_states.put_long_array("data", data);
    }
    nbt.put_compound("block_states", block_states);
    Ok(())
}

fn read_biome_palette(
    section: &NbtCompound,
    version: DataVersion,
) -> Result<Option<BiomePalette>, ChunkParsingError> {
    let Some(biomes) = section.get_compound("biomes") else {
        return Ok(None);
    };
    let palette = biomes
        .try_get::<NbtList>("palette")?
        .iter()
        .map(|tag| {
            tag.extract_string().map(Biome::new).ok_or_else(|| {
                ChunkParsingError::ErrorDeserializingChunk(format!(
                    "Biome palette entry is a {} instead of a string",
                    tag.type_name()
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(BiomePalette::from_disk(
        palette,
        biomes.get_long_array("data"),
        BIOME_DISK_MIN_BITS,
        biome_packing(version),
    )?))
}

/// Chunks read in an older layout have their biomes sampled at the corner of every cell.
fn write_biome_palette(
    chunk: &Chunk,
    section_y: i8,
    nbt: &mut NbtCompound,
    version: DataVersion,
) -> Result<(), ChunkSerializingError> {
    let section_biomes = chunk
        .sections
        .get(&section_y)
        .and_then(|section| section.biomes.as_ref());
    let sampled;
    let container = match (&chunk.biomes, section_biomes) {
        (ChunkBiomes::Sectioned, Some(biomes)) => biomes,
        // Stays absent, as it was read
        (ChunkBiomes::Sectioned, None) => return Ok(()),
        _ => {
            let mut container = BiomePalette::new();
            let base_y = section_y as i32 * 16;
            for y in 0..BiomePalette::SIZE {
                for z in 0..BiomePalette::SIZE {
                    for x in 0..BiomePalette::SIZE {
                        let biome = chunk
                            .get_biome(x * 4, base_y + y as i32 * 4, z * 4)
                            .cloned()
                            .unwrap_or_default();
                        container.set(x, y, z, biome);
                    }
                }
            }
            sampled = container;
            &sampled
        }
    };

    let (palette, data) = container.to_disk(BIOME_DISK_MIN_BITS, biome_packing(version))?;
    let mut biomes = NbtCompound::new();
    let palette: Vec<NbtTag> = palette
        .into_iter()
        .map(|biome| NbtTag::String(biome.name))
        .collect();
    biomes.put_list("palette", NbtList::try_from(palette)?);
    if let Some(data) = data {
        biomes.put_long_array("data", data);
    }
    nbt.put_compound("biomes", biomes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use strata_util::math::{position::BlockPos, vector2::Vector2, vector3::Vector3};

    use super::*;
    use crate::{
        block::{entities::BlockEntity, BlockState},
        chunk::ChunkStatus,
        data_version::{BIOMES_3D, LATEST, NAMESPACED_STATUS},
        entity::Entity,
    };

    fn sample_chunk(version: DataVersion) -> Chunk {
        let mut chunk = Chunk::new(Vector2::new(12, -40), version);
        chunk.set_block(0, -64, 0, BlockState::new("minecraft:bedrock"));
        chunk.set_block(
            1,
            -63,
            1,
            BlockState::new("minecraft:water").with_property("level", "0"),
        );
        chunk.set_block(2, 300, 2, BlockState::new("minecraft:stone"));
        chunk.set_biome(0, -64, 0, Biome::new("minecraft:deep_dark"));
        let mut chest = BlockEntity::new("minecraft:chest", BlockPos::new(192, -63, -640));
        chest.data.put_string("CustomName", "\"Loot\"".to_string());
        chunk.add_block_entity(chest);
        chunk.status = ChunkStatus::Full;
        chunk.last_update = 12345;
        chunk
    }

    #[test]
    fn extended_height_round_trip() {
        let chunk = sample_chunk(LATEST);
        let nbt = chunk.to_nbt().unwrap();
        assert!(!nbt.contains_key("Level"));
        assert_eq!(nbt.get_int("yPos"), Some(-4));
        assert_eq!(nbt.get_int("xPos"), Some(12));
        assert_eq!(nbt.get_string("Status").map(String::as_str), Some("minecraft:full"));
        assert_eq!(nbt.get_list("block_entities").map(|list| list.len()), Some(1));
        // No entities, they live in their own region files
        assert!(!nbt.contains_key("entities"));

        let mut read = Chunk::from_nbt(&nbt, None).unwrap();
        read.dirty = true;
        assert_eq!(read, chunk);
    }

    #[test]
    fn paletted_biomes_nest_in_level() {
        let chunk = sample_chunk(PALETTED_BIOMES);
        let nbt = chunk.to_nbt().unwrap();
        let level = nbt.get_compound("Level").unwrap();
        assert_eq!(level.get_string("Status").map(String::as_str), Some("full"));
        let sections = level.get_list("Sections").unwrap();
        let bottom = sections.get(0).and_then(|tag| tag.extract_compound()).unwrap();
        assert_eq!(bottom.get_byte("Y"), Some(-4));
        let biomes = bottom.get_compound("biomes").unwrap();
        assert_eq!(biomes.get_list("palette").map(|list| list.len()), Some(2));
        // Two entries need a single bit for each of the 64 cells
        assert_eq!(biomes.get_long_array("data").map(|data| data.len()), Some(1));

        let mut read = Chunk::from_nbt(&nbt, None).unwrap();
        read.dirty = true;
        assert_eq!(read, chunk);
    }

    #[test]
    fn upgrading_samples_old_biomes() {
        let mut chunk = Chunk::new(Vector2::new(0, 0), BIOMES_3D);
        chunk.set_block(0, 10, 0, BlockState::new("minecraft:stone"));
        chunk.set_biome(4, 8, 4, Biome::new("minecraft:jungle"));

        let nbt = chunk.to_nbt_as(LATEST).unwrap();
        let read = Chunk::from_nbt(&nbt, None).unwrap();
        assert_eq!(read.biomes, ChunkBiomes::Sectioned);
        assert_eq!(read.get_biome(4, 8, 4), Some(&Biome::new("minecraft:jungle")));
        assert_eq!(read.get_biome(0, 8, 0), Some(&Biome::default()));
    }

    #[test]
    fn sections_outside_the_range_are_dropped() {
        let mut chunk = sample_chunk(LATEST);
        chunk.set_block(0, 320, 0, BlockState::new("minecraft:stone"));
        assert!(chunk.sections.contains_key(&20));
        let read = Chunk::from_nbt(&chunk.to_nbt().unwrap(), None).unwrap();
        assert!(!read.sections.contains_key(&20));
        assert!(read.sections.contains_key(&18));
    }

    fn light_only_section(y: i8) -> NbtTag {
        let mut section = NbtCompound::new();
        section.put_byte("Y", y);
        section.put_byte_array("SkyLight", vec![0xffu8; base::LIGHT_BYTES]);
        NbtTag::Compound(section)
    }

    #[test]
    fn light_only_sections_survive_outside_the_block_range() {
        let mut nbt = sample_chunk(LATEST).to_nbt().unwrap();
        let mut sections = nbt.get_list("sections").unwrap().clone();
        sections.push(light_only_section(-5)).unwrap();
        sections.push(light_only_section(20)).unwrap();
        nbt.put_list("sections", sections);

        let read = Chunk::from_nbt(&nbt, None).unwrap();
        for y in [-5i8, 20] {
            let section = &read.sections[&y];
            assert!(section.is_light_only());
            assert!(section.biomes.is_none());
            assert_eq!(section.sky_light.as_deref(), Some(&[0xffu8; base::LIGHT_BYTES][..]));
        }

        let written = read.to_nbt().unwrap();
        let sections: Vec<&NbtCompound> = written
            .get_list("sections")
            .unwrap()
            .iter()
            .filter_map(NbtTag::extract_compound)
            .collect();
        let ys: Vec<i8> = sections.iter().filter_map(|section| section.get_byte("Y")).collect();
        assert!(ys.contains(&-5) && ys.contains(&-4) && ys.contains(&20));
        let light_only = sections
            .iter()
            .filter(|section| matches!(section.get_byte("Y"), Some(-5 | 20)));
        for section in light_only {
            assert!(!section.contains_key("block_states"));
            assert!(!section.contains_key("biomes"));
            assert!(!section.contains_key("BlockLight"));
            assert_eq!(
                section.get_byte_array("SkyLight").map(<[u8]>::len),
                Some(base::LIGHT_BYTES)
            );
        }

        let mut reread = Chunk::from_nbt(&written, None).unwrap();
        reread.dirty = read.dirty;
        assert_eq!(reread, read);
    }

    #[test]
    fn absent_biomes_stay_absent() {
        let mut section = NbtCompound::new();
        section.put_byte("Y", 3);
        assert!(read_biome_palette(&section, LATEST).unwrap().is_none());
    }

    #[test]
    fn palette_entries_have_only_a_name() {
        let mut chunk = Chunk::new(Vector2::new(0, 0), LATEST);
        chunk.set_block(3, 5, 7, BlockState::new("minecraft:stone"));

        let nbt = chunk.to_nbt_as(LATEST).unwrap();
        let section = nbt
            .get_list("sections")
            .unwrap()
            .iter()
            .filter_map(NbtTag::extract_compound)
            .find(|section| section.get_byte("Y") == Some(0))
            .unwrap();
        let palette = section
            .get_compound("block_states")
            .and_then(|block_states| block_states.get_list("palette"))
            .unwrap();
        let stone = palette
            .iter()
            .filter_map(NbtTag::extract_compound)
            .find(|entry| entry.get_string("Name").map(String::as_str) == Some("minecraft:stone"))
            .unwrap();
        assert_eq!(stone.len(), 1);
        assert_eq!(stone.keys().collect::<Vec<_>>(), ["Name"]);
        let air = palette.get(0).and_then(NbtTag::extract_compound).unwrap();
        assert_eq!(air.keys().collect::<Vec<_>>(), ["Name"]);
    }

    #[test]
    fn entities_are_kept_when_present() {
        let mut chunk = sample_chunk(NAMESPACED_STATUS);
        let mut pig = Entity::new("minecraft:pig", Vector3::new(192.5, -60.0, -639.5));
        pig.uuid = Some(uuid::Uuid::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef));
        chunk.entities.push(pig);
        let nbt = chunk.to_nbt().unwrap();
        let entities = nbt.get_list("entities").unwrap();
        let pig = entities.get(0).and_then(|tag| tag.extract_compound()).unwrap();
        assert_eq!(pig.get_string("id").map(String::as_str), Some("minecraft:pig"));
        assert_eq!(pig.get_int_array("UUID").map(|ints| ints.len()), Some(4));
        assert!(!pig.contains_key("UUIDMost"));

        let mut read = Chunk::from_nbt(&nbt, None).unwrap();
        read.dirty = true;
        assert_eq!(read, chunk);
    }

    #[test]
    fn biome_entries_must_be_strings() {
        let mut biomes = NbtCompound::new();
        biomes.put_list("palette", NbtList::try_from(vec![NbtTag::Int(4)]).unwrap());
        let mut section = NbtCompound::new();
        section.put_compound("biomes", biomes);
        assert!(matches!(
            read_biome_palette(&section, LATEST),
            Err(ChunkParsingError::ErrorDeserializingChunk(_))
        ));
    }
}
