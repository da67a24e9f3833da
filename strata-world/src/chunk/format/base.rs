//! Layout pieces shared by every generation.

use strata_nbt::{NbtCompound, NbtList, NbtTag};
use strata_util::math::vector2::Vector2;

use crate::{
    block::{entities::BlockEntity, BlockState},
    chunk::{Chunk, ChunkParsingError, ChunkSerializingError, ChunkStatus, Section},
    data_version::{DataVersion, DATA_VERSION_TAG, ENTITY_CHUNKS, FLATTENING},
    entity::Entity,
};

use super::ChunkCodec;

/// Length of a section light array.
pub const LIGHT_BYTES: usize = 2048;

pub fn read_chunk<C: ChunkCodec + ?Sized>(
    codec: &C,
    root: &NbtCompound,
    version: DataVersion,
) -> Result<Chunk, ChunkParsingError> {
    let level = if codec.nests_in_level() {
        root.try_get::<NbtCompound>("Level")?
    } else {
        root.clone()
    };

    let position = Vector2::new(level.try_get::<i32>("xPos")?, level.try_get::<i32>("zPos")?);
    let mut chunk = Chunk::new(position, version);

    codec.read_bookkeeping(&level, &mut chunk, version);
    codec.read_sections(&level, &mut chunk, version)?;
    codec.read_biomes(&level, &mut chunk, version)?;
    codec.read_block_entities(&level, &mut chunk);
    codec.read_entities(&level, &mut chunk);

    // Fresh from disk
    chunk.dirty = false;
    Ok(chunk)
}

pub fn write_chunk<C: ChunkCodec + ?Sized>(
    codec: &C,
    chunk: &Chunk,
    version: DataVersion,
) -> Result<NbtCompound, ChunkSerializingError> {
    let mut level = NbtCompound::new();
    level.put_int("xPos", chunk.position.x);
    level.put_int("zPos", chunk.position.z);

    codec.write_bookkeeping(chunk, &mut level, version);
    codec.write_sections(chunk, &mut level, version)?;
    codec.write_biomes(chunk, &mut level, version)?;
    codec.write_block_entities(chunk, &mut level)?;
    codec.write_entities(chunk, &mut level, version)?;
    codec.write_placeholders(chunk, &mut level, version);

    let mut root = if codec.nests_in_level() {
        let mut root = NbtCompound::new();
        root.put_compound("Level", level);
        root
    } else {
        level
    };
    if version >= DATA_VERSION_TAG {
        root.put_int("DataVersion", version);
    }
    Ok(root)
}

pub fn read_sections<C: ChunkCodec + ?Sized>(
    codec: &C,
    level: &NbtCompound,
    chunk: &mut Chunk,
    version: DataVersion,
) -> Result<(), ChunkParsingError> {
    let Some(sections) = level.get_list(codec.sections_key()) else {
        log::debug!("Chunk {} has no sections", chunk.position);
        return Ok(());
    };

    for tag in sections {
        let Some(nbt) = tag.extract_compound() else {
            log::warn!(
                "Skipping a section of chunk {} that is not a compound",
                chunk.position
            );
            continue;
        };
        let y = nbt.try_get::<i8>("Y")?;
        let section = Section {
            block_states: codec.read_section_blocks(nbt, version)?,
            biomes: codec.read_section_biomes(nbt, version)?,
            block_light: nbt.get_byte_array("BlockLight").map(Box::from),
            sky_light: nbt.get_byte_array("SkyLight").map(Box::from),
        };
        chunk.sections.insert(y, section);
    }
    Ok(())
}

pub fn write_sections<C: ChunkCodec + ?Sized>(
    codec: &C,
    chunk: &Chunk,
    level: &mut NbtCompound,
    version: DataVersion,
) -> Result<(), ChunkSerializingError> {
    let range = codec.section_range();
    let light_range = range.start().saturating_sub(1)..=range.end().saturating_add(1);
    let mut sections = Vec::with_capacity(chunk.sections.len());

    for (&y, section) in &chunk.sections {
        if !range.contains(&y) {
            if codec.writes_light_only_sections()
                && section.is_light_only()
                && light_range.contains(&y)
            {
                let mut nbt = NbtCompound::new();
                nbt.put_byte("Y", y);
                write_light(&mut nbt, section, false);
                sections.push(nbt);
            } else {
                warn_dropped_section(chunk, y, section, &range);
            }
            continue;
        }

        let mut nbt = NbtCompound::new();
        nbt.put_byte("Y", y);
        codec.write_section_blocks(section, &mut nbt, version)?;
        codec.write_section_biomes(chunk, y, &mut nbt, version)?;
        write_light(&mut nbt, section, codec.requires_light());
        sections.push(nbt);
    }

    level.put_list(codec.sections_key(), compound_list(sections)?);
    Ok(())
}

pub(super) fn warn_dropped_section(
    chunk: &Chunk,
    y: i8,
    section: &Section,
    range: &std::ops::RangeInclusive<i8>,
) {
    if section.is_air() {
        log::debug!(
            "Dropping empty section {y} of chunk {}, outside {range:?}",
            chunk.position
        );
    } else {
        log::warn!(
            "Dropping section {y} of chunk {}, this format only stores {range:?}",
            chunk.position
        );
    }
}

fn write_light(nbt: &mut NbtCompound, section: &Section, required: bool) {
    for (key, light) in [
        ("BlockLight", &section.block_light),
        ("SkyLight", &section.sky_light),
    ] {
        match light {
            Some(light) => nbt.put_byte_array(key, light.clone()),
            None if required => nbt.put_byte_array(key, vec![0u8; LIGHT_BYTES]),
            None => {}
        }
    }
}

pub fn read_block_entities<C: ChunkCodec + ?Sized>(
    codec: &C,
    level: &NbtCompound,
    chunk: &mut Chunk,
) {
    let Some(list) = level.get_list(codec.block_entities_key()) else {
        return;
    };
    for tag in list {
        match tag.extract_compound().and_then(BlockEntity::from_nbt) {
            Some(block_entity) => {
                if block_entity.position.chunk_position() != chunk.position {
                    log::debug!(
                        "Block entity at {} lies outside chunk {}",
                        block_entity.position,
                        chunk.position
                    );
                }
                chunk
                    .block_entities
                    .insert(block_entity.position, block_entity);
            }
            None => log::warn!(
                "Skipping malformed block entity in chunk {}",
                chunk.position
            ),
        }
    }
}

pub fn write_block_entities<C: ChunkCodec + ?Sized>(
    codec: &C,
    chunk: &Chunk,
    level: &mut NbtCompound,
) -> Result<(), ChunkSerializingError> {
    let list = compound_list(chunk.block_entities.values().map(BlockEntity::to_nbt))?;
    level.put_list(codec.block_entities_key(), list);
    Ok(())
}

pub fn read_entities<C: ChunkCodec + ?Sized>(codec: &C, level: &NbtCompound, chunk: &mut Chunk) {
    if let Some(list) = level.get_list(codec.entities_key()) {
        chunk.entities = entities_from_list(list, chunk.position);
    }
}

pub fn write_entities<C: ChunkCodec + ?Sized>(
    codec: &C,
    chunk: &Chunk,
    level: &mut NbtCompound,
    version: DataVersion,
) -> Result<(), ChunkSerializingError> {
    // Entities have their own files by then
    if version >= ENTITY_CHUNKS && chunk.entities.is_empty() {
        return Ok(());
    }
    level.put_list(codec.entities_key(), entities_to_list(&chunk.entities, version)?);
    Ok(())
}

pub fn entities_from_list(list: &NbtList, position: Vector2<i32>) -> Vec<Entity> {
    list.iter()
        .filter_map(|tag| {
            let entity = tag.extract_compound().and_then(Entity::from_nbt);
            if entity.is_none() {
                log::warn!("Skipping malformed entity in chunk {position}");
            }
            entity
        })
        .collect()
}

pub fn entities_to_list(
    entities: &[Entity],
    version: DataVersion,
) -> Result<NbtList, ChunkSerializingError> {
    compound_list(entities.iter().map(|entity| entity.to_nbt(version)))
}

pub fn read_bookkeeping(level: &NbtCompound, chunk: &mut Chunk, version: DataVersion) {
    chunk.inhabited_time = level.get_long("InhabitedTime").unwrap_or(0);
    chunk.last_update = level.get_long("LastUpdate").unwrap_or(0);

    chunk.status = if version < FLATTENING {
        if level.get_bool("TerrainPopulated").unwrap_or(false) {
            ChunkStatus::Full
        } else {
            ChunkStatus::Noise
        }
    } else {
        match level.get_string("Status") {
            Some(name) => ChunkStatus::from_name(name).unwrap_or_else(|| {
                log::warn!("Unknown status {name:?} in chunk {}", chunk.position);
                ChunkStatus::Empty
            }),
            None => ChunkStatus::Empty,
        }
    };
}

pub fn write_bookkeeping(chunk: &Chunk, level: &mut NbtCompound, version: DataVersion) {
    level.put_long("LastUpdate", chunk.last_update);
    level.put_long("InhabitedTime", chunk.inhabited_time);
    if version < FLATTENING {
        level.put_bool("TerrainPopulated", chunk.status.is_populated());
        level.put_bool("LightPopulated", chunk.status.is_lit());
    } else {
        level.put_string("Status", chunk.status.name_for(version));
    }
}

/// An empty list declares `End` like the game writes it.
pub fn compound_list(
    compounds: impl IntoIterator<Item = NbtCompound>,
) -> Result<NbtList, ChunkSerializingError> {
    let tags: Vec<NbtTag> = compounds.into_iter().map(NbtTag::Compound).collect();
    Ok(NbtList::try_from(tags)?)
}

pub fn block_palette_from_nbt(list: &NbtList) -> Result<Vec<BlockState>, ChunkParsingError> {
    list.iter()
        .map(|tag| {
            let entry = tag.extract_compound().ok_or_else(|| {
                ChunkParsingError::ErrorDeserializingChunk(format!(
                    "Palette entry is a {} instead of a compound",
                    tag.type_name()
                ))
            })?;
            Ok(BlockState::from_palette_nbt(entry)?)
        })
        .collect()
}

pub fn block_palette_to_nbt(palette: &[BlockState]) -> Result<NbtList, ChunkSerializingError> {
    compound_list(palette.iter().map(BlockState::to_palette_nbt))
}
