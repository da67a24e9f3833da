//! Translation between pre-flattening numeric block and biome ids and their namespaced
//! equivalents.
//!
//! The tables are many-to-one towards names: when several numeric pairs map to the same
//! state, the first pair listed wins when converting back.

use std::{
    collections::{BTreeMap, HashMap},
    sync::LazyLock,
};

use serde::Deserialize;
use thiserror::Error;

use crate::{biome::Biome, block::BlockState};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LegacyMappingError {
    #[error("No block is known for numeric id {id}:{meta}")]
    UnknownBlockMapping { id: u8, meta: u8 },
    #[error("Block state {0} has no numeric id")]
    UnknownBlockState(String),
    #[error("Unknown biome {0}")]
    UnknownBiome(String),
}

/// A numeric block id (0..=255) with its metadata nibble (0..=15).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NumericId {
    pub id: u8,
    pub meta: u8,
}

impl NumericId {
    pub const AIR: NumericId = NumericId { id: 0, meta: 0 };

    pub const fn new(id: u8, meta: u8) -> Self {
        Self { id, meta }
    }
}

#[derive(Deserialize)]
struct LegacyBlockFile {
    blocks: Vec<LegacyBlockEntry>,
}

#[derive(Deserialize)]
struct LegacyBlockEntry {
    id: u8,
    meta: u8,
    name: String,
    #[serde(default)]
    properties: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct LegacyBiomeFile {
    biomes: Vec<LegacyBiomeEntry>,
}

#[derive(Deserialize)]
struct LegacyBiomeEntry {
    id: i32,
    name: String,
}

struct LegacyBlockRegistry {
    by_numeric: HashMap<NumericId, BlockState>,
    by_state: HashMap<BlockState, NumericId>,
    by_name: HashMap<String, NumericId>,
}

struct LegacyBiomeRegistry {
    by_id: HashMap<i32, Biome>,
    by_name: HashMap<String, i32>,
}

static LEGACY_BLOCKS: LazyLock<LegacyBlockRegistry> = LazyLock::new(|| {
    let file: LegacyBlockFile =
        serde_json::from_str(include_str!("../../../assets/legacy_blocks.json"))
            .expect("Could not parse legacy_blocks.json registry.");

    let mut registry = LegacyBlockRegistry {
        by_numeric: HashMap::with_capacity(file.blocks.len()),
        by_state: HashMap::with_capacity(file.blocks.len()),
        by_name: HashMap::new(),
    };
    for entry in file.blocks {
        let numeric = NumericId::new(entry.id, entry.meta);
        let state = BlockState {
            name: entry.name,
            properties: entry.properties,
        };
        registry.by_name.entry(state.name.clone()).or_insert(numeric);
        registry.by_state.entry(state.clone()).or_insert(numeric);
        registry.by_numeric.insert(numeric, state);
    }
    registry
});

static LEGACY_BIOMES: LazyLock<LegacyBiomeRegistry> = LazyLock::new(|| {
    let file: LegacyBiomeFile =
        serde_json::from_str(include_str!("../../../assets/legacy_biomes.json"))
            .expect("Could not parse legacy_biomes.json registry.");

    let mut registry = LegacyBiomeRegistry {
        by_id: HashMap::with_capacity(file.biomes.len()),
        by_name: HashMap::with_capacity(file.biomes.len()),
    };
    for entry in file.biomes {
        registry.by_name.entry(entry.name.clone()).or_insert(entry.id);
        registry.by_id.insert(entry.id, Biome::new(entry.name));
    }
    registry
});

/// Exact lookup of a numeric pair.
pub fn lookup_numeric(numeric: NumericId) -> Result<&'static BlockState, LegacyMappingError> {
    LEGACY_BLOCKS
        .by_numeric
        .get(&numeric)
        .ok_or(LegacyMappingError::UnknownBlockMapping {
            id: numeric.id,
            meta: numeric.meta,
        })
}

/// Looks up the numeric pair of a state. A state whose properties are not in the table
/// falls back to the first pair registered for its name.
pub fn lookup_state(state: &BlockState) -> Result<NumericId, LegacyMappingError> {
    LEGACY_BLOCKS
        .by_state
        .get(state)
        .or_else(|| LEGACY_BLOCKS.by_name.get(&state.name))
        .copied()
        .ok_or_else(|| LegacyMappingError::UnknownBlockState(state.to_string()))
}

/// Like [`lookup_numeric`], but retries without metadata and finally gives air.
pub fn numeric_to_state(numeric: NumericId) -> BlockState {
    match lookup_numeric(numeric) {
        Ok(state) => state.clone(),
        Err(err) => match lookup_numeric(NumericId::new(numeric.id, 0)) {
            Ok(state) => {
                log::debug!("{err}, using metadata 0");
                state.clone()
            }
            Err(_) => {
                log::warn!("{err}, using air");
                BlockState::air()
            }
        },
    }
}

/// Like [`lookup_state`], but gives air for states without any numeric id.
pub fn state_to_numeric(state: &BlockState) -> NumericId {
    lookup_state(state).unwrap_or_else(|err| {
        log::warn!("{err}, using air");
        NumericId::AIR
    })
}

pub fn lookup_biome_id(id: i32) -> Result<&'static Biome, LegacyMappingError> {
    LEGACY_BIOMES
        .by_id
        .get(&id)
        .ok_or_else(|| LegacyMappingError::UnknownBiome(id.to_string()))
}

pub fn lookup_biome_name(biome: &Biome) -> Result<i32, LegacyMappingError> {
    LEGACY_BIOMES
        .by_name
        .get(&biome.name)
        .copied()
        .ok_or_else(|| LegacyMappingError::UnknownBiome(biome.name.clone()))
}

/// Numeric biome to name, unknown ids give the default biome.
pub fn biome_from_id(id: i32) -> Biome {
    lookup_biome_id(id).cloned().unwrap_or_else(|err| {
        log::warn!("{err}, using {}", Biome::default());
        Biome::default()
    })
}

/// Biome name to numeric id, unknown names give the id of the default biome.
pub fn biome_to_id(biome: &Biome) -> i32 {
    lookup_biome_name(biome).unwrap_or_else(|err| {
        log::warn!("{err}, using {}", Biome::default());
        lookup_biome_name(&Biome::default()).unwrap_or(1)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stone_both_ways() {
        let stone = numeric_to_state(NumericId::new(1, 0));
        assert_eq!(stone, BlockState::new("minecraft:stone"));
        assert_eq!(state_to_numeric(&stone), NumericId::new(1, 0));
        assert_eq!(
            numeric_to_state(NumericId::new(1, 1)),
            BlockState::new("minecraft:granite")
        );
    }

    #[test]
    fn properties_select_metadata() {
        let log = BlockState::new("minecraft:spruce_log").with_property("axis", "x");
        assert_eq!(state_to_numeric(&log), NumericId::new(17, 5));
        assert_eq!(numeric_to_state(NumericId::new(17, 5)), log);
    }

    #[test]
    fn many_to_one_prefers_first_pair() {
        // Flowing and still water share the same states
        let water = numeric_to_state(NumericId::new(9, 0));
        assert_eq!(water.name, "minecraft:water");
        assert_eq!(state_to_numeric(&water), NumericId::new(8, 0));
    }

    #[test]
    fn unknown_properties_fall_back_to_name() {
        let odd = BlockState::new("minecraft:stone").with_property("shiny", "true");
        assert_eq!(state_to_numeric(&odd), NumericId::new(1, 0));
    }

    #[test]
    fn unknown_entries_become_air() {
        assert!(matches!(
            lookup_numeric(NumericId::new(255, 3)),
            Err(LegacyMappingError::UnknownBlockMapping { id: 255, meta: 3 })
        ));
        assert!(numeric_to_state(NumericId::new(255, 3)).is_air());
        // Unknown metadata keeps the block
        assert_eq!(
            numeric_to_state(NumericId::new(4, 9)),
            BlockState::new("minecraft:cobblestone")
        );
        assert_eq!(
            state_to_numeric(&BlockState::new("minecraft:sculk")),
            NumericId::AIR
        );
    }

    #[test]
    fn biomes() {
        assert_eq!(biome_from_id(1), Biome::new("minecraft:plains"));
        assert_eq!(biome_from_id(21), Biome::new("minecraft:jungle"));
        assert_eq!(biome_to_id(&Biome::new("minecraft:desert")), 2);
        assert_eq!(biome_from_id(99), Biome::default());
        assert_eq!(biome_to_id(&Biome::new("minecraft:cherry_grove")), 1);
    }
}
