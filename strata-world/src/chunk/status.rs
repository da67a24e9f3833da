use std::fmt;

use crate::data_version::{DataVersion, NAMESPACED_STATUS, STATUS_RENAME};

/// Generation progress of a chunk, in the 1.14 vocabulary. The 1.13 names are translated on
/// the way in and out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ChunkStatus {
    #[default]
    Empty,
    StructureStarts,
    StructureReferences,
    Biomes,
    Noise,
    Surface,
    Carvers,
    LiquidCarvers,
    Features,
    InitializeLight,
    Light,
    Spawn,
    Heightmaps,
    Full,
}

impl ChunkStatus {
    /// Parses a status of either vocabulary, with or without the namespace.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.strip_prefix("minecraft:").unwrap_or(name);
        Some(match name {
            "empty" => Self::Empty,
            "structure_starts" => Self::StructureStarts,
            "structure_references" => Self::StructureReferences,
            "biomes" => Self::Biomes,
            "noise" | "base" => Self::Noise,
            "surface" => Self::Surface,
            "carvers" | "carved" => Self::Carvers,
            "liquid_carvers" | "liquid_carved" => Self::LiquidCarvers,
            "features" | "decorated" => Self::Features,
            "initialize_light" => Self::InitializeLight,
            "light" | "lighted" => Self::Light,
            "spawn" | "mobs_spawned" => Self::Spawn,
            "heightmaps" | "finalized" => Self::Heightmaps,
            "full" | "fullchunk" | "postprocessed" => Self::Full,
            _ => return None,
        })
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::StructureStarts => "structure_starts",
            Self::StructureReferences => "structure_references",
            Self::Biomes => "biomes",
            Self::Noise => "noise",
            Self::Surface => "surface",
            Self::Carvers => "carvers",
            Self::LiquidCarvers => "liquid_carvers",
            Self::Features => "features",
            Self::InitializeLight => "initialize_light",
            Self::Light => "light",
            Self::Spawn => "spawn",
            Self::Heightmaps => "heightmaps",
            Self::Full => "full",
        }
    }

    /// The 1.13 name. Stages that did not exist yet map to the stage containing them.
    pub const fn legacy_name(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::StructureStarts
            | Self::StructureReferences
            | Self::Biomes
            | Self::Noise
            | Self::Surface => "base",
            Self::Carvers => "carved",
            Self::LiquidCarvers => "liquid_carved",
            Self::Features => "decorated",
            Self::InitializeLight | Self::Light => "lighted",
            Self::Spawn => "mobs_spawned",
            Self::Heightmaps => "finalized",
            Self::Full => "postprocessed",
        }
    }

    /// The string stored in a chunk of the given version.
    pub fn name_for(&self, version: DataVersion) -> String {
        if version < STATUS_RENAME {
            self.legacy_name().to_string()
        } else if version < NAMESPACED_STATUS {
            self.name().to_string()
        } else {
            format!("minecraft:{}", self.name())
        }
    }

    /// Pre-flattening chunks only record whether decoration ran.
    pub fn is_populated(&self) -> bool {
        *self >= Self::Features
    }

    pub fn is_lit(&self) -> bool {
        *self >= Self::Light
    }
}

impl fmt::Display for ChunkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
