use std::fmt;

pub const DEFAULT_BIOME: &str = "minecraft:plains";

/// A namespaced biome identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Biome {
    pub name: String,
}

impl Biome {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for Biome {
    fn default() -> Self {
        Self::new(DEFAULT_BIOME)
    }
}

impl From<&str> for Biome {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Biome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
