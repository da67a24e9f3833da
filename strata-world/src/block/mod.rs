use std::{collections::BTreeMap, fmt};

use strata_nbt::{NbtCompound, NbtTag, ToNbt};

pub mod entities;
pub mod legacy;

pub const AIR: &str = "minecraft:air";

/// A block identifier with its property values. Two states are the same block only if
/// both the name and every property match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockState {
    pub name: String,
    pub properties: BTreeMap<String, String>,
}

impl BlockState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn air() -> Self {
        Self::new(AIR)
    }

    pub fn is_air(&self) -> bool {
        matches!(
            self.name.as_str(),
            AIR | "minecraft:cave_air" | "minecraft:void_air"
        )
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Reads a `{Name, Properties}` palette entry. The name is required, properties that are
    /// not strings are ignored.
    pub fn from_palette_nbt(nbt: &NbtCompound) -> Result<Self, strata_nbt::Error> {
        let name = nbt.try_get::<String>("Name")?;
        let properties = nbt
            .get_compound("Properties")
            .map(|properties| {
                properties
                    .iter()
                    .filter_map(|(key, value)| {
                        let value = value.extract_string();
                        if value.is_none() {
                            log::warn!("Ignoring non string property {key} of {name}");
                        }
                        value.map(|value| (key.clone(), value.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self { name, properties })
    }

    pub fn to_palette_nbt(&self) -> NbtCompound {
        let mut nbt = NbtCompound::new();
        nbt.put_string("Name", self.name.clone());
        if !self.properties.is_empty() {
            let properties = self
                .properties
                .iter()
                .map(|(key, value)| (key.clone(), NbtTag::String(value.clone())))
                .collect();
            nbt.put_compound("Properties", properties);
        }
        nbt
    }
}

impl Default for BlockState {
    fn default() -> Self {
        Self::air()
    }
}

impl ToNbt for BlockState {
    fn to_nbt(&self) -> NbtTag {
        NbtTag::Compound(self.to_palette_nbt())
    }
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.properties.is_empty() {
            f.write_str("[")?;
            for (index, (key, value)) in self.properties.iter().enumerate() {
                if index > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{key}={value}")?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_entry_round_trip() {
        let state = BlockState::new("minecraft:oak_log").with_property("axis", "x");
        let nbt = state.to_palette_nbt();
        assert_eq!(
            nbt.get_compound("Properties")
                .and_then(|p| p.get_string("axis"))
                .map(String::as_str),
            Some("x")
        );
        assert_eq!(BlockState::from_palette_nbt(&nbt).unwrap(), state);
        assert_eq!(state.to_string(), "minecraft:oak_log[axis=x]");
    }

    #[test]
    fn plain_state_has_only_a_name() {
        let nbt = BlockState::new("minecraft:stone").to_palette_nbt();
        let keys: Vec<_> = nbt.keys().map(String::as_str).collect();
        assert_eq!(keys, ["Name"]);
    }

    #[test]
    fn missing_name_is_an_error() {
        let mut nbt = NbtCompound::new();
        nbt.put_compound("Properties", NbtCompound::new());
        assert!(matches!(
            BlockState::from_palette_nbt(&nbt),
            Err(strata_nbt::Error::MissingField(name)) if name == "Name"
        ));
    }

    #[test]
    fn air_variants() {
        assert!(BlockState::default().is_air());
        assert!(BlockState::new("minecraft:cave_air").is_air());
        assert!(!BlockState::new("minecraft:stone").is_air());
    }
}
