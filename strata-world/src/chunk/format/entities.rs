//! Entity chunks, stored in their own region files next to the block data since 20w45a.

use strata_nbt::NbtCompound;
use strata_util::math::vector2::Vector2;

use crate::{
    chunk::{ChunkParsingError, ChunkPayload, ChunkSerializingError},
    data_version::DataVersion,
    entity::Entity,
};

use super::base;

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkEntityData {
    /// Chunk coordinates, not block coordinates.
    pub position: Vector2<i32>,
    pub data_version: DataVersion,
    pub entities: Vec<Entity>,
}

impl ChunkEntityData {
    pub fn new(position: Vector2<i32>, data_version: DataVersion) -> Self {
        Self {
            position,
            data_version,
            entities: Vec::new(),
        }
    }

    pub fn from_nbt(
        nbt: &NbtCompound,
        hint: Option<DataVersion>,
    ) -> Result<Self, ChunkParsingError> {
        let data_version = nbt
            .get_int("DataVersion")
            .or(hint)
            .ok_or(ChunkParsingError::MissingVersion)?;
        let position = match &nbt.try_get::<Box<[i32]>>("Position")?[..] {
            [x, z] => Vector2::new(*x, *z),
            other => {
                return Err(ChunkParsingError::ErrorDeserializingChunk(format!(
                    "Entity chunk position has {} coordinates",
                    other.len()
                )))
            }
        };
        let entities = nbt
            .get_list("Entities")
            .map(|list| base::entities_from_list(list, position))
            .unwrap_or_default();

        Ok(Self {
            position,
            data_version,
            entities,
        })
    }

    pub fn to_nbt(&self) -> Result<NbtCompound, ChunkSerializingError> {
        let mut nbt = NbtCompound::new();
        nbt.put_int("DataVersion", self.data_version);
        nbt.put_int_array("Position", vec![self.position.x, self.position.z]);
        nbt.put_list(
            "Entities",
            base::entities_to_list(&self.entities, self.data_version)?,
        );
        Ok(nbt)
    }
}

impl ChunkPayload for ChunkEntityData {
    fn parse(nbt: &NbtCompound, hint: Option<DataVersion>) -> Result<Self, ChunkParsingError> {
        Self::from_nbt(nbt, hint)
    }

    fn serialize(&self) -> Result<NbtCompound, ChunkSerializingError> {
        self.to_nbt()
    }

    fn position(&self) -> Vector2<i32> {
        self.position
    }
}
