use strata_nbt::{NbtCompound, NbtTag, ToNbt};
use strata_util::math::vector3::Vector3;
use uuid::Uuid;

use crate::data_version::{DataVersion, ENTITY_UUID_INTS};

const RESERVED_KEYS: [&str; 5] = ["id", "Pos", "UUID", "UUIDMost", "UUIDLeast"];

/// An entity stored in a chunk. Only the fields the codec has to translate between versions
/// are decoded, the rest stays as NBT.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: String,
    pub position: Vector3<f64>,
    pub uuid: Option<Uuid>,
    pub data: NbtCompound,
}

impl Entity {
    pub fn new(id: impl Into<String>, position: Vector3<f64>) -> Self {
        Self {
            id: id.into(),
            position,
            uuid: None,
            data: NbtCompound::new(),
        }
    }

    /// Returns `None` when the id or position is missing or malformed.
    pub fn from_nbt(nbt: &NbtCompound) -> Option<Self> {
        let id = nbt.get_string("id")?.clone();
        let pos = nbt.get_list("Pos")?;
        let coord = |index| pos.get(index).and_then(NbtTag::extract_double);
        let position = Vector3::new(coord(0)?, coord(1)?, coord(2)?);

        let data = nbt
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Some(Self {
            id,
            position,
            uuid: read_uuid(nbt),
            data,
        })
    }

    pub fn to_nbt(&self, version: DataVersion) -> NbtCompound {
        let mut nbt = NbtCompound::new();
        nbt.put_string("id", self.id.clone());

        let pos = [self.position.x, self.position.y, self.position.z];
        nbt.put("Pos", pos.as_slice().to_nbt());

        if let Some(uuid) = self.uuid {
            write_uuid(&mut nbt, uuid, version);
        }
        nbt.extend(self.data.clone());
        nbt
    }
}

fn read_uuid(nbt: &NbtCompound) -> Option<Uuid> {
    if let Some(ints) = nbt.get_int_array("UUID") {
        let [a, b, c, d] = ints else {
            log::warn!("Entity UUID has {} ints instead of 4", ints.len());
            return None;
        };
        let value = [a, b, c, d]
            .iter()
            .fold(0u128, |acc, &&int| (acc << 32) | int as u32 as u128);
        return Some(Uuid::from_u128(value));
    }

    let most = nbt.get_long("UUIDMost")?;
    let least = nbt.get_long("UUIDLeast")?;
    Some(Uuid::from_u128(
        ((most as u64 as u128) << 64) | least as u64 as u128,
    ))
}

fn write_uuid(nbt: &mut NbtCompound, uuid: Uuid, version: DataVersion) {
    let value = uuid.as_u128();
    if version >= ENTITY_UUID_INTS {
        let ints: Vec<i32> = (0..4)
            .rev()
            .map(|word| (value >> (word * 32)) as u32 as i32)
            .collect();
        nbt.put_int_array("UUID", ints);
    } else {
        nbt.put_long("UUIDMost", (value >> 64) as u64 as i64);
        nbt.put_long("UUIDLeast", value as u64 as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_version::FLATTENING;

    fn zombie() -> Entity {
        let mut entity = Entity::new("minecraft:zombie", Vector3::new(1.5, 64.0, -3.25));
        entity.uuid = Some(Uuid::from_u128(0x0123_4567_89ab_cdef_fedc_ba98_7654_3210));
        entity.data.put_short("Health", 20);
        entity
    }

    #[test]
    fn uuid_as_int_array() {
        let nbt = zombie().to_nbt(ENTITY_UUID_INTS);
        assert_eq!(
            nbt.get_int_array("UUID"),
            Some(&[0x0123_4567, 0x89ab_cdefu32 as i32, 0xfedc_ba98u32 as i32, 0x7654_3210][..])
        );
        assert!(!nbt.contains_key("UUIDMost"));
        assert_eq!(Entity::from_nbt(&nbt), Some(zombie()));
    }

    #[test]
    fn uuid_as_long_pair() {
        let nbt = zombie().to_nbt(FLATTENING);
        assert_eq!(nbt.get_long("UUIDMost"), Some(0x0123_4567_89ab_cdef));
        assert!(!nbt.contains_key("UUID"));
        assert_eq!(Entity::from_nbt(&nbt), Some(zombie()));
    }

    #[test]
    fn position_is_a_list_of_doubles() {
        let nbt = zombie().to_nbt(ENTITY_UUID_INTS);
        let pos = nbt.get_list("Pos").unwrap();
        assert_eq!(pos.element_id(), strata_nbt::DOUBLE_ID);
        let coords: Vec<f64> = pos.iter().filter_map(NbtTag::extract_double).collect();
        assert_eq!(coords, [1.5, 64.0, -3.25]);
    }

    #[test]
    fn position_is_required() {
        let mut nbt = zombie().to_nbt(FLATTENING);
        nbt.remove("Pos");
        assert_eq!(Entity::from_nbt(&nbt), None);
    }
}
