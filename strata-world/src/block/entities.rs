use strata_nbt::NbtCompound;
use strata_util::math::position::BlockPos;

const POSITION_KEYS: [&str; 3] = ["x", "y", "z"];

/// A block entity (tile entity). Everything except the identifier and position is kept as
/// raw NBT.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockEntity {
    pub id: String,
    pub position: BlockPos,
    pub data: NbtCompound,
}

impl BlockEntity {
    pub fn new(id: impl Into<String>, position: BlockPos) -> Self {
        Self {
            id: id.into(),
            position,
            data: NbtCompound::new(),
        }
    }

    /// Returns `None` when the position is missing. Some old worlds contain block entities
    /// without an id, those keep an empty one.
    pub fn from_nbt(nbt: &NbtCompound) -> Option<Self> {
        let x = nbt.get_int("x")?;
        let y = nbt.get_int("y")?;
        let z = nbt.get_int("z")?;
        let id = nbt.get_string("id").cloned().unwrap_or_default();

        let data = nbt
            .iter()
            .filter(|(key, _)| key.as_str() != "id" && !POSITION_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Some(Self {
            id,
            position: BlockPos::new(x, y, z),
            data,
        })
    }

    pub fn write_internal(&self, nbt: &mut NbtCompound) {
        if !self.id.is_empty() {
            nbt.put_string("id", self.id.clone());
        }
        nbt.put_int("x", self.position.0.x);
        nbt.put_int("y", self.position.0.y);
        nbt.put_int("z", self.position.0.z);
        nbt.extend(self.data.clone());
    }

    pub fn to_nbt(&self) -> NbtCompound {
        let mut nbt = NbtCompound::new();
        self.write_internal(&mut nbt);
        nbt
    }
}
