use std::fmt;

use super::{vector2::Vector2, vector3::Vector3};

/// Absolute block coordinate. Ordered by x, then y, then z.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Default)]
pub struct BlockPos(pub Vector3<i32>);

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self(Vector3::new(x, y, z))
    }

    /// Coordinates of the chunk column containing this block.
    pub const fn chunk_position(&self) -> Vector2<i32> {
        Vector2::new(get_chunk_cord(self.0.x), get_chunk_cord(self.0.z))
    }
}

/// Converts a world coordinate to the coordinate of the chunk or section holding it.
pub const fn get_chunk_cord(coord: i32) -> i32 {
    coord >> 4
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.0.x, self.0.y, self.0.z)
    }
}
