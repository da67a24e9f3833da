//! Game data versions that change how chunks are laid out on disk.
//!
//! Every constant is the first data version that uses the new behaviour. Versions below
//! [`DATA_VERSION_TAG`] never appear inside a chunk and are only ever supplied by the caller.

use strata_util::Packing;

pub type DataVersion = i32;

/// Beta 1.3 region files (`.mcr`) with a flat block array.
pub const MCREGION: DataVersion = -1;
/// Release 1.2 Anvil files with numeric ids in 16 block tall sections.
pub const ANVIL: DataVersion = 0;
/// 15w32a, first version to embed `DataVersion`.
pub const DATA_VERSION_TAG: DataVersion = 100;
/// 17w47a, block palettes replace numeric ids.
pub const FLATTENING: DataVersion = 1451;
/// 18w43a, chunk statuses use the 1.14 vocabulary.
pub const STATUS_RENAME: DataVersion = 1901;
/// 19w36a, biomes are stored per 4x4x4 cell.
pub const BIOMES_3D: DataVersion = 2203;
/// 20w12a, entity UUIDs are stored as an int array.
pub const ENTITY_UUID_INTS: DataVersion = 2513;
/// 20w17a, packed indices no longer span two longs.
pub const ALIGNED_PACKING: DataVersion = 2529;
/// 20w45a, entities move to their own region files.
pub const ENTITY_CHUNKS: DataVersion = 2681;
/// 21w37a, biomes get a palette per section.
pub const PALETTED_BIOMES: DataVersion = 2834;
/// 21w43a, the `Level` wrapper is dropped and `yPos` is added.
pub const EXTENDED_HEIGHT: DataVersion = 2844;
/// 23w17a, chunk statuses carry the `minecraft:` namespace.
pub const NAMESPACED_STATUS: DataVersion = 3454;
/// 1.21.5
pub const LATEST: DataVersion = 4325;

/// Layout of packed block indices.
pub const fn block_packing(version: DataVersion) -> Packing {
    if version >= ALIGNED_PACKING {
        Packing::Aligned
    } else {
        Packing::Tight
    }
}

/// Layout of packed biome palette indices.
pub const fn biome_packing(_version: DataVersion) -> Packing {
    Packing::Tight
}

pub const fn has_3d_biomes(version: DataVersion) -> bool {
    version >= BIOMES_3D
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packing_cutover() {
        assert_eq!(block_packing(FLATTENING), Packing::Tight);
        assert_eq!(block_packing(ALIGNED_PACKING - 1), Packing::Tight);
        assert_eq!(block_packing(ALIGNED_PACKING), Packing::Aligned);
        assert_eq!(block_packing(LATEST), Packing::Aligned);
        assert_eq!(biome_packing(LATEST), Packing::Tight);
    }

    #[test]
    fn biome_layout_cutover() {
        assert!(!has_3d_biomes(BIOMES_3D - 1));
        assert!(has_3d_biomes(BIOMES_3D));
    }
}
