//! Reading and writing of Minecraft chunks across the on-disk format generations, and of the
//! region files that hold them.

pub mod biome;
pub mod block;
pub mod chunk;
pub mod data_version;
pub mod entity;

pub use chunk::{
    format::{
        alpha::{load_alpha_chunk, save_alpha_chunk},
        ChunkFormat,
    },
    region::{Region, RegionFileName, RegionLoad},
    Chunk, ChunkEntityData, ChunkPayload, ChunkReadingError, ChunkWritingError,
};
pub use data_version::DataVersion;
