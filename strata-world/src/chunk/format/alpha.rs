//! Alpha worlds keep every chunk in its own GZip file, spread over two levels of
//! directories named after the chunk coordinates modulo 64.

use std::path::{Path, PathBuf};

use strata_config::codec_config;
use strata_nbt::nbt_compress::{read_gzip_compound_tag, write_gzip_compound_tag_with_level};
use strata_util::{base36, math::floor_mod, math::vector2::Vector2};

use crate::{
    chunk::{Chunk, ChunkParsingError, ChunkReadingError, ChunkWritingError, CompressionError},
    data_version::MCREGION,
};

/// `<base36(x mod 64)>/<base36(z mod 64)>/c.<base36(x)>.<base36(z)>.dat` under the world root.
pub fn alpha_chunk_path(root: &Path, position: Vector2<i32>) -> PathBuf {
    let x = position.x as i64;
    let z = position.z as i64;
    root.join(base36::encode(floor_mod(x, 64)))
        .join(base36::encode(floor_mod(z, 64)))
        .join(format!("c.{}.{}.dat", base36::encode(x), base36::encode(z)))
}

/// Decodes a GZipped chunk file. Alpha chunks share the McRegion layout.
pub fn read_alpha_chunk(bytes: &[u8]) -> Result<Chunk, ChunkReadingError> {
    let nbt = read_gzip_compound_tag(bytes).map_err(|err| match err {
        strata_nbt::Error::Io(err) => ChunkReadingError::Compression(CompressionError::GZipError(err)),
        err => ChunkReadingError::ParsingError(ChunkParsingError::Nbt(err)),
    })?;
    Chunk::from_nbt(&nbt, Some(MCREGION)).map_err(ChunkReadingError::ParsingError)
}

pub fn write_alpha_chunk(chunk: &Chunk) -> Result<Vec<u8>, ChunkWritingError> {
    let nbt = chunk
        .to_nbt_as(MCREGION)
        .map_err(ChunkWritingError::ChunkSerializingError)?;
    let mut bytes = Vec::new();
    write_gzip_compound_tag_with_level(&nbt, &mut bytes, codec_config().chunk.compression.level)
        .map_err(|err| match err {
            strata_nbt::Error::Io(err) => {
                ChunkWritingError::Compression(CompressionError::GZipError(err))
            }
            err => ChunkWritingError::ChunkSerializingError(err.into()),
        })?;
    Ok(bytes)
}

pub async fn load_alpha_chunk(
    root: &Path,
    position: Vector2<i32>,
) -> Result<Chunk, ChunkReadingError> {
    let path = alpha_chunk_path(root, position);
    log::trace!("Reading alpha chunk {:?}", path);
    let bytes = tokio::fs::read(&path).await.map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => ChunkReadingError::ChunkNotExist,
        kind => ChunkReadingError::IoError(kind),
    })?;
    read_alpha_chunk(&bytes)
}

pub async fn save_alpha_chunk(root: &Path, chunk: &Chunk) -> Result<(), ChunkWritingError> {
    let path = alpha_chunk_path(root, chunk.position);
    let bytes = write_alpha_chunk(chunk)?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|err| ChunkWritingError::IoError(err.kind()))?;
    }
    let tmp_path = path.with_extension("tmp");
    log::trace!("Writing tmp file to disk: {:?}", tmp_path);
    tokio::fs::write(&tmp_path, bytes)
        .await
        .map_err(|err| ChunkWritingError::IoError(err.kind()))?;
    // The rename of the file works like an atomic operation ensuring
    // that the data is not corrupted before the rename is completed
    tokio::fs::rename(&tmp_path, &path)
        .await
        .map_err(|err| ChunkWritingError::IoError(err.kind()))?;
    log::trace!("Wrote file to Disk: {:?}", path);
    Ok(())
}
