//! Region files group 32x32 chunks. The file starts with a table of sector locations and a
//! table of timestamps, one 4 KiB sector each, followed by the compressed chunk payloads.

use std::{
    io::{Cursor, Seek, SeekFrom, Write},
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use rayon::prelude::*;
use strata_config::codec_config;
use strata_nbt::{
    nbt_compress::{read_gzip_compound_tag, read_zlib_compound_tag, write_zlib_compound_tag},
    Nbt, NbtCompound,
};
use strata_util::math::{ceil_log2, vector2::Vector2};
use tokio_util::sync::CancellationToken;

use crate::data_version::{DataVersion, ANVIL, MCREGION};

use super::{
    Chunk, ChunkParsingError, ChunkPayload, ChunkReadingError, ChunkWritingError,
    CompressionError,
};

/// The side size of a region in chunks (one region is 32x32 chunks)
pub const REGION_SIZE: usize = 32;

/// The number of bits that identify two chunks in the same region
pub const SUBREGION_BITS: u8 = ceil_log2(REGION_SIZE as u32);

pub const SUBREGION_AND: i32 = i32::pow(2, SUBREGION_BITS as u32) - 1;

/// The number of chunks in a region
pub const CHUNK_COUNT: usize = REGION_SIZE * REGION_SIZE;

/// The number of bytes in a sector (4 KiB)
pub const SECTOR_BYTES: usize = 4096;

/// Location and timestamp tables
const HEADER_BYTES: usize = SECTOR_BYTES * 2;

/// The sector count of a location is a single byte
const MAX_SECTORS: usize = u8::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Compression {
    /// GZip Compression
    GZip = 1,
    /// ZLib Compression
    ZLib = 2,
}

impl Compression {
    const GZIP_ID: u8 = 1;
    const ZLIB_ID: u8 = 2;
    const NO_COMPRESSION_ID: u8 = 3;

    /// `None` for uncompressed payloads.
    pub fn from_byte(byte: u8) -> Result<Option<Self>, CompressionError> {
        match byte {
            Self::GZIP_ID => Ok(Some(Self::GZip)),
            Self::ZLIB_ID => Ok(Some(Self::ZLib)),
            // Uncompressed (since a version before 1.15.1)
            Self::NO_COMPRESSION_ID => Ok(None),
            // Unknown format
            byte => Err(CompressionError::UnknownCompression(byte)),
        }
    }

    fn read_compound(&self, data: &[u8]) -> Result<NbtCompound, ChunkReadingError> {
        let result = match self {
            Self::GZip => read_gzip_compound_tag(data),
            Self::ZLib => read_zlib_compound_tag(data),
        };
        result.map_err(|err| match err {
            strata_nbt::Error::Io(err) => ChunkReadingError::Compression(match self {
                Self::GZip => CompressionError::GZipError(err),
                Self::ZLib => CompressionError::ZlibError(err),
            }),
            err => ChunkReadingError::ParsingError(ChunkParsingError::Nbt(err)),
        })
    }
}

/// One slot of a region file, still compressed.
#[derive(Debug, Clone)]
struct RegionChunkData {
    compression: Option<Compression>,
    // Length is always the length of this + compression byte (1) so we dont need to save a length
    compressed_data: Bytes,
}

impl RegionChunkData {
    /// Raw size of serialized chunk
    #[inline]
    fn raw_write_size(&self) -> usize {
        // 4 bytes for the *length* and 1 byte for the *compression* method
        self.compressed_data.len() + 4 + 1
    }

    /// Size of serialized chunk with padding
    #[inline]
    fn padded_size(&self) -> usize {
        self.sector_count() * SECTOR_BYTES
    }

    #[inline]
    fn sector_count(&self) -> usize {
        self.raw_write_size().div_ceil(SECTOR_BYTES)
    }

    fn from_bytes(mut bytes: Bytes) -> Result<Self, ChunkReadingError> {
        if bytes.remaining() < 5 {
            return Err(ChunkReadingError::ParsingError(
                ChunkParsingError::ErrorDeserializingChunk("Slot has no payload header".into()),
            ));
        }
        let length = bytes.get_u32() as usize;
        if length == 0 {
            return Err(ChunkReadingError::ParsingError(
                ChunkParsingError::ErrorDeserializingChunk("Payload length is zero".into()),
            ));
        }
        // Minus one for the compression byte
        let length = length - 1;
        let compression_method = bytes.get_u8();

        if length > bytes.len() {
            return Err(ChunkReadingError::ParsingError(
                ChunkParsingError::ErrorDeserializingChunk(format!(
                    "Chunk length is greater than available bytes ({} vs {})",
                    length,
                    bytes.len()
                )),
            ));
        }

        let compression =
            Compression::from_byte(compression_method).map_err(ChunkReadingError::Compression)?;

        Ok(Self {
            compression,
            // If this has padding, we need to trim it
            compressed_data: bytes.slice(..length),
        })
    }

    fn write(&self, w: &mut impl Write) -> Result<(), std::io::Error> {
        let mut header = [0u8; 5];
        header[..4].copy_from_slice(&((self.compressed_data.len() + 1) as u32).to_be_bytes());
        header[4] = self
            .compression
            .map_or(Compression::NO_COMPRESSION_ID, |c| c as u8);
        w.write_all(&header)?;
        w.write_all(&self.compressed_data)?;
        w.write_all(&vec![0u8; self.padded_size() - self.raw_write_size()])
    }

    fn to_payload<D: ChunkPayload>(&self, hint: Option<DataVersion>) -> Result<D, ChunkReadingError> {
        let nbt = match self.compression {
            Some(compression) => compression.read_compound(&self.compressed_data)?,
            None => {
                Nbt::read_from_slice(&self.compressed_data)
                    .map_err(|err| ChunkReadingError::ParsingError(err.into()))?
                    .root_tag
            }
        };
        D::parse(&nbt, hint).map_err(ChunkReadingError::ParsingError)
    }

    fn from_payload<D: ChunkPayload>(payload: &D, level: u32) -> Result<Self, ChunkWritingError> {
        let nbt = payload
            .serialize()
            .map_err(ChunkWritingError::ChunkSerializingError)?;

        // We need to buffer here anyway to know the sector count
        let mut compressed_data = Vec::new();
        write_zlib_compound_tag(&nbt, &mut compressed_data, level).map_err(|err| match err {
            strata_nbt::Error::Io(err) => {
                ChunkWritingError::Compression(CompressionError::ZlibError(err))
            }
            err => ChunkWritingError::ChunkSerializingError(err.into()),
        })?;

        Ok(Self {
            compression: Some(Compression::ZLib),
            compressed_data: compressed_data.into(),
        })
    }
}

/// Where a slot lives in the file, in sectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotLocation {
    pub sector_offset: u32,
    pub sector_count: u8,
}

impl SlotLocation {
    fn from_u32(location: u32) -> Self {
        Self {
            sector_offset: location >> 8,
            sector_count: (location & 0xFF) as u8,
        }
    }

    fn to_u32(self) -> u32 {
        (self.sector_offset << 8) | self.sector_count as u32
    }

    /// A slot with a zero offset or count holds no chunk.
    pub fn is_empty(&self) -> bool {
        self.sector_offset == 0 || self.sector_count == 0
    }
}

/// The layout a region file name announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionFileFormat {
    /// `.mcr`, chunks without a data version
    McRegion,
    /// `.mca`
    Anvil,
}

impl RegionFileFormat {
    /// Version a caller may pass as hint for chunks that do not store one. Region reads never
    /// apply it on their own.
    pub const fn default_hint(&self) -> DataVersion {
        match self {
            Self::McRegion => MCREGION,
            Self::Anvil => ANVIL,
        }
    }
}

/// A parsed `r.<x>.<z>.mca` or `r.<x>.<z>.mcr` file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionFileName {
    pub position: Vector2<i32>,
    pub format: RegionFileFormat,
}

impl RegionFileName {
    pub fn parse(name: &str) -> Result<Self, ChunkReadingError> {
        let invalid = || ChunkReadingError::InvalidFileName(name.to_string());
        let mut parts = name.split('.');
        let (Some("r"), Some(x), Some(z), Some(extension), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(invalid());
        };
        let format = match extension {
            "mca" => RegionFileFormat::Anvil,
            "mcr" => RegionFileFormat::McRegion,
            _ => return Err(invalid()),
        };
        Ok(Self {
            position: Vector2::new(
                x.parse().map_err(|_| invalid())?,
                z.parse().map_err(|_| invalid())?,
            ),
            format,
        })
    }
}

pub const fn get_region_coords(at: &Vector2<i32>) -> Vector2<i32> {
    // Divide by 32 for the region coordinates
    Vector2::new(at.x >> SUBREGION_BITS, at.z >> SUBREGION_BITS)
}

pub const fn get_chunk_index(pos: &Vector2<i32>) -> usize {
    let local_x = pos.x & SUBREGION_AND;
    let local_z = pos.z & SUBREGION_AND;
    let index = (local_z << SUBREGION_BITS) + local_x;
    index as usize
}

/// Chunk coordinates of a slot.
pub const fn chunk_position(region: &Vector2<i32>, index: usize) -> Vector2<i32> {
    Vector2::new(
        (region.x << SUBREGION_BITS) + (index as i32 & SUBREGION_AND),
        (region.z << SUBREGION_BITS) + (index as i32 >> SUBREGION_BITS),
    )
}

fn epoch_seconds() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs() as u32)
}

/// A region read from disk together with the slots that could not be loaded.
#[derive(Debug)]
pub struct RegionLoad<D: ChunkPayload = Chunk> {
    pub region: Region<D>,
    pub errors: Vec<(usize, ChunkReadingError)>,
}

/// An in memory region. Slots are indexed `z * 32 + x` by chunk position in the region.
#[derive(Debug)]
pub struct Region<D: ChunkPayload = Chunk> {
    pub position: Vector2<i32>,
    chunks: Box<[Option<D>]>,
    timestamps: Box<[u32]>,
    locations: Box<[SlotLocation]>,
}

impl<D: ChunkPayload> Region<D> {
    pub fn new(position: Vector2<i32>) -> Self {
        Self {
            position,
            chunks: std::iter::repeat_with(|| None).take(CHUNK_COUNT).collect(),
            timestamps: vec![0; CHUNK_COUNT].into_boxed_slice(),
            locations: vec![SlotLocation::default(); CHUNK_COUNT].into_boxed_slice(),
        }
    }

    pub fn get(&self, position: &Vector2<i32>) -> Option<&D> {
        if get_region_coords(position) != self.position {
            return None;
        }
        self.chunks[get_chunk_index(position)].as_ref()
    }

    pub fn get_mut(&mut self, position: &Vector2<i32>) -> Option<&mut D> {
        if get_region_coords(position) != self.position {
            return None;
        }
        self.chunks[get_chunk_index(position)].as_mut()
    }

    /// Stores a payload in the slot of its position, returning the previous one.
    pub fn insert(&mut self, payload: D) -> Result<Option<D>, ChunkWritingError> {
        let chunk = payload.position();
        let region = get_region_coords(&chunk);
        if region != self.position {
            return Err(ChunkWritingError::WrongRegion {
                chunk,
                region: self.position,
            });
        }
        Ok(self.chunks[get_chunk_index(&chunk)].replace(payload))
    }

    pub fn remove(&mut self, position: &Vector2<i32>) -> Option<D> {
        if get_region_coords(position) != self.position {
            return None;
        }
        let index = get_chunk_index(position);
        self.timestamps[index] = 0;
        self.chunks[index].take()
    }

    /// Present payloads with their slot index.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &D)> {
        self.chunks
            .iter()
            .enumerate()
            .filter_map(|(index, chunk)| chunk.as_ref().map(|chunk| (index, chunk)))
    }

    pub fn len(&self) -> usize {
        self.chunks.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.iter().all(Option::is_none)
    }

    /// Last modification time of a slot, in epoch seconds.
    pub fn timestamp(&self, index: usize) -> u32 {
        self.timestamps[index]
    }

    /// Location of a slot in the last file read or written.
    pub fn location(&self, index: usize) -> SlotLocation {
        self.locations[index]
    }

    /// Parses a whole region file. Slots that fail are reported in [`RegionLoad::errors`]
    /// while the other slots still load.
    pub fn from_bytes(
        bytes: Bytes,
        position: Vector2<i32>,
        hint: Option<DataVersion>,
        cancel: &CancellationToken,
    ) -> Result<RegionLoad<D>, ChunkReadingError> {
        let mut region = Self::new(position);
        if bytes.is_empty() {
            log::debug!("Region {position} is empty");
            return Ok(RegionLoad {
                region,
                errors: Vec::new(),
            });
        }
        if bytes.len() < HEADER_BYTES {
            return Err(ChunkReadingError::InvalidHeader);
        }

        let (mut location_bytes, mut timestamp_bytes) = bytes[..HEADER_BYTES].split_at(SECTOR_BYTES);
        let mut errors = Vec::new();
        let mut slots = Vec::new();
        for index in 0..CHUNK_COUNT {
            let location = SlotLocation::from_u32(location_bytes.get_u32());
            region.timestamps[index] = timestamp_bytes.get_u32();
            region.locations[index] = location;

            // If the sector offset or count is 0, the chunk is not present
            if location.is_empty() {
                continue;
            }

            let start = location.sector_offset as usize * SECTOR_BYTES;
            let end = start + location.sector_count as usize * SECTOR_BYTES;
            let reason = if start < HEADER_BYTES {
                Some(format!("sector {} overlaps the header", location.sector_offset))
            } else if end > bytes.len() {
                Some(format!(
                    "sectors {}..{} end past the file ({} bytes)",
                    location.sector_offset,
                    location.sector_offset + location.sector_count as u32,
                    bytes.len()
                ))
            } else {
                None
            };
            match reason {
                Some(reason) => {
                    log::warn!("Skipping slot {index} of region {position}: {reason}");
                    errors.push((index, ChunkReadingError::SlotCorruption { index, reason }));
                }
                None => slots.push((index, bytes.slice(start..end))),
            }
        }

        let decode = |(index, slot): (usize, Bytes)| {
            if cancel.is_cancelled() {
                return (index, Err(ChunkReadingError::Cancelled));
            }
            log::trace!("Decoding slot {index} of region {position}");
            let payload =
                RegionChunkData::from_bytes(slot).and_then(|data| data.to_payload::<D>(hint));
            (index, payload)
        };
        let decoded: Vec<(usize, Result<D, ChunkReadingError>)> =
            if codec_config().region.parallel {
                slots.into_par_iter().map(&decode).collect()
            } else {
                slots.into_iter().map(&decode).collect()
            };

        if cancel.is_cancelled() {
            return Err(ChunkReadingError::Cancelled);
        }

        for (index, payload) in decoded {
            match payload {
                Ok(payload) => {
                    let expected = chunk_position(&position, index);
                    if payload.position() != expected {
                        log::warn!(
                            "Slot {index} of region {position} holds chunk {} instead of {expected}",
                            payload.position()
                        );
                    }
                    region.chunks[index] = Some(payload);
                }
                Err(err) => {
                    log::warn!("Failed to load slot {index} of region {position}: {err}");
                    errors.push((index, err));
                }
            }
        }
        errors.sort_by_key(|(index, _)| *index);

        Ok(RegionLoad { region, errors })
    }

    /// Compresses every present slot, then writes them in slot order after the header and
    /// finally the tables. Nothing is written when a slot fails or the token is cancelled.
    pub fn write_to<W: Write + Seek>(
        &mut self,
        mut writer: W,
        cancel: &CancellationToken,
    ) -> Result<(), ChunkWritingError> {
        let config = codec_config();
        let level = config.chunk.compression.level;
        let present: Vec<(usize, &D)> = self.iter().collect();

        let encode = |(index, payload): (usize, &D)| {
            if cancel.is_cancelled() {
                return (index, Err(ChunkWritingError::Cancelled));
            }
            (index, RegionChunkData::from_payload(payload, level))
        };
        let encoded: Vec<(usize, Result<RegionChunkData, ChunkWritingError>)> =
            if config.region.parallel {
                present.into_par_iter().map(&encode).collect()
            } else {
                present.into_iter().map(&encode).collect()
            };

        if cancel.is_cancelled() {
            return Err(ChunkWritingError::Cancelled);
        }

        let mut slots = Vec::with_capacity(encoded.len());
        for (index, data) in encoded {
            let data = data?;
            let sectors = data.sector_count();
            if sectors > MAX_SECTORS {
                return Err(ChunkWritingError::TooLarge { index, sectors });
            }
            slots.push((index, data));
        }

        let io_err = |err: std::io::Error| ChunkWritingError::IoError(err.kind());
        writer.seek(SeekFrom::Start(0)).map_err(io_err)?;
        // Reserve the tables, they are filled in once every offset is known
        writer.write_all(&[0u8; HEADER_BYTES]).map_err(io_err)?;

        let mut locations = vec![SlotLocation::default(); CHUNK_COUNT];
        let stamp = config.region.stamp_written_chunks.then(epoch_seconds);
        // The first two sectors are reserved for the location table
        let mut current_sector = 2u32;
        for (index, data) in &slots {
            let location = SlotLocation {
                sector_offset: current_sector,
                sector_count: data.sector_count() as u8,
            };
            log::trace!(
                "Writing chunk {} - {}:{}",
                index,
                location.sector_offset,
                location.sector_count
            );
            data.write(&mut writer).map_err(io_err)?;
            current_sector += location.sector_count as u32;
            locations[*index] = location;
            if let Some(stamp) = stamp {
                self.timestamps[*index] = stamp;
            }
        }

        let mut header = BytesMut::with_capacity(HEADER_BYTES);
        for location in &locations {
            header.put_u32(location.to_u32());
        }
        for (index, timestamp) in self.timestamps.iter().enumerate() {
            // Empty slots keep no timestamp
            header.put_u32(if locations[index].is_empty() { 0 } else { *timestamp });
        }
        writer.seek(SeekFrom::Start(0)).map_err(io_err)?;
        writer.write_all(&header).map_err(io_err)?;
        writer.flush().map_err(io_err)?;

        self.locations = locations.into_boxed_slice();
        Ok(())
    }

    pub fn to_bytes(&mut self, cancel: &CancellationToken) -> Result<Vec<u8>, ChunkWritingError> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_to(&mut cursor, cancel)?;
        Ok(cursor.into_inner())
    }
}

impl<D: ChunkPayload> Region<D> {
    /// Reads a region file named `r.<x>.<z>.mca` or `.mcr`. The name only gives the region
    /// position, chunks lacking a data version need the caller's hint.
    pub async fn read_file(
        path: &Path,
        hint: Option<DataVersion>,
        cancel: &CancellationToken,
    ) -> Result<RegionLoad<D>, ChunkReadingError> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ChunkReadingError::InvalidFileName(path.display().to_string()))?;
        let file_name = RegionFileName::parse(name)?;

        log::trace!("Reading region file {:?}", path);
        let bytes = tokio::fs::read(path).await.map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => ChunkReadingError::ChunkNotExist,
            kind => ChunkReadingError::IoError(kind),
        })?;

        Self::from_bytes(
            Bytes::from(bytes),
            file_name.position,
            hint,
            cancel,
        )
    }

    pub async fn write_file(
        &mut self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), ChunkWritingError> {
        let bytes = self.to_bytes(cancel)?;

        // We use tmp files to avoid corruption of the data if the process is abruptly interrupted.
        let tmp_path = path.with_extension("tmp");
        log::trace!("Writing tmp file to disk: {:?}", tmp_path);
        tokio::fs::write(&tmp_path, bytes)
            .await
            .map_err(|err| ChunkWritingError::IoError(err.kind()))?;

        // The rename of the file works like an atomic operation ensuring
        // that the data is not corrupted before the rename is completed
        tokio::fs::rename(&tmp_path, path)
            .await
            .map_err(|err| ChunkWritingError::IoError(err.kind()))?;

        log::trace!("Wrote file to Disk: {:?}", path);
        Ok(())
    }
}
