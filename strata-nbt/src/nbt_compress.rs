//! Compressed envelopes around a named root compound. GZip is used for whole-file
//! artifacts, Zlib for region payloads.

use std::io::{Read, Write};

use flate2::{
    read::{GzDecoder, ZlibDecoder},
    write::{GzEncoder, ZlibEncoder},
    Compression,
};

use crate::{deserializer::ReadAdaptor, Error, Nbt, NbtCompound};

/// Reads a GZipped NBT compound tag from any reader.
pub fn read_gzip_compound_tag(input: impl Read) -> Result<NbtCompound, Error> {
    let mut reader = ReadAdaptor::new(GzDecoder::new(input));
    Ok(Nbt::read(&mut reader)?.root_tag)
}

/// Writes an NBT compound tag with GZip compression at the default level.
pub fn write_gzip_compound_tag(compound: &NbtCompound, output: impl Write) -> Result<(), Error> {
    write_gzip_compound_tag_with_level(compound, output, Compression::default().level())
}

pub fn write_gzip_compound_tag_with_level(
    compound: &NbtCompound,
    output: impl Write,
    level: u32,
) -> Result<(), Error> {
    let mut encoder = GzEncoder::new(output, Compression::new(level));
    write_root(compound, &mut encoder)?;
    encoder.finish()?;
    Ok(())
}

/// Convenience function that returns compressed bytes
pub fn write_gzip_compound_tag_to_bytes(compound: &NbtCompound) -> Result<Vec<u8>, Error> {
    let mut buffer = Vec::new();
    write_gzip_compound_tag(compound, &mut buffer)?;
    Ok(buffer)
}

pub fn read_zlib_compound_tag(input: impl Read) -> Result<NbtCompound, Error> {
    let mut reader = ReadAdaptor::new(ZlibDecoder::new(input));
    Ok(Nbt::read(&mut reader)?.root_tag)
}

pub fn write_zlib_compound_tag(
    compound: &NbtCompound,
    output: impl Write,
    level: u32,
) -> Result<(), Error> {
    let mut encoder = ZlibEncoder::new(output, Compression::new(level));
    write_root(compound, &mut encoder)?;
    encoder.finish()?;
    Ok(())
}

fn write_root(compound: &NbtCompound, output: impl Write) -> Result<(), Error> {
    // Root names are always empty on disk
    let nbt = Nbt::new(String::new(), compound.clone());
    nbt.write_to_writer(output)
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::Cursor;

    use crate::{
        nbt_compress::{
            read_gzip_compound_tag, read_zlib_compound_tag, write_gzip_compound_tag,
            write_gzip_compound_tag_to_bytes, write_zlib_compound_tag,
        },
        Error, NbtCompound,
    };

    fn sample() -> NbtCompound {
        let mut compound = NbtCompound::new();
        compound.put_byte("byte_value", 123);
        compound.put_short("short_value", 12345);
        compound.put_int("int_value", 1234567);
        compound.put_long("long_value", 123456789);
        compound.put_float("float_value", 123.456);
        compound.put_double("double_value", 123456.789);
        compound.put_bool("bool_value", true);
        compound.put_string("string_value", "test string".to_string());

        let mut nested = NbtCompound::new();
        nested.put_int("nested_int", 42);
        compound.put_compound("nested_compound", nested);
        compound
    }

    #[test]
    fn test_gzip_read_write_compound() {
        let compound = sample();
        let mut buffer = Vec::new();
        write_gzip_compound_tag(&compound, &mut buffer).expect("Failed to compress compound");

        let read_compound =
            read_gzip_compound_tag(Cursor::new(&buffer)).expect("Failed to decompress compound");
        assert_eq!(read_compound, compound);
        assert_eq!(
            read_compound
                .get_compound("nested_compound")
                .and_then(|nested| nested.get_int("nested_int")),
            Some(42)
        );
    }

    #[test]
    fn test_zlib_levels() {
        let mut compound = NbtCompound::new();
        for i in 0..1000 {
            compound.put_int(&format!("value_{i}"), i % 4);
        }

        let mut fast = Vec::new();
        write_zlib_compound_tag(&compound, &mut fast, 0).unwrap();
        let mut small = Vec::new();
        write_zlib_compound_tag(&compound, &mut small, 9).unwrap();
        assert!(small.len() < fast.len());

        let read_compound = read_zlib_compound_tag(&small[..]).unwrap();
        assert_eq!(read_compound.len(), 1000);
        assert_eq!(read_compound.get_int("value_999"), Some(3));
    }

    #[test]
    fn test_gzip_empty_compound() {
        let buffer = write_gzip_compound_tag_to_bytes(&NbtCompound::new())
            .expect("Failed to compress empty compound");
        let read_compound = read_gzip_compound_tag(Cursor::new(buffer))
            .expect("Failed to decompress empty compound");
        assert!(read_compound.is_empty());
    }

    #[test]
    fn test_gzip_invalid_data() {
        let invalid_data = vec![1, 2, 3, 4, 5];
        let result = read_gzip_compound_tag(Cursor::new(invalid_data));
        assert!(matches!(result, Err(Error::Io(_)) | Err(Error::UnexpectedEndOfData)));
    }

    #[test]
    fn test_direct_file_io() {
        use tempfile::tempdir;

        let temp_dir = tempdir().expect("Failed to create temporary directory");
        let file_path = temp_dir.path().join("c.0.0.dat");

        let file = File::create(&file_path).expect("Failed to create temp file");
        write_gzip_compound_tag(&sample(), file).expect("Failed to write compound to file");

        let file = File::open(&file_path).expect("Failed to open temp file");
        let read_compound =
            read_gzip_compound_tag(file).expect("Failed to read compound from file");
        assert_eq!(read_compound, sample());
    }
}
