use std::io::{self, Read};

use crate::{Error, MAX_DEPTH};

pub type Result<T> = std::result::Result<T, Error>;

/// Big-endian primitive reader that also tracks tag nesting depth.
#[derive(Debug)]
pub struct ReadAdaptor<R: Read> {
    reader: R,
    depth: usize,
}

impl<R: Read> ReadAdaptor<R> {
    pub fn new(r: R) -> Self {
        Self {
            reader: r,
            depth: 0,
        }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

macro_rules! read_be {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            pub fn $name(&mut self) -> Result<$ty> {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                self.reader.read_exact(&mut buf)?;
                Ok(<$ty>::from_be_bytes(buf))
            }
        )*
    };
}

impl<R: Read> ReadAdaptor<R> {
    read_be! {
        get_u8_be => u8,
        get_i8_be => i8,
        get_u16_be => u16,
        get_i16_be => i16,
        get_u32_be => u32,
        get_i32_be => i32,
        get_i64_be => i64,
        get_f32_be => f32,
        get_f64_be => f64,
    }

    pub fn skip_bytes(&mut self, count: u64) -> Result<()> {
        let skipped = io::copy(&mut self.reader.by_ref().take(count), &mut io::sink())?;
        if skipped < count {
            return Err(Error::UnexpectedEndOfData);
        }
        Ok(())
    }

    /// Reads exactly `count` bytes. The buffer grows with the data actually present, so a
    /// bogus length prefix cannot force a huge allocation up front.
    pub fn read_boxed_slice(&mut self, count: usize) -> Result<Box<[u8]>> {
        let mut buf = Vec::with_capacity(count.min(64 * 1024));
        self.reader
            .by_ref()
            .take(count as u64)
            .read_to_end(&mut buf)?;
        if buf.len() < count {
            return Err(Error::UnexpectedEndOfData);
        }
        Ok(buf.into())
    }

    /// Reads an `i32` length prefix, rejecting negative values.
    pub fn get_length(&mut self) -> Result<usize> {
        let len = self.get_i32_be()?;
        if len < 0 {
            return Err(Error::NegativeLength(len));
        }
        Ok(len as usize)
    }

    pub(crate) fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(Error::DepthLimit);
        }
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

/// Reads a length-prefixed string. Standard UTF-8 is accepted as is, anything else is
/// decoded as Java's modified UTF-8.
pub fn get_nbt_string<R: Read>(bytes: &mut ReadAdaptor<R>) -> Result<String> {
    let len = bytes.get_u16_be()? as usize;
    let string_bytes = bytes.read_boxed_slice(len)?;
    match std::str::from_utf8(&string_bytes) {
        Ok(string) => Ok(string.to_string()),
        Err(_) => cesu8::from_java_cesu8(&string_bytes)
            .map(|string| string.into_owned())
            .map_err(|_| Error::InvalidString),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian() {
        let data = [0x01, 0x02, 0xFF, 0xFF, 0xFF, 0xFE];
        let mut reader = ReadAdaptor::new(&data[..]);
        assert_eq!(reader.get_u16_be().unwrap(), 0x0102);
        assert_eq!(reader.get_i32_be().unwrap(), -2);
        assert!(matches!(reader.get_u8_be(), Err(Error::UnexpectedEndOfData)));
    }

    #[test]
    fn lengths_must_be_positive() {
        let data = (-5i32).to_be_bytes();
        let mut reader = ReadAdaptor::new(&data[..]);
        assert!(matches!(reader.get_length(), Err(Error::NegativeLength(-5))));
    }

    #[test]
    fn short_slices_and_skips_fail() {
        let data = [1u8, 2, 3];
        let mut reader = ReadAdaptor::new(&data[..]);
        assert!(matches!(
            reader.read_boxed_slice(i32::MAX as usize),
            Err(Error::UnexpectedEndOfData)
        ));
        let mut reader = ReadAdaptor::new(&data[..]);
        assert!(matches!(
            reader.skip_bytes(4),
            Err(Error::UnexpectedEndOfData)
        ));
    }

    #[test]
    fn modified_utf8_strings() {
        // U+0000 is written as C0 80 in Java's encoding
        let data = [0x00, 0x03, b'a', 0xC0, 0x80];
        let mut reader = ReadAdaptor::new(&data[..]);
        assert_eq!(get_nbt_string(&mut reader).unwrap(), "a\0");

        let data = [0x00, 0x01, 0xFF];
        let mut reader = ReadAdaptor::new(&data[..]);
        assert!(matches!(
            get_nbt_string(&mut reader),
            Err(Error::InvalidString)
        ));
    }
}
