use std::io::Write;

use crate::{Error, MAX_STRING_LEN};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub struct WriteAdaptor<W: Write> {
    writer: W,
}

impl<W: Write> WriteAdaptor<W> {
    pub fn new(w: W) -> Self {
        Self { writer: w }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

macro_rules! write_be {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            pub fn $name(&mut self, value: $ty) -> Result<()> {
                self.writer.write_all(&value.to_be_bytes())?;
                Ok(())
            }
        )*
    };
}

impl<W: Write> WriteAdaptor<W> {
    write_be! {
        write_u8_be => u8,
        write_i8_be => i8,
        write_u16_be => u16,
        write_i16_be => i16,
        write_u32_be => u32,
        write_i32_be => i32,
        write_i64_be => i64,
        write_f32_be => f32,
        write_f64_be => f64,
    }

    pub fn write_slice(&mut self, value: &[u8]) -> Result<()> {
        self.writer.write_all(value)?;
        Ok(())
    }

    /// Writes an `i32` length prefix.
    pub fn write_length(&mut self, len: usize) -> Result<()> {
        if len > i32::MAX as usize {
            return Err(Error::LargeLength(len));
        }
        self.write_i32_be(len as i32)
    }
}

/// Writes a string in Java's modified UTF-8 behind a `u16` byte length.
pub fn write_nbt_string<W: Write>(w: &mut WriteAdaptor<W>, string: &str) -> Result<()> {
    let java_string = cesu8::to_java_cesu8(string);
    let len = java_string.len();
    if len > MAX_STRING_LEN {
        return Err(Error::StringTooLong(len));
    }

    w.write_u16_be(len as u16)?;
    w.write_slice(&java_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_big_endian() {
        let mut out = Vec::new();
        let mut writer = WriteAdaptor::new(&mut out);
        writer.write_i16_be(-2).unwrap();
        writer.write_u32_be(0x0102_0304).unwrap();
        assert_eq!(out, [0xFF, 0xFE, 1, 2, 3, 4]);
    }

    #[test]
    fn strings_are_length_prefixed() {
        let mut out = Vec::new();
        write_nbt_string(&mut WriteAdaptor::new(&mut out), "ab\0").unwrap();
        assert_eq!(out, [0, 4, b'a', b'b', 0xC0, 0x80]);
    }
}
