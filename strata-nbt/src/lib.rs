use std::{
    io::{self, Read, Write},
    ops::Deref,
};

use bytes::Bytes;
use thiserror::Error;

pub mod compound;
pub mod convert;
pub mod deserializer;
pub mod list;
pub mod nbt_compress;
pub mod serializer;
pub mod tag;

pub use compound::NbtCompound;
pub use convert::{FromNbt, ToNbt};
pub use deserializer::{get_nbt_string, ReadAdaptor};
pub use list::NbtList;
pub use serializer::{write_nbt_string, WriteAdaptor};
pub use tag::NbtTag;

pub const END_ID: u8 = 0x00;
pub const BYTE_ID: u8 = 0x01;
pub const SHORT_ID: u8 = 0x02;
pub const INT_ID: u8 = 0x03;
pub const LONG_ID: u8 = 0x04;
pub const FLOAT_ID: u8 = 0x05;
pub const DOUBLE_ID: u8 = 0x06;
pub const BYTE_ARRAY_ID: u8 = 0x07;
pub const STRING_ID: u8 = 0x08;
pub const LIST_ID: u8 = 0x09;
pub const COMPOUND_ID: u8 = 0x0A;
pub const INT_ARRAY_ID: u8 = 0x0B;
pub const LONG_ARRAY_ID: u8 = 0x0C;

/// Longest string payload, in encoded bytes, that will be written.
pub const MAX_STRING_LEN: usize = 32767;
/// Nesting limit for compounds and lists while reading.
pub const MAX_DEPTH: usize = 512;

/// Human readable tag name, used in error messages.
pub const fn tag_name(id: u8) -> &'static str {
    match id {
        END_ID => "End",
        BYTE_ID => "Byte",
        SHORT_ID => "Short",
        INT_ID => "Int",
        LONG_ID => "Long",
        FLOAT_ID => "Float",
        DOUBLE_ID => "Double",
        BYTE_ARRAY_ID => "ByteArray",
        STRING_ID => "String",
        LIST_ID => "List",
        COMPOUND_ID => "Compound",
        INT_ARRAY_ID => "IntArray",
        LONG_ARRAY_ID => "LongArray",
        _ => "Unknown",
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("NBT data ended unexpectedly")]
    UnexpectedEndOfData,
    #[error("Encountered an unknown NBT tag id {0}.")]
    UnknownTag(u8),
    #[error("I/O error while handling NBT: {0}")]
    Io(io::Error),
    #[error("The root tag of the NBT file is not a compound tag. Received tag id: {0}")]
    NoRootCompound(u8),
    #[error("Negative length {0}")]
    NegativeLength(i32),
    #[error("Length too large {0}")]
    LargeLength(usize),
    #[error("String of {0} bytes exceeds the {MAX_STRING_LEN} byte limit")]
    StringTooLong(usize),
    #[error("String is neither UTF-8 nor Java modified UTF-8")]
    InvalidString,
    #[error("Field {name:?} has tag id {found}, expected {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: u8,
    },
    #[error("Missing field {0:?}")]
    MissingField(String),
    #[error("List of tag id {expected} cannot hold tag id {found}")]
    HeterogeneousList { expected: u8, found: u8 },
    #[error("NBT nesting deeper than {MAX_DEPTH} levels")]
    DepthLimit,
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::UnexpectedEndOfData
        } else {
            Error::Io(err)
        }
    }
}

/// A root compound together with its name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Nbt {
    pub name: String,
    pub root_tag: NbtCompound,
}

impl Nbt {
    pub fn new(name: String, tag: NbtCompound) -> Self {
        Nbt {
            name,
            root_tag: tag,
        }
    }

    pub fn read<R>(reader: &mut ReadAdaptor<R>) -> Result<Nbt, Error>
    where
        R: Read,
    {
        let tag_type_id = reader.get_u8_be()?;

        if tag_type_id != COMPOUND_ID {
            return Err(Error::NoRootCompound(tag_type_id));
        }

        Ok(Nbt {
            name: get_nbt_string(reader)?,
            root_tag: NbtCompound::deserialize_content(reader)?,
        })
    }

    /// Reads a root compound that was written without a name.
    pub fn read_unnamed<R>(reader: &mut ReadAdaptor<R>) -> Result<Nbt, Error>
    where
        R: Read,
    {
        let tag_type_id = reader.get_u8_be()?;

        if tag_type_id != COMPOUND_ID {
            return Err(Error::NoRootCompound(tag_type_id));
        }

        Ok(Nbt {
            name: String::new(),
            root_tag: NbtCompound::deserialize_content(reader)?,
        })
    }

    pub fn read_from_slice(bytes: &[u8]) -> Result<Nbt, Error> {
        Self::read(&mut ReadAdaptor::new(bytes))
    }

    pub fn write(&self) -> Result<Bytes, Error> {
        let mut bytes = Vec::new();
        self.write_to_writer(&mut bytes)?;
        Ok(bytes.into())
    }

    pub fn write_to_writer<W: Write>(&self, writer: W) -> Result<(), Error> {
        let mut writer = WriteAdaptor::new(writer);
        writer.write_u8_be(COMPOUND_ID)?;
        write_nbt_string(&mut writer, &self.name)?;
        self.root_tag.serialize_content(&mut writer)
    }

    /// Writes the root compound without its name.
    pub fn write_unnamed(&self) -> Result<Bytes, Error> {
        let mut bytes = Vec::new();
        self.write_unnamed_to_writer(&mut bytes)?;
        Ok(bytes.into())
    }

    pub fn write_unnamed_to_writer<W: Write>(&self, writer: W) -> Result<(), Error> {
        let mut writer = WriteAdaptor::new(writer);
        writer.write_u8_be(COMPOUND_ID)?;
        self.root_tag.serialize_content(&mut writer)
    }
}

impl Deref for Nbt {
    type Target = NbtCompound;

    fn deref(&self) -> &Self::Target {
        &self.root_tag
    }
}

impl From<NbtCompound> for Nbt {
    fn from(value: NbtCompound) -> Self {
        Nbt::new(String::new(), value)
    }
}

impl AsMut<NbtCompound> for Nbt {
    fn as_mut(&mut self) -> &mut NbtCompound {
        &mut self.root_tag
    }
}
