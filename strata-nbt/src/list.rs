use std::io::{Read, Write};
use std::slice::Iter;

use crate::deserializer::ReadAdaptor;
use crate::serializer::WriteAdaptor;
use crate::tag::NbtTag;
use crate::{Error, END_ID, LONG_ARRAY_ID};

/// Homogeneous list of unnamed tags. The element id is fixed by the first pushed value,
/// an empty list declares `End`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NbtList {
    element_id: u8,
    items: Vec<NbtTag>,
}

impl NbtList {
    pub fn new() -> Self {
        Self {
            element_id: END_ID,
            items: Vec::new(),
        }
    }

    /// Creates an empty list that will only accept tags with `element_id`.
    pub fn of_type(element_id: u8) -> Self {
        Self {
            element_id,
            items: Vec::new(),
        }
    }

    /// Caller guarantees every item has `element_id`.
    pub(crate) fn from_parts(element_id: u8, items: Vec<NbtTag>) -> Self {
        debug_assert!(items.iter().all(|tag| tag.get_type_id() == element_id));
        Self { element_id, items }
    }

    pub fn element_id(&self) -> u8 {
        self.element_id
    }

    pub fn push(&mut self, tag: NbtTag) -> Result<(), Error> {
        let id = tag.get_type_id();
        if self.items.is_empty() && self.element_id == END_ID {
            self.element_id = id;
        } else if id != self.element_id {
            return Err(Error::HeterogeneousList {
                expected: self.element_id,
                found: id,
            });
        }
        self.items.push(tag);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&NbtTag> {
        self.items.get(index)
    }

    pub fn iter(&self) -> Iter<'_, NbtTag> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[NbtTag] {
        &self.items
    }

    pub fn serialize_content<W>(&self, w: &mut WriteAdaptor<W>) -> Result<(), Error>
    where
        W: Write,
    {
        w.write_u8_be(self.element_id())?;
        w.write_length(self.items.len())?;
        for tag in &self.items {
            tag.serialize_data(w)?;
        }
        Ok(())
    }

    pub fn deserialize_content<R>(reader: &mut ReadAdaptor<R>) -> Result<NbtList, Error>
    where
        R: Read,
    {
        reader.enter()?;
        let element_id = reader.get_u8_be()?;
        let len = reader.get_length()?;
        check_element_id(element_id, len)?;

        let mut items = Vec::with_capacity(len.min(1024));
        if element_id != END_ID {
            for _ in 0..len {
                items.push(NbtTag::deserialize_data(reader, element_id)?);
            }
        }
        reader.leave();

        Ok(NbtList { element_id, items })
    }

    pub fn skip_content<R>(reader: &mut ReadAdaptor<R>) -> Result<(), Error>
    where
        R: Read,
    {
        reader.enter()?;
        let element_id = reader.get_u8_be()?;
        let len = reader.get_length()?;
        check_element_id(element_id, len)?;
        if element_id != END_ID {
            for _ in 0..len {
                NbtTag::skip_data(reader, element_id)?;
            }
        }
        reader.leave();
        Ok(())
    }
}

/// Only empty lists may declare `End` as their element type.
fn check_element_id(element_id: u8, len: usize) -> Result<(), Error> {
    match element_id {
        END_ID if len > 0 => Err(Error::UnknownTag(END_ID)),
        END_ID..=LONG_ARRAY_ID => Ok(()),
        _ => Err(Error::UnknownTag(element_id)),
    }
}

impl TryFrom<Vec<NbtTag>> for NbtList {
    type Error = Error;

    fn try_from(tags: Vec<NbtTag>) -> Result<Self, Self::Error> {
        let mut list = NbtList::new();
        for tag in tags {
            list.push(tag)?;
        }
        Ok(list)
    }
}

impl<'a> IntoIterator for &'a NbtList {
    type Item = &'a NbtTag;
    type IntoIter = Iter<'a, NbtTag>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl IntoIterator for NbtList {
    type Item = NbtTag;
    type IntoIter = std::vec::IntoIter<NbtTag>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
