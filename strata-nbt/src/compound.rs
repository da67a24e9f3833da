use std::io::{Read, Write};

use indexmap::IndexMap;

use crate::convert::FromNbt;
use crate::deserializer::ReadAdaptor;
use crate::serializer::WriteAdaptor;
use crate::tag::NbtTag;
use crate::{get_nbt_string, write_nbt_string, Error, Nbt, NbtList, END_ID};

/// Named tags in insertion order. Equality ignores order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NbtCompound {
    child_tags: IndexMap<String, NbtTag>,
}

impl NbtCompound {
    pub fn new() -> NbtCompound {
        NbtCompound {
            child_tags: IndexMap::new(),
        }
    }

    pub fn skip_content<R>(reader: &mut ReadAdaptor<R>) -> Result<(), Error>
    where
        R: Read,
    {
        reader.enter()?;
        loop {
            let tag_id = reader.get_u8_be()?;
            if tag_id == END_ID {
                break;
            }

            let len = reader.get_u16_be()?;
            reader.skip_bytes(len as u64)?;

            NbtTag::skip_data(reader, tag_id)?;
        }
        reader.leave();

        Ok(())
    }

    pub fn deserialize_content<R>(reader: &mut ReadAdaptor<R>) -> Result<NbtCompound, Error>
    where
        R: Read,
    {
        reader.enter()?;
        let mut compound = NbtCompound::new();

        loop {
            let tag_id = reader.get_u8_be()?;
            if tag_id == END_ID {
                break;
            }

            let name = get_nbt_string(reader)?;
            let tag = NbtTag::deserialize_data(reader, tag_id)?;
            compound.put(&name, tag);
        }
        reader.leave();

        Ok(compound)
    }

    pub fn serialize_content<W>(&self, w: &mut WriteAdaptor<W>) -> Result<(), Error>
    where
        W: Write,
    {
        for (name, tag) in &self.child_tags {
            w.write_u8_be(tag.get_type_id())?;
            write_nbt_string(w, name)?;
            tag.serialize_data(w)?;
        }
        w.write_u8_be(END_ID)?;
        Ok(())
    }

    /// Inserts or replaces a value. A replaced value keeps its original position.
    pub fn put(&mut self, name: &str, value: impl Into<NbtTag>) {
        if let Some(existing) = self.child_tags.get_mut(name) {
            *existing = value.into();
        } else {
            self.child_tags.insert(name.to_string(), value.into());
        }
    }

    pub fn put_byte(&mut self, name: &str, value: i8) {
        self.put(name, NbtTag::Byte(value));
    }

    pub fn put_bool(&mut self, name: &str, value: bool) {
        self.put(name, NbtTag::Byte(if value { 1 } else { 0 }));
    }

    pub fn put_short(&mut self, name: &str, value: i16) {
        self.put(name, NbtTag::Short(value));
    }

    pub fn put_int(&mut self, name: &str, value: i32) {
        self.put(name, NbtTag::Int(value));
    }

    pub fn put_long(&mut self, name: &str, value: i64) {
        self.put(name, NbtTag::Long(value));
    }

    pub fn put_float(&mut self, name: &str, value: f32) {
        self.put(name, NbtTag::Float(value));
    }

    pub fn put_double(&mut self, name: &str, value: f64) {
        self.put(name, NbtTag::Double(value));
    }

    pub fn put_string(&mut self, name: &str, value: String) {
        self.put(name, NbtTag::String(value));
    }

    pub fn put_byte_array(&mut self, name: &str, value: impl Into<Box<[u8]>>) {
        self.put(name, NbtTag::ByteArray(value.into()));
    }

    pub fn put_int_array(&mut self, name: &str, value: impl Into<Box<[i32]>>) {
        self.put(name, NbtTag::IntArray(value.into()));
    }

    pub fn put_long_array(&mut self, name: &str, value: impl Into<Box<[i64]>>) {
        self.put(name, NbtTag::LongArray(value.into()));
    }

    pub fn put_list(&mut self, name: &str, value: NbtList) {
        self.put(name, NbtTag::List(value));
    }

    pub fn put_compound(&mut self, name: &str, value: NbtCompound) {
        self.put(name, NbtTag::Compound(value));
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&NbtTag> {
        self.child_tags.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut NbtTag> {
        self.child_tags.get_mut(name)
    }

    /// Typed lookup that distinguishes a missing field from one of the wrong type.
    pub fn try_get<T: FromNbt>(&self, name: &str) -> Result<T, Error> {
        let tag = self
            .get(name)
            .ok_or_else(|| Error::MissingField(name.to_string()))?;
        T::from_nbt(tag).ok_or_else(|| Error::TypeMismatch {
            name: name.to_string(),
            expected: T::EXPECTED,
            found: tag.get_type_id(),
        })
    }

    pub fn remove(&mut self, name: &str) -> Option<NbtTag> {
        self.child_tags.shift_remove(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.child_tags.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.child_tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.child_tags.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.child_tags.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &NbtTag)> {
        self.child_tags.iter()
    }

    pub fn get_byte(&self, name: &str) -> Option<i8> {
        self.get(name).and_then(|tag| tag.extract_byte())
    }

    pub fn get_short(&self, name: &str) -> Option<i16> {
        self.get(name).and_then(|tag| tag.extract_short())
    }

    pub fn get_int(&self, name: &str) -> Option<i32> {
        self.get(name).and_then(|tag| tag.extract_int())
    }

    pub fn get_long(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(|tag| tag.extract_long())
    }

    pub fn get_float(&self, name: &str) -> Option<f32> {
        self.get(name).and_then(|tag| tag.extract_float())
    }

    pub fn get_double(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(|tag| tag.extract_double())
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(|tag| tag.extract_bool())
    }

    pub fn get_string(&self, name: &str) -> Option<&String> {
        self.get(name).and_then(|tag| tag.extract_string())
    }

    pub fn get_byte_array(&self, name: &str) -> Option<&[u8]> {
        self.get(name).and_then(|tag| tag.extract_byte_array())
    }

    pub fn get_list(&self, name: &str) -> Option<&NbtList> {
        self.get(name).and_then(|tag| tag.extract_list())
    }

    pub fn get_compound(&self, name: &str) -> Option<&NbtCompound> {
        self.get(name).and_then(|tag| tag.extract_compound())
    }

    pub fn get_int_array(&self, name: &str) -> Option<&[i32]> {
        self.get(name).and_then(|tag| tag.extract_int_array())
    }

    pub fn get_long_array(&self, name: &str) -> Option<&[i64]> {
        self.get(name).and_then(|tag| tag.extract_long_array())
    }
}

impl From<Nbt> for NbtCompound {
    fn from(value: Nbt) -> Self {
        value.root_tag
    }
}

impl FromIterator<(String, NbtTag)> for NbtCompound {
    fn from_iter<T: IntoIterator<Item = (String, NbtTag)>>(iter: T) -> Self {
        let mut compound = NbtCompound::new();
        compound.extend(iter);
        compound
    }
}

impl IntoIterator for NbtCompound {
    type Item = (String, NbtTag);
    type IntoIter = indexmap::map::IntoIter<String, NbtTag>;

    fn into_iter(self) -> Self::IntoIter {
        self.child_tags.into_iter()
    }
}

impl Extend<(String, NbtTag)> for NbtCompound {
    fn extend<T: IntoIterator<Item = (String, NbtTag)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.put(&key, value);
        }
    }
}

// Rust's AsRef is currently not reflexive so we need to implement it manually
impl AsRef<NbtCompound> for NbtCompound {
    fn as_ref(&self) -> &NbtCompound {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{INT_ID, STRING_ID};

    #[test]
    fn put_overwrites_in_place() {
        let mut compound = NbtCompound::new();
        compound.put_int("a", 1);
        compound.put_int("b", 2);
        compound.put_string("a", "one".to_string());
        let keys: Vec<_> = compound.keys().map(String::as_str).collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(compound.get_string("a").map(String::as_str), Some("one"));
        assert_eq!(compound.len(), 2);
    }

    #[test]
    fn equality_ignores_order() {
        let mut first = NbtCompound::new();
        first.put_int("x", 1);
        first.put_string("Name", "minecraft:air".to_string());
        let mut second = NbtCompound::new();
        second.put_string("Name", "minecraft:air".to_string());
        second.put_int("x", 1);
        assert_eq!(first, second);

        second.put_int("x", 2);
        assert_ne!(first, second);
    }

    #[test]
    fn typed_access() {
        let mut compound = NbtCompound::new();
        compound.put_int("n", 7);
        assert_eq!(compound.try_get::<i32>("n").unwrap(), 7);
        assert!(matches!(
            compound.try_get::<String>("n"),
            Err(Error::TypeMismatch {
                expected: "String",
                found: INT_ID,
                ..
            })
        ));
        assert!(matches!(
            compound.try_get::<i32>("missing"),
            Err(Error::MissingField(name)) if name == "missing"
        ));
        compound.put_string("s", "v".to_string());
        assert_eq!(compound.get("s").map(NbtTag::get_type_id), Some(STRING_ID));
    }

    #[test]
    fn remove_keeps_remaining_order() {
        let compound: NbtCompound = [("a", 1), ("b", 2), ("c", 3)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), NbtTag::Int(v)))
            .collect();
        let mut compound = compound;
        assert_eq!(compound.remove("b"), Some(NbtTag::Int(2)));
        let keys: Vec<_> = compound.keys().map(String::as_str).collect();
        assert_eq!(keys, ["a", "c"]);
    }
}
