//! Explicit conversions between Rust values and tags.

use crate::{NbtCompound, NbtList, NbtTag, END_ID};

pub trait ToNbt {
    fn to_nbt(&self) -> NbtTag;
}

pub trait FromNbt: Sized {
    /// Tag name reported when a stored value has the wrong type.
    const EXPECTED: &'static str;

    fn from_nbt(tag: &NbtTag) -> Option<Self>;
}

macro_rules! scalar {
    ($ty:ty, $variant:ident, $name:literal) => {
        impl ToNbt for $ty {
            fn to_nbt(&self) -> NbtTag {
                NbtTag::$variant(*self)
            }
        }

        impl FromNbt for $ty {
            const EXPECTED: &'static str = $name;

            fn from_nbt(tag: &NbtTag) -> Option<Self> {
                match tag {
                    NbtTag::$variant(value) => Some(*value),
                    _ => None,
                }
            }
        }
    };
}

scalar!(i8, Byte, "Byte");
scalar!(i16, Short, "Short");
scalar!(i32, Int, "Int");
scalar!(i64, Long, "Long");
scalar!(f32, Float, "Float");
scalar!(f64, Double, "Double");

macro_rules! array {
    ($ty:ty, $variant:ident, $name:literal) => {
        impl ToNbt for Box<[$ty]> {
            fn to_nbt(&self) -> NbtTag {
                NbtTag::$variant(self.clone())
            }
        }

        impl FromNbt for Box<[$ty]> {
            const EXPECTED: &'static str = $name;

            fn from_nbt(tag: &NbtTag) -> Option<Self> {
                match tag {
                    NbtTag::$variant(value) => Some(value.clone()),
                    _ => None,
                }
            }
        }
    };
}

array!(u8, ByteArray, "ByteArray");
array!(i32, IntArray, "IntArray");
array!(i64, LongArray, "LongArray");

impl ToNbt for bool {
    fn to_nbt(&self) -> NbtTag {
        NbtTag::Byte(*self as i8)
    }
}

impl FromNbt for bool {
    const EXPECTED: &'static str = "Byte";

    fn from_nbt(tag: &NbtTag) -> Option<Self> {
        tag.extract_bool()
    }
}

impl ToNbt for str {
    fn to_nbt(&self) -> NbtTag {
        NbtTag::String(self.to_string())
    }
}

impl ToNbt for String {
    fn to_nbt(&self) -> NbtTag {
        NbtTag::String(self.clone())
    }
}

impl FromNbt for String {
    const EXPECTED: &'static str = "String";

    fn from_nbt(tag: &NbtTag) -> Option<Self> {
        tag.extract_string().cloned()
    }
}

impl ToNbt for NbtCompound {
    fn to_nbt(&self) -> NbtTag {
        NbtTag::Compound(self.clone())
    }
}

impl FromNbt for NbtCompound {
    const EXPECTED: &'static str = "Compound";

    fn from_nbt(tag: &NbtTag) -> Option<Self> {
        tag.extract_compound().cloned()
    }
}

impl ToNbt for NbtList {
    fn to_nbt(&self) -> NbtTag {
        NbtTag::List(self.clone())
    }
}

impl FromNbt for NbtList {
    const EXPECTED: &'static str = "List";

    fn from_nbt(tag: &NbtTag) -> Option<Self> {
        tag.extract_list().cloned()
    }
}

/// Slices become lists; every element converts to the same variant.
impl<T: ToNbt> ToNbt for [T] {
    fn to_nbt(&self) -> NbtTag {
        let items: Vec<NbtTag> = self.iter().map(ToNbt::to_nbt).collect();
        let element_id = items.first().map_or(END_ID, NbtTag::get_type_id);
        NbtTag::List(NbtList::from_parts(element_id, items))
    }
}

impl<T: ToNbt> ToNbt for Vec<T> {
    fn to_nbt(&self) -> NbtTag {
        self.as_slice().to_nbt()
    }
}

/// Lists become vectors; any element of the wrong type fails the whole conversion.
impl<T: FromNbt> FromNbt for Vec<T> {
    const EXPECTED: &'static str = "List";

    fn from_nbt(tag: &NbtTag) -> Option<Self> {
        tag.extract_list()?.iter().map(T::from_nbt).collect()
    }
}

impl<T: ToNbt + ?Sized> ToNbt for &T {
    fn to_nbt(&self) -> NbtTag {
        (**self).to_nbt()
    }
}
