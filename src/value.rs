//! Dynamically typed field values.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;

use crate::descriptor::{Kind, MessageDescriptor, Scalar};
use crate::message::MessageValue;

/// The value of a single field.
///
/// Every [`Kind`] stores exactly one shape of value: `sint32` fields hold an
/// [`Value::I32`], `fixed64` fields a [`Value::U64`], wrapper fields the bare
/// scalar, repeated fields a [`Value::List`], and so on.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Bytes),
    /// The number of an enum value. Unknown numbers are kept as-is.
    EnumNumber(i32),
    Message(MessageValue),
    List(Vec<Value>),
    Map(MapValue),
}

impl Value {
    /// Short name of this value's shape, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::EnumNumber(_) => "enum",
            Value::Message(_) => "message",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// Returns true if this is a single value that can be stored in a field of
    /// `kind`. `parent` resolves message types.
    pub fn is_valid_for(&self, kind: Kind, parent: &MessageDescriptor) -> bool {
        match (kind, self) {
            (Kind::Scalar(scalar) | Kind::Wrapper(scalar), value) => scalar.accepts(value),
            (Kind::Enum(_), Value::EnumNumber(_)) => true,
            (Kind::Message(id), Value::Message(message)) => {
                message.descriptor() == &parent.related_message(id)
            }
            _ => false,
        }
    }

    /// Returns true if this is the zero value of its type: `0`, `false`, an
    /// empty string or collection. Messages are never considered default.
    ///
    /// Negative zero is not the default, it is still written to the wire.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Bool(v) => !v,
            Value::I32(v) | Value::EnumNumber(v) => *v == 0,
            Value::I64(v) => *v == 0,
            Value::U32(v) => *v == 0,
            Value::U64(v) => *v == 0,
            Value::F32(v) => v.to_bits() == 0,
            Value::F64(v) => v.to_bits() == 0,
            Value::String(v) => v.is_empty(),
            Value::Bytes(v) => v.is_empty(),
            Value::List(v) => v.is_empty(),
            Value::Map(v) => v.is_empty(),
            Value::Message(_) => false,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::F32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_enum_number(&self) -> Option<i32> {
        match self {
            Value::EnumNumber(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&MessageValue> {
        match self {
            Value::Message(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapValue> {
        match self {
            Value::Map(v) => Some(v),
            _ => None,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),+ $(,)?) => {$(
        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::$variant(value.into())
            }
        }
    )+};
}

value_from! {
    bool => Bool,
    i32 => I32,
    i64 => I64,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
    &str => String,
    Bytes => Bytes,
    MessageValue => Message,
    MapValue => Map,
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

/// The key of a map entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    String(String),
}

impl MapKey {
    /// Returns true if this key can be stored in a map keyed by `scalar`.
    pub fn is_valid_for(&self, scalar: Scalar) -> bool {
        matches!(
            (scalar, self),
            (Scalar::Bool, MapKey::Bool(_))
                | (Scalar::Int32 | Scalar::Sint32 | Scalar::Sfixed32, MapKey::I32(_))
                | (Scalar::Int64 | Scalar::Sint64 | Scalar::Sfixed64, MapKey::I64(_))
                | (Scalar::Uint32 | Scalar::Fixed32, MapKey::U32(_))
                | (Scalar::Uint64 | Scalar::Fixed64, MapKey::U64(_))
                | (Scalar::String, MapKey::String(_))
        )
    }

    /// Converts a scalar value into a key, `None` for non-key shapes.
    pub fn from_value(value: Value) -> Option<Self> {
        Some(match value {
            Value::Bool(v) => MapKey::Bool(v),
            Value::I32(v) => MapKey::I32(v),
            Value::I64(v) => MapKey::I64(v),
            Value::U32(v) => MapKey::U32(v),
            Value::U64(v) => MapKey::U64(v),
            Value::String(v) => MapKey::String(v),
            _ => return None,
        })
    }

    /// The key as a scalar value.
    pub fn to_value(&self) -> Value {
        match self {
            MapKey::Bool(v) => Value::Bool(*v),
            MapKey::I32(v) => Value::I32(*v),
            MapKey::I64(v) => Value::I64(*v),
            MapKey::U32(v) => Value::U32(*v),
            MapKey::U64(v) => Value::U64(*v),
            MapKey::String(v) => Value::String(v.clone()),
        }
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Bool(v) => write!(f, "{v}"),
            MapKey::I32(v) => write!(f, "{v}"),
            MapKey::I64(v) => write!(f, "{v}"),
            MapKey::U32(v) => write!(f, "{v}"),
            MapKey::U64(v) => write!(f, "{v}"),
            MapKey::String(v) => f.write_str(v),
        }
    }
}

macro_rules! key_from {
    ($($ty:ty => $variant:ident),+ $(,)?) => {$(
        impl From<$ty> for MapKey {
            fn from(value: $ty) -> Self {
                MapKey::$variant(value.into())
            }
        }
    )+};
}

key_from! {
    bool => Bool,
    i32 => I32,
    i64 => I64,
    u32 => U32,
    u64 => U64,
    String => String,
    &str => String,
}

/// The value of a map field, ordered by key.
///
/// An entry without a value is an entry whose value was absent on the wire.
/// For scalar values it reads as the default, for message values it is kept
/// absent and encoded as an entry with only a key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapValue {
    entries: BTreeMap<MapKey, Option<Value>>,
}

impl MapValue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, replacing the previous value for the same key.
    pub fn insert(&mut self, key: impl Into<MapKey>, value: impl Into<Option<Value>>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Returns the entry for `key`. The outer `Option` is the presence of the
    /// key, the inner one the presence of the value.
    pub fn get(&self, key: &MapKey) -> Option<Option<&Value>> {
        self.entries.get(key).map(Option::as_ref)
    }

    pub fn contains_key(&self, key: &MapKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &MapKey) -> Option<Option<Value>> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&MapKey, Option<&Value>)> + '_ {
        self.entries.iter().map(|(k, v)| (k, v.as_ref()))
    }

    /// Adds every entry of `other`, its values winning on conflicts.
    pub fn extend_from(&mut self, other: &MapValue) {
        self.entries
            .extend(other.entries.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

impl<K: Into<MapKey>, V: Into<Option<Value>>> FromIterator<(K, V)> for MapValue {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = MapValue::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl IntoIterator for MapValue {
    type Item = (MapKey, Option<Value>);
    type IntoIter = btree_map::IntoIter<MapKey, Option<Value>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
