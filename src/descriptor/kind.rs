use crate::descriptor::{EnumId, MessageId};
use crate::value::Value;
use crate::wire::WireType;

/// The scalar types of the protobuf language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
}

impl Scalar {
    /// The [`WireType`] a single value of this type is encoded with.
    pub const fn wire_type(self) -> WireType {
        match self {
            Scalar::Double | Scalar::Fixed64 | Scalar::Sfixed64 => WireType::I64,
            Scalar::Float | Scalar::Fixed32 | Scalar::Sfixed32 => WireType::I32,
            Scalar::String | Scalar::Bytes => WireType::Len,
            Scalar::Int32
            | Scalar::Int64
            | Scalar::Uint32
            | Scalar::Uint64
            | Scalar::Sint32
            | Scalar::Sint64
            | Scalar::Bool => WireType::Varint,
        }
    }

    /// Repeated fields of this type may use the packed encoding.
    pub const fn is_packable(self) -> bool {
        !matches!(self, Scalar::String | Scalar::Bytes)
    }

    /// Floating point and bytes types cannot be map keys.
    pub const fn is_valid_map_key(self) -> bool {
        !matches!(self, Scalar::Double | Scalar::Float | Scalar::Bytes)
    }

    /// Width of a single element in a packed run, `None` for varints.
    pub(crate) const fn fixed_width(self) -> Option<u8> {
        match self.wire_type() {
            WireType::I32 => Some(4),
            WireType::I64 => Some(8),
            _ => None,
        }
    }

    /// The zero value of this type.
    pub fn default_value(self) -> Value {
        match self {
            Scalar::Double => Value::F64(0.0),
            Scalar::Float => Value::F32(0.0),
            Scalar::Int32 | Scalar::Sint32 | Scalar::Sfixed32 => Value::I32(0),
            Scalar::Int64 | Scalar::Sint64 | Scalar::Sfixed64 => Value::I64(0),
            Scalar::Uint32 | Scalar::Fixed32 => Value::U32(0),
            Scalar::Uint64 | Scalar::Fixed64 => Value::U64(0),
            Scalar::Bool => Value::Bool(false),
            Scalar::String => Value::String(String::new()),
            Scalar::Bytes => Value::Bytes(bytes::Bytes::new()),
        }
    }

    /// Returns true if `value` has the shape this type stores.
    pub fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Scalar::Double, Value::F64(_))
                | (Scalar::Float, Value::F32(_))
                | (Scalar::Int32 | Scalar::Sint32 | Scalar::Sfixed32, Value::I32(_))
                | (Scalar::Int64 | Scalar::Sint64 | Scalar::Sfixed64, Value::I64(_))
                | (Scalar::Uint32 | Scalar::Fixed32, Value::U32(_))
                | (Scalar::Uint64 | Scalar::Fixed64, Value::U64(_))
                | (Scalar::Bool, Value::Bool(_))
                | (Scalar::String, Value::String(_))
                | (Scalar::Bytes, Value::Bytes(_))
        )
    }

    /// Full name of the `google.protobuf` wrapper message boxing this type.
    pub const fn wrapper_name(self) -> Option<&'static str> {
        Some(match self {
            Scalar::Double => "google.protobuf.DoubleValue",
            Scalar::Float => "google.protobuf.FloatValue",
            Scalar::Int64 => "google.protobuf.Int64Value",
            Scalar::Uint64 => "google.protobuf.UInt64Value",
            Scalar::Int32 => "google.protobuf.Int32Value",
            Scalar::Uint32 => "google.protobuf.UInt32Value",
            Scalar::Bool => "google.protobuf.BoolValue",
            Scalar::String => "google.protobuf.StringValue",
            Scalar::Bytes => "google.protobuf.BytesValue",
            _ => return None,
        })
    }
}

/// The type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Scalar(Scalar),
    Enum(EnumId),
    Message(MessageId),
    /// One of the `google.protobuf.*Value` wrappers. The field holds the bare
    /// scalar and is encoded as a message with the scalar in field 1.
    Wrapper(Scalar),
}

impl Kind {
    pub const fn wire_type(self) -> WireType {
        match self {
            Kind::Scalar(scalar) => scalar.wire_type(),
            Kind::Enum(_) => WireType::Varint,
            Kind::Message(_) | Kind::Wrapper(_) => WireType::Len,
        }
    }

    pub const fn is_packable(self) -> bool {
        match self {
            Kind::Scalar(scalar) => scalar.is_packable(),
            Kind::Enum(_) => true,
            Kind::Message(_) | Kind::Wrapper(_) => false,
        }
    }

    /// Message-like kinds always track presence.
    pub const fn is_message(self) -> bool {
        matches!(self, Kind::Message(_) | Kind::Wrapper(_))
    }
}

/// Whether a field holds zero-or-one, exactly one, or any number of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cardinality {
    #[default]
    Optional,
    Required,
    Repeated,
}

/// Protobuf language edition of a message, decides field presence and the
/// packed default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Syntax {
    Proto2,
    #[default]
    Proto3,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_types() {
        assert_eq!(Scalar::Sint64.wire_type(), WireType::Varint);
        assert_eq!(Scalar::Sfixed32.wire_type(), WireType::I32);
        assert_eq!(Scalar::Double.wire_type(), WireType::I64);
        assert_eq!(Kind::Wrapper(Scalar::Int32).wire_type(), WireType::Len);
        assert_eq!(Kind::Enum(EnumId(0)).wire_type(), WireType::Varint);
    }

    #[test]
    fn test_map_keys_and_packing() {
        assert!(Scalar::String.is_valid_map_key());
        assert!(Scalar::Sfixed64.is_valid_map_key());
        assert!(!Scalar::Float.is_valid_map_key());
        assert!(!Scalar::Bytes.is_valid_map_key());

        assert!(Kind::Enum(EnumId(0)).is_packable());
        assert!(!Kind::Scalar(Scalar::String).is_packable());
        assert_eq!(Scalar::Fixed64.fixed_width(), Some(8));
        assert_eq!(Scalar::Uint32.fixed_width(), None);
    }

    #[test]
    fn test_accepts() {
        assert!(Scalar::Sint32.accepts(&Value::I32(-1)));
        assert!(!Scalar::Uint32.accepts(&Value::I32(1)));
        assert!(Scalar::Bytes.accepts(&Scalar::Bytes.default_value()));
        assert_eq!(Scalar::Fixed32.wrapper_name(), None);
    }
}
