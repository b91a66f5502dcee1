//! A protobuf runtime for schemas that are only known at runtime.
//!
//! Schemas are described with a [`DescriptorPool`], messages are
//! [`MessageValue`]s whose fields are dynamically typed [`Value`]s, and
//! both the binary wire format and the canonical JSON mapping are supported.
//!
//! ```
//! use protodyn::{DescriptorPool, FieldDef, MessageDef, MessageValue, Scalar};
//!
//! let mut builder = DescriptorPool::builder();
//! let test = builder.declare_message("example.Test").unwrap();
//! builder
//!     .define_message(test, MessageDef::proto3().field(FieldDef::scalar("val", 1, Scalar::String)))
//!     .unwrap();
//! let pool = builder.build().unwrap();
//!
//! let descriptor = pool.get_message_by_name("example.Test").unwrap();
//! let message = MessageValue::new(descriptor.clone()).with("val", "Hello world!").unwrap();
//! let encoded = message.encode_to_vec();
//! assert_eq!(&encoded[..2], &[10, 12]);
//! assert_eq!(descriptor.decode(encoded).unwrap(), message);
//! ```

#![deny(clippy::as_conversions)]

pub mod codec;
pub mod descriptor;
pub mod error;
#[cfg(feature = "json")]
pub mod json;
// Publicly export `leb128` because the functions are useful on their own.
pub mod leb128;
pub mod message;
pub mod unknown;
pub mod value;
pub mod wire;
pub mod wkt;

mod util;

pub use codec::{BinaryDecoder, BinaryEncoder, DecodeOptions, MessageDecoder, MessageEncoder};
pub use descriptor::{
    Cardinality, DescriptorPool, EnumDescriptor, FieldDef, FieldDescriptor, Kind, MessageDef,
    MessageDescriptor, PoolBuilder, Scalar, Syntax,
};
pub use error::{DecodeError, DecodeErrorKind, SchemaError};
#[cfg(feature = "json")]
pub use json::{JsonAdapter, JsonConfig, JsonDecoder, JsonEncoder};
pub use message::{MessageBuilder, MessageValue};
pub use unknown::{UnknownField, UnknownFieldSet, UnknownValue};
pub use value::{MapKey, MapValue, Value};
