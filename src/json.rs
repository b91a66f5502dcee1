//! The protobuf JSON mapping.
//!
//! Messages are converted to and from [`serde_json::Value`] trees. Types with
//! a special JSON form (the well-known types, or anything registered on a
//! [`JsonConfig`]) are handled by a [`JsonAdapter`] instead of the generic
//! object mapping.

mod config;
mod decode;
mod encode;
mod number;
mod wkt;

pub use config::{JsonAdapter, JsonConfig};

use crate::codec::{MessageDecoder, MessageEncoder};
use crate::descriptor::MessageDescriptor;
use crate::error::{DecodeError, DecodeErrorKind};
use crate::message::MessageValue;

#[derive(Debug, Clone)]
enum Input {
    Text(String),
    Tree(serde_json::Value),
}

/// Decodes messages from JSON text or an already parsed tree.
#[derive(Debug, Clone)]
pub struct JsonDecoder {
    input: Input,
    config: JsonConfig,
}

impl JsonDecoder {
    pub fn new(text: impl Into<String>, config: JsonConfig) -> Self {
        JsonDecoder {
            input: Input::Text(text.into()),
            config,
        }
    }

    pub fn from_value(json: serde_json::Value, config: JsonConfig) -> Self {
        JsonDecoder {
            input: Input::Tree(json),
            config,
        }
    }
}

impl MessageDecoder for JsonDecoder {
    fn decode_message(&mut self, descriptor: &MessageDescriptor) -> Result<MessageValue, DecodeError> {
        match &self.input {
            Input::Text(text) => {
                let json = parse(text)?;
                decode::decode_message(descriptor, &json, &self.config)
            }
            Input::Tree(json) => decode::decode_message(descriptor, json, &self.config),
        }
    }
}

/// Encodes messages as JSON text, one message per line.
#[derive(Debug, Clone, Default)]
pub struct JsonEncoder {
    config: JsonConfig,
    output: String,
}

impl JsonEncoder {
    pub fn new(config: JsonConfig) -> Self {
        JsonEncoder {
            config,
            output: String::new(),
        }
    }

    pub fn into_string(self) -> String {
        self.output
    }
}

impl MessageEncoder for JsonEncoder {
    fn encode_message(&mut self, message: &MessageValue) {
        if !self.output.is_empty() {
            self.output.push('\n');
        }
        self.output.push_str(&message.to_json(&self.config));
    }
}

fn parse(text: &str) -> Result<serde_json::Value, DecodeError> {
    serde_json::from_str(text).map_err(|err| DecodeError::new(DecodeErrorKind::MalformedJson).with_source(err))
}

impl MessageDescriptor {
    /// Decode a message of this type from JSON text.
    pub fn decode_json(&self, text: &str, config: &JsonConfig) -> Result<MessageValue, DecodeError> {
        let json = parse(text)?;
        decode::decode_message(self, &json, config)
    }

    /// Decode a message of this type from a parsed JSON tree.
    ///
    /// A [`JsonAdapter`] registered for this type is used when present, so
    /// an adapter must not call this for its own type.
    pub fn decode_json_value(
        &self,
        json: &serde_json::Value,
        config: &JsonConfig,
    ) -> Result<MessageValue, DecodeError> {
        decode::decode_message(self, json, config)
    }
}

impl MessageValue {
    /// This message as JSON text, compact or pretty per `config`.
    pub fn to_json(&self, config: &JsonConfig) -> String {
        let json = self.to_json_value(config);
        if config.compact_output {
            json.to_string()
        } else {
            format!("{json:#}")
        }
    }

    /// This message as a JSON tree.
    pub fn to_json_value(&self, config: &JsonConfig) -> serde_json::Value {
        encode::encode_message(self, config)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::descriptor::{DescriptorPool, FieldDef, Kind, MessageDef, Scalar};
    use crate::value::Value;

    fn pool() -> Arc<DescriptorPool> {
        let mut builder = DescriptorPool::builder();
        let item = builder.declare_message("test.Item").unwrap();
        let color = builder
            .declare_enum("test.Color", [("RED", 0), ("GREEN", 1)])
            .unwrap();
        builder
            .define_message(
                item,
                MessageDef::proto3().fields([
                    FieldDef::scalar("item_id", 1, Scalar::Uint64),
                    FieldDef::scalar("name", 2, Scalar::String),
                    FieldDef::enumeration("color", 3, color),
                    FieldDef::map("tags", 4, Scalar::String, Kind::Scalar(Scalar::Int32)),
                    FieldDef::message("next", 5, item),
                ]),
            )
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn test_roundtrip() {
        let pool = pool();
        let item = pool.get_message_by_name("test.Item").unwrap();
        let config = JsonConfig::default();
        let message = item
            .decode_json(
                r#"{"itemId": "18446744073709551615", "color": "GREEN", "tags": {"a": 1}, "next": {"name": "x"}}"#,
                &config,
            )
            .unwrap();

        assert_eq!(message.get("item_id"), Some(&Value::U64(u64::MAX)));
        assert_eq!(message.get("color"), Some(&Value::EnumNumber(1)));
        insta::assert_snapshot!(
            message.to_json(&config),
            @r#"{"itemId":"18446744073709551615","color":"GREEN","tags":{"a":1},"next":{"name":"x"}}"#
        );
        assert_eq!(item.decode_json(&message.to_json(&config), &config).unwrap(), message);
    }

    #[test]
    fn test_malformed_json() {
        let pool = pool();
        let item = pool.get_message_by_name("test.Item").unwrap();
        let err = item.decode_json("{\"name\": ", &JsonConfig::default()).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::MalformedJson);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_decoder_and_encoder() {
        let pool = pool();
        let item = pool.get_message_by_name("test.Item").unwrap();
        let mut decoder = JsonDecoder::from_value(
            serde_json::json!({ "name": "a" }),
            JsonConfig::default(),
        );
        let message = item.decode_with(&mut decoder).unwrap();

        let mut encoder = JsonEncoder::new(JsonConfig::default());
        message.encode_with(&mut encoder);
        message.encode_with(&mut encoder);
        assert_eq!(encoder.into_string(), "{\"name\":\"a\"}\n{\"name\":\"a\"}");
    }

    #[test]
    fn test_pretty_output() {
        let pool = pool();
        let item = pool.get_message_by_name("test.Item").unwrap();
        let message = MessageValue::new(item).with("name", "a").unwrap();
        let mut config = JsonConfig::default();
        config.compact_output(false);
        insta::assert_snapshot!(message.to_json(&config), @r#"
        {
          "name": "a"
        }
        "#);
    }
}
