//! Binary protobuf encoding and decoding.
//!
//! Encoding is two passes over a message: [`size`] computes the encoded
//! length of every nested message (memoised in the message itself) and
//! [`encode`] writes exactly that many bytes, so length prefixes never need
//! to be patched after the fact.

mod decode;
mod encode;
mod map;
mod packed;
mod scalar;
mod size;
mod wrappers;

use bytes::{BufMut, Bytes};

use crate::descriptor::MessageDescriptor;
use crate::error::{DecodeError, DecodeErrorKind};
use crate::message::MessageValue;
use crate::util::CastFrom;

/// Limits applied while decoding binary input.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Maximum nesting depth of messages.
    pub(crate) recursion_limit: u32,
    /// Maximum size of the input, in bytes.
    pub(crate) size_limit: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            recursion_limit: 100,
            size_limit: usize::cast_from(i32::MAX.unsigned_abs()),
        }
    }
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum nesting depth of messages.
    pub fn recursion_limit(&mut self, limit: u32) -> &mut Self {
        self.recursion_limit = limit;
        self
    }

    /// Set the maximum size of an input, in bytes.
    pub fn size_limit(&mut self, limit: usize) -> &mut Self {
        self.size_limit = limit;
        self
    }
}

/// A source of messages in some encoding.
pub trait MessageDecoder {
    /// Read a single message of type `descriptor`.
    fn decode_message(&mut self, descriptor: &MessageDescriptor) -> Result<MessageValue, DecodeError>;
}

/// A sink for messages in some encoding.
pub trait MessageEncoder {
    /// Write `message`.
    fn encode_message(&mut self, message: &MessageValue);
}

/// Decodes binary protobuf, consuming its entire input per message.
#[derive(Debug, Clone)]
pub struct BinaryDecoder {
    data: Bytes,
    options: DecodeOptions,
    consumed: usize,
}

impl BinaryDecoder {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self::with_options(data, DecodeOptions::default())
    }

    pub fn with_options(data: impl Into<Bytes>, options: DecodeOptions) -> Self {
        BinaryDecoder {
            data: data.into(),
            options,
            consumed: 0,
        }
    }

    /// Total number of bytes read so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }
}

impl MessageDecoder for BinaryDecoder {
    fn decode_message(&mut self, descriptor: &MessageDescriptor) -> Result<MessageValue, DecodeError> {
        if self.data.len() > self.options.size_limit {
            return Err(DecodeError::new(DecodeErrorKind::SizeLimitExceeded {
                limit: self.options.size_limit,
            })
            .in_message(descriptor.full_name(), None));
        }

        let mut data = std::mem::take(&mut self.data);
        let len = data.len();
        let message = decode::decode_message(descriptor, &mut data, &self.options, 0)?;
        self.consumed += len - data.len();
        self.data = data;
        Ok(message)
    }
}

/// Encodes binary protobuf into a [`BufMut`].
#[derive(Debug)]
pub struct BinaryEncoder<B> {
    buf: B,
}

impl<B: BufMut> BinaryEncoder<B> {
    pub fn new(buf: B) -> Self {
        BinaryEncoder { buf }
    }

    pub fn into_inner(self) -> B {
        self.buf
    }
}

impl<B: BufMut> MessageEncoder for BinaryEncoder<B> {
    fn encode_message(&mut self, message: &MessageValue) {
        encode::encode_message(message, &mut self.buf);
    }
}

impl MessageDescriptor {
    /// Decode a binary message of this type.
    pub fn decode(&self, data: impl Into<Bytes>) -> Result<MessageValue, DecodeError> {
        self.decode_with(&mut BinaryDecoder::new(data))
    }

    /// Decode a binary message of this type with custom limits.
    pub fn decode_with_options(
        &self,
        data: impl Into<Bytes>,
        options: &DecodeOptions,
    ) -> Result<MessageValue, DecodeError> {
        self.decode_with(&mut BinaryDecoder::with_options(data, options.clone()))
    }

    /// Decode a message of this type from any [`MessageDecoder`].
    pub fn decode_with<D: MessageDecoder>(&self, decoder: &mut D) -> Result<MessageValue, DecodeError> {
        decoder.decode_message(self)
    }
}

impl MessageValue {
    /// Size of this message in the binary encoding.
    pub fn encoded_len(&self) -> usize {
        size::message_len(self)
    }

    /// Write the binary encoding of this message to `buf`.
    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        encode::encode_message(self, buf);
    }

    /// The binary encoding of this message.
    pub fn encode_to_vec(&self) -> Vec<u8> {
        let len = self.encoded_len();
        let mut buf = Vec::with_capacity(len);
        self.encode(&mut buf);
        debug_assert_eq!(buf.len(), len, "sizer and writer disagree");
        buf
    }

    /// Write this message to any [`MessageEncoder`].
    pub fn encode_with<E: MessageEncoder>(&self, encoder: &mut E) {
        encoder.encode_message(self);
    }
}
