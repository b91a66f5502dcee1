//! Fields that were present on the wire but not in the schema.
//!
//! Unknown fields are kept as the exact bytes they were read from so that a
//! message which is decoded and re-encoded reproduces its input, even for
//! fields this process knows nothing about.

use std::collections::HashMap;

use bytes::{BufMut, Bytes};
use smallvec::SmallVec;

use crate::wire::{self, WireType};

/// A single occurrence of an unknown field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownValue {
    wire_type: WireType,
    /// Encoded value without its key. Includes the length prefix of
    /// length-delimited values and the end-group key of groups.
    raw: Bytes,
}

impl UnknownValue {
    pub fn new(wire_type: WireType, raw: Bytes) -> Self {
        UnknownValue { wire_type, raw }
    }

    pub fn wire_type(&self) -> WireType {
        self.wire_type
    }

    pub fn raw(&self) -> &Bytes {
        &self.raw
    }
}

/// Every occurrence of one unknown field number, in the order read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField {
    number: u32,
    values: SmallVec<[UnknownValue; 1]>,
}

impl UnknownField {
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn values(&self) -> &[UnknownValue] {
        &self.values
    }

    fn encoded_len(&self) -> usize {
        let key_len = wire::encoded_key_len(self.number);
        self.values.iter().map(|v| key_len + v.raw.len()).sum()
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        for value in &self.values {
            wire::encode_key(value.wire_type, self.number, buf);
            buf.put_slice(&value.raw);
        }
    }
}

/// The unknown fields of a message, grouped by number in order of first
/// appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnknownFieldSet {
    fields: Vec<UnknownField>,
    /// Position of each number in `fields`.
    index: HashMap<u32, usize>,
}

impl UnknownFieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of distinct field numbers.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, number: u32) -> Option<&UnknownField> {
        self.index.get(&number).map(|&at| &self.fields[at])
    }

    pub fn iter(&self) -> impl Iterator<Item = &UnknownField> + '_ {
        self.fields.iter()
    }

    /// Record one occurrence of field `number`.
    pub fn add(&mut self, number: u32, value: UnknownValue) {
        match self.index.get(&number) {
            Some(&at) => self.fields[at].values.push(value),
            None => {
                self.index.insert(number, self.fields.len());
                self.fields.push(UnknownField {
                    number,
                    values: smallvec::smallvec![value],
                });
            }
        }
    }

    /// Append all of `other`. Numbers already present keep their position and
    /// get `other`'s values appended, new numbers follow in `other`'s order.
    pub fn merge(&mut self, other: &UnknownFieldSet) {
        for field in &other.fields {
            for value in &field.values {
                self.add(field.number, value.clone());
            }
        }
    }

    /// Size of these fields on the wire, keys included.
    pub fn encoded_len(&self) -> usize {
        self.fields.iter().map(UnknownField::encoded_len).sum()
    }

    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        for field in &self.fields {
            field.encode(buf);
        }
    }
}
