//! Runtime schema model.
//!
//! A [`DescriptorPool`] is an arena of message and enum descriptors built once
//! through [`PoolBuilder`] and then shared read-only. Types refer to each other
//! by [`MessageId`] / [`EnumId`], which is what allows recursive and mutually
//! recursive messages.

mod builder;
mod kind;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub use builder::{FieldDef, MessageDef, PoolBuilder};
pub use kind::{Cardinality, Kind, Scalar, Syntax};

use crate::value::Value;

/// Index of a message in its [`DescriptorPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub(crate) usize);

/// Index of an enum in its [`DescriptorPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnumId(pub(crate) usize);

/// Key and value types of a map field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapEntry {
    pub key: Scalar,
    pub value: Kind,
}

/// Where a field's value lives inside a message value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAccessor {
    /// A dedicated slot.
    Slot(usize),
    /// The shared slot of a oneof.
    Oneof(usize),
    /// The extension table, keyed by field number.
    Extension,
}

/// A single field of a message, or an extension.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub(crate) number: u32,
    pub(crate) name: String,
    pub(crate) full_name: String,
    pub(crate) json_name: String,
    pub(crate) kind: Kind,
    pub(crate) cardinality: Cardinality,
    pub(crate) has_presence: bool,
    pub(crate) packed: bool,
    pub(crate) map_entry: Option<MapEntry>,
    pub(crate) default: Option<Value>,
    pub(crate) oneof: Option<usize>,
    pub(crate) accessor: FieldAccessor,
    /// Position in the containing message's field list.
    pub(crate) index: usize,
}

impl FieldDescriptor {
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Name as written in the schema.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fully-qualified name, `<message>.<field>` or the extension's own name.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Key used by the JSON mapping.
    pub fn json_name(&self) -> &str {
        &self.json_name
    }

    /// Type of the field, for maps the type of the map's values.
    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn is_repeated(&self) -> bool {
        self.cardinality == Cardinality::Repeated && self.map_entry.is_none()
    }

    pub fn is_required(&self) -> bool {
        self.cardinality == Cardinality::Required
    }

    pub fn is_map(&self) -> bool {
        self.map_entry.is_some()
    }

    pub fn map_entry(&self) -> Option<MapEntry> {
        self.map_entry
    }

    /// Returns true if a value equal to the default is still distinguishable
    /// from "not set" (and therefore still encoded).
    pub fn has_presence(&self) -> bool {
        self.has_presence
    }

    /// Repeated values are written as a single length-delimited run.
    pub fn is_packed(&self) -> bool {
        self.packed
    }

    /// Value reported for the field when it is not set, `None` for message
    /// kinds and collections.
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn oneof_index(&self) -> Option<usize> {
        self.oneof
    }

    pub fn accessor(&self) -> FieldAccessor {
        self.accessor
    }

    pub fn is_extension(&self) -> bool {
        self.accessor == FieldAccessor::Extension
    }

    /// Returns true if a value of `wire_type` can be read into this field:
    /// its own wire type, or a packed run for packable repeated fields.
    pub(crate) fn accepts_wire_type(&self, wire_type: crate::wire::WireType) -> bool {
        if self.is_map() {
            return wire_type == crate::wire::WireType::Len;
        }
        wire_type == self.kind.wire_type()
            || (self.is_repeated()
                && self.kind.is_packable()
                && wire_type == crate::wire::WireType::Len)
    }
}

/// A set of fields of which at most one is set at a time.
#[derive(Debug, Clone)]
pub struct OneofDescriptor {
    pub(crate) name: String,
    pub(crate) fields: Vec<usize>,
}

impl OneofDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Indexes of the member fields in the containing message's field list.
    pub fn field_indexes(&self) -> &[usize] {
        &self.fields
    }
}

#[derive(Debug)]
pub(crate) struct MessageData {
    pub(crate) full_name: String,
    pub(crate) syntax: Syntax,
    pub(crate) fields: Vec<FieldDescriptor>,
    pub(crate) oneofs: Vec<OneofDescriptor>,
    pub(crate) slot_count: usize,
    by_number: HashMap<u32, usize>,
    /// Proto name, JSON name and camelCase name of every field.
    by_name: HashMap<String, usize>,
    pub(crate) extensions: Vec<FieldDescriptor>,
    extension_by_number: HashMap<u32, usize>,
    extension_by_name: HashMap<String, usize>,
}

impl MessageData {
    pub(crate) fn new(full_name: String) -> Self {
        MessageData {
            full_name,
            syntax: Syntax::default(),
            fields: Vec::new(),
            oneofs: Vec::new(),
            slot_count: 0,
            by_number: HashMap::new(),
            by_name: HashMap::new(),
            extensions: Vec::new(),
            extension_by_number: HashMap::new(),
            extension_by_name: HashMap::new(),
        }
    }

    pub(crate) fn has_number(&self, number: u32) -> bool {
        self.by_number.contains_key(&number) || self.extension_by_number.contains_key(&number)
    }

    pub(crate) fn push_field(&mut self, field: FieldDescriptor) {
        let index = self.fields.len();
        self.by_number.insert(field.number, index);
        for alias in [
            field.json_name.clone(),
            crate::util::to_lower_camel(&field.name),
            field.name.clone(),
        ] {
            self.by_name.entry(alias).or_insert(index);
        }
        self.fields.push(field);
    }

    pub(crate) fn push_extension(&mut self, field: FieldDescriptor) {
        let index = self.extensions.len();
        self.extension_by_number.insert(field.number, index);
        self.extension_by_name.insert(field.full_name.clone(), index);
        self.extensions.push(field);
    }
}

#[derive(Debug)]
pub(crate) struct EnumData {
    pub(crate) full_name: String,
    pub(crate) values: Vec<EnumValue>,
    by_name: HashMap<String, usize>,
    by_number: HashMap<i32, usize>,
}

impl EnumData {
    pub(crate) fn new(full_name: String, values: Vec<EnumValue>) -> Self {
        let mut by_name = HashMap::with_capacity(values.len());
        let mut by_number = HashMap::with_capacity(values.len());
        for (i, value) in values.iter().enumerate() {
            by_name.entry(value.name.clone()).or_insert(i);
            // Aliases share a number, the first declared name is canonical.
            by_number.entry(value.number).or_insert(i);
        }
        EnumData {
            full_name,
            values,
            by_name,
            by_number,
        }
    }
}

/// A named value of an enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub(crate) name: String,
    pub(crate) number: i32,
}

impl EnumValue {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn number(&self) -> i32 {
        self.number
    }
}

#[derive(Debug, Clone, Copy)]
enum TypeRef {
    Message(MessageId),
    Enum(EnumId),
}

/// An immutable collection of message and enum descriptors.
#[derive(Debug)]
pub struct DescriptorPool {
    pub(crate) messages: Vec<MessageData>,
    pub(crate) enums: Vec<EnumData>,
    names: HashMap<String, TypeRef>,
}

impl DescriptorPool {
    /// Start describing a new pool.
    pub fn builder() -> PoolBuilder {
        PoolBuilder::default()
    }

    pub(crate) fn from_parts(messages: Vec<MessageData>, enums: Vec<EnumData>) -> Self {
        let mut names = HashMap::with_capacity(messages.len() + enums.len());
        for (i, message) in messages.iter().enumerate() {
            names.insert(message.full_name.clone(), TypeRef::Message(MessageId(i)));
        }
        for (i, enumeration) in enums.iter().enumerate() {
            names.insert(enumeration.full_name.clone(), TypeRef::Enum(EnumId(i)));
        }
        DescriptorPool {
            messages,
            enums,
            names,
        }
    }

    /// Returns the message with the provided fully-qualified name.
    pub fn get_message_by_name(self: &Arc<Self>, name: &str) -> Option<MessageDescriptor> {
        match self.names.get(name)? {
            TypeRef::Message(id) => Some(MessageDescriptor::new(Arc::clone(self), *id)),
            TypeRef::Enum(_) => None,
        }
    }

    /// Returns the enum with the provided fully-qualified name.
    pub fn get_enum_by_name(self: &Arc<Self>, name: &str) -> Option<EnumDescriptor> {
        match self.names.get(name)? {
            TypeRef::Enum(id) => Some(EnumDescriptor {
                pool: Arc::clone(self),
                id: *id,
            }),
            TypeRef::Message(_) => None,
        }
    }

    pub fn message(self: &Arc<Self>, id: MessageId) -> MessageDescriptor {
        MessageDescriptor::new(Arc::clone(self), id)
    }

    pub fn enumeration(self: &Arc<Self>, id: EnumId) -> EnumDescriptor {
        EnumDescriptor {
            pool: Arc::clone(self),
            id,
        }
    }

    pub fn messages(self: &Arc<Self>) -> impl Iterator<Item = MessageDescriptor> + '_ {
        (0..self.messages.len()).map(|i| self.message(MessageId(i)))
    }

    pub(crate) fn message_data(&self, id: MessageId) -> &MessageData {
        &self.messages[id.0]
    }

    pub(crate) fn enum_data(&self, id: EnumId) -> &EnumData {
        &self.enums[id.0]
    }
}

/// A handle to a message type in a [`DescriptorPool`].
#[derive(Clone)]
pub struct MessageDescriptor {
    pool: Arc<DescriptorPool>,
    id: MessageId,
}

impl MessageDescriptor {
    pub(crate) fn new(pool: Arc<DescriptorPool>, id: MessageId) -> Self {
        MessageDescriptor { pool, id }
    }

    fn data(&self) -> &MessageData {
        self.pool.message_data(self.id)
    }

    pub fn pool(&self) -> &Arc<DescriptorPool> {
        &self.pool
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn full_name(&self) -> &str {
        &self.data().full_name
    }

    /// Name without the package or enclosing messages.
    pub fn name(&self) -> &str {
        let full_name = self.full_name();
        full_name.rsplit('.').next().unwrap_or(full_name)
    }

    pub fn syntax(&self) -> Syntax {
        self.data().syntax
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.data().fields
    }

    pub fn oneofs(&self) -> &[OneofDescriptor] {
        &self.data().oneofs
    }

    /// Extensions registered on this message, in registration order.
    pub fn extensions(&self) -> &[FieldDescriptor] {
        &self.data().extensions
    }

    pub fn field_by_number(&self, number: u32) -> Option<&FieldDescriptor> {
        let data = self.data();
        data.by_number.get(&number).map(|i| &data.fields[*i])
    }

    /// Finds a field by its JSON name, its camelCase name or its proto name.
    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        let data = self.data();
        data.by_name.get(name).map(|i| &data.fields[*i])
    }

    pub fn extension_by_number(&self, number: u32) -> Option<&FieldDescriptor> {
        let data = self.data();
        data.extension_by_number
            .get(&number)
            .map(|i| &data.extensions[*i])
    }

    /// Finds an extension by its fully-qualified name.
    pub fn extension_by_name(&self, full_name: &str) -> Option<&FieldDescriptor> {
        let data = self.data();
        data.extension_by_name
            .get(full_name)
            .map(|i| &data.extensions[*i])
    }

    pub fn oneof_by_name(&self, name: &str) -> Option<&OneofDescriptor> {
        self.data().oneofs.iter().find(|oneof| oneof.name == name)
    }

    /// Descriptor of the message type referenced by a field of this pool.
    pub fn related_message(&self, id: MessageId) -> MessageDescriptor {
        MessageDescriptor::new(Arc::clone(&self.pool), id)
    }

    /// Descriptor of the enum type referenced by a field of this pool.
    pub fn related_enum(&self, id: EnumId) -> EnumDescriptor {
        self.pool.enumeration(id)
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.data().slot_count
    }
}

impl PartialEq for MessageDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Arc::ptr_eq(&self.pool, &other.pool)
    }
}

impl Eq for MessageDescriptor {}

impl fmt::Debug for MessageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MessageDescriptor")
            .field(&self.full_name())
            .finish()
    }
}

/// A handle to an enum type in a [`DescriptorPool`].
#[derive(Clone)]
pub struct EnumDescriptor {
    pool: Arc<DescriptorPool>,
    id: EnumId,
}

impl EnumDescriptor {
    fn data(&self) -> &EnumData {
        self.pool.enum_data(self.id)
    }

    pub fn id(&self) -> EnumId {
        self.id
    }

    pub fn full_name(&self) -> &str {
        &self.data().full_name
    }

    pub fn values(&self) -> &[EnumValue] {
        &self.data().values
    }

    pub fn value_by_name(&self, name: &str) -> Option<&EnumValue> {
        let data = self.data();
        data.by_name.get(name).map(|i| &data.values[*i])
    }

    pub fn value_by_number(&self, number: i32) -> Option<&EnumValue> {
        let data = self.data();
        data.by_number.get(&number).map(|i| &data.values[*i])
    }

    /// The first declared value.
    pub fn default_number(&self) -> i32 {
        self.data().values.first().map_or(0, |value| value.number)
    }
}

impl PartialEq for EnumDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Arc::ptr_eq(&self.pool, &other.pool)
    }
}

impl Eq for EnumDescriptor {}

impl fmt::Debug for EnumDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EnumDescriptor")
            .field(&self.full_name())
            .finish()
    }
}
