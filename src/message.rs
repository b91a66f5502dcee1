//! Message values.
//!
//! A [`MessageValue`] is immutable and cheap to clone: its fields live behind
//! an `Arc` and are only copied when a modified version is requested. Values
//! are populated through a [`MessageBuilder`], which validates every value
//! against the schema, and frozen with [`MessageBuilder::build`].

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::descriptor::{FieldAccessor, FieldDescriptor, Kind, MessageDescriptor};
use crate::error::SchemaError;
use crate::unknown::{UnknownFieldSet, UnknownValue};
use crate::value::{MapKey, MapValue, Value};

/// The selected member of a oneof.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OneofCase {
    /// Index of the member in the message's field list.
    pub(crate) field: usize,
    pub(crate) value: Value,
}

#[derive(Debug, Clone)]
pub(crate) struct MessageFields {
    slots: Vec<Option<Value>>,
    oneofs: Vec<Option<OneofCase>>,
    extensions: BTreeMap<u32, Value>,
    unknown: UnknownFieldSet,
    /// Memoised encoded length.
    size: OnceLock<usize>,
}

impl PartialEq for MessageFields {
    fn eq(&self, other: &Self) -> bool {
        self.slots == other.slots
            && self.oneofs == other.oneofs
            && self.extensions == other.extensions
            && self.unknown == other.unknown
    }
}

impl MessageFields {
    fn new(descriptor: &MessageDescriptor) -> Self {
        MessageFields {
            slots: vec![None; descriptor.slot_count()],
            oneofs: vec![None; descriptor.oneofs().len()],
            extensions: BTreeMap::new(),
            unknown: UnknownFieldSet::new(),
            size: OnceLock::new(),
        }
    }

    fn get(&self, field: &FieldDescriptor) -> Option<&Value> {
        match field.accessor() {
            FieldAccessor::Slot(slot) => self.slots.get(slot)?.as_ref(),
            FieldAccessor::Oneof(oneof) => self
                .oneofs
                .get(oneof)?
                .as_ref()
                .filter(|case| case.field == field.index)
                .map(|case| &case.value),
            FieldAccessor::Extension => self.extensions.get(&field.number()),
        }
    }

    fn get_mut(&mut self, field: &FieldDescriptor) -> Option<&mut Value> {
        match field.accessor() {
            FieldAccessor::Slot(slot) => self.slots.get_mut(slot)?.as_mut(),
            FieldAccessor::Oneof(oneof) => self
                .oneofs
                .get_mut(oneof)?
                .as_mut()
                .filter(|case| case.field == field.index)
                .map(|case| &mut case.value),
            FieldAccessor::Extension => self.extensions.get_mut(&field.number()),
        }
    }

    /// Store `value`, normalizing values that are indistinguishable from
    /// "not set" to `None`.
    fn put(&mut self, field: &FieldDescriptor, value: Option<Value>) {
        let value = value.filter(|value| field.has_presence() || !value.is_zero());
        match (field.accessor(), value) {
            (FieldAccessor::Slot(slot), value) => self.slots[slot] = value,
            (FieldAccessor::Oneof(oneof), Some(value)) => {
                self.oneofs[oneof] = Some(OneofCase {
                    field: field.index,
                    value,
                })
            }
            (FieldAccessor::Oneof(oneof), None) => {
                if matches!(&self.oneofs[oneof], Some(case) if case.field == field.index) {
                    self.oneofs[oneof] = None;
                }
            }
            (FieldAccessor::Extension, Some(value)) => {
                self.extensions.insert(field.number(), value);
            }
            (FieldAccessor::Extension, None) => {
                self.extensions.remove(&field.number());
            }
        }
    }

    fn merge_from(&mut self, descriptor: &MessageDescriptor, other: &MessageFields) {
        for (slot, value) in self.slots.iter_mut().zip(&other.slots) {
            if let Some(value) = value {
                merge_value(slot, value);
            }
        }

        for (case, other_case) in self.oneofs.iter_mut().zip(&other.oneofs) {
            let Some(other_case) = other_case else {
                continue;
            };
            match case {
                Some(case) if case.field == other_case.field => {
                    let mut merged = Some(case.value.clone());
                    merge_value(&mut merged, &other_case.value);
                    if let Some(value) = merged {
                        case.value = value;
                    }
                }
                _ => *case = Some(other_case.clone()),
            }
        }

        for (number, value) in &other.extensions {
            if descriptor.extension_by_number(*number).is_none() {
                continue;
            }
            let mut merged = self.extensions.remove(number);
            merge_value(&mut merged, value);
            if let Some(merged) = merged {
                self.extensions.insert(*number, merged);
            }
        }

        self.unknown.merge(&other.unknown);
        self.size = OnceLock::new();
    }
}

/// `dst` takes `src` for singular values, collections are concatenated (maps
/// with `src` winning on conflicts) and messages are merged recursively.
fn merge_value(dst: &mut Option<Value>, src: &Value) {
    match (dst.as_mut(), src) {
        (Some(Value::List(dst)), Value::List(src)) => dst.extend(src.iter().cloned()),
        (Some(Value::Map(dst)), Value::Map(src)) => dst.extend_from(src),
        (Some(Value::Message(dst)), Value::Message(src)) => *dst = dst.merge(src),
        _ => *dst = Some(src.clone()),
    }
}

/// An immutable protobuf message.
#[derive(Clone)]
pub struct MessageValue {
    descriptor: MessageDescriptor,
    fields: Arc<MessageFields>,
}

impl MessageValue {
    /// The message with no fields set.
    pub fn new(descriptor: MessageDescriptor) -> Self {
        let fields = Arc::new(MessageFields::new(&descriptor));
        MessageValue { descriptor, fields }
    }

    pub fn descriptor(&self) -> &MessageDescriptor {
        &self.descriptor
    }

    /// The value of a field, `None` if it is not set.
    ///
    /// Accepts the proto name or the JSON name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.descriptor
            .field_by_name(name)
            .and_then(|field| self.fields.get(field))
    }

    pub fn get_by_number(&self, number: u32) -> Option<&Value> {
        self.descriptor
            .field_by_number(number)
            .and_then(|field| self.fields.get(field))
    }

    /// The value of `field`, which must belong to this message or be one of
    /// its extensions.
    pub fn get_field(&self, field: &FieldDescriptor) -> Option<&Value> {
        self.fields.get(field)
    }

    /// The value of `field`, or the value it reads as when unset.
    pub fn get_field_or_default<'a>(&'a self, field: &'a FieldDescriptor) -> Cow<'a, Value> {
        if let Some(value) = self.fields.get(field) {
            return Cow::Borrowed(value);
        }
        if let Some(default) = field.default_value() {
            return Cow::Borrowed(default);
        }
        Cow::Owned(match field.kind() {
            _ if field.is_map() => Value::Map(MapValue::new()),
            _ if field.is_repeated() => Value::List(Vec::new()),
            Kind::Message(id) => {
                Value::Message(MessageValue::new(self.descriptor.related_message(id)))
            }
            Kind::Wrapper(scalar) | Kind::Scalar(scalar) => scalar.default_value(),
            Kind::Enum(id) => Value::EnumNumber(self.descriptor.related_enum(id).default_number()),
        })
    }

    /// Returns true if the field is set. Fields without presence are "set"
    /// when they differ from their default.
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The member of the named oneof that is currently set.
    pub fn which_oneof(&self, oneof: &str) -> Option<&FieldDescriptor> {
        let index = self
            .descriptor
            .oneofs()
            .iter()
            .position(|o| o.name() == oneof)?;
        let case = self.fields.oneofs[index].as_ref()?;
        self.descriptor.fields().get(case.field)
    }

    /// The value of an extension, by its fully-qualified name.
    pub fn extension(&self, full_name: &str) -> Option<&Value> {
        let field = self.descriptor.extension_by_name(full_name)?;
        self.fields.get(field)
    }

    pub fn unknown_fields(&self) -> &UnknownFieldSet {
        &self.fields.unknown
    }

    /// Set fields followed by set extensions, in schema order.
    pub fn fields(&self) -> impl Iterator<Item = (&FieldDescriptor, &Value)> + '_ {
        let regular = self
            .descriptor
            .fields()
            .iter()
            .filter_map(|field| self.fields.get(field).map(|value| (field, value)));
        let extensions = self.fields.extensions.iter().filter_map(|(number, value)| {
            self.descriptor
                .extension_by_number(*number)
                .map(|field| (field, value))
        });
        regular.chain(extensions)
    }

    /// A copy of this message with `name` set to `value`.
    pub fn with(&self, name: &str, value: impl Into<Value>) -> Result<MessageValue, SchemaError> {
        let field = lookup(&self.descriptor, name)?;
        let value = value.into();
        check_value(&self.descriptor, field, &value)?;

        let mut copy = self.clone();
        let fields = Arc::make_mut(&mut copy.fields);
        fields.put(field, Some(value));
        fields.size = OnceLock::new();
        Ok(copy)
    }

    /// A copy of this message with `name` cleared.
    pub fn without(&self, name: &str) -> Result<MessageValue, SchemaError> {
        let field = lookup(&self.descriptor, name)?;
        let mut copy = self.clone();
        let fields = Arc::make_mut(&mut copy.fields);
        fields.put(field, None);
        fields.size = OnceLock::new();
        Ok(copy)
    }

    /// `self` with `other` merged on top of it. `other` must be of the same
    /// message type, otherwise `self` is returned unchanged.
    pub fn merge(&self, other: &MessageValue) -> MessageValue {
        if self.descriptor != other.descriptor {
            tracing::debug!(
                into = self.descriptor.full_name(),
                from = other.descriptor.full_name(),
                "ignoring merge of mismatched message types"
            );
            return self.clone();
        }
        let mut merged = self.clone();
        Arc::make_mut(&mut merged.fields).merge_from(&self.descriptor, &other.fields);
        merged
    }

    /// A mutable copy of this message.
    pub fn to_builder(&self) -> MessageBuilder {
        MessageBuilder {
            descriptor: self.descriptor.clone(),
            fields: MessageFields::clone(&self.fields),
        }
    }

    /// The first required field that is not set.
    pub(crate) fn missing_required(&self) -> Option<&FieldDescriptor> {
        self.descriptor
            .fields()
            .iter()
            .find(|field| field.is_required() && self.fields.get(field).is_none())
    }

    pub(crate) fn size_cache(&self) -> &OnceLock<usize> {
        &self.fields.size
    }
}

impl PartialEq for MessageValue {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor == other.descriptor
            && (Arc::ptr_eq(&self.fields, &other.fields) || self.fields == other.fields)
    }
}

impl fmt::Debug for MessageValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.descriptor.full_name())?;
        let mut map = f.debug_map();
        for (field, value) in self.fields() {
            map.entry(&field.name(), value);
        }
        if !self.fields.unknown.is_empty() {
            map.entry(&"<unknown>", &self.fields.unknown);
        }
        map.finish()
    }
}

/// A mutable message under construction.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    descriptor: MessageDescriptor,
    fields: MessageFields,
}

impl MessageBuilder {
    pub fn new(descriptor: MessageDescriptor) -> Self {
        let fields = MessageFields::new(&descriptor);
        MessageBuilder { descriptor, fields }
    }

    pub fn descriptor(&self) -> &MessageDescriptor {
        &self.descriptor
    }

    /// Set a field, replacing its previous value.
    ///
    /// Repeated fields take a [`Value::List`], map fields a [`Value::Map`].
    /// Setting a member of a oneof clears the other members.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self, SchemaError> {
        let field = lookup(&self.descriptor, name)?.clone();
        self.set_field(&field, value.into())?;
        Ok(self)
    }

    /// Set the field numbered `number`.
    pub fn set_by_number(
        &mut self,
        number: u32,
        value: impl Into<Value>,
    ) -> Result<&mut Self, SchemaError> {
        let field = self
            .descriptor
            .field_by_number(number)
            .ok_or_else(|| SchemaError::NoSuchField {
                message: self.descriptor.full_name().to_owned(),
                field: number.to_string(),
            })?
            .clone();
        self.set_field(&field, value.into())?;
        Ok(self)
    }

    /// Set an extension by its fully-qualified name.
    pub fn set_extension(
        &mut self,
        full_name: &str,
        value: impl Into<Value>,
    ) -> Result<&mut Self, SchemaError> {
        let field = self
            .descriptor
            .extension_by_name(full_name)
            .ok_or_else(|| SchemaError::NoSuchField {
                message: self.descriptor.full_name().to_owned(),
                field: full_name.to_owned(),
            })?
            .clone();
        self.set_field(&field, value.into())?;
        Ok(self)
    }

    /// Set `field`, which must belong to this message or be one of its
    /// extensions.
    pub fn set_field(&mut self, field: &FieldDescriptor, value: Value) -> Result<(), SchemaError> {
        check_value(&self.descriptor, field, &value)?;
        self.fields.put(field, Some(value));
        Ok(())
    }

    pub fn clear(&mut self, name: &str) -> Result<&mut Self, SchemaError> {
        let field = lookup(&self.descriptor, name)?.clone();
        self.fields.put(&field, None);
        Ok(self)
    }

    /// Append to a repeated field.
    pub fn push(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self, SchemaError> {
        let field = lookup(&self.descriptor, name)?.clone();
        let value = value.into();
        if !field.is_repeated() || !value.is_valid_for(field.kind(), &self.descriptor) {
            return Err(mismatch(&self.descriptor, &field, &value));
        }
        self.push_unchecked(&field, value);
        Ok(self)
    }

    /// Insert an entry into a map field. `value` may be `None` for an entry
    /// without a value.
    pub fn insert(
        &mut self,
        name: &str,
        key: impl Into<MapKey>,
        value: impl Into<Option<Value>>,
    ) -> Result<&mut Self, SchemaError> {
        let field = lookup(&self.descriptor, name)?.clone();
        let (key, value) = (key.into(), value.into());
        let valid = field.map_entry().is_some_and(|entry| {
            key.is_valid_for(entry.key)
                && value
                    .as_ref()
                    .map_or(true, |v| v.is_valid_for(entry.value, &self.descriptor))
        });
        if !valid {
            return Err(SchemaError::TypeMismatch {
                message: self.descriptor.full_name().to_owned(),
                field: field.name().to_owned(),
                found: value.as_ref().map_or("map entry", Value::type_name),
            });
        }
        self.insert_unchecked(&field, key, value);
        Ok(self)
    }

    /// Record an occurrence of a field this message's schema does not know.
    pub fn add_unknown(&mut self, number: u32, value: UnknownValue) -> &mut Self {
        self.fields.unknown.add(number, value);
        self
    }

    /// Merge `other` into this message.
    pub fn merge(&mut self, other: &MessageValue) -> &mut Self {
        if self.descriptor == other.descriptor {
            self.fields.merge_from(&self.descriptor, &other.fields);
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.descriptor
            .field_by_name(name)
            .and_then(|field| self.fields.get(field))
    }

    /// Freeze this builder.
    pub fn build(self) -> MessageValue {
        let mut fields = self.fields;
        fields.size = OnceLock::new();
        MessageValue {
            descriptor: self.descriptor,
            fields: Arc::new(fields),
        }
    }

    pub(crate) fn get_field(&self, field: &FieldDescriptor) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Store an already validated singular value. Messages are merged into
    /// the existing value of the same field.
    pub(crate) fn set_unchecked(&mut self, field: &FieldDescriptor, value: Value) {
        if let (Some(Value::Message(existing)), Value::Message(incoming)) =
            (self.fields.get_mut(field), &value)
        {
            *existing = existing.merge(incoming);
            return;
        }
        self.fields.put(field, Some(value));
    }

    pub(crate) fn push_unchecked(&mut self, field: &FieldDescriptor, value: Value) {
        match self.fields.get_mut(field) {
            Some(Value::List(list)) => list.push(value),
            _ => self.fields.put(field, Some(Value::List(vec![value]))),
        }
    }

    pub(crate) fn extend_unchecked(&mut self, field: &FieldDescriptor, values: Vec<Value>) {
        if values.is_empty() {
            return;
        }
        match self.fields.get_mut(field) {
            Some(Value::List(list)) => list.extend(values),
            _ => self.fields.put(field, Some(Value::List(values))),
        }
    }

    pub(crate) fn insert_unchecked(&mut self, field: &FieldDescriptor, key: MapKey, value: Option<Value>) {
        match self.fields.get_mut(field) {
            Some(Value::Map(map)) => map.insert(key, value),
            _ => {
                let mut map = MapValue::new();
                map.insert(key, value);
                self.fields.put(field, Some(Value::Map(map)));
            }
        }
    }
}

fn lookup<'a>(descriptor: &'a MessageDescriptor, name: &str) -> Result<&'a FieldDescriptor, SchemaError> {
    descriptor
        .field_by_name(name)
        .or_else(|| descriptor.extension_by_name(name))
        .ok_or_else(|| SchemaError::NoSuchField {
            message: descriptor.full_name().to_owned(),
            field: name.to_owned(),
        })
}

fn mismatch(descriptor: &MessageDescriptor, field: &FieldDescriptor, value: &Value) -> SchemaError {
    SchemaError::TypeMismatch {
        message: descriptor.full_name().to_owned(),
        field: field.name().to_owned(),
        found: value.type_name(),
    }
}

/// Checks that `value` has the shape `field` stores.
fn check_value(
    descriptor: &MessageDescriptor,
    field: &FieldDescriptor,
    value: &Value,
) -> Result<(), SchemaError> {
    let valid = match (field.map_entry(), value) {
        (Some(entry), Value::Map(map)) => map.iter().all(|(key, value)| {
            key.is_valid_for(entry.key)
                && value.map_or(true, |v| v.is_valid_for(entry.value, descriptor))
        }),
        (Some(_), _) => false,
        (None, Value::List(values)) if field.is_repeated() => values
            .iter()
            .all(|v| v.is_valid_for(field.kind(), descriptor)),
        (None, _) if field.is_repeated() => false,
        (None, value) => value.is_valid_for(field.kind(), descriptor),
    };
    if valid {
        Ok(())
    } else {
        Err(mismatch(descriptor, field, value))
    }
}
