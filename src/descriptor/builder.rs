//! Two-phase construction of a [`DescriptorPool`].
//!
//! Types are first *declared*, which hands out the [`MessageId`] / [`EnumId`]
//! other definitions refer to, and then *defined*. This is what allows a
//! message to contain itself, or two messages to contain each other.

use std::collections::HashSet;
use std::sync::Arc;

use crate::descriptor::{
    Cardinality, DescriptorPool, EnumData, EnumId, EnumValue, FieldAccessor, FieldDescriptor,
    Kind, MapEntry, MessageData, MessageId, OneofDescriptor, Scalar, Syntax,
};
use crate::error::SchemaError;
use crate::util::to_lower_camel;
use crate::value::Value;
use crate::wire;

/// Description of a single field, handed to [`PoolBuilder::define_message`]
/// or [`PoolBuilder::define_extension`].
#[derive(Debug, Clone)]
pub struct FieldDef {
    name: String,
    number: u32,
    kind: Kind,
    cardinality: Cardinality,
    explicit_presence: bool,
    packed: Option<bool>,
    json_name: Option<String>,
    default: Option<Value>,
    oneof: Option<String>,
    map_key: Option<Scalar>,
}

impl FieldDef {
    /// A singular field of any kind.
    pub fn new(name: impl Into<String>, number: u32, kind: Kind) -> Self {
        FieldDef {
            name: name.into(),
            number,
            kind,
            cardinality: Cardinality::Optional,
            explicit_presence: false,
            packed: None,
            json_name: None,
            default: None,
            oneof: None,
            map_key: None,
        }
    }

    pub fn scalar(name: impl Into<String>, number: u32, scalar: Scalar) -> Self {
        FieldDef::new(name, number, Kind::Scalar(scalar))
    }

    pub fn message(name: impl Into<String>, number: u32, message: MessageId) -> Self {
        FieldDef::new(name, number, Kind::Message(message))
    }

    pub fn enumeration(name: impl Into<String>, number: u32, enumeration: EnumId) -> Self {
        FieldDef::new(name, number, Kind::Enum(enumeration))
    }

    /// A `google.protobuf.*Value` field holding the bare `scalar`.
    pub fn wrapper(name: impl Into<String>, number: u32, scalar: Scalar) -> Self {
        FieldDef::new(name, number, Kind::Wrapper(scalar))
    }

    /// A `map<key, value>` field.
    pub fn map(name: impl Into<String>, number: u32, key: Scalar, value: Kind) -> Self {
        let mut def = FieldDef::new(name, number, value);
        def.map_key = Some(key);
        def
    }

    pub fn repeated(mut self) -> Self {
        self.cardinality = Cardinality::Repeated;
        self
    }

    /// A proto2 `required` field.
    pub fn required(mut self) -> Self {
        self.cardinality = Cardinality::Required;
        self
    }

    /// Track presence for this field, like proto3 `optional`.
    pub fn optional(mut self) -> Self {
        self.explicit_presence = true;
        self
    }

    /// Override the packed encoding, which otherwise defaults to packed for
    /// repeated scalars of proto3 messages.
    pub fn packed(mut self, packed: bool) -> Self {
        self.packed = Some(packed);
        self
    }

    /// Override the JSON name, which defaults to the camelCase name.
    pub fn json_name(mut self, json_name: impl Into<String>) -> Self {
        self.json_name = Some(json_name.into());
        self
    }

    /// Explicit (proto2) default value.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Make this field a member of the named oneof.
    pub fn oneof(mut self, oneof: impl Into<String>) -> Self {
        self.oneof = Some(oneof.into());
        self
    }
}

/// Description of the body of a message.
#[derive(Debug, Clone, Default)]
pub struct MessageDef {
    syntax: Syntax,
    fields: Vec<FieldDef>,
}

impl MessageDef {
    pub fn new(syntax: Syntax) -> Self {
        MessageDef {
            syntax,
            fields: Vec::new(),
        }
    }

    pub fn proto2() -> Self {
        MessageDef::new(Syntax::Proto2)
    }

    pub fn proto3() -> Self {
        MessageDef::new(Syntax::Proto3)
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = FieldDef>) -> Self {
        self.fields.extend(fields);
        self
    }
}

/// Builds a [`DescriptorPool`].
#[derive(Debug, Default)]
pub struct PoolBuilder {
    message_names: Vec<String>,
    messages: Vec<Option<MessageData>>,
    enums: Vec<EnumData>,
    names: HashSet<String>,
    extensions: Vec<(MessageId, String, FieldDef)>,
}

impl PoolBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn claim_name(&mut self, name: &str) -> Result<(), SchemaError> {
        if !self.names.insert(name.to_owned()) {
            return Err(SchemaError::DuplicateName {
                name: name.to_owned(),
            });
        }
        Ok(())
    }

    /// Declare a message, returning the id other fields use to refer to it.
    pub fn declare_message(&mut self, full_name: impl Into<String>) -> Result<MessageId, SchemaError> {
        let full_name = full_name.into();
        self.claim_name(&full_name)?;
        let id = MessageId(self.messages.len());
        self.message_names.push(full_name);
        self.messages.push(None);
        Ok(id)
    }

    /// Declare and define an enum. The first value is the default.
    pub fn declare_enum<N: Into<String>>(
        &mut self,
        full_name: impl Into<String>,
        values: impl IntoIterator<Item = (N, i32)>,
    ) -> Result<EnumId, SchemaError> {
        let full_name = full_name.into();
        let values: Vec<_> = values
            .into_iter()
            .map(|(name, number)| EnumValue {
                name: name.into(),
                number,
            })
            .collect();
        if values.is_empty() {
            return Err(SchemaError::EmptyEnum { name: full_name });
        }
        self.claim_name(&full_name)?;

        let id = EnumId(self.enums.len());
        self.enums.push(EnumData::new(full_name, values));
        Ok(id)
    }

    /// Attach fields to a previously declared message.
    pub fn define_message(&mut self, id: MessageId, def: MessageDef) -> Result<(), SchemaError> {
        let full_name = self.message_name(id)?.to_owned();
        if matches!(self.messages.get(id.0), Some(Some(_))) {
            return Err(SchemaError::AlreadyDefined { name: full_name });
        }

        let mut data = MessageData::new(full_name);
        data.syntax = def.syntax;
        for field in def.fields {
            let accessor = match &field.oneof {
                Some(oneof) => {
                    let index = match data.oneofs.iter().position(|o| &o.name == oneof) {
                        Some(index) => index,
                        None => {
                            data.oneofs.push(OneofDescriptor {
                                name: oneof.clone(),
                                fields: Vec::new(),
                            });
                            data.oneofs.len() - 1
                        }
                    };
                    FieldAccessor::Oneof(index)
                }
                None => FieldAccessor::Slot(data.slot_count),
            };

            if data.has_number(field.number) {
                return Err(SchemaError::DuplicateFieldNumber {
                    message: data.full_name,
                    number: field.number,
                });
            }
            if data.fields.iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateFieldName {
                    message: data.full_name,
                    field: field.name,
                });
            }

            let mut descriptor = self.resolve_field(&data.full_name, data.syntax, field, accessor)?;
            descriptor.index = data.fields.len();
            match accessor {
                FieldAccessor::Slot(_) => data.slot_count += 1,
                FieldAccessor::Oneof(oneof) => data.oneofs[oneof].fields.push(descriptor.index),
                FieldAccessor::Extension => (),
            }
            data.push_field(descriptor);
        }

        self.messages[id.0] = Some(data);
        Ok(())
    }

    /// Register an extension of `extendee`.
    ///
    /// Extensions are attached when the pool is built, so the extendee does
    /// not have to be defined yet.
    pub fn define_extension(
        &mut self,
        extendee: MessageId,
        full_name: impl Into<String>,
        def: FieldDef,
    ) -> Result<(), SchemaError> {
        let full_name = full_name.into();
        self.message_name(extendee)?;
        if def.oneof.is_some() || def.map_key.is_some() {
            return Err(SchemaError::InvalidModifiers {
                message: full_name,
                field: def.name,
            });
        }
        self.claim_name(&full_name)?;
        self.extensions.push((extendee, full_name, def));
        Ok(())
    }

    /// Freeze the pool. Fails if a declared message was never defined.
    pub fn build(self) -> Result<Arc<DescriptorPool>, SchemaError> {
        let mut messages = Vec::with_capacity(self.messages.len());
        for (data, name) in self.messages.iter().zip(&self.message_names) {
            if data.is_none() {
                return Err(SchemaError::Undefined { name: name.clone() });
            }
        }

        let mut extensions = Vec::with_capacity(self.extensions.len());
        for (extendee, full_name, def) in &self.extensions {
            let extendee_name = &self.message_names[extendee.0];
            let syntax = self.messages[extendee.0]
                .as_ref()
                .map_or(Syntax::Proto2, |data| data.syntax);
            let mut descriptor =
                self.resolve_field(extendee_name, syntax, def.clone(), FieldAccessor::Extension)?;
            descriptor.full_name = full_name.clone();
            // Extensions always carry presence, whatever the extendee's syntax.
            descriptor.has_presence = !descriptor.is_repeated();
            extensions.push((*extendee, descriptor));
        }

        messages.extend(self.messages.into_iter().flatten());
        let extension_count = extensions.len();
        for (extendee, descriptor) in extensions {
            let data = &mut messages[extendee.0];
            if data.has_number(descriptor.number) {
                return Err(SchemaError::DuplicateFieldNumber {
                    message: data.full_name.clone(),
                    number: descriptor.number,
                });
            }
            data.push_extension(descriptor);
        }

        tracing::debug!(
            messages = messages.len(),
            enums = self.enums.len(),
            extensions = extension_count,
            "built descriptor pool"
        );
        Ok(Arc::new(DescriptorPool::from_parts(messages, self.enums)))
    }

    fn message_name(&self, id: MessageId) -> Result<&str, SchemaError> {
        self.message_names
            .get(id.0)
            .map(String::as_str)
            .ok_or_else(|| SchemaError::Undefined {
                name: format!("message #{}", id.0),
            })
    }

    fn check_kind(&self, kind: Kind) -> Result<(), SchemaError> {
        match kind {
            Kind::Message(id) => self.message_name(id).map(|_| ()),
            Kind::Enum(id) if id.0 >= self.enums.len() => Err(SchemaError::Undefined {
                name: format!("enum #{}", id.0),
            }),
            Kind::Enum(_) | Kind::Scalar(_) | Kind::Wrapper(_) => Ok(()),
        }
    }

    fn resolve_field(
        &self,
        message: &str,
        syntax: Syntax,
        def: FieldDef,
        accessor: FieldAccessor,
    ) -> Result<FieldDescriptor, SchemaError> {
        let invalid_modifiers = || SchemaError::InvalidModifiers {
            message: message.to_owned(),
            field: def.name.clone(),
        };

        if !wire::is_valid_field_number(def.number) {
            return Err(SchemaError::InvalidFieldNumber {
                message: message.to_owned(),
                number: def.number,
            });
        }
        self.check_kind(def.kind)?;
        if let Kind::Wrapper(scalar) = def.kind {
            if scalar.wrapper_name().is_none() {
                return Err(invalid_modifiers());
            }
        }

        let in_oneof = def.oneof.is_some();
        let cardinality = match (def.map_key, def.cardinality) {
            (Some(key), Cardinality::Optional) if !in_oneof && !def.explicit_presence => {
                if !key.is_valid_map_key() {
                    return Err(SchemaError::InvalidMapKey {
                        message: message.to_owned(),
                        field: def.name,
                    });
                }
                Cardinality::Repeated
            }
            (Some(_), _) => return Err(invalid_modifiers()),
            (None, Cardinality::Required) if syntax == Syntax::Proto3 || in_oneof => {
                return Err(invalid_modifiers())
            }
            (None, Cardinality::Repeated) if in_oneof || def.explicit_presence => {
                return Err(invalid_modifiers())
            }
            (None, cardinality) => cardinality,
        };
        let repeated = cardinality == Cardinality::Repeated;
        let is_map = def.map_key.is_some();

        let packable = repeated && !is_map && def.kind.is_packable();
        let packed = match def.packed {
            Some(true) if !packable => {
                return Err(SchemaError::InvalidPacked {
                    message: message.to_owned(),
                    field: def.name,
                })
            }
            Some(packed) => packed,
            None => packable && syntax == Syntax::Proto3,
        };

        let has_presence = match cardinality {
            Cardinality::Repeated => false,
            Cardinality::Required => true,
            Cardinality::Optional => {
                def.kind.is_message() || in_oneof || def.explicit_presence || syntax == Syntax::Proto2
            }
        };

        let zero = match def.kind {
            Kind::Scalar(scalar) => Some(scalar.default_value()),
            Kind::Enum(id) => self.enums[id.0]
                .values
                .first()
                .map(|value| Value::EnumNumber(value.number)),
            Kind::Message(_) | Kind::Wrapper(_) => None,
        };
        let default = match def.default {
            Some(value) => {
                let valid = !repeated
                    && match def.kind {
                        Kind::Scalar(scalar) => scalar.accepts(&value),
                        Kind::Enum(_) => matches!(value, Value::EnumNumber(_)),
                        Kind::Message(_) | Kind::Wrapper(_) => false,
                    };
                if !valid {
                    return Err(SchemaError::InvalidDefault {
                        message: message.to_owned(),
                        field: def.name,
                    });
                }
                Some(value)
            }
            None if repeated => None,
            None => zero,
        };

        let oneof = match accessor {
            FieldAccessor::Oneof(index) => Some(index),
            FieldAccessor::Slot(_) | FieldAccessor::Extension => None,
        };

        Ok(FieldDescriptor {
            number: def.number,
            full_name: format!("{message}.{}", def.name),
            json_name: def.json_name.unwrap_or_else(|| to_lower_camel(&def.name)),
            name: def.name,
            kind: def.kind,
            cardinality,
            has_presence,
            packed,
            map_entry: def.map_key.map(|key| MapEntry {
                key,
                value: def.kind,
            }),
            default,
            oneof,
            accessor,
            index: 0,
        })
    }
}
