use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::descriptor::MessageDescriptor;
use crate::error::DecodeError;
use crate::message::MessageValue;

/// A custom JSON form for one message type.
pub trait JsonAdapter: fmt::Debug + Send + Sync {
    /// Fully-qualified name of the message type this adapter handles.
    fn type_name(&self) -> &str;

    fn encode(&self, message: &MessageValue, config: &JsonConfig) -> serde_json::Value;

    fn decode(
        &self,
        descriptor: &MessageDescriptor,
        json: &serde_json::Value,
        config: &JsonConfig,
    ) -> Result<MessageValue, DecodeError>;
}

/// Options for the JSON mapping.
#[derive(Debug, Clone)]
pub struct JsonConfig {
    /// Skip object keys that match no field instead of failing.
    pub(crate) ignore_unknown_fields: bool,
    /// Emit JSON text without whitespace.
    pub(crate) compact_output: bool,
    /// Emit fields without presence even when they hold their default.
    pub(crate) emit_default_values: bool,
    /// Key output by the proto field name rather than the JSON name.
    pub(crate) preserve_proto_field_names: bool,
    pub(crate) adapters: HashMap<String, Arc<dyn JsonAdapter>>,
}

impl Default for JsonConfig {
    fn default() -> Self {
        let adapters = super::wkt::adapters()
            .into_iter()
            .map(|adapter| (adapter.type_name().to_owned(), adapter))
            .collect();
        JsonConfig {
            ignore_unknown_fields: false,
            compact_output: true,
            emit_default_values: false,
            preserve_proto_field_names: false,
            adapters,
        }
    }
}

impl JsonConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore_unknown_fields(&mut self, ignore: bool) -> &mut Self {
        self.ignore_unknown_fields = ignore;
        self
    }

    pub fn compact_output(&mut self, compact: bool) -> &mut Self {
        self.compact_output = compact;
        self
    }

    pub fn emit_default_values(&mut self, emit: bool) -> &mut Self {
        self.emit_default_values = emit;
        self
    }

    pub fn preserve_proto_field_names(&mut self, preserve: bool) -> &mut Self {
        self.preserve_proto_field_names = preserve;
        self
    }

    /// Register `adapter`, replacing any adapter for the same type.
    pub fn adapter(&mut self, adapter: Arc<dyn JsonAdapter>) -> &mut Self {
        self.adapters.insert(adapter.type_name().to_owned(), adapter);
        self
    }

    /// Drop every registered adapter, including the built-in ones.
    pub fn clear_adapters(&mut self) -> &mut Self {
        self.adapters.clear();
        self
    }

    pub(crate) fn adapter_for(&self, type_name: &str) -> Option<&dyn JsonAdapter> {
        self.adapters.get(type_name).map(Arc::as_ref)
    }
}
