//! Error types.
//!
//! Every failure while decoding binary or JSON input is a [`DecodeError`]: a
//! [`DecodeErrorKind`] reason plus, optionally, the message/field it happened
//! in and an underlying cause. Mistakes made while describing a schema or
//! populating a [`MessageBuilder`](crate::MessageBuilder) are [`SchemaError`]s.

use core::fmt;

/// Why a protobuf input was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum DecodeErrorKind {
    #[error("input ended unexpectedly in the middle of a field")]
    TruncatedMessage,
    #[error("embedded string or message claimed to have negative size")]
    NegativeSize,
    #[error("malformed varint")]
    MalformedVarint,
    #[error("invalid tag: {reason}")]
    InvalidTag { reason: &'static str },
    #[error("end-group tag did not match an open group")]
    InvalidEndTag,
    #[error("invalid 'wire type' value: {value}")]
    InvalidWireType { value: u8 },
    #[error("message exceeds the size limit of {limit} bytes")]
    SizeLimitExceeded { limit: usize },
    #[error("message nesting exceeds the recursion limit of {limit}")]
    RecursionLimitExceeded { limit: u32 },
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,
    #[error("invalid packed field length: {actual} is not a multiple of {expected_multiple}")]
    InvalidPackedLength { expected_multiple: u8, actual: usize },
    #[error("invalid JSON type, expected {expected}")]
    InvalidJsonType { expected: &'static str },
    #[error("input is not valid JSON")]
    MalformedJson,
    #[error("missing required field '{name}'")]
    MissingRequiredField { name: String },
    #[error("unknown field '{name}' and ignore_unknown_fields is not set")]
    UnknownFieldRejected { name: String },
    #[error("multiple fields of oneof '{oneof}' are set")]
    OneofConflict { oneof: String },
    #[error("number out of range for the field type")]
    NumberOutOfRange,
    #[error("unparsable number")]
    UnparsableNumber,
}

/// Where a [`DecodeError`] happened.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Context {
    message: String,
    field: Option<String>,
}

/// An invalid protocol buffer, either binary or JSON.
///
/// Decoding never returns a partially populated message: any `DecodeError`
/// is terminal for that decode call.
pub struct DecodeError {
    kind: DecodeErrorKind,
    context: Option<Box<Context>>,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl DecodeError {
    /// Create a new error with the provided reason.
    #[cold]
    pub fn new(kind: DecodeErrorKind) -> Self {
        DecodeError {
            kind,
            context: None,
            source: None,
        }
    }

    /// The reason this input was rejected.
    pub fn kind(&self) -> &DecodeErrorKind {
        &self.kind
    }

    /// Fully-qualified name of the message being read when the error occurred.
    pub fn message_name(&self) -> Option<&str> {
        self.context.as_ref().map(|ctx| ctx.message.as_str())
    }

    /// Name of the field being read when the error occurred.
    pub fn field_name(&self) -> Option<&str> {
        self.context.as_ref().and_then(|ctx| ctx.field.as_deref())
    }

    /// Attach an underlying cause.
    #[cold]
    pub(crate) fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Record which message (and field) was being read.
    ///
    /// The innermost context wins: an error that already knows where it
    /// happened is returned unchanged.
    #[cold]
    pub(crate) fn in_message(mut self, message: &str, field: Option<&str>) -> Self {
        if self.context.is_none() {
            self.context = Some(Box::new(Context {
                message: message.to_owned(),
                field: field.map(str::to_owned),
            }));
        }
        self
    }

    #[cold]
    pub(crate) fn truncated() -> Self {
        Self::new(DecodeErrorKind::TruncatedMessage)
    }

    #[cold]
    pub(crate) fn negative_size() -> Self {
        Self::new(DecodeErrorKind::NegativeSize)
    }

    #[cold]
    pub(crate) fn malformed_varint() -> Self {
        Self::new(DecodeErrorKind::MalformedVarint)
    }

    #[cold]
    pub(crate) fn invalid_tag(reason: &'static str) -> Self {
        Self::new(DecodeErrorKind::InvalidTag { reason })
    }

    #[cold]
    pub(crate) fn invalid_end_tag() -> Self {
        Self::new(DecodeErrorKind::InvalidEndTag)
    }

    #[cold]
    pub(crate) fn invalid_wire_type(value: u8) -> Self {
        Self::new(DecodeErrorKind::InvalidWireType { value })
    }

    #[cold]
    pub(crate) fn invalid_json_type(expected: &'static str) -> Self {
        Self::new(DecodeErrorKind::InvalidJsonType { expected })
    }

    #[cold]
    pub(crate) fn number_out_of_range() -> Self {
        Self::new(DecodeErrorKind::NumberOutOfRange)
    }

    #[cold]
    pub(crate) fn unparsable_number() -> Self {
        Self::new(DecodeErrorKind::UnparsableNumber)
    }
}

impl From<DecodeErrorKind> for DecodeError {
    fn from(kind: DecodeErrorKind) -> Self {
        DecodeError::new(kind)
    }
}

impl fmt::Debug for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("DecodeError");
        s.field("kind", &self.kind);
        if let Some(ctx) = &self.context {
            s.field("message", &ctx.message);
            s.field("field", &ctx.field);
        }
        if let Some(source) = &self.source {
            s.field("source", source);
        }
        s.finish()
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.context.as_deref() {
            Some(Context {
                message,
                field: Some(field),
            }) => write!(f, "unable to read message '{message}', field '{field}': ")?,
            Some(Context {
                message,
                field: None,
            }) => write!(f, "unable to read message '{message}': ")?,
            None => (),
        }
        write!(f, "{}", self.kind)?;
        if let Some(source) = &self.source {
            write!(f, " ({source})")?;
        }
        Ok(())
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// An invalid schema, or a value that does not fit its schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SchemaError {
    #[error("type '{name}' is declared more than once")]
    DuplicateName { name: String },
    #[error("type '{name}' was declared but never defined")]
    Undefined { name: String },
    #[error("message '{name}' is already defined")]
    AlreadyDefined { name: String },
    #[error("field number {number} in '{message}' is outside the valid range or reserved")]
    InvalidFieldNumber { message: String, number: u32 },
    #[error("field number {number} is used more than once in '{message}'")]
    DuplicateFieldNumber { message: String, number: u32 },
    #[error("field name '{field}' is used more than once in '{message}'")]
    DuplicateFieldName { message: String, field: String },
    #[error("field '{field}' of '{message}' has an invalid map key type")]
    InvalidMapKey { message: String, field: String },
    #[error("field '{field}' of '{message}' cannot be packed")]
    InvalidPacked { message: String, field: String },
    #[error("field '{field}' of '{message}' has an invalid default value")]
    InvalidDefault { message: String, field: String },
    #[error("field '{field}' of '{message}' combines incompatible modifiers")]
    InvalidModifiers { message: String, field: String },
    #[error("enum '{name}' has no values")]
    EmptyEnum { name: String },
    #[error("no field '{field}' in '{message}'")]
    NoSuchField { message: String, field: String },
    #[error("field '{field}' of '{message}' does not accept a {found} value")]
    TypeMismatch {
        message: String,
        field: String,
        found: &'static str,
    },
}
