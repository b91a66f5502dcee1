//! Small helpers shared across the codec.

#[inline(always)]
#[cold]
fn cold_path() {}

/// "Annotation" to hint that a branch of an if-statement is likely to occur.
#[inline(always)]
pub(crate) fn likely(b: bool) -> bool {
    if b {
        true
    } else {
        cold_path();
        false
    }
}

/// "Annotation" to hint that a branch of an if-statement is _not likely_ to occur.
#[inline(always)]
pub(crate) fn unlikely(b: bool) -> bool {
    if b {
        cold_path();
        true
    } else {
        false
    }
}

/// Infallible, lossless conversion between integer types.
///
/// Exists because `From<u32> for usize` is not implemented by the standard
/// library, and we deny `as` conversions crate-wide.
pub(crate) trait CastFrom<T> {
    fn cast_from(from: T) -> Self;
}

macro_rules! cast_from {
    ($($from:ty => $to:ty),+ $(,)?) => {$(
        impl CastFrom<$from> for $to {
            #[inline(always)]
            #[allow(clippy::as_conversions)]
            fn cast_from(from: $from) -> $to {
                from as $to
            }
        }
    )+};
}

// `u32 => usize` below relies on this.
static_assertions::const_assert!(usize::BITS >= 32);

cast_from! {
    u8 => u32,
    u8 => u64,
    u8 => usize,
    u32 => u64,
    u32 => usize,
    usize => u64,
}

/// Converts a `snake_case` protobuf name into its `lowerCamelCase` JSON name.
///
/// Follows protoc: underscores are dropped and the following character is
/// upper-cased, everything else is left untouched.
pub(crate) fn to_lower_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut capitalize_next = false;
    for c in name.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            out.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Converts a `lowerCamelCase` name back to `snake_case`.
///
/// Used by the `FieldMask` JSON mapping, where paths are camelCase on the wire.
pub(crate) fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{to_lower_camel, to_snake_case};

    #[test]
    fn test_lower_camel() {
        assert_eq!(to_lower_camel("optional_float"), "optionalFloat");
        assert_eq!(to_lower_camel("val"), "val");
        assert_eq!(to_lower_camel("field_name_1"), "fieldName1");
        assert_eq!(to_lower_camel("__weird"), "Weird");
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("fooBar"), "foo_bar");
        assert_eq!(to_snake_case("foo"), "foo");
        assert_eq!(to_snake_case("aBC"), "a_b_c");
    }
}
