//! Numbers in the JSON mapping.
//!
//! Integers may arrive as JSON numbers or strings, and in exponent or
//! trailing-zero form as long as the value is integral. Floats additionally
//! accept the quoted sentinels `"NaN"`, `"Infinity"` and `"-Infinity"`.

// Float to integer casts only happen after the value is known to be integral
// and in range.
#![allow(clippy::as_conversions)]

use serde_json::Value as Json;

use crate::error::DecodeError;

/// The integer held by `json`, wide enough for every protobuf integer type.
pub(crate) fn integer(json: &Json) -> Result<i128, DecodeError> {
    match json {
        Json::Number(n) => {
            if let Some(v) = n.as_i64() {
                Ok(i128::from(v))
            } else if let Some(v) = n.as_u64() {
                Ok(i128::from(v))
            } else {
                n.as_f64()
                    .ok_or_else(DecodeError::unparsable_number)
                    .and_then(integral)
            }
        }
        Json::String(s) => parse_integer(s),
        _ => Err(DecodeError::invalid_json_type("integer")),
    }
}

/// Parse a quoted integer, as found in strings and map keys.
pub(crate) fn parse_integer(s: &str) -> Result<i128, DecodeError> {
    match s.as_bytes() {
        [] | [b' ', ..] | [.., b' '] | [b'+', ..] | [b'-', b'0', ..] | [b'0', _, ..] => {
            return Err(DecodeError::unparsable_number())
        }
        _ => (),
    }
    if let Ok(v) = s.parse::<i128>() {
        return Ok(v);
    }
    check_decimal(s)?;
    let v: f64 = s
        .parse()
        .map_err(|err| DecodeError::unparsable_number().with_source(err))?;
    integral(v)
}

/// Narrow to the field's integer type.
pub(crate) fn narrow<T: TryFrom<i128>>(v: i128) -> Result<T, DecodeError> {
    T::try_from(v).map_err(|_| DecodeError::number_out_of_range())
}

fn integral(v: f64) -> Result<i128, DecodeError> {
    if !v.is_finite() {
        return Err(DecodeError::number_out_of_range());
    }
    if v.fract() != 0.0 {
        return Err(DecodeError::unparsable_number());
    }
    if v.abs() >= i128::MAX as f64 {
        return Err(DecodeError::number_out_of_range());
    }
    Ok(v as i128)
}

/// Rust's float parser also accepts `inf` and `nan` spellings, which the JSON
/// mapping does not.
fn check_decimal(s: &str) -> Result<(), DecodeError> {
    let valid = s
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E'));
    if valid {
        Ok(())
    } else {
        Err(DecodeError::unparsable_number())
    }
}

pub(crate) fn double(json: &Json) -> Result<f64, DecodeError> {
    let v = match json {
        Json::Number(n) => n.as_f64().ok_or_else(DecodeError::unparsable_number)?,
        Json::String(s) => match s.as_str() {
            "NaN" => return Ok(f64::NAN),
            "Infinity" => return Ok(f64::INFINITY),
            "-Infinity" => return Ok(f64::NEG_INFINITY),
            s => {
                check_decimal(s)?;
                s.parse()
                    .map_err(|err| DecodeError::unparsable_number().with_source(err))?
            }
        },
        _ => return Err(DecodeError::invalid_json_type("number")),
    };
    if v.is_finite() {
        Ok(v)
    } else {
        Err(DecodeError::number_out_of_range())
    }
}

pub(crate) fn float(json: &Json) -> Result<f32, DecodeError> {
    let v = double(json)?;
    if v.is_finite() && v.abs() > f64::from(f32::MAX) {
        return Err(DecodeError::number_out_of_range());
    }
    Ok(v as f32)
}

/// A float as a JSON value: a number, or a sentinel string when not finite.
pub(crate) fn from_double(v: f64) -> Json {
    match serde_json::Number::from_f64(v) {
        Some(n) => Json::Number(n),
        None if v.is_nan() => Json::String("NaN".to_owned()),
        None if v > 0.0 => Json::String("Infinity".to_owned()),
        None => Json::String("-Infinity".to_owned()),
    }
}

/// Widen through the shortest decimal form, so `0.1f32` prints as `0.1`.
pub(crate) fn from_float(v: f32) -> Json {
    let widened = if v.is_finite() {
        format!("{v}").parse().unwrap_or(f64::from(v))
    } else {
        f64::from(v)
    };
    from_double(widened)
}
