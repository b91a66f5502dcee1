//! JSON forms of the well-known types.

use std::sync::Arc;

use serde_json::{Map, Value as Json};

use crate::descriptor::{FieldDescriptor, Kind, MessageDescriptor, Scalar};
use crate::error::{DecodeError, DecodeErrorKind, SchemaError};
use crate::json::decode::{decode_message, decode_scalar};
use crate::json::encode::{encode_message, encode_scalar};
use crate::json::{number, JsonAdapter, JsonConfig};
use crate::message::{MessageBuilder, MessageValue};
use crate::util::{to_lower_camel, to_snake_case};
use crate::value::{MapValue, Value};
use crate::wkt;

/// Largest magnitude of a `Duration`, about 10,000 years.
const MAX_DURATION_SECONDS: u64 = 315_576_000_000;
/// `0001-01-01T00:00:00Z`.
const MIN_TIMESTAMP_SECONDS: i64 = -62_135_596_800;
/// `9999-12-31T23:59:59Z`.
const MAX_TIMESTAMP_SECONDS: i64 = 253_402_300_799;
const NANOS_PER_SECOND: u32 = 1_000_000_000;
const SECONDS_PER_DAY: i64 = 86_400;

/// The adapters registered on every new [`JsonConfig`].
pub(crate) fn adapters() -> Vec<Arc<dyn JsonAdapter>> {
    let mut adapters: Vec<Arc<dyn JsonAdapter>> = vec![
        Arc::new(DurationAdapter),
        Arc::new(TimestampAdapter),
        Arc::new(FieldMaskAdapter),
        Arc::new(StructAdapter),
        Arc::new(ValueAdapter),
        Arc::new(ListValueAdapter),
        Arc::new(EmptyAdapter),
    ];
    for scalar in wkt::WRAPPED_SCALARS {
        adapters.push(Arc::new(WrapperAdapter(scalar)));
    }
    adapters
}

/// A well-known type whose descriptor does not have the expected shape.
#[cold]
fn unexpected_schema(err: SchemaError) -> DecodeError {
    DecodeError::invalid_json_type("well-known type").with_source(err)
}

fn field<'a>(descriptor: &'a MessageDescriptor, name: &str) -> Result<&'a FieldDescriptor, DecodeError> {
    descriptor.field_by_name(name).ok_or_else(|| {
        unexpected_schema(SchemaError::NoSuchField {
            message: descriptor.full_name().to_owned(),
            field: name.to_owned(),
        })
    })
}

/// The message type of a message-typed field.
fn message_type(descriptor: &MessageDescriptor, field: &FieldDescriptor) -> Result<MessageDescriptor, DecodeError> {
    match field.map_entry().map_or(field.kind(), |entry| entry.value) {
        Kind::Message(id) => Ok(descriptor.related_message(id)),
        _ => Err(unexpected_schema(SchemaError::TypeMismatch {
            message: descriptor.full_name().to_owned(),
            field: field.name().to_owned(),
            found: "message",
        })),
    }
}

fn set(builder: &mut MessageBuilder, name: &str, value: impl Into<Value>) -> Result<(), DecodeError> {
    builder.set(name, value).map_err(unexpected_schema)?;
    Ok(())
}

fn seconds_and_nanos(message: &MessageValue) -> (i64, i32) {
    let seconds = message.get("seconds").and_then(Value::as_i64).unwrap_or(0);
    let nanos = message.get("nanos").and_then(Value::as_i32).unwrap_or(0);
    (seconds, nanos)
}

/// Fraction of a second with 0, 3, 6 or 9 digits.
fn format_nanos(nanos: u32) -> String {
    if nanos == 0 {
        String::new()
    } else if nanos % 1_000_000 == 0 {
        format!(".{:03}", nanos / 1_000_000)
    } else if nanos % 1_000 == 0 {
        format!(".{:06}", nanos / 1_000)
    } else {
        format!(".{nanos:09}")
    }
}

/// Parse 1 to 9 fractional digits into nanoseconds.
fn parse_nanos(digits: &str) -> Option<u32> {
    if digits.is_empty() || digits.len() > 9 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u32 = digits.parse().ok()?;
    let scale = 10u32.pow(u32::try_from(9 - digits.len()).ok()?);
    Some(value * scale)
}

fn parse_digits(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[derive(Debug)]
struct DurationAdapter;

impl JsonAdapter for DurationAdapter {
    fn type_name(&self) -> &str {
        wkt::DURATION
    }

    fn encode(&self, message: &MessageValue, _: &JsonConfig) -> Json {
        let (seconds, nanos) = seconds_and_nanos(message);
        let sign = if seconds < 0 || nanos < 0 { "-" } else { "" };
        Json::String(format!(
            "{sign}{}{}s",
            seconds.unsigned_abs(),
            format_nanos(nanos.unsigned_abs())
        ))
    }

    fn decode(
        &self,
        descriptor: &MessageDescriptor,
        json: &Json,
        _: &JsonConfig,
    ) -> Result<MessageValue, DecodeError> {
        let invalid = || DecodeError::invalid_json_type("duration string");
        let text = json.as_str().ok_or_else(invalid)?;
        let text = text.strip_suffix('s').ok_or_else(invalid)?;
        let (negative, text) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let (whole, fraction) = match text.split_once('.') {
            Some((whole, fraction)) => (whole, parse_nanos(fraction).ok_or_else(invalid)?),
            None => (text, 0),
        };
        let whole = parse_digits(whole).ok_or_else(invalid)?;
        if whole > MAX_DURATION_SECONDS {
            return Err(DecodeError::number_out_of_range());
        }

        let mut seconds = i64::try_from(whole).map_err(|_| DecodeError::number_out_of_range())?;
        let mut nanos = i32::try_from(fraction).map_err(|_| DecodeError::number_out_of_range())?;
        if negative {
            seconds = -seconds;
            nanos = -nanos;
        }
        let mut builder = MessageBuilder::new(descriptor.clone());
        set(&mut builder, "seconds", seconds)?;
        set(&mut builder, "nanos", nanos)?;
        Ok(builder.build())
    }
}

fn is_leap_year(year: i64) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

fn days_in_month(year: i64, month: i64) -> i64 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Days since 1970-01-01 of a proleptic Gregorian date.
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let year = if month <= 2 { year - 1 } else { year };
    let era = year.div_euclid(400);
    let year_of_era = year.rem_euclid(400);
    let day_of_year = (153 * ((month + 9) % 12) + 2) / 5 + day - 1;
    let day_of_era = year_of_era * 365 + year_of_era / 4 - year_of_era / 100 + day_of_year;
    era * 146_097 + day_of_era - 719_468
}

/// Inverse of [`days_from_civil`].
fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let days = days + 719_468;
    let era = days.div_euclid(146_097);
    let day_of_era = days.rem_euclid(146_097);
    let year_of_era =
        (day_of_era - day_of_era / 1460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
    let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
    let shifted_month = (5 * day_of_year + 2) / 153;
    let day = day_of_year - (153 * shifted_month + 2) / 5 + 1;
    let month = if shifted_month < 10 {
        shifted_month + 3
    } else {
        shifted_month - 9
    };
    let year = year_of_era + era * 400;
    (if month <= 2 { year + 1 } else { year }, month, day)
}

/// Parse exactly `len` ASCII digits at `at`.
fn fixed_digits(text: &str, at: usize, len: usize) -> Option<i64> {
    let digits = text.get(at..at + len)?;
    parse_digits(digits).and_then(|v| i64::try_from(v).ok())
}

/// Parse an RFC 3339 timestamp into seconds and nanoseconds since the epoch.
fn parse_timestamp(text: &str) -> Option<(i64, u32)> {
    let bytes = text.as_bytes();
    if bytes.len() < 20
        || bytes[4] != b'-'
        || bytes[7] != b'-'
        || bytes[10] != b'T'
        || bytes[13] != b':'
        || bytes[16] != b':'
    {
        return None;
    }
    let year = fixed_digits(text, 0, 4)?;
    let month = fixed_digits(text, 5, 2)?;
    let day = fixed_digits(text, 8, 2)?;
    let hour = fixed_digits(text, 11, 2)?;
    let minute = fixed_digits(text, 14, 2)?;
    let second = fixed_digits(text, 17, 2)?;
    if !(1..=12).contains(&month)
        || day < 1
        || day > days_in_month(year, month)
        || hour > 23
        || minute > 59
        || second > 59
    {
        return None;
    }

    let mut rest = text.get(19..)?;
    let mut nanos = 0;
    if let Some(fraction) = rest.strip_prefix('.') {
        let end = fraction
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(fraction.len());
        nanos = parse_nanos(&fraction[..end])?;
        rest = &fraction[end..];
    }

    let offset = match rest.as_bytes() {
        [b'Z'] => 0,
        [sign @ (b'+' | b'-'), _, _, b':', _, _] => {
            let hours = fixed_digits(rest, 1, 2)?;
            let minutes = fixed_digits(rest, 4, 2)?;
            if hours > 23 || minutes > 59 {
                return None;
            }
            let offset = hours * 3600 + minutes * 60;
            if *sign == b'-' {
                -offset
            } else {
                offset
            }
        }
        _ => return None,
    };

    let seconds = days_from_civil(year, month, day) * SECONDS_PER_DAY
        + hour * 3600
        + minute * 60
        + second
        - offset;
    Some((seconds, nanos))
}

#[derive(Debug)]
struct TimestampAdapter;

impl JsonAdapter for TimestampAdapter {
    fn type_name(&self) -> &str {
        wkt::TIMESTAMP
    }

    fn encode(&self, message: &MessageValue, _: &JsonConfig) -> Json {
        let (seconds, nanos) = seconds_and_nanos(message);
        let (year, month, day) = civil_from_days(seconds.div_euclid(SECONDS_PER_DAY));
        let time = seconds.rem_euclid(SECONDS_PER_DAY);
        let nanos = u32::try_from(nanos).unwrap_or(0) % NANOS_PER_SECOND;
        Json::String(format!(
            "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}{}Z",
            time / 3600,
            time % 3600 / 60,
            time % 60,
            format_nanos(nanos)
        ))
    }

    fn decode(
        &self,
        descriptor: &MessageDescriptor,
        json: &Json,
        _: &JsonConfig,
    ) -> Result<MessageValue, DecodeError> {
        let text = json
            .as_str()
            .ok_or_else(|| DecodeError::invalid_json_type("RFC 3339 timestamp"))?;
        let (seconds, nanos) =
            parse_timestamp(text).ok_or_else(|| DecodeError::invalid_json_type("RFC 3339 timestamp"))?;
        if !(MIN_TIMESTAMP_SECONDS..=MAX_TIMESTAMP_SECONDS).contains(&seconds) {
            return Err(DecodeError::number_out_of_range());
        }
        let nanos = i32::try_from(nanos).map_err(|_| DecodeError::number_out_of_range())?;

        let mut builder = MessageBuilder::new(descriptor.clone());
        set(&mut builder, "seconds", seconds)?;
        set(&mut builder, "nanos", nanos)?;
        Ok(builder.build())
    }
}

#[derive(Debug)]
struct FieldMaskAdapter;

impl JsonAdapter for FieldMaskAdapter {
    fn type_name(&self) -> &str {
        wkt::FIELD_MASK
    }

    fn encode(&self, message: &MessageValue, _: &JsonConfig) -> Json {
        let paths: Vec<String> = message
            .get("paths")
            .and_then(Value::as_list)
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_str)
            .map(to_lower_camel)
            .collect();
        Json::String(paths.join(","))
    }

    fn decode(
        &self,
        descriptor: &MessageDescriptor,
        json: &Json,
        _: &JsonConfig,
    ) -> Result<MessageValue, DecodeError> {
        let text = json
            .as_str()
            .ok_or_else(|| DecodeError::invalid_json_type("field mask string"))?;
        let paths: Vec<Value> = text
            .split(',')
            .filter(|path| !path.is_empty())
            .map(|path| Value::String(to_snake_case(path)))
            .collect();

        let mut builder = MessageBuilder::new(descriptor.clone());
        set(&mut builder, "paths", Value::List(paths))?;
        Ok(builder.build())
    }
}

#[derive(Debug)]
struct StructAdapter;

impl JsonAdapter for StructAdapter {
    fn type_name(&self) -> &str {
        wkt::STRUCT
    }

    fn encode(&self, message: &MessageValue, config: &JsonConfig) -> Json {
        let Some(fields) = message.get("fields").and_then(Value::as_map) else {
            return Json::Object(Map::new());
        };
        let object = fields
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Some(Value::Message(value)) => encode_message(value, config),
                    _ => Json::Null,
                };
                (key.to_string(), value)
            })
            .collect();
        Json::Object(object)
    }

    fn decode(
        &self,
        descriptor: &MessageDescriptor,
        json: &Json,
        config: &JsonConfig,
    ) -> Result<MessageValue, DecodeError> {
        let Json::Object(object) = json else {
            return Err(DecodeError::invalid_json_type("object"));
        };
        let value_type = message_type(descriptor, field(descriptor, "fields")?)?;
        let mut fields = MapValue::new();
        for (key, value) in object {
            let value = decode_message(&value_type, value, config)?;
            fields.insert(key.as_str(), Value::Message(value));
        }

        let mut builder = MessageBuilder::new(descriptor.clone());
        set(&mut builder, "fields", fields)?;
        Ok(builder.build())
    }
}

#[derive(Debug)]
struct ValueAdapter;

impl JsonAdapter for ValueAdapter {
    fn type_name(&self) -> &str {
        wkt::VALUE
    }

    fn encode(&self, message: &MessageValue, config: &JsonConfig) -> Json {
        let Some(field) = message.which_oneof("kind") else {
            return Json::Null;
        };
        match message.get_field(field) {
            Some(Value::F64(v)) => number::from_double(*v),
            Some(Value::String(v)) => Json::String(v.clone()),
            Some(Value::Bool(v)) => Json::Bool(*v),
            Some(Value::Message(v)) => encode_message(v, config),
            _ => Json::Null,
        }
    }

    fn decode(
        &self,
        descriptor: &MessageDescriptor,
        json: &Json,
        config: &JsonConfig,
    ) -> Result<MessageValue, DecodeError> {
        let mut builder = MessageBuilder::new(descriptor.clone());
        match json {
            Json::Null => set(&mut builder, "null_value", Value::EnumNumber(0))?,
            Json::Bool(v) => set(&mut builder, "bool_value", *v)?,
            Json::Number(_) => set(&mut builder, "number_value", number::double(json)?)?,
            Json::String(v) => set(&mut builder, "string_value", v.as_str())?,
            Json::Object(_) => {
                let struct_type = message_type(descriptor, field(descriptor, "struct_value")?)?;
                let value = decode_message(&struct_type, json, config)?;
                set(&mut builder, "struct_value", value)?;
            }
            Json::Array(_) => {
                let list_type = message_type(descriptor, field(descriptor, "list_value")?)?;
                let value = decode_message(&list_type, json, config)?;
                set(&mut builder, "list_value", value)?;
            }
        }
        Ok(builder.build())
    }
}

#[derive(Debug)]
struct ListValueAdapter;

impl JsonAdapter for ListValueAdapter {
    fn type_name(&self) -> &str {
        wkt::LIST_VALUE
    }

    fn encode(&self, message: &MessageValue, config: &JsonConfig) -> Json {
        let values = message
            .get("values")
            .and_then(Value::as_list)
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_message)
            .map(|value| encode_message(value, config))
            .collect();
        Json::Array(values)
    }

    fn decode(
        &self,
        descriptor: &MessageDescriptor,
        json: &Json,
        config: &JsonConfig,
    ) -> Result<MessageValue, DecodeError> {
        let Json::Array(array) = json else {
            return Err(DecodeError::invalid_json_type("array"));
        };
        let value_type = message_type(descriptor, field(descriptor, "values")?)?;
        let values = array
            .iter()
            .map(|value| decode_message(&value_type, value, config).map(Value::Message))
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = MessageBuilder::new(descriptor.clone());
        set(&mut builder, "values", Value::List(values))?;
        Ok(builder.build())
    }
}

#[derive(Debug)]
struct EmptyAdapter;

impl JsonAdapter for EmptyAdapter {
    fn type_name(&self) -> &str {
        wkt::EMPTY
    }

    fn encode(&self, _: &MessageValue, _: &JsonConfig) -> Json {
        Json::Object(Map::new())
    }

    fn decode(
        &self,
        descriptor: &MessageDescriptor,
        json: &Json,
        config: &JsonConfig,
    ) -> Result<MessageValue, DecodeError> {
        let Json::Object(object) = json else {
            return Err(DecodeError::invalid_json_type("object"));
        };
        match object.keys().next() {
            Some(key) if !config.ignore_unknown_fields => {
                Err(DecodeError::new(DecodeErrorKind::UnknownFieldRejected { name: key.clone() }))
            }
            _ => Ok(MessageValue::new(descriptor.clone())),
        }
    }
}

/// `google.protobuf.*Value` messages read and write as their bare scalar.
#[derive(Debug)]
struct WrapperAdapter(Scalar);

impl JsonAdapter for WrapperAdapter {
    fn type_name(&self) -> &str {
        self.0.wrapper_name().unwrap_or_default()
    }

    fn encode(&self, message: &MessageValue, _: &JsonConfig) -> Json {
        match message.get("value") {
            Some(value) => encode_scalar(value),
            None => encode_scalar(&self.0.default_value()),
        }
    }

    fn decode(
        &self,
        descriptor: &MessageDescriptor,
        json: &Json,
        _: &JsonConfig,
    ) -> Result<MessageValue, DecodeError> {
        let value = decode_scalar(self.0, json)?;
        let mut builder = MessageBuilder::new(descriptor.clone());
        set(&mut builder, "value", value)?;
        Ok(builder.build())
    }
}
