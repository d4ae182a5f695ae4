//! Conversion between cell text and typed field values.
//!
//! Types take part by implementing [`CellCodec`]. Implementing it for your own
//! type replaces every built-in rule for that type. Fields marked for serde go
//! through [`decode_serde`] / [`encode_serde`] instead, which is what makes
//! `encoding:json` available.

use crate::error::ConvertError;
use cellmap_common::{CellValue, Encoding, ResolvedTag, parse_bool, serial_to_datetime};
use chrono::format::{DelayedFormat, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::type_name;
use std::fmt::Write as _;

pub const DATE_LAYOUT: &str = "%Y-%m-%d";
pub const DATETIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";
pub const TIME_LAYOUT: &str = "%H:%M:%S";

/// Parse-from-text / render-to-cell capability of a field type.
pub trait CellCodec: Sized {
    /// When false, blank text never reaches `from_text`: it resolves to the
    /// tag default, or to [`CellCodec::zero`] when there is none.
    const TAKES_BLANK: bool = false;

    fn zero() -> Self;

    fn from_text(text: &str, tag: &ResolvedTag<'_>) -> Result<Self, ConvertError>;

    fn to_cell(&self, tag: &ResolvedTag<'_>) -> Result<CellValue, ConvertError>;

    /// Render a value the caller knows is present. Types whose zero value
    /// doubles as "no value" override this to render that zero as data.
    fn to_present_cell(&self, tag: &ResolvedTag<'_>) -> Result<CellValue, ConvertError> {
        self.to_cell(tag)
    }
}

/// Decode cell text into `T`, substituting the read default for blank text.
pub fn decode<T: CellCodec>(text: &str, tag: &ResolvedTag<'_>) -> Result<T, ConvertError> {
    if tag.encoding.is_json() {
        return Err(ConvertError::JsonUnsupported {
            target: type_name::<T>(),
        });
    }
    if text.is_empty() && !T::TAKES_BLANK {
        return match tag.default {
            Some(default) => decode_default(default, |t| T::from_text(t, tag), type_name::<T>())
                .map(|v| v.unwrap_or_else(T::zero)),
            None => Ok(T::zero()),
        };
    }
    T::from_text(text, tag)
}

/// Render `value` as a cell, substituting the write default for blank output.
pub fn encode<T: CellCodec>(value: &T, tag: &ResolvedTag<'_>) -> Result<CellValue, ConvertError> {
    if tag.encoding.is_json() {
        return Err(ConvertError::JsonUnsupported {
            target: type_name::<T>(),
        });
    }
    Ok(or_write_default(value.to_cell(tag)?, tag))
}

/// Serde-backed decode. With json encoding the text is a JSON document;
/// otherwise the text is typed by inference and handed to the deserializer,
/// falling back to a JSON string and then to the text as a JSON document.
pub fn decode_serde<T: DeserializeOwned + Default>(
    text: &str,
    tag: &ResolvedTag<'_>,
) -> Result<T, ConvertError> {
    if text.is_empty() {
        return match tag.default {
            Some(default) => {
                decode_default(default, |t| serde_from_text(t, tag.encoding), type_name::<T>())
                    .map(Option::unwrap_or_default)
            }
            None => Ok(T::default()),
        };
    }
    serde_from_text(text, tag.encoding)
}

/// Serde-backed encode. Null renders blank; json encoding writes compact JSON
/// text, plain encoding writes scalars as typed cells and anything else as JSON.
pub fn encode_serde<T: Serialize>(
    value: &T,
    tag: &ResolvedTag<'_>,
) -> Result<CellValue, ConvertError> {
    let cell = match (serde_json::to_value(value)?, tag.encoding) {
        (Value::Null, _) => CellValue::Empty,
        (json, Encoding::Json) => CellValue::Text(json.to_string()),
        (Value::Bool(b), Encoding::Plain) => CellValue::Boolean(b),
        (Value::Number(n), Encoding::Plain) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => CellValue::Int(i),
            (None, Some(f)) => CellValue::Number(f),
            _ => CellValue::Text(n.to_string()),
        },
        (Value::String(s), Encoding::Plain) => CellValue::Text(s),
        (json, Encoding::Plain) => CellValue::Text(json.to_string()),
    };
    Ok(or_write_default(cell, tag))
}

fn decode_default<T>(
    default: &CellValue,
    convert: impl FnOnce(&str) -> Result<T, ConvertError>,
    target: &'static str,
) -> Result<Option<T>, ConvertError> {
    let text = default.to_text();
    if text.is_empty() {
        return Ok(None);
    }
    convert(&text).map(Some).map_err(|source| ConvertError::Default {
        default: text,
        target,
        source: Box::new(source),
    })
}

fn or_write_default(cell: CellValue, tag: &ResolvedTag<'_>) -> CellValue {
    match tag.default {
        Some(default) if cell.is_blank() => default.clone(),
        _ => cell,
    }
}

fn serde_from_text<T: DeserializeOwned>(text: &str, encoding: Encoding) -> Result<T, ConvertError> {
    match encoding {
        Encoding::Json => Ok(serde_json::from_str(text)?),
        Encoding::Plain => serde_json::from_value(json_scalar(&CellValue::infer(text)))
            .or_else(|_| serde_json::from_value(Value::String(text.to_string())))
            .or_else(|_| serde_json::from_str(text))
            .map_err(ConvertError::from),
    }
}

fn json_scalar(value: &CellValue) -> Value {
    match value {
        CellValue::Empty => Value::Null,
        CellValue::Int(i) => Value::from(*i),
        CellValue::Number(n) => serde_json::Number::from_f64(*n)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        CellValue::Boolean(b) => Value::Bool(*b),
        CellValue::Text(s) => Value::String(s.clone()),
        other => Value::String(other.to_text()),
    }
}

/* ─────────────────────────── scalars ─────────────────────────── */

macro_rules! int_codec {
    ($($t:ty),* $(,)?) => {$(
        impl CellCodec for $t {
            fn zero() -> Self {
                0
            }

            fn from_text(text: &str, _tag: &ResolvedTag<'_>) -> Result<Self, ConvertError> {
                let trimmed = text.trim();
                if let Ok(v) = trimmed.parse::<$t>() {
                    return Ok(v);
                }
                let digits = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);
                if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(ConvertError::parse::<$t>(text, "integer out of range"));
                }
                // Grids often hand integers back as floats ("3.0", "1e3").
                // MIN and the exclusive bound 2^(BITS - sign) are exact in f64,
                // MAX is not.
                let signed = u32::from(<$t>::MIN != 0);
                let upper = 2f64.powi((<$t>::BITS - signed) as i32);
                match trimmed.parse::<f64>() {
                    Ok(f) if f.is_finite()
                        && f.fract() == 0.0
                        && f >= <$t>::MIN as f64
                        && f < upper => Ok(f as $t),
                    _ => Err(ConvertError::parse::<$t>(text, "not an integer in range")),
                }
            }

            /// Values beyond `i64` are written as text so no digits are lost.
            fn to_cell(&self, _tag: &ResolvedTag<'_>) -> Result<CellValue, ConvertError> {
                Ok(match i64::try_from(*self) {
                    Ok(i) => CellValue::Int(i),
                    Err(_) => CellValue::Text(self.to_string()),
                })
            }
        }
    )*};
}

int_codec!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl CellCodec for f64 {
    fn zero() -> Self {
        0.0
    }

    fn from_text(text: &str, _tag: &ResolvedTag<'_>) -> Result<Self, ConvertError> {
        text.trim()
            .parse()
            .map_err(|e| ConvertError::parse::<f64>(text, e))
    }

    fn to_cell(&self, _tag: &ResolvedTag<'_>) -> Result<CellValue, ConvertError> {
        Ok(CellValue::Number(*self))
    }
}

impl CellCodec for f32 {
    fn zero() -> Self {
        0.0
    }

    fn from_text(text: &str, _tag: &ResolvedTag<'_>) -> Result<Self, ConvertError> {
        text.trim()
            .parse()
            .map_err(|e| ConvertError::parse::<f32>(text, e))
    }

    fn to_cell(&self, _tag: &ResolvedTag<'_>) -> Result<CellValue, ConvertError> {
        // Widen through the shortest decimal form so 0.1f32 stays 0.1.
        let widened = self.to_string().parse().unwrap_or(f64::from(*self));
        Ok(CellValue::Number(widened))
    }
}

impl CellCodec for bool {
    fn zero() -> Self {
        false
    }

    fn from_text(text: &str, _tag: &ResolvedTag<'_>) -> Result<Self, ConvertError> {
        parse_bool(text).ok_or_else(|| ConvertError::parse::<bool>(text, "not a boolean"))
    }

    fn to_cell(&self, _tag: &ResolvedTag<'_>) -> Result<CellValue, ConvertError> {
        Ok(CellValue::Boolean(*self))
    }
}

impl CellCodec for char {
    fn zero() -> Self {
        '\0'
    }

    fn from_text(text: &str, _tag: &ResolvedTag<'_>) -> Result<Self, ConvertError> {
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(ConvertError::parse::<char>(text, "expected exactly one character")),
        }
    }

    fn to_cell(&self, _tag: &ResolvedTag<'_>) -> Result<CellValue, ConvertError> {
        if *self == '\0' {
            return Ok(CellValue::Empty);
        }
        Ok(CellValue::Text(self.to_string()))
    }
}

impl CellCodec for String {
    fn zero() -> Self {
        String::new()
    }

    fn from_text(text: &str, _tag: &ResolvedTag<'_>) -> Result<Self, ConvertError> {
        Ok(text.to_string())
    }

    fn to_cell(&self, _tag: &ResolvedTag<'_>) -> Result<CellValue, ConvertError> {
        Ok(CellValue::Text(self.clone()))
    }
}

/// Untyped slot: the text is typed by inference.
impl CellCodec for CellValue {
    fn zero() -> Self {
        CellValue::Empty
    }

    fn from_text(text: &str, _tag: &ResolvedTag<'_>) -> Result<Self, ConvertError> {
        Ok(CellValue::infer(text))
    }

    fn to_cell(&self, _tag: &ResolvedTag<'_>) -> Result<CellValue, ConvertError> {
        Ok(self.clone())
    }
}

/* ───────────────────── optional / boxed / sequence ───────────────────── */

impl<T: CellCodec> CellCodec for Option<T> {
    const TAKES_BLANK: bool = true;

    fn zero() -> Self {
        None
    }

    fn from_text(text: &str, tag: &ResolvedTag<'_>) -> Result<Self, ConvertError> {
        if !text.is_empty() {
            return T::from_text(text, tag).map(Some);
        }
        match tag.default {
            Some(default) => decode_default(default, |t| T::from_text(t, tag), type_name::<T>()),
            None => Ok(None),
        }
    }

    fn to_cell(&self, tag: &ResolvedTag<'_>) -> Result<CellValue, ConvertError> {
        match self {
            Some(v) => v.to_present_cell(tag),
            None => Ok(CellValue::Empty),
        }
    }
}

impl<T: CellCodec> CellCodec for Box<T> {
    const TAKES_BLANK: bool = T::TAKES_BLANK;

    fn zero() -> Self {
        Box::new(T::zero())
    }

    fn from_text(text: &str, tag: &ResolvedTag<'_>) -> Result<Self, ConvertError> {
        T::from_text(text, tag).map(Box::new)
    }

    fn to_cell(&self, tag: &ResolvedTag<'_>) -> Result<CellValue, ConvertError> {
        (**self).to_cell(tag)
    }

    fn to_present_cell(&self, tag: &ResolvedTag<'_>) -> Result<CellValue, ConvertError> {
        (**self).to_present_cell(tag)
    }
}

/// Sequences live in one cell, joined by the tag's `split` separator. Empty
/// tokens decode to the element's zero value.
impl<T: CellCodec> CellCodec for Vec<T> {
    const TAKES_BLANK: bool = true;

    fn zero() -> Self {
        Vec::new()
    }

    fn from_text(text: &str, tag: &ResolvedTag<'_>) -> Result<Self, ConvertError> {
        let owned;
        let text = match (text.is_empty(), tag.default) {
            (false, _) => text,
            (true, Some(default)) => {
                owned = default.to_text();
                owned.as_str()
            }
            (true, None) => return Ok(Vec::new()),
        };
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let tokens: Vec<&str> = if tag.split.is_empty() {
            vec![text]
        } else {
            text.split(tag.split).collect()
        };
        tokens
            .into_iter()
            .enumerate()
            .map(|(index, token)| {
                if token.is_empty() {
                    return Ok(T::zero());
                }
                T::from_text(token, tag).map_err(|source| ConvertError::Element {
                    index,
                    source: Box::new(source),
                })
            })
            .collect()
    }

    fn to_cell(&self, tag: &ResolvedTag<'_>) -> Result<CellValue, ConvertError> {
        let parts = self
            .iter()
            .map(|v| v.to_cell(tag).map(|cell| cell.to_text()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CellValue::Text(parts.join(tag.split)))
    }
}

/* ─────────────────────────── time ─────────────────────────── */

fn render(formatted: DelayedFormat<StrftimeItems<'_>>, layout: &str) -> Result<String, ConvertError> {
    let mut out = String::new();
    write!(out, "{formatted}").map_err(|_| ConvertError::Layout {
        format: layout.to_string(),
    })?;
    Ok(out)
}

fn serial(text: &str) -> Option<NaiveDateTime> {
    text.trim().parse::<f64>().ok().and_then(serial_to_datetime)
}

/// Naive chrono types: `format` is a strftime layout and a numeric cell is read
/// as an Excel serial. With `blank_zero`, the type's default (Unix epoch) is the
/// "no value" sentinel and renders blank. A real epoch date needs an `Option`
/// field: `Some(epoch)` is rendered as a date.
macro_rules! naive_time_codec {
    ($t:ty, $layout:expr, $from_serial:expr, blank_zero = $blank_zero:expr) => {
        impl CellCodec for $t {
            fn zero() -> Self {
                <$t>::default()
            }

            fn from_text(text: &str, tag: &ResolvedTag<'_>) -> Result<Self, ConvertError> {
                let layout = tag.format.unwrap_or($layout);
                <$t>::parse_from_str(text.trim(), layout).or_else(|err| {
                    serial(text)
                        .map($from_serial)
                        .ok_or_else(|| ConvertError::parse::<$t>(text, err))
                })
            }

            fn to_cell(&self, tag: &ResolvedTag<'_>) -> Result<CellValue, ConvertError> {
                if $blank_zero && *self == Self::zero() {
                    return Ok(CellValue::Empty);
                }
                self.to_present_cell(tag)
            }

            fn to_present_cell(&self, tag: &ResolvedTag<'_>) -> Result<CellValue, ConvertError> {
                let layout = tag.format.unwrap_or($layout);
                render(self.format(layout), layout).map(CellValue::Text)
            }
        }
    };
}

naive_time_codec!(NaiveDate, DATE_LAYOUT, |dt: NaiveDateTime| dt.date(), blank_zero = true);
naive_time_codec!(NaiveDateTime, DATETIME_LAYOUT, |dt: NaiveDateTime| dt, blank_zero = true);
// Midnight is a real time of day; use Option<NaiveTime> for absent values.
naive_time_codec!(NaiveTime, TIME_LAYOUT, |dt: NaiveDateTime| dt.time(), blank_zero = false);

/// Without a layout, RFC 3339 both ways. A layout without an offset is read
/// as UTC. The epoch is the blank sentinel, as for the naive types.
impl CellCodec for DateTime<Utc> {
    fn zero() -> Self {
        DateTime::<Utc>::default()
    }

    fn from_text(text: &str, tag: &ResolvedTag<'_>) -> Result<Self, ConvertError> {
        let trimmed = text.trim();
        let parsed = match tag.format {
            Some(layout) => DateTime::parse_from_str(trimmed, layout)
                .map(|dt| dt.with_timezone(&Utc))
                .or_else(|_| NaiveDateTime::parse_from_str(trimmed, layout).map(|n| n.and_utc())),
            None => DateTime::parse_from_rfc3339(trimmed).map(|dt| dt.with_timezone(&Utc)),
        };
        parsed.or_else(|err| {
            serial(text)
                .map(|n| n.and_utc())
                .ok_or_else(|| ConvertError::parse::<DateTime<Utc>>(text, err))
        })
    }

    fn to_cell(&self, tag: &ResolvedTag<'_>) -> Result<CellValue, ConvertError> {
        if *self == Self::zero() {
            return Ok(CellValue::Empty);
        }
        self.to_present_cell(tag)
    }

    fn to_present_cell(&self, tag: &ResolvedTag<'_>) -> Result<CellValue, ConvertError> {
        match tag.format {
            Some(layout) => render(self.format(layout), layout).map(CellValue::Text),
            None => Ok(CellValue::Text(self.to_rfc3339_opts(SecondsFormat::Secs, true))),
        }
    }
}
