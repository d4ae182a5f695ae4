use chrono::{Duration as ChronoDur, NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt::{self, Display};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/* ───────────────────── Excel date-serial utilities ───────────────────
Excel's serial date system:
  Serial 1  = 1900-01-01
  Serial 60 = 1900-02-29  (phantom, kept for Lotus compatibility)
  Serial 61 = 1900-03-01
Base date = 1899-12-31 so that serial 1 = base + 1 day.
Time is stored as fractional days (no timezone).
------------------------------------------------------------------- */

const EXCEL_EPOCH: Option<NaiveDate> = NaiveDate::from_ymd_opt(1899, 12, 31);
const PHANTOM_SERIAL: i64 = 60;

/// Convert an Excel 1900-system serial number into a date-time.
///
/// Returns `None` for negative or non-finite serials and for serials beyond
/// chrono's supported range.
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = EXCEL_EPOCH?;
    let days = serial.trunc() as i64;
    let frac_secs = (serial.fract() * 86_400.0).round() as i64;

    let date = if days == PHANTOM_SERIAL {
        NaiveDate::from_ymd_opt(1900, 2, 28)?
    } else {
        let offset = if days < PHANTOM_SERIAL { days } else { days - 1 };
        epoch.checked_add_signed(ChronoDur::try_days(offset)?)?
    };

    let time = NaiveTime::from_num_seconds_from_midnight_opt(frac_secs.rem_euclid(86_400) as u32, 0)?;
    Some(date.and_time(time))
}

/// A single cell's content as exchanged with a grid provider.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Int(i64),
    Number(f64),
    Text(String),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
}

impl Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Boolean(true) => f.write_str("TRUE"),
            CellValue::Boolean(false) => f.write_str("FALSE"),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
        }
    }
}

impl CellValue {
    /// Best-effort typing of raw cell text: integer, then float, then boolean,
    /// falling back to text. Empty text yields `Empty`.
    pub fn infer(text: &str) -> CellValue {
        if text.is_empty() {
            return CellValue::Empty;
        }
        if let Ok(i) = text.parse::<i64>() {
            return CellValue::Int(i);
        }
        if let Some(n) = parse_finite_f64(text) {
            return CellValue::Number(n);
        }
        if let Some(b) = parse_bool(text) {
            return CellValue::Boolean(b);
        }
        CellValue::Text(text.to_string())
    }

    /// True for `Empty` and for empty text; both render as a blank cell.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Text as a grid provider would hand it to the mapper.
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

fn parse_finite_f64(s: &str) -> Option<f64> {
    let n: f64 = s.parse().ok()?;
    n.is_finite().then_some(n)
}

/// Boolean spellings accepted from cells: `true/false`, `t/f`, `1/0`, `yes/no`
/// in any case. Numeric spellings only reach here when integer parsing failed,
/// so `infer` never turns `1` into a boolean.
pub fn parse_bool(s: &str) -> Option<bool> {
    const TRUE: [&str; 4] = ["true", "t", "1", "yes"];
    const FALSE: [&str; 4] = ["false", "f", "0", "no"];
    let s = s.trim();
    if TRUE.iter().any(|t| s.eq_ignore_ascii_case(t)) {
        Some(true)
    } else if FALSE.iter().any(|t| s.eq_ignore_ascii_case(t)) {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_prefers_int_then_float_then_bool() {
        assert_eq!(CellValue::infer("42"), CellValue::Int(42));
        assert_eq!(CellValue::infer("-3.5"), CellValue::Number(-3.5));
        assert_eq!(CellValue::infer("TRUE"), CellValue::Boolean(true));
        assert_eq!(CellValue::infer("hello"), CellValue::Text("hello".into()));
        assert_eq!(CellValue::infer(""), CellValue::Empty);
        assert_eq!(CellValue::infer("NaN"), CellValue::Text("NaN".into()));
    }

    #[test]
    fn serial_dates_skip_phantom_leap_day() {
        let d = serial_to_datetime(61.0).unwrap();
        assert_eq!(d.date(), NaiveDate::from_ymd_opt(1900, 3, 1).unwrap());
        let d = serial_to_datetime(45_000.5).unwrap();
        assert_eq!(d.date(), NaiveDate::from_ymd_opt(2023, 3, 15).unwrap());
        assert_eq!(d.time(), NaiveTime::from_hms_opt(12, 0, 0).unwrap());
        assert!(serial_to_datetime(-1.0).is_none());
    }

    #[test]
    fn display_matches_grid_text() {
        assert_eq!(CellValue::Boolean(false).to_text(), "FALSE");
        assert_eq!(CellValue::Number(1.25).to_text(), "1.25");
        let d = NaiveDate::from_ymd_opt(2024, 2, 9).unwrap();
        assert_eq!(CellValue::Date(d).to_text(), "2024-02-09");
        assert!(CellValue::Text(String::new()).is_blank());
        assert!(!CellValue::Int(0).is_blank());
    }
}
