//! Field tag grammar.
//!
//! A tag is a short directive string attached to a record field, e.g.
//! `"Name,default:anonymous"` or `"array,split:;"`. Directives are separated by
//! `,` or `;` and are either `key:value` pairs or bare flags. The first bare
//! token names the column, `-` removes the field from mapping.
//!
//! | directive        | effect                                            |
//! |------------------|---------------------------------------------------|
//! | `<name>`         | column header text (first token only)             |
//! | `column:<name>`  | column header text                                |
//! | `-`              | ignore the field                                  |
//! | `default:<v>`    | value used for blank cells (read) / blank values (write) |
//! | `format:<f>`     | chrono strftime layout for time fields            |
//! | `encoding:json`  | cell holds JSON text                              |
//! | `split:<sep>`    | separator for sequence fields                     |
//! | `required`       | header must contain the column on read            |
//!
//! A `split:` directive takes the character right after the colon literally, so
//! `split:;` and `split:,` work. Any separator can also be escaped with `\`.
//! Unknown directives are ignored.

use crate::value::{CellValue, parse_bool};
use std::fmt;

/// Separator for sequence fields when no `split` directive applies.
pub const DEFAULT_SPLIT: &str = ";";

/// Cell encoding of a field's value.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Encoding {
    #[default]
    Plain,
    Json,
}

impl Encoding {
    /// Returns `None` for names this crate does not know.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("json") {
            Some(Encoding::Json)
        } else if name.eq_ignore_ascii_case("plain") || name.eq_ignore_ascii_case("raw") {
            Some(Encoding::Plain)
        } else {
            None
        }
    }

    pub fn is_json(self) -> bool {
        self == Encoding::Json
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Plain => f.write_str("plain"),
            Encoding::Json => f.write_str("json"),
        }
    }
}

/// Which way cells flow in a mapping pass.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Direction {
    /// Cells into values.
    Read,
    /// Values into cells.
    Write,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Read => f.write_str("read"),
            Direction::Write => f.write_str("write"),
        }
    }
}

/// One channel's worth of directives for a field. Unset directives fall back to
/// the main channel, then to built-in defaults (see [`ResolvedTag::merge`]).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldTag {
    pub column: Option<String>,
    pub default: Option<CellValue>,
    pub format: Option<String>,
    pub encoding: Option<Encoding>,
    pub split: Option<String>,
    pub required: bool,
    pub ignore: bool,
}

impl FieldTag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw tag string. Never fails: malformed or unknown directives are
    /// dropped.
    pub fn parse(raw: &str) -> Self {
        let mut tag = FieldTag::default();
        for (index, token) in directives(raw).into_iter().enumerate() {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let Some((key, value)) = token.split_once(':') else {
                match token {
                    "-" => tag.ignore = true,
                    t if t.eq_ignore_ascii_case("required") => tag.required = true,
                    name if index == 0 => tag.column = Some(name.to_string()),
                    _ => {}
                }
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let trimmed = value.trim();
            match key.as_str() {
                "column" | "name" => match trimmed {
                    "-" => tag.ignore = true,
                    "" => {}
                    name => tag.column = Some(name.to_string()),
                },
                "default" => tag.default = Some(CellValue::Text(trimmed.to_string())),
                "format" => tag.format = non_empty(trimmed),
                "encoding" => {
                    if let Some(encoding) = Encoding::parse(trimmed) {
                        tag.encoding = Some(encoding);
                    }
                }
                "split" => tag.split = (!value.is_empty()).then(|| value.to_string()),
                "required" => tag.required = parse_bool(trimmed).unwrap_or(true),
                _ => {}
            }
        }
        tag
    }

    /// Replace this tag wholesale with `with`, if given.
    pub fn frozen(self, with: Option<&FieldTag>) -> FieldTag {
        match with {
            Some(tag) => tag.clone(),
            None => self,
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<CellValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn with_split(mut self, split: impl Into<String>) -> Self {
        self.split = Some(split.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn ignored(mut self) -> Self {
        self.ignore = true;
        self
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

fn directives(raw: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            ',' | ';' if current.trim_start().eq_ignore_ascii_case("split:") => current.push(c),
            ',' | ';' => out.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    out.push(current);
    out
}

/// The effective directives of a field for one direction.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedTag<'a> {
    pub column: &'a str,
    pub default: Option<&'a CellValue>,
    pub format: Option<&'a str>,
    pub encoding: Encoding,
    pub split: &'a str,
    pub required: bool,
    pub ignore: bool,
}

impl ResolvedTag<'static> {
    /// Directives for values that have no field behind them (sequence and map
    /// elements).
    pub const fn untagged() -> Self {
        Self {
            column: "",
            default: None,
            format: None,
            encoding: Encoding::Plain,
            split: DEFAULT_SPLIT,
            required: false,
            ignore: false,
        }
    }
}

impl<'a> ResolvedTag<'a> {
    /// Channel value, else main value, else built-in default. `required` and
    /// `ignore` hold if either channel sets them.
    pub fn merge(field_name: &'a str, main: &'a FieldTag, channel: &'a FieldTag) -> Self {
        Self {
            column: channel
                .column
                .as_deref()
                .or(main.column.as_deref())
                .unwrap_or(field_name),
            default: channel.default.as_ref().or(main.default.as_ref()),
            format: channel.format.as_deref().or(main.format.as_deref()),
            encoding: channel.encoding.or(main.encoding).unwrap_or_default(),
            split: channel
                .split
                .as_deref()
                .or(main.split.as_deref())
                .unwrap_or(DEFAULT_SPLIT),
            required: main.required || channel.required,
            ignore: main.ignore || channel.ignore,
        }
    }
}
