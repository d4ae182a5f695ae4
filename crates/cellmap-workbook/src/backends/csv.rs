use super::SparseSheet;
use crate::error::IoError;
use crate::traits::{GridReader, GridWriter, SaveDestination};
use cellmap_common::CellValue;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CsvTrim {
    #[default]
    None,
    All,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CsvTypeInference {
    /// Do not infer: treat all non-empty fields as text. Cells read back
    /// byte for byte, so this is the mode for text fields that look numeric.
    #[default]
    Off,
    /// Infer booleans + numbers when unambiguous.
    ///
    /// Typed cells are read back in their canonical form: `"1.50"` reads as
    /// `"1.5"`, `"1e3"` as `"1000"` and `"true"` as `"TRUE"`.
    Basic,
    /// Like `Basic`, plus ISO date/date-time parsing.
    BasicWithDates,
}

#[derive(Clone, Debug)]
pub struct CsvReadOptions {
    /// Field delimiter as a single byte. Use `b'\t'` for TSV.
    pub delimiter: u8,
    /// Header records are still loaded into row 1, but never typed.
    pub has_headers: bool,
    pub trim: CsvTrim,
    pub type_inference: CsvTypeInference,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_headers: true,
            trim: CsvTrim::None,
            type_inference: CsvTypeInference::Off,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CsvNewline {
    #[default]
    Lf,
    Crlf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CsvQuoteStyle {
    #[default]
    Necessary,
    Always,
    Never,
    NonNumeric,
}

#[derive(Clone, Debug)]
pub struct CsvWriteOptions {
    /// Field delimiter as a single byte. Use `b'\t'` for TSV.
    pub delimiter: u8,
    pub newline: CsvNewline,
    pub quote_style: CsvQuoteStyle,
}

impl Default for CsvWriteOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            newline: CsvNewline::Lf,
            quote_style: CsvQuoteStyle::Necessary,
        }
    }
}

/// CSV document exposed as a single-sheet grid (default sheet name: `Sheet1`).
///
/// The mapper only consumes cell text, so inference is off by default; turn it
/// on when the typed `CellValue`s themselves matter to the caller.
pub struct CsvAdapter {
    sheet_name: String,
    sheet: SparseSheet,
    path: Option<PathBuf>,
    read_options: CsvReadOptions,
    write_options: CsvWriteOptions,
}

impl Default for CsvAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvAdapter {
    pub fn new() -> Self {
        Self::new_with_options(CsvReadOptions::default(), CsvWriteOptions::default())
    }

    pub fn new_with_options(read_options: CsvReadOptions, write_options: CsvWriteOptions) -> Self {
        Self {
            sheet_name: "Sheet1".to_string(),
            sheet: SparseSheet::default(),
            path: None,
            read_options,
            write_options,
        }
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    pub fn set_sheet_name(&mut self, name: impl Into<String>) {
        self.sheet_name = name.into();
    }

    pub fn read_options(&self) -> &CsvReadOptions {
        &self.read_options
    }

    pub fn write_options(&self) -> &CsvWriteOptions {
        &self.write_options
    }

    pub fn set_write_options(&mut self, opts: CsvWriteOptions) {
        self.write_options = opts;
    }

    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, IoError> {
        Self::open_path_with_options(path, CsvReadOptions::default())
    }

    pub fn open_bytes(bytes: Vec<u8>) -> Result<Self, IoError> {
        Self::open_bytes_with_options(bytes, CsvReadOptions::default())
    }

    pub fn open_path_with_options<P: AsRef<Path>>(
        path: P,
        read_options: CsvReadOptions,
    ) -> Result<Self, IoError> {
        let mut adapter = Self::new_with_options(read_options, CsvWriteOptions::default());
        let file = File::open(path.as_ref())?;
        adapter.load(BufReader::new(file))?;
        adapter.path = Some(path.as_ref().to_path_buf());
        Ok(adapter)
    }

    pub fn open_reader_with_options<R: Read>(
        reader: R,
        read_options: CsvReadOptions,
    ) -> Result<Self, IoError> {
        let mut adapter = Self::new_with_options(read_options, CsvWriteOptions::default());
        adapter.load(reader)?;
        Ok(adapter)
    }

    pub fn open_bytes_with_options(
        bytes: Vec<u8>,
        read_options: CsvReadOptions,
    ) -> Result<Self, IoError> {
        Self::open_reader_with_options(std::io::Cursor::new(bytes), read_options)
    }

    fn load<R: Read>(&mut self, reader: R) -> Result<(), IoError> {
        let mut rb = csv::ReaderBuilder::new();
        rb.delimiter(self.read_options.delimiter)
            .has_headers(self.read_options.has_headers)
            // Ragged rows are fine; missing cells read as blank.
            .flexible(true);

        match self.read_options.trim {
            CsvTrim::None => rb.trim(csv::Trim::None),
            CsvTrim::All => rb.trim(csv::Trim::All),
        };

        let mut rdr = rb.from_reader(reader);
        self.sheet = SparseSheet::default();

        let mut row: u32 = 1;

        if self.read_options.has_headers {
            let headers = rdr.headers().map_err(|e| IoError::from_backend("csv", e))?;
            self.store_record(row, headers.iter(), CsvTypeInference::Off);
            row += 1;
        }

        for rec in rdr.records() {
            let rec = rec.map_err(|e| IoError::from_backend("csv", e))?;
            self.store_record(row, rec.iter(), self.read_options.type_inference);
            row += 1;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(rows = row - 1, "csv loaded");

        Ok(())
    }

    fn store_record<'r>(
        &mut self,
        row: u32,
        fields: impl Iterator<Item = &'r str>,
        mode: CsvTypeInference,
    ) {
        let mut cols = 0;
        for (ci, field) in fields.enumerate() {
            let col = (ci as u32) + 1;
            cols = col;
            if let Some(v) = infer_field(field, mode) {
                self.sheet.cells.insert((row, col), v);
            }
        }
        self.sheet.set_bounds(row, cols);
    }

    /// Serialize the used area (from `A1`) to `dest`. Returns the bytes for
    /// [`SaveDestination::Bytes`].
    pub fn save_to(&self, dest: SaveDestination<'_>) -> Result<Option<Vec<u8>>, IoError> {
        let opts = &self.write_options;
        match dest {
            SaveDestination::InPlace => {
                let Some(path) = self.path.as_ref() else {
                    return Err(IoError::Backend {
                        backend: "csv".to_string(),
                        message: "no known path for in-place save".to_string(),
                    });
                };
                let mut file = File::create(path)?;
                self.write_csv(&mut file, opts)?;
                Ok(None)
            }
            SaveDestination::Path(path) => {
                let mut file = File::create(path)?;
                self.write_csv(&mut file, opts)?;
                Ok(None)
            }
            SaveDestination::Writer(writer) => {
                self.write_csv(writer, opts)?;
                Ok(None)
            }
            SaveDestination::Bytes => {
                let mut buf: Vec<u8> = Vec::new();
                self.write_csv(&mut buf, opts)?;
                Ok(Some(buf))
            }
        }
    }

    fn write_csv<W: Write + ?Sized>(&self, writer: &mut W, opts: &CsvWriteOptions) -> Result<(), IoError> {
        let mut wb = csv::WriterBuilder::new();
        wb.delimiter(opts.delimiter)
            .terminator(csv_terminator(opts.newline))
            .quote_style(csv_quote_style(opts.quote_style));
        let mut wtr = wb.from_writer(writer);

        let Some((rows, cols)) = self.sheet.bounds() else {
            return Ok(());
        };
        for r in 1..=rows {
            let record: Vec<String> = (1..=cols)
                .map(|c| self.sheet.get(r, c).map(CellValue::to_text).unwrap_or_default())
                .collect();
            wtr.write_record(record)
                .map_err(|e| IoError::from_backend("csv", e))?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn check_sheet(&self, sheet: &str) -> Result<(), IoError> {
        if sheet == self.sheet_name {
            Ok(())
        } else {
            Err(IoError::SheetNotFound(sheet.to_string()))
        }
    }
}

impl GridReader for CsvAdapter {
    type Error = IoError;

    fn sheet_names(&self) -> Result<Vec<String>, Self::Error> {
        Ok(vec![self.sheet_name.clone()])
    }

    fn sheet_bounds(&self, sheet: &str) -> Option<(u32, u32)> {
        if sheet == self.sheet_name {
            self.sheet.bounds()
        } else {
            None
        }
    }

    fn read_cell(
        &self,
        sheet: &str,
        row: u32,
        col: u32,
    ) -> Result<Option<CellValue>, Self::Error> {
        self.check_sheet(sheet)?;
        Ok(self.sheet.get(row, col).cloned())
    }
}

impl GridWriter for CsvAdapter {
    type Error = IoError;

    fn write_cell(
        &mut self,
        sheet: &str,
        row: u32,
        col: u32,
        value: CellValue,
    ) -> Result<(), Self::Error> {
        self.check_sheet(sheet)?;
        if row == 0 || col == 0 {
            return Err(IoError::InvalidCoordinate { row, col });
        }
        self.sheet.put(row, col, value);
        Ok(())
    }

    fn create_sheet(&mut self, name: &str) -> Result<(), Self::Error> {
        if name == self.sheet_name {
            return Ok(());
        }
        Err(IoError::Unsupported {
            feature: "multiple sheets".to_string(),
            context: "csv".to_string(),
        })
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if self.path.is_some() {
            self.save_to(SaveDestination::InPlace)?;
        }
        Ok(())
    }
}

fn infer_field(field: &str, mode: CsvTypeInference) -> Option<CellValue> {
    if field.is_empty() {
        return None;
    }
    if mode == CsvTypeInference::Off {
        return Some(CellValue::Text(field.to_string()));
    }

    if field.eq_ignore_ascii_case("true") {
        return Some(CellValue::Boolean(true));
    }
    if field.eq_ignore_ascii_case("false") {
        return Some(CellValue::Boolean(false));
    }
    if let Some(i) = parse_unambiguous_i64(field) {
        return Some(CellValue::Int(i));
    }
    if let Some(n) = parse_unambiguous_f64(field) {
        return Some(CellValue::Number(n));
    }
    if mode == CsvTypeInference::BasicWithDates {
        if let Ok(d) = chrono::NaiveDate::parse_from_str(field, "%Y-%m-%d") {
            return Some(CellValue::Date(d));
        }
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(field, "%Y-%m-%d %H:%M:%S")
            .or_else(|_| chrono::NaiveDateTime::parse_from_str(field, "%Y-%m-%dT%H:%M:%S"))
        {
            return Some(CellValue::DateTime(dt));
        }
    }
    Some(CellValue::Text(field.to_string()))
}

fn parse_unambiguous_i64(s: &str) -> Option<i64> {
    // Leading zeros ("007") stay text.
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    s.parse().ok()
}

fn parse_unambiguous_f64(s: &str) -> Option<f64> {
    if !(s.contains('.') || s.contains('e') || s.contains('E')) {
        return None;
    }
    let unsigned = s.strip_prefix(['+', '-']).unwrap_or(s);
    if unsigned.len() > 1 && unsigned.starts_with('0') && !unsigned.starts_with("0.") {
        return None;
    }
    let n: f64 = s.parse().ok()?;
    n.is_finite().then_some(n)
}

fn csv_terminator(nl: CsvNewline) -> csv::Terminator {
    match nl {
        CsvNewline::Lf => csv::Terminator::Any(b'\n'),
        CsvNewline::Crlf => csv::Terminator::CRLF,
    }
}

fn csv_quote_style(q: CsvQuoteStyle) -> csv::QuoteStyle {
    match q {
        CsvQuoteStyle::Necessary => csv::QuoteStyle::Necessary,
        CsvQuoteStyle::Always => csv::QuoteStyle::Always,
        CsvQuoteStyle::Never => csv::QuoteStyle::Never,
        CsvQuoteStyle::NonNumeric => csv::QuoteStyle::NonNumeric,
    }
}
