#![cfg(feature = "csv")]

use cellmap_common::{CellRef, CellValue};
use cellmap_testkit::temp_path;
use cellmap_workbook::backends::csv::{
    CsvAdapter, CsvNewline, CsvQuoteStyle, CsvReadOptions, CsvTypeInference, CsvWriteOptions,
};
use cellmap_workbook::{GridReader, GridWriter, IoError, SaveDestination};

#[test]
fn csv_rows_read_as_text_by_default() {
    let input = b"id,name,score\n1,ada,9.5\n2,,7\n".to_vec();
    let adapter = CsvAdapter::open_bytes(input).unwrap();

    assert_eq!(adapter.sheet_names().unwrap(), vec!["Sheet1".to_string()]);
    assert_eq!(adapter.sheet_bounds("Sheet1"), Some((3, 3)));
    assert_eq!(
        adapter.read_cell("Sheet1", 2, 3).unwrap(),
        Some(CellValue::Text("9.5".into()))
    );

    let rows: Vec<_> = adapter
        .rows("Sheet1", CellRef::default())
        .map(|r| r.map(|(_, cells)| cells))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        rows,
        vec![
            vec!["id", "name", "score"],
            vec!["1", "ada", "9.5"],
            vec!["2", "", "7"],
        ]
    );
}

#[test]
fn csv_basic_inference_types_data_rows_only() {
    let input = b"1,TRUE\n3,4.5\n".to_vec();
    let opts = CsvReadOptions {
        has_headers: true,
        type_inference: CsvTypeInference::Basic,
        ..CsvReadOptions::default()
    };
    let adapter = CsvAdapter::open_bytes_with_options(input, opts).unwrap();
    assert_eq!(
        adapter.read_cell("Sheet1", 1, 1).unwrap(),
        Some(CellValue::Text("1".into()))
    );
    assert_eq!(adapter.read_cell("Sheet1", 2, 1).unwrap(), Some(CellValue::Int(3)));
    assert_eq!(
        adapter.read_cell("Sheet1", 2, 2).unwrap(),
        Some(CellValue::Number(4.5))
    );
}

#[test]
fn basic_inference_canonicalizes_numeric_text() {
    let input = b"code,scale\n1.50,1e3\n".to_vec();
    let typed = CsvAdapter::open_bytes_with_options(
        input.clone(),
        CsvReadOptions {
            type_inference: CsvTypeInference::Basic,
            ..CsvReadOptions::default()
        },
    )
    .unwrap();
    assert_eq!(typed.read_row("Sheet1", 2, 1).unwrap(), vec!["1.5", "1000"]);

    let raw = CsvAdapter::open_bytes(input).unwrap();
    assert_eq!(raw.read_row("Sheet1", 2, 1).unwrap(), vec!["1.50", "1e3"]);
}

#[test]
fn csv_quotes_newlines_roundtrip() {
    let input = b"A,B\n\"hello, world\",\"line1\nline2\"\n".to_vec();
    let adapter = CsvAdapter::open_bytes(input.clone()).unwrap();
    assert_eq!(
        adapter.read_cell("Sheet1", 2, 2).unwrap(),
        Some(CellValue::Text("line1\nline2".into()))
    );
    let out = adapter.save_to(SaveDestination::Bytes).unwrap().unwrap();
    assert_eq!(out, input);
}

#[test]
fn csv_write_options_apply() {
    let mut adapter = CsvAdapter::new();
    adapter.write_cell("Sheet1", 1, 1, "a".into()).unwrap();
    adapter.write_cell("Sheet1", 1, 2, CellValue::Int(2)).unwrap();
    adapter.set_write_options(CsvWriteOptions {
        delimiter: b';',
        newline: CsvNewline::Crlf,
        quote_style: CsvQuoteStyle::Always,
    });
    let out = adapter.save_to(SaveDestination::Bytes).unwrap().unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "\"a\";\"2\"\r\n");
}

#[test]
fn csv_is_single_sheet() {
    let mut adapter = CsvAdapter::new();
    adapter.create_sheet("Sheet1").unwrap();
    assert!(matches!(
        adapter.create_sheet("Other"),
        Err(IoError::Unsupported { .. })
    ));
    assert!(matches!(
        adapter.write_cell("Other", 1, 1, CellValue::Int(1)),
        Err(IoError::SheetNotFound(_))
    ));
}

#[test]
fn csv_flush_writes_back_in_place() {
    let (_dir, path) = temp_path("people.csv");
    std::fs::write(&path, "name\nada\n").unwrap();

    let mut adapter = CsvAdapter::open_path(&path).unwrap();
    adapter.write_cell("Sheet1", 3, 1, "grace".into()).unwrap();
    adapter.flush().unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "name\nada\ngrace\n");
}
