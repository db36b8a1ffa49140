//! Builds small OpenDocument spreadsheets for tests.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const MIMETYPE: &str = "application/vnd.oasis.opendocument.spreadsheet";

pub(crate) enum Cell {
    Empty,
    Text(&'static str),
    Number(f64),
    Date(&'static str),
}

/// Write a one-sheet `.ods` file. Rows are written from the top of the sheet.
pub(crate) fn write_ods(path: &Path, rows: &[Vec<Cell>]) {
    let mut table = String::new();
    for row in rows {
        table.push_str("<table:table-row>");
        for cell in row {
            table.push_str(&match cell {
                Cell::Empty => "<table:table-cell/>".to_string(),
                Cell::Text(s) => format!(r#"<table:table-cell office:value-type="string"><text:p>{s}</text:p></table:table-cell>"#),
                Cell::Number(n) => format!(r#"<table:table-cell office:value-type="float" office:value="{n}"><text:p>{n}</text:p></table:table-cell>"#),
                Cell::Date(d) => format!(r#"<table:table-cell office:value-type="date" office:date-value="{d}"><text:p>{d}</text:p></table:table-cell>"#),
            });
        }
        table.push_str("</table:table-row>");
    }

    let content = format!(concat!(
        r#"<?xml version="1.0" encoding="UTF-8"?>"#,
        r#"<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" "#,
        r#"xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0" "#,
        r#"xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" office:version="1.2">"#,
        r#"<office:body><office:spreadsheet><table:table table:name="Sheet1">{}</table:table>"#,
        r#"</office:spreadsheet></office:body></office:document-content>"#), table);

    let manifest = concat!(
        r#"<?xml version="1.0" encoding="UTF-8"?>"#,
        r#"<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0" manifest:version="1.2">"#,
        r#"<manifest:file-entry manifest:full-path="/" manifest:media-type="application/vnd.oasis.opendocument.spreadsheet"/>"#,
        r#"<manifest:file-entry manifest:full-path="content.xml" manifest:media-type="text/xml"/>"#,
        r#"</manifest:manifest>"#);

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    zip.start_file("mimetype", options).unwrap();
    zip.write_all(MIMETYPE.as_bytes()).unwrap();
    zip.start_file("META-INF/manifest.xml", options).unwrap();
    zip.write_all(manifest.as_bytes()).unwrap();
    zip.start_file("content.xml", options).unwrap();
    zip.write_all(content.as_bytes()).unwrap();
    zip.finish().unwrap();
}

/// A bank export laid out like the default layout: five title rows, a header on row 6,
/// date in C, description in E, amount in G and balance in I.
pub(crate) fn bank_export(dir: &Path, name: &str, transactions: &[(&'static str, &'static str, f64)]) -> PathBuf {
    let mut rows = vec![
        vec![Cell::Text("Account statement")],
        vec![Cell::Text("Everyday account")],
        vec![Cell::Empty],
        vec![Cell::Text("Exported"), Cell::Date("2024-02-01")],
        vec![Cell::Empty],
        header_row(),
    ];

    let mut balance = 1000.0;
    for (date, description, amount) in transactions {
        balance += amount;
        rows.push(vec![
            Cell::Empty, Cell::Empty, Cell::Date(*date), Cell::Empty, Cell::Text(*description),
            Cell::Empty, Cell::Number(*amount), Cell::Empty, Cell::Number(balance),
        ]);
    }

    let path = dir.join(name);
    write_ods(&path, &rows);
    path
}

pub(crate) fn header_row() -> Vec<Cell> {
    vec![
        Cell::Empty, Cell::Empty, Cell::Text("Transaction date"), Cell::Empty, Cell::Text("Description"),
        Cell::Empty, Cell::Text("Amount"), Cell::Empty, Cell::Text("Balance"),
    ]
}
