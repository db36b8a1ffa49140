use std::path::Path;
use std::str::FromStr;

use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::NaiveDate;
use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;
use rust_decimal::Decimal;

use crate::common::{IngestError, IngestResult};
use crate::transaction::TransactionRecord;

pub(crate) mod column;

#[cfg(test)]
pub(crate) mod fixture;

pub(crate) use column::SheetLayout;
use column::Column;

static EMPTY_CELL: Data = Data::Empty;

/// Check an import file before anything else touches it: it must exist and carry the
/// extension of the configured layout.
pub(crate) fn check_source(path: &Path, layout: &SheetLayout) -> IngestResult<()> {
    if !path.exists() {
        return Err(IngestError::Path(path.to_path_buf()));
    }

    let extension = path.extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    if !path.is_file() || !extension.eq_ignore_ascii_case(&layout.extension) {
        return Err(IngestError::Format {
            path: path.to_path_buf(),
            expected: layout.extension.clone(),
        });
    }

    Ok(())
}

/// Read every transaction row of a spreadsheet export. Each record is stamped with `category`.
/// Fails without returning any record if a single row does not fit the layout.
pub(crate) fn read_transactions(path: &Path, layout: &SheetLayout, category: &str) -> IngestResult<Vec<TransactionRecord>> {
    check_source(path, layout)?;

    let parse_error = |reason: String| IngestError::Parse { path: path.to_path_buf(), reason };

    info!("Reading transactions from {}", path.display());
    let mut workbook = open_workbook_auto(path).map_err(|e| parse_error(e.to_string()))?;

    let sheet = match &layout.sheet {
        Some(sheet) => sheet.clone(),
        None => workbook.sheet_names().first().cloned()
            .ok_or_else(|| parse_error("workbook has no worksheet".to_string()))?,
    };
    let range = workbook.worksheet_range(&sheet).map_err(|e| parse_error(e.to_string()))?;

    let records = records_from_range(&range, layout, category).map_err(parse_error)?;
    info!("Parsed {} transactions from sheet '{}'", records.len(), sheet);

    Ok(records)
}

pub(crate) fn records_from_range(range: &Range<Data>, layout: &SheetLayout, category: &str) -> Result<Vec<TransactionRecord>, String> {
    let cell = |row: u32, column: Column| range.get_value((row, column.0)).unwrap_or(&EMPTY_CELL);

    let last_row = match range.end() {
        Some((row, _)) if row >= layout.header_row => row,
        _ => return Err(format!("sheet ends before header row {}", layout.header_row + 1)),
    };

    for (name, column) in layout.columns() {
        if is_blank(cell(layout.header_row, column)) {
            return Err(format!("header row {} has no {} column at {}", layout.header_row + 1, name, column));
        }
    }

    let mut records = vec![];
    for row in (layout.header_row + 1)..=last_row {
        // Spreadsheet row numbers are 1-based
        let row_number = row + 1;
        if layout.columns().iter().all(|(_, column)| is_blank(cell(row, *column))) {
            debug!("Skipping blank row {row_number}");
            continue;
        }

        let transaction_date = parse_date_cell(cell(row, layout.date))
            .ok_or_else(|| format!("row {row_number}: invalid date '{}' in column {}", cell(row, layout.date), layout.date))?;
        let amount = parse_amount_cell(cell(row, layout.amount))
            .ok_or_else(|| format!("row {row_number}: invalid amount '{}' in column {}", cell(row, layout.amount), layout.amount))?;
        let balance = match layout.balance {
            Some(column) if !is_blank(cell(row, column)) => Some(parse_amount_cell(cell(row, column))
                .ok_or_else(|| format!("row {row_number}: invalid balance '{}' in column {}", cell(row, column), column))?),
            _ => None,
        };
        let description = match cell(row, layout.description) {
            Data::Empty => String::new(),
            other => other.to_string().trim().replace('\n', " "),
        };

        records.push(TransactionRecord {
            transaction_date,
            category: category.to_string(),
            description,
            amount,
            balance,
        });
    }

    Ok(records)
}

fn is_blank(data: &Data) -> bool {
    match data {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

// `\d` would also match non-ASCII digits, which chrono cannot parse
lazy_static! {
    static ref ISO_DATE: Regex = Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").unwrap();
    static ref ISO_DATE_TIME: Regex = Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}[T ][0-9]{2}:[0-9]{2}").unwrap();
    static ref DDMMYYYY: Regex = Regex::new(r"^[0-9]{2}/[0-9]{2}/[0-9]{4}$").unwrap();
    static ref DDMMMYYYY: Regex = Regex::new(r"^[0-9]{1,2} [a-zA-Z]{3} [0-9]{4}$").unwrap();
    static ref YYYYMMDD: Regex = Regex::new(r"^[0-9]{8}$").unwrap();
}

fn parse_date_cell(data: &Data) -> Option<NaiveDate> {
    match data {
        Data::DateTime(dt) => dt.as_datetime().map(|dt| dt.date()),
        Data::DateTimeIso(s) | Data::String(s) => parse_date(s.trim()),
        _ => None,
    }
}

pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    if ISO_DATE.is_match(s) {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
    } else if ISO_DATE_TIME.is_match(s) {
        NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok()
    } else if DDMMYYYY.is_match(s) {
        NaiveDate::parse_from_str(s, "%d/%m/%Y").ok()
    } else if DDMMMYYYY.is_match(s) {
        NaiveDate::parse_from_str(s, "%d %b %Y").ok()
    } else if YYYYMMDD.is_match(s) {
        NaiveDate::parse_from_str(s, "%Y%m%d").ok()
    } else {
        None
    }
}

fn parse_amount_cell(data: &Data) -> Option<Decimal> {
    match data {
        Data::Int(i) => Some(Decimal::from(*i)),
        Data::Float(f) if f.is_finite() => Decimal::from_str(&f.to_string()).ok(),
        Data::String(s) => parse_amount(s),
        _ => None,
    }
}

/// Parse an amount written as text, e.g. `-1 234,50 kr` or `$1,234.50`
pub(crate) fn parse_amount(s: &str) -> Option<Decimal> {
    let mut amount: String = s.chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | ','))
        .collect();

    // A lone comma is a decimal separator, otherwise commas group thousands.
    // `1,234` could be either and is refused.
    if amount.contains(',') {
        amount = if amount.contains('.') || amount.matches(',').count() > 1 {
            amount.replace(',', "")
        } else {
            match amount.split_once(',') {
                Some((_, decimals)) if decimals.len() == 3 => return None,
                _ => amount.replace(',', "."),
            }
        };
    }

    if amount.is_empty() {
        return None;
    }
    Decimal::from_str(amount.trim_start_matches('+')).ok()
}
