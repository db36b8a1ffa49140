use std::fmt;

use serde::{de, Deserialize, Deserializer};

/// A spreadsheet column addressed by its letters, e.g. `C` or `AB`.
/// Stored as a 0-based index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub(crate) struct Column(pub(crate) u32);

impl TryFrom<String> for Column {
    type Error = String;

    fn try_from(letters: String) -> Result<Self, Self::Error> {
        Column::parse(&letters)
    }
}

impl Column {
    pub(crate) fn parse(letters: &str) -> Result<Column, String> {
        let letters = letters.trim();
        if letters.is_empty() || letters.len() > 3 {
            return Err(format!("'{letters}' is not a spreadsheet column"));
        }

        let mut index: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(format!("'{letters}' is not a spreadsheet column"));
            }
            index = index * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        }

        Ok(Column(index - 1))
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut n = self.0 + 1;
        let mut letters = vec![];
        while n > 0 {
            let rem = (n - 1) % 26;
            letters.push((b'A' + rem as u8) as char);
            n = (n - 1) / 26;
        }
        let s: String = letters.iter().rev().collect();
        write!(f, "{s}")
    }
}

/// Describes where the transactions live in an exported spreadsheet.
/// Rows are 0-based. Every row after `header_row` is a transaction or blank.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub(crate) struct SheetLayout {
    /// File extension the export must carry, without the dot
    pub(crate) extension: String,
    /// Worksheet name, the first worksheet when unset
    pub(crate) sheet: Option<String>,
    pub(crate) header_row: u32,
    pub(crate) date: Column,
    pub(crate) description: Column,
    pub(crate) amount: Column,
    /// An empty string means the export has no balance column
    #[serde(deserialize_with = "optional_column")]
    pub(crate) balance: Option<Column>,
}

fn optional_column<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Column>, D::Error> {
    let letters = String::deserialize(deserializer)?;
    if letters.trim().is_empty() {
        return Ok(None);
    }
    Column::parse(&letters).map(Some).map_err(de::Error::custom)
}

impl Default for SheetLayout {
    fn default() -> Self {
        SheetLayout {
            extension: "ods".to_string(),
            sheet: None,
            header_row: 5,
            date: Column(2),
            description: Column(4),
            amount: Column(6),
            balance: Some(Column(8)),
        }
    }
}

impl SheetLayout {
    pub(crate) fn columns(&self) -> Vec<(&'static str, Column)> {
        let mut columns = vec![
            ("date", self.date),
            ("description", self.description),
            ("amount", self.amount),
        ];
        if let Some(balance) = self.balance {
            columns.push(("balance", balance));
        }
        columns
    }
}
