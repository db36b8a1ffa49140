use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// A single transaction row, either parsed from a spreadsheet or read back from the database
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub(crate) struct TransactionRecord {
    #[serde(rename = "Transaction date")]
    pub(crate) transaction_date: NaiveDate,
    #[serde(rename = "Category")]
    pub(crate) category: String,
    #[serde(rename = "Description")]
    pub(crate) description: String,
    #[serde(rename = "Amount")]
    pub(crate) amount: Decimal,
    #[serde(rename = "Balance")]
    pub(crate) balance: Option<Decimal>,
}

/// Identity of a ledger entry. No two persisted records may share it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct RecordKey {
    pub(crate) transaction_date: NaiveDate,
    pub(crate) category: String,
}

impl TransactionRecord {
    pub(crate) fn key(&self) -> RecordKey {
        RecordKey {
            transaction_date: self.transaction_date,
            category: self.category.clone(),
        }
    }

    /// Newest first. Records on the same date are ordered by category.
    fn ledger_order(&self, other: &TransactionRecord) -> Ordering {
        other.transaction_date.cmp(&self.transaction_date)
            .then_with(|| self.category.cmp(&other.category))
    }
}

/// An ordered collection of transaction records making up one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RecordSet {
    records: Vec<TransactionRecord>,
}

impl RecordSet {
    pub(crate) fn new(records: Vec<TransactionRecord>) -> RecordSet {
        RecordSet { records }
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &TransactionRecord> {
        self.records.iter()
    }

    pub(crate) fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub(crate) fn into_records(self) -> Vec<TransactionRecord> {
        self.records
    }

    pub(crate) fn has_unique_keys(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.records.len());
        self.records.iter().all(|r| seen.insert(r.key()))
    }

    /// Keep the first record for every key and drop the rest.
    /// Returns the number of records dropped.
    pub(crate) fn retain_first_per_key(&mut self) -> usize {
        let before = self.records.len();
        let mut seen = HashSet::with_capacity(before);
        self.records.retain(|r| seen.insert(r.key()));
        before - self.records.len()
    }

    /// Keep the first of every group of identical records.
    /// Returns the number of records dropped.
    pub(crate) fn retain_first_per_row(&mut self) -> usize {
        let before = self.records.len();
        let mut seen = HashSet::with_capacity(before);
        self.records.retain(|r| seen.insert(r.clone()));
        before - self.records.len()
    }

    /// Sort by transaction date descending. The sort is stable so records sharing a key keep
    /// their relative order.
    pub(crate) fn sort_for_ledger(&mut self) {
        self.records.sort_by(|a, b| a.ledger_order(b));
    }

    pub(crate) fn is_ledger_sorted(&self) -> bool {
        self.records.windows(2).all(|pair| pair[0].ledger_order(&pair[1]) != Ordering::Greater)
    }
}

impl From<Vec<TransactionRecord>> for RecordSet {
    fn from(records: Vec<TransactionRecord>) -> Self {
        RecordSet::new(records)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::str::FromStr;

    use super::*;

    pub(crate) fn record(date: &str, category: &str, amount: i64) -> TransactionRecord {
        TransactionRecord {
            transaction_date: NaiveDate::from_str(date).unwrap(),
            category: category.to_string(),
            description: format!("purchase {amount}"),
            amount: Decimal::from(amount),
            balance: None,
        }
    }

    #[test]
    fn test_sort_newest_first() {
        let mut set = RecordSet::new(vec![
            record("2024-01-01", "Other", 1),
            record("2024-01-03", "Other", 3),
            record("2024-01-02", "Food", 2),
            record("2024-01-02", "Bills", 4),
        ]);
        set.sort_for_ledger();

        let order: Vec<(String, &str)> = set.iter()
            .map(|r| (r.transaction_date.to_string(), r.category.as_str()))
            .collect();
        assert_eq!(order, vec![
            ("2024-01-03".to_string(), "Other"),
            ("2024-01-02".to_string(), "Bills"),
            ("2024-01-02".to_string(), "Food"),
            ("2024-01-01".to_string(), "Other"),
        ]);
        assert!(set.is_ledger_sorted());
    }

    #[test]
    fn test_retain_first_per_key() {
        let mut set = RecordSet::new(vec![
            record("2024-01-01", "Other", 10),
            record("2024-01-01", "Other", 99),
            record("2024-01-01", "Food", 5),
        ]);
        assert!(!set.has_unique_keys());

        assert_eq!(set.retain_first_per_key(), 1);
        assert!(set.has_unique_keys());
        assert_eq!(set.records()[0].amount, Decimal::from(10));
    }

    #[test]
    fn test_retain_first_per_row_keeps_key_conflicts() {
        let mut set = RecordSet::new(vec![
            record("2024-01-01", "Other", 10),
            record("2024-01-01", "Other", 10),
            record("2024-01-01", "Other", 99),
        ]);

        assert_eq!(set.retain_first_per_row(), 1);
        assert_eq!(set.len(), 2);
    }
}
