use std::collections::HashSet;
use std::fmt;

use clap::ValueEnum;
use serde::Deserialize;

use crate::transaction::{RecordKey, RecordSet, TransactionRecord};

/// How newly imported records are combined with the records already stored in a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum MergePolicy {
    /// Keep the stored record whenever a key exists on both sides, add only new keys.
    #[default]
    PreferExisting,
    /// Append everything and drop rows that are identical in every field.
    /// Records sharing a key but differing elsewhere are all kept.
    AdditiveDedup,
    /// Discard the stored records and keep only the new import.
    Replace,
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MergePolicy::PreferExisting => write!(f, "prefer-existing"),
            MergePolicy::AdditiveDedup => write!(f, "additive-dedup"),
            MergePolicy::Replace => write!(f, "replace"),
        }
    }
}

/// Result of a merge, the new authoritative record set plus what happened to get there.
#[derive(Debug, Default)]
pub(crate) struct MergeOutcome {
    pub(crate) records: RecordSet,
    /// Records carried over from the table
    pub(crate) kept: usize,
    /// Records taken from the import
    pub(crate) added: usize,
    /// Imported records whose key was already used by a stored record
    pub(crate) conflicts: usize,
    /// Records discarded as duplicates, within the import or across both sides
    pub(crate) duplicates: usize,
}

/// Combine `incoming` with the records of an existing table. A missing table is an empty one.
/// The returned set is always sorted newest first.
pub(crate) fn merge(existing: Option<RecordSet>, incoming: RecordSet, policy: MergePolicy) -> MergeOutcome {
    let mut outcome = match (policy, existing) {
        (MergePolicy::Replace, _) | (_, None) => replace(incoming, policy),
        (MergePolicy::PreferExisting, Some(existing)) => prefer_existing(existing, incoming),
        (MergePolicy::AdditiveDedup, Some(existing)) => additive_dedup(existing, incoming),
    };

    outcome.records.sort_for_ledger();
    debug_assert!(outcome.records.is_ledger_sorted());
    outcome
}

fn replace(mut incoming: RecordSet, policy: MergePolicy) -> MergeOutcome {
    let duplicates = match policy {
        MergePolicy::AdditiveDedup => incoming.retain_first_per_row(),
        _ => incoming.retain_first_per_key(),
    };

    MergeOutcome {
        added: incoming.len(),
        records: incoming,
        duplicates,
        ..Default::default()
    }
}

fn prefer_existing(mut existing: RecordSet, mut incoming: RecordSet) -> MergeOutcome {
    // Tables written with the additive policy may hold repeated keys
    let mut duplicates = existing.retain_first_per_key();
    duplicates += incoming.retain_first_per_key();

    let kept = existing.len();
    let keys: HashSet<_> = existing.iter().map(|r| r.key()).collect();

    let mut records = existing.into_records();
    let mut conflicts = 0;
    for record in incoming.into_records() {
        if keys.contains(&record.key()) {
            conflicts += 1;
        } else {
            records.push(record);
        }
    }

    MergeOutcome {
        added: records.len() - kept,
        records: records.into(),
        kept,
        conflicts,
        duplicates,
    }
}

fn additive_dedup(mut existing: RecordSet, incoming: RecordSet) -> MergeOutcome {
    let mut duplicates = existing.retain_first_per_row();
    let kept = existing.len();

    let keys: HashSet<RecordKey> = existing.iter().map(|r| r.key()).collect();
    let mut rows: HashSet<TransactionRecord> = existing.iter().cloned().collect();

    let mut records = existing.into_records();
    let mut conflicts = 0;
    for record in incoming.into_records() {
        if !rows.insert(record.clone()) {
            duplicates += 1;
            continue;
        }
        if keys.contains(&record.key()) {
            conflicts += 1;
        }
        records.push(record);
    }

    MergeOutcome {
        added: records.len() - kept,
        records: records.into(),
        kept,
        conflicts,
        duplicates,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::transaction::tests::record;

    fn sorted(records: Vec<TransactionRecord>) -> RecordSet {
        let mut set = RecordSet::new(records);
        set.sort_for_ledger();
        set
    }

    #[test]
    fn test_prefer_existing_keeps_stored_values() {
        let existing = sorted(vec![record("2024-01-01", "Other", 10)]);
        let incoming = RecordSet::new(vec![
            record("2024-01-01", "Other", 99),
            record("2024-01-02", "Other", 20),
        ]);

        let outcome = merge(Some(existing), incoming, MergePolicy::PreferExisting);

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.kept, 1);
        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.conflicts, 1);
        let conflicted = outcome.records.iter()
            .find(|r| r.transaction_date.to_string() == "2024-01-01")
            .unwrap();
        assert_eq!(conflicted.amount, Decimal::from(10));
        assert_eq!(conflicted.description, "purchase 10");
    }

    #[test]
    fn test_prefer_existing_reimport_is_idempotent() {
        let existing = sorted(vec![
            record("2024-01-03", "Other", 3),
            record("2024-01-01", "Other", 1),
            record("2024-01-02", "Food", 2),
            record("2024-01-02", "Other", 4),
        ]);

        let outcome = merge(Some(existing.clone()), existing.clone(), MergePolicy::PreferExisting);

        assert_eq!(outcome.records, existing);
        assert_eq!(outcome.added, 0);
        assert_eq!(outcome.conflicts, 4);
    }

    #[test]
    fn test_prefer_existing_restores_unique_keys() {
        let existing = RecordSet::new(vec![
            record("2024-01-01", "Other", 10),
            record("2024-01-01", "Other", 11),
        ]);
        let incoming = RecordSet::new(vec![
            record("2024-01-05", "Other", 50),
            record("2024-01-05", "Other", 51),
        ]);

        let outcome = merge(Some(existing), incoming, MergePolicy::PreferExisting);

        assert!(outcome.records.has_unique_keys());
        assert_eq!(outcome.duplicates, 2);
        assert_eq!(outcome.records.records()[0].amount, Decimal::from(50));
        assert_eq!(outcome.records.records()[1].amount, Decimal::from(10));
    }

    #[test]
    fn test_absent_table_takes_import() {
        let incoming = RecordSet::new(vec![
            record("2024-01-01", "Other", 1),
            record("2024-01-03", "Other", 3),
            record("2024-01-02", "Other", 2),
        ]);

        let outcome = merge(None, incoming, MergePolicy::PreferExisting);

        let dates: Vec<String> = outcome.records.iter().map(|r| r.transaction_date.to_string()).collect();
        assert_eq!(dates, vec!["2024-01-03", "2024-01-02", "2024-01-01"]);
        assert_eq!(outcome.added, 3);
        assert_eq!(outcome.kept, 0);
    }

    #[test]
    fn test_additive_dedup_keeps_conflicting_rows() {
        let existing = sorted(vec![
            record("2024-01-01", "Other", 10),
            record("2024-01-02", "Other", 20),
        ]);
        let incoming = RecordSet::new(vec![
            record("2024-01-01", "Other", 10),
            record("2024-01-01", "Other", 99),
        ]);

        let outcome = merge(Some(existing), incoming, MergePolicy::AdditiveDedup);

        assert_eq!(outcome.records.len(), 3);
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(outcome.conflicts, 1);
        assert!(!outcome.records.has_unique_keys());
        assert!(outcome.records.is_ledger_sorted());
        // Stored row stays ahead of the imported one sharing its key
        assert_eq!(outcome.records.records()[1].amount, Decimal::from(10));
        assert_eq!(outcome.records.records()[2].amount, Decimal::from(99));
    }

    #[test]
    fn test_replace_ignores_stored_records() {
        let existing = sorted(vec![record("2024-01-01", "Other", 10)]);
        let incoming = RecordSet::new(vec![
            record("2024-02-01", "Other", 1),
            record("2024-02-01", "Other", 2),
        ]);

        let outcome = merge(Some(existing), incoming, MergePolicy::Replace);

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records.records()[0].amount, Decimal::from(1));
        assert_eq!(outcome.kept, 0);
        assert_eq!(outcome.duplicates, 1);
    }

    #[test]
    fn test_policy_names() {
        assert_eq!(MergePolicy::PreferExisting.to_string(), "prefer-existing");
        assert_eq!(MergePolicy::from_str("additive-dedup", false), Ok(MergePolicy::AdditiveDedup));
        assert_eq!(MergePolicy::default(), MergePolicy::PreferExisting);
    }
}
