//! Account partitioning — groups rows by (customer, account) and time-sorts
//! each partition.
//!
//! RULES:
//!   - Sort is stable: ascending timestamp, missing timestamps last, ties
//!     broken by original row index. Timestamped rows therefore form a
//!     contiguous sorted prefix of every partition.
//!   - A row missing either key value joins no partition; the assembler
//!     gives it the dataset-wide fallback block.
//!   - Pure transform: no partition is ever empty, no row is ever dropped.

use crate::record::{Schema, TransactionRecord};
use crate::types::{AccountId, CustomerId, RowIdx};
use chrono::NaiveDateTime;
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub type PartitionKey = (CustomerId, AccountId);

/// The time-ordered row sequence for one (customer, account) pair.
#[derive(Debug, Clone)]
pub struct AccountPartition {
    pub key: PartitionKey,
    /// Original row indices, time-sorted.
    pub rows: Vec<RowIdx>,
}

/// Result of the partitioning phase.
#[derive(Debug, Default)]
pub struct PartitionSet {
    /// Deterministic key order (BTreeMap insertion).
    pub partitions: Vec<AccountPartition>,
    /// Rows that joined no partition: grouping columns absent from the
    /// schema, or key values missing on the row itself.
    pub ungrouped: Vec<RowIdx>,
}

impl PartitionSet {
    /// Partition indices grouped by customer, in deterministic order.
    /// Input to the cross-account reduction.
    pub fn customer_groups(&self) -> BTreeMap<&str, Vec<usize>> {
        let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (idx, partition) in self.partitions.iter().enumerate() {
            groups.entry(&partition.key.0).or_default().push(idx);
        }
        groups
    }
}

/// Ascending by timestamp, missing timestamps last. Callers rely on the
/// surrounding sort being stable for the original-index tie-break.
fn timestamp_order(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Group rows into time-sorted account partitions.
pub fn partition_records(schema: &Schema, records: &[TransactionRecord]) -> PartitionSet {
    if !schema.grouped() {
        // No grouping columns: every per-partition feature falls back to
        // dataset-wide constants downstream.
        return PartitionSet {
            partitions: Vec::new(),
            ungrouped: (0..records.len()).collect(),
        };
    }

    let mut grouped: BTreeMap<PartitionKey, Vec<RowIdx>> = BTreeMap::new();
    let mut ungrouped = Vec::new();

    for (row, record) in records.iter().enumerate() {
        match (&record.customer_id, &record.account_id) {
            (Some(customer), Some(account)) => grouped
                .entry((customer.clone(), account.clone()))
                .or_default()
                .push(row),
            _ => ungrouped.push(row),
        }
    }

    let partitions = grouped
        .into_iter()
        .map(|(key, mut rows)| {
            rows.sort_by(|&a, &b| {
                timestamp_order(records[a].timestamp, records[b].timestamp)
            });
            AccountPartition { key, rows }
        })
        .collect();

    PartitionSet {
        partitions,
        ungrouped,
    }
}
