//! Beneficiary novelty tracking.
//!
//! Per partition, in time-sorted order: flag the first transfer to each
//! counterparty, and count that counterparty's transfers inside the trailing
//! 30 days — causally, using only the current row and rows before it.
//!
//! A missing counterparty cell is its own key: repeated blank counterparties
//! are repeats of each other, not fresh beneficiaries every time.
//!
//! A row with no timestamp cannot be judged for repetition, so both fields
//! default to 1 — a singleton novel event — never to 0.

use crate::stage::{PartitionCtx, PartitionFeatures, PartitionStage};
use chrono::{Duration, NaiveDateTime};
use std::collections::HashMap;

// ── Constants ────────────────────────────────────────────────────────────────

/// Trailing window for the per-beneficiary transfer count.
const TRAILING_WINDOW_DAYS: i64 = 30;

pub struct BeneficiaryStage;

impl PartitionStage for BeneficiaryStage {
    fn name(&self) -> &'static str {
        "beneficiary"
    }

    fn run(&self, ctx: &PartitionCtx<'_>, out: &mut PartitionFeatures) {
        if !ctx.schema.tracks_beneficiaries() {
            // Without a counterparty or a time axis the defaults stand:
            // is_new_beneficiary = 0, beneficiary_txn_count_30d = 1.
            return;
        }

        // Timestamps already seen per counterparty, ascending because the
        // partition is time-sorted.
        let mut seen: HashMap<Option<&str>, Vec<NaiveDateTime>> = HashMap::new();

        for pos in 0..ctx.len() {
            let record = ctx.record(pos);
            let key = record.counterparty.as_deref();

            let Some(ts) = record.timestamp else {
                // Cannot judge repetition without time: singleton novel event.
                out.is_new_beneficiary[pos] = 1;
                out.beneficiary_txn_count_30d[pos] = 1;
                seen.entry(key).or_default();
                continue;
            };

            let history = seen.entry(key).or_default();
            out.is_new_beneficiary[pos] = u8::from(history.is_empty());

            let cutoff = ts - Duration::days(TRAILING_WINDOW_DAYS);
            // History is sorted; everything from the partition point onward
            // falls inside the trailing window. The current row counts too.
            let inside = history.len() - history.partition_point(|&t| t < cutoff);
            out.beneficiary_txn_count_30d[pos] = (inside + 1) as u64;

            history.push(ts);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::partition_records;
    use crate::record::{parse_timestamp, Schema, TransactionRecord};
    use std::collections::HashSet;

    fn txn(ts: Option<&str>, counterparty: Option<&str>) -> TransactionRecord {
        TransactionRecord {
            customer_id: Some("c1".into()),
            account_id: Some("a1".into()),
            amount: 10.0,
            timestamp: ts.and_then(parse_timestamp),
            counterparty: counterparty.map(str::to_string),
            ..Default::default()
        }
    }

    fn run_stage(records: &[TransactionRecord], schema: Schema) -> PartitionFeatures {
        let set = partition_records(&schema, records);
        let partition = &set.partitions[0];
        let amounts: Vec<f64> = partition.rows.iter().map(|&r| records[r].amount).collect();
        let mut out = PartitionFeatures::with_fallbacks(&amounts);
        let ctx = PartitionCtx {
            partition,
            records,
            schema: &schema,
        };
        BeneficiaryStage.run(&ctx, &mut out);
        out
    }

    /// Rows flagged new equal the number of distinct counterparties.
    #[test]
    fn novelty_count_matches_distinct_counterparties() {
        let records = vec![
            txn(Some("2024-01-01 00:00:00"), Some("b1")),
            txn(Some("2024-01-02 00:00:00"), Some("b2")),
            txn(Some("2024-01-03 00:00:00"), Some("b1")),
            txn(Some("2024-01-04 00:00:00"), Some("b3")),
            txn(Some("2024-01-05 00:00:00"), Some("b2")),
        ];
        let out = run_stage(&records, Schema::full());
        let new_rows: u32 = out.is_new_beneficiary.iter().map(|&f| u32::from(f)).sum();
        let distinct: HashSet<_> = records.iter().map(|r| r.counterparty.clone()).collect();
        assert_eq!(new_rows as usize, distinct.len());
        assert_eq!(out.is_new_beneficiary, vec![1, 1, 0, 1, 0]);
    }

    /// The trailing window is 30 days inclusive and per-counterparty.
    #[test]
    fn trailing_count_is_per_counterparty() {
        let records = vec![
            txn(Some("2024-01-01 12:00:00"), Some("b1")),
            txn(Some("2024-01-10 12:00:00"), Some("b2")),
            txn(Some("2024-01-20 12:00:00"), Some("b1")),
            txn(Some("2024-03-15 12:00:00"), Some("b1")),
        ];
        let out = run_stage(&records, Schema::full());
        assert_eq!(out.beneficiary_txn_count_30d[0], 1);
        // b2's count ignores b1's transfer nine days earlier.
        assert_eq!(out.beneficiary_txn_count_30d[1], 1);
        // Jan 1 is within 30 days of Jan 20.
        assert_eq!(out.beneficiary_txn_count_30d[2], 2);
        // By mid-March both earlier b1 transfers have aged out.
        assert_eq!(out.beneficiary_txn_count_30d[3], 1);
    }

    /// A transfer exactly 30 days back still counts (inclusive window).
    #[test]
    fn window_edge_is_inclusive() {
        let records = vec![
            txn(Some("2024-01-01 12:00:00"), Some("b1")),
            txn(Some("2024-01-31 12:00:00"), Some("b1")),
        ];
        let out = run_stage(&records, Schema::full());
        assert_eq!(out.beneficiary_txn_count_30d[1], 2);
    }

    /// Missing timestamp: both fields are 1, never 0.
    #[test]
    fn missing_timestamp_is_singleton_novel_event() {
        let records = vec![
            txn(Some("2024-01-01 12:00:00"), Some("b1")),
            txn(None, Some("b1")),
        ];
        let out = run_stage(&records, Schema::full());
        assert_eq!(out.is_new_beneficiary[1], 1);
        assert_eq!(out.beneficiary_txn_count_30d[1], 1);
    }

    /// Blank counterparties repeat each other rather than each being new.
    #[test]
    fn blank_counterparty_is_one_key() {
        let records = vec![
            txn(Some("2024-01-01 12:00:00"), None),
            txn(Some("2024-01-02 12:00:00"), None),
        ];
        let out = run_stage(&records, Schema::full());
        assert_eq!(out.is_new_beneficiary, vec![1, 0]);
        assert_eq!(out.beneficiary_txn_count_30d[1], 2);
    }

    /// Without the counterparty column the defaults stand.
    #[test]
    fn absent_column_keeps_defaults() {
        let records = vec![
            txn(Some("2024-01-01 12:00:00"), Some("b1")),
            txn(Some("2024-01-02 12:00:00"), Some("b1")),
        ];
        let schema = Schema {
            has_counterparty: false,
            ..Schema::full()
        };
        let out = run_stage(&records, schema);
        assert_eq!(out.is_new_beneficiary, vec![0, 0]);
        assert_eq!(out.beneficiary_txn_count_30d, vec![1, 1]);
    }
}
