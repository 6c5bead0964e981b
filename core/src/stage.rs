//! Per-partition stage contract and the feature block stages write into.
//!
//! RULE: Every per-partition aggregator implements PartitionStage.
//! The engine runs the stages in a fixed, documented order (see engine.rs)
//! over a block pre-seeded with every column's fallback value. A stage
//! overwrites only what it can compute for the rows it can judge — anything
//! left untouched is already the documented degraded-capability default.

use crate::partition::AccountPartition;
use crate::record::{Schema, TransactionRecord};
use chrono::NaiveDateTime;

/// Everything a stage may read. Stages never see rows outside their
/// partition, which is what makes the pass causal and leak-free.
pub struct PartitionCtx<'a> {
    pub partition: &'a AccountPartition,
    pub records: &'a [TransactionRecord],
    pub schema: &'a Schema,
}

impl<'a> PartitionCtx<'a> {
    /// Record at the partition-local position `pos`.
    pub fn record(&self, pos: usize) -> &TransactionRecord {
        &self.records[self.partition.rows[pos]]
    }

    pub fn len(&self) -> usize {
        self.partition.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partition.rows.is_empty()
    }
}

/// The contract every per-partition aggregator fulfills.
pub trait PartitionStage {
    /// Unique stable name, used in phase logging.
    fn name(&self) -> &'static str;

    /// Compute this stage's columns for one partition. Indices into `out`
    /// are partition-local positions (the sorted order), not original rows.
    fn run(&self, ctx: &PartitionCtx<'_>, out: &mut PartitionFeatures);
}

/// Per-partition feature columns, parallel to `AccountPartition::rows`.
/// Seeded with fallback values; the assembler scatters the block back onto
/// original row positions.
#[derive(Debug)]
pub struct PartitionFeatures {
    // Causal window family
    pub time_since_last: Vec<f64>,
    pub recent_burst: Vec<u8>,
    pub last_txn_time: Vec<Option<NaiveDateTime>>,
    pub txn_count_30s: Vec<u64>,
    pub txn_count_10min: Vec<u64>,
    pub txn_count_1hour: Vec<u64>,
    pub rolling_std: Vec<f64>,
    pub transaction_velocity: Vec<f64>,
    // Calendar bucket family
    pub hourly_total: Vec<f64>,
    pub hourly_count: Vec<u64>,
    pub daily_total: Vec<f64>,
    pub daily_count: Vec<u64>,
    pub weekly_total: Vec<f64>,
    pub weekly_txn_count: Vec<u64>,
    pub weekly_avg_amount: Vec<f64>,
    pub weekly_deviation: Vec<f64>,
    pub amount_vs_weekly_avg: Vec<f64>,
    pub current_month_spending: Vec<f64>,
    pub monthly_txn_count: Vec<u64>,
    pub monthly_avg_amount: Vec<f64>,
    pub monthly_deviation: Vec<f64>,
    pub amount_vs_monthly_avg: Vec<f64>,
    // Beneficiary family
    pub is_new_beneficiary: Vec<u8>,
    pub beneficiary_txn_count_30d: Vec<u64>,
}

impl PartitionFeatures {
    /// Fallback-seeded block for a partition whose row amounts (in sorted
    /// order) are `amounts`. These are exactly the values a row keeps when
    /// no stage can judge it: sentinel gap, singleton windows, own-amount
    /// buckets, unknown beneficiary.
    pub fn with_fallbacks(amounts: &[f64]) -> Self {
        let n = amounts.len();
        Self {
            time_since_last: vec![crate::causal_window::FIRST_GAP_SECONDS; n],
            recent_burst: vec![0; n],
            last_txn_time: vec![None; n],
            txn_count_30s: vec![1; n],
            txn_count_10min: vec![1; n],
            txn_count_1hour: vec![1; n],
            rolling_std: vec![0.0; n],
            transaction_velocity: vec![0.0; n],
            hourly_total: amounts.to_vec(),
            hourly_count: vec![1; n],
            daily_total: amounts.to_vec(),
            daily_count: vec![1; n],
            weekly_total: amounts.to_vec(),
            weekly_txn_count: vec![1; n],
            weekly_avg_amount: amounts.to_vec(),
            weekly_deviation: vec![0.0; n],
            amount_vs_weekly_avg: vec![1.0; n],
            current_month_spending: amounts.to_vec(),
            monthly_txn_count: vec![1; n],
            monthly_avg_amount: amounts.to_vec(),
            monthly_deviation: vec![0.0; n],
            amount_vs_monthly_avg: vec![1.0; n],
            is_new_beneficiary: vec![0; n],
            beneficiary_txn_count_30d: vec![1; n],
        }
    }
}
