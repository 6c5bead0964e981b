//! Static encodings and final feature assembly.
//!
//! The assembler owns the whole-input encodings (suspicious flag, lookup
//! encodings, channel codes, clock-face fields), the per-partition user
//! statistics, the dataset-wide fallback block, and the merge that scatters
//! every computed block back onto the original row order.
//!
//! RULE: the output has exactly one FeatureVector per input row, in input
//! order. Rows are only ever enriched, never dropped or reordered.

use crate::config::RiskConfig;
use crate::cross_account::{CustomerStats, PartitionRatios};
use crate::features::FeatureVector;
use crate::partition::PartitionSet;
use crate::record::{Schema, TransactionRecord};
use crate::stage::PartitionFeatures;
use crate::stats::{mean, sample_std, zero_guard};
use crate::types::RowIdx;
use chrono::{Datelike, Timelike};
use std::collections::{BTreeMap, BTreeSet, HashMap};

// ── Clock-face fallbacks ─────────────────────────────────────────────────────

/// Hour assigned to rows without a usable timestamp.
const FALLBACK_HOUR: u32 = 12;
/// Night spans [22:00, 06:00).
const NIGHT_START_HOUR: u32 = 22;
const NIGHT_END_HOUR: u32 = 6;
/// Saturday and Sunday, with Monday = 0.
const WEEKEND_FIRST_DAY: u32 = 5;

/// Whole-input static encodings, row-indexed.
#[derive(Debug)]
pub struct StaticFeatures {
    pub flag_amount: Vec<u8>,
    pub transfer_type_encoded: Vec<i64>,
    pub transfer_type_risk: Vec<f64>,
    pub channel_encoded: Vec<i64>,
    pub hour: Vec<u32>,
    pub day_of_week: Vec<u32>,
    pub is_weekend: Vec<u8>,
    pub is_night: Vec<u8>,
}

/// Compute the static per-row encodings over the full, unsorted input.
pub fn static_features(
    schema: &Schema,
    records: &[TransactionRecord],
    config: &RiskConfig,
) -> StaticFeatures {
    let n = records.len();

    let mut flag_amount = vec![0u8; n];
    let mut transfer_type_encoded = vec![crate::config::UNMAPPED_ENCODED; n];
    let mut transfer_type_risk = vec![crate::config::UNMAPPED_RISK; n];
    if schema.has_transfer_type {
        for (row, record) in records.iter().enumerate() {
            let cell = record.transfer_type.as_deref();
            flag_amount[row] = config.suspicious_flag(cell);
            transfer_type_encoded[row] = config.encode(cell);
            transfer_type_risk[row] = config.risk(cell);
        }
    }

    // Channel codes are a pure function of the channel-id set: distinct ids
    // sorted lexicographically map to 0..k-1, a missing id maps to 0. This
    // stays stable under any reordering of the input.
    let mut channel_encoded = vec![0i64; n];
    if schema.has_channel {
        let distinct: BTreeSet<&str> = records
            .iter()
            .filter_map(|r| r.channel_id.as_deref())
            .collect();
        let codes: HashMap<&str, i64> = distinct
            .into_iter()
            .enumerate()
            .map(|(i, id)| (id, i as i64))
            .collect();
        for (row, record) in records.iter().enumerate() {
            if let Some(id) = record.channel_id.as_deref() {
                channel_encoded[row] = codes[id];
            }
        }
    }

    let mut hour = vec![FALLBACK_HOUR; n];
    let mut day_of_week = vec![0u32; n];
    if schema.has_timestamp {
        for (row, record) in records.iter().enumerate() {
            if let Some(ts) = record.timestamp {
                hour[row] = ts.hour();
                day_of_week[row] = ts.weekday().num_days_from_monday();
            }
        }
    }
    let is_weekend = day_of_week
        .iter()
        .map(|&d| u8::from(d >= WEEKEND_FIRST_DAY))
        .collect();
    let is_night = hour
        .iter()
        .map(|&h| u8::from(h < NIGHT_END_HOUR || h >= NIGHT_START_HOUR))
        .collect();

    StaticFeatures {
        flag_amount,
        transfer_type_encoded,
        transfer_type_risk,
        channel_encoded,
        hour,
        day_of_week,
        is_weekend,
        is_night,
    }
}

// ── Behavioral statistics ────────────────────────────────────────────────────

/// Per-partition amount statistics, broadcast to every member row.
#[derive(Debug, Clone)]
pub struct UserStats {
    pub avg: f64,
    pub std: f64,
    pub max: f64,
    pub freq: u64,
}

pub fn user_stats(records: &[TransactionRecord], rows: &[RowIdx]) -> UserStats {
    let amounts: Vec<f64> = rows.iter().map(|&r| records[r].amount).collect();
    UserStats {
        avg: mean(&amounts),
        std: sample_std(&amounts),
        max: crate::stats::max(&amounts),
        freq: rows.len() as u64,
    }
}

/// Dataset-wide constants, computed once over the entire input. Applied to
/// every row that joins no partition.
#[derive(Debug, Clone)]
pub struct DatasetStats {
    pub avg: f64,
    pub std: f64,
    pub max: f64,
    pub count: u64,
}

pub fn dataset_stats(records: &[TransactionRecord]) -> DatasetStats {
    let amounts: Vec<f64> = records.iter().map(|r| r.amount).collect();
    DatasetStats {
        avg: mean(&amounts),
        std: sample_std(&amounts),
        max: crate::stats::max(&amounts),
        count: records.len() as u64,
    }
}

// ── Assembly ─────────────────────────────────────────────────────────────────

/// Everything the final merge needs. `blocks` and `ratios` are parallel to
/// `set.partitions`; `customers` is keyed by customer id.
pub struct AssembleInputs<'a> {
    pub schema: &'a Schema,
    pub records: &'a [TransactionRecord],
    pub statics: &'a StaticFeatures,
    pub set: &'a PartitionSet,
    pub blocks: &'a [PartitionFeatures],
    pub ratios: &'a [PartitionRatios],
    pub customers: &'a BTreeMap<&'a str, CustomerStats>,
}

/// Scatter every computed block back onto original row positions and fill
/// the dataset-wide fallback block for rows outside any partition.
pub fn assemble(inputs: &AssembleInputs<'_>) -> Vec<FeatureVector> {
    let records = inputs.records;
    let mut out: Vec<FeatureVector> = vec![FeatureVector::default(); records.len()];

    for (row, vector) in out.iter_mut().enumerate() {
        vector.transaction_amount = records[row].amount;
        vector.flag_amount = inputs.statics.flag_amount[row];
        vector.transfer_type_encoded = inputs.statics.transfer_type_encoded[row];
        vector.transfer_type_risk = inputs.statics.transfer_type_risk[row];
        vector.channel_encoded = inputs.statics.channel_encoded[row];
        vector.hour = inputs.statics.hour[row];
        vector.day_of_week = inputs.statics.day_of_week[row];
        vector.is_weekend = inputs.statics.is_weekend[row];
        vector.is_night = inputs.statics.is_night[row];
    }

    for (p, partition) in inputs.set.partitions.iter().enumerate() {
        let stats = user_stats(records, &partition.rows);
        let ratios = &inputs.ratios[p];
        let block = &inputs.blocks[p];
        let customer = &inputs.customers[partition.key.0.as_str()];

        for (pos, &row) in partition.rows.iter().enumerate() {
            let vector = &mut out[row];
            let amount = records[row].amount;

            vector.user_avg_amount = stats.avg;
            vector.user_std_amount = stats.std;
            vector.user_max_amount = stats.max;
            vector.user_txn_frequency = stats.freq;
            vector.deviation_from_avg = (amount - stats.avg).abs();
            vector.amount_to_max_ratio = amount / zero_guard(stats.max);

            vector.intl_ratio = ratios.intl_ratio;
            vector.user_high_risk_txn_ratio = ratios.user_high_risk_txn_ratio;
            vector.geo_anomaly_flag = ratios.geo_anomaly_flag;

            vector.num_accounts = customer.num_accounts;
            vector.user_multiple_accounts_flag = customer.user_multiple_accounts_flag;
            vector.cross_account_transfer_ratio = customer.cross_account_transfer_ratio;

            vector.is_new_beneficiary = block.is_new_beneficiary[pos];
            vector.beneficiary_txn_count_30d = block.beneficiary_txn_count_30d[pos];

            vector.time_since_last = block.time_since_last[pos];
            vector.recent_burst = block.recent_burst[pos];
            vector.last_txn_time = block.last_txn_time[pos];
            vector.txn_count_30s = block.txn_count_30s[pos];
            vector.txn_count_10min = block.txn_count_10min[pos];
            vector.txn_count_1hour = block.txn_count_1hour[pos];
            vector.rolling_std = block.rolling_std[pos];
            vector.transaction_velocity = block.transaction_velocity[pos];

            vector.hourly_total = block.hourly_total[pos];
            vector.hourly_count = block.hourly_count[pos];
            vector.daily_total = block.daily_total[pos];
            vector.daily_count = block.daily_count[pos];
            vector.weekly_total = block.weekly_total[pos];
            vector.weekly_txn_count = block.weekly_txn_count[pos];
            vector.weekly_avg_amount = block.weekly_avg_amount[pos];
            vector.weekly_deviation = block.weekly_deviation[pos];
            vector.amount_vs_weekly_avg = block.amount_vs_weekly_avg[pos];
            vector.current_month_spending = block.current_month_spending[pos];
            vector.monthly_txn_count = block.monthly_txn_count[pos];
            vector.monthly_avg_amount = block.monthly_avg_amount[pos];
            vector.monthly_deviation = block.monthly_deviation[pos];
            vector.amount_vs_monthly_avg = block.amount_vs_monthly_avg[pos];
        }
    }

    if !inputs.set.ungrouped.is_empty() {
        let dataset = dataset_stats(records);
        log::debug!(
            "{} row(s) outside any partition take dataset-wide fallbacks",
            inputs.set.ungrouped.len()
        );
        for &row in &inputs.set.ungrouped {
            apply_dataset_fallbacks(&mut out[row], records[row].amount, &dataset);
        }
    }

    out
}

/// The fallback block for a row no partition can claim: dataset statistics
/// for the user family, neutral constants for everything partition-derived.
fn apply_dataset_fallbacks(vector: &mut FeatureVector, amount: f64, dataset: &DatasetStats) {
    vector.user_avg_amount = dataset.avg;
    vector.user_std_amount = dataset.std;
    vector.user_max_amount = dataset.max;
    vector.user_txn_frequency = dataset.count;
    vector.deviation_from_avg = 0.0;
    vector.amount_to_max_ratio = 0.0;

    vector.intl_ratio = 0.0;
    vector.user_high_risk_txn_ratio = 0.0;
    vector.geo_anomaly_flag = 0;

    vector.num_accounts = 1;
    vector.user_multiple_accounts_flag = 0;
    vector.cross_account_transfer_ratio = 0.0;

    vector.is_new_beneficiary = 0;
    vector.beneficiary_txn_count_30d = 1;

    vector.time_since_last = crate::causal_window::FIRST_GAP_SECONDS;
    vector.recent_burst = 0;
    vector.last_txn_time = None;
    vector.txn_count_30s = 1;
    vector.txn_count_10min = 1;
    vector.txn_count_1hour = 1;
    vector.rolling_std = 0.0;
    vector.transaction_velocity = 0.0;

    vector.hourly_total = amount;
    vector.hourly_count = 1;
    vector.daily_total = amount;
    vector.daily_count = 1;
    vector.weekly_total = amount;
    vector.weekly_txn_count = 1;
    vector.weekly_avg_amount = amount;
    vector.weekly_deviation = 0.0;
    vector.amount_vs_weekly_avg = 1.0;
    vector.current_month_spending = amount;
    vector.monthly_txn_count = 1;
    vector.monthly_avg_amount = amount;
    vector.monthly_deviation = 0.0;
    vector.amount_vs_monthly_avg = 1.0;
}
