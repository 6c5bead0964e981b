//! The derived feature columns — one `FeatureVector` per input row, emitted
//! in the input's original order.

use chrono::NaiveDateTime;

/// Canonical output column names, in emission order. The writer appends
/// these after the pass-through input columns.
pub const FEATURE_COLUMNS: [&str; 45] = [
    "transaction_amount",
    "flag_amount",
    "transfer_type_encoded",
    "transfer_type_risk",
    "channel_encoded",
    "hour",
    "day_of_week",
    "is_weekend",
    "is_night",
    "user_avg_amount",
    "user_std_amount",
    "user_max_amount",
    "user_txn_frequency",
    "deviation_from_avg",
    "amount_to_max_ratio",
    "intl_ratio",
    "user_high_risk_txn_ratio",
    "num_accounts",
    "user_multiple_accounts_flag",
    "cross_account_transfer_ratio",
    "geo_anomaly_flag",
    "is_new_beneficiary",
    "beneficiary_txn_count_30d",
    "time_since_last",
    "recent_burst",
    "last_txn_time",
    "txn_count_30s",
    "txn_count_10min",
    "txn_count_1hour",
    "hourly_total",
    "hourly_count",
    "daily_total",
    "daily_count",
    "weekly_total",
    "weekly_txn_count",
    "weekly_avg_amount",
    "weekly_deviation",
    "amount_vs_weekly_avg",
    "current_month_spending",
    "monthly_txn_count",
    "monthly_avg_amount",
    "monthly_deviation",
    "amount_vs_monthly_avg",
    "rolling_std",
    "transaction_velocity",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureVector {
    pub transaction_amount: f64,
    pub flag_amount: u8,
    pub transfer_type_encoded: i64,
    pub transfer_type_risk: f64,
    pub channel_encoded: i64,
    pub hour: u32,
    pub day_of_week: u32,
    pub is_weekend: u8,
    pub is_night: u8,
    pub user_avg_amount: f64,
    pub user_std_amount: f64,
    pub user_max_amount: f64,
    pub user_txn_frequency: u64,
    pub deviation_from_avg: f64,
    pub amount_to_max_ratio: f64,
    pub intl_ratio: f64,
    pub user_high_risk_txn_ratio: f64,
    pub num_accounts: u64,
    pub user_multiple_accounts_flag: u8,
    pub cross_account_transfer_ratio: f64,
    pub geo_anomaly_flag: u8,
    pub is_new_beneficiary: u8,
    pub beneficiary_txn_count_30d: u64,
    pub time_since_last: f64,
    pub recent_burst: u8,
    pub last_txn_time: Option<NaiveDateTime>,
    pub txn_count_30s: u64,
    pub txn_count_10min: u64,
    pub txn_count_1hour: u64,
    pub hourly_total: f64,
    pub hourly_count: u64,
    pub daily_total: f64,
    pub daily_count: u64,
    pub weekly_total: f64,
    pub weekly_txn_count: u64,
    pub weekly_avg_amount: f64,
    pub weekly_deviation: f64,
    pub amount_vs_weekly_avg: f64,
    pub current_month_spending: f64,
    pub monthly_txn_count: u64,
    pub monthly_avg_amount: f64,
    pub monthly_deviation: f64,
    pub amount_vs_monthly_avg: f64,
    pub rolling_std: f64,
    pub transaction_velocity: f64,
}

impl FeatureVector {
    /// Render the feature cells in FEATURE_COLUMNS order.
    pub fn cells(&self) -> Vec<String> {
        vec![
            fmt_f64(self.transaction_amount),
            self.flag_amount.to_string(),
            self.transfer_type_encoded.to_string(),
            fmt_f64(self.transfer_type_risk),
            self.channel_encoded.to_string(),
            self.hour.to_string(),
            self.day_of_week.to_string(),
            self.is_weekend.to_string(),
            self.is_night.to_string(),
            fmt_f64(self.user_avg_amount),
            fmt_f64(self.user_std_amount),
            fmt_f64(self.user_max_amount),
            self.user_txn_frequency.to_string(),
            fmt_f64(self.deviation_from_avg),
            fmt_f64(self.amount_to_max_ratio),
            fmt_f64(self.intl_ratio),
            fmt_f64(self.user_high_risk_txn_ratio),
            self.num_accounts.to_string(),
            self.user_multiple_accounts_flag.to_string(),
            fmt_f64(self.cross_account_transfer_ratio),
            self.geo_anomaly_flag.to_string(),
            self.is_new_beneficiary.to_string(),
            self.beneficiary_txn_count_30d.to_string(),
            fmt_f64(self.time_since_last),
            self.recent_burst.to_string(),
            self.last_txn_time
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
            self.txn_count_30s.to_string(),
            self.txn_count_10min.to_string(),
            self.txn_count_1hour.to_string(),
            fmt_f64(self.hourly_total),
            self.hourly_count.to_string(),
            fmt_f64(self.daily_total),
            self.daily_count.to_string(),
            fmt_f64(self.weekly_total),
            self.weekly_txn_count.to_string(),
            fmt_f64(self.weekly_avg_amount),
            fmt_f64(self.weekly_deviation),
            fmt_f64(self.amount_vs_weekly_avg),
            fmt_f64(self.current_month_spending),
            self.monthly_txn_count.to_string(),
            fmt_f64(self.monthly_avg_amount),
            fmt_f64(self.monthly_deviation),
            fmt_f64(self.amount_vs_monthly_avg),
            fmt_f64(self.rolling_std),
            fmt_f64(self.transaction_velocity),
        ]
    }

    /// Every ratio/amount column, for the division-safety audit.
    pub fn float_values(&self) -> Vec<f64> {
        vec![
            self.transaction_amount,
            self.transfer_type_risk,
            self.user_avg_amount,
            self.user_std_amount,
            self.user_max_amount,
            self.deviation_from_avg,
            self.amount_to_max_ratio,
            self.intl_ratio,
            self.user_high_risk_txn_ratio,
            self.cross_account_transfer_ratio,
            self.time_since_last,
            self.hourly_total,
            self.daily_total,
            self.weekly_total,
            self.weekly_avg_amount,
            self.weekly_deviation,
            self.amount_vs_weekly_avg,
            self.current_month_spending,
            self.monthly_avg_amount,
            self.monthly_deviation,
            self.amount_vs_monthly_avg,
            self.rolling_std,
            self.transaction_velocity,
        ]
    }
}

/// Integral floats print without a trailing `.0` churn; everything else in
/// full precision.
fn fmt_f64(v: f64) -> String {
    if v == v.trunc() && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_count_matches_column_count() {
        let vector = FeatureVector::default();
        assert_eq!(vector.cells().len(), FEATURE_COLUMNS.len());
    }

    #[test]
    fn integral_floats_render_clean() {
        assert_eq!(fmt_f64(3600.0), "3600");
        assert_eq!(fmt_f64(0.25), "0.25");
        assert_eq!(fmt_f64(0.0), "0");
    }
}
