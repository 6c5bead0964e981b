//! Cross-account analysis — the customer-level reduction.
//!
//! Runs after every per-partition stage has completed (the phase barrier):
//! a customer's statistics span all of that customer's account partitions.
//! Partition-level risk ratios live here too because they derive from the
//! static transfer-type encodings, not from the causal stages.

use crate::partition::PartitionSet;
use crate::record::{Schema, TransactionRecord};
use crate::types::RowIdx;
use std::collections::HashSet;

/// Customer-level statistics, broadcast to every row of the customer.
#[derive(Debug, Clone)]
pub struct CustomerStats {
    pub num_accounts: u64,
    pub user_multiple_accounts_flag: u8,
    pub cross_account_transfer_ratio: f64,
}

/// Partition-level ratios, broadcast to every row of the partition.
#[derive(Debug, Clone)]
pub struct PartitionRatios {
    pub geo_anomaly_flag: u8,
    pub intl_ratio: f64,
    pub user_high_risk_txn_ratio: f64,
}

/// Distinct bank countries above this count flag a geographic anomaly.
const GEO_ANOMALY_COUNTRY_COUNT: usize = 2;

/// Per-partition ratio block. `flags` and `risks` are full-input row-indexed
/// slices of the static encodings.
pub fn partition_ratios(
    schema: &Schema,
    records: &[TransactionRecord],
    rows: &[RowIdx],
    flags: &[u8],
    risks: &[f64],
) -> PartitionRatios {
    let n = rows.len().max(1) as f64;

    let geo_anomaly_flag = if schema.has_country {
        let countries: HashSet<&str> = rows
            .iter()
            .filter_map(|&r| records[r].bank_country.as_deref())
            .collect();
        u8::from(countries.len() > GEO_ANOMALY_COUNTRY_COUNT)
    } else {
        0
    };

    let intl_ratio = if schema.has_transfer_type {
        rows.iter().map(|&r| f64::from(flags[r])).sum::<f64>() / n
    } else {
        0.0
    };

    let user_high_risk_txn_ratio = rows.iter().map(|&r| risks[r]).sum::<f64>() / n;

    PartitionRatios {
        geo_anomaly_flag,
        intl_ratio,
        user_high_risk_txn_ratio,
    }
}

/// Customer-level statistics over all of the customer's partitions.
/// `partition_indices` addresses `set.partitions`.
pub fn customer_stats(
    set: &PartitionSet,
    records: &[TransactionRecord],
    partition_indices: &[usize],
) -> CustomerStats {
    let accounts: HashSet<&str> = partition_indices
        .iter()
        .map(|&p| set.partitions[p].key.1.as_str())
        .collect();
    let num_accounts = accounts.len() as u64;

    // The customer's first transaction: earliest timestamp across all of
    // their partitions, missing timestamps last, original index tie-break.
    let mut all_rows: Vec<RowIdx> = partition_indices
        .iter()
        .flat_map(|&p| set.partitions[p].rows.iter().copied())
        .collect();
    all_rows.sort_by(|&a, &b| {
        match (records[a].timestamp, records[b].timestamp) {
            (Some(x), Some(y)) => x.cmp(&y).then(a.cmp(&b)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.cmp(&b),
        }
    });

    let cross_account_transfer_ratio = match all_rows.split_first() {
        Some((&first, rest)) if !rest.is_empty() => {
            let first_account = records[first].account_id.as_deref();
            let moved = rest
                .iter()
                .filter(|&&r| records[r].account_id.as_deref() != first_account)
                .count();
            moved as f64 / all_rows.len() as f64
        }
        // A single transaction cannot cross accounts.
        _ => 0.0,
    };

    CustomerStats {
        num_accounts,
        user_multiple_accounts_flag: u8::from(num_accounts > 1),
        cross_account_transfer_ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::partition_records;
    use crate::record::parse_timestamp;

    fn txn(customer: &str, account: &str, ts: &str, country: Option<&str>) -> TransactionRecord {
        TransactionRecord {
            customer_id: Some(customer.to_string()),
            account_id: Some(account.to_string()),
            amount: 10.0,
            timestamp: parse_timestamp(ts),
            bank_country: country.map(str::to_string),
            ..Default::default()
        }
    }

    /// Spec scenario: accounts A (3 rows) and B (1 row), B's row last.
    #[test]
    fn cross_account_ratio_b_not_first() {
        let records = vec![
            txn("c1", "A", "2024-01-01 00:00:00", None),
            txn("c1", "A", "2024-01-02 00:00:00", None),
            txn("c1", "A", "2024-01-03 00:00:00", None),
            txn("c1", "B", "2024-01-04 00:00:00", None),
        ];
        let set = partition_records(&Schema::full(), &records);
        let groups = set.customer_groups();
        let stats = customer_stats(&set, &records, &groups["c1"]);
        assert_eq!(stats.num_accounts, 2);
        assert_eq!(stats.user_multiple_accounts_flag, 1);
        assert_eq!(stats.cross_account_transfer_ratio, 0.25);
    }

    /// Same accounts, but B's transaction comes first in time: the other
    /// three rows all differ from the first account.
    #[test]
    fn cross_account_ratio_b_first() {
        let records = vec![
            txn("c1", "A", "2024-01-02 00:00:00", None),
            txn("c1", "A", "2024-01-03 00:00:00", None),
            txn("c1", "A", "2024-01-04 00:00:00", None),
            txn("c1", "B", "2024-01-01 00:00:00", None),
        ];
        let set = partition_records(&Schema::full(), &records);
        let groups = set.customer_groups();
        let stats = customer_stats(&set, &records, &groups["c1"]);
        assert_eq!(stats.cross_account_transfer_ratio, 0.75);
    }

    #[test]
    fn single_transaction_ratio_is_zero() {
        let records = vec![txn("c1", "A", "2024-01-01 00:00:00", None)];
        let set = partition_records(&Schema::full(), &records);
        let groups = set.customer_groups();
        let stats = customer_stats(&set, &records, &groups["c1"]);
        assert_eq!(stats.num_accounts, 1);
        assert_eq!(stats.user_multiple_accounts_flag, 0);
        assert_eq!(stats.cross_account_transfer_ratio, 0.0);
    }

    /// Three distinct countries trip the geo anomaly; two do not.
    #[test]
    fn geo_anomaly_needs_more_than_two_countries() {
        let schema = Schema::full();
        let records = vec![
            txn("c1", "A", "2024-01-01 00:00:00", Some("AE")),
            txn("c1", "A", "2024-01-02 00:00:00", Some("GB")),
            txn("c1", "A", "2024-01-03 00:00:00", Some("AE")),
        ];
        let set = partition_records(&schema, &records);
        let rows = &set.partitions[0].rows;
        let flags = vec![0u8; records.len()];
        let risks = vec![0.5; records.len()];
        let two = partition_ratios(&schema, &records, rows, &flags, &risks);
        assert_eq!(two.geo_anomaly_flag, 0);

        let records = vec![
            txn("c1", "A", "2024-01-01 00:00:00", Some("AE")),
            txn("c1", "A", "2024-01-02 00:00:00", Some("GB")),
            txn("c1", "A", "2024-01-03 00:00:00", Some("US")),
        ];
        let set = partition_records(&schema, &records);
        let rows = &set.partitions[0].rows;
        let three = partition_ratios(&schema, &records, rows, &flags, &risks);
        assert_eq!(three.geo_anomaly_flag, 1);
    }

    /// Without the country column the flag is always 0.
    #[test]
    fn geo_anomaly_requires_country_column() {
        let schema = Schema {
            has_country: false,
            ..Schema::full()
        };
        let records = vec![
            txn("c1", "A", "2024-01-01 00:00:00", Some("AE")),
            txn("c1", "A", "2024-01-02 00:00:00", Some("GB")),
            txn("c1", "A", "2024-01-03 00:00:00", Some("US")),
        ];
        let set = partition_records(&schema, &records);
        let rows = &set.partitions[0].rows;
        let ratios = partition_ratios(&schema, &records, rows, &[0, 0, 0], &[0.5, 0.5, 0.5]);
        assert_eq!(ratios.geo_anomaly_flag, 0);
    }

    /// Partition means of the static flag and risk columns.
    #[test]
    fn risk_ratios_are_partition_means() {
        let schema = Schema::full();
        let records = vec![
            txn("c1", "A", "2024-01-01 00:00:00", None),
            txn("c1", "A", "2024-01-02 00:00:00", None),
            txn("c1", "A", "2024-01-03 00:00:00", None),
            txn("c1", "A", "2024-01-04 00:00:00", None),
        ];
        let set = partition_records(&schema, &records);
        let rows = &set.partitions[0].rows;
        let flags = vec![1, 0, 0, 1];
        let risks = vec![0.9, 0.5, 0.5, 0.9];
        let ratios = partition_ratios(&schema, &records, rows, &flags, &risks);
        assert_eq!(ratios.intl_ratio, 0.5);
        assert!((ratios.user_high_risk_txn_ratio - 0.7).abs() < 1e-12);
    }
}
