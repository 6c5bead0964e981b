//! Input record model and the schema capability descriptor.
//!
//! RULES:
//!   - Every optional input column is an explicit nullable field.
//!   - Components branch on `Schema` flags, never on ad hoc per-row probing.
//!   - A parse failure never raises: malformed timestamps become None,
//!     non-numeric amounts become 0.0.

use crate::types::{AccountId, CustomerId};
use chrono::NaiveDateTime;

// ── Input column names ───────────────────────────────────────────────────────

pub const COL_TIMESTAMP: &str = "CreateDate";
pub const COL_AMOUNT: &str = "AmountInAed";
pub const COL_TRANSFER_TYPE: &str = "TransferType";
pub const COL_CHANNEL: &str = "ChannelId";
pub const COL_CUSTOMER: &str = "CustomerId";
pub const COL_ACCOUNT: &str = "FromAccountNo";
pub const COL_COUNTERPARTY: &str = "ReceipentAccount";
pub const COL_COUNTRY: &str = "BankCountry";

/// One parsed transfer record. Row identity is the record's position in the
/// input slice; it is never stored on the record itself.
#[derive(Debug, Clone, Default)]
pub struct TransactionRecord {
    pub customer_id: Option<CustomerId>,
    pub account_id: Option<AccountId>,
    /// Coerced amount; 0.0 when the cell was missing or non-numeric.
    pub amount: f64,
    pub transfer_type: Option<String>,
    pub channel_id: Option<String>,
    pub timestamp: Option<NaiveDateTime>,
    pub counterparty: Option<String>,
    pub bank_country: Option<String>,
}

impl TransactionRecord {
    /// True when the row can join an account partition.
    pub fn has_grouping_key(&self) -> bool {
        self.customer_id.is_some() && self.account_id.is_some()
    }
}

// ── Schema capability descriptor ─────────────────────────────────────────────

/// Which optional columns the input actually carries. Computed once from the
/// CSV header and threaded through every component; each absent flag routes
/// the whole feature family for that column to its documented fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct Schema {
    pub has_timestamp: bool,
    pub has_amount: bool,
    pub has_transfer_type: bool,
    pub has_channel: bool,
    pub has_customer: bool,
    pub has_account: bool,
    pub has_counterparty: bool,
    pub has_country: bool,
}

impl Schema {
    /// Build from a CSV header row.
    pub fn from_headers<S: AsRef<str>>(headers: &[S]) -> Self {
        let has = |name: &str| headers.iter().any(|h| h.as_ref() == name);
        Self {
            has_timestamp: has(COL_TIMESTAMP),
            has_amount: has(COL_AMOUNT),
            has_transfer_type: has(COL_TRANSFER_TYPE),
            has_channel: has(COL_CHANNEL),
            has_customer: has(COL_CUSTOMER),
            has_account: has(COL_ACCOUNT),
            has_counterparty: has(COL_COUNTERPARTY),
            has_country: has(COL_COUNTRY),
        }
    }

    /// Schema with every column present. Used by tests and by callers that
    /// build records programmatically.
    pub fn full() -> Self {
        Self {
            has_timestamp: true,
            has_amount: true,
            has_transfer_type: true,
            has_channel: true,
            has_customer: true,
            has_account: true,
            has_counterparty: true,
            has_country: true,
        }
    }

    /// Account-level grouping requires both key columns.
    pub fn grouped(&self) -> bool {
        self.has_customer && self.has_account
    }

    /// Beneficiary tracking requires a counterparty and a time axis.
    pub fn tracks_beneficiaries(&self) -> bool {
        self.has_counterparty && self.has_timestamp
    }
}

// ── Cell coercion ────────────────────────────────────────────────────────────

/// Accepted timestamp layouts, tried in order.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parse a timestamp cell; any failure becomes None.
pub fn parse_timestamp(cell: &str) -> Option<NaiveDateTime> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    for fmt in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(cell, fmt) {
            return Some(ts);
        }
    }
    // Date-only cells land at midnight.
    chrono::NaiveDate::parse_from_str(cell, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Coerce an amount cell; digit-grouping commas are tolerated, anything
/// unparseable becomes 0.0.
pub fn parse_amount(cell: &str) -> f64 {
    let cleaned = cell.trim().replace(',', "");
    cleaned.parse::<f64>().unwrap_or(0.0)
}

/// An empty or whitespace-only cell is a missing value.
pub fn non_empty(cell: &str) -> Option<String> {
    let cell = cell.trim();
    if cell.is_empty() {
        None
    } else {
        Some(cell.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_timestamp_is_none() {
        assert!(parse_timestamp("not a date").is_none());
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("2024-13-40 99:00:00").is_none());
    }

    #[test]
    fn timestamp_layouts_accepted() {
        assert!(parse_timestamp("2024-03-01 08:30:00").is_some());
        assert!(parse_timestamp("2024-03-01T08:30:00").is_some());
        assert!(parse_timestamp("2024-03-01 08:30:00.250").is_some());
        let midnight = parse_timestamp("2024-03-01").unwrap();
        assert_eq!(midnight.format("%H:%M:%S").to_string(), "00:00:00");
    }

    #[test]
    fn amount_coercion_is_total() {
        assert_eq!(parse_amount("1,250.75"), 1250.75);
        assert_eq!(parse_amount("  42 "), 42.0);
        assert_eq!(parse_amount("n/a"), 0.0);
        assert_eq!(parse_amount(""), 0.0);
    }

    #[test]
    fn schema_flags_follow_headers() {
        let schema = Schema::from_headers(&["CreateDate", "AmountInAed", "CustomerId"]);
        assert!(schema.has_timestamp);
        assert!(schema.has_amount);
        assert!(schema.has_customer);
        assert!(!schema.has_account);
        assert!(!schema.grouped());
        assert!(!schema.tracks_beneficiaries());
    }
}
