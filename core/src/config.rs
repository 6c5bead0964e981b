//! Externally supplied static encodings: transfer-type lookup tables.
//!
//! The tables map transfer-type codes (uppercased) to an encoded integer and
//! a risk weight in [0, 1]. They are a configuration resource owned by the
//! caller — the engine never derives them from data.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Encoded value for a code missing from the table.
pub const UNMAPPED_ENCODED: i64 = 0;
/// Risk weight for a code missing from the table.
pub const UNMAPPED_RISK: f64 = 0.5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Transfer-type code → encoded integer.
    pub transfer_type_encoded: HashMap<String, i64>,
    /// Transfer-type code → risk weight in [0, 1].
    pub transfer_type_risk: HashMap<String, f64>,
    /// The code whose presence sets `flag_amount`.
    #[serde(default = "default_suspicious_code")]
    pub suspicious_code: String,
}

fn default_suspicious_code() -> String {
    "S".to_string()
}

impl RiskConfig {
    /// Load the lookup tables from a JSON file.
    /// In tests, use RiskConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let mut config: RiskConfig = serde_json::from_str(&content)?;
        config.normalize();
        Ok(config)
    }

    /// Tables with hardcoded defaults for use in unit tests and as the
    /// runner fallback when no config file is given.
    pub fn default_test() -> Self {
        let mut config = Self {
            transfer_type_encoded: [("S", 1), ("I", 2), ("D", 3), ("L", 4)]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            transfer_type_risk: [("S", 0.9), ("I", 0.7), ("D", 0.2), ("L", 0.4)]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            suspicious_code: default_suspicious_code(),
        };
        config.normalize();
        config
    }

    /// Uppercase all keys and clamp risk weights into [0, 1].
    fn normalize(&mut self) {
        let encoded = std::mem::take(&mut self.transfer_type_encoded);
        self.transfer_type_encoded = encoded
            .into_iter()
            .map(|(k, v)| (k.to_uppercase(), v))
            .collect();
        let risk = std::mem::take(&mut self.transfer_type_risk);
        self.transfer_type_risk = risk
            .into_iter()
            .map(|(k, v)| (k.to_uppercase(), v.clamp(0.0, 1.0)))
            .collect();
        self.suspicious_code = self.suspicious_code.to_uppercase();
    }

    /// Encoded integer for a (possibly missing) transfer-type cell.
    pub fn encode(&self, transfer_type: Option<&str>) -> i64 {
        transfer_type
            .and_then(|t| self.transfer_type_encoded.get(&t.to_uppercase()))
            .copied()
            .unwrap_or(UNMAPPED_ENCODED)
    }

    /// Risk weight for a (possibly missing) transfer-type cell.
    pub fn risk(&self, transfer_type: Option<&str>) -> f64 {
        transfer_type
            .and_then(|t| self.transfer_type_risk.get(&t.to_uppercase()))
            .copied()
            .unwrap_or(UNMAPPED_RISK)
    }

    /// 1 iff the cell matches the suspicious code, case-insensitively.
    pub fn suspicious_flag(&self, transfer_type: Option<&str>) -> u8 {
        match transfer_type {
            Some(t) if t.to_uppercase() == self.suspicious_code => 1,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_code_gets_defaults() {
        let config = RiskConfig::default_test();
        assert_eq!(config.encode(Some("ZZZ")), UNMAPPED_ENCODED);
        assert_eq!(config.risk(Some("ZZZ")), UNMAPPED_RISK);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let config = RiskConfig::default_test();
        assert_eq!(config.encode(Some("s")), config.encode(Some("S")));
        assert_eq!(config.suspicious_flag(Some("s")), 1);
        assert_eq!(config.suspicious_flag(Some("D")), 0);
        assert_eq!(config.suspicious_flag(None), 0);
    }

    #[test]
    fn risk_weights_clamped_on_load() {
        let raw = r#"{
            "transfer_type_encoded": {"x": 9},
            "transfer_type_risk": {"x": 7.5}
        }"#;
        let mut config: RiskConfig = serde_json::from_str(raw).unwrap();
        config.normalize();
        assert_eq!(config.risk(Some("X")), 1.0);
        assert_eq!(config.suspicious_code, "S");
    }
}
