//! riskfeat-core — fraud-risk feature derivation for transfer records.
//!
//! Takes a cleaned transaction log and computes the per-transaction,
//! per-account, and per-customer signals a downstream risk-scoring model
//! consumes: causal rolling-window counts, calendar-bucket aggregates,
//! beneficiary novelty, and cross-account spread, joined back onto the
//! original row order with deterministic fallbacks wherever an optional
//! column is absent.

pub mod assembler;
pub mod beneficiary;
pub mod calendar_bucket;
pub mod causal_window;
pub mod config;
pub mod cross_account;
pub mod engine;
pub mod error;
pub mod features;
pub mod io;
pub mod partition;
pub mod record;
pub mod stage;
pub mod stats;
pub mod types;
