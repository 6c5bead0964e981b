//! Shared primitive types used across the entire feature pass.

/// Original input position of a row. Row identity — every join resolves
/// back to this index.
pub type RowIdx = usize;

/// Customer identifier as it appears in the input.
pub type CustomerId = String;

/// Account identifier as it appears in the input.
pub type AccountId = String;
