//! Small numeric helpers shared by the aggregation stages.

/// Arithmetic mean; 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n − 1 denominator); 0 with fewer than two
/// samples, so a lone transaction never yields NaN.
pub fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (n - 1) as f64;
    var.sqrt()
}

/// A denominator of exactly 0 is substituted with 1 so ratio columns never
/// go NaN or infinite.
pub fn zero_guard(denom: f64) -> f64 {
    if denom == 0.0 {
        1.0
    } else {
        denom
    }
}

/// Maximum; 0 for an empty slice.
pub fn max(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}
