use bigdecimal::BigDecimal;
use num_traits::{FromPrimitive, ToPrimitive, Zero};

/// Decimal places kept on amounts produced by the engine.
pub const AMOUNT_SCALE: i64 = 2;

/// Convert an amount to `f64` for ratio arithmetic
pub fn to_f64(value: &BigDecimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Convert a computed amount back to a decimal, rounded to currency precision.
/// Non-finite and negative inputs collapse to zero.
pub fn amount_from_f64(value: f64) -> BigDecimal {
    if !value.is_finite() || value <= 0.0 {
        return BigDecimal::zero();
    }
    BigDecimal::from_f64(value)
        .map(|v| v.round(AMOUNT_SCALE))
        .unwrap_or_else(BigDecimal::zero)
}

/// Like `amount_from_f64` but truncates, so the result never exceeds `value`.
pub fn amount_floor_from_f64(value: f64) -> BigDecimal {
    if !value.is_finite() || value <= 0.0 {
        return BigDecimal::zero();
    }
    BigDecimal::from_f64(value)
        .map(|v| v.with_scale(AMOUNT_SCALE))
        .unwrap_or_else(BigDecimal::zero)
}

/// Arithmetic mean, `None` for an empty series
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Weighted mean of `values`. Returns `None` when the weights do not sum to a
/// positive number, so callers never divide by zero.
pub fn weighted_mean(values: &[f64], weights: &[f64]) -> Option<f64> {
    if values.len() != weights.len() || values.is_empty() {
        return None;
    }

    let total_weight: f64 = weights.iter().sum();
    if !(total_weight > 0.0) || !total_weight.is_finite() {
        return None;
    }

    let weighted: f64 = values.iter().zip(weights).map(|(v, w)| v * w).sum();
    Some(weighted / total_weight)
}

/// Clamp a score into `[0, 100]`
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}
