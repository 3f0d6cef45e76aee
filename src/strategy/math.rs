// src/strategy/math.rs

/// Bounded multiplicative correction factor.
///
/// Returns `1 + bound * (2 / (1 + exp(-2 * slope * (x - 1) / bound)) - 1)`,
/// a tanh-shaped curve through `(1, 1)` with slope `slope` at that point,
/// approaching `1 - bound` and `1 + bound` at the extremes.
/// A zero `bound` disables the correction.
///
/// Used both to scale sales targets by price deviation and to nudge prices
/// by how far sales fell short of the target.
pub fn sigmoid(x: f64, slope: f64, bound: f64) -> f64 {
    if bound == 0.0 || x == 1.0 {
        return 1.0;
    }
    1.0 + bound * (2.0 / (1.0 + (-2.0 * slope * (x - 1.0) / bound).exp()) - 1.0)
}

/// Natural log of `x`, or `default` when `x` is not positive.
pub fn ln_or(x: f64, default: f64) -> f64 {
    if x > 0.0 {
        x.ln()
    } else {
        default
    }
}

/// Rounds a price to whole cents.
pub fn round_price(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}
