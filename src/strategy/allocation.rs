// src/strategy/allocation.rs

/// Desired sales for one shop together with the range it must stay in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetRange {
    pub target: f64,
    pub min_bound: f64,
    pub max_bound: f64,
}

impl TargetRange {
    pub fn new(target: f64, min_bound: f64, max_bound: f64) -> Self {
        Self {
            target,
            min_bound,
            max_bound,
        }
    }

    /// Units this shop gets when every target is scaled by `factor`.
    fn share(&self, factor: f64) -> u64 {
        let value = (factor * self.target).max(self.min_bound).min(self.max_bound);
        if value > 0.0 {
            value as u64
        } else {
            0
        }
    }
}

/// Sum of truncated, clamped shares at a given scaling factor.
/// Non-decreasing in `factor`.
fn total(targets: &[TargetRange], factor: f64) -> u64 {
    targets.iter().map(|t| t.share(factor)).sum()
}

/// Splits `quantity` units across shops.
///
/// Looks for a single multiplier applied to every target so that the clamped
/// shares add up to `quantity`. When even the lower bounds exceed the supply,
/// the lower bounds are scaled down proportionally instead. When the supply
/// covers every upper bound, each shop gets its upper bound.
///
/// The result is index-aligned with `targets`.
pub fn allocate(targets: &[TargetRange], quantity: u64) -> Vec<u64> {
    if targets.is_empty() {
        return Vec::new();
    }

    let mut factor0 = 0.0;
    let mut total0 = total(targets, factor0);
    if total0 >= quantity {
        if total0 == 0 {
            return vec![0; targets.len()];
        }
        let scale = quantity as f64 / total0 as f64;
        return targets
            .iter()
            .map(|t| (t.min_bound * scale).max(0.0) as u64)
            .collect();
    }

    let mut factor1 = targets
        .iter()
        .map(|t| t.max_bound / t.target)
        .filter(|f| f.is_finite())
        .fold(0.0, f64::max);
    let mut total1 = total(targets, factor1);
    if total1 <= quantity {
        return targets.iter().map(|t| t.max_bound.max(0.0) as u64).collect();
    }

    while total0 < total1 {
        let factor = (factor0 + factor1) / 2.0;
        if factor == factor0 || factor == factor1 {
            break;
        }
        let current = total(targets, factor);
        if current < quantity {
            factor0 = factor;
            total0 = current;
        } else {
            factor1 = factor;
            total1 = current;
        }
    }

    let error0 = total0.abs_diff(quantity);
    let error1 = total1.abs_diff(quantity);
    let factor = if error0 <= error1 { factor0 } else { factor1 };
    targets.iter().map(|t| t.share(factor)).collect()
}
