//! Numeric helpers shared by every stage.
//!
//! All pipeline values are probabilities/intensities, so the helpers here
//! saturate rather than reject: out-of-range input clamps, non-finite input
//! falls back to a neutral value.

use crate::atom::TracePart;

/// Guard against NaN and Infinity.
/// If the value is not finite, replace it with the provided fallback.
#[inline]
pub fn sanitize_f64(v: f64, fallback: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        tracing::warn!("NaN/Inf detected in atom value, using fallback {}", fallback);
        fallback
    }
}

/// Clamp to [0, 1]. NaN saturates to 0.
#[inline]
pub fn clamp01(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Probabilistic OR: `1 − Π(1 − vᵢ)`.
///
/// Independent risks compound instead of averaging. Inputs are clamped to
/// [0, 1] first, so the result is monotone in every argument.
/// `noisy_or([]) == 0`, `noisy_or([1]) == 1`.
pub fn noisy_or<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let miss: f64 = values.into_iter().map(|v| 1.0 - clamp01(v)).product();
    clamp01(1.0 - miss)
}

/// Linear mix of named, weighted parts.
///
/// The same parts feed both the value and the atom trace, so the trace can
/// never disagree with the number it explains.
#[derive(Debug, Clone, Default)]
pub struct WeightedMix {
    parts: Vec<TracePart>,
}

impl WeightedMix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn part(mut self, name: impl Into<String>, value: f64, weight: f64) -> Self {
        self.parts.push(TracePart::weighted(name, value, weight));
        self
    }

    /// Weighted sum, unclamped.
    pub fn raw(&self) -> f64 {
        self.parts
            .iter()
            .map(|p| p.value * p.weight.unwrap_or(1.0))
            .sum()
    }

    /// Weighted sum clamped to [0, 1].
    pub fn value(&self) -> f64 {
        clamp01(self.raw())
    }

    pub fn parts(&self) -> &[TracePart] {
        &self.parts
    }

    pub fn into_parts(self) -> Vec<TracePart> {
        self.parts
    }
}
