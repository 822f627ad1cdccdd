//! The recognized parametric prior over partition models.
//!
//! The prior factorizes as: uniform partition count on `0..=k_max`,
//! ordered-uniform boundary positions on the data x-range, an independent
//! uniform prior per local parameter, and a log-uniform prior on the noise
//! scale when it is inferred. The uniform K prior contributes nothing to
//! the birth/death ratios and is left implicit below.

use rand::Rng;

use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub(crate) struct Prior {
    x_lo: f64,
    x_hi: f64,
    k_max: usize,
    value_ranges: Box<[(f64, f64)]>,
    noise_range: Option<(f64, f64)>,
}

impl Prior {
    pub(crate) fn new(
        x_range: (f64, f64),
        k_max: usize,
        value_ranges: Box<[(f64, f64)]>,
        noise_range: Option<(f64, f64)>,
    ) -> Result<Self, ConfigError> {
        if value_ranges.is_empty() {
            return Err(ConfigError::EmptyParamVector);
        }
        for (i, &(lo, hi)) in value_ranges.iter().enumerate() {
            if !lo.is_finite() || !hi.is_finite() || hi <= lo {
                return Err(ConfigError::InvalidParamRange(i));
            }
        }
        Ok(Prior {
            x_lo: x_range.0,
            x_hi: x_range.1,
            k_max,
            value_ranges,
            noise_range,
        })
    }

    pub(crate) fn x_lo(&self) -> f64 {
        self.x_lo
    }

    pub(crate) fn x_hi(&self) -> f64 {
        self.x_hi
    }

    pub(crate) fn x_span(&self) -> f64 {
        self.x_hi - self.x_lo
    }

    /// Maximum number of interior boundaries.
    pub(crate) fn k_max(&self) -> usize {
        self.k_max
    }

    /// Sum of the log widths of all per-parameter value ranges.
    pub(crate) fn log_value_span(&self) -> f64 {
        self.value_ranges.iter().map(|(lo, hi)| (hi - lo).ln()).sum()
    }

    /// Log prior-density ratio for a birth from k to k + 1 boundaries.
    ///
    /// Ordered-uniform boundaries have density `k! / span^k`, so adding one
    /// contributes `ln(k + 1) - ln span`; the freshly drawn parameter vector
    /// contributes `-ln Δv` per parameter.
    pub(crate) fn log_birth_ratio(&self, k: usize) -> f64 {
        ((k + 1) as f64).ln() - self.x_span().ln() - self.log_value_span()
    }

    /// Log prior-density ratio for a death from k to k - 1 boundaries.
    /// Exactly the negative of the matching birth ratio.
    pub(crate) fn log_death_ratio(&self, k: usize) -> f64 {
        -self.log_birth_ratio(k - 1)
    }

    pub(crate) fn value_range(&self, index: usize) -> (f64, f64) {
        self.value_ranges[index]
    }

    pub(crate) fn params_in_support(&self, params: &[f64]) -> bool {
        params
            .iter()
            .zip(self.value_ranges.iter())
            .all(|(&v, &(lo, hi))| v >= lo && v <= hi)
    }

    pub(crate) fn noise_in_support(&self, s: f64) -> bool {
        match self.noise_range {
            Some((lo, hi)) => s >= lo && s <= hi,
            None => false,
        }
    }

    /// Midpoint of every value range; the deterministic starting vector.
    pub(crate) fn mid_params(&self) -> Box<[f64]> {
        self.value_ranges
            .iter()
            .map(|(lo, hi)| 0.5 * (lo + hi))
            .collect()
    }

    /// Draw a full parameter vector from the value prior.
    pub(crate) fn draw_params<R: Rng + ?Sized>(&self, rng: &mut R) -> Box<[f64]> {
        self.value_ranges
            .iter()
            .map(|&(lo, hi)| rng.random_range(lo..hi))
            .collect()
    }
}
