//! Session configuration and one-shot sampling entry points.
//!
//! The free functions mirror the classic partition-regression surface:
//! single-partition and partitioned fits with built-in local models, a
//! forward-model variant, and `_sampled` variants that additionally hand
//! every retained sample to a caller-supplied callback. Multi-chain runs
//! use one ChaCha stream per chain derived from the session seed, so a
//! configuration and seed pin down the result exactly.

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::aggregate::{ResultAggregator, ResultSet, ResultSetFm};
use crate::chain::{ChainDriver, SampleView};
use crate::dataset::Dataset;
use crate::error::ConfigError;
use crate::model::{ForwardModel, LocalModel, NoForwardModel};
use crate::proposal::{MoveWeights, StepSizes};

/// Session configuration for one sampling run.
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    /// Iterations applied before any recording starts.
    pub burnin: u64,
    /// Recorded iterations after burn-in.
    pub samples: u64,
    /// Record every `thin`-th sampling iteration.
    pub thin: u64,
    /// Maximum number of partitions (at least 1); bounds the boundary count
    /// at `max_partitions - 1`.
    pub max_partitions: usize,
    /// Relative move-selection probabilities.
    pub weights: MoveWeights,
    /// Random-walk step scales.
    pub steps: StepSizes,
    /// Override for the uniform value prior; derived from the data y-range
    /// when `None`.
    pub value_range: Option<(f64, f64)>,
    /// Number of query x-locations for curve reconstruction.
    pub num_query: usize,
    /// Histogram bins per query location for credible intervals.
    pub num_value_bins: usize,
    /// Central credible mass, e.g. 0.95 for a 2.5%-97.5% interval.
    pub credible: f64,
    pub seed: u64,
    pub num_chains: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            burnin: 10_000,
            samples: 50_000,
            thin: 1,
            max_partitions: 20,
            weights: MoveWeights::default(),
            steps: StepSizes::default(),
            value_range: None,
            num_query: 100,
            num_value_bins: 200,
            credible: 0.95,
            seed: 0,
            num_chains: 1,
        }
    }
}

impl Settings {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.samples == 0 {
            return Err(ConfigError::ZeroSamples);
        }
        if self.thin == 0 {
            return Err(ConfigError::ZeroThinning);
        }
        if self.max_partitions == 0 {
            return Err(ConfigError::ZeroPartitions);
        }
        if self.num_query < 2 {
            return Err(ConfigError::TooFewQueryLocations);
        }
        if self.num_value_bins < 2 {
            return Err(ConfigError::TooFewBins);
        }
        if !(self.credible > 0.0 && self.credible < 1.0) {
            return Err(ConfigError::InvalidCredibleLevel);
        }
        if self.num_chains == 0 {
            return Err(ConfigError::ZeroChains);
        }
        Ok(())
    }
}

fn chain_rng(seed: u64, chain: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(chain);
    rng
}

/// Run `settings.num_chains` independent chains in parallel and merge their
/// streaming statistics before finalization. Each chain gets its own random
/// stream; the merged result is deterministic for a fixed seed.
pub fn sample_parallel<F: ForwardModel>(
    data: &Dataset,
    model: &LocalModel<F>,
    settings: &Settings,
) -> Result<ResultSet> {
    settings.validate()?;
    let aggregators: Vec<Result<ResultAggregator, ConfigError>> = (0..settings.num_chains)
        .into_par_iter()
        .map(|chain| {
            let rng = chain_rng(settings.seed, chain as u64);
            ChainDriver::new(data, model, settings, rng).map(ChainDriver::run_to_aggregator)
        })
        .collect();

    let mut merged: Option<ResultAggregator> = None;
    for aggregator in aggregators {
        let aggregator = aggregator.context("chain failed to start")?;
        merged = Some(match merged {
            None => aggregator,
            Some(acc) => acc.merge(aggregator),
        });
    }
    let merged = merged.context("no chains configured")?;
    Ok(merged.finalize(settings.credible))
}

/// Partitioned regression with an explicit local-model family.
pub fn regression_part1d(data: &Dataset, model: &LocalModel, settings: &Settings) -> Result<ResultSet> {
    sample_parallel(data, model, settings)
}

/// Partitioned regression with zero-order (piecewise-constant) partitions.
pub fn regression_part1d_zero(data: &Dataset, settings: &Settings) -> Result<ResultSet> {
    let model: LocalModel = LocalModel::ZeroOrder;
    sample_parallel(data, &model, settings)
}

/// Partitioned regression with natural-cubic-spline partitions of the given
/// order (`order + 1` control points per partition).
pub fn regression_part1d_natural(
    data: &Dataset,
    order: usize,
    settings: &Settings,
) -> Result<ResultSet> {
    if order < 1 {
        return Err(ConfigError::InvalidSplineOrder.into());
    }
    let model: LocalModel = LocalModel::NaturalSpline { order };
    sample_parallel(data, &model, settings)
}

/// Single-partition fit: the partition count is pinned to one, so only the
/// local parameters and (optionally) the noise scale are sampled.
pub fn regression_single1d(data: &Dataset, settings: &Settings) -> Result<ResultSet> {
    let settings = Settings {
        max_partitions: 1,
        ..*settings
    };
    let model: LocalModel = LocalModel::ZeroOrder;
    sample_parallel(data, &model, &settings)
}

/// Partitioned regression over a caller-supplied forward model.
pub fn forwardmodel_part1d<F: ForwardModel>(
    data: &Dataset,
    model: F,
    settings: &Settings,
) -> Result<ResultSetFm> {
    sample_parallel(data, &LocalModel::Forward(model), settings)
}

/// Like [`regression_part1d`], additionally invoking `on_sample` for every
/// retained sample. Callback variants run a single chain so the callback
/// observes the chain in iteration order.
pub fn regression_part1d_sampled(
    data: &Dataset,
    model: &LocalModel,
    settings: &Settings,
    on_sample: impl FnMut(&SampleView<'_, NoForwardModel>),
) -> Result<ResultSet> {
    let rng = chain_rng(settings.seed, 0);
    let driver = ChainDriver::new(data, model, settings, rng)?;
    Ok(driver.run_with(on_sample))
}

/// Single-partition variant of [`regression_part1d_sampled`].
pub fn regression_single1d_sampled(
    data: &Dataset,
    settings: &Settings,
    on_sample: impl FnMut(&SampleView<'_, NoForwardModel>),
) -> Result<ResultSet> {
    let settings = Settings {
        max_partitions: 1,
        ..*settings
    };
    regression_part1d_sampled(data, &LocalModel::ZeroOrder, &settings, on_sample)
}
