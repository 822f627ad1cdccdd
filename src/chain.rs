//! The sequential chain driver.
//!
//! One driver owns one Markov chain: the current [`PartitionState`], its
//! random stream, and the streaming [`ResultAggregator`]. Each iteration
//! asks the proposal engine for a candidate, scores it through the
//! likelihood and the reversible-jump acceptance rule, and folds retained
//! samples into the aggregator. Independent chains are run on separate
//! drivers and merged at the end.

use std::sync::atomic::{AtomicBool, Ordering};

use rand::Rng;

use crate::accept::accept;
use crate::aggregate::{ResultAggregator, ResultSet};
use crate::dataset::{Dataset, NoiseSpec};
use crate::error::ConfigError;
use crate::likelihood::log_likelihood;
use crate::model::{ForwardModel, LocalModel};
use crate::prior::Prior;
use crate::proposal::{MoveKind, Proposal, ProposalEngine};
use crate::sampler::Settings;
use crate::state::PartitionState;

const INIT_RETRIES: usize = 500;

/// Chain life cycle: burn-in updates the state without recording, sampling
/// records every thinning-th iteration, finished chains only finalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Burning,
    Sampling,
    Finished,
}

/// Diagnostic snapshot returned by every iteration.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Progress {
    pub iteration: u64,
    pub phase: Phase,
    pub kind: MoveKind,
    pub accepted: bool,
    pub num_boundaries: usize,
    pub log_likelihood: f64,
}

/// Read-only view of one retained sample, handed to `run_with` callbacks.
pub struct SampleView<'a, F: ForwardModel> {
    model: &'a LocalModel<F>,
    state: &'a PartitionState,
    x_range: (f64, f64),
    log_likelihood: f64,
}

impl<'a, F: ForwardModel> SampleView<'a, F> {
    pub fn state(&self) -> &PartitionState {
        self.state
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// Evaluate the sample's predicted curve at `x`.
    pub fn predict(&self, x: f64) -> Option<f64> {
        self.model.predict(self.state, self.x_range, x)
    }
}

#[derive(Debug)]
pub struct ChainDriver<'a, F: ForwardModel, R: Rng> {
    data: &'a Dataset,
    model: &'a LocalModel<F>,
    engine: ProposalEngine,
    state: PartitionState,
    log_lik: f64,
    aggregator: ResultAggregator,
    burnin: u64,
    total: u64,
    thin: u64,
    credible: f64,
    iteration: u64,
    rng: R,
}

impl<'a, F: ForwardModel, R: Rng> ChainDriver<'a, F, R> {
    pub fn new(
        data: &'a Dataset,
        model: &'a LocalModel<F>,
        settings: &Settings,
        mut rng: R,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;

        let (y_lo, y_hi) = data.y_range();
        let pad = if y_hi > y_lo { y_hi - y_lo } else { 1.0 };
        let band = settings.value_range.unwrap_or((y_lo - pad, y_hi + pad));
        if !band.0.is_finite() || !band.1.is_finite() || band.1 <= band.0 {
            return Err(ConfigError::InvalidValueRange);
        }

        let value_ranges: Box<[(f64, f64)]> = match model {
            LocalModel::Forward(f) => (0..f.param_count()).map(|i| f.param_range(i)).collect(),
            _ => vec![band; model.param_count()].into(),
        };
        let noise_range = match data.noise() {
            NoiseSpec::Inferred { min, max, .. } => Some((*min, *max)),
            _ => None,
        };
        let prior = Prior::new(
            data.x_range(),
            settings.max_partitions - 1,
            value_ranges,
            noise_range,
        )?;
        let engine = ProposalEngine::new(
            prior,
            settings.weights,
            settings.steps,
            data.infers_noise(),
        )?;

        let noise = match data.noise() {
            NoiseSpec::Inferred { initial, .. } => Some(*initial),
            _ => None,
        };
        // The prior midpoint is a deterministic start; forward models may be
        // invalid there, so fall back to bounded prior draws.
        let mut state = PartitionState::single(engine.prior().mid_params(), noise);
        let mut log_lik = log_likelihood(model, &state, data);
        let mut attempts = 0;
        while log_lik.is_none() {
            if attempts >= INIT_RETRIES {
                return Err(ConfigError::InitFailed(INIT_RETRIES));
            }
            state = PartitionState::single(engine.prior().draw_params(&mut rng), noise);
            log_lik = log_likelihood(model, &state, data);
            attempts += 1;
        }
        let log_lik = log_lik.ok_or(ConfigError::InitFailed(INIT_RETRIES))?;

        let aggregator = ResultAggregator::new(
            data.x_range(),
            settings.num_query,
            settings.num_value_bins,
            band,
            settings.max_partitions - 1,
        );

        Ok(ChainDriver {
            data,
            model,
            engine,
            state,
            log_lik,
            aggregator,
            burnin: settings.burnin,
            total: settings.burnin + settings.samples,
            thin: settings.thin,
            credible: settings.credible,
            iteration: 0,
            rng,
        })
    }

    pub fn phase(&self) -> Phase {
        if self.iteration >= self.total {
            Phase::Finished
        } else if self.iteration < self.burnin {
            Phase::Burning
        } else {
            Phase::Sampling
        }
    }

    pub fn state(&self) -> &PartitionState {
        &self.state
    }

    /// Run one iteration; `None` once the iteration budget is exhausted.
    pub fn step(&mut self) -> Option<Progress> {
        self.advance(&mut |_| {})
    }

    fn advance(&mut self, on_sample: &mut dyn FnMut(&SampleView<'_, F>)) -> Option<Progress> {
        if self.iteration >= self.total {
            return None;
        }
        let sampling = self.iteration >= self.burnin;
        let x_range = self.data.x_range();

        let (kind, accepted) = match self.engine.propose(&self.state, &mut self.rng) {
            Proposal::Bounded(kind) | Proposal::Invalid(kind) => (kind, false),
            Proposal::Candidate {
                kind,
                state: candidate,
                log_prior_ratio,
                log_proposal_ratio,
            } => {
                // Per-iteration numerical issues reject the candidate and
                // never abort the chain.
                if !candidate.ordered_within(x_range) {
                    (kind, false)
                } else {
                    match log_likelihood(self.model, &candidate, self.data) {
                        None => (kind, false),
                        Some(cand_lik) => {
                            let ok = accept(
                                cand_lik - self.log_lik,
                                log_prior_ratio,
                                log_proposal_ratio,
                                &mut self.rng,
                            );
                            if ok {
                                self.state = candidate;
                                self.log_lik = cand_lik;
                            }
                            (kind, ok)
                        }
                    }
                }
            }
        };

        // Acceptance diagnostics describe the stationary phase only.
        if sampling {
            self.aggregator.record_move(kind, accepted);
        }
        self.iteration += 1;
        if sampling && (self.iteration - self.burnin) % self.thin == 0 {
            self.aggregator.record_sample(self.model, &self.state, x_range);
            on_sample(&SampleView {
                model: self.model,
                state: &self.state,
                x_range,
                log_likelihood: self.log_lik,
            });
        }

        Some(Progress {
            iteration: self.iteration,
            phase: self.phase(),
            kind,
            accepted,
            num_boundaries: self.state.num_boundaries(),
            log_likelihood: self.log_lik,
        })
    }

    /// Run the full iteration budget and finalize.
    pub fn run(mut self) -> ResultSet {
        while self.step().is_some() {}
        self.finish()
    }

    /// Like [`run`](Self::run), invoking `on_sample` for every retained
    /// sample.
    pub fn run_with(mut self, mut on_sample: impl FnMut(&SampleView<'_, F>)) -> ResultSet {
        while self.advance(&mut on_sample).is_some() {}
        self.finish()
    }

    /// Run until the budget is exhausted or `stop` becomes true. The flag is
    /// checked only at iteration boundaries, so the returned summary is
    /// always internally consistent.
    pub fn run_until_stopped(mut self, stop: &AtomicBool) -> ResultSet {
        while !stop.load(Ordering::Relaxed) && self.step().is_some() {}
        self.finish()
    }

    fn finish(self) -> ResultSet {
        self.aggregator.finalize(self.credible)
    }

    /// The raw streaming statistics, for merging independent chains before
    /// finalization.
    pub fn run_to_aggregator(mut self) -> ResultAggregator {
        while self.step().is_some() {}
        self.aggregator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn flat_data() -> Dataset {
        let points: Vec<(f64, f64)> = (0..20)
            .map(|i| {
                let x = i as f64 / 19.0;
                (x, if i % 2 == 0 { 0.1 } else { -0.1 })
            })
            .collect();
        Dataset::new(points, NoiseSpec::Fixed(0.5)).unwrap()
    }

    fn quick_settings() -> Settings {
        Settings {
            burnin: 200,
            samples: 800,
            max_partitions: 4,
            num_query: 11,
            ..Settings::default()
        }
    }

    #[test]
    fn phases_advance_in_order() {
        let data = flat_data();
        let model: LocalModel = LocalModel::ZeroOrder;
        let settings = quick_settings();
        let mut driver =
            ChainDriver::new(&data, &model, &settings, SmallRng::seed_from_u64(0)).unwrap();

        assert_eq!(driver.phase(), Phase::Burning);
        for _ in 0..200 {
            driver.step().unwrap();
        }
        assert_eq!(driver.phase(), Phase::Sampling);
        while driver.step().is_some() {}
        assert_eq!(driver.phase(), Phase::Finished);
        assert!(driver.step().is_none());
    }

    #[test]
    fn boundary_count_stays_bounded() {
        let data = flat_data();
        let model: LocalModel = LocalModel::ZeroOrder;
        let settings = quick_settings();
        let mut driver =
            ChainDriver::new(&data, &model, &settings, SmallRng::seed_from_u64(3)).unwrap();
        while let Some(progress) = driver.step() {
            assert!(progress.num_boundaries <= 3);
            assert!(driver.state().ordered_within(data.x_range()));
        }
    }

    #[test]
    fn same_seed_gives_identical_results() {
        let data = flat_data();
        let model: LocalModel = LocalModel::ZeroOrder;
        let settings = quick_settings();
        let a = ChainDriver::new(&data, &model, &settings, SmallRng::seed_from_u64(9))
            .unwrap()
            .run();
        let b = ChainDriver::new(&data, &model, &settings, SmallRng::seed_from_u64(9))
            .unwrap()
            .run();
        assert_eq!(a, b);
    }

    #[test]
    fn stop_flag_finalizes_early() {
        let data = flat_data();
        let model: LocalModel = LocalModel::ZeroOrder;
        let settings = quick_settings();
        let driver =
            ChainDriver::new(&data, &model, &settings, SmallRng::seed_from_u64(1)).unwrap();
        let stop = AtomicBool::new(true);
        let result = driver.run_until_stopped(&stop);
        assert_eq!(result.samples(), 0);
    }

    #[test]
    fn callback_sees_every_retained_sample() {
        let data = flat_data();
        let model: LocalModel = LocalModel::ZeroOrder;
        let mut settings = quick_settings();
        settings.thin = 4;
        let driver =
            ChainDriver::new(&data, &model, &settings, SmallRng::seed_from_u64(5)).unwrap();
        let mut seen = 0u64;
        let result = driver.run_with(|sample| {
            seen += 1;
            assert!(sample.predict(0.5).is_some());
            assert!(sample.log_likelihood().is_finite());
        });
        assert_eq!(seen, 200);
        assert_eq!(result.samples(), 200);
    }

    #[test]
    fn invalid_settings_are_fatal() {
        let data = flat_data();
        let model: LocalModel = LocalModel::ZeroOrder;
        let mut settings = quick_settings();
        settings.max_partitions = 0;
        let err = ChainDriver::new(&data, &model, &settings, SmallRng::seed_from_u64(0))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroPartitions));
    }
}
