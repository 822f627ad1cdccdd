//! Candidate state transitions and their Green-ratio bookkeeping.
//!
//! Every move reports the candidate state together with the log prior-density
//! ratio and the log proposal-density ratio (reverse over forward) that the
//! acceptance rule multiplies into the reversible-jump ratio. The birth
//! scheme draws the new partition's parameters directly from the value prior
//! and keeps the parent's parameters on the left half; death is the exact
//! mirror image. The parameter transformation is the identity, so the
//! Jacobian is 1 and never appears explicitly.

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::error::ConfigError;
use crate::prior::Prior;
use crate::state::PartitionState;

/// The move families of the trans-dimensional sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    /// Insert a boundary, splitting a partition.
    Birth,
    /// Remove a boundary, merging two partitions.
    Death,
    /// Shift one boundary position.
    Move,
    /// Perturb one local parameter.
    Value,
    /// Perturb the global noise scale in log-space.
    Noise,
}

impl MoveKind {
    pub const ALL: [MoveKind; 5] = [
        MoveKind::Birth,
        MoveKind::Death,
        MoveKind::Move,
        MoveKind::Value,
        MoveKind::Noise,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            MoveKind::Birth => 0,
            MoveKind::Death => 1,
            MoveKind::Move => 2,
            MoveKind::Value => 3,
            MoveKind::Noise => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MoveKind::Birth => "birth",
            MoveKind::Death => "death",
            MoveKind::Move => "move",
            MoveKind::Value => "value",
            MoveKind::Noise => "noise",
        }
    }
}

/// Relative selection weights per move family. Normalized at engine
/// construction; the noise weight is dropped when the noise scale is fixed.
#[derive(Debug, Clone, Copy)]
pub struct MoveWeights {
    pub birth: f64,
    pub death: f64,
    pub shift: f64,
    pub value: f64,
    pub noise: f64,
}

impl Default for MoveWeights {
    fn default() -> Self {
        MoveWeights {
            birth: 1.0,
            death: 1.0,
            shift: 1.0,
            value: 1.0,
            noise: 0.5,
        }
    }
}

impl MoveWeights {
    fn as_array(&self) -> [f64; 5] {
        [self.birth, self.death, self.shift, self.value, self.noise]
    }
}

/// Random-walk step scales.
///
/// `boundary` and `value` are fractions of the x-span and of the parameter's
/// prior range respectively, `noise` is an absolute step in log units.
#[derive(Debug, Clone, Copy)]
pub struct StepSizes {
    pub boundary: f64,
    pub value: f64,
    pub noise: f64,
}

impl Default for StepSizes {
    fn default() -> Self {
        StepSizes {
            boundary: 0.05,
            value: 0.1,
            noise: 0.1,
        }
    }
}

/// One candidate transition, consumed within a single chain iteration.
#[derive(Debug, Clone)]
pub(crate) enum Proposal {
    /// A scoreable candidate with its Green-ratio factors.
    Candidate {
        kind: MoveKind,
        state: PartitionState,
        log_prior_ratio: f64,
        log_proposal_ratio: f64,
    },
    /// The move is impossible at the current dimension (birth at `k_max`,
    /// death or shift at k = 0, noise move with fixed noise). Counted as
    /// proposed-and-rejected before scoring.
    Bounded(MoveKind),
    /// The candidate fell outside the prior support; automatic rejection.
    Invalid(MoveKind),
}

/// Generates candidate transitions from the current state.
#[derive(Debug)]
pub(crate) struct ProposalEngine {
    prior: Prior,
    cum_weights: [f64; 5],
    log_weights: [f64; 5],
    steps: StepSizes,
}

impl ProposalEngine {
    pub(crate) fn new(
        prior: Prior,
        weights: MoveWeights,
        steps: StepSizes,
        infer_noise: bool,
    ) -> Result<Self, ConfigError> {
        if !(steps.boundary.is_finite() && steps.boundary > 0.0)
            || !(steps.value.is_finite() && steps.value > 0.0)
            || !(steps.noise.is_finite() && steps.noise > 0.0)
        {
            return Err(ConfigError::InvalidStepSize);
        }
        let mut raw = weights.as_array();
        if raw.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::InvalidMoveWeights);
        }
        if !infer_noise {
            raw[MoveKind::Noise.index()] = 0.0;
        }
        let total: f64 = raw.iter().sum();
        if total <= 0.0 {
            return Err(ConfigError::InvalidMoveWeights);
        }

        let mut cum_weights = [0.0; 5];
        let mut acc = 0.0;
        for (cum, w) in cum_weights.iter_mut().zip(raw.iter()) {
            acc += w / total;
            *cum = acc;
        }
        cum_weights[4] = 1.0;
        let log_weights = raw.map(|w| (w / total).ln());

        Ok(ProposalEngine {
            prior,
            cum_weights,
            log_weights,
            steps,
        })
    }

    pub(crate) fn prior(&self) -> &Prior {
        &self.prior
    }

    /// One candidate transition. Move selection is itself random, weighted
    /// by the configured move probabilities.
    pub(crate) fn propose<R: Rng + ?Sized>(
        &self,
        state: &PartitionState,
        rng: &mut R,
    ) -> Proposal {
        let kind = self.pick_kind(rng);
        match kind {
            MoveKind::Birth => self.birth(state, rng),
            MoveKind::Death => self.death(state, rng),
            MoveKind::Move => self.shift(state, rng),
            MoveKind::Value => self.value(state, rng),
            MoveKind::Noise => self.noise(state, rng),
        }
    }

    fn pick_kind<R: Rng + ?Sized>(&self, rng: &mut R) -> MoveKind {
        let u: f64 = rng.random();
        for kind in MoveKind::ALL {
            if u < self.cum_weights[kind.index()] {
                return kind;
            }
        }
        MoveKind::Noise
    }

    fn birth<R: Rng + ?Sized>(&self, state: &PartitionState, rng: &mut R) -> Proposal {
        let k = state.num_boundaries();
        if k >= self.prior.k_max() {
            return Proposal::Bounded(MoveKind::Birth);
        }
        let pos = rng.random_range(self.prior.x_lo()..self.prior.x_hi());
        if state.boundaries().contains(&pos) {
            return Proposal::Invalid(MoveKind::Birth);
        }
        let params = self.prior.draw_params(rng);
        let candidate = state.with_birth(pos, params);

        // Forward: pick birth, position uniform on the span, parameters from
        // the prior. Reverse: pick death, pick one of k + 1 boundaries.
        let log_forward = self.log_weights[MoveKind::Birth.index()]
            - self.prior.x_span().ln()
            - self.prior.log_value_span();
        let log_reverse =
            self.log_weights[MoveKind::Death.index()] - ((k + 1) as f64).ln();

        Proposal::Candidate {
            kind: MoveKind::Birth,
            state: candidate,
            log_prior_ratio: self.prior.log_birth_ratio(k),
            log_proposal_ratio: log_reverse - log_forward,
        }
    }

    fn death<R: Rng + ?Sized>(&self, state: &PartitionState, rng: &mut R) -> Proposal {
        let k = state.num_boundaries();
        if k == 0 {
            return Proposal::Bounded(MoveKind::Death);
        }
        let j = rng.random_range(0..k);
        let candidate = state.with_death(j);

        let log_forward = self.log_weights[MoveKind::Death.index()] - (k as f64).ln();
        let log_reverse = self.log_weights[MoveKind::Birth.index()]
            - self.prior.x_span().ln()
            - self.prior.log_value_span();

        Proposal::Candidate {
            kind: MoveKind::Death,
            state: candidate,
            log_prior_ratio: self.prior.log_death_ratio(k),
            log_proposal_ratio: log_reverse - log_forward,
        }
    }

    fn shift<R: Rng + ?Sized>(&self, state: &PartitionState, rng: &mut R) -> Proposal {
        let k = state.num_boundaries();
        if k == 0 {
            return Proposal::Bounded(MoveKind::Move);
        }
        let j = rng.random_range(0..k);
        let z: f64 = StandardNormal.sample(rng);
        let pos = state.boundaries()[j] + z * self.steps.boundary * self.prior.x_span();

        let lo = if j == 0 {
            self.prior.x_lo()
        } else {
            state.boundaries()[j - 1]
        };
        let hi = if j == k - 1 {
            self.prior.x_hi()
        } else {
            state.boundaries()[j + 1]
        };
        // A step that leaves the neighbouring interval has zero prior
        // density; clipping it instead would break detailed balance.
        if !(pos > lo && pos < hi) {
            return Proposal::Invalid(MoveKind::Move);
        }

        Proposal::Candidate {
            kind: MoveKind::Move,
            state: state.with_moved_boundary(j, pos),
            log_prior_ratio: 0.0,
            log_proposal_ratio: 0.0,
        }
    }

    fn value<R: Rng + ?Sized>(&self, state: &PartitionState, rng: &mut R) -> Proposal {
        let part = rng.random_range(0..state.num_partitions());
        let params = state.params(part);
        let idx = rng.random_range(0..params.len());
        let (lo, hi) = self.prior.value_range(idx);
        let z: f64 = StandardNormal.sample(rng);
        let value = params[idx] + z * self.steps.value * (hi - lo);
        let candidate = state.with_value(part, idx, value);
        if !self.prior.params_in_support(candidate.params(part)) {
            return Proposal::Invalid(MoveKind::Value);
        }

        Proposal::Candidate {
            kind: MoveKind::Value,
            state: candidate,
            log_prior_ratio: 0.0,
            log_proposal_ratio: 0.0,
        }
    }

    fn noise<R: Rng + ?Sized>(&self, state: &PartitionState, rng: &mut R) -> Proposal {
        let Some(sigma) = state.noise() else {
            return Proposal::Bounded(MoveKind::Noise);
        };
        let z: f64 = StandardNormal.sample(rng);
        let log_new = sigma.ln() + z * self.steps.noise;
        let new = log_new.exp();
        if !self.prior.noise_in_support(new) {
            return Proposal::Invalid(MoveKind::Noise);
        }

        // Symmetric walk in log sigma: the proposal density over sigma gains
        // a 1/sigma' factor, the log-uniform prior a matching sigma/sigma'.
        Proposal::Candidate {
            kind: MoveKind::Noise,
            state: state.with_noise(new),
            log_prior_ratio: sigma.ln() - log_new,
            log_proposal_ratio: log_new - sigma.ln(),
        }
    }
}
