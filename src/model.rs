//! Per-partition predictors.
//!
//! Every partition of a [`PartitionState`] owns one local parameter vector;
//! the local model family decides how that vector maps to a predicted y.
//! The family is a closed set: a stored constant, a natural cubic spline
//! through control points, or a caller-supplied forward function.

use crate::spline::eval_natural_spline;
use crate::state::PartitionState;

/// A caller-supplied predictor for one partition.
///
/// The engine never inspects the function body. Returning `None` (or a
/// non-finite value) marks the candidate as invalid; the chain rejects it
/// and continues, so user-code failures cannot abort a run.
pub trait ForwardModel: Send + Sync {
    /// Length of the per-partition parameter vector.
    fn param_count(&self) -> usize;

    /// Uniform prior range for parameter `index`.
    fn param_range(&self, index: usize) -> (f64, f64);

    /// Predicted y for the given parameter vector at `x`.
    fn evaluate(&self, params: &[f64], x: f64) -> Option<f64>;
}

/// Placeholder forward model for chains that only use built-in families.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoForwardModel;

impl ForwardModel for NoForwardModel {
    fn param_count(&self) -> usize {
        0
    }

    fn param_range(&self, _index: usize) -> (f64, f64) {
        (0.0, 0.0)
    }

    fn evaluate(&self, _params: &[f64], _x: f64) -> Option<f64> {
        None
    }
}

/// The local-model family used for every partition of a chain.
#[derive(Debug, Clone)]
pub enum LocalModel<F = NoForwardModel> {
    /// Each partition predicts its stored constant.
    ZeroOrder,
    /// Each partition carries `order + 1` control points, evaluated as a
    /// natural cubic spline over the partition interval.
    NaturalSpline { order: usize },
    /// Prediction delegates to a user function.
    Forward(F),
}

impl<F: ForwardModel> LocalModel<F> {
    /// Parameters per partition for this family.
    pub(crate) fn param_count(&self) -> usize {
        match self {
            LocalModel::ZeroOrder => 1,
            LocalModel::NaturalSpline { order } => order + 1,
            LocalModel::Forward(f) => f.param_count(),
        }
    }

    /// Predict y at `x`: locate the containing partition by binary search
    /// and evaluate its local model. `None` means the prediction is invalid
    /// and the candidate state must be rejected.
    pub(crate) fn predict(
        &self,
        state: &PartitionState,
        x_range: (f64, f64),
        x: f64,
    ) -> Option<f64> {
        let i = state.partition_index(x);
        let params = state.params(i);
        let value = match self {
            LocalModel::ZeroOrder => params[0],
            LocalModel::NaturalSpline { .. } => {
                let (lo, hi) = state.partition_span(i, x_range);
                eval_natural_spline(params, lo, hi, x)
            }
            LocalModel::Forward(f) => f.evaluate(params, x)?,
        };
        value.is_finite().then_some(value)
    }
}
