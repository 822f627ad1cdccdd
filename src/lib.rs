//! Trans-dimensional Bayesian curve fitting of noisy 1-D data.
//!
//! The sampler treats the number of piecewise partitions describing the data
//! as a random variable and explores it jointly with the per-partition
//! parameters using reversible-jump MCMC. See [`regression_part1d_zero`] for
//! the most common entry point and [`ChainDriver`] for incremental control.

pub(crate) mod accept;
pub(crate) mod aggregate;
pub(crate) mod chain;
pub(crate) mod dataset;
pub(crate) mod error;
pub(crate) mod likelihood;
pub(crate) mod model;
pub(crate) mod prior;
pub(crate) mod proposal;
pub(crate) mod sampler;
pub(crate) mod spline;
pub(crate) mod state;

pub use aggregate::{ResultAggregator, ResultSet, ResultSetFm};
pub use chain::{ChainDriver, Phase, Progress, SampleView};
pub use dataset::{Dataset, NoiseSpec};
pub use error::ConfigError;
pub use model::{ForwardModel, LocalModel, NoForwardModel};
pub use proposal::{MoveKind, MoveWeights, StepSizes};
pub use sampler::{
    forwardmodel_part1d, regression_part1d, regression_part1d_natural, regression_part1d_sampled,
    regression_part1d_zero, regression_single1d, regression_single1d_sampled, sample_parallel,
    Settings,
};
pub use state::PartitionState;
