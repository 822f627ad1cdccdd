use thiserror::Error;

/// Errors raised while validating a dataset or sampler configuration.
///
/// These are the only fatal errors in the crate: they surface before any
/// chain iteration runs. Numerical problems during sampling (non-finite
/// predictions, likelihood overflow, candidates outside the prior support)
/// are handled by rejecting the offending candidate and never propagate.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("dataset must contain at least one point")]
    EmptyDataset,
    #[error("dataset contains a non-finite value at index {0}")]
    NonFiniteData(usize),
    #[error("dataset x-range is degenerate (all x values are equal)")]
    DegenerateRange,
    #[error("noise scale must be positive and finite")]
    InvalidNoise,
    #[error("per-point noise length {got} does not match dataset length {want}")]
    NoiseLengthMismatch { got: usize, want: usize },
    #[error("noise prior range is empty, non-positive or non-finite")]
    InvalidNoiseRange,
    #[error("number of sampling iterations must be at least 1")]
    ZeroSamples,
    #[error("thinning interval must be at least 1")]
    ZeroThinning,
    #[error("maximum partition count must be at least 1")]
    ZeroPartitions,
    #[error("at least two query locations are required")]
    TooFewQueryLocations,
    #[error("at least one chain is required")]
    ZeroChains,
    #[error("at least two histogram bins are required")]
    TooFewBins,
    #[error("credible level must lie strictly between 0 and 1")]
    InvalidCredibleLevel,
    #[error("proposal step sizes must be positive and finite")]
    InvalidStepSize,
    #[error("move weights must be non-negative with a positive sum")]
    InvalidMoveWeights,
    #[error("natural spline order must be at least 1")]
    InvalidSplineOrder,
    #[error("value prior range is empty or non-finite")]
    InvalidValueRange,
    #[error("forward model must have at least one parameter")]
    EmptyParamVector,
    #[error("forward model parameter range {0} is empty or non-finite")]
    InvalidParamRange(usize),
    #[error("could not find a starting state with finite likelihood after {0} attempts")]
    InitFailed(usize),
}
