use crate::error::ConfigError;

/// How the observation noise scale is specified.
#[derive(Debug, Clone)]
pub enum NoiseSpec {
    /// One known standard deviation shared by every point.
    Fixed(f64),
    /// A known standard deviation per point.
    PerPoint(Vec<f64>),
    /// The noise scale is unknown and sampled alongside the model, with a
    /// log-uniform prior on `[min, max]` and the given starting value.
    Inferred { initial: f64, min: f64, max: f64 },
}

/// Immutable container of observed 1-D points.
///
/// Construction validates the data once; afterwards the dataset is read-only
/// input for the lifetime of a sampling session. The x values do not need to
/// be sorted and duplicates are allowed.
#[derive(Debug, Clone)]
pub struct Dataset {
    x: Vec<f64>,
    y: Vec<f64>,
    noise: NoiseSpec,
    x_range: (f64, f64),
    y_range: (f64, f64),
}

impl Dataset {
    pub fn new(
        points: impl IntoIterator<Item = (f64, f64)>,
        noise: NoiseSpec,
    ) -> Result<Self, ConfigError> {
        let (x, y): (Vec<f64>, Vec<f64>) = points.into_iter().unzip();
        if x.is_empty() {
            return Err(ConfigError::EmptyDataset);
        }
        for (i, (&xi, &yi)) in x.iter().zip(y.iter()).enumerate() {
            if !xi.is_finite() || !yi.is_finite() {
                return Err(ConfigError::NonFiniteData(i));
            }
        }
        match &noise {
            NoiseSpec::Fixed(s) => {
                if !s.is_finite() || *s <= 0.0 {
                    return Err(ConfigError::InvalidNoise);
                }
            }
            NoiseSpec::PerPoint(sigmas) => {
                if sigmas.len() != x.len() {
                    return Err(ConfigError::NoiseLengthMismatch {
                        got: sigmas.len(),
                        want: x.len(),
                    });
                }
                if sigmas.iter().any(|s| !s.is_finite() || *s <= 0.0) {
                    return Err(ConfigError::InvalidNoise);
                }
            }
            NoiseSpec::Inferred { initial, min, max } => {
                if !min.is_finite() || !max.is_finite() || *min <= 0.0 || *max <= *min {
                    return Err(ConfigError::InvalidNoiseRange);
                }
                if !initial.is_finite() || *initial < *min || *initial > *max {
                    return Err(ConfigError::InvalidNoise);
                }
            }
        }

        let x_range = min_max(&x);
        if x_range.0 == x_range.1 {
            return Err(ConfigError::DegenerateRange);
        }
        let y_range = min_max(&y);

        Ok(Dataset {
            x,
            y,
            noise,
            x_range,
            y_range,
        })
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn x(&self, i: usize) -> f64 {
        self.x[i]
    }

    pub fn y(&self, i: usize) -> f64 {
        self.y[i]
    }

    /// Smallest and largest observed x.
    pub fn x_range(&self) -> (f64, f64) {
        self.x_range
    }

    /// Smallest and largest observed y.
    pub fn y_range(&self) -> (f64, f64) {
        self.y_range
    }

    pub fn noise(&self) -> &NoiseSpec {
        &self.noise
    }

    /// Whether the noise scale is part of the sampled state.
    pub fn infers_noise(&self) -> bool {
        matches!(self.noise, NoiseSpec::Inferred { .. })
    }

    /// Known noise scale for point `i`, `None` when the noise is inferred.
    pub(crate) fn point_sigma(&self, i: usize) -> Option<f64> {
        match &self.noise {
            NoiseSpec::Fixed(s) => Some(*s),
            NoiseSpec::PerPoint(sigmas) => Some(sigmas[i]),
            NoiseSpec::Inferred { .. } => None,
        }
    }
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}
