/// The variable-dimension model state.
///
/// `boundaries` holds the k interior partition boundaries, strictly
/// increasing and strictly inside the data x-range. They induce k + 1
/// contiguous partitions; `params` is the parameter arena with one local
/// parameter vector per partition, indexed left to right. `noise` carries
/// the global noise scale when it is part of the sampled state.
///
/// States are never mutated in place by the sampler: proposals build a
/// candidate copy through the `with_*` constructors and only an accepted
/// candidate replaces the current state.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionState {
    boundaries: Vec<f64>,
    params: Vec<Box<[f64]>>,
    noise: Option<f64>,
}

impl PartitionState {
    /// A single partition covering the whole x-range.
    pub(crate) fn single(params: Box<[f64]>, noise: Option<f64>) -> Self {
        PartitionState {
            boundaries: Vec::new(),
            params: vec![params],
            noise,
        }
    }

    /// Number of interior boundaries (k).
    pub fn num_boundaries(&self) -> usize {
        self.boundaries.len()
    }

    /// Number of partitions (k + 1).
    pub fn num_partitions(&self) -> usize {
        self.params.len()
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    /// Local parameter vector of partition `i`.
    pub fn params(&self, i: usize) -> &[f64] {
        &self.params[i]
    }

    pub fn noise(&self) -> Option<f64> {
        self.noise
    }

    /// Index of the partition containing `x`.
    ///
    /// A point exactly on a boundary belongs to the partition on its right.
    pub(crate) fn partition_index(&self, x: f64) -> usize {
        self.boundaries.partition_point(|&b| b <= x)
    }

    /// The x-interval covered by partition `i`, given the data x-range.
    pub(crate) fn partition_span(&self, i: usize, x_range: (f64, f64)) -> (f64, f64) {
        let lo = if i == 0 { x_range.0 } else { self.boundaries[i - 1] };
        let hi = if i == self.boundaries.len() {
            x_range.1
        } else {
            self.boundaries[i]
        };
        (lo, hi)
    }

    /// Candidate with a new boundary at `pos`, splitting its partition.
    ///
    /// The left half keeps the parent's parameters, the right half gets
    /// `new_params`. This is the exact inverse of `with_death` on the same
    /// boundary, which the birth/death acceptance ratios rely on.
    pub(crate) fn with_birth(&self, pos: f64, new_params: Box<[f64]>) -> Self {
        let idx = self.boundaries.partition_point(|&b| b < pos);
        let mut boundaries = self.boundaries.clone();
        boundaries.insert(idx, pos);
        let mut params = self.params.clone();
        params.insert(idx + 1, new_params);
        PartitionState {
            boundaries,
            params,
            noise: self.noise,
        }
    }

    /// Candidate with boundary `j` removed; the merged partition keeps the
    /// left parameters.
    pub(crate) fn with_death(&self, j: usize) -> Self {
        let mut boundaries = self.boundaries.clone();
        boundaries.remove(j);
        let mut params = self.params.clone();
        params.remove(j + 1);
        PartitionState {
            boundaries,
            params,
            noise: self.noise,
        }
    }

    /// Candidate with boundary `j` moved to `pos`. The caller checks that
    /// `pos` stays strictly between the neighbouring boundaries.
    pub(crate) fn with_moved_boundary(&self, j: usize, pos: f64) -> Self {
        let mut boundaries = self.boundaries.clone();
        boundaries[j] = pos;
        PartitionState {
            boundaries,
            params: self.params.clone(),
            noise: self.noise,
        }
    }

    /// Candidate with parameter `idx` of partition `i` set to `value`.
    pub(crate) fn with_value(&self, i: usize, idx: usize, value: f64) -> Self {
        let mut params = self.params.clone();
        let mut vec = params[i].to_vec();
        vec[idx] = value;
        params[i] = vec.into();
        PartitionState {
            boundaries: self.boundaries.clone(),
            params,
            noise: self.noise,
        }
    }

    /// Candidate with the noise scale replaced.
    pub(crate) fn with_noise(&self, noise: f64) -> Self {
        PartitionState {
            boundaries: self.boundaries.clone(),
            params: self.params.clone(),
            noise: Some(noise),
        }
    }

    /// Boundary-ordering invariant: strictly increasing, strictly inside
    /// the data x-range.
    pub(crate) fn ordered_within(&self, x_range: (f64, f64)) -> bool {
        let mut prev = x_range.0;
        for &b in &self.boundaries {
            if !(b > prev && b < x_range.1) {
                return false;
            }
            prev = b;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn params(v: f64) -> Box<[f64]> {
        vec![v].into()
    }

    #[test]
    fn lookup_uses_right_closed_partitions() {
        let state = PartitionState::single(params(0.0), None)
            .with_birth(0.3, params(1.0))
            .with_birth(0.7, params(2.0));
        assert_eq!(state.boundaries(), &[0.3, 0.7]);
        assert_eq!(state.partition_index(0.0), 0);
        assert_eq!(state.partition_index(0.3), 1);
        assert_eq!(state.partition_index(0.5), 1);
        assert_eq!(state.partition_index(0.7), 2);
        assert_eq!(state.partition_index(1.0), 2);
    }

    #[test]
    fn birth_then_death_restores_state() {
        let base = PartitionState::single(params(1.5), None).with_birth(0.4, params(-1.0));
        let grown = base.with_birth(0.6, params(3.0));
        // 0.6 is the second boundary.
        assert_eq!(grown.with_death(1), base);
    }

    #[test]
    fn birth_splits_correct_partition() {
        let state = PartitionState::single(params(1.0), None)
            .with_birth(0.5, params(2.0))
            .with_birth(0.25, params(9.0));
        assert_eq!(state.boundaries(), &[0.25, 0.5]);
        assert_eq!(state.params(0), &[1.0]);
        assert_eq!(state.params(1), &[9.0]);
        assert_eq!(state.params(2), &[2.0]);
    }

    #[test]
    fn spans_cover_the_range() {
        let state = PartitionState::single(params(0.0), None).with_birth(0.5, params(1.0));
        assert_eq!(state.partition_span(0, (0.0, 1.0)), (0.0, 0.5));
        assert_eq!(state.partition_span(1, (0.0, 1.0)), (0.5, 1.0));
    }

    #[test]
    fn ordering_invariant() {
        let state = PartitionState::single(params(0.0), None).with_birth(0.5, params(1.0));
        assert!(state.ordered_within((0.0, 1.0)));
        assert!(!state.with_moved_boundary(0, 1.5).ordered_within((0.0, 1.0)));
        assert!(!state.with_moved_boundary(0, 0.0).ordered_within((0.0, 1.0)));
    }
}
