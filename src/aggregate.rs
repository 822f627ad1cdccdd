//! Streaming posterior summaries.
//!
//! The chain never stores retained samples. Each one is folded into running
//! statistics: a per-query-x running mean and fixed-bin y-histogram (for
//! credible-interval reconstruction), a histogram over the boundary count,
//! and per-move proposed/accepted counters. Aggregators from independent
//! chains merge before finalization, so multi-chain credible intervals come
//! from the summed histograms rather than averaged percentiles.

use itertools::izip;

use crate::model::{ForwardModel, LocalModel};
use crate::proposal::MoveKind;
use crate::state::PartitionState;

#[derive(Debug, Clone)]
pub struct ResultAggregator {
    xs: Box<[f64]>,
    mean: Vec<f64>,
    counts: Vec<u64>,
    // Flat row-major histogram: query location x bin.
    bins: Vec<u64>,
    num_bins: usize,
    y_lo: f64,
    y_hi: f64,
    k_hist: Vec<u64>,
    proposed: [u64; 5],
    accepted: [u64; 5],
    samples: u64,
}

impl ResultAggregator {
    pub(crate) fn new(
        x_range: (f64, f64),
        num_query: usize,
        num_bins: usize,
        y_range: (f64, f64),
        k_max: usize,
    ) -> Self {
        let (x_lo, x_hi) = x_range;
        let step = (x_hi - x_lo) / (num_query - 1) as f64;
        let xs: Box<[f64]> = (0..num_query).map(|i| x_lo + i as f64 * step).collect();
        ResultAggregator {
            mean: vec![0.0; num_query],
            counts: vec![0; num_query],
            bins: vec![0; num_query * num_bins],
            num_bins,
            y_lo: y_range.0,
            y_hi: y_range.1,
            k_hist: vec![0; k_max + 1],
            proposed: [0; 5],
            accepted: [0; 5],
            samples: 0,
            xs,
        }
    }

    pub(crate) fn record_move(&mut self, kind: MoveKind, accepted: bool) {
        self.proposed[kind.index()] += 1;
        if accepted {
            self.accepted[kind.index()] += 1;
        }
    }

    /// Fold the current state's predicted curve into the running statistics.
    pub(crate) fn record_sample<F: ForwardModel>(
        &mut self,
        model: &LocalModel<F>,
        state: &PartitionState,
        x_range: (f64, f64),
    ) {
        for (i, &x) in self.xs.iter().enumerate() {
            // Accepted states have finite likelihood, but a forward model may
            // still be invalid at a query x between data points.
            let Some(value) = model.predict(state, x_range, x) else {
                continue;
            };
            self.counts[i] += 1;
            self.mean[i] += (value - self.mean[i]) / self.counts[i] as f64;
            let bin = self.bin_of(value);
            self.bins[i * self.num_bins + bin] += 1;
        }
        let k = state.num_boundaries().min(self.k_hist.len() - 1);
        self.k_hist[k] += 1;
        self.samples += 1;
    }

    fn bin_of(&self, value: f64) -> usize {
        let t = (value - self.y_lo) / (self.y_hi - self.y_lo);
        let bin = (t * self.num_bins as f64).floor();
        (bin.max(0.0) as usize).min(self.num_bins - 1)
    }

    fn bin_center(&self, bin: usize) -> f64 {
        let width = (self.y_hi - self.y_lo) / self.num_bins as f64;
        self.y_lo + (bin as f64 + 0.5) * width
    }

    /// Combine two aggregators from independently run chains over the same
    /// configuration. Histograms and counters sum; means combine weighted by
    /// their per-location counts.
    pub fn merge(mut self, other: ResultAggregator) -> ResultAggregator {
        debug_assert_eq!(self.xs, other.xs);
        debug_assert_eq!(self.num_bins, other.num_bins);
        for (mean, count, other_mean, other_count) in izip!(
            self.mean.iter_mut(),
            self.counts.iter_mut(),
            other.mean.iter().copied(),
            other.counts.iter().copied()
        ) {
            let total = *count + other_count;
            if total > 0 {
                *mean = (*mean * *count as f64 + other_mean * other_count as f64) / total as f64;
            }
            *count = total;
        }
        for (a, b) in self.bins.iter_mut().zip(other.bins.iter()) {
            *a += b;
        }
        for (a, b) in self.k_hist.iter_mut().zip(other.k_hist.iter()) {
            *a += b;
        }
        for i in 0..5 {
            self.proposed[i] += other.proposed[i];
            self.accepted[i] += other.accepted[i];
        }
        self.samples += other.samples;
        self
    }

    /// Convert the histograms into the requested central credible interval.
    pub fn finalize(self, credible: f64) -> ResultSet {
        let q_lo = 0.5 * (1.0 - credible);
        let q_hi = 1.0 - q_lo;
        let n = self.xs.len();
        let mut mean = vec![f64::NAN; n];
        let mut lower = vec![f64::NAN; n];
        let mut upper = vec![f64::NAN; n];
        for i in 0..n {
            let count = self.counts[i];
            if count == 0 {
                continue;
            }
            let row = &self.bins[i * self.num_bins..(i + 1) * self.num_bins];
            let m = self.mean[i];
            // Coarse bins can place a percentile just past the running mean;
            // the interval is widened to keep lower <= mean <= upper.
            mean[i] = m;
            lower[i] = self.percentile(row, count, q_lo).min(m);
            upper[i] = self.percentile(row, count, q_hi).max(m);
        }
        ResultSet {
            xs: self.xs,
            mean: mean.into(),
            lower: lower.into(),
            upper: upper.into(),
            partition_hist: self.k_hist.into(),
            proposed: self.proposed,
            accepted: self.accepted,
            samples: self.samples,
        }
    }

    fn percentile(&self, row: &[u64], count: u64, q: f64) -> f64 {
        let rank = (q * count as f64).max(1.0);
        let mut cum = 0u64;
        for (bin, &c) in row.iter().enumerate() {
            cum += c;
            if cum as f64 >= rank {
                return self.bin_center(bin);
            }
        }
        self.bin_center(self.num_bins - 1)
    }
}

/// The terminal artifact of a sampling session.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    xs: Box<[f64]>,
    mean: Box<[f64]>,
    lower: Box<[f64]>,
    upper: Box<[f64]>,
    partition_hist: Box<[u64]>,
    proposed: [u64; 5],
    accepted: [u64; 5],
    samples: u64,
}

/// Summary over forward-model outputs; same shape as [`ResultSet`], the
/// curve statistics are computed through the user's prediction function.
pub type ResultSetFm = ResultSet;

impl ResultSet {
    /// The query x-locations the curve statistics are evaluated at.
    pub fn query_x(&self) -> &[f64] {
        &self.xs
    }

    /// Posterior mean prediction per query location.
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Lower credible bound per query location.
    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    /// Upper credible bound per query location.
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Histogram over the number of interior boundaries, index = k.
    pub fn partition_histogram(&self) -> &[u64] {
        &self.partition_hist
    }

    /// The boundary count with the highest posterior mass.
    pub fn mode_boundaries(&self) -> usize {
        self.partition_hist
            .iter()
            .enumerate()
            .max_by_key(|(_, &c)| c)
            .map(|(k, _)| k)
            .unwrap_or(0)
    }

    pub fn proposed(&self, kind: MoveKind) -> u64 {
        self.proposed[kind.index()]
    }

    pub fn accepted(&self, kind: MoveKind) -> u64 {
        self.accepted[kind.index()]
    }

    /// Accepted over proposed for one move family; NaN when never proposed.
    pub fn acceptance_rate(&self, kind: MoveKind) -> f64 {
        self.accepted[kind.index()] as f64 / self.proposed[kind.index()] as f64
    }

    /// Number of retained (post-thinning) samples.
    pub fn samples(&self) -> u64 {
        self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;

    fn aggregator() -> ResultAggregator {
        ResultAggregator::new((0.0, 1.0), 3, 100, (-5.0, 5.0), 4)
    }

    fn constant_state(v: f64) -> PartitionState {
        PartitionState::single(vec![v].into(), None)
    }

    #[test]
    fn query_grid_spans_range() {
        let agg = aggregator();
        assert_eq!(agg.xs.as_ref(), &[0.0, 0.5, 1.0]);
    }

    #[test]
    fn running_mean_is_exact_for_constants() {
        let mut agg = aggregator();
        let model: LocalModel = LocalModel::ZeroOrder;
        for &v in &[1.0, 2.0, 3.0] {
            agg.record_sample(&model, &constant_state(v), (0.0, 1.0));
        }
        let result = agg.finalize(0.9);
        for i in 0..3 {
            assert_abs_diff_eq!(result.mean()[i], 2.0, epsilon = 1e-12);
        }
        assert_eq!(result.samples(), 3);
    }

    #[test]
    fn credible_bounds_bracket_mean() {
        let mut agg = aggregator();
        let model: LocalModel = LocalModel::ZeroOrder;
        for i in 0..1000 {
            let v = -2.0 + 4.0 * (i as f64 / 999.0);
            agg.record_sample(&model, &constant_state(v), (0.0, 1.0));
        }
        let result = agg.finalize(0.9);
        for i in 0..3 {
            assert!(result.lower()[i] <= result.mean()[i]);
            assert!(result.mean()[i] <= result.upper()[i]);
            assert!(result.lower()[i] < -1.5);
            assert!(result.upper()[i] > 1.5);
        }
    }

    #[test]
    fn partition_histogram_counts_boundary_numbers() {
        let mut agg = aggregator();
        let model: LocalModel = LocalModel::ZeroOrder;
        let split = constant_state(0.0).with_birth(0.5, vec![1.0].into());
        agg.record_sample(&model, &constant_state(0.0), (0.0, 1.0));
        agg.record_sample(&model, &split, (0.0, 1.0));
        agg.record_sample(&model, &split, (0.0, 1.0));
        let result = agg.finalize(0.9);
        assert_eq!(result.partition_histogram(), &[1, 2, 0, 0, 0]);
        assert_eq!(result.mode_boundaries(), 1);
    }

    #[test]
    fn move_counters() {
        let mut agg = aggregator();
        agg.record_move(MoveKind::Birth, true);
        agg.record_move(MoveKind::Birth, false);
        agg.record_move(MoveKind::Value, true);
        let result = agg.finalize(0.9);
        assert_eq!(result.proposed(MoveKind::Birth), 2);
        assert_eq!(result.accepted(MoveKind::Birth), 1);
        assert_abs_diff_eq!(result.acceptance_rate(MoveKind::Birth), 0.5);
        assert_eq!(result.proposed(MoveKind::Death), 0);
    }

    #[test]
    fn merge_is_count_weighted() {
        let model: LocalModel = LocalModel::ZeroOrder;
        let mut a = aggregator();
        let mut b = aggregator();
        a.record_sample(&model, &constant_state(1.0), (0.0, 1.0));
        b.record_sample(&model, &constant_state(2.0), (0.0, 1.0));
        b.record_sample(&model, &constant_state(3.0), (0.0, 1.0));
        b.record_sample(&model, &constant_state(4.0), (0.0, 1.0));
        let merged = a.merge(b).finalize(0.9);
        for i in 0..3 {
            assert_abs_diff_eq!(merged.mean()[i], 2.5, epsilon = 1e-12);
        }
        assert_eq!(merged.samples(), 4);
    }

    #[test]
    fn out_of_range_values_clamp_into_edge_bins() {
        let mut agg = aggregator();
        let model: LocalModel = LocalModel::ZeroOrder;
        agg.record_sample(&model, &constant_state(100.0), (0.0, 1.0));
        let result = agg.finalize(0.9);
        // The histogram saturates but the running mean stays exact.
        assert_abs_diff_eq!(result.mean()[0], 100.0, epsilon = 1e-12);
        assert!(result.upper()[0] >= result.mean()[0]);
    }
}
