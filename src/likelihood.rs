//! Gaussian data log-likelihood of a partition state.

use crate::dataset::Dataset;
use crate::model::{ForwardModel, LocalModel};
use crate::state::PartitionState;

const LN_2PI: f64 = 1.8378770664093453;

/// Sum of Gaussian log-densities of the residuals, accumulated in double
/// precision. `None` means a prediction or the total was non-finite and the
/// candidate must be rejected.
pub(crate) fn log_likelihood<F: ForwardModel>(
    model: &LocalModel<F>,
    state: &PartitionState,
    data: &Dataset,
) -> Option<f64> {
    let x_range = data.x_range();
    let noise = state.noise();
    let mut acc = 0.0;
    for i in 0..data.len() {
        let pred = model.predict(state, x_range, data.x(i))?;
        let sigma = noise.or_else(|| data.point_sigma(i))?;
        let r = (data.y(i) - pred) / sigma;
        acc -= 0.5 * (r * r + LN_2PI) + sigma.ln();
    }
    acc.is_finite().then_some(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::NoiseSpec;
    use approx::assert_abs_diff_eq;

    fn data() -> Dataset {
        Dataset::new(
            [(0.0, 1.0), (0.5, 2.0), (1.0, 0.0)],
            NoiseSpec::Fixed(0.5),
        )
        .unwrap()
    }

    #[test]
    fn matches_closed_form() {
        let model: LocalModel = LocalModel::ZeroOrder;
        let state = PartitionState::single(vec![1.0].into(), None);
        // Residuals 0, 1, -1 with sigma 0.5.
        let expected: f64 = [0.0, 1.0, -1.0]
            .iter()
            .map(|r: &f64| {
                let z = r / 0.5;
                -0.5 * (z * z + LN_2PI) - 0.5f64.ln()
            })
            .sum();
        let got = log_likelihood(&model, &state, &data()).unwrap();
        assert_abs_diff_eq!(got, expected, epsilon = 1e-12);
    }

    #[test]
    fn per_point_sigmas_enter_every_term() {
        let data = Dataset::new(
            [(0.0, 1.0), (0.5, 2.0), (1.0, 0.0)],
            NoiseSpec::PerPoint(vec![0.5, 1.0, 2.0]),
        )
        .unwrap();
        let model: LocalModel = LocalModel::ZeroOrder;
        let state = PartitionState::single(vec![1.0].into(), None);
        // Residuals 0, 1, -1 with sigmas 0.5, 1, 2.
        let expected: f64 = [(0.0, 0.5), (1.0, 1.0), (-1.0, 2.0)]
            .iter()
            .map(|&(r, s): &(f64, f64)| {
                let z = r / s;
                -0.5 * (z * z + LN_2PI) - s.ln()
            })
            .sum();
        let got = log_likelihood(&model, &state, &data).unwrap();
        assert_abs_diff_eq!(got, expected, epsilon = 1e-12);
    }

    #[test]
    fn inferred_noise_comes_from_state() {
        let data = Dataset::new(
            [(0.0, 0.0), (1.0, 0.0)],
            NoiseSpec::Inferred {
                initial: 1.0,
                min: 0.01,
                max: 10.0,
            },
        )
        .unwrap();
        let model: LocalModel = LocalModel::ZeroOrder;
        let state = PartitionState::single(vec![0.0].into(), Some(2.0));
        let expected = 2.0 * (-0.5 * LN_2PI - 2f64.ln());
        assert_abs_diff_eq!(
            log_likelihood(&model, &state, &data).unwrap(),
            expected,
            epsilon = 1e-12
        );
    }

    #[test]
    fn non_finite_prediction_rejects() {
        let model: LocalModel = LocalModel::ZeroOrder;
        let state = PartitionState::single(vec![f64::NAN].into(), None);
        assert!(log_likelihood(&model, &state, &data()).is_none());
    }

    #[test]
    fn better_fit_scores_higher() {
        let model: LocalModel = LocalModel::ZeroOrder;
        let good = PartitionState::single(vec![1.0].into(), None);
        let bad = PartitionState::single(vec![5.0].into(), None);
        let d = data();
        assert!(
            log_likelihood(&model, &good, &d).unwrap()
                > log_likelihood(&model, &bad, &d).unwrap()
        );
    }
}
