//! The reversible-jump Metropolis-Hastings acceptance rule.
//!
//! This is the single point where detailed balance is enforced: every move
//! family's ratio factors are folded into one log sum and compared against
//! one uniform draw. The draw always happens, even when the ratio already
//! guarantees acceptance, so the random stream consumed per scored proposal
//! does not depend on the proposal's value.

use rand::Rng;

/// Accept iff `u < exp(Δloglik + Δlogprior + log proposal ratio)` for one
/// uniform u. A NaN sum compares false and rejects.
pub(crate) fn accept<R: Rng + ?Sized>(
    log_lik_delta: f64,
    log_prior_ratio: f64,
    log_proposal_ratio: f64,
    rng: &mut R,
) -> bool {
    let log_alpha = log_lik_delta + log_prior_ratio + log_proposal_ratio;
    let u: f64 = rng.random();
    u.ln() < log_alpha
}
