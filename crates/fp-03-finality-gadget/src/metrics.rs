//! # Gadget Metrics
//!
//! Prometheus counters, compiled in with the `metrics` feature:
//!
//! ```toml
//! fp-03-finality-gadget = { workspace = true, features = ["metrics"] }
//! ```
//!
//! - `fp_gadget_finality_checks_total{verdict}` - verdicts by outcome
//!   (`finalized`, `not_finalized`, `not_activated`, `no_power`, `error`)
//! - `fp_gadget_activation_polls_total` - activation recorder polls
//! - `fp_gadget_activation_recorded_total` - activation timestamps written

use crate::error::{GadgetError, GadgetResult};

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref FINALITY_CHECKS: IntCounterVec = register_int_counter_vec!(
        "fp_gadget_finality_checks_total",
        "Finality checks by verdict",
        &["verdict"]
    )
    .expect("Failed to create FINALITY_CHECKS metric");

    pub static ref ACTIVATION_POLLS: IntCounter = register_int_counter!(
        "fp_gadget_activation_polls_total",
        "Activation recorder polls"
    )
    .expect("Failed to create ACTIVATION_POLLS metric");

    pub static ref ACTIVATION_RECORDED: IntCounter = register_int_counter!(
        "fp_gadget_activation_recorded_total",
        "Activation timestamps written to the store"
    )
    .expect("Failed to create ACTIVATION_RECORDED metric");
}

fn verdict_label(verdict: &GadgetResult<bool>) -> &'static str {
    match verdict {
        Ok(true) => "finalized",
        Ok(false) => "not_finalized",
        Err(GadgetError::BtcStakingNotActivated) => "not_activated",
        Err(GadgetError::NoFpHasVotingPower) => "no_power",
        Err(_) => "error",
    }
}

#[cfg(feature = "metrics")]
pub fn record_finality_check(verdict: &GadgetResult<bool>) {
    FINALITY_CHECKS.with_label_values(&[verdict_label(verdict)]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_activation_poll() {
    ACTIVATION_POLLS.inc();
}

#[cfg(feature = "metrics")]
pub fn record_activation_recorded() {
    ACTIVATION_RECORDED.inc();
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_finality_check(verdict: &GadgetResult<bool>) {
    let _ = verdict_label(verdict);
}

#[cfg(not(feature = "metrics"))]
pub fn record_activation_poll() {}

#[cfg(not(feature = "metrics"))]
pub fn record_activation_recorded() {}
