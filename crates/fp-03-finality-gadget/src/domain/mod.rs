//! Pure quorum arithmetic, no I/O.

pub mod quorum;

pub use quorum::{has_quorum, tally_voted_power, total_power, PowerTable};
