//! Risk Verdicts
//!
//! Maps the classifier's maintenance probability onto a severity bucket and
//! the message shown to the operator.

mod verdict;

pub use verdict::{RiskBandError, RiskBands, RiskLevel, Tone, Verdict};
