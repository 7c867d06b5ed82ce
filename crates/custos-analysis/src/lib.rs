//! # custos-analysis
//!
//! Batch and inline analysis over the CUSTOS audit trail:
//!
//! - [`ThresholdDetector`] - risk-pattern detection over a recent window
//! - [`IntegrityAnalyzer`] - gap, tamper, and completeness verification
//! - [`RiskScorer`] - bounded aggregate risk metric
//! - [`ReportGenerator`] - periodic compliance reporting
//!
//! The detector runs inline at audit-write time (via the recorder); the
//! analyzer, scorer, and report generator run on demand over historical
//! ranges and never block live audit writes.

pub mod integrity;
pub mod pattern;
pub mod report;
pub mod risk;

pub use integrity::{IntegrityAnalyzer, IntegrityConfig};
pub use pattern::{DetectorConfig, ThresholdDetector};
pub use report::{ReportConfig, ReportGenerator};
pub use risk::{RiskConfig, RiskScorer};
