//! Error types for the CUSTOS access-control and audit pipeline.
//!
//! All fallible operations in CUSTOS return `CustosResult<T>`. The taxonomy
//! is deliberately small and maps directly onto failure policy:
//!
//! - `AuditWriteFailed` is fatal to the triggering business operation.
//!   A PHI access that cannot be audited must not be allowed to complete.
//! - `StoreError` covers read-side persistence failures.
//! - `ConfigError` covers malformed rule tables and threshold config.
//!   A rule that cannot be parsed never degrades to "allow".
//! - `AnalysisFailed` is non-fatal to live traffic: batch analyzers prefer
//!   partial results with an issue entry and only return this when the
//!   underlying store cannot be read at all.
//!
//! Permission denials are NOT errors. `PermissionChecker::check` returns a
//! structured `PermissionResult` as a normal value.

use thiserror::Error;

/// The unified error type for the CUSTOS crates.
#[derive(Debug, Error)]
pub enum CustosError {
    /// The audit store could not durably persist an entry.
    ///
    /// This is treated as fatal: an operation whose audit record cannot be
    /// written is treated as failed, never silently allowed (fail-closed).
    #[error("audit write failed: {reason}")]
    AuditWriteFailed { reason: String },

    /// The audit store could not be read.
    #[error("audit store error: {reason}")]
    StoreError { reason: String },

    /// A rule table, threshold set, or other configuration value is missing
    /// or malformed.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// A batch analysis could not produce even a partial result.
    #[error("analysis failed: {reason}")]
    AnalysisFailed { reason: String },
}

/// Convenience alias used throughout the CUSTOS crates.
pub type CustosResult<T> = Result<T, CustosError>;
