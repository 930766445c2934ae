//! Error types for the guest engine.
//!
//! Recommending never fails: an unusable guest request degrades to the
//! popularity fallback or to an empty list. The only failure is building an
//! engine from a configuration that cannot produce meaningful scores.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A configuration field is out of range
    #[error("Invalid engine configuration: {field} = {value} ({reason})")]
    InvalidConfig {
        field: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, EngineError>;
