//! Error taxonomy.
//!
//! `ConfigError` covers conditions that make it impossible to emit a
//! meaningful model at all; these abort compilation before a single
//! variable is declared. `CompileError` wraps `ConfigError` and adds
//! rule-level pre-solve impossibilities that are likewise abort-worthy.
//! Coverage and solver-level problems are not represented here: per the
//! error handling design, they are recorded on the
//! [`crate::reporter::ValidationReporter`] instead, and compilation still
//! produces a `SolverRequest`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("identifier {0:?} must not contain ':'")]
    IdContainsColon(String),

    #[error("identifier {0:?} must not be empty")]
    EmptyId(String),

    #[error("duplicate member id {0:?}")]
    DuplicateMemberId(String),

    #[error("duplicate shift pattern id {0:?}")]
    DuplicatePatternId(String),

    #[error("coverage requirement must name at least one role or skill")]
    CoverageWithoutQualifier,

    #[error("invalid bucket size {0}; must be one of 5, 10, 15, 30, 60 minutes")]
    InvalidBucketSize(u32),

    #[error("unknown reference {kind} {id:?}")]
    UnknownReference { kind: &'static str, id: String },

    #[error("scheduling period end {end} is before start {start}")]
    InvertedPeriod { start: String, end: String },
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("rule {rule:?} is pre-solve infeasible: {reason}")]
    RuleInfeasible { rule: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_messages_mention_the_offender() {
        let err = ConfigError::IdContainsColon("a:b".into());
        assert!(err.to_string().contains("a:b"));
    }

    #[test]
    fn compile_error_wraps_config_error() {
        let err: CompileError = ConfigError::EmptyId(String::new()).into();
        assert!(matches!(err, CompileError::Config(_)));
    }
}
