//! Scope resolution, rule compilation, model building, and solution
//! analysis: the parts of the CP-SAT model compiler that turn a
//! normalized schedule input plus a solver response into a
//! [`shiftsat_core::wire::SolverRequest`] and, afterward, a validated
//! result.

pub mod analyzer;
pub mod assignment;
pub mod builder;
pub mod rules;
pub mod scope;
pub mod semantic_time;

pub use analyzer::{parse_assignments, resolve_assignments};
pub use assignment::ShiftAssignment;
pub use builder::{BuilderConfig, CostContext, ModelBuilder};
pub use rules::{noop_rule, Rule, SolutionContext};
pub use scope::{resolve_active_days, resolve_members, EntityScope, RecurringPeriod, TimeScope};
pub use semantic_time::{
    resolve_semantic_coverage, CountVariant, SemanticCoverageSpec, SemanticTime, TimeVariant,
    VariableCount,
};
