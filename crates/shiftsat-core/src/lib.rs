//! # shiftsat-core
//!
//! Domain model and wire schema for the shiftsat CP-SAT model compiler.
//!
//! This crate provides:
//! - Domain types: `Member`, `ShiftPattern`, `Day`, `CoverageRequirement`
//! - The variable/constraint intern layer: `Variable`, `Constraint`
//! - The Validation Reporter: `ValidationReporter`, `ReportItem`
//! - The external solver wire schema: `SolverRequest`, `SolverResponse`
//! - The error taxonomy: `ConfigError`, `CompileError`
//!
//! ## Example
//!
//! ```rust
//! use shiftsat_core::model::{Member, ShiftPattern};
//!
//! let alice = Member::new("alice").role("nurse");
//! let day_shift = ShiftPattern::new("day", (8, 0), (16, 0)).allowed_role("nurse");
//! assert!(day_shift.allows_role("nurse"));
//! assert_eq!(alice.roles.len(), 1);
//! ```

pub mod constraint;
pub mod error;
pub mod model;
pub mod reporter;
pub mod time;
pub mod variable;
pub mod wire;

pub use constraint::{Comparator, Constraint, ObjectiveTerm, Term};
pub use error::{CompileError, ConfigError};
pub use model::{
    validate_id, CoverageRequirement, Day, Member, MemberId, Pay, PatternId, Priority, Qualifier,
    ShiftPattern, ValidationGroup,
};
pub use reporter::{
    stable_item_id, ExclusionWindow, GroupStatus, GroupSummary, ItemCategory, ItemContext,
    ReportItem, SoftViolation, TrackedConstraint, ValidationReporter,
};
pub use variable::{Variable, VariableStore};
pub use wire::{
    Objective, ObjectiveSense, SolutionInfo, SolverOptions, SolverRequest, SolverResponse,
    SolverStatus,
};
