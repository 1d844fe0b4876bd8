//! Rule Compilers: a family of pluggable units, each consuming the
//! Builder API to emit constraints, penalties, and diagnostics.
//!
//! A rule is a polymorphic unit with capabilities `{compile, validate?,
//! cost?}`. We represent that capability set as a trait with default
//! no-op implementations for the optional hooks, rather than three
//! separate traits, so a registry can hold `Box<dyn Rule>` uniformly.

pub mod cost;
pub mod hours;
pub mod preference;

use shiftsat_core::model::{Member, ShiftPattern};
use shiftsat_core::reporter::ValidationReporter;

use crate::assignment::ShiftAssignment;
use crate::builder::ModelBuilder;

/// Read-only context passed to a rule's `validate`/`cost` hooks after the
/// solver has responded.
pub struct SolutionContext<'a> {
    pub assignments: &'a [ShiftAssignment],
    pub members: &'a [Member],
    pub patterns: &'a [ShiftPattern],
}

/// The capability set a rule may implement.
pub trait Rule {
    /// Kebab-case rule identifier, e.g. `"max-hours-week"`.
    fn name(&self) -> &str;

    /// Emits variables/constraints/penalties into `builder`. Returns `Err`
    /// only for a pre-solve impossibility (e.g. conflicting mandatory
    /// bounds) that should abort compilation.
    fn compile(&self, builder: &mut ModelBuilder) -> Result<(), String>;

    /// Optional post-solve check. Appends violations/passed items to
    /// `reporter`. Default: no-op.
    fn validate(&self, _ctx: &SolutionContext<'_>, _reporter: &mut ValidationReporter) {}

    /// Optional post-solve cost contribution for this rule's assignments.
    /// Default: zero.
    fn cost(&self, _ctx: &SolutionContext<'_>) -> rust_decimal::Decimal {
        rust_decimal::Decimal::ZERO
    }
}

struct NoopRule;

impl Rule for NoopRule {
    fn name(&self) -> &str {
        "__noop"
    }

    fn compile(&self, _builder: &mut ModelBuilder) -> Result<(), String> {
        Ok(())
    }
}

/// A placeholder used only to satisfy the borrow-checker dance in
/// [`ModelBuilder::compile`] while a real rule is temporarily taken out of
/// the rule list.
pub fn noop_rule() -> Box<dyn Rule> {
    Box::new(NoopRule)
}

pub use cost::{
    DayCostMultiplier, DayCostSurcharge, MinimizeCost, OvertimeDaily, OvertimeWeekly,
    TimeCostSurcharge,
};
pub use hours::{
    MaxConsecutiveDays, MaxHoursDay, MaxHoursWeek, MaxShiftsDay, MinConsecutiveDays, MinHoursDay,
    MinHoursWeek, MinRestBetweenShifts,
};
pub use preference::{AssignTogether, AssignmentPriority, Direction, LocationPreference, TimeOff};
