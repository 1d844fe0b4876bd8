//! The resolved result of a solved assignment variable, shared between the
//! Solution Analyzer and post-solve rule `validate` hooks.

use chrono::NaiveDate;

/// One `assign:<member>:<pattern>:<day>` variable that the solver set true,
/// joined with its pattern's time-of-day window.
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftAssignment {
    pub member_id: String,
    pub pattern_id: String,
    pub day: NaiveDate,
    pub start_minutes: i64,
    pub end_minutes_normalized: i64,
}

impl ShiftAssignment {
    pub fn duration_minutes(&self) -> i64 {
        self.end_minutes_normalized - self.start_minutes
    }
}
