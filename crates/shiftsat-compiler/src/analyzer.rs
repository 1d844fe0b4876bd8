//! Solution Analyzer: turns a solver response's flat `{name: value}`
//! map back into typed [`ShiftAssignment`]s, and reports solver-level
//! failures (infeasible, timeout, error) through the [`ValidationReporter`].

use std::collections::HashMap;

use chrono::NaiveDate;

use shiftsat_core::model::ShiftPattern;
use shiftsat_core::reporter::ValidationReporter;
use shiftsat_core::wire::{SolverResponse, SolverStatus};

use crate::assignment::ShiftAssignment;

/// Prefix used by `ModelBuilder::assignment_name` for assignment booleans.
const ASSIGN_PREFIX: &str = "assign";

/// Parses one `assign:<member>:<pattern>:<day>` variable name, returning
/// `None` for anything that doesn't match the expected shape (defensive
/// against a solver echoing back unrelated variables).
fn parse_assignment_name(name: &str) -> Option<(&str, &str, NaiveDate)> {
    let mut parts = name.splitn(4, ':');
    let prefix = parts.next()?;
    if prefix != ASSIGN_PREFIX {
        return None;
    }
    let member_id = parts.next()?;
    let pattern_id = parts.next()?;
    let day_str = parts.next()?;
    let day = NaiveDate::parse_from_str(day_str, "%Y-%m-%d").ok()?;
    Some((member_id, pattern_id, day))
}

/// Reads solved assignment variables out of `values` whose boolean is
/// exactly `1`, joined against `patterns` for their time-of-day window.
/// Unknown pattern ids (which should not occur for a response produced
/// from our own request) are skipped rather than panicking.
pub fn parse_assignments(
    values: &HashMap<String, i64>,
    patterns: &[ShiftPattern],
) -> Vec<ShiftAssignment> {
    let pattern_by_id: HashMap<&str, &ShiftPattern> =
        patterns.iter().map(|p| (p.id.as_str(), p)).collect();

    let mut out: Vec<ShiftAssignment> = values
        .iter()
        .filter(|(_, &v)| v == 1)
        .filter_map(|(name, _)| parse_assignment_name(name))
        .filter_map(|(member_id, pattern_id, day)| {
            let pattern = pattern_by_id.get(pattern_id)?;
            Some(ShiftAssignment {
                member_id: member_id.to_string(),
                pattern_id: pattern_id.to_string(),
                day,
                start_minutes: pattern.start_minutes(),
                end_minutes_normalized: pattern.end_minutes_normalized(),
            })
        })
        .collect();

    out.sort_by(|a, b| {
        (a.day, &a.member_id, &a.pattern_id).cmp(&(b.day, &b.member_id, &b.pattern_id))
    });
    out
}

/// Dispatches on the response's solver status: a solved status yields
/// parsed assignments, anything else reports a solver error and yields no
/// assignments.
pub fn resolve_assignments(
    response: &SolverResponse,
    patterns: &[ShiftPattern],
    reporter: &mut ValidationReporter,
) -> Vec<ShiftAssignment> {
    match response.status {
        Some(status) if status.has_assignments() => {
            let Some(values) = &response.values else {
                reporter.report_solver_error(format!(
                    "solver reported {status:?} with no solution values"
                ));
                return Vec::new();
            };
            parse_assignments(values, patterns)
        }
        Some(SolverStatus::Infeasible) => {
            reporter.report_solver_error("solver reported the model as infeasible");
            Vec::new()
        }
        Some(SolverStatus::Timeout) => {
            reporter.report_solver_error("solver exceeded its time limit before finding a solution");
            Vec::new()
        }
        Some(SolverStatus::Error) => {
            let detail = response.error.as_deref().unwrap_or("no detail provided");
            reporter.report_solver_error(format!("solver reported an error: {detail}"));
            Vec::new()
        }
        None => {
            reporter.report_solver_error("solver response carried no status");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shiftsat_core::reporter::SoftViolation;

    fn patterns() -> Vec<ShiftPattern> {
        vec![ShiftPattern::new("morning", (8, 0), (12, 0))]
    }

    #[test]
    fn parse_assignment_name_rejects_malformed() {
        assert!(parse_assignment_name("shift:morning:2024-02-05").is_none());
        assert!(parse_assignment_name("assign:alice:morning:not-a-date").is_none());
        assert_eq!(
            parse_assignment_name("assign:alice:morning:2024-02-05"),
            Some((
                "alice",
                "morning",
                NaiveDate::from_ymd_opt(2024, 2, 5).unwrap()
            ))
        );
    }

    #[test]
    fn parse_assignments_filters_zero_values_and_non_assign_vars() {
        let mut values = HashMap::new();
        values.insert("assign:alice:morning:2024-02-05".to_string(), 1);
        values.insert("assign:bob:morning:2024-02-05".to_string(), 0);
        values.insert("shift:morning:2024-02-05".to_string(), 1);

        let out = parse_assignments(&values, &patterns());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].member_id, "alice");
        assert_eq!(out[0].duration_minutes(), 240);
    }

    #[test]
    fn resolve_assignments_reports_error_on_infeasible() {
        let mut reporter = ValidationReporter::new();
        let response = SolverResponse {
            status: Some(SolverStatus::Infeasible),
            ..Default::default()
        };
        let out = resolve_assignments(&response, &patterns(), &mut reporter);
        assert!(out.is_empty());
        assert!(reporter.has_errors());
    }

    #[test]
    fn resolve_assignments_parses_feasible_solution() {
        let mut reporter = ValidationReporter::new();
        let mut values = HashMap::new();
        values.insert("assign:alice:morning:2024-02-05".to_string(), 1);
        let response = SolverResponse {
            status: Some(SolverStatus::Feasible),
            values: Some(values),
            soft_violations: Some(vec![SoftViolation {
                constraint_id: "coverage:roles:staff:_:2024-02-05:480".into(),
                violation_amount: 0,
                target_value: 1,
                actual_value: 1,
            }]),
            ..Default::default()
        };
        let out = resolve_assignments(&response, &patterns(), &mut reporter);
        assert_eq!(out.len(), 1);
        assert!(!reporter.has_errors());
    }
}
