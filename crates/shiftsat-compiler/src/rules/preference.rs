//! Soft-preference and hard-exclusion rule compilers.
//!
//! `AssignmentPriority` and `LocationPreference` nudge the objective;
//! `TimeOff` removes members from coverage eligibility and forbids the
//! underlying assignment variables; `AssignTogether` links two members'
//! assignments via a mutual implication.

use serde::{Deserialize, Serialize};
use shiftsat_core::constraint::{Comparator, Term};
use shiftsat_core::model::{Day, Member};
use shiftsat_core::time::{normalize_end_minutes, ranges_overlap};

use crate::builder::{ModelBuilder, ASSIGNMENT_PREFERENCE};
use crate::scope::{resolve_active_days, resolve_members, EntityScope, TimeScope};

use super::Rule;

/// Direction of an assignment preference: favor lowers the objective
/// coefficient (the solver is drawn toward it), disfavor raises it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Favor,
    Disfavor,
}

impl Direction {
    fn signed(self, weight: i64) -> i64 {
        match self {
            Direction::Favor => -weight,
            Direction::Disfavor => weight,
        }
    }
}

/// `assignment-priority`: biases the objective for/against assigning
/// `members` to `patterns` on `days`.
pub struct AssignmentPriority {
    pub members: EntityScope,
    pub patterns: Vec<String>,
    pub days: TimeScope,
    pub direction: Direction,
}

impl Rule for AssignmentPriority {
    fn name(&self) -> &str {
        "assignment-priority"
    }

    fn compile(&self, builder: &mut ModelBuilder) -> Result<(), String> {
        let members: Vec<Member> = resolve_members(&self.members, builder.members())
            .into_iter()
            .cloned()
            .collect();
        let days: Vec<Day> = resolve_active_days(&self.days, builder.days())
            .into_iter()
            .cloned()
            .collect();
        let coeff = self.direction.signed(ASSIGNMENT_PREFERENCE);
        for m in &members {
            for pattern_id in &self.patterns {
                if !builder.can_assign(&m.id, pattern_id) {
                    continue;
                }
                for d in &days {
                    if !builder.pattern_available_on_day(pattern_id, d) {
                        continue;
                    }
                    let var = builder.assignment_var(&m.id, pattern_id, d);
                    builder.add_penalty(var, coeff);
                }
            }
        }
        Ok(())
    }
}

/// `location-preference`: biases the objective for/against assigning
/// `members` to any pattern whose `location` matches.
pub struct LocationPreference {
    pub members: EntityScope,
    pub location: String,
    pub days: TimeScope,
    pub direction: Direction,
}

impl Rule for LocationPreference {
    fn name(&self) -> &str {
        "location-preference"
    }

    fn compile(&self, builder: &mut ModelBuilder) -> Result<(), String> {
        let members: Vec<Member> = resolve_members(&self.members, builder.members())
            .into_iter()
            .cloned()
            .collect();
        let days: Vec<Day> = resolve_active_days(&self.days, builder.days())
            .into_iter()
            .cloned()
            .collect();
        let coeff = self.direction.signed(ASSIGNMENT_PREFERENCE);
        let matching_patterns: Vec<String> = builder
            .shift_patterns()
            .iter()
            .filter(|p| p.location.as_deref() == Some(self.location.as_str()))
            .map(|p| p.id.clone())
            .collect();
        for m in &members {
            for pattern_id in &matching_patterns {
                if !builder.can_assign(&m.id, pattern_id) {
                    continue;
                }
                for d in &days {
                    if !builder.pattern_available_on_day(pattern_id, d) {
                        continue;
                    }
                    let var = builder.assignment_var(&m.id, pattern_id, d);
                    builder.add_penalty(var, coeff);
                }
            }
        }
        Ok(())
    }
}

/// `time-off`: a mandatory exclusion. Removes `members` from coverage
/// eligibility for the resolved days (optionally restricted to
/// `[window_start, window_end)` day-local minutes) and forbids every
/// overlapping assignment variable outright.
pub struct TimeOff {
    pub members: EntityScope,
    pub days: TimeScope,
    pub window: Option<(i64, i64)>,
}

impl Rule for TimeOff {
    fn name(&self) -> &str {
        "time-off"
    }

    fn compile(&self, builder: &mut ModelBuilder) -> Result<(), String> {
        let members: Vec<Member> = resolve_members(&self.members, builder.members())
            .into_iter()
            .cloned()
            .collect();
        let days: Vec<Day> = resolve_active_days(&self.days, builder.days())
            .into_iter()
            .cloned()
            .collect();
        let patterns = builder.shift_patterns().to_vec();

        // Normalized exactly like a coverage window, so an overnight window
        // (e.g. 22:00-06:00, raw `we < ws`) compares correctly against a
        // shift pattern's own normalized interval.
        let window = self.window.map(|(ws, we)| (ws, normalize_end_minutes(ws, we)));

        for m in &members {
            for d in &days {
                builder
                    .reporter_mut()
                    .exclude_from_coverage(m.id.clone(), d.iso(), window);

                for p in &patterns {
                    if !builder.can_assign(&m.id, &p.id) || !builder.pattern_available_on_day(&p.id, d) {
                        continue;
                    }
                    let overlaps = match window {
                        None => true,
                        Some((ws, we)) => {
                            let s = p.start_minutes();
                            let e = p.end_minutes_normalized();
                            ranges_overlap(s, e, ws, we)
                                || (e > 1440 && ranges_overlap(0, e - 1440, ws, we))
                        }
                    };
                    if !overlaps {
                        continue;
                    }
                    let var = builder.assignment_var(&m.id, &p.id, d);
                    builder.add_linear(vec![Term::unit(var)], Comparator::Le, 0);
                }
            }
        }
        Ok(())
    }
}

/// `assign-together`: if either member of the pair is assigned to
/// `pattern` on a day, the other must be too.
pub struct AssignTogether {
    pub member_a: String,
    pub member_b: String,
    pub patterns: Vec<String>,
}

impl Rule for AssignTogether {
    fn name(&self) -> &str {
        "assign-together"
    }

    fn compile(&self, builder: &mut ModelBuilder) -> Result<(), String> {
        let days = builder.days().to_vec();
        for pattern_id in &self.patterns {
            let a_ok = builder.can_assign(&self.member_a, pattern_id);
            let b_ok = builder.can_assign(&self.member_b, pattern_id);
            if !a_ok || !b_ok {
                continue;
            }
            for d in &days {
                if !builder.pattern_available_on_day(pattern_id, d) {
                    continue;
                }
                let var_a = builder.assignment_var(&self.member_a, pattern_id, d);
                let var_b = builder.assignment_var(&self.member_b, pattern_id, d);
                builder.add_implication(var_a.clone(), var_b.clone());
                builder.add_implication(var_b, var_a);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::BuilderConfig;
    use chrono::NaiveDate;
    use shiftsat_core::model::ShiftPattern;

    fn day(i: i64, date: (i32, u32, u32)) -> Day {
        Day {
            index: i,
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        }
    }

    #[test]
    fn assignment_priority_favor_adds_negative_penalty() {
        let cfg = BuilderConfig {
            members: vec![Member::new("alice").role("staff")],
            patterns: vec![ShiftPattern::new("morning", (8, 0), (12, 0)).allowed_role("staff")],
            days: vec![day(0, (2024, 2, 5))],
            rules: vec![Box::new(AssignmentPriority {
                members: EntityScope::None,
                patterns: vec!["morning".to_string()],
                days: TimeScope::None,
                direction: Direction::Favor,
            })],
            ..Default::default()
        };
        let mut builder = ModelBuilder::new(cfg).unwrap();
        let req = builder.compile().unwrap();
        let obj = req.objective.as_ref().unwrap();
        assert!(obj
            .terms
            .iter()
            .any(|t| t.var == "assign:alice:morning:2024-02-05" && t.coeff < 0));
    }

    #[test]
    fn time_off_forbids_overlapping_assignment() {
        let cfg = BuilderConfig {
            members: vec![Member::new("alice").role("staff")],
            patterns: vec![ShiftPattern::new("morning", (8, 0), (12, 0)).allowed_role("staff")],
            days: vec![day(0, (2024, 2, 5))],
            rules: vec![Box::new(TimeOff {
                members: EntityScope::None,
                days: TimeScope::None,
                window: None,
            })],
            ..Default::default()
        };
        let mut builder = ModelBuilder::new(cfg).unwrap();
        let req = builder.compile().unwrap();
        let hit = req.constraints.iter().any(|c| matches!(
            c,
            shiftsat_core::constraint::Constraint::Linear { op: Comparator::Le, rhs: 0, terms }
                if terms.iter().any(|t| t.var == "assign:alice:morning:2024-02-05")
        ));
        assert!(hit);
        assert!(builder.reporter().is_excluded("alice", "2024-02-05", 0, 1440));
    }

    #[test]
    fn time_off_window_forbids_overnight_assignment_after_normalization() {
        let cfg = BuilderConfig {
            members: vec![Member::new("alice").role("staff")],
            patterns: vec![ShiftPattern::new("night", (22, 0), (6, 0)).allowed_role("staff")],
            days: vec![day(0, (2024, 2, 5))],
            rules: vec![Box::new(TimeOff {
                members: EntityScope::None,
                days: TimeScope::None,
                // Raw, pre-normalization window: 22:00-06:00 (we < ws).
                window: Some((1320, 360)),
            })],
            ..Default::default()
        };
        let mut builder = ModelBuilder::new(cfg).unwrap();
        let req = builder.compile().unwrap();
        let hit = req.constraints.iter().any(|c| matches!(
            c,
            shiftsat_core::constraint::Constraint::Linear { op: Comparator::Le, rhs: 0, terms }
                if terms.iter().any(|t| t.var == "assign:alice:night:2024-02-05")
        ));
        assert!(hit, "overnight shift must be forbidden once the window is normalized");
        assert!(builder.reporter().is_excluded("alice", "2024-02-05", 1320, 1440));
    }

    #[test]
    fn assign_together_links_both_directions() {
        let cfg = BuilderConfig {
            members: vec![
                Member::new("alice").role("staff"),
                Member::new("bob").role("staff"),
            ],
            patterns: vec![ShiftPattern::new("morning", (8, 0), (12, 0)).allowed_role("staff")],
            days: vec![day(0, (2024, 2, 5))],
            rules: vec![Box::new(AssignTogether {
                member_a: "alice".to_string(),
                member_b: "bob".to_string(),
                patterns: vec!["morning".to_string()],
            })],
            ..Default::default()
        };
        let mut builder = ModelBuilder::new(cfg).unwrap();
        let req = builder.compile().unwrap();
        let implications = req
            .constraints
            .iter()
            .filter(|c| matches!(c, shiftsat_core::constraint::Constraint::Implication { .. }))
            .count();
        assert!(implications >= 2);
    }
}
