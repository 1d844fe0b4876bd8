//! Hours, shift-count, consecutive-day, and rest-gap rule compilers.
//!
//! Each rule groups the `∑ duration(pattern) · assign(m,p,d)` linear term
//! per (member, day) or per (member, week).

use shiftsat_core::constraint::{Comparator, Term};
use shiftsat_core::model::{Day, Member};

use crate::builder::ModelBuilder;
use crate::scope::{resolve_active_days, resolve_members, EntityScope, TimeScope};

use super::Rule;

/// Eligible (member, pattern, day) assignment terms for `member` on `day`,
/// weighted by pattern duration in minutes.
fn day_duration_terms(builder: &mut ModelBuilder, member: &Member, day: &Day) -> Vec<Term> {
    let patterns = builder.shift_patterns().to_vec();
    let mut terms = Vec::new();
    for p in &patterns {
        if builder.can_assign(&member.id, &p.id) && builder.pattern_available_on_day(&p.id, day) {
            let var = builder.assignment_var(&member.id, &p.id, day);
            terms.push(Term::new(var, p.duration_minutes()));
        }
    }
    terms
}

fn hours_to_minutes(hours: f64) -> i64 {
    (hours * 60.0).round() as i64
}

/// `max-hours-day`: bounds worked minutes per (member, day).
pub struct MaxHoursDay {
    pub members: EntityScope,
    pub days: TimeScope,
    pub max_hours: f64,
}

impl Rule for MaxHoursDay {
    fn name(&self) -> &str {
        "max-hours-day"
    }

    fn compile(&self, builder: &mut ModelBuilder) -> Result<(), String> {
        let max_minutes = hours_to_minutes(self.max_hours);
        let members: Vec<Member> = resolve_members(&self.members, builder.members())
            .into_iter()
            .cloned()
            .collect();
        let days: Vec<Day> = resolve_active_days(&self.days, builder.days())
            .into_iter()
            .cloned()
            .collect();
        for m in &members {
            for d in &days {
                let terms = day_duration_terms(builder, m, d);
                if terms.is_empty() {
                    continue;
                }
                builder.add_linear(terms, Comparator::Le, max_minutes);
            }
        }
        Ok(())
    }
}

/// `min-hours-day`: floors worked minutes per (member, day) that has any
/// eligible assignment at all.
pub struct MinHoursDay {
    pub members: EntityScope,
    pub days: TimeScope,
    pub min_hours: f64,
}

impl Rule for MinHoursDay {
    fn name(&self) -> &str {
        "min-hours-day"
    }

    fn compile(&self, builder: &mut ModelBuilder) -> Result<(), String> {
        let min_minutes = hours_to_minutes(self.min_hours);
        let members: Vec<Member> = resolve_members(&self.members, builder.members())
            .into_iter()
            .cloned()
            .collect();
        let days: Vec<Day> = resolve_active_days(&self.days, builder.days())
            .into_iter()
            .cloned()
            .collect();
        for m in &members {
            for d in &days {
                let terms = day_duration_terms(builder, m, d);
                if terms.is_empty() {
                    continue;
                }
                builder.add_linear(terms, Comparator::Ge, min_minutes);
            }
        }
        Ok(())
    }
}

/// `max-hours-week`: bounds worked minutes per (member, week), weeks keyed
/// by [`ModelBuilder::week_key`].
pub struct MaxHoursWeek {
    pub members: EntityScope,
    pub days: TimeScope,
    pub max_hours: f64,
}

impl Rule for MaxHoursWeek {
    fn name(&self) -> &str {
        "max-hours-week"
    }

    fn compile(&self, builder: &mut ModelBuilder) -> Result<(), String> {
        let max_minutes = hours_to_minutes(self.max_hours);
        let members: Vec<Member> = resolve_members(&self.members, builder.members())
            .into_iter()
            .cloned()
            .collect();
        let days: Vec<Day> = resolve_active_days(&self.days, builder.days())
            .into_iter()
            .cloned()
            .collect();
        for m in &members {
            let mut by_week: std::collections::BTreeMap<i64, Vec<Term>> = Default::default();
            for d in &days {
                let week = builder.week_key(d);
                by_week
                    .entry(week)
                    .or_default()
                    .extend(day_duration_terms(builder, m, d));
            }
            for terms in by_week.into_values() {
                if terms.is_empty() {
                    continue;
                }
                builder.add_linear(terms, Comparator::Le, max_minutes);
            }
        }
        Ok(())
    }
}

/// `min-hours-week`: floors worked minutes per (member, week).
pub struct MinHoursWeek {
    pub members: EntityScope,
    pub days: TimeScope,
    pub min_hours: f64,
}

impl Rule for MinHoursWeek {
    fn name(&self) -> &str {
        "min-hours-week"
    }

    fn compile(&self, builder: &mut ModelBuilder) -> Result<(), String> {
        let min_minutes = hours_to_minutes(self.min_hours);
        let members: Vec<Member> = resolve_members(&self.members, builder.members())
            .into_iter()
            .cloned()
            .collect();
        let days: Vec<Day> = resolve_active_days(&self.days, builder.days())
            .into_iter()
            .cloned()
            .collect();
        for m in &members {
            let mut by_week: std::collections::BTreeMap<i64, Vec<Term>> = Default::default();
            for d in &days {
                let week = builder.week_key(d);
                by_week
                    .entry(week)
                    .or_default()
                    .extend(day_duration_terms(builder, m, d));
            }
            for terms in by_week.into_values() {
                if terms.is_empty() {
                    continue;
                }
                builder.add_linear(terms, Comparator::Ge, min_minutes);
            }
        }
        Ok(())
    }
}

/// `max-shifts-day`: bounds the count of shifts (not hours) per (member, day).
pub struct MaxShiftsDay {
    pub members: EntityScope,
    pub days: TimeScope,
    pub max_shifts: u32,
}

impl Rule for MaxShiftsDay {
    fn name(&self) -> &str {
        "max-shifts-day"
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
        for m in &members {
            for d in &days {
                let mut terms = Vec::new();
                for p in &patterns {
                    if builder.can_assign(&m.id, &p.id) && builder.pattern_available_on_day(&p.id, d)
                    {
                        terms.push(Term::unit(builder.assignment_var(&m.id, &p.id, d)));
                    }
                }
                if terms.is_empty() {
                    continue;
                }
                builder.add_linear(terms, Comparator::Le, i64::from(self.max_shifts));
            }
        }
        Ok(())
    }
}

/// Interns a `worked:<member>:<day>` boolean equal to "the member has at
/// least one shift assigned on this day", via `sum(assign) <= N * worked`
/// (forces `worked = 0` to zero out every assignment) plus a per-pattern
/// implication (forces `worked = 1` as soon as any assignment is true).
fn worked_var(builder: &mut ModelBuilder, member: &Member, day: &Day) -> Option<String> {
    let patterns = builder.shift_patterns().to_vec();
    let mut assign_vars = Vec::new();
    for p in &patterns {
        if builder.can_assign(&member.id, &p.id) && builder.pattern_available_on_day(&p.id, day) {
            assign_vars.push(builder.assignment_var(&member.id, &p.id, day));
        }
    }
    if assign_vars.is_empty() {
        return None;
    }
    let worked = builder.new_bool_var(format!("worked:{}:{}", member.id, day.iso()));
    for a in &assign_vars {
        builder.add_implication(a.clone(), worked.clone());
    }
    let n = assign_vars.len() as i64;
    let mut terms: Vec<Term> = assign_vars.into_iter().map(Term::unit).collect();
    terms.push(Term::new(worked.clone(), -n));
    builder.add_linear(terms, Comparator::Le, 0);
    Some(worked)
}

/// Interns the complement of a `worked` boolean via `exactly_one`, so that
/// sequence constraints can use `bool_or` over negated literals without the
/// wire schema needing to express literal negation.
fn not_worked_var(builder: &mut ModelBuilder, worked: &str, member_id: &str, day: &Day) -> String {
    let not_worked = builder.new_bool_var(format!("not_worked:{member_id}:{}", day.iso()));
    builder.add_exactly_one(vec![worked.to_string(), not_worked.clone()]);
    not_worked
}

/// `max-consecutive-days`: forbids any run of `max_days + 1` consecutive
/// worked days, via a sliding-window sum over the `worked` booleans.
pub struct MaxConsecutiveDays {
    pub members: EntityScope,
    pub days: TimeScope,
    pub max_days: u32,
}

impl Rule for MaxConsecutiveDays {
    fn name(&self) -> &str {
        "max-consecutive-days"
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
        let window = self.max_days as usize + 1;
        if days.len() < window {
            return Ok(());
        }
        for m in &members {
            let worked: Vec<Option<String>> = days.iter().map(|d| worked_var(builder, m, d)).collect();
            for start in 0..=(days.len() - window) {
                let terms: Vec<Term> = worked[start..start + window]
                    .iter()
                    .flatten()
                    .map(|v| Term::unit(v.clone()))
                    .collect();
                if terms.is_empty() {
                    continue;
                }
                builder.add_linear(terms, Comparator::Le, i64::from(self.max_days));
            }
        }
        Ok(())
    }
}

/// `min-consecutive-days`: forbids "isolated" runs of worked days shorter
/// than `min_days`, using the standard bounded-span encoding: for every
/// window whose length is less than the minimum, at least one of
/// {the day before the window, the negation of every day inside the
/// window, the day after the window} must hold, so a maximal run inside
/// the window can't be exactly that (too-short) length.
pub struct MinConsecutiveDays {
    pub members: EntityScope,
    pub days: TimeScope,
    pub min_days: u32,
}

impl Rule for MinConsecutiveDays {
    fn name(&self) -> &str {
        "min-consecutive-days"
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
        let min_days = self.min_days as usize;
        if min_days <= 1 || days.is_empty() {
            return Ok(());
        }
        for m in &members {
            let worked: Vec<Option<String>> = days.iter().map(|d| worked_var(builder, m, d)).collect();
            let not_worked: Vec<Option<String>> = worked
                .iter()
                .zip(&days)
                .map(|(w, d)| w.as_ref().map(|w| not_worked_var(builder, w, &m.id, d)))
                .collect();

            for length in 1..min_days {
                for start in 0..=days.len().saturating_sub(length) {
                    if start + length > days.len() {
                        continue;
                    }
                    let mut span: Vec<String> = Vec::new();
                    if start > 0 {
                        let Some(before) = &worked[start - 1] else { continue };
                        span.push(before.clone());
                    }
                    let mut span_complete = true;
                    for nw in &not_worked[start..start + length] {
                        match nw {
                            Some(v) => span.push(v.clone()),
                            None => {
                                span_complete = false;
                                break;
                            }
                        }
                    }
                    if !span_complete {
                        continue;
                    }
                    if start + length < days.len() {
                        let Some(after) = &worked[start + length] else { continue };
                        span.push(after.clone());
                    }
                    builder.add_bool_or(span);
                }
            }
        }
        Ok(())
    }
}

/// `min-rest-between-shifts`: for every pair of eligible (pattern, day)
/// occurrences whose inter-shift gap is under the threshold, forbids both
/// from being assigned to the same member at once.
pub struct MinRestBetweenShifts {
    pub members: EntityScope,
    pub min_rest_hours: f64,
}

impl Rule for MinRestBetweenShifts {
    fn name(&self) -> &str {
        "min-rest-between-shifts"
    }

    fn compile(&self, builder: &mut ModelBuilder) -> Result<(), String> {
        let threshold = hours_to_minutes(self.min_rest_hours);
        let members: Vec<Member> = resolve_members(&self.members, builder.members())
            .into_iter()
            .cloned()
            .collect();
        let patterns = builder.shift_patterns().to_vec();
        let days = builder.days().to_vec();

        // Flatten eligible occurrences once per member, in sorted (day,
        // pattern) order, so adjacency checks only need to look forward.
        for m in &members {
            let mut occurrences: Vec<(i64, i64, String)> = Vec::new();
            for d in &days {
                for p in &patterns {
                    if builder.can_assign(&m.id, &p.id) && builder.pattern_available_on_day(&p.id, d) {
                        let offset = shiftsat_core::time::day_offset_minutes(d.index);
                        let start = offset + p.start_minutes();
                        let end = offset + p.end_minutes_normalized();
                        occurrences.push((start, end, builder.assignment_var(&m.id, &p.id, d)));
                    }
                }
            }
            occurrences.sort_by_key(|(start, ..)| *start);

            for i in 0..occurrences.len() {
                for j in (i + 1)..occurrences.len() {
                    let (start_i, end_i, ref var_i) = occurrences[i];
                    let (start_j, end_j, ref var_j) = occurrences[j];
                    let gap = if start_j >= end_i {
                        start_j - end_i
                    } else if start_i >= end_j {
                        start_i - end_j
                    } else {
                        // They already overlap; the per-member no-overlap
                        // constraint built in step 3 of compilation handles
                        // that case.
                        continue;
                    };
                    if gap < threshold {
                        builder.add_at_most_one(vec![var_i.clone(), var_j.clone()]);
                    }
                }
            }
        }
        Ok(())
    }
}
