//! Model Builder: owns the variable/constraint store and drives the
//! compilation algorithm from a normalized schedule down to a solver
//! wire request.
//!
//! The builder is created, mutated during rule compilation, and frozen at
//! [`ModelBuilder::compile`]. Variables and constraints are append-only;
//! rules observe each other's builder state only through this public API,
//! never through a hidden channel.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::unsync::OnceCell;
use shiftsat_core::constraint::{Comparator, Constraint, ObjectiveTerm, Term};
use shiftsat_core::error::{CompileError, ConfigError};
use shiftsat_core::model::{validate_id, CoverageRequirement, Day, Member, Priority, ShiftPattern};
use shiftsat_core::reporter::{ItemContext, TrackedConstraint, ValidationReporter};
use shiftsat_core::time::{day_offset_minutes, normalize_end_minutes, ranges_overlap};
use shiftsat_core::variable::{Variable, VariableStore};
use shiftsat_core::wire::{Objective, ObjectiveSense, SolverOptions, SolverRequest};

use crate::rules::Rule;

/// Priority -> penalty weight mapping.
pub const PRIORITY_HIGH: i64 = 100;
pub const PRIORITY_MEDIUM: i64 = 50;
pub const PRIORITY_LOW: i64 = 10;
pub const ASSIGNMENT_PREFERENCE: i64 = 10;
pub const FAIRNESS: i64 = 5;
pub const SHIFT_ACTIVE: i64 = 1000;
pub const ASSIGNMENT_BASE: i64 = 1;

/// Maps a coverage/rule [`Priority`] to its penalty weight. `MANDATORY` has
/// no penalty weight since it compiles to a hard constraint.
pub fn priority_to_penalty(priority: Priority) -> Option<i64> {
    match priority {
        Priority::Low => Some(PRIORITY_LOW),
        Priority::Medium => Some(PRIORITY_MEDIUM),
        Priority::High => Some(PRIORITY_HIGH),
        Priority::Mandatory => None,
    }
}

pub const VALID_BUCKET_SIZES: [u32; 5] = [5, 10, 15, 30, 60];

#[derive(Debug, Clone, Copy, Default)]
pub struct CostContext {
    pub normalization_factor: i64,
    pub active: bool,
}

/// Build-time configuration accepted by [`ModelBuilder::new`].
pub struct BuilderConfig {
    pub members: Vec<Member>,
    pub patterns: Vec<ShiftPattern>,
    pub days: Vec<Day>,
    pub coverage: Vec<CoverageRequirement>,
    pub rules: Vec<Box<dyn Rule>>,
    pub bucket_minutes: u32,
    pub fair_distribution: bool,
    pub week_starts_on: chrono::Weekday,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            members: Vec::new(),
            patterns: Vec::new(),
            days: Vec::new(),
            coverage: Vec::new(),
            rules: Vec::new(),
            bucket_minutes: 15,
            fair_distribution: true,
            week_starts_on: chrono::Weekday::Mon,
        }
    }
}

fn variable_name(kind: &str, parts: &[&str]) -> String {
    let mut s = String::from(kind);
    for p in parts {
        s.push(':');
        s.push_str(p);
    }
    s
}

/// Describes why a coverage bucket could not be satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketIssueReason {
    NoPatterns,
    NoAssignable,
    MandatoryTimeOff,
    Insufficient(u32),
}

impl BucketIssueReason {
    pub fn key(&self) -> String {
        match self {
            BucketIssueReason::NoPatterns => "no_patterns".to_string(),
            BucketIssueReason::NoAssignable => "no_assignable".to_string(),
            BucketIssueReason::MandatoryTimeOff => "mandatory_time_off".to_string(),
            BucketIssueReason::Insufficient(n) => format!("insufficient:{n}"),
        }
    }
}

pub struct ModelBuilder {
    members: Vec<Member>,
    patterns: Vec<ShiftPattern>,
    days: Vec<Day>,
    coverage: Vec<CoverageRequirement>,
    rules: Vec<Box<dyn Rule>>,
    bucket_minutes: i64,
    fair_distribution: bool,
    week_starts_on: chrono::Weekday,

    member_by_id: BTreeMap<String, usize>,
    pattern_by_id: BTreeMap<String, usize>,
    day_index: BTreeMap<chrono::NaiveDate, usize>,

    variables: VariableStore,
    constraints: Vec<Constraint>,
    objective_terms: Vec<ObjectiveTerm>,
    reporter: ValidationReporter,
    cost_context: CostContext,

    cached_request: OnceCell<SolverRequest>,
}

impl ModelBuilder {
    /// Validates configuration and builds the id/day indexes. Returns a
    /// [`ConfigError`] for any condition that makes it impossible to emit
    /// a meaningful model.
    pub fn new(config: BuilderConfig) -> Result<Self, ConfigError> {
        let mut member_by_id = BTreeMap::new();
        for (i, m) in config.members.iter().enumerate() {
            validate_id(&m.id).map_err(|_| ConfigError::IdContainsColon(m.id.clone()))?;
            if member_by_id.insert(m.id.clone(), i).is_some() {
                return Err(ConfigError::DuplicateMemberId(m.id.clone()));
            }
        }

        let mut pattern_by_id = BTreeMap::new();
        for (i, p) in config.patterns.iter().enumerate() {
            validate_id(&p.id).map_err(|_| ConfigError::IdContainsColon(p.id.clone()))?;
            if pattern_by_id.insert(p.id.clone(), i).is_some() {
                return Err(ConfigError::DuplicatePatternId(p.id.clone()));
            }
        }

        if !VALID_BUCKET_SIZES.contains(&config.bucket_minutes) {
            return Err(ConfigError::InvalidBucketSize(config.bucket_minutes));
        }

        let mut days = config.days;
        days.sort_by_key(|d| d.index);
        let mut day_index = BTreeMap::new();
        for d in &days {
            day_index.insert(d.date, d.index as usize);
        }

        for cov in &config.coverage {
            match &cov.qualifier {
                shiftsat_core::model::Qualifier::Roles { roles, .. } if roles.is_empty() => {
                    return Err(ConfigError::CoverageWithoutQualifier);
                }
                shiftsat_core::model::Qualifier::Skills { skills } if skills.is_empty() => {
                    return Err(ConfigError::CoverageWithoutQualifier);
                }
                _ => {}
            }
        }

        Ok(Self {
            members: config.members,
            patterns: config.patterns,
            days,
            coverage: config.coverage,
            rules: config.rules,
            bucket_minutes: i64::from(config.bucket_minutes),
            fair_distribution: config.fair_distribution,
            week_starts_on: config.week_starts_on,
            member_by_id,
            pattern_by_id,
            day_index,
            variables: VariableStore::new(),
            constraints: Vec::new(),
            objective_terms: Vec::new(),
            reporter: ValidationReporter::new(),
            cost_context: CostContext::default(),
            cached_request: OnceCell::new(),
        })
    }

    // ---- read-only accessors rules consume ----

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn shift_patterns(&self) -> &[ShiftPattern] {
        &self.patterns
    }

    pub fn days(&self) -> &[Day] {
        &self.days
    }

    pub fn coverage(&self) -> &[CoverageRequirement] {
        &self.coverage
    }

    pub fn member(&self, id: &str) -> Option<&Member> {
        self.member_by_id.get(id).map(|&i| &self.members[i])
    }

    pub fn pattern(&self, id: &str) -> Option<&ShiftPattern> {
        self.pattern_by_id.get(id).map(|&i| &self.patterns[i])
    }

    pub fn day_by_date(&self, date: chrono::NaiveDate) -> Option<&Day> {
        self.day_index.get(&date).map(|&i| &self.days[i])
    }

    pub fn can_assign(&self, member_id: &str, pattern_id: &str) -> bool {
        let (Some(member), Some(pattern)) = (self.member(member_id), self.pattern(pattern_id))
        else {
            return false;
        };
        match &pattern.allowed_roles {
            None => true,
            Some(allowed) => member.roles.iter().any(|r| allowed.contains(r)),
        }
    }

    pub fn pattern_available_on_day(&self, pattern_id: &str, day: &Day) -> bool {
        self.pattern(pattern_id)
            .map(|p| p.available_on(day.day_of_week()))
            .unwrap_or(false)
    }

    pub fn pattern_duration(&self, pattern_id: &str) -> i64 {
        self.pattern(pattern_id).map_or(0, ShiftPattern::duration_minutes)
    }

    /// Groups `day` into a week bucket anchored to the horizon's first day
    /// and `week_starts_on`. Weeks are zero-based and monotonically
    /// increasing with calendar order, which is all rules need to group
    /// "per (member, week)".
    pub fn week_key(&self, day: &Day) -> i64 {
        use chrono::Datelike;
        let Some(first) = self.days.first().map(|d| d.date) else {
            return 0;
        };
        let first_dow = i64::from(first.weekday().num_days_from_monday());
        let target_dow = i64::from(self.week_starts_on.num_days_from_monday());
        let back = (first_dow - target_dow).rem_euclid(7);
        let first_week_start = first - chrono::Duration::days(back);
        (day.date - first_week_start).num_days().div_euclid(7)
    }

    pub fn cost_context(&self) -> CostContext {
        self.cost_context
    }

    pub fn set_cost_context(&mut self, ctx: CostContext) {
        self.cost_context = ctx;
    }

    pub fn reporter(&self) -> &ValidationReporter {
        &self.reporter
    }

    pub fn reporter_mut(&mut self) -> &mut ValidationReporter {
        &mut self.reporter
    }

    // ---- variable naming ----

    pub fn assignment_name(member_id: &str, pattern_id: &str, day: &Day) -> String {
        variable_name("assign", &[member_id, pattern_id, &day.iso()])
    }

    pub fn shift_active_name(pattern_id: &str, day: &Day) -> String {
        variable_name("shift", &[pattern_id, &day.iso()])
    }

    pub fn interval_name(member_id: &str, pattern_id: &str, day: &Day) -> String {
        variable_name("interval", &[member_id, pattern_id, &day.iso()])
    }

    // ---- builder API (Bool/Int/Interval interning) ----

    /// Interns (or reuses) the `assign:<member>:<pattern>:<day>` boolean.
    pub fn assignment_var(&mut self, member_id: &str, pattern_id: &str, day: &Day) -> String {
        let name = Self::assignment_name(member_id, pattern_id, day);
        let _ = self.variables.intern(Variable::Bool { name: name.clone() });
        name
    }

    /// Interns (or reuses) the `shift:<pattern>:<day>` boolean.
    pub fn shift_active_var(&mut self, pattern_id: &str, day: &Day) -> String {
        let name = Self::shift_active_name(pattern_id, day);
        let _ = self.variables.intern(Variable::Bool { name: name.clone() });
        name
    }

    pub fn new_bool_var(&mut self, name: impl Into<String>) -> String {
        let name = name.into();
        let _ = self.variables.intern(Variable::Bool { name: name.clone() });
        name
    }

    pub fn new_int_var(&mut self, name: impl Into<String>, min: i64, max: i64) -> String {
        let name = name.into();
        let _ = self.variables.intern(Variable::Int {
            name: name.clone(),
            min,
            max,
        });
        name
    }

    pub fn interval_var(
        &mut self,
        name: impl Into<String>,
        start: i64,
        end: i64,
        presence_var: Option<String>,
    ) -> String {
        let name = name.into();
        let _ = self.variables.intern(Variable::Interval {
            name: name.clone(),
            start,
            end,
            size: end - start,
            presence_var,
        });
        name
    }

    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }

    // ---- constraint/objective emission ----

    pub fn add_linear(&mut self, terms: Vec<Term>, op: Comparator, rhs: i64) {
        self.constraints.push(Constraint::Linear { terms, op, rhs });
    }

    pub fn add_soft_linear(
        &mut self,
        terms: Vec<Term>,
        op: Comparator,
        rhs: i64,
        penalty: i64,
        id: impl Into<String>,
    ) {
        self.constraints.push(Constraint::SoftLinear {
            terms,
            op,
            rhs,
            penalty,
            id: id.into(),
        });
    }

    pub fn add_exactly_one(&mut self, vars: Vec<String>) {
        self.constraints.push(Constraint::ExactlyOne { vars });
    }

    pub fn add_at_most_one(&mut self, vars: Vec<String>) {
        self.constraints.push(Constraint::AtMostOne { vars });
    }

    pub fn add_implication(&mut self, if_var: impl Into<String>, then_var: impl Into<String>) {
        self.constraints.push(Constraint::Implication {
            if_var: if_var.into(),
            then_var: then_var.into(),
        });
    }

    pub fn add_bool_or(&mut self, vars: Vec<String>) {
        self.constraints.push(Constraint::BoolOr { vars });
    }

    pub fn add_bool_and(&mut self, vars: Vec<String>) {
        self.constraints.push(Constraint::BoolAnd { vars });
    }

    pub fn add_no_overlap(&mut self, intervals: Vec<String>) {
        self.constraints.push(Constraint::NoOverlap { intervals });
    }

    /// Adds `coeff * var` to the objective. A `coeff` of zero is dropped
    /// silently, matching the integer-rounding convention documented in
    /// DESIGN.md's Open Question resolutions.
    pub fn add_penalty(&mut self, var: impl Into<String>, coeff: i64) {
        if coeff == 0 {
            return;
        }
        self.objective_terms.push(ObjectiveTerm {
            var: var.into(),
            coeff,
        });
    }

    pub fn track_constraint(&mut self, tc: TrackedConstraint) {
        self.reporter.track_constraint(tc);
    }

    // ---- compilation ----

    /// Runs the compilation algorithm once; subsequent calls return the
    /// cached result.
    pub fn compile(&mut self) -> Result<&SolverRequest, CompileError> {
        if self.cached_request.get().is_none() {
            let request = self.compile_uncached()?;
            let _ = self.cached_request.set(request);
        }
        Ok(self.cached_request.get().expect("just set"))
    }

    fn compile_uncached(&mut self) -> Result<SolverRequest, CompileError> {
        tracing::debug!(rules = self.rules.len(), "starting rule pass");

        // Step 1: rule pass, minimize-cost hoisted to the front.
        let mut order: Vec<usize> = (0..self.rules.len()).collect();
        order.sort_by_key(|&i| if self.rules[i].name() == "minimize-cost" { 0 } else { 1 });
        for idx in order {
            let rule = std::mem::replace(&mut self.rules[idx], crate::rules::noop_rule());
            let result = rule.compile(self);
            self.rules[idx] = rule;
            if let Err(reason) = result {
                return Err(CompileError::RuleInfeasible {
                    rule: self.rules[idx].name().to_string(),
                    reason,
                });
            }
        }

        // Step 2: assignment => shiftActive implication.
        tracing::debug!("emitting assignment implications");
        let members: Vec<Member> = self.members.clone();
        let patterns: Vec<ShiftPattern> = self.patterns.clone();
        let days: Vec<Day> = self.days.clone();
        for m in &members {
            for p in &patterns {
                for d in &days {
                    if self.can_assign(&m.id, &p.id) && self.pattern_available_on_day(&p.id, d) {
                        let a = self.assignment_var(&m.id, &p.id, d);
                        let s = self.shift_active_var(&p.id, d);
                        self.add_implication(a, s);
                    }
                }
            }
        }

        // Step 3: optional intervals + per-member no-overlap.
        tracing::debug!("building intervals and no-overlap constraints");
        for m in &members {
            let mut interval_names = Vec::new();
            for d in &days {
                for p in &patterns {
                    if self.can_assign(&m.id, &p.id) && self.pattern_available_on_day(&p.id, d) {
                        let offset = day_offset_minutes(d.index);
                        let start = offset + p.start_minutes();
                        let end = offset + p.end_minutes_normalized();
                        let presence = self.assignment_var(&m.id, &p.id, d);
                        let name = Self::interval_name(&m.id, &p.id, d);
                        self.interval_var(name.clone(), start, end, Some(presence));
                        interval_names.push(name);
                    }
                }
            }
            if interval_names.len() > 1 {
                self.add_no_overlap(interval_names);
            }
        }

        // Step 4: bucketed coverage.
        tracing::debug!("resolving bucketed coverage");
        self.compile_bucketed_coverage(&members, &patterns)?;

        // Step 5: default objective components.
        tracing::debug!("assembling default objective");
        for p in &patterns {
            for d in &days {
                if self.pattern_available_on_day(&p.id, d) {
                    let shift = Self::shift_active_name(&p.id, d);
                    self.add_penalty(shift, SHIFT_ACTIVE);
                }
            }
        }

        if self.fair_distribution && members.len() > 1 {
            let max_possible = (days.len() as i64) * (patterns.len() as i64);
            let max_var = self.new_int_var("fairness:max_assignments", 0, max_possible.max(0));
            for m in &members {
                let mut terms = Vec::new();
                for p in &patterns {
                    for d in &days {
                        if self.can_assign(&m.id, &p.id) && self.pattern_available_on_day(&p.id, d) {
                            terms.push(Term::unit(self.assignment_var(&m.id, &p.id, d)));
                        }
                    }
                }
                if terms.is_empty() {
                    continue;
                }
                terms.push(Term::new(max_var.clone(), -1));
                self.add_linear(terms, Comparator::Le, 0);
            }
            self.add_penalty(max_var, FAIRNESS);
        }

        for m in &members {
            for p in &patterns {
                for d in &days {
                    if self.can_assign(&m.id, &p.id) && self.pattern_available_on_day(&p.id, d) {
                        let a = self.assignment_var(&m.id, &p.id, d);
                        self.add_penalty(a, ASSIGNMENT_BASE);
                    }
                }
            }
        }

        // Step 6: finalize.
        let variables: Vec<Variable> = self.variables.iter().cloned().collect();
        let objective = if self.objective_terms.is_empty() {
            None
        } else {
            Some(Objective {
                sense: ObjectiveSense::Minimize,
                terms: self.objective_terms.clone(),
            })
        };

        Ok(SolverRequest {
            variables,
            constraints: self.constraints.clone(),
            objective,
            options: Some(SolverOptions::default()),
        })
    }

    pub fn can_solve(&self) -> bool {
        !self.reporter.has_errors()
    }

    /// Runs every rule's optional `validate` hook against a resolved
    /// solution, appending violations/passed items to the reporter. Uses
    /// the same take-rule/call/put-back dance as the compile pass so each
    /// rule can observe `&self` builder state while the reporter is
    /// borrowed mutably.
    pub fn validate_solution(&mut self, assignments: &[crate::assignment::ShiftAssignment]) {
        let ctx = crate::rules::SolutionContext {
            assignments,
            members: &self.members,
            patterns: &self.patterns,
        };
        for idx in 0..self.rules.len() {
            let rule = std::mem::replace(&mut self.rules[idx], crate::rules::noop_rule());
            rule.validate(&ctx, &mut self.reporter);
            self.rules[idx] = rule;
        }
    }

    /// Joins the solver's soft-constraint violations against every
    /// tracked constraint, producing violation/passed report items.
    pub fn analyze_solution(&mut self, response: &shiftsat_core::wire::SolverResponse) {
        let empty = Vec::new();
        let soft_violations = response.soft_violations.as_ref().unwrap_or(&empty);
        self.reporter.analyze_solution(soft_violations);
    }

    /// Read-only diagnostic: explains *why* a coverage requirement on
    /// `day` matching `qualifier_key` (see [`shiftsat_core::model::Qualifier::key`])
    /// cannot be fully satisfied, bucket by bucket, without mutating any
    /// builder state. Used by the CLI `check` command to surface the
    /// bucket-issue reason taxonomy ahead of a full compile.
    pub fn explain_coverage(&self, day: chrono::NaiveDate, qualifier_key: &str) -> Vec<String> {
        let Some(resolved_day) = self.day_by_date(day).cloned() else {
            return vec![format!("{day} is outside the scheduling horizon")];
        };

        let mut explanations = Vec::new();
        for cov in &self.coverage {
            if cov.day != day || cov.qualifier.key() != qualifier_key {
                continue;
            }

            let cov_start = cov.start_minutes;
            let cov_end = normalize_end_minutes(cov_start, cov.end_minutes_raw);

            let mut eligible: Vec<&Member> =
                self.members.iter().filter(|m| cov.qualifier.matches(m)).collect();
            eligible.sort_by(|a, b| a.id.cmp(&b.id));
            if eligible.is_empty() {
                explanations.push(format!(
                    "no member matches qualifier {qualifier_key} at all"
                ));
                continue;
            }

            for bucket_start in Self::bucket_starts_covering(cov_start, cov_end, self.bucket_minutes)
            {
                let bucket_end = (bucket_start + self.bucket_minutes).min(cov_end);
                let local_start = bucket_start.rem_euclid(1440);
                let local_end = local_start + (bucket_end - bucket_start);
                let overlapping = self.patterns_overlapping_bucket(
                    &self.patterns,
                    &resolved_day,
                    local_start,
                    local_end,
                );
                let reason = if overlapping.is_empty() {
                    Some(BucketIssueReason::NoPatterns)
                } else {
                    let assignable = eligible
                        .iter()
                        .any(|m| overlapping.iter().any(|p| self.can_assign(&m.id, &p.id)));
                    if !assignable {
                        Some(BucketIssueReason::NoAssignable)
                    } else {
                        None
                    }
                };
                if let Some(reason) = reason {
                    explanations.push(format!(
                        "{}-{} ({}): {}",
                        minutes_to_hhmm(bucket_start),
                        minutes_to_hhmm(bucket_end),
                        reason.key(),
                        match reason {
                            BucketIssueReason::NoPatterns => "no shift pattern overlaps this window",
                            BucketIssueReason::NoAssignable => {
                                "no eligible member can be assigned to an overlapping pattern"
                            }
                            _ => "unsatisfiable",
                        }
                    ));
                }
            }
        }

        if explanations.is_empty() {
            explanations.push(format!(
                "no unsatisfiable bucket found for {qualifier_key} on {day}"
            ));
        }
        explanations
    }

    fn bucket_starts_covering(start: i64, end: i64, bucket: i64) -> Vec<i64> {
        let mut out = Vec::new();
        let mut t = start;
        while t < end {
            out.push(t);
            t += bucket;
        }
        out
    }

    /// Patterns overlapping a given minute-of-day `t` and available on
    /// `day`, honoring overnight wraparound.
    fn patterns_overlapping_bucket<'a>(
        &self,
        patterns: &'a [ShiftPattern],
        day: &Day,
        bucket_start: i64,
        bucket_end: i64,
    ) -> Vec<&'a ShiftPattern> {
        patterns
            .iter()
            .filter(|p| {
                if !p.available_on(day.day_of_week()) {
                    return false;
                }
                let s = p.start_minutes();
                let e = p.end_minutes_normalized();
                let direct = ranges_overlap(s, e, bucket_start, bucket_end);
                let wrapped = e > 1440 && ranges_overlap(0, e - 1440, bucket_start, bucket_end);
                direct || wrapped
            })
            .collect()
    }

    fn compile_bucketed_coverage(
        &mut self,
        members: &[Member],
        patterns: &[ShiftPattern],
    ) -> Result<(), CompileError> {
        let bucket = self.bucket_minutes;
        let coverage = self.coverage.clone();

        for cov in &coverage {
            let cov_start = cov.start_minutes;
            let cov_end = normalize_end_minutes(cov_start, cov.end_minutes_raw);
            let day_iso = cov.day.format("%Y-%m-%d").to_string();
            let Some(day) = self.day_by_date(cov.day).cloned() else {
                continue;
            };

            let mut eligible: Vec<&Member> = members
                .iter()
                .filter(|m| cov.qualifier.matches(m))
                .collect();
            eligible.sort_by(|a, b| a.id.cmp(&b.id));

            if eligible.is_empty() && cov.priority.is_hard() && cov.target > 0 {
                let marker = format!(
                    "infeasible:coverage:{}:{}",
                    cov.qualifier.key(),
                    day_iso
                );
                self.new_int_var(marker.clone(), 0, 0);
                self.add_linear(vec![Term::unit(marker)], Comparator::Ge, i64::from(cov.target));
                self.report_coverage_error(cov, &day_iso, None);
                continue;
            }

            let mut issues: BTreeMap<String, Vec<i64>> = BTreeMap::new();

            for bucket_start in Self::bucket_starts_covering(cov_start, cov_end, bucket) {
                let bucket_end = (bucket_start + bucket).min(cov_end);
                let local_start = bucket_start.rem_euclid(1440);
                let local_end = local_start + (bucket_end - bucket_start);

                let overlapping =
                    self.patterns_overlapping_bucket(patterns, &day, local_start, local_end);

                if overlapping.is_empty() {
                    issues
                        .entry(BucketIssueReason::NoPatterns.key())
                        .or_default()
                        .push(bucket_start);
                    if cov.priority.is_hard() {
                        self.emit_infeasible_marker(cov, &day_iso, bucket_start);
                    }
                    continue;
                }

                let mut assignable_members: Vec<&Member> = Vec::new();
                for m in &eligible {
                    let can = overlapping
                        .iter()
                        .any(|p| self.can_assign(&m.id, &p.id));
                    if can {
                        assignable_members.push(m);
                    }
                }

                if assignable_members.is_empty() {
                    issues
                        .entry(BucketIssueReason::NoAssignable.key())
                        .or_default()
                        .push(bucket_start);
                    if cov.priority.is_hard() {
                        self.emit_infeasible_marker(cov, &day_iso, bucket_start);
                    }
                    continue;
                }

                let excluded_removed: Vec<&Member> = assignable_members
                    .into_iter()
                    .filter(|m| {
                        !self
                            .reporter
                            .is_excluded(&m.id, &day_iso, bucket_start, bucket_end)
                    })
                    .collect();

                if excluded_removed.is_empty() {
                    issues
                        .entry(BucketIssueReason::MandatoryTimeOff.key())
                        .or_default()
                        .push(bucket_start);
                    if cov.priority.is_hard() {
                        self.emit_infeasible_marker(cov, &day_iso, bucket_start);
                    }
                    continue;
                }

                if (excluded_removed.len() as u32) < cov.target {
                    issues
                        .entry(BucketIssueReason::Insufficient(cov.target).key())
                        .or_default()
                        .push(bucket_start);
                    if cov.priority.is_hard() {
                        self.emit_infeasible_marker(cov, &day_iso, bucket_start);
                    }
                }

                let mut vars = BTreeSet::new();
                for m in &excluded_removed {
                    for p in &overlapping {
                        if self.can_assign(&m.id, &p.id) {
                            vars.insert(Self::assignment_name(&m.id, &p.id, &day));
                        }
                    }
                }
                let terms: Vec<Term> = vars.into_iter().map(Term::unit).collect();
                if terms.is_empty() {
                    continue;
                }

                let constraint_id = format!(
                    "coverage:{}:{}:{}",
                    cov.qualifier.key(),
                    day_iso,
                    bucket_start
                );

                if cov.priority.is_hard() {
                    self.add_linear(terms, Comparator::Ge, i64::from(cov.target));
                } else if let Some(penalty) = priority_to_penalty(cov.priority) {
                    self.add_soft_linear(
                        terms,
                        Comparator::Ge,
                        i64::from(cov.target),
                        penalty,
                        constraint_id.clone(),
                    );
                    self.track_constraint(TrackedConstraint {
                        id: constraint_id,
                        description: format!(
                            "{} coverage on {day_iso} at {bucket_start} min",
                            cov.qualifier.key()
                        ),
                        target: i64::from(cov.target),
                        comparator: Comparator::Ge,
                        day: Some(day_iso.clone()),
                        time_slot: Some((bucket_start, bucket_end)),
                        qualifier_key: Some(cov.qualifier.key()),
                        context: Vec::new(),
                        group: cov.group.clone(),
                    });
                }
            }

            self.report_collapsed_bucket_issues(cov, &day_iso, bucket, cov_end, issues);
        }

        Ok(())
    }

    fn emit_infeasible_marker(&mut self, cov: &CoverageRequirement, day_iso: &str, bucket_start: i64) {
        let marker = format!(
            "infeasible:coverage:{}:{}:{}",
            cov.qualifier.key(),
            day_iso,
            bucket_start
        );
        self.new_int_var(marker.clone(), 0, 0);
        self.add_linear(vec![Term::unit(marker)], Comparator::Ge, i64::from(cov.target));
    }

    fn report_coverage_error(
        &mut self,
        cov: &CoverageRequirement,
        day_iso: &str,
        time_slot: Option<String>,
    ) {
        let ctx = ItemContext::new()
            .with_day(day_iso)
            .with_time_slots(time_slot)
            .with_roles(cov.qualifier.sorted_roles().into_iter().map(str::to_string))
            .with_skills(cov.qualifier.sorted_skills().into_iter().map(str::to_string));
        self.reporter.report_error(
            "coverage",
            format!("no eligible members to satisfy {} coverage on {day_iso}", cov.qualifier.key()),
            ctx,
            cov.group.clone(),
        );
    }

    /// Collapses each issue's bucket-start set into contiguous ranges and
    /// emits one coverage error per "impossible" issue for a MANDATORY
    /// requirement, or tracks it as a soft constraint for any other
    /// priority (a non-mandatory shortfall is a violation, never a reason
    /// to fail compilation).
    fn report_collapsed_bucket_issues(
        &mut self,
        cov: &CoverageRequirement,
        day_iso: &str,
        bucket: i64,
        cov_end: i64,
        issues: BTreeMap<String, Vec<i64>>,
    ) {
        for (reason, mut starts) in issues {
            starts.sort_unstable();
            starts.dedup();
            let mut ranges: Vec<(i64, i64)> = Vec::new();
            for s in starts {
                let end = (s + bucket).min(cov_end);
                if let Some(last) = ranges.last_mut() {
                    if last.1 == s {
                        last.1 = end;
                        continue;
                    }
                }
                ranges.push((s, end));
            }
            let time_slots: Vec<String> = ranges
                .iter()
                .map(|(s, e)| format!("{}-{}", minutes_to_hhmm(*s), minutes_to_hhmm(*e)))
                .collect();

            if cov.priority.is_hard() {
                let ctx = ItemContext::new()
                    .with_day(day_iso)
                    .with_time_slots(time_slots)
                    .with_roles(cov.qualifier.sorted_roles().into_iter().map(str::to_string))
                    .with_skills(cov.qualifier.sorted_skills().into_iter().map(str::to_string));
                self.reporter.report_error(
                    format!("coverage:{reason}"),
                    format!(
                        "{} coverage on {day_iso} cannot be satisfied ({reason})",
                        cov.qualifier.key()
                    ),
                    ctx,
                    cov.group.clone(),
                );
            } else {
                let id = format!("coverage-warning:{}:{day_iso}:{reason}", cov.qualifier.key());
                self.reporter.track_constraint(TrackedConstraint {
                    id,
                    description: format!(
                        "{} coverage on {day_iso} cannot be satisfied ({reason})",
                        cov.qualifier.key()
                    ),
                    target: i64::from(cov.target),
                    comparator: Comparator::Ge,
                    day: Some(day_iso.to_string()),
                    time_slot: ranges.first().copied(),
                    qualifier_key: Some(cov.qualifier.key()),
                    context: time_slots,
                    group: cov.group.clone(),
                });
            }
        }
    }
}

fn minutes_to_hhmm(minutes: i64) -> String {
    let m = minutes.rem_euclid(1440);
    format!("{:02}:{:02}", m / 60, m % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shiftsat_core::model::{Qualifier, ShiftPattern};

    fn day(i: i64, date: (i32, u32, u32)) -> Day {
        Day {
            index: i,
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        }
    }

    fn horizon() -> Vec<Day> {
        (0..7)
            .map(|i| Day {
                index: i,
                date: NaiveDate::from_ymd_opt(2024, 2, 5).unwrap() + chrono::Duration::days(i),
            })
            .collect()
    }

    #[test]
    fn rejects_colon_in_member_id() {
        let cfg = BuilderConfig {
            members: vec![Member::new("al:ice")],
            ..Default::default()
        };
        let err = ModelBuilder::new(cfg).unwrap_err();
        assert!(matches!(err, ConfigError::IdContainsColon(_)));
    }

    #[test]
    fn rejects_invalid_bucket_size() {
        let cfg = BuilderConfig {
            bucket_minutes: 7,
            ..Default::default()
        };
        let err = ModelBuilder::new(cfg).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBucketSize(7)));
    }

    #[test]
    fn rejects_coverage_without_qualifier() {
        let cfg = BuilderConfig {
            coverage: vec![CoverageRequirement {
                day: NaiveDate::from_ymd_opt(2024, 2, 5).unwrap(),
                start_minutes: 0,
                end_minutes_raw: 60,
                target: 1,
                priority: Priority::Mandatory,
                qualifier: Qualifier::Roles {
                    roles: Default::default(),
                    skills: Default::default(),
                },
                group: None,
            }],
            ..Default::default()
        };
        assert!(matches!(
            ModelBuilder::new(cfg).unwrap_err(),
            ConfigError::CoverageWithoutQualifier
        ));
    }

    #[test]
    fn compile_is_idempotent() {
        let cfg = BuilderConfig {
            members: vec![Member::new("alice").role("staff")],
            patterns: vec![ShiftPattern::new("day", (8, 0), (16, 0))],
            days: vec![day(0, (2024, 2, 5))],
            ..Default::default()
        };
        let mut builder = ModelBuilder::new(cfg).unwrap();
        let first = builder.compile().unwrap().variables.len();
        let second = builder.compile().unwrap().variables.len();
        assert_eq!(first, second);
    }

    #[test]
    fn mandatory_coverage_with_no_eligible_members_marks_infeasible() {
        let cfg = BuilderConfig {
            members: vec![Member::new("alice").role("nurse")],
            patterns: vec![ShiftPattern::new("day", (8, 0), (16, 0))],
            days: vec![day(0, (2024, 2, 5))],
            coverage: vec![CoverageRequirement {
                day: NaiveDate::from_ymd_opt(2024, 2, 5).unwrap(),
                start_minutes: 480,
                end_minutes_raw: 960,
                target: 1,
                priority: Priority::Mandatory,
                qualifier: Qualifier::Roles {
                    roles: ["doctor".to_string()].into(),
                    skills: Default::default(),
                },
                group: None,
            }],
            ..Default::default()
        };
        let mut builder = ModelBuilder::new(cfg).unwrap();
        builder.compile().unwrap();
        assert!(!builder.can_solve());
        assert!(builder.reporter().has_errors());
    }

    #[test]
    fn high_priority_coverage_with_no_eligible_members_stays_solvable() {
        let cfg = BuilderConfig {
            members: vec![Member::new("alice").role("nurse")],
            patterns: vec![ShiftPattern::new("day", (8, 0), (16, 0))],
            days: vec![day(0, (2024, 2, 5))],
            coverage: vec![CoverageRequirement {
                day: NaiveDate::from_ymd_opt(2024, 2, 5).unwrap(),
                start_minutes: 480,
                end_minutes_raw: 960,
                target: 1,
                priority: Priority::High,
                qualifier: Qualifier::Roles {
                    roles: ["doctor".to_string()].into(),
                    skills: Default::default(),
                },
                group: None,
            }],
            ..Default::default()
        };
        let mut builder = ModelBuilder::new(cfg).unwrap();
        builder.compile().unwrap();
        assert!(builder.can_solve());
        assert!(!builder.reporter().has_errors());
        assert!(builder
            .reporter()
            .tracked_constraints()
            .iter()
            .any(|tc| tc.id.starts_with("coverage-warning:")));
    }

    #[test]
    fn fairness_variable_present_for_multiple_members() {
        let cfg = BuilderConfig {
            members: vec![
                Member::new("alice").role("staff"),
                Member::new("bob").role("staff"),
            ],
            patterns: vec![ShiftPattern::new("day", (8, 30), (17, 30)).allowed_role("staff")],
            days: horizon(),
            coverage: vec![],
            ..Default::default()
        };
        let mut builder = ModelBuilder::new(cfg).unwrap();
        let req = builder.compile().unwrap();
        assert!(req
            .variables
            .iter()
            .any(|v| v.name() == "fairness:max_assignments"));
    }

    #[test]
    fn determinism_repeated_build_same_variable_count() {
        let make = || {
            let cfg = BuilderConfig {
                members: vec![Member::new("alice").role("staff"), Member::new("bob").role("staff")],
                patterns: vec![ShiftPattern::new("day", (8, 30), (17, 30)).allowed_role("staff")],
                days: horizon(),
                ..Default::default()
            };
            let mut b = ModelBuilder::new(cfg).unwrap();
            b.compile().unwrap().variables.len()
        };
        assert_eq!(make(), make());
    }
}
