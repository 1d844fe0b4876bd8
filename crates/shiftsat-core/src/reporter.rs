//! The Validation Reporter: accumulates errors, soft-constraint
//! violations, passed items, and coverage-exclusion windows with stable,
//! content-derived identifiers.
//!
//! The reporter is owned by the model builder for the compile lifetime;
//! rule compilers only ever see a borrowed handle. It never mutates itself
//! outside of the `report_*`/`track_constraint`/`exclude_from_coverage`
//! calls rules make through the builder API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constraint::Comparator;
use crate::model::ValidationGroup;

/// Context attached to a report item for stable-id computation and for
/// rendering actionable messages to a caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub time_slots: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
}

impl ItemContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_day(mut self, day: impl Into<String>) -> Self {
        self.day = Some(day.into());
        self
    }

    pub fn with_time_slot(mut self, slot: impl Into<String>) -> Self {
        self.time_slots.push(slot.into());
        self
    }

    pub fn with_time_slots(mut self, slots: impl IntoIterator<Item = String>) -> Self {
        self.time_slots.extend(slots);
        self
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = String>) -> Self {
        self.roles.extend(roles);
        self
    }

    pub fn with_skills(mut self, skills: impl IntoIterator<Item = String>) -> Self {
        self.skills.extend(skills);
        self
    }
}

fn joined_sorted_lowercase(field: &str, tokens: &[String]) -> String {
    if tokens.is_empty() {
        return "_".to_string();
    }
    let _ = field;
    let mut sorted: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
    sorted.sort_unstable();
    sorted.join(",")
}

/// Computes the deterministic id described by the wire schema:
/// `<category>:<type>:<day|'_'>:<timeSlots,…|'_'>:<roles,…|'_'>:<skills,…|'_'>`.
pub fn stable_item_id(category: &str, kind: &str, ctx: &ItemContext) -> String {
    let day = ctx.day.as_deref().unwrap_or("_").to_lowercase();
    format!(
        "{category}:{kind}:{day}:{}:{}:{}",
        joined_sorted_lowercase("time_slots", &ctx.time_slots),
        joined_sorted_lowercase("roles", &ctx.roles),
        joined_sorted_lowercase("skills", &ctx.skills),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Error,
    Violation,
    Passed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportItem {
    pub id: String,
    pub category: ItemCategory,
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<ValidationGroup>,
    pub context: ItemContext,
}

/// Metadata for a soft constraint whose satisfaction will be checked after
/// the solver responds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedConstraint {
    pub id: String,
    pub description: String,
    pub target: i64,
    pub comparator: Comparator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_slot: Option<(i64, i64)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier_key: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<ValidationGroup>,
}

/// A soft constraint violation reported back by the solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftViolation {
    pub constraint_id: String,
    pub violation_amount: i64,
    pub target_value: i64,
    pub actual_value: i64,
}

/// A (member, day, optional time-of-day window) exclusion: the member does
/// not count toward coverage in the overlapping portion of the day.
#[derive(Debug, Clone, PartialEq)]
pub struct ExclusionWindow {
    pub member_id: String,
    pub day: String,
    /// `None` excludes the whole day.
    pub window: Option<(i64, i64)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    Passed,
    Partial,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub key: String,
    pub title: String,
    pub passed: usize,
    pub violated: usize,
    pub error: usize,
    pub status: GroupStatus,
}

const UNGROUPED_KEY: &str = "_ungrouped";

#[derive(Debug, Default)]
pub struct ValidationReporter {
    errors: Vec<ReportItem>,
    violations: Vec<ReportItem>,
    passed: Vec<ReportItem>,
    exclusions: Vec<ExclusionWindow>,
    tracked: Vec<TrackedConstraint>,
    tracked_by_id: BTreeMap<String, usize>,
    next_solver_error_seq: u64,
}

impl ValidationReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error with a content-derived stable id.
    pub fn report_error(
        &mut self,
        kind: impl Into<String>,
        message: impl Into<String>,
        ctx: ItemContext,
        group: Option<ValidationGroup>,
    ) {
        let kind = kind.into();
        let id = stable_item_id("error", &kind, &ctx);
        self.errors.push(ReportItem {
            id,
            category: ItemCategory::Error,
            kind,
            message: message.into(),
            group,
            context: ctx,
        });
    }

    /// Records a solver-level error. These use a sequential id, since they
    /// describe a single solve attempt rather than a reproducible logical
    /// condition.
    pub fn report_solver_error(&mut self, message: impl Into<String>) {
        let id = format!("error:solver:{}", self.next_solver_error_seq);
        self.next_solver_error_seq += 1;
        self.errors.push(ReportItem {
            id,
            category: ItemCategory::Error,
            kind: "solver".to_string(),
            message: message.into(),
            group: None,
            context: ItemContext::new(),
        });
    }

    pub fn track_constraint(&mut self, tc: TrackedConstraint) {
        let idx = self.tracked.len();
        self.tracked_by_id.insert(tc.id.clone(), idx);
        self.tracked.push(tc);
    }

    pub fn exclude_from_coverage(
        &mut self,
        member_id: impl Into<String>,
        day: impl Into<String>,
        window: Option<(i64, i64)>,
    ) {
        self.exclusions.push(ExclusionWindow {
            member_id: member_id.into(),
            day: day.into(),
            window,
        });
    }

    /// Whether `member_id` is excluded from coverage on `day` during
    /// `[start, end)`.
    pub fn is_excluded(&self, member_id: &str, day: &str, start: i64, end: i64) -> bool {
        self.exclusions.iter().any(|ex| {
            ex.member_id == member_id
                && ex.day == day
                && match ex.window {
                    None => true,
                    Some((ws, we)) => crate::time::ranges_overlap(ws, we, start, end),
                }
        })
    }

    /// Joins solver soft-violations against tracked constraints, emitting a
    /// violation report item per hit and a passed item for every tracked
    /// constraint that was not hit.
    pub fn analyze_solution(&mut self, soft_violations: &[SoftViolation]) {
        let mut hit: BTreeMap<String, &SoftViolation> = BTreeMap::new();
        for sv in soft_violations {
            hit.insert(sv.constraint_id.clone(), sv);
        }
        for tc in &self.tracked {
            let ctx = ItemContext {
                day: tc.day.clone(),
                time_slots: tc
                    .time_slot
                    .map(|(s, e)| vec![format!("{s}-{e}")])
                    .unwrap_or_default(),
                roles: Vec::new(),
                skills: tc
                    .qualifier_key
                    .clone()
                    .map(|k| vec![k])
                    .unwrap_or_default(),
            };
            if let Some(sv) = hit.get(&tc.id) {
                self.violations.push(ReportItem {
                    id: format!("violation:{}", tc.id),
                    category: ItemCategory::Violation,
                    kind: tc.id.clone(),
                    message: format!(
                        "{}: expected {} {:?}, got {} (off by {})",
                        tc.description, tc.target, tc.comparator, sv.actual_value, sv.violation_amount
                    ),
                    group: tc.group.clone(),
                    context: ctx,
                });
            } else {
                self.passed.push(ReportItem {
                    id: format!("passed:{}", tc.id),
                    category: ItemCategory::Passed,
                    kind: tc.id.clone(),
                    message: tc.description.clone(),
                    group: tc.group.clone(),
                    context: ctx,
                });
            }
        }
    }

    /// Appends a pre-computed report item (used by rule `validate` hooks,
    /// which compute their own ids from domain-specific context).
    pub fn report_item(&mut self, item: ReportItem) {
        match item.category {
            ItemCategory::Error => self.errors.push(item),
            ItemCategory::Violation => self.violations.push(item),
            ItemCategory::Passed => self.passed.push(item),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ReportItem] {
        &self.errors
    }

    pub fn violations(&self) -> &[ReportItem] {
        &self.violations
    }

    pub fn passed(&self) -> &[ReportItem] {
        &self.passed
    }

    pub fn exclusions(&self) -> &[ExclusionWindow] {
        &self.exclusions
    }

    pub fn tracked_constraints(&self) -> &[TrackedConstraint] {
        &self.tracked
    }

    /// Groups all items by [`ValidationGroup::key`] (a sentinel group for
    /// ungrouped items) and computes a per-group status.
    pub fn summarize(&self) -> Vec<GroupSummary> {
        let mut groups: BTreeMap<String, (String, usize, usize, usize)> = BTreeMap::new();

        let mut bump = |group: &Option<ValidationGroup>, slot: usize| {
            let (key, title) = match group {
                Some(g) => (g.key.clone(), g.title.clone()),
                None => (UNGROUPED_KEY.to_string(), "Ungrouped".to_string()),
            };
            let entry = groups.entry(key).or_insert((title, 0, 0, 0));
            match slot {
                0 => entry.1 += 1,
                1 => entry.2 += 1,
                _ => entry.3 += 1,
            }
        };

        for item in &self.passed {
            bump(&item.group, 0);
        }
        for item in &self.violations {
            bump(&item.group, 1);
        }
        for item in &self.errors {
            bump(&item.group, 2);
        }

        groups
            .into_iter()
            .map(|(key, (title, passed, violated, error))| {
                let status = if error > 0 {
                    GroupStatus::Failed
                } else if violated > 0 {
                    GroupStatus::Partial
                } else {
                    GroupStatus::Passed
                };
                GroupSummary {
                    key,
                    title,
                    passed,
                    violated,
                    error,
                    status,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_id_is_order_independent() {
        let ctx_a = ItemContext::new()
            .with_day("2024-02-01")
            .with_time_slots(vec!["2024-02-01".into(), "2024-02-02".into()])
            .with_roles(vec!["alice".into(), "bob".into()]);
        let ctx_b = ItemContext::new()
            .with_day("2024-02-01")
            .with_time_slots(vec!["2024-02-02".into(), "2024-02-01".into()])
            .with_roles(vec!["bob".into(), "alice".into()]);
        assert_eq!(
            stable_item_id("violation", "rule:max-hours-week", &ctx_a),
            stable_item_id("violation", "rule:max-hours-week", &ctx_b)
        );
    }

    #[test]
    fn stable_id_absent_fields_render_underscore() {
        let ctx = ItemContext::new();
        let id = stable_item_id("error", "coverage", &ctx);
        assert_eq!(id, "error:coverage:_:_:_:_");
    }

    #[test]
    fn report_error_and_has_errors() {
        let mut r = ValidationReporter::new();
        assert!(!r.has_errors());
        r.report_error("coverage", "no eligible members", ItemContext::new(), None);
        assert!(r.has_errors());
        assert_eq!(r.errors().len(), 1);
    }

    #[test]
    fn solver_errors_use_sequential_ids() {
        let mut r = ValidationReporter::new();
        r.report_solver_error("infeasible");
        r.report_solver_error("timeout");
        assert_eq!(r.errors()[0].id, "error:solver:0");
        assert_eq!(r.errors()[1].id, "error:solver:1");
    }

    #[test]
    fn exclusion_window_whole_day() {
        let mut r = ValidationReporter::new();
        r.exclude_from_coverage("alice", "2024-02-05", None);
        assert!(r.is_excluded("alice", "2024-02-05", 0, 10));
        assert!(!r.is_excluded("bob", "2024-02-05", 0, 10));
    }

    #[test]
    fn exclusion_window_partial_overlap() {
        let mut r = ValidationReporter::new();
        r.exclude_from_coverage("alice", "2024-02-05", Some((600, 720)));
        assert!(r.is_excluded("alice", "2024-02-05", 650, 700));
        assert!(!r.is_excluded("alice", "2024-02-05", 720, 800));
    }

    #[test]
    fn analyze_solution_splits_hit_and_not_hit() {
        let mut r = ValidationReporter::new();
        r.track_constraint(TrackedConstraint {
            id: "coverage:roles:nurse:_:2024-02-05:540".into(),
            description: "nurse coverage".into(),
            target: 2,
            comparator: Comparator::Ge,
            day: Some("2024-02-05".into()),
            time_slot: Some((540, 600)),
            qualifier_key: Some("roles:nurse:skills:_".into()),
            context: vec![],
            group: None,
        });
        r.track_constraint(TrackedConstraint {
            id: "coverage:roles:nurse:_:2024-02-06:540".into(),
            description: "nurse coverage".into(),
            target: 2,
            comparator: Comparator::Ge,
            day: Some("2024-02-06".into()),
            time_slot: Some((540, 600)),
            qualifier_key: None,
            context: vec![],
            group: None,
        });
        r.analyze_solution(&[SoftViolation {
            constraint_id: "coverage:roles:nurse:_:2024-02-05:540".into(),
            violation_amount: 1,
            target_value: 2,
            actual_value: 1,
        }]);
        assert_eq!(r.violations().len(), 1);
        assert_eq!(r.passed().len(), 1);
    }

    #[test]
    fn summarize_status_escalation() {
        let mut r = ValidationReporter::new();
        let g = ValidationGroup::new("fairness", "Fairness");
        r.report_item(ReportItem {
            id: "p1".into(),
            category: ItemCategory::Passed,
            kind: "x".into(),
            message: "ok".into(),
            group: Some(g.clone()),
            context: ItemContext::new(),
        });
        let summary = r.summarize();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].status, GroupStatus::Passed);

        r.report_item(ReportItem {
            id: "v1".into(),
            category: ItemCategory::Violation,
            kind: "x".into(),
            message: "bad".into(),
            group: Some(g.clone()),
            context: ItemContext::new(),
        });
        let summary = r.summarize();
        assert_eq!(summary[0].status, GroupStatus::Partial);

        r.report_item(ReportItem {
            id: "e1".into(),
            category: ItemCategory::Error,
            kind: "x".into(),
            message: "broken".into(),
            group: Some(g),
            context: ItemContext::new(),
        });
        let summary = r.summarize();
        assert_eq!(summary[0].status, GroupStatus::Failed);
    }

    #[test]
    fn summarize_ungrouped_items_get_sentinel_group() {
        let mut r = ValidationReporter::new();
        r.report_error("coverage", "no members", ItemContext::new(), None);
        let summary = r.summarize();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].key, "_ungrouped");
    }
}
