//! Scope Resolver: expands entity and time scopes over a member/day
//! universe.
//!
//! `EntityScope` and `TimeScope` are deliberately disjoint tagged unions
//! rather than one config object that mixes entity and time fields.
//! Resolution is a pure data transformation; neither type holds any
//! compiled state.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shiftsat_core::model::{Day, Member};

/// Which members a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EntityScope {
    Members(BTreeSet<String>),
    Roles(BTreeSet<String>),
    Skills(BTreeSet<String>),
    None,
}

/// Resolves an `EntityScope` against the full member universe.
///
/// Returned members are sorted by id, ascending, matching the crate-wide
/// determinism requirement that every set whose contents affect emitted
/// names is iterated in sorted order.
pub fn resolve_members<'a>(scope: &EntityScope, universe: &'a [Member]) -> Vec<&'a Member> {
    let mut out: Vec<&Member> = match scope {
        EntityScope::Members(ids) => universe.iter().filter(|m| ids.contains(&m.id)).collect(),
        EntityScope::Roles(roles) => universe
            .iter()
            .filter(|m| m.roles.iter().any(|r| roles.contains(r)))
            .collect(),
        EntityScope::Skills(skills) => universe
            .iter()
            .filter(|m| skills.iter().all(|s| m.skills.contains(s)))
            .collect(),
        EntityScope::None => universe.iter().collect(),
    };
    out.sort_by(|a, b| a.id.cmp(&b.id));
    out
}

/// A named recurring window described by month/day bounds (inclusive),
/// independent of year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringPeriod {
    pub name: String,
    pub start_month: u32,
    pub start_day: u32,
    pub end_month: u32,
    pub end_day: u32,
}

impl RecurringPeriod {
    /// Whether `(month, day)` falls within this period.
    ///
    /// When `start_month > end_month` the window wraps the year boundary
    /// (e.g. Nov 15 .. Feb 10): a date matches if it is on or after the
    /// start bound, or on or before the end bound. See DESIGN.md's
    /// resolution of the `recurringPeriods` year-wrap Open Question.
    pub fn contains(&self, month: u32, day: u32) -> bool {
        let start = (self.start_month, self.start_day);
        let end = (self.end_month, self.end_day);
        let probe = (month, day);
        if self.start_month <= self.end_month {
            probe >= start && probe <= end
        } else {
            probe >= start || probe <= end
        }
    }
}

/// Which days a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TimeScope {
    DateRange { start: NaiveDate, end: NaiveDate },
    SpecificDates(BTreeSet<NaiveDate>),
    DayOfWeek(BTreeSet<String>),
    RecurringPeriods(Vec<RecurringPeriod>),
    None,
}

/// Resolves a `TimeScope` against the scheduling horizon.
///
/// `horizon` is assumed already sorted by day index ascending; the result
/// preserves that order.
pub fn resolve_active_days<'a>(scope: &TimeScope, horizon: &'a [Day]) -> Vec<&'a Day> {
    use chrono::Datelike;
    match scope {
        TimeScope::DateRange { start, end } => horizon
            .iter()
            .filter(|d| d.date >= *start && d.date <= *end)
            .collect(),
        TimeScope::SpecificDates(dates) => {
            horizon.iter().filter(|d| dates.contains(&d.date)).collect()
        }
        TimeScope::DayOfWeek(names) => horizon
            .iter()
            .filter(|d| names.contains(d.day_of_week()))
            .collect(),
        TimeScope::RecurringPeriods(periods) => horizon
            .iter()
            .filter(|d| {
                periods
                    .iter()
                    .any(|p| p.contains(d.date.month(), d.date.day()))
            })
            .collect(),
        TimeScope::None => horizon.iter().collect(),
    }
}
