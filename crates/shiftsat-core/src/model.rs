//! Domain model: members, shift patterns, days, coverage requirements.
//!
//! These types describe the normalized input to the compiler. They carry no
//! compilation state; the compiler crate resolves them into variables and
//! constraints without mutating any of them.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type MemberId = String;
pub type PatternId = String;

/// Returns an error message fragment if `id` is unusable as an identifier.
///
/// IDs must not contain `:`, since `:` is the reserved separator in emitted
/// variable and constraint names.
pub fn validate_id(id: &str) -> Result<(), String> {
    if id.contains(':') {
        Err(format!("identifier {id:?} must not contain ':'"))
    } else if id.is_empty() {
        Err("identifier must not be empty".to_string())
    } else {
        Ok(())
    }
}

/// A member's pay: salaried (fixed weekly amount) or hourly (rate per hour).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pay {
    Salaried { weekly: Decimal, currency: String },
    Hourly { rate: Decimal, currency: String },
}

/// A scheduling-eligible person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub roles: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub skills: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pay: Option<Pay>,
}

impl Member {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            roles: BTreeSet::new(),
            skills: BTreeSet::new(),
            pay: None,
        }
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    pub fn skill(mut self, skill: impl Into<String>) -> Self {
        self.skills.insert(skill.into());
        self
    }

    pub fn pay(mut self, pay: Pay) -> Self {
        self.pay = Some(pay);
        self
    }
}

/// A reusable shift shape: a time-of-day window, optionally role- or
/// day-restricted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftPattern {
    pub id: PatternId,
    pub start_hour: u32,
    pub start_minute: u32,
    pub end_hour: u32,
    pub end_minute: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_roles: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_days: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ShiftPattern {
    pub fn new(id: impl Into<String>, start: (u32, u32), end: (u32, u32)) -> Self {
        Self {
            id: id.into(),
            start_hour: start.0,
            start_minute: start.1,
            end_hour: end.0,
            end_minute: end.1,
            allowed_roles: None,
            allowed_days: None,
            location: None,
        }
    }

    pub fn allowed_role(mut self, role: impl Into<String>) -> Self {
        self.allowed_roles
            .get_or_insert_with(BTreeSet::new)
            .insert(role.into());
        self
    }

    pub fn allowed_day(mut self, day: impl Into<String>) -> Self {
        self.allowed_days
            .get_or_insert_with(BTreeSet::new)
            .insert(day.into());
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Start-of-day minute offset.
    pub fn start_minutes(&self) -> i64 {
        crate::time::time_of_day_minutes(self.start_hour, self.start_minute)
    }

    /// Raw (un-normalized) end-of-day minute offset.
    pub fn end_minutes_raw(&self) -> i64 {
        crate::time::time_of_day_minutes(self.end_hour, self.end_minute)
    }

    /// End offset normalized against the start, following overnight
    /// wraparound (see [`crate::time::normalize_end_minutes`]).
    pub fn end_minutes_normalized(&self) -> i64 {
        crate::time::normalize_end_minutes(self.start_minutes(), self.end_minutes_raw())
    }

    pub fn is_overnight(&self) -> bool {
        self.end_minutes_normalized() > crate::time::MINUTES_PER_DAY
    }

    pub fn duration_minutes(&self) -> i64 {
        self.end_minutes_normalized() - self.start_minutes()
    }

    pub fn available_on(&self, day_of_week: &str) -> bool {
        match &self.allowed_days {
            Some(days) => days.contains(day_of_week),
            None => true,
        }
    }

    pub fn allows_role(&self, role: &str) -> bool {
        match &self.allowed_roles {
            Some(roles) => roles.contains(role),
            None => true,
        }
    }
}

/// One resolved day in the scheduling horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Day {
    pub index: i64,
    pub date: NaiveDate,
}

impl Day {
    pub fn day_of_week(&self) -> &'static str {
        crate::time::to_day_of_week(self.date)
    }

    pub fn offset_minutes(&self) -> i64 {
        crate::time::day_offset_minutes(self.index)
    }

    pub fn iso(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// Severity/weight class of a rule or coverage requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Mandatory,
}

impl Priority {
    pub fn is_hard(self) -> bool {
        matches!(self, Priority::Mandatory)
    }
}

/// Who may satisfy a coverage requirement: role set (OR) optionally AND'd
/// with a skill set, or a skill-only set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Qualifier {
    Roles {
        roles: BTreeSet<String>,
        #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
        skills: BTreeSet<String>,
    },
    Skills {
        skills: BTreeSet<String>,
    },
}

impl Qualifier {
    /// Sorted role tokens for deterministic id computation, empty if none.
    pub fn sorted_roles(&self) -> Vec<&str> {
        match self {
            Qualifier::Roles { roles, .. } => roles.iter().map(String::as_str).collect(),
            Qualifier::Skills { .. } => Vec::new(),
        }
    }

    pub fn sorted_skills(&self) -> Vec<&str> {
        match self {
            Qualifier::Roles { skills, .. } => skills.iter().map(String::as_str).collect(),
            Qualifier::Skills { skills } => skills.iter().map(String::as_str).collect(),
        }
    }

    pub fn matches(&self, member: &Member) -> bool {
        match self {
            Qualifier::Roles { roles, skills } => {
                (roles.is_empty() || member.roles.iter().any(|r| roles.contains(r)))
                    && skills.iter().all(|s| member.skills.contains(s))
            }
            Qualifier::Skills { skills } => skills.iter().all(|s| member.skills.contains(s)),
        }
    }

    /// A stable, opaque key for grouping by qualifier identity.
    pub fn key(&self) -> String {
        let roles = {
            let mut v = self.sorted_roles();
            v.sort_unstable();
            v.join(",")
        };
        let skills = {
            let mut v = self.sorted_skills();
            v.sort_unstable();
            v.join(",")
        };
        if roles.is_empty() {
            format!("skills:{}", if skills.is_empty() { "_" } else { &skills })
        } else {
            format!(
                "roles:{}:skills:{}",
                roles,
                if skills.is_empty() { "_" } else { &skills }
            )
        }
    }
}

/// A tag attached to errors/violations/passed items so a caller can
/// aggregate related diagnostics for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationGroup {
    pub key: String,
    pub title: String,
}

impl ValidationGroup {
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
        }
    }
}

/// A per-day staffing demand bound by a [`Qualifier`] and target count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageRequirement {
    pub day: NaiveDate,
    pub start_minutes: i64,
    pub end_minutes_raw: i64,
    pub target: u32,
    pub priority: Priority,
    pub qualifier: Qualifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<ValidationGroup>,
}

impl CoverageRequirement {
    pub fn end_minutes_normalized(&self) -> i64 {
        crate::time::normalize_end_minutes(self.start_minutes, self.end_minutes_raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_id_rejects_colon() {
        assert!(validate_id("alice:bob").is_err());
        assert!(validate_id("alice").is_ok());
    }

    #[test]
    fn validate_id_rejects_empty() {
        assert!(validate_id("").is_err());
    }

    #[test]
    fn member_builder() {
        let m = Member::new("alice").role("staff").skill("first-aid");
        assert_eq!(m.id, "alice");
        assert!(m.roles.contains("staff"));
        assert!(m.skills.contains("first-aid"));
    }

    #[test]
    fn shift_pattern_forward_duration() {
        let p = ShiftPattern::new("day", (8, 30), (17, 30));
        assert_eq!(p.start_minutes(), 510);
        assert_eq!(p.end_minutes_normalized(), 1050);
        assert_eq!(p.duration_minutes(), 540);
        assert!(!p.is_overnight());
    }

    #[test]
    fn shift_pattern_overnight_duration() {
        let p = ShiftPattern::new("night", (22, 0), (6, 0));
        assert!(p.is_overnight());
        assert_eq!(p.duration_minutes(), 480);
    }

    #[test]
    fn shift_pattern_allowed_days() {
        let p = ShiftPattern::new("weekend", (9, 0), (17, 0))
            .allowed_day("saturday")
            .allowed_day("sunday");
        assert!(p.available_on("saturday"));
        assert!(!p.available_on("monday"));
    }

    #[test]
    fn shift_pattern_unrestricted_days_available_everywhere() {
        let p = ShiftPattern::new("any", (9, 0), (17, 0));
        assert!(p.available_on("monday"));
    }

    #[test]
    fn qualifier_roles_or_skills_and() {
        let q = Qualifier::Roles {
            roles: ["nurse", "doctor"].iter().map(|s| s.to_string()).collect(),
            skills: ["first-aid"].iter().map(|s| s.to_string()).collect(),
        };
        let matching = Member::new("a").role("nurse").skill("first-aid");
        let wrong_role = Member::new("b").role("clerk").skill("first-aid");
        let missing_skill = Member::new("c").role("nurse");
        assert!(q.matches(&matching));
        assert!(!q.matches(&wrong_role));
        assert!(!q.matches(&missing_skill));
    }

    #[test]
    fn qualifier_skills_only_and() {
        let q = Qualifier::Skills {
            skills: ["cpr", "first-aid"].iter().map(|s| s.to_string()).collect(),
        };
        let both = Member::new("a").skill("cpr").skill("first-aid");
        let one = Member::new("b").skill("cpr");
        assert!(q.matches(&both));
        assert!(!q.matches(&one));
    }

    #[test]
    fn qualifier_key_is_order_independent() {
        let q1 = Qualifier::Roles {
            roles: ["b", "a"].iter().map(|s| s.to_string()).collect(),
            skills: BTreeSet::new(),
        };
        let q2 = Qualifier::Roles {
            roles: ["a", "b"].iter().map(|s| s.to_string()).collect(),
            skills: BTreeSet::new(),
        };
        assert_eq!(q1.key(), q2.key());
    }

    #[test]
    fn priority_hardness() {
        assert!(Priority::Mandatory.is_hard());
        assert!(!Priority::High.is_hard());
    }

    #[test]
    fn day_iso_and_day_of_week() {
        let day = Day {
            index: 2,
            date: NaiveDate::from_ymd_opt(2024, 2, 7).unwrap(),
        };
        assert_eq!(day.iso(), "2024-02-07");
        assert_eq!(day.day_of_week(), "wednesday");
        assert_eq!(day.offset_minutes(), 2880);
    }
}
