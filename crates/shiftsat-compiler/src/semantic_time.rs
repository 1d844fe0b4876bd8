//! Semantic-Time Resolver: maps named, variant-bearing time windows
//! (and per-day count variants) to concrete per-day values.
//!
//! Precedence across variants is always `dates > dayOfWeek > default`. A
//! coverage requirement whose semantic time has no matching variant *and*
//! no default contributes nothing for that day.

use std::collections::BTreeSet;

use shiftsat_core::model::{CoverageRequirement, Day, Priority, Qualifier, ValidationGroup};

/// Picks the highest-precedence matching entry for `day` out of
/// `variants`, falling back to `default`.
fn resolve_with_precedence<'a, T>(
    default: Option<&'a T>,
    variants: &'a [(T, Option<&'a BTreeSet<String>>, Option<&'a BTreeSet<chrono::NaiveDate>>)],
    day: &Day,
) -> Option<&'a T> {
    if let Some((value, _, _)) = variants
        .iter()
        .find(|(_, _, dates)| dates.map_or(false, |d| d.contains(&day.date)))
    {
        return Some(value);
    }
    if let Some((value, dow, _)) = variants
        .iter()
        .find(|(_, dow, _)| dow.map_or(false, |d| d.contains(day.day_of_week())))
    {
        return Some(value);
    }
    default
}

/// One variant of a [`SemanticTime`]: a time window active on specific
/// dates or days-of-week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeVariant {
    pub start: i64,
    pub end_raw: i64,
    pub day_of_week: Option<BTreeSet<String>>,
    pub dates: Option<BTreeSet<chrono::NaiveDate>>,
}

/// A named time window, optionally varying by day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticTime {
    pub name: String,
    pub default: Option<(i64, i64)>,
    pub variants: Vec<TimeVariant>,
}

impl SemanticTime {
    /// Resolves the `(start, end_raw)` window active on `day`, or `None`
    /// if no variant matches and there is no default.
    pub fn resolve(&self, day: &Day) -> Option<(i64, i64)> {
        let variant_tuples: Vec<_> = self
            .variants
            .iter()
            .map(|v| ((v.start, v.end_raw), v.day_of_week.as_ref(), v.dates.as_ref()))
            .collect();
        resolve_with_precedence(self.default.as_ref(), &variant_tuples, day).copied()
    }
}

/// One day-scoped count override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountVariant {
    pub count: u32,
    pub day_of_week: Option<BTreeSet<String>>,
    pub dates: Option<BTreeSet<chrono::NaiveDate>>,
}

/// A target headcount, optionally varying by day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableCount {
    pub default: u32,
    pub variants: Vec<CountVariant>,
}

impl VariableCount {
    pub fn resolve(&self, day: &Day) -> u32 {
        let variant_tuples: Vec<_> = self
            .variants
            .iter()
            .map(|v| (v.count, v.day_of_week.as_ref(), v.dates.as_ref()))
            .collect();
        resolve_with_precedence(Some(&self.default), &variant_tuples, day).copied().unwrap_or(self.default)
    }
}

/// A coverage requirement described in terms of a named semantic time
/// rather than a concrete per-day window.
#[derive(Debug, Clone)]
pub struct SemanticCoverageSpec {
    pub semantic_time: SemanticTime,
    pub count: VariableCount,
    pub priority: Priority,
    pub qualifier: Qualifier,
    pub group: Option<ValidationGroup>,
}

/// Resolves a [`SemanticCoverageSpec`] into concrete, per-day
/// [`CoverageRequirement`]s over the horizon. Days whose semantic time has
/// no matching variant and no default are skipped entirely.
pub fn resolve_semantic_coverage(
    spec: &SemanticCoverageSpec,
    horizon: &[Day],
) -> Vec<CoverageRequirement> {
    let mut out = Vec::new();
    for day in horizon {
        let Some((start, end_raw)) = spec.semantic_time.resolve(day) else {
            continue;
        };
        let target = spec.count.resolve(day);
        out.push(CoverageRequirement {
            day: day.date,
            start_minutes: start,
            end_minutes_raw: end_raw,
            target,
            priority: spec.priority,
            qualifier: spec.qualifier.clone(),
            group: spec.group.clone(),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn horizon() -> Vec<Day> {
        (0..7)
            .map(|i| Day {
                index: i,
                date: NaiveDate::from_ymd_opt(2024, 2, 5).unwrap() + chrono::Duration::days(i),
            })
            .collect()
    }

    #[test]
    fn resolve_uses_default_when_no_variant_matches() {
        let st = SemanticTime {
            name: "business_hours".into(),
            default: Some((540, 1020)),
            variants: vec![],
        };
        let d = horizon()[0].clone();
        assert_eq!(st.resolve(&d), Some((540, 1020)));
    }

    #[test]
    fn resolve_day_of_week_beats_default() {
        let st = SemanticTime {
            name: "business_hours".into(),
            default: Some((540, 1020)),
            variants: vec![TimeVariant {
                start: 480,
                end_raw: 720,
                day_of_week: Some(["monday".to_string()].into()),
                dates: None,
            }],
        };
        let monday = &horizon()[0];
        assert_eq!(monday.day_of_week(), "monday");
        assert_eq!(st.resolve(monday), Some((480, 720)));
        let tuesday = &horizon()[1];
        assert_eq!(st.resolve(tuesday), Some((540, 1020)));
    }

    #[test]
    fn resolve_dates_beats_day_of_week() {
        let target_day = horizon()[0].date;
        let st = SemanticTime {
            name: "business_hours".into(),
            default: Some((540, 1020)),
            variants: vec![
                TimeVariant {
                    start: 480,
                    end_raw: 720,
                    day_of_week: Some(["monday".to_string()].into()),
                    dates: None,
                },
                TimeVariant {
                    start: 0,
                    end_raw: 1440,
                    day_of_week: None,
                    dates: Some([target_day].into()),
                },
            ],
        };
        let monday = &horizon()[0];
        assert_eq!(st.resolve(monday), Some((0, 1440)));
    }

    #[test]
    fn resolve_none_when_no_variant_and_no_default() {
        let st = SemanticTime {
            name: "holiday_hours".into(),
            default: None,
            variants: vec![TimeVariant {
                start: 600,
                end_raw: 660,
                day_of_week: Some(["sunday".to_string()].into()),
                dates: None,
            }],
        };
        let monday = &horizon()[0];
        assert_eq!(st.resolve(monday), None);
    }

    #[test]
    fn semantic_coverage_skips_unmatched_days() {
        let spec = SemanticCoverageSpec {
            semantic_time: SemanticTime {
                name: "sunday_only".into(),
                default: None,
                variants: vec![TimeVariant {
                    start: 600,
                    end_raw: 660,
                    day_of_week: Some(["sunday".to_string()].into()),
                    dates: None,
                }],
            },
            count: VariableCount {
                default: 1,
                variants: vec![],
            },
            priority: Priority::Mandatory,
            qualifier: Qualifier::Roles {
                roles: ["staff".to_string()].into(),
                skills: Default::default(),
            },
            group: None,
        };
        let resolved = resolve_semantic_coverage(&spec, &horizon());
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].day.format("%A").to_string(), "Sunday");
    }

    #[test]
    fn count_variant_precedence_matches_time_variant_precedence() {
        let count = VariableCount {
            default: 2,
            variants: vec![CountVariant {
                count: 5,
                day_of_week: Some(["monday".to_string()].into()),
                dates: None,
            }],
        };
        let monday = &horizon()[0];
        let tuesday = &horizon()[1];
        assert_eq!(count.resolve(monday), 5);
        assert_eq!(count.resolve(tuesday), 2);
    }
}
