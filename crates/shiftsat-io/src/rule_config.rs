//! Serde-ready configuration for every built-in rule, and the conversion
//! into a live `Box<dyn Rule>` the model builder can compile.
//!
//! Each variant's fields mirror the corresponding rule struct in
//! `shiftsat_compiler::rules` field-for-field; this module exists only to
//! give those structs a `#[serde(tag = "type")]` home, since a trait object
//! has no single concrete shape `serde` could derive against directly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shiftsat_compiler::rules::{
    AssignTogether, AssignmentPriority, DayCostMultiplier, DayCostSurcharge, Direction,
    LocationPreference, MaxConsecutiveDays, MaxHoursDay, MaxHoursWeek, MaxShiftsDay,
    MinConsecutiveDays, MinHoursDay, MinHoursWeek, MinRestBetweenShifts, MinimizeCost,
    OvertimeDaily, OvertimeWeekly, Rule, TimeCostSurcharge, TimeOff,
};
use shiftsat_compiler::scope::{EntityScope, TimeScope};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleConfig {
    MaxHoursDay {
        members: EntityScope,
        days: TimeScope,
        max_hours: f64,
    },
    MinHoursDay {
        members: EntityScope,
        days: TimeScope,
        min_hours: f64,
    },
    MaxHoursWeek {
        members: EntityScope,
        days: TimeScope,
        max_hours: f64,
    },
    MinHoursWeek {
        members: EntityScope,
        days: TimeScope,
        min_hours: f64,
    },
    MaxShiftsDay {
        members: EntityScope,
        days: TimeScope,
        max_shifts: u32,
    },
    MaxConsecutiveDays {
        members: EntityScope,
        days: TimeScope,
        max_days: u32,
    },
    MinConsecutiveDays {
        members: EntityScope,
        days: TimeScope,
        min_days: u32,
    },
    MinRestBetweenShifts {
        members: EntityScope,
        min_rest_hours: f64,
    },
    AssignmentPriority {
        members: EntityScope,
        patterns: Vec<String>,
        days: TimeScope,
        direction: Direction,
    },
    LocationPreference {
        members: EntityScope,
        location: String,
        days: TimeScope,
        direction: Direction,
    },
    TimeOff {
        members: EntityScope,
        days: TimeScope,
        #[serde(default)]
        window: Option<(i64, i64)>,
    },
    AssignTogether {
        member_a: String,
        member_b: String,
        patterns: Vec<String>,
    },
    MinimizeCost,
    DayCostMultiplier {
        members: EntityScope,
        days: TimeScope,
        multiplier: f64,
    },
    DayCostSurcharge {
        members: EntityScope,
        days: TimeScope,
        amount: Decimal,
    },
    TimeCostSurcharge {
        members: EntityScope,
        window: (i64, i64),
        amount: Decimal,
    },
    OvertimeDaily {
        members: EntityScope,
        days: TimeScope,
        threshold_hours: f64,
        rate_per_hour: Decimal,
    },
    OvertimeWeekly {
        members: EntityScope,
        days: TimeScope,
        threshold_hours: f64,
        rate_per_hour: Decimal,
    },
}

impl RuleConfig {
    pub fn into_rule(self) -> Box<dyn Rule> {
        match self {
            RuleConfig::MaxHoursDay {
                members,
                days,
                max_hours,
            } => Box::new(MaxHoursDay {
                members,
                days,
                max_hours,
            }),
            RuleConfig::MinHoursDay {
                members,
                days,
                min_hours,
            } => Box::new(MinHoursDay {
                members,
                days,
                min_hours,
            }),
            RuleConfig::MaxHoursWeek {
                members,
                days,
                max_hours,
            } => Box::new(MaxHoursWeek {
                members,
                days,
                max_hours,
            }),
            RuleConfig::MinHoursWeek {
                members,
                days,
                min_hours,
            } => Box::new(MinHoursWeek {
                members,
                days,
                min_hours,
            }),
            RuleConfig::MaxShiftsDay {
                members,
                days,
                max_shifts,
            } => Box::new(MaxShiftsDay {
                members,
                days,
                max_shifts,
            }),
            RuleConfig::MaxConsecutiveDays {
                members,
                days,
                max_days,
            } => Box::new(MaxConsecutiveDays {
                members,
                days,
                max_days,
            }),
            RuleConfig::MinConsecutiveDays {
                members,
                days,
                min_days,
            } => Box::new(MinConsecutiveDays {
                members,
                days,
                min_days,
            }),
            RuleConfig::MinRestBetweenShifts {
                members,
                min_rest_hours,
            } => Box::new(MinRestBetweenShifts {
                members,
                min_rest_hours,
            }),
            RuleConfig::AssignmentPriority {
                members,
                patterns,
                days,
                direction,
            } => Box::new(AssignmentPriority {
                members,
                patterns,
                days,
                direction,
            }),
            RuleConfig::LocationPreference {
                members,
                location,
                days,
                direction,
            } => Box::new(LocationPreference {
                members,
                location,
                days,
                direction,
            }),
            RuleConfig::TimeOff {
                members,
                days,
                window,
            } => Box::new(TimeOff {
                members,
                days,
                window,
            }),
            RuleConfig::AssignTogether {
                member_a,
                member_b,
                patterns,
            } => Box::new(AssignTogether {
                member_a,
                member_b,
                patterns,
            }),
            RuleConfig::MinimizeCost => Box::new(MinimizeCost),
            RuleConfig::DayCostMultiplier {
                members,
                days,
                multiplier,
            } => Box::new(DayCostMultiplier {
                members,
                days,
                multiplier,
            }),
            RuleConfig::DayCostSurcharge {
                members,
                days,
                amount,
            } => Box::new(DayCostSurcharge {
                members,
                days,
                amount,
            }),
            RuleConfig::TimeCostSurcharge {
                members,
                window,
                amount,
            } => Box::new(TimeCostSurcharge {
                members,
                window,
                amount,
            }),
            RuleConfig::OvertimeDaily {
                members,
                days,
                threshold_hours,
                rate_per_hour,
            } => Box::new(OvertimeDaily {
                members,
                days,
                threshold_hours,
                rate_per_hour,
            }),
            RuleConfig::OvertimeWeekly {
                members,
                days,
                threshold_hours,
                rate_per_hour,
            } => Box::new(OvertimeWeekly {
                members,
                days,
                threshold_hours,
                rate_per_hour,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_hours_day_round_trips_through_json() {
        let cfg = RuleConfig::MaxHoursDay {
            members: EntityScope::None,
            days: TimeScope::None,
            max_hours: 8.0,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: RuleConfig = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, RuleConfig::MaxHoursDay { max_hours, .. } if max_hours == 8.0));
    }

    #[test]
    fn minimize_cost_has_no_fields() {
        let json = r#"{"type":"minimize_cost"}"#;
        let cfg: RuleConfig = serde_json::from_str(json).unwrap();
        assert!(matches!(cfg, RuleConfig::MinimizeCost));
    }

    #[test]
    fn into_rule_produces_correct_rule_name() {
        let cfg = RuleConfig::MinRestBetweenShifts {
            members: EntityScope::None,
            min_rest_hours: 10.0,
        };
        let rule = cfg.into_rule();
        assert_eq!(rule.name(), "min-rest-between-shifts");
    }
}
