//! Cost-objective rule compilers.
//!
//! `MinimizeCost` must run first (the builder hoists it via its rule name,
//! see `builder::compile_uncached`): it computes a normalization factor
//! from the member roster's pay rates and activates [`CostContext`], then
//! emits the base per-assignment pay cost. Every other rule in this module
//! only adds to the objective when `cost_context().active` is set, so they
//! degrade to no-ops in a model with no pay data.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use shiftsat_core::model::{Day, Member, Pay};

use crate::builder::{CostContext, ModelBuilder};
use crate::scope::{resolve_active_days, resolve_members, EntityScope, TimeScope};

use super::Rule;

/// Integer scale applied to normalized Decimal costs before they become
/// objective coefficients, so sub-unit pay differences still compete with
/// `builder::ASSIGNMENT_BASE`-scale tie-breaking terms.
pub const COST_SCALE: i64 = 100;

/// An hourly-equivalent rate for `member`, or `None` if they carry no pay
/// data (cost rules skip such members rather than guessing).
fn hourly_rate(member: &Member) -> Option<Decimal> {
    match &member.pay {
        Some(Pay::Hourly { rate, .. }) => Some(*rate),
        Some(Pay::Salaried { weekly, .. }) => Some(*weekly / Decimal::from(40)),
        None => None,
    }
}

/// Converts a normalized cost amount into a bounded integer coefficient,
/// rounding to the nearest integer and dropping (returning `None` for)
/// amounts that round to zero.
pub fn scaled_coeff(raw: Decimal, normalization_factor: i64) -> Option<i64> {
    if normalization_factor <= 0 {
        return None;
    }
    let scaled = raw * Decimal::from(COST_SCALE) / Decimal::from(normalization_factor);
    let rounded = scaled.round().to_i64()?;
    if rounded == 0 {
        None
    } else {
        Some(rounded)
    }
}

/// `minimize-cost`: activates pay-based costing for every other rule in
/// this module and emits the base per-assignment pay penalty.
pub struct MinimizeCost;

impl Rule for MinimizeCost {
    fn name(&self) -> &str {
        "minimize-cost"
    }

    fn compile(&self, builder: &mut ModelBuilder) -> Result<(), String> {
        let members = builder.members().to_vec();
        let patterns = builder.shift_patterns().to_vec();
        let days = builder.days().to_vec();

        // Normalization factor: the maximum raw cost of any single
        // assignment, i.e. a salaried member's weekly pay, or an hourly
        // member's rate times the longest pattern they could ever work.
        let max_pattern_hours = patterns
            .iter()
            .map(|p| Decimal::from(p.duration_minutes()) / Decimal::from(60))
            .fold(Decimal::ZERO, Decimal::max);
        let max_cost = members
            .iter()
            .filter_map(|m| match &m.pay {
                Some(Pay::Salaried { weekly, .. }) => Some(*weekly),
                Some(Pay::Hourly { rate, .. }) => Some(*rate * max_pattern_hours),
                None => None,
            })
            .fold(Decimal::ZERO, Decimal::max);

        if max_cost <= Decimal::ZERO {
            builder.set_cost_context(CostContext {
                normalization_factor: 0,
                active: false,
            });
            return Ok(());
        }

        let normalization_factor = max_cost.round().to_i64().unwrap_or(1).max(1);
        builder.set_cost_context(CostContext {
            normalization_factor,
            active: true,
        });

        for m in &members {
            let Some(rate) = hourly_rate(m) else { continue };
            for p in &patterns {
                if !builder.can_assign(&m.id, &p.id) {
                    continue;
                }
                let hours = Decimal::from(p.duration_minutes()) / Decimal::from(60);
                let cost = rate * hours;
                let Some(coeff) = scaled_coeff(cost, normalization_factor) else {
                    continue;
                };
                for d in &days {
                    if !builder.pattern_available_on_day(&p.id, d) {
                        continue;
                    }
                    let var = builder.assignment_var(&m.id, &p.id, d);
                    builder.add_penalty(var, coeff);
                }
            }
        }
        Ok(())
    }
}

/// `day-cost-multiplier`: scales the pay cost of assignments on `days` by
/// `multiplier` (e.g. a weekend differential), emitting the *delta* over
/// the base cost already added by [`MinimizeCost`].
pub struct DayCostMultiplier {
    pub members: EntityScope,
    pub days: TimeScope,
    pub multiplier: f64,
}

impl Rule for DayCostMultiplier {
    fn name(&self) -> &str {
        "day-cost-multiplier"
    }

    fn compile(&self, builder: &mut ModelBuilder) -> Result<(), String> {
        let ctx = builder.cost_context();
        if !ctx.active {
            return Ok(());
        }
        let delta_factor = Decimal::try_from(self.multiplier - 1.0).unwrap_or(Decimal::ZERO);
        if delta_factor == Decimal::ZERO {
            return Ok(());
        }

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
            let Some(rate) = hourly_rate(m) else { continue };
            for p in &patterns {
                if !builder.can_assign(&m.id, &p.id) {
                    continue;
                }
                let hours = Decimal::from(p.duration_minutes()) / Decimal::from(60);
                let delta = rate * hours * delta_factor;
                let Some(coeff) = scaled_coeff(delta, ctx.normalization_factor) else {
                    continue;
                };
                for d in &days {
                    if !builder.pattern_available_on_day(&p.id, d) {
                        continue;
                    }
                    let var = builder.assignment_var(&m.id, &p.id, d);
                    builder.add_penalty(var, coeff);
                }
            }
        }
        Ok(())
    }
}

/// `day-cost-surcharge`: adds a flat per-assignment surcharge on `days`
/// (e.g. a holiday bonus), independent of worked hours.
pub struct DayCostSurcharge {
    pub members: EntityScope,
    pub days: TimeScope,
    pub amount: Decimal,
}

impl Rule for DayCostSurcharge {
    fn name(&self) -> &str {
        "day-cost-surcharge"
    }

    fn compile(&self, builder: &mut ModelBuilder) -> Result<(), String> {
        let ctx = builder.cost_context();
        if !ctx.active {
            return Ok(());
        }
        let Some(coeff) = scaled_coeff(self.amount, ctx.normalization_factor) else {
            return Ok(());
        };

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
            for p in &patterns {
                if !builder.can_assign(&m.id, &p.id) {
                    continue;
                }
                for d in &days {
                    if !builder.pattern_available_on_day(&p.id, d) {
                        continue;
                    }
                    let var = builder.assignment_var(&m.id, &p.id, d);
                    builder.add_penalty(var, coeff);
                }
            }
        }
        Ok(())
    }
}

/// `time-cost-surcharge`: adds a flat per-assignment surcharge for shifts
/// whose pattern overlaps `[window_start, window_end)` day-local minutes
/// (e.g. a night differential).
pub struct TimeCostSurcharge {
    pub members: EntityScope,
    pub window: (i64, i64),
    pub amount: Decimal,
}

impl Rule for TimeCostSurcharge {
    fn name(&self) -> &str {
        "time-cost-surcharge"
    }

    fn compile(&self, builder: &mut ModelBuilder) -> Result<(), String> {
        let ctx = builder.cost_context();
        if !ctx.active {
            return Ok(());
        }
        let Some(coeff) = scaled_coeff(self.amount, ctx.normalization_factor) else {
            return Ok(());
        };

        let members: Vec<Member> = resolve_members(&self.members, builder.members())
            .into_iter()
            .cloned()
            .collect();
        let days = builder.days().to_vec();
        let (ws, we) = self.window;
        let matching_patterns: Vec<String> = builder
            .shift_patterns()
            .iter()
            .filter(|p| {
                let s = p.start_minutes();
                let e = p.end_minutes_normalized();
                shiftsat_core::time::ranges_overlap(s, e, ws, we)
                    || (e > 1440 && shiftsat_core::time::ranges_overlap(0, e - 1440, ws, we))
            })
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

/// `overtime-day`: a minimized slack variable bounded below by
/// `worked_minutes - threshold`, penalized by `rate_per_hour`. Since the
/// objective only ever pushes the slack down, and the linear bound only
/// ever pushes it up to the true excess, the solver settles it at exactly
/// `max(0, worked - threshold)`, the standard CP-SAT "hinge" encoding,
/// used because the wire schema has no native max/multiplication primitive.
pub struct OvertimeDaily {
    pub members: EntityScope,
    pub days: TimeScope,
    pub threshold_hours: f64,
    pub rate_per_hour: Decimal,
}

impl Rule for OvertimeDaily {
    fn name(&self) -> &str {
        "overtime-daily"
    }

    fn compile(&self, builder: &mut ModelBuilder) -> Result<(), String> {
        let ctx = builder.cost_context();
        if !ctx.active {
            return Ok(());
        }
        let threshold_minutes = (self.threshold_hours * 60.0).round() as i64;
        let Some(coeff_per_minute) =
            scaled_coeff(self.rate_per_hour / Decimal::from(60), ctx.normalization_factor)
        else {
            return Ok(());
        };

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
                        terms.push(shiftsat_core::constraint::Term::new(
                            builder.assignment_var(&m.id, &p.id, d),
                            p.duration_minutes(),
                        ));
                    }
                }
                if terms.is_empty() {
                    continue;
                }
                let max_minutes: i64 = terms.iter().map(|t| t.coeff).sum();
                let slack_max = (max_minutes - threshold_minutes).max(0);
                let slack = builder.new_int_var(
                    format!("overtime:{}:{}", m.id, d.iso()),
                    0,
                    slack_max,
                );
                let mut bound_terms = terms;
                bound_terms.push(shiftsat_core::constraint::Term::new(slack.clone(), -1));
                builder.add_linear(
                    bound_terms,
                    shiftsat_core::constraint::Comparator::Le,
                    threshold_minutes,
                );
                builder.add_penalty(slack, coeff_per_minute);
            }
        }
        Ok(())
    }
}

/// `overtime-week`: the weekly analogue of [`OvertimeDaily`].
pub struct OvertimeWeekly {
    pub members: EntityScope,
    pub days: TimeScope,
    pub threshold_hours: f64,
    pub rate_per_hour: Decimal,
}

impl Rule for OvertimeWeekly {
    fn name(&self) -> &str {
        "overtime-weekly"
    }

    fn compile(&self, builder: &mut ModelBuilder) -> Result<(), String> {
        let ctx = builder.cost_context();
        if !ctx.active {
            return Ok(());
        }
        let threshold_minutes = (self.threshold_hours * 60.0).round() as i64;
        let Some(coeff_per_minute) =
            scaled_coeff(self.rate_per_hour / Decimal::from(60), ctx.normalization_factor)
        else {
            return Ok(());
        };

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
            let mut by_week: std::collections::BTreeMap<i64, Vec<shiftsat_core::constraint::Term>> =
                Default::default();
            for d in &days {
                let week = builder.week_key(d);
                for p in &patterns {
                    if builder.can_assign(&m.id, &p.id) && builder.pattern_available_on_day(&p.id, d)
                    {
                        by_week.entry(week).or_default().push(
                            shiftsat_core::constraint::Term::new(
                                builder.assignment_var(&m.id, &p.id, d),
                                p.duration_minutes(),
                            ),
                        );
                    }
                }
            }
            for (week, terms) in by_week {
                if terms.is_empty() {
                    continue;
                }
                let max_minutes: i64 = terms.iter().map(|t| t.coeff).sum();
                let slack_max = (max_minutes - threshold_minutes).max(0);
                let slack = builder.new_int_var(
                    format!("overtime:{}:week{week}", m.id),
                    0,
                    slack_max,
                );
                let mut bound_terms = terms;
                bound_terms.push(shiftsat_core::constraint::Term::new(slack.clone(), -1));
                builder.add_linear(
                    bound_terms,
                    shiftsat_core::constraint::Comparator::Le,
                    threshold_minutes,
                );
                builder.add_penalty(slack, coeff_per_minute);
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
    use std::str::FromStr;

    fn day(i: i64, date: (i32, u32, u32)) -> Day {
        Day {
            index: i,
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        }
    }

    #[test]
    fn minimize_cost_activates_context_when_pay_present() {
        let cfg = BuilderConfig {
            members: vec![Member::new("alice")
                .role("staff")
                .pay(Pay::Hourly {
                    rate: Decimal::from_str("20").unwrap(),
                    currency: "USD".to_string(),
                })],
            patterns: vec![ShiftPattern::new("morning", (8, 0), (12, 0)).allowed_role("staff")],
            days: vec![day(0, (2024, 2, 5))],
            rules: vec![Box::new(MinimizeCost)],
            ..Default::default()
        };
        let mut builder = ModelBuilder::new(cfg).unwrap();
        builder.compile().unwrap();
        assert!(builder.cost_context().active);
    }

    #[test]
    fn minimize_cost_stays_inactive_without_pay() {
        let cfg = BuilderConfig {
            members: vec![Member::new("alice").role("staff")],
            patterns: vec![ShiftPattern::new("morning", (8, 0), (12, 0)).allowed_role("staff")],
            days: vec![day(0, (2024, 2, 5))],
            rules: vec![Box::new(MinimizeCost)],
            ..Default::default()
        };
        let mut builder = ModelBuilder::new(cfg).unwrap();
        builder.compile().unwrap();
        assert!(!builder.cost_context().active);
    }

    #[test]
    fn normalization_factor_uses_weekly_salary_and_real_pattern_duration() {
        let cfg = BuilderConfig {
            members: vec![
                Member::new("alice").role("staff").pay(Pay::Salaried {
                    weekly: Decimal::from_str("5000").unwrap(),
                    currency: "USD".to_string(),
                }),
                Member::new("bob").role("staff").pay(Pay::Hourly {
                    rate: Decimal::from_str("20").unwrap(),
                    currency: "USD".to_string(),
                }),
            ],
            patterns: vec![ShiftPattern::new("morning", (8, 0), (12, 0)).allowed_role("staff")],
            days: vec![day(0, (2024, 2, 5))],
            rules: vec![Box::new(MinimizeCost)],
            ..Default::default()
        };
        let mut builder = ModelBuilder::new(cfg).unwrap();
        builder.compile().unwrap();
        // Bob's hourly cost for a 4-hour pattern (20 * 4 = 80) is dwarfed by
        // Alice's weekly salary, so the factor is the salary itself, not a
        // synthetic weekly/40*24 figure.
        assert_eq!(builder.cost_context().normalization_factor, 5000);
    }

    #[test]
    fn scaled_coeff_drops_amounts_that_round_to_zero() {
        assert_eq!(scaled_coeff(Decimal::from_str("0.0001").unwrap(), 10_000), None);
    }

    #[test]
    fn overtime_daily_is_noop_without_active_cost_context() {
        let cfg = BuilderConfig {
            members: vec![Member::new("alice").role("staff")],
            patterns: vec![ShiftPattern::new("morning", (0, 0), (12, 0)).allowed_role("staff")],
            days: vec![day(0, (2024, 2, 5))],
            rules: vec![Box::new(OvertimeDaily {
                members: EntityScope::None,
                days: TimeScope::None,
                threshold_hours: 8.0,
                rate_per_hour: Decimal::from_str("30").unwrap(),
            })],
            ..Default::default()
        };
        let mut builder = ModelBuilder::new(cfg).unwrap();
        let req = builder.compile().unwrap();
        assert!(!req.variables.iter().any(|v| v.name().starts_with("overtime:")));
    }
}
