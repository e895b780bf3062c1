//! Scope resolver.
//!
//! Decides how a scoring pass maps onto stat rows: a daily pass reads one
//! row per asset; a weekly pass is always the sum of the seven daily trend
//! scores of the ISO week plus week-level context bonuses from the week's
//! last available snapshot. There is no independent weekly formula.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::domain::{AssetDailyStat, AssetType, ScoringBreakdown, ScoringScope};

use super::trend;

/// The seven calendar dates of an ISO week, Monday first.
///
/// Returns `None` for a week number the year does not have.
pub fn iso_week_dates(iso_year: i32, iso_week: u32) -> Option<[NaiveDate; 7]> {
    let monday = NaiveDate::from_isoywd_opt(iso_year, iso_week, Weekday::Mon)?;
    let mut dates = [monday; 7];
    for (i, slot) in dates.iter_mut().enumerate() {
        *slot = monday + chrono::Duration::days(i as i64);
    }
    Some(dates)
}

/// ISO year/week of a calendar date (ISO-8601, Thursday-anchored).
pub fn iso_week_of(date: NaiveDate) -> (i32, u32) {
    let iso = date.iso_week();
    (iso.year(), iso.week())
}

/// The weekly scope containing a date.
pub fn weekly_scope_of(date: NaiveDate) -> ScoringScope {
    let (iso_year, iso_week) = iso_week_of(date);
    ScoringScope::Weekly { iso_year, iso_week }
}

/// Score one asset over a scope, given whatever daily stat rows exist for
/// the scope's dates (missing days simply contribute nothing).
///
/// Daily: the single day's trend score. Weekly: the sum of each available
/// day's trend score, then week-level context bonuses computed from the last
/// available snapshot (rank movement, market-share tier, streak length).
pub fn score_asset(
    asset_type: AssetType,
    scope: ScoringScope,
    stats: &[AssetDailyStat],
) -> ScoringBreakdown {
    match scope {
        ScoringScope::Daily { date } => stats
            .iter()
            .find(|s| s.stat_date == date)
            .map(|s| trend::score(asset_type, s))
            .unwrap_or_default(),
        ScoringScope::Weekly { iso_year, iso_week } => {
            let mut week_stats: Vec<&AssetDailyStat> = stats
                .iter()
                .filter(|s| iso_week_of(s.stat_date) == (iso_year, iso_week))
                .collect();
            week_stats.sort_by_key(|s| s.stat_date);

            let mut breakdown = ScoringBreakdown::default();
            for stat in &week_stats {
                breakdown.absorb(&trend::score(asset_type, stat));
            }
            if let Some(last) = week_stats.last() {
                apply_week_context(&mut breakdown, last);
            }
            breakdown
        }
    }
}

/// Week-level context bonuses from the week's closing snapshot.
fn apply_week_context(breakdown: &mut ScoringBreakdown, last: &AssetDailyStat) {
    let momentum = trend::momentum_bonus(last.previous_rank, last.current_rank);
    breakdown.adjustment(
        "Week Momentum Bonus",
        super::breakdown::rank_change_label(last.previous_rank, last.current_rank),
        momentum,
    );
    breakdown.adjustment(
        "Week Market Share Bonus",
        format!("{:.1}% share at week close", last.market_share_percent),
        trend::market_share_bonus(last.market_share_percent),
    );
    let streak = trend::streak_score(last.streak_days);
    breakdown.adjustment(
        "Week Streak Bonus",
        super::breakdown::streak_label(last.streak_days),
        streak.bonus_points,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(date: NaiveDate, orders: i64) -> AssetDailyStat {
        AssetDailyStat {
            asset_id: 1,
            asset_type: AssetType::Product,
            stat_date: date,
            order_count: orders,
            current_rank: 0,
            previous_rank: 0,
            consistency_score: 0.0,
            velocity_score: 0.0,
            streak_days: 0,
            market_share_percent: 0.0,
            trend_multiplier: Some(1.0),
            volume_1d: 0.0,
            volume_7d: 0.0,
            volume_14d: 0.0,
        }
    }

    #[test]
    fn test_iso_week_dates_span_monday_to_sunday() {
        let dates = iso_week_dates(2026, 11).unwrap();
        assert_eq!(dates[0].weekday(), Weekday::Mon);
        assert_eq!(dates[6].weekday(), Weekday::Sun);
        assert_eq!(dates[6] - dates[0], chrono::Duration::days(6));
        // Week 1 of an ISO year contains the year's first Thursday.
        let w1 = iso_week_dates(2026, 1).unwrap();
        assert!(w1.iter().any(|d| d.weekday() == Weekday::Thu && d.year() == 2026));
    }

    #[test]
    fn test_iso_week_year_boundary() {
        // 2026-01-01 falls in ISO week 1 of 2026; 2027-01-01 falls in ISO
        // week 53 of 2026.
        assert_eq!(iso_week_of(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()), (2026, 1));
        assert_eq!(iso_week_of(NaiveDate::from_ymd_opt(2027, 1, 1).unwrap()), (2026, 53));
    }

    #[test]
    fn test_daily_scope_misses_score_zero() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let scope = ScoringScope::Daily { date };
        let b = score_asset(AssetType::Product, scope, &[]);
        assert_eq!(b.total, 0.0);
        assert!(b.components.is_empty());
    }

    #[test]
    fn test_weekly_is_sum_of_dailies_plus_context() {
        // Monday and Tuesday of ISO week 11, 2026.
        let dates = iso_week_dates(2026, 11).unwrap();
        let stats = vec![stat(dates[0], 10), stat(dates[1], 5)];

        let daily_total: f64 = stats
            .iter()
            .map(|s| trend::score(AssetType::Product, s).total)
            .sum();

        let scope = ScoringScope::Weekly {
            iso_year: 2026,
            iso_week: 11,
        };
        let b = score_asset(AssetType::Product, scope, &stats);
        // Context bonuses are all zero for these stats, so the weekly total
        // is exactly the sum of the daily trend totals.
        assert_eq!(b.total, daily_total);
        assert!(b.is_consistent());
    }

    #[test]
    fn test_week_context_uses_last_snapshot() {
        let dates = iso_week_dates(2026, 11).unwrap();
        let mut early = stat(dates[0], 0);
        early.market_share_percent = 20.0; // must be ignored for context
        let mut last = stat(dates[4], 0);
        last.market_share_percent = 9.0;
        last.streak_days = 3;
        last.previous_rank = 6;
        last.current_rank = 2;

        let scope = ScoringScope::Weekly {
            iso_year: 2026,
            iso_week: 11,
        };
        let b = score_asset(AssetType::Product, scope, &[last.clone(), early.clone()]);

        // Week context from the Friday snapshot: share 9% → 15, streak 3 →
        // 6, momentum ↑4 → 32. Daily layers contribute their own lines too.
        assert!(b.bonuses.iter().any(|l| l.label == "Week Market Share Bonus" && l.points == 15.0));
        assert!(b.bonuses.iter().any(|l| l.label == "Week Streak Bonus" && l.points == 6.0));
        assert!(b.bonuses.iter().any(|l| l.label == "Week Momentum Bonus" && l.points == 32.0));
        assert!(b.is_consistent());
    }

    #[test]
    fn test_stats_outside_week_excluded() {
        let dates = iso_week_dates(2026, 11).unwrap();
        let next_week = dates[6] + chrono::Duration::days(1);
        let stats = vec![stat(dates[0], 10), stat(next_week, 99)];
        let scope = ScoringScope::Weekly {
            iso_year: 2026,
            iso_week: 11,
        };
        let b = score_asset(AssetType::Product, scope, &stats);
        let expected = trend::score(AssetType::Product, &stats[0]).total;
        assert_eq!(b.total, expected);
    }
}
