//! Team aggregator.
//!
//! Resolves a team's lineup slots to scored assets, applies the scarcity
//! multiplier per slot, sums the position subtotal and layers the
//! composition bonuses on top, capped at 100 points applied in fixed
//! priority order. Output is a complete, unpersisted `TeamScore`; the
//! postgres adapter owns the upsert.

use std::collections::HashMap;

use crate::domain::{
    AssetDailyStat, AssetType, BrandRatingStat, Lineup, LineupSlot, ScorePeriod,
    ScoringBreakdown, ScoringScope, SlotScoreContext, TeamScore,
};

use super::{brand, scarcity, scope, trend};

/// Total team-bonus cap. Bonuses are applied in priority order; once the
/// cap is exhausted later bonuses are truncated to the remainder.
pub const TEAM_BONUS_CAP: f64 = 100.0;

const PERFECT_WEEK: f64 = 50.0;
const POSITION_DIVERSITY: f64 = 30.0;
const MOMENTUM_MASTER: f64 = 20.0;
const HOT_STREAK_SQUAD: f64 = 25.0;
const TREND_EXPLOSION: f64 = 30.0;
const DARK_HORSE: f64 = 20.0;
const CONSISTENCY_KING: f64 = 25.0;
const STEADY_CLIMB: f64 = 20.0;
const MARKET_LEADER: f64 = 20.0;

/// Diversity window: each archetype group's share of the team total.
const DIVERSITY_MIN_SHARE: f64 = 0.18;
const DIVERSITY_MAX_SHARE: f64 = 0.32;

/// Everything the aggregator needs for one populated slot, resolved by the
/// caller from the stat/lineup/reference collaborators.
#[derive(Debug, Clone)]
pub struct SlotData {
    pub slot: LineupSlot,
    /// Daily stat rows available inside the scoring scope. May be empty
    /// (missing data scores the slot zero, never an error).
    pub stats: Vec<AssetDailyStat>,
    /// Rating stats for brand-typed assets.
    pub brand_stat: Option<BrandRatingStat>,
    /// Total population of the asset's archetype, for scarcity.
    pub pool_size: i64,
}

/// Score a full lineup for one scope.
pub fn aggregate(lineup: &Lineup, scope_sel: ScoringScope, slots: &[SlotData]) -> TeamScore {
    let mut team_breakdown = ScoringBreakdown::default();
    let mut slot_points = HashMap::new();
    let mut asset_points = HashMap::new();
    let mut slot_context = Vec::with_capacity(slots.len());

    for data in slots {
        let scored = score_slot(scope_sel, data);
        slot_points.insert(data.slot.slot, scored.points);
        *asset_points.entry(data.slot.asset_id).or_insert(0.0) += scored.points;
        team_breakdown.component(
            format!("{}", data.slot.slot),
            format!("asset #{}", data.slot.asset_id),
            scored.points,
        );
        slot_context.push(scored.context);
    }

    apply_team_bonuses(&mut team_breakdown, scope_sel, &slot_context, slots);

    let bonus_total = team_breakdown.bonus_total();
    let penalty_total = team_breakdown.penalty_total();
    TeamScore {
        id: None,
        team_id: lineup.team_id,
        period: ScorePeriod::from_scope(scope_sel),
        slot_points,
        asset_points,
        subtotal: team_breakdown.subtotal,
        bonus_total,
        penalty_total,
        grand_total: team_breakdown.total,
        breakdown: team_breakdown,
        slot_context,
    }
}

struct ScoredSlot {
    points: f64,
    context: SlotScoreContext,
}

/// Score one slot: the asset's breakdown for the scope, then scarcity.
fn score_slot(scope_sel: ScoringScope, data: &SlotData) -> ScoredSlot {
    let mut breakdown = if data.slot.asset_type == AssetType::Brand {
        data.brand_stat
            .as_ref()
            .map(brand::score)
            .unwrap_or_default()
    } else {
        scope::score_asset(data.slot.asset_type, scope_sel, &data.stats)
    };

    let raw = breakdown.total;
    let points = scarcity::apply(&mut breakdown, raw, data.pool_size);

    let last_stat = latest_stat(data);
    let (current_rank, previous_rank) = match (&last_stat, &data.brand_stat) {
        (Some(s), _) => (s.current_rank, s.previous_rank),
        (None, Some(b)) => (b.current_rank, b.previous_rank),
        (None, None) => (0, 0),
    };
    let rank_gain = if current_rank > 0 && previous_rank > 0 {
        previous_rank - current_rank
    } else {
        0
    };

    ScoredSlot {
        points,
        context: SlotScoreContext {
            slot: data.slot.slot,
            asset_id: data.slot.asset_id,
            points,
            rank_gain,
            current_rank,
            streak_days: last_stat.as_ref().map_or(0, |s| s.streak_days),
            trend_multiplier: last_stat
                .as_ref()
                .map_or(1.0, trend::effective_trend_multiplier),
            market_share_percent: last_stat.as_ref().map_or(0.0, |s| s.market_share_percent),
        },
    }
}

fn latest_stat(data: &SlotData) -> Option<AssetDailyStat> {
    data.stats.iter().max_by_key(|s| s.stat_date).cloned()
}

/// Composition bonuses, fixed priority order, capped at `TEAM_BONUS_CAP`.
fn apply_team_bonuses(
    breakdown: &mut ScoringBreakdown,
    scope_sel: ScoringScope,
    context: &[SlotScoreContext],
    slots: &[SlotData],
) {
    if context.is_empty() {
        return;
    }
    let mut remaining = TEAM_BONUS_CAP;
    let award = |breakdown: &mut ScoringBreakdown,
                     remaining: &mut f64,
                     label: &str,
                     condition: String,
                     points: f64| {
        if *remaining <= 0.0 {
            return;
        }
        let applied = points.min(*remaining);
        *remaining -= applied;
        let condition = if applied < points {
            format!("{condition} (truncated at cap)")
        } else {
            condition
        };
        breakdown.adjustment(label, condition, applied);
    };

    let points: Vec<f64> = context.iter().map(|c| c.points).collect();
    let subtotal: f64 = points.iter().sum();

    // Perfect Week: every populated slot at or above the median slot score.
    let median = median_of(&points);
    if points.iter().all(|&p| p >= median) {
        award(
            breakdown,
            &mut remaining,
            "Perfect Week",
            format!("all slots ≥ median {median:.1}"),
            PERFECT_WEEK,
        );
    }

    // Position Diversity: each archetype group carries a balanced share.
    if subtotal > 0.0 && diversity_balanced(context, slots, subtotal) {
        award(
            breakdown,
            &mut remaining,
            "Position Diversity",
            "all groups within 18-32% of total".to_string(),
            POSITION_DIVERSITY,
        );
    }

    // Momentum Master: three or more assets gained rank this period.
    let gainers = context.iter().filter(|c| c.rank_gain > 0).count();
    if gainers >= 3 {
        award(
            breakdown,
            &mut remaining,
            "Momentum Master",
            format!("{gainers} assets climbed"),
            MOMENTUM_MASTER,
        );
    }

    match scope_sel {
        ScoringScope::Daily { .. } => {
            let streaking = context.iter().filter(|c| c.streak_days >= 3).count();
            if streaking >= 2 {
                award(
                    breakdown,
                    &mut remaining,
                    "Hot Streak Squad",
                    format!("{streaking} assets on 3+ day streaks"),
                    HOT_STREAK_SQUAD,
                );
            }
            if let Some(c) = context.iter().find(|c| c.trend_multiplier >= 3.0) {
                award(
                    breakdown,
                    &mut remaining,
                    "Trend Explosion",
                    format!("asset #{} at ×{:.2} trend", c.asset_id, c.trend_multiplier),
                    TREND_EXPLOSION,
                );
            }
            if let Some(c) = context
                .iter()
                .find(|c| c.rank_gain >= 10 && (1..=10).contains(&c.current_rank))
            {
                award(
                    breakdown,
                    &mut remaining,
                    "Dark Horse",
                    format!("asset #{} jumped {} into top 10", c.asset_id, c.rank_gain),
                    DARK_HORSE,
                );
            }
        }
        ScoringScope::Weekly { .. } => {
            if subtotal > 0.0 {
                let sd = std_dev(&points);
                if sd <= 0.08 * subtotal {
                    award(
                        breakdown,
                        &mut remaining,
                        "Consistency King",
                        format!("σ {sd:.1} ≤ 8% of total"),
                        CONSISTENCY_KING,
                    );
                }
            }
            let climbers = context.iter().filter(|c| c.rank_gain >= 2).count();
            if climbers >= 2 {
                award(
                    breakdown,
                    &mut remaining,
                    "Steady Climb",
                    format!("{climbers} assets gained 2+ ranks"),
                    STEADY_CLIMB,
                );
            }
            if let Some(c) = context.iter().find(|c| c.market_share_percent >= 10.0) {
                award(
                    breakdown,
                    &mut remaining,
                    "Market Leader",
                    format!("asset #{} at {:.1}% share", c.asset_id, c.market_share_percent),
                    MARKET_LEADER,
                );
            }
        }
    }
}

fn median_of(points: &[f64]) -> f64 {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

fn std_dev(points: &[f64]) -> f64 {
    let n = points.len() as f64;
    let mean = points.iter().sum::<f64>() / n;
    let variance = points.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// Diversity check over the four archetype groups, with the flex slot folded
/// into the archetype of the asset that fills it.
fn diversity_balanced(context: &[SlotScoreContext], slots: &[SlotData], subtotal: f64) -> bool {
    let mut groups: HashMap<&'static str, f64> = HashMap::new();
    for (c, data) in context.iter().zip(slots) {
        let group = match Lineup::effective_type(&data.slot) {
            AssetType::Manufacturer => "manufacturer",
            AssetType::Cultivar | AssetType::Product => "cultivation",
            AssetType::Pharmacy => "retail",
            AssetType::Brand => "brand",
        };
        *groups.entry(group).or_insert(0.0) += c.points;
    }
    ["manufacturer", "cultivation", "retail", "brand"]
        .iter()
        .all(|g| {
            let share = groups.get(g).copied().unwrap_or(0.0) / subtotal;
            (DIVERSITY_MIN_SHARE..=DIVERSITY_MAX_SHARE).contains(&share)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SlotKind;
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 9).unwrap()
    }

    fn stat(asset_id: i64, asset_type: AssetType, orders: i64) -> AssetDailyStat {
        AssetDailyStat {
            asset_id,
            asset_type,
            stat_date: date(),
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

    fn slot(kind: SlotKind, asset_id: i64, asset_type: AssetType, orders: i64) -> SlotData {
        SlotData {
            slot: LineupSlot {
                slot: kind,
                asset_id,
                asset_type,
            },
            stats: vec![stat(asset_id, asset_type, orders)],
            brand_stat: None,
            pool_size: 100, // neutral scarcity
        }
    }

    fn lineup() -> Lineup {
        Lineup {
            team_id: 7,
            slots: vec![],
        }
    }

    fn daily() -> ScoringScope {
        ScoringScope::Daily { date: date() }
    }

    #[test]
    fn test_empty_lineup_scores_zero() {
        let score = aggregate(&lineup(), daily(), &[]);
        assert_eq!(score.grand_total, 0.0);
        assert_eq!(score.subtotal, 0.0);
        assert!(score.breakdown.bonuses.is_empty());
    }

    #[test]
    fn test_subtotal_is_sum_of_post_scarcity_slots() {
        let slots = vec![
            slot(SlotKind::Manufacturer1, 1, AssetType::Manufacturer, 10),
            slot(SlotKind::Product1, 2, AssetType::Product, 10),
        ];
        let score = aggregate(&lineup(), daily(), &slots);
        // mfg: 50 orders + 25 trend = 75; product: 40 + 20 = 60. Neutral
        // scarcity at pool 100.
        assert_eq!(score.slot_points[&SlotKind::Manufacturer1], 75.0);
        assert_eq!(score.slot_points[&SlotKind::Product1], 60.0);
        assert_eq!(score.subtotal, 135.0);
        assert!(score.breakdown.is_consistent());
    }

    #[test]
    fn test_missing_stats_score_slot_zero() {
        let mut s = slot(SlotKind::Cultivar1, 3, AssetType::Cultivar, 10);
        s.stats.clear();
        let score = aggregate(&lineup(), daily(), &[s]);
        assert_eq!(score.subtotal, 0.0);
        assert_eq!(score.slot_points[&SlotKind::Cultivar1], 0.0);
    }

    #[test]
    fn test_scarcity_logged_per_slot() {
        let mut s = slot(SlotKind::Manufacturer1, 1, AssetType::Manufacturer, 10);
        s.pool_size = 400; // dampening floor 0.65
        let score = aggregate(&lineup(), daily(), &[s]);
        // raw 75 × 0.65 = 48.75
        assert_eq!(score.slot_points[&SlotKind::Manufacturer1], 48.75);
        assert_eq!(score.subtotal, 48.75);
    }

    #[test]
    fn test_perfect_week_on_equal_slots() {
        let slots = vec![
            slot(SlotKind::Manufacturer1, 1, AssetType::Manufacturer, 10),
            slot(SlotKind::Manufacturer2, 2, AssetType::Manufacturer, 10),
        ];
        let score = aggregate(&lineup(), daily(), &slots);
        assert!(score
            .breakdown
            .bonuses
            .iter()
            .any(|l| l.label == "Perfect Week" && l.points == 50.0));
    }

    #[test]
    fn test_momentum_master() {
        let mut slots = vec![
            slot(SlotKind::Manufacturer1, 1, AssetType::Manufacturer, 10),
            slot(SlotKind::Cultivar1, 2, AssetType::Cultivar, 1),
            slot(SlotKind::Product1, 3, AssetType::Product, 1),
        ];
        for s in &mut slots {
            s.stats[0].previous_rank = 8;
            s.stats[0].current_rank = 5;
        }
        let score = aggregate(&lineup(), daily(), &slots);
        assert!(score
            .breakdown
            .bonuses
            .iter()
            .any(|l| l.label == "Momentum Master" && l.points == 20.0));
    }

    #[test]
    fn test_trend_explosion_and_dark_horse() {
        let mut s = slot(SlotKind::Product1, 3, AssetType::Product, 5);
        s.stats[0].trend_multiplier = Some(3.5);
        s.stats[0].previous_rank = 18;
        s.stats[0].current_rank = 6;
        let score = aggregate(&lineup(), daily(), &[s]);
        let labels: Vec<&str> = score.breakdown.bonuses.iter().map(|l| l.label.as_str()).collect();
        assert!(labels.contains(&"Trend Explosion"));
        assert!(labels.contains(&"Dark Horse"));
    }

    #[test]
    fn test_weekly_bonuses_not_awarded_daily() {
        let mut s = slot(SlotKind::Product1, 3, AssetType::Product, 5);
        s.stats[0].market_share_percent = 50.0;
        let score = aggregate(&lineup(), daily(), &[s]);
        assert!(!score
            .breakdown
            .bonuses
            .iter()
            .any(|l| l.label == "Market Leader"));
    }

    #[test]
    fn test_bonus_cap_truncates_in_priority_order() {
        // Equal slots (Perfect Week +50), three climbers (Momentum Master
        // +20), two on streaks (+25), a 3x trend (+30): eligible 125, cap
        // 100 → Trend Explosion truncated to 5.
        let mut slots = vec![
            slot(SlotKind::Manufacturer1, 1, AssetType::Manufacturer, 10),
            slot(SlotKind::Manufacturer2, 2, AssetType::Manufacturer, 10),
            slot(SlotKind::Pharmacy1, 3, AssetType::Pharmacy, 10),
        ];
        for s in &mut slots {
            s.stats[0].previous_rank = 9;
            s.stats[0].current_rank = 6;
            s.stats[0].streak_days = 4;
            s.stats[0].trend_multiplier = Some(3.0);
        }
        let score = aggregate(&lineup(), daily(), &slots);
        assert_eq!(score.bonus_total, TEAM_BONUS_CAP);
        let trend_line = score
            .breakdown
            .bonuses
            .iter()
            .find(|l| l.label == "Trend Explosion")
            .unwrap();
        assert_eq!(trend_line.points, 5.0);
        assert!(trend_line.condition.contains("truncated"));
        assert!(score.grand_total <= score.subtotal + TEAM_BONUS_CAP);
        assert!(score.breakdown.is_consistent());
    }

    #[test]
    fn test_diversity_balanced_lineup() {
        // Four groups at 25% each.
        let slots = vec![
            slot(SlotKind::Manufacturer1, 1, AssetType::Manufacturer, 11), // 80
            slot(SlotKind::Cultivar1, 2, AssetType::Cultivar, 13),         // 80.5
            slot(SlotKind::Pharmacy1, 3, AssetType::Pharmacy, 11),         // 80
            {
                let mut b = SlotData {
                    slot: LineupSlot {
                        slot: SlotKind::Brand,
                        asset_id: 4,
                        asset_type: AssetType::Brand,
                    },
                    stats: vec![],
                    brand_stat: Some(BrandRatingStat {
                        asset_id: 4,
                        stat_date: date(),
                        avg_rating: 3.5,
                        review_count: 100,
                        current_rank: 11,
                        previous_rank: 11,
                    }),
                    pool_size: 100,
                };
                b.brand_stat.as_mut().unwrap().review_count = 100; // 70 + 10
                b
            },
        ];
        let score = aggregate(&lineup(), daily(), &slots);
        assert!(score
            .breakdown
            .bonuses
            .iter()
            .any(|l| l.label == "Position Diversity"));
    }

    #[test]
    fn test_idempotent_recompute() {
        let slots = vec![
            slot(SlotKind::Manufacturer1, 1, AssetType::Manufacturer, 10),
            slot(SlotKind::Product1, 2, AssetType::Product, 4),
        ];
        let a = aggregate(&lineup(), daily(), &slots);
        let b = aggregate(&lineup(), daily(), &slots);
        assert_eq!(a.grand_total, b.grand_total);
        assert_eq!(a.breakdown, b.breakdown);
        assert_eq!(a.slot_points, b.slot_points);
    }

    #[test]
    fn test_brand_slot_uses_rating_formula() {
        let data = SlotData {
            slot: LineupSlot {
                slot: SlotKind::Brand,
                asset_id: 9,
                asset_type: AssetType::Brand,
            },
            stats: vec![],
            brand_stat: Some(BrandRatingStat {
                asset_id: 9,
                stat_date: date(),
                avg_rating: 4.0,
                review_count: 50,
                current_rank: 0,
                previous_rank: 0,
            }),
            pool_size: 100,
        };
        let score = aggregate(&lineup(), daily(), &[data]);
        // floor(4.0×20) + floor(50/10) = 85
        assert_eq!(score.subtotal, 85.0);
    }
}
