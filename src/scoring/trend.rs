//! Asset trend scorer.
//!
//! Pure functions converting one asset's daily metrics into a structured
//! point breakdown. No I/O, no error path: any real-valued input produces
//! defined arithmetic. Callers sanitize upstream (negative counts are the
//! aggregation job's bug, not ours to paper over).

use crate::domain::{AssetDailyStat, AssetType, ScoringBreakdown, StreakScore};

/// Points per order, by archetype.
pub fn order_weight(asset_type: AssetType) -> f64 {
    match asset_type {
        AssetType::Manufacturer | AssetType::Pharmacy => 5.0,
        AssetType::Cultivar => 4.5,
        AssetType::Product => 4.0,
        // Brand slots never reach the trend formula.
        AssetType::Brand => 0.0,
    }
}

/// Trend point weight multiplied by the trend multiplier, by archetype.
pub fn trend_weight(asset_type: AssetType) -> f64 {
    match asset_type {
        AssetType::Manufacturer | AssetType::Pharmacy => 25.0,
        AssetType::Cultivar => 22.0,
        AssetType::Product => 20.0,
        AssetType::Brand => 0.0,
    }
}

/// Ratio of same-day volume to the trailing 7-day daily average, capped to
/// [0.1, 5.0].
///
/// No volume at all is neutral (1.0). A positive day with no 7-day baseline
/// is a new entrant and gets the hype ceiling (5.0).
pub fn trend_multiplier(volume_1d: f64, volume_7d: f64) -> f64 {
    if volume_1d == 0.0 && volume_7d == 0.0 {
        return 1.0;
    }
    if volume_7d == 0.0 {
        return 5.0;
    }
    (volume_1d / (volume_7d / 7.0)).clamp(0.1, 5.0)
}

/// Resolve the effective multiplier for a stat row: precomputed if the
/// aggregation job supplied one, otherwise recomputed from the volume series.
pub fn effective_trend_multiplier(stat: &AssetDailyStat) -> f64 {
    stat.trend_multiplier
        .unwrap_or_else(|| trend_multiplier(stat.volume_1d, stat.volume_7d))
}

/// Tiered leaderboard bonus. Identical across all scored archetypes;
/// rank 0 (unranked) earns nothing.
pub fn rank_bonus(rank: i64) -> f64 {
    match rank {
        1 => 30.0,
        2..=3 => 20.0,
        4..=5 => 15.0,
        6..=10 => 10.0,
        _ => 0.0,
    }
}

/// Signed rank-movement bonus.
///
/// Gains reward at 8 points per rank (capped +40); losses penalize at half
/// that rate, 4 points per rank (floored -40). The asymmetry is intentional.
/// Unranked on either side of the move earns nothing.
pub fn momentum_bonus(previous_rank: i64, current_rank: i64) -> f64 {
    if previous_rank == 0 || current_rank == 0 {
        return 0.0;
    }
    let rank_change = previous_rank - current_rank;
    if rank_change >= 0 {
        (rank_change as f64 * 8.0).min(40.0)
    } else {
        (rank_change as f64 * 4.0).max(-40.0)
    }
}

/// Consistency bonus: 20% of the 0-100 consistency score, floored, capped 20.
pub fn consistency_bonus(consistency_score: f64) -> f64 {
    (consistency_score * 0.20).floor().min(20.0)
}

/// Velocity bonus: magnitude of 15% of the signed acceleration, capped 15.
/// Deceleration awards the same magnitude as acceleration; the upstream
/// aggregation has always scored the absolute value and stored totals
/// depend on it.
pub fn velocity_bonus(velocity_score: f64) -> f64 {
    (velocity_score * 0.15).floor().abs().min(15.0)
}

/// Additive streak bonus: 2 points per consecutive top-10 day, capped 15.
pub fn streak_bonus(streak_days: i64) -> f64 {
    (streak_days as f64 * 2.0).min(15.0)
}

/// The display-only multiplicative streak tier. Never applied to points;
/// only the label on the breakdown line uses it.
pub fn streak_display_tier(streak_days: i64) -> (f64, &'static str) {
    match streak_days {
        i64::MIN..=1 => (1.0, "No Streak"),
        2..=3 => (1.1, "Hot Streak"),
        4..=6 => (1.25, "On Fire"),
        7..=13 => (1.5, "Blazing"),
        14..=20 => (2.0, "Unstoppable"),
        _ => (3.0, "God Mode"),
    }
}

/// Both streak representations as one value object, so the additive bonus
/// and the display tier cannot be collapsed into a single number.
pub fn streak_score(streak_days: i64) -> StreakScore {
    let (display_tier, tier_name) = streak_display_tier(streak_days);
    StreakScore {
        streak_days,
        bonus_points: streak_bonus(streak_days),
        display_tier,
        tier_name,
    }
}

/// Tiered market-share bonus over the 0-100 share percentage.
pub fn market_share_bonus(market_share_percent: f64) -> f64 {
    if market_share_percent >= 15.0 {
        20.0
    } else if market_share_percent >= 8.0 {
        15.0
    } else if market_share_percent >= 4.0 {
        10.0
    } else if market_share_percent >= 2.0 {
        5.0
    } else {
        0.0
    }
}

/// Score one asset's daily stats for one of the four trend archetypes.
///
/// Components: order points and trend points. Adjustments: rank, momentum
/// (may be negative), consistency, velocity, streak and market share. Total
/// is uncapped.
pub fn score(asset_type: AssetType, stat: &AssetDailyStat) -> ScoringBreakdown {
    let mut breakdown = ScoringBreakdown::default();

    let order_points = stat.order_count as f64 * order_weight(asset_type);
    breakdown.component(
        "Order Points",
        format!("{} orders × {}", stat.order_count, order_weight(asset_type)),
        order_points,
    );

    let multiplier = effective_trend_multiplier(stat);
    let trend_points = (multiplier * trend_weight(asset_type)).floor();
    breakdown.component(
        "Trend Points",
        format!("×{multiplier:.2} trend"),
        trend_points,
    );

    breakdown.adjustment(
        "Rank Bonus",
        format!("rank {}", stat.current_rank),
        rank_bonus(stat.current_rank),
    );

    let momentum = momentum_bonus(stat.previous_rank, stat.current_rank);
    let rank_change = stat.previous_rank - stat.current_rank;
    let momentum_condition = if rank_change >= 0 {
        format!("↑{rank_change} ranks")
    } else {
        format!("↓{} ranks", -rank_change)
    };
    breakdown.adjustment("Momentum Bonus", momentum_condition, momentum);

    breakdown.adjustment(
        "Consistency Bonus",
        format!("{:.0}/100 consistency", stat.consistency_score),
        consistency_bonus(stat.consistency_score),
    );

    breakdown.adjustment(
        "Velocity Bonus",
        format!("velocity {:+.1}", stat.velocity_score),
        velocity_bonus(stat.velocity_score),
    );

    let streak = streak_score(stat.streak_days);
    breakdown.adjustment(
        "Streak Bonus",
        format!(
            "{}-day streak (×{:.2} tier)",
            streak.streak_days, streak.display_tier
        ),
        streak.bonus_points,
    );

    breakdown.adjustment(
        "Market Share Bonus",
        format!("{:.1}% share", stat.market_share_percent),
        market_share_bonus(stat.market_share_percent),
    );

    breakdown
}
