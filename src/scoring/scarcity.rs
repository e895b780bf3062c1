//! Scarcity multiplier.
//!
//! Points scale inversely with the size of an archetype's total population:
//! rare pools amplify their holders' points, deep pools dampen them. The
//! effect is always logged as an explicit breakdown line, never hidden
//! inside the slot value.

use crate::domain::ScoringBreakdown;

const SCARCITY_FLOOR: f64 = 0.65;
const SCARCITY_CEIL: f64 = 1.35;

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `clamp((100 / max(pool, 10))^0.5, 0.65, 1.35)`, rounded to 2 decimals.
pub fn scarcity_multiplier(pool_size: i64) -> f64 {
    let pool = pool_size.max(10) as f64;
    round2((100.0 / pool).sqrt().clamp(SCARCITY_FLOOR, SCARCITY_CEIL))
}

/// Apply the multiplier to a slot's raw points, recording the delta on the
/// breakdown as a Scarcity Boost (bonus) or Scarcity Dampening (penalty).
/// Returns the adjusted slot value.
pub fn apply(breakdown: &mut ScoringBreakdown, raw_points: f64, pool_size: i64) -> f64 {
    let multiplier = scarcity_multiplier(pool_size);
    let adjusted = round2(raw_points * multiplier);
    let delta = round2(adjusted - raw_points);
    let label = if delta >= 0.0 {
        "Scarcity Boost"
    } else {
        "Scarcity Dampening"
    };
    breakdown.adjustment(
        label,
        format!("pool of {pool_size} (×{multiplier:.2})"),
        delta,
    );
    adjusted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplier_bounds() {
        // Tiny pool clamps to the pool floor of 10: sqrt(100/10) ≈ 3.16 → ceil.
        assert_eq!(scarcity_multiplier(3), 1.35);
        assert_eq!(scarcity_multiplier(10), 1.35);
        // 100-asset pool is neutral.
        assert_eq!(scarcity_multiplier(100), 1.0);
        // Deep pool dampens, floored.
        assert_eq!(scarcity_multiplier(1000), 0.65);
        assert_eq!(scarcity_multiplier(400), 0.65); // sqrt(0.25)=0.5 → floor
    }

    #[test]
    fn test_mid_pool_rounding() {
        // sqrt(100/150) = 0.8164... → 0.82
        assert_eq!(scarcity_multiplier(150), 0.82);
    }

    #[test]
    fn test_apply_logs_delta() {
        let mut b = ScoringBreakdown::default();
        b.component("Order Points", "20 × 5", 100.0);
        let adjusted = apply(&mut b, 100.0, 150);
        assert_eq!(adjusted, 82.0);
        let line = b.penalties.iter().find(|l| l.label == "Scarcity Dampening").unwrap();
        assert_eq!(line.points, -18.0);
        assert!(b.is_consistent());
        assert_eq!(b.total, adjusted);
    }

    #[test]
    fn test_apply_boost() {
        let mut b = ScoringBreakdown::default();
        b.component("Order Points", "20 × 5", 100.0);
        let adjusted = apply(&mut b, 100.0, 20);
        // sqrt(100/20) ≈ 2.236 → clamped 1.35
        assert_eq!(adjusted, 135.0);
        let line = b.bonuses.iter().find(|l| l.label == "Scarcity Boost").unwrap();
        assert_eq!(line.points, 35.0);
        assert!(b.is_consistent());
    }
}
