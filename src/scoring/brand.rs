//! Brand rating formula.
//!
//! Brand slots are not scored by the trend formula; their points come from
//! user ratings and review volume, plus the same rank tier table every other
//! archetype uses.

use crate::domain::{BrandRatingStat, ScoringBreakdown};

use super::trend::{momentum_bonus, rank_bonus};

/// Points per full rating star.
const RATING_WEIGHT: f64 = 20.0;
/// Review-volume bonus cap.
const REVIEW_BONUS_CAP: f64 = 25.0;

/// Score one brand's rating stats.
pub fn score(stat: &BrandRatingStat) -> ScoringBreakdown {
    let mut breakdown = ScoringBreakdown::default();

    let rating_points = (stat.avg_rating * RATING_WEIGHT).floor();
    breakdown.component(
        "Rating Points",
        format!("{:.2}★ × {RATING_WEIGHT}", stat.avg_rating),
        rating_points,
    );

    let review_bonus = ((stat.review_count as f64) / 10.0).floor().min(REVIEW_BONUS_CAP);
    breakdown.adjustment(
        "Review Bonus",
        format!("{} reviews", stat.review_count),
        review_bonus,
    );

    breakdown.adjustment(
        "Rank Bonus",
        format!("rank {}", stat.current_rank),
        rank_bonus(stat.current_rank),
    );

    let momentum = momentum_bonus(stat.previous_rank, stat.current_rank);
    let change = stat.previous_rank - stat.current_rank;
    let condition = if change >= 0 {
        format!("↑{change} ranks")
    } else {
        format!("↓{} ranks", -change)
    };
    breakdown.adjustment("Momentum Bonus", condition, momentum);

    breakdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn stat(avg_rating: f64, review_count: i64, current_rank: i64, previous_rank: i64) -> BrandRatingStat {
        BrandRatingStat {
            asset_id: 42,
            stat_date: NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(),
            avg_rating,
            review_count,
            current_rank,
            previous_rank,
        }
    }

    #[test]
    fn test_brand_score_components() {
        let b = score(&stat(4.6, 130, 1, 3));
        // floor(4.6×20)=92, reviews floor(13)=13, rank 30, momentum ↑2 = 16
        assert_eq!(b.subtotal, 92.0);
        assert_eq!(b.total, 92.0 + 13.0 + 30.0 + 16.0);
        assert!(b.is_consistent());
    }

    #[test]
    fn test_review_bonus_capped() {
        let b = score(&stat(3.0, 10_000, 0, 0));
        let review = b.bonuses.iter().find(|l| l.label == "Review Bonus").unwrap();
        assert_eq!(review.points, 25.0);
    }

    #[test]
    fn test_unrated_brand_scores_zero() {
        let b = score(&stat(0.0, 0, 0, 0));
        assert_eq!(b.total, 0.0);
        assert!(b.is_consistent());
    }

    #[test]
    fn test_shared_rank_table() {
        // Brand rank bonus uses the same tiers as the trend archetypes.
        let b = score(&stat(4.0, 0, 4, 4));
        let rank = b.bonuses.iter().find(|l| l.label == "Rank Bonus").unwrap();
        assert_eq!(rank.points, 15.0);
    }
}
