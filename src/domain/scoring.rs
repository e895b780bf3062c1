use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Period granularity of a scoring pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "scope")]
pub enum ScoringScope {
    /// Score one calendar date.
    Daily { date: NaiveDate },
    /// Score a full ISO week: the sum of the seven daily trend scores plus
    /// week-level context bonuses. Never an independent weekly formula.
    Weekly { iso_year: i32, iso_week: u32 },
}

impl ScoringScope {
    pub fn is_weekly(&self) -> bool {
        matches!(self, ScoringScope::Weekly { .. })
    }
}

impl std::fmt::Display for ScoringScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoringScope::Daily { date } => write!(f, "daily:{date}"),
            ScoringScope::Weekly { iso_year, iso_week } => {
                write!(f, "weekly:{iso_year}-W{iso_week:02}")
            }
        }
    }
}

/// One labeled line of a scoring breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownLine {
    pub label: String,
    /// Human-readable condition that produced the line, e.g. "↑3 ranks".
    pub condition: String,
    pub points: f64,
}

impl BreakdownLine {
    pub fn new(label: impl Into<String>, condition: impl Into<String>, points: f64) -> Self {
        Self {
            label: label.into(),
            condition: condition.into(),
            points,
        }
    }
}

/// Full accounting of one asset's (or one team's) score for one scope.
///
/// Invariant: `total == subtotal + Σ bonuses + Σ penalties`, where `subtotal`
/// is the sum of `components`. The persisted total is this same value;
/// display code must never recompute a diverging figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ScoringBreakdown {
    pub components: Vec<BreakdownLine>,
    pub bonuses: Vec<BreakdownLine>,
    pub penalties: Vec<BreakdownLine>,
    pub subtotal: f64,
    pub total: f64,
}

impl ScoringBreakdown {
    pub fn component(&mut self, label: impl Into<String>, condition: impl Into<String>, points: f64) {
        self.components.push(BreakdownLine::new(label, condition, points));
        self.subtotal += points;
        self.total += points;
    }

    /// Record a signed adjustment: non-negative values land in `bonuses`,
    /// negative values in `penalties`. Zero-point lines are dropped.
    pub fn adjustment(&mut self, label: impl Into<String>, condition: impl Into<String>, points: f64) {
        if points == 0.0 {
            return;
        }
        let line = BreakdownLine::new(label, condition, points);
        if points < 0.0 {
            self.penalties.push(line);
        } else {
            self.bonuses.push(line);
        }
        self.total += points;
    }

    pub fn bonus_total(&self) -> f64 {
        self.bonuses.iter().map(|l| l.points).sum()
    }

    pub fn penalty_total(&self) -> f64 {
        self.penalties.iter().map(|l| l.points).sum()
    }

    /// Check the breakdown invariant within floating-point tolerance.
    pub fn is_consistent(&self) -> bool {
        let recomputed = self.subtotal + self.bonus_total() + self.penalty_total();
        (recomputed - self.total).abs() < 1e-9
    }

    /// Fold another breakdown into this one (weekly accumulation).
    pub fn absorb(&mut self, other: &ScoringBreakdown) {
        self.components.extend(other.components.iter().cloned());
        self.bonuses.extend(other.bonuses.iter().cloned());
        self.penalties.extend(other.penalties.iter().cloned());
        self.subtotal += other.subtotal;
        self.total += other.total;
    }
}

/// The two coexisting streak representations.
///
/// `bonus_points` is the additive streak bonus that enters totals.
/// `display_tier` is the multiplicative tier shown on breakdown labels and
/// must never be applied to any point value. They are deliberately separate
/// fields so neither can be mistaken for the other.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreakScore {
    pub streak_days: i64,
    pub bonus_points: f64,
    pub display_tier: f64,
    pub tier_name: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakdown_invariant() {
        let mut b = ScoringBreakdown::default();
        b.component("Order Points", "12 orders × 5", 60.0);
        b.component("Trend Points", "×1.50", 37.0);
        b.adjustment("Rank Bonus", "rank 2", 20.0);
        b.adjustment("Momentum", "↓2 ranks", -8.0);

        assert_eq!(b.subtotal, 97.0);
        assert_eq!(b.total, 109.0);
        assert!(b.is_consistent());
        assert_eq!(b.bonuses.len(), 1);
        assert_eq!(b.penalties.len(), 1);
    }

    #[test]
    fn test_zero_adjustment_dropped() {
        let mut b = ScoringBreakdown::default();
        b.adjustment("Rank Bonus", "unranked", 0.0);
        assert!(b.bonuses.is_empty());
        assert!(b.penalties.is_empty());
    }

    #[test]
    fn test_absorb_preserves_invariant() {
        let mut a = ScoringBreakdown::default();
        a.component("Order Points", "10 × 5", 50.0);
        let mut b = ScoringBreakdown::default();
        b.component("Order Points", "4 × 5", 20.0);
        b.adjustment("Streak Bonus", "3-day streak", 6.0);

        a.absorb(&b);
        assert_eq!(a.subtotal, 70.0);
        assert_eq!(a.total, 76.0);
        assert!(a.is_consistent());
    }

    #[test]
    fn test_scope_display() {
        let d = ScoringScope::Daily {
            date: NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(),
        };
        assert_eq!(d.to_string(), "daily:2026-03-09");
        let w = ScoringScope::Weekly {
            iso_year: 2026,
            iso_week: 11,
        };
        assert_eq!(w.to_string(), "weekly:2026-W11");
    }
}
