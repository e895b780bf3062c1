use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::lineup::SlotKind;
use super::scoring::{ScoringBreakdown, ScoringScope};

/// Storage key for one team's score row. Unique per (team, period);
/// recomputation upserts, never appends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ScorePeriod {
    Date { date: NaiveDate },
    IsoWeek { iso_year: i32, iso_week: u32 },
}

impl ScorePeriod {
    pub fn from_scope(scope: ScoringScope) -> Self {
        match scope {
            ScoringScope::Daily { date } => ScorePeriod::Date { date },
            ScoringScope::Weekly { iso_year, iso_week } => {
                ScorePeriod::IsoWeek { iso_year, iso_week }
            }
        }
    }

    /// Canonical storage string, e.g. "2026-03-09" or "2026-W11".
    pub fn key(&self) -> String {
        match self {
            ScorePeriod::Date { date } => date.to_string(),
            ScorePeriod::IsoWeek { iso_year, iso_week } => {
                format!("{iso_year}-W{iso_week:02}")
            }
        }
    }

    /// Parse a storage key produced by [`ScorePeriod::key`].
    pub fn parse(key: &str) -> Option<Self> {
        if let Some((year, week)) = key.split_once("-W") {
            let iso_year = year.parse().ok()?;
            let iso_week = week.parse().ok()?;
            return Some(ScorePeriod::IsoWeek { iso_year, iso_week });
        }
        key.parse::<NaiveDate>()
            .ok()
            .map(|date| ScorePeriod::Date { date })
    }
}

impl std::fmt::Display for ScorePeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// One team's computed score for one period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamScore {
    pub id: Option<i64>,
    pub team_id: i64,
    pub period: ScorePeriod,
    /// Post-scarcity points per populated slot.
    pub slot_points: HashMap<SlotKind, f64>,
    /// Post-scarcity points per asset, keyed by asset id. What the
    /// broadcaster diffs between passes.
    pub asset_points: HashMap<i64, f64>,
    pub subtotal: f64,
    pub bonus_total: f64,
    pub penalty_total: f64,
    pub grand_total: f64,
    /// Per-slot and team-level breakdown detail, replaced wholesale on every
    /// recompute.
    pub breakdown: ScoringBreakdown,
    /// Asset-level context carried for team bonus evaluation.
    pub slot_context: Vec<SlotScoreContext>,
}

/// Context a scored slot contributes to team-level bonus checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotScoreContext {
    pub slot: SlotKind,
    pub asset_id: i64,
    pub points: f64,
    pub rank_gain: i64,
    pub current_rank: i64,
    pub streak_days: i64,
    pub trend_multiplier: f64,
    pub market_share_percent: f64,
}

impl TeamScore {
    /// Highest-scoring single asset, used by the overtime tiebreaker.
    pub fn best_asset_points(&self) -> f64 {
        self.asset_points
            .values()
            .copied()
            .fold(0.0_f64, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_keys() {
        let d = ScorePeriod::Date {
            date: NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(),
        };
        assert_eq!(d.key(), "2026-03-09");
        let w = ScorePeriod::IsoWeek {
            iso_year: 2026,
            iso_week: 3,
        };
        assert_eq!(w.key(), "2026-W03");
        assert_eq!(ScorePeriod::parse("2026-03-09"), Some(d));
        assert_eq!(ScorePeriod::parse("2026-W03"), Some(w));
        assert_eq!(ScorePeriod::parse("garbage"), None);
    }

    #[test]
    fn test_best_asset_points_empty() {
        let score = TeamScore {
            id: None,
            team_id: 1,
            period: ScorePeriod::Date {
                date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            },
            slot_points: HashMap::new(),
            asset_points: HashMap::new(),
            subtotal: 0.0,
            bonus_total: 0.0,
            penalty_total: 0.0,
            grand_total: 0.0,
            breakdown: Default::default(),
            slot_context: vec![],
        };
        assert_eq!(score.best_asset_points(), 0.0);
    }
}
