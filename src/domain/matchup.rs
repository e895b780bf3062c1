use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Match lifecycle.
///
/// ACTIVE → OVERTIME → COMPLETE, with a direct ACTIVE → COMPLETE edge when
/// the end-of-regulation margin is too wide for overtime. Transitions are
/// terminal once taken; a completed match is never re-evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Active,
    Overtime,
    Complete,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Active => "active",
            MatchStatus::Overtime => "overtime",
            MatchStatus::Complete => "complete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(MatchStatus::Active),
            "overtime" => Some(MatchStatus::Overtime),
            "complete" => Some(MatchStatus::Complete),
            _ => None,
        }
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a match was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinCondition {
    /// Regulation margin exceeded the overtime threshold.
    RegulationLead,
    /// 25-point lead reached during overtime.
    GoldenGoal,
    /// Overtime window elapsed with the scores apart.
    TimeoutLead,
    /// Overtime window elapsed tied; best single asset decided it.
    TimeoutTiebreaker,
}

impl WinCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            WinCondition::RegulationLead => "regulation_lead",
            WinCondition::GoldenGoal => "golden_goal",
            WinCondition::TimeoutLead => "timeout_lead",
            WinCondition::TimeoutTiebreaker => "timeout_tiebreaker",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "regulation_lead" => Some(WinCondition::RegulationLead),
            "golden_goal" => Some(WinCondition::GoldenGoal),
            "timeout_lead" => Some(WinCondition::TimeoutLead),
            "timeout_tiebreaker" => Some(WinCondition::TimeoutTiebreaker),
            _ => None,
        }
    }
}

impl std::fmt::Display for WinCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A head-to-head challenge between two teams.
///
/// Created by league management; this core owns only the lifecycle fields
/// (status, overtime window, halftime snapshot, winner).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Matchup {
    pub id: i64,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub home_team_name: String,
    pub away_team_name: String,
    pub status: MatchStatus,
    pub start_time: DateTime<Utc>,
    /// Configured end of regulation. `None` means open-ended (season play);
    /// such matches never trigger overtime checks.
    pub end_time: Option<DateTime<Utc>>,
    pub overtime_ends_at: Option<DateTime<Utc>>,
    pub halftime_home: Option<f64>,
    pub halftime_away: Option<f64>,
    pub winner_team_id: Option<i64>,
    pub win_condition: Option<WinCondition>,
}

impl Matchup {
    pub fn is_active(&self) -> bool {
        self.status == MatchStatus::Active
    }

    pub fn is_complete(&self) -> bool {
        self.status == MatchStatus::Complete
    }

    /// Regulation has ended and the overtime decision is due.
    pub fn regulation_over(&self, now: DateTime<Utc>) -> bool {
        matches!(self.end_time, Some(end) if now >= end)
    }

    /// Midpoint of the configured match window, if one exists.
    pub fn halftime_at(&self) -> Option<DateTime<Utc>> {
        let end = self.end_time?;
        Some(self.start_time + (end - self.start_time) / 2)
    }

    pub fn overtime_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.overtime_ends_at, Some(t) if now >= t)
    }

    pub fn opponent_of(&self, team_id: i64) -> i64 {
        if team_id == self.home_team_id {
            self.away_team_id
        } else {
            self.home_team_id
        }
    }

    pub fn team_name(&self, team_id: i64) -> &str {
        if team_id == self.home_team_id {
            &self.home_team_name
        } else {
            &self.away_team_name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn matchup(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Matchup {
        Matchup {
            id: 1,
            home_team_id: 10,
            away_team_id: 20,
            home_team_name: "Kush Kings".into(),
            away_team_name: "Terp Titans".into(),
            status: MatchStatus::Active,
            start_time: start,
            end_time: end,
            overtime_ends_at: None,
            halftime_home: None,
            halftime_away: None,
            winner_team_id: None,
            win_condition: None,
        }
    }

    #[test]
    fn test_regulation_over() {
        let now = Utc::now();
        let m = matchup(now - Duration::hours(2), Some(now - Duration::minutes(1)));
        assert!(m.regulation_over(now));

        let open_ended = matchup(now - Duration::hours(2), None);
        assert!(!open_ended.regulation_over(now));
    }

    #[test]
    fn test_halftime_midpoint() {
        let start = Utc::now();
        let m = matchup(start, Some(start + Duration::hours(4)));
        assert_eq!(m.halftime_at(), Some(start + Duration::hours(2)));
    }

    #[test]
    fn test_opponent_lookup() {
        let m = matchup(Utc::now(), None);
        assert_eq!(m.opponent_of(10), 20);
        assert_eq!(m.opponent_of(20), 10);
        assert_eq!(m.team_name(10), "Kush Kings");
    }
}
