//! Sudden-death overtime engine.
//!
//! Match lifecycle: ACTIVE → OVERTIME → COMPLETE, with a direct
//! ACTIVE → COMPLETE edge when regulation ends outside the overtime margin.
//! Decisions are pure functions over the two teams' persisted totals; the
//! engine applies them through the store (status-guarded updates keep every
//! transition terminal-once-taken) and announces them on the live channel.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::adapters::{LiveEvent, LivePayload, PostgresStore, PushDelivery};
use crate::config::SchedulerConfig;
use crate::domain::{MatchStatus, Matchup, WinCondition};
use crate::error::Result;

/// What the state machine wants done with a match.
#[derive(Debug, Clone, PartialEq)]
pub enum OvertimeDecision {
    /// Nothing due yet.
    Hold,
    /// Regulation ended inside the margin; open the overtime window.
    EnterOvertime { ends_at: DateTime<Utc> },
    /// The match is decided.
    Finalize {
        winner_team_id: i64,
        condition: WinCondition,
    },
}

/// End-of-regulation check. Evaluated once, at/after the configured end
/// time: a margin at or under the threshold opens overtime, anything wider
/// finalizes immediately for the leader.
pub fn regulation_decision(
    matchup: &Matchup,
    home_total: f64,
    away_total: f64,
    threshold: f64,
    window: Duration,
    now: DateTime<Utc>,
) -> OvertimeDecision {
    if matchup.status != MatchStatus::Active || !matchup.regulation_over(now) {
        return OvertimeDecision::Hold;
    }
    let margin = (home_total - away_total).abs();
    if margin <= threshold {
        OvertimeDecision::EnterOvertime {
            ends_at: now + window,
        }
    } else {
        OvertimeDecision::Finalize {
            winner_team_id: leader(matchup, home_total, away_total),
            condition: WinCondition::RegulationLead,
        }
    }
}

/// Overtime poll. A lead at or over the golden-goal margin wins on the
/// spot; when the window elapses the leader wins, a dead tie falls to the
/// best single asset, and an exhausted tiebreaker goes to the lower team id
/// (documented deterministic fallback — a match must always produce a
/// winner).
pub fn overtime_decision(
    matchup: &Matchup,
    home_total: f64,
    away_total: f64,
    home_best_asset: f64,
    away_best_asset: f64,
    golden_goal_lead: f64,
    now: DateTime<Utc>,
) -> OvertimeDecision {
    if matchup.status != MatchStatus::Overtime {
        return OvertimeDecision::Hold;
    }

    let margin = (home_total - away_total).abs();
    if margin >= golden_goal_lead {
        return OvertimeDecision::Finalize {
            winner_team_id: leader(matchup, home_total, away_total),
            condition: WinCondition::GoldenGoal,
        };
    }

    if !matchup.overtime_expired(now) {
        return OvertimeDecision::Hold;
    }

    if home_total != away_total {
        return OvertimeDecision::Finalize {
            winner_team_id: leader(matchup, home_total, away_total),
            condition: WinCondition::TimeoutLead,
        };
    }

    let winner_team_id = if home_best_asset > away_best_asset {
        matchup.home_team_id
    } else if away_best_asset > home_best_asset {
        matchup.away_team_id
    } else {
        matchup.home_team_id.min(matchup.away_team_id)
    };
    OvertimeDecision::Finalize {
        winner_team_id,
        condition: WinCondition::TimeoutTiebreaker,
    }
}

fn leader(matchup: &Matchup, home_total: f64, away_total: f64) -> i64 {
    if home_total >= away_total {
        matchup.home_team_id
    } else {
        matchup.away_team_id
    }
}

/// Applies decisions through the store and announces them.
pub struct OvertimeEngine {
    store: Arc<PostgresStore>,
    push: Arc<dyn PushDelivery>,
    config: SchedulerConfig,
}

impl OvertimeEngine {
    pub fn new(
        store: Arc<PostgresStore>,
        push: Arc<dyn PushDelivery>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            push,
            config,
        }
    }

    pub fn overtime_window(&self) -> Duration {
        Duration::minutes(self.config.overtime_window_minutes as i64)
    }

    /// Run the end-of-regulation check for an active match. Returns the
    /// decision that was applied.
    pub async fn check_regulation(
        &self,
        matchup: &Matchup,
        home_total: f64,
        away_total: f64,
    ) -> Result<OvertimeDecision> {
        let decision = regulation_decision(
            matchup,
            home_total,
            away_total,
            self.config.overtime_threshold,
            self.overtime_window(),
            Utc::now(),
        );
        self.apply(matchup, home_total, away_total, &decision).await?;
        Ok(decision)
    }

    /// Run one overtime poll for a match in overtime.
    pub async fn poll_overtime(
        &self,
        matchup: &Matchup,
        home_total: f64,
        away_total: f64,
        home_best_asset: f64,
        away_best_asset: f64,
    ) -> Result<OvertimeDecision> {
        let decision = overtime_decision(
            matchup,
            home_total,
            away_total,
            home_best_asset,
            away_best_asset,
            self.config.golden_goal_lead,
            Utc::now(),
        );
        self.apply(matchup, home_total, away_total, &decision).await?;
        Ok(decision)
    }

    async fn apply(
        &self,
        matchup: &Matchup,
        home_total: f64,
        away_total: f64,
        decision: &OvertimeDecision,
    ) -> Result<()> {
        match decision {
            OvertimeDecision::Hold => Ok(()),
            OvertimeDecision::EnterOvertime { ends_at } => {
                let taken = self.store.begin_overtime(matchup.id, *ends_at).await?;
                if !taken {
                    warn!("Match {} already left ACTIVE; overtime skipped", matchup.id);
                    return Ok(());
                }
                info!(
                    "Match {} enters overtime until {} ({:.1} vs {:.1})",
                    matchup.id, ends_at, home_total, away_total
                );
                self.push
                    .deliver(LiveEvent::new(
                        matchup.id,
                        LivePayload::OvertimeStarted {
                            home_team_total: home_total,
                            away_team_total: away_total,
                            ends_at: *ends_at,
                        },
                    ))
                    .await
            }
            OvertimeDecision::Finalize {
                winner_team_id,
                condition,
            } => {
                let taken = self
                    .store
                    .complete_match(matchup.id, *winner_team_id, *condition)
                    .await?;
                if !taken {
                    warn!("Match {} already complete; finalize skipped", matchup.id);
                    return Ok(());
                }
                info!(
                    "Match {} complete: team {} wins by {} ({:.1} vs {:.1})",
                    matchup.id, winner_team_id, condition, home_total, away_total
                );
                self.push
                    .deliver(LiveEvent::new(
                        matchup.id,
                        LivePayload::MatchFinal {
                            winner_team_id: *winner_team_id,
                            winner_team_name: matchup.team_name(*winner_team_id).to_string(),
                            win_condition: *condition,
                            home_team_total: home_total,
                            away_team_total: away_total,
                        },
                    ))
                    .await
            }
        }
    }
}
