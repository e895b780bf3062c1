//! Score broadcaster.
//!
//! Diffs successive scoring snapshots per match and paces the resulting
//! deltas out as discrete play announcements. Snapshot state is
//! process-local and memory-resident: a restart loses it and the next pass
//! silently re-baselines (a cache with rebuild-on-miss semantics, not a
//! source of truth).

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, info};

use crate::adapters::{LiveEvent, LivePayload, PushDelivery, ScoringPlayEvent};
use crate::config::BroadcastConfig;
use crate::domain::{AssetInfo, Matchup, TeamScore};
use crate::error::Result;

/// Last-seen totals for one match: per team, the running total and the
/// per-asset point map.
#[derive(Debug, Clone, Default)]
struct MatchSnapshot {
    team_totals: HashMap<i64, f64>,
    asset_points: HashMap<(i64, i64), f64>,
}

pub struct ScoreBroadcaster {
    push: Arc<dyn PushDelivery>,
    config: BroadcastConfig,
    snapshots: Mutex<HashMap<i64, MatchSnapshot>>,
    /// Undelivered plays per match, shared with the pacing task. A pass that
    /// replaces the timer carries these over; only `clear_match` drops them.
    pending: Arc<Mutex<HashMap<i64, VecDeque<LiveEvent>>>>,
    /// Pacing task per match; replaced on every pass with deltas, aborted
    /// when a match is cleared.
    timers: Mutex<HashMap<i64, JoinHandle<()>>>,
}

impl ScoreBroadcaster {
    pub fn new(push: Arc<dyn PushDelivery>, config: BroadcastConfig) -> Self {
        Self {
            push,
            config,
            snapshots: Mutex::new(HashMap::new()),
            pending: Arc::new(Mutex::new(HashMap::new())),
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Ingest one rescoring pass for a match. The first pass establishes the
    /// baseline and emits nothing (deliberately: historical points are not
    /// replayed as plays). Later passes emit one play per asset whose points
    /// grew past the threshold, paced out over the broadcast window.
    /// Returns the number of plays queued.
    pub async fn publish_pass(
        &self,
        matchup: &Matchup,
        home_score: &TeamScore,
        away_score: &TeamScore,
        assets: &HashMap<i64, AssetInfo>,
    ) -> Result<usize> {
        let current = snapshot_of(matchup, home_score, away_score);

        let previous = {
            let mut snapshots = self.snapshots.lock().await;
            snapshots.insert(matchup.id, current.clone())
        };

        let Some(previous) = previous else {
            debug!("Match {}: baseline snapshot, no plays emitted", matchup.id);
            return Ok(0);
        };

        let mut events = self.diff(matchup, &previous, &current, assets);
        if events.is_empty() {
            return Ok(0);
        }
        // Deterministic announcement order: biggest gain first.
        events.sort_by(|a, b| {
            b.points_gained
                .partial_cmp(&a.points_gained)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let count = events.len();
        info!("Match {}: {} scoring plays queued", matchup.id, count);

        // Stop the previous pass's pacing task before touching its queue.
        if let Some(handle) = self.timers.lock().await.remove(&matchup.id) {
            handle.abort();
        }

        // Plays the aborted task had not yet delivered stay at the front of
        // the queue; only match finalization may drop them.
        let queue_len;
        let first = {
            let mut pending = self.pending.lock().await;
            let queue = pending.entry(matchup.id).or_default();
            queue.extend(
                events
                    .into_iter()
                    .map(|play| LiveEvent::new(matchup.id, LivePayload::ScoringPlay(play))),
            );
            queue_len = queue.len();
            queue.pop_front()
        };

        // First play goes out immediately; the rest are spread so a busy
        // pass still reads as a paced broadcast rather than a burst.
        if let Some(first) = first {
            self.push.deliver(first).await?;
        }

        if queue_len > 1 {
            let gap = self.event_gap(queue_len);
            let push = self.push.clone();
            let pending = self.pending.clone();
            let match_id = matchup.id;
            let handle = tokio::spawn(async move {
                loop {
                    sleep(gap).await;
                    let event = match pending.lock().await.get_mut(&match_id) {
                        Some(queue) => queue.pop_front(),
                        None => None,
                    };
                    let Some(event) = event else {
                        break;
                    };
                    if let Err(e) = push.deliver(event).await {
                        debug!("Match {match_id}: play delivery failed: {e}");
                    }
                }
            });
            self.timers.lock().await.insert(matchup.id, handle);
        }

        Ok(count)
    }

    /// Spacing between queued events:
    /// `max(min_gap, window / event_count)`.
    fn event_gap(&self, event_count: usize) -> Duration {
        let window_ms = self.config.window_minutes * 60_000;
        let spread_ms = window_ms / event_count.max(1) as u64;
        Duration::from_millis(spread_ms.max(self.config.min_event_gap_secs * 1000))
    }

    fn diff(
        &self,
        matchup: &Matchup,
        previous: &MatchSnapshot,
        current: &MatchSnapshot,
        assets: &HashMap<i64, AssetInfo>,
    ) -> Vec<ScoringPlayEvent> {
        let mut plays = Vec::new();
        for (&(team_id, asset_id), &points) in &current.asset_points {
            let before = previous
                .asset_points
                .get(&(team_id, asset_id))
                .copied()
                .unwrap_or(0.0);
            let gained = points - before;
            if gained <= self.config.play_threshold {
                continue;
            }
            let defender = matchup.opponent_of(team_id);
            let info = assets.get(&asset_id);
            plays.push(ScoringPlayEvent {
                attacking_team_id: team_id,
                attacking_team_name: matchup.team_name(team_id).to_string(),
                defending_team_id: defender,
                defending_team_name: matchup.team_name(defender).to_string(),
                asset_id,
                asset_name: info
                    .map(|i| i.name.clone())
                    .unwrap_or_else(|| format!("asset #{asset_id}")),
                asset_type: info.map(|i| i.asset_type).unwrap_or_else(|| {
                    // Unknown reference data; archetype falls back to product.
                    crate::domain::AssetType::Product
                }),
                points_gained: gained,
                attacking_team_total: current.team_totals.get(&team_id).copied().unwrap_or(0.0),
                defending_team_total: current.team_totals.get(&defender).copied().unwrap_or(0.0),
                asset_image_url: info.and_then(|i| i.image_url.clone()),
                slot_position: None,
            });
        }
        plays
    }

    /// Drop everything held for a match: pending pacing timer, snapshot,
    /// queue. Called on finalization.
    pub async fn clear_match(&self, match_id: i64) {
        if let Some(handle) = self.timers.lock().await.remove(&match_id) {
            handle.abort();
        }
        self.pending.lock().await.remove(&match_id);
        self.snapshots.lock().await.remove(&match_id);
        debug!("Match {match_id}: broadcaster state cleared");
    }

    /// Number of matches with live snapshot state (for status logging).
    pub async fn tracked_matches(&self) -> usize {
        self.snapshots.lock().await.len()
    }
}

fn snapshot_of(matchup: &Matchup, home: &TeamScore, away: &TeamScore) -> MatchSnapshot {
    let mut snapshot = MatchSnapshot::default();
    snapshot
        .team_totals
        .insert(matchup.home_team_id, home.grand_total);
    snapshot
        .team_totals
        .insert(matchup.away_team_id, away.grand_total);
    for (team_id, score) in [
        (matchup.home_team_id, home),
        (matchup.away_team_id, away),
    ] {
        for (&asset_id, &points) in &score.asset_points {
            snapshot.asset_points.insert((team_id, asset_id), points);
        }
    }
    snapshot
}
