//! Match scheduler.
//!
//! A single periodic timer drives four independent checks per tick across
//! all open matches: rescoring, the halftime snapshot, the end-of-regulation
//! overtime decision, and overtime polling. Matches are processed
//! independently; one match's failure is logged and never aborts the batch.
//! Per-match team rescoring fans out concurrently and joins; the persistence
//! layer's upsert-plus-lock is the only synchronization point.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::adapters::{LiveEvent, LivePayload, PostgresStore, PushDelivery};
use crate::config::SchedulerConfig;
use crate::domain::{
    AssetInfo, AssetType, Lineup, MatchStatus, Matchup, ScorePeriod, ScoringScope, TeamScore,
};
use crate::error::Result;
use crate::scoring::{self, SlotData};
use crate::services::broadcaster::ScoreBroadcaster;
use crate::services::overtime::{OvertimeDecision, OvertimeEngine};

/// Scheduler counters, for status logging.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub matches_processed: u64,
    pub rescore_passes: u64,
    pub plays_emitted: u64,
    pub matches_finalized: u64,
    pub failures: u64,
    pub last_tick: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct MatchScheduler {
    store: Arc<PostgresStore>,
    broadcaster: Arc<ScoreBroadcaster>,
    overtime: Arc<OvertimeEngine>,
    push: Arc<dyn PushDelivery>,
    config: SchedulerConfig,
    running: Arc<AtomicBool>,
    stats: Arc<RwLock<SchedulerStats>>,
    last_rescore: Arc<RwLock<Option<DateTime<Utc>>>>,
}

impl MatchScheduler {
    pub fn new(
        store: Arc<PostgresStore>,
        broadcaster: Arc<ScoreBroadcaster>,
        push: Arc<dyn PushDelivery>,
        config: SchedulerConfig,
    ) -> Self {
        let overtime = Arc::new(OvertimeEngine::new(store.clone(), push.clone(), config.clone()));
        Self {
            store,
            broadcaster,
            overtime,
            push,
            config,
            running: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(RwLock::new(SchedulerStats::default())),
            last_rescore: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn get_stats(&self) -> SchedulerStats {
        self.stats.read().await.clone()
    }

    /// Start the tick loop in the background.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Match scheduler already running");
            return;
        }
        info!(
            "Starting match scheduler (tick: {}s, rescore every {}m)",
            self.config.tick_secs, self.config.rescore_interval_minutes
        );
        let scheduler = self.clone();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(tokio::time::Duration::from_secs(scheduler.config.tick_secs));
            while scheduler.running.load(Ordering::SeqCst) {
                interval.tick().await;
                if let Err(e) = scheduler.run_tick().await {
                    error!("Scheduler tick failed: {}", e);
                    scheduler.stats.write().await.failures += 1;
                }
            }
            info!("Match scheduler stopped");
        });
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        info!("Match scheduler stop requested");
    }

    /// One scheduler tick over all open matches.
    pub async fn run_tick(&self) -> Result<()> {
        let now = Utc::now();
        let rescore_due = self.rescore_due(now).await;
        if rescore_due {
            *self.last_rescore.write().await = Some(now);
        }

        let matches = self.store.list_open_matches().await?;
        if matches.is_empty() {
            debug!("No open matches");
        }

        let mut processed = 0u64;
        let mut failures = 0u64;
        for matchup in &matches {
            // Failure isolation: one bad match must not poison the batch.
            match self.process_match(matchup, rescore_due, now).await {
                Ok(()) => processed += 1,
                Err(e) => {
                    failures += 1;
                    error!("Match {} processing failed: {}", matchup.id, e);
                }
            }
        }

        let mut stats = self.stats.write().await;
        stats.ticks += 1;
        stats.matches_processed += processed;
        stats.failures += failures;
        if rescore_due {
            stats.rescore_passes += 1;
        }
        stats.last_tick = Some(now);
        Ok(())
    }

    async fn rescore_due(&self, now: DateTime<Utc>) -> bool {
        let last = self.last_rescore.read().await;
        match *last {
            Some(t) => {
                (now - t).num_minutes() >= self.config.rescore_interval_minutes as i64
            }
            None => true,
        }
    }

    /// All four per-match checks for one tick.
    async fn process_match(
        &self,
        matchup: &Matchup,
        rescore_due: bool,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let scope = match_scope(matchup);

        // Rescoring: a due pass recomputes both teams (fan-out, join) and
        // feeds the broadcaster. Overtime decisions below always need fresh
        // totals, so decision-critical moments rescore as well.
        let decision_due = matchup.regulation_over(now) || matchup.status == MatchStatus::Overtime;
        let (home, away) = if rescore_due || decision_due {
            let (home, away) = futures::future::try_join(
                self.rescore_team(matchup.home_team_id, scope),
                self.rescore_team(matchup.away_team_id, scope),
            )
            .await?;
            let assets = self.asset_infos(&home, &away).await?;
            let plays = self
                .broadcaster
                .publish_pass(matchup, &home, &away, &assets)
                .await?;
            self.stats.write().await.plays_emitted += plays as u64;
            (home, away)
        } else {
            match self.stored_scores(matchup, &scope).await? {
                Some(pair) => pair,
                None => return Ok(()), // nothing scored yet, nothing to check
            }
        };

        if matchup.status == MatchStatus::Active {
            self.check_halftime(matchup, &home, &away, now).await?;

            let decision = self
                .overtime
                .check_regulation(matchup, home.grand_total, away.grand_total)
                .await?;
            if matches!(decision, OvertimeDecision::Finalize { .. }) {
                self.broadcaster.clear_match(matchup.id).await;
                self.stats.write().await.matches_finalized += 1;
            }
        } else if matchup.status == MatchStatus::Overtime {
            let decision = self
                .overtime
                .poll_overtime(
                    matchup,
                    home.grand_total,
                    away.grand_total,
                    home.best_asset_points(),
                    away.best_asset_points(),
                )
                .await?;
            if matches!(decision, OvertimeDecision::Finalize { .. }) {
                self.broadcaster.clear_match(matchup.id).await;
                self.stats.write().await.matches_finalized += 1;
            }
        }

        Ok(())
    }

    /// Capture the halftime snapshot once, at/after the window midpoint.
    async fn check_halftime(
        &self,
        matchup: &Matchup,
        home: &TeamScore,
        away: &TeamScore,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if !halftime_due(matchup, now) {
            return Ok(());
        }
        let taken = self
            .store
            .set_halftime(matchup.id, home.grand_total, away.grand_total)
            .await?;
        if taken {
            info!(
                "Match {} halftime: {:.1} vs {:.1}",
                matchup.id, home.grand_total, away.grand_total
            );
            self.push
                .deliver(LiveEvent::new(
                    matchup.id,
                    LivePayload::Halftime {
                        home_team_total: home.grand_total,
                        away_team_total: away.grand_total,
                    },
                ))
                .await?;
        }
        Ok(())
    }

    /// Recompute and persist one team's score for a scope.
    ///
    /// Missing stat rows score their slots zero; a storage failure fails the
    /// attempt for this team only and the next tick retries.
    pub async fn rescore_team(&self, team_id: i64, scope: ScoringScope) -> Result<TeamScore> {
        let period = ScorePeriod::from_scope(scope);
        let lineup = self.store.get_lineup(team_id, &period).await?;
        let slots = self.resolve_slots(&lineup, scope).await?;
        let mut score = scoring::aggregate(&lineup, scope, &slots);
        let id = self.store.save_team_score(&score).await?;
        score.id = Some(id);
        debug!(
            "Rescored team {} {}: {:.1} ({} slots)",
            team_id, period, score.grand_total, slots.len()
        );
        Ok(score)
    }

    /// Resolve every populated slot's stats, brand ratings and pool size.
    async fn resolve_slots(&self, lineup: &Lineup, scope: ScoringScope) -> Result<Vec<SlotData>> {
        let (from, to) = scope_date_range(scope);
        let mut pool_sizes: HashMap<AssetType, i64> = HashMap::new();
        let mut slots = Vec::with_capacity(lineup.slots.len());
        for slot in &lineup.slots {
            let pool_size = match pool_sizes.get(&slot.asset_type) {
                Some(&n) => n,
                None => {
                    let n = self.store.get_pool_size(slot.asset_type).await?;
                    pool_sizes.insert(slot.asset_type, n);
                    n
                }
            };
            let (stats, brand_stat) = if slot.asset_type == AssetType::Brand {
                (vec![], self.store.get_brand_stat(slot.asset_id, to).await?)
            } else {
                (
                    self.store.get_daily_stats(slot.asset_id, from, to).await?,
                    None,
                )
            };
            slots.push(SlotData {
                slot: slot.clone(),
                stats,
                brand_stat,
                pool_size,
            });
        }
        Ok(slots)
    }

    async fn stored_scores(
        &self,
        matchup: &Matchup,
        scope: &ScoringScope,
    ) -> Result<Option<(TeamScore, TeamScore)>> {
        let period = ScorePeriod::from_scope(*scope);
        let home = self.store.get_team_score(matchup.home_team_id, &period).await?;
        let away = self.store.get_team_score(matchup.away_team_id, &period).await?;
        Ok(home.zip(away))
    }

    async fn asset_infos(
        &self,
        home: &TeamScore,
        away: &TeamScore,
    ) -> Result<HashMap<i64, AssetInfo>> {
        let mut infos = HashMap::new();
        for id in home.asset_points.keys().chain(away.asset_points.keys()) {
            if infos.contains_key(id) {
                continue;
            }
            if let Some(info) = self.store.get_asset_info(*id).await? {
                infos.insert(*id, info);
            }
        }
        Ok(infos)
    }

    /// Log current scheduler status.
    pub async fn log_status(&self) {
        let stats = self.stats.read().await;
        info!(
            "Scheduler status: ticks={}, matches={}, rescores={}, plays={}, finalized={}, failures={}, last_tick={:?}",
            stats.ticks,
            stats.matches_processed,
            stats.rescore_passes,
            stats.plays_emitted,
            stats.matches_finalized,
            stats.failures,
            stats.last_tick
        );
    }
}

/// The halftime snapshot is due once: at/after the midpoint of the match
/// window, and only while it has not been captured yet. Open-ended matches
/// have no midpoint and never take one.
pub fn halftime_due(matchup: &Matchup, now: DateTime<Utc>) -> bool {
    matchup
        .halftime_at()
        .is_some_and(|t| now >= t && matchup.halftime_home.is_none())
}

/// The scoring scope a match is played under: the calendar date of its
/// start time (challenges are day-scoped; weekly season scoring runs
/// through the same aggregator under a weekly scope).
pub fn match_scope(matchup: &Matchup) -> ScoringScope {
    ScoringScope::Daily {
        date: matchup.start_time.date_naive(),
    }
}

/// Inclusive stat-date range a scope reads.
pub fn scope_date_range(scope: ScoringScope) -> (NaiveDate, NaiveDate) {
    match scope {
        ScoringScope::Daily { date } => (date, date),
        ScoringScope::Weekly { iso_year, iso_week } => {
            match scoring::iso_week_dates(iso_year, iso_week) {
                Some(dates) => (dates[0], dates[6]),
                // Invalid week number: an empty range, scores nothing.
                None => {
                    let d = NaiveDate::from_ymd_opt(iso_year, 1, 1).unwrap_or_default();
                    (d, d)
                }
            }
        }
    }
}
