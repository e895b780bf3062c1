use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

use crate::domain::{
    AssetDailyStat, AssetInfo, AssetType, BrandRatingStat, BreakdownLine, Lineup, LineupSlot,
    MatchStatus, Matchup, ScorePeriod, ScoringBreakdown, SlotKind, TeamScore, WinCondition,
};
use crate::error::{LeafclashError, Result};

/// PostgreSQL storage adapter
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Create a store from an existing connection pool (zero-cost reuse)
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ==================== Daily stats ====================

    /// Stat rows for one asset over an inclusive date range, oldest first.
    /// Rows are produced by the upstream aggregation job; this core only
    /// ever reads them.
    pub async fn get_daily_stats(
        &self,
        asset_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AssetDailyStat>> {
        let rows = sqlx::query(
            r#"
            SELECT asset_id, asset_type, stat_date, order_count, current_rank,
                   previous_rank, consistency_score, velocity_score, streak_days,
                   market_share_percent, trend_multiplier, volume_1d, volume_7d,
                   volume_14d
            FROM asset_daily_stats
            WHERE asset_id = $1 AND stat_date BETWEEN $2 AND $3
            ORDER BY stat_date ASC
            "#,
        )
        .bind(asset_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_daily_stat).collect()
    }

    /// Latest brand rating stat at or before a date.
    pub async fn get_brand_stat(
        &self,
        asset_id: i64,
        on_or_before: NaiveDate,
    ) -> Result<Option<BrandRatingStat>> {
        let row = sqlx::query(
            r#"
            SELECT asset_id, stat_date, avg_rating, review_count, current_rank,
                   previous_rank
            FROM brand_rating_stats
            WHERE asset_id = $1 AND stat_date <= $2
            ORDER BY stat_date DESC
            LIMIT 1
            "#,
        )
        .bind(asset_id)
        .bind(on_or_before)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| BrandRatingStat {
            asset_id: r.get("asset_id"),
            stat_date: r.get("stat_date"),
            avg_rating: r.get("avg_rating"),
            review_count: r.get("review_count"),
            current_rank: r.get("current_rank"),
            previous_rank: r.get("previous_rank"),
        }))
    }

    /// Display metadata for one asset.
    pub async fn get_asset_info(&self, asset_id: i64) -> Result<Option<AssetInfo>> {
        let row = sqlx::query(
            r#"SELECT id, asset_type, name, image_url FROM assets WHERE id = $1"#,
        )
        .bind(asset_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            let type_str: String = r.get("asset_type");
            let asset_type = AssetType::parse(&type_str)
                .ok_or_else(|| LeafclashError::Internal(format!("unknown asset type {type_str}")))?;
            Ok(AssetInfo {
                asset_id: r.get("id"),
                asset_type,
                name: r.get("name"),
                image_url: r.get("image_url"),
            })
        })
        .transpose()
    }

    /// Total population of an archetype, for the scarcity multiplier.
    pub async fn get_pool_size(&self, asset_type: AssetType) -> Result<i64> {
        let row = sqlx::query(r#"SELECT COUNT(*) AS n FROM assets WHERE asset_type = $1"#)
            .bind(asset_type.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    // ==================== Lineups ====================

    /// A team's lineup for one period. Owned by the roster subsystem;
    /// read-only here. Unpopulated slots are simply absent.
    pub async fn get_lineup(&self, team_id: i64, period: &ScorePeriod) -> Result<Lineup> {
        let rows = sqlx::query(
            r#"
            SELECT slot, asset_id, asset_type
            FROM lineup_slots
            WHERE team_id = $1 AND period_key = $2
            "#,
        )
        .bind(team_id)
        .bind(period.key())
        .fetch_all(&self.pool)
        .await?;

        let mut slots = Vec::with_capacity(rows.len());
        for r in &rows {
            let slot_str: String = r.get("slot");
            let type_str: String = r.get("asset_type");
            let slot = SlotKind::parse(&slot_str)
                .ok_or_else(|| LeafclashError::Internal(format!("unknown slot {slot_str}")))?;
            let asset_type = AssetType::parse(&type_str)
                .ok_or_else(|| LeafclashError::Internal(format!("unknown asset type {type_str}")))?;
            slots.push(LineupSlot {
                slot,
                asset_id: r.get("asset_id"),
                asset_type,
            });
        }
        Ok(Lineup { team_id, slots })
    }

    // ==================== Team scores ====================

    /// Persist a computed team score.
    ///
    /// Upserts the (team, period) row, then — inside the same transaction,
    /// serialized by an advisory lock on the row id — replaces the breakdown
    /// detail rows wholesale. Two overlapping recomputes of the same score
    /// serialize here instead of racing on breakdown duplication.
    #[instrument(skip(self, score), fields(team_id = score.team_id, period = %score.period))]
    pub async fn save_team_score(&self, score: &TeamScore) -> Result<i64> {
        let slot_points: HashMap<String, f64> = score
            .slot_points
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), *v))
            .collect();
        let asset_points: HashMap<String, f64> = score
            .asset_points
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO team_scores (team_id, period_key, subtotal, bonus_total,
                                     penalty_total, grand_total, slot_points,
                                     asset_points, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            ON CONFLICT (team_id, period_key) DO UPDATE SET
                subtotal = EXCLUDED.subtotal,
                bonus_total = EXCLUDED.bonus_total,
                penalty_total = EXCLUDED.penalty_total,
                grand_total = EXCLUDED.grand_total,
                slot_points = EXCLUDED.slot_points,
                asset_points = EXCLUDED.asset_points,
                updated_at = NOW()
            RETURNING id
            "#,
        )
        .bind(score.team_id)
        .bind(score.period.key())
        .bind(score.subtotal)
        .bind(score.bonus_total)
        .bind(score.penalty_total)
        .bind(score.grand_total)
        .bind(serde_json::to_value(&slot_points)?)
        .bind(serde_json::to_value(&asset_points)?)
        .fetch_one(&mut *tx)
        .await?;
        let score_id: i64 = row.get("id");

        // Held until commit; concurrent recomputes of this row queue here.
        sqlx::query(r#"SELECT pg_advisory_xact_lock($1)"#)
            .bind(score_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(r#"DELETE FROM score_breakdowns WHERE team_score_id = $1"#)
            .bind(score_id)
            .execute(&mut *tx)
            .await?;

        let mut order = 0i32;
        for (section, lines) in [
            ("component", &score.breakdown.components),
            ("bonus", &score.breakdown.bonuses),
            ("penalty", &score.breakdown.penalties),
        ] {
            for line in lines.iter() {
                sqlx::query(
                    r#"
                    INSERT INTO score_breakdowns
                        (team_score_id, section, label, condition, points, line_order)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(score_id)
                .bind(section)
                .bind(&line.label)
                .bind(&line.condition)
                .bind(line.points)
                .bind(order)
                .execute(&mut *tx)
                .await?;
                order += 1;
            }
        }

        tx.commit().await?;
        debug!("Saved team score {} ({} breakdown rows)", score_id, order);
        Ok(score_id)
    }

    /// Load a stored team score with its breakdown rows.
    pub async fn get_team_score(
        &self,
        team_id: i64,
        period: &ScorePeriod,
    ) -> Result<Option<TeamScore>> {
        let row = sqlx::query(
            r#"
            SELECT id, team_id, period_key, subtotal, bonus_total, penalty_total,
                   grand_total, slot_points, asset_points
            FROM team_scores
            WHERE team_id = $1 AND period_key = $2
            "#,
        )
        .bind(team_id)
        .bind(period.key())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let score_id: i64 = row.get("id");

        let line_rows = sqlx::query(
            r#"
            SELECT section, label, condition, points
            FROM score_breakdowns
            WHERE team_score_id = $1
            ORDER BY line_order ASC
            "#,
        )
        .bind(score_id)
        .fetch_all(&self.pool)
        .await?;

        let mut breakdown = ScoringBreakdown {
            subtotal: row.get("subtotal"),
            total: row.get("grand_total"),
            ..Default::default()
        };
        for r in &line_rows {
            let section: String = r.get("section");
            let line = BreakdownLine {
                label: r.get("label"),
                condition: r.get("condition"),
                points: r.get("points"),
            };
            match section.as_str() {
                "component" => breakdown.components.push(line),
                "bonus" => breakdown.bonuses.push(line),
                _ => breakdown.penalties.push(line),
            }
        }

        let period_key: String = row.get("period_key");
        let period = ScorePeriod::parse(&period_key)
            .ok_or_else(|| LeafclashError::Internal(format!("bad period key {period_key}")))?;

        let slot_points_json: serde_json::Value = row.get("slot_points");
        let raw_slots: HashMap<String, f64> = serde_json::from_value(slot_points_json)?;
        let mut slot_points = HashMap::new();
        for (k, v) in raw_slots {
            let slot = SlotKind::parse(&k)
                .ok_or_else(|| LeafclashError::Internal(format!("unknown slot {k}")))?;
            slot_points.insert(slot, v);
        }

        let asset_points_json: serde_json::Value = row.get("asset_points");
        let raw_assets: HashMap<String, f64> = serde_json::from_value(asset_points_json)?;
        let mut asset_points = HashMap::new();
        for (k, v) in raw_assets {
            let id: i64 = k
                .parse()
                .map_err(|_| LeafclashError::Internal(format!("bad asset key {k}")))?;
            asset_points.insert(id, v);
        }

        Ok(Some(TeamScore {
            id: Some(score_id),
            team_id: row.get("team_id"),
            period,
            slot_points,
            asset_points,
            subtotal: row.get("subtotal"),
            bonus_total: row.get("bonus_total"),
            penalty_total: row.get("penalty_total"),
            grand_total: row.get("grand_total"),
            breakdown,
            slot_context: vec![],
        }))
    }

    // ==================== Matchups ====================

    /// All matches not yet complete.
    pub async fn list_open_matches(&self) -> Result<Vec<Matchup>> {
        let rows = sqlx::query(
            r#"
            SELECT m.id, m.home_team_id, m.away_team_id, m.status, m.start_time,
                   m.end_time, m.overtime_ends_at, m.halftime_home, m.halftime_away,
                   m.winner_team_id, m.win_condition,
                   ht.name AS home_name, away_t.name AS away_name
            FROM matchups m
            JOIN teams ht ON ht.id = m.home_team_id
            JOIN teams away_t ON away_t.id = m.away_team_id
            WHERE m.status <> 'complete'
            ORDER BY m.id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_matchup).collect()
    }

    pub async fn get_matchup(&self, match_id: i64) -> Result<Matchup> {
        let row = sqlx::query(
            r#"
            SELECT m.id, m.home_team_id, m.away_team_id, m.status, m.start_time,
                   m.end_time, m.overtime_ends_at, m.halftime_home, m.halftime_away,
                   m.winner_team_id, m.win_condition,
                   ht.name AS home_name, away_t.name AS away_name
            FROM matchups m
            JOIN teams ht ON ht.id = m.home_team_id
            JOIN teams away_t ON away_t.id = m.away_team_id
            WHERE m.id = $1
            "#,
        )
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => map_matchup(&r),
            None => Err(LeafclashError::MatchNotFound(match_id)),
        }
    }

    /// Record the halftime snapshot once. The status guard makes this a
    /// no-op if the match moved on in the meantime.
    pub async fn set_halftime(&self, match_id: i64, home: f64, away: f64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE matchups
            SET halftime_home = $2, halftime_away = $3
            WHERE id = $1 AND status = 'active' AND halftime_home IS NULL
            "#,
        )
        .bind(match_id)
        .bind(home)
        .bind(away)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// ACTIVE → OVERTIME. Guarded on current status so the transition is
    /// taken at most once.
    pub async fn begin_overtime(
        &self,
        match_id: i64,
        ends_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE matchups
            SET status = 'overtime', overtime_ends_at = $2
            WHERE id = $1 AND status = 'active'
            "#,
        )
        .bind(match_id)
        .bind(ends_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Finalize a match. Terminal; guarded so a completed match is never
    /// re-decided.
    pub async fn complete_match(
        &self,
        match_id: i64,
        winner_team_id: i64,
        condition: WinCondition,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE matchups
            SET status = 'complete', winner_team_id = $2, win_condition = $3
            WHERE id = $1 AND status <> 'complete'
            "#,
        )
        .bind(match_id)
        .bind(winner_team_id)
        .bind(condition.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn map_daily_stat(row: &sqlx::postgres::PgRow) -> Result<AssetDailyStat> {
    let type_str: String = row.get("asset_type");
    let asset_type = AssetType::parse(&type_str)
        .ok_or_else(|| LeafclashError::Internal(format!("unknown asset type {type_str}")))?;
    Ok(AssetDailyStat {
        asset_id: row.get("asset_id"),
        asset_type,
        stat_date: row.get("stat_date"),
        order_count: row.get("order_count"),
        current_rank: row.get("current_rank"),
        previous_rank: row.get("previous_rank"),
        consistency_score: row.get("consistency_score"),
        velocity_score: row.get("velocity_score"),
        streak_days: row.get("streak_days"),
        market_share_percent: row.get("market_share_percent"),
        trend_multiplier: row.get("trend_multiplier"),
        volume_1d: row.get("volume_1d"),
        volume_7d: row.get("volume_7d"),
        volume_14d: row.get("volume_14d"),
    })
}

fn map_matchup(row: &sqlx::postgres::PgRow) -> Result<Matchup> {
    let status_str: String = row.get("status");
    let status = MatchStatus::parse(&status_str)
        .ok_or_else(|| LeafclashError::Internal(format!("unknown match status {status_str}")))?;
    Ok(Matchup {
        id: row.get("id"),
        home_team_id: row.get("home_team_id"),
        away_team_id: row.get("away_team_id"),
        home_team_name: row.get("home_name"),
        away_team_name: row.get("away_name"),
        status,
        start_time: row.get("start_time"),
        end_time: row.get("end_time"),
        overtime_ends_at: row.get("overtime_ends_at"),
        halftime_home: row.get("halftime_home"),
        halftime_away: row.get("halftime_away"),
        winner_team_id: row.get("winner_team_id"),
        win_condition: row
            .get::<Option<String>, _>("win_condition")
            .and_then(|s| WinCondition::parse(&s)),
    })
}
