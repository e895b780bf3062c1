//! Command-line interface definitions and one-shot command handlers.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::adapters::PostgresStore;
use crate::domain::{AssetType, ScoringScope};
use crate::error::{LeafclashError, Result};
use crate::scoring;

#[derive(Parser)]
#[command(name = "leafclash", version, about = "Fantasy scoring engine for cannabis market assets")]
pub struct Cli {
    /// Configuration directory
    #[arg(long, default_value = "config", env = "LEAFCLASH_CONFIG_DIR")]
    pub config_dir: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the match scheduler daemon
    Serve,
    /// Recompute one team's score for a day or an ISO week
    Rescore {
        /// Team id
        #[arg(long)]
        team: i64,
        /// Calendar date (daily scope), e.g. 2026-03-09
        #[arg(long, conflicts_with = "week")]
        date: Option<NaiveDate>,
        /// ISO week (weekly scope), e.g. 2026-W11
        #[arg(long)]
        week: Option<String>,
    },
    /// Print one asset's scoring breakdown for a date (audit tool)
    ScoreAsset {
        /// Asset id
        #[arg(long)]
        asset: i64,
        /// Calendar date
        #[arg(long)]
        date: NaiveDate,
    },
}

/// Resolve the scope from the rescore command's arguments.
pub fn rescore_scope(date: Option<NaiveDate>, week: Option<&str>) -> Result<ScoringScope> {
    match (date, week) {
        (Some(date), None) => Ok(ScoringScope::Daily { date }),
        (None, Some(week)) => parse_week(week),
        (None, None) => Ok(ScoringScope::Daily {
            date: chrono::Utc::now().date_naive(),
        }),
        (Some(_), Some(_)) => Err(LeafclashError::Validation(
            "pass either --date or --week, not both".to_string(),
        )),
    }
}

fn parse_week(week: &str) -> Result<ScoringScope> {
    let (year, week_no) = week
        .split_once("-W")
        .ok_or_else(|| LeafclashError::Validation(format!("bad week {week}, expected YYYY-Wnn")))?;
    let iso_year = year
        .parse()
        .map_err(|_| LeafclashError::Validation(format!("bad year in {week}")))?;
    let iso_week = week_no
        .parse()
        .map_err(|_| LeafclashError::Validation(format!("bad week number in {week}")))?;
    if scoring::iso_week_dates(iso_year, iso_week).is_none() {
        return Err(LeafclashError::Validation(format!(
            "{iso_year} has no ISO week {iso_week}"
        )));
    }
    Ok(ScoringScope::Weekly { iso_year, iso_week })
}

/// Print one asset's trend breakdown for a date.
pub async fn score_asset(store: &PostgresStore, asset_id: i64, date: NaiveDate) -> Result<()> {
    let info = store
        .get_asset_info(asset_id)
        .await?
        .ok_or_else(|| LeafclashError::Validation(format!("unknown asset {asset_id}")))?;

    let breakdown = if info.asset_type == AssetType::Brand {
        let stat = store.get_brand_stat(asset_id, date).await?.ok_or_else(|| {
            LeafclashError::Validation(format!("no brand stats for asset {asset_id} on {date}"))
        })?;
        scoring::brand::score(&stat)
    } else {
        let stats = store.get_daily_stats(asset_id, date, date).await?;
        let stat = stats.first().ok_or_else(|| {
            LeafclashError::Validation(format!("no stats for asset {asset_id} on {date}"))
        })?;
        scoring::trend::score(info.asset_type, stat)
    };

    println!("{} ({}) on {date}", info.name, info.asset_type);
    print!("{}", scoring::render_text(&scoring::format(&breakdown)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rescore_scope_from_date() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert_eq!(
            rescore_scope(Some(date), None).unwrap(),
            ScoringScope::Daily { date }
        );
    }

    #[test]
    fn test_rescore_scope_from_week() {
        assert_eq!(
            rescore_scope(None, Some("2026-W11")).unwrap(),
            ScoringScope::Weekly {
                iso_year: 2026,
                iso_week: 11
            }
        );
    }

    #[test]
    fn test_bad_week_rejected() {
        assert!(rescore_scope(None, Some("2026-11")).is_err());
        assert!(rescore_scope(None, Some("2026-W60")).is_err());
    }
}
