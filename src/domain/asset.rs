use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Archetype of a scoreable asset.
///
/// Manufacturer, Pharmacy, Cultivar and Product are scored by the trend
/// formula; Brand uses the rating-based formula instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Manufacturer,
    Pharmacy,
    Cultivar,
    Product,
    Brand,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Manufacturer => "manufacturer",
            AssetType::Pharmacy => "pharmacy",
            AssetType::Cultivar => "cultivar",
            AssetType::Product => "product",
            AssetType::Brand => "brand",
        }
    }

    /// Parse from a storage string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manufacturer" => Some(AssetType::Manufacturer),
            "pharmacy" => Some(AssetType::Pharmacy),
            "cultivar" => Some(AssetType::Cultivar),
            "product" => Some(AssetType::Product),
            "brand" => Some(AssetType::Brand),
            _ => None,
        }
    }

    /// Whether this archetype is scored by the trend formula.
    pub fn uses_trend_formula(&self) -> bool {
        !matches!(self, AssetType::Brand)
    }
}

impl std::fmt::Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One asset's finalized metrics for one calendar date.
///
/// Produced by the upstream aggregation job; immutable once a day closes.
/// The scoring engine only ever reads these rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetDailyStat {
    pub asset_id: i64,
    pub asset_type: AssetType,
    pub stat_date: NaiveDate,
    /// Orders attributed to the asset on this date.
    pub order_count: i64,
    /// 1-based leaderboard position; 0 means unranked.
    pub current_rank: i64,
    /// Previous day's leaderboard position; 0 means unranked.
    pub previous_rank: i64,
    /// 0-100 stability measure from the aggregation job.
    pub consistency_score: f64,
    /// Signed momentum acceleration.
    pub velocity_score: f64,
    /// Consecutive days in the top 10.
    pub streak_days: i64,
    /// 0-100 share of the archetype's total volume.
    pub market_share_percent: f64,
    /// Precomputed trend multiplier, if the aggregation job supplied one.
    pub trend_multiplier: Option<f64>,
    /// Same-day volume, used to recompute the multiplier when absent.
    pub volume_1d: f64,
    /// Trailing 7-day volume.
    pub volume_7d: f64,
    /// Trailing 14-day volume.
    pub volume_14d: f64,
}

/// Rating metrics for a brand asset, from the reference-data collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandRatingStat {
    pub asset_id: i64,
    pub stat_date: NaiveDate,
    /// Average user rating, 0.0-5.0.
    pub avg_rating: f64,
    pub review_count: i64,
    /// 1-based brand leaderboard position; 0 means unranked.
    pub current_rank: i64,
    pub previous_rank: i64,
}

/// Display metadata for an asset, resolved from the reference-data
/// collaborator when broadcasting plays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetInfo {
    pub asset_id: i64,
    pub asset_type: AssetType,
    pub name: String,
    pub image_url: Option<String>,
}
