use thiserror::Error;

/// Main error type for the scoring engine
#[derive(Error, Debug)]
pub enum LeafclashError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Match lifecycle errors
    #[error("Match not found: {0}")]
    MatchNotFound(i64),

    #[error("Invalid state transition: from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // Scoring-pass errors
    #[error("Team not found: {0}")]
    TeamNotFound(i64),

    #[error("Lineup unavailable for team {team_id} period {period}")]
    LineupUnavailable { team_id: i64, period: String },

    #[error("Score not yet computed for team {team_id} period {period}")]
    ScoreUnavailable { team_id: i64, period: String },

    // Delivery errors
    #[error("Push delivery failed: {0}")]
    PushDelivery(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for LeafclashError
pub type Result<T> = std::result::Result<T, LeafclashError>;
