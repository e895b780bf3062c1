use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Scheduler tick interval in seconds (must stay at or under a minute so
    /// overtime polling keeps its once-per-minute guarantee)
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    /// Minutes between full rescoring passes
    #[serde(default = "default_rescore_minutes")]
    pub rescore_interval_minutes: u64,
    /// Score margin at or under which regulation ends in overtime
    #[serde(default = "default_overtime_threshold")]
    pub overtime_threshold: f64,
    /// Overtime window length in minutes
    #[serde(default = "default_overtime_minutes")]
    pub overtime_window_minutes: u64,
    /// Lead that wins immediately during overtime
    #[serde(default = "default_golden_goal_lead")]
    pub golden_goal_lead: f64,
}

fn default_tick_secs() -> u64 {
    60
}

fn default_rescore_minutes() -> u64 {
    10
}

fn default_overtime_threshold() -> f64 {
    50.0
}

fn default_overtime_minutes() -> u64 {
    60
}

fn default_golden_goal_lead() -> f64 {
    25.0
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
            rescore_interval_minutes: default_rescore_minutes(),
            overtime_threshold: default_overtime_threshold(),
            overtime_window_minutes: default_overtime_minutes(),
            golden_goal_lead: default_golden_goal_lead(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastConfig {
    /// Minimum point gain for an asset to produce a play event
    #[serde(default = "default_play_threshold")]
    pub play_threshold: f64,
    /// Minimum spacing between queued play events, in seconds
    #[serde(default = "default_min_gap_secs")]
    pub min_event_gap_secs: u64,
    /// Window over which one pass's events are spread, in minutes
    #[serde(default = "default_window_minutes")]
    pub window_minutes: u64,
}

fn default_play_threshold() -> f64 {
    0.5
}

fn default_min_gap_secs() -> u64 {
    15
}

fn default_window_minutes() -> u64 {
    10
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            play_threshold: default_play_threshold(),
            min_event_gap_secs: default_min_gap_secs(),
            window_minutes: default_window_minutes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("database.max_connections", 5)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("LEAFCLASH_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (LEAFCLASH_DATABASE__URL, etc.)
            .add_source(
                Environment::with_prefix("LEAFCLASH")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.scheduler.tick_secs == 0 || self.scheduler.tick_secs > 60 {
            errors.push("scheduler.tick_secs must be between 1 and 60".to_string());
        }

        if self.scheduler.rescore_interval_minutes == 0 {
            errors.push("scheduler.rescore_interval_minutes must be positive".to_string());
        }

        if self.scheduler.overtime_threshold < 0.0 {
            errors.push("scheduler.overtime_threshold must be non-negative".to_string());
        }

        if self.scheduler.golden_goal_lead <= 0.0 {
            errors.push("scheduler.golden_goal_lead must be positive".to_string());
        }

        if self.broadcast.play_threshold <= 0.0 {
            errors.push("broadcast.play_threshold must be positive".to_string());
        }

        if self.broadcast.min_event_gap_secs == 0 {
            errors.push("broadcast.min_event_gap_secs must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig {
            database: DatabaseConfig {
                url: "postgres://localhost/leafclash".to_string(),
                max_connections: 5,
            },
            scheduler: SchedulerConfig::default(),
            broadcast: BroadcastConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_defaults_validate() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_tick_over_a_minute_rejected() {
        let mut cfg = base_config();
        cfg.scheduler.tick_secs = 120;
        let errors = cfg.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("tick_secs")));
    }

    #[test]
    fn test_zero_play_threshold_rejected() {
        let mut cfg = base_config();
        cfg.broadcast.play_threshold = 0.0;
        assert!(cfg.validate().is_err());
    }
}
