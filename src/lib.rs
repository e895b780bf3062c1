pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod scoring;
pub mod services;

pub use adapters::{BroadcastPush, LiveEvent, LivePayload, PostgresStore, PushDelivery};
pub use config::AppConfig;
pub use error::{LeafclashError, Result};
pub use services::{MatchScheduler, OvertimeEngine, ScoreBroadcaster};
