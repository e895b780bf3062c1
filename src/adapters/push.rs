//! Live-event delivery contract.
//!
//! Only the contract lives here: the real push transport is an external
//! collaborator that subscribes to the in-process broadcast channel and
//! fans events out however it likes. Events are fire-and-forget; nothing in
//! this core waits on delivery.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{AssetType, WinCondition};
use crate::error::Result;

/// One asset's point gain between two scoring passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringPlayEvent {
    pub attacking_team_id: i64,
    pub attacking_team_name: String,
    pub defending_team_id: i64,
    pub defending_team_name: String,
    pub asset_id: i64,
    pub asset_name: String,
    pub asset_type: AssetType,
    pub points_gained: f64,
    pub attacking_team_total: f64,
    pub defending_team_total: f64,
    pub asset_image_url: Option<String>,
    pub slot_position: Option<String>,
}

/// Everything the core pushes onto the live channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum LivePayload {
    ScoringPlay(ScoringPlayEvent),
    Halftime {
        home_team_total: f64,
        away_team_total: f64,
    },
    OvertimeStarted {
        home_team_total: f64,
        away_team_total: f64,
        ends_at: DateTime<Utc>,
    },
    MatchFinal {
        winner_team_id: i64,
        winner_team_name: String,
        win_condition: WinCondition,
        home_team_total: f64,
        away_team_total: f64,
    },
}

/// Delivery envelope, keyed by match id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveEvent {
    pub event_id: Uuid,
    pub match_id: i64,
    pub emitted_at: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: LivePayload,
}

impl LiveEvent {
    pub fn new(match_id: i64, payload: LivePayload) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            match_id,
            emitted_at: Utc::now(),
            payload,
        }
    }
}

/// Delivery contract the broadcaster and overtime engine push through.
#[async_trait]
pub trait PushDelivery: Send + Sync {
    async fn deliver(&self, event: LiveEvent) -> Result<()>;
}

/// In-process delivery over a tokio broadcast channel. The out-of-scope
/// transport subscribes and forwards; an empty subscriber set is fine.
#[derive(Clone)]
pub struct BroadcastPush {
    tx: broadcast::Sender<LiveEvent>,
}

impl BroadcastPush {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl PushDelivery for BroadcastPush {
    async fn deliver(&self, event: LiveEvent) -> Result<()> {
        // send() errors only when there are no subscribers; delivery is
        // best-effort so that is not a failure.
        match self.tx.send(event) {
            Ok(n) => debug!("Delivered live event to {} subscribers", n),
            Err(_) => debug!("No live-event subscribers; event dropped"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_delivery() {
        let push = BroadcastPush::new(16);
        let mut rx = push.subscribe();

        let event = LiveEvent::new(
            5,
            LivePayload::Halftime {
                home_team_total: 410.0,
                away_team_total: 395.5,
            },
        );
        push.deliver(event.clone()).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.match_id, 5);
        assert_eq!(received.event_id, event.event_id);
    }

    #[tokio::test]
    async fn test_delivery_without_subscribers_is_ok() {
        let push = BroadcastPush::new(16);
        let event = LiveEvent::new(
            1,
            LivePayload::Halftime {
                home_team_total: 0.0,
                away_team_total: 0.0,
            },
        );
        assert!(push.deliver(event).await.is_ok());
    }

    #[test]
    fn test_event_json_shape() {
        let event = LiveEvent::new(
            3,
            LivePayload::MatchFinal {
                winner_team_id: 10,
                winner_team_name: "Kush Kings".into(),
                win_condition: WinCondition::GoldenGoal,
                home_team_total: 512.0,
                away_team_total: 480.0,
            },
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "match_final");
        assert_eq!(json["match_id"], 3);
        assert_eq!(json["win_condition"], "golden_goal");
    }
}
