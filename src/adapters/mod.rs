pub mod postgres;
pub mod push;

pub use postgres::PostgresStore;
pub use push::{BroadcastPush, LiveEvent, LivePayload, PushDelivery, ScoringPlayEvent};
