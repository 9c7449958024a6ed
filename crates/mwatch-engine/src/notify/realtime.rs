use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Event name pushed for every new alert.
pub const ALERT_EVENT: &str = "alert";

const CHANNEL_CAPACITY: usize = 256;

/// One delivery addressed to the union of `rooms`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealtimeEvent {
    pub rooms: Vec<String>,
    pub event: String,
    pub payload: Value,
}

#[async_trait]
pub trait RealtimePublisher: Send + Sync {
    /// Deliver `payload` once to every subscriber of any of `rooms`.
    async fn publish(&self, rooms: &[String], event: &str, payload: &Value);
}

/// `user:{account}` and `project:{project}`.
#[must_use]
pub fn alert_rooms(account_id: Uuid, project_id: Uuid) -> Vec<String> {
    vec![format!("user:{account_id}"), format!("project:{project_id}")]
}

/// In-process publisher over a `tokio` broadcast channel. Subscribers filter
/// by room on their side.
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    tx: broadcast::Sender<RealtimeEvent>,
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastPublisher {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl RealtimePublisher for BroadcastPublisher {
    async fn publish(&self, rooms: &[String], event: &str, payload: &Value) {
        if rooms.is_empty() {
            return;
        }
        let message = RealtimeEvent {
            rooms: rooms.to_vec(),
            event: event.to_string(),
            payload: payload.clone(),
        };
        if self.tx.send(message).is_err() {
            tracing::debug!(event, "no realtime subscribers");
        }
    }
}
