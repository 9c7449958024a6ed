//! In-process consumer of the realtime alert channel.

use mwatch_engine::RealtimeEvent;
use tokio::sync::broadcast::{error::RecvError, Receiver};
use tokio::task::JoinHandle;

/// Log every event published on the channel until all senders are gone.
pub fn spawn_alert_logger(mut events: Receiver<RealtimeEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    tracing::info!(
                        event = %event.event,
                        rooms = ?event.rooms,
                        payload = %event.payload,
                        "realtime: published"
                    );
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "realtime: subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
