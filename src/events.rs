//! Change markers for open ticket views. Mutations publish a table + ticket
//! id pair; subscribers get no row payload and are expected to re-fetch.
//! Dropping a receiver is the whole teardown story, so a closed SSE stream
//! cannot leak a subscription.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Serialize)]
pub struct ChangeEvent {
    pub table: &'static str,
    pub ticket_id: Uuid,
}

#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Best-effort: with no open subscriber the marker is simply dropped.
    pub fn publish(&self, table: &'static str, ticket_id: Uuid) {
        let _ = self.tx.send(ChangeEvent { table, ticket_id });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}
