use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted after successful mutations. Consumed in-process
/// by [`process_events`]; services never block on delivery beyond the
/// channel send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// One size-group load was committed into a cold room.
    LoadCommitted {
        unique_key: String,
        counting_record_id: Uuid,
        cold_room_id: Uuid,
        quantity: i32,
        loaded_total: i32,
        at: DateTime<Utc>,
    },
    /// Administrative balance reset for one size-group key.
    BalanceReset { unique_key: String },
    /// The whole balance store was wiped.
    BalanceCleared { entries_removed: u64 },
    /// The balance store was recomputed from cold-room inventory.
    BalanceRebuilt { entries_written: usize },
    PalletCreated {
        pallet_id: Uuid,
        cold_room_id: Uuid,
        total_boxes: i32,
    },
    PalletDissolved {
        pallet_id: Uuid,
        boxes_returned: i32,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Drains the event channel, logging each event. Runs for the lifetime of
/// the process; exits when every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    while let Some(event) = rx.recv().await {
        match &event {
            Event::LoadCommitted {
                unique_key,
                cold_room_id,
                quantity,
                loaded_total,
                ..
            } => {
                info!(
                    unique_key = %unique_key,
                    cold_room_id = %cold_room_id,
                    quantity,
                    loaded_total,
                    "load committed"
                );
            }
            Event::BalanceReset { unique_key } => {
                warn!(unique_key = %unique_key, "balance reset");
            }
            Event::BalanceCleared { entries_removed } => {
                warn!(entries_removed, "balance store cleared");
            }
            Event::BalanceRebuilt { entries_written } => {
                warn!(entries_written, "balance store rebuilt from inventory");
            }
            Event::PalletCreated {
                pallet_id,
                cold_room_id,
                total_boxes,
            } => {
                info!(pallet_id = %pallet_id, cold_room_id = %cold_room_id, total_boxes, "pallet created");
            }
            Event::PalletDissolved {
                pallet_id,
                boxes_returned,
            } => {
                info!(pallet_id = %pallet_id, boxes_returned, "pallet dissolved");
            }
        }
    }
    info!("event channel closed; event processor exiting");
}
