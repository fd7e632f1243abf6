use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::messages::{now_millis, Message};

/// Envelope written as the `data:` of every live feed frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum LiveEvent {
    Connected { client_id: Uuid },
    Heartbeat { timestamp: i64 },
    NewMessage { message: Message },
}

impl LiveEvent {
    pub fn heartbeat() -> LiveEvent {
        LiveEvent::Heartbeat { timestamp: now_millis() }
    }
}
