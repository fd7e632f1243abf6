use std::{
    collections::{HashSet, VecDeque},
    sync::{Arc, Mutex, PoisonError},
};

use time::OffsetDateTime;

use crate::{kv::{KvStore, SharedKv}, ChatError};

use super::{Message, NewMessage};

/// Retention bound: the store never holds more than this many messages.
pub const RETENTION: usize = 100;

const MESSAGES_KEY: &str = "chat:messages";

/// Bounded, append-only message log.
///
/// Messages go to the durable key-value store when there is one, and are
/// always mirrored into a process-local log of the same bound. Reads combine
/// both, so chat keeps working (non-durably) through a storage outage.
#[derive(Clone)]
pub struct MessageStore {
    kv: SharedKv,
    fallback: Arc<Mutex<VecDeque<Message>>>,
}

impl MessageStore {
    pub fn new(kv: SharedKv) -> MessageStore {
        MessageStore {
            kv,
            fallback: Arc::new(Mutex::new(VecDeque::with_capacity(RETENTION))),
        }
    }

    pub fn is_durable(&self) -> bool {
        self.kv.is_some()
    }

    /// Validates and stores `candidate`. Only `InvalidInput` is ever returned;
    /// storage failures are logged and the message lives on in memory.
    pub async fn append(&self, candidate: NewMessage) -> Result<Message, ChatError> {
        let message = {
            let mut log = self.fallback.lock().unwrap_or_else(PoisonError::into_inner);

            let last = log.back().map_or(i64::MIN, |message| message.timestamp);
            let message = candidate.into_message(now_millis().max(last))?;

            log.push_back(message.clone());
            while log.len() > RETENTION {
                log.pop_front();
            }
            message
        };

        if let Some(kv) = &self.kv {
            if let Err(err) = persist(kv.as_ref(), &message).await {
                tracing::warn!(id = %message.id, "message kept in memory only: {err}");
            }
        }

        tracing::debug!(id = %message.id, sender = %message.sender_id, "message appended");
        Ok(message)
    }

    /// Up to `limit` (at most [`RETENTION`]) most recent messages, oldest first.
    ///
    /// Durable records are merged with the local log, so a message whose write
    /// failed is still listed after the store recovers.
    pub async fn recent(&self, limit: Option<usize>) -> Vec<Message> {
        let mut messages = self.snapshot();
        if let Some(kv) = &self.kv {
            match kv.list_range(MESSAGES_KEY, 0, -1).await {
                Ok(records) => messages.extend(records.iter().filter_map(|record| decode(record))),
                Err(err) => tracing::warn!("reading history from memory: {err}"),
            }
        }

        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));

        let mut seen = HashSet::with_capacity(messages.len());
        messages.retain(|message| seen.insert(message.id));

        let limit = limit.unwrap_or(RETENTION).min(RETENTION);
        let skip = messages.len().saturating_sub(limit);
        messages.split_off(skip)
    }

    fn snapshot(&self) -> Vec<Message> {
        let log = self.fallback.lock().unwrap_or_else(PoisonError::into_inner);
        log.iter().cloned().collect()
    }
}

async fn persist(kv: &dyn KvStore, message: &Message) -> Result<(), ChatError> {
    let record = serde_json::to_string(message)?;
    kv.list_append(MESSAGES_KEY, &record).await?;
    kv.list_trim(MESSAGES_KEY, -(RETENTION as i64), -1).await
}

fn decode(record: &str) -> Option<Message> {
    let parsed: Result<Message, ChatError> = serde_json::from_str(record).map_err(ChatError::from);
    match parsed {
        Ok(message) => Some(message),
        Err(err) => {
            tracing::debug!("skipping stored record: {err}");
            None
        }
    }
}

pub(crate) fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
