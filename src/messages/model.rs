use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{session::Identity, ChatError};

/// A stored chat message. `is_own` is a per-viewer flag recomputed by each
/// client, so it is always `false` here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub text: String,
    pub sender_id: String,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub sender_avatar: Option<String>,
    /// Unix milliseconds.
    pub timestamp: i64,
    #[serde(default)]
    pub is_own: bool,
}

/// Unvalidated submission.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub text: Option<String>,
    pub sender_id: Option<String>,
    #[serde(alias = "userName")]
    pub sender_name: Option<String>,
    pub sender_avatar: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
}

impl NewMessage {
    pub fn text(text: impl Into<String>) -> NewMessage {
        NewMessage {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn sent_by(mut self, sender_name: impl Into<String>) -> NewMessage {
        self.sender_name = Some(sender_name.into());
        self
    }

    /// Fills sender fields the client left out from the logged-in identity.
    pub fn with_identity(mut self, identity: Option<Identity>) -> NewMessage {
        let Some(identity) = identity else {
            return self;
        };

        if nonblank(self.sender_id.as_deref()).is_none() {
            self.sender_id = Some(identity.id);
        }
        if nonblank(self.sender_name.as_deref()).is_none() {
            self.sender_name = identity.name;
        }
        if nonblank(self.sender_avatar.as_deref()).is_none() {
            self.sender_avatar = identity.avatar;
        }
        self
    }

    pub(crate) fn into_message(self, timestamp: i64) -> Result<Message, ChatError> {
        let text = nonblank(self.text.as_deref())
            .ok_or(ChatError::InvalidInput("Message text is required"))?
            .to_owned();

        if self.is_bot {
            return Ok(Message {
                id: Uuid::now_v7(),
                text,
                sender_id: "bot".to_owned(),
                sender_name: Some("Bot".to_owned()),
                sender_avatar: None,
                timestamp,
                is_own: false,
            });
        }

        let sender_name = nonblank(self.sender_name.as_deref()).map(str::to_owned);
        let sender_id = nonblank(self.sender_id.as_deref())
            .map(str::to_owned)
            .or_else(|| sender_name.clone())
            .unwrap_or_else(|| "anonymous".to_owned());

        Ok(Message {
            id: Uuid::now_v7(),
            text,
            sender_id,
            sender_name,
            sender_avatar: nonblank(self.sender_avatar.as_deref()).map(str::to_owned),
            timestamp,
            is_own: false,
        })
    }
}

fn nonblank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
