//! Outbound side of the messaging platform.
//!
//! The relay never formats buttons or talks HTTP itself; it hands a
//! [`Transport`] a payload plus an abstract [`Actions`] set and gets back the
//! platform message id.

use async_trait::async_trait;
use thiserror::Error;

use masque_shared::{AccountId, Actions, MessageId, Payload, RelayError};

/// A message about to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub payload: Payload,
    /// Thread the message under this id in the destination chat.
    pub reply_to: Option<MessageId>,
    pub actions: Actions,
}

impl Outgoing {
    pub fn text(text: impl Into<String>, actions: Actions) -> Self {
        Self {
            payload: Payload::text(text),
            reply_to: None,
            actions,
        }
    }

    pub fn threaded(mut self, reply_to: MessageId) -> Self {
        self.reply_to = Some(reply_to);
        self
    }
}

/// What an edit replaces on an existing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditContent {
    Text(String),
    Caption(String),
    /// Only swap the attached actions.
    ActionsOnly,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The recipient blocked the bot or the chat no longer exists.
    #[error("recipient unreachable")]
    Unreachable,

    #[error("rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    #[error("request timed out")]
    Timeout,

    #[error("platform rejected request ({code}): {description}")]
    Api { code: u16, description: String },

    #[error("http error: {0}")]
    Http(String),
}

impl From<TransportError> for RelayError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Unreachable => RelayError::Unreachable,
            other => RelayError::Transport(other.to_string()),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, chat: AccountId, message: Outgoing) -> Result<MessageId, TransportError>;

    async fn edit(
        &self,
        chat: AccountId,
        message: MessageId,
        content: EditContent,
        actions: Actions,
    ) -> Result<(), TransportError>;

    async fn delete(&self, chat: AccountId, message: MessageId) -> Result<(), TransportError>;

    /// Acknowledge an action button, optionally with a toast or alert.
    async fn answer_action(
        &self,
        action_id: &str,
        text: Option<String>,
        alert: bool,
    ) -> Result<(), TransportError>;
}
