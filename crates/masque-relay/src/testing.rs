//! Test doubles shared by the relay's unit tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use masque_shared::constants::DEFAULT_STATE_VERSION;
use masque_shared::{
    AccountId, Actions, Anchor, Command, Envelope, MessageId, Mode, Payload, Pseudonym,
};
use masque_store::{Database, NewAccount};

use crate::relay::{Relay, RelaySettings};
use crate::transport::{EditContent, Outgoing, Transport, TransportError};

pub const MODERATOR: AccountId = AccountId(900);
pub const SUPPORT: AccountId = AccountId(999);

/// Insert an account directly and return its pseudonym.
pub fn seed_account(db: &Database, id: i64) -> Pseudonym {
    let pseudonym = Pseudonym::generate();
    db.insert_account(&NewAccount {
        account_id: AccountId(id),
        pseudonym: pseudonym.clone(),
        nickname: format!("user{id}"),
        version: DEFAULT_STATE_VERSION,
        joined_at: Utc::now(),
    })
    .unwrap();
    pseudonym
}

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub chat: AccountId,
    pub id: MessageId,
    pub message: Outgoing,
}

impl SentMessage {
    /// Text body or caption, empty for bare media.
    pub fn text(&self) -> String {
        match &self.message.payload {
            Payload::Text { text } => text.clone(),
            Payload::Media { caption, .. } => caption.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EditedMessage {
    pub chat: AccountId,
    pub message: MessageId,
    pub content: EditContent,
    pub actions: Actions,
}

/// Records every call; chats marked unreachable fail like a blocked bot.
#[derive(Default)]
pub struct MockTransport {
    next_id: AtomicI64,
    sent: Mutex<Vec<SentMessage>>,
    edits: Mutex<Vec<EditedMessage>>,
    deletes: Mutex<Vec<(AccountId, MessageId)>>,
    answers: Mutex<Vec<(String, Option<String>, bool)>>,
    unreachable: Mutex<HashSet<AccountId>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(5_000),
            ..Default::default()
        }
    }

    pub fn mark_unreachable(&self, chat: AccountId) {
        self.unreachable.lock().unwrap().insert(chat);
    }

    pub fn sent_to(&self, chat: AccountId) -> Vec<SentMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.chat == chat)
            .cloned()
            .collect()
    }

    pub fn last_to(&self, chat: AccountId) -> SentMessage {
        self.sent_to(chat).pop().expect("nothing sent to chat")
    }

    pub fn edits_in(&self, chat: AccountId) -> Vec<EditedMessage> {
        self.edits
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.chat == chat)
            .cloned()
            .collect()
    }

    pub fn deletes(&self) -> Vec<(AccountId, MessageId)> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn answers(&self) -> Vec<(String, Option<String>, bool)> {
        self.answers.lock().unwrap().clone()
    }

    fn reachable(&self, chat: AccountId) -> Result<(), TransportError> {
        if self.unreachable.lock().unwrap().contains(&chat) {
            Err(TransportError::Unreachable)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, chat: AccountId, message: Outgoing) -> Result<MessageId, TransportError> {
        self.reachable(chat)?;
        let id = MessageId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.sent
            .lock()
            .unwrap()
            .push(SentMessage { chat, id, message });
        Ok(id)
    }

    async fn edit(
        &self,
        chat: AccountId,
        message: MessageId,
        content: EditContent,
        actions: Actions,
    ) -> Result<(), TransportError> {
        self.reachable(chat)?;
        self.edits.lock().unwrap().push(EditedMessage {
            chat,
            message,
            content,
            actions,
        });
        Ok(())
    }

    async fn delete(&self, chat: AccountId, message: MessageId) -> Result<(), TransportError> {
        self.reachable(chat)?;
        self.deletes.lock().unwrap().push((chat, message));
        Ok(())
    }

    async fn answer_action(
        &self,
        action_id: &str,
        text: Option<String>,
        alert: bool,
    ) -> Result<(), TransportError> {
        self.answers
            .lock()
            .unwrap()
            .push((action_id.to_string(), text, alert));
        Ok(())
    }
}

pub struct Harness {
    pub relay: Relay,
    pub db: Arc<Database>,
    pub transport: Arc<MockTransport>,
}

/// A relay over an in-memory store with one moderator and a support account.
pub fn harness() -> Harness {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let transport = Arc::new(MockTransport::new());
    let settings = RelaySettings {
        support_account: Some(SUPPORT),
        moderators: vec![MODERATOR],
        flood_rate: 1_000.0,
        flood_burst: 1_000.0,
        ..RelaySettings::default()
    };
    let relay = Relay::new(db.clone(), transport.clone(), settings);
    Harness {
        relay,
        db,
        transport,
    }
}

impl Harness {
    pub async fn command(&self, id: i64, command: Command) {
        self.relay
            .handle(Envelope::message(AccountId(id), format!("User{id}"), command))
            .await
            .unwrap();
    }

    /// Invoke an action button attached to `anchor`.
    pub async fn action(&self, id: i64, anchor: Anchor, command: Command) {
        self.relay
            .handle(Envelope::action(
                AccountId(id),
                format!("User{id}"),
                format!("cb-{id}"),
                anchor,
                command,
            ))
            .await
            .unwrap();
    }

    /// First contact via a bare `/start`; returns the issued pseudonym.
    pub async fn join(&self, id: i64) -> Pseudonym {
        self.command(id, Command::Start { argument: None }).await;
        self.db.pseudonym_for(AccountId(id)).unwrap().unwrap()
    }

    pub async fn address(&self, id: i64, target: &Pseudonym) {
        self.command(
            id,
            Command::Start {
                argument: Some(target.to_string()),
            },
        )
        .await;
    }

    pub async fn text(&self, id: i64, message_id: i64, body: &str) {
        self.content(id, message_id, None, body).await;
    }

    pub async fn content(&self, id: i64, message_id: i64, reply_to: Option<MessageId>, body: &str) {
        self.command(
            id,
            Command::Content {
                message_id: MessageId(message_id),
                reply_to,
                payload: Payload::text(body),
            },
        )
        .await;
    }

    pub fn mode(&self, id: i64) -> Mode {
        self.db.get_mode(AccountId(id)).unwrap()
    }

    pub fn open_slots(&self, id: i64) -> usize {
        self.db
            .conversations_for(AccountId(id))
            .unwrap()
            .iter()
            .filter(|s| s.open)
            .count()
    }

    /// Anchor for the last message `chat` received.
    pub fn anchor_of_last(&self, chat: i64) -> Anchor {
        let last = self.transport.last_to(AccountId(chat));
        match &last.message.payload {
            Payload::Text { text } => Anchor {
                message_id: last.id,
                text: Some(text.clone()),
                caption: None,
            },
            Payload::Media { caption, .. } => Anchor {
                message_id: last.id,
                text: None,
                caption: caption.clone(),
            },
        }
    }
}
