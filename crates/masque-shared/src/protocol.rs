use serde::{Deserialize, Serialize};

use crate::types::{AccountId, MessageId, Pseudonym};

/// Content relayed between two accounts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    Text {
        text: String,
    },
    Media {
        kind: MediaKind,
        /// Platform file handle; re-sent, never downloaded.
        file_id: String,
        caption: Option<String>,
    },
}

impl Payload {
    pub fn text(text: impl Into<String>) -> Self {
        Payload::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text { text } => Some(text),
            Payload::Media { .. } => None,
        }
    }

    /// Where the editable text of a copy of this payload lives, if anywhere.
    pub fn text_field(&self) -> Option<TextField> {
        match self {
            Payload::Text { .. } => Some(TextField::Text),
            Payload::Media { kind, .. } if kind.accepts_caption() => Some(TextField::Caption),
            Payload::Media { .. } => None,
        }
    }
}

/// The part of a delivered message an edit replaces.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TextField {
    #[default]
    Text,
    Caption,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
    Animation,
    Audio,
    Voice,
    Document,
    Sticker,
    VideoNote,
}

impl MediaKind {
    /// Stickers and round videos cannot carry a caption.
    pub fn accepts_caption(self) -> bool {
        !matches!(self, MediaKind::Sticker | MediaKind::VideoNote)
    }
}

/// Action set attached to an outgoing message. Rendering into buttons is
/// the transport's business.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Actions {
    #[default]
    None,
    /// The idle menu (link, block list, account, support, guide).
    Main,
    /// A single "cancel" action while a flow is pending.
    Cancel,
    /// Offered to the recipient of a relayed message.
    Recipient {
        sender: Pseudonym,
        message_id: MessageId,
        seen: bool,
        marked: bool,
    },
    /// Offered to the sender after a successful delivery.
    Sent {
        recipient: Pseudonym,
        delivered: MessageId,
        origin: MessageId,
        /// `None` for media that cannot carry text; no edit is offered.
        editable: Option<TextField>,
    },
    /// Replaces the recipient actions after a block.
    Blocked { pseudonym: Pseudonym },
    Account {
        bot_enabled: bool,
    },
    BlockList {
        entries: Vec<Pseudonym>,
    },
}

/// Snapshot of the message an action was invoked on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Anchor {
    pub message_id: MessageId,
    pub text: Option<String>,
    pub caption: Option<String>,
}

/// One inbound unit of work, already decoded from the platform's format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// `/start` with an optional deep-link argument.
    Start { argument: Option<String> },
    /// A content message (text or media).
    Content {
        message_id: MessageId,
        reply_to: Option<MessageId>,
        payload: Payload,
    },
    /// Content of a type the relay does not carry.
    Unsupported,
    Cancel,
    ShareLink,
    BlockList,
    Support,
    Guide,
    Account,
    ChangeNickname,
    ToggleBotStatus,
    Reply {
        sender: Pseudonym,
        message_id: MessageId,
    },
    Seen {
        sender: Pseudonym,
        message_id: MessageId,
    },
    Mark {
        sender: Pseudonym,
        message_id: MessageId,
    },
    Block {
        pseudonym: Pseudonym,
    },
    Unblock {
        pseudonym: Pseudonym,
    },
    EditRequest {
        recipient: Pseudonym,
        delivered: MessageId,
        origin: MessageId,
        field: TextField,
    },
    Delete {
        recipient: Pseudonym,
        delivered: MessageId,
    },
}

/// A command plus who issued it and where.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope {
    pub account: AccountId,
    /// Platform display name, used as the default nickname on first contact.
    pub display_name: String,
    /// Set when the command came from an action button.
    pub action_id: Option<String>,
    /// The message the action button was attached to.
    pub anchor: Option<Anchor>,
    pub command: Command,
}

impl Envelope {
    pub fn message(account: AccountId, display_name: impl Into<String>, command: Command) -> Self {
        Self {
            account,
            display_name: display_name.into(),
            action_id: None,
            anchor: None,
            command,
        }
    }

    pub fn action(
        account: AccountId,
        display_name: impl Into<String>,
        action_id: impl Into<String>,
        anchor: Anchor,
        command: Command,
    ) -> Self {
        Self {
            account,
            display_name: display_name.into(),
            action_id: Some(action_id.into()),
            anchor: Some(anchor),
            command,
        }
    }
}
