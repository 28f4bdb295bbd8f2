//! Per-account interaction mode.
//!
//! An account is in exactly one mode at a time. Opening a slot, entering
//! reply mode, waiting for a nickname and waiting for an edit are variants
//! of one enum, so two of them can never be active together.

use serde::{Deserialize, Serialize};

use crate::protocol::TextField;
use crate::types::{AccountId, MessageId, Pseudonym};

/// "The next plain message from this account answers this delivered message."
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplyBinding {
    /// Pseudonym of the account that sent the message being answered.
    pub target: Pseudonym,
    /// Id of that message in the target's own chat (the reply threads to it).
    pub target_message_id: MessageId,
}

/// "The next reply to `prompt_message_id` replaces this delivered message."
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EditBinding {
    /// Pseudonym of the recipient holding the delivered copy.
    pub target: Pseudonym,
    /// Id of the delivered copy in the recipient's chat.
    pub target_message_id: MessageId,
    /// Id of the sender's original message (keys the recipient's actions).
    pub origin_message_id: MessageId,
    /// Id of the edit prompt shown to the sender.
    pub prompt_message_id: MessageId,
    /// Text body or caption of the delivered copy.
    #[serde(default)]
    pub field: TextField,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Idle,
    AwaitingNickname,
    Replying(ReplyBinding),
    SlotOpen { target: AccountId },
    AwaitingEdit(EditBinding),
}

impl Mode {
    /// Target of the open conversation slot, if any.
    pub fn open_slot(&self) -> Option<AccountId> {
        match self {
            Mode::SlotOpen { target } => Some(*target),
            _ => None,
        }
    }

    pub fn reply_binding(&self) -> Option<&ReplyBinding> {
        match self {
            Mode::Replying(binding) => Some(binding),
            _ => None,
        }
    }

    pub fn edit_binding(&self) -> Option<&EditBinding> {
        match self {
            Mode::AwaitingEdit(binding) => Some(binding),
            _ => None,
        }
    }

    pub fn awaiting_nickname(&self) -> bool {
        matches!(self, Mode::AwaitingNickname)
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Mode::Idle)
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Idle => "idle",
            Mode::AwaitingNickname => "awaiting_nickname",
            Mode::Replying(_) => "replying",
            Mode::SlotOpen { .. } => "slot_open",
            Mode::AwaitingEdit(_) => "awaiting_edit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_json_shape() {
        let mode = Mode::SlotOpen {
            target: AccountId(42),
        };
        let json = serde_json::to_string(&mode).unwrap();
        assert_eq!(json, r#"{"state":"slot_open","target":42}"#);
        assert_eq!(serde_json::from_str::<Mode>(&json).unwrap(), mode);

        let idle = serde_json::to_string(&Mode::Idle).unwrap();
        assert_eq!(idle, r#"{"state":"idle"}"#);
    }

    #[test]
    fn test_binding_variants_survive_serde() {
        let replying = Mode::Replying(ReplyBinding {
            target: Pseudonym::parse("abc123").unwrap(),
            target_message_id: MessageId(7),
        });
        let json = serde_json::to_string(&replying).unwrap();
        assert_eq!(serde_json::from_str::<Mode>(&json).unwrap(), replying);
        assert!(replying.reply_binding().is_some());
        assert!(replying.open_slot().is_none());
    }
}
