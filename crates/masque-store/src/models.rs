//! Records persisted in the identity store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use masque_shared::{AccountId, Mode, Pseudonym};

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// One real end-user, created lazily on first contact and never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub account_id: AccountId,
    pub pseudonym: Pseudonym,
    /// Shown to counterparties in place of the real name.
    pub nickname: String,
    pub mode: Mode,
    pub is_bot_enabled: bool,
    pub ban: Option<BanRecord>,
    /// State/compat version the account's mode was written under.
    pub version: u32,
    pub joined_at: DateTime<Utc>,
    pub conversations: Vec<ConversationSlot>,
    pub block_list: Vec<Pseudonym>,
}

impl Account {
    pub fn is_banned(&self) -> bool {
        self.ban.is_some()
    }

    /// Target of the open slot, if any.
    pub fn open_slot(&self) -> Option<AccountId> {
        self.mode.open_slot()
    }

    pub fn has_blocked(&self, pseudonym: &Pseudonym) -> bool {
        self.block_list.iter().any(|p| p == pseudonym)
    }
}

/// Moderation state of a banned account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BanRecord {
    pub banned_by: AccountId,
    pub banned_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Conversation slot
// ---------------------------------------------------------------------------

/// A counterparty this account has addressed at least once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationSlot {
    pub target_account: AccountId,
    /// Derived from the owning account's mode when loaded.
    pub open: bool,
    pub created_at: DateTime<Utc>,
    pub reopened_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// New account
// ---------------------------------------------------------------------------

/// Fields supplied when an account is first seen.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub account_id: AccountId,
    pub pseudonym: Pseudonym,
    pub nickname: String,
    pub version: u32,
    pub joined_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Receipt
// ---------------------------------------------------------------------------

/// What the recipient has done with one delivered message.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReceiptState {
    pub seen: bool,
    pub marked: bool,
}
