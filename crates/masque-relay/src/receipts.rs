//! Seen and mark receipts, scoped per recipient and sender.
//!
//! The mark toggle itself is a pure text transform in
//! [`masque_shared::mark`]; the store only mirrors the resulting flag so
//! that an edit of the message can keep it.

use std::sync::Arc;

use chrono::Utc;

use masque_shared::{AccountId, MessageId, Pseudonym, RelayError};
use masque_store::{Database, ReceiptState};

#[derive(Clone)]
pub struct Receipts {
    db: Arc<Database>,
}

impl Receipts {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Returns `true` the first time `account` marks `sender`'s `message` seen.
    pub fn mark_seen(
        &self,
        account: AccountId,
        sender: &Pseudonym,
        message: MessageId,
    ) -> Result<bool, RelayError> {
        Ok(self.db.mark_seen(account, sender, message, Utc::now())?)
    }

    pub fn set_marked(
        &self,
        account: AccountId,
        sender: &Pseudonym,
        message: MessageId,
        marked: bool,
    ) -> Result<(), RelayError> {
        Ok(self.db.set_marked(account, sender, message, marked)?)
    }

    pub fn state(
        &self,
        account: AccountId,
        sender: &Pseudonym,
        message: MessageId,
    ) -> Result<ReceiptState, RelayError> {
        Ok(self.db.receipt(account, sender, message)?)
    }
}
