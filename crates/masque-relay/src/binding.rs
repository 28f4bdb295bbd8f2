//! Reply and edit bindings.
//!
//! A binding is a [`Mode`] variant, so binding replaces whatever mode the
//! account was in and there is at most one of each kind. A binding is
//! consumed by [`Bindings::release`] once the delivery it drove is over,
//! against the exact mode that delivery was routed under.

use std::sync::Arc;

use masque_shared::{AccountId, EditBinding, Mode, RelayError, ReplyBinding};
use masque_store::Database;

#[derive(Clone)]
pub struct Bindings {
    db: Arc<Database>,
}

impl Bindings {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Enter reply mode. Closes any open slot.
    pub fn bind_reply(&self, account: AccountId, binding: ReplyBinding) -> Result<(), RelayError> {
        self.db.set_mode(account, &Mode::Replying(binding))?;
        Ok(())
    }

    pub fn bind_edit(&self, account: AccountId, binding: EditBinding) -> Result<(), RelayError> {
        self.db.set_mode(account, &Mode::AwaitingEdit(binding))?;
        Ok(())
    }

    /// Return to `Idle` only if the mode is still `expected`.
    ///
    /// `false` means someone else (usually cancel) already moved it.
    pub fn release(&self, account: AccountId, expected: &Mode) -> Result<bool, RelayError> {
        if expected.is_idle() {
            return Ok(true);
        }
        Ok(self.db.swap_mode(account, expected, &Mode::Idle)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::seed_account;
    use masque_shared::{MessageId, Pseudonym, TextField};

    fn reply_to(target: &Pseudonym, id: i64) -> ReplyBinding {
        ReplyBinding {
            target: target.clone(),
            target_message_id: MessageId(id),
        }
    }

    #[test]
    fn test_bind_overwrites_and_release_clears() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let bindings = Bindings::new(db.clone());
        seed_account(&db, 1);
        let target = seed_account(&db, 2);
        let account = AccountId(1);

        bindings.bind_reply(account, reply_to(&target, 5)).unwrap();
        bindings.bind_reply(account, reply_to(&target, 6)).unwrap();
        let mode = db.get_mode(account).unwrap();
        assert_eq!(mode, Mode::Replying(reply_to(&target, 6)));

        assert!(!bindings
            .release(account, &Mode::Replying(reply_to(&target, 5)))
            .unwrap());
        assert!(bindings.release(account, &mode).unwrap());
        assert_eq!(db.get_mode(account).unwrap(), Mode::Idle);
    }

    #[test]
    fn test_reply_replaces_open_slot() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let bindings = Bindings::new(db.clone());
        seed_account(&db, 1);
        let target = seed_account(&db, 2);
        let account = AccountId(1);

        db.open_slot(account, AccountId(2), chrono::Utc::now()).unwrap();
        bindings.bind_reply(account, reply_to(&target, 9)).unwrap();

        let slots = db.conversations_for(account).unwrap();
        assert!(slots.iter().all(|s| !s.open));
    }

    #[test]
    fn test_edit_binding_replaces_reply_binding() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let bindings = Bindings::new(db.clone());
        let target = seed_account(&db, 1);
        let account = AccountId(1);
        let edit = EditBinding {
            target: target.clone(),
            target_message_id: MessageId(7),
            origin_message_id: MessageId(3),
            prompt_message_id: MessageId(8),
            field: TextField::Caption,
        };

        bindings.bind_reply(account, reply_to(&target, 1)).unwrap();
        bindings.bind_edit(account, edit.clone()).unwrap();

        let mode = db.get_mode(account).unwrap();
        assert!(mode.reply_binding().is_none());
        assert_eq!(mode.edit_binding(), Some(&edit));
    }

    #[test]
    fn test_release_is_conditional() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let bindings = Bindings::new(db.clone());
        seed_account(&db, 1);
        seed_account(&db, 2);
        let account = AccountId(1);
        let open = Mode::SlotOpen {
            target: AccountId(2),
        };

        db.set_mode(account, &open).unwrap();
        db.set_mode(account, &Mode::AwaitingNickname).unwrap();
        assert!(!bindings.release(account, &open).unwrap());
        assert_eq!(db.get_mode(account).unwrap(), Mode::AwaitingNickname);

        assert!(bindings.release(account, &Mode::AwaitingNickname).unwrap());
        assert_eq!(db.get_mode(account).unwrap(), Mode::Idle);
    }
}
