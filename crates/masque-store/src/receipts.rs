//! Per-message receipts: whether the recipient has seen or marked a
//! delivered message.
//!
//! A message is identified by the recipient, the sender's pseudonym and the
//! id of the original in the sender's chat. Platform ids are only unique
//! per chat, so the id alone would collide across senders.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use masque_shared::{AccountId, MessageId, Pseudonym};

use crate::database::Database;
use crate::error::Result;
use crate::models::ReceiptState;

impl Database {
    /// Record that `owner` has seen `sender`'s message `message`.
    ///
    /// Returns `false` if it was already recorded.
    pub fn mark_seen(
        &self,
        owner: AccountId,
        sender: &Pseudonym,
        message: MessageId,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "INSERT INTO message_receipts (account_id, sender, message_id, seen_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (account_id, sender, message_id)
                 DO UPDATE SET seen_at = excluded.seen_at WHERE seen_at IS NULL",
                params![owner.0, sender.as_str(), message.0, now.to_rfc3339()],
            )?;
            Ok(affected > 0)
        })
    }

    pub fn set_marked(
        &self,
        owner: AccountId,
        sender: &Pseudonym,
        message: MessageId,
        marked: bool,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO message_receipts (account_id, sender, message_id, marked)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (account_id, sender, message_id)
                 DO UPDATE SET marked = excluded.marked",
                params![owner.0, sender.as_str(), message.0, marked],
            )?;
            Ok(())
        })
    }

    /// Receipt for one message; both flags are `false` if nothing is recorded.
    pub fn receipt(
        &self,
        owner: AccountId,
        sender: &Pseudonym,
        message: MessageId,
    ) -> Result<ReceiptState> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT seen_at IS NOT NULL, marked FROM message_receipts
                     WHERE account_id = ?1 AND sender = ?2 AND message_id = ?3",
                    params![owner.0, sender.as_str(), message.0],
                    |row| {
                        Ok(ReceiptState {
                            seen: row.get(0)?,
                            marked: row.get(1)?,
                        })
                    },
                )
                .optional()?
                .unwrap_or_default())
        })
    }

    pub fn seen_count(&self, owner: AccountId) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM message_receipts
                 WHERE account_id = ?1 AND seen_at IS NOT NULL",
                params![owner.0],
                |row| row.get(0),
            )?;
            Ok(n as u64)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::new_account;

    #[test]
    fn test_seen_is_recorded_once() {
        let db = Database::open_in_memory().unwrap();
        db.insert_account(&new_account(1)).unwrap();
        let owner = AccountId(1);
        let sender = Pseudonym::generate();

        assert!(!db.receipt(owner, &sender, MessageId(10)).unwrap().seen);
        assert!(db.mark_seen(owner, &sender, MessageId(10), Utc::now()).unwrap());
        assert!(!db.mark_seen(owner, &sender, MessageId(10), Utc::now()).unwrap());
        assert!(db.receipt(owner, &sender, MessageId(10)).unwrap().seen);
        assert_eq!(db.seen_count(owner).unwrap(), 1);
    }

    #[test]
    fn test_same_id_from_two_senders_is_two_receipts() {
        let db = Database::open_in_memory().unwrap();
        db.insert_account(&new_account(1)).unwrap();
        let owner = AccountId(1);
        let first = Pseudonym::generate();
        let second = Pseudonym::generate();

        assert!(db.mark_seen(owner, &first, MessageId(10), Utc::now()).unwrap());
        assert!(!db.receipt(owner, &second, MessageId(10)).unwrap().seen);
        assert!(db.mark_seen(owner, &second, MessageId(10), Utc::now()).unwrap());
        assert_eq!(db.seen_count(owner).unwrap(), 2);
    }

    #[test]
    fn test_mark_flag_is_independent_of_seen() {
        let db = Database::open_in_memory().unwrap();
        db.insert_account(&new_account(1)).unwrap();
        let owner = AccountId(1);
        let sender = Pseudonym::generate();

        db.set_marked(owner, &sender, MessageId(3), true).unwrap();
        let state = db.receipt(owner, &sender, MessageId(3)).unwrap();
        assert_eq!(state, ReceiptState { seen: false, marked: true });

        // Seeing a marked message keeps the mark.
        assert!(db.mark_seen(owner, &sender, MessageId(3), Utc::now()).unwrap());
        let state = db.receipt(owner, &sender, MessageId(3)).unwrap();
        assert_eq!(state, ReceiptState { seen: true, marked: true });

        db.set_marked(owner, &sender, MessageId(3), false).unwrap();
        assert!(!db.receipt(owner, &sender, MessageId(3)).unwrap().marked);
        assert_eq!(db.seen_count(owner).unwrap(), 1);
    }
}
