//! Conversation slots.
//!
//! A row exists for every counterparty an account has ever addressed. Which
//! one is open is recorded in the account's mode, so opening a slot and
//! closing every other one is a single mode write.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use masque_shared::{AccountId, Mode};

use crate::accounts::parse_ts;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::ConversationSlot;

impl Database {
    /// Open the slot `owner -> target`, closing whatever was open before.
    ///
    /// Returns `true` if the slot was created rather than reopened.
    pub fn open_slot(&self, owner: AccountId, target: AccountId, now: DateTime<Utc>) -> Result<bool> {
        let mode = serde_json::to_string(&Mode::SlotOpen { target })?;
        let stamp = now.to_rfc3339();
        self.with_tx(|tx| {
            let existing = tx
                .query_row(
                    "SELECT 1 FROM conversations WHERE account_id = ?1 AND target_account = ?2",
                    params![owner.0, target.0],
                    |_| Ok(()),
                )
                .optional()?;

            let created = match existing {
                Some(()) => {
                    tx.execute(
                        "UPDATE conversations SET reopened_at = ?1
                         WHERE account_id = ?2 AND target_account = ?3",
                        params![stamp, owner.0, target.0],
                    )?;
                    false
                }
                None => {
                    tx.execute(
                        "INSERT INTO conversations (account_id, target_account, created_at, reopened_at)
                         VALUES (?1, ?2, ?3, ?3)",
                        params![owner.0, target.0, stamp],
                    )?;
                    true
                }
            };

            let affected = tx.execute(
                "UPDATE accounts SET mode = ?1 WHERE account_id = ?2",
                params![mode, owner.0],
            )?;
            if affected == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(created)
        })
    }

    /// All slots of `owner`, oldest first.
    pub fn conversations_for(&self, owner: AccountId) -> Result<Vec<ConversationSlot>> {
        let open = self.get_mode(owner)?.open_slot();
        self.with_conn(|conn| query_slots(conn, owner, open))
    }
}

pub(crate) fn query_slots(
    conn: &Connection,
    owner: AccountId,
    open: Option<AccountId>,
) -> Result<Vec<ConversationSlot>> {
    let mut stmt = conn.prepare(
        "SELECT target_account, created_at, reopened_at
         FROM conversations WHERE account_id = ?1
         ORDER BY created_at ASC",
    )?;
    let rows = stmt.query_map(params![owner.0], |row| {
        let target = AccountId(row.get(0)?);
        let created: String = row.get(1)?;
        let reopened: String = row.get(2)?;
        Ok(ConversationSlot {
            target_account: target,
            open: open == Some(target),
            created_at: parse_ts(&created, 1)?,
            reopened_at: parse_ts(&reopened, 2)?,
        })
    })?;

    let mut slots = Vec::new();
    for row in rows {
        slots.push(row?);
    }
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::new_account;

    #[test]
    fn test_at_most_one_open_slot() {
        let db = Database::open_in_memory().unwrap();
        for id in 1..=3 {
            db.insert_account(&new_account(id)).unwrap();
        }
        let owner = AccountId(1);

        assert!(db.open_slot(owner, AccountId(2), Utc::now()).unwrap());
        assert!(db.open_slot(owner, AccountId(3), Utc::now()).unwrap());

        let slots = db.conversations_for(owner).unwrap();
        assert_eq!(slots.len(), 2);
        let open: Vec<_> = slots.iter().filter(|s| s.open).collect();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].target_account, AccountId(3));
    }

    #[test]
    fn test_reopen_keeps_created_at() {
        let db = Database::open_in_memory().unwrap();
        db.insert_account(&new_account(1)).unwrap();
        db.insert_account(&new_account(2)).unwrap();
        let owner = AccountId(1);

        let first = Utc::now() - chrono::Duration::hours(1);
        db.open_slot(owner, AccountId(2), first).unwrap();
        db.set_mode(owner, &Mode::Idle).unwrap();
        assert!(!db.open_slot(owner, AccountId(2), Utc::now()).unwrap());

        let slots = db.get_account(owner).unwrap().unwrap().conversations;
        assert_eq!(slots.len(), 1);
        assert!(slots[0].open);
        assert!(slots[0].reopened_at > slots[0].created_at);
    }

    #[test]
    fn test_open_slot_unknown_owner_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        db.insert_account(&new_account(2)).unwrap();
        // Foreign key on account_id rejects the insert before the mode write.
        assert!(db.open_slot(AccountId(1), AccountId(2), Utc::now()).is_err());
        let rows: i64 = db
            .with_conn(|c| Ok(c.query_row("SELECT COUNT(*) FROM conversations", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(rows, 0);
    }
}
