//! Block list entries.
//!
//! Entries are stored on the blocker's side only. Whether a pair is blocked
//! in either direction is decided by the relay's guard, which checks both.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use masque_shared::{AccountId, Pseudonym};

use crate::database::Database;
use crate::error::Result;

/// Result of [`Database::add_block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    Added,
    AlreadyPresent,
    /// The list already holds `limit` entries.
    Full,
}

impl Database {
    /// Add `pseudonym` to `owner`'s block list, capped at `limit` entries.
    pub fn add_block(
        &self,
        owner: AccountId,
        pseudonym: &Pseudonym,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<BlockOutcome> {
        self.with_tx(|tx| {
            if has_entry(tx, owner, pseudonym)? {
                return Ok(BlockOutcome::AlreadyPresent);
            }
            let count: i64 = tx.query_row(
                "SELECT COUNT(*) FROM block_list WHERE account_id = ?1",
                params![owner.0],
                |row| row.get(0),
            )?;
            if count as usize >= limit {
                return Ok(BlockOutcome::Full);
            }
            tx.execute(
                "INSERT INTO block_list (account_id, pseudonym, blocked_at) VALUES (?1, ?2, ?3)",
                params![owner.0, pseudonym.as_str(), now.to_rfc3339()],
            )?;
            Ok(BlockOutcome::Added)
        })
    }

    /// Returns `true` if an entry was removed.
    pub fn remove_block(&self, owner: AccountId, pseudonym: &Pseudonym) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "DELETE FROM block_list WHERE account_id = ?1 AND pseudonym = ?2",
                params![owner.0, pseudonym.as_str()],
            )?;
            Ok(affected > 0)
        })
    }

    pub fn has_blocked(&self, owner: AccountId, pseudonym: &Pseudonym) -> Result<bool> {
        self.with_conn(|conn| has_entry(conn, owner, pseudonym))
    }

    /// Entries in the order they were added.
    pub fn block_list(&self, owner: AccountId) -> Result<Vec<Pseudonym>> {
        self.with_conn(|conn| query_block_list(conn, owner))
    }
}

fn has_entry(conn: &Connection, owner: AccountId, pseudonym: &Pseudonym) -> Result<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM block_list WHERE account_id = ?1 AND pseudonym = ?2",
            params![owner.0, pseudonym.as_str()],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

pub(crate) fn query_block_list(conn: &Connection, owner: AccountId) -> Result<Vec<Pseudonym>> {
    let mut stmt = conn.prepare(
        "SELECT pseudonym FROM block_list WHERE account_id = ?1 ORDER BY blocked_at ASC, rowid ASC",
    )?;
    let rows = stmt.query_map(params![owner.0], |row| row.get::<_, String>(0))?;

    let mut out = Vec::new();
    for row in rows {
        let raw = row?;
        match Pseudonym::parse(&raw) {
            Some(p) => out.push(p),
            None => tracing::warn!(account = %owner, entry = %raw, "skipping malformed block entry"),
        }
    }
    Ok(out)
}
