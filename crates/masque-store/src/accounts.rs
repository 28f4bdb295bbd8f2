//! Account records: creation, lookup and field-scoped updates.
//!
//! Mode changes are either unconditional (`set_mode`) or compare-and-swap
//! (`swap_mode`) against the JSON the caller last read. No helper here ever
//! rewrites a whole row.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use masque_shared::{AccountId, Mode, Pseudonym};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Account, BanRecord, NewAccount};

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert the account if it does not exist yet.
    ///
    /// Returns `true` when a row was created.
    pub fn insert_account(&self, new: &NewAccount) -> Result<bool> {
        let mode = serde_json::to_string(&Mode::Idle)?;
        self.with_conn(|conn| {
            let affected = conn.execute(
                "INSERT OR IGNORE INTO accounts
                    (account_id, pseudonym, nickname, mode, version, joined_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    new.account_id.0,
                    new.pseudonym.as_str(),
                    new.nickname,
                    mode,
                    new.version,
                    new.joined_at.to_rfc3339(),
                ],
            )?;
            Ok(affected > 0)
        })
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Load an account with its conversation slots and block list.
    pub fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        self.with_conn(|conn| {
            let Some(mut account) = query_account(conn, id)? else {
                return Ok(None);
            };
            account.conversations =
                crate::conversations::query_slots(conn, id, account.mode.open_slot())?;
            account.block_list = crate::blocks::query_block_list(conn, id)?;
            Ok(Some(account))
        })
    }

    /// Resolve a pseudonym to its owner.
    pub fn account_id_for(&self, pseudonym: &Pseudonym) -> Result<Option<AccountId>> {
        self.with_conn(|conn| {
            let id = conn
                .query_row(
                    "SELECT account_id FROM accounts WHERE pseudonym = ?1",
                    params![pseudonym.as_str()],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?;
            Ok(id.map(AccountId))
        })
    }

    /// Reverse lookup: the pseudonym issued to an account.
    pub fn pseudonym_for(&self, id: AccountId) -> Result<Option<Pseudonym>> {
        self.with_conn(|conn| {
            let raw = conn
                .query_row(
                    "SELECT pseudonym FROM accounts WHERE account_id = ?1",
                    params![id.0],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(raw.and_then(|p| Pseudonym::parse(&p)))
        })
    }

    pub fn get_mode(&self, id: AccountId) -> Result<Mode> {
        self.with_conn(|conn| {
            let raw: String = conn
                .query_row(
                    "SELECT mode FROM accounts WHERE account_id = ?1",
                    params![id.0],
                    |row| row.get(0),
                )
                .map_err(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                    other => StoreError::Sqlite(other),
                })?;
            Ok(serde_json::from_str(&raw)?)
        })
    }

    /// `None` when the account does not exist.
    pub fn is_banned(&self, id: AccountId) -> Result<Option<bool>> {
        self.query_flag(id, "SELECT is_banned FROM accounts WHERE account_id = ?1")
    }

    /// `None` when the account does not exist.
    pub fn is_bot_enabled(&self, id: AccountId) -> Result<Option<bool>> {
        self.query_flag(id, "SELECT is_bot_enabled FROM accounts WHERE account_id = ?1")
    }

    fn query_flag(&self, id: AccountId, sql: &str) -> Result<Option<bool>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(sql, params![id.0], |row| row.get::<_, bool>(0))
                .optional()?)
        })
    }

    pub fn count_accounts(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?;
            Ok(n as u64)
        })
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Overwrite the mode regardless of its current value.
    pub fn set_mode(&self, id: AccountId, mode: &Mode) -> Result<()> {
        let json = serde_json::to_string(mode)?;
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE accounts SET mode = ?1 WHERE account_id = ?2",
                params![json, id.0],
            )?;
            expect_row(affected)
        })
    }

    /// Replace the mode only if it still equals `expected`.
    ///
    /// Returns `false` when another writer got there first.
    pub fn swap_mode(&self, id: AccountId, expected: &Mode, next: &Mode) -> Result<bool> {
        let expected = serde_json::to_string(expected)?;
        let next = serde_json::to_string(next)?;
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE accounts SET mode = ?1 WHERE account_id = ?2 AND mode = ?3",
                params![next, id.0, expected],
            )?;
            Ok(affected > 0)
        })
    }

    /// Store a nickname and leave nickname mode, only if still in it.
    pub fn commit_nickname(&self, id: AccountId, nickname: &str) -> Result<bool> {
        let awaiting = serde_json::to_string(&Mode::AwaitingNickname)?;
        let idle = serde_json::to_string(&Mode::Idle)?;
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE accounts SET nickname = ?1, mode = ?2
                 WHERE account_id = ?3 AND mode = ?4",
                params![nickname, idle, id.0, awaiting],
            )?;
            Ok(affected > 0)
        })
    }

    /// Switch relaying on or off. Switching off also drops any pending flow.
    pub fn set_bot_enabled(&self, id: AccountId, enabled: bool) -> Result<()> {
        let idle = serde_json::to_string(&Mode::Idle)?;
        self.with_conn(|conn| {
            let affected = if enabled {
                conn.execute(
                    "UPDATE accounts SET is_bot_enabled = 1 WHERE account_id = ?1",
                    params![id.0],
                )?
            } else {
                conn.execute(
                    "UPDATE accounts SET is_bot_enabled = 0, mode = ?1 WHERE account_id = ?2",
                    params![idle, id.0],
                )?
            };
            expect_row(affected)
        })
    }

    /// Start a fresh session under `version`.
    pub fn reset_session(&self, id: AccountId, version: u32) -> Result<()> {
        let idle = serde_json::to_string(&Mode::Idle)?;
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE accounts SET mode = ?1, version = ?2 WHERE account_id = ?3",
                params![idle, version, id.0],
            )?;
            expect_row(affected)
        })
    }

    /// Set or clear the ban record. Returns `false` if nothing changed.
    pub fn set_ban(&self, id: AccountId, ban: Option<&BanRecord>) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = match ban {
                Some(record) => conn.execute(
                    "UPDATE accounts SET is_banned = 1, banned_by = ?1, banned_at = ?2
                     WHERE account_id = ?3 AND is_banned = 0",
                    params![record.banned_by.0, record.banned_at.to_rfc3339(), id.0],
                )?,
                None => conn.execute(
                    "UPDATE accounts SET is_banned = 0, banned_by = NULL, banned_at = NULL
                     WHERE account_id = ?1 AND is_banned = 1",
                    params![id.0],
                )?,
            };
            Ok(affected > 0)
        })
    }
}

fn expect_row(affected: usize) -> Result<()> {
    if affected == 0 {
        Err(StoreError::NotFound)
    } else {
        Ok(())
    }
}

fn query_account(conn: &Connection, id: AccountId) -> Result<Option<Account>> {
    Ok(conn
        .query_row(
            "SELECT account_id, pseudonym, nickname, mode, is_bot_enabled,
                    is_banned, banned_by, banned_at, version, joined_at
             FROM accounts WHERE account_id = ?1",
            params![id.0],
            row_to_account,
        )
        .optional()?)
}

fn row_to_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
    let account_id: i64 = row.get(0)?;
    let pseudonym_str: String = row.get(1)?;
    let nickname: String = row.get(2)?;
    let mode_str: String = row.get(3)?;
    let is_bot_enabled: bool = row.get(4)?;
    let is_banned: bool = row.get(5)?;
    let banned_by: Option<i64> = row.get(6)?;
    let banned_at: Option<String> = row.get(7)?;
    let version: u32 = row.get(8)?;
    let joined_str: String = row.get(9)?;

    let pseudonym = Pseudonym::parse(&pseudonym_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("malformed pseudonym {pseudonym_str:?}").into(),
        )
    })?;

    let mode: Mode = serde_json::from_str(&mode_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let ban = match (is_banned, banned_by, banned_at) {
        (true, Some(by), Some(at)) => Some(BanRecord {
            banned_by: AccountId(by),
            banned_at: parse_ts(&at, 7)?,
        }),
        _ => None,
    };

    Ok(Account {
        account_id: AccountId(account_id),
        pseudonym,
        nickname,
        mode,
        is_bot_enabled,
        ban,
        version,
        joined_at: parse_ts(&joined_str, 9)?,
        conversations: Vec::new(),
        block_list: Vec::new(),
    })
}

/// Parse an RFC-3339 column, reporting failures against column `idx`.
pub(crate) fn parse_ts(raw: &str, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}
