//! v001 -- Initial schema creation.
//!
//! Creates the account record and its two child collections:
//! `conversations` (one row per counterparty ever addressed) and
//! `block_list`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Accounts
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS accounts (
    account_id     INTEGER PRIMARY KEY NOT NULL,  -- platform user id
    pseudonym      TEXT NOT NULL UNIQUE,          -- public id, never reassigned
    nickname       TEXT NOT NULL,
    mode           TEXT NOT NULL,                 -- JSON-encoded Mode
    is_bot_enabled INTEGER NOT NULL DEFAULT 1,    -- boolean 0/1
    is_banned      INTEGER NOT NULL DEFAULT 0,    -- boolean 0/1
    banned_by      INTEGER,
    banned_at      TEXT,                          -- RFC-3339
    version        INTEGER NOT NULL,
    joined_at      TEXT NOT NULL                  -- RFC-3339
);

-- ----------------------------------------------------------------
-- Conversation slots (open flag lives in accounts.mode)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS conversations (
    account_id     INTEGER NOT NULL,              -- FK -> accounts
    target_account INTEGER NOT NULL,              -- FK -> accounts
    created_at     TEXT NOT NULL,
    reopened_at    TEXT NOT NULL,

    PRIMARY KEY (account_id, target_account),
    FOREIGN KEY (account_id) REFERENCES accounts(account_id),
    FOREIGN KEY (target_account) REFERENCES accounts(account_id)
);

-- ----------------------------------------------------------------
-- Block list (outgoing entries only; checks are reciprocal)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS block_list (
    account_id INTEGER NOT NULL,                  -- FK -> accounts
    pseudonym  TEXT NOT NULL,
    blocked_at TEXT NOT NULL,

    PRIMARY KEY (account_id, pseudonym),
    FOREIGN KEY (account_id) REFERENCES accounts(account_id)
);

CREATE INDEX IF NOT EXISTS idx_block_list_pseudonym ON block_list(pseudonym);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
