use rusqlite::Connection;

// Message ids are only unique per chat, so a receipt is keyed by the
// sender's pseudonym as well. Old rows cannot be attributed to a sender and
// are dropped.
const UP_SQL: &str = r#"
DROP TABLE IF EXISTS seen_messages;

CREATE TABLE IF NOT EXISTS message_receipts (
    account_id INTEGER NOT NULL,                  -- FK -> accounts (recipient)
    sender     TEXT NOT NULL,                     -- sender pseudonym
    message_id INTEGER NOT NULL,                  -- id in the sender's chat
    seen_at    TEXT,
    marked     INTEGER NOT NULL DEFAULT 0,

    PRIMARY KEY (account_id, sender, message_id),
    FOREIGN KEY (account_id) REFERENCES accounts(account_id)
);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
