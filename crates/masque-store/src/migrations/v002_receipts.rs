use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS seen_messages (
    account_id INTEGER NOT NULL,                  -- FK -> accounts
    message_id INTEGER NOT NULL,
    seen_at    TEXT NOT NULL,

    PRIMARY KEY (account_id, message_id),
    FOREIGN KEY (account_id) REFERENCES accounts(account_id)
);

CREATE TABLE IF NOT EXISTS bot_stats (
    id             INTEGER PRIMARY KEY CHECK (id = 1),
    total_messages INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO bot_stats (id, total_messages) VALUES (1, 0);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
