//! Global counters.

use rusqlite::params;
use serde::Serialize;

use crate::database::Database;
use crate::error::Result;

/// Snapshot served by the admin stats endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub accounts: u64,
    pub banned: u64,
    pub delivered: u64,
}

impl Database {
    pub fn increment_delivered(&self, by: u64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE bot_stats SET total_messages = total_messages + ?1 WHERE id = 1",
                params![by as i64],
            )?;
            Ok(())
        })
    }

    pub fn delivered_total(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 =
                conn.query_row("SELECT total_messages FROM bot_stats WHERE id = 1", [], |row| {
                    row.get(0)
                })?;
            Ok(n as u64)
        })
    }

    pub fn stats(&self) -> Result<StoreStats> {
        self.with_conn(|conn| {
            let (accounts, banned): (i64, i64) = conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(is_banned), 0) FROM accounts",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            let delivered: i64 =
                conn.query_row("SELECT total_messages FROM bot_stats WHERE id = 1", [], |row| {
                    row.get(0)
                })?;
            Ok(StoreStats {
                accounts: accounts as u64,
                banned: banned as u64,
                delivered: delivered as u64,
            })
        })
    }
}
