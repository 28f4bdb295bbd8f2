//! # masque-store
//!
//! Identity store for the masque relay, backed by SQLite.
//!
//! Holds accounts, their conversation slots, block lists, message receipts and
//! the global delivery counter. The crate exposes a synchronous `Database`
//! handle that wraps a `rusqlite::Connection` and provides typed helpers in
//! one module per table.

pub mod accounts;
pub mod blocks;
pub mod conversations;
pub mod database;
pub mod migrations;
pub mod models;
pub mod receipts;
pub mod stats;

mod error;

pub use blocks::BlockOutcome;
pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
pub use stats::StoreStats;

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use masque_shared::{AccountId, Pseudonym};

    use crate::models::NewAccount;

    pub(crate) fn new_account(id: i64) -> NewAccount {
        NewAccount {
            account_id: AccountId(id),
            pseudonym: Pseudonym::generate(),
            nickname: format!("user{id}"),
            version: 1,
            joined_at: Utc::now(),
        }
    }
}
