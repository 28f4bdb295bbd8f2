//! Moderation state as seen by the relay: read-only flags per account.
//!
//! Ban storage lives in the store; the relay's own ban/unban operations are
//! in [`crate::relay`].

use std::sync::Arc;

use masque_shared::{AccountId, RelayError};
use masque_store::Database;

pub trait Moderation: Send + Sync {
    fn is_banned(&self, account: AccountId) -> Result<bool, RelayError>;

    fn is_bot_enabled(&self, account: AccountId) -> Result<bool, RelayError>;
}

/// Reads moderation flags straight from the identity store.
#[derive(Clone)]
pub struct StoreModeration {
    db: Arc<Database>,
}

impl StoreModeration {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl Moderation for StoreModeration {
    /// Unknown accounts are not banned.
    fn is_banned(&self, account: AccountId) -> Result<bool, RelayError> {
        Ok(self.db.is_banned(account)?.unwrap_or(false))
    }

    /// Unknown accounts cannot receive anything.
    fn is_bot_enabled(&self, account: AccountId) -> Result<bool, RelayError> {
        Ok(self.db.is_bot_enabled(account)?.unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::seed_account;
    use chrono::Utc;
    use masque_store::BanRecord;

    #[test]
    fn test_flags_follow_store() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let moderation = StoreModeration::new(db.clone());
        seed_account(&db, 1);

        assert!(!moderation.is_banned(AccountId(1)).unwrap());
        assert!(moderation.is_bot_enabled(AccountId(1)).unwrap());

        let ban = BanRecord {
            banned_by: AccountId(5),
            banned_at: Utc::now(),
        };
        db.set_ban(AccountId(1), Some(&ban)).unwrap();
        db.set_bot_enabled(AccountId(1), false).unwrap();
        assert!(moderation.is_banned(AccountId(1)).unwrap());
        assert!(!moderation.is_bot_enabled(AccountId(1)).unwrap());

        assert!(!moderation.is_banned(AccountId(2)).unwrap());
        assert!(!moderation.is_bot_enabled(AccountId(2)).unwrap());
    }
}
