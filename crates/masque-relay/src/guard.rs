//! Reciprocal block check.
//!
//! Each account stores only the pseudonyms it blocked. A pair is blocked if
//! either side's list names the other.

use std::sync::Arc;

use masque_shared::{AccountId, Pseudonym, RelayError};
use masque_store::Database;

#[derive(Clone)]
pub struct BlockGuard {
    db: Arc<Database>,
}

impl BlockGuard {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// `true` if delivery between `a` and `b` is denied in either direction.
    ///
    /// Self and reserved-pseudonym checks belong to the caller.
    pub fn is_blocked(&self, a: &Pseudonym, b: AccountId) -> Result<bool, RelayError> {
        if self.db.has_blocked(b, a)? {
            return Ok(true);
        }
        let Some(a_account) = self.db.account_id_for(a)? else {
            return Ok(false);
        };
        let Some(b_pseudonym) = self.db.pseudonym_for(b)? else {
            return Ok(false);
        };
        Ok(self.db.has_blocked(a_account, &b_pseudonym)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::seed_account;
    use chrono::Utc;

    #[test]
    fn test_block_is_symmetric() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let guard = BlockGuard::new(db.clone());
        let pa = seed_account(&db, 1);
        let pb = seed_account(&db, 2);
        let pc = seed_account(&db, 3);

        db.add_block(AccountId(1), &pb, 10, Utc::now()).unwrap();

        assert!(guard.is_blocked(&pa, AccountId(2)).unwrap());
        assert!(guard.is_blocked(&pb, AccountId(1)).unwrap());

        // Unrelated pairs stay open both ways.
        assert!(!guard.is_blocked(&pa, AccountId(3)).unwrap());
        assert!(!guard.is_blocked(&pc, AccountId(1)).unwrap());
        assert!(!guard.is_blocked(&pc, AccountId(2)).unwrap());
        assert!(!guard.is_blocked(&pb, AccountId(3)).unwrap());
    }

    #[test]
    fn test_unblock_restores_both_directions() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let guard = BlockGuard::new(db.clone());
        let pa = seed_account(&db, 1);
        let pb = seed_account(&db, 2);

        db.add_block(AccountId(2), &pa, 10, Utc::now()).unwrap();
        db.remove_block(AccountId(2), &pa).unwrap();

        assert!(!guard.is_blocked(&pa, AccountId(2)).unwrap());
        assert!(!guard.is_blocked(&pb, AccountId(1)).unwrap());
    }
}
