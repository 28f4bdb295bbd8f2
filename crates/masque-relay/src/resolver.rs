//! Pseudonym <-> account lookup. Pure reads, never mutates.

use std::sync::Arc;

use masque_shared::{AccountId, Pseudonym, RelayError};
use masque_store::Database;

#[derive(Clone)]
pub struct PseudonymResolver {
    db: Arc<Database>,
    /// Account the reserved `support` pseudonym routes to.
    support: Option<AccountId>,
}

impl PseudonymResolver {
    pub fn new(db: Arc<Database>, support: Option<AccountId>) -> Self {
        Self { db, support }
    }

    /// A miss is [`RelayError::NotFound`], never anything else.
    pub fn resolve(&self, pseudonym: &Pseudonym) -> Result<AccountId, RelayError> {
        if pseudonym.is_support() {
            return self.support.ok_or(RelayError::NotFound);
        }
        self.db
            .account_id_for(pseudonym)?
            .ok_or(RelayError::NotFound)
    }

    pub fn reverse(&self, account: AccountId) -> Result<Pseudonym, RelayError> {
        self.db.pseudonym_for(account)?.ok_or(RelayError::NotFound)
    }
}
