//! Per-account command serialization.
//!
//! Every command except cancel holds its account's lock from the first read
//! to the last write, so two commands from one account never interleave.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use masque_shared::AccountId;

#[derive(Clone, Default)]
pub struct AccountLocks {
    inner: Arc<Mutex<HashMap<AccountId, Arc<Mutex<()>>>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `account`.
    pub async fn acquire(&self, account: AccountId) -> OwnedMutexGuard<()> {
        let slot = {
            let mut map = self.inner.lock().await;
            map.entry(account)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        slot.lock_owned().await
    }

    /// Drop entries nobody holds or waits on.
    pub async fn purge_idle(&self) {
        let mut map = self.inner.lock().await;
        map.retain(|_, slot| Arc::strong_count(slot) > 1);
    }

    pub async fn tracked(&self) -> usize {
        self.inner.lock().await.len()
    }
}
