//! Account lifecycle and the idle-menu commands.

use chrono::Utc;
use tracing::info;

use masque_shared::constants::DEEP_LINK_BASE;
use masque_shared::{AccountId, Actions, Envelope, Mode, Pseudonym, RelayError, ResponseKey};
use masque_store::{Account, NewAccount};

use crate::relay::Relay;

impl Relay {
    /// Load the account, creating it on first contact.
    pub(crate) async fn ensure_account(
        &self,
        id: AccountId,
        display_name: &str,
    ) -> Result<Account, RelayError> {
        if let Some(account) = self.db.get_account(id)? {
            return Ok(account);
        }

        let pseudonym = Pseudonym::generate();
        let created = self.db.insert_account(&NewAccount {
            account_id: id,
            pseudonym: pseudonym.clone(),
            nickname: display_name.to_string(),
            version: self.settings.state_version,
            joined_at: Utc::now(),
        })?;

        if created {
            info!(account = %id, pseudonym = %pseudonym, "account created");
            let account_str = id.to_string();
            self.notify_moderators(
                ResponseKey::NewUserAnnouncement,
                &[
                    ("pseudonym", pseudonym.as_str()),
                    ("account", account_str.as_str()),
                    ("nickname", display_name),
                ],
            )
            .await;
        }

        self.db.get_account(id)?.ok_or(RelayError::NotFound)
    }

    /// Drop any pending flow written under an older state version.
    pub(crate) async fn restart_session(&self, account: &Account) -> Result<(), RelayError> {
        self.db
            .reset_session(account.account_id, self.settings.state_version)?;
        info!(
            account = %account.account_id,
            from = account.version,
            to = self.settings.state_version,
            "session reset after version change"
        );
        self.say(
            account.account_id,
            ResponseKey::RestartRequired,
            &[],
            Actions::Main,
        )
        .await?;
        Ok(())
    }

    pub(crate) async fn welcome(&self, account: &Account) -> Result<(), RelayError> {
        if !account.mode.is_idle() {
            self.db.set_mode(account.account_id, &Mode::Idle)?;
        }
        self.say(
            account.account_id,
            ResponseKey::Welcome,
            &[("nickname", account.nickname.as_str())],
            Actions::Main,
        )
        .await?;
        Ok(())
    }

    pub fn share_link_for(&self, pseudonym: &Pseudonym) -> String {
        format!(
            "{DEEP_LINK_BASE}/{}?start={pseudonym}",
            self.settings.bot_username
        )
    }

    pub(crate) async fn share_link(&self, account: &Account) -> Result<(), RelayError> {
        let link = self.share_link_for(&account.pseudonym);
        self.say(
            account.account_id,
            ResponseKey::ShareLink,
            &[("link", link.as_str())],
            Actions::None,
        )
        .await?;
        self.say(
            account.account_id,
            ResponseKey::ShareLinkForward,
            &[],
            Actions::Main,
        )
        .await?;
        Ok(())
    }

    pub(crate) async fn show_account(&self, account: &Account) -> Result<(), RelayError> {
        let status = self.bot_status_label(account.is_bot_enabled);
        let joined = account.joined_at.format("%Y-%m-%d").to_string();
        self.say(
            account.account_id,
            ResponseKey::AccountSummary,
            &[
                ("pseudonym", account.pseudonym.as_str()),
                ("nickname", account.nickname.as_str()),
                ("joined_at", joined.as_str()),
                ("bot_status", status.as_str()),
            ],
            Actions::Account {
                bot_enabled: account.is_bot_enabled,
            },
        )
        .await?;
        Ok(())
    }

    pub(crate) async fn show_block_list(&self, account: &Account) -> Result<(), RelayError> {
        let (key, actions) = if account.block_list.is_empty() {
            (ResponseKey::BlockListEmpty, Actions::Main)
        } else {
            (
                ResponseKey::BlockList,
                Actions::BlockList {
                    entries: account.block_list.clone(),
                },
            )
        };
        self.say(account.account_id, key, &[], actions).await?;
        Ok(())
    }

    /// Switching off also abandons any pending flow.
    pub(crate) async fn toggle_bot_status(
        &self,
        envelope: &Envelope,
        account: &Account,
    ) -> Result<(), RelayError> {
        let enabled = !account.is_bot_enabled;
        self.db.set_bot_enabled(account.account_id, enabled)?;
        info!(account = %account.account_id, enabled, "bot status changed");

        let status = self.bot_status_label(enabled);
        self.say(
            account.account_id,
            ResponseKey::BotStatusChanged,
            &[("status", status.as_str())],
            Actions::Account {
                bot_enabled: enabled,
            },
        )
        .await?;
        self.acknowledge(envelope, None).await;
        Ok(())
    }

    fn bot_status_label(&self, enabled: bool) -> String {
        let key = if enabled {
            ResponseKey::BotStatusOn
        } else {
            ResponseKey::BotStatusOff
        };
        self.render(key, &[])
    }
}
