//! The relay front door.
//!
//! [`Relay::handle`] takes one decoded [`Envelope`], serializes it against
//! other commands of the same account and routes it to the state machine.
//! Recoverable failures become exactly one explanatory message; store and
//! transport failures additionally bubble up to the caller.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use masque_shared::constants::DEFAULT_STATE_VERSION;
use masque_shared::{
    AccountId, Actions, Catalog, Command, Envelope, Localizer, MessageId, Pseudonym, RelayError,
    ResponseKey,
};
use masque_store::{Account, BanRecord, Database, StoreStats};

use crate::binding::Bindings;
use crate::delivery::Delivery;
use crate::locks::AccountLocks;
use crate::moderation::{Moderation, StoreModeration};
use crate::receipts::Receipts;
use crate::resolver::PseudonymResolver;
use crate::throttle::Throttle;
use crate::transport::{Outgoing, Transport};
use crate::validation::{DefaultNicknamePolicy, NicknameValidator};

#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Accounts stamped with another version get their session reset.
    pub state_version: u32,
    /// Where the reserved `support` pseudonym routes.
    pub support_account: Option<AccountId>,
    pub moderators: Vec<AccountId>,
    /// Used to build share links.
    pub bot_username: String,
    /// Commands per second an account may sustain.
    pub flood_rate: f64,
    pub flood_burst: f64,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            state_version: DEFAULT_STATE_VERSION,
            support_account: None,
            moderators: Vec::new(),
            bot_username: "masque_bot".to_string(),
            flood_rate: 10.0,
            flood_burst: 30.0,
        }
    }
}

/// Result of an admin ban/unban request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanOutcome {
    Applied,
    /// The account was already in the requested state.
    Unchanged,
}

pub struct Relay {
    pub(crate) db: Arc<Database>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) localizer: Arc<dyn Localizer>,
    pub(crate) validator: Arc<dyn NicknameValidator>,
    pub(crate) moderation: Arc<dyn Moderation>,
    pub(crate) resolver: PseudonymResolver,
    pub(crate) bindings: Bindings,
    pub(crate) receipts: Receipts,
    pub(crate) delivery: Delivery,
    pub(crate) locks: AccountLocks,
    pub(crate) throttle: Throttle<AccountId>,
    pub(crate) settings: RelaySettings,
}

impl Relay {
    /// Build a relay with the English catalog, the default nickname policy
    /// and moderation flags read from the store.
    pub fn new(db: Arc<Database>, transport: Arc<dyn Transport>, settings: RelaySettings) -> Self {
        let localizer: Arc<dyn Localizer> = Arc::new(Catalog);
        let moderation: Arc<dyn Moderation> = Arc::new(StoreModeration::new(db.clone()));
        Self {
            resolver: PseudonymResolver::new(db.clone(), settings.support_account),
            bindings: Bindings::new(db.clone()),
            receipts: Receipts::new(db.clone()),
            delivery: Delivery::new(
                db.clone(),
                transport.clone(),
                localizer.clone(),
                moderation.clone(),
            ),
            locks: AccountLocks::new(),
            throttle: Throttle::new(settings.flood_rate, settings.flood_burst),
            validator: Arc::new(DefaultNicknamePolicy),
            db,
            transport,
            localizer,
            moderation,
            settings,
        }
    }

    pub fn with_localizer(mut self, localizer: Arc<dyn Localizer>) -> Self {
        self.delivery = Delivery::new(
            self.db.clone(),
            self.transport.clone(),
            localizer.clone(),
            self.moderation.clone(),
        );
        self.localizer = localizer;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn NicknameValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    pub fn locks(&self) -> &AccountLocks {
        &self.locks
    }

    pub fn throttle(&self) -> &Throttle<AccountId> {
        &self.throttle
    }

    // ------------------------------------------------------------------
    // Inbound commands
    // ------------------------------------------------------------------

    /// Process one inbound command.
    ///
    /// `Err` is returned only for store and transport failures, after the
    /// initiator has been sent a generic failure notice.
    pub async fn handle(&self, envelope: Envelope) -> Result<(), RelayError> {
        let account = envelope.account;
        if !self.throttle.check(account).await {
            warn!(account = %account, "flood limit reached, dropping command");
            return Ok(());
        }

        // Cancel must never wait behind an in-flight delivery.
        let _guard = match envelope.command {
            Command::Cancel => None,
            _ => Some(self.locks.acquire(account).await),
        };

        match self.dispatch(&envelope).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.explain(&envelope, &err).await;
                if err.is_recoverable() {
                    debug!(account = %account, error = %err, "command rejected");
                    Ok(())
                } else {
                    error!(account = %account, error = %err, "command failed");
                    Err(err)
                }
            }
        }
    }

    async fn dispatch(&self, envelope: &Envelope) -> Result<(), RelayError> {
        let account = self
            .ensure_account(envelope.account, &envelope.display_name)
            .await?;

        if self.moderation.is_banned(account.account_id)? {
            return Err(RelayError::Banned);
        }

        if account.version != self.settings.state_version {
            self.restart_session(&account).await?;
            if !matches!(envelope.command, Command::Start { .. }) {
                return Ok(());
            }
        }

        match &envelope.command {
            Command::Start { argument: None } => self.welcome(&account).await,
            Command::Start {
                argument: Some(raw),
            } => match Pseudonym::parse(raw) {
                Some(target) => self.address(&account, &target).await,
                None => Err(RelayError::NotFound),
            },
            Command::Support => self.address(&account, &Pseudonym::support()).await,
            Command::Content {
                message_id,
                reply_to,
                payload,
            } => {
                self.handle_content(&account, *message_id, *reply_to, payload)
                    .await
            }
            Command::Unsupported => Err(RelayError::InvalidState(
                masque_shared::StateIssue::UnknownMedia,
            )),
            Command::Cancel => self.cancel(&account).await,
            Command::ShareLink => self.share_link(&account).await,
            Command::BlockList => self.show_block_list(&account).await,
            Command::Guide => {
                self.say(account.account_id, ResponseKey::Guide, &[], Actions::Main)
                    .await?;
                Ok(())
            }
            Command::Account => self.show_account(&account).await,
            Command::ChangeNickname => self.request_nickname(&account).await,
            Command::ToggleBotStatus => self.toggle_bot_status(envelope, &account).await,
            Command::Reply { sender, message_id } => {
                self.enter_reply(envelope, &account, sender, *message_id)
                    .await
            }
            Command::Seen { sender, message_id } => {
                self.mark_seen(envelope, &account, sender, *message_id)
                    .await
            }
            Command::Mark { sender, message_id } => {
                self.toggle_mark(envelope, &account, sender, *message_id)
                    .await
            }
            Command::Block { pseudonym } => self.block(envelope, &account, pseudonym).await,
            Command::Unblock { pseudonym } => self.unblock(envelope, &account, pseudonym).await,
            Command::EditRequest {
                recipient,
                delivered,
                origin,
                field,
            } => {
                self.request_edit(envelope, &account, recipient, *delivered, *origin, *field)
                    .await
            }
            Command::Delete {
                recipient,
                delivered,
            } => self.delete(envelope, &account, recipient, *delivered).await,
        }
    }

    // ------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------

    /// Ban the owner of `target`. Moderators cannot be banned.
    pub async fn ban(&self, target: &Pseudonym, by: AccountId) -> Result<BanOutcome, RelayError> {
        let account = self.resolver.resolve(target)?;
        if self.settings.moderators.contains(&account) {
            return Err(RelayError::Reserved);
        }
        let record = BanRecord {
            banned_by: by,
            banned_at: Utc::now(),
        };
        if !self.db.set_ban(account, Some(&record))? {
            return Ok(BanOutcome::Unchanged);
        }
        info!(account = %account, by = %by, "account banned");

        self.notify(account, ResponseKey::Banned, &[]).await;
        let by = by.to_string();
        self.notify_moderators(
            ResponseKey::BanAnnouncement,
            &[("pseudonym", target.as_str()), ("by", by.as_str())],
        )
        .await;
        Ok(BanOutcome::Applied)
    }

    pub async fn unban(&self, target: &Pseudonym) -> Result<BanOutcome, RelayError> {
        let account = self.resolver.resolve(target)?;
        if !self.db.set_ban(account, None)? {
            return Ok(BanOutcome::Unchanged);
        }
        info!(account = %account, "account unbanned");

        self.notify(account, ResponseKey::Unbanned, &[]).await;
        self.notify_moderators(
            ResponseKey::UnbanAnnouncement,
            &[("pseudonym", target.as_str())],
        )
        .await;
        Ok(BanOutcome::Applied)
    }

    /// Full record behind a pseudonym, for moderators.
    pub fn lookup(&self, target: &Pseudonym) -> Result<Account, RelayError> {
        let account = self.resolver.resolve(target)?;
        self.db.get_account(account)?.ok_or(RelayError::NotFound)
    }

    pub fn stats(&self) -> Result<StoreStats, RelayError> {
        Ok(self.db.stats()?)
    }

    // ------------------------------------------------------------------
    // Output helpers
    // ------------------------------------------------------------------

    pub(crate) fn render(&self, key: ResponseKey, params: &[(&str, &str)]) -> String {
        self.localizer.render(key, params)
    }

    pub(crate) async fn say(
        &self,
        chat: AccountId,
        key: ResponseKey,
        params: &[(&str, &str)],
        actions: Actions,
    ) -> Result<MessageId, RelayError> {
        let text = self.render(key, params);
        Ok(self.transport.send(chat, Outgoing::text(text, actions)).await?)
    }

    /// Send without letting a failure reach the caller.
    pub(crate) async fn notify(&self, chat: AccountId, key: ResponseKey, params: &[(&str, &str)]) {
        if let Err(e) = self.say(chat, key, params, Actions::None).await {
            warn!(chat = %chat, key = key.as_str(), error = %e, "notification failed");
        }
    }

    pub(crate) async fn notify_moderators(&self, key: ResponseKey, params: &[(&str, &str)]) {
        for moderator in &self.settings.moderators {
            self.notify(*moderator, key, params).await;
        }
    }

    /// Close the loading state of an action button.
    pub(crate) async fn acknowledge(&self, envelope: &Envelope, text: Option<String>) {
        let Some(action_id) = envelope.action_id.as_deref() else {
            return;
        };
        if let Err(e) = self.transport.answer_action(action_id, text, false).await {
            warn!(error = %e, "failed to answer action");
        }
    }

    /// The single explanatory message for a rejected command.
    async fn explain(&self, envelope: &Envelope, err: &RelayError) {
        let text = match err {
            RelayError::InvalidNickname(message) => message.clone(),
            other => self.render(other.response_key(), &[]),
        };

        let result = match envelope.action_id.as_deref() {
            Some(action_id) => self.transport.answer_action(action_id, Some(text), true).await,
            None => self
                .transport
                .send(envelope.account, Outgoing::text(text, Actions::None))
                .await
                .map(|_| ()),
        };
        if let Err(e) = result {
            warn!(account = %envelope.account, error = %e, "failed to report rejection");
        }
    }
}
