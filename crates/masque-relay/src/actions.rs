//! Commands invoked from the action buttons attached to relayed messages.

use chrono::Utc;
use tracing::{info, warn};

use masque_shared::constants::MAX_BLOCK_LIST;
use masque_shared::mark::{is_marked, toggle_mark};
use masque_shared::{
    Actions, Anchor, EditBinding, Envelope, MessageId, Party, Pseudonym, RelayError, ReplyBinding,
    ResponseKey, StateIssue, TextField,
};
use masque_store::{Account, BlockOutcome};

use crate::relay::Relay;
use crate::transport::{EditContent, Outgoing};

impl Relay {
    /// Bind the next plain message to `sender`'s message `message_id`.
    pub(crate) async fn enter_reply(
        &self,
        envelope: &Envelope,
        account: &Account,
        sender: &Pseudonym,
        message_id: MessageId,
    ) -> Result<(), RelayError> {
        let id = account.account_id;
        let target = self.resolver.resolve(sender)?;
        self.delivery.permit(id, &account.pseudonym, target)?;

        self.bindings.bind_reply(
            id,
            ReplyBinding {
                target: sender.clone(),
                target_message_id: message_id,
            },
        )?;
        info!(account = %id, target = %target, "reply mode entered");

        let mut prompt = Outgoing::text(self.render(ResponseKey::ReplyPrompt, &[]), Actions::Cancel);
        if let Some(anchor) = &envelope.anchor {
            prompt = prompt.threaded(anchor.message_id);
        }
        self.transport.send(id, prompt).await?;
        self.acknowledge(envelope, None).await;
        Ok(())
    }

    /// Record a seen receipt and tell the sender, once per message.
    pub(crate) async fn mark_seen(
        &self,
        envelope: &Envelope,
        account: &Account,
        sender: &Pseudonym,
        message_id: MessageId,
    ) -> Result<(), RelayError> {
        let id = account.account_id;
        let target = self.resolver.resolve(sender)?;
        if !self.moderation.is_bot_enabled(target)? {
            return Err(RelayError::BotDisabled(Party::Counterparty));
        }

        if self.receipts.mark_seen(id, sender, message_id)? {
            let notice = Outgoing::text(self.render(ResponseKey::SeenNotice, &[]), Actions::None)
                .threaded(message_id);
            if let Err(e) = self.transport.send(target, notice).await {
                warn!(target = %target, error = %e, "seen notice not delivered");
            }
            info!(account = %id, message = %message_id, "message marked seen");
        }

        if let Some(anchor) = &envelope.anchor {
            let actions = Actions::Recipient {
                sender: sender.clone(),
                message_id,
                seen: true,
                marked: anchor_marked(anchor),
            };
            self.transport
                .edit(id, anchor.message_id, EditContent::ActionsOnly, actions)
                .await?;
        }
        self.acknowledge(envelope, Some(self.render(ResponseKey::SeenSent, &[])))
            .await;
        Ok(())
    }

    /// Flip the marker on the recipient's copy, in place.
    pub(crate) async fn toggle_mark(
        &self,
        envelope: &Envelope,
        account: &Account,
        sender: &Pseudonym,
        message_id: MessageId,
    ) -> Result<(), RelayError> {
        let anchor = envelope
            .anchor
            .as_ref()
            .ok_or(RelayError::InvalidState(StateIssue::NotMarkable))?;
        let (content, marked) = match (&anchor.text, &anchor.caption) {
            (Some(text), _) => {
                let (next, marked) = toggle_mark(text);
                (EditContent::Text(next), marked)
            }
            (None, Some(caption)) => {
                let (next, marked) = toggle_mark(caption);
                (EditContent::Caption(next), marked)
            }
            (None, None) => return Err(RelayError::InvalidState(StateIssue::NotMarkable)),
        };

        let id = account.account_id;
        let seen = self.receipts.state(id, sender, message_id)?.seen;
        let actions = Actions::Recipient {
            sender: sender.clone(),
            message_id,
            seen,
            marked,
        };
        self.transport
            .edit(id, anchor.message_id, content, actions)
            .await?;
        self.receipts.set_marked(id, sender, message_id, marked)?;
        self.acknowledge(envelope, None).await;
        Ok(())
    }

    pub(crate) async fn block(
        &self,
        envelope: &Envelope,
        account: &Account,
        pseudonym: &Pseudonym,
    ) -> Result<(), RelayError> {
        let id = account.account_id;
        if pseudonym.is_support() {
            return Err(RelayError::Reserved);
        }
        if *pseudonym == account.pseudonym {
            return Err(RelayError::SelfAction);
        }
        self.resolver.resolve(pseudonym)?;

        match self.db.add_block(id, pseudonym, MAX_BLOCK_LIST, Utc::now())? {
            BlockOutcome::Added => {}
            BlockOutcome::AlreadyPresent => {
                return Err(RelayError::InvalidState(StateIssue::AlreadyBlocked))
            }
            BlockOutcome::Full => return Err(RelayError::InvalidState(StateIssue::BlockListFull)),
        }
        info!(account = %id, blocked = %pseudonym, "pseudonym blocked");

        if let Some(anchor) = &envelope.anchor {
            self.transport
                .edit(
                    id,
                    anchor.message_id,
                    EditContent::ActionsOnly,
                    Actions::Blocked {
                        pseudonym: pseudonym.clone(),
                    },
                )
                .await?;
        }
        self.say(
            id,
            ResponseKey::BlockConfirmed,
            &[("pseudonym", pseudonym.as_str())],
            Actions::Main,
        )
        .await?;
        self.acknowledge(envelope, None).await;
        Ok(())
    }

    pub(crate) async fn unblock(
        &self,
        envelope: &Envelope,
        account: &Account,
        pseudonym: &Pseudonym,
    ) -> Result<(), RelayError> {
        let id = account.account_id;
        if !self.db.remove_block(id, pseudonym)? {
            return Err(RelayError::InvalidState(StateIssue::NotBlocked));
        }
        info!(account = %id, unblocked = %pseudonym, "pseudonym unblocked");

        self.say(
            id,
            ResponseKey::UnblockConfirmed,
            &[("pseudonym", pseudonym.as_str())],
            Actions::Main,
        )
        .await?;
        self.acknowledge(envelope, None).await;
        Ok(())
    }

    /// Ask the sender for replacement text; their reply to the prompt
    /// completes the edit.
    pub(crate) async fn request_edit(
        &self,
        envelope: &Envelope,
        account: &Account,
        recipient: &Pseudonym,
        delivered: MessageId,
        origin: MessageId,
        field: TextField,
    ) -> Result<(), RelayError> {
        let id = account.account_id;
        let target = self.resolver.resolve(recipient)?;
        self.delivery.permit(id, &account.pseudonym, target)?;

        let prompt = Outgoing::text(self.render(ResponseKey::EditPrompt, &[]), Actions::Cancel)
            .threaded(origin);
        let prompt_id = self.transport.send(id, prompt).await?;

        self.bindings.bind_edit(
            id,
            EditBinding {
                target: recipient.clone(),
                target_message_id: delivered,
                origin_message_id: origin,
                prompt_message_id: prompt_id,
                field,
            },
        )?;
        info!(account = %id, target = %target, "edit requested");
        self.acknowledge(envelope, None).await;
        Ok(())
    }

    /// Remove a relayed message from the recipient's chat.
    pub(crate) async fn delete(
        &self,
        envelope: &Envelope,
        account: &Account,
        recipient: &Pseudonym,
        delivered: MessageId,
    ) -> Result<(), RelayError> {
        let id = account.account_id;
        let target = self.resolver.resolve(recipient)?;
        self.transport.delete(target, delivered).await?;
        info!(account = %id, target = %target, delivered = %delivered, "relayed message deleted");

        if let Some(anchor) = &envelope.anchor {
            self.transport
                .edit(id, anchor.message_id, EditContent::ActionsOnly, Actions::None)
                .await?;
        }
        self.acknowledge(envelope, Some(self.render(ResponseKey::Deleted, &[])))
            .await;
        Ok(())
    }
}

fn anchor_marked(anchor: &Anchor) -> bool {
    anchor
        .text
        .as_deref()
        .or(anchor.caption.as_deref())
        .is_some_and(is_marked)
}
