//! Delivery orchestrator.
//!
//! Every relayed message and every in-place edit of a relayed message goes
//! through here. The checks are repeated immediately before the transport
//! call because the routing decision may be stale by then.

use std::sync::Arc;

use tracing::{debug, info, warn};

use masque_shared::mark::toggle_mark;
use masque_shared::{
    AccountId, Actions, Localizer, MessageId, Mode, Party, Payload, Pseudonym, RelayError,
    ResponseKey, TextField,
};
use masque_store::Database;

use crate::binding::Bindings;
use crate::guard::BlockGuard;
use crate::moderation::Moderation;
use crate::transport::{EditContent, Outgoing, Transport, TransportError};

/// One relayed message.
#[derive(Debug)]
pub struct DeliveryRequest<'a> {
    pub sender: AccountId,
    pub sender_pseudonym: &'a Pseudonym,
    pub target: AccountId,
    pub payload: &'a Payload,
    /// The sender's own message id; the recipient's actions refer to it.
    pub origin: MessageId,
    /// Thread under this message in the target's chat.
    pub reply_to: Option<MessageId>,
    /// Sender mode the routing decision was made under. Released to `Idle`
    /// once the attempt is over.
    pub context: &'a Mode,
}

/// Replacement text for an already delivered message.
#[derive(Debug)]
pub struct ReplaceRequest<'a> {
    pub sender: AccountId,
    pub sender_pseudonym: &'a Pseudonym,
    pub target: AccountId,
    /// Id of the delivered copy in the target's chat.
    pub delivered: MessageId,
    pub origin: MessageId,
    /// Text body or caption of the delivered copy.
    pub field: TextField,
    pub text: &'a str,
    pub context: &'a Mode,
}

#[derive(Clone)]
pub struct Delivery {
    db: Arc<Database>,
    transport: Arc<dyn Transport>,
    localizer: Arc<dyn Localizer>,
    moderation: Arc<dyn Moderation>,
    guard: BlockGuard,
    bindings: Bindings,
}

impl Delivery {
    pub fn new(
        db: Arc<Database>,
        transport: Arc<dyn Transport>,
        localizer: Arc<dyn Localizer>,
        moderation: Arc<dyn Moderation>,
    ) -> Self {
        Self {
            guard: BlockGuard::new(db.clone()),
            bindings: Bindings::new(db.clone()),
            db,
            transport,
            localizer,
            moderation,
        }
    }

    /// Fail with the first reason `sender` may not reach `target`.
    pub fn permit(
        &self,
        sender: AccountId,
        sender_pseudonym: &Pseudonym,
        target: AccountId,
    ) -> Result<(), RelayError> {
        if !self.moderation.is_bot_enabled(sender)? {
            return Err(RelayError::BotDisabled(Party::Caller));
        }
        if self.guard.is_blocked(sender_pseudonym, target)? {
            return Err(RelayError::Blocked);
        }
        if !self.moderation.is_bot_enabled(target)? {
            return Err(RelayError::BotDisabled(Party::Counterparty));
        }
        Ok(())
    }

    /// Send `request.payload` to the target at most once.
    ///
    /// Returns the id of the copy in the target's chat.
    pub async fn deliver(&self, request: DeliveryRequest<'_>) -> Result<MessageId, RelayError> {
        self.permit(request.sender, request.sender_pseudonym, request.target)?;

        let outgoing = Outgoing {
            payload: self.recipient_copy(request.payload),
            reply_to: request.reply_to,
            actions: Actions::Recipient {
                sender: request.sender_pseudonym.clone(),
                message_id: request.origin,
                seen: false,
                marked: false,
            },
        };

        let delivered = match self.transport.send(request.target, outgoing).await {
            Ok(id) => id,
            Err(err) => return Err(self.fail(request.sender, request.target, request.context, err)),
        };

        info!(
            sender = %request.sender,
            target = %request.target,
            delivered = %delivered,
            threaded = request.reply_to.is_some(),
            "message relayed"
        );

        // A failed release means the sender must not see a success notice.
        if !self.bindings.release(request.sender, request.context)? {
            debug!(account = %request.sender, "mode changed during delivery");
        }

        if let Err(e) = self.db.increment_delivered(1) {
            warn!(error = %e, "failed to bump delivered counter");
        }

        Ok(delivered)
    }

    /// Overwrite the target's copy of a delivered message with new text.
    ///
    /// The recipient's seen and mark state carry over to the new text.
    pub async fn replace(&self, request: ReplaceRequest<'_>) -> Result<(), RelayError> {
        self.permit(request.sender, request.sender_pseudonym, request.target)?;

        let receipt = self
            .db
            .receipt(request.target, request.sender_pseudonym, request.origin)?;
        let render = |key: ResponseKey, name: &str| {
            let text = self.localizer.render(key, &[(name, request.text)]);
            if receipt.marked {
                toggle_mark(&text).0
            } else {
                text
            }
        };
        let content = match request.field {
            TextField::Text => EditContent::Text(render(ResponseKey::RecipientText, "text")),
            TextField::Caption => {
                EditContent::Caption(render(ResponseKey::RecipientCaption, "caption"))
            }
        };
        let actions = Actions::Recipient {
            sender: request.sender_pseudonym.clone(),
            message_id: request.origin,
            seen: receipt.seen,
            marked: receipt.marked,
        };

        if let Err(err) = self
            .transport
            .edit(request.target, request.delivered, content, actions)
            .await
        {
            return Err(self.fail(request.sender, request.target, request.context, err));
        }

        info!(
            sender = %request.sender,
            target = %request.target,
            delivered = %request.delivered,
            "relayed message edited"
        );
        self.bindings.release(request.sender, request.context)?;
        Ok(())
    }

    /// Map a transport failure. Only `Unreachable` touches state: the
    /// sender's slot or binding is force-closed.
    fn fail(&self, sender: AccountId, target: AccountId, context: &Mode, err: TransportError) -> RelayError {
        match err {
            TransportError::Unreachable => {
                warn!(sender = %sender, target = %target, "recipient unreachable, closing context");
                if let Err(e) = self.bindings.release(sender, context) {
                    return e;
                }
                RelayError::Unreachable
            }
            other => {
                warn!(sender = %sender, target = %target, error = %other, "delivery failed");
                other.into()
            }
        }
    }

    fn recipient_copy(&self, payload: &Payload) -> Payload {
        match payload {
            Payload::Text { text } => Payload::text(
                self.localizer
                    .render(ResponseKey::RecipientText, &[("text", text.as_str())]),
            ),
            Payload::Media {
                kind,
                file_id,
                caption,
            } => Payload::Media {
                kind: *kind,
                file_id: file_id.clone(),
                caption: kind.accepts_caption().then(|| {
                    self.localizer.render(
                        ResponseKey::RecipientCaption,
                        &[("caption", caption.as_deref().unwrap_or(""))],
                    )
                }),
            },
        }
    }
}
