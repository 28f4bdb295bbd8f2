//! Conversation state machine.
//!
//! Decides how an inbound content message is interpreted, in this order:
//! a reply to the pending edit prompt, nickname input, a reply binding, the
//! open slot. With none of those it is rejected as "no active chat".
//! Ban and version checks run earlier, in [`Relay::handle`].

use chrono::Utc;
use tracing::{debug, info};

use masque_shared::{
    AccountId, Actions, EditBinding, MessageId, Mode, Payload, Pseudonym, RelayError,
    ResponseKey, StateIssue,
};
use masque_store::Account;

use crate::delivery::{DeliveryRequest, ReplaceRequest};
use crate::relay::Relay;
use crate::transport::Outgoing;

impl Relay {
    pub(crate) async fn handle_content(
        &self,
        account: &Account,
        message_id: MessageId,
        reply_to: Option<MessageId>,
        payload: &Payload,
    ) -> Result<(), RelayError> {
        let id = account.account_id;
        let mut mode = account.mode.clone();

        if let Mode::AwaitingEdit(binding) = &mode {
            if reply_to == Some(binding.prompt_message_id) {
                return self.apply_edit(account, &mode, binding, payload).await;
            }
            // Anything but an answer to the prompt abandons the edit.
            debug!(account = %id, "edit abandoned");
            self.bindings.release(id, &mode)?;
            mode = Mode::Idle;
        }

        match &mode {
            Mode::AwaitingNickname => self.commit_nickname(account, payload).await,
            Mode::Replying(binding) => {
                let target = self.resolver.resolve(&binding.target)?;
                let delivered = self
                    .delivery
                    .deliver(DeliveryRequest {
                        sender: id,
                        sender_pseudonym: &account.pseudonym,
                        target,
                        payload,
                        origin: message_id,
                        reply_to: Some(binding.target_message_id),
                        context: &mode,
                    })
                    .await?;
                self.confirm_sent(
                    id,
                    ResponseKey::ReplySent,
                    &binding.target,
                    payload,
                    delivered,
                    message_id,
                )
                .await
            }
            Mode::SlotOpen { target } => {
                let recipient = self.resolver.reverse(*target)?;
                let delivered = self
                    .delivery
                    .deliver(DeliveryRequest {
                        sender: id,
                        sender_pseudonym: &account.pseudonym,
                        target: *target,
                        payload,
                        origin: message_id,
                        reply_to: None,
                        context: &mode,
                    })
                    .await?;
                self.confirm_sent(id, ResponseKey::Sent, &recipient, payload, delivered, message_id)
                    .await
            }
            Mode::Idle | Mode::AwaitingEdit(_) => {
                Err(RelayError::InvalidState(StateIssue::NoActiveChat))
            }
        }
    }

    /// Open (or reopen) the slot towards `target`, replacing any other mode.
    pub(crate) async fn address(&self, account: &Account, target: &Pseudonym) -> Result<(), RelayError> {
        let id = account.account_id;
        let target_id = self.resolver.resolve(target)?;
        if target_id == id {
            return Err(RelayError::SelfAction);
        }
        self.delivery.permit(id, &account.pseudonym, target_id)?;

        let created = self.db.open_slot(id, target_id, Utc::now())?;
        info!(account = %id, target = %target_id, created, "conversation slot opened");

        let nickname = self
            .db
            .get_account(target_id)?
            .map(|a| a.nickname)
            .unwrap_or_default();
        self.say(
            id,
            ResponseKey::SendPrompt,
            &[("nickname", nickname.as_str())],
            Actions::Cancel,
        )
        .await?;
        Ok(())
    }

    /// Clear whatever flow is pending. Runs without the account lock, so it
    /// only ever swaps the mode it just read.
    pub(crate) async fn cancel(&self, account: &Account) -> Result<(), RelayError> {
        let id = account.account_id;
        loop {
            let mode = self.db.get_mode(id)?;
            let key = match &mode {
                Mode::Replying(_) => ResponseKey::ReplyCancelled,
                Mode::SlotOpen { .. } => ResponseKey::SendCancelled,
                Mode::AwaitingNickname => ResponseKey::NicknameCancelled,
                Mode::AwaitingEdit(_) => ResponseKey::EditCancelled,
                Mode::Idle => return Err(RelayError::InvalidState(StateIssue::NothingToCancel)),
            };
            if self.bindings.release(id, &mode)? {
                info!(account = %id, cancelled = mode.label(), "flow cancelled");
                self.say(id, key, &[], Actions::Main).await?;
                return Ok(());
            }
        }
    }

    pub(crate) async fn request_nickname(&self, account: &Account) -> Result<(), RelayError> {
        self.db.set_mode(account.account_id, &Mode::AwaitingNickname)?;
        self.say(
            account.account_id,
            ResponseKey::AskNickname,
            &[("current", account.nickname.as_str())],
            Actions::Cancel,
        )
        .await?;
        Ok(())
    }

    async fn commit_nickname(&self, account: &Account, payload: &Payload) -> Result<(), RelayError> {
        let id = account.account_id;
        let text = payload
            .as_text()
            .ok_or(RelayError::InvalidState(StateIssue::NicknameNeedsText))?
            .trim();
        self.validator
            .validate(text)
            .map_err(RelayError::InvalidNickname)?;

        if !self.db.commit_nickname(id, text)? {
            debug!(account = %id, "nickname flow ended before commit");
            return Ok(());
        }
        info!(account = %id, "nickname changed");
        self.say(id, ResponseKey::NicknameSet, &[("nickname", text)], Actions::Main)
            .await?;
        Ok(())
    }

    async fn apply_edit(
        &self,
        account: &Account,
        mode: &Mode,
        binding: &EditBinding,
        payload: &Payload,
    ) -> Result<(), RelayError> {
        let text = payload
            .as_text()
            .ok_or(RelayError::InvalidState(StateIssue::EditNeedsText))?;
        let target = self.resolver.resolve(&binding.target)?;
        self.delivery
            .replace(ReplaceRequest {
                sender: account.account_id,
                sender_pseudonym: &account.pseudonym,
                target,
                delivered: binding.target_message_id,
                origin: binding.origin_message_id,
                field: binding.field,
                text,
                context: mode,
            })
            .await?;
        self.say(account.account_id, ResponseKey::EditSent, &[], Actions::Main)
            .await?;
        Ok(())
    }

    /// Success notice carrying the edit/delete actions for the new copy.
    async fn confirm_sent(
        &self,
        sender: AccountId,
        key: ResponseKey,
        recipient: &Pseudonym,
        payload: &Payload,
        delivered: MessageId,
        origin: MessageId,
    ) -> Result<(), RelayError> {
        let notice = Outgoing::text(
            self.render(key, &[]),
            Actions::Sent {
                recipient: recipient.clone(),
                delivered,
                origin,
                editable: payload.text_field(),
            },
        )
        .threaded(origin);
        self.transport.send(sender, notice).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use masque_shared::{Catalog, Command, Envelope, ReplyBinding};

    use super::*;
    use crate::testing::{harness, Harness};

    const X: i64 = 1;
    const Y: i64 = 2;

    fn says(h: &Harness, chat: i64, key: ResponseKey) -> bool {
        h.transport.last_to(AccountId(chat)).text() == Catalog::template(key)
    }

    #[tokio::test]
    async fn test_scenario_a_first_contact_and_delivery() {
        let h = harness();
        let px = h.join(X).await;
        let py = h.join(Y).await;

        h.address(X, &py).await;
        let slots = h.db.conversations_for(AccountId(X)).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].target_account, AccountId(Y));
        assert!(slots[0].open);

        h.text(X, 10, "hello").await;

        let received = h.transport.last_to(AccountId(Y));
        assert!(received.text().contains("hello"));
        assert_eq!(
            received.message.actions,
            Actions::Recipient {
                sender: px,
                message_id: MessageId(10),
                seen: false,
                marked: false
            }
        );
        let slots = h.db.conversations_for(AccountId(X)).unwrap();
        assert_eq!(slots.len(), 1);
        assert!(!slots[0].open);
        assert!(says(&h, X, ResponseKey::Sent));
    }

    #[tokio::test]
    async fn test_scenario_b_reply_threads_back() {
        let h = harness();
        let px = h.join(X).await;
        let py = h.join(Y).await;
        h.address(X, &py).await;
        h.text(X, 10, "hello").await;

        let anchor = h.anchor_of_last(Y);
        h.action(
            Y,
            anchor,
            Command::Reply {
                sender: px.clone(),
                message_id: MessageId(10),
            },
        )
        .await;
        assert_eq!(
            h.mode(Y),
            Mode::Replying(ReplyBinding {
                target: px,
                target_message_id: MessageId(10)
            })
        );

        let before = h.mode(X);
        h.text(Y, 20, "hi back").await;

        let received = h.transport.last_to(AccountId(X));
        assert!(received.text().contains("hi back"));
        assert_eq!(received.message.reply_to, Some(MessageId(10)));
        assert_eq!(h.mode(Y), Mode::Idle);
        assert_eq!(h.mode(X), before);
    }

    #[tokio::test]
    async fn test_scenario_c_blocked_address() {
        let h = harness();
        let px = h.join(X).await;
        let py = h.join(Y).await;

        h.command(X, Command::Block { pseudonym: py }).await;
        let before = h.transport.sent_to(AccountId(X)).len();

        h.address(Y, &px).await;

        assert!(says(&h, Y, ResponseKey::BlockedByUser));
        assert!(h.db.conversations_for(AccountId(Y)).unwrap().is_empty());
        assert_eq!(h.mode(Y), Mode::Idle);
        assert_eq!(h.transport.sent_to(AccountId(X)).len(), before);
    }

    #[tokio::test]
    async fn test_scenario_d_unreachable_force_closes() {
        let h = harness();
        h.join(X).await;
        let py = h.join(Y).await;
        h.address(X, &py).await;
        let before = h.transport.sent_to(AccountId(Y)).len();

        h.transport.mark_unreachable(AccountId(Y));
        h.text(X, 10, "hello").await;

        assert_eq!(h.mode(X), Mode::Idle);
        assert_eq!(h.open_slots(X), 0);
        assert!(says(&h, X, ResponseKey::Undeliverable));
        assert_eq!(h.transport.sent_to(AccountId(Y)).len(), before);
        assert_eq!(h.mode(Y), Mode::Idle);
    }

    #[tokio::test]
    async fn test_scenario_e_nothing_to_cancel() {
        let h = harness();
        h.join(X).await;

        h.command(X, Command::Cancel).await;

        assert!(says(&h, X, ResponseKey::NothingToCancel));
        assert_eq!(h.mode(X), Mode::Idle);
    }

    #[tokio::test]
    async fn test_scenario_f_address_clears_nickname_flow() {
        let h = harness();
        h.join(X).await;
        let py = h.join(Y).await;

        h.command(X, Command::ChangeNickname).await;
        assert_eq!(h.mode(X), Mode::AwaitingNickname);

        h.address(X, &py).await;
        assert_eq!(h.mode(X), Mode::SlotOpen { target: AccountId(Y) });

        h.text(X, 11, "Rosebud").await;

        assert!(h.transport.last_to(AccountId(Y)).text().contains("Rosebud"));
        let account = h.db.get_account(AccountId(X)).unwrap().unwrap();
        assert_eq!(account.nickname, "User1");
    }

    #[tokio::test]
    async fn test_no_active_chat_has_no_side_effects() {
        let h = harness();
        h.join(X).await;
        h.join(Y).await;
        let received = h.transport.sent_to(AccountId(Y)).len();

        h.text(X, 5, "anyone?").await;

        assert!(says(&h, X, ResponseKey::NoActiveChat));
        assert_eq!(h.transport.sent_to(AccountId(Y)).len(), received);
        assert_eq!(h.db.delivered_total().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_pseudonym_is_not_found() {
        let h = harness();
        h.join(X).await;

        h.address(X, &Pseudonym::generate()).await;
        assert!(says(&h, X, ResponseKey::NoUserFound));
        assert_eq!(h.mode(X), Mode::Idle);

        h.command(
            X,
            Command::Start {
                argument: Some("not a pseudonym!".into()),
            },
        )
        .await;
        assert!(says(&h, X, ResponseKey::NoUserFound));
    }

    #[tokio::test]
    async fn test_self_address_rejected() {
        let h = harness();
        let px = h.join(X).await;

        h.address(X, &px).await;

        assert!(says(&h, X, ResponseKey::SelfAction));
        assert!(h.db.conversations_for(AccountId(X)).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recipient_bot_off() {
        let h = harness();
        h.join(X).await;
        let py = h.join(Y).await;
        h.command(Y, Command::ToggleBotStatus).await;

        h.address(X, &py).await;

        assert!(says(&h, X, ResponseKey::BotOffRecipient));
        assert_eq!(h.mode(X), Mode::Idle);
    }

    #[tokio::test]
    async fn test_cancel_clears_each_flow() {
        let h = harness();
        let px = h.join(X).await;
        let py = h.join(Y).await;

        h.address(X, &py).await;
        h.command(X, Command::Cancel).await;
        assert!(says(&h, X, ResponseKey::SendCancelled));
        assert_eq!(h.mode(X), Mode::Idle);
        assert_eq!(h.db.conversations_for(AccountId(X)).unwrap().len(), 1);

        h.command(X, Command::ChangeNickname).await;
        h.command(X, Command::Cancel).await;
        assert!(says(&h, X, ResponseKey::NicknameCancelled));

        h.address(Y, &px).await;
        h.text(Y, 3, "psst").await;
        let anchor = h.anchor_of_last(X);
        h.action(
            X,
            anchor,
            Command::Reply {
                sender: py,
                message_id: MessageId(3),
            },
        )
        .await;
        h.command(X, Command::Cancel).await;
        assert!(says(&h, X, ResponseKey::ReplyCancelled));
        assert_eq!(h.mode(X), Mode::Idle);
    }

    #[tokio::test]
    async fn test_cancel_does_not_wait_for_locked_account() {
        let h = harness();
        h.join(X).await;
        let py = h.join(Y).await;
        h.address(X, &py).await;

        // Simulate a delivery holding the account.
        let held = h.relay.locks().acquire(AccountId(X)).await;
        let cancel = h.relay.handle(Envelope::message(AccountId(X), "User1", Command::Cancel));
        tokio::time::timeout(Duration::from_millis(200), cancel)
            .await
            .expect("cancel blocked on the account lock")
            .unwrap();
        drop(held);

        assert_eq!(h.mode(X), Mode::Idle);
    }

    #[tokio::test]
    async fn test_nickname_set_and_rejected() {
        let h = harness();
        h.join(X).await;

        h.command(X, Command::ChangeNickname).await;
        h.text(X, 2, "/admin").await;
        assert_eq!(h.mode(X), Mode::AwaitingNickname);
        assert!(h.transport.last_to(AccountId(X)).text().contains("'/'"));

        h.command(
            X,
            Command::Content {
                message_id: MessageId(3),
                reply_to: None,
                payload: Payload::Media {
                    kind: masque_shared::MediaKind::Photo,
                    file_id: "AgAD".into(),
                    caption: None,
                },
            },
        )
        .await;
        assert!(says(&h, X, ResponseKey::NicknameNeedsText));
        assert_eq!(h.mode(X), Mode::AwaitingNickname);

        h.text(X, 4, "  Rose  ").await;
        assert_eq!(h.mode(X), Mode::Idle);
        let account = h.db.get_account(AccountId(X)).unwrap().unwrap();
        assert_eq!(account.nickname, "Rose");
    }

    #[tokio::test]
    async fn test_single_open_slot_across_sequences() {
        let h = harness();
        h.join(X).await;
        let mut targets = Vec::new();
        for id in 10..15 {
            targets.push(h.join(id).await);
        }

        for (i, target) in targets.iter().enumerate() {
            h.address(X, target).await;
            assert_eq!(h.open_slots(X), 1);
            if i % 2 == 0 {
                h.text(X, 100 + i as i64, "hi").await;
                assert_eq!(h.open_slots(X), 0);
            }
        }
        h.command(X, Command::Cancel).await;
        assert_eq!(h.open_slots(X), 0);
        assert_eq!(h.db.conversations_for(AccountId(X)).unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_concurrent_commands_leave_one_mode() {
        let h = Arc::new(harness());
        let px = h.join(X).await;
        let py = h.join(Y).await;
        h.address(Y, &px).await;
        h.text(Y, 7, "ping").await;

        let mut tasks = Vec::new();
        for round in 0..10 {
            let h = h.clone();
            let py = py.clone();
            tasks.push(tokio::spawn(async move {
                let command = match round % 4 {
                    0 => Command::ChangeNickname,
                    1 => Command::Start {
                        argument: Some(py.to_string()),
                    },
                    2 => Command::Reply {
                        sender: py,
                        message_id: MessageId(7),
                    },
                    _ => Command::Cancel,
                };
                h.relay
                    .handle(Envelope::message(AccountId(X), "User1", command))
                    .await
                    .unwrap();
            }));
        }
        futures::future::join_all(tasks).await;

        let account = h.db.get_account(AccountId(X)).unwrap().unwrap();
        assert!(account.conversations.iter().filter(|s| s.open).count() <= 1);
        let open_matches_mode = account
            .conversations
            .iter()
            .all(|s| s.open == (account.mode.open_slot() == Some(s.target_account)));
        assert!(open_matches_mode);
    }

    #[tokio::test]
    async fn test_failed_release_withholds_success_notice() {
        let h = harness();
        h.join(X).await;
        let py = h.join(Y).await;
        h.address(X, &py).await;
        h.db.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER fail_release BEFORE UPDATE OF mode ON accounts
                 WHEN NEW.account_id = 1
                 BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
            )?;
            Ok(())
        })
        .unwrap();

        let result = h
            .relay
            .handle(Envelope::message(
                AccountId(X),
                "x",
                Command::Content {
                    message_id: MessageId(10),
                    reply_to: None,
                    payload: Payload::text("hello"),
                },
            ))
            .await;

        assert!(matches!(result, Err(RelayError::Store(_))));
        assert!(h.transport.last_to(AccountId(Y)).text().contains("hello"));
        assert!(h
            .transport
            .sent_to(AccountId(X))
            .iter()
            .all(|m| !matches!(m.message.actions, Actions::Sent { .. })));
        assert!(says(&h, X, ResponseKey::GenericFailure));
    }
}
