//! User-facing text.
//!
//! The relay only ever names a [`ResponseKey`] plus named parameters; a
//! [`Localizer`] turns that into display text. [`Catalog`] is the built-in
//! English localizer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseKey {
    Welcome,
    RestartRequired,
    ShareLink,
    ShareLinkForward,
    Guide,
    AccountSummary,
    BotStatusOn,
    BotStatusOff,
    BotStatusChanged,
    AskNickname,
    NicknameSet,
    NicknameCancelled,
    NicknameNeedsText,
    SendPrompt,
    RecipientText,
    RecipientCaption,
    Sent,
    SendCancelled,
    ReplyPrompt,
    ReplySent,
    ReplyCancelled,
    SeenNotice,
    SeenSent,
    EditPrompt,
    EditSent,
    EditCancelled,
    EditNeedsText,
    Deleted,
    BlockConfirmed,
    UnblockConfirmed,
    AlreadyBlocked,
    NotBlocked,
    BlockListFull,
    BlockedByUser,
    BlockList,
    BlockListEmpty,
    BlockSupport,
    SelfAction,
    BotOffSelf,
    BotOffRecipient,
    Banned,
    Unbanned,
    NoActiveChat,
    NoUserFound,
    NothingToCancel,
    UnknownMedia,
    NotMarkable,
    Undeliverable,
    GenericFailure,
    NewUserAnnouncement,
    BanAnnouncement,
    UnbanAnnouncement,
}

impl ResponseKey {
    /// Dotted key, stable across catalogs.
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseKey::Welcome => "greeting.welcome",
            ResponseKey::RestartRequired => "errors.restart_required",
            ResponseKey::ShareLink => "greeting.link",
            ResponseKey::ShareLinkForward => "greeting.send_link",
            ResponseKey::Guide => "support.guide",
            ResponseKey::AccountSummary => "account.show",
            ResponseKey::BotStatusOn => "account.bot_status.on",
            ResponseKey::BotStatusOff => "account.bot_status.off",
            ResponseKey::BotStatusChanged => "account.bot_status.self.status_changed",
            ResponseKey::AskNickname => "nickname.ask_nickname",
            ResponseKey::NicknameSet => "nickname.nickname_was_set",
            ResponseKey::NicknameCancelled => "nickname.cancelled",
            ResponseKey::NicknameNeedsText => "nickname.needs_text",
            ResponseKey::SendPrompt => "texting.sending.send",
            ResponseKey::RecipientText => "texting.sending.recipient",
            ResponseKey::RecipientCaption => "texting.sending.recipient_caption",
            ResponseKey::Sent => "texting.sending.sent",
            ResponseKey::SendCancelled => "texting.sending.cancelled",
            ResponseKey::ReplyPrompt => "texting.replying.send",
            ResponseKey::ReplySent => "texting.replying.sent",
            ResponseKey::ReplyCancelled => "texting.replying.cancelled",
            ResponseKey::SeenNotice => "texting.seen.recipient",
            ResponseKey::SeenSent => "texting.seen.sent",
            ResponseKey::EditPrompt => "texting.tools.editing.send",
            ResponseKey::EditSent => "texting.tools.editing.sent",
            ResponseKey::EditCancelled => "texting.tools.editing.cancelled",
            ResponseKey::EditNeedsText => "texting.tools.editing.needs_text",
            ResponseKey::Deleted => "texting.tools.delete.deleted",
            ResponseKey::BlockConfirmed => "blocking.block_confirm",
            ResponseKey::UnblockConfirmed => "blocking.unblock_confirm",
            ResponseKey::AlreadyBlocked => "blocking.already_blocked",
            ResponseKey::NotBlocked => "blocking.not_blocked",
            ResponseKey::BlockListFull => "blocking.blocklist_full",
            ResponseKey::BlockedByUser => "blocking.blocked_by_user",
            ResponseKey::BlockList => "blocking.blocklist",
            ResponseKey::BlockListEmpty => "blocking.blocklist_empty",
            ResponseKey::BlockSupport => "blocking.support",
            ResponseKey::SelfAction => "errors.cant_message_self",
            ResponseKey::BotOffSelf => "account.bot_status.self.off",
            ResponseKey::BotOffRecipient => "account.bot_status.recipient.off",
            ResponseKey::Banned => "account.ban.banned",
            ResponseKey::Unbanned => "account.ban.unbanned",
            ResponseKey::NoActiveChat => "errors.no_active_chat",
            ResponseKey::NoUserFound => "errors.no_user_found",
            ResponseKey::NothingToCancel => "errors.no_cancel",
            ResponseKey::UnknownMedia => "errors.unknown_media",
            ResponseKey::NotMarkable => "errors.not_markable",
            ResponseKey::Undeliverable => "errors.bot_blocked",
            ResponseKey::GenericFailure => "errors.generic",
            ResponseKey::NewUserAnnouncement => "admin.stats.new_user",
            ResponseKey::BanAnnouncement => "admin.user.ban.success",
            ResponseKey::UnbanAnnouncement => "admin.user.unban.success",
        }
    }
}

/// Formats a response key with named parameters.
pub trait Localizer: Send + Sync {
    fn render(&self, key: ResponseKey, params: &[(&str, &str)]) -> String;
}

/// Built-in English catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct Catalog;

impl Catalog {
    pub fn template(key: ResponseKey) -> &'static str {
        match key {
            ResponseKey::Welcome => {
                "Hi {nickname}, welcome to the anonymous relay.\nUse the menu below to get started."
            }
            ResponseKey::RestartRequired => {
                "The relay was updated, so your session was reset. You're good to go again."
            }
            ResponseKey::ShareLink => {
                "Ever wanted to tell me something but felt shy? Here's your chance:\n{link}\nNo names, no clues."
            }
            ResponseKey::ShareLinkForward => {
                "Forward the message above or share its link so others can message you anonymously."
            }
            ResponseKey::Guide => {
                "Share your link. Anyone who opens it can send you a message without revealing who they are. Use the buttons under a message to reply, mark it, or block the sender."
            }
            ResponseKey::AccountSummary => {
                "Pseudonym: {pseudonym}\nNickname: {nickname}\nJoined: {joined_at}\nRelay: {bot_status}"
            }
            ResponseKey::BotStatusOn => "on",
            ResponseKey::BotStatusOff => "off",
            ResponseKey::BotStatusChanged => "Relay switched {status}.",
            ResponseKey::AskNickname => {
                "Current nickname: {current}\nSend the nickname others should see instead of your name."
            }
            ResponseKey::NicknameSet => "Your nickname is now {nickname}.",
            ResponseKey::NicknameCancelled => "Nickname change cancelled.",
            ResponseKey::NicknameNeedsText => "A nickname has to be plain text.",
            ResponseKey::SendPrompt => "Send the message you want {nickname} to receive anonymously.",
            ResponseKey::RecipientText => "New anonymous message:\n\n{text}",
            ResponseKey::RecipientCaption => "New anonymous message:\n\n{caption}",
            ResponseKey::Sent => "Your message was sent.",
            ResponseKey::SendCancelled => "Sending cancelled.",
            ResponseKey::ReplyPrompt => "Send your reply.",
            ResponseKey::ReplySent => "Your reply was sent.",
            ResponseKey::ReplyCancelled => "Reply cancelled.",
            ResponseKey::SeenNotice => "Your message was seen.",
            ResponseKey::SeenSent => "Seen receipt sent.",
            ResponseKey::EditPrompt => "Reply to this message with the new text.",
            ResponseKey::EditSent => "Your message was edited.",
            ResponseKey::EditCancelled => "Editing cancelled.",
            ResponseKey::EditNeedsText => "Only text can replace a message.",
            ResponseKey::Deleted => "Message deleted.",
            ResponseKey::BlockConfirmed => "{pseudonym} is blocked.",
            ResponseKey::UnblockConfirmed => "{pseudonym} is unblocked.",
            ResponseKey::AlreadyBlocked => "Already blocked.",
            ResponseKey::NotBlocked => "That pseudonym is not on your block list.",
            ResponseKey::BlockListFull => "Your block list is full.",
            ResponseKey::BlockedByUser => "You can't message this person.",
            ResponseKey::BlockList => "Your block list:",
            ResponseKey::BlockListEmpty => "Your block list is empty.",
            ResponseKey::BlockSupport => "Support can't be blocked.",
            ResponseKey::SelfAction => "You can't do that to yourself.",
            ResponseKey::BotOffSelf => "Your relay is switched off. Turn it on from your account page.",
            ResponseKey::BotOffRecipient => "This person has switched their relay off.",
            ResponseKey::Banned => "Your account has been banned.",
            ResponseKey::Unbanned => "Your account has been unbanned.",
            ResponseKey::NoActiveChat => "You're not in a conversation. Open someone's link first.",
            ResponseKey::NoUserFound => "No one uses that link.",
            ResponseKey::NothingToCancel => "There's nothing to cancel.",
            ResponseKey::UnknownMedia => "That kind of message can't be relayed.",
            ResponseKey::NotMarkable => "This message can't be marked.",
            ResponseKey::Undeliverable => "Your message could not be delivered.",
            ResponseKey::GenericFailure => "Something went wrong. Please try again.",
            ResponseKey::NewUserAnnouncement => {
                "New account {pseudonym} ({account}), nickname {nickname}."
            }
            ResponseKey::BanAnnouncement => "{pseudonym} was banned by {by}.",
            ResponseKey::UnbanAnnouncement => "{pseudonym} was unbanned.",
        }
    }
}

impl Localizer for Catalog {
    fn render(&self, key: ResponseKey, params: &[(&str, &str)]) -> String {
        fill(Self::template(key), params)
    }
}

/// Substitute `{name}` placeholders. Unknown placeholders are left as-is.
pub fn fill(template: &str, params: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in params {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}
