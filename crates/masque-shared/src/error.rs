use thiserror::Error;

use crate::locale::ResponseKey;
use crate::types::Party;

/// Outcome of a relay command that did not go through.
///
/// Everything except `Store` and `Transport` is an expected outcome: the
/// caller is told why and nothing else happens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("recipient not found")]
    NotFound,

    #[error("delivery blocked by a block list entry")]
    Blocked,

    #[error("action targets the caller's own account")]
    SelfAction,

    #[error("action targets a reserved pseudonym")]
    Reserved,

    #[error("relay disabled on the {0:?} side")]
    BotDisabled(Party),

    #[error("recipient unreachable")]
    Unreachable,

    #[error("invalid state: {0:?}")]
    InvalidState(StateIssue),

    #[error("nickname rejected: {0}")]
    InvalidNickname(String),

    #[error("account is banned")]
    Banned,

    #[error("store failure: {0}")]
    Store(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

/// Why a command did not match the account's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateIssue {
    NoActiveChat,
    NothingToCancel,
    AlreadyBlocked,
    NotBlocked,
    BlockListFull,
    UnknownMedia,
    NotMarkable,
    NicknameNeedsText,
    EditNeedsText,
}

impl RelayError {
    /// `false` for failures that abandon the operation.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, RelayError::Store(_) | RelayError::Transport(_))
    }

    /// The single explanatory message shown to the initiator.
    pub fn response_key(&self) -> ResponseKey {
        match self {
            RelayError::NotFound => ResponseKey::NoUserFound,
            RelayError::Blocked => ResponseKey::BlockedByUser,
            RelayError::SelfAction => ResponseKey::SelfAction,
            RelayError::Reserved => ResponseKey::BlockSupport,
            RelayError::BotDisabled(Party::Caller) => ResponseKey::BotOffSelf,
            RelayError::BotDisabled(Party::Counterparty) => ResponseKey::BotOffRecipient,
            RelayError::Unreachable => ResponseKey::Undeliverable,
            RelayError::InvalidState(issue) => issue.response_key(),
            // The validator's own message is shown instead.
            RelayError::InvalidNickname(_) => ResponseKey::GenericFailure,
            RelayError::Banned => ResponseKey::Banned,
            RelayError::Store(_) | RelayError::Transport(_) => ResponseKey::GenericFailure,
        }
    }
}

impl StateIssue {
    pub fn response_key(self) -> ResponseKey {
        match self {
            StateIssue::NoActiveChat => ResponseKey::NoActiveChat,
            StateIssue::NothingToCancel => ResponseKey::NothingToCancel,
            StateIssue::AlreadyBlocked => ResponseKey::AlreadyBlocked,
            StateIssue::NotBlocked => ResponseKey::NotBlocked,
            StateIssue::BlockListFull => ResponseKey::BlockListFull,
            StateIssue::UnknownMedia => ResponseKey::UnknownMedia,
            StateIssue::NotMarkable => ResponseKey::NotMarkable,
            StateIssue::NicknameNeedsText => ResponseKey::NicknameNeedsText,
            StateIssue::EditNeedsText => ResponseKey::EditNeedsText,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_infrastructure_failures_are_fatal() {
        assert!(RelayError::NotFound.is_recoverable());
        assert!(RelayError::Unreachable.is_recoverable());
        assert!(RelayError::Banned.is_recoverable());
        assert!(!RelayError::Store("disk".into()).is_recoverable());
        assert!(!RelayError::Transport("timeout".into()).is_recoverable());
    }

    #[test]
    fn test_not_found_and_blocked_are_distinct_messages() {
        assert_ne!(
            RelayError::NotFound.response_key(),
            RelayError::Blocked.response_key()
        );
        assert_ne!(
            RelayError::BotDisabled(Party::Caller).response_key(),
            RelayError::BotDisabled(Party::Counterparty).response_key()
        );
    }
}
