use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::constants::{PSEUDONYM_FRAGMENT_BYTES, PSEUDONYM_MAX_LEN, SUPPORT_PSEUDONYM};

// Account identity = the messaging platform's numeric user id
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct AccountId(pub i64);

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Platform message id. Only meaningful inside the chat it was issued in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Public stand-in for an account. Issued once, never reassigned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Pseudonym(String);

impl Pseudonym {
    /// Generate a fresh pseudonym from two independent random fragments
    /// (96 bits total).
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut head = [0u8; PSEUDONYM_FRAGMENT_BYTES];
        let mut tail = [0u8; PSEUDONYM_FRAGMENT_BYTES];
        rng.fill_bytes(&mut head);
        rng.fill_bytes(&mut tail);
        Self(format!("{}{}", hex::encode(head), hex::encode(tail)))
    }

    /// Parse user-supplied text (deep-link argument, callback payload).
    ///
    /// Returns `None` for anything that could never have been issued.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.len() > PSEUDONYM_MAX_LEN {
            return None;
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    /// The reserved pseudonym that routes to the support account.
    pub fn support() -> Self {
        Self(SUPPORT_PSEUDONYM.to_string())
    }

    pub fn is_support(&self) -> bool {
        self.0 == SUPPORT_PSEUDONYM
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Pseudonym {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which side of an exchange a check failed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Party {
    Caller,
    Counterparty,
}
