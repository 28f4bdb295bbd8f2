//! # masque-shared
//!
//! Types shared by every Masque crate: account and message identifiers,
//! pseudonyms, the per-account [`Mode`], relayed payloads and action sets,
//! response keys for user-facing text, and the relay error taxonomy.

pub mod constants;
pub mod error;
pub mod locale;
pub mod mark;
pub mod mode;
pub mod protocol;
pub mod types;

pub use error::{RelayError, StateIssue};
pub use locale::{Catalog, Localizer, ResponseKey};
pub use mode::{EditBinding, Mode, ReplyBinding};
pub use protocol::{Actions, Anchor, Command, Envelope, MediaKind, Payload, TextField};
pub use types::{AccountId, MessageId, Party, Pseudonym};
