//! # masque-relay
//!
//! Conversation routing for the masque anonymous relay.
//!
//! Resolves pseudonyms to accounts, tracks each account's interaction
//! [`Mode`](masque_shared::Mode), checks blocks and availability before
//! every delivery and hands messages to an external [`Transport`]. All state
//! lives in a [`masque_store::Database`]; commands from one account are
//! serialized through [`AccountLocks`].

pub mod binding;
pub mod delivery;
pub mod guard;
pub mod locks;
pub mod moderation;
pub mod receipts;
pub mod relay;
pub mod resolver;
pub mod throttle;
pub mod transport;
pub mod validation;

mod account;
mod actions;
mod machine;

#[cfg(test)]
mod testing;

pub use binding::Bindings;
pub use delivery::{Delivery, DeliveryRequest, ReplaceRequest};
pub use guard::BlockGuard;
pub use locks::AccountLocks;
pub use moderation::{Moderation, StoreModeration};
pub use receipts::Receipts;
pub use relay::{BanOutcome, Relay, RelaySettings};
pub use resolver::PseudonymResolver;
pub use throttle::Throttle;
pub use transport::{EditContent, Outgoing, Transport, TransportError};
pub use validation::{DefaultNicknamePolicy, NicknameValidator};
