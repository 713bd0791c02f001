//! Membership and key-distribution engine for closed groups.
//!
//! A closed group is a private, invite-only conversation whose state (title, member set,
//! admin set) is agreed upon through control messages rather than held by any server.
//! This crate implements the sending half of that protocol: creating groups, changing
//! membership, leaving and tearing down, plus the key management each of those implies.
//!
//! Two key-distribution schemes exist. Current groups share one encryption key pair which
//! admins rotate whenever a member is removed; superseded key pairs are retained so
//! late-arriving traffic stays readable. Older ("legacy") groups instead run one symmetric
//! ratchet chain per sender and regenerate all chains when the group shrinks. A group's
//! scheme is fixed at creation and both schemes are driven through the same
//! [`ClosedGroup`] engine.
//!
//! The engine itself is stateless: durable state lives behind the [`traits::GroupStore`]
//! interface, outgoing messages go through a [`traits::Dispatcher`] with two delivery
//! disciplines, and push-notification subscriptions through a
//! [`traits::NotificationBridge`]. Operations order their side effects so that a crash at
//! any point leaves the group in a recoverable state, for example a rotated key pair is
//! only persisted once its distribution message confirmed.
mod address;
mod crypto;
mod group;
mod legacy;
mod message;
mod protocol;
mod ratchet;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
pub mod traits;

pub use address::{Address, AddressError, GroupId, MemberId};
pub use crypto::{
    KeyPair, PUBLIC_KEY_SIZE, PublicKey, Rng, RngError, SECRET_KEY_SIZE, SealedError, Secret,
    SecretKey, seal, unseal,
};
pub use group::{GroupRecord, KeyScheme};
pub use message::{ControlMessage, KeyPairWrapper};
pub use protocol::{ClosedGroup, GroupError};
pub use ratchet::{CHAIN_KEY_SIZE, Generation, RatchetChain, RatchetError, SenderKey};
