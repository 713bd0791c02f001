use crate::address::MemberId;
use crate::crypto::PublicKey;

/// Push-notification subscription bridge.
///
/// Invoked as a fire-and-forget side effect on group creation and on confirmed leave; not
/// part of the protocol's correctness.
pub trait NotificationBridge {
    fn subscribe(&self, group: &PublicKey, member: &MemberId);

    fn unsubscribe(&self, group: &PublicKey, member: &MemberId);
}
