use std::error::Error;

use std::collections::BTreeSet;

use crate::address::{GroupId, MemberId};
use crate::crypto::{KeyPair, PublicKey, SecretKey};
use crate::group::GroupRecord;
use crate::ratchet::{Generation, RatchetChain};

/// Durable storage for group records and key material.
///
/// Implementations must serialize operations touching the same group so a concurrent
/// read-modify-write of one member set can not interleave with another; operations on
/// different groups are independent. The engine holds no state of its own and reads fresh
/// through this interface at the start of every operation.
pub trait GroupStore {
    type Error: Error;

    /// Public key of the local user, if an identity has been set up.
    fn user_public_key(&self) -> Result<Option<MemberId>, Self::Error>;

    fn group(&self, id: &GroupId) -> Result<Option<GroupRecord>, Self::Error>;

    fn create_group(&self, id: &GroupId, record: GroupRecord) -> Result<(), Self::Error>;

    fn update_title(&self, id: &GroupId, title: &str) -> Result<(), Self::Error>;

    fn update_members(&self, id: &GroupId, members: &BTreeSet<MemberId>)
    -> Result<(), Self::Error>;

    fn remove_member(&self, id: &GroupId, member: &MemberId) -> Result<(), Self::Error>;

    fn set_active(&self, id: &GroupId, active: bool) -> Result<(), Self::Error>;

    /// Registers the group for traffic polling.
    fn add_polled_group(&self, group: &PublicKey) -> Result<(), Self::Error>;

    fn remove_polled_group(&self, group: &PublicKey) -> Result<(), Self::Error>;

    /// Latest ("current") encryption key pair of a pairwise-scheme group.
    fn latest_key_pair(&self, group: &PublicKey) -> Result<Option<KeyPair>, Self::Error>;

    /// Appends a key pair to the group's history, making it the current one. Superseded
    /// key pairs stay retrievable for decrypting late-arriving traffic.
    fn add_key_pair(&self, group: &PublicKey, key_pair: KeyPair) -> Result<(), Self::Error>;

    /// Full key-pair lineage of a group, oldest first.
    fn key_pair_history(&self, group: &PublicKey) -> Result<Vec<KeyPair>, Self::Error>;

    fn remove_key_pairs(&self, group: &PublicKey) -> Result<(), Self::Error>;

    /// Stored private key of a legacy ratchet-scheme group.
    fn group_private_key(&self, group: &PublicKey) -> Result<Option<SecretKey>, Self::Error>;

    fn remove_group_private_key(&self, group: &PublicKey) -> Result<(), Self::Error>;

    /// All ratchet chains of a group in the given collection, keyed by their owner.
    fn ratchets(
        &self,
        group: &PublicKey,
        generation: Generation,
    ) -> Result<Vec<(MemberId, RatchetChain)>, Self::Error>;

    fn set_ratchet(
        &self,
        group: &PublicKey,
        sender: &MemberId,
        ratchet: RatchetChain,
        generation: Generation,
    ) -> Result<(), Self::Error>;

    fn remove_all_ratchets(
        &self,
        group: &PublicKey,
        generation: Generation,
    ) -> Result<(), Self::Error>;

    /// Moves every current ratchet chain of the group into the old collection as one set.
    ///
    /// An observer must never see a mix of current and old chains from the same transition.
    /// The default copies then clears, which is sufficient for stores serializing all
    /// operations on one group; stores with finer-grained locking must override this with a
    /// single transaction.
    fn retire_ratchets(&self, group: &PublicKey) -> Result<(), Self::Error> {
        for (sender, ratchet) in self.ratchets(group, Generation::Current)? {
            self.set_ratchet(group, &sender, ratchet, Generation::Old)?;
        }
        self.remove_all_ratchets(group, Generation::Current)
    }
}
