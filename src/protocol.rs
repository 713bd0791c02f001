//! Closed-group membership engine for the current ("pairwise") key-distribution scheme.
//!
//! Every operation reads the group record fresh from the store, validates its policy rules
//! before touching anything, then works through its network and storage side effects in a
//! fixed order. The orderings are crash-safety choices: a rotated key pair is persisted
//! only after its distribution message confirmed, and a group is deactivated locally only
//! after the leave notice went out.
use std::collections::BTreeSet;

use thiserror::Error;
use tracing::{debug, warn};

use crate::address::{Address, AddressError, GroupId, MemberId};
use crate::crypto::{KeyPair, PublicKey, Rng, RngError, SealedError, seal};
use crate::group::{GroupRecord, KeyScheme};
use crate::message::{ControlMessage, KeyPairWrapper};
use crate::traits::{Dispatcher, GroupStore, NotificationBridge};

/// Protocol engine for closed groups.
///
/// Holds no group state of its own; everything lives in the store and is read fresh at the
/// start of every operation. Operations on the same group rely on the store serializing
/// their read-modify-write cycles.
pub struct ClosedGroup<'a, S, D, N> {
    pub(crate) store: &'a S,
    pub(crate) dispatcher: &'a D,
    pub(crate) notifications: &'a N,
    pub(crate) rng: &'a Rng,
}

impl<'a, S, D, N> ClosedGroup<'a, S, D, N>
where
    S: GroupStore,
    D: Dispatcher,
    N: NotificationBridge,
{
    pub fn new(store: &'a S, dispatcher: &'a D, notifications: &'a N, rng: &'a Rng) -> Self {
        Self {
            store,
            dispatcher,
            notifications,
            rng,
        }
    }

    /// Creates a new group with the caller as sole initial admin.
    ///
    /// Every listed member except the caller receives an individual `New` bootstrap
    /// message; the group channel does not exist for them until they process it. The
    /// initial encryption key pair is persisted after those sends went out.
    pub fn create(
        &self,
        name: &str,
        members: &BTreeSet<MemberId>,
    ) -> Result<GroupId, GroupError<S, D>> {
        if members.is_empty() {
            warn!("refusing to create closed group without members");
            return Err(GroupError::NoInitialMembers);
        }
        let user = self.require_user()?;

        let group_identity = KeyPair::generate(self.rng)?;
        let encryption_key_pair = KeyPair::generate(self.rng)?;
        let group = *group_identity.public_key();
        let id = GroupId::from_public_key(&group);

        let mut all_members = members.clone();
        all_members.insert(user.clone());
        let admins = BTreeSet::from([user.clone()]);

        let record = GroupRecord {
            title: name.to_owned(),
            members: all_members.clone(),
            admins: admins.clone(),
            active: true,
            scheme: KeyScheme::Pairwise,
        };
        self.store
            .create_group(&id, record)
            .map_err(GroupError::Store)?;

        let message = ControlMessage::New {
            group,
            name: name.to_owned(),
            encryption_key_pair: encryption_key_pair.clone(),
            members: all_members.iter().cloned().collect(),
            admins: admins.iter().cloned().collect(),
        };
        for member in &all_members {
            if member == &user {
                continue;
            }
            self.dispatcher
                .send_awaited(&message, &Address::Member(member.clone()))
                .map_err(GroupError::Transport)?;
        }

        self.store
            .add_polled_group(&group)
            .map_err(GroupError::Store)?;
        self.store
            .add_key_pair(&group, encryption_key_pair)
            .map_err(GroupError::Store)?;
        self.notifications.subscribe(&group, &user);

        debug!(group = %group, members = all_members.len(), "created closed group");
        Ok(id)
    }

    /// Renames the group. The notice to the group address is best effort; the new title is
    /// persisted regardless of its delivery.
    pub fn rename(&self, group: &PublicKey, name: &str) -> Result<(), GroupError<S, D>> {
        let id = GroupId::from_public_key(group);
        let _record = self.require_group(&id)?;

        self.dispatcher.send(
            &ControlMessage::NameChange {
                name: name.to_owned(),
            },
            &Address::Group(id.clone()),
        );
        self.store
            .update_title(&id, name)
            .map_err(GroupError::Store)?;

        debug!(group = %group, "renamed closed group");
        Ok(())
    }

    /// Adds members to the group.
    ///
    /// Existing members learn the change from a `MembersAdded` message on the group
    /// channel; each new member additionally receives an individual `New` bootstrap
    /// carrying the current encryption key pair, without which they can not decrypt the
    /// group channel.
    pub fn add_members(
        &self,
        group: &PublicKey,
        new_members: &BTreeSet<MemberId>,
    ) -> Result<(), GroupError<S, D>> {
        let id = GroupId::from_public_key(group);
        let record = self.require_group(&id)?;
        if new_members.is_empty() {
            warn!(group = %group, "invalid closed group update: no members to add");
            return Err(GroupError::EmptyUpdate);
        }
        let encryption_key_pair = self
            .store
            .latest_key_pair(group)
            .map_err(GroupError::Store)?
            .ok_or(GroupError::NoKeyPair)?;

        let updated: BTreeSet<MemberId> = record.members.union(new_members).cloned().collect();
        self.store
            .update_members(&id, &updated)
            .map_err(GroupError::Store)?;

        self.dispatcher.send(
            &ControlMessage::MembersAdded {
                members: new_members.iter().cloned().collect(),
            },
            &Address::Group(id.clone()),
        );

        let bootstrap = ControlMessage::New {
            group: *group,
            name: record.title.clone(),
            encryption_key_pair,
            members: updated.iter().cloned().collect(),
            admins: record.admins.iter().cloned().collect(),
        };
        for member in new_members {
            self.dispatcher
                .send(&bootstrap, &Address::Member(member.clone()));
        }

        debug!(group = %group, added = new_members.len(), "added members to closed group");
        Ok(())
    }

    /// Removes members from the group.
    ///
    /// Removing an admin is only legal when the whole group is destroyed with it; a call
    /// can not remove the caller and other members at once. When the caller is an admin
    /// and members survive, a mandatory key rotation locks the removed party out of future
    /// traffic.
    pub fn remove_members(
        &self,
        group: &PublicKey,
        removed: &BTreeSet<MemberId>,
    ) -> Result<(), GroupError<S, D>> {
        let id = GroupId::from_public_key(group);
        let record = self.require_group(&id)?;
        if removed.is_empty() {
            warn!(group = %group, "invalid closed group update: no members to remove");
            return Err(GroupError::EmptyUpdate);
        }
        let user = self.require_user()?;

        let updated: BTreeSet<MemberId> = record.members.difference(removed).cloned().collect();
        if removed.contains(&user) && removed.len() > 1 {
            warn!(group = %group, "refusing to remove ourselves and others simultaneously");
            return Err(GroupError::MixedSelfRemoval);
        }
        if removed.iter().any(|member| record.admins.contains(member)) && !updated.is_empty() {
            warn!(group = %group, "refusing to remove admin from closed group");
            return Err(GroupError::AdminRemoval);
        }

        self.store
            .update_members(&id, &updated)
            .map_err(GroupError::Store)?;

        self.dispatcher.send(
            &ControlMessage::MembersRemoved {
                members: removed.iter().cloned().collect(),
            },
            &Address::Group(id.clone()),
        );

        if updated.is_empty() {
            // Last member gone, nothing left to rotate towards.
            self.deactivate_local(group, &id, &user)?;
        } else if record.is_admin(&user) {
            self.distribute_key_pair(group, &id, &updated)?;
        }

        debug!(group = %group, removed = removed.len(), "removed members from closed group");
        Ok(())
    }

    /// Leaves the group.
    ///
    /// The group is only disabled locally once the leave notice confirmed; if the send
    /// never completes the local record stays active so peers do not silently lose us.
    pub fn leave(&self, group: &PublicKey) -> Result<(), GroupError<S, D>> {
        let id = GroupId::from_public_key(group);
        let _record = self.require_group(&id)?;
        let user = self.require_user()?;

        self.dispatcher
            .send_awaited(&ControlMessage::MemberLeft, &Address::Group(id.clone()))
            .map_err(GroupError::Transport)?;

        self.store
            .remove_member(&id, &user)
            .map_err(GroupError::Store)?;
        self.deactivate_local(group, &id, &user)?;

        debug!(group = %group, "left closed group");
        Ok(())
    }

    /// Applies a target member set and name in one call: renames, adds, then removes by
    /// set difference against the current record.
    pub fn update(
        &self,
        group: &PublicKey,
        members: &BTreeSet<MemberId>,
        name: &str,
    ) -> Result<(), GroupError<S, D>> {
        let id = GroupId::from_public_key(group);
        let record = self.require_group(&id)?;

        if record.title != name {
            self.rename(group, name)?;
        }

        let added: BTreeSet<MemberId> = members.difference(&record.members).cloned().collect();
        if !added.is_empty() {
            self.add_members(group, &added)?;
        }

        let removed: BTreeSet<MemberId> = record.members.difference(members).cloned().collect();
        if !removed.is_empty() {
            self.remove_members(group, &removed)?;
        }

        Ok(())
    }

    /// Destroys the group entirely: every member (admins included) is removed and the
    /// group is torn down locally. Admin only.
    pub fn destroy(&self, group: &PublicKey) -> Result<(), GroupError<S, D>> {
        let id = GroupId::from_public_key(group);
        let record = self.require_group(&id)?;
        let user = self.require_user()?;
        if !record.is_admin(&user) {
            warn!(group = %group, "non-admin attempted to destroy closed group");
            return Err(GroupError::NotAuthorized);
        }

        self.dispatcher.send(
            &ControlMessage::MembersRemoved {
                members: record.members.iter().cloned().collect(),
            },
            &Address::Group(id.clone()),
        );

        self.store
            .update_members(&id, &BTreeSet::new())
            .map_err(GroupError::Store)?;
        self.deactivate_local(group, &id, &user)?;

        debug!(group = %group, "destroyed closed group");
        Ok(())
    }

    /// Generates and distributes a fresh encryption key pair to all current members.
    /// Admin only; checked before any network or storage side effect.
    pub fn rotate_encryption_key_pair(&self, group: &PublicKey) -> Result<(), GroupError<S, D>> {
        let id = GroupId::from_public_key(group);
        let record = self.require_group(&id)?;
        let user = self.require_user()?;
        if !record.is_admin(&user) {
            warn!(group = %group, "non-admin attempted to distribute new encryption key pair");
            return Err(GroupError::NotAuthorized);
        }

        self.distribute_key_pair(group, &id, &record.members)
    }

    /// Generates one fresh key pair, seals it individually for every target member and
    /// sends the wrappers in a single group-addressed message. The key pair is persisted
    /// only after that send confirmed; a failed send must not leave us holding key
    /// material the group is not using.
    fn distribute_key_pair(
        &self,
        group: &PublicKey,
        id: &GroupId,
        targets: &BTreeSet<MemberId>,
    ) -> Result<(), GroupError<S, D>> {
        let key_pair = KeyPair::generate(self.rng)?;
        let plaintext = key_pair.to_bytes();

        let mut wrappers = Vec::with_capacity(targets.len());
        for member in targets {
            let ciphertext = seal(&plaintext, &member.public_key()?, self.rng)?;
            wrappers.push(KeyPairWrapper {
                recipient: member.clone(),
                ciphertext,
            });
        }

        self.dispatcher
            .send_awaited(
                &ControlMessage::EncryptionKeyPair { wrappers },
                &Address::Group(id.clone()),
            )
            .map_err(GroupError::Transport)?;

        self.store
            .add_key_pair(group, key_pair)
            .map_err(GroupError::Store)?;

        debug!(group = %group, recipients = targets.len(), "rotated group encryption key pair");
        Ok(())
    }

    /// Clears all pollable key state of a group: it keeps its record but is inactive, has
    /// no live key material and is no longer polled or push-subscribed.
    fn deactivate_local(
        &self,
        group: &PublicKey,
        id: &GroupId,
        user: &MemberId,
    ) -> Result<(), GroupError<S, D>> {
        self.store
            .remove_key_pairs(group)
            .map_err(GroupError::Store)?;
        self.store
            .set_active(id, false)
            .map_err(GroupError::Store)?;
        self.store
            .remove_polled_group(group)
            .map_err(GroupError::Store)?;
        self.notifications.unsubscribe(group, user);
        Ok(())
    }

    pub(crate) fn require_user(&self) -> Result<MemberId, GroupError<S, D>> {
        self.store
            .user_public_key()
            .map_err(GroupError::Store)?
            .ok_or(GroupError::NoIdentity)
    }

    /// Looks up the group record and verifies it runs the pairwise scheme.
    fn require_group(&self, id: &GroupId) -> Result<GroupRecord, GroupError<S, D>> {
        let record = self
            .store
            .group(id)
            .map_err(GroupError::Store)?
            .ok_or(GroupError::NoGroup)?;
        if record.scheme != KeyScheme::Pairwise {
            return Err(GroupError::SchemeMismatch);
        }
        Ok(record)
    }
}

#[derive(Debug, Error)]
pub enum GroupError<S, D>
where
    S: GroupStore,
    D: Dispatcher,
{
    #[error("no closed group found for the given id")]
    NoGroup,

    #[error("a closed group needs at least one initial member")]
    NoInitialMembers,

    #[error("closed group update does not name any members")]
    EmptyUpdate,

    #[error("admins can not be removed unless the group is destroyed entirely")]
    AdminRemoval,

    #[error("can not remove ourselves and other members in the same update")]
    MixedSelfRemoval,

    #[error("no encryption key pair found for this closed group")]
    NoKeyPair,

    #[error("no private key stored for this legacy closed group")]
    NoPrivateKey,

    #[error("operation requires closed group admin rights")]
    NotAuthorized,

    #[error("no local user identity configured")]
    NoIdentity,

    #[error("closed group uses a different key-distribution scheme")]
    SchemeMismatch,

    #[error(transparent)]
    Store(S::Error),

    #[error("control message could not be delivered: {0}")]
    Transport(D::Error),

    #[error(transparent)]
    Rng(#[from] RngError),

    #[error(transparent)]
    Sealed(#[from] SealedError),

    #[error(transparent)]
    Address(#[from] AddressError),
}
