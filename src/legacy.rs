//! Legacy ratchet-scheme operations.
//!
//! Older groups distribute per-sender ratchet chains instead of a shared encryption key
//! pair. Membership changes go through one combinator which diffs the target member set
//! against the current record and picks the shrink, grow or info-only path. The shrink
//! path retires the whole current ratchet generation: the info fan-out to the existing
//! members happens first over individually established channels, only then are the current
//! chains moved aside and cleared, so no message becomes undeliverable mid-transition.
use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::address::{Address, GroupId, MemberId};
use crate::crypto::PublicKey;
use crate::group::{GroupRecord, KeyScheme};
use crate::message::ControlMessage;
use crate::protocol::{ClosedGroup, GroupError};
use crate::ratchet::{Generation, RatchetChain, SenderKey};
use crate::traits::{Dispatcher, GroupStore, NotificationBridge};

impl<'a, S, D, N> ClosedGroup<'a, S, D, N>
where
    S: GroupStore,
    D: Dispatcher,
    N: NotificationBridge,
{
    /// Applies a target member set and name to a legacy ratchet-scheme group.
    pub fn legacy_update(
        &self,
        group: &PublicKey,
        members: &BTreeSet<MemberId>,
        name: &str,
    ) -> Result<(), GroupError<S, D>> {
        let id = GroupId::from_public_key(group);
        let record = self.require_legacy_group(&id)?;
        let user = self.require_user()?;

        let group_private_key = self
            .store
            .group_private_key(group)
            .map_err(GroupError::Store)?
            .ok_or(GroupError::NoPrivateKey)?;

        let old_members = record.members.clone();
        let added: BTreeSet<MemberId> = members.difference(&old_members).cloned().collect();
        let removed: BTreeSet<MemberId> = old_members.difference(members).cloned().collect();
        let leaving = removed.contains(&user);

        let members_list: Vec<MemberId> = members.iter().cloned().collect();
        let admins_list: Vec<MemberId> = record.admins.iter().cloned().collect();

        if !removed.is_empty() {
            if leaving && removed.len() != 1 {
                warn!(group = %group, "refusing to remove ourselves and others simultaneously");
                return Err(GroupError::MixedSelfRemoval);
            }
            if removed
                .iter()
                .any(|member| member != &user && record.admins.contains(member))
                && !members.is_empty()
            {
                warn!(group = %group, "refusing to remove admin from closed group");
                return Err(GroupError::AdminRemoval);
            }

            // Tell all existing members over their individual channels, without any sender
            // keys: everyone regenerates their own ratchet. Individual channels survive
            // the retirement of the group's current ratchet generation.
            let info = ControlMessage::Info {
                group: *group,
                name: name.to_owned(),
                sender_keys: Vec::new(),
                members: members_list.clone(),
                admins: admins_list.clone(),
            };
            for member in &old_members {
                if member == &user {
                    continue;
                }
                self.dispatcher
                    .send_awaited(&info, &Address::Member(member.clone()))
                    .map_err(GroupError::Transport)?;
            }

            // Only after the fan-out went out: retire the current ratchet generation as
            // one set, then start over.
            self.store
                .retire_ratchets(group)
                .map_err(GroupError::Store)?;

            if leaving {
                self.store
                    .remove_group_private_key(group)
                    .map_err(GroupError::Store)?;
                self.store
                    .set_active(&id, false)
                    .map_err(GroupError::Store)?;
                self.store
                    .remove_member(&id, &user)
                    .map_err(GroupError::Store)?;
                self.store
                    .remove_polled_group(group)
                    .map_err(GroupError::Store)?;
                self.notifications.unsubscribe(group, &user);
            } else {
                // Bootstrap any new members; sender keys stay empty as all chains are
                // being regenerated right now.
                let bootstrap = ControlMessage::LegacyNew {
                    group: *group,
                    name: name.to_owned(),
                    group_private_key: group_private_key.clone(),
                    sender_keys: Vec::new(),
                    members: members_list.clone(),
                    admins: admins_list.clone(),
                };
                for member in &added {
                    self.dispatcher
                        .send(&bootstrap, &Address::Member(member.clone()));
                }

                // Our fresh ratchet goes out to all surviving members.
                let ratchet = RatchetChain::generate(self.rng)?;
                self.store
                    .set_ratchet(group, &user, ratchet.clone(), Generation::Current)
                    .map_err(GroupError::Store)?;
                let sender_key = ControlMessage::SenderKey {
                    group: *group,
                    sender_key: ratchet.sender_key(&user),
                };
                for member in members {
                    if member == &user {
                        continue;
                    }
                    self.dispatcher
                        .send(&sender_key, &Address::Member(member.clone()));
                }
            }
        } else if !added.is_empty() {
            // Generate a chain for every new member and announce the new heads to the
            // existing group.
            let mut new_sender_keys = Vec::with_capacity(added.len());
            for member in &added {
                let ratchet = RatchetChain::generate(self.rng)?;
                self.store
                    .set_ratchet(group, member, ratchet.clone(), Generation::Current)
                    .map_err(GroupError::Store)?;
                new_sender_keys.push(ratchet.sender_key(member));
            }

            self.dispatcher.send(
                &ControlMessage::Info {
                    group: *group,
                    name: name.to_owned(),
                    sender_keys: new_sender_keys,
                    members: members_list.clone(),
                    admins: admins_list.clone(),
                },
                &Address::Group(id.clone()),
            );

            // New members get the full historical sender-key set plus the group private
            // key over individually established channels.
            let all_sender_keys = self.current_sender_keys(group)?;
            let bootstrap = ControlMessage::LegacyNew {
                group: *group,
                name: name.to_owned(),
                group_private_key: group_private_key.clone(),
                sender_keys: all_sender_keys,
                members: members_list.clone(),
                admins: admins_list.clone(),
            };
            for member in &added {
                self.dispatcher
                    .send(&bootstrap, &Address::Member(member.clone()));
            }
        } else {
            // Membership unchanged: broadcast the current info and sender keys.
            self.dispatcher.send(
                &ControlMessage::Info {
                    group: *group,
                    name: name.to_owned(),
                    sender_keys: self.current_sender_keys(group)?,
                    members: members_list.clone(),
                    admins: admins_list.clone(),
                },
                &Address::Group(id.clone()),
            );
        }

        self.store
            .update_title(&id, name)
            .map_err(GroupError::Store)?;
        if !leaving {
            self.store
                .update_members(&id, members)
                .map_err(GroupError::Store)?;
        }

        debug!(group = %group, added = added.len(), removed = removed.len(), "updated legacy closed group");
        Ok(())
    }

    /// Leaves a legacy group: a plain update with ourselves taken out of the member set.
    pub fn legacy_leave(&self, group: &PublicKey) -> Result<(), GroupError<S, D>> {
        let id = GroupId::from_public_key(group);
        let record = self.require_legacy_group(&id)?;
        let user = self.require_user()?;

        let mut members = record.members.clone();
        members.remove(&user);
        self.legacy_update(group, &members, &record.title)
    }

    /// Public heads of all current ratchet chains of a group.
    fn current_sender_keys(&self, group: &PublicKey) -> Result<Vec<SenderKey>, GroupError<S, D>> {
        let ratchets = self
            .store
            .ratchets(group, Generation::Current)
            .map_err(GroupError::Store)?;
        Ok(ratchets
            .into_iter()
            .map(|(sender, ratchet)| ratchet.sender_key(&sender))
            .collect())
    }

    fn require_legacy_group(&self, id: &GroupId) -> Result<GroupRecord, GroupError<S, D>> {
        let record = self
            .store
            .group(id)
            .map_err(GroupError::Store)?
            .ok_or(GroupError::NoGroup)?;
        if record.scheme != KeyScheme::Ratchet {
            return Err(GroupError::SchemeMismatch);
        }
        Ok(record)
    }
}
