//! In-memory doubles of the storage, transport and notification interfaces.
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::address::{Address, GroupId, MemberId};
use crate::crypto::{KeyPair, PublicKey, SecretKey};
use crate::group::GroupRecord;
use crate::message::ControlMessage;
use crate::ratchet::{Generation, RatchetChain};
use crate::traits::{Dispatcher, GroupStore, NotificationBridge};

/// In-memory group store. One coarse lock serializes all operations, which also covers the
/// read-modify-write requirements of the trait.
#[derive(Debug)]
pub struct MemoryStore {
    user: MemberId,
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    groups: HashMap<GroupId, GroupRecord>,
    polled: Vec<PublicKey>,
    key_pairs: HashMap<PublicKey, Vec<KeyPair>>,
    private_keys: HashMap<PublicKey, SecretKey>,
    ratchets: HashMap<(PublicKey, Generation), BTreeMap<MemberId, RatchetChain>>,
}

impl MemoryStore {
    pub fn new(user: MemberId) -> Self {
        Self {
            user,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn polled_groups(&self) -> Vec<PublicKey> {
        self.inner.lock().expect("poisoned lock").polled.clone()
    }

    pub fn set_group_private_key(&self, group: &PublicKey, private_key: SecretKey) {
        self.inner
            .lock()
            .expect("poisoned lock")
            .private_keys
            .insert(*group, private_key);
    }

    fn inner(&self) -> Result<std::sync::MutexGuard<'_, Inner>, MemoryStoreError> {
        self.inner.lock().map_err(|_| MemoryStoreError::LockPoisoned)
    }
}

impl GroupStore for MemoryStore {
    type Error = MemoryStoreError;

    fn user_public_key(&self) -> Result<Option<MemberId>, Self::Error> {
        Ok(Some(self.user.clone()))
    }

    fn group(&self, id: &GroupId) -> Result<Option<GroupRecord>, Self::Error> {
        Ok(self.inner()?.groups.get(id).cloned())
    }

    fn create_group(&self, id: &GroupId, record: GroupRecord) -> Result<(), Self::Error> {
        self.inner()?.groups.insert(id.clone(), record);
        Ok(())
    }

    fn update_title(&self, id: &GroupId, title: &str) -> Result<(), Self::Error> {
        if let Some(record) = self.inner()?.groups.get_mut(id) {
            record.title = title.to_owned();
        }
        Ok(())
    }

    fn update_members(
        &self,
        id: &GroupId,
        members: &BTreeSet<MemberId>,
    ) -> Result<(), Self::Error> {
        if let Some(record) = self.inner()?.groups.get_mut(id) {
            record.members = members.clone();
        }
        Ok(())
    }

    fn remove_member(&self, id: &GroupId, member: &MemberId) -> Result<(), Self::Error> {
        if let Some(record) = self.inner()?.groups.get_mut(id) {
            record.members.remove(member);
        }
        Ok(())
    }

    fn set_active(&self, id: &GroupId, active: bool) -> Result<(), Self::Error> {
        if let Some(record) = self.inner()?.groups.get_mut(id) {
            record.active = active;
        }
        Ok(())
    }

    fn add_polled_group(&self, group: &PublicKey) -> Result<(), Self::Error> {
        let mut inner = self.inner()?;
        if !inner.polled.contains(group) {
            inner.polled.push(*group);
        }
        Ok(())
    }

    fn remove_polled_group(&self, group: &PublicKey) -> Result<(), Self::Error> {
        self.inner()?.polled.retain(|polled| polled != group);
        Ok(())
    }

    fn latest_key_pair(&self, group: &PublicKey) -> Result<Option<KeyPair>, Self::Error> {
        Ok(self
            .inner()?
            .key_pairs
            .get(group)
            .and_then(|history| history.last().cloned()))
    }

    fn add_key_pair(&self, group: &PublicKey, key_pair: KeyPair) -> Result<(), Self::Error> {
        self.inner()?
            .key_pairs
            .entry(*group)
            .or_default()
            .push(key_pair);
        Ok(())
    }

    fn key_pair_history(&self, group: &PublicKey) -> Result<Vec<KeyPair>, Self::Error> {
        Ok(self.inner()?.key_pairs.get(group).cloned().unwrap_or_default())
    }

    fn remove_key_pairs(&self, group: &PublicKey) -> Result<(), Self::Error> {
        self.inner()?.key_pairs.remove(group);
        Ok(())
    }

    fn group_private_key(&self, group: &PublicKey) -> Result<Option<SecretKey>, Self::Error> {
        Ok(self.inner()?.private_keys.get(group).cloned())
    }

    fn remove_group_private_key(&self, group: &PublicKey) -> Result<(), Self::Error> {
        self.inner()?.private_keys.remove(group);
        Ok(())
    }

    fn ratchets(
        &self,
        group: &PublicKey,
        generation: Generation,
    ) -> Result<Vec<(MemberId, RatchetChain)>, Self::Error> {
        Ok(self
            .inner()?
            .ratchets
            .get(&(*group, generation))
            .map(|chains| {
                chains
                    .iter()
                    .map(|(sender, ratchet)| (sender.clone(), ratchet.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn set_ratchet(
        &self,
        group: &PublicKey,
        sender: &MemberId,
        ratchet: RatchetChain,
        generation: Generation,
    ) -> Result<(), Self::Error> {
        self.inner()?
            .ratchets
            .entry((*group, generation))
            .or_default()
            .insert(sender.clone(), ratchet);
        Ok(())
    }

    fn remove_all_ratchets(
        &self,
        group: &PublicKey,
        generation: Generation,
    ) -> Result<(), Self::Error> {
        self.inner()?.ratchets.remove(&(*group, generation));
        Ok(())
    }

    // Moving the whole generation under the one lock, instead of the default copy-then-clear.
    fn retire_ratchets(&self, group: &PublicKey) -> Result<(), Self::Error> {
        let mut inner = self.inner()?;
        if let Some(current) = inner.ratchets.remove(&(*group, Generation::Current)) {
            inner
                .ratchets
                .entry((*group, Generation::Old))
                .or_default()
                .extend(current);
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum MemoryStoreError {
    #[error("memory store lock poisoned")]
    LockPoisoned,
}

/// One recorded outgoing message.
#[derive(Clone, Debug)]
pub struct SentMessage {
    pub message: ControlMessage,
    pub address: Address,
    pub awaited: bool,
}

/// Dispatcher double recording every delivered message in order. Awaited sends can be made
/// to fail; failed sends are not recorded.
#[derive(Debug, Default)]
pub struct MessageLog {
    sent: Mutex<Vec<SentMessage>>,
    fail_awaited: AtomicBool,
}

impl MessageLog {
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().expect("poisoned lock").clone()
    }

    pub fn clear(&self) {
        self.sent.lock().expect("poisoned lock").clear();
    }

    pub fn fail_awaited_sends(&self, fail: bool) {
        self.fail_awaited.store(fail, Ordering::Relaxed);
    }

    fn record(&self, message: &ControlMessage, address: &Address, awaited: bool) {
        self.sent.lock().expect("poisoned lock").push(SentMessage {
            message: message.clone(),
            address: address.clone(),
            awaited,
        });
    }
}

impl Dispatcher for MessageLog {
    type Error = SendFailed;

    fn send(&self, message: &ControlMessage, address: &Address) {
        self.record(message, address, false);
    }

    fn send_awaited(
        &self,
        message: &ControlMessage,
        address: &Address,
    ) -> Result<(), Self::Error> {
        if self.fail_awaited.load(Ordering::Relaxed) {
            return Err(SendFailed);
        }
        self.record(message, address, true);
        Ok(())
    }
}

#[derive(Debug, Error)]
#[error("send failed")]
pub struct SendFailed;

/// Subscription event observed by the [`TestBridge`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PushEvent {
    Subscribed(PublicKey, MemberId),
    Unsubscribed(PublicKey, MemberId),
}

/// Notification bridge double recording subscription changes in order.
#[derive(Debug, Default)]
pub struct TestBridge {
    events: Mutex<Vec<PushEvent>>,
}

impl TestBridge {
    pub fn events(&self) -> Vec<PushEvent> {
        self.events.lock().expect("poisoned lock").clone()
    }
}

impl NotificationBridge for TestBridge {
    fn subscribe(&self, group: &PublicKey, member: &MemberId) {
        self.events
            .lock()
            .expect("poisoned lock")
            .push(PushEvent::Subscribed(*group, member.clone()));
    }

    fn unsubscribe(&self, group: &PublicKey, member: &MemberId) {
        self.events
            .lock()
            .expect("poisoned lock")
            .push(PushEvent::Unsubscribed(*group, member.clone()));
    }
}
