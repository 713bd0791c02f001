//! Group records as agreed-upon local state.
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::address::MemberId;

/// Key-distribution scheme of a group, fixed at creation and never changed in place.
///
/// The engine never mixes schemes within one group: `Pairwise` groups rotate a shared
/// encryption key pair, `Ratchet` groups run the older per-sender chain scheme.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyScheme {
    Pairwise,
    Ratchet,
}

/// Currently agreed-upon state of a closed group.
///
/// Owned by the store; the engine reads a full copy at the start of every operation and
/// writes replacements through the store's update methods. While a group is active the
/// admin set is a subset of the member set. An inactive group holds no live key material
/// and is not polled for traffic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub title: String,
    pub members: BTreeSet<MemberId>,
    pub admins: BTreeSet<MemberId>,
    pub active: bool,
    pub scheme: KeyScheme,
}

impl GroupRecord {
    pub fn is_admin(&self, member: &MemberId) -> bool {
        self.admins.contains(member)
    }
}
