//! Control messages exchanged to coordinate closed-group state.
//!
//! One wire enum covers both key-distribution schemes. `New`, `NameChange`,
//! `MembersAdded`, `MembersRemoved`, `MemberLeft` and `EncryptionKeyPair` belong to the
//! pairwise scheme; `Info`, `LegacyNew` and `SenderKey` to the legacy ratchet scheme.
use serde::{Deserialize, Serialize};

use crate::address::MemberId;
use crate::crypto::{KeyPair, PublicKey, SecretKey};
use crate::ratchet::SenderKey;

/// A rotated encryption key pair, sealed towards one member's identity key.
///
/// Only the named recipient can open the ciphertext; everybody else in the group sees an
/// opaque blob.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPairWrapper {
    pub recipient: MemberId,
    #[serde(with = "serde_bytes")]
    pub ciphertext: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlMessage {
    /// Bootstrap message for a member entering a pairwise-scheme group, sent over an
    /// individually established channel. Carries everything needed to participate,
    /// including the current encryption key pair.
    New {
        group: PublicKey,
        name: String,
        encryption_key_pair: KeyPair,
        members: Vec<MemberId>,
        admins: Vec<MemberId>,
    },

    /// Group was renamed.
    NameChange { name: String },

    /// Members joined; existing members learn the new member set from this.
    MembersAdded { members: Vec<MemberId> },

    /// Members were removed (or the group was destroyed when this names everyone).
    MembersRemoved { members: Vec<MemberId> },

    /// The sender left the group.
    MemberLeft,

    /// A fresh encryption key pair, sealed per remaining member.
    EncryptionKeyPair { wrappers: Vec<KeyPairWrapper> },

    /// Legacy scheme: updated group info, optionally carrying new members' sender keys.
    Info {
        group: PublicKey,
        name: String,
        sender_keys: Vec<SenderKey>,
        members: Vec<MemberId>,
        admins: Vec<MemberId>,
    },

    /// Legacy scheme: bootstrap message for a new member, carrying the full historical
    /// sender-key set plus the group private key.
    LegacyNew {
        group: PublicKey,
        name: String,
        group_private_key: SecretKey,
        sender_keys: Vec<SenderKey>,
        members: Vec<MemberId>,
        admins: Vec<MemberId>,
    },

    /// Legacy scheme: a member's regenerated ratchet head.
    SenderKey {
        group: PublicKey,
        sender_key: SenderKey,
    },
}

impl ControlMessage {
    /// Short label used in log output.
    pub fn kind(&self) -> &'static str {
        match self {
            ControlMessage::New { .. } => "new",
            ControlMessage::NameChange { .. } => "name-change",
            ControlMessage::MembersAdded { .. } => "members-added",
            ControlMessage::MembersRemoved { .. } => "members-removed",
            ControlMessage::MemberLeft => "member-left",
            ControlMessage::EncryptionKeyPair { .. } => "encryption-key-pair",
            ControlMessage::Info { .. } => "info",
            ControlMessage::LegacyNew { .. } => "legacy-new",
            ControlMessage::SenderKey { .. } => "sender-key",
        }
    }
}
