//! Member and group identifiers and wire addressing.
//!
//! Members are identified by the hex encoding of their public identity key. Groups are
//! identified by their own public key; for addressing, that key is run through a stable
//! double encoding which yields the "group address" all group-directed control messages are
//! sent to.
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::{PUBLIC_KEY_SIZE, PublicKey};

/// Prefix applied on every encoding round of a group address.
const GROUP_ADDRESS_PREFIX: &str = "closed-group!";

/// Opaque member identity: the lowercase hex encoding of a 32-byte public key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemberId(String);

impl MemberId {
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        Self(public_key.to_hex())
    }

    pub fn from_hex(hex_encoded: &str) -> Result<Self, AddressError> {
        let id = Self(hex_encoded.to_lowercase());
        // Reject anything which does not decode back to a key.
        id.public_key()?;
        Ok(id)
    }

    /// Decodes the identity back into its public key, for example to seal key material
    /// towards this member.
    pub fn public_key(&self) -> Result<PublicKey, AddressError> {
        let bytes = hex::decode(&self.0).map_err(|_| AddressError::InvalidMemberId)?;
        let bytes: [u8; PUBLIC_KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidMemberId)?;
        Ok(PublicKey::from_bytes(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable group identifier derived from the group's public key by double encoding.
///
/// The derivation never changes for the lifetime of a group, making the address usable as a
/// storage key and as the wire address for group-directed control messages.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(String);

impl GroupId {
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let inner = encode(public_key.to_hex().as_bytes());
        Self(encode(inner.as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn encode(bytes: &[u8]) -> String {
    format!("{GROUP_ADDRESS_PREFIX}{}", hex::encode(bytes))
}

/// Destination of a control message: either the group's collective address or a single
/// member reached over an individually established channel.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Address {
    Group(GroupId),
    Member(MemberId),
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Group(id) => write!(f, "{id}"),
            Address::Member(id) => write!(f, "{id}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AddressError {
    #[error("member id is not a hex-encoded 32-byte public key")]
    InvalidMemberId,
}

#[cfg(test)]
mod tests {
    use crate::crypto::{KeyPair, Rng};

    use super::{AddressError, GroupId, MemberId};

    #[test]
    fn group_address_is_stable() {
        let rng = Rng::from_seed([1; 32]);

        let group_identity = KeyPair::generate(&rng).unwrap();
        let id_1 = GroupId::from_public_key(group_identity.public_key());
        let id_2 = GroupId::from_public_key(group_identity.public_key());
        assert_eq!(id_1, id_2);

        // Both encoding rounds are visible in the address.
        assert!(id_1.as_str().starts_with("closed-group!"));
        assert!(id_1.as_str().len() > group_identity.public_key().to_hex().len());

        let other_identity = KeyPair::generate(&rng).unwrap();
        assert_ne!(id_1, GroupId::from_public_key(other_identity.public_key()));
    }

    #[test]
    fn member_id_round_trip() {
        let rng = Rng::from_seed([2; 32]);

        let key_pair = KeyPair::generate(&rng).unwrap();
        let member = MemberId::from_public_key(key_pair.public_key());
        assert_eq!(member.public_key().unwrap(), *key_pair.public_key());

        let member_again = MemberId::from_hex(member.as_str()).unwrap();
        assert_eq!(member, member_again);

        assert!(matches!(
            MemberId::from_hex("not a key"),
            Err(AddressError::InvalidMemberId)
        ));
        assert!(matches!(
            MemberId::from_hex("0123"),
            Err(AddressError::InvalidMemberId)
        ));
    }
}
