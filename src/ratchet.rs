//! Per-sender ratchet chains for the legacy key-distribution scheme.
//!
//! Every member owns one chain per group which only they advance. The public projection of
//! a chain (its current chain key, key index and owner) is shared as a [`SenderKey`] so
//! other members can derive per-sender decryption state. When a ratchet generation is
//! retired, all chains of a group move from the "current" to the "old" collection as one
//! set; old generations stay around to decrypt late-arriving traffic.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::MemberId;
use crate::crypto::hkdf::{HkdfError, hkdf};
use crate::crypto::{Rng, RngError, Secret};

/// 256-bit chain key size.
pub const CHAIN_KEY_SIZE: usize = 32;

/// Storage collection a ratchet chain lives in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Generation {
    Current,
    Old,
}

/// Symmetric ratchet chain: a chain key plus a monotonically increasing key index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatchetChain {
    chain_key: Secret<CHAIN_KEY_SIZE>,
    key_index: u32,
}

impl RatchetChain {
    /// Starts a fresh chain at index zero from random key material.
    pub fn generate(rng: &Rng) -> Result<Self, RngError> {
        Ok(Self {
            chain_key: Secret::from_bytes(rng.random_array()?),
            key_index: 0,
        })
    }

    #[cfg(any(test, feature = "test_utils"))]
    pub fn new(chain_key: [u8; CHAIN_KEY_SIZE], key_index: u32) -> Self {
        Self {
            chain_key: Secret::from_bytes(chain_key),
            key_index,
        }
    }

    /// Steps the chain key one generation forward and bumps the index.
    pub fn advance(self) -> Result<Self, RatchetError> {
        let chain_key = hkdf(b"chain", self.chain_key.as_bytes(), None)?;
        Ok(Self {
            chain_key: Secret::from_bytes(chain_key),
            key_index: self.key_index + 1,
        })
    }

    pub fn key_index(&self) -> u32 {
        self.key_index
    }

    /// Public projection of this chain, shared with other members in control messages.
    pub fn sender_key(&self, sender: &MemberId) -> SenderKey {
        SenderKey {
            chain_key: *self.chain_key.as_bytes(),
            key_index: self.key_index,
            sender: sender.clone(),
        }
    }
}

/// Public chain head of a member's ratchet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderKey {
    #[serde(with = "serde_bytes")]
    pub chain_key: [u8; CHAIN_KEY_SIZE],
    pub key_index: u32,
    pub sender: MemberId,
}

#[derive(Debug, Error)]
pub enum RatchetError {
    #[error(transparent)]
    Hkdf(#[from] HkdfError),
}

#[cfg(test)]
mod tests {
    use crate::address::MemberId;
    use crate::crypto::{KeyPair, Rng};

    use super::RatchetChain;

    #[test]
    fn advance_is_deterministic() {
        let chain_1 = RatchetChain::new([7; 32], 0);
        let chain_2 = RatchetChain::new([7; 32], 0);

        let chain_1 = chain_1.advance().unwrap().advance().unwrap();
        let chain_2 = chain_2.advance().unwrap().advance().unwrap();

        assert_eq!(chain_1, chain_2);
        assert_eq!(chain_1.key_index(), 2);
    }

    #[test]
    fn sender_key_projection() {
        let rng = Rng::from_seed([3; 32]);
        let member = MemberId::from_public_key(KeyPair::generate(&rng).unwrap().public_key());

        let chain = RatchetChain::generate(&rng).unwrap();
        let sender_key = chain.sender_key(&member);
        assert_eq!(sender_key.key_index, 0);
        assert_eq!(sender_key.sender, member);

        let advanced = chain.advance().unwrap();
        let next_sender_key = advanced.sender_key(&member);
        assert_eq!(next_sender_key.key_index, 1);
        assert_ne!(next_sender_key.chain_key, sender_key.chain_key);
    }
}
