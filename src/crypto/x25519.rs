//! Elliptic-curve Diffie-Hellman key agreement and key-pair generation (X25519).
use std::fmt;

use serde::{Deserialize, Serialize};
use x25519_dalek::StaticSecret;

use crate::crypto::secret::Secret;
use crate::crypto::{Rng, RngError};

/// 256-bit secret key size.
pub const SECRET_KEY_SIZE: usize = 32;

/// 256-bit public key size.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Secret Curve25519 key used for ECDH key agreement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretKey(Secret<SECRET_KEY_SIZE>);

impl SecretKey {
    pub fn from_bytes(bytes: [u8; SECRET_KEY_SIZE]) -> Self {
        SecretKey(Secret::from_bytes(bytes))
    }

    pub fn from_rng(rng: &Rng) -> Result<Self, RngError> {
        Ok(Self::from_bytes(rng.random_array()?))
    }

    pub(crate) fn as_bytes(&self) -> &[u8; SECRET_KEY_SIZE] {
        self.0.as_bytes()
    }

    pub fn public_key(&self) -> PublicKey {
        let secret = StaticSecret::from(*self.0.as_bytes());
        PublicKey(x25519_dalek::PublicKey::from(&secret).to_bytes())
    }

    pub fn calculate_agreement(&self, their_public: &PublicKey) -> [u8; 32] {
        let secret = StaticSecret::from(*self.0.as_bytes());
        let their_public = x25519_dalek::PublicKey::from(their_public.0);
        secret.diffie_hellman(&their_public).to_bytes()
    }
}

/// Public Curve25519 key used for ECDH key agreement and as a stable identifier on the wire.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PublicKey(#[serde(with = "serde_bytes")] [u8; PUBLIC_KEY_SIZE]);

impl PublicKey {
    pub fn from_bytes(public_key: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self(public_key)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// X25519 key pair.
///
/// One key pair serves either as a group identity (only the public half is used after
/// creation) or as one generation of a group's shared encryption key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl KeyPair {
    pub fn generate(rng: &Rng) -> Result<Self, RngError> {
        let secret_key = SecretKey::from_rng(rng)?;
        let public_key = secret_key.public_key();
        Ok(Self {
            secret_key,
            public_key,
        })
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = secret_key.public_key();
        Self {
            secret_key,
            public_key,
        }
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Fixed-size encoding (secret key followed by public key), used as sealed-box plaintext.
    pub fn to_bytes(&self) -> [u8; SECRET_KEY_SIZE + PUBLIC_KEY_SIZE] {
        let mut bytes = [0u8; SECRET_KEY_SIZE + PUBLIC_KEY_SIZE];
        bytes[..SECRET_KEY_SIZE].copy_from_slice(self.secret_key.as_bytes());
        bytes[SECRET_KEY_SIZE..].copy_from_slice(self.public_key.as_bytes());
        bytes
    }

    pub fn from_bytes(bytes: [u8; SECRET_KEY_SIZE + PUBLIC_KEY_SIZE]) -> Self {
        let mut secret_key = [0u8; SECRET_KEY_SIZE];
        secret_key.copy_from_slice(&bytes[..SECRET_KEY_SIZE]);
        let mut public_key = [0u8; PUBLIC_KEY_SIZE];
        public_key.copy_from_slice(&bytes[SECRET_KEY_SIZE..]);
        Self {
            secret_key: SecretKey::from_bytes(secret_key),
            public_key: PublicKey::from_bytes(public_key),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::crypto::Rng;

    use super::{KeyPair, SecretKey};

    #[test]
    fn diffie_hellman() {
        let rng = Rng::from_seed([1; 32]);

        let alice_secret_key = SecretKey::from_rng(&rng).unwrap();
        let alice_public_key = alice_secret_key.public_key();

        let bob_secret_key = SecretKey::from_rng(&rng).unwrap();
        let bob_public_key = bob_secret_key.public_key();

        let alice_shared_secret = alice_secret_key.calculate_agreement(&bob_public_key);
        let bob_shared_secret = bob_secret_key.calculate_agreement(&alice_public_key);

        assert_eq!(alice_shared_secret, bob_shared_secret);
    }

    #[test]
    fn key_pair_encoding() {
        let rng = Rng::from_seed([2; 32]);

        let key_pair = KeyPair::generate(&rng).unwrap();
        let key_pair_again = KeyPair::from_bytes(key_pair.to_bytes());
        assert_eq!(key_pair, key_pair_again);
        assert_eq!(
            key_pair.secret_key().public_key(),
            *key_pair_again.public_key()
        );
    }
}
