//! Cryptographic primitives consumed by the group engine.
//!
//! The engine treats these as opaque building blocks: key-pair generation and
//! Diffie-Hellman agreement (X25519), chain-key derivation (HKDF-SHA256), an
//! AEAD (XChaCha20-Poly1305) and a sealed box composed from the three.
pub(crate) mod hkdf;
mod rng;
mod sealed;
mod secret;
pub(crate) mod x25519;
pub(crate) mod xchacha20;

pub use rng::{Rng, RngError};
pub use sealed::{SealedError, seal, unseal};
pub use secret::Secret;
pub use x25519::{KeyPair, PUBLIC_KEY_SIZE, PublicKey, SECRET_KEY_SIZE, SecretKey};
