//! Asymmetric sealed box: encrypt towards a recipient's public identity key so only the
//! holder of the matching secret key can open it.
//!
//! Used to wrap rotated group encryption key pairs per member before they go out inside a
//! group-addressed control message. The construction is an ephemeral X25519 agreement, HKDF
//! key derivation and an XChaCha20-Poly1305 AEAD; the ephemeral public key and nonce travel
//! in front of the ciphertext.
use thiserror::Error;

use crate::crypto::hkdf::{HkdfError, hkdf};
use crate::crypto::x25519::{KeyPair, PUBLIC_KEY_SIZE, PublicKey, SecretKey};
use crate::crypto::xchacha20::{XAeadError, XAeadKey, XAeadNonce, x_aead_decrypt, x_aead_encrypt};
use crate::crypto::{Rng, RngError};

const NONCE_SIZE: usize = 24;

const HEADER_SIZE: usize = PUBLIC_KEY_SIZE + NONCE_SIZE;

pub fn seal(plaintext: &[u8], recipient: &PublicKey, rng: &Rng) -> Result<Vec<u8>, SealedError> {
    let ephemeral = KeyPair::generate(rng)?;
    let shared_secret = ephemeral.secret_key().calculate_agreement(recipient);
    let key: XAeadKey = hkdf(b"sealed-box", &shared_secret, None)?;
    let nonce: XAeadNonce = rng.random_array()?;

    let ciphertext = x_aead_encrypt(&key, plaintext, nonce, None)?;

    let mut sealed = Vec::with_capacity(HEADER_SIZE + ciphertext.len());
    sealed.extend_from_slice(ephemeral.public_key().as_bytes());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

pub fn unseal(sealed: &[u8], recipient: &SecretKey) -> Result<Vec<u8>, SealedError> {
    if sealed.len() < HEADER_SIZE {
        return Err(SealedError::TooShort);
    }

    let mut ephemeral_public = [0u8; PUBLIC_KEY_SIZE];
    ephemeral_public.copy_from_slice(&sealed[..PUBLIC_KEY_SIZE]);
    let mut nonce: XAeadNonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(&sealed[PUBLIC_KEY_SIZE..HEADER_SIZE]);

    let shared_secret = recipient.calculate_agreement(&PublicKey::from_bytes(ephemeral_public));
    let key: XAeadKey = hkdf(b"sealed-box", &shared_secret, None)?;

    let plaintext = x_aead_decrypt(&key, &sealed[HEADER_SIZE..], nonce, None)?;
    Ok(plaintext)
}

#[derive(Debug, Error)]
pub enum SealedError {
    #[error("sealed message is too short to contain a header")]
    TooShort,

    #[error(transparent)]
    Rng(#[from] RngError),

    #[error(transparent)]
    Hkdf(#[from] HkdfError),

    #[error(transparent)]
    XAead(#[from] XAeadError),
}

#[cfg(test)]
mod tests {
    use crate::crypto::x25519::KeyPair;
    use crate::crypto::{Rng, SealedError};

    use super::{seal, unseal};

    #[test]
    fn seal_unseal() {
        let rng = Rng::from_seed([1; 32]);

        let recipient = KeyPair::generate(&rng).unwrap();
        let sealed = seal(b"new key pair", recipient.public_key(), &rng).unwrap();
        let plaintext = unseal(&sealed, recipient.secret_key()).unwrap();

        assert_eq!(plaintext, b"new key pair");
    }

    #[test]
    fn wrong_recipient_can_not_open() {
        let rng = Rng::from_seed([1; 32]);

        let recipient = KeyPair::generate(&rng).unwrap();
        let eavesdropper = KeyPair::generate(&rng).unwrap();

        let sealed = seal(b"new key pair", recipient.public_key(), &rng).unwrap();
        assert!(matches!(
            unseal(&sealed, eavesdropper.secret_key()),
            Err(SealedError::XAead(_))
        ));
    }

    #[test]
    fn truncated_message() {
        let rng = Rng::from_seed([1; 32]);

        let recipient = KeyPair::generate(&rng).unwrap();
        assert!(matches!(
            unseal(&[0; 12], recipient.secret_key()),
            Err(SealedError::TooShort)
        ));
    }
}
