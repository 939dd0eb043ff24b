//! The encrypted private signing key file (spec.md §3): a 16-byte salt,
//! PBKDF2-HMAC-SHA256 (100,000 iterations, 32-byte output) derived key, and
//! an AES-256-GCM envelope with a 12-byte nonce prepended to the ciphertext,
//! over the base64-encoded private key bytes.
//!
//! The on-disk layout is `salt(16) || nonce(12) || ciphertext`.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use data_encoding::BASE64;
use ed25519_dalek::SigningKey;
use hmac::Hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

use crate::error::ScmpdError;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const PBKDF2_ROUNDS: u32 = 100_000;

fn derive_key(password: &str, salt: &[u8]) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2::pbkdf2::<Hmac<Sha256>>(password.as_bytes(), salt, PBKDF2_ROUNDS, &mut key);
    key
}

/// Encrypt `signing_key` under `password`, returning the full on-disk file
/// contents (salt, nonce, and ciphertext concatenated).
pub fn seal(signing_key: &SigningKey, password: &str) -> Result<Vec<u8>, ScmpdError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let key_bytes = derive_key(password, &salt);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
    let nonce = Nonce::from_slice(&nonce_bytes);

    let plaintext = BASE64.encode(signing_key.to_bytes().as_slice());
    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|_| ScmpdError::Crypto("key-file encryption failed".into()))?;

    let mut out = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&salt);
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt a key file produced by [`seal`], recovering the signing key.
pub fn open(file_contents: &[u8], password: &str) -> Result<SigningKey, ScmpdError> {
    if file_contents.len() < SALT_LEN + NONCE_LEN {
        return Err(ScmpdError::Crypto("key file truncated".into()));
    }
    let (salt, rest) = file_contents.split_at(SALT_LEN);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

    let key_bytes = derive_key(password, salt);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
    let nonce = Nonce::from_slice(nonce_bytes);

    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| ScmpdError::Crypto("wrong password or corrupted key file".into()))?;
    let raw = BASE64
        .decode(&plaintext)
        .map_err(|_| ScmpdError::Crypto("key file did not contain valid base64".into()))?;
    let bytes: [u8; 32] = raw
        .try_into()
        .map_err(|_| ScmpdError::Crypto("decrypted key has the wrong length".into()))?;
    Ok(SigningKey::from_bytes(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_seal_and_open() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let sealed = seal(&signing_key, "correct horse battery staple").unwrap();
        let opened = open(&sealed, "correct horse battery staple").unwrap();
        assert_eq!(opened.to_bytes(), signing_key.to_bytes());
    }

    #[test]
    fn wrong_password_fails_to_open() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let sealed = seal(&signing_key, "right password").unwrap();
        assert!(open(&sealed, "wrong password").is_err());
    }

    #[test]
    fn truncated_file_is_rejected() {
        assert!(open(&[0u8; 4], "whatever").is_err());
    }

    #[test]
    fn each_seal_uses_a_fresh_salt_and_nonce() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let a = seal(&signing_key, "pw").unwrap();
        let b = seal(&signing_key, "pw").unwrap();
        assert_ne!(a[..SALT_LEN + NONCE_LEN], b[..SALT_LEN + NONCE_LEN]);
    }
}
