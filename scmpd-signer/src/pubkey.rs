//! Reading and writing the base64-encoded public half of the signing keypair.

use std::path::Path;

use anyhow::{Context, Result};
use data_encoding::BASE64;
use ed25519_dalek::VerifyingKey;

pub fn write(path: &Path, key: &VerifyingKey) -> Result<()> {
    let encoded = BASE64.encode(key.as_bytes());
    std::fs::write(path, encoded).with_context(|| format!("failed to write {}", path.display()))
}

pub fn read(path: &Path) -> Result<VerifyingKey> {
    let encoded = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = BASE64
        .decode(encoded.trim().as_bytes())
        .context("public key file is not valid base64")?;
    let bytes: [u8; 32] = raw
        .try_into()
        .map_err(|_| anyhow::anyhow!("public key must be exactly 32 bytes"))?;
    VerifyingKey::from_bytes(&bytes).context("public key bytes are not a valid Ed25519 point")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;
    use rand::rngs::OsRng;

    #[test]
    fn round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signing.pub");
        let key = SigningKey::generate(&mut OsRng).verifying_key();

        write(&path, &key).unwrap();
        let recovered = read(&path).unwrap();

        assert_eq!(recovered.as_bytes(), key.as_bytes());
    }
}
