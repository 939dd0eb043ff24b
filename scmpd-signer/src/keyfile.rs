//! Thin file-I/O and password-prompt wrapper around
//! `scmpd_common::keyfile`'s encrypted private-key envelope.

use std::path::Path;

use anyhow::{Context, Result};
use dialoguer::Password;
use ed25519_dalek::SigningKey;

pub fn prompt_new_password() -> Result<String> {
    Password::new()
        .with_prompt("Password for the new private key file")
        .with_confirmation("Confirm password", "passwords did not match")
        .interact()
        .context("failed to read password")
}

pub fn prompt_existing_password() -> Result<String> {
    Password::new()
        .with_prompt("Password for the private key file")
        .interact()
        .context("failed to read password")
}

pub fn write_encrypted(path: &Path, signing_key: &SigningKey, password: &str) -> Result<()> {
    let sealed = scmpd_common::keyfile::seal(signing_key, password)
        .context("failed to encrypt private key")?;
    std::fs::write(path, sealed)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn read_encrypted(path: &Path, password: &str) -> Result<SigningKey> {
    let contents = std::fs::read(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    scmpd_common::keyfile::open(&contents, password)
        .context("failed to decrypt private key (wrong password or corrupted file)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn writes_and_reads_back_through_real_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signing.key");
        let signing_key = SigningKey::generate(&mut OsRng);

        write_encrypted(&path, &signing_key, "hunter2").unwrap();
        let recovered = read_encrypted(&path, "hunter2").unwrap();

        assert_eq!(recovered.to_bytes(), signing_key.to_bytes());
    }

    #[test]
    fn wrong_password_on_disk_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signing.key");
        let signing_key = SigningKey::generate(&mut OsRng);

        write_encrypted(&path, &signing_key, "right").unwrap();
        assert!(read_encrypted(&path, "wrong").is_err());
    }
}
