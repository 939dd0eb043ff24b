use std::path::Path;

use anyhow::{Context, Result};
use russh::keys::{load_secret_key, PrivateKey, PublicKey};

/// Load the agent's Ed25519 host key from `path` (spec.md §4.1, "Load the
/// SSH host private key"). The teacher's key file is unencrypted on disk,
/// as ours must be to start unattended.
pub fn load_host_key(path: &Path) -> Result<PrivateKey> {
    load_secret_key(path, None)
        .with_context(|| format!("failed to load SSH host key from {}", path.display()))
}

/// Extract the base64 "key blob" field from one `AuthorizedKeys` line,
/// i.e. the second whitespace-delimited token of
/// `<algorithm> <base64> [comment]`.
fn authorized_line_blob(line: &str) -> Option<&str> {
    line.split_whitespace().nth(1)
}

/// The base64 key blob of an offered public key, as it would appear in
/// an `authorized_keys`-style line.
fn offered_key_blob(key: &PublicKey) -> Option<String> {
    key.to_openssh()
        .ok()
        .and_then(|line| authorized_line_blob(&line).map(str::to_owned))
}

/// True if `offered` matches ANY of `authorized_keys` by base64 blob
/// (spec.md §9: any-matching entry admits, not just the last).
pub fn is_authorized_key(offered: &PublicKey, authorized_keys: &[String]) -> bool {
    let Some(offered_blob) = offered_key_blob(offered) else {
        return false;
    };
    authorized_keys
        .iter()
        .filter_map(|line| authorized_line_blob(line))
        .any(|blob| blob == offered_blob)
}

#[cfg(test)]
mod tests {
    use super::*;
    use russh::keys::ssh_key::rand_core::OsRng;
    use russh::keys::{Algorithm, PrivateKey};

    fn make_key() -> PrivateKey {
        PrivateKey::random(&mut OsRng, Algorithm::Ed25519).unwrap()
    }

    #[test]
    fn matches_any_configured_key() {
        let key = make_key();
        let public = key.public_key().clone();
        let blob = authorized_line_blob(&public.to_openssh().unwrap())
            .unwrap()
            .to_owned();

        let authorized = vec![
            "ssh-ed25519 AAAAC3Nzaunrelated note".to_string(),
            format!("ssh-ed25519 {blob} deployer@workstation"),
        ];

        assert!(is_authorized_key(&public, &authorized));
    }

    #[test]
    fn rejects_unlisted_key() {
        let key = make_key();
        let other = make_key();
        let public = key.public_key().clone();

        let authorized = vec![format!(
            "ssh-ed25519 {} someone-else",
            authorized_line_blob(&other.public_key().to_openssh().unwrap()).unwrap()
        )];

        assert!(!is_authorized_key(&public, &authorized));
    }
}
