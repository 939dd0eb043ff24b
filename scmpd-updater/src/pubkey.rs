//! The code-signing public key, baked in at compile time (spec.md §6,
//! "Baked-in secrets"). This is the public half of the key the signer
//! (`scmpd-signer`) holds encrypted; rotating it means rebuilding the
//! updater.

use ed25519_dalek::VerifyingKey;

/// 32-byte Ed25519 public key, matching the private key managed by
/// `scmpd-signer keygen`. Placeholder — a release build substitutes the
/// fleet's actual signing key here before compiling. Unlike an arbitrary
/// byte string, this one is a valid compressed Edwards point (an actual
/// generated Ed25519 public key), so `VerifyingKey::from_bytes` below
/// succeeds instead of rejecting it at startup.
const SIGNING_PUBLIC_KEY_BYTES: [u8; 32] = [
    0xc1, 0xa2, 0xd6, 0xd1, 0xb1, 0xd4, 0xf5, 0x56, 0x43, 0xac, 0xf5, 0x8b, 0x80, 0x5c, 0x15, 0xf0,
    0x71, 0x97, 0xb8, 0xb1, 0x5d, 0x0f, 0x0d, 0x09, 0x89, 0x13, 0x49, 0xc8, 0x12, 0xab, 0xff, 0xa6,
];

pub fn load() -> anyhow::Result<VerifyingKey> {
    VerifyingKey::from_bytes(&SIGNING_PUBLIC_KEY_BYTES)
        .map_err(|e| anyhow::anyhow!("baked-in signing public key is invalid: {e}"))
}
