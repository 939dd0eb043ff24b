mod cli;
mod keyfile;
mod pubkey;

use anyhow::{Context, Result};
use clap::Parser;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use scmpd_common::sigsection;
use tracing::info;

use cli::{Cli, Command};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("scmpd_signer=info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Keygen { pub_out, key_out } => keygen(&pub_out, &key_out),
        Command::Sign { key, bin } => sign(&key, &bin),
        Command::Verify { pubkey, bin } => {
            if verify(&pubkey, &bin)? {
                println!("OK: signature verified");
                Ok(())
            } else {
                println!("FAILED: signature does not verify");
                std::process::exit(1);
            }
        }
    }
}

fn keygen(pub_out: &std::path::Path, key_out: &std::path::Path) -> Result<()> {
    let signing_key = SigningKey::generate(&mut OsRng);
    pubkey::write(pub_out, &signing_key.verifying_key())?;

    let password = keyfile::prompt_new_password()?;
    keyfile::write_encrypted(key_out, &signing_key, &password)?;

    info!(public = %pub_out.display(), private = %key_out.display(), "wrote signing keypair");
    Ok(())
}

fn sign(key: &std::path::Path, bin: &std::path::Path) -> Result<()> {
    let password = keyfile::prompt_existing_password()?;
    let signing_key = keyfile::read_encrypted(key, &password)?;

    // Normalize: drop a stale sigdata section if one is already present, so
    // the signature is always computed over the binary without it.
    let _ = sigsection::remove_section(bin);

    let contents = std::fs::read(bin)
        .with_context(|| format!("failed to read {}", bin.display()))?;
    let signature = sigsection::sign(&signing_key, &contents);
    let encoded = sigsection::encode_signature(&signature);
    sigsection::add_section(bin, &encoded)?;

    info!(bin = %bin.display(), "embedded signature");
    Ok(())
}

fn verify(pubkey_path: &std::path::Path, bin: &std::path::Path) -> Result<bool> {
    let verifying_key = pubkey::read(pubkey_path)?;

    // Verification must not mutate the caller's binary: work on a scratch
    // copy since stripping the section is required to recompute the
    // original signed bytes.
    let scratch = tempfile::NamedTempFile::new().context("failed to create scratch file")?;
    std::fs::copy(bin, scratch.path())
        .with_context(|| format!("failed to copy {} to scratch path", bin.display()))?;

    let section = sigsection::dump_section(scratch.path())
        .context("binary has no sigdata section")?;
    let signature = sigsection::decode_signature(&section).context("malformed sigdata section")?;
    sigsection::remove_section(scratch.path()).context("failed to strip sigdata section")?;

    let stripped = std::fs::read(scratch.path()).context("failed to read stripped scratch copy")?;
    Ok(sigsection::verify(&verifying_key, &stripped, &signature))
}
