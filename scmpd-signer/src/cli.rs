use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// scmpd-signer — offline developer tool for the signing keypair and for
/// embedding/checking the `sigdata` section of a release binary.
#[derive(Parser, Debug)]
#[command(name = "scmpd-signer", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a signing keypair: a public key file and a password-encrypted private key file.
    Keygen {
        /// Output path for the base64-encoded public key.
        #[arg(long = "pub", default_value = "scmpd-signing.pub")]
        pub_out: PathBuf,

        /// Output path for the password-encrypted private key.
        #[arg(long = "key", default_value = "scmpd-signing.key")]
        key_out: PathBuf,
    },
    /// Sign a binary: embed a detached signature into its `sigdata` section.
    Sign {
        /// Path to the password-encrypted private key file.
        #[arg(long = "key")]
        key: PathBuf,

        /// Path to the binary to sign, modified in place.
        #[arg(long = "bin")]
        bin: PathBuf,
    },
    /// Verify a binary's `sigdata` section against a public key.
    Verify {
        /// Path to the base64-encoded public key.
        #[arg(long = "pubkey")]
        pubkey: PathBuf,

        /// Path to the binary to check. Left untouched.
        #[arg(long = "bin")]
        bin: PathBuf,
    },
}
