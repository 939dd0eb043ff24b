use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum ScmpdError {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid payload length")]
    FrameTooShort,

    #[error("payload length does not match header metadata")]
    FrameLengthMismatch,

    #[error("signature invalid")]
    SignatureInvalid,

    #[error("missing '{section}' section in {path}")]
    MissingSection { section: &'static str, path: PathBuf },

    #[error("objcopy failed: {0}")]
    Objcopy(String),

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
