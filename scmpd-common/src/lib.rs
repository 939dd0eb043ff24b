pub mod error;
pub mod framing;
pub mod keyfile;
pub mod sigsection;

pub use error::ScmpdError;
