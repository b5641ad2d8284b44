use thiserror::Error;

use crate::protocol::ExceptionChain;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong talking to the server.
///
/// `Io` and `Protocol` drive a session to `Broken` (see [`crate::session::Session`]);
/// `ServerException` does not, since the server finished the query cleanly at
/// the protocol level.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("server exception: {0}")]
    ServerException(ExceptionChain),

    #[error("usage error: {0}")]
    UsageError(String),
}

impl Error {
    pub fn protocol(msg: impl Into<String>) -> Self {
        Error::Protocol(msg.into())
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Error::UsageError(msg.into())
    }

    /// Whether this error kind leaves the session reusable.
    ///
    /// Per spec.md §7: only `Io`/`Protocol` transition a session to `Broken`.
    pub fn is_fatal_to_session(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Protocol(_))
    }
}
