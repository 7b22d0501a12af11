use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported geometry kind `{0}`")]
    UnsupportedGeometryKind(String),

    #[error("malformed response from {endpoint}: {reason}")]
    MalformedResponse { endpoint: String, reason: String },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("could not resolve an IPv4 address for `{0}`")]
    Resolve(String),

    #[error("could not run trace utility `{program}`: {source}")]
    TraceSpawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("raw socket error: {0}")]
    Socket(#[source] io::Error),

    #[error("trace to `{0}` produced no hops")]
    NoHops(String),

    #[error("no place found for origin `{0}`")]
    OriginNotFound(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn malformed(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedResponse {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }
}
