use thiserror::Error;

/// The crate-wide error type. Every fallible operation in the core returns
/// `Result<T, Error>`; only the CLI front-end inspects [`Error::exit_code`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("usage error: {0}")]
    Usage(String),

    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("network error fetching {url}: HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("playlist parse error: {0}")]
    Parse(String),

    #[error("master playlist has no variants")]
    NoVariant,

    #[error("unsupported encryption method: {0}")]
    UnsupportedEncryption(String),

    #[error("key error for {key_uri}: {message}")]
    Key { key_uri: String, message: String },

    #[error("decrypt error for segment {index}: {message}")]
    Decrypt { index: usize, message: String },

    #[error("write error: {0}")]
    Write(#[from] std::io::Error),

    #[error("remux unavailable: {0}")]
    RemuxUnavailable(String),

    #[error("remux failed (exit {exit_code:?}): {stderr_tail}")]
    RemuxFailed {
        exit_code: Option<i32>,
        stderr_tail: String,
    },

    #[error("cancelled")]
    Cancelled,
}

impl Error {
    /// Process exit code per the CLI contract. Only ever consulted by `main`.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Usage(_) => 2,
            Error::Network { .. } | Error::HttpStatus { .. } => 3,
            Error::Parse(_) | Error::NoVariant => 4,
            Error::UnsupportedEncryption(_) | Error::Key { .. } | Error::Decrypt { .. } => 5,
            Error::Write(_) => 3,
            Error::RemuxFailed { .. } => 6,
            Error::RemuxUnavailable(_) => 0,
            Error::Cancelled => 130,
        }
    }

    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Error::Network {
            url: url.into(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
