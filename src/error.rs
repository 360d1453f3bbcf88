use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// Underlying filesystem failure (permissions, disk full, I/O).
    Io(io::Error),
    /// The backing file contents could not be parsed.
    Decode(String),
    /// `try_lock` found the key held by an unexpired lock.
    AlreadyLocked { key: String, until: u64 },
    /// The key contains a newline and cannot be framed on disk.
    InvalidKey(String),
    /// The store has been shut down; no further operations are accepted.
    Shutdown,
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Decode(msg) => write!(f, "Failed to decode state: {}", msg),
            Error::AlreadyLocked { key, until } => {
                write!(f, "Key {} is already locked until {}", key, until)
            }
            Error::InvalidKey(key) => {
                write!(f, "Invalid key {:?}: keys may not contain newlines", key)
            }
            Error::Shutdown => write!(f, "Store has been shut down"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}
