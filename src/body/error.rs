use std::{fmt, io};

/// Error reading the request body.
pub enum BodyError {
    /// No chunk arrived within the read timeout.
    Timeout,
    /// Transport failed while streaming the body.
    Io(io::Error),
}

impl From<io::Error> for BodyError {
    fn from(v: io::Error) -> Self {
        Self::Io(v)
    }
}

impl std::error::Error for BodyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Timeout => None,
            Self::Io(err) => Some(err),
        }
    }
}

impl fmt::Debug for BodyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut f = f.debug_tuple("BodyError");
        match self {
            Self::Timeout => f.field(&"Timeout"),
            Self::Io(err) => f.field(err),
        }
        .finish()
    }
}

impl fmt::Display for BodyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("timed out reading request body"),
            Self::Io(err) => write!(f, "failed to read request body: {err}"),
        }
    }
}
