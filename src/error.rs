//! Failures surfaced by body parsing.
use http::StatusCode;
use std::{error::Error as StdError, fmt};

use crate::body::BodyError;

/// Boxed error used to carry a parser's underlying failure.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Error returned from [`Parsers::call`][crate::Parsers::call].
///
/// Every variant is terminal for the request. Use [`Error::status`] to map it
/// to a response at the transport boundary.
pub enum Error {
    /// Request body exceeded the configured byte limit while being read.
    TooLarge,
    /// No parser claimed the body and its media type is not in the pass list.
    UnsupportedMediaType {
        /// The resolved `type/subtype`.
        media_type: String,
    },
    /// Body bytes are not in the expected character encoding.
    BadEncoding {
        message: String,
    },
    /// A parser failed to decode a body it claimed.
    Parse(ParseError),
    /// Query string exceeded its length limit or could not be decoded.
    InvalidQuery {
        message: String,
    },
}

impl Error {
    /// Returns the status code a transport should respond with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::BadEncoding { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Parse(_) => StatusCode::BAD_REQUEST,
            Self::InvalidQuery { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub(crate) fn bad_encoding(message: impl Into<String>) -> Self {
        Self::BadEncoding { message: message.into() }
    }

    pub(crate) fn parse(kind: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Parse(ParseError::new(kind, source))
    }
}

impl From<ParseError> for Error {
    fn from(v: ParseError) -> Self {
        Self::Parse(v)
    }
}

impl From<BodyError> for Error {
    fn from(v: BodyError) -> Self {
        let kind = match v {
            BodyError::Timeout => "timeout",
            BodyError::Io(_) => "io",
        };
        Self::parse(kind, v)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::TooLarge => f.write_str("TooLarge"),
            Self::UnsupportedMediaType { media_type } => f
                .debug_struct("UnsupportedMediaType")
                .field("media_type", media_type)
                .finish(),
            Self::BadEncoding { message } => {
                f.debug_struct("BadEncoding").field("message", message).finish()
            }
            Self::Parse(err) => f.debug_tuple("Parse").field(err).finish(),
            Self::InvalidQuery { message } => {
                f.debug_struct("InvalidQuery").field("message", message).finish()
            }
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::TooLarge => f.write_str("request is too large"),
            Self::UnsupportedMediaType { media_type } => {
                write!(f, "unsupported media type {media_type}")
            }
            Self::BadEncoding { message } => write!(f, "invalid encoding: {message}"),
            Self::Parse(err) => err.fmt(f),
            Self::InvalidQuery { message } => write!(f, "invalid query string: {message}"),
        }
    }
}

// ===== ParseError =====

/// Underlying parser failure, wrapped so that callers see a uniform error.
pub struct ParseError {
    kind: &'static str,
    source: BoxError,
}

impl ParseError {
    pub fn new(kind: &'static str, source: impl Into<BoxError>) -> Self {
        Self { kind, source: source.into() }
    }

    /// Returns the name of the failing component, e.g. `"json"` or `"timeout"`.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Returns the original failure.
    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.source
    }
}

impl StdError for ParseError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&*self.source)
    }
}

impl fmt::Debug for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ParseError")
            .field("kind", &self.kind)
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "malformed request, a {} error was raised: {}", self.kind, self.source)
    }
}

// ===== ConfigError =====

/// Error building a [`Parsers`][crate::Parsers] engine.
pub enum ConfigError {
    /// Parser declaration list is empty.
    NoParsers,
    /// Identifier is neither a built-in short name nor a registered parser.
    UnknownParser(String),
    /// A parser initialization hook rejected its options.
    Init {
        parser: String,
        message: String,
    },
    /// Configuration document could not be deserialized.
    Deserialize(serde_json::Error),
}

impl From<serde_json::Error> for ConfigError {
    fn from(v: serde_json::Error) -> Self {
        Self::Deserialize(v)
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Deserialize(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Debug for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NoParsers => f.write_str("NoParsers"),
            Self::UnknownParser(name) => f.debug_tuple("UnknownParser").field(name).finish(),
            Self::Init { parser, message } => f
                .debug_struct("Init")
                .field("parser", parser)
                .field("message", message)
                .finish(),
            Self::Deserialize(err) => f.debug_tuple("Deserialize").field(err).finish(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NoParsers => f.write_str("at least one parser must be declared"),
            Self::UnknownParser(name) => write!(f, "unknown parser `{name}`"),
            Self::Init { parser, message } => {
                write!(f, "failed to initialize parser `{parser}`: {message}")
            }
            Self::Deserialize(err) => write!(f, "invalid parsers config: {err}"),
        }
    }
}
