//! Body parsers.
//!
//! A [`Parser`] inspects the request media type and either claims the body,
//! passes it to the next parser, or reports that the body is too large.
//!
//! Built-in parsers:
//!
//! - [`UrlEncoded`] `application/x-www-form-urlencoded`
//! - [`Json`] `application/json` and `application/*+json`
//! - [`Multipart`] `multipart/form-data` and `multipart/mixed`
//!
use bytes::Bytes;
use futures_core::future::BoxFuture;
use std::{fmt, sync::Arc};

use crate::{
    body::{BodyReader, Read},
    error::{BoxError, Error},
    media::MediaType,
    options::Options,
    params::ParamMap,
    request::Request,
};

mod json;
mod multipart;
mod urlencoded;

pub use json::Json;
pub use multipart::Multipart;
pub use urlencoded::UrlEncoded;

/// Result of a parse attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The parser claimed and decoded the body.
    Handled(ParamMap),
    /// The media type is not handled by this parser.
    Pass,
    /// The body exceeded the parser's length limit.
    TooLarge,
}

/// A pluggable body parser.
pub trait Parser: Send + Sync + 'static {
    /// Prepare options once, when the engine is built.
    ///
    /// The returned options are the ones passed to [`Parser::parse`].
    fn init(&self, options: Options) -> Result<Options, BoxError> {
        Ok(options)
    }

    /// Attempt to parse the request body.
    ///
    /// The request may be modified even when returning [`Outcome::Pass`].
    fn parse<'a>(
        &'a self,
        req: &'a mut Request,
        media: &'a MediaType,
        config: &'a ParserConfig,
    ) -> BoxFuture<'a, Result<Outcome, Error>>;
}

/// Per parser configuration, resolved when the engine is built.
#[derive(Clone)]
pub struct ParserConfig {
    options: Options,
    body_reader: Arc<dyn BodyReader>,
}

impl ParserConfig {
    pub fn new(options: Options, body_reader: Arc<dyn BodyReader>) -> Self {
        Self { options, body_reader }
    }

    #[inline]
    pub fn options(&self) -> &Options {
        &self.options
    }

    #[inline]
    pub fn body_reader(&self) -> &dyn BodyReader {
        &*self.body_reader
    }

    /// Read the body with the configured reader and limits.
    ///
    /// Returns `None` if the body is larger than the `length` option.
    pub async fn read_body(&self, req: &mut Request) -> Result<Option<Bytes>, Error> {
        let options = self.options.read_options();
        match self.body_reader.read_body(req, &options).await? {
            Read::Done(body) => Ok(Some(body)),
            Read::More(_) => Ok(None),
        }
    }
}

impl fmt::Debug for ParserConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserConfig")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Closed set of parsers an engine can hold.
#[derive(Clone)]
pub(crate) enum ParserKind {
    UrlEncoded(UrlEncoded),
    Json(Json),
    Multipart(Multipart),
    Custom(Arc<dyn Parser>),
}

impl ParserKind {
    /// Resolve a built-in short name.
    pub(crate) fn builtin(name: &str) -> Option<Self> {
        match name {
            "urlencoded" => Some(Self::UrlEncoded(UrlEncoded)),
            "json" => Some(Self::Json(Json)),
            "multipart" => Some(Self::Multipart(Multipart)),
            _ => None,
        }
    }

    pub(crate) fn as_parser(&self) -> &dyn Parser {
        match self {
            Self::UrlEncoded(p) => p,
            Self::Json(p) => p,
            Self::Multipart(p) => p,
            Self::Custom(p) => &**p,
        }
    }
}

impl fmt::Debug for ParserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UrlEncoded(_) => f.write_str("UrlEncoded"),
            Self::Json(_) => f.write_str("Json"),
            Self::Multipart(_) => f.write_str("Multipart"),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;
    use crate::body::Incoming;

    pub fn config(options: Options) -> ParserConfig {
        ParserConfig::new(options, Arc::new(Incoming))
    }

    pub async fn parse<P: Parser>(
        parser: &P,
        mut req: Request,
        options: Options,
    ) -> Result<Outcome, Error> {
        let options = parser.init(options).unwrap();
        let media = MediaType::parse_lossy(&req.content_type().unwrap_or_default());
        parser.parse(&mut req, &media, &config(options)).await
    }
}
