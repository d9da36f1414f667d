//! Body parsing engine.
use http::Method;
use std::{collections::HashMap, fmt, sync::Arc};

use crate::{
    body::{BodyReader, Incoming},
    config::{DEFAULT_QUERY_STRING_LENGTH, ParsersConfig},
    error::{ConfigError, Error},
    log::{debug, warning},
    media::MediaType,
    options::Options,
    params::{self, ParamMap},
    parser::{Outcome, Parser},
    registry::{self, Declaration, ParserEntry},
    request::Request,
};


/// Returns `true` for methods whose body is parsed.
pub fn has_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

/// Body parsing engine.
///
/// Holds the ordered parser list, resolved once by [`Builder::build`]. The
/// engine is cheap to clone and can be shared between any number of
/// concurrently handled requests.
#[derive(Clone)]
pub struct Parsers {
    inner: Arc<Inner>,
}

struct Inner {
    entries: Vec<ParserEntry>,
    pass: Vec<String>,
    query_string_length: usize,
}

impl Parsers {
    /// Start building an engine.
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Build an engine from a configuration document.
    pub fn from_config(config: ParsersConfig) -> Result<Self, ConfigError> {
        config.into_builder().build()
    }

    /// Resolved parsers, in declaration order.
    pub fn entries(&self) -> &[ParserEntry] {
        &self.inner.entries
    }

    /// Accepted media type patterns.
    pub fn pass(&self) -> &[String] {
        &self.inner.pass
    }

    /// Parse the request body and merge all parameters.
    ///
    /// Only `POST`, `PUT`, `PATCH` and `DELETE` requests whose body parameters
    /// are not fetched yet have their body parsed. Other requests only get
    /// their query and path parameters merged, on top of any body parameters
    /// they already have.
    ///
    /// On success, [`Request::body_params`] holds what the parser produced and
    /// [`Request::params`] holds the merged view, path parameters winning over
    /// body parameters, which win over query parameters.
    pub async fn call(&self, req: &mut Request) -> Result<(), Error> {
        let limit = self.inner.query_string_length;

        if !has_body(req.method()) || !req.body_params().is_unfetched() {
            let body_params = req.body_params().fetched().cloned().unwrap_or_default();
            return params::merge(req, body_params, limit);
        }

        req.fetch_query_params(limit)?;

        let body_params = match req.content_type() {
            Some(content_type) => {
                let media = MediaType::parse_lossy(&content_type);
                self.reduce(req, &media).await?
            }
            None => ParamMap::new(),
        };

        params::merge(req, body_params, limit)
    }

    async fn reduce(&self, req: &mut Request, media: &MediaType) -> Result<ParamMap, Error> {
        for entry in &self.inner.entries {
            let parser = entry.parser.as_parser();
            match parser.parse(req, media, entry.config()).await? {
                Outcome::Handled(params) => {
                    debug!("{} parsed {media}", entry.identifier());
                    return Ok(params);
                }
                Outcome::Pass => {}
                Outcome::TooLarge => {
                    warning!("{} rejected a {media} body as too large", entry.identifier());
                    return Err(Error::TooLarge);
                }
            }
        }

        if media.is_accepted_by(self.inner.pass.as_slice()) {
            debug!("no parser for {media}, accepted by pass list");
            return Ok(ParamMap::new());
        }

        let media_type = media.essence();
        warning!("unsupported media type {media_type}");
        Err(Error::UnsupportedMediaType { media_type })
    }
}

impl fmt::Debug for Parsers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parsers")
            .field("entries", &self.inner.entries)
            .field("pass", &self.inner.pass)
            .field("query_string_length", &self.inner.query_string_length)
            .finish()
    }
}

// ===== Builder =====

/// Builder for [`Parsers`].
pub struct Builder {
    declarations: Vec<Declaration>,
    pass: Vec<String>,
    query_string_length: usize,
    options: Options,
    body_reader: Arc<dyn BodyReader>,
    custom: HashMap<String, Arc<dyn Parser>>,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            declarations: Vec::new(),
            pass: Vec::new(),
            query_string_length: DEFAULT_QUERY_STRING_LENGTH,
            options: Options::new(),
            body_reader: Arc::new(Incoming),
            custom: HashMap::new(),
        }
    }

    /// Append a parser by identifier.
    pub fn parser(self, identifier: impl Into<String>) -> Self {
        self.declare(Declaration::Name(identifier.into()))
    }

    /// Append a parser with its own options.
    pub fn parser_with(self, identifier: impl Into<String>, options: Options) -> Self {
        self.declare(Declaration::WithOptions(identifier.into(), options))
    }

    /// Append a parser declaration.
    pub fn declare(mut self, declaration: impl Into<Declaration>) -> Self {
        self.declarations.push(declaration.into());
        self
    }

    /// Add accepted media type patterns.
    pub fn pass<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pass.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Set the maximum query string length.
    pub fn query_string_length(mut self, length: usize) -> Self {
        self.query_string_length = length;
        self
    }

    /// Set a root option shared by all parsers.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.options.insert(key, value);
        self
    }

    /// Replace the root options.
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Replace the body reader used by every parser.
    pub fn body_reader(mut self, reader: impl BodyReader) -> Self {
        self.body_reader = Arc::new(reader);
        self
    }

    /// Make a custom parser available under `identifier`.
    pub fn register(mut self, identifier: impl Into<String>, parser: impl Parser) -> Self {
        self.custom.insert(identifier.into(), Arc::new(parser));
        self
    }

    /// Resolve all declarations.
    ///
    /// Fails if no parser is declared, an identifier is unknown, or a parser
    /// rejects its options.
    pub fn build(self) -> Result<Parsers, ConfigError> {
        let entries = registry::build(
            &self.declarations,
            &self.options,
            &self.custom,
            &self.body_reader,
        )?;

        Ok(Parsers {
            inner: Arc::new(Inner {
                entries,
                pass: self.pass,
                query_string_length: self.query_string_length,
            }),
        })
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("declarations", &self.declarations)
            .field("pass", &self.pass)
            .field("query_string_length", &self.query_string_length)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
