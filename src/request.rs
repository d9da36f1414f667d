//! Request context.
use http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method, Uri, header::CONTENT_TYPE};
use serde::de::DeserializeOwned;

use crate::{
    body::Body,
    error::Error,
    log::debug,
    params::{ParamMap, query},
};

/// Lazily fetched request field.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Fetch<T> {
    /// Not fetched yet.
    #[default]
    Unfetched,
    /// Fetched value.
    Fetched(T),
    /// Fetching failed with the given message.
    Failed(String),
}

impl<T> Fetch<T> {
    #[inline]
    pub fn is_unfetched(&self) -> bool {
        matches!(self, Self::Unfetched)
    }

    /// Returns the fetched value, if any.
    #[inline]
    pub fn fetched(&self) -> Option<&T> {
        match self {
            Self::Fetched(value) => Some(value),
            _ => None,
        }
    }

    #[inline]
    pub fn into_fetched(self) -> Option<T> {
        match self {
            Self::Fetched(value) => Some(value),
            _ => None,
        }
    }
}

/// Request context handed to the parsers.
///
/// A request is owned by the transport and processed by one task at a time.
/// The body can only be read once.
#[derive(Debug, Default)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    extensions: Extensions,
    body: Body,
    path_params: ParamMap,
    query_params: Fetch<ParamMap>,
    body_params: Fetch<ParamMap>,
    params: Fetch<ParamMap>,
}

/// Constructor
impl Request {
    /// Create [`Request`] with empty headers and body.
    pub fn new(method: Method, uri: Uri) -> Self {
        Self { method, uri, ..Default::default() }
    }

    /// Create [`Request`] from [`http::request::Parts`] and [`Body`].
    pub fn from_parts(parts: http::request::Parts, body: Body) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            extensions: parts.extensions,
            body,
            ..Default::default()
        }
    }

    /// Set the request body.
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Append a header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }
}

impl From<http::Request<Body>> for Request {
    fn from(req: http::Request<Body>) -> Self {
        let (parts, body) = req.into_parts();
        Self::from_parts(parts, body)
    }
}

impl Request {
    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[inline]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    #[inline]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    #[inline]
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    #[inline]
    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Returns the first `content-type` header value.
    ///
    /// A value that is not visible ASCII is returned lossily.
    pub fn content_type(&self) -> Option<String> {
        let value = self.headers.get(CONTENT_TYPE)?;
        Some(String::from_utf8_lossy(value.as_bytes()).into_owned())
    }

    /// Parameters captured by the router.
    #[inline]
    pub fn path_params(&self) -> &ParamMap {
        &self.path_params
    }

    #[inline]
    pub fn path_params_mut(&mut self) -> &mut ParamMap {
        &mut self.path_params
    }

    #[inline]
    pub fn query_params(&self) -> &Fetch<ParamMap> {
        &self.query_params
    }

    /// Parameters produced by the parser that claimed the body.
    #[inline]
    pub fn body_params(&self) -> &Fetch<ParamMap> {
        &self.body_params
    }

    /// Merged query, body and path parameters.
    #[inline]
    pub fn params(&self) -> &Fetch<ParamMap> {
        &self.params
    }

    pub fn set_body_params(&mut self, params: ParamMap) {
        self.body_params = Fetch::Fetched(params);
    }

    pub fn set_params(&mut self, params: ParamMap) {
        self.params = Fetch::Fetched(params);
    }

    /// Fetch and cache query parameters.
    ///
    /// Query strings longer than `length` bytes are rejected. Once fetched, the
    /// cached result is returned without decoding again.
    pub fn fetch_query_params(&mut self, length: usize) -> Result<&ParamMap, Error> {
        if self.query_params.is_unfetched() {
            let query = self.uri.query().unwrap_or_default();
            self.query_params = if query.len() > length {
                Fetch::Failed(format!(
                    "maximum query string length is {length}, got a query with {} bytes",
                    query.len(),
                ))
            } else {
                match query::decode(query.as_bytes()) {
                    Ok(map) => Fetch::Fetched(map),
                    Err(err) => Fetch::Failed(err.to_string()),
                }
            };
            debug!("fetched query params of {} bytes", query.len());
        }

        match &self.query_params {
            Fetch::Fetched(map) => Ok(map),
            Fetch::Failed(message) => Err(Error::InvalidQuery { message: message.clone() }),
            Fetch::Unfetched => unreachable!("query params fetched above"),
        }
    }

    /// Deserialize the merged parameters into `T`.
    ///
    /// Unfetched parameters deserialize as an empty map.
    pub fn params_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        let value = match &self.params {
            Fetch::Fetched(map) => serde_json::to_value(map)?,
            _ => serde_json::Value::Object(<_>::default()),
        };
        serde_json::from_value(value)
    }
}
