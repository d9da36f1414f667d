use bytes::Bytes;
use futures_core::future::BoxFuture;
use http::header::CONTENT_TYPE;
use multer::{Constraints, SizeLimit};

use super::{Outcome, Parser, ParserConfig};
use crate::{
    body::Body,
    error::{BoxError, Error},
    media::MediaType,
    options::Options,
    params::{ParamMap, ParamValue, Upload, query},
    request::Request,
};

/// Parser for `multipart/form-data` and `multipart/mixed` bodies.
///
/// Parts with a filename become [`Upload`]s, other parts become strings. Part
/// names may use brackets like url-encoded keys.
///
/// Options:
///
/// - `length`, maximum body size, default `8_000_000`
/// - `read_timeout`, milliseconds to wait for each chunk
/// - `validate_utf8`, reject fields that are not UTF-8, default `true`
/// - `include_unnamed_parts_at`, key collecting parts without a name, which
///   are dropped otherwise
#[derive(Debug, Clone, Copy, Default)]
pub struct Multipart;

impl Multipart {
    pub const DEFAULT_LENGTH: u64 = 8_000_000;
}

impl Parser for Multipart {
    fn init(&self, mut options: Options) -> Result<Options, BoxError> {
        options.insert_default("length", Self::DEFAULT_LENGTH);
        options.insert_default("validate_utf8", true);
        if let Some(key) = options.get("include_unnamed_parts_at") {
            if !key.is_string() {
                return Err("`include_unnamed_parts_at` must be a string".into());
            }
        }
        Ok(options)
    }

    fn parse<'a>(
        &'a self,
        req: &'a mut Request,
        media: &'a MediaType,
        config: &'a ParserConfig,
    ) -> BoxFuture<'a, Result<Outcome, Error>> {
        Box::pin(async move {
            if media.ty() != "multipart" || !matches!(media.subtype(), "form-data" | "mixed") {
                return Ok(Outcome::Pass);
            }

            let Some(boundary) = media.param("boundary") else {
                return Err(Error::parse("multipart", multer::Error::NoBoundary));
            };

            let Some(body) = config.read_body(req).await? else {
                return Ok(Outcome::TooLarge);
            };

            let options = config.options();
            let length = options.get_u64("length").unwrap_or(u64::MAX);
            let limit = SizeLimit::new().whole_stream(length);
            let mut multipart = multer::Multipart::with_constraints(
                Body::from(skip_preamble(body, boundary)),
                boundary,
                Constraints::new().size_limit(limit),
            );

            match collect(&mut multipart, options).await {
                Ok(params) => Ok(Outcome::Handled(params)),
                Err(Failure::Multer(
                    multer::Error::StreamSizeExceeded { .. } | multer::Error::FieldSizeExceeded { .. },
                )) => Ok(Outcome::TooLarge),
                Err(Failure::Multer(err)) => Err(Error::parse("multipart", err)),
                Err(Failure::Param(err)) => Err(err),
            }
        })
    }
}

enum Failure {
    Multer(multer::Error),
    Param(Error),
}

impl From<multer::Error> for Failure {
    fn from(v: multer::Error) -> Self {
        Self::Multer(v)
    }
}

impl From<Error> for Failure {
    fn from(v: Error) -> Self {
        Self::Param(v)
    }
}

/// Drop the preamble up to the first delimiter that starts a line.
fn skip_preamble(body: Bytes, boundary: &str) -> Bytes {
    let delimiter = format!("--{boundary}");
    let mut pos = 0;
    loop {
        if body[pos..].starts_with(delimiter.as_bytes()) {
            return body.slice(pos..);
        }
        match body[pos..].windows(2).position(|w| w == b"\r\n") {
            Some(end) => pos += end + 2,
            None => return body,
        }
    }
}

async fn collect(
    multipart: &mut multer::Multipart<'_>,
    options: &Options,
) -> Result<ParamMap, Failure> {
    let validate_utf8 = options.get_bool("validate_utf8").unwrap_or(true);
    let unnamed_key = options.get_str("include_unnamed_parts_at");

    let mut params = ParamMap::new();
    let mut unnamed = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        let filename = field.file_name().map(str::to_owned);

        let value = match filename {
            Some(filename) if filename.is_empty() => continue,
            Some(filename) => {
                let content_type = field
                    .headers()
                    .get(CONTENT_TYPE)
                    .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());
                ParamValue::Upload(Upload { filename, content_type, data: field.bytes().await? })
            }
            None if name.is_none() => {
                let headers = field
                    .headers()
                    .iter()
                    .map(|(k, v)| {
                        let value = String::from_utf8_lossy(v.as_bytes()).into_owned();
                        (k.as_str().to_owned(), ParamValue::from(value))
                    })
                    .collect::<ParamMap>();
                let body = field.bytes().await?;
                ParamValue::Map(ParamMap::from([
                    ("headers".to_owned(), ParamValue::Map(headers)),
                    ("body".to_owned(), text(&body, validate_utf8)?),
                ]))
            }
            None => text(&field.bytes().await?, validate_utf8)?,
        };

        match name {
            Some(name) => query::insert(&mut params, &name, value),
            None => unnamed.push(value),
        }
    }

    if let Some(key) = unnamed_key {
        params.insert(key.to_owned(), ParamValue::List(unnamed));
    }

    Ok(params)
}

fn text(data: &[u8], validate_utf8: bool) -> Result<ParamValue, Error> {
    match std::str::from_utf8(data) {
        Ok(value) => Ok(value.into()),
        Err(_) if validate_utf8 => Err(Error::bad_encoding("invalid UTF-8 in multipart field")),
        Err(_) => Ok(String::from_utf8_lossy(data).into_owned().into()),
    }
}
