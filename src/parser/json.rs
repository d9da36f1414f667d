use futures_core::future::BoxFuture;
use serde_json::Value;

use super::{Outcome, Parser, ParserConfig};
use crate::{
    error::{BoxError, Error},
    media::MediaType,
    options::Options,
    params::{ParamMap, ParamValue},
    request::Request,
};

/// Parser for `application/json` and `application/*+json` bodies.
///
/// A JSON object becomes the body parameters. Any other JSON value is put
/// under the `_json` key.
///
/// Options:
///
/// - `length`, maximum body size, default `8_000_000`
/// - `read_timeout`, milliseconds to wait for each chunk
/// - `nest_all_json`, put objects under `_json` too, default `false`
#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl Json {
    pub const DEFAULT_LENGTH: u64 = 8_000_000;

    /// Key holding JSON bodies that are not objects.
    pub const NESTED_KEY: &'static str = "_json";
}

fn is_json(media: &MediaType) -> bool {
    media.ty() == "application"
        && (media.subtype() == "json" || media.subtype().ends_with("+json"))
}

impl Parser for Json {
    fn init(&self, mut options: Options) -> Result<Options, BoxError> {
        options.insert_default("length", Self::DEFAULT_LENGTH);
        Ok(options)
    }

    fn parse<'a>(
        &'a self,
        req: &'a mut Request,
        media: &'a MediaType,
        config: &'a ParserConfig,
    ) -> BoxFuture<'a, Result<Outcome, Error>> {
        Box::pin(async move {
            if !is_json(media) {
                return Ok(Outcome::Pass);
            }

            let Some(body) = config.read_body(req).await? else {
                return Ok(Outcome::TooLarge);
            };

            if body.is_empty() {
                return Ok(Outcome::Handled(ParamMap::new()));
            }

            let value: Value =
                serde_json::from_slice(&body).map_err(|err| Error::parse("json", err))?;
            let nest_all = config.options().get_bool("nest_all_json").unwrap_or(false);

            let params = match value {
                Value::Object(map) if !nest_all => {
                    map.into_iter().map(|(k, v)| (k, ParamValue::from(v))).collect()
                }
                value => ParamMap::from([(Self::NESTED_KEY.to_owned(), ParamValue::from(value))]),
            };

            Ok(Outcome::Handled(params))
        })
    }
}
