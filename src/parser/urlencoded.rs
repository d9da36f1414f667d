use futures_core::future::BoxFuture;

use super::{Outcome, Parser, ParserConfig};
use crate::{
    error::{BoxError, Error},
    media::MediaType,
    options::Options,
    params::query,
    request::Request,
};

/// Parser for `application/x-www-form-urlencoded` bodies.
///
/// Options:
///
/// - `length`, maximum body size, default `1_000_000`
/// - `read_timeout`, milliseconds to wait for each chunk
/// - `validate_utf8`, reject bodies that are not UTF-8, default `true`
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlEncoded;

impl UrlEncoded {
    pub const DEFAULT_LENGTH: u64 = 1_000_000;
}

impl Parser for UrlEncoded {
    fn init(&self, mut options: Options) -> Result<Options, BoxError> {
        options.insert_default("length", Self::DEFAULT_LENGTH);
        options.insert_default("validate_utf8", true);
        Ok(options)
    }

    fn parse<'a>(
        &'a self,
        req: &'a mut Request,
        media: &'a MediaType,
        config: &'a ParserConfig,
    ) -> BoxFuture<'a, Result<Outcome, Error>> {
        Box::pin(async move {
            if !media.is("application", "x-www-form-urlencoded") {
                return Ok(Outcome::Pass);
            }

            let Some(body) = config.read_body(req).await? else {
                return Ok(Outcome::TooLarge);
            };

            let params = if config.options().get_bool("validate_utf8").unwrap_or(true) {
                query::decode(&body).map_err(|err| Error::bad_encoding(err.to_string()))?
            } else {
                query::decode_lossy(&body)
            };

            Ok(Outcome::Handled(params))
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{params, parser::test_util::parse};
    use http::{HeaderValue, Method, header::CONTENT_TYPE};

    fn request(content_type: &str, body: &'static str) -> Request {
        Request::new(Method::POST, "/".parse().unwrap())
            .with_header(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap())
            .with_body(body)
    }

    #[tokio::test]
    async fn parses_form() {
        let req = request("application/x-www-form-urlencoded", "a=1&b=2");
        let outcome = parse(&UrlEncoded, req, Options::new()).await.unwrap();
        assert_eq!(outcome, Outcome::Handled(params! { "a" => "1", "b" => "2" }));
    }

    #[tokio::test]
    async fn charset_param_is_ignored() {
        let req = request("application/x-www-form-urlencoded; charset=utf-8", "a[b]=1");
        let outcome = parse(&UrlEncoded, req, Options::new()).await.unwrap();
        assert_eq!(outcome, Outcome::Handled(params! { "a" => params! { "b" => "1" } }));
    }

    #[tokio::test]
    async fn passes_other_types() {
        let req = request("application/json", "{}");
        let outcome = parse(&UrlEncoded, req, Options::new()).await.unwrap();
        assert_eq!(outcome, Outcome::Pass);
    }

    #[tokio::test]
    async fn too_large() {
        let req = request("application/x-www-form-urlencoded", "a=1234567890");
        let outcome = parse(&UrlEncoded, req, Options::new().with("length", 5)).await.unwrap();
        assert_eq!(outcome, Outcome::TooLarge);
    }

    #[tokio::test]
    async fn bad_encoding() {
        let req = request("application/x-www-form-urlencoded", "a=%FF");
        let err = parse(&UrlEncoded, req, Options::new()).await.unwrap_err();
        assert!(matches!(err, Error::BadEncoding { .. }));

        let req = request("application/x-www-form-urlencoded", "a=%FF");
        let options = Options::new().with("validate_utf8", false);
        let outcome = parse(&UrlEncoded, req, options).await.unwrap();
        assert_eq!(outcome, Outcome::Handled(params! { "a" => "\u{FFFD}" }));
    }

    #[test]
    fn init_fills_defaults() {
        let options = UrlEncoded.init(Options::new().with("length", 10)).unwrap();
        assert_eq!(options.get_u64("length"), Some(10));
        assert_eq!(options.get_bool("validate_utf8"), Some(true));

        let options = UrlEncoded.init(Options::new()).unwrap();
        assert_eq!(options.get_u64("length"), Some(UrlEncoded::DEFAULT_LENGTH));
    }
}
