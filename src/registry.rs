//! Parser declarations and their resolution.
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};

use crate::{
    body::BodyReader,
    error::ConfigError,
    log::debug,
    options::Options,
    parser::{Parser, ParserConfig, ParserKind},
};

/// A parser as declared in the engine configuration.
///
/// In a configuration document, a declaration is either a bare string or a
/// `[identifier, {options}]` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Declaration {
    /// A parser with no options of its own.
    Name(String),
    /// A parser with options overriding the root options.
    WithOptions(String, Options),
}

impl Declaration {
    pub fn identifier(&self) -> &str {
        match self {
            Self::Name(name) | Self::WithOptions(name, _) => name,
        }
    }
}

impl From<&str> for Declaration {
    fn from(v: &str) -> Self {
        Self::Name(v.to_owned())
    }
}

impl From<String> for Declaration {
    fn from(v: String) -> Self {
        Self::Name(v)
    }
}

impl<S: Into<String>> From<(S, Options)> for Declaration {
    fn from((name, options): (S, Options)) -> Self {
        Self::WithOptions(name.into(), options)
    }
}

/// Resolved parser with its configuration.
#[derive(Debug, Clone)]
pub struct ParserEntry {
    identifier: String,
    pub(crate) parser: ParserKind,
    config: ParserConfig,
}

impl ParserEntry {
    #[inline]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    #[inline]
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }
}

/// Resolve declarations into parser entries, keeping their order.
///
/// Short names resolve to built-in parsers, any other identifier must be a
/// key of `custom`.
pub(crate) fn build(
    declarations: &[Declaration],
    root: &Options,
    custom: &HashMap<String, Arc<dyn Parser>>,
    body_reader: &Arc<dyn BodyReader>,
) -> Result<Vec<ParserEntry>, ConfigError> {
    if declarations.is_empty() {
        return Err(ConfigError::NoParsers);
    }

    declarations
        .iter()
        .map(|declaration| {
            let identifier = declaration.identifier();

            let parser = ParserKind::builtin(identifier)
                .or_else(|| custom.get(identifier).cloned().map(ParserKind::Custom))
                .ok_or_else(|| ConfigError::UnknownParser(identifier.to_owned()))?;

            let options = match declaration {
                Declaration::Name(_) => root.clone(),
                Declaration::WithOptions(_, options) => root.merge(options),
            };

            let options = parser.as_parser().init(options).map_err(|err| ConfigError::Init {
                parser: identifier.to_owned(),
                message: err.to_string(),
            })?;

            debug!("resolved parser {identifier} as {parser:?}");

            Ok(ParserEntry {
                identifier: identifier.to_owned(),
                parser,
                config: ParserConfig::new(options, body_reader.clone()),
            })
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        body::Incoming,
        error::{BoxError, Error},
        media::MediaType,
        parser::Outcome,
        request::Request,
    };
    use futures_core::future::BoxFuture;

    struct Tagged;

    impl Parser for Tagged {
        fn init(&self, options: Options) -> Result<Options, BoxError> {
            match options.get_str("tag") {
                Some(_) => Ok(options.with("initialized", true)),
                None => Err("missing tag".into()),
            }
        }

        fn parse<'a>(
            &'a self,
            _: &'a mut Request,
            _: &'a MediaType,
            _: &'a ParserConfig,
        ) -> BoxFuture<'a, Result<Outcome, Error>> {
            Box::pin(async { Ok(Outcome::Pass) })
        }
    }

    fn resolve(
        declarations: &[Declaration],
        root: &Options,
    ) -> Result<Vec<ParserEntry>, ConfigError> {
        let mut custom = HashMap::<String, Arc<dyn Parser>>::new();
        custom.insert("app::Tagged".into(), Arc::new(Tagged));
        let reader: Arc<dyn BodyReader> = Arc::new(Incoming);
        build(declarations, root, &custom, &reader)
    }

    #[test]
    fn empty_declarations() {
        let err = resolve(&[], &Options::new()).unwrap_err();
        assert!(matches!(err, ConfigError::NoParsers));
    }

    #[test]
    fn order_is_kept() {
        let entries = resolve(
            &["json".into(), "urlencoded".into(), "multipart".into()],
            &Options::new(),
        )
        .unwrap();
        let ids: Vec<_> = entries.iter().map(ParserEntry::identifier).collect();
        assert_eq!(ids, ["json", "urlencoded", "multipart"]);
        assert!(matches!(entries[0].parser, ParserKind::Json(_)));
        assert!(matches!(entries[1].parser, ParserKind::UrlEncoded(_)));
        assert!(matches!(entries[2].parser, ParserKind::Multipart(_)));
    }

    #[test]
    fn per_parser_options_win() {
        let root = Options::new().with("length", 10).with("read_timeout", 100);
        let entries = resolve(
            &[("json", Options::new().with("length", 20)).into(), "urlencoded".into()],
            &root,
        )
        .unwrap();

        let json = entries[0].config().options();
        assert_eq!(json.get_u64("length"), Some(20));
        assert_eq!(json.get_u64("read_timeout"), Some(100));

        let urlencoded = entries[1].config().options();
        assert_eq!(urlencoded.get_u64("length"), Some(10));
        // filled by the init hook
        assert_eq!(urlencoded.get_bool("validate_utf8"), Some(true));
    }

    #[test]
    fn builtin_defaults() {
        let entries = resolve(&["urlencoded".into(), "json".into()], &Options::new()).unwrap();
        assert_eq!(entries[0].config().options().get_u64("length"), Some(1_000_000));
        assert_eq!(entries[1].config().options().get_u64("length"), Some(8_000_000));
    }

    #[test]
    fn custom_parser() {
        let entries = resolve(
            &[("app::Tagged", Options::new().with("tag", "x")).into()],
            &Options::new(),
        )
        .unwrap();
        assert!(matches!(entries[0].parser, ParserKind::Custom(_)));
        assert_eq!(entries[0].config().options().get_bool("initialized"), Some(true));
    }

    #[test]
    fn init_failure() {
        let err = resolve(&["app::Tagged".into()], &Options::new()).unwrap_err();
        let ConfigError::Init { parser, message } = err else { panic!("expected init error") };
        assert_eq!(parser, "app::Tagged");
        assert_eq!(message, "missing tag");
    }

    #[test]
    fn unknown_parser() {
        let err = resolve(&["xml".into()], &Options::new()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownParser(name) if name == "xml"));
    }

    #[test]
    fn deserialize_declarations() {
        let declarations: Vec<Declaration> =
            serde_json::from_str(r#"["urlencoded", ["json", {"length": 5}]]"#).unwrap();
        assert_eq!(declarations[0], Declaration::Name("urlencoded".into()));
        assert_eq!(
            declarations[1],
            Declaration::WithOptions("json".into(), Options::new().with("length", 5))
        );
    }
}
