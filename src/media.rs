//! Media type decoding of the `content-type` header.
use std::{collections::BTreeMap, fmt};

/// Decoded `type/subtype; key=value` media type.
///
/// Type, subtype and parameter names are lower-cased. Parameter values are
/// kept as sent, with quotes and escapes removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    ty: String,
    subtype: String,
    params: BTreeMap<String, String>,
}

impl MediaType {
    /// Parse a `content-type` header value.
    pub fn parse(value: &str) -> Result<Self, NotAMediaType> {
        let (essence, params) = match value.split_once(';') {
            Some((essence, params)) => (essence, Some(params)),
            None => (value, None),
        };

        let (ty, subtype) = essence.split_once('/').ok_or(NotAMediaType)?;
        let ty = ty.trim();
        let subtype = subtype.trim();

        if !is_token(ty) || !is_token(subtype) {
            return Err(NotAMediaType);
        }

        Ok(Self {
            ty: ty.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            params: params.map(parse_params).unwrap_or_default(),
        })
    }

    /// Parse a header value, treating an unrecognizable one as an opaque type
    /// with empty subtype and no parameters.
    pub fn parse_lossy(value: &str) -> Self {
        Self::parse(value).unwrap_or_else(|NotAMediaType| Self {
            ty: value.to_owned(),
            subtype: String::new(),
            params: BTreeMap::new(),
        })
    }

    #[inline]
    pub fn ty(&self) -> &str {
        &self.ty
    }

    #[inline]
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    #[inline]
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Returns a parameter by its lower-cased name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Returns `true` if type and subtype equal the given, already lower-cased, values.
    pub fn is(&self, ty: &str, subtype: &str) -> bool {
        self.ty == ty && self.subtype == subtype
    }

    /// Returns `"type/subtype"`, without parameters.
    pub fn essence(&self) -> String {
        format!("{}/{}", self.ty, self.subtype)
    }

    /// Returns `true` if a pass list accepts this media type.
    ///
    /// Patterns are `"*/*"`, `"type/*"` or an exact `"type/subtype"`.
    pub fn is_accepted_by<S: AsRef<str>>(&self, pass: &[S]) -> bool {
        let essence = self.essence();
        let wildcard = format!("{}/*", self.ty);
        pass.iter()
            .map(AsRef::as_ref)
            .any(|pattern| pattern == "*/*" || pattern == essence || pattern == wildcard)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.ty, self.subtype)?;
        for (key, value) in &self.params {
            write!(f, "; {key}={value}")?;
        }
        Ok(())
    }
}

/// `tchar` from RFC 9110.
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}

fn parse_params(src: &str) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    let mut rest = src;

    loop {
        rest = rest.trim_start_matches([' ', '\t', ';']);
        if rest.is_empty() {
            break;
        }

        let end = rest.find([';', '=']).unwrap_or(rest.len());
        if !rest[end..].starts_with('=') {
            // pair without value
            rest = &rest[end..];
            continue;
        }
        let key = rest[..end].trim();
        let after = &rest[end + 1..];

        let (value, after) = match after.trim_start().strip_prefix('"') {
            Some(quoted) => unquote(quoted),
            None => match after.split_once(';') {
                Some((value, after)) => (value.trim().to_owned(), after),
                None => (after.trim().to_owned(), ""),
            },
        };
        rest = after;

        if is_token(key) {
            params.insert(key.to_ascii_lowercase(), value);
        }
    }

    params
}

/// Read a quoted string whose opening quote is already consumed.
///
/// Returns the unescaped value and the remaining input after the closing
/// quote. An unterminated string takes the rest of the input.
fn unquote(src: &str) -> (String, &str) {
    let mut value = String::new();
    let mut chars = src.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => {
                let after = &src[i + 1..];
                let after = after.split_once(';').map_or("", |(_, after)| after);
                return (value, after);
            }
            '\\' => {
                if let Some((_, escaped)) = chars.next() {
                    value.push(escaped);
                }
            }
            c => value.push(c),
        }
    }

    (value, "")
}

// ===== Error =====

/// Header value has no recognizable `type/subtype`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotAMediaType;

impl std::error::Error for NotAMediaType {}

impl fmt::Display for NotAMediaType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("not a media type")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_media_type() {
        let media = MediaType::parse("Application/JSON").unwrap();
        assert_eq!(media.ty(), "application");
        assert_eq!(media.subtype(), "json");
        assert!(media.params().is_empty());

        let media = MediaType::parse(" text/plain ; Charset=UTF-8 ").unwrap();
        assert!(media.is("text", "plain"));
        assert_eq!(media.param("charset"), Some("UTF-8"));
    }

    #[test]
    fn parse_quoted_params() {
        let media = MediaType::parse(
            r#"multipart/form-data; boundary="a;b\"c"; charset=utf-8"#,
        )
        .unwrap();
        assert_eq!(media.param("boundary"), Some(r#"a;b"c"#));
        assert_eq!(media.param("charset"), Some("utf-8"));

        let media = MediaType::parse("multipart/form-data;boundary=----abc").unwrap();
        assert_eq!(media.param("boundary"), Some("----abc"));
    }

    #[test]
    fn parse_skips_broken_params() {
        let media = MediaType::parse("text/plain; garbage; a=1;; b = 2").unwrap();
        assert_eq!(media.param("a"), Some("1"));
        assert_eq!(media.param("b"), Some("2"));
    }

    #[test]
    fn reject_malformed() {
        for value in ["", "   ", "text", "text/", "/plain", "te xt/plain", "text/pl ain", "a/b/c"] {
            assert_eq!(MediaType::parse(value), Err(NotAMediaType), "{value:?}");
        }
    }

    #[test]
    fn lossy_fallback_is_opaque() {
        for value in ["", "   ", "garbage", "text/", "a/b/c; x=1"] {
            let media = MediaType::parse_lossy(value);
            assert_eq!(media.ty(), value);
            assert_eq!(media.subtype(), "");
            assert!(media.params().is_empty());
        }
    }

    #[test]
    fn pass_list() {
        let media = MediaType::parse("text/unknown").unwrap();
        assert!(media.is_accepted_by(&["text/*"]));
        assert!(media.is_accepted_by(&["text/unknown"]));
        assert!(media.is_accepted_by(&["*/*"]));
        assert!(!media.is_accepted_by(&["text/plain", "application/*"]));
        assert!(!media.is_accepted_by::<&str>(&[]));
    }
}
