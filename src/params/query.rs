//! `application/x-www-form-urlencoded` decoding.
//!
//! Used for the query string, url-encoded bodies, and multipart field names.
//! Keys may use brackets to build nested values:
//!
//! - `a=1` is `{"a": "1"}`
//! - `a[b]=1` is `{"a": {"b": "1"}}`
//! - `a[]=1&a[]=2` is `{"a": ["1", "2"]}`
//!
//! Later values override earlier ones for the same key.
use percent_encoding::percent_decode;
use std::{borrow::Cow, fmt};

use super::{ParamMap, ParamValue};

/// Decode an url-encoded string into a [`ParamMap`].
///
/// Returns an error if a key or value is not valid UTF-8 after
/// percent-decoding.
pub fn decode(src: &[u8]) -> Result<ParamMap, DecodeError> {
    decode_with(src, false)
}

/// Decode an url-encoded string, replacing invalid UTF-8 sequences with
/// `U+FFFD`.
pub fn decode_lossy(src: &[u8]) -> ParamMap {
    match decode_with(src, true) {
        Ok(map) => map,
        Err(DecodeError) => unreachable!("lossy decoding does not fail"),
    }
}

fn decode_with(src: &[u8], lossy: bool) -> Result<ParamMap, DecodeError> {
    let mut map = ParamMap::new();
    for pair in src.split(|&b| b == b'&') {
        if pair.is_empty() {
            continue;
        }

        let (key, value) = match pair.iter().position(|&b| b == b'=') {
            Some(i) => (&pair[..i], &pair[i + 1..]),
            None => (pair, &[][..]),
        };

        let key = decode_component(key, lossy)?;
        let value = decode_component(value, lossy)?;
        insert(&mut map, &key, ParamValue::String(value));
    }
    Ok(map)
}

/// Insert a value under a possibly bracketed key.
pub fn insert(map: &mut ParamMap, key: &str, value: ParamValue) {
    let (root, segments) = split_key(key);
    if root.is_empty() {
        return;
    }
    insert_segments(map, root, &segments, value);
}

fn decode_component(src: &[u8], lossy: bool) -> Result<String, DecodeError> {
    let replaced: Cow<[u8]> = if src.contains(&b'+') {
        Cow::Owned(src.iter().map(|&b| if b == b'+' { b' ' } else { b }).collect())
    } else {
        Cow::Borrowed(src)
    };

    let decoded = percent_decode(&replaced);
    if lossy {
        return Ok(decoded.decode_utf8_lossy().into_owned());
    }
    match decoded.decode_utf8() {
        Ok(ok) => Ok(ok.into_owned()),
        Err(_) => Err(DecodeError),
    }
}

/// Split `a[b][]` into `a` and `["b", ""]`.
///
/// A key with unbalanced brackets is used verbatim as the root.
fn split_key(key: &str) -> (&str, Vec<&str>) {
    let Some(open) = key.find('[') else {
        return (key, Vec::new());
    };

    let (root, mut rest) = key.split_at(open);
    let mut segments = Vec::new();

    while let Some(inner) = rest.strip_prefix('[') {
        let Some(close) = inner.find(']') else {
            return (key, Vec::new());
        };
        segments.push(&inner[..close]);
        rest = &inner[close + 1..];
    }

    if !rest.is_empty() {
        return (key, Vec::new());
    }

    (root, segments)
}

fn insert_segments(map: &mut ParamMap, key: &str, segments: &[&str], value: ParamValue) {
    let Some((next, rest)) = segments.split_first() else {
        map.insert(key.to_owned(), value);
        return;
    };

    let entry = map.entry(key.to_owned()).or_insert(ParamValue::Null);

    if next.is_empty() {
        if !matches!(entry, ParamValue::List(_)) {
            *entry = ParamValue::List(Vec::new());
        }
        let ParamValue::List(list) = entry else { unreachable!() };

        match rest.split_first() {
            None => list.push(value),
            Some((child, rest)) => {
                // `a[][b]=1` starts a new map unless the last one lacks `b`
                let reuse = matches!(
                    list.last(),
                    Some(ParamValue::Map(last)) if !last.contains_key(*child)
                );
                if !reuse {
                    list.push(ParamValue::Map(ParamMap::new()));
                }
                if let Some(ParamValue::Map(last)) = list.last_mut() {
                    insert_segments(last, child, rest, value);
                }
            }
        }
        return;
    }

    if !matches!(entry, ParamValue::Map(_)) {
        *entry = ParamValue::Map(ParamMap::new());
    }
    if let ParamValue::Map(child) = entry {
        insert_segments(child, next, rest, value);
    }
}

// ===== Error =====

/// Url-encoded input is not valid UTF-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeError;

impl std::error::Error for DecodeError {}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("invalid UTF-8 in url-encoded data")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::params;

    #[test]
    fn flat_pairs() {
        let map = decode(b"a=1&b=2&&c&d=").unwrap();
        assert_eq!(map, params! { "a" => "1", "b" => "2", "c" => "", "d" => "" });
    }

    #[test]
    fn percent_and_plus() {
        let map = decode(b"na+me=J%C3%A9r%C3%B4me+D&x%5By%5D=%2B").unwrap();
        assert_eq!(map["na me"], ParamValue::from("Jérôme D"));
        assert_eq!(map["x"], ParamValue::from(params! { "y" => "+" }));
    }

    #[test]
    fn later_value_wins() {
        let map = decode(b"a=1&a=2").unwrap();
        assert_eq!(map, params! { "a" => "2" });
    }

    #[test]
    fn nested() {
        let map = decode(b"user[name]=a&user[tags][]=x&user[tags][]=y&user[addr][city]=z").unwrap();
        assert_eq!(
            map,
            params! {
                "user" => params! {
                    "name" => "a",
                    "tags" => vec![ParamValue::from("x"), ParamValue::from("y")],
                    "addr" => params! { "city" => "z" },
                },
            }
        );
    }

    #[test]
    fn list_of_maps() {
        let map = decode(b"u[][id]=1&u[][name]=a&u[][id]=2").unwrap();
        assert_eq!(
            map["u"],
            ParamValue::List(vec![
                params! { "id" => "1", "name" => "a" }.into(),
                params! { "id" => "2" }.into(),
            ])
        );
    }

    #[test]
    fn unbalanced_brackets_are_literal() {
        let map = decode(b"a[b=1&c]d=2&e[f]g=3").unwrap();
        assert_eq!(map, params! { "a[b" => "1", "c]d" => "2", "e[f]g" => "3" });
    }

    #[test]
    fn invalid_utf8() {
        assert_eq!(decode(b"a=%FF"), Err(DecodeError));
        assert_eq!(decode(b"a=\xff"), Err(DecodeError));
        assert_eq!(decode_lossy(b"a=%FF")["a"], ParamValue::from("\u{FFFD}"));
    }
}
