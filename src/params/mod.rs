//! Parameter values.
//!
//! - [`ParamMap`] the map of named parameters
//! - [`ParamValue`] a single, possibly nested, parameter value
//! - [`Upload`] a file sent in a multipart body
//!
use bytes::Bytes;
use serde::Serialize;
use std::collections::BTreeMap;

pub mod query;
mod merge;

pub use merge::merge;

/// Map of named parameters.
pub type ParamMap = BTreeMap<String, ParamValue>;

/// Parameter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    String(String),
    Map(ParamMap),
    List(Vec<ParamValue>),
    Upload(Upload),
    Bool(bool),
    Number(serde_json::Number),
    Null,
}

impl ParamValue {
    /// Returns the string value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ParamMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ParamValue]> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_upload(&self) -> Option<&Upload> {
        match self {
            Self::Upload(upload) => Some(upload),
            _ => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<ParamMap> for ParamValue {
    fn from(v: ParamMap) -> Self {
        Self::Map(v)
    }
}

impl From<Vec<ParamValue>> for ParamValue {
    fn from(v: Vec<ParamValue>) -> Self {
        Self::List(v)
    }
}

impl From<Upload> for ParamValue {
    fn from(v: Upload) -> Self {
        Self::Upload(v)
    }
}

impl From<serde_json::Value> for ParamValue {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value;
        match v {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(list) => Self::List(list.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

// ===== Upload =====

/// File sent as part of a multipart body.
///
/// The content is held in memory; persisting it is left to the caller.
#[derive(Clone, PartialEq, Serialize)]
pub struct Upload {
    pub filename: String,
    pub content_type: Option<String>,
    #[serde(skip)]
    pub data: Bytes,
}

impl Upload {
    /// Returns the file size in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for Upload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upload")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Create a [`ParamMap`] from `key => value` pairs.
///
/// ```
/// use body_parsers::{params, params::ParamValue};
///
/// let map = params! { "a" => "1", "b" => params! { "c" => "2" } };
/// assert_eq!(map["a"], ParamValue::from("1"));
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::params::ParamMap::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::params::ParamMap::new();
        $(
            map.insert(::std::string::String::from($key), $crate::params::ParamValue::from($value));
        )+
        map
    }};
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn from_json() {
        let value = serde_json::json!({ "a": [1, "x", null], "b": { "c": true } });
        let ParamValue::Map(map) = ParamValue::from(value) else {
            panic!("expected map")
        };
        let list = map["a"].as_list().unwrap();
        assert_eq!(list[0], ParamValue::Number(1.into()));
        assert_eq!(list[1], ParamValue::from("x"));
        assert_eq!(list[2], ParamValue::Null);
        assert_eq!(map["b"].as_map().unwrap()["c"], ParamValue::Bool(true));
    }

    #[test]
    fn serialize_untagged() {
        let map = params! {
            "a" => "1",
            "b" => vec![ParamValue::from("x")],
            "f" => Upload {
                filename: "a.txt".into(),
                content_type: Some("text/plain".into()),
                data: Bytes::from_static(b"hello"),
            },
        };
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "a": "1",
                "b": ["x"],
                "f": { "filename": "a.txt", "content_type": "text/plain" },
            })
        );
    }
}
