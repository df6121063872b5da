//! Stored representation of cell values.
//!
//! Everything kept in a key-value store is a string. Any `Serialize` /
//! `DeserializeOwned` type can be stored; `serde_json` does the work.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// How values are turned into stored strings
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// Strings are stored as-is, numbers and booleans in their display form,
    /// objects, arrays and null as JSON text.
    ///
    /// Compatible with data written by existing browser-side code. A string
    /// that is itself a JSON string literal loses its quotes on the way back.
    #[default]
    Mixed,
    /// Always JSON text, strings included
    Json,
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unable to encode value: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("unable to decode stored value {raw:?}: {source}")]
    Decode {
        raw: String,
        #[source]
        source: serde_json::Error,
    },
}

pub fn encode<T: Serialize + ?Sized>(value: &T, encoding: Encoding) -> Result<String, CodecError> {
    if encoding == Encoding::Mixed {
        match serde_json::to_value(value).map_err(CodecError::Encode)? {
            Value::String(s) => return Ok(s),
            Value::Number(n) => return Ok(n.to_string()),
            Value::Bool(b) => return Ok(b.to_string()),
            _ => {}
        }
    }
    // Written directly so struct fields keep their declaration order
    serde_json::to_string(value).map_err(CodecError::Encode)
}

/// Decode a stored string.
///
/// JSON is tried first. If the text is not JSON, or the JSON does not fit
/// `T`, the raw text itself is offered to `T` as a string. Text that is a
/// JSON string literal is therefore unquoted, also when it was stored raw
/// by [`Encoding::Mixed`].
pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, CodecError> {
    match serde_json::from_str(raw) {
        Ok(decoded) => return Ok(decoded),
        Err(err) => log::trace!("Stored text is not JSON for this type, using it raw: {}", err),
    }

    serde_json::from_value(Value::String(raw.to_owned())).map_err(|source| CodecError::Decode {
        raw: raw.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
    struct Settings {
        theme: String,
        volume: u8,
    }

    /// Fields deliberately out of alphabetical order
    #[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
    struct Window {
        width: u32,
        height: u32,
        anchor: String,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
    enum Mode {
        Dark,
        Light,
    }

    #[test]
    fn mixed_stores_primitives_unquoted() {
        assert_eq!(encode("hello", Encoding::Mixed).unwrap(), "hello");
        assert_eq!(encode(&42, Encoding::Mixed).unwrap(), "42");
        assert_eq!(encode(&-1.5, Encoding::Mixed).unwrap(), "-1.5");
        assert_eq!(encode(&true, Encoding::Mixed).unwrap(), "true");
        assert_eq!(encode(&Mode::Dark, Encoding::Mixed).unwrap(), "Dark");
    }

    #[test]
    fn structured_values_are_json_in_both_encodings() {
        let settings = Settings {
            theme: "dark".to_owned(),
            volume: 7,
        };
        for encoding in [Encoding::Mixed, Encoding::Json] {
            assert_eq!(encode(&settings, encoding).unwrap(), r#"{"theme":"dark","volume":7}"#);
            assert_eq!(encode(&vec![1, 2], encoding).unwrap(), "[1,2]");
            assert_eq!(encode(&None::<u8>, encoding).unwrap(), "null");
        }
    }

    #[test]
    fn json_quotes_strings() {
        assert_eq!(encode("hello", Encoding::Json).unwrap(), r#""hello""#);
        assert_eq!(encode(&42, Encoding::Json).unwrap(), "42");
    }

    #[test]
    fn non_string_map_keys_fail_to_encode() {
        let mut map = HashMap::new();
        map.insert((1, 2), "pair");
        assert!(matches!(encode(&map, Encoding::Json), Err(CodecError::Encode(_))));
    }

    #[test]
    fn struct_fields_keep_declaration_order() {
        let window = Window {
            width: 640,
            height: 480,
            anchor: "top".to_owned(),
        };
        let expected = serde_json::to_string(&window).unwrap();
        assert_eq!(expected, r#"{"width":640,"height":480,"anchor":"top"}"#);
        for encoding in [Encoding::Mixed, Encoding::Json] {
            assert_eq!(encode(&window, encoding).unwrap(), expected);
        }
        assert_eq!(decode::<Window>(&expected).unwrap(), window);
    }

    #[test]
    fn non_json_text_falls_back_to_raw_string() {
        let value: String = decode("abc").unwrap();
        assert_eq!(value, "abc");
        let mode: Mode = decode("Light").unwrap();
        assert_eq!(mode, Mode::Light);
    }

    #[test]
    fn json_that_does_not_fit_falls_back_to_raw_string() {
        let value: String = decode("42").unwrap();
        assert_eq!(value, "42");
        let value: String = decode("null").unwrap();
        assert_eq!(value, "null");
        let value: String = decode("[1,2]").unwrap();
        assert_eq!(value, "[1,2]");
    }

    #[test]
    fn primitives_decode_from_display_form() {
        assert_eq!(decode::<u32>("42").unwrap(), 42);
        assert!(decode::<bool>("true").unwrap());
        assert_eq!(decode::<f64>("-1.5").unwrap(), -1.5);
    }

    #[test]
    fn json_string_literals_are_unquoted() {
        // As written by JSON.stringify
        let value: String = decode(r#""quoted""#).unwrap();
        assert_eq!(value, "quoted");
        let value: String = decode(r#""42""#).unwrap();
        assert_eq!(value, "42");
    }

    #[test]
    fn undecodable_text_reports_raw_value() {
        match decode::<u32>("abc") {
            Err(CodecError::Decode { raw, .. }) => assert_eq!(raw, "abc"),
            other => panic!("Expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn encoding_names_are_snake_case() {
        assert_eq!(serde_json::to_string(&Encoding::Json).unwrap(), r#""json""#);
        let mixed: Encoding = serde_json::from_str(r#""mixed""#).unwrap();
        assert_eq!(mixed, Encoding::Mixed);
    }
}
