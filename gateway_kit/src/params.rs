//! Field deserializers for merged request parameters.
//!
//! Query string values always arrive as strings while JSON bodies carry real
//! numbers. These helpers accept either form, so a handler can declare
//! `price: f64` and be called through `?price=12` or `{"price": 12}`.

use serde::de::{self, Deserializer};
use serde::Deserialize;

/// A number as sent in a JSON body or a query string.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    String(String),
}

impl NumberOrString {
    fn into_f64<E: de::Error>(self) -> Result<f64, E> {
        match self {
            NumberOrString::Number(n) => Ok(n),
            NumberOrString::String(raw) => raw
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("expected a number, got `{raw}`"))),
        }
    }

    fn into_usize<E: de::Error>(self) -> Result<usize, E> {
        let n = self.into_f64::<E>()?;
        if n < 0.0 || n.fract() != 0.0 || n > usize::MAX as f64 {
            return Err(E::custom(format!("expected a non-negative integer, got `{n}`")));
        }
        Ok(n as usize)
    }
}

pub fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    NumberOrString::deserialize(deserializer)?.into_f64()
}

/// Use with `#[serde(default)]` so a missing field stays `None`.
pub fn optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<NumberOrString>::deserialize(deserializer)?
        .map(NumberOrString::into_f64)
        .transpose()
}

/// Use with `#[serde(default)]` so a missing field stays `None`.
pub fn optional_usize<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<NumberOrString>::deserialize(deserializer)?
        .map(NumberOrString::into_usize)
        .transpose()
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Page {
        #[serde(deserialize_with = "super::number")]
        price: f64,
        #[serde(default, deserialize_with = "super::optional_usize")]
        limit: Option<usize>,
    }

    #[test]
    fn accepts_numbers_and_numeric_strings() {
        let from_query: Page = serde_json::from_value(json!({ "price": "12.5", "limit": "3" })).unwrap();
        assert_eq!(from_query.price, 12.5);
        assert_eq!(from_query.limit, Some(3));

        let from_body: Page = serde_json::from_value(json!({ "price": 7 })).unwrap();
        assert_eq!(from_body.price, 7.0);
        assert_eq!(from_body.limit, None);
    }

    #[test]
    fn rejects_non_numeric_values() {
        assert!(serde_json::from_value::<Page>(json!({ "price": "cheap" })).is_err());
        assert!(serde_json::from_value::<Page>(json!({ "price": 1, "limit": "-2" })).is_err());
        assert!(serde_json::from_value::<Page>(json!({ "price": 1, "limit": 1.5 })).is_err());
    }
}
