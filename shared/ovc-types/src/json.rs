//! Bigint-safe JSON, compatible with the indexer's reviver/replacer pair.
//!
//! The indexer serialises every bigint as `{"__type":"bigint","value":"<decimal>"}`. On decode we
//! also accept plain JSON numbers and decimal strings, since some endpoints emit those for small
//! values.
//!
//! Use with `#[serde(with = "json::bigint")]` for a single value and
//! `#[serde(with = "json::bigint_seq")]` for a list.

use alloy_primitives::U256;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

const BIGINT_TAG: &str = "bigint";

/// Integer types that travel as bigints.
pub trait BigIntValue: Sized {
    fn to_decimal(&self) -> String;
    fn from_decimal(s: &str) -> Option<Self>;
    fn from_u64(v: u64) -> Option<Self>;
}

impl BigIntValue for U256 {
    fn to_decimal(&self) -> String {
        self.to_string()
    }

    fn from_decimal(s: &str) -> Option<Self> {
        U256::from_str_radix(s, 10).ok()
    }

    fn from_u64(v: u64) -> Option<Self> {
        Some(U256::from(v))
    }
}

impl BigIntValue for u64 {
    fn to_decimal(&self) -> String {
        self.to_string()
    }

    fn from_decimal(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    fn from_u64(v: u64) -> Option<Self> {
        Some(v)
    }
}

impl BigIntValue for u32 {
    fn to_decimal(&self) -> String {
        self.to_string()
    }

    fn from_decimal(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    fn from_u64(v: u64) -> Option<Self> {
        u32::try_from(v).ok()
    }
}

#[derive(Serialize)]
struct Tagged {
    #[serde(rename = "__type")]
    ty: &'static str,
    value: String,
}

impl Tagged {
    fn of<T: BigIntValue>(v: &T) -> Self {
        Self {
            ty: BIGINT_TAG,
            value: v.to_decimal(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Wire {
    Tagged {
        #[serde(rename = "__type")]
        ty: String,
        value: String,
    },
    Number(u64),
    Text(String),
}

impl Wire {
    fn into_value<T: BigIntValue>(self) -> Result<T, String> {
        match self {
            Wire::Tagged { ty, value } => {
                if ty != BIGINT_TAG {
                    return Err(format!("unexpected __type `{ty}`"));
                }
                T::from_decimal(&value).ok_or_else(|| format!("invalid bigint `{value}`"))
            }
            Wire::Number(n) => T::from_u64(n).ok_or_else(|| format!("bigint {n} out of range")),
            Wire::Text(s) => T::from_decimal(&s).ok_or_else(|| format!("invalid bigint `{s}`")),
        }
    }
}

pub mod bigint {
    use super::*;

    pub fn serialize<S, T>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: BigIntValue,
    {
        Tagged::of(value).serialize(serializer)
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: BigIntValue,
    {
        Wire::deserialize(deserializer)?
            .into_value()
            .map_err(D::Error::custom)
    }
}

pub mod bigint_seq {
    use super::*;

    pub fn serialize<S, T>(values: &[T], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: BigIntValue,
    {
        serializer.collect_seq(values.iter().map(Tagged::of))
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: BigIntValue,
    {
        Vec::<Wire>::deserialize(deserializer)?
            .into_iter()
            .map(|w| w.into_value().map_err(D::Error::custom))
            .collect()
    }
}

/// Equivalent of the indexer's `replacer`: render a value as bigint-safe JSON text.
pub fn to_string<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string(value)
}

/// Equivalent of the indexer's `reviver`: parse bigint-safe JSON text.
pub fn from_str<'a, T: Deserialize<'a>>(s: &'a str) -> serde_json::Result<T> {
    serde_json::from_str(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "bigint")]
        big: U256,
        #[serde(with = "bigint_seq")]
        list: Vec<U256>,
        #[serde(with = "bigint")]
        small: u64,
    }

    #[test]
    fn encodes_with_bigint_tag() {
        let holder = Holder {
            big: U256::from(10u64).pow(U256::from(30u64)),
            list: vec![U256::from(1u64)],
            small: 7,
        };
        let value = serde_json::to_value(&holder).unwrap();
        assert_eq!(
            value,
            json!({
                "big": {"__type": "bigint", "value": "1000000000000000000000000000000"},
                "list": [{"__type": "bigint", "value": "1"}],
                "small": {"__type": "bigint", "value": "7"},
            })
        );
        let back: Holder = from_str(&to_string(&holder).unwrap()).unwrap();
        assert_eq!(back, holder);
    }

    #[test]
    fn accepts_numbers_and_decimal_strings() {
        let holder: Holder = serde_json::from_value(json!({
            "big": "123456789012345678901234567890",
            "list": [5, "6", {"__type": "bigint", "value": "7"}],
            "small": 42,
        }))
        .unwrap();
        assert_eq!(
            holder.big,
            U256::from_str_radix("123456789012345678901234567890", 10).unwrap()
        );
        assert_eq!(
            holder.list,
            vec![U256::from(5u64), U256::from(6u64), U256::from(7u64)]
        );
        assert_eq!(holder.small, 42);
    }

    #[test]
    fn rejects_foreign_tags_and_garbage() {
        let wrong_tag = serde_json::from_value::<Holder>(json!({
            "big": {"__type": "date", "value": "1"},
            "list": [],
            "small": 1,
        }));
        assert!(wrong_tag.is_err());

        let garbage = serde_json::from_value::<Holder>(json!({
            "big": "0xzz",
            "list": [],
            "small": 1,
        }));
        assert!(garbage.is_err());
    }
}
