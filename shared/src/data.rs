use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Caller-supplied data, keyed by country code in any case.
pub type CountriesData = HashMap<String, CountryData>;

/// Free-form scalar fields attached to a country and echoed back on selection.
pub type CountryExtraData = BTreeMap<String, ExtraValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl fmt::Display for ExtraValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Number(value) => write_number(f, *value),
            Self::Text(value) => f.write_str(value),
        }
    }
}

/// Raw value of a country as supplied by the caller. Strings are allowed so
/// that placeholders like `"n/a"` can be shown in the exception color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CountryValue {
    Number(f64),
    Text(String),
}

impl CountryValue {
    /// Base-10 integer coercion. Numbers truncate toward zero; text is read as
    /// an optional sign followed by leading digits, ignoring whatever follows.
    /// Returns `None` when nothing numeric can be read.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) if value.is_finite() => Some(value.trunc()),
            Self::Number(_) => None,
            Self::Text(text) => parse_int_prefix(text),
        }
    }
}

impl fmt::Display for CountryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write_number(f, *value),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<f64> for CountryValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for CountryValue {
    fn from(value: i32) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for CountryValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CountryData {
    #[serde(default)]
    pub value: Option<CountryValue>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<CountryExtraData>,
}

impl CountryData {
    pub fn new(value: impl Into<CountryValue>) -> Self {
        Self {
            value: Some(value.into()),
            extra: None,
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: ExtraValue) -> Self {
        self.extra
            .get_or_insert_with(CountryExtraData::new)
            .insert(key.into(), value);
        self
    }

    /// Coerced numeric value; an absent value is not a number.
    pub fn numeric_value(&self) -> Option<f64> {
        self.value.as_ref().and_then(CountryValue::as_number)
    }
}

/// Look up a country by code, ignoring ASCII case. When several keys match,
/// the greatest key wins, the same rule the normalizer applies.
pub fn find_country<'a>(data: &'a CountriesData, code: &str) -> Option<&'a CountryData> {
    data.iter()
        .filter(|(key, _)| key.eq_ignore_ascii_case(code))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, country)| country)
}

fn parse_int_prefix(text: &str) -> Option<f64> {
    let trimmed = text.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = rest
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    let magnitude: f64 = rest[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

fn write_number(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        write!(f, "{}", value as i64)
    } else {
        write!(f, "{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_truncate_toward_zero() {
        assert_eq!(CountryValue::Number(42.9).as_number(), Some(42.0));
        assert_eq!(CountryValue::Number(-3.7).as_number(), Some(-3.0));
        assert_eq!(CountryValue::Number(f64::NAN).as_number(), None);
        assert_eq!(CountryValue::Number(f64::INFINITY).as_number(), None);
    }

    #[test]
    fn text_reads_leading_integer() {
        assert_eq!(CountryValue::from("17").as_number(), Some(17.0));
        assert_eq!(CountryValue::from("  -8 people").as_number(), Some(-8.0));
        assert_eq!(CountryValue::from("+5").as_number(), Some(5.0));
        assert_eq!(CountryValue::from("3.99").as_number(), Some(3.0));
        assert_eq!(CountryValue::from("0x1F").as_number(), Some(0.0));
    }

    #[test]
    fn text_without_digits_is_not_a_number() {
        assert_eq!(CountryValue::from("n/a").as_number(), None);
        assert_eq!(CountryValue::from("").as_number(), None);
        assert_eq!(CountryValue::from("-").as_number(), None);
        assert_eq!(CountryValue::from("abc12").as_number(), None);
    }

    #[test]
    fn absent_value_is_not_a_number() {
        assert_eq!(CountryData::default().numeric_value(), None);
    }

    #[test]
    fn deserializes_mixed_values_and_extra() {
        let data: CountriesData = serde_json::from_str(
            r#"{
                "FR": {"value": 10, "extra": {"capital": "Paris", "eu": true, "rank": 2}},
                "xx": {"value": "n/a"},
                "DE": {}
            }"#,
        )
        .expect("countries data should parse");

        assert_eq!(data["FR"].numeric_value(), Some(10.0));
        let extra = data["FR"].extra.as_ref().expect("FR has extra fields");
        assert_eq!(extra["capital"], ExtraValue::Text("Paris".into()));
        assert_eq!(extra["eu"], ExtraValue::Bool(true));
        assert_eq!(extra["rank"], ExtraValue::Number(2.0));
        assert_eq!(data["xx"].value, Some(CountryValue::Text("n/a".into())));
        assert_eq!(data["DE"].value, None);
    }

    #[test]
    fn find_country_ignores_case() {
        let mut data = CountriesData::new();
        data.insert("Fr".into(), CountryData::new(1));
        assert!(find_country(&data, "FR").is_some());
        assert!(find_country(&data, "fr").is_some());
        assert!(find_country(&data, "de").is_none());
    }

    #[test]
    fn find_country_prefers_greatest_colliding_key() {
        for _ in 0..20 {
            let mut data = CountriesData::new();
            data.insert("FR".into(), CountryData::new(1));
            data.insert("fr".into(), CountryData::new(2));
            data.insert("Fr".into(), CountryData::new(3));
            assert_eq!(
                find_country(&data, "FR").and_then(|c| c.value.clone()),
                Some(CountryValue::Number(2.0))
            );
        }
    }

    #[test]
    fn display_drops_trailing_zero_fraction() {
        assert_eq!(CountryValue::Number(42.0).to_string(), "42");
        assert_eq!(CountryValue::Number(0.5).to_string(), "0.5");
        assert_eq!(ExtraValue::Bool(false).to_string(), "false");
    }
}
