use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::data::{CountriesData, CountryData};

/// Percentage assigned to countries whose value could not be coerced.
pub const EXCEPTION_PERCENTAGE: f64 = -1.0;

/// Resolved render state keyed by lowercased country code.
pub type DrawableCountries = HashMap<String, DrawableCountry>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

impl Bounds {
    /// `max - min`, or 1 when the two coincide.
    pub fn range(&self) -> f64 {
        let range = self.max - self.min;
        if range == 0.0 { 1.0 } else { range }
    }

    /// Position of `value` on the color scale, clamped to `0..=100`.
    pub fn percentage(&self, value: f64) -> f64 {
        if value <= self.min {
            0.0
        } else if value >= self.max {
            100.0
        } else {
            (value - self.min) / self.range() * 100.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawableCountry {
    #[serde(flatten)]
    pub data: CountryData,
    /// `0..=100` for numeric values, [`EXCEPTION_PERCENTAGE`] otherwise.
    pub percentage: f64,
}

impl DrawableCountry {
    pub fn is_exception(&self) -> bool {
        self.percentage < 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Normalized {
    pub bounds: Bounds,
    pub countries: DrawableCountries,
}

/// Resolve every input country to its position on the color scale.
///
/// When both bounds are supplied (and finite) they are used as given.
/// Otherwise every parseable value is scanned, starting from whichever bound
/// was supplied, so data beyond a lone supplied bound still widens it.
/// Nothing to scan leaves `0` and `1`.
///
/// Codes differing only in case collapse to one entry; the greatest original
/// key wins, so `"fr"` beats `"Fr"` beats `"FR"`.
pub fn normalize(
    data: &CountriesData,
    min_value: Option<f64>,
    max_value: Option<f64>,
) -> Normalized {
    let min_value = min_value.filter(|v| v.is_finite());
    let max_value = max_value.filter(|v| v.is_finite());

    let (min, max) = match (min_value, max_value) {
        (Some(min), Some(max)) => (Some(min), Some(max)),
        _ => scan_extremes(data, min_value, max_value),
    };
    let bounds = Bounds {
        min: min.unwrap_or(0.0),
        max: max.unwrap_or(1.0),
    };

    let mut entries: Vec<_> = data.iter().collect();
    entries.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));

    let countries = entries
        .into_iter()
        .map(|(code, country)| {
            let percentage = match country.numeric_value() {
                Some(value) => bounds.percentage(value),
                None => EXCEPTION_PERCENTAGE,
            };
            (
                code.to_lowercase(),
                DrawableCountry {
                    data: country.clone(),
                    percentage,
                },
            )
        })
        .collect();

    Normalized { bounds, countries }
}

fn scan_extremes(
    data: &CountriesData,
    min: Option<f64>,
    max: Option<f64>,
) -> (Option<f64>, Option<f64>) {
    data.values()
        .filter_map(CountryData::numeric_value)
        .fold((min, max), |(min, max), value| {
            (
                Some(min.map_or(value, |m: f64| m.min(value))),
                Some(max.map_or(value, |m: f64| m.max(value))),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CountryValue;

    fn data(entries: &[(&str, CountryValue)]) -> CountriesData {
        entries
            .iter()
            .map(|(code, value)| ((*code).to_owned(), CountryData::new(value.clone())))
            .collect()
    }

    fn assert_close(actual: f64, expected: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff < 1e-9,
            "expected {expected}, got {actual} (diff: {diff})"
        );
    }

    #[test]
    fn derives_bounds_and_flags_exceptions() {
        let input = data(&[
            ("FR", 10.into()),
            ("DE", 90.into()),
            ("XX", "n/a".into()),
        ]);
        let normalized = normalize(&input, None, None);

        assert_eq!(normalized.bounds, Bounds { min: 10.0, max: 90.0 });
        assert_eq!(normalized.countries["fr"].percentage, 0.0);
        assert_eq!(normalized.countries["de"].percentage, 100.0);
        assert_eq!(normalized.countries["xx"].percentage, EXCEPTION_PERCENTAGE);
        assert!(normalized.countries["xx"].is_exception());
    }

    #[test]
    fn interpolates_between_bounds() {
        let input = data(&[("a", 0.into()), ("b", 25.into()), ("c", 200.into())]);
        let normalized = normalize(&input, None, None);
        assert_close(normalized.countries["b"].percentage, 12.5);
    }

    #[test]
    fn degenerate_explicit_bounds_force_unit_range() {
        let input = data(&[("FR", 5.into())]);
        let normalized = normalize(&input, Some(0.0), Some(0.0));

        assert_eq!(normalized.bounds.range(), 1.0);
        assert_eq!(normalized.countries["fr"].percentage, 100.0);
    }

    #[test]
    fn single_value_resolves_without_division_error() {
        let input = data(&[("FR", 7.into()), ("DE", 7.into())]);
        let normalized = normalize(&input, None, None);

        assert_eq!(normalized.bounds, Bounds { min: 7.0, max: 7.0 });
        for country in normalized.countries.values() {
            assert!(country.percentage == 0.0 || country.percentage == 100.0);
            assert!(!country.percentage.is_nan());
        }
    }

    #[test]
    fn explicit_bounds_clamp_out_of_range_values() {
        let input = data(&[
            ("lo", (-50).into()),
            ("min", 0.into()),
            ("mid", 50.into()),
            ("max", 100.into()),
            ("hi", 500.into()),
        ]);
        let normalized = normalize(&input, Some(0.0), Some(100.0));

        assert_eq!(normalized.countries["lo"].percentage, 0.0);
        assert_eq!(normalized.countries["min"].percentage, 0.0);
        assert_close(normalized.countries["mid"].percentage, 50.0);
        assert_eq!(normalized.countries["max"].percentage, 100.0);
        assert_eq!(normalized.countries["hi"].percentage, 100.0);
    }

    #[test]
    fn lone_supplied_bound_is_widened_by_data() {
        let input = data(&[("a", 10.into()), ("b", 30.into())]);

        let normalized = normalize(&input, Some(20.0), None);
        assert_eq!(normalized.bounds, Bounds { min: 10.0, max: 30.0 });
        assert_eq!(normalized.countries["a"].percentage, 0.0);

        let normalized = normalize(&input, None, Some(20.0));
        assert_eq!(normalized.bounds, Bounds { min: 10.0, max: 30.0 });
        assert_eq!(normalized.countries["b"].percentage, 100.0);
    }

    #[test]
    fn lone_supplied_bound_inside_data_range_is_kept() {
        let input = data(&[("a", 10.into()), ("b", 30.into())]);

        let normalized = normalize(&input, Some(5.0), None);
        assert_eq!(normalized.bounds, Bounds { min: 5.0, max: 30.0 });

        let normalized = normalize(&input, None, Some(50.0));
        assert_eq!(normalized.bounds, Bounds { min: 10.0, max: 50.0 });
        assert_close(normalized.countries["b"].percentage, 50.0);
    }

    #[test]
    fn lone_supplied_bound_without_parseable_data() {
        let input = data(&[("a", "n/a".into())]);

        let normalized = normalize(&input, Some(7.0), None);
        assert_eq!(normalized.bounds, Bounds { min: 7.0, max: 1.0 });

        let normalized = normalize(&CountriesData::new(), None, Some(9.0));
        assert_eq!(normalized.bounds, Bounds { min: 0.0, max: 9.0 });
    }

    #[test]
    fn both_supplied_bounds_override_data() {
        let input = data(&[("a", 10.into()), ("b", 30.into())]);
        let normalized = normalize(&input, Some(20.0), Some(25.0));
        assert_eq!(normalized.bounds, Bounds { min: 20.0, max: 25.0 });
        assert_eq!(normalized.countries["a"].percentage, 0.0);
        assert_eq!(normalized.countries["b"].percentage, 100.0);
    }

    #[test]
    fn case_colliding_codes_resolve_to_greatest_key() {
        for _ in 0..20 {
            let input = data(&[("FR", 10.into()), ("fr", 90.into()), ("Fr", "n/a".into())]);
            let normalized = normalize(&input, None, None);
            assert_eq!(normalized.countries.len(), 1);
            assert_eq!(
                normalized.countries["fr"].data.value,
                Some(CountryValue::Number(90.0))
            );
        }
    }

    #[test]
    fn empty_input_uses_default_bounds() {
        let normalized = normalize(&CountriesData::new(), None, None);
        assert!(normalized.countries.is_empty());
        assert_eq!(normalized.bounds, Bounds::default());
    }

    #[test]
    fn nothing_parseable_uses_default_bounds() {
        let mut input = data(&[("a", "?".into())]);
        input.insert("b".into(), CountryData::default());
        let normalized = normalize(&input, None, None);

        assert_eq!(normalized.bounds, Bounds::default());
        assert!(normalized.countries.values().all(DrawableCountry::is_exception));
    }

    #[test]
    fn negative_values_participate() {
        let input = data(&[("a", (-100).into()), ("b", (-50).into()), ("c", 0.into())]);
        let normalized = normalize(&input, None, None);

        assert_eq!(normalized.bounds, Bounds { min: -100.0, max: 0.0 });
        assert_close(normalized.countries["b"].percentage, 50.0);
    }

    #[test]
    fn keys_are_lowercased() {
        let input = data(&[("Fr", 1.into()), ("DE", 2.into())]);
        let normalized = normalize(&input, None, None);

        assert!(normalized.countries.contains_key("fr"));
        assert!(normalized.countries.contains_key("de"));
        assert!(!normalized.countries.contains_key("Fr"));
    }

    #[test]
    fn percentages_stay_in_range_or_sentinel() {
        let input = data(&[
            ("a", (-7).into()),
            ("b", 3.into()),
            ("c", "12 units".into()),
            ("d", "none".into()),
            ("e", 1_000_000.into()),
            ("f", CountryValue::Number(f64::NAN)),
        ]);
        for (min, max) in [(None, None), (Some(0.0), Some(10.0)), (Some(5.0), Some(-5.0))] {
            let normalized = normalize(&input, min, max);
            for country in normalized.countries.values() {
                let p = country.percentage;
                assert!(p == EXCEPTION_PERCENTAGE || (0.0..=100.0).contains(&p), "got {p}");
            }
        }
    }

    #[test]
    fn normalizing_twice_is_identical() {
        let input = data(&[("a", 3.into()), ("b", "x".into()), ("c", 9.into())]);
        assert_eq!(normalize(&input, None, None), normalize(&input, None, None));
        assert_eq!(
            normalize(&input, Some(1.0), Some(4.0)),
            normalize(&input, Some(1.0), Some(4.0))
        );
    }

    #[test]
    fn non_finite_explicit_bounds_are_ignored() {
        let input = data(&[("a", 2.into()), ("b", 4.into())]);
        let normalized = normalize(&input, Some(f64::NAN), Some(f64::INFINITY));
        assert_eq!(normalized.bounds, Bounds { min: 2.0, max: 4.0 });
    }
}
