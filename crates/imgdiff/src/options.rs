//! Comparison options and the defaults resolver.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{ConfigError, Failure, Result};

/// Default minimum absolute per-sample difference that counts as "different".
pub const DEFAULT_ZERO_THRESHOLD: f64 = 0.0;

/// Default maximum fraction of differing samples before a comparison fails.
pub const DEFAULT_REL_ERR: f64 = 1e-5;

/// Caller-supplied options. Recognized keys are typed; everything else is kept in `extra` so
/// option sets shared with other comparators survive a round trip.
///
/// Recognized values may be given as JSON numbers or numeric strings (`"0.01"`), since harness
/// option files tend to carry everything as text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffOptions {
    #[serde(
        default,
        deserialize_with = "number_or_numeric_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub zero_threshold: Option<f64>,
    #[serde(
        default,
        deserialize_with = "number_or_numeric_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub rel_err: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DiffOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_zero_threshold(mut self, value: f64) -> Self {
        self.zero_threshold = Some(value);
        self
    }

    pub fn with_rel_err(mut self, value: f64) -> Self {
        self.rel_err = Some(value);
        self
    }

    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    /// Sets one option from its textual `key=value` form.
    ///
    /// Recognized keys must parse as numbers; other keys are stored verbatim (as JSON when the
    /// text parses as JSON, otherwise as a string).
    pub fn set(&mut self, key: &str, raw: &str) -> std::result::Result<(), String> {
        let raw = raw.trim();
        match key {
            "zero_threshold" => self.zero_threshold = Some(parse_number(key, raw)?),
            "rel_err" => self.rel_err = Some(parse_number(key, raw)?),
            _ => {
                let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::from(raw));
                self.extra.insert(key.to_string(), value);
            }
        }
        Ok(())
    }

    /// Overlays every option present in `other` onto `self`.
    pub fn merge(&mut self, other: &DiffOptions) {
        if let Some(v) = other.zero_threshold {
            self.zero_threshold = Some(v);
        }
        if let Some(v) = other.rel_err {
            self.rel_err = Some(v);
        }
        for (k, v) in &other.extra {
            self.extra.insert(k.clone(), v.clone());
        }
    }
}

/// Fills every unset recognized option with its default. Present values are kept as-is, even
/// when out of range; range checks belong to [`Tolerance::from_options`].
pub fn resolve_options(options: &DiffOptions) -> DiffOptions {
    DiffOptions {
        zero_threshold: Some(options.zero_threshold.unwrap_or(DEFAULT_ZERO_THRESHOLD)),
        rel_err: Some(options.rel_err.unwrap_or(DEFAULT_REL_ERR)),
        extra: options.extra.clone(),
    }
}

/// Effective, validated thresholds for one comparator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tolerance {
    pub zero_threshold: f64,
    pub rel_err: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            zero_threshold: DEFAULT_ZERO_THRESHOLD,
            rel_err: DEFAULT_REL_ERR,
        }
    }
}

impl Tolerance {
    pub fn from_options(options: &DiffOptions) -> Result<Self> {
        let resolved = resolve_options(options);
        let zero_threshold = resolved.zero_threshold.unwrap_or(DEFAULT_ZERO_THRESHOLD);
        let rel_err = resolved.rel_err.unwrap_or(DEFAULT_REL_ERR);

        if !(zero_threshold.is_finite() && zero_threshold >= 0.0) {
            return Err(ConfigError::ZeroThreshold {
                value: zero_threshold,
            });
        }
        if !(rel_err.is_finite() && (0.0..=1.0).contains(&rel_err)) {
            return Err(ConfigError::RelErr { value: rel_err });
        }
        Ok(Self {
            zero_threshold,
            rel_err,
        })
    }

    /// The threshold verdict for a difference fraction: a failure only when `fraction` is
    /// strictly above `rel_err`.
    pub fn check(&self, fraction: f64) -> Option<Failure> {
        (fraction > self.rel_err).then_some(Failure::ThresholdExceeded {
            observed: fraction,
            allowed: self.rel_err,
        })
    }
}

fn parse_number(key: &str, raw: &str) -> std::result::Result<f64, String> {
    raw.parse::<f64>()
        .map_err(|_| format!("option `{key}` expects a number, got `{raw}`"))
}

fn number_or_numeric_string<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(v)) => Ok(Some(v)),
        Some(Raw::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("expected a number, got `{s}`"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolver_fills_missing_defaults() {
        let resolved = resolve_options(&DiffOptions::new());
        assert_eq!(resolved.zero_threshold, Some(DEFAULT_ZERO_THRESHOLD));
        assert_eq!(resolved.rel_err, Some(DEFAULT_REL_ERR));
    }

    #[test]
    fn resolver_keeps_present_values_without_range_checks() {
        let opts = DiffOptions::new().with_zero_threshold(-3.0).with_rel_err(7.5);
        let resolved = resolve_options(&opts);
        assert_eq!(resolved.zero_threshold, Some(-3.0));
        assert_eq!(resolved.rel_err, Some(7.5));
        assert_eq!(resolve_options(&resolved), resolved);
    }

    #[test]
    fn unknown_keys_survive_parsing_and_resolution() {
        let opts = DiffOptions::from_value(json!({
            "rel_err": "0.01",
            "zero_threshold": 2,
            "remove_whitespace": true,
        }))
        .unwrap();
        assert_eq!(opts.rel_err, Some(0.01));
        assert_eq!(opts.zero_threshold, Some(2.0));
        let resolved = resolve_options(&opts);
        assert_eq!(resolved.extra.get("remove_whitespace"), Some(&json!(true)));
    }

    #[test]
    fn non_numeric_recognized_value_is_a_parse_error() {
        assert!(DiffOptions::from_value(json!({ "rel_err": "lots" })).is_err());
    }

    #[test]
    fn set_parses_recognized_and_stores_unknown() {
        let mut opts = DiffOptions::new();
        opts.set("rel_err", " 0.5 ").unwrap();
        opts.set("comment", "hello").unwrap();
        opts.set("digits", "4").unwrap();
        assert_eq!(opts.rel_err, Some(0.5));
        assert_eq!(opts.extra.get("comment"), Some(&json!("hello")));
        assert_eq!(opts.extra.get("digits"), Some(&json!(4)));
        assert!(opts.set("zero_threshold", "abc").is_err());
    }

    #[test]
    fn merge_overrides_only_present_values() {
        let mut base = DiffOptions::new().with_zero_threshold(1.0).with_rel_err(0.1);
        base.merge(&DiffOptions::new().with_rel_err(0.2));
        assert_eq!(base.zero_threshold, Some(1.0));
        assert_eq!(base.rel_err, Some(0.2));
    }

    #[test]
    fn tolerance_validates_ranges() {
        assert_eq!(
            Tolerance::from_options(&DiffOptions::new()).unwrap(),
            Tolerance::default()
        );
        assert_eq!(
            Tolerance::from_options(&DiffOptions::new().with_zero_threshold(-1.0)),
            Err(ConfigError::ZeroThreshold { value: -1.0 })
        );
        assert_eq!(
            Tolerance::from_options(&DiffOptions::new().with_rel_err(1.5)),
            Err(ConfigError::RelErr { value: 1.5 })
        );
        assert!(Tolerance::from_options(&DiffOptions::new().with_rel_err(f64::NAN)).is_err());
        assert!(Tolerance::from_options(&DiffOptions::new().with_rel_err(1.0)).is_ok());
    }

    #[test]
    fn check_fails_only_strictly_above_rel_err() {
        let tol = Tolerance::from_options(&DiffOptions::new().with_rel_err(0.01)).unwrap();
        assert_eq!(tol.check(0.01), None);
        assert_eq!(
            tol.check(0.015),
            Some(Failure::ThresholdExceeded {
                observed: 0.015,
                allowed: 0.01,
            })
        );
        let exact = Tolerance::from_options(&DiffOptions::new().with_rel_err(0.0)).unwrap();
        assert_eq!(exact.check(0.0), None);
        assert!(exact.check(f64::MIN_POSITIVE).is_some());
    }
}
