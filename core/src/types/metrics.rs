use crate::error::Result;
use serde::Serialize;
use serde_json::{Map, Value};

/// Rounds a value to a fixed number of decimal places
///
/// Rounds the exact binary value, with ties going to even, so `2.675`
/// (stored just below the tie) becomes `2.67` and `0.125` becomes `0.12`.
pub fn round_to(value: f64, decimals: usize) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{:.*}", decimals, value)
        .parse()
        .unwrap_or(value)
}

/// Open mapping from metric name to value
///
/// Keys are added incrementally by each analyzer. A missing key means "not
/// computed", which is distinct from an explicit `null` and from zero.
/// Insertion order is preserved so serialized output is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetricsResult {
    entries: Map<String, Value>,
}

impl MetricsResult {
    /// Creates an empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts any JSON-convertible value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Inserts an explicit `null`
    pub fn insert_null(&mut self, key: impl Into<String>) {
        self.entries.insert(key.into(), Value::Null);
    }

    /// Inserts a float rounded to `decimals` places
    pub fn insert_rounded(&mut self, key: impl Into<String>, value: f64, decimals: usize) {
        self.insert(key, round_to(value, decimals));
    }

    /// Inserts a rounded float, or `null` when absent
    pub fn insert_rounded_or_null(
        &mut self,
        key: impl Into<String>,
        value: Option<f64>,
        decimals: usize,
    ) {
        match value {
            Some(v) => self.insert_rounded(key, v, decimals),
            None => self.insert_null(key),
        }
    }

    /// Appends all entries of another result, overwriting duplicates
    pub fn merge(&mut self, other: MetricsResult) {
        for (key, value) in other.entries {
            self.entries.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Returns a numeric entry, `None` if missing or not a number
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.entries.get(key).and_then(Value::as_f64)
    }

    /// Returns a string entry, `None` if missing or not a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns whether the key is present with an explicit `null`
    pub fn is_null(&self, key: &str) -> bool {
        matches!(self.entries.get(key), Some(Value::Null))
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Borrows the underlying JSON map
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.entries
    }

    /// Serializes to pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1.23456, 3, 1.235)]
    #[case(1.23456, 2, 1.23)]
    #[case(-0.004, 2, -0.0)]
    #[case(12.0, 3, 12.0)]
    #[case(55.555, 2, 55.55)]
    #[case(2.675, 2, 2.67)]
    #[case(0.125, 2, 0.12)]
    #[case(0.375, 2, 0.38)]
    #[case(1.0005, 3, 1.0)]
    #[case(-2.5, 0, -2.0)]
    fn test_round_to(#[case] value: f64, #[case] decimals: usize, #[case] expected: f64) {
        assert_eq!(round_to(value, decimals), expected);
    }

    #[test]
    fn test_round_to_non_finite() {
        assert!(round_to(f64::NAN, 2).is_nan());
        assert_eq!(round_to(f64::INFINITY, 2), f64::INFINITY);
    }

    #[test]
    fn test_missing_vs_null_vs_zero() {
        let mut result = MetricsResult::new();
        result.insert_null("liver_hu_mean");
        result.insert("liver_vol_cm3", 0.0);

        assert!(result.is_null("liver_hu_mean"));
        assert!(!result.is_null("liver_vol_cm3"));
        assert_eq!(result.get_f64("liver_vol_cm3"), Some(0.0));
        assert!(!result.contains_key("spleen_vol_cm3"));
        assert!(!result.is_null("spleen_vol_cm3"));
    }

    #[test]
    fn test_insert_rounded_or_null() {
        let mut result = MetricsResult::new();
        result.insert_rounded_or_null("a", Some(55.555), 2);
        result.insert_rounded_or_null("b", None, 2);
        assert_eq!(result.get_f64("a"), Some(55.55));
        assert!(result.is_null("b"));
    }

    #[test]
    fn test_non_finite_becomes_null() {
        let mut result = MetricsResult::new();
        result.insert("x", f64::NAN);
        assert!(result.is_null("x"));
    }

    #[test]
    fn test_merge_preserves_insertion_order() {
        let mut a = MetricsResult::new();
        a.insert("case_id", "c1");
        a.insert("modality", "CT");

        let mut b = MetricsResult::new();
        b.insert("slice_L3", 42);
        b.insert("SMA_cm2", 150.5);

        a.merge(b);
        let keys: Vec<_> = a.keys().cloned().collect();
        assert_eq!(keys, vec!["case_id", "modality", "slice_L3", "SMA_cm2"]);
    }

    #[test]
    fn test_to_json_pretty() {
        let mut result = MetricsResult::new();
        result.insert("case_id", "c1");
        result.insert_null("spleen_hu_mean");
        let json = result.to_json_pretty().unwrap();
        assert!(json.contains("\"case_id\": \"c1\""));
        assert!(json.contains("\"spleen_hu_mean\": null"));
    }
}
