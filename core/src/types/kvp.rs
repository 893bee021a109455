use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Placeholder recorded when the tube voltage is not known
pub const UNKNOWN_KVP: &str = "Unknown";

/// CT tube voltage as found in the case metadata
///
/// The raw tag text is kept verbatim since it is recorded next to the PDFF
/// estimate; the numeric value is best-effort.
#[derive(Debug, Clone, PartialEq)]
pub struct Kvp {
    pub raw: String,
    pub value: Option<f64>,
}

impl Kvp {
    /// Creates an unknown kVp
    pub fn unknown() -> Self {
        Self {
            raw: UNKNOWN_KVP.to_string(),
            value: None,
        }
    }

    /// Parses kVp from a raw tag string
    ///
    /// Accepts formats like:
    /// - "120"
    /// - "120.0"
    /// - "['120']"
    /// - " 1.2e2 "
    ///
    /// Anything without a number keeps its raw text with no numeric value.
    pub fn parse(raw: &str) -> Self {
        static REGEX: OnceLock<Regex> = OnceLock::new();
        let re = REGEX.get_or_init(|| {
            Regex::new(r"[-+]?\d*\.?\d+(?:[eE][-+]?\d+)?").expect("Failed to compile regex")
        });

        let raw = raw.trim();
        if raw.is_empty() || raw == UNKNOWN_KVP {
            return Self::unknown();
        }

        let value = re.find(raw).and_then(|m| m.as_str().parse::<f64>().ok());
        Self {
            raw: raw.to_string(),
            value,
        }
    }

    /// Returns whether a numeric kVp is available
    pub fn is_known(&self) -> bool {
        self.value.is_some()
    }
}

impl Default for Kvp {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for Kvp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(v) => write!(f, "{} kVp", v),
            None => write!(f, "{}", self.raw),
        }
    }
}
