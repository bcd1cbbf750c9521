//! Ordinal severity tiers derived from a total-damage percentage.

use serde::Serialize;
use std::fmt;

/// Severity labels, ordered from least to most severe. Breakpoints are
/// inclusive at the lower bound of each band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Minimal,
    Minor,
    Moderate,
    Severe,
    Critical,
}

impl Severity {
    /// Map a damage percentage (0-100) to its severity tier.
    pub fn classify(damage_percent: f32) -> Self {
        if damage_percent >= 80.0 {
            Severity::Critical
        } else if damage_percent >= 60.0 {
            Severity::Severe
        } else if damage_percent >= 40.0 {
            Severity::Moderate
        } else if damage_percent >= 20.0 {
            Severity::Minor
        } else {
            Severity::Minimal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Minimal => "MINIMAL",
            Severity::Minor => "MINOR",
            Severity::Moderate => "MODERATE",
            Severity::Severe => "SEVERE",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breakpoints_are_inclusive_at_lower_bound() {
        assert_eq!(Severity::classify(80.0), Severity::Critical);
        assert_eq!(Severity::classify(79.99), Severity::Severe);
        assert_eq!(Severity::classify(60.0), Severity::Severe);
        assert_eq!(Severity::classify(40.0), Severity::Moderate);
        assert_eq!(Severity::classify(20.0), Severity::Minor);
        assert_eq!(Severity::classify(19.99), Severity::Minimal);
        assert_eq!(Severity::classify(0.0), Severity::Minimal);
        assert_eq!(Severity::classify(100.0), Severity::Critical);
    }

    #[test]
    fn tiers_are_ordered() {
        assert!(Severity::Critical > Severity::Severe);
        assert!(Severity::Severe > Severity::Moderate);
        assert!(Severity::Minor > Severity::Minimal);
    }

    #[test]
    fn serializes_uppercase() {
        let value = serde_json::to_value(Severity::Critical).unwrap();
        assert_eq!(value, serde_json::json!("CRITICAL"));
    }
}
