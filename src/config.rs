//! Runtime configuration

use std::f64::consts::{E, PI};

use serde::{Deserialize, Serialize};

use crate::value::MissingPolicy;

/// Named constants seeded into a fresh environment
pub const CONSTANTS: [(&str, f64); 5] = [
    ("pi", PI),
    ("e", E),
    ("ZERO", 0.0),
    ("ONE", 1.0),
    ("TWO", 2.0),
];

/// Settings for running MML programs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MmlConfig {
    /// Bind `pi`, `e`, `ZERO`, `ONE` and `TWO` before running
    pub seed_constants: bool,
    /// Policy `imconv(A, B)` uses when no policy argument is given
    pub image_missing: MissingPolicy,
}

impl MmlConfig {
    pub fn new(seed_constants: bool, image_missing: MissingPolicy) -> Self {
        Self {
            seed_constants,
            image_missing,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for MmlConfig {
    fn default() -> Self {
        Self::new(true, MissingPolicy::Clamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = MmlConfig::from_json(r#"{"image_missing": "wrap"}"#).unwrap();
        assert_eq!(config, MmlConfig::new(true, MissingPolicy::Wrap));
        assert_eq!(MmlConfig::from_json("{}").unwrap(), MmlConfig::default());
    }

    #[test]
    fn test_json_round_trip() {
        let config = MmlConfig::new(false, MissingPolicy::Zero);
        let json = config.to_json().unwrap();
        assert!(json.contains("\"zero\""));
        assert_eq!(MmlConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_unknown_policy_rejected() {
        assert!(MmlConfig::from_json(r#"{"image_missing": "mirror"}"#).is_err());
    }
}
