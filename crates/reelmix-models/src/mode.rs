//! Trim, selection and quality modes accepted by batch requests.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How a trim window is chosen inside a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrimMode {
    /// Always start at zero
    #[default]
    Fixed,
    /// Uniformly random start where the source is long enough
    Random,
}

impl TrimMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrimMode::Fixed => "fixed",
            TrimMode::Random => "random",
        }
    }
}

impl fmt::Display for TrimMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TrimMode {
    type Err = TrimModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fixed" => Ok(TrimMode::Fixed),
            "random" => Ok(TrimMode::Random),
            _ => Err(TrimModeParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Invalid trim mode: {0}. Must be 'fixed' or 'random'")]
pub struct TrimModeParseError(String);

/// How an audio track is picked for each video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum AudioSelectionMode {
    /// Draw without replacement; refill once every track has been used
    #[default]
    Unique,
    /// Independent draw with replacement
    Random,
}

impl AudioSelectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioSelectionMode::Unique => "unique",
            AudioSelectionMode::Random => "random",
        }
    }
}

impl fmt::Display for AudioSelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AudioSelectionMode {
    type Err = AudioSelectionModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unique" => Ok(AudioSelectionMode::Unique),
            "random" => Ok(AudioSelectionMode::Random),
            _ => Err(AudioSelectionModeParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Invalid audio selection mode: {0}. Must be 'unique' or 'random'")]
pub struct AudioSelectionModeParseError(String);

/// Output quality tier. Maps to codec preset, CRF and bitrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Low => "low",
            QualityTier::Medium => "medium",
            QualityTier::High => "high",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for QualityTier {
    type Err = QualityTierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(QualityTier::Low),
            "medium" => Ok(QualityTier::Medium),
            "high" => Ok(QualityTier::High),
            _ => Err(QualityTierParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown quality tier: {0}")]
pub struct QualityTierParseError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_mode_parse() {
        assert_eq!("fixed".parse::<TrimMode>().unwrap(), TrimMode::Fixed);
        assert_eq!("RANDOM".parse::<TrimMode>().unwrap(), TrimMode::Random);
        assert!("sometimes".parse::<TrimMode>().is_err());
    }

    #[test]
    fn test_selection_mode_roundtrip_display() {
        for mode in [AudioSelectionMode::Unique, AudioSelectionMode::Random] {
            assert_eq!(mode.to_string().parse::<AudioSelectionMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_selection_mode_error_message() {
        let err = "shuffle".parse::<AudioSelectionMode>().unwrap_err();
        assert!(err.to_string().contains("'unique' or 'random'"));
    }

    #[test]
    fn test_quality_tier_serde() {
        let tier: QualityTier = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(tier, QualityTier::High);
        assert_eq!(QualityTier::default(), QualityTier::Medium);
    }
}
