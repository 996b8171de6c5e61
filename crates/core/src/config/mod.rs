use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{CategoryMix, Result, SoundError};

/// Top-level configuration structure for an audio session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sound: SoundConfig,
    /// Listener category levels applied during normalisation.
    pub mix: CategoryMix,
}

impl AppConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.sound.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }
}

/// Scheduling and channel settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundConfig {
    /// Normal channels used when the device cannot be probed or auto sizing
    /// is off.
    pub normal_channels: u32,
    /// Streaming channels used alongside `normal_channels`.
    pub streaming_channels: u32,
    /// Derive the channel split from the probed device when it reports more
    /// than 64 mono sources.
    pub auto_configure_channels: bool,
    /// Cooldown, in ticks, between two plays of a culled sound. Zero or below
    /// disables culling.
    pub culling_threshold_ticks: i64,
    /// Normal channels kept free for host sounds the scheduler does not track.
    pub reserved_slack: u32,
    /// Pending spot sounds reaching this age are dropped.
    pub age_threshold_ticks: i32,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            normal_channels: 28,
            streaming_channels: 4,
            auto_configure_channels: true,
            culling_threshold_ticks: 20,
            reserved_slack: crate::capacity::RESERVED_SLACK,
            age_threshold_ticks: crate::queue::AGE_THRESHOLD_TICKS,
        }
    }
}

impl SoundConfig {
    pub fn validate(&self) -> Result<()> {
        if self.reserved_slack >= self.normal_channels {
            return Err(SoundError::InvalidConfig(format!(
                "reserved_slack ({}) must be smaller than normal_channels ({})",
                self.reserved_slack, self.normal_channels
            )));
        }
        if self.age_threshold_ticks <= 0 {
            return Err(SoundError::InvalidConfig(format!(
                "age_threshold_ticks must be positive, got {}",
                self.age_threshold_ticks
            )));
        }
        Ok(())
    }

    pub fn culling_enabled(&self) -> bool {
        self.culling_threshold_ticks > 0
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SoundCategory;

    #[test]
    fn defaults_are_valid() {
        let config = SoundConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reserved_slack, 6);
        assert_eq!(config.age_threshold_ticks, 5);
        assert!(config.culling_enabled());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = SoundConfig::from_json_str(r#"{ "culling_threshold_ticks": 0 }"#).unwrap();
        assert!(!config.culling_enabled());
        assert_eq!(config.normal_channels, 28);
    }

    #[test]
    fn rejects_slack_swallowing_all_channels() {
        let err = SoundConfig::from_json_str(r#"{ "normal_channels": 4 }"#).unwrap_err();
        assert!(matches!(err, SoundError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_non_positive_age_threshold() {
        let err = SoundConfig::from_json_str(r#"{ "age_threshold_ticks": 0 }"#).unwrap_err();
        assert!(matches!(err, SoundError::InvalidConfig(_)));
    }

    #[test]
    fn app_config_reads_category_mix() {
        let config = AppConfig::from_json_str(
            r#"{ "sound": { "normal_channels": 16 }, "mix": { "levels": { "weather": 0.25 } } }"#,
        )
        .unwrap();
        assert_eq!(config.sound.normal_channels, 16);
        assert_eq!(config.mix.level(SoundCategory::Weather), 0.25);
        assert_eq!(config.mix.level(SoundCategory::Blocks), 1.0);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            AppConfig::from_json_str("{ nope"),
            Err(SoundError::Json(_))
        ));
    }
}
