use serde::{Deserialize, Serialize};

use crate::{HostEngine, SoundConfig};

/// Normal channels held back for host sounds the scheduler does not track.
pub const RESERVED_SLACK: u32 = 6;

/// Devices reporting more mono sources than this are sized automatically.
const AUTO_CONFIGURE_MIN_SOURCES: u32 = 64;

/// Channel split derived once at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelCapacity {
    pub normal_channels: u32,
    pub streaming_channels: u32,
    pub reserved_slack: u32,
    /// Mono sources reported by the device, if the probe succeeded.
    pub probed_sources: Option<u32>,
}

impl ChannelCapacity {
    /// Static split taken straight from the configuration.
    pub fn from_config(config: &SoundConfig) -> Self {
        Self {
            normal_channels: config.normal_channels,
            streaming_channels: config.streaming_channels,
            reserved_slack: config.reserved_slack,
            probed_sources: None,
        }
    }

    /// Derives the split from an optional probe result.
    ///
    /// With auto sizing on and more than 64 sources, three quarters of the
    /// device are claimed and divided 4:1 between normal and streaming
    /// playback. Otherwise the configured counts are used.
    pub fn derive(probed_sources: Option<u32>, config: &SoundConfig) -> Self {
        let mut capacity = Self::from_config(config);
        capacity.probed_sources = probed_sources;

        if let Some(total) = probed_sources {
            if config.auto_configure_channels && total > AUTO_CONFIGURE_MIN_SOURCES {
                let claimed = (u64::from(total) + 1) * 3 / 4;
                let claimed = u32::try_from(claimed).unwrap_or(u32::MAX);
                capacity.streaming_channels = claimed / 5;
                capacity.normal_channels = claimed - capacity.streaming_channels;
            }
        }
        capacity
    }

    /// Probes the engine once, derives the split and hands it back to the
    /// engine. A failed probe falls back to the configured defaults.
    pub fn configure<E: HostEngine>(engine: &mut E, config: &SoundConfig) -> Self {
        let probed = match engine.probe_mono_sources() {
            Ok(total) => Some(total),
            Err(err) => {
                tracing::warn!(
                    %err,
                    "unable to query mono sources, using configured channel counts"
                );
                None
            }
        };

        let capacity = Self::derive(probed, config);
        tracing::info!(
            normal = capacity.normal_channels,
            streaming = capacity.streaming_channels,
            available = %probed.map_or_else(|| "UNKNOWN".to_string(), |t| t.to_string()),
            "sound channels configured"
        );
        engine.apply_channel_config(&capacity);
        capacity
    }

    /// Highest playing count at which one more sound may still be admitted.
    pub fn admission_limit(&self) -> usize {
        self.normal_channels.saturating_sub(self.reserved_slack) as usize
    }

    pub fn total_channels(&self) -> u32 {
        self.normal_channels.saturating_add(self.streaming_channels)
    }

    /// Polls the engine's live count; nothing is cached between calls.
    pub fn can_admit_one<E: HostEngine + ?Sized>(&self, engine: &E) -> bool {
        engine.playing_count() < self.admission_limit()
    }
}

impl Default for ChannelCapacity {
    fn default() -> Self {
        Self::from_config(&SoundConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimulatedEngine;

    #[test]
    fn small_devices_keep_configured_counts() {
        let config = SoundConfig::default();
        let capacity = ChannelCapacity::derive(Some(64), &config);
        assert_eq!(capacity.normal_channels, 28);
        assert_eq!(capacity.streaming_channels, 4);
        assert_eq!(capacity.probed_sources, Some(64));
    }

    #[test]
    fn large_devices_are_split_four_to_one() {
        let config = SoundConfig::default();
        let capacity = ChannelCapacity::derive(Some(255), &config);
        // (255 + 1) * 3 / 4 = 192 -> 38 streaming, 154 normal
        assert_eq!(capacity.streaming_channels, 38);
        assert_eq!(capacity.normal_channels, 154);
    }

    #[test]
    fn huge_device_counts_do_not_overflow() {
        let config = SoundConfig::default();
        let capacity = ChannelCapacity::derive(Some(u32::MAX), &config);
        // (2^32) * 3 / 4 = 3221225472 -> 644245094 streaming
        assert_eq!(capacity.streaming_channels, 644_245_094);
        assert_eq!(capacity.normal_channels, 2_576_980_378);
        assert_eq!(capacity.total_channels(), 3_221_225_472);

        let capacity = ChannelCapacity::derive(Some(2_000_000_000), &config);
        assert_eq!(capacity.total_channels(), 1_500_000_000);
    }

    #[test]
    fn auto_sizing_can_be_disabled() {
        let config = SoundConfig {
            auto_configure_channels: false,
            ..SoundConfig::default()
        };
        let capacity = ChannelCapacity::derive(Some(255), &config);
        assert_eq!(capacity.normal_channels, 28);
    }

    #[test]
    fn failed_probe_falls_back_to_defaults() {
        let mut engine = SimulatedEngine::new().with_mono_sources(None);
        let capacity = ChannelCapacity::configure(&mut engine, &SoundConfig::default());
        assert_eq!(capacity, ChannelCapacity::from_config(&SoundConfig::default()));
        assert_eq!(engine.applied_channels(), Some(capacity));
    }

    #[test]
    fn admission_respects_slack() {
        let capacity = ChannelCapacity::default();
        assert_eq!(capacity.admission_limit(), 22);

        let mut engine = SimulatedEngine::new();
        engine.set_background_load(21);
        assert!(capacity.can_admit_one(&engine));
        engine.set_background_load(22);
        assert!(!capacity.can_admit_one(&engine));
    }
}
