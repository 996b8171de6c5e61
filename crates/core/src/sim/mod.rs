//! In-memory host engine for tests and the command line driver.

use std::collections::{BTreeMap, HashSet};

use crate::{ChannelCapacity, HostEngine, PlaybackHandle, PlaybackRequest, Result, SoundError};

/// Something the simulated engine was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Played {
        handle: PlaybackHandle,
        identity: String,
        volume: f32,
    },
    VolumeChanged {
        handle: PlaybackHandle,
        volume: f32,
    },
    Faded {
        handle: PlaybackHandle,
    },
    Rejected {
        identity: String,
    },
}

#[derive(Debug)]
struct Voice {
    volume: f32,
    // None loops until faded
    remaining_ticks: Option<u32>,
    fading: bool,
}

/// Host engine stand-in that tracks voices without producing audio.
///
/// Ambient requests loop until faded; spot requests stop on their own after
/// a fixed number of ticks. Call [`advance`](Self::advance) once per tick to
/// age voices and release faded ones.
#[derive(Debug)]
pub struct SimulatedEngine {
    master_volume: f32,
    mono_sources: Option<u32>,
    spot_duration_ticks: u32,
    next_handle: u64,
    voices: BTreeMap<PlaybackHandle, Voice>,
    background_load: usize,
    rejected: HashSet<String>,
    events: Vec<EngineEvent>,
    applied: Option<ChannelCapacity>,
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedEngine {
    pub fn new() -> Self {
        Self {
            master_volume: 1.0,
            mono_sources: Some(32),
            spot_duration_ticks: 20,
            next_handle: 1,
            voices: BTreeMap::new(),
            background_load: 0,
            rejected: HashSet::new(),
            events: Vec::new(),
            applied: None,
        }
    }

    /// Mono sources reported by the probe; `None` makes the probe fail.
    pub fn with_mono_sources(mut self, total: Option<u32>) -> Self {
        self.mono_sources = total;
        self
    }

    pub fn with_spot_duration(mut self, ticks: u32) -> Self {
        self.spot_duration_ticks = ticks.max(1);
        self
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = volume;
    }

    /// Occupies `count` channels with sounds the scheduler knows nothing about.
    pub fn set_background_load(&mut self, count: usize) {
        self.background_load = count;
    }

    /// Makes every future play request for `identity` fail.
    pub fn reject(&mut self, identity: impl Into<String>) {
        self.rejected.insert(identity.into());
    }

    pub fn accept(&mut self, identity: &str) {
        self.rejected.remove(identity);
    }

    /// Stops a voice without telling its owner.
    pub fn drop_sound(&mut self, handle: PlaybackHandle) -> bool {
        self.voices.remove(&handle).is_some()
    }

    /// Advances one tick: faded voices are released and finished spot voices
    /// stop.
    pub fn advance(&mut self) {
        self.voices.retain(|_, voice| {
            if voice.fading {
                return false;
            }
            match voice.remaining_ticks.as_mut() {
                Some(remaining) => {
                    *remaining = remaining.saturating_sub(1);
                    *remaining > 0
                }
                None => true,
            }
        });
    }

    pub fn events(&self) -> &[EngineEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    /// How many times `identity` was started.
    pub fn play_count(&self, identity: &str) -> usize {
        self.events
            .iter()
            .filter(|event| {
                matches!(event, EngineEvent::Played { identity: id, .. } if id == identity)
            })
            .count()
    }

    pub fn volume_of(&self, handle: PlaybackHandle) -> Option<f32> {
        self.voices.get(&handle).map(|voice| voice.volume)
    }

    pub fn applied_channels(&self) -> Option<ChannelCapacity> {
        self.applied
    }
}

impl HostEngine for SimulatedEngine {
    fn master_volume(&self) -> f32 {
        self.master_volume
    }

    fn play(&mut self, request: &PlaybackRequest) -> Result<PlaybackHandle> {
        let identity = request.identity().to_owned();
        if self.rejected.contains(&identity) {
            self.events.push(EngineEvent::Rejected {
                identity: identity.clone(),
            });
            return Err(SoundError::playback(identity, "rejected by simulated engine"));
        }

        let handle = PlaybackHandle::new(self.next_handle);
        self.next_handle += 1;
        let volume = request.volume();
        let remaining_ticks = (!request.is_ambient()).then_some(self.spot_duration_ticks);
        self.voices.insert(
            handle,
            Voice {
                volume,
                remaining_ticks,
                fading: false,
            },
        );
        self.events.push(EngineEvent::Played {
            handle,
            identity,
            volume,
        });
        Ok(handle)
    }

    fn is_playing(&self, handle: PlaybackHandle) -> bool {
        self.voices.contains_key(&handle)
    }

    fn set_volume(&mut self, handle: PlaybackHandle, volume: f32) {
        if let Some(voice) = self.voices.get_mut(&handle) {
            voice.volume = volume;
            self.events.push(EngineEvent::VolumeChanged { handle, volume });
        }
    }

    fn fade(&mut self, handle: PlaybackHandle) {
        if let Some(voice) = self.voices.get_mut(&handle) {
            voice.fading = true;
            self.events.push(EngineEvent::Faded { handle });
        }
    }

    fn playing_count(&self) -> usize {
        self.voices.len() + self.background_load
    }

    fn probe_mono_sources(&mut self) -> Result<u32> {
        self.mono_sources
            .ok_or_else(|| SoundError::Probe("no output device".to_string()))
    }

    fn apply_channel_config(&mut self, capacity: &ChannelCapacity) {
        self.applied = Some(*capacity);
    }
}
