//! Boundary to the host audio engine.
//!
//! The scheduler never mixes audio itself. It hands fully specified
//! [`PlaybackRequest`]s to a [`HostEngine`] and polls it for liveness and
//! channel utilisation. The engine's own bookkeeping is always the source of
//! truth; nothing here mirrors it across ticks.

use crate::{ChannelCapacity, PlaybackRequest, Result};

/// Opaque handle the host engine returns for a started sound instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlaybackHandle(u64);

impl PlaybackHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Operations the scheduler needs from the host audio engine.
///
/// Every call is expected to return promptly; the scheduler never waits on
/// the engine.
pub trait HostEngine {
    /// Current master gain. Zero or below means audio is effectively off.
    fn master_volume(&self) -> f32;

    /// Starts a sound instance.
    fn play(&mut self, request: &PlaybackRequest) -> Result<PlaybackHandle>;

    /// Whether the instance is still playing or queued inside the engine.
    fn is_playing(&self, handle: PlaybackHandle) -> bool;

    /// Adjusts the volume of a live instance in place.
    fn set_volume(&mut self, handle: PlaybackHandle, volume: f32);

    /// Ramps the instance to silence and releases it. Must not block.
    fn fade(&mut self, handle: PlaybackHandle);

    /// Number of instances the engine is currently playing, including sounds
    /// the scheduler did not start.
    fn playing_count(&self) -> usize;

    /// Total mono sources the output device supports.
    fn probe_mono_sources(&mut self) -> Result<u32>;

    /// Receives the channel split chosen during configuration.
    fn apply_channel_config(&mut self, _capacity: &ChannelCapacity) {}
}
