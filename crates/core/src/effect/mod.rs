use std::{
    fmt,
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};

/// Mixer category a sound is routed through. The listener's per-category
/// level is applied during normalisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundCategory {
    #[default]
    Master,
    Music,
    Weather,
    Blocks,
    Hostile,
    Neutral,
    Players,
    Ambient,
}

impl fmt::Display for SoundCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Master => "master",
            Self::Music => "music",
            Self::Weather => "weather",
            Self::Blocks => "blocks",
            Self::Hostile => "hostile",
            Self::Neutral => "neutral",
            Self::Players => "players",
            Self::Ambient => "ambient",
        };
        f.write_str(name)
    }
}

/// Immutable description of a playable cue.
///
/// Two effects with the same identity are interchangeable: equality and
/// hashing only look at the identity key, so a continuing ambient sound is
/// matched by name and merely has its volume refreshed.
#[derive(Debug, Clone)]
pub struct SoundEffect {
    identity: String,
    category: SoundCategory,
    base_volume: f32,
    pitch: f32,
    scale: f32,
}

impl SoundEffect {
    /// Creates an effect at full volume and neutral pitch.
    pub fn new(identity: impl Into<String>, category: SoundCategory) -> Self {
        Self {
            identity: identity.into(),
            category,
            base_volume: 1.0,
            pitch: 1.0,
            scale: 1.0,
        }
    }

    /// Base volume, floored at zero.
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.base_volume = sanitize(volume, 0.0).max(0.0);
        self
    }

    /// Pitch multiplier; non-positive values fall back to 1.0.
    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = positive_or_one(pitch);
        self
    }

    /// Per-instance volume scale; non-positive values fall back to 1.0.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = positive_or_one(scale);
        self
    }

    /// Returns a copy whose volume is additionally scaled by `factor`.
    ///
    /// A zero or negative factor silences the copy; a non-finite product
    /// leaves the scale unchanged.
    pub fn scaled_volume(&self, factor: f32) -> Self {
        let mut scaled = self.clone();
        scaled.scale = sanitize(self.scale * factor, self.scale).max(0.0);
        scaled
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn category(&self) -> SoundCategory {
        self.category
    }

    pub fn base_volume(&self) -> f32 {
        self.base_volume
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Effective volume: base volume times the per-instance scale.
    pub fn volume(&self) -> f32 {
        self.base_volume * self.scale
    }
}

impl PartialEq for SoundEffect {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for SoundEffect {}

impl Hash for SoundEffect {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}

impl fmt::Display for SoundEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) v={:.2} p={:.2}",
            self.identity,
            self.category,
            self.volume(),
            self.pitch
        )
    }
}

fn sanitize(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

fn positive_or_one(value: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        1.0
    }
}

/// Integer block position a spot sound is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SoundPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl SoundPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for SoundPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Where a spot sound plays: pinned to a position or following the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotTarget {
    Listener,
    At(SoundPos),
}

/// Fully specified request handed to the host engine.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackRequest {
    /// Continuous sound owned by an emitter, played at the emitter's volume.
    Ambient { effect: SoundEffect, volume: f32 },
    /// One-shot sound.
    Spot { effect: SoundEffect, target: SpotTarget },
}

impl PlaybackRequest {
    pub fn effect(&self) -> &SoundEffect {
        match self {
            Self::Ambient { effect, .. } | Self::Spot { effect, .. } => effect,
        }
    }

    pub fn identity(&self) -> &str {
        self.effect().identity()
    }

    /// Volume the host should start the instance at.
    pub fn volume(&self) -> f32 {
        match self {
            Self::Ambient { volume, .. } => *volume,
            Self::Spot { effect, .. } => effect.volume(),
        }
    }

    pub fn is_ambient(&self) -> bool {
        matches!(self, Self::Ambient { .. })
    }
}

impl fmt::Display for PlaybackRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ambient { effect, volume } => write!(f, "ambient {effect} @{volume:.2}"),
            Self::Spot {
                effect,
                target: SpotTarget::Listener,
            } => write!(f, "spot {effect} at listener"),
            Self::Spot {
                effect,
                target: SpotTarget::At(pos),
            } => write!(f, "spot {effect} at {pos}"),
        }
    }
}
