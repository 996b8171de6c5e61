//! Final volume and pitch computation for sound instances.
//!
//! The host engine calls into [`Normalizer`] from its own thread at the moment
//! it mixes a sound. Nothing in here reads or writes scheduler state: the only
//! inputs are the arguments, the registry hook and the listener's category
//! mix, both shared behind a read-mostly lock.

use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{RegistryHook, SoundCategory, SoundEffect};

pub const MIN_PITCH: f32 = 0.5;
pub const MAX_PITCH: f32 = 2.0;

/// Asset-declared values of the pool entry the host picked for a sound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoolEntry {
    pub volume: f32,
    pub pitch: f32,
}

impl Default for PoolEntry {
    fn default() -> Self {
        Self {
            volume: 1.0,
            pitch: 1.0,
        }
    }
}

/// Listener volume settings per category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryMix {
    levels: HashMap<SoundCategory, f32>,
}

impl CategoryMix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, category: SoundCategory, level: f32) -> Self {
        self.set_level(category, level);
        self
    }

    pub fn set_level(&mut self, category: SoundCategory, level: f32) {
        let level = if level.is_finite() { level.clamp(0.0, 1.0) } else { 1.0 };
        self.levels.insert(category, level);
    }

    /// Listener level for `category`. Master and unset categories are 1.0.
    pub fn level(&self, category: SoundCategory) -> f32 {
        if category == SoundCategory::Master {
            return 1.0;
        }
        self.levels.get(&category).copied().unwrap_or(1.0)
    }
}

/// clamp(volume × pool × category × scale, 0, 1); NaN maps to silence.
pub fn normalize_volume(
    sound_volume: f32,
    pool_volume: f32,
    category_volume: f32,
    registry_scale: f32,
) -> f32 {
    let raw = sound_volume * pool_volume * category_volume * registry_scale;
    if raw.is_nan() {
        0.0
    } else {
        raw.clamp(0.0, 1.0)
    }
}

/// clamp(pitch × pool pitch, 0.5, 2.0); NaN maps to neutral pitch.
pub fn normalize_pitch(sound_pitch: f32, pool_pitch: f32) -> f32 {
    let raw = sound_pitch * pool_pitch;
    if raw.is_nan() {
        1.0
    } else {
        raw.clamp(MIN_PITCH, MAX_PITCH)
    }
}

#[derive(Debug, Default)]
struct Shared {
    registry: RegistryHook,
    mix: CategoryMix,
}

/// Thread-safe normalisation entry point handed to the host engine.
///
/// Clones share the same registry and mix, so a settings change made through
/// one clone is seen by the engine's copy.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    shared: Arc<RwLock<Shared>>,
}

impl Normalizer {
    pub fn new(registry: RegistryHook, mix: CategoryMix) -> Self {
        Self {
            shared: Arc::new(RwLock::new(Shared { registry, mix })),
        }
    }

    pub fn replace_registry(&self, registry: RegistryHook) {
        self.shared.write().registry = registry;
    }

    pub fn set_category_level(&self, category: SoundCategory, level: f32) {
        self.shared.write().mix.set_level(category, level);
    }

    /// Final volume for a sound instance, in `[0, 1]`.
    ///
    /// A missing sound, pool entry or category yields silence and a warning.
    pub fn normalized_volume(
        &self,
        sound: Option<&SoundEffect>,
        pool: Option<&PoolEntry>,
        category: Option<SoundCategory>,
    ) -> f32 {
        let Some(sound) = sound else {
            tracing::warn!("normalized_volume(): missing sound");
            return 0.0;
        };
        let Some(pool) = pool else {
            tracing::warn!(identity = sound.identity(), "normalized_volume(): missing pool entry");
            return 0.0;
        };
        let Some(category) = category else {
            tracing::warn!(identity = sound.identity(), "normalized_volume(): missing category");
            return 0.0;
        };

        let shared = self.shared.read();
        normalize_volume(
            sound.volume(),
            pool.volume,
            shared.mix.level(category),
            shared.registry.volume_scale(sound.identity()),
        )
    }

    /// Final pitch for a sound instance, in `[0.5, 2.0]`.
    ///
    /// Without a pool entry the sound's own pitch is clamped; without a sound
    /// the neutral pitch is returned.
    pub fn normalized_pitch(&self, sound: Option<&SoundEffect>, pool: Option<&PoolEntry>) -> f32 {
        let Some(sound) = sound else {
            tracing::warn!("normalized_pitch(): missing sound");
            return 1.0;
        };
        match pool {
            Some(pool) => normalize_pitch(sound.pitch(), pool.pitch),
            None => {
                tracing::warn!(
                    identity = sound.identity(),
                    "normalized_pitch(): missing pool entry"
                );
                normalize_pitch(sound.pitch(), 1.0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::StaticRegistry;

    fn rain(volume: f32) -> SoundEffect {
        SoundEffect::new("ambient.rain", SoundCategory::Weather).with_volume(volume)
    }

    #[test]
    fn registry_scale_halves_volume() {
        let normalizer = Normalizer::new(
            RegistryHook::present(StaticRegistry::new().scale("ambient.rain", 0.5)),
            CategoryMix::new(),
        );
        let volume = normalizer.normalized_volume(
            Some(&rain(1.0)),
            Some(&PoolEntry::default()),
            Some(SoundCategory::Weather),
        );
        assert_eq!(volume, 0.5);
    }

    #[test]
    fn volume_is_clamped_to_unit_range() {
        assert_eq!(normalize_volume(5.0, 1.0, 1.0, 1.0), 1.0);
        assert_eq!(normalize_volume(-1.0, 1.0, 1.0, 1.0), 0.0);
        assert_eq!(normalize_volume(f32::NAN, 1.0, 1.0, 1.0), 0.0);
        assert_eq!(normalize_volume(f32::INFINITY, 1.0, 1.0, 1.0), 1.0);
        for raw in [0.0_f32, 0.3, 0.99, 1.0, 2.5, 100.0] {
            let v = normalize_volume(raw, 1.3, 0.9, 2.0);
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn pitch_is_clamped_to_octave_range() {
        assert_eq!(normalize_pitch(0.1, 1.0), MIN_PITCH);
        assert_eq!(normalize_pitch(3.0, 1.5), MAX_PITCH);
        assert_relative_eq!(normalize_pitch(1.2, 1.0), 1.2);
        assert_eq!(normalize_pitch(f32::NAN, 1.0), 1.0);
    }

    #[test]
    fn category_level_applies_except_for_master() {
        let normalizer = Normalizer::new(
            RegistryHook::Absent,
            CategoryMix::new()
                .with_level(SoundCategory::Weather, 0.5)
                .with_level(SoundCategory::Master, 0.1),
        );
        let pool = PoolEntry::default();
        let sound = rain(0.8);
        let weather =
            normalizer.normalized_volume(Some(&sound), Some(&pool), Some(SoundCategory::Weather));
        assert_relative_eq!(weather, 0.4);
        let master =
            normalizer.normalized_volume(Some(&sound), Some(&pool), Some(SoundCategory::Master));
        assert_relative_eq!(master, 0.8);
    }

    #[test]
    fn missing_inputs_are_silent() {
        let normalizer = Normalizer::default();
        let pool = PoolEntry::default();
        let sound = rain(1.0);
        let weather = Some(SoundCategory::Weather);
        assert_eq!(normalizer.normalized_volume(None, Some(&pool), weather), 0.0);
        assert_eq!(normalizer.normalized_volume(Some(&sound), None, weather), 0.0);
        assert_eq!(normalizer.normalized_volume(Some(&sound), Some(&pool), None), 0.0);
    }

    #[test]
    fn missing_pitch_inputs_stay_in_range() {
        let normalizer = Normalizer::default();
        let shrill = rain(1.0).with_pitch(4.0);
        assert_eq!(normalizer.normalized_pitch(Some(&shrill), None), MAX_PITCH);
        assert_eq!(normalizer.normalized_pitch(None, None), 1.0);
    }

    #[test]
    fn clones_share_settings_across_threads() {
        let normalizer = Normalizer::default();
        let engine_side = normalizer.clone();
        normalizer.set_category_level(SoundCategory::Weather, 0.25);

        let handle = std::thread::spawn(move || {
            engine_side.normalized_volume(
                Some(&rain(1.0)),
                Some(&PoolEntry::default()),
                Some(SoundCategory::Weather),
            )
        });
        assert_eq!(handle.join().unwrap(), 0.25);
    }
}
