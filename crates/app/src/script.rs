//! JSON tick scripts replayed by `soundscape simulate`.

use std::{fs, path::Path};

use serde::Deserialize;
use soundscape_core::{
    RegistryHook, Result, SimulatedEngine, SoundCategory, SoundEffect, SoundFrame, SoundPos,
    SpotRequest, StaticRegistry,
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    /// Mono sources the simulated device reports; omit to make the probe fail.
    #[serde(default)]
    pub mono_sources: Option<u32>,
    #[serde(default)]
    pub registry: Option<StaticRegistry>,
    pub frames: Vec<FrameSpec>,
}

impl Script {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    pub fn engine(&self) -> SimulatedEngine {
        SimulatedEngine::new().with_mono_sources(self.mono_sources)
    }

    /// Registry hook plus the identities the culling filter should know.
    pub fn registry(&self) -> Option<(RegistryHook, Vec<String>)> {
        self.registry.as_ref().map(|registry| {
            let identities = registry.identities().into_iter().collect();
            (RegistryHook::present(registry.clone()), identities)
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrameSpec {
    #[serde(default = "alive")]
    pub listener_alive: bool,
    #[serde(default)]
    pub ambient: Vec<EffectSpec>,
    #[serde(default)]
    pub spots: Vec<SpotSpec>,
    /// Channels held by sounds the scheduler does not own.
    #[serde(default)]
    pub background_load: Option<usize>,
    /// Replays the frame this many times.
    #[serde(default = "once")]
    pub repeat: u32,
}

fn alive() -> bool {
    true
}

fn once() -> u32 {
    1
}

impl FrameSpec {
    pub fn to_frame(&self) -> SoundFrame {
        SoundFrame {
            listener_alive: self.listener_alive,
            ambient: self.ambient.iter().map(EffectSpec::to_effect).collect(),
            spots: self.spots.iter().map(SpotSpec::to_request).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EffectSpec {
    pub identity: String,
    #[serde(default)]
    pub category: SoundCategory,
    #[serde(default = "unit")]
    pub volume: f32,
    #[serde(default = "unit")]
    pub pitch: f32,
}

fn unit() -> f32 {
    1.0
}

impl EffectSpec {
    pub fn to_effect(&self) -> SoundEffect {
        SoundEffect::new(self.identity.clone(), self.category)
            .with_volume(self.volume)
            .with_pitch(self.pitch)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpotSpec {
    pub identity: String,
    #[serde(default)]
    pub category: SoundCategory,
    #[serde(default = "unit")]
    pub volume: f32,
    #[serde(default = "unit")]
    pub pitch: f32,
    /// Omit to play at the listener.
    #[serde(default)]
    pub at: Option<SoundPos>,
    #[serde(default)]
    pub delay_ticks: u32,
}

impl SpotSpec {
    pub fn to_request(&self) -> SpotRequest {
        let effect = SoundEffect::new(self.identity.clone(), self.category)
            .with_volume(self.volume)
            .with_pitch(self.pitch);
        match self.at {
            Some(pos) => SpotRequest::at(pos, effect, self.delay_ticks),
            None => SpotRequest::at_listener(effect),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soundscape_core::SpotTarget;

    const SCRIPT: &str = r#"{
        "mono_sources": 255,
        "registry": { "culled": ["water.drip"] },
        "frames": [
            { "ambient": [{ "identity": "ambient.rain", "category": "weather", "volume": 0.5 }] },
            {
                "spots": [{ "identity": "water.drip", "at": { "x": 1, "y": 64, "z": -3 }, "delay_ticks": 4 }],
                "repeat": 3
            },
            { "listener_alive": false }
        ]
    }"#;

    #[test]
    fn parses_frames_with_defaults() {
        let script = Script::from_json_str(SCRIPT).unwrap();
        assert_eq!(script.mono_sources, Some(255));
        assert_eq!(script.frames.len(), 3);

        let first = script.frames[0].to_frame();
        assert!(first.listener_alive);
        assert_eq!(first.ambient[0].category(), SoundCategory::Weather);
        assert_eq!(script.frames[0].repeat, 1);

        let second = script.frames[1].to_frame();
        assert_eq!(second.spots[0].target, SpotTarget::At(SoundPos::new(1, 64, -3)));
        assert_eq!(second.spots[0].delay_ticks, 4);
        assert_eq!(second.spots[0].effect.category(), SoundCategory::Master);
        assert_eq!(script.frames[1].repeat, 3);

        assert!(!script.frames[2].listener_alive);
    }

    #[test]
    fn registry_identities_come_along() {
        let script = Script::from_json_str(SCRIPT).unwrap();
        let (hook, identities) = script.registry().unwrap();
        assert!(hook.is_culled("water.drip"));
        assert_eq!(identities, ["water.drip"]);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(Script::from_json_str(r#"{ "frames": [{ "ambiance": [] }] }"#).is_err());
    }
}
