//! Registry overrides consulted by culling and normalisation.
//!
//! A host may or may not ship a sound registry. [`RegistryHook`] makes that
//! choice explicit at startup: with no registry present every lookup answers
//! with the neutral default (not blocked, not culled, scale 1.0).

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt, fs,
    path::Path,
    sync::Arc,
};

use serde::{Deserialize, Serialize};

use crate::Result;

/// Per-identity overrides supplied by the host's sound registry.
pub trait SoundRegistry: Send + Sync {
    /// Identity never plays.
    fn is_blocked(&self, identity: &str) -> bool;

    /// Identity is throttled by the culling cooldown.
    fn is_culled(&self, identity: &str) -> bool;

    /// Volume multiplier applied during normalisation.
    fn volume_scale(&self, _identity: &str) -> f32 {
        1.0
    }
}

/// Registry integration that is either present or explicitly absent.
#[derive(Clone, Default)]
pub enum RegistryHook {
    Present(Arc<dyn SoundRegistry>),
    #[default]
    Absent,
}

impl RegistryHook {
    pub fn present<R: SoundRegistry + 'static>(registry: R) -> Self {
        Self::Present(Arc::new(registry))
    }

    /// Enables the hook only when a registry was detected.
    pub fn detect(registry: Option<Arc<dyn SoundRegistry>>) -> Self {
        match registry {
            Some(registry) => Self::Present(registry),
            None => {
                tracing::debug!("no sound registry detected, overrides disabled");
                Self::Absent
            }
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    pub fn is_blocked(&self, identity: &str) -> bool {
        match self {
            Self::Present(registry) => registry.is_blocked(identity),
            Self::Absent => false,
        }
    }

    pub fn is_culled(&self, identity: &str) -> bool {
        match self {
            Self::Present(registry) => registry.is_culled(identity),
            Self::Absent => false,
        }
    }

    /// Scale for `identity`. Negative or non-finite registry values are
    /// treated as 1.0.
    pub fn volume_scale(&self, identity: &str) -> f32 {
        match self {
            Self::Present(registry) => {
                let scale = registry.volume_scale(identity);
                if scale.is_finite() && scale >= 0.0 {
                    scale
                } else {
                    tracing::warn!(identity, scale, "ignoring invalid registry volume scale");
                    1.0
                }
            }
            Self::Absent => 1.0,
        }
    }
}

impl fmt::Debug for RegistryHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present(_) => f.write_str("RegistryHook::Present"),
            Self::Absent => f.write_str("RegistryHook::Absent"),
        }
    }
}

/// Registry backed by fixed identity lists, loadable from JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticRegistry {
    pub blocked: BTreeSet<String>,
    pub culled: BTreeSet<String>,
    pub volume_scale: BTreeMap<String, f32>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block(mut self, identity: impl Into<String>) -> Self {
        self.blocked.insert(identity.into());
        self
    }

    pub fn cull(mut self, identity: impl Into<String>) -> Self {
        self.culled.insert(identity.into());
        self
    }

    pub fn scale(mut self, identity: impl Into<String>, scale: f32) -> Self {
        self.volume_scale.insert(identity.into(), scale);
        self
    }

    /// Every identity this registry mentions.
    pub fn identities(&self) -> BTreeSet<String> {
        self.blocked
            .iter()
            .chain(self.culled.iter())
            .chain(self.volume_scale.keys())
            .cloned()
            .collect()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }
}

impl SoundRegistry for StaticRegistry {
    fn is_blocked(&self, identity: &str) -> bool {
        self.blocked.contains(identity)
    }

    fn is_culled(&self, identity: &str) -> bool {
        self.culled.contains(identity)
    }

    fn volume_scale(&self, identity: &str) -> f32 {
        self.volume_scale.get(identity).copied().unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_hook_is_neutral() {
        let hook = RegistryHook::detect(None);
        assert!(!hook.is_present());
        assert!(!hook.is_blocked("anything"));
        assert!(!hook.is_culled("anything"));
        assert_eq!(hook.volume_scale("anything"), 1.0);
    }

    #[test]
    fn present_hook_forwards_lookups() {
        let hook = RegistryHook::present(
            StaticRegistry::new()
                .block("mob.ghast.moan")
                .cull("random.door_open")
                .scale("ambient.rain", 0.5),
        );
        assert!(hook.is_blocked("mob.ghast.moan"));
        assert!(hook.is_culled("random.door_open"));
        assert_eq!(hook.volume_scale("ambient.rain"), 0.5);
        assert_eq!(hook.volume_scale("other"), 1.0);
    }

    #[test]
    fn invalid_scales_are_ignored() {
        let hook = RegistryHook::present(StaticRegistry::new().scale("bad", -3.0));
        assert_eq!(hook.volume_scale("bad"), 1.0);
    }

    #[test]
    fn loads_from_json() {
        let registry = StaticRegistry::from_json_str(
            r#"{ "blocked": ["a"], "volume_scale": { "b": 0.25 } }"#,
        )
        .unwrap();
        assert!(registry.is_blocked("a"));
        assert!(!registry.is_culled("a"));
        assert_eq!(registry.volume_scale("b"), 0.25);
        assert_eq!(registry.identities().len(), 2);
    }
}
