use std::collections::{HashMap, HashSet};

use crate::RegistryHook;

/// Outcome of running a sound identity through the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullVerdict {
    Play,
    /// Statically blocked; never plays.
    Blocked,
    /// Repeated inside the cooldown window.
    Culled,
}

/// Blocks configured identities and throttles repeats of culled ones.
///
/// Built wholesale from the registry; a reload replaces the whole filter
/// rather than patching entries.
#[derive(Debug, Clone, Default)]
pub struct CullingFilter {
    blocked: HashSet<String>,
    // None until the identity is first admitted
    culled: HashMap<String, Option<i64>>,
    threshold_ticks: i64,
}

impl CullingFilter {
    pub fn new(threshold_ticks: i64) -> Self {
        Self {
            threshold_ticks,
            ..Self::default()
        }
    }

    /// Classifies every known identity against the registry.
    pub fn rebuild<I, S>(registry: &RegistryHook, identities: I, threshold_ticks: i64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Self::new(threshold_ticks);
        for identity in identities {
            let identity = identity.as_ref();
            if registry.is_blocked(identity) {
                tracing::debug!(identity, "blocking sound");
                filter.blocked.insert(identity.to_owned());
            } else if registry.is_culled(identity) {
                tracing::debug!(identity, "culling sound");
                filter.culled.insert(identity.to_owned(), None);
            }
        }
        filter
    }

    pub fn should_block(&self, identity: &str) -> bool {
        self.blocked.contains(identity)
    }

    /// True when `identity` is culled and was last admitted fewer than
    /// `threshold` ticks ago. Otherwise records the admission and returns
    /// false.
    pub fn should_cull(&mut self, identity: &str, current_tick: i64) -> bool {
        if self.threshold_ticks <= 0 {
            return false;
        }
        let Some(last_admitted) = self.culled.get_mut(identity) else {
            return false;
        };

        match *last_admitted {
            Some(last) if current_tick - last < self.threshold_ticks => true,
            _ => {
                *last_admitted = Some(current_tick);
                false
            }
        }
    }

    pub fn evaluate(&mut self, identity: &str, current_tick: i64) -> CullVerdict {
        if self.should_block(identity) {
            CullVerdict::Blocked
        } else if self.should_cull(identity, current_tick) {
            CullVerdict::Culled
        } else {
            CullVerdict::Play
        }
    }

    pub fn blocked_count(&self) -> usize {
        self.blocked.len()
    }

    pub fn culled_count(&self) -> usize {
        self.culled.len()
    }
}
