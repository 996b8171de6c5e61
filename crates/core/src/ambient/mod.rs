use std::collections::BTreeMap;

use crate::{
    queue::hand_off, CullingFilter, Handoff, HostEngine, PlaybackHandle, PlaybackRequest,
    SoundEffect,
};

/// Volume floor applied to every biome sound before weighting.
pub const BIOME_VOLUME_FLOOR: f32 = 0.3;

/// Owns one continuous ambient sound and keeps it queued in the host engine.
///
/// The host may silently drop a looping sound (channel stealing, device
/// reset). Each [`update`](Self::update) asks the engine whether the instance
/// is still alive and re-issues it if not. Re-issues pass through the culling
/// filter like any other request, so a culled identity retries once its
/// cooldown has run out.
#[derive(Debug)]
pub struct Emitter {
    effect: SoundEffect,
    active: Option<PlaybackHandle>,
    volume: f32,
}

impl Emitter {
    pub fn new(effect: SoundEffect) -> Self {
        let volume = effect.volume();
        Self {
            effect,
            active: None,
            volume,
        }
    }

    pub fn effect(&self) -> &SoundEffect {
        &self.effect
    }

    pub fn handle(&self) -> Option<PlaybackHandle> {
        self.active
    }

    /// Last volume set on this emitter.
    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn update<E: HostEngine>(
        &mut self,
        engine: &mut E,
        culling: &mut CullingFilter,
        tick: i64,
    ) {
        if engine.master_volume() <= 0.0 {
            return;
        }
        if let Some(handle) = self.active {
            if engine.is_playing(handle) {
                return;
            }
        }

        let request = PlaybackRequest::Ambient {
            effect: self.effect.clone(),
            volume: self.volume,
        };
        self.active = match hand_off(engine, culling, tick, &request) {
            Handoff::Played(handle) => Some(handle),
            Handoff::Suppressed(_) | Handoff::Failed => None,
        };
    }

    /// Updates the live instance in place; the value is also used for the
    /// next re-issue.
    pub fn set_volume<E: HostEngine>(&mut self, engine: &mut E, volume: f32) {
        self.volume = volume;
        if let Some(handle) = self.active {
            engine.set_volume(handle, volume);
        }
    }

    /// Hands the instance to the engine to fade out and gives up ownership.
    pub fn fade<E: HostEngine>(mut self, engine: &mut E) {
        if let Some(handle) = self.active.take() {
            engine.fade(handle);
        }
    }
}

/// Counts of what a reconciliation pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub faded: usize,
    pub refreshed: usize,
    pub created: usize,
}

impl ReconcileReport {
    /// True when no emitter was created or destroyed.
    pub fn is_stable(&self) -> bool {
        self.faded == 0 && self.created == 0
    }
}

/// Active emitters keyed by sound identity.
#[derive(Debug, Default)]
pub struct Reconciler {
    emitters: BTreeMap<String, Emitter>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Brings the emitter set in line with `desired`.
    ///
    /// `desired` is treated as a set keyed by identity; for duplicates the
    /// last entry's volume wins. Stale emitters are faded before any new one
    /// is created, and continuing emitters only get their volume refreshed.
    pub fn reconcile<E: HostEngine>(
        &mut self,
        desired: impl IntoIterator<Item = SoundEffect>,
        engine: &mut E,
    ) -> ReconcileReport {
        let mut incoming: BTreeMap<String, SoundEffect> = BTreeMap::new();
        for effect in desired {
            incoming.insert(effect.identity().to_owned(), effect);
        }

        let mut report = ReconcileReport::default();

        let stale: Vec<String> = self
            .emitters
            .keys()
            .filter(|identity| !incoming.contains_key(*identity))
            .cloned()
            .collect();
        for identity in stale {
            if let Some(emitter) = self.emitters.remove(&identity) {
                emitter.fade(engine);
                report.faded += 1;
            }
        }

        for (identity, emitter) in &mut self.emitters {
            if let Some(effect) = incoming.remove(identity) {
                emitter.set_volume(engine, effect.volume());
                report.refreshed += 1;
            }
        }

        for (identity, effect) in incoming {
            self.emitters.insert(identity, Emitter::new(effect));
            report.created += 1;
        }
        report
    }

    pub fn update<E: HostEngine>(
        &mut self,
        engine: &mut E,
        culling: &mut CullingFilter,
        tick: i64,
    ) {
        for emitter in self.emitters.values_mut() {
            emitter.update(engine, culling, tick);
        }
    }

    /// Fades and drops every emitter.
    pub fn clear<E: HostEngine>(&mut self, engine: &mut E) {
        for (_, emitter) in std::mem::take(&mut self.emitters) {
            emitter.fade(engine);
        }
    }

    pub fn get(&self, identity: &str) -> Option<&Emitter> {
        self.emitters.get(identity)
    }

    pub fn emitters(&self) -> impl Iterator<Item = &Emitter> {
        self.emitters.values()
    }

    pub fn len(&self) -> usize {
        self.emitters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emitters.is_empty()
    }
}

/// Merges biome sound contributions into one desired ambient list.
///
/// Each `(effect, weight)` pair is one surveyed biome offering `effect`,
/// weighted by how much of the survey `area` that biome covers. Weights are
/// summed per identity and the effect's volume is scaled by
/// `0.3 + 0.7 * weight / area`.
pub fn weighted_ambient_sounds<I>(contributions: I, area: u32) -> Vec<SoundEffect>
where
    I: IntoIterator<Item = (SoundEffect, u32)>,
{
    let mut totals: BTreeMap<String, (SoundEffect, u32)> = BTreeMap::new();
    for (effect, weight) in contributions {
        totals
            .entry(effect.identity().to_owned())
            .and_modify(|(_, total)| *total = total.saturating_add(weight))
            .or_insert((effect, weight));
    }

    let area = area.max(1) as f32;
    totals
        .into_values()
        .map(|(effect, weight)| {
            let scale = BIOME_VOLUME_FLOOR + (1.0 - BIOME_VOLUME_FLOOR) * (weight as f32 / area);
            effect.scaled_volume(scale)
        })
        .collect()
}
