use std::collections::VecDeque;

use crate::{
    ChannelCapacity, CullVerdict, CullingFilter, HostEngine, PlaybackHandle, PlaybackRequest,
    SoundEffect, SpotTarget,
};

/// Pending spot sounds reaching this age are dropped without playing.
pub const AGE_THRESHOLD_TICKS: i32 = 5;

/// A spot sound waiting for its delay to elapse or for a free channel.
#[derive(Debug, Clone)]
pub struct PendingSpotSound {
    effect: SoundEffect,
    target: SpotTarget,
    tick_age: i32,
    requested_delay_ticks: u32,
}

impl PendingSpotSound {
    pub fn new(effect: SoundEffect, target: SpotTarget, delay_ticks: u32) -> Self {
        let delay = i32::try_from(delay_ticks).unwrap_or(i32::MAX);
        Self {
            effect,
            target,
            tick_age: -delay,
            requested_delay_ticks: delay_ticks,
        }
    }

    pub fn effect(&self) -> &SoundEffect {
        &self.effect
    }

    /// Negative while the requested delay is still running.
    pub fn tick_age(&self) -> i32 {
        self.tick_age
    }

    pub fn requested_delay_ticks(&self) -> u32 {
        self.requested_delay_ticks
    }

    pub fn is_delayed(&self) -> bool {
        self.tick_age < 0
    }

    pub fn request(&self) -> PlaybackRequest {
        PlaybackRequest::Spot {
            effect: self.effect.clone(),
            target: self.target,
        }
    }
}

/// Result of handing one request to the host engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handoff {
    Played(PlaybackHandle),
    Suppressed(CullVerdict),
    Failed,
}

/// Runs `request` through the culling filter and, if it passes, plays it.
/// Engine errors are logged and the request is dropped.
pub(crate) fn hand_off<E: HostEngine>(
    engine: &mut E,
    culling: &mut CullingFilter,
    tick: i64,
    request: &PlaybackRequest,
) -> Handoff {
    match culling.evaluate(request.identity(), tick) {
        CullVerdict::Play => {}
        verdict => {
            tracing::debug!(identity = request.identity(), ?verdict, "suppressed");
            return Handoff::Suppressed(verdict);
        }
    }

    tracing::debug!(%request, "PLAYING");
    match engine.play(request) {
        Ok(handle) => Handoff::Played(handle),
        Err(err) => {
            tracing::error!(identity = request.identity(), %err, "unable to play sound");
            Handoff::Failed
        }
    }
}

/// Tally of one [`PendingQueue::drain_ready`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub admitted: usize,
    pub expired: usize,
    pub suppressed: usize,
    pub failed: usize,
}

/// FIFO of spot sounds that could not play immediately.
#[derive(Debug)]
pub struct PendingQueue {
    entries: VecDeque<PendingSpotSound>,
    age_threshold: i32,
}

impl Default for PendingQueue {
    fn default() -> Self {
        Self::new(AGE_THRESHOLD_TICKS)
    }
}

impl PendingQueue {
    pub fn new(age_threshold: i32) -> Self {
        Self {
            entries: VecDeque::new(),
            age_threshold,
        }
    }

    pub fn enqueue(&mut self, effect: SoundEffect, target: SpotTarget, delay_ticks: u32) {
        self.entries
            .push_back(PendingSpotSound::new(effect, target, delay_ticks));
    }

    /// One tick of queue maintenance.
    ///
    /// Entries at or past the age threshold are dropped. Eligible entries are
    /// then admitted in insertion order for as long as the engine reports a
    /// free channel; the engine is polled again before each admission.
    /// Whatever remains ages by one tick.
    pub fn drain_ready<E: HostEngine>(
        &mut self,
        engine: &mut E,
        capacity: &ChannelCapacity,
        culling: &mut CullingFilter,
        tick: i64,
    ) -> DrainReport {
        let threshold = self.age_threshold;
        let mut report = DrainReport::default();

        self.entries.retain(|pending| {
            if pending.tick_age >= threshold {
                tracing::debug!(effect = %pending.effect, "AGING");
                report.expired += 1;
                return false;
            }
            if pending.tick_age < 0 || !capacity.can_admit_one(&*engine) {
                return true;
            }
            match hand_off(engine, culling, tick, &pending.request()) {
                Handoff::Played(_) => report.admitted += 1,
                Handoff::Suppressed(_) => report.suppressed += 1,
                Handoff::Failed => report.failed += 1,
            }
            false
        });

        for pending in &mut self.entries {
            pending.tick_age += 1;
        }
        report
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingSpotSound> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RegistryHook, SimulatedEngine, SoundCategory, SoundPos, StaticRegistry};

    fn drip() -> SoundEffect {
        SoundEffect::new("water.drip", SoundCategory::Ambient)
    }

    fn harness() -> (SimulatedEngine, ChannelCapacity, CullingFilter) {
        (
            SimulatedEngine::new(),
            ChannelCapacity::default(),
            CullingFilter::new(0),
        )
    }

    #[test]
    fn delayed_entries_wait_for_their_delay() {
        let (mut engine, capacity, mut culling) = harness();
        let mut queue = PendingQueue::default();
        queue.enqueue(drip(), SpotTarget::At(SoundPos::new(0, 64, 0)), 3);

        for tick in 0..3 {
            let report = queue.drain_ready(&mut engine, &capacity, &mut culling, tick);
            assert_eq!(report.admitted, 0, "admitted early at tick {tick}");
            assert!(queue.iter().all(|p| p.requested_delay_ticks() == 3));
        }
        let report = queue.drain_ready(&mut engine, &capacity, &mut culling, 3);
        assert_eq!(report.admitted, 1);
        assert!(queue.is_empty());
        assert_eq!(engine.play_count("water.drip"), 1);
    }

    #[test]
    fn saturated_engine_ages_entries_out() {
        let (mut engine, capacity, mut culling) = harness();
        engine.set_background_load(capacity.admission_limit());
        let mut queue = PendingQueue::default();
        queue.enqueue(drip(), SpotTarget::Listener, 0);

        for tick in 0..5 {
            let report = queue.drain_ready(&mut engine, &capacity, &mut culling, tick);
            assert_eq!(report, DrainReport::default());
            assert_eq!(queue.len(), 1);
            assert_eq!(queue.iter().next().unwrap().tick_age(), tick as i32 + 1);
        }
        let report = queue.drain_ready(&mut engine, &capacity, &mut culling, 5);
        assert_eq!(report.expired, 1);
        assert!(queue.is_empty());
        assert_eq!(engine.play_count("water.drip"), 0);
    }

    #[test]
    fn admission_stops_once_capacity_is_used_up() {
        let (mut engine, capacity, mut culling) = harness();
        engine.set_background_load(capacity.admission_limit() - 2);
        let mut queue = PendingQueue::default();
        for i in 0..4 {
            queue.enqueue(
                SoundEffect::new(format!("spot.{i}"), SoundCategory::Blocks),
                SpotTarget::Listener,
                0,
            );
        }

        let report = queue.drain_ready(&mut engine, &capacity, &mut culling, 0);
        assert_eq!(report.admitted, 2);
        assert_eq!(engine.play_count("spot.0"), 1);
        assert_eq!(engine.play_count("spot.1"), 1);
        let waiting: Vec<_> = queue.iter().map(|p| p.effect().identity().to_string()).collect();
        assert_eq!(waiting, ["spot.2", "spot.3"]);
        assert!(!capacity.can_admit_one(&engine));
    }

    #[test]
    fn engine_failures_drop_the_request() {
        let (mut engine, capacity, mut culling) = harness();
        engine.reject("water.drip");
        let mut queue = PendingQueue::default();
        queue.enqueue(drip(), SpotTarget::Listener, 0);

        let report = queue.drain_ready(&mut engine, &capacity, &mut culling, 0);
        assert_eq!(report.failed, 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn culled_entries_are_consumed_without_playing() {
        let (mut engine, capacity, _) = harness();
        let registry = RegistryHook::present(StaticRegistry::new().block("water.drip"));
        let mut culling = CullingFilter::rebuild(&registry, ["water.drip"], 20);
        let mut queue = PendingQueue::default();
        queue.enqueue(drip(), SpotTarget::Listener, 0);

        let report = queue.drain_ready(&mut engine, &capacity, &mut culling, 0);
        assert_eq!(report.suppressed, 1);
        assert!(queue.is_empty());
        assert_eq!(engine.play_count("water.drip"), 0);
    }
}
