use crate::{
    queue::hand_off, AppConfig, CategoryMix, ChannelCapacity, CullVerdict, CullingFilter,
    DrainReport, Handoff, HostEngine, Normalizer, PendingQueue, PlaybackRequest,
    ReconcileReport, Reconciler, RegistryHook, SoundConfig, SoundEffect, SoundPos, SpotTarget,
};

/// A spot sound requested by a collaborator during a tick.
#[derive(Debug, Clone)]
pub struct SpotRequest {
    pub effect: SoundEffect,
    pub target: SpotTarget,
    /// Only honoured for positioned sounds.
    pub delay_ticks: u32,
}

impl SpotRequest {
    pub fn at_listener(effect: SoundEffect) -> Self {
        Self {
            effect,
            target: SpotTarget::Listener,
            delay_ticks: 0,
        }
    }

    pub fn at(pos: SoundPos, effect: SoundEffect, delay_ticks: u32) -> Self {
        Self {
            effect,
            target: SpotTarget::At(pos),
            delay_ticks,
        }
    }
}

/// Everything collaborators produced for one tick.
#[derive(Debug, Clone)]
pub struct SoundFrame {
    pub listener_alive: bool,
    pub ambient: Vec<SoundEffect>,
    pub spots: Vec<SpotRequest>,
}

impl Default for SoundFrame {
    fn default() -> Self {
        Self {
            listener_alive: true,
            ambient: Vec::new(),
            spots: Vec::new(),
        }
    }
}

/// What happened to a spot request at the moment it was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotOutcome {
    Played,
    Queued,
    Suppressed(CullVerdict),
    /// Delayed request arriving while every channel was in use.
    Dropped,
    Failed,
}

impl From<Handoff> for SpotOutcome {
    fn from(handoff: Handoff) -> Self {
        match handoff {
            Handoff::Played(_) => Self::Played,
            Handoff::Suppressed(verdict) => Self::Suppressed(verdict),
            Handoff::Failed => Self::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: i64,
    pub reconcile: ReconcileReport,
    pub drained: DrainReport,
    pub reset: bool,
}

/// One audio session's scheduling state.
///
/// Owns the emitter table, the pending queue and the culling state; nothing
/// is held in statics. All methods taking `&mut self` belong to the tick
/// thread. The engine thread gets its own [`Normalizer`] clone.
pub struct SoundScheduler<E: HostEngine> {
    engine: E,
    config: SoundConfig,
    capacity: ChannelCapacity,
    ambient: Reconciler,
    pending: PendingQueue,
    culling: CullingFilter,
    normalizer: Normalizer,
    tick: i64,
}

impl<E: HostEngine> SoundScheduler<E> {
    /// Creates a scheduler using the configured channel counts. Call
    /// [`configure_sound`](Self::configure_sound) to probe the device.
    pub fn new(engine: E, config: SoundConfig) -> Self {
        Self::with_mix(engine, config, CategoryMix::default())
    }

    pub fn from_app_config(engine: E, config: AppConfig) -> Self {
        Self::with_mix(engine, config.sound, config.mix)
    }

    fn with_mix(engine: E, config: SoundConfig, mix: CategoryMix) -> Self {
        Self {
            engine,
            capacity: ChannelCapacity::from_config(&config),
            pending: PendingQueue::new(config.age_threshold_ticks),
            culling: CullingFilter::new(config.culling_threshold_ticks),
            normalizer: Normalizer::new(RegistryHook::Absent, mix),
            ambient: Reconciler::new(),
            config,
            tick: 0,
        }
    }

    /// Probes the device and (re)derives the channel split.
    pub fn configure_sound(&mut self) -> ChannelCapacity {
        self.capacity = ChannelCapacity::configure(&mut self.engine, &self.config);
        self.capacity
    }

    /// Installs a new registry: culling is rebuilt from scratch for
    /// `identities` and every sound is cleared.
    pub fn on_registry_reload<I, S>(&mut self, registry: RegistryHook, identities: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.culling =
            CullingFilter::rebuild(&registry, identities, self.config.culling_threshold_ticks);
        self.normalizer.replace_registry(registry);
        self.clear_sounds();
    }

    /// Reconciles the ambient emitters against this tick's desired set.
    pub fn queue_ambient_sounds(&mut self, desired: Vec<SoundEffect>) -> ReconcileReport {
        let desired = desired.into_iter().filter(|effect| {
            let blocked = self.culling.should_block(effect.identity());
            if blocked {
                tracing::debug!(identity = effect.identity(), "ambient sound blocked");
            }
            !blocked
        });
        self.ambient.reconcile(desired, &mut self.engine)
    }

    /// Plays a sound following the listener, queueing it when no channel is
    /// free.
    pub fn play_sound_at_listener(&mut self, effect: SoundEffect) -> SpotOutcome {
        if self.can_admit_one() {
            self.play_now(PlaybackRequest::Spot {
                effect,
                target: SpotTarget::Listener,
            })
        } else {
            self.pending.enqueue(effect, SpotTarget::Listener, 0);
            SpotOutcome::Queued
        }
    }

    /// Plays a sound following the listener immediately, without capacity
    /// gating.
    pub fn play_sound_at_listener_now(&mut self, effect: SoundEffect) -> SpotOutcome {
        self.play_now(PlaybackRequest::Spot {
            effect,
            target: SpotTarget::Listener,
        })
    }

    /// Plays a positioned sound, optionally after `delay_ticks`.
    ///
    /// A delayed request made while every channel is in use is dropped on
    /// the spot. Undelayed requests wait in the queue instead.
    pub fn play_sound_at(
        &mut self,
        pos: SoundPos,
        effect: SoundEffect,
        delay_ticks: u32,
    ) -> SpotOutcome {
        let fits = self.can_admit_one();
        if delay_ticks > 0 && !fits {
            tracing::debug!(
                identity = effect.identity(),
                delay_ticks,
                "dropping delayed sound, no free channel"
            );
            return SpotOutcome::Dropped;
        }
        if delay_ticks > 0 || !fits {
            self.pending.enqueue(effect, SpotTarget::At(pos), delay_ticks);
            return SpotOutcome::Queued;
        }
        self.play_now(PlaybackRequest::Spot {
            effect,
            target: SpotTarget::At(pos),
        })
    }

    pub fn request_spot(&mut self, request: SpotRequest) -> SpotOutcome {
        match request.target {
            SpotTarget::Listener => self.play_sound_at_listener(request.effect),
            SpotTarget::At(pos) => self.play_sound_at(pos, request.effect, request.delay_ticks),
        }
    }

    fn play_now(&mut self, request: PlaybackRequest) -> SpotOutcome {
        hand_off(&mut self.engine, &mut self.culling, self.tick, &request).into()
    }

    /// Tick entry point: services the pending queue, then keeps every
    /// emitter's sound alive.
    pub fn update(&mut self) -> TickReport {
        let drained = self.pending.drain_ready(
            &mut self.engine,
            &self.capacity,
            &mut self.culling,
            self.tick,
        );
        self.ambient.update(&mut self.engine, &mut self.culling, self.tick);

        let report = TickReport {
            tick: self.tick,
            drained,
            ..TickReport::default()
        };
        self.tick += 1;
        report
    }

    /// Runs one full tick from collaborator output.
    ///
    /// A dead listener hears nothing: sounds are cleared and the frame is
    /// otherwise ignored. Otherwise ambient reconciliation runs first, spot
    /// requests are placed, and [`update`](Self::update) finishes the tick.
    pub fn tick(&mut self, frame: SoundFrame) -> TickReport {
        if !frame.listener_alive {
            self.clear_sounds();
            let report = TickReport {
                tick: self.tick,
                reset: true,
                ..TickReport::default()
            };
            self.tick += 1;
            return report;
        }

        let reconcile = self.queue_ambient_sounds(frame.ambient);
        for spot in frame.spots {
            self.request_spot(spot);
        }
        let mut report = self.update();
        report.reconcile = reconcile;
        report
    }

    /// Fades every emitter and drops every pending sound.
    pub fn clear_sounds(&mut self) {
        self.ambient.clear(&mut self.engine);
        self.pending.clear();
    }

    /// Culling check for sounds the host starts on its own.
    pub fn filter_sound(&mut self, identity: &str) -> CullVerdict {
        self.culling.evaluate(identity, self.tick)
    }

    pub fn can_admit_one(&self) -> bool {
        self.capacity.can_admit_one(&self.engine)
    }

    /// Human-readable state for debug overlays.
    pub fn diagnostics(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(1 + self.ambient.len() + self.pending.len());
        lines.push(format!(
            "SoundSystem: {}/{}",
            self.engine.playing_count(),
            self.capacity.total_channels()
        ));
        for emitter in self.ambient.emitters() {
            lines.push(format!(
                "EMITTER: {}[vol:{:.2}]",
                emitter.effect(),
                emitter.volume()
            ));
        }
        for pending in self.pending.iter() {
            let label = if pending.is_delayed() { "DELAYED" } else { "PENDING" };
            lines.push(format!("{label}: {}", pending.effect()));
        }
        lines
    }

    /// Shared normaliser for the host engine's mixing thread.
    pub fn normalizer(&self) -> Normalizer {
        self.normalizer.clone()
    }

    pub fn emitter_count(&self) -> usize {
        self.ambient.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn current_tick(&self) -> i64 {
        self.tick
    }

    pub fn capacity(&self) -> ChannelCapacity {
        self.capacity
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }
}
