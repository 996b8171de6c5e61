//! Core library for the soundscape scheduler.
//!
//! The crate decides which sounds a host audio engine should be playing at
//! any moment. Each module owns one concern (channel capacity, culling,
//! the pending spot queue, ambient emitters, normalisation) and the
//! [`SoundScheduler`] ties them together behind a per-tick entry point. The
//! audio backend itself stays on the far side of the [`HostEngine`] trait.

pub mod ambient;
pub mod capacity;
pub mod config;
pub mod culling;
pub mod effect;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod queue;
pub mod registry;
pub mod scheduler;
pub mod sim;

pub use ambient::{weighted_ambient_sounds, Emitter, ReconcileReport, Reconciler};
pub use capacity::ChannelCapacity;
pub use config::{AppConfig, SoundConfig};
pub use culling::{CullVerdict, CullingFilter};
pub use effect::{PlaybackRequest, SoundCategory, SoundEffect, SoundPos, SpotTarget};
pub use engine::{HostEngine, PlaybackHandle};
pub use error::{Result, SoundError};
pub use normalize::{normalize_pitch, normalize_volume, CategoryMix, Normalizer, PoolEntry};
pub use queue::{DrainReport, Handoff, PendingQueue, PendingSpotSound};
pub use registry::{RegistryHook, SoundRegistry, StaticRegistry};
pub use scheduler::{SoundFrame, SoundScheduler, SpotOutcome, SpotRequest, TickReport};
pub use sim::{EngineEvent, SimulatedEngine};
