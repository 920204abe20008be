//! Throwing knife game logic

pub mod combat;
pub mod physics;
pub mod players;
pub mod registry;
pub mod status;
pub mod throw;
pub mod trail;

pub use combat::{CombatSystem, HitTuning, KnifeHit};
pub use physics::PhysicsSystem;
pub use players::{PlayerCombatState, PlayerCombatStore};
pub use registry::{ProjectileId, ProjectileOwner, ProjectileRegistry, TrackedProjectile};
pub use status::CooldownTimers;
pub use throw::{ThrowController, ThrowDeclined, ThrownKnife};
pub use trail::{SweepReport, TrailSettings, TrailUpdater};
