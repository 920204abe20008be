//! Per-tick sweep over thrown knives: lifetime expiry and trail beams

use tokio::time::Instant;
use tracing::debug;

use crate::config::PluginConfig;
use crate::host::{BeamSegment, World};

use super::physics::PhysicsSystem;
use super::players::PlayerCombatStore;
use super::registry::{ProjectileId, ProjectileRegistry};

/// Trail drawing options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailSettings {
    pub enabled: bool,
    /// Displacement a knife must exceed before a new segment is drawn
    pub min_distance: f32,
    pub width: f32,
    /// Seconds each segment stays visible
    pub lifetime: f32,
}

impl From<&PluginConfig> for TrailSettings {
    fn from(config: &PluginConfig) -> Self {
        Self {
            enabled: config.trails_enabled(),
            min_distance: config.trail_min_distance,
            width: config.trail_width,
            lifetime: config.knife_trail_time,
        }
    }
}

/// What one sweep did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub segments: usize,
    /// Knives destroyed because their lifetime ran out
    pub expired: Vec<ProjectileId>,
    /// Knives the engine no longer knows about
    pub vanished: Vec<ProjectileId>,
}

/// Trail updater for thrown knives
pub struct TrailUpdater;

impl TrailUpdater {
    /// Expire old knives, forget vanished ones and draw a segment for each
    /// knife that moved far enough since its last segment
    pub fn sweep(
        registry: &mut ProjectileRegistry,
        players: &PlayerCombatStore,
        world: &mut impl World,
        settings: &TrailSettings,
        now: Instant,
    ) -> SweepReport {
        let mut report = SweepReport::default();

        for id in registry.expired(now) {
            if let Some(tracked) = registry.unregister(id) {
                world.destroy(tracked.entity);
                debug!(projectile = %id, "Knife expired");
                report.expired.push(id);
            }
        }

        for id in registry.ids() {
            let Some(tracked) = registry.get(id) else {
                continue;
            };
            let (entity, owner, last_position) = (tracked.entity, tracked.owner, tracked.last_position);

            let Some(position) = world.entity_position(entity) else {
                registry.unregister(id);
                report.vanished.push(id);
                continue;
            };

            if !settings.enabled
                || !PhysicsSystem::moved_beyond(last_position, position, settings.min_distance)
            {
                continue;
            }

            let Some(thrower) = world.player(owner.slot).filter(|p| p.connected) else {
                continue;
            };
            let color = players.trail_color(owner.slot, thrower.team);

            world.spawn_beam(&BeamSegment {
                start: last_position,
                end: position,
                color,
                width: settings.width,
                lifetime: settings.lifetime,
            });
            registry.update_position(id, position);
            report.segments += 1;
        }

        report
    }
}
