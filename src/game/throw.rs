//! Throw control - validating a throw and launching the knife

use glam::Vec3;
use tokio::time::Instant;
use tracing::debug;

use crate::config::{PluginConfig, ThrowQuota};
use crate::host::{
    CollisionGroup, EntityId, HeldWeapon, Permissions, PlayerSlot, ProjectileSpawn, Team, World,
};
use crate::util::time::deadline;

use super::physics::PhysicsSystem;
use super::players::PlayerCombatStore;
use super::registry::{ProjectileId, ProjectileOwner, ProjectileRegistry};

/// Definition index of the default counter-terrorist knife
pub const DEFAULT_CT_KNIFE: u16 = 42;
/// Definition index of the default terrorist knife
pub const DEFAULT_T_KNIFE: u16 = 59;

/// Model used for a knife definition index
pub fn knife_model(definition_index: u16) -> Option<&'static str> {
    let model = match definition_index {
        42 => "weapons/models/knife/knife_default_ct/weapon_knife_default_ct.vmdl",
        59 => "weapons/models/knife/knife_default_t/weapon_knife_default_t.vmdl",
        500 => "weapons/models/knife/knife_bayonet/weapon_knife_bayonet.vmdl",
        503 => "weapons/models/knife/knife_css/weapon_knife_css.vmdl",
        505 => "weapons/models/knife/knife_flip/weapon_knife_flip.vmdl",
        506 => "weapons/models/knife/knife_gut/weapon_knife_gut.vmdl",
        507 => "weapons/models/knife/knife_karambit/weapon_knife_karambit.vmdl",
        508 => "weapons/models/knife/knife_m9/weapon_knife_m9.vmdl",
        509 => "weapons/models/knife/knife_tactical/weapon_knife_tactical.vmdl",
        512 => "weapons/models/knife/knife_falchion/weapon_knife_falchion.vmdl",
        514 => "weapons/models/knife/knife_bowie/weapon_knife_bowie.vmdl",
        515 => "weapons/models/knife/knife_butterfly/weapon_knife_butterfly.vmdl",
        516 => "weapons/models/knife/knife_push/weapon_knife_push.vmdl",
        517 => "weapons/models/knife/knife_cord/weapon_knife_cord.vmdl",
        518 => "weapons/models/knife/knife_canis/weapon_knife_canis.vmdl",
        519 => "weapons/models/knife/knife_ursus/weapon_knife_ursus.vmdl",
        520 => "weapons/models/knife/knife_navaja/weapon_knife_navaja.vmdl",
        521 => "weapons/models/knife/knife_outdoor/weapon_knife_outdoor.vmdl",
        522 => "weapons/models/knife/knife_stiletto/weapon_knife_stiletto.vmdl",
        523 => "weapons/models/knife/knife_talon/weapon_knife_talon.vmdl",
        525 => "weapons/models/knife/knife_skeleton/weapon_knife_skeleton.vmdl",
        526 => "weapons/models/knife/knife_kukri/weapon_knife_kukri.vmdl",
        _ => return None,
    };
    Some(model)
}

/// Knife definition used when the thrower holds nothing usable
pub fn team_default_knife(team: Team) -> u16 {
    match team {
        Team::CounterTerrorist => DEFAULT_CT_KNIFE,
        _ => DEFAULT_T_KNIFE,
    }
}

/// Why a throw did not happen. All of these are expected outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ThrowDeclined {
    #[error("player is not connected")]
    NotConnected,

    #[error("bots and relays cannot throw")]
    NotHuman,

    #[error("player lacks the throw permission")]
    NoPermission,

    #[error("no knives left this round")]
    QuotaExhausted,

    #[error("throw is on cooldown")]
    CoolingDown,

    #[error("player has no pawn")]
    NoPawn,

    #[error("no knife model for definition index {0}")]
    UnknownModel(u16),

    #[error("engine refused to spawn the knife")]
    SpawnFailed,
}

/// A knife that left the thrower's hand
#[derive(Debug, Clone, PartialEq)]
pub struct ThrownKnife {
    pub id: ProjectileId,
    pub entity: EntityId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub quota_left: ThrowQuota,
}

/// State a throw reads and writes
pub struct ThrowController<'a> {
    pub config: &'a PluginConfig,
    pub players: &'a PlayerCombatStore,
    pub registry: &'a mut ProjectileRegistry,
}

impl ThrowController<'_> {
    /// Validate and perform a throw. On any decline nothing is spawned and
    /// no state changes.
    pub fn attempt_throw(
        &mut self,
        world: &mut impl World,
        perms: &impl Permissions,
        slot: PlayerSlot,
        active_weapon: Option<&HeldWeapon>,
        id: ProjectileId,
        now: Instant,
    ) -> Result<ThrownKnife, ThrowDeclined> {
        let player = world.player(slot).ok_or(ThrowDeclined::NotConnected)?;
        if !player.connected {
            return Err(ThrowDeclined::NotConnected);
        }
        if player.is_bot || player.is_hltv {
            return Err(ThrowDeclined::NotHuman);
        }

        let cached_permission = self.players.has_permission(slot);
        let has_permission =
            cached_permission.unwrap_or_else(|| self.config.may_throw(perms, slot));
        if !has_permission {
            return Err(ThrowDeclined::NoPermission);
        }

        let stored_quota = self.players.quota(slot);
        let quota = stored_quota.unwrap_or_else(|| self.config.quota_for(perms, slot));
        if !quota.allows_throw() {
            return Err(ThrowDeclined::QuotaExhausted);
        }

        if self.players.is_cooling_down(slot, now) {
            return Err(ThrowDeclined::CoolingDown);
        }

        let pawn = player.pawn.ok_or(ThrowDeclined::NoPawn)?;

        let definition_index = active_weapon
            .map(|w| w.definition_index)
            .unwrap_or_else(|| team_default_knife(player.team));
        let model = knife_model(definition_index).ok_or(ThrowDeclined::UnknownModel(definition_index))?;

        let forward = PhysicsSystem::aim_forward(player.eye_angles);
        let position = PhysicsSystem::spawn_position(player.origin, forward);
        let velocity = PhysicsSystem::launch_velocity(forward, self.config.knife_velocity);

        let spawn = ProjectileSpawn {
            name: id.to_string(),
            model,
            owner_pawn: pawn,
            position,
            rotation: player.rotation,
            velocity,
            elasticity: self.config.knife_elasticity,
            gravity_scale: self.config.knife_gravity,
            collision_group: CollisionGroup::Default,
        };
        let entity = world.spawn_projectile(&spawn).ok_or(ThrowDeclined::SpawnFailed)?;

        let owner = ProjectileOwner { slot, pawn };
        let origin_weapon = active_weapon.map(|w| w.handle);
        let expires_at = deadline(now, self.config.lifetime());
        if !self
            .registry
            .register(id, entity, owner, origin_weapon, position, expires_at)
        {
            world.destroy(entity);
            return Err(ThrowDeclined::SpawnFailed);
        }

        if cached_permission.is_none() {
            self.players.refresh_permission(slot, has_permission);
        }
        if stored_quota.is_none() {
            self.players.set_quota(slot, quota);
        }
        let quota_left = self.players.decrement_quota(slot).unwrap_or(quota.spend());
        self.players.set_cooldown(slot, now, self.config.cooldown());

        debug!(
            slot = %slot,
            projectile = %id,
            entity = %entity,
            model,
            quota_left = %quota_left,
            "Knife thrown"
        );

        Ok(ThrownKnife {
            id,
            entity,
            position,
            velocity,
            quota_left,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::sandbox::{SandboxPermissions, SandboxWorld};
    use crate::host::WeaponHandle;
    use std::time::Duration;

    fn knife(def: u16) -> HeldWeapon {
        HeldWeapon {
            handle: WeaponHandle(900),
            designer_name: "weapon_knife".into(),
            definition_index: def,
        }
    }

    struct Fixture {
        world: SandboxWorld,
        perms: SandboxPermissions,
        config: PluginConfig,
        players: PlayerCombatStore,
        registry: ProjectileRegistry,
        slot: PlayerSlot,
    }

    impl Fixture {
        fn new(config: PluginConfig) -> Self {
            let mut world = SandboxWorld::new();
            let slot = world.add_player(Team::CounterTerrorist, Vec3::ZERO);
            let players = PlayerCombatStore::new();
            players.connect(slot, config.knife_amount, true, Team::CounterTerrorist);
            Self {
                world,
                perms: SandboxPermissions::new(),
                config,
                players,
                registry: ProjectileRegistry::new(),
                slot,
            }
        }

        fn throw(&mut self, weapon: Option<&HeldWeapon>, tick: u64, now: Instant) -> Result<ThrownKnife, ThrowDeclined> {
            let mut controller = ThrowController {
                config: &self.config,
                players: &self.players,
                registry: &mut self.registry,
            };
            controller.attempt_throw(&mut self.world, &self.perms, self.slot, weapon, ProjectileId::new(tick, 0), now)
        }
    }

    #[test]
    fn successful_throw_registers_and_stamps() {
        let mut fx = Fixture::new(PluginConfig {
            knife_amount: ThrowQuota::Limited(2),
            ..Default::default()
        });
        let now = Instant::now();
        let thrown = fx.throw(Some(&knife(507)), 1, now).unwrap();

        assert_eq!(thrown.quota_left, ThrowQuota::Limited(1));
        assert_eq!(fx.players.quota(fx.slot), Some(ThrowQuota::Limited(1)));
        assert!(fx.players.is_cooling_down(fx.slot, now));
        assert_eq!(
            fx.registry.lookup_owner_and_weapon(thrown.id).map(|(_, w)| w),
            Some(Some(WeaponHandle(900)))
        );
        let spawned = fx.world.projectile(thrown.entity).unwrap();
        assert_eq!(spawned.name, "tknife_1");
        assert!(spawned.model.ends_with("weapon_knife_karambit.vmdl"));
    }

    #[test]
    fn zero_quota_declines_without_side_effects() {
        let mut fx = Fixture::new(PluginConfig {
            knife_amount: ThrowQuota::Limited(0),
            ..Default::default()
        });
        let before = fx.players.get_or_default(fx.slot);
        assert_eq!(fx.throw(Some(&knife(42)), 1, Instant::now()), Err(ThrowDeclined::QuotaExhausted));
        assert_eq!(fx.players.get_or_default(fx.slot), before);
        assert!(fx.registry.is_empty());
        assert_eq!(fx.world.projectile_count(), 0);
    }

    #[test]
    fn cooldown_blocks_then_releases() {
        let mut fx = Fixture::new(PluginConfig::default());
        let now = Instant::now();
        fx.throw(Some(&knife(42)), 1, now).unwrap();
        assert_eq!(
            fx.throw(Some(&knife(42)), 2, now + Duration::from_secs(1)),
            Err(ThrowDeclined::CoolingDown)
        );
        assert_eq!(fx.registry.len(), 1);

        let later = now + Duration::from_secs(3);
        fx.throw(Some(&knife(42)), 3, later).unwrap();
        assert_eq!(fx.registry.len(), 2);
        assert_eq!(fx.players.cooldown_remaining(fx.slot, later), Duration::from_secs(3));
    }

    #[test]
    fn unknown_definition_declines() {
        let mut fx = Fixture::new(PluginConfig::default());
        let before = fx.players.get_or_default(fx.slot);
        assert_eq!(
            fx.throw(Some(&knife(31)), 1, Instant::now()),
            Err(ThrowDeclined::UnknownModel(31))
        );
        assert_eq!(fx.players.get_or_default(fx.slot), before);
        assert_eq!(fx.world.projectile_count(), 0);
    }

    #[test]
    fn missing_weapon_uses_team_default() {
        let mut fx = Fixture::new(PluginConfig::default());
        let thrown = fx.throw(None, 1, Instant::now()).unwrap();
        let spawned = fx.world.projectile(thrown.entity).unwrap();
        assert!(spawned.model.ends_with("weapon_knife_default_ct.vmdl"));
        assert_eq!(
            fx.registry.lookup_owner_and_weapon(thrown.id).map(|(_, w)| w),
            Some(None)
        );
    }

    #[test]
    fn cached_permission_is_honoured() {
        let mut fx = Fixture::new(PluginConfig::default());
        fx.players.refresh_permission(fx.slot, false);
        assert_eq!(fx.throw(Some(&knife(42)), 1, Instant::now()), Err(ThrowDeclined::NoPermission));
    }

    #[test]
    fn bots_cannot_throw() {
        let mut fx = Fixture::new(PluginConfig::default());
        fx.world.player_mut(fx.slot).unwrap().is_bot = true;
        assert_eq!(fx.throw(Some(&knife(42)), 1, Instant::now()), Err(ThrowDeclined::NotHuman));
    }

    #[test]
    fn launch_follows_aim() {
        let mut fx = Fixture::new(PluginConfig::default());
        fx.world.player_mut(fx.slot).unwrap().eye_angles = Vec3::new(0.0, 90.0, 0.0);
        let thrown = fx.throw(Some(&knife(42)), 1, Instant::now()).unwrap();
        assert!(thrown.velocity.abs_diff_eq(Vec3::new(0.0, 2250.0, 300.0), 0.1));
        assert!(thrown.position.abs_diff_eq(Vec3::new(0.0, 69.0, 50.0), 0.01));
    }
}
