//! In-memory host simulation
//!
//! A small stand-in for the game engine: players with pawns and held
//! weapons, physics props under gravity, beams and chat recorded for
//! inspection. The binary runs it headless and the tests drive the knife
//! session against it.

use glam::Vec3;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::game::physics::PhysicsSystem;
use crate::game::throw::team_default_knife;

use super::{
    BeamSegment, Bounds, DamageInfo, EntityId, HeldWeapon, HitGroup, HudSink, Permissions,
    PlayerSlot, PlayerView, ProjectileSpawn, Team, VictimView, WeaponHandle, World,
    MAX_PLAYER_SLOT,
};

/// Damage the engine reports for a prop impact before reclassification
pub const PROP_IMPACT_DAMAGE: f32 = 12.0;
/// Starting health of sandbox pawns
pub const PAWN_HEALTH: f32 = 100.0;

/// A physics prop spawned in the sandbox
#[derive(Debug, Clone, PartialEq)]
pub struct SandboxProp {
    pub name: String,
    pub model: &'static str,
    pub owner_pawn: EntityId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub gravity_scale: f32,
    pub elasticity: f32,
}

/// A prop touching a pawn during a step
#[derive(Debug, Clone)]
pub struct SandboxContact {
    pub victim: VictimView,
    pub info: DamageInfo,
}

/// The in-memory world
#[derive(Debug, Default)]
pub struct SandboxWorld {
    next_entity: u32,
    players: BTreeMap<PlayerSlot, PlayerView>,
    health: HashMap<PlayerSlot, f32>,
    props: BTreeMap<EntityId, SandboxProp>,
    valid_weapons: HashSet<WeaponHandle>,
    touched: HashSet<(EntityId, EntityId)>,
    beams: Vec<BeamSegment>,
    chat: Vec<(PlayerSlot, String)>,
    refuse_spawns: bool,
}

impl SandboxWorld {
    pub fn new() -> Self {
        Self {
            next_entity: 1,
            ..Default::default()
        }
    }

    fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        id
    }

    fn free_slot(&self) -> PlayerSlot {
        (0..=MAX_PLAYER_SLOT)
            .map(PlayerSlot)
            .find(|slot| !self.players.contains_key(slot))
            .unwrap_or(PlayerSlot(MAX_PLAYER_SLOT))
    }

    /// Add a connected human holding the team's default knife
    pub fn add_player(&mut self, team: Team, origin: Vec3) -> PlayerSlot {
        let slot = self.free_slot();
        let pawn = self.allocate();
        let weapon = self.allocate();
        let handle = WeaponHandle(weapon.0);
        self.valid_weapons.insert(handle);

        self.players.insert(
            slot,
            PlayerView {
                slot,
                pawn: Some(pawn),
                connected: true,
                is_bot: false,
                is_hltv: false,
                team,
                eye_angles: Vec3::ZERO,
                origin,
                rotation: Vec3::ZERO,
                active_weapon: Some(HeldWeapon {
                    handle,
                    designer_name: "weapon_knife".to_string(),
                    definition_index: team_default_knife(team),
                }),
            },
        );
        self.health.insert(slot, PAWN_HEALTH);
        slot
    }

    /// Add a bot, which may be hit but never throws
    pub fn add_bot(&mut self, team: Team, origin: Vec3) -> PlayerSlot {
        let slot = self.add_player(team, origin);
        if let Some(player) = self.players.get_mut(&slot) {
            player.is_bot = true;
        }
        slot
    }

    pub fn remove_player(&mut self, slot: PlayerSlot) {
        self.players.remove(&slot);
        self.health.remove(&slot);
    }

    pub fn player_mut(&mut self, slot: PlayerSlot) -> Option<&mut PlayerView> {
        self.players.get_mut(&slot)
    }

    pub fn player_pawn(&self, slot: PlayerSlot) -> Option<EntityId> {
        self.players.get(&slot).and_then(|p| p.pawn)
    }

    pub fn health(&self, slot: PlayerSlot) -> Option<f32> {
        self.health.get(&slot).copied()
    }

    /// Put a new weapon in the player's hands
    pub fn give_weapon(&mut self, slot: PlayerSlot, designer_name: &str, definition_index: u16) -> Option<WeaponHandle> {
        let handle = WeaponHandle(self.allocate().0);
        let player = self.players.get_mut(&slot)?;
        player.active_weapon = Some(HeldWeapon {
            handle,
            designer_name: designer_name.to_string(),
            definition_index,
        });
        self.valid_weapons.insert(handle);
        Some(handle)
    }

    /// The weapon entity is gone (dropped and removed, round restart)
    pub fn invalidate_weapon(&mut self, handle: WeaponHandle) {
        self.valid_weapons.remove(&handle);
    }

    /// Place a motionless prop, as if spawned by someone else
    pub fn place_prop(&mut self, name: &str, owner_pawn: EntityId, position: Vec3) -> EntityId {
        let entity = self.allocate();
        self.props.insert(
            entity,
            SandboxProp {
                name: name.to_string(),
                model: "models/props/crate.vmdl",
                owner_pawn,
                position,
                velocity: Vec3::ZERO,
                gravity_scale: 0.0,
                elasticity: 0.0,
            },
        );
        entity
    }

    pub fn move_entity(&mut self, entity: EntityId, position: Vec3) {
        if let Some(prop) = self.props.get_mut(&entity) {
            prop.position = position;
        }
    }

    pub fn projectile(&self, entity: EntityId) -> Option<&SandboxProp> {
        self.props.get(&entity)
    }

    pub fn projectile_count(&self) -> usize {
        self.props.len()
    }

    pub fn beams(&self) -> &[BeamSegment] {
        &self.beams
    }

    pub fn chat(&self) -> &[(PlayerSlot, String)] {
        &self.chat
    }

    /// Make the next spawns fail, like an engine out of edicts
    pub fn set_refuse_spawns(&mut self, refuse: bool) {
        self.refuse_spawns = refuse;
    }

    /// Victim view of a player's pawn
    pub fn victim(&self, slot: PlayerSlot) -> Option<VictimView> {
        let player = self.players.get(&slot)?;
        Some(VictimView {
            entity: player.pawn?,
            is_player: player.connected,
            alive: self.health.get(&slot).is_some_and(|hp| *hp > 0.0),
            team: player.team,
            origin: Some(player.origin),
            bounds: Some(Bounds::PLAYER),
            last_hit_group: HitGroup::Invalid,
        })
    }

    /// Restore every pawn to full health
    pub fn respawn_all(&mut self) {
        for hp in self.health.values_mut() {
            *hp = PAWN_HEALTH;
        }
        self.touched.clear();
    }

    /// Subtract damage from a pawn, returning true when it died
    pub fn apply_damage(&mut self, victim: EntityId, damage: f32) -> bool {
        let Some(slot) = self
            .players
            .values()
            .find(|p| p.pawn == Some(victim))
            .map(|p| p.slot)
        else {
            return false;
        };
        let Some(hp) = self.health.get_mut(&slot) else {
            return false;
        };
        let was_alive = *hp > 0.0;
        *hp = (*hp - damage).max(0.0);
        was_alive && *hp <= 0.0
    }

    /// Advance props by `dt` and report props touching a pawn they have
    /// not touched before. Props come to rest on the floor at z = 0.
    pub fn step(&mut self, dt: f32) -> Vec<SandboxContact> {
        let mut contacts = Vec::new();

        for (entity, prop) in self.props.iter_mut() {
            if prop.velocity != Vec3::ZERO {
                let (mut position, mut velocity) =
                    PhysicsSystem::integrate(prop.position, prop.velocity, prop.gravity_scale, dt);
                if position.z <= 0.0 {
                    position.z = 0.0;
                    velocity = Vec3::ZERO;
                }
                prop.position = position;
                prop.velocity = velocity;
            }

            for player in self.players.values() {
                let Some(pawn) = player.pawn else { continue };
                if pawn == prop.owner_pawn || !player.connected {
                    continue;
                }
                let alive = self.health.get(&player.slot).is_some_and(|hp| *hp > 0.0);
                if !alive || !PhysicsSystem::point_in_bounds(prop.position, player.origin, Bounds::PLAYER) {
                    continue;
                }
                if !self.touched.insert((*entity, pawn)) {
                    continue;
                }
                contacts.push(SandboxContact {
                    victim: VictimView {
                        entity: pawn,
                        is_player: true,
                        alive,
                        team: player.team,
                        origin: Some(player.origin),
                        bounds: Some(Bounds::PLAYER),
                        last_hit_group: HitGroup::Invalid,
                    },
                    info: DamageInfo {
                        damage_position: prop.position,
                        ..DamageInfo::from_inflictor(*entity, PROP_IMPACT_DAMAGE)
                    },
                });
            }
        }

        contacts
    }
}

impl World for SandboxWorld {
    fn player(&self, slot: PlayerSlot) -> Option<PlayerView> {
        self.players.get(&slot).cloned()
    }

    fn players(&self) -> Vec<PlayerView> {
        self.players.values().cloned().collect()
    }

    fn spawn_projectile(&mut self, spawn: &ProjectileSpawn) -> Option<EntityId> {
        if self.refuse_spawns {
            return None;
        }
        let entity = self.allocate();
        self.props.insert(
            entity,
            SandboxProp {
                name: spawn.name.clone(),
                model: spawn.model,
                owner_pawn: spawn.owner_pawn,
                position: spawn.position,
                velocity: spawn.velocity,
                gravity_scale: spawn.gravity_scale,
                elasticity: spawn.elasticity,
            },
        );
        Some(entity)
    }

    fn entity_position(&self, entity: EntityId) -> Option<Vec3> {
        self.props.get(&entity).map(|p| p.position).or_else(|| {
            self.players
                .values()
                .find(|p| p.pawn == Some(entity))
                .map(|p| p.origin)
        })
    }

    fn weapon_is_valid(&self, weapon: WeaponHandle) -> bool {
        self.valid_weapons.contains(&weapon)
    }

    fn destroy(&mut self, entity: EntityId) {
        self.props.remove(&entity);
        self.touched.retain(|(prop, _)| *prop != entity);
    }

    fn spawn_beam(&mut self, beam: &BeamSegment) {
        self.beams.push(beam.clone());
    }

    fn print_to_chat(&mut self, slot: PlayerSlot, message: &str) {
        self.chat.push((slot, message.to_string()));
    }
}

/// Flag and group assignments
#[derive(Debug, Default, Clone)]
pub struct SandboxPermissions {
    flags: HashMap<PlayerSlot, HashSet<String>>,
    groups: HashMap<PlayerSlot, HashSet<String>>,
}

impl SandboxPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant_flag(&mut self, slot: PlayerSlot, flag: &str) {
        self.flags.entry(slot).or_default().insert(flag.to_string());
    }

    pub fn revoke_flag(&mut self, slot: PlayerSlot, flag: &str) {
        if let Some(flags) = self.flags.get_mut(&slot) {
            flags.remove(flag);
        }
    }

    pub fn join_group(&mut self, slot: PlayerSlot, group: &str) {
        self.groups.entry(slot).or_default().insert(group.to_string());
    }
}

impl Permissions for SandboxPermissions {
    fn has_permission(&self, slot: PlayerSlot, flag: &str) -> bool {
        self.flags.get(&slot).is_some_and(|f| f.contains(flag))
    }

    fn in_group(&self, slot: PlayerSlot, group: &str) -> bool {
        self.groups.get(&slot).is_some_and(|g| g.contains(group))
    }
}

/// Records centre alerts; shareable with timer tasks
#[derive(Debug, Default)]
pub struct SandboxHud {
    alerts: Mutex<Vec<(PlayerSlot, String)>>,
}

impl SandboxHud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<(PlayerSlot, String)> {
        self.alerts.lock().clone()
    }

    pub fn alerts_for(&self, slot: PlayerSlot) -> Vec<String> {
        self.alerts
            .lock()
            .iter()
            .filter(|(s, _)| *s == slot)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

impl HudSink for SandboxHud {
    fn center_alert(&self, slot: PlayerSlot, text: &str) {
        self.alerts.lock().push((slot, text.to_string()));
    }
}
