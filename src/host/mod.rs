//! Host simulation interface
//!
//! Everything the knife core needs from the engine: player views, entity
//! spawning and lookup, beams, chat, permission checks and the centre HUD.
//! The engine drives tick, damage, connect and round callbacks on one
//! simulation thread; only [`HudSink`] is called from timer tasks.

pub mod sandbox;

use glam::Vec3;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::util::Rgba;

/// Highest player slot the host hands out (inclusive)
pub const MAX_PLAYER_SLOT: u8 = 64;

/// Stable player slot index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerSlot(pub u8);

impl fmt::Display for PlayerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Engine entity handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque handle to a weapon instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeaponHandle(pub u32);

/// Team affiliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Team {
    Unassigned,
    Spectator,
    Terrorist,
    CounterTerrorist,
}

/// The weapon a player currently holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeldWeapon {
    pub handle: WeaponHandle,
    /// Engine class name, e.g. `weapon_knife_karambit`
    pub designer_name: String,
    /// Item definition index used to pick the thrown model
    pub definition_index: u16,
}

impl HeldWeapon {
    /// Whether the weapon is a knife that can be thrown
    pub fn is_knife(&self) -> bool {
        self.designer_name.contains("knife") || self.designer_name.contains("bayonet")
    }
}

/// Snapshot of a player's controller and pawn
#[derive(Debug, Clone)]
pub struct PlayerView {
    pub slot: PlayerSlot,
    pub pawn: Option<EntityId>,
    pub connected: bool,
    pub is_bot: bool,
    pub is_hltv: bool,
    pub team: Team,
    /// Eye angles in degrees: x = pitch, y = yaw, z = roll
    pub eye_angles: Vec3,
    pub origin: Vec3,
    /// Pawn rotation in degrees
    pub rotation: Vec3,
    pub active_weapon: Option<HeldWeapon>,
}

impl PlayerView {
    /// Connected human player (not a bot, not the HLTV relay)
    pub fn is_human(&self) -> bool {
        self.connected && !self.is_bot && !self.is_hltv
    }
}

/// Engine body-region classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HitGroup {
    Invalid,
    Generic,
    Head,
    Chest,
    Stomach,
    LeftArm,
    RightArm,
    LeftLeg,
    RightLeg,
    Neck,
    Gear,
}

impl HitGroup {
    pub fn is_valid(self) -> bool {
        self != Self::Invalid
    }
}

/// Damage type bit set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct DamageTypes(pub u32);

impl DamageTypes {
    pub const GENERIC: Self = Self(0);
    pub const CRUSH: Self = Self(1 << 0);
    pub const BULLET: Self = Self(1 << 1);
    pub const SLASH: Self = Self(1 << 2);
    pub const HEADSHOT: Self = Self(1 << 31);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for DamageTypes {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for DamageTypes {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// The engine's generic pre-damage event
#[derive(Debug, Clone, PartialEq)]
pub struct DamageInfo {
    pub inflictor: Option<EntityId>,
    pub attacker: Option<EntityId>,
    /// Weapon credited with the damage
    pub ability: Option<WeaponHandle>,
    pub damage: f32,
    pub damage_type: DamageTypes,
    /// Hit group carried on the event itself
    pub hit_group: HitGroup,
    /// Hit group from the engine's secondary accessor
    pub reported_hit_group: HitGroup,
    pub damage_position: Vec3,
}

impl DamageInfo {
    /// A bare event caused by `inflictor`, no hit data
    pub fn from_inflictor(inflictor: EntityId, damage: f32) -> Self {
        Self {
            inflictor: Some(inflictor),
            attacker: None,
            ability: None,
            damage,
            damage_type: DamageTypes::CRUSH,
            hit_group: HitGroup::Invalid,
            reported_hit_group: HitGroup::Invalid,
            damage_position: Vec3::ZERO,
        }
    }
}

/// Collision bounds relative to the entity origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub mins: Vec3,
    pub maxs: Vec3,
}

impl Bounds {
    /// Standing player hull
    pub const PLAYER: Self = Self {
        mins: Vec3::new(-16.0, -16.0, 0.0),
        maxs: Vec3::new(16.0, 16.0, 72.0),
    };
}

/// The entity taking damage
#[derive(Debug, Clone)]
pub struct VictimView {
    pub entity: EntityId,
    /// Entity is a player pawn with a live controller
    pub is_player: bool,
    pub alive: bool,
    pub team: Team,
    pub origin: Option<Vec3>,
    pub bounds: Option<Bounds>,
    pub last_hit_group: HitGroup,
}

/// Outcome of a pre-damage hook
#[derive(Debug, Clone, PartialEq)]
pub enum DamageOutcome {
    /// Not ours, let the engine proceed untouched
    Continue,
    /// Drop the event entirely
    Stop,
    /// Apply the rewritten event
    Changed(DamageInfo),
}

/// Engine collision groups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionGroup {
    Default,
    Debris,
}

/// Everything the host needs to spawn a thrown knife
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileSpawn {
    pub name: String,
    pub model: &'static str,
    pub owner_pawn: EntityId,
    pub position: Vec3,
    /// Degrees
    pub rotation: Vec3,
    pub velocity: Vec3,
    pub elasticity: f32,
    pub gravity_scale: f32,
    pub collision_group: CollisionGroup,
}

/// A transient beam between two points
#[derive(Debug, Clone, PartialEq)]
pub struct BeamSegment {
    pub start: Vec3,
    pub end: Vec3,
    pub color: Rgba,
    pub width: f32,
    pub lifetime: f32,
}

/// Engine services used from the simulation thread
pub trait World {
    fn player(&self, slot: PlayerSlot) -> Option<PlayerView>;

    /// All player slots the engine currently knows about
    fn players(&self) -> Vec<PlayerView>;

    /// Create, name, model, spawn and launch a physics prop. `None` if the
    /// engine refused to create it.
    fn spawn_projectile(&mut self, spawn: &ProjectileSpawn) -> Option<EntityId>;

    /// Live position, `None` once the entity is gone
    fn entity_position(&self, entity: EntityId) -> Option<Vec3>;

    fn weapon_is_valid(&self, weapon: WeaponHandle) -> bool;

    fn destroy(&mut self, entity: EntityId);

    fn spawn_beam(&mut self, beam: &BeamSegment);

    fn print_to_chat(&mut self, slot: PlayerSlot, message: &str);
}

/// Admin flag and group resolution
pub trait Permissions {
    fn has_permission(&self, slot: PlayerSlot, flag: &str) -> bool;

    fn in_group(&self, slot: PlayerSlot, group: &str) -> bool;

    /// A configured entry matches either as a flag or as a group
    fn matches(&self, slot: PlayerSlot, entry: &str) -> bool {
        self.has_permission(slot, entry) || self.in_group(slot, entry)
    }
}

/// Centre-screen alerts, callable from timer tasks
pub trait HudSink: Send + Sync {
    fn center_alert(&self, slot: PlayerSlot, text: &str);
}
