//! Correlation between live thrown knives, their throwers and the weapon
//! they were thrown with
//!
//! Only touched from simulation-thread callbacks, so plain maps suffice.

use glam::Vec3;
use std::collections::HashMap;
use std::fmt;
use tokio::time::Instant;

use crate::host::{EntityId, PlayerSlot, WeaponHandle};

/// Entity name prefix marking a thrown knife
pub const NAME_PREFIX: &str = "tknife_";

/// Identity of a thrown knife, derived from the spawn tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectileId {
    pub tick: u64,
    /// Distinguishes knives spawned within the same tick
    pub seq: u32,
}

impl ProjectileId {
    pub fn new(tick: u64, seq: u32) -> Self {
        Self { tick, seq }
    }
}

impl fmt::Display for ProjectileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.seq == 0 {
            write!(f, "{}{}", NAME_PREFIX, self.tick)
        } else {
            write!(f, "{}{}_{}", NAME_PREFIX, self.tick, self.seq)
        }
    }
}

/// The player who threw a knife
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectileOwner {
    pub slot: PlayerSlot,
    pub pawn: EntityId,
}

/// A knife in flight
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedProjectile {
    pub id: ProjectileId,
    pub entity: EntityId,
    pub owner: ProjectileOwner,
    /// Weapon held at throw time, credited with the kill
    pub origin_weapon: Option<WeaponHandle>,
    pub spawn_position: Vec3,
    /// Where the last trail segment ended
    pub last_position: Vec3,
    /// Removed regardless of travel after this instant
    pub expires_at: Instant,
}

/// Registry of live knives, indexed by id and by entity
#[derive(Debug, Default)]
pub struct ProjectileRegistry {
    projectiles: HashMap<ProjectileId, TrackedProjectile>,
    by_entity: HashMap<EntityId, ProjectileId>,
}

impl ProjectileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new knife. Returns false, leaving the registry untouched,
    /// if the id or entity is already tracked.
    pub fn register(
        &mut self,
        id: ProjectileId,
        entity: EntityId,
        owner: ProjectileOwner,
        origin_weapon: Option<WeaponHandle>,
        spawn_position: Vec3,
        expires_at: Instant,
    ) -> bool {
        if self.projectiles.contains_key(&id) || self.by_entity.contains_key(&entity) {
            return false;
        }
        self.by_entity.insert(entity, id);
        self.projectiles.insert(
            id,
            TrackedProjectile {
                id,
                entity,
                owner,
                origin_weapon,
                spawn_position,
                last_position: spawn_position,
                expires_at,
            },
        );
        true
    }

    pub fn get(&self, id: ProjectileId) -> Option<&TrackedProjectile> {
        self.projectiles.get(&id)
    }

    /// Owner and origin weapon, `None` if the knife is not tracked
    pub fn lookup_owner_and_weapon(
        &self,
        id: ProjectileId,
    ) -> Option<(ProjectileOwner, Option<WeaponHandle>)> {
        self.projectiles
            .get(&id)
            .map(|p| (p.owner, p.origin_weapon))
    }

    pub fn id_for_entity(&self, entity: EntityId) -> Option<ProjectileId> {
        self.by_entity.get(&entity).copied()
    }

    /// Record a new trail anchor, returning the previous one
    pub fn update_position(&mut self, id: ProjectileId, new_position: Vec3) -> Option<Vec3> {
        self.projectiles
            .get_mut(&id)
            .map(|p| std::mem::replace(&mut p.last_position, new_position))
    }

    pub fn unregister(&mut self, id: ProjectileId) -> Option<TrackedProjectile> {
        let removed = self.projectiles.remove(&id)?;
        self.by_entity.remove(&removed.entity);
        Some(removed)
    }

    pub fn unregister_entity(&mut self, entity: EntityId) -> Option<TrackedProjectile> {
        let id = self.by_entity.get(&entity).copied()?;
        self.unregister(id)
    }

    /// Knives whose lifetime has run out
    pub fn expired(&self, now: Instant) -> Vec<ProjectileId> {
        let mut ids: Vec<_> = self
            .projectiles
            .values()
            .filter(|p| p.expires_at <= now)
            .map(|p| p.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Snapshot of tracked ids in spawn order
    pub fn ids(&self) -> Vec<ProjectileId> {
        let mut ids: Vec<_> = self.projectiles.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn clear(&mut self) {
        self.projectiles.clear();
        self.by_entity.clear();
    }

    pub fn len(&self) -> usize {
        self.projectiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projectiles.is_empty()
    }
}
