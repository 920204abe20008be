//! Per-player combat bookkeeping
//!
//! Shared between the simulation thread and cooldown status tasks, so it
//! lives in a `DashMap` behind an `Arc`. Entries are created on connect and
//! overwritten on reconnect; they are never pruned.

use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::ThrowQuota;
use crate::host::{PlayerSlot, Team};
use crate::util::time::deadline;
use crate::util::Rgba;

/// Default trail colour for a team
pub fn team_trail_color(team: Team) -> Rgba {
    match team {
        Team::CounterTerrorist => Rgba::BLUE,
        _ => Rgba::RED,
    }
}

/// Mutable combat state of one player slot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerCombatState {
    pub connected: bool,
    /// When the next throw becomes possible
    pub cooldown_expiry: Option<Instant>,
    /// Throws left this round, `None` until first computed
    pub quota_remaining: Option<ThrowQuota>,
    /// Cached flag check, refreshed on connect and round start only
    pub has_permission: Option<bool>,
    pub trail_color: Option<Rgba>,
}

/// Concurrent store of [`PlayerCombatState`] keyed by slot
#[derive(Debug, Default)]
pub struct PlayerCombatStore {
    players: DashMap<PlayerSlot, PlayerCombatState>,
}

impl PlayerCombatStore {
    pub fn new() -> Self {
        Self {
            players: DashMap::new(),
        }
    }

    /// Current state, inserting a default entry if the slot is unknown
    pub fn get_or_default(&self, slot: PlayerSlot) -> PlayerCombatState {
        self.players.entry(slot).or_default().clone()
    }

    /// Reset a slot for a freshly connected player
    pub fn connect(&self, slot: PlayerSlot, quota: ThrowQuota, has_permission: bool, team: Team) {
        self.players.insert(
            slot,
            PlayerCombatState {
                connected: true,
                cooldown_expiry: None,
                quota_remaining: Some(quota),
                has_permission: Some(has_permission),
                trail_color: Some(team_trail_color(team)),
            },
        );
    }

    pub fn disconnect(&self, slot: PlayerSlot) {
        if let Some(mut state) = self.players.get_mut(&slot) {
            state.connected = false;
        }
    }

    pub fn is_connected(&self, slot: PlayerSlot) -> bool {
        self.players.get(&slot).is_some_and(|s| s.connected)
    }

    /// Start the cooldown window at `now`
    pub fn set_cooldown(&self, slot: PlayerSlot, now: Instant, cooldown: Duration) {
        self.players.entry(slot).or_default().cooldown_expiry = Some(deadline(now, cooldown));
    }

    /// Time left before the next throw, zero when ready
    pub fn cooldown_remaining(&self, slot: PlayerSlot, now: Instant) -> Duration {
        self.players
            .get(&slot)
            .and_then(|s| s.cooldown_expiry)
            .map(|expiry| expiry.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }

    pub fn is_cooling_down(&self, slot: PlayerSlot, now: Instant) -> bool {
        !self.cooldown_remaining(slot, now).is_zero()
    }

    pub fn quota(&self, slot: PlayerSlot) -> Option<ThrowQuota> {
        self.players.get(&slot).and_then(|s| s.quota_remaining)
    }

    pub fn set_quota(&self, slot: PlayerSlot, quota: ThrowQuota) {
        self.players.entry(slot).or_default().quota_remaining = Some(quota);
    }

    /// Spend one throw, returning what is left. Bounded quotas stop at zero.
    pub fn decrement_quota(&self, slot: PlayerSlot) -> Option<ThrowQuota> {
        let mut state = self.players.entry(slot).or_default();
        state.quota_remaining = state.quota_remaining.map(ThrowQuota::spend);
        state.quota_remaining
    }

    pub fn has_permission(&self, slot: PlayerSlot) -> Option<bool> {
        self.players.get(&slot).and_then(|s| s.has_permission)
    }

    pub fn refresh_permission(&self, slot: PlayerSlot, allowed: bool) {
        self.players.entry(slot).or_default().has_permission = Some(allowed);
    }

    pub fn set_trail_color(&self, slot: PlayerSlot, color: Rgba) {
        self.players.entry(slot).or_default().trail_color = Some(color);
    }

    /// Preferred trail colour; the team default is stored when none is set
    pub fn trail_color(&self, slot: PlayerSlot, team: Team) -> Rgba {
        *self
            .players
            .entry(slot)
            .or_default()
            .trail_color
            .get_or_insert_with(|| team_trail_color(team))
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn connect_overwrites_stale_slot() {
        let store = PlayerCombatStore::new();
        let slot = PlayerSlot(4);
        store.connect(slot, ThrowQuota::Limited(2), true, Team::Terrorist);
        store.set_trail_color(slot, Rgba::GOLD);
        store.set_quota(slot, ThrowQuota::Limited(1));
        store.disconnect(slot);
        assert!(!store.is_connected(slot));

        store.connect(slot, ThrowQuota::Limited(3), false, Team::CounterTerrorist);
        let state = store.get_or_default(slot);
        assert!(state.connected);
        assert_eq!(state.quota_remaining, Some(ThrowQuota::Limited(3)));
        assert_eq!(state.has_permission, Some(false));
        assert_eq!(state.trail_color, Some(Rgba::BLUE));
    }

    #[test]
    fn unknown_slots_have_no_quota_or_permission() {
        let store = PlayerCombatStore::new();
        let slot = PlayerSlot(1);
        assert_eq!(store.quota(slot), None);
        assert_eq!(store.has_permission(slot), None);
        assert!(!store.is_connected(slot));

        store.set_quota(slot, ThrowQuota::Limited(0));
        assert_eq!(store.quota(slot), Some(ThrowQuota::Limited(0)));
        assert!(!store.is_connected(slot));
    }

    #[test]
    fn decrement_stops_at_zero() {
        let store = PlayerCombatStore::new();
        let slot = PlayerSlot(1);
        assert_eq!(store.decrement_quota(slot), None);

        store.set_quota(slot, ThrowQuota::Limited(1));
        assert_eq!(store.decrement_quota(slot), Some(ThrowQuota::Limited(0)));
        assert_eq!(store.decrement_quota(slot), Some(ThrowQuota::Limited(0)));

        store.set_quota(slot, ThrowQuota::Unlimited);
        assert_eq!(store.decrement_quota(slot), Some(ThrowQuota::Unlimited));
    }

    #[test]
    fn cooldown_window() {
        let store = PlayerCombatStore::new();
        let slot = PlayerSlot(2);
        let now = Instant::now();
        assert!(!store.is_cooling_down(slot, now));

        store.set_cooldown(slot, now, Duration::from_secs(3));
        assert!(store.is_cooling_down(slot, now + Duration::from_secs(2)));
        assert_eq!(
            store.cooldown_remaining(slot, now + Duration::from_secs(1)),
            Duration::from_secs(2)
        );
        assert!(!store.is_cooling_down(slot, now + Duration::from_secs(3)));
    }

    #[test]
    fn oversized_cooldown_saturates() {
        let store = PlayerCombatStore::new();
        let slot = PlayerSlot(4);
        let now = Instant::now();

        store.set_cooldown(slot, now, Duration::MAX);
        assert!(store.is_cooling_down(slot, now + Duration::from_secs(3600)));
        assert_eq!(store.cooldown_remaining(slot, now), Duration::from_secs(86_400));
    }

    #[test]
    fn trail_color_falls_back_to_team_and_sticks() {
        let store = PlayerCombatStore::new();
        let slot = PlayerSlot(7);
        assert_eq!(store.trail_color(slot, Team::Terrorist), Rgba::RED);
        // stored on first lookup, team changes do not repaint it
        assert_eq!(store.trail_color(slot, Team::CounterTerrorist), Rgba::RED);

        store.set_trail_color(slot, Rgba::MEDIUM_ORCHID);
        assert_eq!(store.trail_color(slot, Team::Terrorist), Rgba::MEDIUM_ORCHID);
    }

    #[test]
    fn usable_from_several_threads() {
        let store = Arc::new(PlayerCombatStore::new());
        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let slot = PlayerSlot(i);
                    store.connect(slot, ThrowQuota::Limited(50), true, Team::Terrorist);
                    for _ in 0..50 {
                        store.decrement_quota(slot);
                        store.cooldown_remaining(slot, Instant::now());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        for i in 0..8u8 {
            assert_eq!(store.quota(PlayerSlot(i)), Some(ThrowQuota::Limited(0)));
        }
    }
}
