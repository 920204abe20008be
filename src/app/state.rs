//! Session state shared across host callbacks

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::PluginConfig;
use crate::game::{
    CombatSystem, CooldownTimers, HitTuning, KnifeHit, PlayerCombatStore, ProjectileId,
    ProjectileRegistry, SweepReport, ThrowController, ThrowDeclined, ThrownKnife, TrailSettings,
    TrailUpdater,
};
use crate::host::{
    DamageInfo, DamageOutcome, EntityId, HitGroup, HudSink, Permissions, PlayerSlot, VictimView,
    World,
};
use crate::menu::{self, TrailMenu};

/// Everything the knife plugin keeps between host callbacks.
///
/// The host calls the `on_*` hooks from its simulation thread. Only the
/// player store and HUD sink are shared with the cooldown timer tasks.
pub struct KnifeSession {
    config: PluginConfig,
    players: Arc<PlayerCombatStore>,
    registry: ProjectileRegistry,
    timers: CooldownTimers,
    hud: Arc<dyn HudSink>,
    tick: u64,
    tick_seq: u32,
}

impl KnifeSession {
    /// Build a session. Status timers run on the tokio runtime current at
    /// this point, if there is one.
    pub fn new(config: PluginConfig, hud: Arc<dyn HudSink>) -> Self {
        Self::with_timers(config, hud, CooldownTimers::new())
    }

    /// Build a session whose status timers run on `runtime`, for hosts
    /// that call the hooks from their own thread
    pub fn with_runtime(config: PluginConfig, hud: Arc<dyn HudSink>, runtime: Handle) -> Self {
        Self::with_timers(config, hud, CooldownTimers::with_runtime(runtime))
    }

    fn with_timers(config: PluginConfig, hud: Arc<dyn HudSink>, timers: CooldownTimers) -> Self {
        Self {
            config,
            players: Arc::new(PlayerCombatStore::new()),
            registry: ProjectileRegistry::new(),
            timers,
            hud,
            tick: 0,
            tick_seq: 0,
        }
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    pub fn players(&self) -> &PlayerCombatStore {
        &self.players
    }

    pub fn registry(&self) -> &ProjectileRegistry {
        &self.registry
    }

    pub fn timers(&self) -> &CooldownTimers {
        &self.timers
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Plugin loaded. On a hot reload players are already in the server
    /// and get their state initialised here instead of on connect.
    pub fn on_load(&mut self, world: &impl World, perms: &impl Permissions, hot_reload: bool) {
        info!(
            hot_reload,
            quota = %self.config.knife_amount,
            cooldown = self.config.knife_cooldown,
            trails = self.config.trails_enabled(),
            "Throwing knives loaded"
        );

        if !hot_reload {
            return;
        }
        for player in world.players().iter().filter(|p| p.is_human()) {
            self.players.connect(
                player.slot,
                self.config.quota_for(perms, player.slot),
                self.config.may_throw(perms, player.slot),
                player.team,
            );
        }
    }

    /// Plugin unloaded: stop timers and forget every knife
    pub fn on_unload(&mut self) {
        self.timers.kill_all();
        self.registry.clear();
        info!("Throwing knives unloaded");
    }

    /// Options were (re)parsed. Stored quotas and permissions stay until
    /// the next connect or round start.
    pub fn on_config_parsed(&mut self, config: PluginConfig) {
        info!(
            quota = %config.knife_amount,
            overrides = config.knife_amounts_by_flag.len(),
            trails = config.trails_enabled(),
            "Config applied"
        );
        self.config = config;
    }

    pub fn on_player_connect(&mut self, world: &impl World, perms: &impl Permissions, slot: PlayerSlot) {
        let Some(player) = world.player(slot).filter(|p| p.is_human()) else {
            return;
        };
        let quota = self.config.quota_for(perms, slot);
        let allowed = self.config.may_throw(perms, slot);
        self.players.connect(slot, quota, allowed, player.team);
        debug!(slot = %slot, quota = %quota, allowed, "Player connected");
    }

    pub fn on_player_disconnect(&mut self, slot: PlayerSlot) {
        self.timers.kill(slot);
        self.players.disconnect(slot);
        debug!(slot = %slot, "Player disconnected");
    }

    /// New round: forget every knife, stop timers, and give connected
    /// humans a fresh quota and permission check. Running cooldowns carry
    /// over.
    pub fn on_round_start(&mut self, world: &impl World, perms: &impl Permissions) {
        let dropped = self.registry.len();
        self.registry.clear();
        self.timers.kill_all();

        let mut reset = 0;
        for player in world.players().iter().filter(|p| p.is_human()) {
            if !self.players.is_connected(player.slot) {
                continue;
            }
            self.players
                .set_quota(player.slot, self.config.quota_for(perms, player.slot));
            self.players
                .refresh_permission(player.slot, self.config.may_throw(perms, player.slot));
            reset += 1;
        }

        info!(dropped, players = reset, "Round started");
    }

    /// Button state changed. Pressing attack with a knife in hand throws
    /// when the cached permission allows it.
    pub fn on_buttons_changed(
        &mut self,
        world: &mut impl World,
        perms: &impl Permissions,
        slot: PlayerSlot,
        attack_pressed: bool,
        now: Instant,
    ) -> Option<Result<ThrownKnife, ThrowDeclined>> {
        if !attack_pressed || self.players.has_permission(slot) != Some(true) {
            return None;
        }
        let holding_knife = world
            .player(slot)
            .and_then(|p| p.active_weapon)
            .is_some_and(|w| w.is_knife() && world.weapon_is_valid(w.handle));
        if !holding_knife {
            return None;
        }
        Some(self.attempt_throw(world, perms, slot, now))
    }

    /// Throw a knife for `slot` and start its cooldown status timer
    pub fn attempt_throw(
        &mut self,
        world: &mut impl World,
        perms: &impl Permissions,
        slot: PlayerSlot,
        now: Instant,
    ) -> Result<ThrownKnife, ThrowDeclined> {
        let active_weapon = world
            .player(slot)
            .and_then(|p| p.active_weapon)
            .filter(|w| world.weapon_is_valid(w.handle));
        let id = ProjectileId::new(self.tick, self.tick_seq);

        let thrown = ThrowController {
            config: &self.config,
            players: &self.players,
            registry: &mut self.registry,
        }
        .attempt_throw(world, perms, slot, active_weapon.as_ref(), id, now)?;

        self.tick_seq += 1;
        self.timers.start(
            slot,
            self.players.clone(),
            self.hud.clone(),
            self.config.status_period(),
        );
        Ok(thrown)
    }

    /// Host tick: expire knives and draw trails
    pub fn on_tick(&mut self, world: &mut impl World, now: Instant) -> SweepReport {
        self.tick += 1;
        self.tick_seq = 0;
        TrailUpdater::sweep(
            &mut self.registry,
            &self.players,
            world,
            &TrailSettings::from(&self.config),
            now,
        )
    }

    /// Pre-damage hook. Events not caused by a tracked knife pass through.
    pub fn on_entity_take_damage(
        &mut self,
        world: &mut impl World,
        victim: &VictimView,
        info: &DamageInfo,
    ) -> DamageOutcome {
        if !CombatSystem::is_valid_victim(victim) {
            return DamageOutcome::Continue;
        }
        let Some(knife) = info.inflictor else {
            return DamageOutcome::Continue;
        };
        let Some(id) = self.registry.id_for_entity(knife) else {
            return DamageOutcome::Continue;
        };
        let Some((owner, weapon)) = self.registry.lookup_owner_and_weapon(id) else {
            return DamageOutcome::Continue;
        };
        let Some(origin_weapon) = weapon.filter(|w| world.weapon_is_valid(*w)) else {
            return DamageOutcome::Continue;
        };
        let Some(attacker) = world
            .player(owner.slot)
            .filter(|p| p.connected && p.pawn == Some(owner.pawn))
        else {
            return DamageOutcome::Continue;
        };

        let hit = KnifeHit {
            attacker_pawn: owner.pawn,
            attacker_team: attacker.team,
            origin_weapon,
            knife_position: world.entity_position(knife),
            victim,
        };
        let outcome = CombatSystem::resolve_knife_hit(&hit, info, &HitTuning::from(&self.config));

        match &outcome {
            DamageOutcome::Continue => return DamageOutcome::Continue,
            DamageOutcome::Stop => {
                debug!(projectile = %id, victim = %victim.entity, "Friendly knife suppressed");
            }
            DamageOutcome::Changed(changed) => {
                debug!(
                    projectile = %id,
                    victim = %victim.entity,
                    hit_group = ?changed.hit_group,
                    damage = changed.damage,
                    "Knife hit"
                );
                if self.config.debug_hits {
                    world.print_to_chat(owner.slot, &hit_message(changed));
                }
            }
        }

        world.destroy(knife);
        self.registry.unregister(id);
        outcome
    }

    /// The host removed an entity by itself
    pub fn on_entity_removed(&mut self, entity: EntityId) {
        if let Some(tracked) = self.registry.unregister_entity(entity) {
            debug!(projectile = %tracked.id, "Knife removed by host");
        }
    }

    /// `css_tk`: the menu to show, or nothing for bots and relays
    pub fn on_trail_command(&mut self, world: &impl World, slot: PlayerSlot) -> Option<TrailMenu> {
        let player = world.player(slot).filter(|p| p.is_human())?;
        let current = self.players.trail_color(slot, player.team);
        Some(TrailMenu::for_color(Some(current)))
    }

    /// A menu choice came back. Unknown choices, bots and relays change
    /// nothing.
    pub fn on_trail_choice(&mut self, world: &mut impl World, slot: PlayerSlot, choice: &str) -> bool {
        if world.player(slot).filter(|p| p.is_human()).is_none() {
            return false;
        }
        let Some((name, color)) = menu::palette_color(choice) else {
            return false;
        };
        self.players.set_trail_color(slot, color);
        world.print_to_chat(slot, &menu::choice_message(name));
        true
    }
}

fn hit_message(info: &DamageInfo) -> String {
    let region = if info.hit_group == HitGroup::Head { "head" } else { "body" };
    format!("[ThrowingKnives] Hit: {region} (dmg {:.1})", info.damage)
}
