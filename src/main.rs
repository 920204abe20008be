//! Throwing knives sandbox server
//!
//! Runs the knife session against the in-memory host: two small teams
//! trade knives on a tick loop until Ctrl+C.

use std::sync::Arc;
use std::time::Duration;

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use throwing_knives::app::KnifeSession;
use throwing_knives::config::Config;
use throwing_knives::host::sandbox::{SandboxHud, SandboxPermissions, SandboxWorld};
use throwing_knives::host::{DamageOutcome, PlayerSlot, Team, World};
use throwing_knives::menu;
use throwing_knives::util::time::tick_delta;

/// Players per team in the sandbox
const TEAM_SIZE: usize = 3;
/// Distance between the two team lines
const LANE_LENGTH: f32 = 600.0;
/// Chance per tick that a player presses attack
const ATTACK_CHANCE: f64 = 0.02;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    init_tracing(&config.log_level);

    info!("Starting throwing knives sandbox");
    info!(tick_rate = config.tick_rate, "Host tick rate");

    let plugin = config.load_plugin_config()?;
    menu::ensure_menu_files(
        config.menu_shared_dir.as_deref(),
        config.menu_target_dir.as_deref(),
    );

    let hud = Arc::new(SandboxHud::new());
    let perms = SandboxPermissions::new();
    let mut world = SandboxWorld::new();
    let mut session = KnifeSession::new(plugin, hud);

    session.on_load(&world, &perms, false);

    for i in 0..TEAM_SIZE {
        let y = i as f32 * 80.0;
        for (team, x) in [(Team::Terrorist, 0.0), (Team::CounterTerrorist, LANE_LENGTH)] {
            let slot = world.add_player(team, Vec3::new(x, y, 0.0));
            session.on_player_connect(&world, &perms, slot);
        }
    }
    session.on_round_start(&world, &perms);

    tokio::select! {
        _ = run_sandbox(&mut session, &mut world, &perms, config.tick_rate) => {}
        _ = shutdown_signal() => {}
    }

    session.on_unload();
    info!("Sandbox shutdown complete");
    Ok(())
}

/// Tick loop: scripted aim and attack presses, prop physics, damage hooks
async fn run_sandbox(
    session: &mut KnifeSession,
    world: &mut SandboxWorld,
    perms: &SandboxPermissions,
    tick_rate: u32,
) {
    let dt = tick_delta(tick_rate);
    let mut ticker = interval(Duration::from_secs_f32(dt));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut rng = ChaCha8Rng::from_entropy();
    let roster: Vec<(PlayerSlot, Team)> = world.players().iter().map(|p| (p.slot, p.team)).collect();

    loop {
        ticker.tick().await;
        let now = Instant::now();

        for &(slot, team) in &roster {
            let alive = world.victim(slot).is_some_and(|v| v.alive);
            if !alive {
                continue;
            }
            aim_at_random_enemy(world, &mut rng, slot, team);

            let pressed = rng.gen_bool(ATTACK_CHANCE);
            match session.on_buttons_changed(world, perms, slot, pressed, now) {
                Some(Ok(knife)) => debug!(slot = %slot, projectile = %knife.id, "Sandbox throw"),
                Some(Err(declined)) => trace!(slot = %slot, reason = %declined, "Throw declined"),
                None => {}
            }
        }

        for contact in world.step(dt) {
            let outcome = session.on_entity_take_damage(world, &contact.victim, &contact.info);
            if let DamageOutcome::Changed(info) = outcome {
                if world.apply_damage(contact.victim.entity, info.damage) {
                    info!(victim = %contact.victim.entity, hit_group = ?info.hit_group, "Player killed");
                }
            }
        }

        session.on_tick(world, now);

        if team_eliminated(world, &roster) {
            world.respawn_all();
            session.on_round_start(world, perms);
        }
    }
}

fn aim_at_random_enemy(world: &mut SandboxWorld, rng: &mut ChaCha8Rng, slot: PlayerSlot, team: Team) {
    let enemies: Vec<Vec3> = world
        .players()
        .iter()
        .filter(|p| p.team != team)
        .filter(|p| world.victim(p.slot).is_some_and(|v| v.alive))
        .map(|p| p.origin)
        .collect();
    if enemies.is_empty() {
        return;
    }
    let target = enemies[rng.gen_range(0..enemies.len())];

    let Some(player) = world.player_mut(slot) else {
        return;
    };
    let to_target = target - player.origin;
    let yaw = to_target.y.atan2(to_target.x).to_degrees() + rng.gen_range(-3.0f32..3.0);
    let pitch = rng.gen_range(0.0f32..12.0);
    player.eye_angles = Vec3::new(pitch, yaw, 0.0);
}

fn team_eliminated(world: &SandboxWorld, roster: &[(PlayerSlot, Team)]) -> bool {
    [Team::Terrorist, Team::CounterTerrorist].into_iter().any(|team| {
        roster
            .iter()
            .filter(|(_, t)| *t == team)
            .all(|(slot, _)| !world.victim(*slot).is_some_and(|v| v.alive))
    })
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
