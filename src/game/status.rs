//! Repeating cooldown status timers
//!
//! After a throw the thrower sees the remaining cooldown and knife count
//! on the centre HUD every `period`, until the cooldown has elapsed. Each
//! timer is a tokio task, so everything it reads comes from the concurrent
//! [`PlayerCombatStore`].

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace};

use crate::config::ThrowQuota;
use crate::host::{HudSink, PlayerSlot};

use super::players::PlayerCombatStore;

/// HUD line while the cooldown runs
pub fn cooldown_text(remaining: Duration, quota: Option<ThrowQuota>) -> String {
    format!(
        "Cooldown: {:.1}s | Knives: {}",
        remaining.as_secs_f32(),
        quota_text(quota)
    )
}

/// HUD line once the next throw is available
pub fn ready_text(quota: Option<ThrowQuota>) -> String {
    format!("Knife ready | Knives: {}", quota_text(quota))
}

fn quota_text(quota: Option<ThrowQuota>) -> String {
    quota.unwrap_or(ThrowQuota::Unlimited).to_string()
}

/// Running status timers, one per player at most
#[derive(Debug)]
pub struct CooldownTimers {
    runtime: Option<Handle>,
    handles: DashMap<PlayerSlot, JoinHandle<()>>,
}

impl Default for CooldownTimers {
    fn default() -> Self {
        Self::new()
    }
}

impl CooldownTimers {
    /// Timers on the runtime current at construction. Without one, no
    /// status is shown.
    pub fn new() -> Self {
        Self {
            runtime: Handle::try_current().ok(),
            handles: DashMap::new(),
        }
    }

    /// Timers on an explicit runtime
    pub fn with_runtime(runtime: Handle) -> Self {
        Self {
            runtime: Some(runtime),
            handles: DashMap::new(),
        }
    }

    /// Start a status timer for `slot`, replacing any running one.
    /// Safe to call from any thread.
    pub fn start(
        &self,
        slot: PlayerSlot,
        players: Arc<PlayerCombatStore>,
        hud: Arc<dyn HudSink>,
        period: Duration,
    ) {
        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            debug!(slot = %slot, "No tokio runtime, status timer skipped");
            self.kill(slot);
            return;
        };
        let period = period.max(Duration::from_millis(10));
        let handle = runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                if !players.is_connected(slot) {
                    trace!(slot = %slot, "Status timer stopped, player gone");
                    break;
                }

                let remaining = players.cooldown_remaining(slot, Instant::now());
                let quota = players.quota(slot);
                if remaining.is_zero() {
                    hud.center_alert(slot, &ready_text(quota));
                    break;
                }
                hud.center_alert(slot, &cooldown_text(remaining, quota));
            }
        });

        if let Some(previous) = self.handles.insert(slot, handle) {
            previous.abort();
        }
    }

    /// Cancel the timer of one player
    pub fn kill(&self, slot: PlayerSlot) {
        if let Some((_, handle)) = self.handles.remove(&slot) {
            handle.abort();
        }
    }

    /// Cancel every timer
    pub fn kill_all(&self) {
        self.handles.retain(|_, handle| {
            handle.abort();
            false
        });
    }

    /// Whether a timer for `slot` is still running
    pub fn is_running(&self, slot: PlayerSlot) -> bool {
        self.handles
            .get(&slot)
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for CooldownTimers {
    fn drop(&mut self) {
        self.kill_all();
    }
}
