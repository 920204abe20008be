//! Plugin options read from the JSON config file

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::host::{Permissions, PlayerSlot};
use crate::util::time::{secs, MAX_SPAN_SECS};

use super::ConfigError;

/// Config layout version this build writes
pub const CONFIG_VERSION: u32 = 6;

/// How many knives a player may throw per round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThrowQuota {
    Limited(u32),
    Unlimited,
}

impl ThrowQuota {
    pub fn is_unlimited(self) -> bool {
        matches!(self, Self::Unlimited)
    }

    /// Whether at least one throw is left
    pub fn allows_throw(self) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Limited(n) => n > 0,
        }
    }

    /// One throw spent. Unlimited stays unlimited, zero stays zero.
    pub fn spend(self) -> Self {
        match self {
            Self::Unlimited => Self::Unlimited,
            Self::Limited(n) => Self::Limited(n.saturating_sub(1)),
        }
    }

    /// Parse the textual forms accepted in config files
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("inf") || raw.eq_ignore_ascii_case("unlimited") {
            return Some(Self::Unlimited);
        }
        raw.parse::<i64>().ok().and_then(Self::from_signed)
    }

    /// `-1` is the unlimited sentinel, other negatives are rejected
    pub fn from_signed(value: i64) -> Option<Self> {
        match value {
            -1 => Some(Self::Unlimited),
            n if n >= 0 => u32::try_from(n).ok().map(Self::Limited),
            _ => None,
        }
    }

    fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_i64().and_then(Self::from_signed),
            serde_json::Value::String(s) => Self::parse(s),
            _ => None,
        }
    }

    fn as_signed(self) -> i64 {
        match self {
            Self::Unlimited => -1,
            Self::Limited(n) => i64::from(n),
        }
    }
}

impl fmt::Display for ThrowQuota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlimited => write!(f, "inf"),
            Self::Limited(n) => write!(f, "{}", n),
        }
    }
}

impl Default for ThrowQuota {
    fn default() -> Self {
        Self::Unlimited
    }
}

impl Serialize for ThrowQuota {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_signed())
    }
}

impl<'de> Deserialize<'de> for ThrowQuota {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_json(&value).ok_or_else(|| {
            de::Error::custom(format!(
                "expected a non-negative integer, -1, \"inf\" or \"unlimited\", got {}",
                value
            ))
        })
    }
}

/// Per permission-flag quota overrides. Keys compare case-insensitively;
/// entries whose value cannot be read are skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlagQuotas(Vec<(String, ThrowQuota)>);

impl FlagQuotas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an override
    pub fn insert(&mut self, flag: impl Into<String>, quota: ThrowQuota) {
        let flag = flag.into();
        match self.0.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&flag)) {
            Some(entry) => entry.1 = quota,
            None => self.0.push((flag, quota)),
        }
    }

    pub fn get(&self, flag: &str) -> Option<ThrowQuota> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(flag))
            .map(|(_, q)| *q)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ThrowQuota)> {
        self.0.iter().map(|(k, q)| (k.as_str(), *q))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for FlagQuotas {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (flag, quota) in &self.0 {
            map.serialize_entry(flag, quota)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FlagQuotas {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<serde_json::Map<String, serde_json::Value>>::deserialize(deserializer)?;
        let mut quotas = Self::new();
        for (flag, value) in raw.unwrap_or_default() {
            match ThrowQuota::from_json(&value) {
                Some(quota) => quotas.insert(flag, quota),
                None => warn!(flag = %flag, value = %value, "Ignoring unreadable per-flag knife amount"),
            }
        }
        Ok(quotas)
    }
}

/// Throwing knife options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PluginConfig {
    /// Knives per round for players without a matching flag override
    pub knife_amount: ThrowQuota,
    /// Launch speed along the aim direction
    pub knife_velocity: f32,
    /// Body hit damage
    pub knife_damage: f32,
    pub knife_headshot_damage: f32,
    /// Gravity scale of the thrown prop
    pub knife_gravity: f32,
    pub knife_amounts_by_flag: FlagQuotas,
    /// Tell the attacker where each knife landed
    pub debug_hits: bool,
    pub knife_elasticity: f32,
    /// Seconds before an unresolved knife is removed
    pub knife_lifetime: f32,
    /// Seconds a trail segment stays visible, `<= 0` disables trails
    pub knife_trail_time: f32,
    /// Seconds between throws
    pub knife_cooldown: f32,
    /// Flags or groups allowed to throw; empty means everyone
    pub knife_flags: Vec<String>,
    /// Fraction of hull height at or above which a hit counts as head
    pub head_height_fraction: f32,
    /// Minimum displacement before another trail segment is drawn
    pub trail_min_distance: f32,
    pub trail_width: f32,
    /// Seconds between cooldown status updates
    pub status_interval: f32,
    #[serde(rename = "ConfigVersion")]
    pub version: u32,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            knife_amount: ThrowQuota::Unlimited,
            knife_velocity: 2250.0,
            knife_damage: 45.0,
            knife_headshot_damage: 130.0,
            knife_gravity: 1.0,
            knife_amounts_by_flag: FlagQuotas::new(),
            debug_hits: false,
            knife_elasticity: 0.2,
            knife_lifetime: 5.0,
            knife_trail_time: 3.0,
            knife_cooldown: 3.0,
            knife_flags: Vec::new(),
            head_height_fraction: 0.8,
            trail_min_distance: 5.0,
            trail_width: 1.0,
            status_interval: 0.2,
            version: CONFIG_VERSION,
        }
    }
}

impl PluginConfig {
    /// Read and validate a JSON config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Parse and validate JSON config text
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        if config.version != CONFIG_VERSION {
            warn!(
                expected = CONFIG_VERSION,
                current = config.version,
                "Configuration version mismatch"
            );
        }
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let finite = [
            ("KnifeVelocity", self.knife_velocity),
            ("KnifeDamage", self.knife_damage),
            ("KnifeHeadshotDamage", self.knife_headshot_damage),
            ("KnifeGravity", self.knife_gravity),
            ("KnifeElasticity", self.knife_elasticity),
            ("KnifeLifetime", self.knife_lifetime),
            ("KnifeTrailTime", self.knife_trail_time),
            ("KnifeCooldown", self.knife_cooldown),
            ("HeadHeightFraction", self.head_height_fraction),
            ("TrailMinDistance", self.trail_min_distance),
            ("TrailWidth", self.trail_width),
            ("StatusInterval", self.status_interval),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(ConfigError::InvalidValue(name));
            }
        }
        if self.status_interval <= 0.0 {
            return Err(ConfigError::InvalidValue("StatusInterval"));
        }
        let spans = [
            ("KnifeLifetime", self.knife_lifetime),
            ("KnifeTrailTime", self.knife_trail_time),
            ("KnifeCooldown", self.knife_cooldown),
            ("StatusInterval", self.status_interval),
        ];
        for (name, value) in spans {
            if value > MAX_SPAN_SECS {
                return Err(ConfigError::InvalidValue(name));
            }
        }
        Ok(())
    }

    /// Quota for a player: the largest override among matching flags,
    /// otherwise the global amount. Overrides compare in their signed
    /// form, so an unlimited `-1` only wins when no bound matches.
    pub fn quota_for(&self, perms: &impl Permissions, slot: PlayerSlot) -> ThrowQuota {
        self.knife_amounts_by_flag
            .iter()
            .filter(|(flag, _)| !flag.trim().is_empty() && perms.matches(slot, flag))
            .map(|(_, quota)| quota)
            .max_by_key(|quota| quota.as_signed())
            .unwrap_or(self.knife_amount)
    }

    /// Whether a player may throw at all. A blank entry grants access.
    pub fn may_throw(&self, perms: &impl Permissions, slot: PlayerSlot) -> bool {
        self.knife_flags.is_empty()
            || self
                .knife_flags
                .iter()
                .any(|flag| flag.trim().is_empty() || perms.matches(slot, flag))
    }

    pub fn cooldown(&self) -> Duration {
        secs(self.knife_cooldown)
    }

    pub fn lifetime(&self) -> Duration {
        secs(self.knife_lifetime)
    }

    pub fn status_period(&self) -> Duration {
        secs(self.status_interval)
    }

    pub fn trails_enabled(&self) -> bool {
        self.knife_trail_time > 0.0
    }
}
