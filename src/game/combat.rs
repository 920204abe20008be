//! Knife hit resolution - reclassifying the engine's damage event

use glam::Vec3;

use crate::config::PluginConfig;
use crate::host::{
    Bounds, DamageInfo, DamageOutcome, DamageTypes, EntityId, HitGroup, Team, VictimView,
    WeaponHandle,
};

use super::physics::PhysicsSystem;

/// Hull assumed when the victim reports no collision bounds
const FALLBACK_BOUNDS: Bounds = Bounds {
    mins: Vec3::ZERO,
    maxs: Vec3::new(0.0, 0.0, 72.0),
};

/// Damage numbers and the head heuristic threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitTuning {
    pub base_damage: f32,
    pub headshot_damage: f32,
    /// Height fraction at or above which a hit counts as head
    pub head_fraction: f32,
}

impl From<&PluginConfig> for HitTuning {
    fn from(config: &PluginConfig) -> Self {
        Self {
            base_damage: config.knife_damage,
            headshot_damage: config.knife_headshot_damage,
            head_fraction: config.head_height_fraction,
        }
    }
}

/// A tracked knife that touched a victim, with its thrower resolved
#[derive(Debug, Clone)]
pub struct KnifeHit<'a> {
    pub attacker_pawn: EntityId,
    pub attacker_team: Team,
    pub origin_weapon: WeaponHandle,
    /// Where the knife is right now, if the engine still knows
    pub knife_position: Option<Vec3>,
    pub victim: &'a VictimView,
}

/// Combat system for knife hits
pub struct CombatSystem;

impl CombatSystem {
    /// Whether the damaged entity is something knives can score on
    pub fn is_valid_victim(victim: &VictimView) -> bool {
        victim.is_player && victim.alive
    }

    /// Rewrite a damage event caused by a thrown knife.
    ///
    /// Teammates get `Stop`. Everything else becomes a slashing hit by the
    /// thrower, credited to the weapon the knife was thrown with.
    pub fn resolve_knife_hit(hit: &KnifeHit<'_>, info: &DamageInfo, tuning: &HitTuning) -> DamageOutcome {
        if hit.attacker_team == hit.victim.team {
            return DamageOutcome::Stop;
        }

        let mut info = info.clone();
        info.inflictor = Some(hit.attacker_pawn);
        info.attacker = Some(hit.attacker_pawn);
        info.ability = Some(hit.origin_weapon);
        info.damage_type = DamageTypes::SLASH;

        let engine_group = Self::engine_hit_group(&info, hit.victim);
        let impact = Self::impact_point(&info, hit.knife_position, hit.victim.origin);
        let origin = hit.victim.origin.unwrap_or(impact);
        let fraction = Self::height_fraction(impact, origin, hit.victim.bounds.unwrap_or(FALLBACK_BOUNDS));
        let hit_group = Self::classify_hit(engine_group, fraction >= tuning.head_fraction);

        info.hit_group = hit_group;
        if hit_group == HitGroup::Head {
            info.damage_type |= DamageTypes::HEADSHOT;
            info.damage = tuning.headshot_damage;
        } else {
            info.damage = tuning.base_damage;
        }

        DamageOutcome::Changed(info)
    }

    /// Best hit group the engine offers: the event's own, then the
    /// secondary accessor, then the victim's last recorded one.
    /// May still be `Invalid`.
    pub fn engine_hit_group(info: &DamageInfo, victim: &VictimView) -> HitGroup {
        [info.hit_group, info.reported_hit_group, victim.last_hit_group]
            .into_iter()
            .find(|group| group.is_valid())
            .unwrap_or(HitGroup::Invalid)
    }

    /// Best available impact point: the reported damage position, then the
    /// knife, then the victim origin, then the world origin
    pub fn impact_point(info: &DamageInfo, knife_position: Option<Vec3>, victim_origin: Option<Vec3>) -> Vec3 {
        if PhysicsSystem::is_usable_point(info.damage_position) {
            return info.damage_position;
        }
        knife_position
            .filter(|p| p.is_finite())
            .or(victim_origin)
            .unwrap_or(Vec3::ZERO)
    }

    /// Height of the impact within the victim hull, as a fraction of hull
    /// height. Hulls under one unit tall divide by one. Flat or inverted
    /// hulls and non-finite input give `0.0`.
    pub fn height_fraction(impact: Vec3, origin: Vec3, bounds: Bounds) -> f32 {
        let height = bounds.maxs.z - bounds.mins.z;
        if !height.is_finite() || height <= 0.0 {
            return 0.0;
        }
        let fraction = (impact.z - origin.z - bounds.mins.z) / height.max(1.0);
        if fraction.is_finite() {
            fraction
        } else {
            0.0
        }
    }

    /// Combine the engine's hit group with the geometric estimate. The
    /// estimate decides when the engine had nothing and can only ever
    /// promote to head.
    pub fn classify_hit(engine_group: HitGroup, geometric_head: bool) -> HitGroup {
        match engine_group {
            HitGroup::Invalid if geometric_head => HitGroup::Head,
            HitGroup::Invalid => HitGroup::Chest,
            _ if geometric_head => HitGroup::Head,
            group => group,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TUNING: HitTuning = HitTuning {
        base_damage: 45.0,
        headshot_damage: 130.0,
        head_fraction: 0.8,
    };

    fn victim(team: Team) -> VictimView {
        VictimView {
            entity: EntityId(20),
            is_player: true,
            alive: true,
            team,
            origin: Some(Vec3::new(0.0, 0.0, 100.0)),
            bounds: Some(Bounds::PLAYER),
            last_hit_group: HitGroup::Invalid,
        }
    }

    fn event_at(z: f32, group: HitGroup) -> DamageInfo {
        DamageInfo {
            hit_group: group,
            damage_position: Vec3::new(1.0, 1.0, z),
            ..DamageInfo::from_inflictor(EntityId(300), 12.0)
        }
    }

    fn hit(victim: &VictimView, attacker_team: Team) -> KnifeHit<'_> {
        KnifeHit {
            attacker_pawn: EntityId(10),
            attacker_team,
            origin_weapon: WeaponHandle(42),
            knife_position: None,
            victim,
        }
    }

    fn changed(outcome: DamageOutcome) -> DamageInfo {
        match outcome {
            DamageOutcome::Changed(info) => info,
            other => panic!("expected Changed, got {:?}", other),
        }
    }

    #[test]
    fn teammates_are_suppressed() {
        let v = victim(Team::Terrorist);
        let outcome = CombatSystem::resolve_knife_hit(&hit(&v, Team::Terrorist), &event_at(150.0, HitGroup::Chest), &TUNING);
        assert_eq!(outcome, DamageOutcome::Stop);
    }

    #[test]
    fn body_hit_is_rewritten_as_slash() {
        let v = victim(Team::Terrorist);
        let info = changed(CombatSystem::resolve_knife_hit(
            &hit(&v, Team::CounterTerrorist),
            &event_at(130.0, HitGroup::Stomach),
            &TUNING,
        ));
        assert_eq!(info.attacker, Some(EntityId(10)));
        assert_eq!(info.inflictor, Some(EntityId(10)));
        assert_eq!(info.ability, Some(WeaponHandle(42)));
        assert_eq!(info.damage_type, DamageTypes::SLASH);
        assert_eq!(info.hit_group, HitGroup::Stomach);
        assert_eq!(info.damage, 45.0);
    }

    #[test]
    fn geometry_promotes_non_head_group() {
        let v = victim(Team::Terrorist);
        // 60 / 72 = 0.83
        let info = changed(CombatSystem::resolve_knife_hit(
            &hit(&v, Team::CounterTerrorist),
            &event_at(160.0, HitGroup::Chest),
            &TUNING,
        ));
        assert_eq!(info.hit_group, HitGroup::Head);
        assert!(info.damage_type.contains(DamageTypes::SLASH | DamageTypes::HEADSHOT));
        assert_eq!(info.damage, 130.0);
    }

    #[test]
    fn geometry_never_demotes_engine_head() {
        let v = victim(Team::Terrorist);
        let info = changed(CombatSystem::resolve_knife_hit(
            &hit(&v, Team::CounterTerrorist),
            &event_at(110.0, HitGroup::Head),
            &TUNING,
        ));
        assert_eq!(info.hit_group, HitGroup::Head);
        assert_eq!(info.damage, 130.0);
    }

    #[test]
    fn geometry_decides_without_engine_group() {
        let v = victim(Team::Terrorist);
        let low = changed(CombatSystem::resolve_knife_hit(
            &hit(&v, Team::CounterTerrorist),
            &event_at(120.0, HitGroup::Invalid),
            &TUNING,
        ));
        assert_eq!(low.hit_group, HitGroup::Chest);
        assert!(!low.damage_type.contains(DamageTypes::HEADSHOT));

        let high = changed(CombatSystem::resolve_knife_hit(
            &hit(&v, Team::CounterTerrorist),
            &event_at(171.0, HitGroup::Invalid),
            &TUNING,
        ));
        assert_eq!(high.hit_group, HitGroup::Head);
    }

    #[test]
    fn hit_group_fallback_chain() {
        let mut v = victim(Team::Terrorist);
        let mut info = event_at(0.0, HitGroup::Invalid);
        assert_eq!(CombatSystem::engine_hit_group(&info, &v), HitGroup::Invalid);

        v.last_hit_group = HitGroup::LeftLeg;
        assert_eq!(CombatSystem::engine_hit_group(&info, &v), HitGroup::LeftLeg);

        info.reported_hit_group = HitGroup::RightArm;
        assert_eq!(CombatSystem::engine_hit_group(&info, &v), HitGroup::RightArm);

        info.hit_group = HitGroup::Neck;
        assert_eq!(CombatSystem::engine_hit_group(&info, &v), HitGroup::Neck);
    }

    #[test]
    fn impact_point_fallback_chain() {
        let knife = Some(Vec3::new(5.0, 5.0, 150.0));
        let origin = Some(Vec3::new(0.0, 0.0, 100.0));

        let reported = event_at(140.0, HitGroup::Invalid);
        assert_eq!(CombatSystem::impact_point(&reported, knife, origin), reported.damage_position);

        let blank = DamageInfo::from_inflictor(EntityId(1), 1.0);
        assert_eq!(CombatSystem::impact_point(&blank, knife, origin), knife.unwrap());
        assert_eq!(CombatSystem::impact_point(&blank, None, origin), origin.unwrap());
        assert_eq!(CombatSystem::impact_point(&blank, None, None), Vec3::ZERO);

        let nan = DamageInfo {
            damage_position: Vec3::new(f32::NAN, 0.0, 1.0),
            ..blank
        };
        assert_eq!(CombatSystem::impact_point(&nan, None, origin), origin.unwrap());
    }

    #[test]
    fn height_fraction_is_always_finite() {
        let flat = Bounds {
            mins: Vec3::ZERO,
            maxs: Vec3::new(16.0, 16.0, 0.0),
        };
        assert_eq!(CombatSystem::height_fraction(Vec3::new(0.0, 0.0, 50.0), Vec3::ZERO, flat), 0.0);

        let inverted = Bounds {
            mins: Vec3::new(0.0, 0.0, 72.0),
            maxs: Vec3::ZERO,
        };
        assert_eq!(CombatSystem::height_fraction(Vec3::new(0.0, 0.0, 50.0), Vec3::ZERO, inverted), 0.0);

        let nan_impact = Vec3::new(0.0, 0.0, f32::NAN);
        assert_eq!(CombatSystem::height_fraction(nan_impact, Vec3::ZERO, Bounds::PLAYER), 0.0);

        let inf_impact = Vec3::new(0.0, 0.0, f32::INFINITY);
        assert_eq!(CombatSystem::height_fraction(inf_impact, Vec3::ZERO, Bounds::PLAYER), 0.0);

        let f = CombatSystem::height_fraction(Vec3::new(0.0, 0.0, 36.0), Vec3::ZERO, Bounds::PLAYER);
        assert!((f - 0.5).abs() < 1e-6);
    }

    #[test]
    fn sub_unit_hull_divides_by_one() {
        let thin = Bounds {
            mins: Vec3::ZERO,
            maxs: Vec3::new(16.0, 16.0, 0.5),
        };
        let f = CombatSystem::height_fraction(Vec3::new(0.0, 0.0, 0.9), Vec3::ZERO, thin);
        assert!((f - 0.9).abs() < 1e-6);
        let f = CombatSystem::height_fraction(Vec3::new(0.0, 0.0, 0.25), Vec3::ZERO, thin);
        assert!((f - 0.25).abs() < 1e-6);
    }

    #[test]
    fn classification_is_monotonic_toward_head() {
        let groups = [
            HitGroup::Generic,
            HitGroup::Head,
            HitGroup::Chest,
            HitGroup::Stomach,
            HitGroup::LeftArm,
            HitGroup::RightArm,
            HitGroup::LeftLeg,
            HitGroup::RightLeg,
            HitGroup::Neck,
            HitGroup::Gear,
        ];
        for group in groups {
            assert_eq!(CombatSystem::classify_hit(group, true), HitGroup::Head);
            assert_eq!(CombatSystem::classify_hit(group, false), group);
        }
        assert_eq!(CombatSystem::classify_hit(HitGroup::Invalid, false), HitGroup::Chest);
    }

    #[test]
    fn missing_bounds_use_standing_hull() {
        let mut v = victim(Team::Terrorist);
        v.bounds = None;
        let info = changed(CombatSystem::resolve_knife_hit(
            &hit(&v, Team::CounterTerrorist),
            &event_at(165.0, HitGroup::Invalid),
            &TUNING,
        ));
        assert_eq!(info.hit_group, HitGroup::Head);
    }

    #[test]
    fn dead_or_non_player_victims_rejected() {
        let mut v = victim(Team::Terrorist);
        assert!(CombatSystem::is_valid_victim(&v));
        v.alive = false;
        assert!(!CombatSystem::is_valid_victim(&v));
        v.alive = true;
        v.is_player = false;
        assert!(!CombatSystem::is_valid_victim(&v));
    }
}
