//! Knife launch geometry and motion helpers

use glam::Vec3;

use crate::host::Bounds;

/// How far in front of the thrower the knife appears
pub const SPAWN_DISTANCE: f32 = 64.0;
/// Sideways nudge applied to the spawn point (world y)
pub const SPAWN_SIDE_OFFSET: f32 = 5.0;
/// Height above the pawn origin, roughly eye level
pub const SPAWN_LIFT: f32 = 50.0;
/// Upward velocity added to every throw for a toss arc
pub const TOSS_BOOST: f32 = 300.0;
/// World gravity in units per second squared
pub const WORLD_GRAVITY: f32 = 800.0;

/// Physics system for knife launch and flight
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Unit aim direction from eye angles in degrees (x = pitch, y = yaw).
    /// Positive pitch looks down.
    pub fn aim_forward(eye_angles: Vec3) -> Vec3 {
        let pitch = eye_angles.x.to_radians();
        let yaw = eye_angles.y.to_radians();
        Vec3::new(pitch.cos() * yaw.cos(), pitch.cos() * yaw.sin(), -pitch.sin())
    }

    /// Spawn point in front of and slightly above the pawn origin
    pub fn spawn_position(origin: Vec3, forward: Vec3) -> Vec3 {
        origin + forward * SPAWN_DISTANCE + Vec3::new(0.0, SPAWN_SIDE_OFFSET, SPAWN_LIFT)
    }

    /// Launch velocity along the aim plus the toss boost
    pub fn launch_velocity(forward: Vec3, speed: f32) -> Vec3 {
        forward * speed + Vec3::new(0.0, 0.0, TOSS_BOOST)
    }

    /// Whether a point moved strictly more than `min_distance`
    pub fn moved_beyond(from: Vec3, to: Vec3, min_distance: f32) -> bool {
        from.distance(to) > min_distance
    }

    /// Finite and not (almost) the world origin
    pub fn is_usable_point(point: Vec3) -> bool {
        point.is_finite() && point.abs().max_element() > 0.01
    }

    /// One explicit Euler step under scaled gravity.
    /// Returns (new_position, new_velocity).
    pub fn integrate(position: Vec3, velocity: Vec3, gravity_scale: f32, dt: f32) -> (Vec3, Vec3) {
        let velocity = velocity - Vec3::Z * WORLD_GRAVITY * gravity_scale * dt;
        (position + velocity * dt, velocity)
    }

    /// Check whether a point lies inside bounds placed at `origin`
    pub fn point_in_bounds(point: Vec3, origin: Vec3, bounds: Bounds) -> bool {
        let local = point - origin;
        local.cmpge(bounds.mins).all() && local.cmple(bounds.maxs).all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        a.abs_diff_eq(b, 1e-3)
    }

    #[test]
    fn level_aim_points_along_yaw() {
        assert!(close(PhysicsSystem::aim_forward(Vec3::ZERO), Vec3::X));
        assert!(close(PhysicsSystem::aim_forward(Vec3::new(0.0, 90.0, 0.0)), Vec3::Y));
    }

    #[test]
    fn looking_down_points_down() {
        let forward = PhysicsSystem::aim_forward(Vec3::new(89.0, 0.0, 0.0));
        assert!(forward.z < -0.99);
        assert!((forward.length() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn spawn_and_velocity_offsets() {
        let origin = Vec3::new(100.0, 200.0, 0.0);
        let spawn = PhysicsSystem::spawn_position(origin, Vec3::X);
        assert!(close(spawn, Vec3::new(164.0, 205.0, 50.0)));

        let velocity = PhysicsSystem::launch_velocity(Vec3::X, 2250.0);
        assert!(close(velocity, Vec3::new(2250.0, 0.0, 300.0)));
    }

    #[test]
    fn displacement_threshold_is_strict() {
        let a = Vec3::ZERO;
        assert!(!PhysicsSystem::moved_beyond(a, Vec3::new(4.0, 0.0, 0.0), 5.0));
        assert!(!PhysicsSystem::moved_beyond(a, Vec3::new(5.0, 0.0, 0.0), 5.0));
        assert!(PhysicsSystem::moved_beyond(a, Vec3::new(6.0, 0.0, 0.0), 5.0));
    }

    #[test]
    fn usable_points() {
        assert!(!PhysicsSystem::is_usable_point(Vec3::ZERO));
        assert!(!PhysicsSystem::is_usable_point(Vec3::new(0.001, 0.0, 0.0)));
        assert!(!PhysicsSystem::is_usable_point(Vec3::new(f32::NAN, 10.0, 0.0)));
        assert!(!PhysicsSystem::is_usable_point(Vec3::new(f32::INFINITY, 0.0, 0.0)));
        assert!(PhysicsSystem::is_usable_point(Vec3::new(0.0, 0.0, 60.0)));
    }

    #[test]
    fn gravity_pulls_down() {
        let (pos, vel) = PhysicsSystem::integrate(Vec3::ZERO, Vec3::ZERO, 1.0, 0.5);
        assert!(close(vel, Vec3::new(0.0, 0.0, -400.0)));
        assert!(close(pos, Vec3::new(0.0, 0.0, -200.0)));

        let (_, vel) = PhysicsSystem::integrate(Vec3::ZERO, Vec3::X, 0.0, 0.5);
        assert!(close(vel, Vec3::X));
    }

    #[test]
    fn bounds_containment() {
        let origin = Vec3::new(10.0, 10.0, 0.0);
        assert!(PhysicsSystem::point_in_bounds(Vec3::new(10.0, 10.0, 70.0), origin, Bounds::PLAYER));
        assert!(!PhysicsSystem::point_in_bounds(Vec3::new(10.0, 10.0, 73.0), origin, Bounds::PLAYER));
        assert!(!PhysicsSystem::point_in_bounds(Vec3::new(30.0, 10.0, 10.0), origin, Bounds::PLAYER));
    }
}
