//! Interfaces to the systems the docking core drives but does not own: the
//! craft's physics/movement module and its autopilot (path follower).

use bevy::prelude::*;

use crate::paths::PathId;

/// Rigid-body interpolation mode, mirrored from the physics integrator.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub enum InterpolationMode {
    #[default]
    None,
    Interpolate,
    Extrapolate,
}

/// The craft's movement/physics module.
///
/// The docking core never integrates motion itself; it only switches
/// simulation on and off, reads and seeds velocities, and places the craft
/// when it is attached to a station.
pub trait MovementController: Send + Sync {
    /// Stop physical simulation (and movement input) for the craft.
    fn disable_movement(&mut self);
    /// Resume physical simulation; optionally zero linear and angular velocity.
    fn enable_movement(&mut self, reset_velocity: bool);
    fn set_collision_detection(&mut self, enabled: bool);
    fn velocity(&self) -> Vec3;
    fn angular_velocity(&self) -> Vec3;
    fn set_velocity(&mut self, velocity: Vec3, angular_velocity: Vec3);
    fn position(&self) -> Vec3;
    fn rotation(&self) -> Quat;
    fn set_transform(&mut self, position: Vec3, rotation: Quat);
    fn interpolation_mode(&self) -> InterpolationMode;
    fn set_interpolation_mode(&mut self, mode: InterpolationMode);
}

/// Where the autopilot should take the craft and when it counts as arrived.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ManeuverTarget {
    pub position: Vec3,
    pub rotation: Quat,
    /// Radius of the target sphere used by the follower for steering.
    pub radius: f32,
    /// Completion distance in world units.
    pub completion_distance: f32,
    /// Completion angle in degrees.
    pub completion_angle: f32,
    /// Maximum time the follower may spend, 0 = unlimited.
    pub max_duration: f32,
    /// Velocity of the frame the target lives in (moving stations).
    pub velocity: Vec3,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum PathFollowerState {
    #[default]
    Idle,
    FollowingPath,
    MovingToTarget,
}

/// The autopilot that flies an autonomous craft.
///
/// Completion is reported by polling: the follower latches "reached target"
/// and hands it over once through [`PathFollower::take_completed`]. Several
/// arrivals reported between two polls collapse into a single completion.
pub trait PathFollower: Send + Sync {
    fn assign_target_path(&mut self, path: PathId);
    fn assign_target(&mut self, target: ManeuverTarget);
    fn clear_target(&mut self);
    fn take_completed(&mut self) -> bool;
    fn state(&self) -> PathFollowerState;
}
