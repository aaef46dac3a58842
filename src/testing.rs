//! In-memory stand-ins for the movement module and the autopilot, shared by
//! the unit tests. Clones share state, so a test keeps one clone for
//! inspection while the craft owns the other.

use bevy::prelude::*;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::docking::collaborators::{
    InterpolationMode, ManeuverTarget, MovementController, PathFollower, PathFollowerState,
};
use crate::paths::PathId;

#[derive(Debug)]
pub struct FakeBody {
    pub movement_enabled: bool,
    pub collision: bool,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    pub position: Vec3,
    pub rotation: Quat,
    pub interpolation: InterpolationMode,
}

impl Default for FakeBody {
    fn default() -> Self {
        Self {
            movement_enabled: true,
            collision: true,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            interpolation: InterpolationMode::Interpolate,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct FakeMovement {
    body: Arc<Mutex<FakeBody>>,
}

impl FakeMovement {
    pub fn at(position: Vec3, rotation: Quat) -> Self {
        let movement = Self::default();
        {
            let mut body = movement.body();
            body.position = position;
            body.rotation = rotation;
        }
        movement
    }

    pub fn body(&self) -> MutexGuard<'_, FakeBody> {
        self.body.lock().unwrap()
    }
}

impl MovementController for FakeMovement {
    fn disable_movement(&mut self) {
        self.body().movement_enabled = false;
    }

    fn enable_movement(&mut self, reset_velocity: bool) {
        let mut body = self.body();
        body.movement_enabled = true;
        if reset_velocity {
            body.velocity = Vec3::ZERO;
            body.angular_velocity = Vec3::ZERO;
        }
    }

    fn set_collision_detection(&mut self, enabled: bool) {
        self.body().collision = enabled;
    }

    fn velocity(&self) -> Vec3 {
        self.body().velocity
    }

    fn angular_velocity(&self) -> Vec3 {
        self.body().angular_velocity
    }

    fn set_velocity(&mut self, velocity: Vec3, angular_velocity: Vec3) {
        let mut body = self.body();
        body.velocity = velocity;
        body.angular_velocity = angular_velocity;
    }

    fn position(&self) -> Vec3 {
        self.body().position
    }

    fn rotation(&self) -> Quat {
        self.body().rotation
    }

    fn set_transform(&mut self, position: Vec3, rotation: Quat) {
        let mut body = self.body();
        body.position = position;
        body.rotation = rotation;
    }

    fn interpolation_mode(&self) -> InterpolationMode {
        self.body().interpolation
    }

    fn set_interpolation_mode(&mut self, mode: InterpolationMode) {
        self.body().interpolation = mode;
    }
}

#[derive(Debug, Default)]
pub struct AutopilotLog {
    pub paths: Vec<PathId>,
    pub targets: Vec<ManeuverTarget>,
    pub clears: usize,
    pub completed: bool,
    pub state: PathFollowerState,
}

/// Autopilot that only arrives when the test says so.
#[derive(Clone, Debug, Default)]
pub struct ScriptedAutopilot {
    log: Arc<Mutex<AutopilotLog>>,
}

impl ScriptedAutopilot {
    pub fn complete(&self) {
        self.log().completed = true;
    }

    pub fn log(&self) -> MutexGuard<'_, AutopilotLog> {
        self.log.lock().unwrap()
    }

    pub fn last_target(&self) -> Option<ManeuverTarget> {
        self.log().targets.last().copied()
    }
}

impl PathFollower for ScriptedAutopilot {
    fn assign_target_path(&mut self, path: PathId) {
        let mut log = self.log();
        log.paths.push(path);
        log.state = PathFollowerState::FollowingPath;
    }

    fn assign_target(&mut self, target: ManeuverTarget) {
        let mut log = self.log();
        log.targets.push(target);
        log.state = PathFollowerState::MovingToTarget;
    }

    fn clear_target(&mut self) {
        let mut log = self.log();
        log.clears += 1;
        log.state = PathFollowerState::Idle;
    }

    fn take_completed(&mut self) -> bool {
        std::mem::take(&mut self.log().completed)
    }

    fn state(&self) -> PathFollowerState {
        self.log().state
    }
}
