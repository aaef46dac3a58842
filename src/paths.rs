//! Entry and exit paths bound to docking points.
//!
//! Paths are plain waypoint lists. When the station they belong to rides on a
//! moving carrier, the station shifts them with the carrier every step so an
//! autopilot following them stays in the carrier's frame.

use bevy::prelude::*;
use std::collections::BTreeMap;

/// Opaque path handle. `PathId::NONE` (0) means "no path".
#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd, serde::Serialize, serde::Deserialize,
)]
pub struct PathId(pub u32);

impl PathId {
    pub const NONE: PathId = PathId(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn is_some(self) -> bool {
        self.0 != 0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DockingPath {
    pub id: PathId,
    pub name: String,
    pub waypoints: Vec<Vec3>,
    /// Velocity of the frame the path is moving with.
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Step sequence of the last carrier update applied to this path.
    last_update_sequence: Option<u64>,
}

impl DockingPath {
    pub fn end(&self) -> Option<Vec3> {
        self.waypoints.last().copied()
    }

    pub fn last_update_sequence(&self) -> Option<u64> {
        self.last_update_sequence
    }

    /// Move every waypoint by a rigid carrier motion around `pivot`.
    ///
    /// Returns false when the path was already moved during `sequence`, so a
    /// path shared by several docking points is only moved once per step.
    pub fn apply_carrier_motion(
        &mut self,
        motion: &CarrierMotion,
        sequence: u64,
    ) -> bool {
        if self.last_update_sequence == Some(sequence) {
            return false;
        }

        for waypoint in self.waypoints.iter_mut() {
            *waypoint = motion.transform_point(*waypoint);
        }
        self.velocity = motion.velocity;
        self.angular_velocity = motion.angular_velocity;
        self.last_update_sequence = Some(sequence);
        true
    }
}

/// Rigid motion of a carrier between two steps.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CarrierMotion {
    pub previous_position: Vec3,
    pub previous_rotation: Quat,
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl CarrierMotion {
    pub fn delta_rotation(&self) -> Quat {
        (self.rotation * self.previous_rotation.inverse()).normalize()
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.delta_rotation() * (point - self.previous_position)
    }

    pub fn is_stationary(&self) -> bool {
        self.position == self.previous_position && self.rotation == self.previous_rotation
    }
}

/// Owns every path in the docking world and hands out ids.
#[derive(Debug)]
pub struct PathRegistry {
    paths: BTreeMap<PathId, DockingPath>,
    next_id: u32,
}

impl Default for PathRegistry {
    fn default() -> Self {
        Self {
            paths: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl PathRegistry {
    pub fn add(&mut self, name: impl Into<String>, waypoints: Vec<Vec3>) -> PathId {
        let id = PathId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.paths.insert(
            id,
            DockingPath {
                id,
                name: name.into(),
                waypoints,
                velocity: Vec3::ZERO,
                angular_velocity: Vec3::ZERO,
                last_update_sequence: None,
            },
        );
        id
    }

    pub fn get(&self, id: PathId) -> Option<&DockingPath> {
        self.paths.get(&id)
    }

    pub fn get_mut(&mut self, id: PathId) -> Option<&mut DockingPath> {
        self.paths.get_mut(&id)
    }

    pub fn contains(&self, id: PathId) -> bool {
        id.is_some() && self.paths.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn motion(offset: Vec3, rotation: Quat) -> CarrierMotion {
        CarrierMotion {
            previous_position: Vec3::ZERO,
            previous_rotation: Quat::IDENTITY,
            position: offset,
            rotation,
            velocity: offset,
            angular_velocity: Vec3::new(0.0, 0.5, 0.0),
        }
    }

    #[test]
    fn registry_ids_start_at_one_and_increase() {
        let mut registry = PathRegistry::default();
        let first = registry.add("entry", vec![Vec3::ZERO]);
        let second = registry.add("exit", vec![Vec3::ONE]);
        assert_eq!(first, PathId(1));
        assert_eq!(second, PathId(2));
        assert!(registry.contains(first));
        assert!(!registry.contains(PathId::NONE));
    }

    #[test]
    fn carrier_motion_translates_and_rotates_waypoints() {
        let mut registry = PathRegistry::default();
        let id = registry.add("entry", vec![Vec3::new(10.0, 0.0, 0.0)]);
        let path = registry.get_mut(id).unwrap();

        let moved = path.apply_carrier_motion(
            &motion(
                Vec3::new(0.0, 5.0, 0.0),
                Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            ),
            1,
        );

        assert!(moved);
        let end = path.end().unwrap();
        // +X rotated a quarter turn about Y lands on -Z
        assert!((end - Vec3::new(0.0, 5.0, -10.0)).length() < 1e-4);
        assert_eq!(path.velocity, Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(path.angular_velocity, Vec3::new(0.0, 0.5, 0.0));
    }

    #[test]
    fn carrier_motion_applies_once_per_sequence() {
        let mut registry = PathRegistry::default();
        let id = registry.add("shared", vec![Vec3::ZERO]);
        let path = registry.get_mut(id).unwrap();
        let step = motion(Vec3::X, Quat::IDENTITY);

        assert!(path.apply_carrier_motion(&step, 7));
        assert!(!path.apply_carrier_motion(&step, 7));
        assert_eq!(path.end(), Some(Vec3::X));

        assert!(path.apply_carrier_motion(&step, 8));
        assert_eq!(path.last_update_sequence(), Some(8));
    }
}
