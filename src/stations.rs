use bevy::prelude::*;

use crate::docking::collaborators::InterpolationMode;
use crate::errors::DockingError;
use crate::paths::{CarrierMotion, PathId, PathRegistry};
use crate::ships::CraftId;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, serde::Serialize, serde::Deserialize)]
pub struct StationId(pub u32);

/// Which docking point an assignment should use.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PointSelection {
    Index(usize),
    FirstAvailable,
}

/// A slot on a station where exactly one craft may attach, in station-local space.
#[derive(Clone, Debug, PartialEq)]
pub struct DockingPoint {
    pub relative_position: Vec3,
    /// Euler angles in degrees, applied Z, X, then Y.
    pub relative_rotation: Vec3,
    hover_height: f32,
    pub entry_path: PathId,
    pub exit_path: PathId,
    docked_craft: Option<CraftId>,
}

impl Default for DockingPoint {
    fn default() -> Self {
        Self {
            relative_position: Vec3::ZERO,
            relative_rotation: Vec3::ZERO,
            hover_height: 10.0,
            entry_path: PathId::NONE,
            exit_path: PathId::NONE,
            docked_craft: None,
        }
    }
}

impl DockingPoint {
    pub fn new(relative_position: Vec3, relative_rotation: Vec3) -> Self {
        Self {
            relative_position,
            relative_rotation,
            ..default()
        }
    }

    pub fn with_hover_height(mut self, hover_height: f32) -> Self {
        self.set_hover_height(hover_height);
        self
    }

    pub fn with_paths(mut self, entry_path: PathId, exit_path: PathId) -> Self {
        self.entry_path = entry_path;
        self.exit_path = exit_path;
        self
    }

    pub fn hover_height(&self) -> f32 {
        self.hover_height
    }

    /// Negative heights are clamped to zero.
    pub fn set_hover_height(&mut self, hover_height: f32) {
        self.hover_height = hover_height.max(0.0);
    }

    /// Craft currently assigned to this point, if any.
    pub fn docked_craft(&self) -> Option<CraftId> {
        self.docked_craft
    }

    pub(crate) fn set_docked_craft(&mut self, craft: Option<CraftId>) {
        self.docked_craft = craft;
    }

    pub fn local_rotation(&self) -> Quat {
        let euler = self.relative_rotation;
        Quat::from_euler(
            EulerRot::YXZ,
            euler.y.to_radians(),
            euler.x.to_radians(),
            euler.z.to_radians(),
        )
    }

    pub fn has_bound_path(&self) -> bool {
        self.entry_path.is_some() || self.exit_path.is_some()
    }
}

/// A station riding on a moving carrier (e.g. a hangar inside a capital ship).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CarrierMount {
    /// Station pose relative to the carrier, captured when mounted.
    local_position: Vec3,
    local_rotation: Quat,
    position: Vec3,
    rotation: Quat,
    last_position: Vec3,
    last_rotation: Quat,
    velocity: Vec3,
    angular_velocity: Vec3,
}

impl CarrierMount {
    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }
}

#[derive(Clone, Debug)]
pub struct DockingStation {
    pub name: String,
    id: StationId,
    position: Vec3,
    rotation: Quat,
    scale: Vec3,
    velocity: Vec3,
    angular_velocity: Vec3,
    interpolation: InterpolationMode,
    points: Vec<DockingPoint>,
    carrier: Option<CarrierMount>,
    is_initialised: bool,
    are_paths_initialised: bool,
}

impl DockingStation {
    pub fn new(name: impl Into<String>, position: Vec3, rotation: Quat) -> Self {
        Self {
            name: name.into(),
            id: StationId(0),
            position,
            rotation,
            scale: Vec3::ONE,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            interpolation: InterpolationMode::None,
            points: Vec::new(),
            carrier: None,
            is_initialised: false,
            are_paths_initialised: false,
        }
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_point(mut self, point: DockingPoint) -> Self {
        self.add_point(point);
        self
    }

    pub fn with_interpolation(mut self, mode: InterpolationMode) -> Self {
        self.interpolation = mode;
        self
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Validate and cache the station geometry. Safe to call repeatedly.
    pub fn initialise(&mut self) -> Result<(), DockingError> {
        if self.is_initialised {
            return Ok(());
        }

        let scale_ok = self.scale.is_finite()
            && self.scale.x.abs() > f32::EPSILON
            && self.scale.y.abs() > f32::EPSILON
            && self.scale.z.abs() > f32::EPSILON;
        if !scale_ok {
            return Err(DockingError::Configuration(format!(
                "station '{}' has degenerate scale {:?}",
                self.name, self.scale
            )));
        }

        self.is_initialised = true;
        info!(
            "Docking station '{}' initialised ({} points)",
            self.name,
            self.points.len()
        );
        Ok(())
    }

    pub fn is_initialised(&self) -> bool {
        self.is_initialised
    }

    /// Registry id; `StationId(0)` until the station is added to a registry.
    pub fn id(&self) -> StationId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: StationId) {
        self.id = id;
    }

    /// Bind entry/exit paths. Paths may be registered later than the station,
    /// so this can be retried until every referenced path exists.
    pub fn initialise_paths(&mut self, paths: &PathRegistry) -> bool {
        let mut missing = Vec::new();
        for (index, point) in self.points.iter().enumerate() {
            for id in [point.entry_path, point.exit_path] {
                if id.is_some() && !paths.contains(id) {
                    missing.push((index, id));
                }
            }
        }

        if missing.is_empty() {
            self.are_paths_initialised = true;
        } else {
            warn!(
                "Docking station '{}': unresolved paths {:?}",
                self.name, missing
            );
            self.are_paths_initialised = false;
        }
        self.are_paths_initialised
    }

    pub fn are_paths_initialised(&self) -> bool {
        self.are_paths_initialised
    }

    // =========================================================================
    // Points
    // =========================================================================

    pub fn points(&self) -> &[DockingPoint] {
        &self.points
    }

    pub fn number_of_points(&self) -> usize {
        self.points.len()
    }

    pub fn docking_point(&self, index: usize) -> Option<&DockingPoint> {
        self.points.get(index)
    }

    pub fn docking_point_mut(&mut self, index: usize) -> Option<&mut DockingPoint> {
        self.points.get_mut(index)
    }

    /// Append a point and return its id. A point with bound paths leaves the
    /// station's paths unresolved until they are bound again.
    pub fn add_point(&mut self, point: DockingPoint) -> usize {
        let mut point = point;
        point.set_docked_craft(None);
        if point.has_bound_path() && self.are_paths_initialised {
            warn!(
                "Docking station '{}': new point carries paths, carrier motion paused until paths are bound",
                self.name
            );
            self.are_paths_initialised = false;
        }
        self.points.push(point);
        self.points.len() - 1
    }

    /// Remove the last point. Refused while a craft is assigned to it, so the
    /// ids of the remaining points never shift under an assignment.
    pub fn remove_last_point(&mut self) -> Result<DockingPoint, DockingError> {
        match self.points.last() {
            None => Err(DockingError::InvalidReference(format!(
                "station '{}' has no docking points",
                self.name
            ))),
            Some(point) => {
                if let Some(craft) = point.docked_craft() {
                    return Err(DockingError::PointOccupied {
                        station: self.id,
                        point: self.points.len() - 1,
                        occupant: craft,
                    });
                }
                self.points.pop().ok_or_else(|| {
                    DockingError::InvalidReference("docking point vanished".to_string())
                })
            }
        }
    }

    /// Replace all points (used by import). Refused while any point is assigned.
    pub fn replace_points(&mut self, points: Vec<DockingPoint>) -> Result<(), DockingError> {
        if let Some((index, craft)) = self
            .points
            .iter()
            .enumerate()
            .find_map(|(index, point)| point.docked_craft().map(|craft| (index, craft)))
        {
            return Err(DockingError::PointOccupied {
                station: self.id,
                point: index,
                occupant: craft,
            });
        }

        self.points = points
            .into_iter()
            .map(|mut point| {
                point.set_docked_craft(None);
                point
            })
            .collect();
        self.are_paths_initialised = false;
        Ok(())
    }

    pub fn is_docking_point_available(&self, index: usize) -> bool {
        self.points
            .get(index)
            .is_some_and(|point| point.docked_craft().is_none())
    }

    pub fn first_available_point(&self) -> Option<usize> {
        self.points
            .iter()
            .position(|point| point.docked_craft().is_none())
    }

    pub fn assigned_craft(&self, index: usize) -> Option<CraftId> {
        self.points.get(index).and_then(DockingPoint::docked_craft)
    }

    /// Linear scan; stations carry tens of points at most.
    pub fn craft_point_index(&self, craft: CraftId) -> Option<usize> {
        self.points
            .iter()
            .position(|point| point.docked_craft() == Some(craft))
    }

    pub(crate) fn set_point_craft(&mut self, index: usize, craft: Option<CraftId>) -> bool {
        match self.points.get_mut(index) {
            Some(point) => {
                point.set_docked_craft(craft);
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // Transform
    // =========================================================================

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn interpolation_mode(&self) -> InterpolationMode {
        self.interpolation
    }

    /// Move a free-standing station. Ignored for stations mounted on a carrier,
    /// whose pose follows the carrier.
    pub fn set_transform(&mut self, position: Vec3, rotation: Quat) {
        if self.carrier.is_some() {
            warn!(
                "Docking station '{}' is mounted on a carrier; move the carrier instead",
                self.name
            );
            return;
        }
        self.position = position;
        self.rotation = rotation;
    }

    pub fn set_velocity(&mut self, velocity: Vec3, angular_velocity: Vec3) {
        match self.carrier.as_mut() {
            Some(carrier) => {
                carrier.velocity = velocity;
                carrier.angular_velocity = angular_velocity;
            }
            None => {
                self.velocity = velocity;
                self.angular_velocity = angular_velocity;
            }
        }
    }

    pub fn velocity(&self) -> Vec3 {
        self.carrier
            .map_or(self.velocity, |carrier| carrier.velocity)
    }

    pub fn angular_velocity(&self) -> Vec3 {
        self.carrier
            .map_or(self.angular_velocity, |carrier| carrier.angular_velocity)
    }

    /// Velocity of a world-space point rigidly attached to the station.
    pub fn velocity_at(&self, world_point: Vec3) -> Vec3 {
        let pivot = self
            .carrier
            .map_or(self.position, |carrier| carrier.position);
        self.velocity() + self.angular_velocity().cross(world_point - pivot)
    }

    // =========================================================================
    // Carrier
    // =========================================================================

    /// Mount the station on a carrier at its current world pose.
    pub fn mount_on_carrier(&mut self, carrier_position: Vec3, carrier_rotation: Quat) {
        let inverse = carrier_rotation.inverse();
        self.carrier = Some(CarrierMount {
            local_position: inverse * (self.position - carrier_position),
            local_rotation: (inverse * self.rotation).normalize(),
            position: carrier_position,
            rotation: carrier_rotation,
            last_position: carrier_position,
            last_rotation: carrier_rotation,
            velocity: self.velocity,
            angular_velocity: self.angular_velocity,
        });
    }

    pub fn dismount_from_carrier(&mut self) {
        if let Some(carrier) = self.carrier.take() {
            self.velocity = carrier.velocity;
            self.angular_velocity = carrier.angular_velocity;
        }
    }

    pub fn carrier(&self) -> Option<&CarrierMount> {
        self.carrier.as_ref()
    }

    /// Update the carrier pose; the station pose follows immediately.
    pub fn set_carrier_transform(
        &mut self,
        position: Vec3,
        rotation: Quat,
        velocity: Vec3,
        angular_velocity: Vec3,
    ) {
        let Some(carrier) = self.carrier.as_mut() else {
            warn!(
                "Docking station '{}' is not mounted on a carrier",
                self.name
            );
            return;
        };

        carrier.position = position;
        carrier.rotation = rotation;
        carrier.velocity = velocity;
        carrier.angular_velocity = angular_velocity;
        self.position = position + rotation * carrier.local_position;
        self.rotation = (rotation * carrier.local_rotation).normalize();
    }

    /// Carrier motion since the previous call, or `None` if the carrier did
    /// not move (or there is no carrier). Consumes the motion.
    pub fn take_carrier_motion(&mut self) -> Option<CarrierMotion> {
        let carrier = self.carrier.as_mut()?;
        let motion = CarrierMotion {
            previous_position: carrier.last_position,
            previous_rotation: carrier.last_rotation,
            position: carrier.position,
            rotation: carrier.rotation,
            velocity: carrier.velocity,
            angular_velocity: carrier.angular_velocity,
        };
        carrier.last_position = carrier.position;
        carrier.last_rotation = carrier.rotation;

        if motion.is_stationary() {
            None
        } else {
            Some(motion)
        }
    }

    // =========================================================================
    // World-space point queries
    // =========================================================================

    pub fn point_world_position(&self, index: usize) -> Option<Vec3> {
        let point = self.points.get(index)?;
        Some(self.position + self.rotation * (point.relative_position * self.scale))
    }

    pub fn point_world_rotation(&self, index: usize) -> Option<Quat> {
        let point = self.points.get(index)?;
        Some((self.rotation * point.local_rotation()).normalize())
    }

    pub fn point_world_up(&self, index: usize) -> Option<Vec3> {
        self.point_world_rotation(index).map(|rotation| rotation * Vec3::Y)
    }

    /// Point position raised by its hover height along the point's up.
    pub fn point_hover_position(&self, index: usize) -> Option<Vec3> {
        let position = self.point_world_position(index)?;
        let up = self.point_world_up(index)?;
        let hover_height = self.points.get(index)?.hover_height();
        Some(position + up * hover_height)
    }

    /// Craft pose relative to the station frame (unscaled).
    pub fn to_local(&self, position: Vec3, rotation: Quat) -> (Vec3, Quat) {
        let inverse = self.rotation.inverse();
        (
            inverse * (position - self.position),
            (inverse * rotation).normalize(),
        )
    }

    pub fn to_world(&self, local_position: Vec3, local_rotation: Quat) -> (Vec3, Quat) {
        (
            self.position + self.rotation * local_position,
            (self.rotation * local_rotation).normalize(),
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
