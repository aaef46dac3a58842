use bevy::prelude::*;

use crate::docking::collaborators::{MovementController, PathFollower};
use crate::docking::{DockingController, DockingSettings};
use crate::errors::DockingError;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, serde::Serialize, serde::Deserialize)]
pub struct CraftId(pub u32);

/// Where a craft physically meets a docking point, in craft-local space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DockingAdapter {
    relative_position: Vec3,
    relative_direction: Vec3,
}

impl Default for DockingAdapter {
    fn default() -> Self {
        Self {
            relative_position: Vec3::ZERO,
            relative_direction: Vec3::NEG_Y,
        }
    }
}

impl DockingAdapter {
    pub fn new(relative_position: Vec3, relative_direction: Vec3) -> Result<Self, DockingError> {
        let mut adapter = Self {
            relative_position,
            ..default()
        };
        adapter.set_relative_direction(relative_direction)?;
        Ok(adapter)
    }

    pub fn relative_position(&self) -> Vec3 {
        self.relative_position
    }

    /// Unit facing direction of the adapter.
    pub fn relative_direction(&self) -> Vec3 {
        self.relative_direction
    }

    pub fn set_relative_position(&mut self, position: Vec3) {
        self.relative_position = position;
    }

    /// Set the facing direction. Zero or non-finite directions are rejected.
    pub fn set_relative_direction(&mut self, direction: Vec3) -> Result<(), DockingError> {
        match direction.try_normalize() {
            Some(unit) => {
                self.relative_direction = unit;
                Ok(())
            }
            None => Err(DockingError::Configuration(format!(
                "adapter direction {:?} has no length",
                direction
            ))),
        }
    }
}

/// A craft as held by the docking registry: its adapter, its docking state
/// machine and the external modules the state machine drives.
pub struct Craft {
    pub name: String,
    pub adapter: DockingAdapter,
    pub controller: DockingController,
    movement: Box<dyn MovementController>,
    autopilot: Option<Box<dyn PathFollower>>,
    /// Set when the craft is meant to fly itself; a missing autopilot is then
    /// a configuration error at initialise time.
    requires_autopilot: bool,
}

impl std::fmt::Debug for Craft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Craft")
            .field("name", &self.name)
            .field("adapter", &self.adapter)
            .field("controller", &self.controller)
            .field("autonomous", &self.is_autonomous())
            .finish()
    }
}

impl Craft {
    /// A manually flown craft.
    pub fn new(name: impl Into<String>, movement: Box<dyn MovementController>) -> Self {
        Self {
            name: name.into(),
            adapter: DockingAdapter::default(),
            controller: DockingController::new(DockingSettings::default()),
            movement,
            autopilot: None,
            requires_autopilot: false,
        }
    }

    /// Hand the craft to an autopilot; docking maneuvers are then flown by it.
    pub fn with_autopilot(mut self, autopilot: Box<dyn PathFollower>) -> Self {
        self.autopilot = Some(autopilot);
        self.requires_autopilot = true;
        self
    }

    /// Mark the craft as autonomous without attaching an autopilot yet.
    pub fn autonomous(mut self) -> Self {
        self.requires_autopilot = true;
        self
    }

    pub fn with_adapter(mut self, adapter: DockingAdapter) -> Self {
        self.adapter = adapter;
        self
    }

    pub fn with_settings(mut self, settings: DockingSettings) -> Self {
        self.controller = DockingController::new(settings);
        self
    }

    pub fn is_autonomous(&self) -> bool {
        self.autopilot.is_some()
    }

    pub fn requires_autopilot(&self) -> bool {
        self.requires_autopilot
    }

    pub fn movement(&self) -> &dyn MovementController {
        self.movement.as_ref()
    }

    pub fn movement_mut(&mut self) -> &mut dyn MovementController {
        self.movement.as_mut()
    }

    pub fn autopilot(&self) -> Option<&dyn PathFollower> {
        self.autopilot.as_deref()
    }

    pub fn autopilot_mut(&mut self) -> Option<&mut (dyn PathFollower + 'static)> {
        self.autopilot.as_deref_mut()
    }

    /// Split the craft into its state machine and the borrowed pieces the
    /// state machine operates on.
    pub(crate) fn split(&mut self) -> (&mut DockingController, CraftLink<'_>) {
        let Craft {
            adapter,
            controller,
            movement,
            autopilot,
            ..
        } = self;
        (
            controller,
            CraftLink {
                adapter: *adapter,
                movement: &mut **movement,
                autopilot: autopilot.as_deref_mut(),
            },
        )
    }
}

/// Borrowed view of a craft's collaborators, handed to the controller.
pub struct CraftLink<'a> {
    pub adapter: DockingAdapter,
    pub movement: &'a mut dyn MovementController,
    pub autopilot: Option<&'a mut (dyn PathFollower + 'static)>,
}

impl CraftLink<'_> {
    pub fn is_autonomous(&self) -> bool {
        self.autopilot.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeMovement;

    #[test]
    fn adapter_defaults_to_facing_down() {
        let adapter = DockingAdapter::default();
        assert_eq!(adapter.relative_direction(), Vec3::NEG_Y);
        assert_eq!(adapter.relative_position(), Vec3::ZERO);
    }

    #[test]
    fn adapter_direction_is_normalised() {
        let adapter = DockingAdapter::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 4.0)).unwrap();
        assert!((adapter.relative_direction() - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn adapter_rejects_zero_direction() {
        let mut adapter = DockingAdapter::default();
        let result = adapter.set_relative_direction(Vec3::ZERO);
        assert!(matches!(result, Err(DockingError::Configuration(_))));
        assert_eq!(adapter.relative_direction(), Vec3::NEG_Y);
    }

    #[test]
    fn craft_is_manual_until_given_an_autopilot() {
        let craft = Craft::new("Hauler", Box::new(FakeMovement::default()));
        assert!(!craft.is_autonomous());
        assert!(!craft.requires_autopilot());

        let craft = craft.autonomous();
        assert!(!craft.is_autonomous());
        assert!(craft.requires_autopilot());
    }
}
