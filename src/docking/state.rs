//! Docking states, maneuver sub-phases, axis-snap policy and per-craft settings.

use crate::errors::DockingError;

use super::notifications::NotificationDelays;

#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum DockingState {
    #[default]
    NotDocked,
    Docking,
    Undocking,
    Docked,
}

impl DockingState {
    /// Docking or undocking is under way.
    pub fn is_maneuvering(self) -> bool {
        matches!(self, DockingState::Docking | DockingState::Undocking)
    }
}

/// Sub-phase of an autonomous maneuver.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum ManeuverPhase {
    /// No autopilot target (manual craft, or not maneuvering)
    #[default]
    Idle,
    /// Flying the entry path or straight to the hover point
    Approach,
    /// Descending from the hover point onto the docking point
    Landing,
    /// Rising from the docking point to the hover point
    Liftoff,
    /// Flying the exit path
    Exit,
}

/// Which axes are forced onto the docking target when a craft docks.
#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum AxisSnap {
    #[default]
    All,
    XY,
    XZ,
    YZ,
    X,
    Y,
    Z,
    None,
}

impl AxisSnap {
    /// Per-axis flags: true where the residual offset is zeroed.
    pub fn snapped_axes(self) -> [bool; 3] {
        match self {
            AxisSnap::All => [true, true, true],
            AxisSnap::XY => [true, true, false],
            AxisSnap::XZ => [true, false, true],
            AxisSnap::YZ => [false, true, true],
            AxisSnap::X => [true, false, false],
            AxisSnap::Y => [false, true, false],
            AxisSnap::Z => [false, false, true],
            AxisSnap::None => [false, false, false],
        }
    }
}

/// Tuning for one craft's docking behaviour.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DockingSettings {
    pub axis_snap_position: AxisSnap,
    pub axis_snap_rotation: AxisSnap,
    /// Distance (world units) at which landing counts as complete.
    pub landing_distance_precision: f32,
    /// Angle (degrees) at which landing counts as complete.
    pub landing_angle_precision: f32,
    pub hover_distance_precision: f32,
    pub hover_angle_precision: f32,
    /// Steering radius handed to the autopilot with each target.
    pub target_radius: f32,
    /// Longest the autopilot may take to reach the hover point, 0 = unlimited.
    pub hover_max_duration: f32,
    /// Longest the autopilot may take to land, 0 = unlimited.
    pub landing_max_duration: f32,
    /// Speed along the docking point's up axis when leaving the point.
    pub undock_vertical_velocity: f32,
    /// Speed along the craft's forward axis when leaving the point.
    pub undock_forward_velocity: f32,
    /// Forward speed added once undocking completes.
    pub catapult_velocity: f32,
    /// Seconds between an undock request and the craft leaving the point.
    pub undock_delay: f32,
    /// Seconds docked before the craft undocks on its own, 0 = never.
    pub auto_undock_time: f32,
    pub delays: NotificationDelays,
}

impl Default for DockingSettings {
    fn default() -> Self {
        Self {
            axis_snap_position: AxisSnap::All,
            axis_snap_rotation: AxisSnap::All,
            landing_distance_precision: 0.01,
            landing_angle_precision: 2.0,
            hover_distance_precision: 1.0,
            hover_angle_precision: 10.0,
            target_radius: 0.0,
            hover_max_duration: 0.0,
            landing_max_duration: 0.0,
            undock_vertical_velocity: 0.0,
            undock_forward_velocity: 0.0,
            catapult_velocity: 0.0,
            undock_delay: 0.0,
            auto_undock_time: 0.0,
            delays: NotificationDelays::default(),
        }
    }
}

impl DockingSettings {
    pub fn from_ron(contents: &str) -> Result<Self, DockingError> {
        let settings: DockingSettings = ron::de::from_str(contents)
            .map_err(|error| DockingError::Configuration(format!("RON parse error: {}", error)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), DockingError> {
        let non_negative = [
            ("landing_distance_precision", self.landing_distance_precision),
            ("landing_angle_precision", self.landing_angle_precision),
            ("hover_distance_precision", self.hover_distance_precision),
            ("hover_angle_precision", self.hover_angle_precision),
            ("target_radius", self.target_radius),
            ("hover_max_duration", self.hover_max_duration),
            ("landing_max_duration", self.landing_max_duration),
            ("catapult_velocity", self.catapult_velocity),
            ("undock_delay", self.undock_delay),
            ("auto_undock_time", self.auto_undock_time),
        ];

        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(DockingError::Configuration(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        if !self.undock_vertical_velocity.is_finite() || !self.undock_forward_velocity.is_finite()
        {
            return Err(DockingError::Configuration(
                "undock velocities must be finite".to_string(),
            ));
        }

        self.delays.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_not_docked() {
        assert_eq!(DockingState::default(), DockingState::NotDocked);
        assert!(!DockingState::Docked.is_maneuvering());
        assert!(DockingState::Undocking.is_maneuvering());
    }

    #[test]
    fn axis_snap_flags() {
        assert_eq!(AxisSnap::All.snapped_axes(), [true, true, true]);
        assert_eq!(AxisSnap::None.snapped_axes(), [false, false, false]);
        assert_eq!(AxisSnap::XZ.snapped_axes(), [true, false, true]);
        assert_eq!(AxisSnap::Y.snapped_axes(), [false, true, false]);
    }

    #[test]
    fn default_settings_are_valid() {
        assert!(DockingSettings::default().validate().is_ok());
    }

    #[test]
    fn negative_precision_is_rejected() {
        let settings = DockingSettings {
            landing_distance_precision: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(DockingError::Configuration(_))
        ));
    }

    #[test]
    fn settings_load_from_partial_ron() {
        let settings = DockingSettings::from_ron(
            "(axis_snap_position: XZ, auto_undock_time: 5.0, delays: (docked: 1.5))",
        )
        .unwrap();
        assert_eq!(settings.axis_snap_position, AxisSnap::XZ);
        assert_eq!(settings.axis_snap_rotation, AxisSnap::All);
        assert_eq!(settings.auto_undock_time, 5.0);
        assert_eq!(settings.delays.docked, 1.5);
        assert_eq!(settings.delays.undocked, 0.0);
    }

    #[test]
    fn malformed_ron_is_a_configuration_error() {
        let result = DockingSettings::from_ron("(axis_snap_position: Sideways)");
        assert!(matches!(result, Err(DockingError::Configuration(_))));
    }
}
