//! Docking coordination: the per-craft state machine, the registry that ties
//! crafts to station docking points, and the geometry both rely on.

pub mod collaborators;
pub mod controller;
pub mod geometry;
pub mod manager;
pub mod notifications;
pub mod persistence;
pub mod state;

// Re-export public items
pub use collaborators::{
    InterpolationMode, ManeuverTarget, MovementController, PathFollower, PathFollowerState,
};
pub use controller::{DockingController, StationRequest};
pub use geometry::{apply_axis_snap, docking_pose, hover_pose, ship_relative_rotation, DockingPose};
pub use manager::DockingManager;
pub use notifications::{
    DockingEvent, DockingEventSink, DockingNotification, NotificationDelays, NotificationScheduler,
};
pub use persistence::{export_docking_points, import_docking_points};
pub use state::{AxisSnap, DockingSettings, DockingState, ManeuverPhase};
