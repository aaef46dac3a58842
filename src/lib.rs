//! Docking coordination for crafts and stations.
//!
//! [`docking::DockingManager`] owns every station, craft and path. Callers
//! register them, assign crafts to docking points, request state changes and
//! call [`docking::DockingManager::step`] once per fixed step after movement.
//! [`plugins::DockingPlugin`] does the stepping inside a Bevy app.

pub mod docking;
pub mod errors;
pub mod paths;
pub mod plugins;
pub mod ships;
pub mod stations;

#[cfg(test)]
mod testing;

pub use docking::{DockingManager, DockingSettings, DockingState};
pub use errors::DockingError;
pub use ships::{Craft, CraftId, DockingAdapter};
pub use stations::{DockingPoint, DockingStation, PointSelection, StationId};
