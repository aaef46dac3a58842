//! Bevy integration: fixed-step timing and the docking step system.

pub mod core;
pub mod docking;

pub use self::core::{CorePlugin, SimConfig};
pub use self::docking::{DockingNotifications, DockingPlugin};
