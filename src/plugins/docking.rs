//! Runs the docking registry inside a Bevy app.

use bevy::prelude::*;

use crate::docking::{DockingEventSink, DockingManager, DockingNotification};
use crate::plugins::core::{sim_not_paused, CorePlugin};

pub struct DockingPlugin;

impl Plugin for DockingPlugin {
    fn build(&self, app: &mut App) {
        if !app.is_plugin_added::<CorePlugin>() {
            app.add_plugins(CorePlugin);
        }

        app.init_resource::<DockingManager>()
            .init_resource::<DockingNotifications>()
            .add_systems(
                FixedUpdate,
                (docking_step, log_docking_notifications)
                    .chain()
                    .run_if(sim_not_paused),
            );
    }
}

// =============================================================================
// Resources
// =============================================================================

/// Recent docking notifications, newest last.
#[derive(Resource, Debug)]
pub struct DockingNotifications {
    entries: Vec<DockingNotification>,
    max_entries: usize,
    unlogged: usize,
}

impl Default for DockingNotifications {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            max_entries: 64,
            unlogged: 0,
        }
    }
}

impl DockingNotifications {
    pub fn push(&mut self, notification: DockingNotification) {
        self.entries.push(notification);
        self.unlogged += 1;
        if self.entries.len() > self.max_entries {
            let overflow = self.entries.len() - self.max_entries;
            self.entries.drain(0..overflow);
        }
        self.unlogged = self.unlogged.min(self.entries.len());
    }

    pub fn entries(&self) -> &[DockingNotification] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.unlogged = 0;
    }

    fn take_unlogged(&mut self) -> &[DockingNotification] {
        let start = self.entries.len() - self.unlogged;
        self.unlogged = 0;
        &self.entries[start..]
    }
}

impl DockingEventSink for DockingNotifications {
    fn on_docking_event(&mut self, notification: &DockingNotification) {
        self.push(notification.clone());
    }
}

// =============================================================================
// Systems
// =============================================================================

fn docking_step(
    time: Res<Time>,
    mut manager: ResMut<DockingManager>,
    mut notifications: ResMut<DockingNotifications>,
) {
    manager.step(time.delta_secs(), &mut *notifications);
}

fn log_docking_notifications(mut notifications: ResMut<DockingNotifications>) {
    for notification in notifications.take_unlogged() {
        info!(
            "Docking: {} (station {:?}, craft {:?}, point {})",
            notification.event.label(),
            notification.station_id,
            notification.craft_id,
            notification.point_number
        );
    }
}
