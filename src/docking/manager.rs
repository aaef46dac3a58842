//! Registry of docking stations, crafts and paths.
//!
//! Stations and crafts live in slot arenas indexed by id (id 0 is never
//! handed out). Cross-links between them are ids only; the occupancy of a
//! docking point and the assignment held by a craft's controller are written
//! together here and nowhere else.

use bevy::prelude::*;
use std::path::Path;

use crate::errors::DockingError;
use crate::paths::{PathId, PathRegistry};
use crate::ships::{Craft, CraftId};
use crate::stations::{DockingPoint, DockingStation, PointSelection, StationId};

use super::controller::{DockingController, StationRequest};
use super::notifications::DockingEventSink;
use super::persistence;
use super::state::DockingState;

#[derive(Resource, Debug, Default)]
pub struct DockingManager {
    stations: Vec<Option<DockingStation>>,
    crafts: Vec<Option<Craft>>,
    paths: PathRegistry,
    sequence: u64,
}

fn slot_index(id: u32) -> Option<usize> {
    (id as usize).checked_sub(1)
}

fn slot<T>(slots: &[Option<T>], id: u32) -> Option<&T> {
    slots.get(slot_index(id)?)?.as_ref()
}

fn slot_mut<T>(slots: &mut [Option<T>], id: u32) -> Option<&mut T> {
    slots.get_mut(slot_index(id)?)?.as_mut()
}

fn missing_station(id: StationId) -> DockingError {
    DockingError::InvalidReference(format!("unknown docking station {:?}", id))
}

fn missing_craft(id: CraftId) -> DockingError {
    DockingError::InvalidReference(format!("unknown craft {:?}", id))
}

impl DockingManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed docking steps.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    // =========================================================================
    // Stations
    // =========================================================================

    pub fn add_station(&mut self, mut station: DockingStation) -> StationId {
        let id = StationId(self.stations.len() as u32 + 1);
        station.set_id(id);
        // A station arriving from elsewhere carries no occupancy into this registry
        for index in 0..station.number_of_points() {
            station.set_point_craft(index, None);
        }
        self.stations.push(Some(station));
        id
    }

    /// Remove a station, releasing every craft assigned to it.
    pub fn remove_station(&mut self, id: StationId) -> Option<DockingStation> {
        let index = slot_index(id.0)?;
        let mut station = self.stations.get_mut(index)?.take()?;

        for point in 0..station.number_of_points() {
            let Some(craft_id) = station.assigned_craft(point) else {
                continue;
            };
            station.set_point_craft(point, None);
            if let Some(craft) = slot_mut(&mut self.crafts, craft_id.0) {
                let (controller, mut link) = craft.split();
                controller.release(&mut link);
            }
        }

        info!("Docking station '{}' removed", station.name);
        station.set_id(StationId(0));
        Some(station)
    }

    pub fn station(&self, id: StationId) -> Option<&DockingStation> {
        slot(&self.stations, id.0)
    }

    pub fn station_mut(&mut self, id: StationId) -> Option<&mut DockingStation> {
        slot_mut(&mut self.stations, id.0)
    }

    pub fn stations(&self) -> impl Iterator<Item = &DockingStation> {
        self.stations.iter().flatten()
    }

    /// Initialise the station and try to bind its paths. Path binding may
    /// still be incomplete afterwards; see [`Self::bind_station_paths`].
    pub fn initialise_station(&mut self, id: StationId) -> Result<(), DockingError> {
        let station = slot_mut(&mut self.stations, id.0).ok_or_else(|| missing_station(id))?;
        station.initialise()?;
        station.initialise_paths(&self.paths);
        Ok(())
    }

    pub fn bind_station_paths(&mut self, id: StationId) -> Result<bool, DockingError> {
        let station = slot_mut(&mut self.stations, id.0).ok_or_else(|| missing_station(id))?;
        Ok(station.initialise_paths(&self.paths))
    }

    // =========================================================================
    // Crafts
    // =========================================================================

    pub fn add_craft(&mut self, mut craft: Craft) -> CraftId {
        let id = CraftId(self.crafts.len() as u32 + 1);
        craft.controller.bind_craft(id);
        self.crafts.push(Some(craft));
        id
    }

    /// Remove a craft; its docking point, if any, becomes free. Pending
    /// notifications of the craft are dropped with it.
    pub fn remove_craft(&mut self, id: CraftId) -> Option<Craft> {
        let index = slot_index(id.0)?;
        let mut craft = self.crafts.get_mut(index)?.take()?;

        if let Some(station_id) = craft.controller.station() {
            if let Some(station) = slot_mut(&mut self.stations, station_id.0) {
                if let Some(point) = station.craft_point_index(id) {
                    station.set_point_craft(point, None);
                }
            }
        }
        let (controller, mut link) = craft.split();
        controller.release(&mut link);

        info!("Craft '{}' removed from docking registry", craft.name);
        Some(craft)
    }

    pub fn craft(&self, id: CraftId) -> Option<&Craft> {
        slot(&self.crafts, id.0)
    }

    pub fn craft_mut(&mut self, id: CraftId) -> Option<&mut Craft> {
        slot_mut(&mut self.crafts, id.0)
    }

    pub fn controller(&self, id: CraftId) -> Option<&DockingController> {
        self.craft(id).map(|craft| &craft.controller)
    }

    pub fn craft_state(&self, id: CraftId) -> Option<DockingState> {
        self.controller(id).map(DockingController::state)
    }

    pub fn initialise_craft(&mut self, id: CraftId) -> Result<(), DockingError> {
        let craft = slot_mut(&mut self.crafts, id.0).ok_or_else(|| missing_craft(id))?;
        let requires_autopilot = craft.requires_autopilot();
        let (controller, link) = craft.split();
        controller.initialise(requires_autopilot, &link)
    }

    // =========================================================================
    // Paths
    // =========================================================================

    pub fn paths(&self) -> &PathRegistry {
        &self.paths
    }

    pub fn paths_mut(&mut self) -> &mut PathRegistry {
        &mut self.paths
    }

    pub fn add_path(&mut self, name: impl Into<String>, waypoints: Vec<Vec3>) -> PathId {
        self.paths.add(name, waypoints)
    }

    // =========================================================================
    // Assignment
    // =========================================================================

    /// Assign a craft to a docking point and return the point id.
    ///
    /// Re-assigning a craft to the point it already holds succeeds without
    /// changes. A craft assigned elsewhere is moved unless it is docked there.
    pub fn assign_craft_to_point(
        &mut self,
        station_id: StationId,
        craft_id: CraftId,
        selection: PointSelection,
    ) -> Result<usize, DockingError> {
        let station = self
            .station(station_id)
            .ok_or_else(|| missing_station(station_id))?;
        if !station.is_initialised() {
            warn!(
                "Cannot assign craft {:?}: docking station '{}' is not initialised",
                craft_id, station.name
            );
            return Err(DockingError::NotInitialised(format!(
                "docking station '{}'",
                station.name
            )));
        }
        let controller = self.controller(craft_id).ok_or_else(|| missing_craft(craft_id))?;

        let current_point = station.craft_point_index(craft_id);
        let point = match selection {
            PointSelection::Index(index) => {
                if station.docking_point(index).is_none() {
                    return Err(DockingError::InvalidReference(format!(
                        "station '{}' has no docking point {}",
                        station.name, index
                    )));
                }
                index
            }
            PointSelection::FirstAvailable => match current_point {
                Some(index) => index,
                None => station.first_available_point().ok_or_else(|| {
                    DockingError::InvalidReference(format!(
                        "station '{}' has no free docking point",
                        station.name
                    ))
                })?,
            },
        };

        if current_point == Some(point) {
            return Ok(point);
        }
        if let Some(occupant) = station.assigned_craft(point) {
            return Err(DockingError::PointOccupied {
                station: station_id,
                point,
                occupant,
            });
        }
        if controller.state() != DockingState::NotDocked {
            warn!(
                "Craft {:?} is {:?} and cannot be reassigned",
                craft_id,
                controller.state()
            );
            return Err(DockingError::CraftDocked(craft_id));
        }

        self.initialise_craft(craft_id)?;
        self.release_assignment(craft_id);

        if let Some(station) = slot_mut(&mut self.stations, station_id.0) {
            station.set_point_craft(point, Some(craft_id));
            info!(
                "Craft {:?} assigned to '{}' point {}",
                craft_id,
                station.name,
                point + 1
            );
        }
        if let Some(craft) = slot_mut(&mut self.crafts, craft_id.0) {
            craft.controller.assign(station_id, point);
        }
        Ok(point)
    }

    /// Free a docking point. Refused while its craft is docked.
    pub fn unassign_point(
        &mut self,
        station_id: StationId,
        point: usize,
    ) -> Result<Option<CraftId>, DockingError> {
        let station = self
            .station(station_id)
            .ok_or_else(|| missing_station(station_id))?;
        if station.docking_point(point).is_none() {
            return Err(DockingError::InvalidReference(format!(
                "station '{}' has no docking point {}",
                station.name, point
            )));
        }
        let Some(craft_id) = station.assigned_craft(point) else {
            return Ok(None);
        };

        if self.craft_state(craft_id) == Some(DockingState::Docked) {
            warn!(
                "Cannot unassign '{}' point {}: craft {:?} is docked",
                station.name,
                point + 1,
                craft_id
            );
            return Err(DockingError::CraftDocked(craft_id));
        }

        self.release_assignment(craft_id);
        Ok(Some(craft_id))
    }

    /// Drop whatever assignment the craft holds, on both sides.
    fn release_assignment(&mut self, craft_id: CraftId) {
        let Some(craft) = slot_mut(&mut self.crafts, craft_id.0) else {
            return;
        };
        let (Some(station_id), Some(point)) =
            (craft.controller.station(), craft.controller.assigned_point())
        else {
            return;
        };

        let (controller, mut link) = craft.split();
        controller.release(&mut link);

        if let Some(station) = slot_mut(&mut self.stations, station_id.0) {
            if station.assigned_craft(point) == Some(craft_id) {
                station.set_point_craft(point, None);
            }
        }
    }

    // =========================================================================
    // State changes
    // =========================================================================

    pub fn set_state(
        &mut self,
        craft_id: CraftId,
        state: DockingState,
        sink: &mut dyn DockingEventSink,
    ) -> Result<(), DockingError> {
        let craft = slot_mut(&mut self.crafts, craft_id.0).ok_or_else(|| missing_craft(craft_id))?;
        let station = craft
            .controller
            .station()
            .and_then(|id| slot(&self.stations, id.0));
        let (controller, mut link) = craft.split();
        controller.set_state(state, &mut link, station, &self.paths, sink)
    }

    /// Dock the craft assigned to `point`: autonomous crafts start the
    /// maneuver, manual crafts dock on the spot.
    pub fn dock_craft(
        &mut self,
        station_id: StationId,
        point: usize,
        sink: &mut dyn DockingEventSink,
    ) -> Result<(), DockingError> {
        let craft_id = self.point_craft(station_id, point)?;
        let autonomous = self.craft(craft_id).is_some_and(Craft::is_autonomous);

        self.set_state(craft_id, DockingState::Docking, sink)?;
        if !autonomous {
            self.set_state(craft_id, DockingState::Docked, sink)?;
        }
        Ok(())
    }

    /// Undock the craft assigned to `point`. Honours the craft's undock delay;
    /// a craft still docking turns around. Otherwise a no-op.
    pub fn undock_craft(
        &mut self,
        station_id: StationId,
        point: usize,
        sink: &mut dyn DockingEventSink,
    ) -> Result<(), DockingError> {
        let craft_id = self.point_craft(station_id, point)?;
        let craft = slot_mut(&mut self.crafts, craft_id.0).ok_or_else(|| missing_craft(craft_id))?;
        let autonomous = craft.is_autonomous();

        match craft.controller.state() {
            DockingState::Docked => {
                let delay = craft.controller.settings().undock_delay;
                if delay > 0.0 {
                    info!("Craft {:?}: undocking in {:.1}s", craft_id, delay);
                    craft.controller.schedule_undock(delay);
                    return Ok(());
                }
                self.set_state(craft_id, DockingState::Undocking, sink)?;
                if !autonomous {
                    self.set_state(craft_id, DockingState::NotDocked, sink)?;
                }
                Ok(())
            }
            DockingState::Docking => self.set_state(craft_id, DockingState::Undocking, sink),
            _ => Ok(()),
        }
    }

    /// Report that the craft's autopilot reached its current target. Takes
    /// effect on the next step, at most once per step.
    pub fn notify_maneuver_completed(&mut self, craft_id: CraftId) -> Result<(), DockingError> {
        let craft = slot_mut(&mut self.crafts, craft_id.0).ok_or_else(|| missing_craft(craft_id))?;
        if craft.controller.state().is_maneuvering() {
            craft.controller.mark_completed();
        }
        Ok(())
    }

    fn point_craft(&self, station_id: StationId, point: usize) -> Result<CraftId, DockingError> {
        let station = self
            .station(station_id)
            .ok_or_else(|| missing_station(station_id))?;
        if station.docking_point(point).is_none() {
            return Err(DockingError::InvalidReference(format!(
                "station '{}' has no docking point {}",
                station.name, point
            )));
        }
        station.assigned_craft(point).ok_or_else(|| {
            DockingError::InvalidReference(format!(
                "station '{}' point {} has no craft assigned",
                station.name,
                point + 1
            ))
        })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn docking_point(&self, station_id: StationId, point: usize) -> Option<&DockingPoint> {
        self.station(station_id)?.docking_point(point)
    }

    pub fn assigned_craft(&self, station_id: StationId, point: usize) -> Option<CraftId> {
        self.station(station_id)?.assigned_craft(point)
    }

    /// The craft at `point`, only while it is fully docked.
    pub fn docked_craft(&self, station_id: StationId, point: usize) -> Option<CraftId> {
        let craft_id = self.assigned_craft(station_id, point)?;
        (self.craft_state(craft_id)? == DockingState::Docked).then_some(craft_id)
    }

    pub fn is_docking_point_available(&self, station_id: StationId, point: usize) -> bool {
        self.station(station_id)
            .is_some_and(|station| station.is_docking_point_available(point))
    }

    pub fn craft_point_index(&self, station_id: StationId, craft_id: CraftId) -> Option<usize> {
        self.station(station_id)?.craft_point_index(craft_id)
    }

    /// Every broken link between point occupancy and craft assignment.
    /// Empty when the registry is consistent.
    pub fn check_consistency(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for station in self.stations() {
            for (point, docking_point) in station.points().iter().enumerate() {
                let Some(craft_id) = docking_point.docked_craft() else {
                    continue;
                };
                match self.controller(craft_id) {
                    None => problems.push(format!(
                        "'{}' point {} holds unknown craft {:?}",
                        station.name, point, craft_id
                    )),
                    Some(controller) => {
                        if controller.station() != Some(station.id())
                            || controller.assigned_point() != Some(point)
                        {
                            problems.push(format!(
                                "'{}' point {} holds craft {:?} assigned to {:?}/{:?}",
                                station.name,
                                point,
                                craft_id,
                                controller.station(),
                                controller.assigned_point()
                            ));
                        }
                    }
                }
            }
        }

        for craft in self.crafts.iter().flatten() {
            let controller = &craft.controller;
            let Some(craft_id) = controller.craft() else {
                continue;
            };
            match (controller.station(), controller.assigned_point()) {
                (Some(station_id), Some(point)) => {
                    if self.assigned_craft(station_id, point) != Some(craft_id) {
                        problems.push(format!(
                            "craft {:?} assigned to {:?} point {} which does not hold it",
                            craft_id, station_id, point
                        ));
                    }
                }
                (None, None) => {
                    if controller.state() != DockingState::NotDocked {
                        problems.push(format!(
                            "craft {:?} is {:?} without an assignment",
                            craft_id,
                            controller.state()
                        ));
                    }
                }
                (station_id, point) => problems.push(format!(
                    "craft {:?} has a partial assignment {:?}/{:?}",
                    craft_id, station_id, point
                )),
            }
        }

        problems
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    pub fn export_station_points(
        &self,
        station_id: StationId,
        path: &Path,
    ) -> Result<(), DockingError> {
        let station = self
            .station(station_id)
            .ok_or_else(|| missing_station(station_id))?;
        persistence::export_docking_points(station.points(), path)
    }

    /// Replace a station's points with the ones stored at `path`. Refused
    /// while any point of the station is assigned.
    pub fn import_station_points(
        &mut self,
        station_id: StationId,
        path: &Path,
    ) -> Result<usize, DockingError> {
        let points = persistence::import_docking_points(path)?;
        let count = points.len();
        let station = slot_mut(&mut self.stations, station_id.0)
            .ok_or_else(|| missing_station(station_id))?;
        station.replace_points(points)?;
        if station.is_initialised() {
            station.initialise_paths(&self.paths);
        }
        info!(
            "Docking station '{}': imported {} points from {}",
            station.name,
            count,
            path.display()
        );
        Ok(count)
    }

    // =========================================================================
    // Step
    // =========================================================================

    /// Docking-logic phase of one simulation step. The caller runs the
    /// movement phase (physics, carrier motion) before this.
    pub fn step(&mut self, delta_seconds: f32, sink: &mut dyn DockingEventSink) {
        self.sequence += 1;
        let sequence = self.sequence;

        for station in self.stations.iter_mut().flatten() {
            propagate_carrier_motion(station, &mut self.paths, sequence);
        }

        let stations = &self.stations;
        let station_alive = |id: StationId| slot(stations, id.0).is_some();

        let mut requests = Vec::new();
        for craft in self.crafts.iter_mut().flatten() {
            let station = craft.controller.station().and_then(|id| slot(stations, id.0));
            let (controller, mut link) = craft.split();
            if let Some(request) = controller.update(
                delta_seconds,
                &mut link,
                station,
                &self.paths,
                &station_alive,
                sink,
            ) {
                requests.push(request);
            }
        }

        for request in requests {
            match request {
                StationRequest::Undock { station, point } => {
                    if let Err(error) = self.undock_craft(station, point, sink) {
                        warn!("Auto-undock at {:?} point {} failed: {}", station, point + 1, error);
                    }
                }
            }
        }
    }
}

/// Move the station's bound paths with its carrier. A path shared by several
/// points moves once.
fn propagate_carrier_motion(station: &mut DockingStation, paths: &mut PathRegistry, sequence: u64) {
    if !station.are_paths_initialised() {
        return;
    }
    let Some(motion) = station.take_carrier_motion() else {
        return;
    };

    let bound: Vec<PathId> = station
        .points()
        .iter()
        .filter(|point| point.has_bound_path())
        .flat_map(|point| [point.entry_path, point.exit_path])
        .filter(|id| id.is_some())
        .collect();

    for id in bound {
        if let Some(path) = paths.get_mut(id) {
            path.apply_carrier_motion(&motion, sequence);
        }
    }
}
