//! Per-craft docking state machine.
//!
//! The controller never owns its craft's collaborators or its station. Every
//! operation receives a [`CraftLink`] (movement, autopilot, adapter) and the
//! station the controller is assigned to, borrowed from the registry for the
//! duration of the call.

use bevy::prelude::*;

use crate::errors::DockingError;
use crate::paths::PathRegistry;
use crate::ships::{CraftId, CraftLink, DockingAdapter};
use crate::stations::{DockingStation, StationId};

use super::collaborators::{InterpolationMode, ManeuverTarget, PathFollower};
use super::geometry::{apply_axis_snap, docking_pose, hover_pose, DockingPose};
use super::notifications::{
    DockingEvent, DockingEventSink, DockingNotification, NotificationScheduler,
};
use super::state::{AxisSnap, DockingSettings, DockingState, ManeuverPhase};

/// Work the controller needs its station to carry out after a step.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StationRequest {
    /// The auto-undock timer ran out.
    Undock { station: StationId, point: usize },
}

#[derive(Clone, Debug)]
pub struct DockingController {
    settings: DockingSettings,
    state: DockingState,
    phase: ManeuverPhase,
    craft: Option<CraftId>,
    station: Option<StationId>,
    assigned_point: Option<usize>,
    is_initialised: bool,
    is_hover_target: bool,
    /// The opposite maneuver was requested while landing or flying the exit
    /// path; it starts when the current sub-phase completes.
    deferred_switch: bool,
    completion_pending: bool,
    docked_relative_position: Vec3,
    docked_relative_rotation: Quat,
    auto_undock_timer: f32,
    pending_undock: Option<f32>,
    saved_interpolation: Option<InterpolationMode>,
    notifications: NotificationScheduler,
}

impl DockingController {
    pub fn new(settings: DockingSettings) -> Self {
        Self {
            settings,
            state: DockingState::NotDocked,
            phase: ManeuverPhase::Idle,
            craft: None,
            station: None,
            assigned_point: None,
            is_initialised: false,
            is_hover_target: false,
            deferred_switch: false,
            completion_pending: false,
            docked_relative_position: Vec3::ZERO,
            docked_relative_rotation: Quat::IDENTITY,
            auto_undock_timer: 0.0,
            pending_undock: None,
            saved_interpolation: None,
            notifications: NotificationScheduler::default(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn state(&self) -> DockingState {
        self.state
    }

    pub fn phase(&self) -> ManeuverPhase {
        self.phase
    }

    pub fn settings(&self) -> &DockingSettings {
        &self.settings
    }

    pub fn craft(&self) -> Option<CraftId> {
        self.craft
    }

    pub fn station(&self) -> Option<StationId> {
        self.station
    }

    pub fn assigned_point(&self) -> Option<usize> {
        self.assigned_point
    }

    pub fn is_initialised(&self) -> bool {
        self.is_initialised
    }

    pub fn is_hover_target(&self) -> bool {
        self.is_hover_target
    }

    pub fn is_switch_deferred(&self) -> bool {
        self.deferred_switch
    }

    pub fn docked_relative_position(&self) -> Vec3 {
        self.docked_relative_position
    }

    pub fn docked_relative_rotation(&self) -> Quat {
        self.docked_relative_rotation
    }

    pub fn auto_undock_timer(&self) -> f32 {
        self.auto_undock_timer
    }

    pub fn is_undock_pending(&self) -> bool {
        self.pending_undock.is_some()
    }

    pub fn pending_notifications(&self, event: DockingEvent) -> usize {
        self.notifications.pending_count(event)
    }

    pub fn set_axis_snap_position(&mut self, snap: AxisSnap) {
        self.settings.axis_snap_position = snap;
    }

    pub fn set_axis_snap_rotation(&mut self, snap: AxisSnap) {
        self.settings.axis_snap_rotation = snap;
    }

    pub fn set_auto_undock_time(&mut self, seconds: f32) {
        self.settings.auto_undock_time = seconds.max(0.0);
    }

    // =========================================================================
    // Notification cancellation
    // =========================================================================

    pub fn stop_on_post_docking_start(&mut self) -> usize {
        self.notifications.cancel(DockingEvent::PostDockingStart)
    }

    pub fn stop_on_post_docking_hover(&mut self) -> usize {
        self.notifications.cancel(DockingEvent::PostDockingHover)
    }

    pub fn stop_on_post_docked(&mut self) -> usize {
        self.notifications.cancel(DockingEvent::PostDocked)
    }

    pub fn stop_on_post_undocking_start(&mut self) -> usize {
        self.notifications.cancel(DockingEvent::PostUndockingStart)
    }

    pub fn stop_on_post_undocking_hover(&mut self) -> usize {
        self.notifications.cancel(DockingEvent::PostUndockingHover)
    }

    pub fn stop_on_post_undocked(&mut self) -> usize {
        self.notifications.cancel(DockingEvent::PostUndocked)
    }

    // =========================================================================
    // Lifecycle and assignment
    // =========================================================================

    pub(crate) fn bind_craft(&mut self, craft: CraftId) {
        self.craft = Some(craft);
    }

    /// Validate settings and collaborators. Idempotent; on failure the
    /// controller stays uninitialised.
    pub(crate) fn initialise(
        &mut self,
        requires_autopilot: bool,
        craft: &CraftLink<'_>,
    ) -> Result<(), DockingError> {
        if self.is_initialised {
            return Ok(());
        }

        if let Err(error) = self.settings.validate() {
            warn!("Docking controller not initialised: {}", error);
            return Err(error);
        }

        if requires_autopilot && !craft.is_autonomous() {
            let error = DockingError::Configuration(format!(
                "craft {:?} is autonomous but has no autopilot",
                self.craft
            ));
            warn!("Docking controller not initialised: {}", error);
            return Err(error);
        }

        if self.craft.is_none() {
            return Err(DockingError::Configuration(
                "controller is not bound to a registered craft".to_string(),
            ));
        }

        self.is_initialised = true;
        Ok(())
    }

    pub(crate) fn assign(&mut self, station: StationId, point: usize) {
        self.station = Some(station);
        self.assigned_point = Some(point);
    }

    /// Drop the assignment. A craft caught mid-maneuver is released to manual
    /// flight without any notification; a docked craft is freed from the
    /// station.
    pub(crate) fn release(&mut self, craft: &mut CraftLink<'_>) {
        if self.state != DockingState::NotDocked {
            info!(
                "Craft {:?}: released from {:?} while {:?}",
                self.craft, self.station, self.state
            );
            if let Some(autopilot) = craft.autopilot.as_deref_mut() {
                autopilot.clear_target();
            }
            craft.movement.enable_movement(false);
            craft.movement.set_collision_detection(true);
            self.restore_interpolation(craft);
            self.state = DockingState::NotDocked;
        }

        self.reset_maneuver();
        self.pending_undock = None;
        self.auto_undock_timer = 0.0;
        self.station = None;
        self.assigned_point = None;
    }

    /// Queue the undock of a docked craft; `update` performs it after `delay`.
    pub(crate) fn schedule_undock(&mut self, delay: f32) {
        if self.pending_undock.is_none() {
            self.pending_undock = Some(delay);
        }
    }

    pub(crate) fn mark_completed(&mut self) {
        self.completion_pending = true;
    }

    // =========================================================================
    // State changes
    // =========================================================================

    /// Externally requested state change.
    ///
    /// Rejected with `NotInitialised` before `initialise`. Requesting the
    /// current state is a no-op. An accepted request resets the auto-undock
    /// timer and cancels a scheduled undock; a rejected one changes nothing.
    pub fn set_state(
        &mut self,
        new_state: DockingState,
        craft: &mut CraftLink<'_>,
        station: Option<&DockingStation>,
        paths: &PathRegistry,
        sink: &mut dyn DockingEventSink,
    ) -> Result<(), DockingError> {
        if !self.is_initialised {
            warn!(
                "Craft {:?}: set_state({:?}) ignored, docking controller is not initialised",
                self.craft, new_state
            );
            return Err(DockingError::NotInitialised("docking controller".to_string()));
        }

        self.transition(new_state, craft, station, paths, sink)?;
        self.auto_undock_timer = 0.0;
        self.pending_undock = None;
        Ok(())
    }

    fn transition(
        &mut self,
        new_state: DockingState,
        craft: &mut CraftLink<'_>,
        station: Option<&DockingStation>,
        paths: &PathRegistry,
        sink: &mut dyn DockingEventSink,
    ) -> Result<(), DockingError> {
        if new_state == self.state {
            debug!("Craft {:?}: already {:?}", self.craft, new_state);
            return Ok(());
        }

        use DockingState::*;
        match (self.state, new_state) {
            (NotDocked, Docking) => self.begin_docking(craft, station, paths, sink),
            (Docking, Docked) | (Undocking, Docked) => self.enter_docked(craft, station, sink),
            (Docked, Undocking) => self.begin_undocking(craft, station, sink),
            (Docking, Undocking) | (Undocking, Docking) => {
                self.reverse(new_state, craft, station, paths, sink)
            }
            (Undocking, NotDocked) => self.finish_undocking(craft, station, sink),
            (Docking, NotDocked) => {
                self.abort_docking(craft);
                Ok(())
            }
            (from, to) => {
                warn!(
                    "Craft {:?}: cannot change docking state from {:?} to {:?}",
                    self.craft, from, to
                );
                Err(DockingError::InvalidTransition { from, to })
            }
        }
    }

    fn begin_docking(
        &mut self,
        craft: &mut CraftLink<'_>,
        station: Option<&DockingStation>,
        paths: &PathRegistry,
        sink: &mut dyn DockingEventSink,
    ) -> Result<(), DockingError> {
        let (station, point) = self.require_point(station)?;

        self.state = DockingState::Docking;
        self.reset_maneuver();
        info!(
            "Craft {:?}: docking at '{}' point {}",
            self.craft,
            station.name,
            point + 1
        );
        self.post(DockingEvent::PostDockingStart, sink);

        if let Some(autopilot) = craft.autopilot.as_deref_mut() {
            self.start_approach(autopilot, craft.adapter, station, point, paths, true);
        }
        Ok(())
    }

    fn enter_docked(
        &mut self,
        craft: &mut CraftLink<'_>,
        station: Option<&DockingStation>,
        sink: &mut dyn DockingEventSink,
    ) -> Result<(), DockingError> {
        let (station, point) = self.require_point(station)?;
        let target = docking_pose(station, point, &craft.adapter).ok_or_else(|| {
            DockingError::InvalidReference(format!("docking point {} is missing", point))
        })?;

        let arrival = DockingPose::new(craft.movement.position(), craft.movement.rotation());
        let snapped = apply_axis_snap(
            target,
            arrival,
            self.settings.axis_snap_position,
            self.settings.axis_snap_rotation,
        );

        if let Some(autopilot) = craft.autopilot.as_deref_mut() {
            autopilot.clear_target();
        }
        craft.movement.disable_movement();
        craft.movement.set_collision_detection(false);
        craft.movement.set_velocity(Vec3::ZERO, Vec3::ZERO);
        craft
            .movement
            .set_transform(snapped.position, snapped.rotation);

        let (relative_position, relative_rotation) =
            station.to_local(snapped.position, snapped.rotation);
        self.docked_relative_position = relative_position;
        self.docked_relative_rotation = relative_rotation;

        if self.saved_interpolation.is_none() {
            self.saved_interpolation = Some(craft.movement.interpolation_mode());
        }
        craft
            .movement
            .set_interpolation_mode(station.interpolation_mode());

        self.state = DockingState::Docked;
        self.reset_maneuver();
        self.auto_undock_timer = 0.0;
        info!(
            "Craft {:?}: docked at '{}' point {}",
            self.craft,
            station.name,
            point + 1
        );
        self.post(DockingEvent::PostDocked, sink);
        Ok(())
    }

    fn begin_undocking(
        &mut self,
        craft: &mut CraftLink<'_>,
        station: Option<&DockingStation>,
        sink: &mut dyn DockingEventSink,
    ) -> Result<(), DockingError> {
        let (station, point) = self.require_point(station)?;

        craft.movement.enable_movement(false);
        craft.movement.set_collision_detection(true);

        let position = craft.movement.position();
        let forward = craft.movement.rotation() * Vec3::Z;
        let up = station.point_world_up(point).unwrap_or(Vec3::Y);
        let boost = up * self.settings.undock_vertical_velocity
            + forward * self.settings.undock_forward_velocity;
        craft
            .movement
            .set_velocity(station.velocity_at(position) + boost, station.angular_velocity());

        self.state = DockingState::Undocking;
        self.reset_maneuver();
        info!(
            "Craft {:?}: undocking from '{}' point {}",
            self.craft,
            station.name,
            point + 1
        );
        self.post(DockingEvent::PostUndockingStart, sink);

        if let Some(autopilot) = craft.autopilot.as_deref_mut() {
            self.start_liftoff(autopilot, craft.adapter, station, point);
        }
        Ok(())
    }

    fn finish_undocking(
        &mut self,
        craft: &mut CraftLink<'_>,
        station: Option<&DockingStation>,
        sink: &mut dyn DockingEventSink,
    ) -> Result<(), DockingError> {
        if let Some(autopilot) = craft.autopilot.as_deref_mut() {
            autopilot.clear_target();
        }
        craft.movement.enable_movement(false);
        craft.movement.set_collision_detection(true);

        if self.settings.catapult_velocity > 0.0 {
            let forward = craft.movement.rotation() * Vec3::Z;
            let velocity = craft.movement.velocity() + forward * self.settings.catapult_velocity;
            let angular_velocity = craft.movement.angular_velocity();
            craft.movement.set_velocity(velocity, angular_velocity);
        }
        self.restore_interpolation(craft);

        self.state = DockingState::NotDocked;
        self.reset_maneuver();
        info!(
            "Craft {:?}: undocked from '{}'",
            self.craft,
            station.map_or("<removed station>", |station| station.name.as_str())
        );
        self.post(DockingEvent::PostUndocked, sink);
        Ok(())
    }

    fn abort_docking(&mut self, craft: &mut CraftLink<'_>) {
        if let Some(autopilot) = craft.autopilot.as_deref_mut() {
            autopilot.clear_target();
        }
        self.state = DockingState::NotDocked;
        self.reset_maneuver();
        info!("Craft {:?}: docking aborted", self.craft);
    }

    /// Switch between docking and undocking before either completes.
    fn reverse(
        &mut self,
        new_state: DockingState,
        craft: &mut CraftLink<'_>,
        station: Option<&DockingStation>,
        paths: &PathRegistry,
        sink: &mut dyn DockingEventSink,
    ) -> Result<(), DockingError> {
        let (station, point) = self.require_point(station)?;

        self.state = new_state;
        info!(
            "Craft {:?}: switching to {:?} during {:?}",
            self.craft, new_state, self.phase
        );
        let start_event = if new_state == DockingState::Docking {
            DockingEvent::PostDockingStart
        } else {
            DockingEvent::PostUndockingStart
        };
        self.post(start_event, sink);

        let Some(autopilot) = craft.autopilot.as_deref_mut() else {
            self.reset_maneuver();
            return Ok(());
        };

        match (self.phase, new_state) {
            // Still heading for the hover point: retarget to the other maneuver
            (ManeuverPhase::Approach, DockingState::Undocking) => {
                self.start_liftoff(autopilot, craft.adapter, station, point);
            }
            (ManeuverPhase::Liftoff, DockingState::Docking) => {
                self.start_approach(autopilot, craft.adapter, station, point, paths, false);
            }
            // Past the hover point: finish this leg first
            (ManeuverPhase::Landing, DockingState::Undocking)
            | (ManeuverPhase::Exit, DockingState::Docking) => {
                self.deferred_switch = true;
            }
            (ManeuverPhase::Landing, DockingState::Docking)
            | (ManeuverPhase::Exit, DockingState::Undocking) => {
                self.deferred_switch = false;
            }
            (ManeuverPhase::Idle, DockingState::Docking) => {
                self.start_approach(autopilot, craft.adapter, station, point, paths, true);
            }
            (ManeuverPhase::Idle, DockingState::Undocking) => {
                self.start_liftoff(autopilot, craft.adapter, station, point);
            }
            _ => {}
        }
        Ok(())
    }

    // =========================================================================
    // Autopilot sub-phases
    // =========================================================================

    fn start_approach(
        &mut self,
        autopilot: &mut dyn PathFollower,
        adapter: DockingAdapter,
        station: &DockingStation,
        point: usize,
        paths: &PathRegistry,
        use_entry_path: bool,
    ) {
        self.phase = ManeuverPhase::Approach;
        self.is_hover_target = true;
        self.deferred_switch = false;

        let entry_path = station
            .docking_point(point)
            .map(|point| point.entry_path)
            .unwrap_or_default();

        if use_entry_path && entry_path.is_some() {
            if paths.contains(entry_path) {
                autopilot.assign_target_path(entry_path);
                return;
            }
            warn!(
                "Craft {:?}: entry path {:?} not found, flying to hover point",
                self.craft, entry_path
            );
        }

        if let Some(pose) = hover_pose(station, point, &adapter) {
            autopilot.assign_target(self.maneuver_target(station, pose, true));
        }
    }

    fn start_landing(
        &mut self,
        autopilot: &mut dyn PathFollower,
        adapter: DockingAdapter,
        station: &DockingStation,
        point: usize,
    ) {
        self.phase = ManeuverPhase::Landing;
        self.is_hover_target = false;
        if let Some(pose) = docking_pose(station, point, &adapter) {
            autopilot.assign_target(self.maneuver_target(station, pose, false));
        }
    }

    fn start_liftoff(
        &mut self,
        autopilot: &mut dyn PathFollower,
        adapter: DockingAdapter,
        station: &DockingStation,
        point: usize,
    ) {
        self.phase = ManeuverPhase::Liftoff;
        self.is_hover_target = true;
        self.deferred_switch = false;
        if let Some(pose) = hover_pose(station, point, &adapter) {
            autopilot.assign_target(self.maneuver_target(station, pose, true));
        }
    }

    fn maneuver_target(
        &self,
        station: &DockingStation,
        pose: DockingPose,
        is_hover: bool,
    ) -> ManeuverTarget {
        let settings = &self.settings;
        let (completion_distance, completion_angle, max_duration) = if is_hover {
            (
                settings.hover_distance_precision,
                settings.hover_angle_precision,
                settings.hover_max_duration,
            )
        } else {
            (
                settings.landing_distance_precision,
                settings.landing_angle_precision,
                settings.landing_max_duration,
            )
        };

        ManeuverTarget {
            position: pose.position,
            rotation: pose.rotation,
            radius: settings.target_radius,
            completion_distance,
            completion_angle,
            max_duration,
            velocity: station.velocity_at(pose.position),
        }
    }

    /// The autopilot reached its current target: move to the next sub-phase.
    fn advance_maneuver(
        &mut self,
        craft: &mut CraftLink<'_>,
        station: &DockingStation,
        point: usize,
        paths: &PathRegistry,
        sink: &mut dyn DockingEventSink,
    ) -> Result<(), DockingError> {
        let adapter = craft.adapter;
        let Some(autopilot) = craft.autopilot.as_deref_mut() else {
            return Ok(());
        };

        match self.phase {
            ManeuverPhase::Idle => Ok(()),
            ManeuverPhase::Approach => {
                self.post(DockingEvent::PostDockingHover, sink);
                self.start_landing(autopilot, adapter, station, point);
                Ok(())
            }
            ManeuverPhase::Landing => {
                if self.deferred_switch {
                    self.start_liftoff(autopilot, adapter, station, point);
                    Ok(())
                } else {
                    self.enter_docked(craft, Some(station), sink)
                }
            }
            ManeuverPhase::Liftoff => {
                self.post(DockingEvent::PostUndockingHover, sink);
                let exit_path = station
                    .docking_point(point)
                    .map(|point| point.exit_path)
                    .unwrap_or_default();

                if paths.contains(exit_path) {
                    self.phase = ManeuverPhase::Exit;
                    self.is_hover_target = false;
                    autopilot.assign_target_path(exit_path);
                    Ok(())
                } else {
                    if exit_path.is_some() {
                        warn!(
                            "Craft {:?}: exit path {:?} not found, undocking at hover point",
                            self.craft, exit_path
                        );
                    }
                    self.finish_undocking(craft, Some(station), sink)
                }
            }
            ManeuverPhase::Exit => {
                if self.deferred_switch {
                    self.start_approach(autopilot, adapter, station, point, paths, true);
                    Ok(())
                } else {
                    self.finish_undocking(craft, Some(station), sink)
                }
            }
        }
    }

    // =========================================================================
    // Per-step update
    // =========================================================================

    /// Docking-logic phase of one simulation step. Run after the movement
    /// phase so a station's pose is current.
    ///
    /// `station_alive` reports whether a station still exists; due
    /// notifications addressed to a removed station are dropped.
    pub fn update(
        &mut self,
        delta_seconds: f32,
        craft: &mut CraftLink<'_>,
        station: Option<&DockingStation>,
        paths: &PathRegistry,
        station_alive: &dyn Fn(StationId) -> bool,
        sink: &mut dyn DockingEventSink,
    ) -> Option<StationRequest> {
        if !self.is_initialised {
            return None;
        }

        self.deliver_due_notifications(delta_seconds, station_alive, sink);

        let request = match self.state {
            DockingState::Docked => self.update_docked(delta_seconds, craft, station),
            DockingState::Docking | DockingState::Undocking => {
                self.update_maneuver(craft, station, paths, sink);
                None
            }
            DockingState::NotDocked => {
                self.completion_pending = false;
                None
            }
        };

        self.tick_pending_undock(delta_seconds, craft, station, paths, sink);
        request
    }

    fn tick_pending_undock(
        &mut self,
        delta_seconds: f32,
        craft: &mut CraftLink<'_>,
        station: Option<&DockingStation>,
        paths: &PathRegistry,
        sink: &mut dyn DockingEventSink,
    ) {
        let Some(remaining) = self.pending_undock.as_mut() else {
            return;
        };
        *remaining -= delta_seconds;
        if *remaining > 0.0 {
            return;
        }

        self.pending_undock = None;
        if self.state != DockingState::Docked {
            return;
        }
        if let Err(error) = self.transition(DockingState::Undocking, craft, station, paths, sink) {
            warn!("Craft {:?}: delayed undock failed: {}", self.craft, error);
        }
    }

    fn deliver_due_notifications(
        &mut self,
        delta_seconds: f32,
        station_alive: &dyn Fn(StationId) -> bool,
        sink: &mut dyn DockingEventSink,
    ) {
        for notification in self.notifications.advance(delta_seconds) {
            if station_alive(notification.station_id) {
                sink.on_docking_event(&notification);
            } else {
                debug!(
                    "Craft {:?}: dropped {:?}, station {:?} is gone",
                    self.craft, notification.event, notification.station_id
                );
            }
        }
    }

    fn update_docked(
        &mut self,
        delta_seconds: f32,
        craft: &mut CraftLink<'_>,
        station: Option<&DockingStation>,
    ) -> Option<StationRequest> {
        let station = station?;

        let (position, rotation) =
            station.to_world(self.docked_relative_position, self.docked_relative_rotation);
        craft.movement.set_transform(position, rotation);

        if self.settings.auto_undock_time <= 0.0 || self.pending_undock.is_some() {
            return None;
        }

        self.auto_undock_timer += delta_seconds;
        if self.auto_undock_timer >= self.settings.auto_undock_time {
            self.auto_undock_timer = 0.0;
            let point = self.assigned_point?;
            info!("Craft {:?}: auto-undock timer elapsed", self.craft);
            return Some(StationRequest::Undock {
                station: station.id(),
                point,
            });
        }
        None
    }

    fn update_maneuver(
        &mut self,
        craft: &mut CraftLink<'_>,
        station: Option<&DockingStation>,
        paths: &PathRegistry,
        sink: &mut dyn DockingEventSink,
    ) {
        let Ok((station, point)) = self.require_point(station) else {
            return;
        };

        let result = if craft.is_autonomous() {
            // Drain the follower every step so a burst of arrivals counts once
            let polled = craft
                .autopilot
                .as_deref_mut()
                .is_some_and(|autopilot| autopilot.take_completed());
            let pushed = std::mem::take(&mut self.completion_pending);
            if polled || pushed {
                self.advance_maneuver(craft, station, point, paths, sink)
            } else {
                Ok(())
            }
        } else {
            self.completion_pending = false;
            match self.state {
                DockingState::Docking => {
                    let arrived = docking_pose(station, point, &craft.adapter).is_some_and(|target| {
                        DockingPose::new(craft.movement.position(), craft.movement.rotation())
                            .is_within(
                                &target,
                                self.settings.landing_distance_precision,
                                self.settings.landing_angle_precision,
                            )
                    });
                    if arrived {
                        self.enter_docked(craft, Some(station), sink)
                    } else {
                        Ok(())
                    }
                }
                _ => self.finish_undocking(craft, Some(station), sink),
            }
        };

        if let Err(error) = result {
            warn!("Craft {:?}: maneuver update failed: {}", self.craft, error);
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn require_point<'s>(
        &self,
        station: Option<&'s DockingStation>,
    ) -> Result<(&'s DockingStation, usize), DockingError> {
        let station = match (self.station, station) {
            (Some(id), Some(station)) if station.id() == id => station,
            _ => {
                return Err(DockingError::InvalidReference(format!(
                    "craft {:?} has no docking station",
                    self.craft
                )))
            }
        };
        let point = self.assigned_point.ok_or_else(|| {
            DockingError::InvalidReference(format!(
                "craft {:?} has no docking point assigned",
                self.craft
            ))
        })?;
        if station.docking_point(point).is_none() {
            return Err(DockingError::InvalidReference(format!(
                "station '{}' has no docking point {}",
                station.name, point
            )));
        }
        Ok((station, point))
    }

    fn reset_maneuver(&mut self) {
        self.phase = ManeuverPhase::Idle;
        self.is_hover_target = false;
        self.deferred_switch = false;
        self.completion_pending = false;
    }

    fn restore_interpolation(&mut self, craft: &mut CraftLink<'_>) {
        if let Some(mode) = self.saved_interpolation.take() {
            craft.movement.set_interpolation_mode(mode);
        }
    }

    fn post(&mut self, event: DockingEvent, sink: &mut dyn DockingEventSink) {
        let (Some(station_id), Some(craft_id)) = (self.station, self.craft) else {
            return;
        };
        let notification = DockingNotification {
            event,
            station_id,
            craft_id,
            point_number: self.assigned_point.map_or(0, |point| point + 1),
            reserved: Vec3::ZERO,
        };
        let delay = self.settings.delays.delay_for(event);
        self.notifications.post(notification, delay, sink);
    }
}
