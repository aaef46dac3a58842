//! Lifecycle notifications and their delayed delivery.
//!
//! Each controller owns a [`NotificationScheduler`]: a countdown list that is
//! advanced once per simulation step. A zero delay delivers synchronously.

use bevy::prelude::*;

use crate::errors::DockingError;
use crate::ships::CraftId;
use crate::stations::StationId;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DockingEvent {
    PostDockingStart,
    PostDockingHover,
    PostDocked,
    PostUndockingStart,
    PostUndockingHover,
    PostUndocked,
}

impl DockingEvent {
    pub const ALL: [DockingEvent; 6] = [
        DockingEvent::PostDockingStart,
        DockingEvent::PostDockingHover,
        DockingEvent::PostDocked,
        DockingEvent::PostUndockingStart,
        DockingEvent::PostUndockingHover,
        DockingEvent::PostUndocked,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DockingEvent::PostDockingStart => "docking started",
            DockingEvent::PostDockingHover => "reached docking hover point",
            DockingEvent::PostDocked => "docked",
            DockingEvent::PostUndockingStart => "undocking started",
            DockingEvent::PostUndockingHover => "reached undocking hover point",
            DockingEvent::PostUndocked => "undocked",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DockingNotification {
    pub event: DockingEvent,
    pub station_id: StationId,
    pub craft_id: CraftId,
    /// 1-based docking point number, 0 when no point is assigned.
    pub point_number: usize,
    /// Unused payload slot, always zero for now.
    pub reserved: Vec3,
}

/// Receives lifecycle notifications as they are delivered.
pub trait DockingEventSink {
    fn on_docking_event(&mut self, notification: &DockingNotification);
}

impl DockingEventSink for Vec<DockingNotification> {
    fn on_docking_event(&mut self, notification: &DockingNotification) {
        self.push(notification.clone());
    }
}

/// Discards every notification.
impl DockingEventSink for () {
    fn on_docking_event(&mut self, _notification: &DockingNotification) {}
}

/// Delay in seconds before each notification is delivered.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct NotificationDelays {
    pub docking_start: f32,
    pub docking_hover: f32,
    pub docked: f32,
    pub undocking_start: f32,
    pub undocking_hover: f32,
    pub undocked: f32,
}

impl NotificationDelays {
    pub fn delay_for(&self, event: DockingEvent) -> f32 {
        match event {
            DockingEvent::PostDockingStart => self.docking_start,
            DockingEvent::PostDockingHover => self.docking_hover,
            DockingEvent::PostDocked => self.docked,
            DockingEvent::PostUndockingStart => self.undocking_start,
            DockingEvent::PostUndockingHover => self.undocking_hover,
            DockingEvent::PostUndocked => self.undocked,
        }
    }

    pub fn validate(&self) -> Result<(), DockingError> {
        for event in DockingEvent::ALL {
            let delay = self.delay_for(event);
            if !delay.is_finite() || delay < 0.0 {
                return Err(DockingError::Configuration(format!(
                    "delay for '{}' must be non-negative, got {}",
                    event.label(),
                    delay
                )));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
struct PendingNotification {
    notification: DockingNotification,
    remaining: f32,
    order: u64,
}

#[derive(Clone, Debug, Default)]
pub struct NotificationScheduler {
    pending: Vec<PendingNotification>,
    next_order: u64,
}

impl NotificationScheduler {
    /// Deliver now when `delay` is zero, otherwise queue it. Returns whether
    /// the notification was queued.
    pub fn post(
        &mut self,
        notification: DockingNotification,
        delay: f32,
        sink: &mut dyn DockingEventSink,
    ) -> bool {
        if delay <= 0.0 {
            sink.on_docking_event(&notification);
            return false;
        }

        let order = self.next_order;
        self.next_order = self.next_order.wrapping_add(1);
        self.pending.push(PendingNotification {
            notification,
            remaining: delay,
            order,
        });
        true
    }

    /// Count down every pending notification and return the ones that fell due,
    /// earliest first.
    pub fn advance(&mut self, delta_seconds: f32) -> Vec<DockingNotification> {
        if self.pending.is_empty() {
            return Vec::new();
        }

        for entry in self.pending.iter_mut() {
            entry.remaining -= delta_seconds;
        }

        let (mut due, waiting): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|entry| entry.remaining <= 0.0);
        self.pending = waiting;

        due.sort_by(|a, b| {
            a.remaining
                .total_cmp(&b.remaining)
                .then(a.order.cmp(&b.order))
        });
        due.into_iter().map(|entry| entry.notification).collect()
    }

    /// Drop every pending notification of `event`. Delivered ones are unaffected.
    pub fn cancel(&mut self, event: DockingEvent) -> usize {
        let before = self.pending.len();
        self.pending
            .retain(|entry| entry.notification.event != event);
        before - self.pending.len()
    }

    pub fn pending_count(&self, event: DockingEvent) -> usize {
        self.pending
            .iter()
            .filter(|entry| entry.notification.event == event)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(event: DockingEvent) -> DockingNotification {
        DockingNotification {
            event,
            station_id: StationId(1),
            craft_id: CraftId(2),
            point_number: 1,
            reserved: Vec3::ZERO,
        }
    }

    #[test]
    fn zero_delay_delivers_synchronously() {
        let mut scheduler = NotificationScheduler::default();
        let mut received = Vec::new();
        let queued = scheduler.post(notification(DockingEvent::PostDocked), 0.0, &mut received);
        assert!(!queued);
        assert_eq!(received.len(), 1);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn delayed_notification_fires_after_delay() {
        let mut scheduler = NotificationScheduler::default();
        let mut received = Vec::new();
        scheduler.post(notification(DockingEvent::PostDocked), 1.0, &mut received);
        assert!(received.is_empty());

        assert!(scheduler.advance(0.5).is_empty());
        let due = scheduler.advance(0.5);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].event, DockingEvent::PostDocked);
        assert!(scheduler.advance(1.0).is_empty());
    }

    #[test]
    fn cancel_before_firing_prevents_delivery() {
        let mut scheduler = NotificationScheduler::default();
        let mut received = Vec::new();
        scheduler.post(notification(DockingEvent::PostUndocked), 2.0, &mut received);
        scheduler.post(notification(DockingEvent::PostDocked), 2.0, &mut received);

        assert_eq!(scheduler.cancel(DockingEvent::PostUndocked), 1);
        let due = scheduler.advance(3.0);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].event, DockingEvent::PostDocked);
    }

    #[test]
    fn cancel_after_firing_has_no_effect() {
        let mut scheduler = NotificationScheduler::default();
        let mut received = Vec::new();
        scheduler.post(notification(DockingEvent::PostDocked), 0.1, &mut received);
        let delivered = scheduler.advance(0.2);
        assert_eq!(delivered.len(), 1);

        assert_eq!(scheduler.cancel(DockingEvent::PostDocked), 0);
        assert_eq!(delivered[0].event, DockingEvent::PostDocked);
    }

    #[test]
    fn due_notifications_are_ordered_by_deadline() {
        let mut scheduler = NotificationScheduler::default();
        let mut received = Vec::new();
        scheduler.post(notification(DockingEvent::PostUndocked), 0.9, &mut received);
        scheduler.post(notification(DockingEvent::PostDockingStart), 0.3, &mut received);

        let due = scheduler.advance(1.0);
        let events: Vec<_> = due.iter().map(|n| n.event).collect();
        assert_eq!(
            events,
            vec![DockingEvent::PostDockingStart, DockingEvent::PostUndocked]
        );
    }

    #[test]
    fn negative_delay_is_rejected() {
        let delays = NotificationDelays {
            undocked: -0.5,
            ..Default::default()
        };
        assert!(delays.validate().is_err());
    }
}
