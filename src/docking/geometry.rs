//! World-space docking targets, adapter alignment and axis snapping.

use bevy::prelude::*;
use std::f32::consts::{FRAC_PI_2, PI};

use crate::ships::DockingAdapter;
use crate::stations::DockingStation;

use super::state::AxisSnap;

/// Below this, the adapter direction's X component counts as zero and the
/// roll onto the XY target is snapped to exactly 0 or 180 degrees.
pub const ADAPTER_AXIS_THRESHOLD: f32 = 0.001;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DockingPose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl DockingPose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn distance_to(&self, other: &DockingPose) -> f32 {
        self.position.distance(other.position)
    }

    /// Angle between the two orientations, in degrees.
    pub fn angle_to(&self, other: &DockingPose) -> f32 {
        self.rotation.angle_between(other.rotation).to_degrees()
    }

    pub fn is_within(&self, target: &DockingPose, distance: f32, angle_degrees: f32) -> bool {
        self.distance_to(target) <= distance && self.angle_to(target) <= angle_degrees
    }
}

/// Craft rotation, relative to a docking point, that turns the adapter's
/// facing direction onto the point's down axis.
///
/// The direction is first rolled about Z until it lies in the YZ plane
/// pointing down (atan2 on the XY projection), then pitched about X onto -Y
/// (atan2 on the YZ projection). An adapter already facing straight down gives
/// the identity; one facing straight up is flipped 180 degrees about Z.
pub fn ship_relative_rotation(direction: Vec3) -> Quat {
    let direction = direction.normalize_or(Vec3::NEG_Y);

    let roll = if direction.x.abs() < ADAPTER_AXIS_THRESHOLD {
        if direction.y > ADAPTER_AXIS_THRESHOLD {
            PI
        } else {
            0.0
        }
    } else {
        -FRAC_PI_2 - direction.y.atan2(direction.x)
    };
    let rolled = Quat::from_rotation_z(roll) * direction;

    let pitch = PI - rolled.z.atan2(rolled.y);
    // atan2 returns -PI for a -0.0 Z component; treat a full turn as none
    let pitch = if pitch.abs() < ADAPTER_AXIS_THRESHOLD
        || (pitch - 2.0 * PI).abs() < ADAPTER_AXIS_THRESHOLD
    {
        0.0
    } else {
        pitch
    };

    (Quat::from_rotation_x(pitch) * Quat::from_rotation_z(roll)).normalize()
}

/// Craft pose that puts the adapter exactly on docking point `point`.
pub fn docking_pose(
    station: &DockingStation,
    point: usize,
    adapter: &DockingAdapter,
) -> Option<DockingPose> {
    let point_position = station.point_world_position(point)?;
    let point_rotation = station.point_world_rotation(point)?;
    Some(align_adapter(point_position, point_rotation, adapter))
}

/// Craft pose that puts the adapter on the point's hover position.
pub fn hover_pose(
    station: &DockingStation,
    point: usize,
    adapter: &DockingAdapter,
) -> Option<DockingPose> {
    let hover_position = station.point_hover_position(point)?;
    let point_rotation = station.point_world_rotation(point)?;
    Some(align_adapter(hover_position, point_rotation, adapter))
}

fn align_adapter(target: Vec3, point_rotation: Quat, adapter: &DockingAdapter) -> DockingPose {
    let rotation =
        (point_rotation * ship_relative_rotation(adapter.relative_direction())).normalize();
    let position = target - rotation * adapter.relative_position();
    DockingPose { position, rotation }
}

/// Blend a craft's arrival pose onto a docking target.
///
/// The arrival's offset from the target is taken in the target's frame; the
/// axes selected by each policy are zeroed and the rest is kept. `All` yields
/// the target, `None` yields the arrival pose.
pub fn apply_axis_snap(
    target: DockingPose,
    arrival: DockingPose,
    snap_position: AxisSnap,
    snap_rotation: AxisSnap,
) -> DockingPose {
    let inverse = target.rotation.inverse();

    let position = if snap_position == AxisSnap::None {
        arrival.position
    } else {
        let residual = inverse * (arrival.position - target.position);
        let residual = zero_axes(residual, snap_position);
        target.position + target.rotation * residual
    };

    let rotation = match snap_rotation {
        AxisSnap::All => target.rotation,
        AxisSnap::None => arrival.rotation,
        policy => {
            let residual = (inverse * arrival.rotation).normalize();
            let (y, x, z) = residual.to_euler(EulerRot::YXZ);
            let kept = zero_axes(Vec3::new(x, y, z), policy);
            (target.rotation * Quat::from_euler(EulerRot::YXZ, kept.y, kept.x, kept.z))
                .normalize()
        }
    };

    DockingPose { position, rotation }
}

fn zero_axes(value: Vec3, policy: AxisSnap) -> Vec3 {
    let [x, y, z] = policy.snapped_axes();
    Vec3::new(
        if x { 0.0 } else { value.x },
        if y { 0.0 } else { value.y },
        if z { 0.0 } else { value.z },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stations::DockingPoint;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn downward_adapter_needs_no_rotation() {
        let rotation = ship_relative_rotation(Vec3::NEG_Y);
        assert!(rotation.angle_between(Quat::IDENTITY) < 1e-5);
    }

    #[test]
    fn upward_adapter_is_flipped() {
        let rotation = ship_relative_rotation(Vec3::Y);
        assert!(close(rotation * Vec3::Y, Vec3::NEG_Y));
        // A roll, not a pitch: forward stays forward
        assert!(close(rotation * Vec3::Z, Vec3::Z));
    }

    #[test]
    fn adapter_direction_maps_onto_down() {
        let directions = [
            Vec3::X,
            Vec3::NEG_X,
            Vec3::Z,
            Vec3::NEG_Z,
            Vec3::new(1.0, -1.0, 0.5),
            Vec3::new(-0.3, 0.8, -0.2),
            Vec3::new(0.0005, 1.0, 0.0),
        ];

        for direction in directions {
            let unit = direction.normalize();
            let rotation = ship_relative_rotation(unit);
            // Directions inside the axis threshold land within it, not exactly
            assert!(
                ((rotation * unit) - Vec3::NEG_Y).length() < 2.0 * ADAPTER_AXIS_THRESHOLD,
                "direction {:?} mapped to {:?}",
                unit,
                rotation * unit
            );
        }
    }

    #[test]
    fn docking_pose_puts_adapter_on_point() {
        let mut station = DockingStation::new("Dock", Vec3::new(0.0, 50.0, 0.0), Quat::IDENTITY);
        station.add_point(DockingPoint::new(Vec3::new(10.0, 0.0, 0.0), Vec3::ZERO));
        let adapter = DockingAdapter::new(Vec3::new(0.0, -2.0, 1.0), Vec3::NEG_Y).unwrap();

        let pose = docking_pose(&station, 0, &adapter).unwrap();
        let adapter_world = pose.position + pose.rotation * adapter.relative_position();
        assert!(close(adapter_world, Vec3::new(10.0, 50.0, 0.0)));
        assert!(close(pose.position, Vec3::new(10.0, 52.0, -1.0)));
    }

    #[test]
    fn hover_pose_is_raised_along_point_up() {
        let mut station = DockingStation::new("Dock", Vec3::ZERO, Quat::IDENTITY);
        station.add_point(
            DockingPoint::new(Vec3::ZERO, Vec3::new(90.0, 0.0, 0.0)).with_hover_height(5.0),
        );
        let adapter = DockingAdapter::default();

        let pose = hover_pose(&station, 0, &adapter).unwrap();
        // Pitching 90 degrees about X turns up into +Z
        assert!(close(pose.position, Vec3::new(0.0, 0.0, 5.0)));
    }

    #[test]
    fn missing_point_has_no_pose() {
        let station = DockingStation::new("Empty", Vec3::ZERO, Quat::IDENTITY);
        assert!(docking_pose(&station, 0, &DockingAdapter::default()).is_none());
    }

    #[test]
    fn snap_all_returns_target_and_is_idempotent() {
        let target = DockingPose::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_y(0.5));
        let arrival = DockingPose::new(Vec3::new(1.3, 2.2, 2.9), Quat::from_rotation_y(0.6));

        let once = apply_axis_snap(target, arrival, AxisSnap::All, AxisSnap::All);
        let twice = apply_axis_snap(target, once, AxisSnap::All, AxisSnap::All);

        assert!(close(once.position, target.position));
        assert!(once.rotation.angle_between(target.rotation) < 1e-5);
        assert!(close(twice.position, once.position));
        assert!(twice.rotation.angle_between(once.rotation) < 1e-5);
    }

    #[test]
    fn snap_none_keeps_arrival() {
        let target = DockingPose::new(Vec3::ZERO, Quat::IDENTITY);
        let arrival = DockingPose::new(Vec3::new(0.4, 0.1, -0.2), Quat::from_rotation_x(0.1));

        let snapped = apply_axis_snap(target, arrival, AxisSnap::None, AxisSnap::None);
        assert_eq!(snapped, arrival);
    }

    #[test]
    fn snap_single_axis_keeps_other_offsets_in_target_frame() {
        let target = DockingPose::new(
            Vec3::new(10.0, 0.0, 0.0),
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
        );
        // Offset of (1, 2, 3) expressed in the target frame
        let arrival_position = target.position + target.rotation * Vec3::new(1.0, 2.0, 3.0);
        let arrival = DockingPose::new(arrival_position, target.rotation);

        let snapped = apply_axis_snap(target, arrival, AxisSnap::Y, AxisSnap::All);
        let expected = target.position + target.rotation * Vec3::new(1.0, 0.0, 3.0);
        assert!(close(snapped.position, expected));
    }

    #[test]
    fn snap_rotation_keeps_unsnapped_yaw() {
        let target = DockingPose::new(Vec3::ZERO, Quat::IDENTITY);
        let arrival = DockingPose::new(Vec3::ZERO, Quat::from_rotation_y(0.3));

        let snapped = apply_axis_snap(target, arrival, AxisSnap::All, AxisSnap::XZ);
        assert!(snapped.rotation.angle_between(Quat::from_rotation_y(0.3)) < 1e-4);

        let snapped = apply_axis_snap(target, arrival, AxisSnap::All, AxisSnap::Y);
        assert!(snapped.rotation.angle_between(Quat::IDENTITY) < 1e-4);
    }

    #[test]
    fn precision_check_uses_distance_and_degrees() {
        let target = DockingPose::new(Vec3::ZERO, Quat::IDENTITY);
        let near = DockingPose::new(Vec3::new(0.005, 0.0, 0.0), Quat::from_rotation_y(1f32.to_radians()));
        assert!(near.is_within(&target, 0.01, 2.0));
        assert!(!near.is_within(&target, 0.001, 2.0));
        assert!(!near.is_within(&target, 0.01, 0.5));
    }
}
