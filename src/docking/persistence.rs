//! Import and export of docking-point layouts as RON files.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::DockingError;
use crate::paths::PathId;
use crate::stations::DockingPoint;

/// One docking point as stored on disk. Occupancy is never persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DockingPointRecord {
    pub relative_position: [f32; 3],
    /// Euler angles in degrees.
    pub relative_rotation: [f32; 3],
    pub hover_height: f32,
    #[serde(default)]
    pub entry_path_id: u32,
    #[serde(default)]
    pub exit_path_id: u32,
}

impl DockingPointRecord {
    fn from_point(point: &DockingPoint) -> Self {
        Self {
            relative_position: point.relative_position.to_array(),
            relative_rotation: point.relative_rotation.to_array(),
            hover_height: point.hover_height(),
            entry_path_id: point.entry_path.0,
            exit_path_id: point.exit_path.0,
        }
    }

    fn into_point(self) -> DockingPoint {
        DockingPoint::new(
            Vec3::from_array(self.relative_position),
            Vec3::from_array(self.relative_rotation),
        )
        .with_hover_height(self.hover_height)
        .with_paths(PathId(self.entry_path_id), PathId(self.exit_path_id))
    }
}

pub fn docking_points_to_ron(points: &[DockingPoint]) -> Result<String, DockingError> {
    let records: Vec<DockingPointRecord> = points.iter().map(DockingPointRecord::from_point).collect();
    ron::ser::to_string_pretty(&records, ron::ser::PrettyConfig::default())
        .map_err(|error| DockingError::Persistence(format!("RON write error: {}", error)))
}

pub fn docking_points_from_ron(contents: &str) -> Result<Vec<DockingPoint>, DockingError> {
    let records: Vec<DockingPointRecord> = ron::de::from_str(contents)
        .map_err(|error| DockingError::Persistence(format!("RON parse error: {}", error)))?;

    for (index, record) in records.iter().enumerate() {
        let finite = record
            .relative_position
            .iter()
            .chain(record.relative_rotation.iter())
            .all(|value| value.is_finite());
        if !finite || !record.hover_height.is_finite() {
            return Err(DockingError::Persistence(format!(
                "docking point {} has non-finite values",
                index
            )));
        }
    }

    Ok(records.into_iter().map(DockingPointRecord::into_point).collect())
}

/// Write the points to `path`, creating parent directories as needed.
pub fn export_docking_points(points: &[DockingPoint], path: &Path) -> Result<(), DockingError> {
    let result = docking_points_to_ron(points).and_then(|contents| write_points_file(path, &contents));
    match &result {
        Ok(()) => info!(
            "Exported {} docking points to {}",
            points.len(),
            path.display()
        ),
        Err(error) => error!("Docking point export failed: {}", error),
    }
    result
}

pub fn import_docking_points(path: &Path) -> Result<Vec<DockingPoint>, DockingError> {
    let result = fs::read_to_string(path)
        .map_err(|error| {
            DockingError::Persistence(format!("Read error ({}): {}", path.display(), error))
        })
        .and_then(|contents| docking_points_from_ron(&contents));

    if let Err(error) = &result {
        error!("Docking point import failed: {}", error);
    }
    result
}

fn write_points_file(path: &Path, contents: &str) -> Result<(), DockingError> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .map_err(|error| DockingError::Persistence(format!("Create dir error: {}", error)))?;
    }

    fs::write(path, contents)
        .map_err(|error| DockingError::Persistence(format!("Write error: {}", error)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_points() -> Vec<DockingPoint> {
        vec![
            DockingPoint::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.0, 90.0, 0.0))
                .with_hover_height(12.0)
                .with_paths(PathId(4), PathId(5)),
            DockingPoint::new(Vec3::new(-4.0, 0.0, 0.5), Vec3::ZERO),
        ]
    }

    #[test]
    fn export_then_import_keeps_geometry_and_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layouts").join("station.ron");

        export_docking_points(&sample_points(), &path).unwrap();
        let loaded = import_docking_points(&path).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].relative_rotation, Vec3::new(0.0, 90.0, 0.0));
        assert_eq!(loaded[0].hover_height(), 12.0);
        assert_eq!(loaded[0].entry_path, PathId(4));
        assert_eq!(loaded[1].exit_path, PathId::NONE);
        assert!(loaded.iter().all(|point| point.docked_craft().is_none()));
    }

    #[test]
    fn missing_path_ids_default_to_none() {
        let points = docking_points_from_ron(
            "[(relative_position: (0.0, 1.0, 0.0), relative_rotation: (0.0, 0.0, 0.0), hover_height: 3.0)]",
        )
        .unwrap();
        assert_eq!(points[0].entry_path, PathId::NONE);
        assert_eq!(points[0].hover_height(), 3.0);
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let result = import_docking_points(&dir.path().join("absent.ron"));
        assert!(matches!(result, Err(DockingError::Persistence(_))));
    }

    #[test]
    fn malformed_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ron");
        fs::write(&path, "[(relative_position: oops)]").unwrap();

        let result = import_docking_points(&path);
        assert!(matches!(result, Err(DockingError::Persistence(_))));
    }

    #[test]
    fn negative_hover_height_is_clamped_on_import() {
        let points = docking_points_from_ron(
            "[(relative_position: (0.0, 0.0, 0.0), relative_rotation: (0.0, 0.0, 0.0), hover_height: -2.0)]",
        )
        .unwrap();
        assert_eq!(points[0].hover_height(), 0.0);
    }
}
