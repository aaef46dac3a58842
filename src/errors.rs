//! Error type shared by the docking registry, controller and persistence code.

use thiserror::Error;

use crate::docking::DockingState;
use crate::ships::CraftId;
use crate::stations::StationId;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DockingError {
    /// An operation ran before the component was initialised.
    #[error("{0} is not initialised")]
    NotInitialised(String),
    /// A station, craft or docking point that does not exist or is not assigned.
    #[error("invalid reference: {0}")]
    InvalidReference(String),
    /// A required collaborator or setting is missing or out of range.
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("docking point {point} on station {station:?} is already occupied by {occupant:?}")]
    PointOccupied {
        station: StationId,
        point: usize,
        occupant: CraftId,
    },
    #[error("craft {0:?} is docked and must undock first")]
    CraftDocked(CraftId),
    #[error("cannot change docking state from {from:?} to {to:?}")]
    InvalidTransition { from: DockingState, to: DockingState },
    #[error("docking point persistence failed: {0}")]
    Persistence(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occupied_error_names_station_point_and_occupant() {
        let error = DockingError::PointOccupied {
            station: StationId(3),
            point: 1,
            occupant: CraftId(7),
        };
        let message = error.to_string();
        assert!(message.contains("docking point 1"));
        assert!(message.contains("StationId(3)"));
        assert!(message.contains("CraftId(7)"));
    }
}
