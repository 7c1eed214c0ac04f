use crate::types::{
    Day, MileMarker, PlateNumber, RecordedSpeed, RoadId, SpeedLimit, SpeedMph, Timestamp, DAY_IN_SECONDS,
};
use std::cmp::{max, min};
use std::ops::RangeInclusive;
use uuid::Uuid;

pub mod io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Camera {
    pub road: RoadId,
    pub mile: MileMarker,
    pub limit: SpeedLimit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatcher {
    pub roads: Vec<RoadId>,
}
impl Dispatcher {
    pub fn serves(&self, road: RoadId) -> bool {
        self.roads.contains(&road)
    }
}

/// One sighting of a plate, tied to the connection of the camera that reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub camera: Uuid,
    pub mile: MileMarker,
    pub timestamp: Timestamp,
}
impl Observation {
    /// Average speed between two sightings, or `None` when no time elapsed between them.
    pub fn speed_between(&self, other: &Self) -> Option<SpeedMph> {
        let seconds_taken = max(self.timestamp, other.timestamp) - min(self.timestamp, other.timestamp);
        if seconds_taken == 0 {
            return None;
        }
        let distance_in_miles = self.mile.abs_diff(other.mile);
        Some(SpeedMph::from(distance_in_miles) * 3600.0 / SpeedMph::from(seconds_taken))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub plate: PlateNumber,
    pub road: RoadId,
    pub mile1: MileMarker,
    pub timestamp1: Timestamp,
    pub mile2: MileMarker,
    pub timestamp2: Timestamp,
    pub speed: RecordedSpeed,
}
impl Ticket {
    /// Builds a ticket with the chronologically earlier sighting first, whatever order the
    /// sightings were reported in. Ties keep `first` first.
    pub fn from_observations(
        plate: PlateNumber,
        road: RoadId,
        first: &Observation,
        second: &Observation,
        speed: SpeedMph,
    ) -> Self {
        let (earlier, later) = if second.timestamp < first.timestamp {
            (second, first)
        } else {
            (first, second)
        };
        Self {
            plate,
            road,
            mile1: earlier.mile,
            timestamp1: earlier.timestamp,
            mile2: later.mile,
            timestamp2: later.timestamp,
            speed: to_recorded_speed(speed),
        }
    }

    /// Every day the ticketed journey touches.
    pub fn days(&self) -> RangeInclusive<Day> {
        day_of(self.timestamp1)..=day_of(self.timestamp2)
    }
}

pub fn day_of(timestamp: Timestamp) -> Day {
    timestamp / DAY_IN_SECONDS
}

fn to_recorded_speed(speed: SpeedMph) -> RecordedSpeed {
    // Float-to-int `as` casts saturate.
    (speed * 100.0).round() as RecordedSpeed
}
