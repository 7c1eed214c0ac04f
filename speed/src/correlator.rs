use crate::ledger::TicketLedger;
use crate::models::{Camera, Observation, Ticket};
use crate::types::{PlateNumber, RoadId, SpeedMph};
use std::collections::HashMap;

/// Every sighting ever reported, grouped by road and then plate.
///
/// Sightings are only appended. A camera that reports the same plate twice keeps both, so a
/// partner camera reporting later can still pair with either of them.
#[derive(Debug, Default)]
pub struct ObservationLog {
    roads: HashMap<RoadId, HashMap<PlateNumber, Vec<Observation>>>,
}
impl ObservationLog {
    /// Records a sighting from `camera` and returns the ticket it triggers, if any.
    ///
    /// Earlier sightings of the plate on the same road by other cameras are checked in the order
    /// they were reported; the first pair at or above the limit whose days are all unclaimed in
    /// `ledger` is ticketed and its days claimed. At most one ticket comes out of each call.
    pub fn record(
        &mut self,
        camera: &Camera,
        plate: PlateNumber,
        observation: Observation,
        ledger: &mut TicketLedger,
    ) -> Option<Ticket> {
        let sightings = self
            .roads
            .entry(camera.road)
            .or_default()
            .entry(plate.clone())
            .or_default();

        let ticket = sightings
            .iter()
            .filter(|previous| previous.camera != observation.camera)
            .find_map(|previous| {
                let speed = observation.speed_between(previous)?;
                if speed < SpeedMph::from(camera.limit) {
                    return None;
                }
                let ticket = Ticket::from_observations(plate.clone(), camera.road, previous, &observation, speed);
                ledger.try_claim(&plate, ticket.days()).then_some(ticket)
            });

        sightings.push(observation);
        ticket
    }

    #[cfg(test)]
    pub fn sightings(&self, road: RoadId, plate: &str) -> &[Observation] {
        self.roads
            .get(&road)
            .and_then(|plates| plates.get(plate))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
