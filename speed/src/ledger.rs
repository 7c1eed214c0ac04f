use crate::types::{Day, PlateNumber};
use std::collections::{HashMap, HashSet};
use std::ops::RangeInclusive;

/// Days per plate that already have a ticket, issued or still pending.
#[derive(Debug, Default)]
pub struct TicketLedger {
    days_issued: HashMap<PlateNumber, HashSet<Day>>,
}
impl TicketLedger {
    pub fn is_day_claimed(&self, plate: &str, day: Day) -> bool {
        self.days_issued
            .get(plate)
            .is_some_and(|days| days.contains(&day))
    }

    pub fn is_any_day_claimed(&self, plate: &str, days: RangeInclusive<Day>) -> bool {
        match self.days_issued.get(plate) {
            Some(claimed) => days.into_iter().any(|day| claimed.contains(&day)),
            None => false,
        }
    }

    pub fn claim_days(&mut self, plate: &str, days: RangeInclusive<Day>) {
        self.days_issued.entry(plate.to_owned()).or_default().extend(days);
    }

    /// Claims every day in the range unless any of them is already claimed.
    pub fn try_claim(&mut self, plate: &str, days: RangeInclusive<Day>) -> bool {
        if self.is_any_day_claimed(plate, days.clone()) {
            return false;
        }
        self.claim_days(plate, days);
        true
    }
}
