use std::time::Duration;

use super::slots::Slot;
use crate::entities::{Coordinates, GeoPoint};

/// I/O the session asks its runtime to perform. Results come back through
/// the matching `Session::complete_*` call carrying the same `seq`.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    ReverseGeocode { seq: u64, coordinates: Coordinates },
    Search { seq: u64, text: String },
    FetchRoute { seq: u64, start: GeoPoint, end: GeoPoint },
    ScheduleDebounce { ticket: u64, delay: Duration },
    CancelDebounce,
    /// The slot's in-flight request is dead; aborting the transport is optional.
    Cancel(Slot),
}
