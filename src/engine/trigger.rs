use super::effect::Effect;
use super::registry::PointRegistry;
use super::slots::{Slot, SlotCounters};
use crate::entities::{GeoPoint, Route};
use crate::error::Error;

/// Owns the computed route and keeps it in step with the start/end roles.
#[derive(Clone, Debug, Default)]
pub struct RouteTrigger {
    route: Option<Route>,
    error: Option<String>,
}

impl RouteTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs after every registry mutation. No memoisation: an unchanged
    /// pair is fetched again and the newer result wins.
    pub fn evaluate(&mut self, registry: &PointRegistry, slots: &mut SlotCounters) -> Vec<Effect> {
        match registry.endpoints() {
            Some((start, end)) => vec![self.fetch(slots, start.clone(), end.clone())],
            None => {
                self.route = None;
                self.error = None;

                let was_pending = slots.is_pending(Slot::Route);
                slots.invalidate(Slot::Route);

                match was_pending {
                    true => vec![Effect::Cancel(Slot::Route)],
                    false => vec![],
                }
            }
        }
    }

    pub fn fetch(&mut self, slots: &mut SlotCounters, start: GeoPoint, end: GeoPoint) -> Effect {
        self.route = None;
        self.error = None;

        let seq = slots.issue(Slot::Route);
        tracing::info!(seq, "fetching route");

        Effect::FetchRoute { seq, start, end }
    }

    pub fn complete(&mut self, slots: &mut SlotCounters, seq: u64, result: Result<Route, Error>) {
        if !slots.complete(Slot::Route, seq) {
            tracing::debug!(seq, "discarding stale route response");
            return;
        }

        match result {
            Ok(route) => {
                tracing::info!(seq, distance = route.total_distance_meters, "route ready");
                self.route = Some(route);
                self.error = None;
            }
            Err(err) => {
                tracing::error!(seq, "route fetch failed: {}", err);
                self.route = None;
                self.error = Some(err.message);
            }
        }
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[test]
fn fetches_only_with_both_endpoints() {
    use crate::entities::{Coordinates, Role};

    let mut registry = PointRegistry::new();
    let mut slots = SlotCounters::new();
    let mut trigger = RouteTrigger::new();

    registry.set_selection(GeoPoint::unlabelled(Coordinates { lat: 1.0, lon: 1.0 }));
    registry.assign_role(Role::Start).unwrap();
    assert!(trigger.evaluate(&registry, &mut slots).is_empty());

    registry.set_selection(GeoPoint::unlabelled(Coordinates { lat: 2.0, lon: 2.0 }));
    registry.assign_role(Role::End).unwrap();

    let effects = trigger.evaluate(&registry, &mut slots);
    assert_eq!(effects.len(), 1);
    assert!(matches!(effects[0], Effect::FetchRoute { .. }));
    assert!(slots.is_pending(Slot::Route));
}

#[test]
fn losing_an_endpoint_cancels_in_flight_fetch() {
    use crate::entities::{Coordinates, Role};
    use geo_types::LineString;

    let mut registry = PointRegistry::new();
    let mut slots = SlotCounters::new();
    let mut trigger = RouteTrigger::new();

    for (lat, role) in [(1.0, Role::Start), (2.0, Role::End)] {
        registry.set_selection(GeoPoint::unlabelled(Coordinates { lat, lon: lat }));
        registry.assign_role(role).unwrap();
    }
    let seq = match trigger.evaluate(&registry, &mut slots).remove(0) {
        Effect::FetchRoute { seq, .. } => seq,
        other => panic!("unexpected effect {:?}", other),
    };

    registry.clear_role(Role::Start);
    assert_eq!(
        trigger.evaluate(&registry, &mut slots),
        vec![Effect::Cancel(Slot::Route)]
    );

    let route = Route {
        total_distance_meters: 10.0,
        path_geometry: LineString::new(vec![]),
    };
    trigger.complete(&mut slots, seq, Ok(route));

    assert!(trigger.route().is_none());
}

#[test]
fn failure_surfaces_message() {
    use crate::entities::Coordinates;
    use crate::error::route_error;

    let mut slots = SlotCounters::new();
    let mut trigger = RouteTrigger::new();
    let a = GeoPoint::unlabelled(Coordinates { lat: 1.0, lon: 1.0 });

    let seq = match trigger.fetch(&mut slots, a.clone(), a) {
        Effect::FetchRoute { seq, .. } => seq,
        other => panic!("unexpected effect {:?}", other),
    };
    trigger.complete(&mut slots, seq, Err(route_error(Some("Graph not loaded yet.".into()))));

    assert!(trigger.route().is_none());
    assert_eq!(trigger.error(), Some("Graph not loaded yet."));
}
