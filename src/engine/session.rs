use super::debounce::{DebounceAction, DebouncedQuery};
use super::effect::Effect;
use super::registry::PointRegistry;
use super::slots::{Slot, SlotCounters};
use super::trigger::RouteTrigger;
use crate::{
    config::SessionConfig,
    entities::{Coordinates, GeoPoint, Role, Route, SearchResult},
    error::Error,
    presentation::ViewDirective,
};

pub const SELECT_BOTH_POINTS_PROMPT: &str = "select both points first";

/// Everything that can happen to a session: user input or a network
/// completion stamped with the sequence number it was issued under.
#[derive(Clone, Debug)]
pub enum Input {
    Click(Coordinates),
    SubmitQuery(String),
    DebounceElapsed(u64),
    Pick(SearchResult),
    ClearSelection,
    AssignRole(Role),
    ClearRole(Role),
    RequestRoute,
    ReverseGeocoded {
        seq: u64,
        coordinates: Coordinates,
        result: Result<String, Error>,
    },
    Searched {
        seq: u64,
        result: Result<Vec<SearchResult>, Error>,
    },
    Routed {
        seq: u64,
        result: Result<Route, Error>,
    },
}

/// Client-side orchestration state for one user session.
///
/// Every method runs to completion without I/O and returns the effects the
/// caller has to perform. Stale completions are dropped here, so the order
/// in which the runtime delivers them does not matter.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    registry: PointRegistry,
    slots: SlotCounters,
    query: DebouncedQuery,
    trigger: RouteTrigger,
    prompt: Option<String>,
    view: ViewDirective,
    view_directive: Option<ViewDirective>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let view = ViewDirective {
            center: config.default_center,
            zoom: config.default_zoom,
        };

        Self {
            query: DebouncedQuery::new(config.debounce, config.min_query_len),
            config,
            registry: PointRegistry::new(),
            slots: SlotCounters::new(),
            trigger: RouteTrigger::new(),
            prompt: None,
            view,
            view_directive: None,
        }
    }

    pub fn apply(&mut self, input: Input) -> Vec<Effect> {
        match input {
            Input::Click(coordinates) => self.click(coordinates),
            Input::SubmitQuery(text) => self.submit_query(text),
            Input::DebounceElapsed(ticket) => self.debounce_elapsed(ticket),
            Input::Pick(result) => self.pick(result),
            Input::ClearSelection => self.clear_selection(),
            Input::AssignRole(role) => self.assign_role(role),
            Input::ClearRole(role) => self.clear_role(role),
            Input::RequestRoute => self.request_route(),
            Input::ReverseGeocoded {
                seq,
                coordinates,
                result,
            } => {
                self.complete_reverse_geocode(seq, coordinates, result);
                vec![]
            }
            Input::Searched { seq, result } => {
                self.complete_search(seq, result);
                vec![]
            }
            Input::Routed { seq, result } => {
                self.complete_route(seq, result);
                vec![]
            }
        }
    }

    /// Selects the clicked position right away; its label follows once the
    /// reverse-geocode answers.
    #[tracing::instrument(skip(self))]
    pub fn click(&mut self, coordinates: Coordinates) -> Vec<Effect> {
        self.prompt = None;
        self.registry.set_selection(GeoPoint::unlabelled(coordinates));
        self.recenter(coordinates, self.view.zoom);

        let seq = self.slots.issue(Slot::Selection);

        vec![Effect::ReverseGeocode { seq, coordinates }]
    }

    pub fn complete_reverse_geocode(
        &mut self,
        seq: u64,
        coordinates: Coordinates,
        result: Result<String, Error>,
    ) {
        if !self.slots.complete(Slot::Selection, seq) {
            tracing::debug!(seq, "discarding stale reverse-geocode response");
            return;
        }

        let label = match result {
            Ok(name) => name,
            Err(err) => {
                tracing::warn!(seq, "reverse-geocode failed, using coordinates: {}", err);
                coordinates.label()
            }
        };

        self.registry
            .set_selection(GeoPoint::new(coordinates, Some(label)));
    }

    #[tracing::instrument(skip(self))]
    pub fn submit_query(&mut self, text: String) -> Vec<Effect> {
        match self.query.submit(text) {
            DebounceAction::Schedule { ticket, delay } => {
                vec![Effect::ScheduleDebounce { ticket, delay }]
            }
            DebounceAction::Clear => {
                self.slots.invalidate(Slot::Search);
                vec![Effect::CancelDebounce, Effect::Cancel(Slot::Search)]
            }
        }
    }

    pub fn debounce_elapsed(&mut self, ticket: u64) -> Vec<Effect> {
        match self.query.elapsed(ticket) {
            Some(text) => {
                let seq = self.slots.issue(Slot::Search);
                tracing::debug!(seq, "searching for {:?}", text);

                vec![Effect::Search { seq, text }]
            }
            None => vec![],
        }
    }

    pub fn complete_search(&mut self, seq: u64, result: Result<Vec<SearchResult>, Error>) {
        if !self.slots.complete(Slot::Search, seq) {
            tracing::debug!(seq, "discarding stale search response");
            return;
        }

        match result {
            Ok(results) => self.query.set_results(results),
            Err(err) => {
                tracing::warn!(seq, "search failed: {}", err);
                self.query.set_results(vec![]);
            }
        }
    }

    /// Selects a search result and closes the search.
    #[tracing::instrument(skip(self))]
    pub fn pick(&mut self, result: SearchResult) -> Vec<Effect> {
        self.prompt = None;
        self.query.reset();
        self.slots.invalidate(Slot::Search);
        self.slots.invalidate(Slot::Selection);

        self.registry
            .set_selection(GeoPoint::new(result.location, Some(result.name)));
        self.recenter(result.location, self.config.search_zoom);

        vec![
            Effect::CancelDebounce,
            Effect::Cancel(Slot::Search),
            Effect::Cancel(Slot::Selection),
        ]
    }

    pub fn clear_selection(&mut self) -> Vec<Effect> {
        self.registry.clear_selection();
        self.drop_selection_request()
    }

    /// Promotes the selection. Without one this is a no-op.
    #[tracing::instrument(skip(self))]
    pub fn assign_role(&mut self, role: Role) -> Vec<Effect> {
        let point = match self.registry.assign_role(role) {
            Ok(point) => point,
            Err(err) => {
                tracing::info!("ignoring {} assignment: {}", role.name(), err.message);
                return vec![];
            }
        };

        self.prompt = None;
        self.recenter(point.coordinates(), self.view.zoom);

        let mut effects = self.drop_selection_request();
        effects.extend(self.trigger.evaluate(&self.registry, &mut self.slots));
        effects
    }

    #[tracing::instrument(skip(self))]
    pub fn clear_role(&mut self, role: Role) -> Vec<Effect> {
        self.registry.clear_role(role);
        self.trigger.evaluate(&self.registry, &mut self.slots)
    }

    /// Explicit "get route" request.
    pub fn request_route(&mut self) -> Vec<Effect> {
        match self.registry.endpoints() {
            Some((start, end)) => {
                let (start, end) = (start.clone(), end.clone());
                self.prompt = None;
                vec![self.trigger.fetch(&mut self.slots, start, end)]
            }
            None => {
                tracing::info!("route requested without both points");
                self.prompt = Some(SELECT_BOTH_POINTS_PROMPT.into());
                vec![]
            }
        }
    }

    pub fn complete_route(&mut self, seq: u64, result: Result<Route, Error>) {
        self.trigger.complete(&mut self.slots, seq, result);
    }

    /// Hands out the pending recenter, once.
    pub fn take_view_directive(&mut self) -> Option<ViewDirective> {
        self.view_directive.take()
    }

    pub fn selection(&self) -> Option<&GeoPoint> {
        self.registry.selection()
    }

    pub fn role(&self, role: Role) -> Option<&GeoPoint> {
        self.registry.role(role)
    }

    pub fn route(&self) -> Option<&Route> {
        self.trigger.route()
    }

    pub fn route_error(&self) -> Option<&str> {
        self.trigger.error()
    }

    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    pub fn query(&self) -> &str {
        self.query.query()
    }

    pub fn results(&self) -> &[SearchResult] {
        self.query.results()
    }

    pub fn is_loading(&self, slot: Slot) -> bool {
        self.slots.is_pending(slot)
    }

    fn drop_selection_request(&mut self) -> Vec<Effect> {
        let was_pending = self.slots.is_pending(Slot::Selection);
        self.slots.invalidate(Slot::Selection);

        match was_pending {
            true => vec![Effect::Cancel(Slot::Selection)],
            false => vec![],
        }
    }

    fn recenter(&mut self, center: Coordinates, zoom: u8) {
        let next = ViewDirective { center, zoom };

        if next != self.view {
            self.view = next;
            self.view_directive = Some(next);
        }
    }
}

#[cfg(test)]
fn issued_seq(effects: &[Effect]) -> u64 {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::ReverseGeocode { seq, .. }
            | Effect::Search { seq, .. }
            | Effect::FetchRoute { seq, .. } => Some(*seq),
            _ => None,
        })
        .expect("no request issued")
}

#[cfg(test)]
fn select_and_assign(session: &mut Session, lat: f64, lon: f64, role: Role) -> Vec<Effect> {
    session.pick(SearchResult {
        name: format!("{},{}", lat, lon),
        category: "unknown".into(),
        address: "N/A".into(),
        location: Coordinates { lat, lon },
    });
    session.assign_role(role)
}

#[cfg(test)]
fn sample_route(meters: f64) -> Route {
    Route {
        total_distance_meters: meters,
        path_geometry: geo_types::LineString::from(vec![(126.97, 37.56), (126.98, 37.57)]),
    }
}

#[test]
fn out_of_order_reverse_geocode_keeps_latest_click() {
    let mut session = Session::new(SessionConfig::default());
    let first = Coordinates { lat: 10.0, lon: 10.0 };
    let second = Coordinates { lat: 20.0, lon: 20.0 };

    let first_seq = issued_seq(&session.click(first));
    let second_seq = issued_seq(&session.click(second));

    session.complete_reverse_geocode(second_seq, second, Ok("Second".into()));
    session.complete_reverse_geocode(first_seq, first, Ok("First".into()));

    let selection = session.selection().unwrap();
    assert_eq!(selection.coordinates(), second);
    assert_eq!(selection.label.as_deref(), Some("Second"));
    assert!(!session.is_loading(Slot::Selection));
}

#[test]
fn reverse_geocode_failure_falls_back_to_coordinates() {
    use crate::error::upstream_error;

    let mut session = Session::new(SessionConfig::default());
    let clicked = Coordinates { lat: 12.3, lon: 45.6 };

    let seq = issued_seq(&session.click(clicked));
    assert_eq!(session.selection().unwrap().label, None);

    session.complete_reverse_geocode(seq, clicked, Err(upstream_error()));

    assert_eq!(
        session.selection().unwrap().label.as_deref(),
        Some("12.30000, 45.60000")
    );
}

#[test]
fn assign_role_consumes_selection() {
    let mut session = Session::new(SessionConfig::default());
    let clicked = Coordinates { lat: 1.0, lon: 2.0 };

    let seq = issued_seq(&session.click(clicked));
    session.complete_reverse_geocode(seq, clicked, Ok("P".into()));
    let selected = session.selection().cloned();

    assert!(session.assign_role(Role::Start).is_empty());
    assert_eq!(session.selection(), None);
    assert_eq!(session.role(Role::Start).cloned(), selected);

    // second assignment without a selection changes nothing
    assert!(session.assign_role(Role::Start).is_empty());
    assert_eq!(session.role(Role::Start).cloned(), selected);
    assert_eq!(session.selection(), None);
    assert_eq!(session.prompt(), None);
}

#[test]
fn late_label_does_not_resurrect_assigned_selection() {
    let mut session = Session::new(SessionConfig::default());
    let clicked = Coordinates { lat: 1.0, lon: 2.0 };

    let seq = issued_seq(&session.click(clicked));
    let effects = session.assign_role(Role::End);
    assert_eq!(effects, vec![Effect::Cancel(Slot::Selection)]);

    session.complete_reverse_geocode(seq, clicked, Ok("Late".into()));

    assert_eq!(session.selection(), None);
    assert_eq!(session.role(Role::End).unwrap().label, None);
}

#[test]
fn clearing_a_role_drops_the_route() {
    let mut session = Session::new(SessionConfig::default());

    select_and_assign(&mut session, 1.0, 1.0, Role::Start);
    let seq = issued_seq(&select_and_assign(&mut session, 2.0, 2.0, Role::End));
    session.complete_route(seq, Ok(sample_route(1500.0)));
    assert!(session.route().is_some());

    assert!(session.clear_role(Role::Start).is_empty());

    assert!(session.route().is_none());
    assert!(session.role(Role::Start).is_none());
}

#[test]
fn second_endpoint_triggers_exactly_one_fetch() {
    let mut session = Session::new(SessionConfig::default());

    let effects = select_and_assign(&mut session, 1.0, 1.0, Role::Start);
    assert!(!effects
        .iter()
        .any(|e| matches!(e, Effect::FetchRoute { .. })));

    let effects = select_and_assign(&mut session, 2.0, 2.0, Role::End);
    let fetches: Vec<_> = effects
        .iter()
        .filter(|e| matches!(e, Effect::FetchRoute { .. }))
        .collect();
    assert_eq!(fetches.len(), 1);
    let seq = issued_seq(&effects);
    session.complete_route(seq, Ok(sample_route(1500.0)));

    // moving the start issues one more fetch and drops the old route at once
    let effects = select_and_assign(&mut session, 3.0, 3.0, Role::Start);
    let fetches: Vec<_> = effects
        .iter()
        .filter_map(|e| match e {
            Effect::FetchRoute { start, end, .. } => Some((start.latitude, end.latitude)),
            _ => None,
        })
        .collect();
    assert_eq!(fetches, vec![(3.0, 2.0)]);
    assert!(session.route().is_none());
    assert!(session.is_loading(Slot::Route));

    // the superseded response cannot come back
    session.complete_route(seq, Ok(sample_route(1500.0)));
    assert!(session.route().is_none());
}

#[test]
fn route_failure_is_surfaced() {
    use crate::error::route_error;

    let mut session = Session::new(SessionConfig::default());

    select_and_assign(&mut session, 1.0, 1.0, Role::Start);
    let seq = issued_seq(&select_and_assign(&mut session, 1.0, 1.0, Role::End));
    session.complete_route(
        seq,
        Err(route_error(Some("Could not snap points to the road network.".into()))),
    );

    assert!(session.route().is_none());
    assert_eq!(
        session.route_error(),
        Some("Could not snap points to the road network.")
    );
}

#[test]
fn request_route_needs_both_points() {
    let mut session = Session::new(SessionConfig::default());

    select_and_assign(&mut session, 1.0, 1.0, Role::Start);
    assert!(session.request_route().is_empty());
    assert_eq!(session.prompt(), Some(SELECT_BOTH_POINTS_PROMPT));

    select_and_assign(&mut session, 2.0, 2.0, Role::End);
    assert_eq!(session.prompt(), None);

    // no memoisation: asking again issues another request
    let seq_before = session.slots.latest(Slot::Route);
    let effects = session.request_route();
    assert_eq!(issued_seq(&effects), seq_before + 1);
}

#[test]
fn short_query_cancels_search() {
    use std::time::Duration;

    let mut session = Session::new(SessionConfig::default());

    let ticket = match session.submit_query("gangnam".into()).remove(0) {
        Effect::ScheduleDebounce { ticket, delay } => {
            assert_eq!(delay, Duration::from_millis(300));
            ticket
        }
        other => panic!("unexpected effect {:?}", other),
    };
    let seq = issued_seq(&session.debounce_elapsed(ticket));
    assert!(session.is_loading(Slot::Search));

    let effects = session.submit_query("g".into());
    assert_eq!(
        effects,
        vec![Effect::CancelDebounce, Effect::Cancel(Slot::Search)]
    );
    assert!(!session.is_loading(Slot::Search));

    session.complete_search(
        seq,
        Ok(vec![SearchResult {
            name: "Gangnam Station".into(),
            category: "station".into(),
            address: "N/A".into(),
            location: Coordinates { lat: 37.49, lon: 127.02 },
        }]),
    );
    assert!(session.results().is_empty());
}

#[test]
fn search_failure_yields_empty_results() {
    use crate::error::upstream_error;

    let mut session = Session::new(SessionConfig::default());

    let ticket = match session.submit_query("jongno".into()).remove(0) {
        Effect::ScheduleDebounce { ticket, .. } => ticket,
        other => panic!("unexpected effect {:?}", other),
    };
    let seq = issued_seq(&session.debounce_elapsed(ticket));
    session.complete_search(seq, Err(upstream_error()));

    assert!(session.results().is_empty());
    assert!(!session.is_loading(Slot::Search));
    assert_eq!(session.route_error(), None);
}

#[test]
fn pick_selects_and_recenters() {
    let mut session = Session::new(SessionConfig::default());
    let config = SessionConfig::default();

    let clicked = Coordinates { lat: 5.0, lon: 5.0 };
    let click_seq = issued_seq(&session.click(clicked));
    assert_eq!(
        session.take_view_directive(),
        Some(ViewDirective {
            center: clicked,
            zoom: config.default_zoom
        })
    );
    assert_eq!(session.take_view_directive(), None);

    session.submit_query("city hall".into());
    session.pick(SearchResult {
        name: "City Hall".into(),
        category: "landmark".into(),
        address: "N/A".into(),
        location: Coordinates { lat: 37.56, lon: 126.97 },
    });

    assert_eq!(session.query(), "");
    assert_eq!(
        session.selection().unwrap().label.as_deref(),
        Some("City Hall")
    );
    assert_eq!(session.take_view_directive().unwrap().zoom, config.search_zoom);

    // the earlier click's label must not overwrite the picked place
    session.complete_reverse_geocode(click_seq, clicked, Ok("Somewhere".into()));
    assert_eq!(
        session.selection().unwrap().label.as_deref(),
        Some("City Hall")
    );
}
