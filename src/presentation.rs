use serde::{Deserialize, Serialize};

use crate::{
    engine::{Session, Slot},
    entities::{Coordinates, GeoPoint, Role, Route, SearchResult},
};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewDirective {
    pub center: Coordinates,
    pub zoom: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Start,
    End,
    Selection,
}

impl From<Role> for MarkerKind {
    fn from(role: Role) -> Self {
        match role {
            Role::Start => Self::Start,
            Role::End => Self::End,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub kind: MarkerKind,
    pub position: Coordinates,
    pub popup: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Loading {
    pub selection: bool,
    pub search: bool,
    pub route: bool,
}

/// Everything a map front-end needs to draw one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub markers: Vec<Marker>,
    pub route: Option<Route>,
    pub route_summary: Option<String>,
    /// Present only on the frame where the view has to move.
    pub view: Option<ViewDirective>,
    pub point_info: Vec<String>,
    pub query: String,
    pub search_results: Vec<SearchResult>,
    pub loading: Loading,
    pub error: Option<String>,
    pub prompt: Option<String>,
}

fn role_marker(role: Role, point: &GeoPoint) -> Marker {
    let popup = match role {
        Role::Start => "Start Point",
        Role::End => "End Point",
    };

    Marker {
        kind: role.into(),
        position: point.coordinates(),
        popup: popup.into(),
    }
}

fn point_info(role: Role, point: Option<&GeoPoint>) -> String {
    match point {
        Some(point) => format!("{}: {}", role.title(), point.coordinate_label()),
        None => format!("{}: Click map or search", role.title()),
    }
}

/// Derives a scene from session state. `view` is the directive taken from
/// the session for this frame, if any.
pub fn render(session: &Session, view: Option<ViewDirective>) -> Scene {
    let mut markers = vec![];

    for role in [Role::Start, Role::End] {
        if let Some(point) = session.role(role) {
            markers.push(role_marker(role, point));
        }
    }

    if let Some(point) = session.selection() {
        markers.push(Marker {
            kind: MarkerKind::Selection,
            position: point.coordinates(),
            popup: point.display_label(),
        });
    }

    let route = session.route().cloned();

    Scene {
        markers,
        route_summary: route.as_ref().map(|route| route.distance_summary()),
        route,
        view,
        point_info: vec![
            point_info(Role::Start, session.role(Role::Start)),
            point_info(Role::End, session.role(Role::End)),
        ],
        query: session.query().into(),
        search_results: session.results().to_vec(),
        loading: Loading {
            selection: session.is_loading(Slot::Selection),
            search: session.is_loading(Slot::Search),
            route: session.is_loading(Slot::Route),
        },
        error: session.route_error().map(String::from),
        prompt: session.prompt().map(String::from),
    }
}

#[test]
fn empty_session_scene() {
    use crate::config::SessionConfig;

    let session = Session::new(SessionConfig::default());
    let scene = render(&session, None);

    assert!(scene.markers.is_empty());
    assert!(scene.route.is_none());
    assert_eq!(
        scene.point_info,
        vec!["Start: Click map or search", "End: Click map or search"]
    );
    assert_eq!(scene.loading, Loading::default());
}

#[test]
fn markers_are_role_tagged() {
    use crate::config::SessionConfig;

    let mut session = Session::new(SessionConfig::default());

    session.pick(SearchResult {
        name: "Namsan Tower".into(),
        category: "landmark".into(),
        address: "N/A".into(),
        location: Coordinates { lat: 37.55119, lon: 126.98823 },
    });
    session.assign_role(Role::Start);
    session.click(Coordinates { lat: 37.5, lon: 127.0 });

    let view = session.take_view_directive();
    let scene = render(&session, view);

    let kinds: Vec<MarkerKind> = scene.markers.iter().map(|m| m.kind).collect();
    assert_eq!(kinds, vec![MarkerKind::Start, MarkerKind::Selection]);
    assert_eq!(scene.markers[0].popup, "Start Point");
    assert_eq!(scene.markers[1].popup, "37.50000, 127.00000");
    assert_eq!(scene.point_info[0], "Start: 37.55119, 126.98823");
    assert!(scene.loading.selection);
    assert_eq!(
        scene.view,
        Some(ViewDirective {
            center: Coordinates { lat: 37.5, lon: 127.0 },
            zoom: 16
        })
    );
}

#[test]
fn scene_serializes_route_as_geojson() {
    use crate::config::SessionConfig;
    use crate::engine::Effect;

    let mut session = Session::new(SessionConfig::default());
    let mut seq = 0;

    for (lat, role) in [(1.0, Role::Start), (2.0, Role::End)] {
        session.pick(SearchResult {
            name: "p".into(),
            category: "unknown".into(),
            address: "N/A".into(),
            location: Coordinates { lat, lon: lat },
        });
        for effect in session.assign_role(role) {
            if let Effect::FetchRoute { seq: issued, .. } = effect {
                seq = issued;
            }
        }
    }
    session.complete_route(
        seq,
        Ok(Route {
            total_distance_meters: 2500.0,
            path_geometry: geo_types::LineString::from(vec![(1.0, 1.0), (2.0, 2.0)]),
        }),
    );

    let scene = render(&session, None);
    let json = serde_json::to_value(&scene).unwrap();

    assert_eq!(scene.route_summary.as_deref(), Some("2.50 km"));
    assert_eq!(json["route"]["path_geometry"]["type"], "LineString");
    assert_eq!(
        json["route"]["path_geometry"]["coordinates"],
        serde_json::json!([[1.0, 1.0], [2.0, 2.0]])
    );
}
