use std::collections::HashMap;
use std::future::Future;

use async_channel::{Receiver, Sender};
use futures::future::{AbortHandle, Abortable};
use tokio::sync::oneshot;

use super::effect::Effect;
use super::session::{Input, Session};
use super::slots::Slot;
use crate::{
    api::DynAPI,
    config::SessionConfig,
    entities::{Coordinates, Role, SearchResult},
    error::Error,
    presentation::{self, Scene},
};

enum Message {
    Input(Input),
    Snapshot(oneshot::Sender<Scene>),
}

/// Starts sessions against one set of remote services.
pub struct Engine {
    api: DynAPI,
    config: SessionConfig,
}

impl Engine {
    pub fn new(api: DynAPI, config: SessionConfig) -> Self {
        Self { api, config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Spawns the session task. It stops once every handle is dropped.
    #[tracing::instrument(name = "Engine::start_session", skip(self))]
    pub fn start_session(&self) -> SessionHandle {
        let (sender, inbox) = async_channel::unbounded();
        let (completions_sender, completions) = async_channel::unbounded();

        let worker = Worker {
            api: self.api.clone(),
            session: Session::new(self.config.clone()),
            completions: completions_sender,
            in_flight: HashMap::new(),
            debounce: None,
        };

        tokio::spawn(worker.run(inbox, completions));

        SessionHandle { sender }
    }
}

/// Front door to a running session. Cheap to clone.
#[derive(Clone)]
pub struct SessionHandle {
    sender: Sender<Message>,
}

impl SessionHandle {
    pub async fn send(&self, input: Input) -> Result<(), Error> {
        self.sender.send(Message::Input(input)).await?;
        Ok(())
    }

    pub async fn click(&self, coordinates: Coordinates) -> Result<(), Error> {
        self.send(Input::Click(coordinates)).await
    }

    pub async fn submit_query(&self, text: String) -> Result<(), Error> {
        self.send(Input::SubmitQuery(text)).await
    }

    pub async fn pick(&self, result: SearchResult) -> Result<(), Error> {
        self.send(Input::Pick(result)).await
    }

    pub async fn clear_selection(&self) -> Result<(), Error> {
        self.send(Input::ClearSelection).await
    }

    pub async fn assign_role(&self, role: Role) -> Result<(), Error> {
        self.send(Input::AssignRole(role)).await
    }

    pub async fn clear_role(&self, role: Role) -> Result<(), Error> {
        self.send(Input::ClearRole(role)).await
    }

    pub async fn request_route(&self) -> Result<(), Error> {
        self.send(Input::RequestRoute).await
    }

    /// Renders the current state, consuming any pending view directive.
    pub async fn scene(&self) -> Result<Scene, Error> {
        let (reply, response) = oneshot::channel();
        self.sender.send(Message::Snapshot(reply)).await?;

        Ok(response.await?)
    }
}

/// Owns the session; the only place its state is mutated.
struct Worker {
    api: DynAPI,
    session: Session,
    completions: Sender<Input>,
    in_flight: HashMap<Slot, AbortHandle>,
    debounce: Option<AbortHandle>,
}

fn spawn_abortable<F>(future: F) -> AbortHandle
where
    F: Future<Output = ()> + Send + 'static,
{
    let (handle, registration) = AbortHandle::new_pair();
    tokio::spawn(Abortable::new(future, registration));
    handle
}

impl Worker {
    async fn run(mut self, inbox: Receiver<Message>, completions: Receiver<Input>) {
        tracing::debug!("session started");

        loop {
            let message = tokio::select! {
                message = inbox.recv() => match message {
                    Ok(message) => message,
                    Err(_) => break,
                },
                Ok(input) = completions.recv() => Message::Input(input),
            };

            match message {
                Message::Input(input) => {
                    for effect in self.session.apply(input) {
                        self.execute(effect);
                    }
                }
                Message::Snapshot(reply) => {
                    let view = self.session.take_view_directive();
                    let _ = reply.send(presentation::render(&self.session, view));
                }
            }
        }

        for (_, handle) in self.in_flight.drain() {
            handle.abort();
        }
        self.cancel_debounce();

        tracing::debug!("session closed");
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::ReverseGeocode { seq, coordinates } => {
                let api = self.api.clone();
                let completions = self.completions.clone();

                self.track(
                    Slot::Selection,
                    spawn_abortable(async move {
                        let result = api.reverse_geocode(coordinates).await;
                        let _ = completions
                            .send(Input::ReverseGeocoded {
                                seq,
                                coordinates,
                                result,
                            })
                            .await;
                    }),
                );
            }
            Effect::Search { seq, text } => {
                let api = self.api.clone();
                let completions = self.completions.clone();

                self.track(
                    Slot::Search,
                    spawn_abortable(async move {
                        let result = api.search(text).await;
                        let _ = completions.send(Input::Searched { seq, result }).await;
                    }),
                );
            }
            Effect::FetchRoute { seq, start, end } => {
                let api = self.api.clone();
                let completions = self.completions.clone();

                self.track(
                    Slot::Route,
                    spawn_abortable(async move {
                        let result = api
                            .fetch_route(start.coordinates(), end.coordinates())
                            .await;
                        let _ = completions.send(Input::Routed { seq, result }).await;
                    }),
                );
            }
            Effect::ScheduleDebounce { ticket, delay } => {
                self.cancel_debounce();

                let completions = self.completions.clone();
                self.debounce = Some(spawn_abortable(async move {
                    tokio::time::sleep(delay).await;
                    let _ = completions.send(Input::DebounceElapsed(ticket)).await;
                }));
            }
            Effect::CancelDebounce => self.cancel_debounce(),
            Effect::Cancel(slot) => {
                if let Some(handle) = self.in_flight.remove(&slot) {
                    tracing::debug!(?slot, "aborting superseded request");
                    handle.abort();
                }
            }
        }
    }

    /// At most one live transport call per slot.
    fn track(&mut self, slot: Slot, handle: AbortHandle) {
        if let Some(previous) = self.in_flight.insert(slot, handle) {
            previous.abort();
        }
    }

    fn cancel_debounce(&mut self) {
        if let Some(handle) = self.debounce.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn debounced_keystrokes_issue_one_search() {
    use super::mock::{Call, MockAPI};
    use std::time::Duration;

    let api = MockAPI::new();
    let engine = Engine::new(api.clone(), SessionConfig::default());
    let session = engine.start_session();

    session.submit_query("a".into()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    session.submit_query("ab".into()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    session.submit_query("abc".into()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(api.calls().is_empty());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(api.calls(), vec![Call::Search("abc".into())]);

    let scene = session.scene().await.unwrap();
    assert_eq!(scene.search_results.len(), 1);
    assert_eq!(scene.search_results[0].name, "abc result");
    assert!(!scene.loading.search);
}

#[tokio::test(start_paused = true)]
async fn second_click_aborts_slow_first_lookup() {
    use super::mock::{Call, MockAPI};
    use std::time::Duration;

    let api = MockAPI::new();
    api.delay_reverse(vec![Duration::from_millis(200), Duration::from_millis(10)]);
    let engine = Engine::new(api.clone(), SessionConfig::default());
    let session = engine.start_session();

    session.click(Coordinates { lat: 10.0, lon: 10.0 }).await.unwrap();
    settle().await;
    session.click(Coordinates { lat: 20.0, lon: 20.0 }).await.unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(
        api.calls(),
        vec![
            Call::Reverse(Coordinates { lat: 10.0, lon: 10.0 }),
            Call::Reverse(Coordinates { lat: 20.0, lon: 20.0 }),
        ]
    );

    let scene = session.scene().await.unwrap();
    assert_eq!(scene.markers.len(), 1);
    assert_eq!(scene.markers[0].popup, "Place at 20.0");
}

#[tokio::test(start_paused = true)]
async fn stale_label_arriving_after_newer_click_is_discarded() {
    use super::mock::MockAPI;
    use std::time::Duration;

    let engine = Engine::new(MockAPI::new(), SessionConfig::default());
    let session = engine.start_session();

    session.click(Coordinates { lat: 10.0, lon: 10.0 }).await.unwrap();
    settle().await;
    session.click(Coordinates { lat: 20.0, lon: 20.0 }).await.unwrap();
    settle().await;

    // answer to the first click, delivered after the second one resolved
    session
        .send(Input::ReverseGeocoded {
            seq: 1,
            coordinates: Coordinates { lat: 10.0, lon: 10.0 },
            result: Ok("Old place".into()),
        })
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;

    let scene = session.scene().await.unwrap();
    assert_eq!(scene.markers.len(), 1);
    assert_eq!(scene.markers[0].position, Coordinates { lat: 20.0, lon: 20.0 });
    assert_eq!(scene.markers[0].popup, "Place at 20.0");
    assert!(!scene.loading.selection);
}

#[tokio::test(start_paused = true)]
async fn both_roles_fetch_a_route() {
    use super::mock::{Call, MockAPI};
    use crate::presentation::MarkerKind;

    let api = MockAPI::new();
    let engine = Engine::new(api.clone(), SessionConfig::default());
    let session = engine.start_session();
    let a = Coordinates { lat: 37.55, lon: 126.97 };
    let b = Coordinates { lat: 37.57, lon: 126.99 };

    session.click(a).await.unwrap();
    settle().await;
    session.assign_role(Role::Start).await.unwrap();
    session.click(b).await.unwrap();
    settle().await;
    session.assign_role(Role::End).await.unwrap();
    settle().await;

    let routes: Vec<Call> = api
        .calls()
        .into_iter()
        .filter(|call| matches!(call, Call::Route(..)))
        .collect();
    assert_eq!(routes, vec![Call::Route(a, b)]);

    let scene = session.scene().await.unwrap();
    let kinds: Vec<MarkerKind> = scene.markers.iter().map(|m| m.kind).collect();
    assert_eq!(kinds, vec![MarkerKind::Start, MarkerKind::End]);
    assert!(scene.route.is_some());
    assert_eq!(scene.error, None);

    session.clear_role(Role::End).await.unwrap();
    let scene = session.scene().await.unwrap();
    assert!(scene.route.is_none());
}

#[tokio::test(start_paused = true)]
async fn route_failure_reaches_the_scene() {
    use super::mock::MockAPI;

    let api = MockAPI::new();
    api.fail_route("No path found between the road segments.");
    let engine = Engine::new(api.clone(), SessionConfig::default());
    let session = engine.start_session();

    for (lat, role) in [(1.0, Role::Start), (2.0, Role::End)] {
        session.click(Coordinates { lat, lon: lat }).await.unwrap();
        session.assign_role(role).await.unwrap();
    }
    settle().await;

    let scene = session.scene().await.unwrap();
    assert!(scene.route.is_none());
    assert_eq!(
        scene.error.as_deref(),
        Some("No path found between the road segments.")
    );
}

#[tokio::test(start_paused = true)]
async fn reverse_failure_degrades_to_coordinates() {
    use super::mock::MockAPI;

    let api = MockAPI::new();
    api.fail_reverse();
    let engine = Engine::new(api.clone(), SessionConfig::default());
    let session = engine.start_session();

    session.click(Coordinates { lat: 12.3, lon: 45.6 }).await.unwrap();
    settle().await;

    let scene = session.scene().await.unwrap();
    assert_eq!(scene.markers[0].popup, "12.30000, 45.60000");
    assert!(scene.error.is_none());
}
