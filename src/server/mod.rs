mod handlers;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{delete, get, post},
    Router,
};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::engine::{Engine, SessionHandle};
use crate::error::{invalid_input_error, unexpected_error, Error};
use crate::server::handlers::sessions;

struct SessionEntry {
    handle: SessionHandle,
    touched: Instant,
}

/// Live sessions keyed by the token handed to the front-end.
pub struct AppState {
    engine: Engine,
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
}

type DynState = Arc<AppState>;

impl AppState {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn open(&self) -> Uuid {
        self.evict_idle().await;

        let token = Uuid::new_v4();
        let entry = SessionEntry {
            handle: self.engine.start_session(),
            touched: Instant::now(),
        };

        self.sessions.write().await.insert(token, entry);
        tracing::info!(%token, "session opened");

        token
    }

    /// Looks a session up and marks it as used.
    pub async fn session(&self, token: Uuid) -> Result<SessionHandle, Error> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&token).ok_or_else(invalid_input_error)?;

        entry.touched = Instant::now();

        Ok(entry.handle.clone())
    }

    /// Dropping the last handle stops the session task.
    #[tracing::instrument(skip(self))]
    pub async fn close(&self, token: Uuid) -> Result<(), Error> {
        self.sessions
            .write()
            .await
            .remove(&token)
            .map(|_| ())
            .ok_or_else(invalid_input_error)
    }

    /// Drops every session idle for at least `idle_timeout`. Returns how
    /// many were dropped.
    pub async fn evict_idle(&self) -> usize {
        let idle_timeout = self.engine.config().idle_timeout;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|_, entry| entry.touched.elapsed() < idle_timeout);

        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, live = sessions.len(), "idle sessions evicted");
        }

        evicted
    }

    pub async fn live_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Sweeps idle sessions until the state is dropped.
fn spawn_sweeper(state: &DynState) -> JoinHandle<()> {
    let state = Arc::downgrade(state);

    tokio::spawn(async move {
        let period = match state.upgrade() {
            Some(state) => state.engine.config().idle_timeout / 2,
            None => return,
        };
        let mut interval = tokio::time::interval(period);

        loop {
            interval.tick().await;

            match state.upgrade() {
                Some(state) => {
                    state.evict_idle().await;
                }
                None => break,
            }
        }
    })
}

pub fn router(state: DynState) -> Router {
    Router::new()
        .route("/sessions", post(sessions::create))
        .route(
            "/sessions/:token",
            get(sessions::find).delete(sessions::close),
        )
        .route("/sessions/:token/click", post(sessions::click))
        .route("/sessions/:token/query", post(sessions::query))
        .route("/sessions/:token/pick", post(sessions::pick))
        .route("/sessions/:token/selection", delete(sessions::clear_selection))
        .route(
            "/sessions/:token/roles/:role",
            post(sessions::assign_role).delete(sessions::clear_role),
        )
        .route("/sessions/:token/route", post(sessions::request_route))
        .layer(Extension(state))
}

pub async fn serve(engine: Engine) -> Result<(), Error> {
    let state = Arc::new(AppState::new(engine)) as DynState;
    spawn_sweeper(&state);

    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));

    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .map_err(|err| {
            tracing::error!("server stopped: {:?}", err);
            unexpected_error()
        })
}

#[cfg(test)]
fn idle_test_state() -> DynState {
    use crate::config::SessionConfig;
    use crate::engine::mock::MockAPI;

    Arc::new(AppState::new(Engine::new(MockAPI::new(), SessionConfig::default())))
}

#[tokio::test(start_paused = true)]
async fn idle_session_is_evicted_and_touched_one_kept() {
    use std::time::Duration;

    let state = idle_test_state();
    let idle = state.open().await;
    let active = state.open().await;

    tokio::time::advance(Duration::from_secs(20 * 60)).await;
    assert!(state.session(active).await.is_ok());

    tokio::time::advance(Duration::from_secs(15 * 60)).await;

    assert_eq!(state.evict_idle().await, 1);
    assert_eq!(state.session(idle).await.err().map(|err| err.code), Some(101));
    assert!(state.session(active).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn abandoned_sessions_are_swept_in_the_background() {
    use std::time::Duration;

    let state = idle_test_state();
    for _ in 0..1000 {
        state.open().await;
    }
    assert_eq!(state.live_sessions().await, 1000);

    let sweeper = spawn_sweeper(&state);
    tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;

    assert_eq!(state.live_sessions().await, 0);

    drop(state);
    tokio::time::sleep(Duration::from_secs(60 * 60)).await;
    assert!(sweeper.is_finished());
}
