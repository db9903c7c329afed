use axum::extract::{Extension, Json, Path};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::SessionHandle;
use crate::entities::{Coordinates, Role, SearchResult};
use crate::error::Error;
use crate::presentation::Scene;
use crate::server::DynState;

#[derive(Serialize, Deserialize)]
pub struct CreatedSession {
    token: Uuid,
}

#[derive(Serialize, Deserialize)]
pub struct QueryParams {
    text: String,
}

async fn scene_of(session: &SessionHandle) -> Result<Json<Scene>, Error> {
    let scene = session.scene().await?;

    Ok(scene.into())
}

pub async fn create(Extension(state): Extension<DynState>) -> Json<CreatedSession> {
    let token = state.open().await;

    CreatedSession { token }.into()
}

pub async fn find(
    Extension(state): Extension<DynState>,
    Path(token): Path<Uuid>,
) -> Result<Json<Scene>, Error> {
    let session = state.session(token).await?;

    scene_of(&session).await
}

pub async fn close(
    Extension(state): Extension<DynState>,
    Path(token): Path<Uuid>,
) -> Result<(), Error> {
    state.close(token).await
}

pub async fn click(
    Extension(state): Extension<DynState>,
    Path(token): Path<Uuid>,
    Json(coordinates): Json<Coordinates>,
) -> Result<Json<Scene>, Error> {
    let session = state.session(token).await?;
    session.click(coordinates).await?;

    scene_of(&session).await
}

pub async fn query(
    Extension(state): Extension<DynState>,
    Path(token): Path<Uuid>,
    Json(params): Json<QueryParams>,
) -> Result<Json<Scene>, Error> {
    let session = state.session(token).await?;
    session.submit_query(params.text).await?;

    scene_of(&session).await
}

pub async fn pick(
    Extension(state): Extension<DynState>,
    Path(token): Path<Uuid>,
    Json(result): Json<SearchResult>,
) -> Result<Json<Scene>, Error> {
    let session = state.session(token).await?;
    session.pick(result).await?;

    scene_of(&session).await
}

pub async fn clear_selection(
    Extension(state): Extension<DynState>,
    Path(token): Path<Uuid>,
) -> Result<Json<Scene>, Error> {
    let session = state.session(token).await?;
    session.clear_selection().await?;

    scene_of(&session).await
}

pub async fn assign_role(
    Extension(state): Extension<DynState>,
    Path((token, role)): Path<(Uuid, String)>,
) -> Result<Json<Scene>, Error> {
    let role: Role = role.parse()?;
    let session = state.session(token).await?;
    session.assign_role(role).await?;

    scene_of(&session).await
}

pub async fn clear_role(
    Extension(state): Extension<DynState>,
    Path((token, role)): Path<(Uuid, String)>,
) -> Result<Json<Scene>, Error> {
    let role: Role = role.parse()?;
    let session = state.session(token).await?;
    session.clear_role(role).await?;

    scene_of(&session).await
}

pub async fn request_route(
    Extension(state): Extension<DynState>,
    Path(token): Path<Uuid>,
) -> Result<Json<Scene>, Error> {
    let session = state.session(token).await?;
    session.request_route().await?;

    scene_of(&session).await
}

#[cfg(test)]
fn test_state() -> DynState {
    use crate::config::SessionConfig;
    use crate::engine::{mock::MockAPI, Engine};
    use crate::server::AppState;
    use std::sync::Arc;

    let engine = Engine::new(MockAPI::new(), SessionConfig::default());
    Arc::new(AppState::new(engine))
}

#[test]
fn unknown_session_is_invalid_input() {
    use tokio_test::{assert_err, block_on};

    let state = test_state();

    let err = assert_err!(block_on(find(Extension(state.clone()), Path(Uuid::new_v4()))));
    assert_eq!(err.code, 101);

    assert_err!(block_on(close(Extension(state), Path(Uuid::new_v4()))));
}

#[tokio::test]
async fn click_then_assign_over_http_handlers() {
    use crate::presentation::MarkerKind;

    let state = test_state();
    let Json(created) = create(Extension(state.clone())).await;

    let Json(scene) = click(
        Extension(state.clone()),
        Path(created.token),
        Json(Coordinates { lat: 37.5, lon: 127.0 }),
    )
    .await
    .unwrap();
    assert_eq!(scene.markers[0].kind, MarkerKind::Selection);
    assert!(scene.view.is_some());

    let Json(scene) = assign_role(
        Extension(state.clone()),
        Path((created.token, "start".into())),
    )
    .await
    .unwrap();
    assert_eq!(scene.markers.len(), 1);
    assert_eq!(scene.markers[0].kind, MarkerKind::Start);
    assert_eq!(scene.point_info[0], "Start: 37.50000, 127.00000");

    // no selection left: assigning again is a no-op, not an error
    let Json(again) = assign_role(
        Extension(state.clone()),
        Path((created.token, "start".into())),
    )
    .await
    .unwrap();
    assert_eq!(again.markers, scene.markers);

    let Json(scene) = request_route(Extension(state.clone()), Path(created.token))
        .await
        .unwrap();
    assert_eq!(scene.prompt.as_deref(), Some("select both points first"));

    close(Extension(state.clone()), Path(created.token))
        .await
        .unwrap();
    assert!(state.session(created.token).await.is_err());
}

#[tokio::test]
async fn bad_role_segment_is_rejected() {
    let state = test_state();
    let Json(created) = create(Extension(state.clone())).await;

    let err = assign_role(Extension(state), Path((created.token, "middle".into())))
        .await
        .unwrap_err();

    assert_eq!(err.code, 101);
}
