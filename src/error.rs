use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::env;
use std::fmt::{self, Debug, Display};

pub const ROUTE_FETCH_FALLBACK_MESSAGE: &str = "Failed to fetch the route. Please try again.";

#[derive(Clone, Debug, PartialEq)]
pub struct Error {
    pub code: i32,
    pub message: String,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for Error {}

impl From<env::VarError> for Error {
    fn from(err: env::VarError) -> Self {
        env_var_error(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        reqwest_error(err)
    }
}

impl<T> From<async_channel::SendError<T>> for Error {
    fn from(_: async_channel::SendError<T>) -> Self {
        session_closed_error()
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for Error {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        session_closed_error()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_message) = match self.code {
            1..=99 => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
            _ => (StatusCode::BAD_REQUEST, self.message.as_str()),
        };

        let body = Json(json!({
            "code": self.code,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl Error {
    pub fn is_precondition(&self) -> bool {
        self.code == 100
    }
}

pub fn precondition_error(message: &str) -> Error {
    Error {
        code: 100,
        message: message.into(),
    }
}

pub fn invalid_input_error() -> Error {
    Error {
        code: 101,
        message: "invalid input".into(),
    }
}

/// The one failure that reaches the user verbatim.
pub fn route_error(detail: Option<String>) -> Error {
    Error {
        code: 102,
        message: detail.unwrap_or_else(|| ROUTE_FETCH_FALLBACK_MESSAGE.into()),
    }
}

pub fn env_var_error(_: env::VarError) -> Error {
    Error {
        code: 1,
        message: "environment variable error".into(),
    }
}

pub fn reqwest_error(err: reqwest::Error) -> Error {
    tracing::debug!("transport failure: {:?}", err);

    Error {
        code: 3,
        message: "reqwest error".into(),
    }
}

pub fn upstream_error() -> Error {
    Error {
        code: 4,
        message: "upstream error".into(),
    }
}

pub fn unexpected_error() -> Error {
    Error {
        code: 5,
        message: "unexpected error".into(),
    }
}

pub fn session_closed_error() -> Error {
    Error {
        code: 6,
        message: "session closed".into(),
    }
}

#[test]
fn route_error_keeps_detail_verbatim() {
    let err = route_error(Some("Could not snap points to the road network.".into()));

    assert_eq!(err.code, 102);
    assert_eq!(err.message, "Could not snap points to the road network.");
}

#[test]
fn route_error_falls_back_to_generic_message() {
    let err = route_error(None);

    assert_eq!(err.message, ROUTE_FETCH_FALLBACK_MESSAGE);
}

#[test]
fn internal_errors_are_masked_in_responses() {
    let response = upstream_error().into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let response = precondition_error("no point selected").into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(precondition_error("no point selected").is_precondition());
}
