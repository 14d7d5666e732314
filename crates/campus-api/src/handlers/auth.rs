//! Password login, logout and the caller's own session.

use axum::{
  Json,
  extract::State,
  http::{HeaderMap, header},
  response::IntoResponse,
};
use campus_core::{
  Error as CoreError, de, outcome::Outcome, session::UserSession, store::CampusStore,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
  AppState,
  error::ApiError,
  input::Input,
  password::verify_password,
  session::{CurrentUser, Session, cleared_cookie, session_cookie, session_id},
};

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  /// Email address or national id.
  #[serde(default, deserialize_with = "de::blank_as_none")]
  pub login:    Option<String>,
  #[serde(default)]
  pub password: String,
}

/// `POST /auth/login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  Input(body): Input<LoginBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CampusStore + Clone + 'static,
{
  let login = body.login.ok_or(CoreError::MissingInput("login"))?;
  let record = state
    .store
    .find_login(&login)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::InvalidCredentials)?;

  let verified = record
    .password_hash
    .as_deref()
    .is_some_and(|hash| verify_password(&body.password, hash));
  if !verified {
    tracing::debug!(person_id = %record.person_id, "login refused");
    return Err(ApiError::InvalidCredentials);
  }

  let user = UserSession::from(record);
  let id = state.sessions.open(Session::User(user.clone())).await;
  tracing::info!(person_id = %user.person_id, "logged in");

  let body = Outcome::ok("Logged in").with("user", json!(user));
  Ok((
    [(header::SET_COOKIE, session_cookie(id, state.config.secure_cookies))],
    Json(body),
  ))
}

/// `POST /auth/logout`: closes whichever session the cookie names.
pub async fn logout<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
) -> impl IntoResponse
where
  S: CampusStore + Clone + 'static,
{
  if let Some(id) = session_id(&headers) {
    state.sessions.close(id).await;
  }
  (
    [(header::SET_COOKIE, cleared_cookie())],
    Json(Outcome::ok("Logged out")),
  )
}

/// `GET /auth/me`
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserSession> { Json(user) }
