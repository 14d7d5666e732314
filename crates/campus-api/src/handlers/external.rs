//! The guest side of an invitation.
//!
//! A guest enters with the bearer token once; afterwards the session cookie
//! identifies the invitation. After every transition the registry copy of the
//! guest session is overwritten with the reconciled one.

use axum::{Json, extract::State, http::header, response::IntoResponse};
use campus_core::{
  Error as CoreError,
  invitation::{GuestDashboard, InvitationToken},
  outcome::Outcome,
  session::InvitationSession,
  store::CampusStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  error::ApiError,
  input::Input,
  session::{Guest, Session, session_cookie},
};

#[derive(Debug, Deserialize)]
pub struct EnterBody {
  #[serde(default)]
  pub token: String,
}

/// `POST /external/enter` with body `{"token": "..."}`
pub async fn enter<S>(
  State(state): State<AppState<S>>,
  Input(body): Input<EnterBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CampusStore + Clone + 'static,
{
  let session = state
    .store
    .authenticate_invitation(InvitationToken::new(body.token))
    .await
    .map_err(ApiError::store)?;

  let outcome = Outcome::ok("Invitation found")
    .with("invitation_id", session.invitation_id)
    .with("status", session.status.to_string());
  let id = state.sessions.open(Session::Invitation(session)).await;

  Ok((
    [(header::SET_COOKIE, session_cookie(id, state.config.secure_cookies))],
    Json(outcome),
  ))
}

/// `GET /external/dashboard`: the invitation and, once accepted, the seat it
/// holds.
pub async fn dashboard<S>(
  State(state): State<AppState<S>>,
  Guest { session_id, mut session }: Guest,
) -> Result<Json<GuestDashboard>, ApiError>
where
  S: CampusStore + Clone + 'static,
{
  let Some(dashboard) = state
    .store
    .guest_dashboard(&session)
    .await
    .map_err(ApiError::store)?
  else {
    state.sessions.close(session_id).await;
    return Err(CoreError::InvitationNotFound.into());
  };
  session.reconcile(&dashboard.invitation);
  state.sessions.replace(session_id, Session::Invitation(session)).await;

  Ok(Json(dashboard))
}

/// `POST /external/accept`
pub async fn accept<S>(
  State(state): State<AppState<S>>,
  guest: Guest,
) -> Result<Json<Outcome>, ApiError>
where
  S: CampusStore + Clone + 'static,
{
  let Guest { session_id, mut session } = guest;
  let outcome = state
    .store
    .accept_invitation(&mut session)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(finish(&state, session_id, session, outcome).await))
}

/// `POST /external/reject`
pub async fn reject<S>(
  State(state): State<AppState<S>>,
  guest: Guest,
) -> Result<Json<Outcome>, ApiError>
where
  S: CampusStore + Clone + 'static,
{
  let Guest { session_id, mut session } = guest;
  let outcome = state
    .store
    .reject_invitation(&mut session)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(finish(&state, session_id, session, outcome).await))
}

/// Store the reconciled guest session and report its status with the outcome.
async fn finish<S>(
  state: &AppState<S>,
  session_id: Uuid,
  session: InvitationSession,
  outcome: Outcome,
) -> Outcome
where
  S: CampusStore + Clone + 'static,
{
  tracing::info!(
    invitation_id = session.invitation_id,
    status = %session.status,
    success = outcome.success,
    "invitation transition"
  );
  let outcome = outcome.with("status", session.status.to_string());
  state.sessions.replace(session_id, Session::Invitation(session)).await;
  outcome
}
