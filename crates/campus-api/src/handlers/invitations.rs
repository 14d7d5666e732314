//! Invitations as seen by the internal member who issues them.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use campus_core::{
  invitation::{Invitation, NewInvitation},
  outcome::Outcome,
  store::CampusStore,
};

use crate::{AppState, error::ApiError, input::Input, session::Internal};

/// `GET /internal/invites`: the caller's own invitations.
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Internal(user): Internal,
) -> Result<Json<Vec<Invitation>>, ApiError>
where
  S: CampusStore + Clone + 'static,
{
  let invitations = state
    .store
    .list_invitations(&user.person_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(invitations))
}

/// `POST /internal/invites`: the token is only ever returned here.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Internal(user): Internal,
  Input(body): Input<NewInvitation>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CampusStore + Clone + 'static,
{
  let created = state
    .store
    .create_invitation(user.person_id, body)
    .await
    .map_err(ApiError::store)?;

  let outcome = Outcome::ok("Invitation created")
    .with("invitation_id", created.invitation_id)
    .with("token", created.token)
    .with("status", created.status.to_string());
  Ok((StatusCode::CREATED, Json(outcome)))
}

/// `DELETE /internal/invites/{invitation_id}`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  Internal(user): Internal,
  Path(invitation_id): Path<i64>,
) -> Result<Json<Outcome>, ApiError>
where
  S: CampusStore + Clone + 'static,
{
  state
    .store
    .delete_invitation(user.person_id, invitation_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(Outcome::ok("Invitation deleted")))
}
