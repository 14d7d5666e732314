//! Self-registration and its administrative review.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use campus_core::{
  de,
  outcome::Outcome,
  registration::{NewRegistration, Registration},
  store::CampusStore,
};
use serde::Deserialize;

use crate::{AppState, error::ApiError, input::Input, password::hash_password, session::Admin};

#[derive(Debug, Deserialize)]
pub struct RejectBody {
  #[serde(default, deserialize_with = "de::blank_as_none")]
  pub notes: Option<String>,
}

/// `POST /auth/register`: open to anyone. The password is hashed here and
/// only the hash is kept with the request.
pub async fn register<S>(
  State(state): State<AppState<S>>,
  Input(body): Input<NewRegistration>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CampusStore + Clone + 'static,
{
  let (request, password) = body.validate()?;
  let password_hash = hash_password(&password)?;
  let created = state
    .store
    .request_registration(request, password_hash)
    .await
    .map_err(ApiError::store)?;

  let outcome = Outcome::ok("Registration request created")
    .with("registration_id", created.registration_id)
    .with("status", created.status.to_string());
  Ok((StatusCode::CREATED, Json(outcome)))
}

/// `GET /admin/registrations`
pub async fn list_pending<S>(
  State(state): State<AppState<S>>,
  _admin: Admin,
) -> Result<Json<Vec<Registration>>, ApiError>
where
  S: CampusStore + Clone + 'static,
{
  let pending = state
    .store
    .list_pending_registrations()
    .await
    .map_err(ApiError::store)?;
  Ok(Json(pending))
}

/// `POST /admin/registrations/{registration_id}/approve`
pub async fn approve<S>(
  State(state): State<AppState<S>>,
  Admin(admin): Admin,
  Path(registration_id): Path<i64>,
) -> Result<Json<Outcome>, ApiError>
where
  S: CampusStore + Clone + 'static,
{
  let outcome = state
    .store
    .approve_registration(registration_id, admin.person_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(outcome))
}

/// `POST /admin/registrations/{registration_id}/reject` with an optional
/// `{"notes": "..."}`.
pub async fn reject<S>(
  State(state): State<AppState<S>>,
  Admin(admin): Admin,
  Path(registration_id): Path<i64>,
  Input(body): Input<RejectBody>,
) -> Result<Json<Outcome>, ApiError>
where
  S: CampusStore + Clone + 'static,
{
  let outcome = state
    .store
    .reject_registration(registration_id, admin.person_id, body.notes)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(outcome))
}
