//! Activity listing, creation and direct enrollment.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use campus_core::{
  activity::{Activity, NewActivity, Participation},
  outcome::Outcome,
  store::CampusStore,
};

use crate::{
  AppState,
  error::ApiError,
  input::Input,
  session::{Admin, CurrentUser, Internal},
};

/// `GET /activities`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _user: CurrentUser,
) -> Result<Json<Vec<Activity>>, ApiError>
where
  S: CampusStore + Clone + 'static,
{
  let activities = state.store.list_activities().await.map_err(ApiError::store)?;
  Ok(Json(activities))
}

/// `POST /admin/activities` with body `{"name": "...", "capacity": 20}`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  _admin: Admin,
  Input(body): Input<NewActivity>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CampusStore + Clone + 'static,
{
  let activity = state.store.create_activity(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(activity)))
}

/// `POST /internal/activities/{activity_id}/enroll`: the caller takes a seat
/// without an invitation. A full activity or a repeat answers `success: false`.
pub async fn enroll<S>(
  State(state): State<AppState<S>>,
  Internal(user): Internal,
  Path(activity_id): Path<i64>,
) -> Result<Json<Outcome>, ApiError>
where
  S: CampusStore + Clone + 'static,
{
  let outcome = state
    .store
    .enroll_in_activity(user.person_id, activity_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(outcome))
}

/// `GET /internal/enrollments`: the caller's own seats.
pub async fn enrollments<S>(
  State(state): State<AppState<S>>,
  Internal(user): Internal,
) -> Result<Json<Vec<Participation>>, ApiError>
where
  S: CampusStore + Clone + 'static,
{
  let seats = state
    .store
    .list_enrollments(&user.person_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(seats))
}
