//! Administrative people management.
//!
//! Every write that touches roles refreshes the cached flags of the affected
//! person's open sessions, so a revoked role stops working immediately.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use campus_core::{
  Error as CoreError, de,
  outcome::Outcome,
  person::{NewPerson, Person, PersonDetail, PersonUpdate},
  roles::{RoleChanges, RoleFields},
  store::CampusStore,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
  AppState, error::ApiError, input::Input, password::hash_password, session::Admin,
};

// ─── Bodies ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  #[serde(flatten)]
  pub person:   NewPerson,
  #[serde(default, deserialize_with = "de::blank_as_none")]
  pub password: Option<String>,
  #[serde(flatten)]
  pub changes:  RoleChanges,
  #[serde(flatten)]
  pub fields:   RoleFields,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  #[serde(flatten)]
  pub update:   PersonUpdate,
  /// Replaces the stored password when present.
  #[serde(default, deserialize_with = "de::blank_as_none")]
  pub password: Option<String>,
  #[serde(flatten)]
  pub changes:  RoleChanges,
  #[serde(flatten)]
  pub fields:   RoleFields,
}

#[derive(Debug, Deserialize)]
pub struct RolesBody {
  #[serde(flatten)]
  pub changes: RoleChanges,
  #[serde(flatten)]
  pub fields:  RoleFields,
}

// ─── Read ────────────────────────────────────────────────────────────────────

/// `GET /admin/people`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _admin: Admin,
) -> Result<Json<Vec<Person>>, ApiError>
where
  S: CampusStore + Clone + 'static,
{
  let people = state.store.list_people().await.map_err(ApiError::store)?;
  Ok(Json(people))
}

/// `GET /admin/people/{person_id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  _admin: Admin,
  Path(person_id): Path<String>,
) -> Result<Json<PersonDetail>, ApiError>
where
  S: CampusStore + Clone + 'static,
{
  let person = state
    .store
    .get_person(&person_id)
    .await
    .map_err(ApiError::store)?
    .ok_or(CoreError::PersonNotFound(person_id))?;
  Ok(Json(person))
}

// ─── Write ───────────────────────────────────────────────────────────────────

/// `POST /admin/people`: person attributes, optional password and role
/// toggles in one body.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Admin(admin): Admin,
  Input(body): Input<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CampusStore + Clone + 'static,
{
  let person = body.person.validate()?;
  let password_hash = body.password.as_deref().map(hash_password).transpose()?;
  let person_id = person.person_id.clone();

  let roles = state
    .store
    .create_person(person, password_hash, body.changes, body.fields)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(%person_id, by = %admin.person_id, "person created");

  let outcome = Outcome::ok("Person created")
    .with("person_id", person_id)
    .with("roles", json!(roles));
  Ok((StatusCode::CREATED, Json(outcome)))
}

/// `PUT /admin/people/{person_id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  _admin: Admin,
  Path(person_id): Path<String>,
  Input(body): Input<UpdateBody>,
) -> Result<Json<Outcome>, ApiError>
where
  S: CampusStore + Clone + 'static,
{
  // Hash first: the store writes everything or nothing.
  let password_hash = body.password.as_deref().map(hash_password).transpose()?;
  let name = body.update.name.clone();
  let email = body.update.email.clone();
  let roles = state
    .store
    .update_person(person_id.clone(), body.update, password_hash, body.changes, body.fields)
    .await
    .map_err(ApiError::store)?;

  state
    .sessions
    .update_person(&person_id, |user| {
      user.roles = roles;
      if let Some(name) = &name {
        user.name = name.clone();
      }
      if let Some(email) = &email {
        user.email = email.clone();
      }
    })
    .await;

  Ok(Json(Outcome::ok("Person updated").with("roles", json!(roles))))
}

/// `DELETE /admin/people/{person_id}`: also closes that person's sessions.
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  _admin: Admin,
  Path(person_id): Path<String>,
) -> Result<Json<Outcome>, ApiError>
where
  S: CampusStore + Clone + 'static,
{
  state
    .store
    .delete_person(person_id.clone())
    .await
    .map_err(ApiError::store)?;
  state.sessions.close_person(&person_id).await;
  Ok(Json(Outcome::ok("Person deleted")))
}

/// `PUT /admin/people/{person_id}/roles`: a partial role request. Absent
/// toggles keep the current state.
pub async fn set_roles<S>(
  State(state): State<AppState<S>>,
  _admin: Admin,
  Path(person_id): Path<String>,
  Input(body): Input<RolesBody>,
) -> Result<Json<Outcome>, ApiError>
where
  S: CampusStore + Clone + 'static,
{
  let roles = state
    .store
    .apply_role_changes(person_id.clone(), body.changes, body.fields)
    .await
    .map_err(ApiError::store)?;
  state.sessions.refresh_roles(&person_id, roles).await;
  Ok(Json(Outcome::ok("Roles updated").with("roles", json!(roles))))
}
