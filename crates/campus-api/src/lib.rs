//! JSON HTTP boundary for Campus.
//!
//! Exposes an axum [`Router`] backed by any [`campus_core::store::CampusStore`].
//! Handlers only normalize input, check the caller's session and translate
//! results; every business rule lives behind the store.
//!
//! | Method | Path | Caller |
//! |--------|------|--------|
//! | `POST` | `/auth/login` | anyone |
//! | `POST` | `/auth/logout` | anyone |
//! | `POST` | `/auth/register` | anyone |
//! | `GET`  | `/auth/me` | logged in |
//! | `GET`  | `/activities` | logged in |
//! | `POST` | `/admin/activities` | administrator |
//! | `GET`  | `/admin/registrations` | administrator |
//! | `POST` | `/admin/registrations/{registration_id}/approve` | administrator |
//! | `POST` | `/admin/registrations/{registration_id}/reject` | administrator |
//! | `GET` `POST` | `/admin/people` | administrator |
//! | `GET` `PUT` `DELETE` | `/admin/people/{person_id}` | administrator |
//! | `PUT`  | `/admin/people/{person_id}/roles` | administrator |
//! | `GET` `POST` | `/internal/invites` | internal member |
//! | `DELETE` | `/internal/invites/{invitation_id}` | internal member |
//! | `POST` | `/internal/activities/{activity_id}/enroll` | internal member |
//! | `GET`  | `/internal/enrollments` | internal member |
//! | `POST` | `/external/enter` | anyone with a token |
//! | `GET`  | `/external/dashboard` | guest |
//! | `POST` | `/external/accept` | guest |
//! | `POST` | `/external/reject` | guest |

pub mod error;
pub mod handlers;
pub mod input;
pub mod password;
pub mod session;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post, put},
};
use campus_core::store::CampusStore;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use session::SessionRegistry;

use handlers::{activities, auth, external, invitations, people, registrations};

/// Boundary settings that do not belong to the store.
#[derive(Debug, Clone, Default)]
pub struct ApiConfig {
  /// Add `Secure` to the session cookie. Enable behind TLS.
  pub secure_cookies: bool,
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: CampusStore> {
  pub store:    Arc<S>,
  pub sessions: Arc<SessionRegistry>,
  pub config:   Arc<ApiConfig>,
}

impl<S: CampusStore> AppState<S> {
  pub fn new(store: S, config: ApiConfig) -> Self {
    Self {
      store:    Arc::new(store),
      sessions: Arc::new(SessionRegistry::new()),
      config:   Arc::new(config),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

pub fn router<S>(state: AppState<S>) -> Router
where
  S: CampusStore + Clone + 'static,
{
  Router::new()
    // Authentication
    .route("/auth/login",    post(auth::login::<S>))
    .route("/auth/logout",   post(auth::logout::<S>))
    .route("/auth/me",       get(auth::me))
    .route("/auth/register", post(registrations::register::<S>))
    // Activities
    .route("/activities",       get(activities::list::<S>))
    .route("/admin/activities", post(activities::create::<S>))
    .route(
      "/internal/activities/{activity_id}/enroll",
      post(activities::enroll::<S>),
    )
    .route("/internal/enrollments", get(activities::enrollments::<S>))
    // Registration review
    .route("/admin/registrations", get(registrations::list_pending::<S>))
    .route(
      "/admin/registrations/{registration_id}/approve",
      post(registrations::approve::<S>),
    )
    .route(
      "/admin/registrations/{registration_id}/reject",
      post(registrations::reject::<S>),
    )
    // People
    .route("/admin/people", get(people::list::<S>).post(people::create::<S>))
    .route(
      "/admin/people/{person_id}",
      get(people::get_one::<S>)
        .put(people::update::<S>)
        .delete(people::delete_one::<S>),
    )
    .route("/admin/people/{person_id}/roles", put(people::set_roles::<S>))
    // Invitations
    .route(
      "/internal/invites",
      get(invitations::list::<S>).post(invitations::create::<S>),
    )
    .route("/internal/invites/{invitation_id}", delete(invitations::delete_one::<S>))
    // Guests
    .route("/external/enter",     post(external::enter::<S>))
    .route("/external/dashboard", get(external::dashboard::<S>))
    .route("/external/accept",    post(external::accept::<S>))
    .route("/external/reject",    post(external::reject::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
