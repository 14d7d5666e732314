//! Server-side sessions and the extractors that resolve them.
//!
//! The client only ever holds an opaque id in the [`SESSION_COOKIE`] cookie.
//! A session is either a logged-in person or a guest bound to one invitation.

use std::collections::HashMap;

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, HeaderValue, header, request::Parts},
};
use campus_core::{
  roles::{Role, RoleFlags},
  session::{InvitationSession, UserSession},
  store::CampusStore,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

pub const SESSION_COOKIE: &str = "campus_session";

#[derive(Debug, Clone)]
pub enum Session {
  User(UserSession),
  Invitation(InvitationSession),
}

// ─── Registry ────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct SessionRegistry {
  sessions: RwLock<HashMap<Uuid, Session>>,
}

impl SessionRegistry {
  pub fn new() -> Self { Self::default() }

  /// Store `session` under a fresh id.
  pub async fn open(&self, session: Session) -> Uuid {
    let id = Uuid::new_v4();
    self.sessions.write().await.insert(id, session);
    id
  }

  pub async fn get(&self, id: Uuid) -> Option<Session> {
    self.sessions.read().await.get(&id).cloned()
  }

  pub async fn replace(&self, id: Uuid, session: Session) {
    self.sessions.write().await.insert(id, session);
  }

  pub async fn close(&self, id: Uuid) -> Option<Session> {
    self.sessions.write().await.remove(&id)
  }

  /// Apply `update` to every user session of `person_id`. Returns how many
  /// sessions were touched.
  pub async fn update_person<F>(&self, person_id: &str, mut update: F) -> usize
  where
    F: FnMut(&mut UserSession),
  {
    let mut sessions = self.sessions.write().await;
    let mut touched = 0;
    for session in sessions.values_mut() {
      if let Session::User(user) = session
        && user.person_id == person_id
      {
        update(user);
        touched += 1;
      }
    }
    touched
  }

  /// Replace the cached role flags of every session held by `person_id`.
  pub async fn refresh_roles(&self, person_id: &str, roles: RoleFlags) {
    let touched = self.update_person(person_id, |user| user.roles = roles).await;
    if touched > 0 {
      tracing::debug!(person_id, touched, "refreshed session roles");
    }
  }

  /// Drop every session held by `person_id`.
  pub async fn close_person(&self, person_id: &str) {
    self.sessions.write().await.retain(|_, session| {
      !matches!(session, Session::User(user) if user.person_id == person_id)
    });
  }
}

// ─── Cookie ──────────────────────────────────────────────────────────────────

/// The session id carried by the request's cookies, if any.
pub(crate) fn session_id(headers: &HeaderMap) -> Option<Uuid> {
  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(name, _)| *name == SESSION_COOKIE)
    .and_then(|(_, value)| Uuid::parse_str(value).ok())
}

/// `Set-Cookie` value carrying `id`.
pub fn session_cookie(id: Uuid, secure: bool) -> HeaderValue {
  let secure = if secure { "; Secure" } else { "" };
  let cookie = format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax{secure}");
  HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// `Set-Cookie` value that expires the session cookie.
pub fn cleared_cookie() -> HeaderValue {
  HeaderValue::from_static("campus_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

// ─── Extractors ──────────────────────────────────────────────────────────────

/// Any logged-in person.
pub struct CurrentUser(pub UserSession);

impl<S> FromRequestParts<AppState<S>> for CurrentUser
where
  S: CampusStore + Clone + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let id = session_id(&parts.headers).ok_or(ApiError::Unauthorized)?;
    match state.sessions.get(id).await {
      Some(Session::User(user)) => Ok(Self(user)),
      _ => Err(ApiError::Unauthorized),
    }
  }
}

async fn require<S>(
  parts: &mut Parts,
  state: &AppState<S>,
  role: Role,
) -> Result<UserSession, ApiError>
where
  S: CampusStore + Clone + 'static,
{
  let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
  if !user.has(role) {
    tracing::debug!(person_id = %user.person_id, %role, "missing role");
    return Err(ApiError::Forbidden);
  }
  Ok(user)
}

/// A logged-in administrator.
pub struct Admin(pub UserSession);

impl<S> FromRequestParts<AppState<S>> for Admin
where
  S: CampusStore + Clone + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    require(parts, state, Role::Administrator).await.map(Self)
  }
}

/// A logged-in internal member.
pub struct Internal(pub UserSession);

impl<S> FromRequestParts<AppState<S>> for Internal
where
  S: CampusStore + Clone + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    require(parts, state, Role::Internal).await.map(Self)
  }
}

/// A guest who entered with an invitation token.
pub struct Guest {
  pub session_id: Uuid,
  pub session:    InvitationSession,
}

impl<S> FromRequestParts<AppState<S>> for Guest
where
  S: CampusStore + Clone + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let id = session_id(&parts.headers).ok_or(ApiError::Unauthorized)?;
    match state.sessions.get(id).await {
      Some(Session::Invitation(session)) => Ok(Self { session_id: id, session }),
      _ => Err(ApiError::Unauthorized),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn user(person_id: &str) -> Session {
    Session::User(UserSession {
      person_id: person_id.into(),
      email:     format!("{person_id}@campus.test"),
      name:      person_id.into(),
      roles:     RoleFlags::default(),
    })
  }

  #[tokio::test]
  async fn refresh_touches_only_that_person() {
    let registry = SessionRegistry::new();
    let a = registry.open(user("a")).await;
    let b = registry.open(user("b")).await;

    let roles = RoleFlags { is_internal: true, ..RoleFlags::default() };
    registry.refresh_roles("a", roles).await;

    let Some(Session::User(a)) = registry.get(a).await else { panic!("session a") };
    let Some(Session::User(b)) = registry.get(b).await else { panic!("session b") };
    assert!(a.roles.is_internal);
    assert!(!b.roles.is_internal);
  }

  #[tokio::test]
  async fn close_person_drops_all_their_sessions() {
    let registry = SessionRegistry::new();
    let first = registry.open(user("a")).await;
    let second = registry.open(user("a")).await;
    let other = registry.open(user("b")).await;

    registry.close_person("a").await;
    assert!(registry.get(first).await.is_none());
    assert!(registry.get(second).await.is_none());
    assert!(registry.get(other).await.is_some());
  }

  #[test]
  fn cookie_round_trip() {
    let id = Uuid::new_v4();
    let value = session_cookie(id, false);
    let cookie = value.to_str().unwrap().split(';').next().unwrap().to_owned();

    let req = axum::http::Request::builder()
      .header(header::COOKIE, format!("theme=dark; {cookie}"))
      .body(())
      .unwrap();
    assert_eq!(session_id(req.headers()), Some(id));
  }
}
