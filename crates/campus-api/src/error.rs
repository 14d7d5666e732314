//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error body has the same shape as a workflow outcome:
//! `{"success": false, "message": "..."}`.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use campus_core::Classify;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error("invalid login or password")]
  InvalidCredentials,

  #[error("forbidden")]
  Forbidden,

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("password hashing failed: {0}")]
  Hashing(String),

  /// An expected business rejection.
  #[error(transparent)]
  Rejected(#[from] campus_core::Error),

  /// An infrastructure fault. `message` is the client-safe rendering; the
  /// source keeps the diagnostic for the log.
  #[error("store error: {source}")]
  Store {
    message: String,
    #[source]
    source:  Box<dyn std::error::Error + Send + Sync>,
  },
}

impl ApiError {
  /// Split a store error into a business rejection or a logged fault.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Classify + Send + Sync + 'static,
  {
    if let Some(rejection) = err.rejection() {
      tracing::debug!(error = %rejection, "request rejected");
      return Self::Rejected(rejection.clone());
    }
    tracing::error!(error = %err, "store operation failed");
    Self::Store { message: err.public_message(), source: Box::new(err) }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::Unauthorized | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
      Self::Forbidden => StatusCode::FORBIDDEN,
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::Rejected(e) => StatusCode::from_u16(e.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
      Self::Hashing(_) | Self::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = match &self {
      ApiError::Unauthorized => "Authentication required".to_owned(),
      ApiError::InvalidCredentials => "Invalid login or password".to_owned(),
      ApiError::Hashing(_) => "Could not process the password".to_owned(),
      ApiError::Forbidden => "You do not have access to this resource".to_owned(),
      ApiError::BadRequest(m) => m.clone(),
      ApiError::Rejected(e) => e.to_string(),
      ApiError::Store { message, .. } => message.clone(),
    };
    (status, Json(json!({ "success": false, "message": message }))).into_response()
  }
}
