//! Normalized request bodies.
//!
//! [`Input`] accepts either a JSON body or a form-encoded one and yields the
//! same typed field set, so handlers never look at the encoding.

use axum::{
  Form,
  extract::{FromRequest, Request},
  http::header,
};
use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

pub struct Input<T>(pub T);

impl<T, S> FromRequest<S> for Input<T>
where
  T: DeserializeOwned,
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
    let is_json = req
      .headers()
      .get(header::CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .is_some_and(|ct| ct.starts_with("application/json"));

    if is_json {
      let body = Bytes::from_request(req, state)
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?;
      let value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {e}")))?;
      return Ok(Self(value));
    }

    let Form(value) = Form::<T>::from_request(req, state)
      .await
      .map_err(|e| ApiError::BadRequest(e.body_text()))?;
    Ok(Self(value))
  }
}
