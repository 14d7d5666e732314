//! Registration requests and their review.
//!
//! Both run inside the caller's unit of work: the conflict check and the
//! insert see the same snapshot, and an approval either creates the account
//! and grants the role or leaves nothing behind.

use campus_core::{
  Error as CoreError,
  outcome::Outcome,
  registration::{
    CreatedRegistration, Registration, RegistrationStatus, Review, ValidRegistration,
  },
  roles::{RoleChanges, RoleFields},
};
use serde::Deserialize;
use serde_json::json;

use crate::{Error, Executor, Params, Result, roles};

#[derive(Deserialize)]
struct Conflicts {
  #[serde(deserialize_with = "campus_core::de::flag")]
  has_login:   bool,
  #[serde(deserialize_with = "campus_core::de::flag")]
  pending:     bool,
  #[serde(deserialize_with = "campus_core::de::flag")]
  email_taken: bool,
}

#[derive(Deserialize)]
struct Applicant {
  password_hash: String,
  #[serde(deserialize_with = "campus_core::de::flag")]
  person_exists: bool,
}

pub(crate) fn request(
  exec: &Executor<'_>,
  request: ValidRegistration,
  password_hash: String,
) -> Result<CreatedRegistration> {
  let conflicts: Conflicts = exec
    .fetch_one_as(
      "registrations/conflicts",
      &Params::new()
        .with("person_id", &request.person_id)
        .with("email", &request.email),
    )?
    .ok_or_else(|| Error::NoResult { asset: "registrations/conflicts".into() })?;
  if conflicts.has_login || conflicts.pending {
    tracing::debug!(
      person_id = %request.person_id,
      has_login = conflicts.has_login,
      pending = conflicts.pending,
      "registration refused"
    );
    return Err(CoreError::AlreadyRegistered.into());
  }
  if conflicts.email_taken {
    return Err(CoreError::EmailInUse.into());
  }

  let created: CreatedRegistration = exec
    .fetch_one_as(
      "registrations/create",
      &Params::new()
        .with("person_id", &request.person_id)
        .with("name", request.name)
        .with("email", request.email)
        .with("phone", request.phone)
        .with("membership_number", request.membership_number)
        .with("password_hash", password_hash),
    )?
    .ok_or_else(|| Error::NoResult { asset: "registrations/create".into() })?;
  tracing::info!(
    registration_id = created.registration_id,
    person_id = %request.person_id,
    "registration requested"
  );
  Ok(created)
}

pub(crate) fn list_pending(exec: &Executor<'_>) -> Result<Vec<Registration>> {
  exec
    .fetch_all("registrations/list_pending", &Params::new())?
    .into_iter()
    .map(crate::executor::decode)
    .collect()
}

/// Decide a pending request. A request that was already decided answers with
/// a failed outcome carrying its status.
pub(crate) fn review(
  exec: &Executor<'_>,
  registration_id: i64,
  reviewer_id: &str,
  review: Review,
  notes: Option<String>,
) -> Result<Outcome> {
  let by_id = Params::new().with("registration_id", registration_id);
  let current: Registration = exec
    .fetch_one_as("registrations/get", &by_id)?
    .ok_or(CoreError::RegistrationNotFound(registration_id))?;
  if current.status != RegistrationStatus::Pending {
    tracing::debug!(registration_id, status = %current.status, "registration already reviewed");
    return Ok(
      Outcome::failed("Registration is not pending").with("status", current.status.to_string()),
    );
  }

  let outcome = match review {
    Review::Approve => approve(exec, &current)?,
    Review::Reject => Outcome::ok("Registration rejected"),
  };

  let target = review.target();
  exec
    .fetch_one(
      "registrations/review",
      &by_id
        .with("status", target.as_ref())
        .with("reviewed_by", reviewer_id)
        .with("notes", notes),
    )?
    .ok_or_else(|| Error::NoResult { asset: "registrations/review".into() })?;
  tracing::info!(registration_id, reviewer_id, status = %target, "registration reviewed");

  Ok(outcome.with("status", target.to_string()))
}

fn approve(exec: &Executor<'_>, current: &Registration) -> Result<Outcome> {
  let applicant: Applicant = exec
    .fetch_one_as(
      "registrations/applicant",
      &Params::new().with("registration_id", current.registration_id),
    )?
    .ok_or_else(|| Error::NoResult { asset: "registrations/applicant".into() })?;

  // An existing person keeps their stored details and only gains a login.
  if applicant.person_exists {
    exec.execute_statement(
      "people/set_password",
      &Params::new()
        .with("person_id", &current.person_id)
        .with("password_hash", applicant.password_hash),
    )?;
  } else {
    exec.execute_statement(
      "people/create",
      &Params::new()
        .with("person_id", &current.person_id)
        .with("name", &current.name)
        .with("email", &current.email)
        .with("phone", current.phone.as_deref())
        .with("birth_date", None::<String>)
        .with("password_hash", applicant.password_hash),
    )?;
  }

  let flags = roles::apply(
    exec,
    &current.person_id,
    RoleChanges { internal: Some(true), ..RoleChanges::default() },
    &RoleFields {
      membership_number: Some(current.membership_number.clone()),
      ..RoleFields::default()
    },
  )?;
  Ok(
    Outcome::ok("Registration approved")
      .with("person_id", current.person_id.clone())
      .with("roles", json!(flags)),
  )
}
