//! Invitation creation and the PENDING → ACCEPTED | REJECTED state machine.
//!
//! Both run on the raw connection so the transaction boundary is explicit:
//! the transition commits only when its routine reports success, and the
//! authoritative row is re-read after the commit.

use campus_core::{
  Error as CoreError,
  invitation::{
    CreatedInvitation, Invitation, InvitationStatus, InvitationToken, Transition,
    ValidInvitation,
  },
  outcome::Outcome,
};
use rusqlite::{Connection, TransactionBehavior};
use serde::Deserialize;

use crate::{AssetCatalog, DbErrorKind, Error, Executor, Params, Result, roles};

pub(crate) fn by_token(
  exec: &Executor<'_>,
  token: &InvitationToken,
) -> Result<Option<Invitation>> {
  exec.fetch_one_as(
    "invitations/get_by_token",
    &Params::new().with("token", token.expose()),
  )
}

// ─── Creation ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct InsertedRow {
  invitation_id: i64,
  status:        InvitationStatus,
}

pub(crate) fn create(
  conn: &mut Connection,
  assets: &AssetCatalog,
  inviter_id: &str,
  input: ValidInvitation,
) -> Result<CreatedInvitation> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let exec = Executor::new(&tx, assets);

  let inviter = roles::load_state(&exec, inviter_id)?
    .ok_or_else(|| CoreError::PersonNotFound(inviter_id.to_owned()))?;
  if !inviter.flags.is_internal {
    return Err(CoreError::InviterNotInternal.into());
  }
  if let Some(activity_id) = input.activity_id {
    let found = exec.fetch_one("activities/get", &Params::new().with("activity_id", activity_id))?;
    if found.is_none() {
      return Err(CoreError::ActivityNotFound(activity_id).into());
    }
  }

  let insert = |token: &InvitationToken| -> Result<Option<InsertedRow>> {
    exec.fetch_one_as(
      "invitations/create",
      &Params::new()
        .with("token", token.expose())
        .with("inviter_id", inviter_id)
        .with("invitee_document", &input.invitee_document)
        .with("invitee_name", &input.invitee_name)
        .with("invitee_email", input.invitee_email.as_deref())
        .with("invitee_phone", input.invitee_phone.as_deref())
        .with("activity_id", input.activity_id)
        .with("notes", input.notes.as_deref()),
    )
  };

  // One regeneration on a token collision; a second collision is a fault.
  let mut token = InvitationToken::generate();
  let inserted = match insert(&token) {
    Err(e) if e.db_kind() == Some(DbErrorKind::UniqueViolation) => {
      tracing::warn!(%token, "invitation token collision, regenerating");
      token = InvitationToken::generate();
      insert(&token)?
    }
    other => other?,
  };
  let row = inserted.ok_or_else(|| Error::NoResult { asset: "invitations/create".into() })?;

  tx.commit()?;
  tracing::info!(
    invitation_id = row.invitation_id,
    inviter_id,
    %token,
    "invitation created"
  );

  Ok(CreatedInvitation {
    invitation_id: row.invitation_id,
    token:         token.expose().to_owned(),
    status:        row.status,
  })
}

// ─── Transitions ─────────────────────────────────────────────────────────────

fn transition_asset(transition: Transition) -> &'static str {
  match transition {
    Transition::Accept => "invitations/accept",
    Transition::Reject => "invitations/reject",
  }
}

/// Run `transition` for the invitation behind `token`.
///
/// Returns the outcome together with the authoritative row as it stands once
/// the transaction has ended, or `None` if the row could not be re-read.
pub(crate) fn transition(
  conn: &mut Connection,
  assets: &AssetCatalog,
  token: &InvitationToken,
  transition: Transition,
) -> Result<(Outcome, Option<Invitation>)> {
  let asset = transition_asset(transition);
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let exec = Executor::new(&tx, assets);

  let current = by_token(&exec, token)?.ok_or(CoreError::InvitationNotFound)?;
  if !current.status.is_pending() {
    tracing::debug!(
      invitation_id = current.invitation_id,
      status = %current.status,
      "invitation is not pending"
    );
    let outcome = Outcome::failed(CoreError::NotPending.to_string())
      .with("status", current.status.to_string());
    return Ok((outcome, Some(current)));
  }

  let result = exec
    .fetch_one(asset, &Params::new().with("invitation_id", current.invitation_id))?
    .and_then(|mut row| row.remove("result"))
    .and_then(Outcome::from_value);

  let Some(outcome) = result else {
    tx.rollback()?;
    tracing::error!(invitation_id = current.invitation_id, asset, "transition routine returned no result");
    return Err(Error::NoResult { asset: asset.to_owned() });
  };

  if !outcome.success {
    tx.rollback()?;
    tracing::debug!(
      invitation_id = current.invitation_id,
      message = %outcome.message,
      "transition refused"
    );
    return Ok((outcome, Some(current)));
  }

  tx.commit()?;
  tracing::info!(
    invitation_id = current.invitation_id,
    to = %transition.target(),
    "invitation transitioned"
  );

  let exec = Executor::new(conn, assets);
  let updated = by_token(&exec, token)?;
  Ok((outcome, updated))
}
