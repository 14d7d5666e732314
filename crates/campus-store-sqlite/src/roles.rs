//! Applies a [`RolePlan`] through the role assets, inside the caller's
//! transaction.

use campus_core::{
  Error as CoreError,
  roles::{self, RoleChanges, RoleFields, RoleFlags, RolePlan, RoleState, RoleStep},
};
use serde::Deserialize;

use crate::{Error, Executor, Params, Result};

#[derive(Deserialize)]
struct StateRow {
  #[serde(flatten)]
  flags:        RoleFlags,
  #[serde(default)]
  attributions: Vec<String>,
}

/// Current flags and attribution labels, re-derived from the membership
/// tables.
pub(crate) fn load_state(exec: &Executor<'_>, person_id: &str) -> Result<Option<RoleState>> {
  let row: Option<StateRow> =
    exec.fetch_one_as("roles/state", &Params::new().with("person_id", person_id))?;
  Ok(row.map(|r| {
    let mut attributions = r.attributions;
    attributions.sort();
    RoleState { flags: r.flags, attributions }
  }))
}

/// Plan and apply `changes`, then check the result against the plan.
pub(crate) fn apply(
  exec: &Executor<'_>,
  person_id: &str,
  changes: RoleChanges,
  fields: &RoleFields,
) -> Result<RoleFlags> {
  let current = load_state(exec, person_id)?
    .ok_or_else(|| CoreError::PersonNotFound(person_id.to_owned()))?;
  let plan = roles::plan(&current, changes, fields)?;
  if plan.is_noop() {
    return Ok(current.flags);
  }
  run(exec, person_id, &plan)?;

  let after = load_state(exec, person_id)?
    .ok_or_else(|| CoreError::PersonNotFound(person_id.to_owned()))?;
  if after.flags != plan.target || !after.flags.is_consistent() {
    tracing::error!(person_id, expected = ?plan.target, found = ?after.flags, "role cascade diverged");
    return Err(Error::RoleDrift { person_id: person_id.to_owned() });
  }
  tracing::info!(person_id, steps = plan.steps.len(), roles = ?after.flags, "roles updated");
  Ok(after.flags)
}

fn run(exec: &Executor<'_>, person_id: &str, plan: &RolePlan) -> Result<()> {
  for step in &plan.steps {
    tracing::debug!(person_id, ?step, "applying role step");
    let base = Params::new().with("person_id", person_id);
    let (asset, params) = match step {
      RoleStep::ClearLeadership => ("roles/clear_leadership", base),
      RoleStep::ClearAttributions => ("roles/clear_attributions", base),
      RoleStep::RevokeCertifiedProfessional => ("roles/revoke_certified_professional", base),
      RoleStep::RevokeStaff => ("roles/revoke_staff", base),
      RoleStep::RevokeInternal => ("roles/revoke_internal", base),
      RoleStep::GrantInternal { membership_number, category } => (
        "roles/grant_internal",
        base
          .with("membership_number", membership_number)
          .with("category", category),
      ),
      RoleStep::UpdateInternal { membership_number, category } => (
        "roles/update_internal",
        base
          .with("membership_number", membership_number.as_deref())
          .with("category", category.as_deref()),
      ),
      RoleStep::GrantStaff { qualification } => {
        ("roles/grant_staff", base.with("qualification", qualification))
      }
      RoleStep::UpdateStaff { qualification } => {
        ("roles/update_staff", base.with("qualification", qualification))
      }
      RoleStep::GrantCertifiedProfessional { registration_number } => (
        "roles/grant_certified_professional",
        base.with("registration_number", registration_number),
      ),
      RoleStep::UpdateCertifiedProfessional { registration_number } => (
        "roles/update_certified_professional",
        base.with("registration_number", registration_number),
      ),
      RoleStep::AddAttribution { label } => {
        ("roles/add_attribution", base.with("label", label))
      }
    };
    exec.execute_statement(asset, &params)?;
  }
  Ok(())
}
