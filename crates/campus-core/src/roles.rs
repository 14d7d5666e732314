//! Role flags and the pure role-cascade planner.
//!
//! Roles form a strict chain: internal ⊇ staff ⊇ certified professional, with
//! administrator hanging off staff. [`plan`] turns the current state plus a
//! partial change request into an ordered list of [`RoleStep`]s. Planning never
//! touches the database, so every rejection happens before the first write.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, de};

/// Attribution label that records the administrator entitlement.
pub const ADMINISTRATOR_ATTRIBUTION: &str = "Administrator";

/// Category assigned to a new internal member when none is supplied.
pub const DEFAULT_CATEGORY: &str = "STUDENT";

// ─── Roles ───────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  #[strum(serialize = "internal")]
  Internal,
  #[strum(serialize = "staff")]
  Staff,
  #[strum(serialize = "certified professional")]
  CertifiedProfessional,
  #[strum(serialize = "administrator")]
  Administrator,
}

/// A role-specific input field, named in [`Error::RequiredFieldMissing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum RoleField {
  #[strum(serialize = "membership number")]
  MembershipNumber,
  #[strum(serialize = "qualification")]
  Qualification,
  #[strum(serialize = "registration number")]
  RegistrationNumber,
}

/// The derived view over the role-membership tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleFlags {
  #[serde(deserialize_with = "de::flag")]
  pub is_internal:               bool,
  #[serde(deserialize_with = "de::flag")]
  pub is_staff:                  bool,
  #[serde(deserialize_with = "de::flag")]
  pub is_certified_professional: bool,
  #[serde(deserialize_with = "de::flag")]
  pub is_administrator:          bool,
}

impl RoleFlags {
  pub fn has(&self, role: Role) -> bool {
    match role {
      Role::Internal => self.is_internal,
      Role::Staff => self.is_staff,
      Role::CertifiedProfessional => self.is_certified_professional,
      Role::Administrator => self.is_administrator,
    }
  }

  /// `true` when no role exists without every role below it.
  pub fn is_consistent(&self) -> bool {
    (!self.is_staff || self.is_internal)
      && (!self.is_certified_professional || self.is_staff)
      && (!self.is_administrator || self.is_staff)
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// A partial role request. `None` keeps the current value, subject to the
/// cascade (a kept role is dropped when its precursor is revoked).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleChanges {
  #[serde(default, deserialize_with = "de::opt_flag")]
  pub internal:               Option<bool>,
  #[serde(default, deserialize_with = "de::opt_flag")]
  pub staff:                  Option<bool>,
  #[serde(default, deserialize_with = "de::opt_flag")]
  pub certified_professional: Option<bool>,
  #[serde(default, deserialize_with = "de::opt_flag")]
  pub administrator:          Option<bool>,
}

impl RoleChanges {
  pub fn is_empty(&self) -> bool { *self == Self::default() }

  /// A request that revokes every role.
  pub fn revoke_all() -> Self {
    Self { internal: Some(false), ..Self::default() }
  }
}

/// Role-specific values accompanying a [`RoleChanges`] request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RoleFields {
  #[serde(default, deserialize_with = "de::blank_as_none")]
  pub membership_number:   Option<String>,
  #[serde(default, deserialize_with = "de::blank_as_none")]
  pub category:            Option<String>,
  #[serde(default, deserialize_with = "de::blank_as_none")]
  pub qualification:       Option<String>,
  #[serde(default, deserialize_with = "de::blank_as_none")]
  pub registration_number: Option<String>,
  /// Primary attribution label for a staff member.
  #[serde(default, deserialize_with = "de::blank_as_none")]
  pub attribution:         Option<String>,
}

/// Current flags plus the attribution labels held by the person.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleState {
  pub flags:        RoleFlags,
  pub attributions: Vec<String>,
}

impl RoleState {
  /// The first attribution that is not the administrator entitlement.
  pub fn primary_attribution(&self) -> Option<&str> {
    self
      .attributions
      .iter()
      .map(String::as_str)
      .find(|a| *a != ADMINISTRATOR_ATTRIBUTION)
  }
}

// ─── Plan ────────────────────────────────────────────────────────────────────

/// One grant, revoke or update issued by the cascade engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleStep {
  ClearLeadership,
  ClearAttributions,
  RevokeCertifiedProfessional,
  RevokeStaff,
  RevokeInternal,
  GrantInternal { membership_number: String, category: String },
  UpdateInternal { membership_number: Option<String>, category: Option<String> },
  GrantStaff { qualification: String },
  UpdateStaff { qualification: String },
  GrantCertifiedProfessional { registration_number: String },
  UpdateCertifiedProfessional { registration_number: String },
  AddAttribution { label: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePlan {
  pub steps:  Vec<RoleStep>,
  /// Flags the person holds once every step has been applied.
  pub target: RoleFlags,
}

impl RolePlan {
  pub fn is_noop(&self) -> bool { self.steps.is_empty() }
}

/// Compute the ordered steps that move `current` to the requested roles.
///
/// Revocations come first, children before parents, so no step ever leaves a
/// higher role without its precursor. Grants follow, parents before children.
/// While staff holds, the attribution set is replaced wholesale whenever it
/// would change.
pub fn plan(
  current: &RoleState,
  changes: RoleChanges,
  fields: &RoleFields,
) -> Result<RolePlan> {
  let cur = current.flags;

  let internal = changes.internal.unwrap_or(cur.is_internal);
  let staff = resolve(Role::Staff, changes.staff, cur.is_staff, internal, Role::Internal)?;
  let certified = resolve(
    Role::CertifiedProfessional,
    changes.certified_professional,
    cur.is_certified_professional,
    staff,
    Role::Staff,
  )?;
  let administrator = resolve(
    Role::Administrator,
    changes.administrator,
    cur.is_administrator,
    staff,
    Role::Staff,
  )?;

  let mut steps = Vec::new();

  // ── Revocations ──────────────────────────────────────────────────────────
  let staff_revoked = cur.is_staff && !staff;
  if staff_revoked {
    steps.push(RoleStep::ClearLeadership);
    steps.push(RoleStep::ClearAttributions);
  }
  if cur.is_certified_professional && !certified {
    steps.push(RoleStep::RevokeCertifiedProfessional);
  }
  if staff_revoked {
    steps.push(RoleStep::RevokeStaff);
  }
  if cur.is_internal && !internal {
    steps.push(RoleStep::RevokeInternal);
  }

  // ── Grants and updates ───────────────────────────────────────────────────
  if internal && !cur.is_internal {
    let membership_number = required(
      &fields.membership_number,
      Role::Internal,
      RoleField::MembershipNumber,
    )?;
    steps.push(RoleStep::GrantInternal {
      membership_number,
      category: fields
        .category
        .clone()
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_owned()),
    });
  } else if internal
    && (fields.membership_number.is_some() || fields.category.is_some())
  {
    steps.push(RoleStep::UpdateInternal {
      membership_number: fields.membership_number.clone(),
      category:          fields.category.clone(),
    });
  }

  if staff && !cur.is_staff {
    let qualification =
      required(&fields.qualification, Role::Staff, RoleField::Qualification)?;
    steps.push(RoleStep::GrantStaff { qualification });
  } else if staff && let Some(qualification) = &fields.qualification {
    steps.push(RoleStep::UpdateStaff { qualification: qualification.clone() });
  }

  if certified && !cur.is_certified_professional {
    let registration_number = required(
      &fields.registration_number,
      Role::CertifiedProfessional,
      RoleField::RegistrationNumber,
    )?;
    steps.push(RoleStep::GrantCertifiedProfessional { registration_number });
  } else if certified && let Some(number) = &fields.registration_number {
    steps.push(RoleStep::UpdateCertifiedProfessional {
      registration_number: number.clone(),
    });
  }

  // ── Attributions ─────────────────────────────────────────────────────────
  if staff {
    let primary = fields
      .attribution
      .as_deref()
      .filter(|a| *a != ADMINISTRATOR_ATTRIBUTION)
      .or_else(|| current.primary_attribution());

    let mut wanted: Vec<String> = primary.into_iter().map(str::to_owned).collect();
    if administrator {
      wanted.push(ADMINISTRATOR_ATTRIBUTION.to_owned());
    }

    if !same_labels(&wanted, &current.attributions) {
      steps.push(RoleStep::ClearAttributions);
      steps.extend(wanted.into_iter().map(|label| RoleStep::AddAttribution { label }));
    }
  }

  let target = RoleFlags {
    is_internal:               internal,
    is_staff:                  staff,
    is_certified_professional: certified,
    is_administrator:          administrator,
  };
  debug_assert!(target.is_consistent());

  Ok(RolePlan { steps, target })
}

/// Resolve one dependent role against its (already resolved) precursor.
fn resolve(
  role: Role,
  requested: Option<bool>,
  current: bool,
  precursor: bool,
  requires: Role,
) -> Result<bool> {
  match requested {
    Some(true) if !precursor => Err(Error::PrecursorRoleMissing { role, requires }),
    Some(wanted) => Ok(wanted),
    None => Ok(current && precursor),
  }
}

fn required(value: &Option<String>, role: Role, field: RoleField) -> Result<String> {
  value
    .as_deref()
    .map(str::trim)
    .filter(|v| !v.is_empty())
    .map(str::to_owned)
    .ok_or(Error::RequiredFieldMissing { role, field })
}

fn same_labels(a: &[String], b: &[String]) -> bool {
  let mut a: Vec<&str> = a.iter().map(String::as_str).collect();
  let mut b: Vec<&str> = b.iter().map(String::as_str).collect();
  a.sort_unstable();
  b.sort_unstable();
  a == b
}
