//! Per-caller session views.
//!
//! A [`UserSession`] caches the role flags resolved at login; the boundary
//! refreshes it whenever the role-cascade engine changes that person's roles.
//! An [`InvitationSession`] binds an unauthenticated guest to one invitation
//! and mirrors its authoritative status after every transition.

use serde::Serialize;

use crate::{
  invitation::{Invitation, InvitationStatus, InvitationToken},
  person::LoginRecord,
  roles::{Role, RoleFlags},
};

#[derive(Debug, Clone, Serialize)]
pub struct UserSession {
  pub person_id: String,
  pub email:     String,
  pub name:      String,
  pub roles:     RoleFlags,
}

impl UserSession {
  pub fn has(&self, role: Role) -> bool { self.roles.has(role) }
}

impl From<LoginRecord> for UserSession {
  fn from(r: LoginRecord) -> Self {
    Self {
      person_id: r.person_id,
      email:     r.email,
      name:      r.name,
      roles:     r.roles,
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct InvitationSession {
  pub invitation_id: i64,
  #[serde(skip)]
  pub token:         InvitationToken,
  pub status:        InvitationStatus,
}

impl InvitationSession {
  pub fn new(token: InvitationToken, invitation: &Invitation) -> Self {
    Self {
      invitation_id: invitation.invitation_id,
      token,
      status: invitation.status,
    }
  }

  /// Overwrite the cached id and status with the authoritative row.
  pub fn reconcile(&mut self, invitation: &Invitation) {
    self.invitation_id = invitation.invitation_id;
    self.status = invitation.status;
  }
}
