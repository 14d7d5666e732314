//! The `CampusStore` trait.
//!
//! Implemented by storage backends (e.g. `campus-store-sqlite`). The HTTP layer
//! depends on this abstraction, not on any concrete backend. Every method runs
//! against its own session-scoped connection; methods that write more than one
//! statement do so inside a single unit of work. Each handler makes at most one
//! call, so a request never holds more than one connection.

use std::future::Future;

use crate::{
  Classify,
  activity::{Activity, NewActivity, Participation},
  invitation::{
    CreatedInvitation, GuestDashboard, Invitation, InvitationToken, NewInvitation,
  },
  outcome::Outcome,
  person::{LoginRecord, Person, PersonDetail, PersonUpdate, ValidPerson},
  registration::{CreatedRegistration, Registration, ValidRegistration},
  roles::{RoleChanges, RoleFields, RoleFlags},
  session::InvitationSession,
};

/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait CampusStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  // ── People ────────────────────────────────────────────────────────────

  fn list_people(
    &self,
  ) -> impl Future<Output = Result<Vec<Person>, Self::Error>> + Send + '_;

  /// Returns `None` if no person has this national id.
  fn get_person<'a>(
    &'a self,
    person_id: &'a str,
  ) -> impl Future<Output = Result<Option<PersonDetail>, Self::Error>> + Send + 'a;

  /// Insert a person, optional password hash and roles in one unit of work.
  fn create_person(
    &self,
    person: ValidPerson,
    password_hash: Option<String>,
    changes: RoleChanges,
    fields: RoleFields,
  ) -> impl Future<Output = Result<RoleFlags, Self::Error>> + Send + '_;

  /// Update attributes, replace the password hash when one is given and run
  /// the full role cascade, all in one unit of work.
  fn update_person(
    &self,
    person_id: String,
    update: PersonUpdate,
    password_hash: Option<String>,
    changes: RoleChanges,
    fields: RoleFields,
  ) -> impl Future<Output = Result<RoleFlags, Self::Error>> + Send + '_;

  /// Revoke every role in cascade order, then delete the person. Fails with
  /// `PersonHasDependents` while invitations or enrollments point at them.
  fn delete_person(
    &self,
    person_id: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Look a person up by email or national id for password login.
  fn find_login<'a>(
    &'a self,
    login: &'a str,
  ) -> impl Future<Output = Result<Option<LoginRecord>, Self::Error>> + Send + 'a;

  // ── Roles ─────────────────────────────────────────────────────────────

  fn role_flags<'a>(
    &'a self,
    person_id: &'a str,
  ) -> impl Future<Output = Result<Option<RoleFlags>, Self::Error>> + Send + 'a;

  /// Apply a partial role request atomically and return the resulting flags.
  fn apply_role_changes(
    &self,
    person_id: String,
    changes: RoleChanges,
    fields: RoleFields,
  ) -> impl Future<Output = Result<RoleFlags, Self::Error>> + Send + '_;

  // ── Registration ──────────────────────────────────────────────────────

  /// File a PENDING request. Fails with `AlreadyRegistered` if the national id
  /// already logs in or already waits for review.
  fn request_registration(
    &self,
    request: ValidRegistration,
    password_hash: String,
  ) -> impl Future<Output = Result<CreatedRegistration, Self::Error>> + Send + '_;

  fn list_pending_registrations(
    &self,
  ) -> impl Future<Output = Result<Vec<Registration>, Self::Error>> + Send + '_;

  /// Create or complete the person, store the requested password and grant
  /// the internal role, in one unit of work. A request that is no longer
  /// pending yields a failed [`Outcome`].
  fn approve_registration(
    &self,
    registration_id: i64,
    reviewer_id: String,
  ) -> impl Future<Output = Result<Outcome, Self::Error>> + Send + '_;

  fn reject_registration(
    &self,
    registration_id: i64,
    reviewer_id: String,
    notes: Option<String>,
  ) -> impl Future<Output = Result<Outcome, Self::Error>> + Send + '_;

  // ── Activities ────────────────────────────────────────────────────────

  fn list_activities(
    &self,
  ) -> impl Future<Output = Result<Vec<Activity>, Self::Error>> + Send + '_;

  fn create_activity(
    &self,
    input: NewActivity,
  ) -> impl Future<Output = Result<Activity, Self::Error>> + Send + '_;

  /// Take a seat for `person_id` directly, without an invitation. A full
  /// activity or a repeated enrollment yields a failed [`Outcome`].
  fn enroll_in_activity(
    &self,
    person_id: String,
    activity_id: i64,
  ) -> impl Future<Output = Result<Outcome, Self::Error>> + Send + '_;

  fn list_enrollments<'a>(
    &'a self,
    person_id: &'a str,
  ) -> impl Future<Output = Result<Vec<Participation>, Self::Error>> + Send + 'a;

  // ── Invitations (inviter side) ────────────────────────────────────────

  /// Create a PENDING invitation with a fresh token. The inviter must be an
  /// internal member.
  fn create_invitation(
    &self,
    inviter_id: String,
    input: NewInvitation,
  ) -> impl Future<Output = Result<CreatedInvitation, Self::Error>> + Send + '_;

  fn list_invitations<'a>(
    &'a self,
    inviter_id: &'a str,
  ) -> impl Future<Output = Result<Vec<Invitation>, Self::Error>> + Send + 'a;

  /// Delete one of the inviter's own invitations.
  fn delete_invitation(
    &self,
    inviter_id: String,
    invitation_id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Invitations (guest side) ──────────────────────────────────────────

  /// Validate a bearer token and open a guest session bound to the invitation.
  fn authenticate_invitation(
    &self,
    token: InvitationToken,
  ) -> impl Future<Output = Result<InvitationSession, Self::Error>> + Send + '_;

  /// The invitation behind a guest session, re-read by token, with its seat
  /// once accepted. Both reads share one connection.
  fn guest_dashboard<'a>(
    &'a self,
    session: &'a InvitationSession,
  ) -> impl Future<Output = Result<Option<GuestDashboard>, Self::Error>> + Send + 'a;

  /// PENDING → ACCEPTED. A non-pending invitation yields a failed
  /// [`Outcome`], not an error.
  fn accept_invitation<'a>(
    &'a self,
    session: &'a mut InvitationSession,
  ) -> impl Future<Output = Result<Outcome, Self::Error>> + Send + 'a;

  /// PENDING → REJECTED, with the same rules as `accept_invitation`.
  fn reject_invitation<'a>(
    &'a self,
    session: &'a mut InvitationSession,
  ) -> impl Future<Output = Result<Outcome, Self::Error>> + Send + 'a;
}
