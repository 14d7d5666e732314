//! [`SqliteStore`], the SQLite implementation of [`CampusStore`].

use std::{path::Path, time::Duration};

use campus_core::{
  Error as CoreError,
  activity::{Activity, NewActivity, Participation},
  invitation::{
    CreatedInvitation, GuestDashboard, Invitation, InvitationStatus, InvitationToken,
    NewInvitation, Transition,
  },
  outcome::Outcome,
  person::{LoginRecord, Person, PersonDetail, PersonUpdate, ValidPerson},
  registration::{CreatedRegistration, Registration, Review, ValidRegistration},
  roles::{RoleChanges, RoleFields, RoleFlags},
  session::InvitationSession,
  store::CampusStore,
};
use serde::Deserialize;

use crate::{
  AssetCatalog, Database, Error, Executor, Params, Result, executor::decode,
  invitations, registrations, roles,
};

/// Where the SQL assets bundled with this crate live.
pub const BUNDLED_SQL_ROOT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/sql");

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Campus store backed by a single SQLite file.
///
/// Cloning is cheap. Every operation opens its own connection through
/// [`Database::session`] and releases it when the operation ends.
#[derive(Debug, Clone)]
pub struct SqliteStore {
  db: Database,
}

impl SqliteStore {
  /// Load the assets under `sql_root`, then open (or create) the database at
  /// `path` and bring its schema up to date.
  pub async fn open(
    path: impl AsRef<Path>,
    sql_root: impl AsRef<Path>,
    busy_timeout: Duration,
  ) -> Result<Self> {
    let assets = AssetCatalog::load(sql_root)?;
    Self::from_database(Database::new(path, assets, busy_timeout)).await
  }

  pub async fn from_database(db: Database) -> Result<Self> {
    db.initialize().await?;
    Ok(Self { db })
  }

  pub fn database(&self) -> &Database { &self.db }

  async fn transition(
    &self,
    session: &mut InvitationSession,
    transition: Transition,
  ) -> Result<Outcome> {
    let token = session.token.clone();
    let (outcome, row) = self
      .db
      .session()
      .await?
      .with_connection(move |conn, assets| {
        invitations::transition(conn, assets, &token, transition)
      })
      .await?;

    match row {
      Some(invitation) => session.reconcile(&invitation),
      None if outcome.success => {
        tracing::warn!(
          invitation_id = session.invitation_id,
          "invitation vanished after commit; assuming target status"
        );
        session.status = transition.target();
      }
      None => {}
    }
    Ok(outcome)
  }
}

#[derive(Deserialize)]
struct InsertedActivity {
  activity_id: i64,
}

#[derive(Deserialize)]
struct Dependents {
  invitations:    i64,
  participations: i64,
}

// ─── CampusStore impl ────────────────────────────────────────────────────────

impl CampusStore for SqliteStore {
  type Error = Error;

  // ── People ────────────────────────────────────────────────────────────────

  async fn list_people(&self) -> Result<Vec<Person>> {
    let rows = self.db.session().await?.fetch_all("people/list", Params::new()).await?;
    rows.into_iter().map(decode).collect()
  }

  async fn get_person(&self, person_id: &str) -> Result<Option<PersonDetail>> {
    let row = self
      .db
      .session()
      .await?
      .fetch_one("people/get", Params::new().with("person_id", person_id))
      .await?;
    row.map(decode).transpose()
  }

  async fn create_person(
    &self,
    person: ValidPerson,
    password_hash: Option<String>,
    changes: RoleChanges,
    fields: RoleFields,
  ) -> Result<RoleFlags> {
    let params = Params::new()
      .with("person_id", &person.person_id)
      .with("name", person.name)
      .with("email", person.email)
      .with("phone", person.phone)
      .with("birth_date", person.birth_date)
      .with("password_hash", password_hash);
    let person_id = person.person_id;

    let flags = self
      .db
      .session()
      .await?
      .unit_of_work(move |exec| {
        exec.execute_statement("people/create", &params)?;
        roles::apply(exec, &person_id, changes, &fields)
      })
      .await?;
    tracing::info!(roles = ?flags, "person created");
    Ok(flags)
  }

  async fn update_person(
    &self,
    person_id: String,
    update: PersonUpdate,
    password_hash: Option<String>,
    changes: RoleChanges,
    fields: RoleFields,
  ) -> Result<RoleFlags> {
    update.validate()?;
    let params = Params::new()
      .with("person_id", &person_id)
      .with("name", update.name)
      .with("email", update.email)
      .with("phone", update.phone);

    self
      .db
      .session()
      .await?
      .unit_of_work(move |exec| {
        if roles::load_state(exec, &person_id)?.is_none() {
          return Err(CoreError::PersonNotFound(person_id).into());
        }
        exec.execute_statement("people/update", &params)?;
        if let Some(hash) = password_hash {
          exec.execute_statement(
            "people/set_password",
            &Params::new().with("person_id", &person_id).with("password_hash", hash),
          )?;
          tracing::info!(%person_id, "password replaced");
        }
        roles::apply(exec, &person_id, changes, &fields)
      })
      .await
  }

  async fn delete_person(&self, person_id: String) -> Result<()> {
    self
      .db
      .session()
      .await?
      .unit_of_work(move |exec| {
        let by_id = Params::new().with("person_id", &person_id);
        if roles::load_state(exec, &person_id)?.is_none() {
          return Err(CoreError::PersonNotFound(person_id).into());
        }
        let dependents: Dependents = exec
          .fetch_one_as("people/dependents", &by_id)?
          .ok_or_else(|| Error::NoResult { asset: "people/dependents".into() })?;
        if dependents.invitations > 0 || dependents.participations > 0 {
          tracing::debug!(
            %person_id,
            invitations = dependents.invitations,
            participations = dependents.participations,
            "person still referenced"
          );
          return Err(CoreError::PersonHasDependents(person_id).into());
        }

        roles::apply(exec, &person_id, RoleChanges::revoke_all(), &RoleFields::default())?;
        exec
          .fetch_one("people/delete", &by_id)?
          .ok_or_else(|| CoreError::PersonNotFound(person_id.clone()))?;
        tracing::info!(%person_id, "person deleted");
        Ok(())
      })
      .await
  }

  async fn find_login(&self, login: &str) -> Result<Option<LoginRecord>> {
    let row = self
      .db
      .session()
      .await?
      .fetch_one("auth/find_login", Params::new().with("login", login))
      .await?;
    row.map(decode).transpose()
  }

  // ── Roles ─────────────────────────────────────────────────────────────────

  async fn role_flags(&self, person_id: &str) -> Result<Option<RoleFlags>> {
    let person_id = person_id.to_owned();
    let state = self
      .db
      .session()
      .await?
      .with_connection(move |conn, assets| {
        roles::load_state(&Executor::new(conn, assets), &person_id)
      })
      .await?;
    Ok(state.map(|s| s.flags))
  }

  async fn apply_role_changes(
    &self,
    person_id: String,
    changes: RoleChanges,
    fields: RoleFields,
  ) -> Result<RoleFlags> {
    self
      .db
      .session()
      .await?
      .unit_of_work(move |exec| roles::apply(exec, &person_id, changes, &fields))
      .await
  }

  // ── Registration ──────────────────────────────────────────────────────────

  async fn request_registration(
    &self,
    request: ValidRegistration,
    password_hash: String,
  ) -> Result<CreatedRegistration> {
    self
      .db
      .session()
      .await?
      .unit_of_work(move |exec| registrations::request(exec, request, password_hash))
      .await
  }

  async fn list_pending_registrations(&self) -> Result<Vec<Registration>> {
    self
      .db
      .session()
      .await?
      .with_connection(|conn, assets| registrations::list_pending(&Executor::new(conn, assets)))
      .await
  }

  async fn approve_registration(
    &self,
    registration_id: i64,
    reviewer_id: String,
  ) -> Result<Outcome> {
    self
      .db
      .session()
      .await?
      .unit_of_work(move |exec| {
        registrations::review(exec, registration_id, &reviewer_id, Review::Approve, None)
      })
      .await
  }

  async fn reject_registration(
    &self,
    registration_id: i64,
    reviewer_id: String,
    notes: Option<String>,
  ) -> Result<Outcome> {
    self
      .db
      .session()
      .await?
      .unit_of_work(move |exec| {
        registrations::review(exec, registration_id, &reviewer_id, Review::Reject, notes)
      })
      .await
  }

  // ── Activities ────────────────────────────────────────────────────────────

  async fn list_activities(&self) -> Result<Vec<Activity>> {
    let rows = self
      .db
      .session()
      .await?
      .fetch_all("activities/list", Params::new())
      .await?;
    rows.into_iter().map(decode).collect()
  }

  async fn create_activity(&self, input: NewActivity) -> Result<Activity> {
    input.validate()?;
    let params = Params::new()
      .with("name", input.name)
      .with("capacity", input.capacity)
      .with("starts_on", input.starts_on);

    let activity = self
      .db
      .session()
      .await?
      .unit_of_work(move |exec| {
        let inserted: InsertedActivity = exec
          .fetch_one_as("activities/create", &params)?
          .ok_or_else(|| Error::NoResult { asset: "activities/create".into() })?;
        exec
          .fetch_one_as::<Activity>(
            "activities/get",
            &Params::new().with("activity_id", inserted.activity_id),
          )?
          .ok_or_else(|| CoreError::ActivityNotFound(inserted.activity_id).into())
      })
      .await?;
    tracing::info!(activity_id = activity.activity_id, capacity = activity.capacity, "activity created");
    Ok(activity)
  }

  async fn enroll_in_activity(&self, person_id: String, activity_id: i64) -> Result<Outcome> {
    let outcome = self
      .db
      .session()
      .await?
      .unit_of_work(move |exec| {
        if roles::load_state(exec, &person_id)?.is_none() {
          return Err(CoreError::PersonNotFound(person_id).into());
        }
        let params = Params::new()
          .with("person_id", &person_id)
          .with("activity_id", activity_id);
        if exec.fetch_one("activities/get", &params)?.is_none() {
          return Err(CoreError::ActivityNotFound(activity_id).into());
        }
        exec
          .fetch_one("activities/enroll", &params)?
          .and_then(|mut row| row.remove("result"))
          .and_then(Outcome::from_value)
          .ok_or_else(|| Error::NoResult { asset: "activities/enroll".into() })
      })
      .await?;
    tracing::info!(activity_id, success = outcome.success, "direct enrollment");
    Ok(outcome)
  }

  async fn list_enrollments(&self, person_id: &str) -> Result<Vec<Participation>> {
    let rows = self
      .db
      .session()
      .await?
      .fetch_all(
        "activities/participations_by_person",
        Params::new().with("person_id", person_id),
      )
      .await?;
    rows.into_iter().map(decode).collect()
  }

  // ── Invitations (inviter side) ────────────────────────────────────────────

  async fn create_invitation(
    &self,
    inviter_id: String,
    input: NewInvitation,
  ) -> Result<CreatedInvitation> {
    let input = input.validate()?;
    self
      .db
      .session()
      .await?
      .with_connection(move |conn, assets| {
        invitations::create(conn, assets, &inviter_id, input)
      })
      .await
  }

  async fn list_invitations(&self, inviter_id: &str) -> Result<Vec<Invitation>> {
    let rows = self
      .db
      .session()
      .await?
      .fetch_all(
        "invitations/list_by_inviter",
        Params::new().with("inviter_id", inviter_id),
      )
      .await?;
    rows.into_iter().map(decode).collect()
  }

  async fn delete_invitation(&self, inviter_id: String, invitation_id: i64) -> Result<()> {
    self
      .db
      .session()
      .await?
      .unit_of_work(move |exec| {
        let params = Params::new()
          .with("inviter_id", &inviter_id)
          .with("invitation_id", invitation_id);
        match exec.fetch_one("invitations/delete", &params)? {
          Some(_) => {
            tracing::info!(invitation_id, %inviter_id, "invitation deleted");
            Ok(())
          }
          None => Err(CoreError::InvitationNotFound.into()),
        }
      })
      .await
  }

  // ── Invitations (guest side) ──────────────────────────────────────────────

  async fn authenticate_invitation(&self, token: InvitationToken) -> Result<InvitationSession> {
    if token.expose().is_empty() {
      return Err(CoreError::InvalidToken.into());
    }
    let row = self
      .db
      .session()
      .await?
      .fetch_one(
        "invitations/get_by_token",
        Params::new().with("token", token.expose()),
      )
      .await?;
    let Some(invitation) = row.map(decode::<Invitation>).transpose()? else {
      tracing::debug!(%token, "unknown invitation token");
      return Err(CoreError::InvalidToken.into());
    };
    tracing::info!(invitation_id = invitation.invitation_id, status = %invitation.status, "guest entered");
    Ok(InvitationSession::new(token, &invitation))
  }

  async fn guest_dashboard(&self, session: &InvitationSession) -> Result<Option<GuestDashboard>> {
    let token = session.token.clone();
    self
      .db
      .session()
      .await?
      .with_connection(move |conn, assets| {
        // One read transaction, so the seat matches the status it is shown with.
        let tx = conn.transaction()?;
        let exec = Executor::new(&tx, assets);
        let Some(invitation) = invitations::by_token(&exec, &token)? else {
          return Ok(None);
        };
        let participation = if invitation.status == InvitationStatus::Accepted {
          exec.fetch_one_as(
            "invitations/participation",
            &Params::new().with("invitation_id", invitation.invitation_id),
          )?
        } else {
          None
        };
        tx.commit()?;
        Ok(Some(GuestDashboard { invitation, participation }))
      })
      .await
  }

  async fn accept_invitation(&self, session: &mut InvitationSession) -> Result<Outcome> {
    self.transition(session, Transition::Accept).await
  }

  async fn reject_invitation(&self, session: &mut InvitationSession) -> Result<Outcome> {
    self.transition(session, Transition::Reject).await
  }
}
