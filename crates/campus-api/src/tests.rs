//! Router tests driven through `tower::ServiceExt::oneshot` against a real
//! SQLite store on a throwaway file.

use std::{path::PathBuf, time::Duration};

use axum::{
  body::{Body, to_bytes},
  http::{Request, StatusCode, header},
  response::Response,
};
use campus_core::{
  person::ValidPerson,
  roles::{RoleChanges, RoleFields},
  store::CampusStore,
};
use campus_store_sqlite::{BUNDLED_SQL_ROOT, SqliteStore};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use crate::{ApiConfig, AppState, password::hash_password, router};

const PASSWORD: &str = "correct horse";

struct Harness {
  state: AppState<SqliteStore>,
  path:  PathBuf,
}

impl Drop for Harness {
  fn drop(&mut self) {
    for suffix in ["", "-wal", "-shm"] {
      let _ = std::fs::remove_file(format!("{}{suffix}", self.path.display()));
    }
  }
}

impl Harness {
  async fn new() -> Self {
    let path = std::env::temp_dir().join(format!("campus-api-{}.db", Uuid::new_v4()));
    let store = SqliteStore::open(&path, BUNDLED_SQL_ROOT, Duration::from_secs(5))
      .await
      .unwrap();
    Self { state: AppState::new(store, ApiConfig::default()), path }
  }

  async fn send(
    &self,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
  ) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
      builder = builder.header(header::COOKIE, cookie);
    }
    let req = match body {
      Some(body) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    router(self.state.clone()).oneshot(req).await.unwrap()
  }

  async fn send_form(&self, uri: &str, cookie: &str, form: &str) -> Response {
    let req = Request::builder()
      .method("POST")
      .uri(uri)
      .header(header::COOKIE, cookie)
      .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
      .body(Body::from(form.to_owned()))
      .unwrap();
    router(self.state.clone()).oneshot(req).await.unwrap()
  }

  async fn seed(&self, id: &str, changes: RoleChanges, fields: RoleFields) {
    let person = ValidPerson {
      person_id:  id.into(),
      name:       format!("Person {id}"),
      email:      format!("{id}@campus.test"),
      phone:      None,
      birth_date: None,
    };
    self
      .state
      .store
      .create_person(person, Some(hash_password(PASSWORD).unwrap()), changes, fields)
      .await
      .unwrap();
  }

  async fn seed_admin(&self, id: &str) {
    self
      .seed(
        id,
        RoleChanges {
          internal: Some(true),
          staff: Some(true),
          administrator: Some(true),
          ..RoleChanges::default()
        },
        RoleFields {
          membership_number: Some("M-ADMIN".into()),
          qualification: Some("Management".into()),
          ..RoleFields::default()
        },
      )
      .await;
  }

  async fn seed_internal(&self, id: &str) {
    self
      .seed(
        id,
        RoleChanges { internal: Some(true), ..RoleChanges::default() },
        RoleFields { membership_number: Some(format!("M-{id}")), ..RoleFields::default() },
      )
      .await;
  }

  async fn login(&self, login: &str) -> String {
    let resp = self
      .send(
        "POST",
        "/auth/login",
        None,
        Some(json!({"login": login, "password": PASSWORD})),
      )
      .await;
    assert_eq!(resp.status(), StatusCode::OK);
    cookie_of(&resp).expect("session cookie")
  }
}

fn cookie_of(resp: &Response) -> Option<String> {
  let value = resp.headers().get(header::SET_COOKIE)?.to_str().ok()?;
  value.split(';').next().map(str::to_owned)
}

async fn json_body(resp: Response) -> Value {
  let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

// ── Authentication ──────────────────────────────────────────────────────────

#[tokio::test]
async fn login_opens_a_session_with_role_flags() {
  let h = Harness::new().await;
  h.seed_admin("100").await;

  let cookie = h.login("100@campus.test").await;
  let resp = h.send("GET", "/auth/me", Some(&cookie), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let me = json_body(resp).await;
  assert_eq!(me["person_id"], "100");
  assert_eq!(me["roles"]["is_administrator"], true);
  assert_eq!(me["roles"]["is_certified_professional"], false);
}

#[tokio::test]
async fn wrong_password_is_refused() {
  let h = Harness::new().await;
  h.seed_internal("200").await;

  let resp = h
    .send("POST", "/auth/login", None, Some(json!({"login": "200", "password": "nope"})))
    .await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert!(cookie_of(&resp).is_none());
  let body = json_body(resp).await;
  assert_eq!(body["success"], false);
}

#[tokio::test]
async fn logout_closes_the_session() {
  let h = Harness::new().await;
  h.seed_internal("210").await;
  let cookie = h.login("210").await;

  let resp = h.send("POST", "/auth/logout", Some(&cookie), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let resp = h.send("GET", "/auth/me", Some(&cookie), None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_check_the_role() {
  let h = Harness::new().await;
  h.seed_internal("300").await;

  let resp = h.send("GET", "/admin/people", None, None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  let cookie = h.login("300").await;
  let resp = h.send("GET", "/admin/people", Some(&cookie), None).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

// ── People ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn admin_creates_a_person_from_a_form() {
  let h = Harness::new().await;
  h.seed_admin("400").await;
  let cookie = h.login("400").await;

  let resp = h
    .send_form(
      "/admin/people",
      &cookie,
      "person_id=401&name=Ana&email=ana%40campus.test&phone=&internal=on&membership_number=123&staff=on&qualification=Physiotherapy&attribution=Coach",
    )
    .await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let body = json_body(resp).await;
  assert_eq!(body["roles"]["is_staff"], true);

  let resp = h.send("GET", "/admin/people/401", Some(&cookie), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let person = json_body(resp).await;
  assert_eq!(person["phone"], Value::Null);
  assert_eq!(person["membership_number"], "123");
  assert_eq!(person["attributions"], json!(["Coach"]));
}

#[tokio::test]
async fn staff_before_internal_walks_through_the_cascade() {
  let h = Harness::new().await;
  h.seed_admin("500").await;
  h.seed("501", RoleChanges::default(), RoleFields::default()).await;
  let cookie = h.login("500").await;
  let roles = "/admin/people/501/roles";

  let resp = h.send("PUT", roles, Some(&cookie), Some(json!({"staff": true}))).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let resp = h
    .send("PUT", roles, Some(&cookie), Some(json!({"internal": true, "membership_number": "123"})))
    .await;
  assert_eq!(resp.status(), StatusCode::OK);

  let resp = h
    .send("PUT", roles, Some(&cookie), Some(json!({"staff": true, "qualification": "Physiotherapy"})))
    .await;
  assert_eq!(json_body(resp).await["roles"]["is_staff"], true);

  let resp = h.send("PUT", roles, Some(&cookie), Some(json!({"internal": false}))).await;
  let body = json_body(resp).await;
  assert_eq!(body["roles"]["is_internal"], false);
  assert_eq!(body["roles"]["is_staff"], false);
}

#[tokio::test]
async fn revoked_role_stops_working_in_open_sessions() {
  let h = Harness::new().await;
  h.seed_admin("600").await;
  h.seed_internal("601").await;
  let admin = h.login("600").await;
  let member = h.login("601").await;

  let resp = h.send("GET", "/internal/invites", Some(&member), None).await;
  assert_eq!(resp.status(), StatusCode::OK);

  let resp = h
    .send("PUT", "/admin/people/601/roles", Some(&admin), Some(json!({"internal": false})))
    .await;
  assert_eq!(resp.status(), StatusCode::OK);

  let resp = h.send("GET", "/internal/invites", Some(&member), None).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deleting_a_person_ends_their_sessions() {
  let h = Harness::new().await;
  h.seed_admin("700").await;
  h.seed_internal("701").await;
  let admin = h.login("700").await;
  let member = h.login("701").await;

  let resp = h.send("DELETE", "/admin/people/701", Some(&admin), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let resp = h.send("GET", "/auth/me", Some(&member), None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  let resp = h.send("GET", "/admin/people/701", Some(&admin), None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn password_change_lands_only_with_the_rest_of_the_update() {
  let h = Harness::new().await;
  h.seed_admin("650").await;
  h.seed("651", RoleChanges::default(), RoleFields::default()).await;
  let admin = h.login("650").await;
  let uri = "/admin/people/651";

  let resp = h
    .send(
      "PUT",
      uri,
      Some(&admin),
      Some(json!({
        "name": "Renamed",
        "email": "651@campus.test",
        "password": "brand new",
        "staff": true,
        "qualification": "Nursing",
      })),
    )
    .await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  h.login("651").await;

  let resp = h
    .send(
      "PUT",
      uri,
      Some(&admin),
      Some(json!({"name": "Renamed", "email": "651@campus.test", "password": "brand new"})),
    )
    .await;
  assert_eq!(resp.status(), StatusCode::OK);
  let resp = h
    .send("POST", "/auth/login", None, Some(json!({"login": "651", "password": "brand new"})))
    .await;
  assert_eq!(resp.status(), StatusCode::OK);
  let resp = h
    .send("POST", "/auth/login", None, Some(json!({"login": "651", "password": PASSWORD})))
    .await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn inviters_lose_roles_but_are_not_deleted_under_their_invitations() {
  let h = Harness::new().await;
  h.seed_admin("660").await;
  h.seed_internal("661").await;
  let admin = h.login("660").await;
  let member = h.login("661").await;

  let resp = h
    .send(
      "POST",
      "/internal/invites",
      Some(&member),
      Some(json!({"invitee_document": "G-9", "invitee_name": "Guest"})),
    )
    .await;
  assert_eq!(resp.status(), StatusCode::CREATED);

  let resp = h
    .send("PUT", "/admin/people/661/roles", Some(&admin), Some(json!({"internal": false})))
    .await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_body(resp).await["roles"]["is_internal"], false);

  let resp = h.send("DELETE", "/admin/people/661", Some(&admin), None).await;
  assert_eq!(resp.status(), StatusCode::CONFLICT);
  let body = json_body(resp).await;
  assert_eq!(body["success"], false);
  assert!(body["message"].as_str().unwrap().contains("invitations"));
}

// ── Registration ────────────────────────────────────────────────────────────

#[tokio::test]
async fn approved_registration_can_log_in() {
  let h = Harness::new().await;
  h.seed_admin("1000").await;
  let admin = h.login("1000").await;

  let form = format!(
    "person_id=1001&name=Bia&email=bia%40campus.test&phone=&membership_number=N-1001&password={pw}&password_confirm={pw}",
    pw = "correct+horse",
  );
  let req = Request::builder()
    .method("POST")
    .uri("/auth/register")
    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
    .body(Body::from(form))
    .unwrap();
  let resp = router(h.state.clone()).oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::CREATED);
  let registration_id = json_body(resp).await["registration_id"].as_i64().unwrap();

  let resp = h
    .send("POST", "/auth/login", None, Some(json!({"login": "1001", "password": PASSWORD})))
    .await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  let resp = h.send("GET", "/admin/registrations", Some(&admin), None).await;
  let pending = json_body(resp).await;
  assert_eq!(pending[0]["registration_id"], registration_id);
  assert_eq!(pending[0]["status"], "PENDING");
  assert!(pending[0].get("password_hash").is_none());

  let uri = format!("/admin/registrations/{registration_id}/approve");
  let resp = h.send("POST", &uri, Some(&admin), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_body(resp).await["success"], true);

  let member = h.login("bia@campus.test").await;
  let me = json_body(h.send("GET", "/auth/me", Some(&member), None).await).await;
  assert_eq!(me["roles"]["is_internal"], true);

  let resp = h.send("POST", &uri, Some(&admin), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_body(resp).await["success"], false);
}

#[tokio::test]
async fn registration_form_is_checked_before_the_store() {
  let h = Harness::new().await;
  let resp = h
    .send(
      "POST",
      "/auth/register",
      None,
      Some(json!({
        "person_id": "1100",
        "name": "Caio",
        "email": "caio@campus.test",
        "membership_number": "N-1100",
        "password": "one",
        "password_confirm": "two",
      })),
    )
    .await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert_eq!(json_body(resp).await["message"], "passwords do not match");
}

#[tokio::test]
async fn rejected_registration_leaves_the_queue() {
  let h = Harness::new().await;
  h.seed_admin("1200").await;
  let admin = h.login("1200").await;
  let resp = h
    .send(
      "POST",
      "/auth/register",
      None,
      Some(json!({
        "person_id": "1201",
        "name": "Duda",
        "email": "duda@campus.test",
        "membership_number": "N-1201",
        "password": PASSWORD,
        "password_confirm": PASSWORD,
      })),
    )
    .await;
  let registration_id = json_body(resp).await["registration_id"].as_i64().unwrap();

  let resp = h
    .send(
      "POST",
      &format!("/admin/registrations/{registration_id}/reject"),
      Some(&admin),
      Some(json!({"notes": "not a member"})),
    )
    .await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_body(resp).await["status"], "REJECTED");

  let resp = h.send("GET", "/admin/registrations", Some(&admin), None).await;
  assert_eq!(json_body(resp).await, json!([]));
  let resp = h.send("GET", "/admin/people/1201", Some(&admin), None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ── Direct enrollment ───────────────────────────────────────────────────────

#[tokio::test]
async fn members_enroll_directly_within_capacity() {
  let h = Harness::new().await;
  h.seed_admin("1300").await;
  h.seed_internal("1301").await;
  h.seed_internal("1302").await;
  let admin = h.login("1300").await;
  let first = h.login("1301").await;
  let second = h.login("1302").await;

  let resp = h
    .send(
      "POST",
      "/admin/activities",
      Some(&admin),
      Some(json!({"name": "Rowing", "capacity": 1})),
    )
    .await;
  let activity_id = json_body(resp).await["activity_id"].as_i64().unwrap();
  let uri = format!("/internal/activities/{activity_id}/enroll");

  let resp = h.send("POST", &uri, Some(&first), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_body(resp).await["success"], true);

  let resp = h.send("POST", &uri, Some(&first), None).await;
  let body = json_body(resp).await;
  assert_eq!(body["success"], false);
  assert_eq!(body["message"], "Already enrolled in this activity");

  let resp = h.send("POST", &uri, Some(&second), None).await;
  let body = json_body(resp).await;
  assert_eq!(body["success"], false);
  assert_eq!(body["message"], "No remaining capacity for this activity");

  let resp = h.send("GET", "/internal/enrollments", Some(&first), None).await;
  let seats = json_body(resp).await;
  assert_eq!(seats[0]["activity_name"], "Rowing");
  assert_eq!(seats[0]["person_id"], "1301");

  let resp = h.send("POST", "/internal/activities/999/enroll", Some(&second), None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ── Invitations ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn guest_accepts_once() {
  let h = Harness::new().await;
  h.seed_admin("800").await;
  h.seed_internal("801").await;
  let admin = h.login("800").await;
  let member = h.login("801").await;

  let resp = h
    .send(
      "POST",
      "/admin/activities",
      Some(&admin),
      Some(json!({"name": "Swimming", "capacity": 2})),
    )
    .await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let activity_id = json_body(resp).await["activity_id"].clone();

  let resp = h
    .send(
      "POST",
      "/internal/invites",
      Some(&member),
      Some(json!({
        "invitee_document": "G-1",
        "invitee_name": "Guest",
        "activity_id": activity_id,
      })),
    )
    .await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let token = json_body(resp).await["token"].as_str().unwrap().to_owned();

  let resp = h.send("POST", "/external/enter", None, Some(json!({"token": token}))).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let guest = cookie_of(&resp).unwrap();

  let resp = h.send("POST", "/external/accept", Some(&guest), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_body(resp).await;
  assert_eq!(body["success"], true);
  assert_eq!(body["status"], "ACCEPTED");

  let resp = h.send("POST", "/external/accept", Some(&guest), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_body(resp).await["success"], false);

  let resp = h.send("POST", "/external/reject", Some(&guest), None).await;
  let body = json_body(resp).await;
  assert_eq!(body["success"], false);
  assert_eq!(body["status"], "ACCEPTED");

  let resp = h.send("GET", "/external/dashboard", Some(&guest), None).await;
  let body = json_body(resp).await;
  assert_eq!(body["invitation"]["status"], "ACCEPTED");
  assert_eq!(body["participation"]["activity_name"], "Swimming");

  let resp = h.send("GET", "/activities", Some(&member), None).await;
  let activities = json_body(resp).await;
  assert_eq!(activities[0]["enrolled"], 1);
}

#[tokio::test]
async fn unknown_token_opens_no_session() {
  let h = Harness::new().await;
  let resp = h.send("POST", "/external/enter", None, Some(json!({"token": "abc"}))).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert!(cookie_of(&resp).is_none());
}

#[tokio::test]
async fn user_session_is_not_a_guest_session() {
  let h = Harness::new().await;
  h.seed_internal("900").await;
  let member = h.login("900").await;

  let resp = h.send("POST", "/external/accept", Some(&member), None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn member_deletes_only_their_invitations() {
  let h = Harness::new().await;
  h.seed_internal("950").await;
  h.seed_internal("951").await;
  let owner = h.login("950").await;
  let other = h.login("951").await;

  let resp = h
    .send(
      "POST",
      "/internal/invites",
      Some(&owner),
      Some(json!({"invitee_document": "G-2", "invitee_name": "Guest"})),
    )
    .await;
  let invitation_id = json_body(resp).await["invitation_id"].as_i64().unwrap();
  let uri = format!("/internal/invites/{invitation_id}");

  let resp = h.send("DELETE", &uri, Some(&other), None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  let resp = h.send("DELETE", &uri, Some(&owner), None).await;
  assert_eq!(resp.status(), StatusCode::OK);

  let resp = h.send("GET", "/internal/invites", Some(&owner), None).await;
  assert_eq!(json_body(resp).await, json!([]));
}
