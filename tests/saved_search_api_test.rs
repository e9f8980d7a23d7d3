use std::env;
use std::sync::Mutex;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::get,
    Router,
};
use chrono::{Duration, Utc};
use jobboard_backend::middleware::auth;
use jobboard_backend::models::user::User;
use jobboard_backend::services::alert_service::AlertService;
use jobboard_backend::services::mail_service::AlertMailer;
use jobboard_backend::services::saved_search_service::SavedSearchService;
use jobboard_backend::{routes, AppState};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;
use uuid::Uuid;

/// Dispatch runs scan every candidate in the shared database, so tests that
/// invoke them must not overlap.
static DISPATCH_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

/// Records every send instead of talking to a transport.
struct RecordingMailer {
    sent: Mutex<Vec<(String, String, String)>>,
    succeed: bool,
}

impl RecordingMailer {
    fn new(succeed: bool) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            succeed,
        }
    }

    fn sent_for(&self, search_name: &str) -> Vec<(String, String, String)> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, subject, _)| subject.contains(search_name))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AlertMailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> bool {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string(), html_body.to_string()));
        self.succeed
    }
}

/// Initializes config and connects; returns None when no database is
/// configured so the suite can be run without Postgres.
async fn setup() -> Option<sqlx::PgPool> {
    dotenvy::dotenv().ok();
    if env::var("DATABASE_URL").is_err() {
        eprintln!("skipping: DATABASE_URL not set");
        return None;
    }
    env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    env::set_var("JWT_SECRET", "test_secret_key");
    let _ = jobboard_backend::config::init_config();

    let pool = jobboard_backend::database::pool::create_pool()
        .await
        .expect("pool");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");
    Some(pool)
}

async fn seed_user(pool: &sqlx::PgPool) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, name, email) VALUES ($1, $2, $3)")
        .bind(id)
        .bind("Test User")
        .bind(format!("user_{}@example.com", id))
        .execute(pool)
        .await
        .expect("seed user");
    id
}

async fn seed_job(pool: &sqlx::PgPool, title: &str, skills: &[&str]) -> Uuid {
    let id = Uuid::new_v4();
    let skills: Vec<String> = skills.iter().map(|s| s.to_string()).collect();
    sqlx::query(
        r#"INSERT INTO jobs (id, title, company_name, location, country, skills, salary, slug)
           VALUES ($1, $2, 'Acme', 'Berlin', 'Germany', $3, '$100k', $4)"#,
    )
    .bind(id)
    .bind(title)
    .bind(skills)
    .bind(format!("job-{}", id))
    .execute(pool)
    .await
    .expect("seed job");
    id
}

fn bearer_token(user_id: Uuid) -> String {
    let claims = auth::Claims {
        sub: user_id.to_string(),
        exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
        role: Some("candidate".to_string()),
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(b"test_secret_key"),
    )
    .expect("token")
}

fn saved_search_router(pool: sqlx::PgPool) -> Router {
    Router::new()
        .route(
            "/api/saved-searches",
            get(routes::saved_search::list_saved_searches)
                .post(routes::saved_search::create_saved_search),
        )
        .route(
            "/api/saved-searches/:id",
            axum::routing::patch(routes::saved_search::update_saved_search)
                .delete(routes::saved_search::delete_saved_search),
        )
        .route(
            "/api/saved-searches/:id/jobs",
            get(routes::saved_search::get_matching_jobs),
        )
        .route_layer(axum::middleware::from_fn(auth::require_bearer_auth))
        .with_state(AppState::new(pool))
}

async fn json_body(response: axum::response::Response) -> JsonValue {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn saved_search_crud_flow() {
    let Some(pool) = setup().await else { return };
    let user_id = seed_user(&pool).await;
    let owner = sqlx::query_as::<_, User>("SELECT id, name, email, created_at FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(&pool)
        .await
        .expect("owner");
    assert_eq!(owner.id, user_id);
    let token = bearer_token(user_id);
    let app = saved_search_router(pool.clone());

    let marker = Uuid::new_v4().simple().to_string();
    seed_job(&pool, &format!("Rust Engineer {}", marker), &["Rust"]).await;

    // Create requires a name.
    let response = app
        .clone()
        .oneshot(
            Request::post("/api/saved-searches")
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json")
                .body(Body::from(json!({ "name": "" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // A name made of whitespace is no name at all.
    let response = app
        .clone()
        .oneshot(
            Request::post("/api/saved-searches")
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json")
                .body(Body::from(json!({ "name": "   " }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Create and get the initial match count back.
    let response = app
        .clone()
        .oneshot(
            Request::post("/api/saved-searches")
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json")
                .body(Body::from(
                    json!({
                        "name": format!("search {}", marker),
                        "title": marker,
                        "skills": "Rust, Go",
                        "email_alerts": false,
                        "alert_frequency": "weekly"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["match_count"], json!(1));
    assert_eq!(body["saved_search"]["alert_frequency"], json!("weekly"));
    assert_eq!(
        body["saved_search"]["skills"],
        json!(["Rust", "Go"]),
        "comma-separated skills are split"
    );
    let search_id = body["saved_search"]["id"].as_str().unwrap().to_string();

    // Listing shows it.
    let response = app
        .clone()
        .oneshot(
            Request::get("/api/saved-searches")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let names: Vec<&str> = body["saved_searches"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&format!("search {}", marker).as_str()));

    // Matching jobs endpoint pages through the match set.
    let response = app
        .clone()
        .oneshot(
            Request::get(format!("/api/saved-searches/{}/jobs?page=1&limit=10", search_id))
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["total"], json!(1));
    assert_eq!(body["jobs"].as_array().unwrap().len(), 1);

    // Frequency-only update keeps last_alert_sent and recomputes the count.
    seed_job(&pool, &format!("Rust Developer {}", marker), &["Rust"]).await;
    let response = app
        .clone()
        .oneshot(
            Request::patch(format!("/api/saved-searches/{}", search_id))
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json")
                .body(Body::from(json!({ "alert_frequency": "daily" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["match_count"], json!(2));
    assert_eq!(body["saved_search"]["alert_frequency"], json!("daily"));
    assert!(body["saved_search"]["last_alert_sent"].is_null());

    // Other users cannot see or touch it.
    let stranger = seed_user(&pool).await;
    let response = app
        .clone()
        .oneshot(
            Request::patch(format!("/api/saved-searches/{}", search_id))
                .header("Authorization", format!("Bearer {}", bearer_token(stranger)))
                .header("Content-Type", "application/json")
                .body(Body::from(json!({ "name": "hijack" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Soft delete hides it from fetch and update alike.
    let response = app
        .clone()
        .oneshot(
            Request::delete(format!("/api/saved-searches/{}", search_id))
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::get(format!("/api/saved-searches/{}/jobs", search_id))
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // The row itself survives as an inactive record.
    let is_active: bool =
        sqlx::query_scalar("SELECT is_active FROM saved_searches WHERE id = $1")
            .bind(Uuid::parse_str(&search_id).unwrap())
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(!is_active);
}

#[tokio::test]
async fn skills_match_any_listed_skill_not_all() {
    let Some(pool) = setup().await else { return };
    let user_id = seed_user(&pool).await;
    let token = bearer_token(user_id);
    let app = saved_search_router(pool.clone());
    let marker = Uuid::new_v4().simple().to_string();

    let go = format!("Go-{}", marker);
    let rust = format!("Rust-{}", marker);
    let java = format!("Java-{}", marker);
    seed_job(&pool, &format!("Go Engineer {}", marker), &[&go]).await;
    seed_job(&pool, &format!("Java Engineer {}", marker), &[&java]).await;

    let response = app
        .clone()
        .oneshot(
            Request::post("/api/saved-searches")
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json")
                .body(Body::from(
                    json!({
                        "name": format!("skills {}", marker),
                        "skills": [go, rust],
                        "email_alerts": false
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    // Sharing one listed skill is enough; sharing none excludes the job.
    assert_eq!(body["match_count"], json!(1));
    let search_id = body["saved_search"]["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            Request::get(format!("/api/saved-searches/{}/jobs", search_id))
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let titles: Vec<&str> = body["jobs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|j| j["title"].as_str().unwrap())
        .collect();
    let expected = format!("Go Engineer {}", marker);
    assert_eq!(titles, vec![expected.as_str()]);
}

#[tokio::test]
async fn dispatcher_sends_one_alert_with_new_matches() {
    let Some(pool) = setup().await else { return };
    let _guard = DISPATCH_LOCK.lock().await;
    let user_id = seed_user(&pool).await;
    let searches = SavedSearchService::new(pool.clone());
    let marker = Uuid::new_v4().simple().to_string();

    let search = searches
        .create(
            user_id,
            serde_json::from_value(json!({
                "name": format!("weekly {}", marker),
                "title": marker,
                "alert_frequency": "weekly"
            }))
            .unwrap(),
        )
        .await
        .unwrap();

    // Last alerted 8 days ago, well past the weekly window.
    let eight_days_ago = Utc::now() - Duration::days(8);
    sqlx::query("UPDATE saved_searches SET last_alert_sent = $1 WHERE id = $2")
        .bind(eight_days_ago)
        .bind(search.id)
        .execute(&pool)
        .await
        .unwrap();

    for i in 0..3 {
        seed_job(&pool, &format!("Engineer {} {}", i, marker), &["Rust"]).await;
    }

    let alert_service = AlertService::new(pool.clone(), "http://localhost:3000".into(), 10);
    let mailer = RecordingMailer::new(true);
    alert_service.run_once(&mailer).await.unwrap();

    let sent = mailer.sent_for(&format!("weekly {}", marker));
    assert_eq!(sent.len(), 1, "exactly one alert for the search");
    let (_, subject, body) = &sent[0];
    assert!(subject.starts_with("3 New Jobs"));
    for i in 0..3 {
        assert!(body.contains(&format!("Engineer {} {}", i, marker)));
    }
    assert!(body.contains("View All Matching Jobs"));
    assert!(body.contains(&format!("http://localhost:3000/?title={}", marker)));

    let last_sent: Option<chrono::DateTime<Utc>> =
        sqlx::query_scalar("SELECT last_alert_sent FROM saved_searches WHERE id = $1")
            .bind(search.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(last_sent.unwrap() > eight_days_ago + Duration::days(7));
}

#[tokio::test]
async fn dispatcher_skips_quietly_without_new_matches() {
    let Some(pool) = setup().await else { return };
    let _guard = DISPATCH_LOCK.lock().await;
    let user_id = seed_user(&pool).await;
    let searches = SavedSearchService::new(pool.clone());
    let marker = Uuid::new_v4().simple().to_string();

    let search = searches
        .create(
            user_id,
            serde_json::from_value(json!({
                "name": format!("quiet {}", marker),
                "title": marker
            }))
            .unwrap(),
        )
        .await
        .unwrap();
    assert!(search.last_alert_sent.is_none());

    // Counting is read-only and repeatable.
    let first = searches.count_matches(&search).await.unwrap();
    let second = searches.count_matches(&search).await.unwrap();
    assert_eq!(first, second);

    let alert_service = AlertService::new(pool.clone(), "http://localhost:3000".into(), 10);
    let mailer = RecordingMailer::new(true);
    alert_service.run_once(&mailer).await.unwrap();

    assert!(mailer.sent_for(&format!("quiet {}", marker)).is_empty());

    // No matches means no state change; the catch-up alert stays possible.
    let last_sent: Option<chrono::DateTime<Utc>> =
        sqlx::query_scalar("SELECT last_alert_sent FROM saved_searches WHERE id = $1")
            .bind(search.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(last_sent.is_none());
}

#[tokio::test]
async fn dispatcher_never_mails_disabled_or_deleted_searches() {
    let Some(pool) = setup().await else { return };
    let _guard = DISPATCH_LOCK.lock().await;
    let user_id = seed_user(&pool).await;
    let searches = SavedSearchService::new(pool.clone());
    let marker = Uuid::new_v4().simple().to_string();

    let muted = searches
        .create(
            user_id,
            serde_json::from_value(json!({
                "name": format!("muted {}", marker),
                "title": marker,
                "email_alerts": false,
                "alert_frequency": "instant"
            }))
            .unwrap(),
        )
        .await
        .unwrap();

    let deleted = searches
        .create(
            user_id,
            serde_json::from_value(json!({
                "name": format!("deleted {}", marker),
                "title": marker,
                "alert_frequency": "instant"
            }))
            .unwrap(),
        )
        .await
        .unwrap();
    searches.soft_delete(user_id, deleted.id).await.unwrap();

    seed_job(&pool, &format!("Engineer {}", marker), &["Rust"]).await;

    let alert_service = AlertService::new(pool.clone(), "http://localhost:3000".into(), 10);
    let mailer = RecordingMailer::new(true);
    alert_service.run_once(&mailer).await.unwrap();

    assert!(mailer.sent_for(&format!("muted {}", marker)).is_empty());
    assert!(mailer.sent_for(&format!("deleted {}", marker)).is_empty());

    for id in [muted.id, deleted.id] {
        let last_sent: Option<chrono::DateTime<Utc>> =
            sqlx::query_scalar("SELECT last_alert_sent FROM saved_searches WHERE id = $1")
                .bind(id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert!(last_sent.is_none());
    }
}

#[tokio::test]
async fn failed_send_leaves_dispatch_state_unchanged() {
    let Some(pool) = setup().await else { return };
    let _guard = DISPATCH_LOCK.lock().await;
    let user_id = seed_user(&pool).await;
    let searches = SavedSearchService::new(pool.clone());
    let marker = Uuid::new_v4().simple().to_string();

    let search = searches
        .create(
            user_id,
            serde_json::from_value(json!({
                "name": format!("flaky {}", marker),
                "title": marker,
                "alert_frequency": "instant"
            }))
            .unwrap(),
        )
        .await
        .unwrap();
    seed_job(&pool, &format!("Engineer {}", marker), &["Rust"]).await;

    let alert_service = AlertService::new(pool.clone(), "http://localhost:3000".into(), 10);
    let mailer = RecordingMailer::new(false);
    let summary = alert_service.run_once(&mailer).await.unwrap();
    assert!(summary.failed >= 1);

    let last_sent: Option<chrono::DateTime<Utc>> =
        sqlx::query_scalar("SELECT last_alert_sent FROM saved_searches WHERE id = $1")
            .bind(search.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(
        last_sent.is_none(),
        "failed handoff must not advance last_alert_sent"
    );
}
