//! HTTP surface: router, shared state and boundary layers.

mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::extract::FromRef;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::auth::SessionManager;
use crate::store::UserStore;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<UserStore>,
    pub sessions: Arc<SessionManager>,
}

impl FromRef<AppState> for Arc<SessionManager> {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

/// Build the application router.
///
/// `allowed_origins` is the CORS allow-list; requests from other origins
/// are rejected by the browser-facing layer. Credentials are allowed, so
/// the list must be explicit (no wildcard).
pub fn create_router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route("/api/users/login", post(handlers::login))
        .route("/api/users/logout", post(handlers::logout))
        .route("/api/users/status", get(handlers::status))
        .route("/api/users/search", get(handlers::search_user))
        .route(
            "/api/users/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(allowed_origins)),
        )
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::auth::SESSION_TTL_SECS;
    use crate::store::PublicUser;
    use crate::types::{Account, UserId};

    struct TestApp {
        router: Router,
        sessions: Arc<SessionManager>,
        // Keeps the store file alive for the test's duration.
        _dir: tempfile::TempDir,
    }

    async fn setup() -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(UserStore::open(dir.path().join("db.json")).await.unwrap());
        let sessions = Arc::new(SessionManager::new("router-test-secret"));
        let state = AppState {
            store,
            sessions: sessions.clone(),
        };
        let router = create_router(state, &["http://localhost:5500".to_string()]);
        TestApp {
            router,
            sessions,
            _dir: dir,
        }
    }

    async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn bearer_request(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token));
        match body {
            Some(value) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    fn alice_payload() -> Value {
        json!({
            "account": "alice",
            "password": "p4ssw0rd",
            "name": "Alice",
            "mail": "alice@x.com",
            "head": "alice.png",
        })
    }

    async fn register(app: &TestApp, payload: Value) -> String {
        let (status, body) = send(app, json_request("POST", "/api/users", payload)).await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    async fn login_token(app: &TestApp, account: &str, password: &str) -> String {
        let (status, body) = send(
            app,
            json_request(
                "POST",
                "/api/users/login",
                json!({"account": account, "password": password}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let app = setup().await;
        let (status, body) = send(
            &app,
            Request::get("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_register_then_fetch() {
        let app = setup().await;
        let id = register(&app, alice_payload()).await;

        let (status, body) = send(
            &app,
            Request::get(format!("/api/users/{}", id).as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["user"]["id"], id.as_str());
        assert_eq!(body["user"]["account"], "alice");
        assert_eq!(body["user"]["mail"], "alice@x.com");
        assert_eq!(body["user"]["head"], "alice.png");
        assert!(body["user"].get("password").is_none());
    }

    #[tokio::test]
    async fn test_register_duplicate_account() {
        let app = setup().await;
        register(&app, alice_payload()).await;

        let mut second = alice_payload();
        second["mail"] = json!("other@x.com");
        let (status, body) = send(&app, json_request("POST", "/api/users", second)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Account name is already taken");
    }

    #[tokio::test]
    async fn test_register_duplicate_mail() {
        let app = setup().await;
        register(&app, alice_payload()).await;

        let mut second = alice_payload();
        second["account"] = json!("bob");
        let (status, body) = send(&app, json_request("POST", "/api/users", second)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Mail address is already registered");
    }

    #[tokio::test]
    async fn test_register_missing_field() {
        let app = setup().await;
        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/users",
                json!({"account": "alice", "password": "p"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Missing or empty field: name");
    }

    #[tokio::test]
    async fn test_list_users_strips_passwords() {
        let app = setup().await;
        register(&app, alice_payload()).await;

        let (status, body) = send(
            &app,
            Request::get("/api/users").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let users = body["users"].as_array().unwrap();
        assert_eq!(users.len(), 1);
        assert!(users[0].get("password").is_none());
    }

    #[tokio::test]
    async fn test_list_users_empty_store() {
        let app = setup().await;
        let (status, body) = send(
            &app,
            Request::get("/api/users").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["users"], json!([]));
    }

    #[tokio::test]
    async fn test_login_returns_verifiable_token() {
        let app = setup().await;
        let id = register(&app, alice_payload()).await;
        let token = login_token(&app, "alice", "p4ssw0rd").await;

        let claims = app.sessions.verify(&token).unwrap();
        assert_eq!(claims.id, UserId::new(id));
        assert_eq!(claims.account, Account::new("alice"));
        assert_eq!(claims.mail, "alice@x.com");
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let app = setup().await;
        register(&app, alice_payload()).await;

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/users/login",
                json!({"account": "alice", "password": "wrong"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Account or password is incorrect");
    }

    #[tokio::test]
    async fn test_login_unknown_account_same_message() {
        let app = setup().await;
        register(&app, alice_payload()).await;

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/users/login",
                json!({"account": "nobody", "password": "p4ssw0rd"}),
            ),
        )
        .await;

        // Same status and message as a wrong password: no enumeration.
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Account or password is incorrect");
    }

    #[tokio::test]
    async fn test_logout_requires_token() {
        let app = setup().await;
        let (status, _) = send(
            &app,
            Request::post("/api/users/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_logout_returns_pre_expired_token() {
        let app = setup().await;
        register(&app, alice_payload()).await;
        let token = login_token(&app, "alice", "p4ssw0rd").await;

        let (status, body) = send(
            &app,
            bearer_request("POST", "/api/users/logout", &token, None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let signal = body["token"].as_str().unwrap();
        assert!(app.sessions.verify(signal).is_err());
        // The original token is untouched by the soft logout.
        assert!(app.sessions.verify(&token).is_ok());
    }

    #[tokio::test]
    async fn test_status_refreshes_token() {
        let app = setup().await;
        let id = register(&app, alice_payload()).await;
        let token = login_token(&app, "alice", "p4ssw0rd").await;

        let (status, body) = send(
            &app,
            bearer_request("GET", "/api/users/status", &token, None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let refreshed = body["token"].as_str().unwrap();
        let claims = app.sessions.verify(refreshed).unwrap();
        assert_eq!(claims.id, UserId::new(id));
        let expected_exp = chrono::Utc::now().timestamp() + SESSION_TTL_SECS;
        assert!((claims.exp - expected_exp).abs() <= 5);
    }

    #[tokio::test]
    async fn test_status_after_account_deleted() {
        let app = setup().await;
        let id = register(&app, alice_payload()).await;
        let token = login_token(&app, "alice", "p4ssw0rd").await;

        send(
            &app,
            bearer_request("DELETE", &format!("/api/users/{}", id), &token, None),
        )
        .await;

        let (status, _) = send(
            &app,
            bearer_request("GET", "/api/users/status", &token, None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_search_by_query_id() {
        let app = setup().await;
        let id = register(&app, alice_payload()).await;

        let (status, body) = send(
            &app,
            Request::get(format!("/api/users/search?id={}", id).as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["id"], id.as_str());
        assert!(body["user"].get("password").is_none());
    }

    #[tokio::test]
    async fn test_search_unknown_or_missing_id() {
        let app = setup().await;

        let (status, _) = send(
            &app,
            Request::get("/api/users/search?id=nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            Request::get("/api/users/search")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_own_record() {
        let app = setup().await;
        let id = register(&app, alice_payload()).await;
        let token = login_token(&app, "alice", "p4ssw0rd").await;

        let (status, body) = send(
            &app,
            bearer_request(
                "PUT",
                &format!("/api/users/{}", id),
                &token,
                Some(json!({"password": "newpass", "name": "Alicia"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User updated");

        // New password works, head was cleared by the full overwrite.
        login_token(&app, "alice", "newpass").await;
        let (_, body) = send(
            &app,
            Request::get(format!("/api/users/{}", id).as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(body["user"]["name"], "Alicia");
        assert_eq!(body["user"]["account"], "alice");
        assert_eq!(body["user"]["mail"], "alice@x.com");
        assert!(body["user"].get("head").is_none());
    }

    #[tokio::test]
    async fn test_update_foreign_record_forbidden() {
        let app = setup().await;
        let id = register(&app, alice_payload()).await;

        // A valid token for a different subject.
        let stranger = PublicUser {
            id: UserId::new("someone-else"),
            account: Account::new("mallory"),
            name: "Mallory".to_string(),
            mail: "mallory@x.com".to_string(),
            head: None,
        };
        let token = app.sessions.issue(&stranger, SESSION_TTL_SECS).unwrap();

        let (status, _) = send(
            &app,
            bearer_request(
                "PUT",
                &format!("/api/users/{}", id),
                &token,
                Some(json!({"password": "hacked", "name": "Hacked"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // Record left unmodified.
        let (_, body) = send(
            &app,
            Request::get(format!("/api/users/{}", id).as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(body["user"]["name"], "Alice");
    }

    #[tokio::test]
    async fn test_update_requires_token() {
        let app = setup().await;
        let id = register(&app, alice_payload()).await;

        let (status, _) = send(
            &app,
            json_request(
                "PUT",
                &format!("/api/users/{}", id),
                json!({"password": "x", "name": "X"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_update_empty_password_rejected() {
        let app = setup().await;
        let id = register(&app, alice_payload()).await;
        let token = login_token(&app, "alice", "p4ssw0rd").await;

        let (status, body) = send(
            &app,
            bearer_request(
                "PUT",
                &format!("/api/users/{}", id),
                &token,
                Some(json!({"name": "Alicia"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Missing or empty field: password");
    }

    #[tokio::test]
    async fn test_delete_own_record() {
        let app = setup().await;
        let id = register(&app, alice_payload()).await;
        let token = login_token(&app, "alice", "p4ssw0rd").await;

        let (status, body) = send(
            &app,
            bearer_request("DELETE", &format!("/api/users/{}", id), &token, None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User deleted");
        assert!(app
            .sessions
            .verify(body["token"].as_str().unwrap())
            .is_err());

        let (status, _) = send(
            &app,
            Request::get(format!("/api/users/{}", id).as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_foreign_record_forbidden() {
        let app = setup().await;
        let alice_id = register(&app, alice_payload()).await;
        register(
            &app,
            json!({
                "account": "bob",
                "password": "bobpass",
                "name": "Bob",
                "mail": "bob@x.com",
            }),
        )
        .await;
        let bob_token = login_token(&app, "bob", "bobpass").await;

        let (status, _) = send(
            &app,
            bearer_request(
                "DELETE",
                &format!("/api/users/{}", alice_id),
                &bob_token,
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // Alice survives.
        let (status, _) = send(
            &app,
            Request::get(format!("/api/users/{}", alice_id).as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}
