//! Request handlers for the user API.
//!
//! Handlers validate field presence, consult the session manager and the
//! access rule, then delegate to the record store. Responses follow the
//! `{"status": "success", ...}` envelope; failures are `ApiError` values
//! rendered by its `IntoResponse` impl.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::api::AppState;
use crate::auth::{self, BearerClaims, SESSION_TTL_SECS, require_self};
use crate::error::{ApiError, ApiResult};
use crate::store::{NewUser, PublicUser, UserPatch};
use crate::types::{Account, UserId};

/// Registration payload. Fields default to empty so that a missing field
/// is reported as `InvalidInput` rather than a deserialization error.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    account: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mail: String,
    #[serde(default)]
    head: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    account: String,
    #[serde(default)]
    password: String,
}

/// Update payload. This is a full overwrite of the mutable fields: an
/// omitted `head` clears the stored avatar.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    password: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    head: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    id: Option<String>,
}

fn require_field(value: &str, name: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidInput(name.to_string()));
    }
    Ok(())
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// GET /api/users — every record, passwords stripped. Never fails: an
/// empty store is an empty list.
pub async fn list_users(State(state): State<AppState>) -> Json<Value> {
    let users: Vec<PublicUser> = state.store.all().await.iter().map(PublicUser::from).collect();
    Json(serde_json::json!({
        "status": "success",
        "users": users,
    }))
}

/// POST /api/users — register a new user.
pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    require_field(&body.account, "account")?;
    require_field(&body.password, "password")?;
    require_field(&body.name, "name")?;
    require_field(&body.mail, "mail")?;

    let id = state
        .store
        .insert(NewUser {
            account: Account::new(body.account),
            password: auth::hash_password(&body.password),
            name: body.name,
            mail: body.mail,
            head: body.head,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "id": id,
            "message": "User created",
        })),
    ))
}

/// POST /api/users/login — exact credential match, 30-minute token.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Json<Value>> {
    let account = Account::new(body.account);
    let record = state
        .store
        .find_by_credentials(&account, &auth::hash_password(&body.password))
        .await?;

    let token = state
        .sessions
        .issue(&PublicUser::from(&record), SESSION_TTL_SECS)?;
    info!("issued session token for {}", record.account);

    Ok(Json(serde_json::json!({
        "status": "success",
        "token": token,
    })))
}

/// POST /api/users/logout — stateless soft logout: hands back a
/// pre-expired token for the client to store in place of its session.
/// The original token stays valid until its own expiry.
pub async fn logout(
    State(state): State<AppState>,
    BearerClaims(_claims): BearerClaims,
) -> ApiResult<Json<Value>> {
    let token = state.sessions.issue_expired()?;
    Ok(Json(serde_json::json!({
        "status": "success",
        "token": token,
    })))
}

/// GET /api/users/status — re-issue a fresh 30-minute token if the
/// account behind the presented token still exists.
pub async fn status(
    State(state): State<AppState>,
    BearerClaims(claims): BearerClaims,
) -> ApiResult<Json<Value>> {
    let record = state
        .store
        .find_by_account(&claims.account)
        .await
        .map_err(|_| ApiError::AuthenticationFailed)?;

    let token = state
        .sessions
        .issue(&PublicUser::from(&record), SESSION_TTL_SECS)?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "token": token,
    })))
}

/// GET /api/users/search?id= — query-parameter lookup variant.
pub async fn search_user(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Value>> {
    let id = params.id.ok_or(ApiError::NotFound)?;
    let record = state.store.find_by_id(&UserId::new(id)).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Search hit",
        "user": PublicUser::from(&record),
    })))
}

/// GET /api/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let record = state.store.find_by_id(&UserId::new(id)).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "user": PublicUser::from(&record),
    })))
}

/// PUT /api/users/{id} — full overwrite of password/name/head, owner
/// only. The access check runs before the store is touched.
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    BearerClaims(claims): BearerClaims,
    Json(body): Json<UpdateUserRequest>,
) -> ApiResult<Json<Value>> {
    let id = UserId::new(id);
    require_self(&claims, &id)?;

    require_field(&body.password, "password")?;
    require_field(&body.name, "name")?;

    state
        .store
        .update(
            &id,
            UserPatch {
                password: auth::hash_password(&body.password),
                name: body.name,
                head: body.head,
            },
        )
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "User updated",
    })))
}

/// DELETE /api/users/{id} — owner only; returns a pre-expired token as
/// the discard signal, same as logout.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    BearerClaims(claims): BearerClaims,
) -> ApiResult<Json<Value>> {
    let id = UserId::new(id);
    require_self(&claims, &id)?;

    state.store.remove(&id).await?;
    let token = state.sessions.issue_expired()?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "User deleted",
        "token": token,
    })))
}
