//! Handlers for the `/auth` resource (register, login, refresh, me, logout,
//! password change).

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{Duration, Utc};
use huddle_core::error::{AuthError, CoreError};
use huddle_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};

use huddle_db::models::session::CreateSession;
use huddle_db::models::user::{CreateUser, User};
use huddle_db::repositories::{SessionRepo, UserRepo};

use crate::auth::jwt::{generate_refresh_token, hash_refresh_token};
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/register`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Request body for `POST /auth/password`.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Successful authentication response returned by register and login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserInfo,
}

/// Response for `POST /auth/refresh`: a new pair, no profile.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

/// Response for `GET /auth/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserInfo,
}

/// Public user info. Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: DbId,
    pub email: String,
    pub email_verified: bool,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: Timestamp,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            email_verified: user.email_verified,
            display_name: user.display_name.clone(),
            avatar_url: user.avatar_url.clone(),
            created_at: user.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /auth/register
///
/// Create a user and issue a token pair. Email is normalized (trimmed,
/// lowercased); duplicates are rejected with 409.
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let email = normalize_email(&input.email);
    if email.is_empty() {
        return Err(CoreError::Validation("invalid email".into()).into());
    }
    validate_password_strength(&input.password, state.config.auth.password_min_length)?;

    if UserRepo::exists_by_email(&state.pool, &email).await? {
        return Err(CoreError::AlreadyExists { entity: "user" }.into());
    }

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let create = CreateUser {
        email,
        password_hash,
        display_name: trim_optional(input.display_name),
        avatar_url: None,
    };
    // A concurrent duplicate slips past the pre-check and surfaces here as
    // a unique violation, classified to 409 by the error layer.
    let user = UserRepo::create(&state.pool, &create).await?;

    let meta = extract_login_meta(&headers);
    let pair = issue_token_pair(&state, user.id, &meta, None).await?;

    tracing::info!(user_id = user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            access_token: pair.access,
            refresh_token: pair.refresh,
            expires_in: state.signer.access_ttl_secs(),
            user: UserInfo::from(&user),
        }),
    ))
}

/// POST /auth/login
///
/// Authenticate with email + password. An unknown email and a wrong
/// password produce the same error kind, so the endpoint cannot be used to
/// enumerate accounts.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let email = normalize_email(&input.email);

    let user = UserRepo::find_by_email(&state.pool, &email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        return Err(AuthError::InvalidCredentials.into());
    }

    let meta = extract_login_meta(&headers);
    let pair = issue_token_pair(&state, user.id, &meta, None).await?;

    Ok(Json(AuthResponse {
        access_token: pair.access,
        refresh_token: pair.refresh,
        expires_in: state.signer.access_ttl_secs(),
        user: UserInfo::from(&user),
    }))
}

/// POST /auth/refresh
///
/// Exchange a refresh token for a new pair. Rotation is mandatory: the
/// presented token is deleted in the same transaction that persists its
/// replacement, so it is single-use. Of two concurrent refreshes with the
/// same token, exactly one wins; the loser's delete removes no row, its
/// rotation rolls back, and it is turned away with `InvalidCredentials`.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<RefreshResponse>> {
    let token_hash = hash_refresh_token(input.refresh_token.trim());

    let session = SessionRepo::find_by_token_hash(&state.pool, &token_hash)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if session.is_expired(Utc::now()) {
        if let Err(err) = SessionRepo::delete_by_id(&state.pool, session.id).await {
            tracing::warn!(session_id = session.id, error = %err,
                "failed to delete expired session");
        }
        return Err(AuthError::SessionExpired.into());
    }

    let meta = extract_login_meta(&headers);
    let pair = issue_token_pair(&state, session.user_id, &meta, Some(session.id)).await?;

    Ok(Json(RefreshResponse {
        access_token: pair.access,
        refresh_token: pair.refresh,
        expires_in: state.signer.access_ttl_secs(),
    }))
}

/// GET /auth/me
///
/// Returns the caller's profile. Accepts either a forwarded `X-User-ID`
/// from a trusted upstream, or a bearer token validated locally.
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Json<MeResponse>> {
    let user_id = resolve_user_id(&state, &headers)?;

    let user = UserRepo::find_by_id(&state.pool, user_id)
        .await?
        .ok_or(CoreError::NotFound { entity: "user" })?;

    Ok(Json(MeResponse {
        user: UserInfo::from(&user),
    }))
}

/// POST /auth/logout
///
/// Delete all refresh sessions of the authenticated user. Returns 204.
pub async fn logout(State(state): State<AppState>, user: AuthUser) -> AppResult<StatusCode> {
    let deleted = SessionRepo::delete_for_user(&state.pool, user.user_id).await?;
    tracing::info!(user_id = user.user_id, deleted, "user logged out");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /auth/password
///
/// Change the caller's password after verifying the current one. All
/// refresh sessions are revoked so stolen refresh tokens die with the old
/// password.
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<ChangePasswordRequest>,
) -> AppResult<StatusCode> {
    let row = UserRepo::find_by_id(&state.pool, user.user_id)
        .await?
        .ok_or(CoreError::NotFound { entity: "user" })?;

    let current_valid = verify_password(&input.current_password, &row.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !current_valid {
        return Err(AuthError::InvalidCredentials.into());
    }

    validate_password_strength(&input.new_password, state.config.auth.password_min_length)?;
    let new_hash = hash_password(&input.new_password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    UserRepo::update_password(&state.pool, user.user_id, &new_hash).await?;
    SessionRepo::delete_for_user(&state.pool, user.user_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Client metadata recorded on the refresh session.
struct LoginMeta {
    user_agent: Option<String>,
    ip: Option<String>,
}

struct TokenPair {
    access: String,
    refresh: String,
}

/// Sign an access token, mint a refresh token, and persist its session.
///
/// When `rotate_from` is set, the old session is deleted in the same
/// transaction that inserts the new one; if a concurrent rotation already
/// consumed it, no pair is issued and the caller sees
/// `InvalidCredentials`.
async fn issue_token_pair(
    state: &AppState,
    user_id: DbId,
    meta: &LoginMeta,
    rotate_from: Option<DbId>,
) -> AppResult<TokenPair> {
    let access = state
        .signer
        .sign_access_token(user_id)
        .map_err(|e| AppError::InternalError(format!("Token signing error: {e}")))?;

    let (refresh_plaintext, refresh_hash) = generate_refresh_token();
    let expires_at = Utc::now() + Duration::days(state.config.auth.refresh_ttl_days);

    let input = CreateSession {
        user_id,
        token_hash: refresh_hash,
        expires_at,
        user_agent: meta.user_agent.clone(),
        ip: meta.ip.clone(),
    };
    match rotate_from {
        Some(old_id) => {
            if SessionRepo::rotate(&state.pool, old_id, &input)
                .await?
                .is_none()
            {
                return Err(AuthError::InvalidCredentials.into());
            }
        }
        None => {
            SessionRepo::create(&state.pool, &input).await?;
        }
    }

    Ok(TokenPair {
        access,
        refresh: refresh_plaintext,
    })
}

/// Resolve the caller's user id for `me`: forwarded header first, then a
/// locally-validated bearer.
fn resolve_user_id(state: &AppState, headers: &HeaderMap) -> Result<DbId, AppError> {
    if let Some(raw) = headers.get("x-user-id").and_then(|v| v.to_str().ok()) {
        return raw
            .trim()
            .parse()
            .map_err(|_| AppError::Unauthorized("invalid X-User-ID (must be int64)".into()));
    }

    if let Some(auth_header) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        if let Some(token) = auth_header.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Ok(state.signer.user_id_from_token(token)?);
            }
        }
    }

    Err(AppError::Unauthorized("missing user id (x-user-id)".into()))
}

/// Lowercase and trim an email address.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trim an optional string, mapping empty results to absent.
fn trim_optional(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Pull user-agent and client ip from request headers.
fn extract_login_meta(headers: &HeaderMap) -> LoginMeta {
    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);

    // First hop of X-Forwarded-For, then X-Real-IP.
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        });

    LoginMeta { user_agent, ip }
}
