use axum::{
    extract::{DefaultBodyLimit, FromRef, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::CookieJar;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, SignupForm},
        password::{hash_password, verify_password},
        repo::{self, User},
        session::{SessionKeys, SessionUser},
    },
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn signup_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB, avatar uploads
}

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/profile", get(profile))
        .route("/logout", get(logout))
}

#[instrument(skip(state, jar, multipart))]
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    multipart: Multipart,
) -> ApiResult<(StatusCode, CookieJar, Json<AuthResponse>)> {
    let form = SignupForm::from_multipart(multipart).await?;
    let mut request = form.validate()?;

    if User::find_by_email(&state.db, &request.email)
        .await?
        .is_some()
    {
        warn!(email = %request.email, "signup for an existing email");
        return Err(ApiError::DuplicateUser);
    }

    let hash = hash_password(&request.password)?;
    let avatar = match request.avatar.take() {
        Some(file) => state.uploads.save(file).await?,
        None => String::new(),
    };

    // The lookup above can race a concurrent signup; the unique index on
    // users.email is what actually decides the winner.
    let user = User::create(&state.db, &request.name, &request.email, &hash, &avatar)
        .await
        .map_err(|e| {
            if repo::is_unique_violation(&e) {
                ApiError::DuplicateUser
            } else {
                ApiError::from(e)
            }
        })?;

    let cookie = SessionKeys::from_ref(&state).issue_cookie(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user signed up");
    Ok((
        StatusCode::CREATED,
        jar.add(cookie),
        Json(AuthResponse {
            message: "Signup successful".into(),
            user: PublicUser::from(user),
        }),
    ))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(mut payload): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<AuthResponse>)> {
    payload.validate()?;

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login for an unknown email");
            ApiError::InvalidCredentials
        })?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with a wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let cookie = SessionKeys::from_ref(&state).issue_cookie(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok((
        jar.add(cookie),
        Json(AuthResponse {
            message: "Login successful".into(),
            user: PublicUser::from(user),
        }),
    ))
}

#[instrument(skip(state))]
pub async fn profile(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
) -> ApiResult<Json<PublicUser>> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;
    Ok(Json(PublicUser::from(user)))
}

/// Stateless logout: the token stays cryptographically valid until it
/// expires; all this does is tell the browser to drop the cookie.
#[instrument(skip(state, jar))]
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<Value>) {
    let jar = jar.add(SessionKeys::from_ref(&state).clear_cookie());
    (jar, Json(json!({ "message": "Logged out" })))
}
