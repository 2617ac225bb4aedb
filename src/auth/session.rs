use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{config::SessionConfig, error::ApiError, state::AppState};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "token";

/// Payload of a session token: the user it asserts plus standard envelope
/// claims. A token is valid iff its signature verifies and `exp` is still in
/// the future.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
    pub aud: String,
}

/// Signing and verification material for session tokens, plus the cookie
/// attribute profile. Built once from config and projected out of `AppState`.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
    cookie_secure: bool,
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from_config(&state.config.session)
    }
}

impl SessionKeys {
    pub fn from_config(cfg: &SessionConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::minutes(cfg.ttl_minutes),
            cookie_secure: cfg.cookie_secure,
        }
    }

    pub fn sign(&self, user_id: Uuid) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + self.ttl;
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "session token signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        // A token is invalid from its expiration instant on: no clock grace,
        // and the exp second itself already counts as expired.
        validation.leeway = 0;
        validation.reject_tokens_expiring_in_less_than = 1;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "session token verified");
        Ok(data.claims)
    }

    /// Signs a fresh token for `user_id` and wraps it in the session cookie.
    pub fn issue_cookie(&self, user_id: Uuid) -> anyhow::Result<Cookie<'static>> {
        let token = self.sign(user_id)?;
        Ok(self.session_cookie(token, self.ttl))
    }

    /// Empty, immediately expiring cookie. Browsers only drop a cookie when
    /// the clearing attributes match the ones it was set with, so this goes
    /// through the same builder as `issue_cookie`.
    pub fn clear_cookie(&self) -> Cookie<'static> {
        self.session_cookie(String::new(), Duration::ZERO)
    }

    fn session_cookie(&self, value: String, max_age: Duration) -> Cookie<'static> {
        let same_site = if self.cookie_secure {
            SameSite::None
        } else {
            SameSite::Lax
        };
        Cookie::build((SESSION_COOKIE, value))
            .path("/")
            .http_only(true)
            .secure(self.cookie_secure)
            .same_site(same_site)
            .max_age(max_age)
            .build()
    }
}

/// Extractor for routes that require an authenticated caller. Reads the
/// session cookie and yields the user id from its claims; the credential
/// store is not consulted again.
#[derive(Debug)]
pub struct SessionUser(pub Uuid);

#[axum::async_trait]
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = SessionKeys::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        let cookie = jar
            .get(SESSION_COOKIE)
            .ok_or(ApiError::Unauthenticated("Unauthorized"))?;

        let claims = keys.verify(cookie.value()).map_err(|_| {
            warn!("invalid or expired session token");
            ApiError::Unauthenticated("Invalid token")
        })?;

        Ok(SessionUser(claims.sub))
    }
}
