//! Login roster and signed token issue/verify.
//!
//! Credentials come from a fixed demo roster. Issued tokens are HS256
//! JWTs carrying the email and role; validation checks the signature
//! and expiry, nothing else.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use baler_engine::Role;

use crate::config::Config;

/// The demo login roster: email, password, role.
const DEMO_ROSTER: &[(&str, &str, Role)] = &[
    ("demo@owner.com", "pw123", Role::Owner),
    ("demo@manager.com", "pw123", Role::Manager),
    ("demo@operator.com", "pw123", Role::Operator),
    ("demo@driver.com", "pw123", Role::Driver),
    ("demo@hr.com", "pw123", Role::HrAdmin),
];

/// Look up a roster entry by exact email and password match.
pub fn authenticate(email: &str, password: &str) -> Option<Role> {
    DEMO_ROSTER
        .iter()
        .find(|(roster_email, roster_password, _)| {
            *roster_email == email && *roster_password == password
        })
        .map(|(_, _, role)| *role)
}

/// Claims carried by issued tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The holder's email.
    pub sub: String,
    pub role: Role,
    /// Issued at, seconds since epoch.
    pub iat: i64,
    /// Expiry, seconds since epoch.
    pub exp: i64,
}

/// Sign a token for a roster member.
pub fn issue_token(
    email: &str,
    role: Role,
    config: &Config,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: email.to_string(),
        role,
        iat: now,
        exp: now + config.token_ttl_hours * 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.auth_secret.as_bytes()),
    )
}

/// Decode and verify a token, returning its claims when the signature
/// checks out and the expiry has not passed.
pub fn verify_token(token: &str, secret: &str) -> Option<Claims> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .ok()
}

/// Pull the token out of a `Bearer <token>` authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}
