//! Bearer token authentication.
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use axum::{
    Extension,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{Algorithm, DecodingKey, TokenData, Validation, decode};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::{
    config::AppConfig, errors::LearnError, models::UserId, router::AppState, store::ReviewStore,
};

/// Verifies an HS256 token and returns its subject.
pub(crate) fn verify_user_token(token: &str, secret: &SecretString) -> Result<UserId> {
    let mut validation = Validation::new(Algorithm::HS256);
    // `sub` is checked below, the library only parses string subjects.
    validation.set_required_spec_claims(&["exp"]);
    let key = DecodingKey::from_secret(secret.expose_secret().as_bytes());
    let token_data: TokenData<serde_json::Value> =
        decode(token, &key, &validation).context("JWT error")?;
    // The subject is a user id, issued either as a string or a number.
    match token_data.claims.get("sub") {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Ok(s.clone().into()),
        Some(serde_json::Value::Number(n)) => Ok(n.to_string().into()),
        _ => Err(anyhow!("No usable 'sub' claim in JWT")),
    }
}

#[derive(Clone, Debug)]
pub struct AuthUser(pub Option<UserId>);

pub async fn auth_middleware<S: ReviewStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(config): Extension<AppConfig>,
    mut req: Request,
    next: Next,
) -> Result<Response, LearnError> {
    debug!("Processing request: {} {}", req.method(), req.uri());
    let mut user_id: Option<UserId> = None;

    if let Some(Authorization(bearer)) = req.headers().typed_get::<Authorization<Bearer>>() {
        let token = bearer.token();
        match verify_user_token(token, &config.auth_key) {
            Ok(uid) => {
                if state.learn.store().is_token_revoked(token).await? {
                    warn!("Revoked token presented for user {}", uid);
                } else {
                    debug!("User ID verified from bearer token: {}", uid);
                    user_id = Some(uid);
                }
            }
            Err(e) => {
                warn!("Bearer token invalid: {:#}", e);
            }
        }
    } else {
        debug!("No bearer token provided");
    }

    // Reject before any body is read so a bad payload never masks the 401.
    if user_id.is_none() {
        return Err(LearnError::Unauthenticated);
    }
    req.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(req).await)
}
