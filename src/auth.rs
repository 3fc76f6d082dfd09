//! Bearer-token boundary: verifies identity-provider tokens and exposes the
//! acting user to route handlers.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{error::AppError, state::SharedState, state::game::Participant};

const SECRET_ENV: &str = "AUTH_JWT_SECRET";
const ISSUER_ENV: &str = "AUTH_JWT_ISSUER";

/// Claims carried by tokens minted by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Stable user identifier.
    pub sub: String,
    /// Display name.
    pub name: String,
    /// Contact handle, absent when the user never provided one.
    #[serde(default)]
    pub whatsapp: Option<String>,
    /// Grants access to game administration.
    #[serde(default)]
    pub admin: bool,
    /// Expiry as seconds since the Unix epoch.
    pub exp: u64,
}

/// Why a request could not be authenticated.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("authorization header is not a bearer token")]
    MalformedHeader,
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    #[error("missing environment variable `{0}`")]
    MissingSecret(&'static str),
}

/// Verifies HS256 tokens with the shared secret.
#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Only accept tokens whose `iss` claim matches.
    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.validation.set_issuer(&[issuer]);
        self
    }

    /// Build a verifier from `AUTH_JWT_SECRET` and the optional `AUTH_JWT_ISSUER`.
    pub fn from_env() -> Result<Self, AuthError> {
        let secret = std::env::var(SECRET_ENV)
            .ok()
            .filter(|secret| !secret.is_empty())
            .ok_or(AuthError::MissingSecret(SECRET_ENV))?;
        let verifier = Self::new(secret.as_bytes());
        Ok(match std::env::var(ISSUER_ENV) {
            Ok(issuer) if !issuer.is_empty() => verifier.with_issuer(&issuer),
            _ => verifier,
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(err),
            })
    }

    /// Extract and verify the bearer token of a request.
    pub fn authenticate(&self, parts: &Parts) -> Result<Claims, AuthError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingToken)?
            .to_str()
            .map_err(|_| AuthError::MalformedHeader)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::MalformedHeader)?;
        self.verify(token.trim())
    }
}

/// Identity of the caller, available to any handler behind authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: String,
    pub name: String,
    pub whatsapp: Option<String>,
    pub admin: bool,
}

impl AuthenticatedUser {
    /// Snapshot of the user as it will appear in a roster.
    pub fn as_participant(&self) -> Participant {
        Participant {
            id: self.id.clone(),
            name: self.name.clone(),
            whatsapp: self.whatsapp.clone(),
        }
    }
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            name: claims.name,
            whatsapp: claims.whatsapp.filter(|handle| !handle.trim().is_empty()),
            admin: claims.admin,
        }
    }
}

impl FromRequestParts<SharedState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        state
            .verifier()
            .authenticate(parts)
            .map(Into::into)
            .map_err(|err| {
                debug!(error = %err, path = %parts.uri.path(), "rejected request");
                AppError::Unauthorized(err.to_string())
            })
    }
}

/// An authenticated user holding the `admin` claim.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

impl FromRequestParts<SharedState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        if !user.admin {
            return Err(AppError::Forbidden(
                "game administration requires an admin account".into(),
            ));
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;
    use jsonwebtoken::{EncodingKey, Header, encode};

    use super::*;

    const SECRET: &[u8] = b"test-secret";

    fn token(claims: &Claims, secret: &[u8]) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    fn claims(exp: u64) -> Claims {
        Claims {
            sub: "user-42".into(),
            name: "Zoé".into(),
            whatsapp: Some("+33611223344".into()),
            admin: false,
            exp,
        }
    }

    fn far_future() -> u64 {
        4_102_444_800 // 2100-01-01
    }

    fn parts_with(header: Option<String>) -> Parts {
        let mut builder = Request::builder().uri("/games");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn valid_token_yields_claims() {
        let verifier = JwtVerifier::new(SECRET);
        let parts = parts_with(Some(format!(
            "Bearer {}",
            token(&claims(far_future()), SECRET)
        )));

        let user: AuthenticatedUser = verifier.authenticate(&parts).unwrap().into();
        assert_eq!(user.id, "user-42");
        assert_eq!(user.name, "Zoé");
        assert!(!user.admin);
    }

    #[test]
    fn missing_or_malformed_header_is_rejected() {
        let verifier = JwtVerifier::new(SECRET);
        assert!(matches!(
            verifier.authenticate(&parts_with(None)),
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            verifier.authenticate(&parts_with(Some("Basic abc".into()))),
            Err(AuthError::MalformedHeader)
        ));
    }

    #[test]
    fn wrong_secret_and_expiry_are_rejected() {
        let verifier = JwtVerifier::new(SECRET);
        assert!(matches!(
            verifier.verify(&token(&claims(far_future()), b"other")),
            Err(AuthError::InvalidToken(_))
        ));
        assert!(matches!(
            verifier.verify(&token(&claims(1_000), SECRET)),
            Err(AuthError::Expired)
        ));
    }

    #[test]
    fn blank_contact_handle_is_dropped() {
        let mut raw = claims(far_future());
        raw.whatsapp = Some("  ".into());
        let user = AuthenticatedUser::from(raw);
        assert_eq!(user.as_participant().whatsapp, None);
    }
}
