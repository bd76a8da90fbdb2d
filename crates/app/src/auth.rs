//! Session verification for protected routes.
//!
//! Credentials are HS256 session tokens carried either as a bearer token or
//! in the `session` cookie. When an `Authorization` header is present it is
//! authoritative and the cookie is not consulted.

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;

pub const SESSION_COOKIE: &str = "session";
const BEARER_SCHEME: &str = "bearer";

/// Identity attached to an authorized request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
}

/// Result of running the guard over a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authorized(Identity),
    Rejected(RejectReason),
}

/// Why a request was rejected. Callers never see the distinction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingCredential,
    MalformedCredential,
    InvalidCredential,
    Expired,
    NotYetValid,
}

impl RejectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::MalformedCredential => "malformed_credential",
            Self::InvalidCredential => "invalid_credential",
            Self::Expired => "expired",
            Self::NotYetValid => "not_yet_valid",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub nbf: Option<i64>,
}

#[derive(Clone)]
pub struct SessionGuard {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl SessionGuard {
    pub fn new(secret: &[u8]) -> Self {
        // Time-based claims are checked against the application clock in `verify`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Inspects the request headers and decides whether the caller is signed in.
    pub fn authenticate(&self, headers: &HeaderMap, now: DateTime<Utc>) -> AuthOutcome {
        let token = match extract_credential(headers) {
            Ok(token) => token,
            Err(reason) => return AuthOutcome::Rejected(reason),
        };
        match self.verify(token, now) {
            Ok(identity) => AuthOutcome::Authorized(identity),
            Err(reason) => AuthOutcome::Rejected(reason),
        }
    }

    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, RejectReason> {
        let claims = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|err| match err.kind() {
                ErrorKind::InvalidToken
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => RejectReason::MalformedCredential,
                _ => RejectReason::InvalidCredential,
            })?
            .claims;

        if claims.sub.trim().is_empty() {
            return Err(RejectReason::InvalidCredential);
        }
        let now_ts = now.timestamp();
        if let Some(nbf) = claims.nbf {
            if now_ts < nbf {
                return Err(RejectReason::NotYetValid);
            }
        }
        if now_ts >= claims.exp {
            return Err(RejectReason::Expired);
        }

        Ok(Identity { user_id: claims.sub })
    }

    /// Mints a session token for `user_id` that expires after `ttl`.
    pub fn issue(
        &self,
        user_id: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = SessionClaims {
            sub: user_id.to_string(),
            exp: (now + ttl).timestamp(),
            iat: Some(now.timestamp()),
            nbf: None,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
    }
}

/// Converts a rejection into the single response shape used for every reason.
pub fn reject(reason: RejectReason) -> ApiError {
    debug!(stage = "auth", reason = reason.as_str(), "request rejected");
    counter!("auth_rejections_total", "reason" => reason.as_str()).increment(1);
    ApiError::unauthorized()
}

fn extract_credential(headers: &HeaderMap) -> Result<&str, RejectReason> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let raw = value
            .to_str()
            .map_err(|_| RejectReason::MalformedCredential)?;
        let (scheme, token) = raw
            .trim()
            .split_once(' ')
            .ok_or(RejectReason::MalformedCredential)?;
        // Scheme names are case-insensitive.
        if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
            return Err(RejectReason::MalformedCredential);
        }
        let token = token.trim();
        if token.is_empty() {
            return Err(RejectReason::MalformedCredential);
        }
        return Ok(token);
    }

    for value in headers.get_all(header::COOKIE) {
        let Ok(raw) = value.to_str() else {
            continue;
        };
        for pair in raw.split(';') {
            let Some((name, token)) = pair.trim().split_once('=') else {
                continue;
            };
            if name.trim() == SESSION_COOKIE {
                let token = token.trim();
                if token.is_empty() {
                    return Err(RejectReason::MalformedCredential);
                }
                return Ok(token);
            }
        }
    }

    Err(RejectReason::MissingCredential)
}
