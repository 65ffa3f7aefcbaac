use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use tracing::{debug, warn};

use super::{repo_types::User, services::verify_token};
use crate::{
    error::{AppError, AuthError},
    state::AppState,
};

pub const TOKEN_COOKIE: &str = "token";

/// Pulls the session token from `Authorization: Bearer` or, failing that,
/// from the `token` cookie.
pub(crate) fn token_from_parts(parts: &Parts) -> Option<String> {
    if let Some(auth) = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        let mut split = auth.splitn(2, ' ');
        if let (Some(scheme), Some(token)) = (split.next(), split.next()) {
            if scheme.eq_ignore_ascii_case("Bearer") && !token.trim().is_empty() {
                return Some(token.trim().to_string());
            }
        }
    }

    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == TOKEN_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Extracts and validates the session token, resolving the user.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts).ok_or(AuthError::MissingToken)?;
        match verify_token(state.store.as_ref(), &state.jwt, &token).await {
            Ok(user) => Ok(AuthUser(user)),
            Err(e) => {
                warn!(error = %e, "rejected token");
                Err(e)
            }
        }
    }
}

/// Like `AuthUser`, but a missing or invalid token yields `None` instead of
/// rejecting the request. Store failures still surface.
pub struct MaybeAuthUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = token_from_parts(parts) else {
            return Ok(MaybeAuthUser(None));
        };
        match verify_token(state.store.as_ref(), &state.jwt, &token).await {
            Ok(user) => Ok(MaybeAuthUser(Some(user))),
            Err(AppError::Auth(e)) => {
                debug!(error = %e, "optional auth: ignoring token");
                Ok(MaybeAuthUser(None))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn bearer_header_is_read() {
        let p = parts(&[("authorization", "Bearer abc.def.ghi")]);
        assert_eq!(token_from_parts(&p).as_deref(), Some("abc.def.ghi"));

        let p = parts(&[("authorization", "bearer abc")]);
        assert_eq!(token_from_parts(&p).as_deref(), Some("abc"));
    }

    #[test]
    fn cookie_is_used_without_header() {
        let p = parts(&[("cookie", "theme=dark; token=xyz; other=1")]);
        assert_eq!(token_from_parts(&p).as_deref(), Some("xyz"));
    }

    #[test]
    fn header_wins_over_cookie() {
        let p = parts(&[("authorization", "Bearer from-header"), ("cookie", "token=from-cookie")]);
        assert_eq!(token_from_parts(&p).as_deref(), Some("from-header"));
    }

    #[test]
    fn other_schemes_and_empty_values_are_ignored() {
        assert!(token_from_parts(&parts(&[("authorization", "Basic Zm9vOmJhcg==")])).is_none());
        assert!(token_from_parts(&parts(&[("cookie", "token=")])).is_none());
        assert!(token_from_parts(&parts(&[])).is_none());
    }
}
