use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{
            AuthResponse, LoginRequest, MessageResponse, ProfileResponse, ProfileUser,
            PublicUser, RegisterRequest, VerifyResponse,
        },
        extractors::{AuthUser, TOKEN_COOKIE},
        services::{self, Session},
    },
    error::{ApiJson, AppError},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/profile", get(profile))
        .route("/auth/verify", get(verify))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, HeaderMap, Json<AuthResponse>), AppError> {
    let input = payload.validate()?;
    let session =
        services::register(state.store.as_ref(), &state.passwords, &state.jwt, input).await?;
    let headers = session_cookie(&state, &session)?;
    Ok((
        StatusCode::CREATED,
        headers,
        Json(auth_response("User registered successfully", session)),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>), AppError> {
    let session =
        services::login(state.store.as_ref(), &state.passwords, &state.jwt, payload).await?;
    let headers = session_cookie(&state, &session)?;
    Ok((headers, Json(auth_response("Logged in successfully", session))))
}

/// Tokens are stateless, so logging out only clears the cookie.
#[instrument(skip(state))]
pub async fn logout(State(state): State<AppState>) -> (HeaderMap, Json<MessageResponse>) {
    let mut headers = HeaderMap::new();
    let cookie = cookie_header(&state, "", 0);
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        headers.insert(header::SET_COOKIE, value);
    }
    info!("user logged out");
    (
        headers,
        Json(MessageResponse {
            message: "Logged out successfully",
        }),
    )
}

#[instrument(skip_all)]
pub async fn profile(AuthUser(user): AuthUser) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        message: "Profile retrieved",
        user: ProfileUser::from(&user),
    })
}

#[instrument(skip_all)]
pub async fn verify(AuthUser(user): AuthUser) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        valid: true,
        user: PublicUser::from(&user),
    })
}

fn auth_response(message: &'static str, session: Session) -> AuthResponse {
    AuthResponse {
        message,
        user: PublicUser::from(&session.user),
        token: session.token,
    }
}

fn session_cookie(state: &AppState, session: &Session) -> Result<HeaderMap, AppError> {
    let cookie = cookie_header(state, &session.token, state.jwt.ttl().as_secs());
    let value = HeaderValue::from_str(&cookie)
        .map_err(|e| anyhow::anyhow!("invalid cookie header: {e}"))?;
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, value);
    Ok(headers)
}

fn cookie_header(state: &AppState, token: &str, max_age_secs: u64) -> String {
    let mut cookie =
        format!("{TOKEN_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age_secs}");
    if state.config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    #[test]
    fn public_user_serialization_has_no_password() {
        let response = PublicUser {
            id: uuid::Uuid::new_v4(),
            email: "test@example.com".to_string(),
            first_name: "Test".into(),
            last_name: "User".into(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("test@example.com"));
        assert!(json.contains("firstName"));
        assert!(!json.to_lowercase().contains("password"));
    }

    #[test]
    fn cookie_is_http_only() {
        let state = AppState::fake();
        let cookie = cookie_header(&state, "abc", 60);
        assert!(cookie.starts_with("token=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=60"));
        assert!(!cookie.contains("Secure"));
    }
}
