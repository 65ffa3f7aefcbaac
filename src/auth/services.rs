use std::sync::Arc;

use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{LoginRequest, RegisterRequest},
        jwt::JwtKeys,
        password::{check_policy, Passwords},
        repo::UserRepo,
        repo_types::{NewUser, User},
    },
    error::{AppError, AuthError, StoreError},
};

const MAX_NAME_LEN: usize = 50;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// A user together with a freshly issued session token.
#[derive(Debug)]
pub struct Session {
    pub user: User,
    pub token: String,
}

/// Registration input after the boundary checks.
#[derive(Debug)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<Registration, AppError> {
        let email = normalize_email(&self.email);
        if email.is_empty() {
            return Err(AppError::validation("email", "Email is required"));
        }
        if !is_valid_email(&email) {
            return Err(AppError::validation("email", "Invalid email"));
        }
        check_policy(&self.password).map_err(|msg| AppError::validation("password", msg))?;
        let first_name = name_field("firstName", &self.first_name)?;
        let last_name = name_field("lastName", &self.last_name)?;
        Ok(Registration {
            email,
            password: self.password,
            first_name,
            last_name,
        })
    }
}

fn name_field(field: &'static str, raw: &str) -> Result<String, AppError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(AppError::validation(field, format!("{field} is required")));
    }
    if value.chars().count() > MAX_NAME_LEN {
        return Err(AppError::validation(
            field,
            format!("{field} must be at most {MAX_NAME_LEN} characters"),
        ));
    }
    Ok(value.to_string())
}

pub async fn register<R: UserRepo + ?Sized>(
    repo: &R,
    passwords: &Arc<Passwords>,
    keys: &JwtKeys,
    input: Registration,
) -> Result<Session, AppError> {
    if repo.find_user_by_email(&input.email).await?.is_some() {
        warn!(email = %input.email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let password_hash = hash_blocking(passwords, input.password).await?;

    let user = repo
        .create_user(NewUser {
            id: Uuid::new_v4(),
            email: input.email,
            password_hash,
            first_name: input.first_name,
            last_name: input.last_name,
        })
        .await
        .map_err(|e| match e {
            StoreError::Duplicate(_) => AppError::Conflict("Email already registered".into()),
            other => other.into(),
        })?;

    let token = keys.sign(user.id, &user.email)?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(Session { user, token })
}

pub async fn login<R: UserRepo + ?Sized>(
    repo: &R,
    passwords: &Arc<Passwords>,
    keys: &JwtKeys,
    req: LoginRequest,
) -> Result<Session, AppError> {
    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        return Err(AppError::validation("email", "Invalid email"));
    }
    if req.password.is_empty() {
        return Err(AppError::validation("password", "Password is required"));
    }

    let Some(user) = repo.find_user_by_email(&email).await? else {
        let passwords = Arc::clone(passwords);
        let password = req.password;
        tokio::task::spawn_blocking(move || passwords.verify_dummy(&password))
            .await
            .context("join dummy verification")?;
        warn!(email = %email, "login unknown email");
        return Err(AuthError::InvalidCredentials.into());
    };

    let ok = verify_blocking(passwords, req.password, user.password_hash.clone()).await?;
    if !ok {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials.into());
    }

    let token = keys.sign(user.id, &user.email)?;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Session { user, token })
}

/// Verifies a token and resolves its user. A valid token whose user has
/// since disappeared is rejected.
pub async fn verify_token<R: UserRepo + ?Sized>(
    repo: &R,
    keys: &JwtKeys,
    token: &str,
) -> Result<User, AppError> {
    let claims = keys.verify(token)?;
    repo.find_user_by_id(claims.sub)
        .await?
        .ok_or(AppError::Auth(AuthError::UserNotFound))
}

async fn hash_blocking(passwords: &Arc<Passwords>, plain: String) -> Result<String, AppError> {
    let passwords = Arc::clone(passwords);
    let hash = tokio::task::spawn_blocking(move || passwords.hash(&plain))
        .await
        .context("join hash task")??;
    Ok(hash)
}

async fn verify_blocking(
    passwords: &Arc<Passwords>,
    plain: String,
    hash: String,
) -> Result<bool, AppError> {
    let passwords = Arc::clone(passwords);
    let ok = tokio::task::spawn_blocking(move || passwords.verify(&plain, &hash))
        .await
        .context("join verify task")??;
    Ok(ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::password::fast_passwords, config::JwtConfig, memory::MemoryStore,
    };

    fn keys() -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: "test".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 60,
        })
    }

    fn registration(email: &str) -> Registration {
        RegisterRequest {
            email: email.into(),
            password: "Passw0rdOk".into(),
            first_name: " Ada ".into(),
            last_name: "Lovelace".into(),
        }
        .validate()
        .expect("valid registration")
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.de"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn validate_normalizes_email_and_trims_names() {
        let r = registration("  Ada@Example.COM ");
        assert_eq!(r.email, "ada@example.com");
        assert_eq!(r.first_name, "Ada");
    }

    #[test]
    fn validate_reports_offending_field() {
        let err = RegisterRequest {
            email: "ada@example.com".into(),
            password: "Passw0rdOk".into(),
            first_name: "Ada".into(),
            last_name: "   ".into(),
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "lastName", .. }));

        let err = RegisterRequest {
            email: "ada@example.com".into(),
            password: "short".into(),
            first_name: "Ada".into(),
            last_name: "L".into(),
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "password", .. }));
    }

    #[tokio::test]
    async fn register_stores_hash_not_plaintext() {
        let store = MemoryStore::default();
        let passwords = Arc::new(fast_passwords());
        let session = register(&store, &passwords, &keys(), registration("ada@example.com"))
            .await
            .unwrap();

        let stored = store
            .find_user_by_email("ada@example.com")
            .await
            .unwrap()
            .expect("user persisted");
        assert_ne!(stored.password_hash, "Passw0rdOk");
        assert_eq!(stored.id, session.user.id);
        assert!(!session.token.is_empty());
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict() {
        let store = MemoryStore::default();
        let passwords = Arc::new(fast_passwords());
        register(&store, &passwords, &keys(), registration("ada@example.com"))
            .await
            .unwrap();
        let err = register(&store, &passwords, &keys(), registration("ADA@example.com "))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let store = MemoryStore::default();
        let passwords = Arc::new(fast_passwords());
        register(&store, &passwords, &keys(), registration("ada@example.com"))
            .await
            .unwrap();

        let wrong_password = login(
            &store,
            &passwords,
            &keys(),
            LoginRequest {
                email: "ada@example.com".into(),
                password: "Wrong1234".into(),
            },
        )
        .await
        .unwrap_err();
        let unknown_email = login(
            &store,
            &passwords,
            &keys(),
            LoginRequest {
                email: "nobody@example.com".into(),
                password: "Wrong1234".into(),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(wrong_password, AppError::Auth(AuthError::InvalidCredentials)));
        assert!(matches!(unknown_email, AppError::Auth(AuthError::InvalidCredentials)));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn login_succeeds_with_case_insensitive_email() {
        let store = MemoryStore::default();
        let passwords = Arc::new(fast_passwords());
        let registered = register(&store, &passwords, &keys(), registration("ada@example.com"))
            .await
            .unwrap();
        let session = login(
            &store,
            &passwords,
            &keys(),
            LoginRequest {
                email: " ADA@example.com".into(),
                password: "Passw0rdOk".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(session.user.id, registered.user.id);
    }

    #[tokio::test]
    async fn verify_token_resolves_user_and_rejects_unknown_user() {
        let store = MemoryStore::default();
        let passwords = Arc::new(fast_passwords());
        let keys = keys();
        let session = register(&store, &passwords, &keys, registration("ada@example.com"))
            .await
            .unwrap();

        let user = verify_token(&store, &keys, &session.token).await.unwrap();
        assert_eq!(user.id, session.user.id);

        let orphan = keys.sign(Uuid::new_v4(), "ghost@example.com").unwrap();
        let err = verify_token(&store, &keys, &orphan).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthError::UserNotFound)));
    }
}
