use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    auth::repo_types::{NewUser, User},
    db::PgStore,
    error::StoreError,
};

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Find a user by (already normalized) email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Insert a user. A taken email yields `StoreError::Duplicate`.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;
}

#[async_trait]
impl UserRepo for PgStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.bounded(
            sqlx::query_as::<_, User>(
                r#"
                SELECT id, email, password_hash, first_name, last_name, created_at, updated_at
                FROM users
                WHERE email = $1
                "#,
            )
            .bind(email)
            .fetch_optional(&self.pool),
        )
        .await
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.bounded(
            sqlx::query_as::<_, User>(
                r#"
                SELECT id, email, password_hash, first_name, last_name, created_at, updated_at
                FROM users
                WHERE id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(&self.pool),
        )
        .await
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        self.bounded(
            sqlx::query_as::<_, User>(
                r#"
                INSERT INTO users (id, email, password_hash, first_name, last_name)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, email, password_hash, first_name, last_name, created_at, updated_at
                "#,
            )
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .fetch_one(&self.pool),
        )
        .await
    }
}
