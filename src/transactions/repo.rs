use async_trait::async_trait;
use uuid::Uuid;

use super::repo_types::{NewTransaction, Transaction, TransactionPatch, TransactionRow};
use crate::{db::PgStore, error::StoreError};

/// Owner-scoped access to transactions: every method takes the owning
/// user id and never touches another user's rows.
#[async_trait]
pub trait TransactionRepo: Send + Sync {
    /// All of the user's transactions, newest `date` first.
    async fn list_transactions(&self, user_id: Uuid) -> Result<Vec<Transaction>, StoreError>;

    async fn create_transaction(&self, tx: NewTransaction) -> Result<Transaction, StoreError>;

    /// `Ok(None)` when no transaction with that id belongs to the user.
    async fn update_transaction(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: TransactionPatch,
    ) -> Result<Option<Transaction>, StoreError>;

    /// `Ok(false)` when no transaction with that id belongs to the user.
    async fn delete_transaction(&self, user_id: Uuid, id: Uuid) -> Result<bool, StoreError>;
}

const COLUMNS: &str =
    "id, user_id, category, amount, kind, description, date, created_at, updated_at";

#[async_trait]
impl TransactionRepo for PgStore {
    async fn list_transactions(&self, user_id: Uuid) -> Result<Vec<Transaction>, StoreError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM transactions WHERE user_id = $1 \
             ORDER BY date DESC, created_at DESC"
        );
        let rows = self
            .bounded(
                sqlx::query_as::<_, TransactionRow>(&sql)
                    .bind(user_id)
                    .fetch_all(&self.pool),
            )
            .await?;
        rows.into_iter().map(Transaction::try_from).collect()
    }

    async fn create_transaction(&self, tx: NewTransaction) -> Result<Transaction, StoreError> {
        let sql = format!(
            "INSERT INTO transactions (id, user_id, category, amount, kind, description, date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {COLUMNS}"
        );
        let row = self
            .bounded(
                sqlx::query_as::<_, TransactionRow>(&sql)
                    .bind(tx.id)
                    .bind(tx.user_id)
                    .bind(&tx.category)
                    .bind(tx.amount)
                    .bind(tx.kind.as_str())
                    .bind(&tx.description)
                    .bind(tx.date)
                    .fetch_one(&self.pool),
            )
            .await?;
        row.try_into()
    }

    async fn update_transaction(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: TransactionPatch,
    ) -> Result<Option<Transaction>, StoreError> {
        let sql = format!(
            "UPDATE transactions SET \
                 category = COALESCE($3, category), \
                 amount = COALESCE($4, amount), \
                 kind = COALESCE($5, kind), \
                 description = COALESCE($6, description), \
                 date = COALESCE($7, date), \
                 updated_at = now() \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {COLUMNS}"
        );
        let row = self
            .bounded(
                sqlx::query_as::<_, TransactionRow>(&sql)
                    .bind(id)
                    .bind(user_id)
                    .bind(patch.category)
                    .bind(patch.amount)
                    .bind(patch.kind.map(|k| k.as_str()))
                    .bind(patch.description)
                    .bind(patch.date)
                    .fetch_optional(&self.pool),
            )
            .await?;
        row.map(Transaction::try_from).transpose()
    }

    async fn delete_transaction(&self, user_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let result = self
            .bounded(
                sqlx::query("DELETE FROM transactions WHERE id = $1 AND user_id = $2")
                    .bind(id)
                    .bind(user_id)
                    .execute(&self.pool),
            )
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
