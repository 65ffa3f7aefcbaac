//! In-process store used by unit and router tests.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    auth::{
        repo::UserRepo,
        repo_types::{NewUser, User},
    },
    db::Store,
    error::StoreError,
    transactions::{
        repo::TransactionRepo,
        repo_types::{NewTransaction, Transaction, TransactionPatch},
    },
};

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    transactions: RwLock<HashMap<Uuid, Transaction>>,
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("users_email_key".into()));
        }
        let now = OffsetDateTime::now_utc();
        let stored = User {
            id: user.id,
            email: user.email,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            created_at: now,
            updated_at: now,
        };
        users.insert(stored.id, stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl TransactionRepo for MemoryStore {
    async fn list_transactions(&self, user_id: Uuid) -> Result<Vec<Transaction>, StoreError> {
        let txs = self.transactions.read().await;
        let mut owned: Vec<Transaction> = txs
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(owned)
    }

    async fn create_transaction(&self, tx: NewTransaction) -> Result<Transaction, StoreError> {
        let now = OffsetDateTime::now_utc();
        let stored = Transaction {
            id: tx.id,
            user_id: tx.user_id,
            category: tx.category,
            amount: tx.amount,
            kind: tx.kind,
            description: tx.description,
            date: tx.date,
            created_at: now,
            updated_at: now,
        };
        self.transactions
            .write()
            .await
            .insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_transaction(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: TransactionPatch,
    ) -> Result<Option<Transaction>, StoreError> {
        let mut txs = self.transactions.write().await;
        match txs.get_mut(&id) {
            Some(t) if t.user_id == user_id => {
                apply_patch(&patch, t);
                t.updated_at = OffsetDateTime::now_utc();
                Ok(Some(t.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_transaction(&self, user_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let mut txs = self.transactions.write().await;
        match txs.get(&id) {
            Some(t) if t.user_id == user_id => {
                txs.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

fn apply_patch(patch: &TransactionPatch, t: &mut Transaction) {
    if let Some(category) = &patch.category {
        t.category = category.clone();
    }
    if let Some(amount) = patch.amount {
        t.amount = amount;
    }
    if let Some(kind) = patch.kind {
        t.kind = kind;
    }
    if let Some(description) = &patch.description {
        t.description = description.clone();
    }
    if let Some(date) = patch.date {
        t.date = date;
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Store whose every call fails as if the database were down.
pub struct UnavailableStore;

#[async_trait]
impl UserRepo for UnavailableStore {
    async fn find_user_by_email(&self, _email: &str) -> Result<Option<User>, StoreError> {
        Err(StoreError::Unavailable("store offline".into()))
    }

    async fn find_user_by_id(&self, _id: Uuid) -> Result<Option<User>, StoreError> {
        Err(StoreError::Unavailable("store offline".into()))
    }

    async fn create_user(&self, _user: NewUser) -> Result<User, StoreError> {
        Err(StoreError::Unavailable("store offline".into()))
    }
}

#[async_trait]
impl TransactionRepo for UnavailableStore {
    async fn list_transactions(&self, _user_id: Uuid) -> Result<Vec<Transaction>, StoreError> {
        Err(StoreError::Timeout)
    }

    async fn create_transaction(&self, _tx: NewTransaction) -> Result<Transaction, StoreError> {
        Err(StoreError::Timeout)
    }

    async fn update_transaction(
        &self,
        _user_id: Uuid,
        _id: Uuid,
        _patch: TransactionPatch,
    ) -> Result<Option<Transaction>, StoreError> {
        Err(StoreError::Timeout)
    }

    async fn delete_transaction(&self, _user_id: Uuid, _id: Uuid) -> Result<bool, StoreError> {
        Err(StoreError::Timeout)
    }
}

#[async_trait]
impl Store for UnavailableStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("store offline".into()))
    }
}
