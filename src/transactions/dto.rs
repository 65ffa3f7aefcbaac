use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Transaction, TransactionKind};

/// Body of `POST /transactions`. Every field is optional at the parse
/// stage so that validation can name the missing one.
#[derive(Debug, Default, Deserialize)]
pub struct CreateTransactionRequest {
    pub category: Option<String>,
    pub amount: Option<Decimal>,
    pub kind: Option<String>,
    pub description: Option<String>,
    /// RFC 3339 timestamp or `YYYY-MM-DD`; defaults to now.
    pub date: Option<String>,
}

/// Body of `PUT /transactions/:id`. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTransactionRequest {
    pub category: Option<String>,
    pub amount: Option<Decimal>,
    pub kind: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category: String,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Transaction> for TransactionResponse {
    fn from(t: Transaction) -> Self {
        Self {
            id: t.id,
            user_id: t.user_id,
            category: t.category,
            amount: t.amount,
            kind: t.kind,
            description: t.description,
            date: t.date,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryStats {
    pub income: Decimal,
    pub expense: Decimal,
    /// income - expense
    pub total: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStats {
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub balance: Decimal,
    pub transaction_count: usize,
    pub category_stats: BTreeMap<String, CategoryStats>,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub message: &'static str,
}
