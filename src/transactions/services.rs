use rust_decimal::Decimal;
use time::{format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{CreateTransactionRequest, TransactionStats, UpdateTransactionRequest},
    repo::TransactionRepo,
    repo_types::{NewTransaction, Transaction, TransactionKind, TransactionPatch},
};
use crate::error::AppError;

const MAX_CATEGORY_LEN: usize = 50;
const MAX_DESCRIPTION_LEN: usize = 200;
const MAX_AMOUNT_SCALE: u32 = 2;
/// 999_999_999_999.99, the largest value the NUMERIC(14,2) column holds.
const MAX_AMOUNT: Decimal = Decimal::from_parts(0x107A_3FFF, 0x5AF3, 0, false, 2);

fn text_field(field: &'static str, raw: &str, max: usize) -> Result<String, AppError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(AppError::validation(field, format!("{field} is required")));
    }
    if value.chars().count() > max {
        return Err(AppError::validation(
            field,
            format!("{field} must be at most {max} characters"),
        ));
    }
    Ok(value.to_string())
}

fn amount_field(amount: Decimal) -> Result<Decimal, AppError> {
    if amount <= Decimal::ZERO {
        return Err(AppError::validation("amount", "Amount must be greater than 0"));
    }
    if amount.normalize().scale() > MAX_AMOUNT_SCALE {
        return Err(AppError::validation(
            "amount",
            "Amount must have at most 2 decimal places",
        ));
    }
    if amount > MAX_AMOUNT {
        return Err(AppError::validation(
            "amount",
            "Amount must be at most 999999999999.99",
        ));
    }
    Ok(amount)
}

fn kind_field(raw: &str) -> Result<TransactionKind, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::validation("kind", "Kind must be either 'income' or 'expense'"))
}

/// Accepts an RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC).
fn date_field(raw: &str) -> Result<OffsetDateTime, AppError> {
    let raw = raw.trim();
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(ts);
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map(|d| d.midnight().assume_utc())
        .map_err(|_| AppError::validation("date", "Date must be an ISO 8601 date"))
}

impl CreateTransactionRequest {
    pub fn validate(
        self,
        user_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<NewTransaction, AppError> {
        let category = text_field("category", self.category.as_deref().unwrap_or(""), MAX_CATEGORY_LEN)?;
        let amount = self
            .amount
            .ok_or_else(|| AppError::validation("amount", "amount is required"))
            .and_then(amount_field)?;
        let kind = match self.kind.as_deref() {
            Some(k) => kind_field(k)?,
            None => return Err(AppError::validation("kind", "kind is required")),
        };
        let description = text_field(
            "description",
            self.description.as_deref().unwrap_or(""),
            MAX_DESCRIPTION_LEN,
        )?;
        let date = match self.date.as_deref() {
            Some(raw) if !raw.trim().is_empty() => date_field(raw)?,
            _ => now,
        };

        Ok(NewTransaction {
            id: Uuid::new_v4(),
            user_id,
            category,
            amount,
            kind,
            description,
            date,
        })
    }
}

impl UpdateTransactionRequest {
    /// Supplied fields follow the same rules as on create.
    pub fn validate(self) -> Result<TransactionPatch, AppError> {
        Ok(TransactionPatch {
            category: self
                .category
                .map(|c| text_field("category", &c, MAX_CATEGORY_LEN))
                .transpose()?,
            amount: self.amount.map(amount_field).transpose()?,
            kind: self.kind.map(|k| kind_field(&k)).transpose()?,
            description: self
                .description
                .map(|d| text_field("description", &d, MAX_DESCRIPTION_LEN))
                .transpose()?,
            date: self.date.map(|d| date_field(&d)).transpose()?,
        })
    }
}

/// Folds transactions into totals and a per-category breakdown.
/// Takes any iterator so callers can feed it from a cursor.
pub fn fold_stats<'a, I>(transactions: I) -> TransactionStats
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut stats = TransactionStats::default();
    for t in transactions {
        stats.transaction_count += 1;
        let entry = stats.category_stats.entry(t.category.clone()).or_default();
        match t.kind {
            TransactionKind::Income => {
                stats.total_income += t.amount;
                entry.income += t.amount;
            }
            TransactionKind::Expense => {
                stats.total_expenses += t.amount;
                entry.expense += t.amount;
            }
        }
        entry.total = entry.income - entry.expense;
    }
    stats.balance = stats.total_income - stats.total_expenses;
    stats
}

pub async fn list<R: TransactionRepo + ?Sized>(
    repo: &R,
    user_id: Uuid,
) -> Result<Vec<Transaction>, AppError> {
    Ok(repo.list_transactions(user_id).await?)
}

pub async fn create<R: TransactionRepo + ?Sized>(
    repo: &R,
    user_id: Uuid,
    req: CreateTransactionRequest,
) -> Result<Transaction, AppError> {
    let new_tx = req.validate(user_id, OffsetDateTime::now_utc())?;
    let tx = repo.create_transaction(new_tx).await?;
    info!(%user_id, transaction_id = %tx.id, kind = %tx.kind, "transaction created");
    Ok(tx)
}

pub async fn update<R: TransactionRepo + ?Sized>(
    repo: &R,
    user_id: Uuid,
    id: Uuid,
    req: UpdateTransactionRequest,
) -> Result<Transaction, AppError> {
    let patch = req.validate()?;
    match repo.update_transaction(user_id, id, patch).await? {
        Some(tx) => {
            info!(%user_id, transaction_id = %id, "transaction updated");
            Ok(tx)
        }
        None => {
            warn!(%user_id, transaction_id = %id, "update of unknown transaction");
            Err(AppError::NotFound("Transaction"))
        }
    }
}

pub async fn delete<R: TransactionRepo + ?Sized>(
    repo: &R,
    user_id: Uuid,
    id: Uuid,
) -> Result<(), AppError> {
    if repo.delete_transaction(user_id, id).await? {
        info!(%user_id, transaction_id = %id, "transaction deleted");
        Ok(())
    } else {
        warn!(%user_id, transaction_id = %id, "delete of unknown transaction");
        Err(AppError::NotFound("Transaction"))
    }
}

pub async fn stats<R: TransactionRepo + ?Sized>(
    repo: &R,
    user_id: Uuid,
) -> Result<TransactionStats, AppError> {
    let transactions = repo.list_transactions(user_id).await?;
    Ok(fold_stats(&transactions))
}
