//! Income and expense records: listing, filtering, and current-month CRUD.
//!
//! Records can only be created, edited, or deleted while they fall in the
//! current calendar month. Past months are read-only.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::errors::AppError;
use crate::models::money;
use crate::models::month::MonthWindow;
use crate::models::transaction::{
    CreateTransaction, Transaction, TransactionFilters, TransactionKind, UpdateTransaction,
};

/// List every record of one kind for a user, newest first.
pub async fn list(
    pool: &PgPool,
    kind: TransactionKind,
    user_id: Uuid,
) -> Result<Vec<Transaction>, AppError> {
    let rows = sqlx::query_as::<_, Transaction>(
        r#"
        SELECT * FROM transactions
        WHERE user_id = $1 AND kind = $2
        ORDER BY date DESC, created_at DESC
        "#,
    )
    .bind(user_id)
    .bind(kind)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Records of one kind whose date lies in `[from, to]`, newest first.
pub async fn find_in_range(
    pool: &PgPool,
    kind: TransactionKind,
    user_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<Transaction>, AppError> {
    let rows = sqlx::query_as::<_, Transaction>(
        r#"
        SELECT * FROM transactions
        WHERE user_id = $1 AND kind = $2 AND date BETWEEN $3 AND $4
        ORDER BY date DESC, created_at DESC
        "#,
    )
    .bind(user_id)
    .bind(kind)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Records of one kind inside a month window.
pub async fn find_in_month(
    pool: &PgPool,
    kind: TransactionKind,
    user_id: Uuid,
    window: &MonthWindow,
) -> Result<Vec<Transaction>, AppError> {
    find_in_range(pool, kind, user_id, window.start, window.end).await
}

/// Sum of a user's expenses within a month window.
pub async fn expense_total(
    pool: &PgPool,
    user_id: Uuid,
    window: &MonthWindow,
) -> Result<Decimal, AppError> {
    let total = sqlx::query_scalar::<_, Option<Decimal>>(
        r#"
        SELECT SUM(amount) FROM transactions
        WHERE user_id = $1 AND kind = 'Expense' AND date BETWEEN $2 AND $3
        "#,
    )
    .bind(user_id)
    .bind(window.start)
    .bind(window.end)
    .fetch_one(pool)
    .await?;
    Ok(total.unwrap_or(Decimal::ZERO))
}

/// Expense sums keyed by `(year, month)`, optionally restricted to one year.
pub async fn monthly_expense_totals(
    pool: &PgPool,
    user_id: Uuid,
    year: Option<i32>,
) -> Result<HashMap<(i32, i32), Decimal>, AppError> {
    let rows = sqlx::query_as::<_, (i32, i32, Decimal)>(
        r#"
        SELECT EXTRACT(YEAR FROM date)::INT4, EXTRACT(MONTH FROM date)::INT4, SUM(amount)
        FROM transactions
        WHERE user_id = $1
          AND kind = 'Expense'
          AND ($2::INT4 IS NULL OR EXTRACT(YEAR FROM date)::INT4 = $2)
        GROUP BY 1, 2
        "#,
    )
    .bind(user_id)
    .bind(year)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(year, month, total)| ((year, month), total))
        .collect())
}

/// Filter by exact category (ignoring case) and/or exact day.
pub async fn filter(
    pool: &PgPool,
    kind: TransactionKind,
    user_id: Uuid,
    filters: &TransactionFilters,
) -> Result<Vec<Transaction>, AppError> {
    let category = filters
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let rows = sqlx::query_as::<_, Transaction>(
        r#"
        SELECT * FROM transactions
        WHERE user_id = $1
          AND kind = $2
          AND ($3::TEXT IS NULL OR LOWER(category) = LOWER($3))
          AND ($4::DATE IS NULL OR date = $4)
        ORDER BY date DESC, created_at DESC
        "#,
    )
    .bind(user_id)
    .bind(kind)
    .bind(category)
    .bind(filters.date)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Record a new income or expense dated in the current month.
pub async fn create(
    pool: &PgPool,
    kind: TransactionKind,
    user_id: Uuid,
    input: &CreateTransaction,
    today: NaiveDate,
) -> Result<Transaction, AppError> {
    validate_input(input)?;
    ensure_current_month(kind, input.date, today, "add")?;

    let record = sqlx::query_as::<_, Transaction>(
        r#"
        INSERT INTO transactions (user_id, kind, category, amount, date, description)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(kind)
    .bind(input.category.trim())
    .bind(input.amount)
    .bind(input.date)
    .bind(input.description.as_deref().unwrap_or(""))
    .fetch_one(pool)
    .await?;

    tracing::info!(record_id = %record.id, kind = kind.label(), "Created record");
    Ok(record)
}

/// Replace the editable fields of a record the user owns.
pub async fn update(
    pool: &PgPool,
    kind: TransactionKind,
    user_id: Uuid,
    id: Uuid,
    input: &UpdateTransaction,
    today: NaiveDate,
) -> Result<Transaction, AppError> {
    validate_input(input)?;
    let existing = find_owned(pool, kind, user_id, id).await?;
    ensure_current_month(kind, existing.date, today, "edit")?;
    ensure_current_month(kind, input.date, today, "move records into")?;

    let record = sqlx::query_as::<_, Transaction>(
        r#"
        UPDATE transactions
        SET category = $1, amount = $2, date = $3, description = $4, updated_at = NOW()
        WHERE id = $5
        RETURNING *
        "#,
    )
    .bind(input.category.trim())
    .bind(input.amount)
    .bind(input.date)
    .bind(input.description.as_deref().unwrap_or(""))
    .bind(existing.id)
    .fetch_one(pool)
    .await?;

    tracing::info!(record_id = %record.id, kind = kind.label(), "Updated record");
    Ok(record)
}

/// Delete a current-month record the user owns.
pub async fn delete(
    pool: &PgPool,
    kind: TransactionKind,
    user_id: Uuid,
    id: Uuid,
    today: NaiveDate,
) -> Result<(), AppError> {
    let existing = find_owned(pool, kind, user_id, id).await?;
    ensure_current_month(kind, existing.date, today, "delete")?;

    sqlx::query("DELETE FROM transactions WHERE id = $1")
        .bind(existing.id)
        .execute(pool)
        .await?;

    tracing::info!(record_id = %existing.id, kind = kind.label(), "Deleted record");
    Ok(())
}

/// Load a record of the given kind and check it belongs to `user_id`.
async fn find_owned(
    pool: &PgPool,
    kind: TransactionKind,
    user_id: Uuid,
    id: Uuid,
) -> Result<Transaction, AppError> {
    let record = sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions WHERE id = $1 AND kind = $2",
    )
    .bind(id)
    .bind(kind)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("{} not found", kind.title())))?;

    if record.user_id != user_id {
        return Err(AppError::Forbidden("Not authorized".to_string()));
    }
    Ok(record)
}

fn validate_input(input: &CreateTransaction) -> Result<(), AppError> {
    input.validate()?;
    if input.category.trim().is_empty() {
        return Err(AppError::Validation("category is required".to_string()));
    }
    if input.amount <= Decimal::ZERO {
        return Err(AppError::Validation(
            "amount must be greater than zero".to_string(),
        ));
    }
    money::ensure_storable(input.amount)
}

fn ensure_current_month(
    kind: TransactionKind,
    date: NaiveDate,
    today: NaiveDate,
    action: &str,
) -> Result<(), AppError> {
    if MonthWindow::containing(today).contains(date) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "You can only {action} current month {}s",
            kind.label()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn input(category: &str, amount: Decimal) -> CreateTransaction {
        CreateTransaction {
            category: category.to_string(),
            amount,
            date: date(2026, 10, 3),
            description: None,
        }
    }

    #[test]
    fn current_month_rule() {
        let today = date(2026, 10, 16);
        assert!(ensure_current_month(TransactionKind::Expense, date(2026, 10, 1), today, "add").is_ok());
        assert!(ensure_current_month(TransactionKind::Expense, date(2026, 10, 31), today, "add").is_ok());

        let err = ensure_current_month(TransactionKind::Income, date(2026, 9, 30), today, "edit")
            .unwrap_err();
        assert!(err.is_forbidden());
        assert_eq!(
            err.to_string(),
            "Forbidden: You can only edit current month incomes"
        );

        assert!(ensure_current_month(TransactionKind::Expense, date(2025, 10, 16), today, "delete").is_err());
    }

    #[test]
    fn amount_must_be_positive() {
        assert!(validate_input(&input("food", Decimal::new(1, 2))).is_ok());
        assert!(validate_input(&input("food", Decimal::ZERO)).is_err());
        assert!(validate_input(&input("food", Decimal::NEGATIVE_ONE)).is_err());
    }

    #[test]
    fn amount_must_fit_the_column() {
        assert!(validate_input(&input("food", Decimal::new(1999, 2))).is_ok());

        let err = validate_input(&input("food", Decimal::new(12345, 3))).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = validate_input(&input("food", Decimal::from(1_000_000_000_000i64))).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn blank_category_rejected() {
        let err = validate_input(&input("   ", Decimal::ONE)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
