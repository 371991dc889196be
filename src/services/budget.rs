//! Monthly budgets with usage computed from the month's expenses.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::errors::AppError;
use crate::models::budget::{Budget, BudgetUsage, CreateBudget};
use crate::models::money;
use crate::models::month::MonthWindow;
use crate::services::transaction;

/// Budgets of one year that exist, with usage.
pub async fn list_for_year(
    pool: &PgPool,
    user_id: Uuid,
    year: i32,
    today: NaiveDate,
) -> Result<Vec<BudgetUsage>, AppError> {
    let budgets = sqlx::query_as::<_, Budget>(
        "SELECT * FROM budgets WHERE user_id = $1 AND year = $2 ORDER BY month",
    )
    .bind(user_id)
    .bind(year)
    .fetch_all(pool)
    .await?;

    let spent = transaction::monthly_expense_totals(pool, user_id, Some(year)).await?;
    Ok(attach_usage(budgets, &spent, today))
}

/// Every budget of the user, oldest month first, with usage.
pub async fn list_all(
    pool: &PgPool,
    user_id: Uuid,
    today: NaiveDate,
) -> Result<Vec<BudgetUsage>, AppError> {
    let budgets = sqlx::query_as::<_, Budget>(
        "SELECT * FROM budgets WHERE user_id = $1 ORDER BY year, month",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let spent = transaction::monthly_expense_totals(pool, user_id, None).await?;
    Ok(attach_usage(budgets, &spent, today))
}

/// Create a budget for the current or a future month.
pub async fn create(
    pool: &PgPool,
    user_id: Uuid,
    input: &CreateBudget,
    today: NaiveDate,
) -> Result<BudgetUsage, AppError> {
    input.validate()?;
    ensure_positive(input.amount)?;

    let window = MonthWindow::new(input.year, input.month)
        .ok_or_else(|| AppError::Validation(format!("year {} is out of range", input.year)))?;
    if !window.is_current_or_future(today) {
        return Err(AppError::Forbidden(
            "Cannot add budget for past months".to_string(),
        ));
    }

    let budget = sqlx::query_as::<_, Budget>(
        r#"
        INSERT INTO budgets (user_id, month, year, amount)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(window.month as i32)
    .bind(window.year)
    .bind(input.amount)
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::Conflict("Budget already exists for this month".to_string())
        }
        _ => AppError::Database(e),
    })?;

    tracing::info!(budget_id = %budget.id, year = budget.year, month = budget.month, "Created budget");
    let spent = transaction::expense_total(pool, user_id, &window).await?;
    Ok(budget.usage(spent, today))
}

/// Change the amount of a current or future budget the user owns.
pub async fn update(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    amount: Decimal,
    today: NaiveDate,
) -> Result<BudgetUsage, AppError> {
    ensure_positive(amount)?;

    let existing = sqlx::query_as::<_, Budget>("SELECT * FROM budgets WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Budget not found".to_string()))?;

    if existing.user_id != user_id {
        return Err(AppError::Forbidden("Not authorized".to_string()));
    }
    if !existing.is_editable(today) {
        return Err(AppError::Forbidden(
            "Cannot edit past month budget".to_string(),
        ));
    }

    let budget = sqlx::query_as::<_, Budget>(
        "UPDATE budgets SET amount = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
    )
    .bind(amount)
    .bind(existing.id)
    .fetch_one(pool)
    .await?;

    tracing::info!(budget_id = %budget.id, "Updated budget amount");
    spent_usage(pool, budget, today).await
}

/// Pair each budget with its month's expense sum; months without expenses count as zero.
fn attach_usage(
    budgets: Vec<Budget>,
    spent: &HashMap<(i32, i32), Decimal>,
    today: NaiveDate,
) -> Vec<BudgetUsage> {
    budgets
        .into_iter()
        .map(|budget| {
            let used = spent
                .get(&(budget.year, budget.month))
                .copied()
                .unwrap_or(Decimal::ZERO);
            budget.usage(used, today)
        })
        .collect()
}

async fn spent_usage(
    pool: &PgPool,
    budget: Budget,
    today: NaiveDate,
) -> Result<BudgetUsage, AppError> {
    let window = budget.window().ok_or_else(|| {
        AppError::Internal(format!("Budget {} has an invalid month", budget.id))
    })?;
    let spent = transaction::expense_total(pool, budget.user_id, &window).await?;
    Ok(budget.usage(spent, today))
}

fn ensure_positive(amount: Decimal) -> Result<(), AppError> {
    if amount <= Decimal::ZERO {
        return Err(AppError::Validation(
            "Amount required and must be > 0".to_string(),
        ));
    }
    money::ensure_storable(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_amount_must_be_positive() {
        assert!(ensure_positive(Decimal::ONE).is_ok());
        assert!(ensure_positive(Decimal::ZERO).is_err());
        assert!(ensure_positive(Decimal::new(-5, 0)).is_err());
    }

    #[test]
    fn budget_amount_must_fit_the_column() {
        assert!(ensure_positive(Decimal::new(150_050, 2)).is_ok());
        assert!(ensure_positive(Decimal::new(1, 3)).is_err());
        assert!(ensure_positive(Decimal::from(5_000_000_000_000i64)).is_err());
    }

    fn budget(month: i32, year: i32, amount: i64) -> Budget {
        Budget {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            month,
            year,
            amount: Decimal::from(amount),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn usage_is_matched_by_year_and_month() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let spent = HashMap::from([
            ((2026, 10), Decimal::from(60)),
            ((2025, 10), Decimal::from(999)),
        ]);

        let usage = attach_usage(
            vec![budget(10, 2026, 120), budget(11, 2026, 50)],
            &spent,
            today,
        );

        assert_eq!(usage[0].used_amount, Decimal::from(60));
        assert_eq!(usage[0].percent_used, 50);
        assert_eq!(usage[1].used_amount, Decimal::ZERO);
        assert_eq!(usage[1].percent_used, 0);
    }
}
