//! Monthly spending budgets and their usage view.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::month::MonthWindow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Budget {
    pub id: Uuid,
    pub user_id: Uuid,
    pub month: i32,
    pub year: i32,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBudget {
    #[validate(range(min = 1, max = 12, message = "month must be between 1 and 12"))]
    pub month: u32,
    pub year: i32,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateBudget {
    pub amount: Decimal,
}

/// Budget enriched with how much of it the month's expenses consumed.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetUsage {
    pub budget_id: Uuid,
    pub month: i32,
    pub year: i32,
    pub amount: Decimal,
    pub used_amount: Decimal,
    pub percent_used: i64,
    pub editable: bool,
    pub over_budget: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Budget {
    /// Window of the budgeted month, if the stored month/year pair is valid.
    pub fn window(&self) -> Option<MonthWindow> {
        u32::try_from(self.month)
            .ok()
            .and_then(|m| MonthWindow::new(self.year, m))
    }

    /// Only the current and future months may be edited.
    pub fn is_editable(&self, today: NaiveDate) -> bool {
        self.window()
            .map(|w| w.is_current_or_future(today))
            .unwrap_or(false)
    }

    pub fn usage(&self, spent: Decimal, today: NaiveDate) -> BudgetUsage {
        let percent_used = if self.amount > Decimal::ZERO {
            (spent / self.amount * Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_i64()
                .unwrap_or(i64::MAX)
        } else {
            0
        };

        BudgetUsage {
            budget_id: self.id,
            month: self.month,
            year: self.year,
            amount: self.amount,
            used_amount: spent,
            percent_used,
            editable: self.is_editable(today),
            over_budget: (spent - self.amount).max(Decimal::ZERO),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
