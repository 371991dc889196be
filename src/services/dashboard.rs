//! Monthly dashboard aggregation: totals, daily chart series, and spending advice.
//!
//! The four record fetches (current and previous month, income and expense)
//! run concurrently; everything after that is a pure reduction over the
//! fetched rows so it can be tested without a database.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::month::{MonthQuery, MonthWindow};
use crate::models::transaction::{Transaction, TransactionKind};
use crate::services::{auth, transaction};

const NO_PREVIOUS_DATA: &str = "No previous month data available.";
const NO_PREVIOUS_INCOME: &str = "No previous month income to calculate usage.";
const HIGH_SPENDING: &str = "You spent a lot last month. Try saving more this month!";
const BALANCED_SPENDING: &str = "Good balance last month. Keep managing expenses wisely.";
const GOOD_SAVINGS: &str = "Great savings last month! Keep it up.";

/// Share of income above which last month counts as high spending.
const HIGH_SPENDING_RATIO: Decimal = Decimal::from_parts(8, 0, 0, false, 1);
/// Share of income above which last month counts as balanced rather than saving.
const BALANCED_RATIO: Decimal = Decimal::from_parts(5, 0, 0, false, 1);
/// A single category above this share of income gets called out.
const CATEGORY_SHARE: Decimal = Decimal::from_parts(3, 0, 0, false, 1);

/// Dashboard payload for one user and month.
#[derive(Debug, Serialize)]
pub struct DashboardData {
    pub username: String,
    pub email: String,
    #[serde(flatten)]
    pub summary: DashboardSummary,
}

/// Everything computed from the month's records.
#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub month: u32,
    pub year: i32,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub balance: Decimal,
    /// Every record of the month, newest first.
    pub recent_transactions: Vec<RecentTransaction>,
    pub daily_income: Vec<Decimal>,
    pub daily_expense: Vec<Decimal>,
    #[serde(flatten)]
    pub advice: Advice,
}

/// One entry of the merged income/expense feed.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecentTransaction {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub category: String,
    pub description: String,
    pub date: NaiveDate,
}

/// Guidance derived from the previous month's figures.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Advice {
    pub has_previous_data: bool,
    pub advice: String,
    /// Absent when the previous month had records but no income.
    pub income_usage_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_advice: Option<String>,
}

/// Build the dashboard for `user_id`, defaulting the month to the one containing `today`.
pub async fn get_dashboard(
    pool: &PgPool,
    user_id: Uuid,
    query: MonthQuery,
    today: NaiveDate,
) -> Result<DashboardData, AppError> {
    let window = MonthWindow::resolve(query, today)?;
    let previous = window.previous();
    let user = auth::find_user_by_id(pool, user_id).await?;

    let (incomes, expenses, prev_incomes, prev_expenses) = tokio::try_join!(
        transaction::find_in_month(pool, TransactionKind::Income, user_id, &window),
        transaction::find_in_month(pool, TransactionKind::Expense, user_id, &window),
        transaction::find_in_month(pool, TransactionKind::Income, user_id, &previous),
        transaction::find_in_month(pool, TransactionKind::Expense, user_id, &previous),
    )?;

    tracing::debug!(
        user_id = %user_id,
        year = window.year,
        month = window.month,
        incomes = incomes.len(),
        expenses = expenses.len(),
        "Aggregating dashboard"
    );

    Ok(DashboardData {
        username: user.username,
        email: user.email,
        summary: summarize(&window, &incomes, &expenses, &prev_incomes, &prev_expenses),
    })
}

/// Aggregate a month's records plus the previous month's into a dashboard.
pub fn summarize(
    window: &MonthWindow,
    incomes: &[Transaction],
    expenses: &[Transaction],
    prev_incomes: &[Transaction],
    prev_expenses: &[Transaction],
) -> DashboardSummary {
    let total_income = total(incomes);
    let total_expense = total(expenses);

    let mut recent_transactions: Vec<RecentTransaction> = incomes
        .iter()
        .chain(expenses)
        .map(|t| RecentTransaction {
            kind: t.kind,
            amount: t.amount,
            category: t.category.to_lowercase(),
            description: t.description.clone(),
            date: t.date,
        })
        .collect();
    recent_transactions.sort_by(|a, b| b.date.cmp(&a.date));

    DashboardSummary {
        month: window.month,
        year: window.year,
        total_income,
        total_expense,
        balance: total_income - total_expense,
        recent_transactions,
        daily_income: daily_series(window, incomes),
        daily_expense: daily_series(window, expenses),
        advice: derive_advice(prev_incomes, prev_expenses),
    }
}

/// Rule-based advice from the previous month's incomes and expenses.
pub fn derive_advice(prev_incomes: &[Transaction], prev_expenses: &[Transaction]) -> Advice {
    if prev_incomes.is_empty() && prev_expenses.is_empty() {
        return Advice {
            has_previous_data: false,
            advice: NO_PREVIOUS_DATA.to_string(),
            income_usage_message: Some(NO_PREVIOUS_INCOME.to_string()),
            category_advice: None,
        };
    }

    let prev_income = total(prev_incomes);
    let prev_expense = total(prev_expenses);
    let spent_ratio = if prev_income > Decimal::ZERO {
        prev_expense.checked_div(prev_income).unwrap_or(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };

    let advice = if spent_ratio > HIGH_SPENDING_RATIO {
        HIGH_SPENDING
    } else if spent_ratio > BALANCED_RATIO {
        BALANCED_SPENDING
    } else {
        GOOD_SAVINGS
    };

    let income_usage_message = (prev_income > Decimal::ZERO).then(|| {
        let usage = (spent_ratio * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
        format!("You used {usage:.1}% of your income last month.")
    });

    Advice {
        has_previous_data: true,
        advice: advice.to_string(),
        income_usage_message,
        category_advice: category_advice(prev_expenses, prev_income),
    }
}

/// Flag the largest expense category when it exceeds 30% of income.
///
/// Categories are grouped case-insensitively; ties go to the alphabetically
/// first category.
fn category_advice(prev_expenses: &[Transaction], prev_income: Decimal) -> Option<String> {
    if prev_income <= Decimal::ZERO {
        return None;
    }

    let mut by_category: BTreeMap<String, Decimal> = BTreeMap::new();
    for expense in prev_expenses {
        *by_category
            .entry(expense.category.to_lowercase())
            .or_insert(Decimal::ZERO) += expense.amount;
    }

    let mut top: Option<(&str, Decimal)> = None;
    for (category, amount) in &by_category {
        if top.map_or(true, |(_, max)| *amount > max) {
            top = Some((category.as_str(), *amount));
        }
    }

    let (category, amount) = top?;
    (amount > prev_income * CATEGORY_SHARE)
        .then(|| format!("You spent a lot on {category}. Try reducing this category."))
}

fn total(records: &[Transaction]) -> Decimal {
    records.iter().map(|t| t.amount).sum()
}

/// Per-day sums, one slot per calendar day of the window.
fn daily_series(window: &MonthWindow, records: &[Transaction]) -> Vec<Decimal> {
    let mut series = vec![Decimal::ZERO; window.days() as usize];
    for record in records.iter().filter(|t| window.contains(t.date)) {
        if let Some(slot) = series.get_mut(record.date.day0() as usize) {
            *slot += record.amount;
        }
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(kind: TransactionKind, category: &str, amount: i64, date: (i32, u32, u32)) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            kind,
            category: category.to_string(),
            amount: Decimal::from(amount),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            description: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn income(amount: i64, date: (i32, u32, u32)) -> Transaction {
        record(TransactionKind::Income, "Salary", amount, date)
    }

    fn expense(category: &str, amount: i64, date: (i32, u32, u32)) -> Transaction {
        record(TransactionKind::Expense, category, amount, date)
    }

    #[test]
    fn march_example_totals_and_daily_buckets() {
        let window = MonthWindow::new(2023, 3).unwrap();
        let incomes = vec![income(100, (2023, 3, 5))];
        let expenses = vec![
            expense("Food", 10, (2023, 3, 20)),
            expense("Food", 40, (2023, 3, 5)),
        ];

        let summary = summarize(&window, &incomes, &expenses, &[], &[]);

        assert_eq!(summary.total_income, Decimal::from(100));
        assert_eq!(summary.total_expense, Decimal::from(50));
        assert_eq!(summary.balance, Decimal::from(50));
        assert_eq!(summary.daily_income.len(), 31);
        assert_eq!(summary.daily_expense.len(), 31);

        for (day, value) in summary.daily_income.iter().enumerate() {
            let expected = if day == 4 { 100 } else { 0 };
            assert_eq!(*value, Decimal::from(expected), "income day index {day}");
        }
        for (day, value) in summary.daily_expense.iter().enumerate() {
            let expected = match day {
                4 => 40,
                19 => 10,
                _ => 0,
            };
            assert_eq!(*value, Decimal::from(expected), "expense day index {day}");
        }
    }

    #[test]
    fn daily_series_sum_matches_totals() {
        let window = MonthWindow::new(2024, 2).unwrap();
        let incomes = vec![
            income(1200, (2024, 2, 1)),
            income(300, (2024, 2, 29)),
            income(45, (2024, 2, 29)),
        ];
        let expenses = vec![
            expense("Rent", 700, (2024, 2, 1)),
            expense("Food", 33, (2024, 2, 14)),
            expense("food", 12, (2024, 2, 28)),
        ];

        let summary = summarize(&window, &incomes, &expenses, &[], &[]);

        assert_eq!(summary.daily_income.len(), 29);
        assert_eq!(
            summary.daily_income.iter().copied().sum::<Decimal>(),
            summary.total_income
        );
        assert_eq!(
            summary.daily_expense.iter().copied().sum::<Decimal>(),
            summary.total_expense
        );
        assert_eq!(
            summary.balance,
            summary.total_income - summary.total_expense
        );
        assert_eq!(summary.daily_income[28], Decimal::from(345));
    }

    #[test]
    fn merged_feed_is_newest_first_and_lowercased() {
        let window = MonthWindow::new(2023, 3).unwrap();
        let incomes = vec![income(100, (2023, 3, 15)), income(50, (2023, 3, 1))];
        let expenses = vec![
            expense("Groceries", 20, (2023, 3, 30)),
            expense("Transport", 5, (2023, 3, 10)),
        ];

        let summary = summarize(&window, &incomes, &expenses, &[], &[]);
        let dates: Vec<u32> = summary
            .recent_transactions
            .iter()
            .map(|t| t.date.day())
            .collect();

        assert_eq!(dates, vec![30, 15, 10, 1]);
        assert_eq!(summary.recent_transactions.len(), 4);
        assert_eq!(summary.recent_transactions[0].kind, TransactionKind::Expense);
        assert_eq!(summary.recent_transactions[0].category, "groceries");
        assert_eq!(summary.recent_transactions[1].kind, TransactionKind::Income);
        assert_eq!(summary.recent_transactions[1].category, "salary");
    }

    #[test]
    fn empty_month_produces_zeroed_series() {
        let window = MonthWindow::new(2023, 4).unwrap();
        let summary = summarize(&window, &[], &[], &[], &[]);
        assert_eq!(summary.total_income, Decimal::ZERO);
        assert_eq!(summary.balance, Decimal::ZERO);
        assert_eq!(summary.daily_expense, vec![Decimal::ZERO; 30]);
        assert!(summary.recent_transactions.is_empty());
    }

    #[test]
    fn no_previous_records_means_no_previous_data() {
        let advice = derive_advice(&[], &[]);
        assert!(!advice.has_previous_data);
        assert_eq!(advice.advice, NO_PREVIOUS_DATA);
        assert_eq!(advice.income_usage_message.as_deref(), Some(NO_PREVIOUS_INCOME));
        assert!(advice.category_advice.is_none());
    }

    #[test]
    fn high_spending_at_85_percent() {
        let advice = derive_advice(
            &[income(1000, (2023, 2, 1))],
            &[
                expense("rent", 250, (2023, 2, 2)),
                expense("food", 250, (2023, 2, 3)),
                expense("travel", 200, (2023, 2, 4)),
                expense("fun", 150, (2023, 2, 5)),
            ],
        );
        assert!(advice.has_previous_data);
        assert_eq!(advice.advice, HIGH_SPENDING);
        assert_eq!(
            advice.income_usage_message.as_deref(),
            Some("You used 85.0% of your income last month.")
        );
        assert!(advice.category_advice.is_none());
    }

    #[test]
    fn ratio_thresholds_are_inclusive_on_the_lower_band() {
        let incomes = [income(1000, (2023, 2, 1))];

        let at_80 = derive_advice(&incomes, &[expense("misc", 800, (2023, 2, 2))]);
        assert_eq!(at_80.advice, BALANCED_SPENDING);

        let at_50 = derive_advice(&incomes, &[expense("misc", 500, (2023, 2, 2))]);
        assert_eq!(at_50.advice, GOOD_SAVINGS);

        let above_50 = derive_advice(&incomes, &[expense("misc", 501, (2023, 2, 2))]);
        assert_eq!(above_50.advice, BALANCED_SPENDING);
    }

    #[test]
    fn expenses_without_income_count_as_zero_ratio() {
        let advice = derive_advice(&[], &[expense("food", 300, (2023, 2, 2))]);
        assert!(advice.has_previous_data);
        assert_eq!(advice.advice, GOOD_SAVINGS);
        assert!(advice.income_usage_message.is_none());
        assert!(advice.category_advice.is_none());
    }

    #[test]
    fn usage_rounds_to_one_decimal() {
        // 1 / 3 = 33.33...%
        let advice = derive_advice(
            &[income(3, (2023, 2, 1))],
            &[expense("food", 1, (2023, 2, 2))],
        );
        assert_eq!(
            advice.income_usage_message.as_deref(),
            Some("You used 33.3% of your income last month.")
        );
    }

    #[test]
    fn dominant_category_is_grouped_case_insensitively() {
        let advice = derive_advice(
            &[income(1000, (2023, 2, 1))],
            &[
                expense("Food", 200, (2023, 2, 2)),
                expense("FOOD", 150, (2023, 2, 9)),
                expense("Rent", 300, (2023, 2, 1)),
            ],
        );
        assert_eq!(
            advice.category_advice.as_deref(),
            Some("You spent a lot on food. Try reducing this category.")
        );
    }

    #[test]
    fn category_at_exactly_30_percent_is_not_flagged() {
        let advice = derive_advice(
            &[income(1000, (2023, 2, 1))],
            &[expense("rent", 300, (2023, 2, 1))],
        );
        assert!(advice.category_advice.is_none());
    }

    #[test]
    fn advice_serializes_without_missing_category() {
        let json = serde_json::to_value(derive_advice(&[], &[])).unwrap();
        assert_eq!(json["has_previous_data"], false);
        assert!(json.get("category_advice").is_none());
    }
}
