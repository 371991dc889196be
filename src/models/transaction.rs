//! Income and expense records. Both kinds share one table and one shape.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::query::blank_as_none;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "transaction_kind")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    /// Human label used in messages ("income", "expense").
    pub fn label(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }

    /// Capitalised label for not-found messages.
    pub fn title(&self) -> &'static str {
        match self {
            TransactionKind::Income => "Income",
            TransactionKind::Expense => "Expense",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: TransactionKind,
    pub category: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTransaction {
    #[validate(length(min = 1, max = 100, message = "category is required"))]
    pub category: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

/// Full replacement of a record's editable fields.
pub type UpdateTransaction = CreateTransaction;

/// Optional filters for the `/filter` endpoints.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TransactionFilters {
    /// Exact category, compared ignoring case.
    pub category: Option<String>,
    /// Exact calendar day.
    #[serde(default, deserialize_with = "blank_as_none")]
    pub date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_as_tag() {
        assert_eq!(
            serde_json::to_string(&TransactionKind::Income).unwrap(),
            "\"Income\""
        );
        assert_eq!(
            serde_json::to_string(&TransactionKind::Expense).unwrap(),
            "\"Expense\""
        );
    }

    #[test]
    fn create_payload_accepts_numeric_amount_and_iso_date() {
        let input: CreateTransaction = serde_json::from_str(
            r#"{"category":"Food","amount":12.5,"date":"2023-03-05"}"#,
        )
        .unwrap();
        assert_eq!(input.amount, Decimal::new(125, 1));
        assert_eq!(input.date, NaiveDate::from_ymd_opt(2023, 3, 5).unwrap());
        assert!(input.description.is_none());
        assert!(input.validate().is_ok());
    }

    #[test]
    fn empty_category_fails_validation() {
        let input = CreateTransaction {
            category: String::new(),
            amount: Decimal::ONE,
            date: NaiveDate::from_ymd_opt(2023, 3, 5).unwrap(),
            description: None,
        };
        assert!(input.validate().is_err());
    }
}
