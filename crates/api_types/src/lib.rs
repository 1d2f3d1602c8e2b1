use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Distinguish a missing field (`None`) from an explicit `null` (`Some(None)`).
///
/// Use together with `#[serde(default)]`.
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub app: String,
    pub version: String,
}

pub mod user {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Credentials {
        pub username: String,
        pub password: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UsernameChange {
        pub new_username: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PasswordChange {
        pub current_password: String,
        pub new_password: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserView {
        pub id: Uuid,
        pub username: String,
        pub created_at: DateTime<Utc>,
    }

    /// Login response. `token_type` is always `"bearer"`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct Token {
        pub access_token: String,
        pub token_type: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UsernameChanged {
        pub message: String,
        pub access_token: String,
        pub token_type: String,
    }
}

pub mod category {
    use super::*;

    /// Body for both creating and renaming a category.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryName {
        pub name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryView {
        pub id: Uuid,
        pub name: String,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Income,
        Expense,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ExpenseFlag {
        ExceedsBalance,
        LargeExpense,
    }

    /// Body of `POST /api/income`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct IncomeNew {
        pub name: String,
        pub amount: Decimal,
        /// `YYYY-MM-DD`.
        pub date: String,
        pub note: Option<String>,
    }

    /// Body of `POST /api/expenses`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub name: String,
        pub amount: Decimal,
        /// `YYYY-MM-DD`.
        pub date: String,
        pub note: Option<String>,
        pub category_id: Uuid,
    }

    /// Partial update. Absent fields are left untouched; `note: null`
    /// clears the note.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionUpdate {
        pub name: Option<String>,
        pub amount: Option<Decimal>,
        pub date: Option<String>,
        #[serde(
            default,
            deserialize_with = "deserialize_some",
            skip_serializing_if = "Option::is_none"
        )]
        pub note: Option<Option<String>>,
        #[serde(
            default,
            deserialize_with = "deserialize_some",
            skip_serializing_if = "Option::is_none"
        )]
        pub category_id: Option<Option<Uuid>>,
    }

    /// Query string of `GET /api/transactions`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionQuery {
        #[serde(rename = "type")]
        pub kind: Option<TransactionKind>,
        pub from: Option<String>,
        pub to: Option<String>,
        pub q: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        #[serde(rename = "type")]
        pub kind: TransactionKind,
        pub name: String,
        #[serde(with = "rust_decimal::serde::float")]
        pub amount: Decimal,
        pub date: NaiveDate,
        pub note: Option<String>,
        pub category_id: Option<Uuid>,
        pub created_at: DateTime<Utc>,
        /// Only present on expenses.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub flags: Option<Vec<ExpenseFlag>>,
    }
}

pub mod stats {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SummaryView {
        #[serde(with = "rust_decimal::serde::float")]
        pub income_total: Decimal,
        #[serde(with = "rust_decimal::serde::float")]
        pub expense_total: Decimal,
        #[serde(with = "rust_decimal::serde::float")]
        pub total_income: Decimal,
        #[serde(with = "rust_decimal::serde::float")]
        pub total_expenses: Decimal,
        #[serde(with = "rust_decimal::serde::float")]
        pub balance: Decimal,
    }
}
