//! Transaction primitives.
//!
//! A `Transaction` is a single income or expense owned by one user. The
//! amount is always positive; the kind decides on which side of the balance
//! it lands.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine, util::parse_iso_date};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(EngineError::Validation(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: TransactionKind,
    pub name: String,
    pub amount: MoneyCents,
    pub date: NaiveDate,
    pub note: Option<String>,
    /// Always `Some` for expenses, always `None` for incomes.
    pub category_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Unvalidated input for a new income or expense.
#[derive(Clone, Debug)]
pub struct TransactionDraft {
    pub name: String,
    pub amount: Decimal,
    /// `YYYY-MM-DD`
    pub date: String,
    pub note: Option<String>,
}

/// Partial update. `None` leaves a field unchanged.
///
/// `note: Some(None)` clears the note. `category_id: Some(None)` is only
/// meaningful as an error: expenses cannot lose their category.
#[derive(Clone, Debug, Default)]
pub struct TransactionPatch {
    pub name: Option<String>,
    pub amount: Option<Decimal>,
    pub date: Option<String>,
    pub note: Option<Option<String>>,
    pub category_id: Option<Option<Uuid>>,
}

impl TransactionPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.amount.is_none()
            && self.date.is_none()
            && self.note.is_none()
            && self.category_id.is_none()
    }
}

/// Filters for listing transactions.
///
/// `from` and `to` are both inclusive. `query` matches name or note,
/// case-insensitively.
#[derive(Clone, Debug, Default)]
pub struct TransactionFilter {
    pub kind: Option<TransactionKind>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub query: Option<String>,
}

impl TransactionFilter {
    /// Build a filter from raw query values. Dates are `YYYY-MM-DD`.
    pub fn parse(
        kind: Option<TransactionKind>,
        from: Option<&str>,
        to: Option<&str>,
        query: Option<String>,
    ) -> ResultEngine<Self> {
        Ok(Self {
            kind,
            from: from.map(parse_iso_date).transpose()?,
            to: to.map(parse_iso_date).transpose()?,
            query,
        })
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        if self.kind.is_some_and(|kind| kind != tx.kind) {
            return false;
        }
        if self.from.is_some_and(|from| tx.date < from) {
            return false;
        }
        if self.to.is_some_and(|to| tx.date > to) {
            return false;
        }

        let query = self
            .query
            .as_deref()
            .map(|q| q.trim().to_lowercase())
            .unwrap_or_default();
        if query.is_empty() {
            return true;
        }
        tx.name.to_lowercase().contains(&query)
            || tx
                .note
                .as_deref()
                .is_some_and(|note| note.to_lowercase().contains(&query))
    }
}

/// Keep the transactions accepted by `filter`, preserving their order.
pub fn filter_transactions<I>(transactions: I, filter: &TransactionFilter) -> Vec<Transaction>
where
    I: IntoIterator<Item = Transaction>,
{
    transactions
        .into_iter()
        .filter(|tx| filter.matches(tx))
        .collect()
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub name: String,
    pub amount_minor: i64,
    pub occurred_on: Date,
    pub note: Option<String>,
    pub category_id: Option<Uuid>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Category,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            name: model.name,
            amount: MoneyCents::new(model.amount_minor),
            date: model.occurred_on,
            note: model.note,
            category_id: model.category_id,
            created_at: model.created_at,
        })
    }
}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id),
            user_id: ActiveValue::Set(tx.user_id),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            name: ActiveValue::Set(tx.name.clone()),
            amount_minor: ActiveValue::Set(tx.amount.into()),
            occurred_on: ActiveValue::Set(tx.date),
            note: ActiveValue::Set(tx.note.clone()),
            category_id: ActiveValue::Set(tx.category_id),
            created_at: ActiveValue::Set(tx.created_at),
        }
    }
}
