use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, MoneyCents, ResultEngine, Summary, Transaction, TransactionDraft,
    TransactionFilter, TransactionKind, TransactionPatch, compute_summary, filter_transactions,
    transactions,
    util::{TRANSACTION_NAME_MAX_LEN, normalize_note, normalize_required_name, parse_iso_date},
};

use super::{Engine, with_tx};

struct ValidDraft {
    name: String,
    amount: MoneyCents,
    date: NaiveDate,
    note: Option<String>,
}

fn validate_draft(draft: TransactionDraft) -> ResultEngine<ValidDraft> {
    Ok(ValidDraft {
        name: normalize_required_name(&draft.name, "name", TRANSACTION_NAME_MAX_LEN)?,
        amount: MoneyCents::try_from(draft.amount)?,
        date: parse_iso_date(&draft.date)?,
        note: normalize_note(draft.note.as_deref())?,
    })
}

fn validate_list_filter(filter: &TransactionFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from > to
    {
        return Err(EngineError::Validation(
            "invalid range: from must be <= to".to_string(),
        ));
    }
    Ok(())
}

trait ApplyTxFilters: QueryFilter + Sized {
    fn apply_tx_filters(self, filter: &TransactionFilter) -> Self;
}

impl<T> ApplyTxFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_tx_filters(mut self, filter: &TransactionFilter) -> Self {
        if let Some(kind) = filter.kind {
            self = self.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        if let Some(from) = filter.from {
            self = self.filter(transactions::Column::OccurredOn.gte(from));
        }
        if let Some(to) = filter.to {
            self = self.filter(transactions::Column::OccurredOn.lte(to));
        }
        self
    }
}

fn not_found(kind: TransactionKind, id: Uuid) -> EngineError {
    EngineError::KeyNotFound(format!("{} {id}", kind.as_str()))
}

impl Engine {
    /// Record an income for `user_id`.
    pub async fn create_income(
        &self,
        user_id: Uuid,
        draft: TransactionDraft,
    ) -> ResultEngine<Transaction> {
        let valid = validate_draft(draft)?;
        self.insert_transaction(user_id, TransactionKind::Income, valid, None)
            .await
    }

    /// Record an expense for `user_id`. The category must exist.
    pub async fn create_expense(
        &self,
        user_id: Uuid,
        draft: TransactionDraft,
        category_id: Uuid,
    ) -> ResultEngine<Transaction> {
        let valid = validate_draft(draft)?;
        Self::ensure_category(&self.database, category_id).await?;
        self.insert_transaction(user_id, TransactionKind::Expense, valid, Some(category_id))
            .await
    }

    async fn insert_transaction(
        &self,
        user_id: Uuid,
        kind: TransactionKind,
        valid: ValidDraft,
        category_id: Option<Uuid>,
    ) -> ResultEngine<Transaction> {
        let tx = Transaction {
            id: Uuid::new_v4(),
            user_id,
            kind,
            name: valid.name,
            amount: valid.amount,
            date: valid.date,
            note: valid.note,
            category_id,
            created_at: Utc::now(),
        };
        let model = transactions::ActiveModel::from(&tx)
            .insert(&self.database)
            .await?;
        tracing::debug!("created {} {} of {}", kind.as_str(), tx.id, tx.amount);
        Transaction::try_from(model)
    }

    /// The user's transactions matching `filter`, newest first.
    pub async fn list_transactions(
        &self,
        user_id: Uuid,
        filter: &TransactionFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        validate_list_filter(filter)?;

        let models = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .apply_tx_filters(filter)
            .order_by_desc(transactions::Column::OccurredOn)
            .order_by_desc(transactions::Column::CreatedAt)
            .all(&self.database)
            .await?;

        let txs = models
            .into_iter()
            .map(Transaction::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        Ok(filter_transactions(txs, filter))
    }

    /// One transaction of the given kind owned by `user_id`.
    pub async fn transaction(
        &self,
        user_id: Uuid,
        kind: TransactionKind,
        id: Uuid,
    ) -> ResultEngine<Transaction> {
        let model = self.owned_model(&self.database, user_id, kind, id).await?;
        Transaction::try_from(model)
    }

    /// Apply a partial update; fields absent from `patch` keep their value.
    pub async fn update_transaction(
        &self,
        user_id: Uuid,
        kind: TransactionKind,
        id: Uuid,
        patch: TransactionPatch,
    ) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let model = self.owned_model(&db_tx, user_id, kind, id).await?;
            if patch.is_empty() {
                Transaction::try_from(model)
            } else {
                let mut active: transactions::ActiveModel = model.into();

                if let Some(name) = patch.name.as_deref() {
                    active.name = ActiveValue::Set(normalize_required_name(
                        name,
                        "name",
                        TRANSACTION_NAME_MAX_LEN,
                    )?);
                }
                if let Some(amount) = patch.amount {
                    active.amount_minor = ActiveValue::Set(MoneyCents::try_from(amount)?.into());
                }
                if let Some(date) = patch.date.as_deref() {
                    active.occurred_on = ActiveValue::Set(parse_iso_date(date)?);
                }
                if let Some(note) = &patch.note {
                    active.note = ActiveValue::Set(normalize_note(note.as_deref())?);
                }
                match (kind, patch.category_id) {
                    (_, None) | (TransactionKind::Income, Some(None)) => {}
                    (TransactionKind::Income, Some(Some(_))) => {
                        return Err(EngineError::Validation(
                            "income transactions have no category".to_string(),
                        ));
                    }
                    (TransactionKind::Expense, Some(None)) => {
                        return Err(EngineError::Validation(
                            "expense requires a category".to_string(),
                        ));
                    }
                    (TransactionKind::Expense, Some(Some(category_id))) => {
                        Self::ensure_category(&db_tx, category_id).await?;
                        active.category_id = ActiveValue::Set(Some(category_id));
                    }
                }

                let model = active.update(&db_tx).await?;
                Transaction::try_from(model)
            }
        })
    }

    pub async fn delete_transaction(
        &self,
        user_id: Uuid,
        kind: TransactionKind,
        id: Uuid,
    ) -> ResultEngine<()> {
        let result = transactions::Entity::delete_many()
            .filter(transactions::Column::Id.eq(id))
            .filter(transactions::Column::UserId.eq(user_id))
            .filter(transactions::Column::Kind.eq(kind.as_str()))
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(not_found(kind, id));
        }
        Ok(())
    }

    /// Totals over every stored transaction of the user.
    ///
    /// Recomputed from the records on each call.
    pub async fn summary(&self, user_id: Uuid) -> ResultEngine<Summary> {
        let txs = self
            .list_transactions(user_id, &TransactionFilter::default())
            .await?;
        let (incomes, expenses): (Vec<_>, Vec<_>) = txs
            .into_iter()
            .partition(|tx| tx.kind == TransactionKind::Income);
        Ok(compute_summary(&incomes, &expenses))
    }

    async fn owned_model<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: Uuid,
        kind: TransactionKind,
        id: Uuid,
    ) -> ResultEngine<transactions::Model> {
        transactions::Entity::find_by_id(id)
            .filter(transactions::Column::UserId.eq(user_id))
            .filter(transactions::Column::Kind.eq(kind.as_str()))
            .one(db)
            .await?
            .ok_or_else(|| not_found(kind, id))
    }
}
