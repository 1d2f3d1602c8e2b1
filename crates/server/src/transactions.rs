//! Income, expense and combined transaction endpoints

use api_types::transaction::{
    ExpenseFlag as ApiFlag, ExpenseNew, IncomeNew, TransactionKind as ApiKind, TransactionQuery,
    TransactionUpdate, TransactionView,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{
    ExpenseFlag, Transaction, TransactionDraft, TransactionFilter, TransactionKind,
    TransactionPatch, UserRecord, classify_expense,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn map_kind(kind: TransactionKind) -> ApiKind {
    match kind {
        TransactionKind::Income => ApiKind::Income,
        TransactionKind::Expense => ApiKind::Expense,
    }
}

fn map_flag(flag: ExpenseFlag) -> ApiFlag {
    match flag {
        ExpenseFlag::ExceedsBalance => ApiFlag::ExceedsBalance,
        ExpenseFlag::LargeExpense => ApiFlag::LargeExpense,
    }
}

fn map_patch(payload: TransactionUpdate) -> TransactionPatch {
    TransactionPatch {
        name: payload.name,
        amount: payload.amount,
        date: payload.date,
        note: payload.note,
        category_id: payload.category_id,
    }
}

/// Turns transactions into views, flagging each expense against the balance
/// it is drawn from (the current balance with that expense added back).
struct Viewer {
    balance: Option<Decimal>,
    large_expense_threshold: Decimal,
}

impl Viewer {
    /// Loads the balance only when `txs` holds an expense.
    async fn for_transactions(
        state: &ServerState,
        user: &UserRecord,
        txs: &[Transaction],
    ) -> Result<Self, ServerError> {
        let balance = if txs.iter().any(|tx| tx.kind == TransactionKind::Expense) {
            Some(state.engine.summary(user.id).await?.balance)
        } else {
            None
        };
        Ok(Self {
            balance,
            large_expense_threshold: state.large_expense_threshold,
        })
    }

    fn view(&self, tx: Transaction) -> TransactionView {
        let amount = tx.amount.to_decimal();
        let flags = (tx.kind == TransactionKind::Expense).then(|| {
            let available = self.balance.map(|balance| balance + amount);
            classify_expense(amount, available, self.large_expense_threshold)
                .into_iter()
                .map(map_flag)
                .collect()
        });
        TransactionView {
            id: tx.id,
            kind: map_kind(tx.kind),
            name: tx.name,
            amount,
            date: tx.date,
            note: tx.note,
            category_id: tx.category_id,
            created_at: tx.created_at,
            flags,
        }
    }
}

async fn view_one(
    state: &ServerState,
    user: &UserRecord,
    tx: Transaction,
) -> Result<TransactionView, ServerError> {
    let viewer = Viewer::for_transactions(state, user, std::slice::from_ref(&tx)).await?;
    Ok(viewer.view(tx))
}

async fn view_all(
    state: &ServerState,
    user: &UserRecord,
    txs: Vec<Transaction>,
) -> Result<Vec<TransactionView>, ServerError> {
    let viewer = Viewer::for_transactions(state, user, &txs).await?;
    Ok(txs.into_iter().map(|tx| viewer.view(tx)).collect())
}

async fn list_kind(
    state: &ServerState,
    user: &UserRecord,
    kind: TransactionKind,
) -> Result<Json<Vec<TransactionView>>, ServerError> {
    let filter = TransactionFilter {
        kind: Some(kind),
        ..Default::default()
    };
    let txs = state.engine.list_transactions(user.id, &filter).await?;
    Ok(Json(view_all(state, user, txs).await?))
}

/// All transactions of the user, narrowed by `type`, `from`, `to` and `q`.
pub async fn list(
    Extension(user): Extension<UserRecord>,
    State(state): State<ServerState>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<Vec<TransactionView>>, ServerError> {
    let kind = query.kind.map(|kind| match kind {
        ApiKind::Income => TransactionKind::Income,
        ApiKind::Expense => TransactionKind::Expense,
    });
    let filter = TransactionFilter::parse(
        kind,
        query.from.as_deref(),
        query.to.as_deref(),
        query.q,
    )?;

    let txs = state.engine.list_transactions(user.id, &filter).await?;
    Ok(Json(view_all(&state, &user, txs).await?))
}

pub async fn list_income(
    Extension(user): Extension<UserRecord>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<TransactionView>>, ServerError> {
    list_kind(&state, &user, TransactionKind::Income).await
}

pub async fn list_expenses(
    Extension(user): Extension<UserRecord>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<TransactionView>>, ServerError> {
    list_kind(&state, &user, TransactionKind::Expense).await
}

pub async fn create_income(
    Extension(user): Extension<UserRecord>,
    State(state): State<ServerState>,
    Json(payload): Json<IncomeNew>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let draft = TransactionDraft {
        name: payload.name,
        amount: payload.amount,
        date: payload.date,
        note: payload.note,
    };
    let tx = state.engine.create_income(user.id, draft).await?;
    Ok((StatusCode::CREATED, Json(view_one(&state, &user, tx).await?)))
}

pub async fn create_expense(
    Extension(user): Extension<UserRecord>,
    State(state): State<ServerState>,
    Json(payload): Json<ExpenseNew>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let draft = TransactionDraft {
        name: payload.name,
        amount: payload.amount,
        date: payload.date,
        note: payload.note,
    };
    let tx = state
        .engine
        .create_expense(user.id, draft, payload.category_id)
        .await?;
    Ok((StatusCode::CREATED, Json(view_one(&state, &user, tx).await?)))
}

async fn get_kind(
    state: &ServerState,
    user: &UserRecord,
    kind: TransactionKind,
    id: Uuid,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state.engine.transaction(user.id, kind, id).await?;
    Ok(Json(view_one(state, user, tx).await?))
}

pub async fn get_income(
    Extension(user): Extension<UserRecord>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionView>, ServerError> {
    get_kind(&state, &user, TransactionKind::Income, id).await
}

pub async fn get_expense(
    Extension(user): Extension<UserRecord>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionView>, ServerError> {
    get_kind(&state, &user, TransactionKind::Expense, id).await
}

async fn update_kind(
    state: &ServerState,
    user: &UserRecord,
    kind: TransactionKind,
    id: Uuid,
    payload: TransactionUpdate,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state
        .engine
        .update_transaction(user.id, kind, id, map_patch(payload))
        .await?;
    Ok(Json(view_one(state, user, tx).await?))
}

pub async fn update_income(
    Extension(user): Extension<UserRecord>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransactionUpdate>,
) -> Result<Json<TransactionView>, ServerError> {
    update_kind(&state, &user, TransactionKind::Income, id, payload).await
}

pub async fn update_expense(
    Extension(user): Extension<UserRecord>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransactionUpdate>,
) -> Result<Json<TransactionView>, ServerError> {
    update_kind(&state, &user, TransactionKind::Expense, id, payload).await
}

pub async fn delete_income(
    Extension(user): Extension<UserRecord>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .delete_transaction(user.id, TransactionKind::Income, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_expense(
    Extension(user): Extension<UserRecord>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .delete_transaction(user.id, TransactionKind::Expense, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
