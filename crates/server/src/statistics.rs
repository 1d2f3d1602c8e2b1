//! Statistics API endpoints

use api_types::stats::SummaryView;
use axum::{Extension, Json, extract::State};
use engine::UserRecord;

use crate::{ServerError, server::ServerState};

/// Totals and balance over all of the user's transactions.
pub async fn summary(
    Extension(user): Extension<UserRecord>,
    State(state): State<ServerState>,
) -> Result<Json<SummaryView>, ServerError> {
    let summary = state.engine.summary(user.id).await?;
    Ok(Json(SummaryView {
        income_total: summary.income_total,
        expense_total: summary.expense_total,
        total_income: summary.total_income,
        total_expenses: summary.total_expenses,
        balance: summary.balance,
    }))
}
