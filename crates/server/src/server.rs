use axum::{
    Json, Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use chrono::Utc;
use rust_decimal::Decimal;

use std::sync::Arc;

use api_types::{Health, Message};
use engine::{Argon2Hasher, AuthManager, Engine};

use crate::{ServerError, auth, categories, statistics, transactions};

pub type Auth = AuthManager<Engine, Argon2Hasher>;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub auth: Arc<Auth>,
    /// Expenses at or above this amount are flagged `large_expense`.
    pub large_expense_threshold: Decimal,
}

/// The raw bearer token of an authenticated request.
#[derive(Clone, Debug)]
pub(crate) struct BearerToken(pub(crate) String);

/// Resolve the bearer token into the current user.
///
/// On success the request carries the `engine::UserRecord` and the
/// [`BearerToken`] in its extensions.
async fn require_user(
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return Err(ServerError::Unauthenticated);
    };
    let token = bearer.token().to_string();

    let user = state.auth.me(&token).await?;

    request.extensions_mut().insert(user);
    request.extensions_mut().insert(BearerToken(token));
    Ok(next.run(request).await)
}

async fn root() -> Json<Message> {
    Json(Message {
        message: "Expense Tracker API is running. See /health for status.".to_string(),
    })
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        app: "expense-tracker".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub fn router(state: ServerState) -> Router {
    let protected = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/change-username", post(auth::change_username))
        .route("/auth/change-password", post(auth::change_password))
        .route(
            "/api/categories",
            get(categories::list).post(categories::create),
        )
        .route(
            "/api/categories/{id}",
            axum::routing::patch(categories::rename).delete(categories::delete),
        )
        .route(
            "/api/income",
            get(transactions::list_income).post(transactions::create_income),
        )
        .route(
            "/api/income/{id}",
            get(transactions::get_income)
                .patch(transactions::update_income)
                .delete(transactions::delete_income),
        )
        .route(
            "/api/expenses",
            get(transactions::list_expenses).post(transactions::create_expense),
        )
        .route(
            "/api/expenses/{id}",
            get(transactions::get_expense)
                .patch(transactions::update_expense)
                .delete(transactions::delete_expense),
        )
        .route("/api/transactions", get(transactions::list))
        .route("/api/stats/summary", get(statistics::summary))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .merge(protected)
        .with_state(state)
}

pub async fn run(state: ServerState, bind: &str, port: u16) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind((bind, port)).await?;
    run_with_listener(state, listener).await
}

pub async fn run_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(state, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
