//! Core of the expense tracker.
//!
//! - [`compute_summary`] turns incomes and expenses into totals and a balance.
//! - [`AuthManager`] registers users, logs them in and resolves tokens.
//! - [`Engine`] persists transactions and categories and is the
//!   [`UserStore`] the auth manager runs on.

pub use auth::{
    Argon2Hasher, Argon2Settings, AuthManager, AuthSettings, Claims, IssuedToken, NewUser,
    PasswordHasher, TokenSigner, UserRecord, UserStore,
};
pub use categories::Category;
pub use error::EngineError;
pub use money::MoneyCents;
pub use ops::{Engine, EngineBuilder};
pub use spending::{ExpenseFlag, classify_expense};
pub use summary::{Amount, Summary, compute_summary};
pub use transactions::{
    Transaction, TransactionDraft, TransactionFilter, TransactionKind, TransactionPatch,
    filter_transactions,
};

mod auth;
mod categories;
mod error;
mod money;
mod ops;
mod spending;
mod summary;
mod transactions;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
