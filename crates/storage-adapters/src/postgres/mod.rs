//! # Postgres Adapters
//!
//! One repository struct per aggregate, all sharing a `PgPool`. Queries are
//! runtime-bound (`sqlx::query` + `Row::get`); multi-step writes run inside
//! explicit transactions so a failure rolls the whole operation back.

mod communities;
mod content;
mod roles;
mod topics;
mod users;
mod votes;

pub use communities::PgCommunityRepo;
pub use content::PgContentRepo;
pub use roles::PgRoleRepo;
pub use topics::PgTopicRepo;
pub use users::PgUserRepo;
pub use votes::PgVoteRepo;

use domains::AppError;

/// Plain query failures are infrastructure errors.
pub(crate) fn db_err(err: sqlx::Error) -> AppError {
    AppError::Internal(err.to_string())
}

/// Failures inside an open transaction surface as `Transaction`: the
/// rollback already happened (dropping an uncommitted sqlx transaction
/// rolls it back).
pub(crate) fn tx_err(err: sqlx::Error) -> AppError {
    AppError::Transaction(err.to_string())
}
