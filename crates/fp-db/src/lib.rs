//! Postgres access for FanPlace.
//!
//! Runtime-checked `sqlx::query` calls with explicit row mapping; no
//! compile-time query macros, so the crate builds without a live database.
//! Lifecycle writes (orders, reviews, inquiries) read the current status,
//! check the transition against `fp-schemas`, then update inside one
//! transaction.

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

mod ads;
mod catalog;
mod inbox;
mod inquiries;
mod reviews;
mod seed;
mod users;

pub use ads::*;
pub use catalog::*;
pub use inbox::*;
pub use inquiries::*;
pub use reviews::*;
pub use seed::{seed, SeedReport, SEED_USERS};
pub use users::*;

pub const ENV_DB_URL: &str = "FANPLACE_DATABASE_URL";

/// Errors callers branch on. Everything else is an opaque `anyhow::Error`
/// with context; use `err.downcast_ref::<DbError>()` to classify.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{entity} cannot move from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: &'static str,
        to: &'static str,
    },
    #[error("{0}")]
    Conflict(String),
}

/// Connect to Postgres using FANPLACE_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url =
        std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Pool that defers connecting until first use. Lets the server (and its
/// tests) start without a reachable database.
pub fn connect_lazy(url: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect_lazy(url)
        .context("invalid database url")
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_orders_table: bool,
}

/// Connectivity + schema presence.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema = 'public' and table_name = 'orders'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_orders_table: exists,
    })
}

/// Detect a Postgres unique constraint violation by name.
pub(crate) fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505") && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}

/// Escape `%`, `_` and `\` for use inside an ILIKE pattern.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("IU"), "%IU%");
        assert_eq!(like_pattern("100%_"), "%100\\%\\_%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn db_error_messages() {
        let e = DbError::InvalidTransition {
            entity: "order",
            from: "REFUNDED",
            to: "PAID",
        };
        assert_eq!(e.to_string(), "order cannot move from REFUNDED to PAID");
        assert_eq!(DbError::NotFound("order").to_string(), "order not found");
    }
}
