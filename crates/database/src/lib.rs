//! # Opsdash Database Crate
//!
//! This crate is the resilient data-access layer behind every dashboard view.
//! It owns the connection pool, retries failed queries, turns raw driver
//! failures into actionable diagnoses, and substitutes fallback data so that
//! callers always have something to render.
//!
//! ## Architectural Principles
//!
//! - **Explicit pool ownership:** A single [`PoolManager`] is built at startup
//!   and shared by reference. It creates the pool lazily and replaces it
//!   wholesale whenever a connection-level failure is seen.
//! - **Errors as values:** [`execute_query`](executor::execute_query) returns a
//!   `Result`; swallowing errors happens only in the [`safe`] adapter, where it
//!   is visible and testable on its own.
//! - **Diagnosis, not control flow:** [`process_db_error`] never fails and is
//!   only used to log and report what went wrong.
//!
//! ## Public API
//!
//! - `DbRepository`: the facade handed to HTTP handlers and the CLI.
//! - `PoolManager`, `ConnectionPool`, `PoolFactory`: the pool seam.
//! - `PgPoolFactory`: the production PostgreSQL factory.
//! - `process_db_error` / `ClassifiedError`: the error classifier.
//! - `DbError`: the error type returned from this crate.

// Declare the modules that constitute this crate.
pub mod classify;
pub mod connection;
pub mod error;
pub mod executor;
pub mod failure;
pub mod pool;
pub mod probe;
pub mod repository;
pub mod rows;
pub mod safe;
pub mod schema;

#[cfg(test)]
pub(crate) mod testing;

// Re-export the key components to create a clean, public-facing API.
pub use classify::{process_db_error, ClassifiedError};
pub use connection::{run_migrations, PgPoolFactory};
pub use error::DbError;
pub use executor::{RetryPolicy, RetryScope};
pub use failure::{DbFailure, RawFailure};
pub use pool::{ConnectionPool, PoolFactory, PoolManager};
pub use repository::DbRepository;
pub use safe::EmptyResult;
pub use schema::ColumnInfo;
