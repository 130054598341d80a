//! budgetzen-sync: the client-side data layer of the BudgetZen personal finance tracker.
//!
//! - `api` talks to the BudgetZen REST service and maps its records to domain types.
//! - `session` tracks who is signed in and keeps the credential in an injectable `Storage`.
//! - `store` holds the signed-in user's expenses and charges and keeps them in line with the
//!   server.
//! - `model` has the domain types and the aggregates computed from the collections.
//! - `args` and `commands` make up the `budgetzen` command line tool.

pub mod api;
pub mod args;
pub mod commands;
mod config;
mod error;
pub mod model;
pub mod session;
pub mod store;
mod utils;

#[cfg(test)]
mod test;

pub use api::Mode;
pub use config::{Config, DEFAULT_API_URL};
pub use error::{ApiError, Error, ErrorKind, Result};
