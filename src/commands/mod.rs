//! Command handlers for the budgetzen CLI.
//!
//! This module contains implementations for all CLI subcommands. Each handler wires up the sync
//! core (backend, session and data store) through `Core`, does its work and returns an `Out`.

mod auth;
mod entities;
mod init;
mod summary;

use crate::api::{self, Backend, Client, Mode, TokenCell, Transport};
use crate::session::{FileStorage, Session, Storage};
use crate::store::{DataStore, StoreOptions};
use crate::{Config, Result};
use serde::Serialize;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, info};

pub use auth::{login, logout, register, whoami};
pub use entities::{
    add_charge, add_expense, delete, list, pay, update_charge, update_expense, Listing,
};
pub use init::init;
pub use summary::{summary, SummaryReport};

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// The sync core as one command uses it. The session has been initialized from storage.
pub(crate) struct Core {
    session: Arc<Session>,
    store: Arc<DataStore>,
}

impl Core {
    /// Connects to the backend selected by `mode` with the session stored in the home directory.
    pub(crate) async fn open(config: &Config, mode: Mode) -> Result<Self> {
        let backend = api::backend(config, mode).await?;
        let storage = Arc::new(FileStorage::new(config.session_path()));
        Ok(Self::with(backend, storage, config.store_options()).await)
    }

    /// Like `open`, but fails when nobody is signed in.
    pub(crate) async fn signed_in(config: &Config, mode: Mode) -> Result<Self> {
        let core = Self::open(config, mode).await?;
        anyhow::ensure!(
            core.session.is_authenticated(),
            "You are not signed in, run `budgetzen login` first"
        );
        Ok(core)
    }

    pub(crate) async fn with(
        backend: Arc<dyn Backend>,
        storage: Arc<dyn Storage>,
        options: StoreOptions,
    ) -> Self {
        let client = Client::new(Transport::new(backend, TokenCell::new()));
        let session = Arc::new(Session::new(client.clone(), storage));
        session.initialize().await;
        let store = Arc::new(DataStore::new(client, session.clone(), options));
        Self { session, store }
    }

    pub(crate) fn session(&self) -> &Session {
        &self.session
    }

    pub(crate) fn store(&self) -> &DataStore {
        &self.store
    }
}
