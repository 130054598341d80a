//! The data store: the authoritative in-memory copy of the signed-in user's expenses and charges.
//!
//! Reads never touch the network. `refresh_all` replaces both collections with the server's
//! listings, and each mutation applies the server's answer to the matching collection once it
//! arrives. The store state is locked only to read or apply a result, never across a request, so
//! a future that is dropped while waiting on the server simply never applies anything.
//!
//! Without an authenticated session both collections are empty and no data request is made. Any
//! result that comes back after the session changed is discarded, and a `401` from the server
//! expires the session.

use crate::api::{Client, Resource};
use crate::error::ApiError;
use crate::model::{Charge, ChargeDraft, Expense, ExpenseDraft, Summary};
use crate::session::{Session, SessionState};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Behavior switches of the `DataStore`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, Serialize, Deserialize)]
pub struct StoreOptions {
    /// When true, at most one mutation per collection is in flight and results are applied in
    /// the order the mutations were issued. When false, concurrent mutations race and the last
    /// response to arrive wins.
    pub serialize_mutations: bool,
}

/// The load status of the store as a whole.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreStatus {
    /// No session, or nothing loaded yet.
    Empty,
    Loading,
    Loaded,
    /// The last refresh failed. The collections hold whatever they held before it.
    Errored,
}

serde_plain::derive_display_from_serialize!(StoreStatus);

/// A consistent copy of the store's collections and status.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub expenses: Vec<Expense>,
    pub charges: Vec<Charge>,
    pub status: StoreStatus,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    expenses: Vec<Expense>,
    charges: Vec<Charge>,
    loaded: bool,
    error: Option<String>,
    /// The session generation the collections belong to.
    generation: u64,
}

impl State {
    fn clear(&mut self) {
        self.expenses.clear();
        self.charges.clear();
        self.loaded = false;
        self.error = None;
    }
}

/// Ties an entity type to its collection inside the store.
trait Collection: Resource {
    fn items(state: &mut State) -> &mut Vec<Self>;
    fn gate(store: &DataStore) -> &Mutex<()>;
}

impl Collection for Expense {
    fn items(state: &mut State) -> &mut Vec<Self> {
        &mut state.expenses
    }

    fn gate(store: &DataStore) -> &Mutex<()> {
        &store.expense_gate
    }
}

impl Collection for Charge {
    fn items(state: &mut State) -> &mut Vec<Self> {
        &mut state.charges
    }

    fn gate(store: &DataStore) -> &Mutex<()> {
        &store.charge_gate
    }
}

/// Decrements the in-flight refresh count when dropped, including when the refresh is abandoned.
struct Loading<'a>(&'a AtomicUsize);

impl<'a> Loading<'a> {
    fn start(count: &'a AtomicUsize) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self(count)
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct DataStore {
    client: Client,
    session: Arc<Session>,
    options: StoreOptions,
    state: Mutex<State>,
    refreshing: AtomicUsize,
    expense_gate: Mutex<()>,
    charge_gate: Mutex<()>,
}

impl DataStore {
    /// `client` must share its token cell with the one `session` writes to.
    pub fn new(client: Client, session: Arc<Session>, options: StoreOptions) -> Self {
        Self {
            client,
            session,
            options,
            state: Mutex::new(State::default()),
            refreshing: AtomicUsize::new(0),
            expense_gate: Mutex::new(()),
            charge_gate: Mutex::new(()),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn options(&self) -> StoreOptions {
        self.options
    }

    /// Replaces both collections with the server's listings. The two listings are requested
    /// concurrently and, if either fails, neither collection changes and the error is recorded.
    /// Without a session the collections are emptied and nothing is requested.
    pub async fn refresh_all(&self) -> Result<(), ApiError> {
        if !self.session.is_authenticated() {
            self.clear().await;
            return Ok(());
        }
        let generation = self.session.generation();
        let loading = Loading::start(&self.refreshing);
        self.lock().await.error = None;

        let (expenses, charges) = tokio::join!(
            self.client.list::<Expense>(),
            self.client.list::<Charge>()
        );
        let listings = match (expenses, charges) {
            (Ok(expenses), Ok(charges)) => Ok((expenses, charges)),
            (Err(e), _) | (_, Err(e)) => Err(e),
        };

        let mut state = self.lock().await;
        drop(loading);
        if self.session.generation() != generation {
            debug!("Discarding a refresh that finished after the session changed");
            return listings.map(|_| ());
        }
        match listings {
            Ok((expenses, charges)) => {
                info!(
                    "Loaded {} expenses and {} charges",
                    expenses.len(),
                    charges.len()
                );
                state.expenses = expenses;
                state.charges = charges;
                state.loaded = true;
                state.error = None;
                Ok(())
            }
            Err(e) => {
                warn!("Unable to load data: {e}");
                state.error = Some(e.to_string());
                drop(state);
                if e.is_session_expired() {
                    self.expire_session().await;
                }
                Err(e)
            }
        }
    }

    pub async fn add_expense(&self, draft: &ExpenseDraft) -> Result<Expense, ApiError> {
        self.add::<Expense>(draft).await
    }

    pub async fn update_expense(&self, expense: &Expense) -> Result<Expense, ApiError> {
        self.update(expense).await
    }

    pub async fn remove_expense(&self, id: u64) -> Result<(), ApiError> {
        self.remove::<Expense>(id).await
    }

    pub async fn add_charge(&self, draft: &ChargeDraft) -> Result<Charge, ApiError> {
        self.add::<Charge>(draft).await
    }

    pub async fn update_charge(&self, charge: &Charge) -> Result<Charge, ApiError> {
        self.update(charge).await
    }

    pub async fn remove_charge(&self, id: u64) -> Result<(), ApiError> {
        self.remove::<Charge>(id).await
    }

    /// Marks a charge as paid or unpaid. The whole charge is sent, with only `is_paid` changed.
    pub async fn set_charge_paid(&self, charge: &Charge, paid: bool) -> Result<Charge, ApiError> {
        let mut updated = charge.clone();
        updated.is_paid = paid;
        self.update(&updated).await
    }

    /// The expenses, in the order the server listed them with newly added ones first.
    pub async fn expenses(&self) -> Vec<Expense> {
        self.lock().await.expenses.clone()
    }

    pub async fn charges(&self) -> Vec<Charge> {
        self.lock().await.charges.clone()
    }

    pub async fn snapshot(&self) -> Snapshot {
        let state = self.lock().await;
        Snapshot {
            expenses: state.expenses.clone(),
            charges: state.charges.clone(),
            status: self.status_of(&state),
            error: state.error.clone(),
        }
    }

    pub async fn status(&self) -> StoreStatus {
        let state = self.lock().await;
        self.status_of(&state)
    }

    /// True while a refresh is in flight, and while the session has not been resolved yet.
    pub fn is_loading(&self) -> bool {
        self.session.is_loading() || self.refreshing.load(Ordering::SeqCst) > 0
    }

    /// The message of the last failed refresh, cleared by the next successful one.
    pub async fn error(&self) -> Option<String> {
        self.lock().await.error.clone()
    }

    /// The aggregates of the current collections.
    pub async fn summary(&self) -> Summary {
        let state = self.lock().await;
        Summary::new(&state.expenses, &state.charges)
    }

    /// Brings the collections in line with the session: reloads them when signed in and empties
    /// them otherwise.
    pub async fn sync_with_session(&self) -> Result<(), ApiError> {
        match self.session.state() {
            SessionState::Authenticated(_) => self.refresh_all().await,
            SessionState::Unknown | SessionState::Unauthenticated => {
                self.clear().await;
                Ok(())
            }
        }
    }

    /// Spawns a task that calls `sync_with_session` now and after every session change. The task
    /// runs until it is aborted through the returned handle.
    pub fn watch_session(self: Arc<Self>) -> JoinHandle<()> {
        let mut changes = self.session.subscribe();
        tokio::spawn(async move {
            loop {
                if let Err(e) = self.sync_with_session().await {
                    debug!("Session sync failed: {e}");
                }
                if changes.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    async fn add<R: Collection>(&self, draft: &R::Draft) -> Result<R, ApiError> {
        self.mutate(self.client.create::<R>(draft), |items: &mut Vec<R>, entity| {
            items.retain(|e| e.id() != entity.id());
            items.insert(0, entity.clone());
        })
        .await
    }

    async fn update<R: Collection>(&self, entity: &R) -> Result<R, ApiError> {
        self.mutate(self.client.update(entity), |items: &mut Vec<R>, updated| {
            if let Some(slot) = items.iter_mut().find(|e| e.id() == updated.id()) {
                *slot = updated.clone();
            }
        })
        .await
    }

    async fn remove<R: Collection>(&self, id: u64) -> Result<(), ApiError> {
        self.mutate(self.client.delete::<R>(id), |items: &mut Vec<R>, _| {
            items.retain(|e| e.id() != id);
        })
        .await
    }

    /// Runs one request against the collection of `R` and applies its result with `apply`.
    async fn mutate<R, T, F>(
        &self,
        call: impl std::future::Future<Output = Result<T, ApiError>>,
        apply: F,
    ) -> Result<T, ApiError>
    where
        R: Collection,
        F: FnOnce(&mut Vec<R>, &T),
    {
        if !self.session.is_authenticated() {
            return Err(ApiError::NoSession);
        }
        let _turn = if self.options.serialize_mutations {
            Some(R::gate(self).lock().await)
        } else {
            None
        };
        if !self.session.is_authenticated() {
            return Err(ApiError::NoSession);
        }
        let generation = self.session.generation();

        let result = call.await;

        match result {
            Ok(value) => {
                let mut state = self.lock().await;
                if self.session.generation() == generation {
                    apply(R::items(&mut state), &value);
                } else {
                    debug!(
                        "Discarding a {} result that arrived after the session changed",
                        R::NAME
                    );
                }
                Ok(value)
            }
            Err(e) => {
                if e.is_session_expired() && self.session.generation() == generation {
                    self.expire_session().await;
                }
                Err(e)
            }
        }
    }

    /// Locks the state. Collections left over from another session generation, or held without
    /// a session, are emptied first.
    async fn lock(&self) -> MutexGuard<'_, State> {
        let mut state = self.state.lock().await;
        let generation = self.session.generation();
        if state.generation != generation || !self.session.is_authenticated() {
            state.clear();
            state.generation = generation;
        }
        state
    }

    fn status_of(&self, state: &State) -> StoreStatus {
        if !self.session.is_authenticated() {
            StoreStatus::Empty
        } else if self.refreshing.load(Ordering::SeqCst) > 0 {
            StoreStatus::Loading
        } else if state.error.is_some() {
            StoreStatus::Errored
        } else if state.loaded {
            StoreStatus::Loaded
        } else {
            StoreStatus::Empty
        }
    }

    async fn clear(&self) {
        self.lock().await.clear();
    }

    async fn expire_session(&self) {
        self.session.expire().await;
        self.clear().await;
    }
}
