//! Implements the `Backend` trait with an in-memory copy of the BudgetZen service.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without a server. In that mode the state is written to a JSON file after
//! every request so that it survives from one command to the next.
//!
//! The behavior follows the real service: bearer tokens, per-user scoping with 403 on foreign ids,
//! 422 validation messages, decimals sent back as text. Tests can also inject faults and delays.

use crate::api::{ApiRequest, Backend, RawResponse};
use crate::error::ApiError;
use crate::model::Amount;
use crate::{utils, Result};
use anyhow::Context;
use chrono::{NaiveDate, Utc};
use reqwest::header::AUTHORIZATION;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

/// The seeded account.
pub const DEMO_EMAIL: &str = "demo@budgetzen.test";
pub const DEMO_PASSWORD: &str = "password";
const DEMO_NAME: &str = "Demo BudgetZen";

/// A failure injected in place of the normal handling of a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Fault {
    /// The exchange fails as if the server could not be reached.
    Network(String),
    /// The server answers with this status and raw body text.
    Respond { status: u16, text: String },
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
struct Account {
    id: u64,
    name: String,
    email: String,
    password: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
struct ExpenseRow {
    id: u64,
    user_id: u64,
    description: String,
    amount: Amount,
    category: String,
    date: NaiveDate,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
struct ChargeRow {
    id: u64,
    user_id: u64,
    description: String,
    amount: Amount,
    category: String,
    due_date: NaiveDate,
    is_paid: bool,
    created_at: String,
    updated_at: String,
}

/// Everything the in-memory service knows. It can be saved and loaded as JSON.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct TestState {
    accounts: Vec<Account>,
    tokens: BTreeMap<String, u64>,
    expenses: Vec<ExpenseRow>,
    charges: Vec<ChargeRow>,
    next_account_id: u64,
    next_expense_id: u64,
    next_charge_id: u64,
}

impl Default for TestState {
    /// The demo account with 12 expenses and 8 charges.
    fn default() -> Self {
        let mut state = TestState {
            accounts: Vec::new(),
            tokens: BTreeMap::new(),
            expenses: Vec::new(),
            charges: Vec::new(),
            next_account_id: 1,
            next_expense_id: 1,
            next_charge_id: 1,
        };
        let user_id = state.add_account(DEMO_NAME, DEMO_EMAIL, DEMO_PASSWORD);
        for (description, cents, category, date) in SEED_EXPENSES {
            state.insert_expense(user_id, description, Amount::from_cents(*cents), category, date);
        }
        for (description, cents, category, date, paid) in SEED_CHARGES {
            state.insert_charge(
                user_id,
                description,
                Amount::from_cents(*cents),
                category,
                date,
                *paid,
            );
        }
        state
    }
}

impl TestState {
    /// A service with no accounts and no data.
    pub fn empty() -> Self {
        TestState {
            accounts: Vec::new(),
            tokens: BTreeMap::new(),
            expenses: Vec::new(),
            charges: Vec::new(),
            next_account_id: 1,
            next_expense_id: 1,
            next_charge_id: 1,
        }
    }

    fn add_account(&mut self, name: &str, email: &str, password: &str) -> u64 {
        let id = self.next_account_id;
        self.next_account_id += 1;
        self.accounts.push(Account {
            id,
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        });
        id
    }

    fn insert_expense(
        &mut self,
        user_id: u64,
        description: &str,
        amount: Amount,
        category: &str,
        date: &str,
    ) {
        let now = timestamp();
        let id = self.next_expense_id;
        self.next_expense_id += 1;
        self.expenses.push(ExpenseRow {
            id,
            user_id,
            description: description.to_string(),
            amount,
            category: category.to_string(),
            date: NaiveDate::from_str(date).unwrap_or_default(),
            created_at: now.clone(),
            updated_at: now,
        });
    }

    fn insert_charge(
        &mut self,
        user_id: u64,
        description: &str,
        amount: Amount,
        category: &str,
        due_date: &str,
        is_paid: bool,
    ) {
        let now = timestamp();
        let id = self.next_charge_id;
        self.next_charge_id += 1;
        self.charges.push(ChargeRow {
            id,
            user_id,
            description: description.to_string(),
            amount,
            category: category.to_string(),
            due_date: NaiveDate::from_str(due_date).unwrap_or_default(),
            is_paid,
            created_at: now.clone(),
            updated_at: now,
        });
    }

    fn account(&self, id: u64) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }

    fn issue_token(&mut self, user_id: u64) -> String {
        let token = uuid::Uuid::new_v4().simple().to_string();
        self.tokens.insert(token.clone(), user_id);
        token
    }

    /// The number of expenses and charges owned by the account with `email`.
    pub fn counts_for(&self, email: &str) -> (usize, usize) {
        let Some(account) = self.accounts.iter().find(|a| a.email == email) else {
            return (0, 0);
        };
        (
            self.expenses.iter().filter(|e| e.user_id == account.id).count(),
            self.charges.iter().filter(|c| c.user_id == account.id).count(),
        )
    }
}

#[derive(Debug, Default)]
struct Controls {
    faults: Vec<(Method, String, Fault)>,
    delays: VecDeque<(Method, String, Duration)>,
    log: Vec<(Method, String)>,
}

/// An implementation of the `Backend` trait that does not use the network.
#[derive(Debug)]
pub struct TestBackend {
    state: Mutex<TestState>,
    controls: Mutex<Controls>,
    path: Option<PathBuf>,
}

impl Default for TestBackend {
    /// Seeded with the demo account.
    fn default() -> Self {
        Self::new(TestState::default())
    }
}

impl TestBackend {
    pub fn new(state: TestState) -> Self {
        Self {
            state: Mutex::new(state),
            controls: Mutex::new(Controls::default()),
            path: None,
        }
    }

    /// Loads the state from `path` (seeding it when the file does not exist) and writes it back
    /// after every request that changes it.
    pub async fn persistent(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = if path.is_file() {
            utils::deserialize(&path)
                .await
                .context("Unable to load the test backend state")?
        } else {
            TestState::default()
        };
        let backend = Self {
            state: Mutex::new(state),
            controls: Mutex::new(Controls::default()),
            path: Some(path),
        };
        backend.save().await?;
        Ok(backend)
    }

    /// A copy of the current state.
    pub fn state(&self) -> TestState {
        self.lock_state().clone()
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<(Method, String)> {
        self.lock_controls().log.clone()
    }

    pub fn request_count(&self) -> usize {
        self.lock_controls().log.len()
    }

    /// Makes every `method` request to `path` fail with `fault` until `clear_faults` is called.
    pub fn fail(&self, method: Method, path: &str, fault: Fault) {
        self.lock_controls()
            .faults
            .push((method, path.to_string(), fault));
    }

    pub fn clear_faults(&self) {
        self.lock_controls().faults.clear();
    }

    /// Holds the next `method` request to `path` for `delay` before handling it. Delays queue up:
    /// each one applies to a single request.
    pub fn delay_next(&self, method: Method, path: &str, delay: Duration) {
        self.lock_controls()
            .delays
            .push_back((method, path.to_string(), delay));
    }

    /// Revokes every token, as if all sessions had expired on the server.
    pub fn revoke_all_tokens(&self) {
        self.lock_state().tokens.clear();
    }

    fn lock_state(&self) -> MutexGuard<'_, TestState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_controls(&self) -> MutexGuard<'_, Controls> {
        self.controls.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = {
            let state = self.lock_state();
            serde_json::to_string_pretty(&*state)
        }
        .context("Unable to serialize test state")?;
        utils::write(path, json).await
    }

    /// Records the request and returns its injected fault and delay, if any.
    fn intercept(&self, method: &Method, path: &str) -> (Option<Fault>, Option<Duration>) {
        let mut controls = self.lock_controls();
        controls.log.push((method.clone(), path.to_string()));
        let fault = controls
            .faults
            .iter()
            .find(|(m, p, _)| m == method && p == path)
            .map(|(_, _, f)| f.clone());
        let delay = match controls
            .delays
            .iter()
            .position(|(m, p, _)| m == method && p == path)
        {
            Some(ix) => controls.delays.remove(ix).map(|(_, _, d)| d),
            None => None,
        };
        (fault, delay)
    }
}

#[async_trait::async_trait]
impl Backend for TestBackend {
    async fn exchange(&self, request: ApiRequest) -> std::result::Result<RawResponse, ApiError> {
        let path = request
            .path
            .split('?')
            .next()
            .unwrap_or_default()
            .to_string();
        let (fault, delay) = self.intercept(&request.method, &path);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match fault {
            Some(Fault::Network(message)) => return Err(ApiError::Network(message)),
            Some(Fault::Respond { status, text }) => return Ok(RawResponse { status, text }),
            None => {}
        }

        let token = request
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string);
        let body = match request.body.as_deref() {
            Some(text) => match serde_json::from_str::<Value>(text) {
                Ok(value) => value,
                Err(_) => return Ok(respond(400, json!({"message": "Malformed JSON body."}))),
            },
            None => Value::Null,
        };

        let response = {
            let mut state = self.lock_state();
            route(&mut state, &request.method, &path, token.as_deref(), &body)
        };
        if request.method != Method::GET {
            if let Err(e) = self.save().await {
                warn!("Unable to save test state: {e:#}");
            }
        }
        debug!("test backend {} {path} -> {}", request.method, response.status);
        Ok(response)
    }
}

fn respond(status: u16, body: Value) -> RawResponse {
    RawResponse::new(status, body.to_string())
}

fn not_found() -> RawResponse {
    respond(404, json!({"message": "Not found."}))
}

fn unauthenticated() -> RawResponse {
    respond(401, json!({"message": "Unauthenticated."}))
}

fn invalid(field: &str, message: impl Into<String>) -> RawResponse {
    let message = message.into();
    respond(
        422,
        json!({"message": message, "errors": { field: [message] }}),
    )
}

fn timestamp() -> String {
    Utc::now().to_rfc3339()
}

fn route(
    state: &mut TestState,
    method: &Method,
    path: &str,
    token: Option<&str>,
    body: &Value,
) -> RawResponse {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    match (method.as_str(), segments.as_slice()) {
        ("POST", ["auth", "login"]) => login(state, body),
        ("POST", ["auth", "register"]) => register(state, body),
        ("GET", ["auth", "me"]) => match authenticate(state, token) {
            Some(user_id) => respond(200, json!({ "user": user_json(state, user_id) })),
            None => unauthenticated(),
        },
        ("POST", ["auth", "logout"]) => match token {
            Some(token) if state.tokens.remove(token).is_some() => {
                respond(200, json!({"message": "Logged out."}))
            }
            _ => unauthenticated(),
        },
        (_, ["expenses", rest @ ..]) | (_, ["charges", rest @ ..]) => {
            let Some(user_id) = authenticate(state, token) else {
                return unauthenticated();
            };
            let charges = segments[0] == "charges";
            match (method.as_str(), rest) {
                ("GET", []) if charges => list_charges(state, user_id),
                ("GET", []) => list_expenses(state, user_id),
                ("POST", []) if charges => store_charge(state, user_id, body),
                ("POST", []) => store_expense(state, user_id, body),
                ("PUT" | "PATCH", [id]) => match id.parse::<u64>() {
                    Ok(id) if charges => update_charge(state, user_id, id, body),
                    Ok(id) => update_expense(state, user_id, id, body),
                    Err(_) => not_found(),
                },
                ("DELETE", [id]) => match id.parse::<u64>() {
                    Ok(id) if charges => destroy_charge(state, user_id, id),
                    Ok(id) => destroy_expense(state, user_id, id),
                    Err(_) => not_found(),
                },
                _ => not_found(),
            }
        }
        _ => not_found(),
    }
}

fn authenticate(state: &TestState, token: Option<&str>) -> Option<u64> {
    token.and_then(|t| state.tokens.get(t).copied())
}

fn user_json(state: &TestState, user_id: u64) -> Value {
    match state.account(user_id) {
        Some(a) => json!({"id": a.id, "name": a.name, "email": a.email, "avatar_url": null}),
        None => Value::Null,
    }
}

fn login(state: &mut TestState, body: &Value) -> RawResponse {
    let email = body.get("email").and_then(Value::as_str).unwrap_or_default();
    let password = body
        .get("password")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let account = state
        .accounts
        .iter()
        .find(|a| a.email == email && a.password == password)
        .map(|a| a.id);
    match account {
        Some(user_id) => {
            let token = state.issue_token(user_id);
            respond(
                200,
                json!({"user": user_json(state, user_id), "token": token}),
            )
        }
        None => invalid("email", "The provided credentials are incorrect."),
    }
}

fn register(state: &mut TestState, body: &Value) -> RawResponse {
    let text = |field: &str| body.get(field).and_then(Value::as_str).unwrap_or_default();
    let (name, email, password) = (text("name"), text("email"), text("password"));
    if name.trim().is_empty() {
        return invalid("name", "The name field is required.");
    }
    if !email.contains('@') {
        return invalid("email", "The email field must be a valid email address.");
    }
    if state.accounts.iter().any(|a| a.email == email) {
        return invalid("email", "The email has already been taken.");
    }
    if password.len() < 8 {
        return invalid("password", "The password field must be at least 8 characters.");
    }
    if text("password_confirmation") != password {
        return invalid("password", "The password field confirmation does not match.");
    }
    let user_id = state.add_account(name, email, password);
    let token = state.issue_token(user_id);
    respond(
        201,
        json!({"user": user_json(state, user_id), "token": token}),
    )
}

/// Decimal columns come back as text with two decimals, the way the database driver reports them.
fn amount_text(amount: Amount) -> String {
    let mut value = amount.value();
    value.rescale(2);
    value.to_string()
}

fn expense_json(e: &ExpenseRow) -> Value {
    json!({
        "id": e.id,
        "description": e.description,
        "amount": amount_text(e.amount),
        "category": e.category,
        "date": e.date,
        "created_at": e.created_at,
        "updated_at": e.updated_at,
    })
}

fn charge_json(c: &ChargeRow) -> Value {
    json!({
        "id": c.id,
        "description": c.description,
        "amount": amount_text(c.amount),
        "category": c.category,
        "due_date": c.due_date,
        "is_paid": u8::from(c.is_paid),
        "created_at": c.created_at,
        "updated_at": c.updated_at,
    })
}

fn list_expenses(state: &TestState, user_id: u64) -> RawResponse {
    let mut rows: Vec<&ExpenseRow> = state
        .expenses
        .iter()
        .filter(|e| e.user_id == user_id)
        .collect();
    rows.sort_by(|a, b| b.date.cmp(&a.date));
    let data: Vec<Value> = rows.into_iter().map(expense_json).collect();
    respond(200, json!({ "data": data }))
}

fn list_charges(state: &TestState, user_id: u64) -> RawResponse {
    let mut rows: Vec<&ChargeRow> = state
        .charges
        .iter()
        .filter(|c| c.user_id == user_id)
        .collect();
    rows.sort_by(|a, b| b.due_date.cmp(&a.due_date));
    let data: Vec<Value> = rows.into_iter().map(charge_json).collect();
    respond(200, json!({ "data": data }))
}

/// The validated fields of a create or update body. `None` means the field was absent.
#[derive(Debug, Default)]
struct Fields {
    description: Option<String>,
    amount: Option<Amount>,
    category: Option<String>,
    date: Option<NaiveDate>,
    is_paid: Option<bool>,
}

/// Validates the fields present in `body`. With `required`, every field except `is_paid` must be
/// present, as on creation.
fn validate(
    body: &Value,
    date_field: &str,
    required: bool,
) -> std::result::Result<Fields, RawResponse> {
    let empty = Map::new();
    let map = body.as_object().unwrap_or(&empty);
    let mut fields = Fields::default();

    match map.get("description") {
        Some(Value::String(s)) if !s.trim().is_empty() && s.len() <= 255 => {
            fields.description = Some(s.clone())
        }
        Some(Value::String(s)) if s.len() > 255 => {
            return Err(invalid(
                "description",
                "The description field must not be greater than 255 characters.",
            ))
        }
        None if !required => {}
        _ => return Err(invalid("description", "The description field is required.")),
    }

    fields.amount = match map.get("amount") {
        Some(Value::Number(n)) => n.as_f64().and_then(Amount::from_f64),
        Some(Value::String(s)) => Amount::from_str(s).ok(),
        _ => None,
    };
    if map.contains_key("amount") || required {
        match fields.amount {
            None => return Err(invalid("amount", "The amount field must be a number.")),
            Some(a) if a.is_negative() => {
                return Err(invalid("amount", "The amount field must be at least 0."))
            }
            Some(_) => {}
        }
    }

    match map.get("category") {
        Some(Value::String(s)) if !s.trim().is_empty() && s.len() <= 100 => {
            fields.category = Some(s.clone())
        }
        None if !required => {}
        _ => return Err(invalid("category", "The category field is required.")),
    }

    match map.get(date_field) {
        Some(Value::String(s)) => match NaiveDate::from_str(s) {
            Ok(d) => fields.date = Some(d),
            Err(_) => {
                return Err(invalid(
                    date_field,
                    format!("The {date_field} field must be a valid date."),
                ))
            }
        },
        None if !required => {}
        _ => {
            return Err(invalid(
                date_field,
                format!("The {date_field} field is required."),
            ))
        }
    }

    match map.get("is_paid") {
        Some(Value::Bool(b)) => fields.is_paid = Some(*b),
        Some(Value::Number(n)) if n.as_u64() == Some(0) || n.as_u64() == Some(1) => {
            fields.is_paid = Some(n.as_u64() == Some(1))
        }
        Some(Value::Null) | None => {}
        Some(_) => return Err(invalid("is_paid", "The is_paid field must be true or false.")),
    }

    Ok(fields)
}

fn store_expense(state: &mut TestState, user_id: u64, body: &Value) -> RawResponse {
    let fields = match validate(body, "date", true) {
        Ok(f) => f,
        Err(response) => return response,
    };
    let now = timestamp();
    let row = ExpenseRow {
        id: state.next_expense_id,
        user_id,
        description: fields.description.unwrap_or_default(),
        amount: fields.amount.unwrap_or_default(),
        category: fields.category.unwrap_or_default(),
        date: fields.date.unwrap_or_default(),
        created_at: now.clone(),
        updated_at: now,
    };
    state.next_expense_id += 1;
    let response = respond(201, json!({ "data": expense_json(&row) }));
    state.expenses.push(row);
    response
}

fn store_charge(state: &mut TestState, user_id: u64, body: &Value) -> RawResponse {
    let fields = match validate(body, "due_date", true) {
        Ok(f) => f,
        Err(response) => return response,
    };
    let now = timestamp();
    let row = ChargeRow {
        id: state.next_charge_id,
        user_id,
        description: fields.description.unwrap_or_default(),
        amount: fields.amount.unwrap_or_default(),
        category: fields.category.unwrap_or_default(),
        due_date: fields.date.unwrap_or_default(),
        is_paid: fields.is_paid.unwrap_or(false),
        created_at: now.clone(),
        updated_at: now,
    };
    state.next_charge_id += 1;
    let response = respond(201, json!({ "data": charge_json(&row) }));
    state.charges.push(row);
    response
}

fn update_expense(state: &mut TestState, user_id: u64, id: u64, body: &Value) -> RawResponse {
    let Some(row) = state.expenses.iter_mut().find(|e| e.id == id) else {
        return not_found();
    };
    if row.user_id != user_id {
        return respond(
            403,
            json!({"message": "You are not allowed to access this expense."}),
        );
    }
    let fields = match validate(body, "date", false) {
        Ok(f) => f,
        Err(response) => return response,
    };
    if let Some(v) = fields.description {
        row.description = v;
    }
    if let Some(v) = fields.amount {
        row.amount = v;
    }
    if let Some(v) = fields.category {
        row.category = v;
    }
    if let Some(v) = fields.date {
        row.date = v;
    }
    row.updated_at = timestamp();
    respond(200, json!({ "data": expense_json(row) }))
}

fn update_charge(state: &mut TestState, user_id: u64, id: u64, body: &Value) -> RawResponse {
    let Some(row) = state.charges.iter_mut().find(|c| c.id == id) else {
        return not_found();
    };
    if row.user_id != user_id {
        return respond(
            403,
            json!({"message": "You are not allowed to access this charge."}),
        );
    }
    let fields = match validate(body, "due_date", false) {
        Ok(f) => f,
        Err(response) => return response,
    };
    if let Some(v) = fields.description {
        row.description = v;
    }
    if let Some(v) = fields.amount {
        row.amount = v;
    }
    if let Some(v) = fields.category {
        row.category = v;
    }
    if let Some(v) = fields.date {
        row.due_date = v;
    }
    if let Some(v) = fields.is_paid {
        row.is_paid = v;
    }
    row.updated_at = timestamp();
    respond(200, json!({ "data": charge_json(row) }))
}

fn destroy_expense(state: &mut TestState, user_id: u64, id: u64) -> RawResponse {
    match state.expenses.iter().position(|e| e.id == id) {
        None => not_found(),
        Some(ix) if state.expenses[ix].user_id != user_id => respond(
            403,
            json!({"message": "You are not allowed to access this expense."}),
        ),
        Some(ix) => {
            state.expenses.remove(ix);
            respond(200, json!({"message": "Expense removed."}))
        }
    }
}

fn destroy_charge(state: &mut TestState, user_id: u64, id: u64) -> RawResponse {
    match state.charges.iter().position(|c| c.id == id) {
        None => not_found(),
        Some(ix) if state.charges[ix].user_id != user_id => respond(
            403,
            json!({"message": "You are not allowed to access this charge."}),
        ),
        Some(ix) => {
            state.charges.remove(ix);
            respond(200, json!({"message": "Charge removed."}))
        }
    }
}

/// Seed expenses: description, amount in cents, category, date.
const SEED_EXPENSES: &[(&str, i64, &str, &str)] = &[
    ("Courses Carrefour", 8743, "Alimentation", "2024-07-18"),
    ("Cafe du coin", 675, "Alimentation", "2024-07-17"),
    ("Plein d'essence", 5230, "Transport", "2024-07-15"),
    ("Cinema", 2400, "Divertissement", "2024-07-13"),
    ("Facture d'eau", 4588, "Services publics", "2024-07-10"),
    ("Marche du samedi", 3621, "Alimentation", "2024-07-06"),
    ("Ticket de metro", 1690, "Transport", "2024-07-02"),
    ("Concert", 6500, "Divertissement", "2024-06-28"),
    ("Quincaillerie", 2399, "Logement", "2024-06-22"),
    ("Boulangerie", 840, "Alimentation", "2024-06-19"),
    ("Pharmacie", 1875, "Autres", "2024-06-11"),
    ("Electricite", 14267, "Services publics", "2024-06-04"),
];

/// Seed charges: description, amount in cents, category, due date, paid.
const SEED_CHARGES: &[(&str, i64, &str, &str, bool)] = &[
    ("Loyer", 85000, "Logement", "2024-08-01", false),
    ("Assurance habitation", 2450, "Assurances", "2024-08-05", true),
    ("Forfait mobile", 1999, "Abonnements", "2024-08-08", false),
    ("Pret auto", 21000, "Dettes", "2024-08-10", false),
    ("Internet", 2999, "Abonnements", "2024-08-12", true),
    ("Pass transport", 8410, "Transport", "2024-08-15", true),
    ("Gaz", 6350, "Services publics", "2024-08-20", false),
    ("Assurance auto", 6490, "Assurances", "2024-09-03", false),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Client, TokenCell, Transport};
    use crate::error::ErrorKind;
    use crate::model::{Charge, Expense, ExpenseDraft};
    use std::sync::Arc;

    async fn signed_in(backend: Arc<TestBackend>, email: &str, password: &str) -> Client {
        let client = Client::new(Transport::new(backend, TokenCell::new()));
        let grant = client.login(email, password).await.unwrap();
        client.transport().token().set(Some(grant.token));
        client
    }

    #[test]
    fn test_seed_counts() {
        let state = TestState::default();
        assert_eq!(state.counts_for(DEMO_EMAIL), (12, 8));
        assert_eq!(state.counts_for("nobody@example.com"), (0, 0));
    }

    #[tokio::test]
    async fn test_listing_requires_token() {
        let backend = Arc::new(TestBackend::default());
        let client = Client::new(Transport::new(backend, TokenCell::new()));
        let err = client.list::<Expense>().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SessionExpired);
    }

    #[tokio::test]
    async fn test_seeded_listing() {
        let backend = Arc::new(TestBackend::default());
        let client = signed_in(backend, DEMO_EMAIL, DEMO_PASSWORD).await;
        assert_eq!(client.list::<Expense>().await.unwrap().len(), 12);
        assert_eq!(client.list::<Charge>().await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let backend = Arc::new(TestBackend::default());
        let client = Client::new(Transport::new(backend, TokenCell::new()));
        let err = client.login(DEMO_EMAIL, "nope").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "The provided credentials are incorrect.");
    }

    #[tokio::test]
    async fn test_foreign_ids_are_forbidden() {
        let backend = Arc::new(TestBackend::default());
        let other = Client::new(Transport::new(backend.clone(), TokenCell::new()));
        let grant = other
            .register(&crate::model::RegisterRequest::new(
                "Other",
                "other@example.com",
                "secret123",
            ))
            .await
            .unwrap();
        other.transport().token().set(Some(grant.token));
        assert!(other.list::<Expense>().await.unwrap().is_empty());

        let err = other.delete::<Expense>(1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(err.to_string(), "You are not allowed to access this expense.");
        assert_eq!(backend.state().counts_for(DEMO_EMAIL), (12, 8));
    }

    #[tokio::test]
    async fn test_create_validation() {
        let backend = Arc::new(TestBackend::default());
        let client = signed_in(backend, DEMO_EMAIL, DEMO_PASSWORD).await;
        let draft = ExpenseDraft::new(
            "  ",
            Amount::from_cents(100),
            "Autres",
            NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
        );
        let err = client.create::<Expense>(&draft).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "The description field is required.");
    }

    #[tokio::test]
    async fn test_faults_and_log() {
        let backend = Arc::new(TestBackend::default());
        let client = signed_in(backend.clone(), DEMO_EMAIL, DEMO_PASSWORD).await;
        backend.fail(
            Method::GET,
            "/charges",
            Fault::Respond {
                status: 500,
                text: "<html>boom</html>".into(),
            },
        );
        let err = client.list::<Charge>().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Server);
        backend.clear_faults();
        assert_eq!(client.list::<Charge>().await.unwrap().len(), 8);
        let paths: Vec<String> = backend.requests().into_iter().map(|(_, p)| p).collect();
        assert_eq!(paths, vec!["/auth/login", "/charges", "/charges"]);
    }

    #[tokio::test]
    async fn test_persistent_state_survives_reload() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("test_state.json");
        {
            let backend = Arc::new(TestBackend::persistent(&path).await.unwrap());
            let client = signed_in(backend, DEMO_EMAIL, DEMO_PASSWORD).await;
            client.delete::<Charge>(1).await.unwrap();
        }
        let backend = TestBackend::persistent(&path).await.unwrap();
        assert_eq!(backend.state().counts_for(DEMO_EMAIL), (12, 7));
    }
}
