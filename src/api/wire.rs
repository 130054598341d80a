//! Entity mappers between the server's records and the domain types.
//!
//! This is the only place where the server's field names (`due_date`, `is_paid`) and its loose
//! typing (decimals as text, booleans as `0`/`1`) are dealt with. The functions are pure.

use crate::error::ApiError;
use crate::model::{Amount, Charge, ChargeDraft, Expense, ExpenseDraft};
use chrono::NaiveDate;
use serde::de::{self, DeserializeOwned, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt::{self, Debug, Formatter};

/// An entity kept by the data store and exchanged with one REST collection.
pub trait Resource: Clone + Debug + PartialEq + Send + Sync + 'static {
    /// The create payload: the entity without its id.
    type Draft: Debug + Send + Sync;

    /// The collection path, e.g. `/expenses`.
    const PATH: &'static str;

    /// A singular, human-readable name used in log messages.
    const NAME: &'static str;

    fn id(&self) -> u64;

    /// Maps one server record to the domain entity.
    fn from_wire(value: Value) -> Result<Self, ApiError>;

    /// The body of a create request.
    fn draft_to_wire(draft: &Self::Draft) -> Result<Value, ApiError>;

    /// The body of an update request. The id travels in the path, not in the body.
    fn to_wire(&self) -> Result<Value, ApiError>;

    /// The path of a single entity, e.g. `/expenses/3`.
    fn item_path(id: u64) -> String {
        format!("{}/{id}", Self::PATH)
    }
}

/// An expense as the server sends it.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpenseRecord {
    pub id: u64,
    pub description: String,
    pub amount: Amount,
    pub category: String,
    #[serde(deserialize_with = "wire_date")]
    pub date: NaiveDate,
}

/// The body of an expense create or update request.
#[derive(Debug, Clone, Serialize)]
pub struct ExpenseBody<'a> {
    pub description: &'a str,
    pub amount: Amount,
    pub category: &'a str,
    pub date: NaiveDate,
}

/// A charge as the server sends it.
#[derive(Debug, Clone, Deserialize)]
pub struct ChargeRecord {
    pub id: u64,
    pub description: String,
    pub amount: Amount,
    pub category: String,
    #[serde(deserialize_with = "wire_date")]
    pub due_date: NaiveDate,
    #[serde(default, deserialize_with = "wire_bool")]
    pub is_paid: bool,
}

/// The body of a charge create or update request.
#[derive(Debug, Clone, Serialize)]
pub struct ChargeBody<'a> {
    pub description: &'a str,
    pub amount: Amount,
    pub category: &'a str,
    pub due_date: NaiveDate,
    pub is_paid: bool,
}

impl TryFrom<ExpenseRecord> for Expense {
    type Error = ApiError;

    fn try_from(r: ExpenseRecord) -> Result<Self, Self::Error> {
        check_amount(r.amount, "expense", r.id)?;
        Ok(Expense {
            id: r.id,
            description: r.description,
            amount: r.amount,
            category: r.category,
            date: r.date,
        })
    }
}

impl TryFrom<ChargeRecord> for Charge {
    type Error = ApiError;

    fn try_from(r: ChargeRecord) -> Result<Self, Self::Error> {
        check_amount(r.amount, "charge", r.id)?;
        Ok(Charge {
            id: r.id,
            description: r.description,
            amount: r.amount,
            category: r.category,
            due_date: r.due_date,
            is_paid: r.is_paid,
        })
    }
}

impl Resource for Expense {
    type Draft = ExpenseDraft;
    const PATH: &'static str = "/expenses";
    const NAME: &'static str = "expense";

    fn id(&self) -> u64 {
        self.id
    }

    fn from_wire(value: Value) -> Result<Self, ApiError> {
        parse_record::<ExpenseRecord>(value, Self::NAME)?.try_into()
    }

    fn draft_to_wire(draft: &ExpenseDraft) -> Result<Value, ApiError> {
        to_value(ExpenseBody {
            description: &draft.description,
            amount: draft.amount,
            category: &draft.category,
            date: draft.date,
        })
    }

    fn to_wire(&self) -> Result<Value, ApiError> {
        to_value(ExpenseBody {
            description: &self.description,
            amount: self.amount,
            category: &self.category,
            date: self.date,
        })
    }
}

impl Resource for Charge {
    type Draft = ChargeDraft;
    const PATH: &'static str = "/charges";
    const NAME: &'static str = "charge";

    fn id(&self) -> u64 {
        self.id
    }

    fn from_wire(value: Value) -> Result<Self, ApiError> {
        parse_record::<ChargeRecord>(value, Self::NAME)?.try_into()
    }

    fn draft_to_wire(draft: &ChargeDraft) -> Result<Value, ApiError> {
        to_value(ChargeBody {
            description: &draft.description,
            amount: draft.amount,
            category: &draft.category,
            due_date: draft.due_date,
            is_paid: draft.is_paid,
        })
    }

    fn to_wire(&self) -> Result<Value, ApiError> {
        to_value(ChargeBody {
            description: &self.description,
            amount: self.amount,
            category: &self.category,
            due_date: self.due_date,
            is_paid: self.is_paid,
        })
    }
}

fn parse_record<T: DeserializeOwned>(value: Value, name: &str) -> Result<T, ApiError> {
    serde_json::from_value(value)
        .map_err(|e| ApiError::Malformed(format!("unable to read {name} record: {e}")))
}

fn to_value<T: Serialize>(body: T) -> Result<Value, ApiError> {
    serde_json::to_value(body)
        .map_err(|e| ApiError::Malformed(format!("unable to serialize request body: {e}")))
}

fn check_amount(amount: Amount, name: &str, id: u64) -> Result<(), ApiError> {
    if amount.is_negative() {
        return Err(ApiError::Malformed(format!(
            "{name} {id} has a negative amount ({amount})"
        )));
    }
    if !amount.is_in_range() {
        return Err(ApiError::Malformed(format!(
            "{name} {id} has an amount out of range ({})",
            amount.value()
        )));
    }
    Ok(())
}

/// Accepts `YYYY-MM-DD`, or a timestamp that starts with one followed by `T` or a space.
fn wire_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let date_part = match (s.get(..10), s.get(10..11)) {
        (Some(date), Some("T" | " ")) => date,
        _ => s.as_str(),
    };
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|_| de::Error::custom(format!("'{s}' is not a YYYY-MM-DD date")))
}

/// Accepts `true`/`false`, `0`/`1` and the same values as text.
fn wire_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(BoolVisitor)
}

struct BoolVisitor;

impl Visitor<'_> for BoolVisitor {
    type Value = bool;

    fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("a boolean, 0 or 1")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<bool, E> {
        Ok(v)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<bool, E> {
        match v {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(E::custom(format!("{v} is not a boolean"))),
        }
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<bool, E> {
        match v {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(E::custom(format!("{v} is not a boolean"))),
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<bool, E> {
        match v {
            "1" | "true" => Ok(true),
            "0" | "false" | "" => Ok(false),
            _ => Err(E::custom(format!("'{v}' is not a boolean"))),
        }
    }

    fn visit_unit<E: de::Error>(self) -> Result<bool, E> {
        Ok(false)
    }
}
