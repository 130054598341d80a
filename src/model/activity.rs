use crate::model::{Amount, Charge, Expense};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which collection an `Activity` came from.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Expense,
    Charge,
}

serde_plain::derive_display_from_serialize!(ActivityKind);
serde_plain::derive_fromstr_from_deserialize!(ActivityKind);

/// An entry of the combined expense and charge feed.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Activity {
    Expense(Expense),
    Charge(Charge),
}

impl Activity {
    pub fn kind(&self) -> ActivityKind {
        match self {
            Activity::Expense(_) => ActivityKind::Expense,
            Activity::Charge(_) => ActivityKind::Charge,
        }
    }

    /// The date the entry is filed under: the expense date or the charge due date.
    pub fn effective_date(&self) -> NaiveDate {
        match self {
            Activity::Expense(e) => e.date,
            Activity::Charge(c) => c.due_date,
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            Activity::Expense(e) => e.id,
            Activity::Charge(c) => c.id,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Activity::Expense(e) => &e.description,
            Activity::Charge(c) => &c.description,
        }
    }

    pub fn amount(&self) -> Amount {
        match self {
            Activity::Expense(e) => e.amount,
            Activity::Charge(c) => c.amount,
        }
    }

    pub fn category(&self) -> &str {
        match self {
            Activity::Expense(e) => &e.category,
            Activity::Charge(c) => &c.category,
        }
    }
}

impl From<Expense> for Activity {
    fn from(value: Expense) -> Self {
        Activity::Expense(value)
    }
}

impl From<Charge> for Activity {
    fn from(value: Charge) -> Self {
        Activity::Charge(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChargeDraft, ExpenseDraft};

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_effective_date_and_kind() {
        let e: Activity = Expense::from_draft(
            7,
            ExpenseDraft::new("Taxi", Amount::from_cents(4250), "Transport", date("2024-07-20")),
        )
        .into();
        let c: Activity = Charge::from_draft(
            7,
            ChargeDraft::new("Rent", Amount::from_cents(90000), "Logement", date("2024-08-01")),
        )
        .into();
        assert_eq!(e.kind(), ActivityKind::Expense);
        assert_eq!(c.kind(), ActivityKind::Charge);
        assert_eq!(e.effective_date(), date("2024-07-20"));
        assert_eq!(c.effective_date(), date("2024-08-01"));
        // same numeric id, different entity types
        assert_eq!(e.id(), c.id());
        assert_ne!(e, c);
    }

    #[test]
    fn test_serialized_with_kind_tag() {
        let c: Activity = Charge::from_draft(
            1,
            ChargeDraft::new("Rent", Amount::from_cents(100), "Logement", date("2024-08-01")),
        )
        .into();
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["kind"], "charge");
        assert_eq!(json["dueDate"], "2024-08-01");
    }
}
