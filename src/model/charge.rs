use crate::model::Amount;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A recurring or scheduled bill.
///
/// The domain form uses `dueDate` and `isPaid`. The server calls these `due_date` and `is_paid`;
/// the renaming happens in `api::wire` and nowhere else.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Charge {
    /// Assigned by the server, unique among charges (it may equal an expense id).
    pub id: u64,
    pub description: String,
    pub amount: Amount,
    pub category: String,
    pub due_date: NaiveDate,
    pub is_paid: bool,
}

/// The fields of a charge that does not exist on the server yet.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeDraft {
    pub description: String,
    pub amount: Amount,
    pub category: String,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub is_paid: bool,
}

impl ChargeDraft {
    /// Creates an unpaid charge draft.
    pub fn new(
        description: impl Into<String>,
        amount: Amount,
        category: impl Into<String>,
        due_date: NaiveDate,
    ) -> Self {
        Self {
            description: description.into(),
            amount,
            category: category.into(),
            due_date,
            is_paid: false,
        }
    }

    pub fn paid(mut self, is_paid: bool) -> Self {
        self.is_paid = is_paid;
        self
    }
}

impl Charge {
    /// Combines a draft with the id the server assigned to it.
    pub fn from_draft(id: u64, draft: ChargeDraft) -> Self {
        Self {
            id,
            description: draft.description,
            amount: draft.amount,
            category: draft.category,
            due_date: draft.due_date,
            is_paid: draft.is_paid,
        }
    }

    /// Returns true when the charge is unpaid and its due date is before `date`.
    pub fn is_overdue(&self, date: NaiveDate) -> bool {
        !self.is_paid && self.due_date < date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_defaults_to_unpaid() {
        let date = NaiveDate::from_ymd_opt(2024, 8, 1).unwrap();
        let draft = ChargeDraft::new("Rent", Amount::from_cents(90000), "Logement", date);
        assert!(!draft.is_paid);
        let draft: ChargeDraft = serde_json::from_str(
            r#"{"description":"Rent","amount":900,"category":"Logement","dueDate":"2024-08-01"}"#,
        )
        .unwrap();
        assert!(!draft.is_paid);
    }

    #[test]
    fn test_domain_json_is_camel_case() {
        let date = NaiveDate::from_ymd_opt(2024, 8, 1).unwrap();
        let charge = Charge::from_draft(
            3,
            ChargeDraft::new("Rent", Amount::from_cents(90000), "Logement", date).paid(true),
        );
        let json = serde_json::to_value(&charge).unwrap();
        assert_eq!(json["dueDate"], "2024-08-01");
        assert_eq!(json["isPaid"], true);
    }

    #[test]
    fn test_overdue() {
        let due = NaiveDate::from_ymd_opt(2024, 8, 1).unwrap();
        let after = NaiveDate::from_ymd_opt(2024, 8, 2).unwrap();
        let charge = Charge::from_draft(
            1,
            ChargeDraft::new("Rent", Amount::from_cents(100), "Logement", due),
        );
        assert!(charge.is_overdue(after));
        assert!(!charge.is_overdue(due));
    }
}
