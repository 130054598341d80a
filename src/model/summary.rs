//! Aggregates derived from the loaded collections: totals, category breakdowns, trends and the
//! recent activity feed. Everything here is computed on read from the store's collections and
//! never stored.

use crate::model::{Activity, Amount, Charge, Expense};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How many entries the recent activity feed holds by default.
pub const RECENT_ACTIVITY_LEN: usize = 5;

/// The total for one category label.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: Amount,
    pub count: usize,
}

/// The expense total for one calendar month, keyed `YYYY-MM`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct MonthTotal {
    pub month: String,
    pub total: Amount,
}

/// A snapshot of the dashboard numbers.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub expense_count: usize,
    pub charge_count: usize,
    pub total_expenses: Amount,
    pub total_charges: Amount,
    pub paid_charges: Amount,
    pub unpaid_charges: Amount,
    pub expenses_by_category: Vec<CategoryTotal>,
    pub charges_by_category: Vec<CategoryTotal>,
    pub monthly_expenses: Vec<MonthTotal>,
    pub recent_activity: Vec<Activity>,
}

impl Summary {
    pub fn new(expenses: &[Expense], charges: &[Charge]) -> Self {
        let paid_charges = charges
            .iter()
            .filter(|c| c.is_paid)
            .map(|c| c.amount)
            .sum();
        let unpaid_charges = charges
            .iter()
            .filter(|c| !c.is_paid)
            .map(|c| c.amount)
            .sum();
        Self {
            expense_count: expenses.len(),
            charge_count: charges.len(),
            total_expenses: expenses.iter().map(|e| e.amount).sum(),
            total_charges: charges.iter().map(|c| c.amount).sum(),
            paid_charges,
            unpaid_charges,
            expenses_by_category: by_category(expenses.iter().map(|e| (&e.category, e.amount))),
            charges_by_category: by_category(charges.iter().map(|c| (&c.category, c.amount))),
            monthly_expenses: monthly_totals(expenses),
            recent_activity: recent_activity(expenses, charges, RECENT_ACTIVITY_LEN),
        }
    }

    /// Income minus expenses. Income is not tracked by the server, the caller supplies it.
    pub fn balance(&self, income: Amount) -> Amount {
        income - self.total_expenses
    }
}

/// Groups amounts by category label. Categories appear in the order they are first seen.
pub fn by_category<'a>(items: impl IntoIterator<Item = (&'a String, Amount)>) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = Vec::new();
    for (category, amount) in items {
        match totals.iter_mut().find(|t| &t.category == category) {
            Some(existing) => {
                existing.total += amount;
                existing.count += 1;
            }
            None => totals.push(CategoryTotal {
                category: category.clone(),
                total: amount,
                count: 1,
            }),
        }
    }
    totals
}

/// Sums expenses per calendar month, oldest month first.
pub fn monthly_totals(expenses: &[Expense]) -> Vec<MonthTotal> {
    let mut months: BTreeMap<(i32, u32), Amount> = BTreeMap::new();
    for e in expenses {
        *months.entry((e.date.year(), e.date.month())).or_default() += e.amount;
    }
    months
        .into_iter()
        .map(|((year, month), total)| MonthTotal {
            month: format!("{year:04}-{month:02}"),
            total,
        })
        .collect()
}

/// Merges both collections into one feed, newest effective date first, and keeps `limit` entries.
/// Ties keep expenses ahead of charges, each in collection order.
pub fn recent_activity(expenses: &[Expense], charges: &[Charge], limit: usize) -> Vec<Activity> {
    let mut feed: Vec<Activity> = expenses
        .iter()
        .cloned()
        .map(Activity::from)
        .chain(charges.iter().cloned().map(Activity::from))
        .collect();
    feed.sort_by(|a, b| b.effective_date().cmp(&a.effective_date()));
    feed.truncate(limit);
    feed
}

/// Unpaid charges due between `today` and `today + days` (inclusive), soonest first. A window
/// that reaches past the last representable date is open-ended.
pub fn upcoming_charges(charges: &[Charge], today: NaiveDate, days: i64) -> Vec<Charge> {
    let until = Duration::try_days(days)
        .and_then(|window| today.checked_add_signed(window))
        .unwrap_or(NaiveDate::MAX);
    let mut upcoming: Vec<Charge> = charges
        .iter()
        .filter(|c| !c.is_paid && c.due_date >= today && c.due_date <= until)
        .cloned()
        .collect();
    upcoming.sort_by_key(|c| c.due_date);
    upcoming
}

/// Unpaid charges whose due date has passed, oldest first.
pub fn overdue_charges(charges: &[Charge], today: NaiveDate) -> Vec<Charge> {
    let mut overdue: Vec<Charge> = charges
        .iter()
        .filter(|c| c.is_overdue(today))
        .cloned()
        .collect();
    overdue.sort_by_key(|c| c.due_date);
    overdue
}
