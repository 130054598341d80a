//! Suggested category labels. The server accepts any label up to 100 characters, these lists are
//! what the forms offer.

/// Labels offered when recording an expense.
pub const EXPENSE_CATEGORIES: &[&str] = &[
    "Alimentation",
    "Transport",
    "Logement",
    "Divertissement",
    "Services publics",
    "Autres",
];

/// Labels offered when recording a charge.
pub const CHARGE_CATEGORIES: &[&str] = &[
    "Logement",
    "Transport",
    "Services publics",
    "Assurances",
    "Dettes",
    "Abonnements",
    "Autres",
];

/// Maximum length of a category label accepted by the server.
pub const MAX_CATEGORY_LEN: usize = 100;

/// Returns true if `label` is one of the suggested expense categories.
pub fn is_suggested_expense_category(label: &str) -> bool {
    EXPENSE_CATEGORIES.contains(&label)
}

/// Returns true if `label` is one of the suggested charge categories.
pub fn is_suggested_charge_category(label: &str) -> bool {
    CHARGE_CATEGORIES.contains(&label)
}
