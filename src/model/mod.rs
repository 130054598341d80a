//! Types that represent the core data model, such as `Expense` and `Charge`.
mod activity;
mod amount;
pub mod category;
mod charge;
mod expense;
pub mod summary;
mod user;

pub use activity::{Activity, ActivityKind};
pub use amount::{Amount, AmountError, CURRENCY_SCALE};
pub use charge::{Charge, ChargeDraft};
pub use expense::{Expense, ExpenseDraft};
pub use summary::{CategoryTotal, MonthTotal, Summary};
pub use user::{RegisterRequest, User};
