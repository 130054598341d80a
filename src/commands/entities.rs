//! Handlers for the commands that read and change expenses and charges.

use crate::api::Mode;
use crate::args::{
    AddChargeArgs, AddExpenseArgs, DeleteArgs, Entity, ListArgs, PayArgs, UpdateChargeArgs,
    UpdateExpenseArgs,
};
use crate::commands::{Core, Out};
use crate::model::category::{
    is_suggested_charge_category, is_suggested_expense_category, CHARGE_CATEGORIES,
    EXPENSE_CATEGORIES, MAX_CATEGORY_LEN,
};
use crate::model::{Charge, ChargeDraft, Expense, ExpenseDraft};
use crate::{Config, Result};
use anyhow::{bail, Context};
use serde::Serialize;
use tracing::info;

/// The entries printed by `budgetzen list`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Listing {
    Expenses(Vec<Expense>),
    Charges(Vec<Charge>),
}

/// Handles the `budgetzen list` command.
pub async fn list(config: &Config, mode: Mode, args: &ListArgs) -> Result<Out<Listing>> {
    let core = Core::signed_in(config, mode).await?;
    core.store()
        .refresh_all()
        .await
        .context("Unable to load your data")?;
    let matches = |category: &str| args.category().map_or(true, |c| c == category);

    match args.entity() {
        Entity::Expenses => {
            let expenses: Vec<Expense> = core
                .store()
                .expenses()
                .await
                .into_iter()
                .filter(|e| matches(&e.category))
                .collect();
            let mut message = count(expenses.len(), "expense");
            for e in &expenses {
                message.push_str(&format!("\n{}", expense_line(e)));
            }
            Ok(Out::new(message, Listing::Expenses(expenses)))
        }
        Entity::Charges => {
            let charges: Vec<Charge> = core
                .store()
                .charges()
                .await
                .into_iter()
                .filter(|c| matches(&c.category))
                .collect();
            let mut message = count(charges.len(), "charge");
            for c in &charges {
                message.push_str(&format!("\n{}", charge_line(c)));
            }
            Ok(Out::new(message, Listing::Charges(charges)))
        }
    }
}

/// Handles the `budgetzen add expense` command.
pub async fn add_expense(config: &Config, mode: Mode, args: &AddExpenseArgs) -> Result<Out<Expense>> {
    check_category(&args.category, is_suggested_expense_category, EXPENSE_CATEGORIES)?;
    let core = Core::signed_in(config, mode).await?;
    let draft = ExpenseDraft::new(&args.description, args.amount, &args.category, args.date);
    let expense = core
        .store()
        .add_expense(&draft)
        .await
        .context("Unable to add the expense")?;
    Ok(Out::new(
        format!("Added expense {}: {}", expense.id, expense_line(&expense)),
        expense,
    ))
}

/// Handles the `budgetzen add charge` command.
pub async fn add_charge(config: &Config, mode: Mode, args: &AddChargeArgs) -> Result<Out<Charge>> {
    check_category(&args.category, is_suggested_charge_category, CHARGE_CATEGORIES)?;
    let core = Core::signed_in(config, mode).await?;
    let draft = ChargeDraft::new(&args.description, args.amount, &args.category, args.due_date)
        .paid(args.paid);
    let charge = core
        .store()
        .add_charge(&draft)
        .await
        .context("Unable to add the charge")?;
    Ok(Out::new(
        format!("Added charge {}: {}", charge.id, charge_line(&charge)),
        charge,
    ))
}

/// Handles the `budgetzen update expense` command. The current expense is loaded, the given
/// fields are changed and the whole expense is sent back.
pub async fn update_expense(
    config: &Config,
    mode: Mode,
    args: &UpdateExpenseArgs,
) -> Result<Out<Expense>> {
    if let Some(category) = &args.category {
        check_category(category, is_suggested_expense_category, EXPENSE_CATEGORIES)?;
    }
    let core = Core::signed_in(config, mode).await?;
    core.store()
        .refresh_all()
        .await
        .context("Unable to load your data")?;
    let Some(mut expense) = core
        .store()
        .expenses()
        .await
        .into_iter()
        .find(|e| e.id == args.id)
    else {
        bail!("There is no expense with id {}", args.id)
    };

    if let Some(description) = &args.description {
        expense.description = description.clone();
    }
    if let Some(amount) = args.amount {
        expense.amount = amount;
    }
    if let Some(category) = &args.category {
        expense.category = category.clone();
    }
    if let Some(date) = args.date {
        expense.date = date;
    }

    let expense = core
        .store()
        .update_expense(&expense)
        .await
        .context("Unable to update the expense")?;
    Ok(Out::new(
        format!("Updated expense {}: {}", expense.id, expense_line(&expense)),
        expense,
    ))
}

/// Handles the `budgetzen update charge` command.
pub async fn update_charge(
    config: &Config,
    mode: Mode,
    args: &UpdateChargeArgs,
) -> Result<Out<Charge>> {
    if let Some(category) = &args.category {
        check_category(category, is_suggested_charge_category, CHARGE_CATEGORIES)?;
    }
    let core = Core::signed_in(config, mode).await?;
    core.store()
        .refresh_all()
        .await
        .context("Unable to load your data")?;
    let Some(mut charge) = find_charge(&core, args.id).await else {
        bail!("There is no charge with id {}", args.id)
    };

    if let Some(description) = &args.description {
        charge.description = description.clone();
    }
    if let Some(amount) = args.amount {
        charge.amount = amount;
    }
    if let Some(category) = &args.category {
        charge.category = category.clone();
    }
    if let Some(due_date) = args.due_date {
        charge.due_date = due_date;
    }

    let charge = core
        .store()
        .update_charge(&charge)
        .await
        .context("Unable to update the charge")?;
    Ok(Out::new(
        format!("Updated charge {}: {}", charge.id, charge_line(&charge)),
        charge,
    ))
}

/// Handles the `budgetzen delete` command.
pub async fn delete(config: &Config, mode: Mode, args: &DeleteArgs) -> Result<Out<()>> {
    let core = Core::signed_in(config, mode).await?;
    let id = args.id();
    match args.entity() {
        Entity::Expenses => core
            .store()
            .remove_expense(id)
            .await
            .with_context(|| format!("Unable to delete expense {id}"))?,
        Entity::Charges => core
            .store()
            .remove_charge(id)
            .await
            .with_context(|| format!("Unable to delete charge {id}"))?,
    }
    Ok(format!("Deleted {} {id}", singular(args.entity())).into())
}

/// Handles the `budgetzen pay` command.
pub async fn pay(config: &Config, mode: Mode, args: &PayArgs) -> Result<Out<Charge>> {
    let core = Core::signed_in(config, mode).await?;
    core.store()
        .refresh_all()
        .await
        .context("Unable to load your data")?;
    let Some(charge) = find_charge(&core, args.id()).await else {
        bail!("There is no charge with id {}", args.id())
    };
    let state = if args.paid() { "paid" } else { "unpaid" };
    if charge.is_paid == args.paid() {
        return Ok(Out::new(
            format!("Charge {} is already {state}", charge.id),
            charge,
        ));
    }
    let charge = core
        .store()
        .set_charge_paid(&charge, args.paid())
        .await
        .context("Unable to update the charge")?;
    Ok(Out::new(
        format!("Marked charge {} as {state}: {}", charge.id, charge_line(&charge)),
        charge,
    ))
}

async fn find_charge(core: &Core, id: u64) -> Option<Charge> {
    core.store()
        .charges()
        .await
        .into_iter()
        .find(|c| c.id == id)
}

/// Rejects labels the server would reject and mentions labels outside the suggested set.
fn check_category(label: &str, suggested: fn(&str) -> bool, all: &[&str]) -> Result<()> {
    if label.trim().is_empty() {
        bail!("The category must not be empty")
    }
    if label.chars().count() > MAX_CATEGORY_LEN {
        bail!("The category must not be longer than {MAX_CATEGORY_LEN} characters")
    }
    if !suggested(label) {
        info!(
            "'{label}' is not one of the suggested categories ({})",
            all.join(", ")
        );
    }
    Ok(())
}

fn singular(entity: Entity) -> &'static str {
    match entity {
        Entity::Expenses => "expense",
        Entity::Charges => "charge",
    }
}

fn count(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

pub(super) fn expense_line(e: &Expense) -> String {
    format!(
        "{:>5}  {}  {:>12}  {:<18}  {}",
        e.id,
        e.date,
        e.amount.to_string(),
        e.category,
        e.description
    )
}

pub(super) fn charge_line(c: &Charge) -> String {
    let paid = if c.is_paid { "[x]" } else { "[ ]" };
    format!(
        "{:>5}  {}  {:>12}  {:<18}  {paid} {}",
        c.id,
        c.due_date,
        c.amount.to_string(),
        c.category,
        c.description
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::login;
    use crate::api::{DEMO_EMAIL, DEMO_PASSWORD};
    use crate::model::Amount;
    use crate::test::TestHome;
    use chrono::NaiveDate;

    async fn signed_in_home() -> TestHome {
        let home = TestHome::new().await;
        login(home.config(), Mode::Test, DEMO_EMAIL, DEMO_PASSWORD)
            .await
            .unwrap();
        home
    }

    #[tokio::test]
    async fn test_list_requires_session() {
        let home = TestHome::new().await;
        let err = list(home.config(), Mode::Test, &ListArgs::new(Entity::Expenses, None))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not signed in"));
    }

    #[tokio::test]
    async fn test_list_and_filter() {
        let home = signed_in_home().await;
        let out = list(home.config(), Mode::Test, &ListArgs::new(Entity::Charges, None))
            .await
            .unwrap();
        assert!(out.message().starts_with("8 charges"));

        let args = ListArgs::new(Entity::Expenses, Some("Alimentation".into()));
        let out = list(home.config(), Mode::Test, &args).await.unwrap();
        let Some(Listing::Expenses(expenses)) = out.structure() else {
            panic!("expected expenses");
        };
        assert_eq!(expenses.len(), 4);
        assert!(expenses.iter().all(|e| e.category == "Alimentation"));
    }

    #[tokio::test]
    async fn test_add_update_delete_expense() {
        let home = signed_in_home().await;
        let args = AddExpenseArgs {
            description: "Taxi".into(),
            amount: Amount::from_cents(4250),
            category: "Transport".into(),
            date: NaiveDate::from_ymd_opt(2024, 7, 20).unwrap(),
        };
        let added = add_expense(home.config(), Mode::Test, &args).await.unwrap();
        let id = added.structure().unwrap().id;

        let update = UpdateExpenseArgs {
            id,
            amount: Some(Amount::from_cents(3900)),
            ..UpdateExpenseArgs::default()
        };
        let out = update_expense(home.config(), Mode::Test, &update)
            .await
            .unwrap();
        let updated = out.structure().unwrap();
        assert_eq!(updated.amount, Amount::from_cents(3900));
        assert_eq!(updated.description, "Taxi");

        delete(home.config(), Mode::Test, &DeleteArgs::new(Entity::Expenses, id))
            .await
            .unwrap();
        let err = delete(home.config(), Mode::Test, &DeleteArgs::new(Entity::Expenses, id))
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("Not found."));
    }

    #[tokio::test]
    async fn test_update_unknown_charge() {
        let home = signed_in_home().await;
        let args = UpdateChargeArgs {
            id: 999,
            ..UpdateChargeArgs::default()
        };
        let err = update_charge(home.config(), Mode::Test, &args)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "There is no charge with id 999");
    }

    #[tokio::test]
    async fn test_add_charge_and_pay() {
        let home = signed_in_home().await;
        let args = AddChargeArgs {
            description: "Salle de sport".into(),
            amount: Amount::from_cents(3500),
            category: "Abonnements".into(),
            due_date: NaiveDate::from_ymd_opt(2024, 8, 28).unwrap(),
            paid: false,
        };
        let out = add_charge(home.config(), Mode::Test, &args).await.unwrap();
        let id = out.structure().unwrap().id;

        let out = pay(home.config(), Mode::Test, &PayArgs::new(id, false))
            .await
            .unwrap();
        assert!(out.structure().unwrap().is_paid);
        let out = pay(home.config(), Mode::Test, &PayArgs::new(id, false))
            .await
            .unwrap();
        assert_eq!(out.message(), format!("Charge {id} is already paid"));
        let out = pay(home.config(), Mode::Test, &PayArgs::new(id, true))
            .await
            .unwrap();
        assert!(!out.structure().unwrap().is_paid);
    }

    #[test]
    fn test_check_category() {
        assert!(check_category("Transport", is_suggested_expense_category, EXPENSE_CATEGORIES).is_ok());
        assert!(check_category("Vacances", is_suggested_expense_category, EXPENSE_CATEGORIES).is_ok());
        assert!(check_category(" ", is_suggested_charge_category, CHARGE_CATEGORIES).is_err());
        let long = "x".repeat(MAX_CATEGORY_LEN + 1);
        assert!(check_category(&long, is_suggested_charge_category, CHARGE_CATEGORIES).is_err());
    }
}
