use crate::api::Mode;
use crate::args::SummaryArgs;
use crate::commands::entities::{charge_line, expense_line};
use crate::commands::{Core, Out};
use crate::model::summary::{overdue_charges, upcoming_charges};
use crate::model::{Activity, Amount, Charge, CategoryTotal, Summary};
use crate::{Config, Result};
use anyhow::Context;
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::fmt::Write;

/// The structured output of `budgetzen summary`.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub today: NaiveDate,
    pub summary: Summary,
    /// Income minus expenses, when an income was given.
    pub balance: Option<Amount>,
    pub upcoming: Vec<Charge>,
    pub overdue: Vec<Charge>,
}

impl SummaryReport {
    pub fn new(summary: Summary, charges: &[Charge], today: NaiveDate, args: &SummaryArgs) -> Self {
        Self {
            today,
            balance: args.income().map(|income| summary.balance(income)),
            upcoming: upcoming_charges(charges, today, args.days()),
            overdue: overdue_charges(charges, today),
            summary,
        }
    }

    /// The report as printed on the terminal.
    pub fn render(&self, days: i64) -> String {
        let s = &self.summary;
        let mut out = String::new();
        let _ = writeln!(out, "Expenses: {} ({})", s.total_expenses, s.expense_count);
        let _ = writeln!(
            out,
            "Charges:  {} ({}), {} paid, {} unpaid",
            s.total_charges, s.charge_count, s.paid_charges, s.unpaid_charges
        );
        if let Some(balance) = self.balance {
            let _ = writeln!(out, "Balance:  {balance}");
        }
        render_categories(&mut out, "Expenses by category", &s.expenses_by_category);
        render_categories(&mut out, "Charges by category", &s.charges_by_category);
        if !s.monthly_expenses.is_empty() {
            let _ = writeln!(out, "Monthly expenses:");
            for m in &s.monthly_expenses {
                let _ = writeln!(out, "  {}  {:>12}", m.month, m.total.to_string());
            }
        }
        if !s.recent_activity.is_empty() {
            let _ = writeln!(out, "Recent activity:");
            for a in &s.recent_activity {
                let line = match a {
                    Activity::Expense(e) => expense_line(e),
                    Activity::Charge(c) => charge_line(c),
                };
                let _ = writeln!(out, "  {:<7} {line}", a.kind().to_string());
            }
        }
        let _ = writeln!(
            out,
            "Due in the next {days} days: {}",
            self.upcoming.len()
        );
        for c in &self.upcoming {
            let _ = writeln!(out, "  {}", charge_line(c));
        }
        if !self.overdue.is_empty() {
            let _ = writeln!(out, "Overdue: {}", self.overdue.len());
            for c in &self.overdue {
                let _ = writeln!(out, "  {}", charge_line(c));
            }
        }
        out.trim_end().to_string()
    }
}

fn render_categories(out: &mut String, title: &str, totals: &[CategoryTotal]) {
    if totals.is_empty() {
        return;
    }
    let _ = writeln!(out, "{title}:");
    for t in totals {
        let _ = writeln!(
            out,
            "  {:<18} {:>12}  ({})",
            t.category,
            t.total.to_string(),
            t.count
        );
    }
}

/// Handles the `budgetzen summary` command.
pub async fn summary(config: &Config, mode: Mode, args: &SummaryArgs) -> Result<Out<SummaryReport>> {
    summary_on(config, mode, args, Local::now().date_naive()).await
}

async fn summary_on(
    config: &Config,
    mode: Mode,
    args: &SummaryArgs,
    today: NaiveDate,
) -> Result<Out<SummaryReport>> {
    anyhow::ensure!(args.days() >= 0, "--days must not be negative");
    let core = Core::signed_in(config, mode).await?;
    core.store()
        .refresh_all()
        .await
        .context("Unable to load your data")?;
    let summary = core.store().summary().await;
    let charges = core.store().charges().await;
    let report = SummaryReport::new(summary, &charges, today, args);
    Ok(Out::new(report.render(args.days()), report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{DEMO_EMAIL, DEMO_PASSWORD};
    use crate::commands::login;
    use crate::test::TestHome;

    #[tokio::test]
    async fn test_summary_of_seed_data() {
        let home = TestHome::new().await;
        login(home.config(), Mode::Test, DEMO_EMAIL, DEMO_PASSWORD)
            .await
            .unwrap();
        let args = SummaryArgs::new(Some(Amount::from_cents(300000)), 10);
        let today = NaiveDate::from_ymd_opt(2024, 8, 6).unwrap();
        let out = summary_on(home.config(), Mode::Test, &args, today)
            .await
            .unwrap();
        let report = out.structure().unwrap();

        assert_eq!(report.summary.expense_count, 12);
        assert_eq!(report.summary.charge_count, 8);
        assert_eq!(
            report.balance,
            Some(Amount::from_cents(300000) - report.summary.total_expenses)
        );
        // Forfait mobile (08-08), Pret auto (08-10); Internet (08-12) is already paid
        let upcoming: Vec<&str> = report.upcoming.iter().map(|c| c.description.as_str()).collect();
        assert_eq!(upcoming, vec!["Forfait mobile", "Pret auto"]);
        // Loyer (08-01) is unpaid and past due
        assert_eq!(report.overdue.len(), 1);
        assert_eq!(report.overdue[0].description, "Loyer");
        assert!(out.message().contains("Balance:"));
        assert!(out.message().contains("Due in the next 10 days: 2"));
    }

    #[tokio::test]
    async fn test_summary_rejects_negative_days() {
        let home = TestHome::new().await;
        let args = SummaryArgs::new(None, -1);
        assert!(summary(home.config(), Mode::Test, &args).await.is_err());
    }

    #[tokio::test]
    async fn test_summary_with_a_huge_window() {
        let home = TestHome::new().await;
        login(home.config(), Mode::Test, DEMO_EMAIL, DEMO_PASSWORD)
            .await
            .unwrap();
        let args = SummaryArgs::new(None, 1_000_000_000_000);
        let today = NaiveDate::from_ymd_opt(2024, 8, 6).unwrap();
        let out = summary_on(home.config(), Mode::Test, &args, today)
            .await
            .unwrap();
        let report = out.structure().unwrap();
        // every unpaid charge from today on: Forfait mobile, Pret auto, Gaz, Assurance auto
        assert_eq!(report.upcoming.len(), 4);
        assert_eq!(report.overdue.len(), 1);
    }
}
