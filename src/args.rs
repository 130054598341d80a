//! These structs provide the CLI interface for the budgetzen CLI.

use crate::config::DEFAULT_API_URL;
use crate::model::Amount;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing::level_filters::LevelFilter;

/// budgetzen: keep track of your bills and expenses from the command line.
///
/// The program talks to a BudgetZen server. Start with `budgetzen init --api-url <URL>`, then sign
/// in with `budgetzen login`. Your expenses and charges (recurring bills) can then be listed,
/// added, changed and summarized.
///
/// Set BUDGETZEN_IN_TEST_MODE to any value to run against a built-in demo server instead. Its demo
/// account is demo@budgetzen.test with the password "password".
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and the configuration file.
    ///
    /// This is the first command you should run. The data directory is --budgetzen-home, by
    /// default $HOME/budgetzen. It holds config.json and, once you sign in, your session.
    Init(InitArgs),
    /// Sign in with your email and password.
    Login(LoginArgs),
    /// Create an account and sign in to it.
    Register(RegisterArgs),
    /// Sign out and forget the stored session.
    Logout,
    /// Show who you are signed in as.
    Whoami,
    /// List your expenses or charges.
    List(ListArgs),
    /// Add an expense or a charge.
    Add(AddArgs),
    /// Change an existing expense or charge. Fields you do not pass keep their value.
    Update(UpdateArgs),
    /// Delete an expense or a charge.
    Delete(DeleteArgs),
    /// Mark a charge as paid, or as unpaid with --unpaid.
    Pay(PayArgs),
    /// Show totals, category breakdowns, the monthly trend and upcoming bills.
    Summary(SummaryArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where budgetzen configuration and session are held. Defaults to ~/budgetzen
    #[arg(long, env = "BUDGETZEN_HOME", default_value_t = default_budgetzen_home())]
    budgetzen_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, budgetzen_home: PathBuf) -> Self {
        Self {
            log_level,
            budgetzen_home: budgetzen_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn budgetzen_home(&self) -> &DisplayPath {
        &self.budgetzen_home
    }
}

/// (Not shown): Args for the `budgetzen init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The root of the BudgetZen API.
    #[arg(long, default_value = DEFAULT_API_URL)]
    api_url: String,
}

impl InitArgs {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

/// (Not shown): Args for the `budgetzen login` command.
#[derive(Debug, Parser, Clone)]
pub struct LoginArgs {
    #[arg(long)]
    email: String,

    /// Your password. It can also be passed in BUDGETZEN_PASSWORD.
    #[arg(long, env = "BUDGETZEN_PASSWORD", hide_env_values = true)]
    password: String,
}

impl LoginArgs {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

/// (Not shown): Args for the `budgetzen register` command.
#[derive(Debug, Parser, Clone)]
pub struct RegisterArgs {
    #[arg(long)]
    name: String,

    #[arg(long)]
    email: String,

    /// At least 8 characters. It can also be passed in BUDGETZEN_PASSWORD.
    #[arg(long, env = "BUDGETZEN_PASSWORD", hide_env_values = true)]
    password: String,
}

impl RegisterArgs {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

/// The two collections.
#[derive(
    Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    #[default]
    Expenses,
    Charges,
}

serde_plain::derive_display_from_serialize!(Entity);
serde_plain::derive_fromstr_from_deserialize!(Entity);

/// (Not shown): Args for the `budgetzen list` command.
#[derive(Debug, Parser, Clone)]
pub struct ListArgs {
    /// What to list: "expenses" or "charges"
    entity: Entity,

    /// Only list entries with this category.
    #[arg(long)]
    category: Option<String>,
}

impl ListArgs {
    pub fn new(entity: Entity, category: Option<String>) -> Self {
        Self { entity, category }
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }
}

/// (Not shown): Args for the `budgetzen add` command.
#[derive(Debug, Parser, Clone)]
pub struct AddArgs {
    #[command(subcommand)]
    entity: AddSubcommand,
}

impl AddArgs {
    pub fn new(entity: AddSubcommand) -> Self {
        Self { entity }
    }

    pub fn entity(&self) -> &AddSubcommand {
        &self.entity
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum AddSubcommand {
    /// Add a one-off expense.
    Expense(AddExpenseArgs),
    /// Add a charge, i.e. a bill with a due date.
    Charge(AddChargeArgs),
}

/// (Not shown): Args for the `budgetzen add expense` command.
#[derive(Debug, Parser, Clone)]
pub struct AddExpenseArgs {
    #[arg(long)]
    pub description: String,

    /// The amount, e.g. 42.50
    #[arg(long, value_parser = parse_amount)]
    pub amount: Amount,

    /// One of the suggested categories (Alimentation, Transport, Logement, Divertissement,
    /// Services publics, Autres) or any label of your own.
    #[arg(long)]
    pub category: String,

    /// The date of the expense as YYYY-MM-DD.
    #[arg(long)]
    pub date: NaiveDate,
}

/// (Not shown): Args for the `budgetzen add charge` command.
#[derive(Debug, Parser, Clone)]
pub struct AddChargeArgs {
    #[arg(long)]
    pub description: String,

    /// The amount, e.g. 850.00
    #[arg(long, value_parser = parse_amount)]
    pub amount: Amount,

    /// One of the suggested categories (Logement, Transport, Services publics, Assurances,
    /// Dettes, Abonnements, Autres) or any label of your own.
    #[arg(long)]
    pub category: String,

    /// The due date as YYYY-MM-DD.
    #[arg(long)]
    pub due_date: NaiveDate,

    /// The charge has already been paid.
    #[arg(long)]
    pub paid: bool,
}

/// (Not shown): Args for the `budgetzen update` command.
#[derive(Debug, Parser, Clone)]
pub struct UpdateArgs {
    #[command(subcommand)]
    entity: UpdateSubcommand,
}

impl UpdateArgs {
    pub fn new(entity: UpdateSubcommand) -> Self {
        Self { entity }
    }

    pub fn entity(&self) -> &UpdateSubcommand {
        &self.entity
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum UpdateSubcommand {
    /// Change an expense.
    Expense(UpdateExpenseArgs),
    /// Change a charge.
    Charge(UpdateChargeArgs),
}

/// (Not shown): Args for the `budgetzen update expense` command.
#[derive(Debug, Default, Parser, Clone)]
pub struct UpdateExpenseArgs {
    /// The id of the expense to change.
    #[arg(long)]
    pub id: u64,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long, value_parser = parse_amount)]
    pub amount: Option<Amount>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub date: Option<NaiveDate>,
}

/// (Not shown): Args for the `budgetzen update charge` command.
#[derive(Debug, Default, Parser, Clone)]
pub struct UpdateChargeArgs {
    /// The id of the charge to change.
    #[arg(long)]
    pub id: u64,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long, value_parser = parse_amount)]
    pub amount: Option<Amount>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub due_date: Option<NaiveDate>,
}

/// (Not shown): Args for the `budgetzen delete` command.
#[derive(Debug, Parser, Clone)]
pub struct DeleteArgs {
    /// What to delete from: "expenses" or "charges"
    entity: Entity,

    /// The id of the entry to delete.
    #[arg(long)]
    id: u64,
}

impl DeleteArgs {
    pub fn new(entity: Entity, id: u64) -> Self {
        Self { entity, id }
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// (Not shown): Args for the `budgetzen pay` command.
#[derive(Debug, Parser, Clone)]
pub struct PayArgs {
    /// The id of the charge.
    #[arg(long)]
    id: u64,

    /// Mark the charge as not paid instead.
    #[arg(long)]
    unpaid: bool,
}

impl PayArgs {
    pub fn new(id: u64, unpaid: bool) -> Self {
        Self { id, unpaid }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn paid(&self) -> bool {
        !self.unpaid
    }
}

/// (Not shown): Args for the `budgetzen summary` command.
#[derive(Debug, Parser, Clone)]
pub struct SummaryArgs {
    /// Your income for the period. When given, the balance (income minus expenses) is shown.
    #[arg(long, value_parser = parse_amount)]
    income: Option<Amount>,

    /// How many days ahead to look for unpaid charges coming due, at most 36500.
    #[arg(
        long,
        default_value_t = 30,
        value_parser = clap::value_parser!(i64).range(0..=MAX_DAYS)
    )]
    days: i64,
}

impl SummaryArgs {
    pub fn new(income: Option<Amount>, days: i64) -> Self {
        Self { income, days }
    }

    pub fn income(&self) -> Option<Amount> {
        self.income
    }

    pub fn days(&self) -> i64 {
        self.days
    }
}

/// The longest look-ahead `budgetzen summary --days` accepts, about a century.
pub const MAX_DAYS: i64 = 36_500;

/// Parses a money amount given on the command line. Negative and absurdly large amounts are
/// refused here rather than by the server.
fn parse_amount(s: &str) -> Result<Amount, String> {
    let amount = Amount::from_str(s).map_err(|e| e.to_string())?;
    if amount.is_negative() {
        return Err(format!("'{s}' is negative, amounts must be zero or more"));
    }
    if !amount.is_in_range() {
        return Err(format!("'{s}' is larger than {}", Amount::max()));
    }
    Ok(amount)
}

fn default_budgetzen_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("budgetzen"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --budgetzen-home or BUDGETZEN_HOME instead of relying on the \
                default home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("budgetzen")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add_expense() {
        let args = Args::try_parse_from([
            "budgetzen",
            "--budgetzen-home",
            "/tmp/bz",
            "add",
            "expense",
            "--description",
            "Taxi",
            "--amount",
            "42.5",
            "--category",
            "Transport",
            "--date",
            "2024-07-20",
        ])
        .unwrap();
        assert_eq!(args.common().budgetzen_home().path(), Path::new("/tmp/bz"));
        let Command::Add(add) = args.command() else {
            panic!("expected add, got {:?}", args.command());
        };
        let AddSubcommand::Expense(expense) = add.entity() else {
            panic!("expected an expense");
        };
        assert_eq!(expense.amount, Amount::from_cents(4250));
        assert_eq!(expense.date, NaiveDate::from_ymd_opt(2024, 7, 20).unwrap());
    }

    #[test]
    fn test_parse_rejects_bad_amount_and_date() {
        let bad_amount = Args::try_parse_from([
            "budgetzen", "add", "charge", "--description", "Loyer", "--amount", "abc",
            "--category", "Logement", "--due-date", "2024-08-01",
        ]);
        assert!(bad_amount.is_err());
        let bad_date = Args::try_parse_from([
            "budgetzen", "add", "charge", "--description", "Loyer", "--amount", "850",
            "--category", "Logement", "--due-date", "08/01/2024",
        ]);
        assert!(bad_date.is_err());
    }

    #[test]
    fn test_parse_rejects_negative_and_huge_amounts() {
        for amount in ["--amount=-5", "--amount=79228162514264337593543950335"] {
            let args = Args::try_parse_from([
                "budgetzen", "add", "expense", "--description", "Taxi", amount,
                "--category", "Transport", "--date", "2024-07-20",
            ]);
            assert!(args.is_err(), "{amount} should be rejected");
        }
        let update = Args::try_parse_from([
            "budgetzen", "update", "charge", "--id", "3", "--amount=-1.50",
        ]);
        assert!(update.is_err());
        let income = Args::try_parse_from(["budgetzen", "summary", "--income=-100"]);
        assert!(income.is_err());

        let zero = Args::try_parse_from([
            "budgetzen", "add", "charge", "--description", "Essai", "--amount", "0",
            "--category", "Autres", "--due-date", "2024-08-01",
        ]);
        assert!(zero.is_ok());
    }

    #[test]
    fn test_parse_summary_days_range() {
        let args = Args::try_parse_from(["budgetzen", "summary"]).unwrap();
        let Command::Summary(summary) = args.command() else {
            panic!("expected summary");
        };
        assert_eq!(summary.days(), 30);

        let args = Args::try_parse_from(["budgetzen", "summary", "--days", "36500"]).unwrap();
        let Command::Summary(summary) = args.command() else {
            panic!("expected summary");
        };
        assert_eq!(summary.days(), MAX_DAYS);

        assert!(Args::try_parse_from(["budgetzen", "summary", "--days", "36501"]).is_err());
        assert!(Args::try_parse_from(["budgetzen", "summary", "--days=-1"]).is_err());
        assert!(
            Args::try_parse_from(["budgetzen", "summary", "--days", "1000000000000"]).is_err()
        );
    }

    #[test]
    fn test_parse_list_and_pay() {
        let args = Args::try_parse_from(["budgetzen", "--log-level", "debug", "list", "charges"])
            .unwrap();
        assert_eq!(args.common().log_level(), LevelFilter::DEBUG);
        let Command::List(list) = args.command() else {
            panic!("expected list");
        };
        assert_eq!(list.entity(), Entity::Charges);

        let args = Args::try_parse_from(["budgetzen", "pay", "--id", "4", "--unpaid"]).unwrap();
        let Command::Pay(pay) = args.command() else {
            panic!("expected pay");
        };
        assert_eq!(pay.id(), 4);
        assert!(!pay.paid());
    }

    #[test]
    fn test_entity_display() {
        assert_eq!(Entity::Charges.to_string(), "charges");
        assert_eq!("expenses".parse::<Entity>().unwrap(), Entity::Expenses);
    }
}
