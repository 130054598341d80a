use budgetzen_sync::args::{AddSubcommand, Args, Command, UpdateSubcommand};
use budgetzen_sync::{commands, Config, Mode, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, trace};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().budgetzen_home().path();

    // When BUDGETZEN_IN_TEST_MODE is set and non-empty the mode is Mode::Test and every command
    // runs against the built-in demo server instead of the configured API.
    let mode = Mode::from_env();

    let _: () = match args.command() {
        Command::Init(init_args) => commands::init(home, init_args.api_url()).await?.print(),

        Command::Login(login_args) => {
            let config = Config::load(home).await?;
            commands::login(&config, mode, login_args.email(), login_args.password())
                .await?
                .print()
        }

        Command::Register(register_args) => {
            let config = Config::load(home).await?;
            commands::register(
                &config,
                mode,
                register_args.name(),
                register_args.email(),
                register_args.password(),
            )
            .await?
            .print()
        }

        Command::Logout => {
            let config = Config::load(home).await?;
            commands::logout(&config, mode).await?.print()
        }

        Command::Whoami => {
            let config = Config::load(home).await?;
            commands::whoami(&config, mode).await?.print()
        }

        Command::List(list_args) => {
            let config = Config::load(home).await?;
            commands::list(&config, mode, list_args).await?.print()
        }

        Command::Add(add_args) => {
            let config = Config::load(home).await?;
            match add_args.entity() {
                AddSubcommand::Expense(args) => {
                    commands::add_expense(&config, mode, args).await?.print()
                }
                AddSubcommand::Charge(args) => {
                    commands::add_charge(&config, mode, args).await?.print()
                }
            }
        }

        Command::Update(update_args) => {
            let config = Config::load(home).await?;
            match update_args.entity() {
                UpdateSubcommand::Expense(args) => {
                    commands::update_expense(&config, mode, args).await?.print()
                }
                UpdateSubcommand::Charge(args) => {
                    commands::update_charge(&config, mode, args).await?.print()
                }
            }
        }

        Command::Delete(delete_args) => {
            let config = Config::load(home).await?;
            commands::delete(&config, mode, delete_args).await?.print()
        }

        Command::Pay(pay_args) => {
            let config = Config::load(home).await?;
            commands::pay(&config, mode, pay_args).await?.print()
        }

        Command::Summary(summary_args) => {
            let config = Config::load(home).await?;
            commands::summary(&config, mode, summary_args).await?.print()
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                "budgetzen_sync",
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
