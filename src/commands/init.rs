use crate::commands::Out;
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the data directory, its `.secrets` subdirectory and an initial `config.json` pointing
/// at `api_url`.
///
/// # Arguments
/// - `budgetzen_home` - The directory that will be the root of data directory, e.g.
///   `$HOME/budgetzen`
/// - `api_url` - The root of the BudgetZen API, e.g. `http://localhost:8000/api`
///
/// # Errors
/// - Returns an error if the URL is invalid or if any file operations fail.
pub async fn init(budgetzen_home: &Path, api_url: &str) -> Result<Out<()>> {
    let config = Config::create(budgetzen_home, api_url)
        .await
        .context("Unable to create the data directory and configs")?;
    Ok(format!(
        "Successfully created the budgetzen directory at {} using {}",
        config.root().display(),
        config.api_url()
    )
    .into())
}
