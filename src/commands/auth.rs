//! Session command handlers.
//!
//! This module implements the CLI commands for:
//! - `budgetzen login` - Sign in and store the session
//! - `budgetzen register` - Open an account and sign in to it
//! - `budgetzen logout` - Revoke and forget the stored session
//! - `budgetzen whoami` - Confirm the stored session with the server

use crate::api::Mode;
use crate::commands::{Core, Out};
use crate::model::{RegisterRequest, User};
use crate::{Config, Result};
use anyhow::Context;

/// Handles the `budgetzen login` command. Any previous session is replaced.
pub async fn login(config: &Config, mode: Mode, email: &str, password: &str) -> Result<Out<User>> {
    let core = Core::open(config, mode).await?;
    let user = core
        .session()
        .login(email, password)
        .await
        .context("Unable to sign in")?;
    Ok(Out::new(
        format!("Signed in as {} <{}>", user.name, user.email),
        user,
    ))
}

/// Handles the `budgetzen register` command.
pub async fn register(
    config: &Config,
    mode: Mode,
    name: &str,
    email: &str,
    password: &str,
) -> Result<Out<User>> {
    let core = Core::open(config, mode).await?;
    let request = RegisterRequest::new(name, email, password);
    let user = core
        .session()
        .register(&request)
        .await
        .context("Unable to create the account")?;
    Ok(Out::new(
        format!("Created the account of {} <{}>", user.name, user.email),
        user,
    ))
}

/// Handles the `budgetzen logout` command. It succeeds even when the server cannot be reached.
pub async fn logout(config: &Config, mode: Mode) -> Result<Out<()>> {
    let core = Core::open(config, mode).await?;
    if !core.session().is_authenticated() {
        return Ok("You were not signed in".into());
    }
    core.session().logout().await;
    Ok("Signed out".into())
}

/// Handles the `budgetzen whoami` command.
pub async fn whoami(config: &Config, mode: Mode) -> Result<Out<Option<User>>> {
    let core = Core::open(config, mode).await?;
    match core.session().user() {
        Some(user) => Ok(Out::new(
            format!("Signed in as {} <{}>", user.name, user.email),
            Some(user),
        )),
        None => Ok(Out::new("You are not signed in", None)),
    }
}
