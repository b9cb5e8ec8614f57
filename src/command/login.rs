// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{
    io::{self, Write as _},
    num::NonZeroU8,
};

use async_trait::async_trait;
use clap::Parser;
use log::{error, info, warn};
use secrecy::SecretString;
use tokio::task;

use crate::{
    error::{self, Result},
    password::{self, RequestBuilder},
};

use super::Context;

/// Log in to the capture service and remember the credentials.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// Read the password from the first line of standard input instead of
    /// prompting for it.
    #[arg(long)]
    password_stdin: bool,

    /// How many times to ask for the password before giving up.
    #[arg(long, default_value = "3")]
    attempts: NonZeroU8,

    /// The user to log in as. Asked for on the terminal if left out.
    #[clap()]
    username: Option<String>,
}

fn read_username() -> io::Result<String> {
    eprint!("Username: ");
    io::stderr().flush()?;
    let mut line = String::new();
    let _ = io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_owned())
}

fn read_password_line() -> io::Result<SecretString> {
    let mut line = String::new();
    let _ = io::stdin().read_line(&mut line)?;
    let trimmed = line.trim_end_matches(['\r', '\n']).to_owned();
    Ok(SecretString::new(trimmed))
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: Context) -> Result<()> {
        let (backend, persistent) = ctx.client.gate().credentials().backend().await;
        if persistent {
            info!("Credentials will be kept in {}", backend);
        } else {
            info!("Credentials will only be kept in {} for the lifetime of this process", backend);
        }

        let username = match self.username {
            Some(username) => username,
            None => task::spawn_blocking(read_username).await??,
        };
        if username.is_empty() {
            error!("A username is required to log in");
            return Err(error::Error::Command);
        }

        if self.password_stdin {
            let password = task::spawn_blocking(read_password_line).await??;
            return ctx.client.login(&username, &password).await;
        }

        let description = format!("Enter the password for {username}.");
        let mut last_error: Option<String> = None;
        for attempt in 1..=self.attempts.get() {
            let mut req = RequestBuilder::new(description.as_str());
            if let Some(ref e) = last_error {
                req = req.with_error(e);
            }

            let password = password::require(&*ctx.prompt, req.into_request()).await?;
            match ctx.client.login(&username, &password).await {
                Err(error::Error::AuthenticationFailed) if attempt < self.attempts.get() => {
                    warn!("Login attempt {} of {} was rejected", attempt, self.attempts);
                    last_error = Some("The service rejected that password.".to_owned());
                }
                result => return result,
            }
        }

        Err(error::Error::AuthenticationFailed)
    }
}
