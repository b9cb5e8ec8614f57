// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use log::error;

use crate::error::{self, Result};

use super::Context;

/// Print the user the stored credentials belong to.
#[derive(Debug, Parser)]
pub(crate) struct Command {}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: Context) -> Result<()> {
        match ctx.client.gate().credentials().current_token().await? {
            Some(token) => {
                println!("{}", token.credentials()?.username);
                Ok(())
            }
            None => {
                error!("Not logged in");
                Err(error::Error::Command)
            }
        }
    }
}
