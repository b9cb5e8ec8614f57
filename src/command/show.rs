// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;

use crate::error::Result;

use super::Context;

/// Print everything the service holds about one capture.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The capture ID, as shown by `list`.
    #[clap()]
    id: String,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: Context) -> Result<()> {
        let capture = ctx.client.get_capture(&self.id).await?;
        println!("{}", serde_json::to_string_pretty(&capture)?);
        Ok(())
    }
}
