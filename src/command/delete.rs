// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use log::info;

use crate::error::Result;

use super::Context;

/// Delete a capture and its recording from the service.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The capture IDs to delete.
    #[clap(required = true)]
    ids: Vec<String>,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: Context) -> Result<()> {
        for id in &self.ids {
            ctx.client.delete_capture(id).await?;
            info!("Deleted capture {}", id);
        }
        Ok(())
    }
}
