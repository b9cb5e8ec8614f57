// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;

use crate::{error::Result, model::TestStatus};

use super::Context;

/// Begin recording the current capture.
#[derive(Debug, Parser)]
pub(crate) struct Record {}

#[async_trait]
impl super::Command for Record {
    async fn execute(self, ctx: Context) -> Result<()> {
        super::print_acknowledgment(&ctx.client.record_capture().await?)
    }
}

/// Stop recording the current capture.
#[derive(Debug, Parser)]
pub(crate) struct Stop {}

#[async_trait]
impl super::Command for Stop {
    async fn execute(self, ctx: Context) -> Result<()> {
        super::print_acknowledgment(&ctx.client.stop_capture().await?)
    }
}

/// Close out the current capture with a test outcome.
#[derive(Debug, Parser)]
pub(crate) struct Finish {
    /// Whether the captured test passed or failed.
    #[arg(value_enum)]
    outcome: TestStatus,
}

#[async_trait]
impl super::Command for Finish {
    async fn execute(self, ctx: Context) -> Result<()> {
        super::print_acknowledgment(&ctx.client.finish_capture(self.outcome).await?)
    }
}

/// Abandon the current capture, discarding anything recorded.
#[derive(Debug, Parser)]
pub(crate) struct Cancel {}

#[async_trait]
impl super::Command for Cancel {
    async fn execute(self, ctx: Context) -> Result<()> {
        super::print_acknowledgment(&ctx.client.cancel_capture().await?)
    }
}
