// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{num::NonZeroU64, sync::Arc, time::Duration};

use async_trait::async_trait;
use clap::Parser;
use log::{info, warn};

use crate::{
    error::{self, Result},
    model::CaptureStatus,
    poller::{Overlap, PollingController},
};

use super::Context;

/// Keep polling the service and print the status whenever it changes, until
/// interrupted.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// Milliseconds between status fetches.
    #[arg(long, default_value = "2500")]
    interval: NonZeroU64,

    /// Issue a fetch on every tick even if the previous one has not finished.
    #[arg(long)]
    allow_overlap: bool,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: Context) -> Result<()> {
        if !ctx.client.gate().ensure_authenticated().await? {
            warn!("Not logged in; expect every status fetch to be rejected");
        }

        let mut last_rendered = String::new();
        let on_update = move |status: CaptureStatus| {
            let rendered = super::status::render(&status);
            if rendered != last_rendered {
                println!("{rendered}");
                last_rendered = rendered;
            }
        };
        let on_error = |e: error::Error| warn!("Could not fetch status: {}", e);

        let poller = PollingController::start(
            Arc::clone(&ctx.client),
            Duration::from_millis(self.interval.get()),
            if self.allow_overlap {
                Overlap::Allow
            } else {
                Overlap::SingleFlight
            },
            on_update,
            on_error,
        );

        let interrupted = tokio::signal::ctrl_c().await;
        info!("Stopping");
        poller.stop().await?;
        interrupted?;
        Ok(())
    }
}
