// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::{client::CaptureClient, error::Result, password};

pub(crate) mod delete;
pub(crate) mod lifecycle;
pub(crate) mod list;
pub(crate) mod login;
pub(crate) mod logout;
pub(crate) mod show;
pub(crate) mod start;
pub(crate) mod status;
pub(crate) mod upload;
pub(crate) mod watch;
pub(crate) mod whoami;

/// What every command gets to work with.
#[derive(Clone)]
pub(crate) struct Context {
    pub(crate) client: Arc<CaptureClient>,
    pub(crate) prompt: Arc<dyn password::Prompt>,
}

#[async_trait]
pub(crate) trait Command {
    async fn execute(self, ctx: Context) -> Result<()>;
}

/// Prints the service's answer to a lifecycle call, if it gave one.
fn print_acknowledgment(ack: &Value) -> Result<()> {
    if !ack.is_null() {
        println!("{}", serde_json::to_string_pretty(ack)?);
    }
    Ok(())
}
