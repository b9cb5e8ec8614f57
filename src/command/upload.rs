// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use tabled::{settings::Style, Table};

use crate::{error::Result, model::UploadStatus};

use super::Context;

fn print_uploads(uploads: &[UploadStatus]) {
    if !uploads.is_empty() {
        println!("{}", Table::new(uploads).with(Style::rounded()));
    }
}

/// Queue a capture for upload to the configured upload service.
#[derive(Debug, Parser)]
pub(crate) struct Upload {
    /// The capture ID, as shown by `list`.
    #[clap()]
    id: String,
}

#[async_trait]
impl super::Command for Upload {
    async fn execute(self, ctx: Context) -> Result<()> {
        print_uploads(&ctx.client.upload_capture(&self.id).await?);
        Ok(())
    }
}

/// Show the state of every queued, running and finished upload.
#[derive(Debug, Parser)]
pub(crate) struct Uploads {}

#[async_trait]
impl super::Command for Uploads {
    async fn execute(self, ctx: Context) -> Result<()> {
        print_uploads(&ctx.client.upload_status().await?);
        Ok(())
    }
}
