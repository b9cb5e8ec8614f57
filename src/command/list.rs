// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use core::num;

use async_trait::async_trait;
use clap::Parser;
use tabled::{
    settings::{object::Segment, Alignment, Modify, Style},
    Table,
};

use crate::error::Result;

use super::Context;

/// List the captures the service knows about.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The number of captures to show.
    #[clap(short, long)]
    count: Option<num::NonZeroUsize>,

    /// Print the captures as JSON, including fields not shown in the table.
    #[arg(long)]
    json: bool,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: Context) -> Result<()> {
        let mut captures = ctx.client.list_captures().await?;
        captures.truncate(self.count.map_or(usize::MAX, num::NonZeroUsize::get));

        if self.json {
            println!("{}", serde_json::to_string_pretty(&captures)?);
        } else if !captures.is_empty() {
            println!(
                "{}",
                Table::new(&captures)
                    .with(Style::rounded())
                    .with(Modify::new(Segment::new(1.., 1..=2)).with(Alignment::left()))
            );
        }
        Ok(())
    }
}
