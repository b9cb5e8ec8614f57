// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use tabled::{settings::Style, Table, Tabled};

use crate::{
    error::Result,
    model::{self, CaptureStatus},
};

use super::Context;

#[derive(Tabled)]
struct Row {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

const CAPTURE_FIELDS: [(&str, &str); 6] = [
    ("Feature", "feature"),
    ("Scenario", "scenario"),
    ("ID", "id"),
    ("Started", "started"),
    ("Finished", "finished"),
    ("Duration (s)", "durationSeconds"),
];

/// Lays out a snapshot as a two-column table. Fields the service left out
/// are omitted.
pub(super) fn render(status: &CaptureStatus) -> String {
    let mut rows = vec![Row {
        field: "State",
        value: status.state.to_string(),
    }];

    rows.extend(CAPTURE_FIELDS.iter().filter_map(|&(field, key)| {
        status
            .capture
            .get(key)
            .map(model::format_value)
            .filter(|value| !value.is_empty())
            .map(|value| Row { field, value })
    }));

    rows.push(Row {
        field: "Uploads",
        value: status.uploads.len().to_string(),
    });
    if let Some(uptime) = status.info.get("uptimeSeconds") {
        rows.push(Row {
            field: "Uptime (s)",
            value: model::format_value(uptime),
        });
    }

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Show the current state of the capture service.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// Print the raw snapshot fields as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: Context) -> Result<()> {
        let status = ctx.client.get_status().await?;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "state": status.state.to_string(),
                    "capture": status.capture,
                    "uploads": status.uploads,
                    "info": status.info,
                    "defaults": status.defaults,
                }))?
            );
        } else {
            println!("{}", render(&status));
        }
        Ok(())
    }
}
