// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use async_trait::async_trait;
use clap::Parser;

use crate::{error::Result, model::CaptureStartParams};

use super::Context;

fn parse_key_value(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_owned(), value.trim().to_owned()))
        }
        _ => Err(format!("expected KEY=VALUE, got {value:?}")),
    }
}

/// Begin a new capture.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The feature under test, e.g. "Advanced Search".
    #[arg(long)]
    feature: String,

    /// The scenario of the feature, e.g. "Search in London".
    #[arg(long)]
    scenario: String,

    /// The organisation category.
    #[arg(long)]
    organisation: Option<String>,

    /// The product category.
    #[arg(long)]
    product: Option<String>,

    /// Any further category, as KEY=VALUE. May be repeated.
    #[arg(long = "category", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    categories: Vec<(String, String)>,

    /// Only start the capture; send `record` separately to begin recording.
    #[arg(long)]
    no_record: bool,

    /// Start even if another capture is under way, cancelling it.
    #[arg(long)]
    force: bool,

    /// Free-form metadata attached to the capture, as KEY=VALUE. May be
    /// repeated.
    #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    meta: Vec<(String, String)>,

    /// A description of the test being captured.
    #[arg(long)]
    description: Option<String>,
}

impl From<Command> for CaptureStartParams {
    fn from(value: Command) -> Self {
        let mut categories: BTreeMap<String, String> = value.categories.into_iter().collect();
        if let Some(organisation) = value.organisation {
            let _ = categories.insert("organisation".to_owned(), organisation);
        }
        if let Some(product) = value.product {
            let _ = categories.insert("product".to_owned(), product);
        }

        Self {
            categories,
            feature: value.feature,
            scenario: value.scenario,
            record: !value.no_record,
            force: value.force,
            meta: value.meta.into_iter().collect(),
            description: value.description,
        }
    }
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: Context) -> Result<()> {
        let ack = ctx.client.start_capture(&self.into()).await?;
        super::print_acknowledgment(&ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arguments_become_start_params() -> Result<(), clap::Error> {
        let cmd = Command::try_parse_from([
            "start",
            "--feature",
            "Advanced Search",
            "--scenario",
            "Search in London",
            "--organisation",
            "Google",
            "--product",
            "Train Search",
            "--category",
            "team = search",
            "--meta",
            "version=0.12.4",
            "--no-record",
        ])?;

        let params = CaptureStartParams::from(cmd);
        assert_eq!(params.feature, "Advanced Search");
        assert_eq!(params.scenario, "Search in London");
        assert_eq!(params.categories["organisation"], "Google");
        assert_eq!(params.categories["product"], "Train Search");
        assert_eq!(params.categories["team"], "search");
        assert_eq!(params.meta["version"], "0.12.4");
        assert!(!params.record);
        assert!(!params.force);
        Ok(())
    }

    #[test]
    fn malformed_pairs_are_rejected() {
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=value").is_err());
        assert_eq!(
            parse_key_value("a=b=c"),
            Ok(("a".to_owned(), "b=c".to_owned()))
        );
    }
}
