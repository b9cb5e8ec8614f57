// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![deny(elided_lifetimes_in_paths)]
#![warn(
    rust_2018_idioms,
    future_incompatible,
    unused,
    unused_lifetimes,
    unused_qualifications,
    unused_results,
    anonymous_parameters,
    deprecated_in_future,
    elided_lifetimes_in_paths,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    missing_doc_code_examples,
    private_doc_tests,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::unseparated_literal_suffix,
    clippy::decimal_literal_representation,
    clippy::single_char_lifetime_names,
    clippy::fallible_impl_from,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::wildcard_enum_match_arm,
    clippy::deref_by_slicing,
    clippy::default_numeric_fallback,
    clippy::shadow_reuse,
    clippy::clone_on_ref_ptr,
    clippy::todo,
    clippy::string_add,
    clippy::use_debug,
    clippy::future_not_send
)]
#![cfg_attr(not(test), warn(clippy::panic_in_result_fn))]

mod client;
mod command;
mod credentials;
mod error;
mod gate;
mod metadata;
mod model;
mod password;
mod poller;
mod session;
mod storage;

use std::{path::PathBuf, process, sync::Arc, time::Duration};

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use error::Result;
use log::{error, warn};
use url::Url;

use crate::{client::CaptureClient, command::Context, credentials::CredentialStore};

#[derive(Debug, Subcommand)]
enum Command {
    Login(command::login::Command),
    Logout(command::logout::Command),
    Whoami(command::whoami::Command),
    Status(command::status::Command),
    Start(command::start::Command),
    Record(command::lifecycle::Record),
    Stop(command::lifecycle::Stop),
    Finish(command::lifecycle::Finish),
    Cancel(command::lifecycle::Cancel),
    List(command::list::Command),
    Show(command::show::Command),
    Delete(command::delete::Command),
    Upload(command::upload::Upload),
    Uploads(command::upload::Uploads),
    Watch(command::watch::Command),
}

#[async_trait]
impl command::Command for Command {
    async fn execute(self, ctx: Context) -> Result<()> {
        match self {
            Self::Login(cmd) => cmd.execute(ctx).await,
            Self::Logout(cmd) => cmd.execute(ctx).await,
            Self::Whoami(cmd) => cmd.execute(ctx).await,
            Self::Status(cmd) => cmd.execute(ctx).await,
            Self::Start(cmd) => cmd.execute(ctx).await,
            Self::Record(cmd) => cmd.execute(ctx).await,
            Self::Stop(cmd) => cmd.execute(ctx).await,
            Self::Finish(cmd) => cmd.execute(ctx).await,
            Self::Cancel(cmd) => cmd.execute(ctx).await,
            Self::List(cmd) => cmd.execute(ctx).await,
            Self::Show(cmd) => cmd.execute(ctx).await,
            Self::Delete(cmd) => cmd.execute(ctx).await,
            Self::Upload(cmd) => cmd.execute(ctx).await,
            Self::Uploads(cmd) => cmd.execute(ctx).await,
            Self::Watch(cmd) => cmd.execute(ctx).await,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// The base URL of the capture service API.
    #[arg(long, env = "VFCAP_URL", default_value = "http://localhost:1357/api", value_parser = Url::parse)]
    url: Url,

    /// Refuse to send requests while logged out instead of letting the
    /// service reject them.
    #[arg(long)]
    strict: bool,

    /// Keep credentials in memory only, forgetting them when the command
    /// exits.
    #[arg(long)]
    no_persist_credentials: bool,

    /// Give up on a request after this many seconds.
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// The path to the Pinentry program to use when asking for a password.
    #[arg(long, value_hint = clap::ValueHint::ExecutablePath)]
    pinentry_program: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

async fn get_session_storage(args: &Args) -> Box<dyn storage::Storage<session::Data>> {
    if !args.no_persist_credentials {
        #[cfg(feature = "secret-service")]
        match storage::SecretService::new(&args.url).await {
            Ok(secret_service_storage) => return Box::new(secret_service_storage),
            Err(e) => {
                warn!("We need to fall back to unencrypted file storage because we can't connect to the secret service: {}", e);
            }
        }

        #[cfg(feature = "keychain")]
        match storage::Keychain::new(&args.url) {
            Ok(keychain_storage) => return Box::new(keychain_storage),
            Err(e) => {
                warn!("We need to fall back to unencrypted file storage because we can't connect to Keychain: {}", e);
            }
        }

        match storage::File::new(metadata::SESSION_FILE) {
            Ok(file_storage) => return Box::new(file_storage),
            Err(e) => {
                warn!("Credentials will not outlive this process because file storage is unavailable: {}", e);
            }
        }
    }

    Box::new(storage::Memory::new())
}

async fn run(args: Args) -> Result<()> {
    let prompt: Vec<Box<dyn password::Prompt>> = vec![
        Box::new(args.pinentry_program.clone().map_or_else(
            password::PinentryPrompt::new,
            password::PinentryPrompt::new_with_executable,
        )),
        Box::new(password::RpasswordPrompt),
    ];

    let credentials = CredentialStore::new(get_session_storage(&args).await);
    let config = client::Config {
        url: args.url,
        strict: args.strict,
        timeout: args.timeout.map(Duration::from_secs),
    };
    let client = CaptureClient::new(&config, credentials)?;

    let ctx = Context {
        client: Arc::new(client),
        prompt: Arc::new(prompt),
    };
    command::Command::execute(args.command, ctx).await
}

#[tokio::main]
async fn main() {
    let logger_env = env_logger::Env::new()
        .filter_or("VFCAP_LOG", "warn")
        .write_style("VFCAP_LOG_STYLE");
    env_logger::Builder::from_env(logger_env).init();

    if let Err(e) = run(Args::parse()).await {
        error!("We encountered an error: {}", e);
        process::exit(1);
    };
}
