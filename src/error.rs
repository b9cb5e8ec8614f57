// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{io, result};

use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

pub(crate) type Result<T, E = Error> = result::Result<T, E>;

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("IO operation failed: {0}")]
    Io(#[from] io::Error),
    #[error("JSON format error: {0}")]
    Json(serde_json::Error),
    #[error("the service rejected the supplied credentials")]
    AuthenticationFailed,
    #[error("{0} is not a usable service URL")]
    InvalidUrl(Url),
    #[error("HTTP client setup failed: {0}")]
    Client(reqwest::Error),
    #[error("unexpected response from the capture service: {0}")]
    Decode(reqwest::Error),
    #[error("could not reach the capture service: {0}")]
    ServiceUnreachable(reqwest::Error),
    #[error("the capture service rejected the request with status {status}: {body}")]
    RequestRejected { status: StatusCode, body: String },
    #[error("credential storage is unavailable: {0}")]
    StorageUnavailable(#[from] Storage),
    #[error("not logged in (run `login` first)")]
    NotAuthenticated,
    #[error("password retrieval error: {0}")]
    Password(#[from] Password),
    #[error("command execution failed")]
    Command,
    #[error("operation cancelled")]
    Cancelled,
}

impl From<pinentry::Error> for Error {
    fn from(value: pinentry::Error) -> Self {
        // LINT: Deliberate fall-through that should catch future cases added to
        // the enum.
        #[allow(
            clippy::wildcard_enum_match_arm,
            clippy::match_wildcard_for_single_variants
        )]
        match value {
            pinentry::Error::Cancelled | pinentry::Error::Timeout => Self::Cancelled,
            pinentry::Error::Io(e) => Self::Io(e),
            _ => Self::Password(Password::Pinentry(value)),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        // LINT: Deliberate fall-through that should catch future cases added to
        // the enum.
        #[allow(clippy::wildcard_enum_match_arm)]
        match value.classify() {
            serde_json::error::Category::Io => Self::Io(value.into()),
            _ => Self::Json(value),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Decode(value)
        } else {
            Self::ServiceUnreachable(value)
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Io(value.into())
    }
}

#[derive(Error, Debug)]
pub(crate) enum Storage {
    #[error("no per-user data directory could be determined")]
    NoProjectDirs,
    #[error("IO operation failed: {0}")]
    Io(#[from] io::Error),
    #[error("stored session data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("stored token is not valid: {0}")]
    InvalidToken(#[from] base64::DecodeError),
    #[error("stored token does not decode to a username and password")]
    MalformedToken,
    #[cfg(feature = "secret-service")]
    #[error("secret service error: {0}")]
    SecretService(#[from] oo7::Error),
    #[cfg(feature = "keychain")]
    #[error("keychain error: {0}")]
    Keychain(#[from] security_framework::base::Error),
}

#[derive(Error, Debug)]
pub(crate) enum Password {
    #[error("no password prompt available")]
    NoPrompt,
    #[error("Pinentry implementation error: {0}")]
    Pinentry(pinentry::Error),
}
