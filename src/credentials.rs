// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{fmt, sync::Arc};

use futures_util::lock::Mutex;
use log::debug;
use secrecy::{ExposeSecret as _, SecretString};
use serde::{Deserialize, Serialize, Serializer};

use crate::{
    error::{self, Result},
    session,
    storage::{self, Backend as _, Storage as _},
};

#[derive(Clone)]
pub(crate) struct Credentials {
    pub(crate) username: String,
    pub(crate) password: SecretString,
}

impl Credentials {
    pub(crate) fn new<U: Into<String>>(username: U, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// The value sent after `Basic` in the `Authorization` header: the base64
/// encoding of `username:password`.
///
/// This is an encoding, not a digest. Anyone holding a token can recover the
/// password from it, so it is kept behind [`SecretString`] and never logged.
#[derive(Clone, Debug, Deserialize)]
#[serde(transparent)]
pub(crate) struct AuthToken(SecretString);

impl AuthToken {
    pub(crate) fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Recovers the credentials the token was derived from.
    pub(crate) fn credentials(&self) -> Result<Credentials, error::Storage> {
        let decoded = String::from_utf8(base64::decode(self.expose())?)
            .map_err(|_| error::Storage::MalformedToken)?;
        let (username, password) = decoded
            .split_once(':')
            .ok_or(error::Storage::MalformedToken)?;
        Ok(Credentials::new(
            username,
            SecretString::new(password.to_owned()),
        ))
    }
}

impl From<&Credentials> for AuthToken {
    fn from(value: &Credentials) -> Self {
        Self(SecretString::new(base64::encode(format!(
            "{}:{}",
            value.username,
            value.password.expose_secret()
        ))))
    }
}

impl PartialEq for AuthToken {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for AuthToken {}

impl Serialize for AuthToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.expose())
    }
}

/// Owns the persisted token. Holding a token is the only thing that makes the
/// client "logged in".
///
/// Clones share the same backend. Every operation takes the backend lock, so
/// a reader racing a [`CredentialStore::clear`] sees either the old token or
/// none at all.
#[derive(Clone)]
pub(crate) struct CredentialStore {
    storage: Arc<Mutex<Box<dyn storage::Storage<session::Data>>>>,
}

impl CredentialStore {
    pub(crate) fn new(storage: Box<dyn storage::Storage<session::Data>>) -> Self {
        Self {
            storage: Arc::new(Mutex::new(storage)),
        }
    }

    #[cfg(test)]
    pub(crate) fn in_memory() -> Self {
        Self::new(Box::new(storage::Memory::<session::Data>::new()))
    }

    /// Where credentials are kept, and whether they survive this process.
    pub(crate) async fn backend(&self) -> (&'static str, bool) {
        let storage = self.storage.lock().await;
        (storage.name(), storage.is_persistent())
    }

    /// Derives the token for the given pair and stores it in place of any
    /// previous one.
    pub(crate) async fn set_credentials(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<AuthToken> {
        let token = AuthToken::from(&Credentials::new(username, password.clone()));
        self.storage
            .lock()
            .await
            .update(&session::Data::new(token.clone()))
            .await?;
        debug!("Stored credentials for user {}", username);
        Ok(token)
    }

    pub(crate) async fn current_token(&self) -> Result<Option<AuthToken>> {
        let data = self.storage.lock().await.get().await?;
        Ok(data.map(session::Data::into_token))
    }

    pub(crate) async fn clear(&self) -> Result<()> {
        self.storage.lock().await.clear().await?;
        debug!("Cleared stored credentials");
        Ok(())
    }
}
