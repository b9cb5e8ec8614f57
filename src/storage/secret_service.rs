// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use async_trait::async_trait;
use secrecy::{ExposeSecret as _, SecretVec};
use serde::{Deserialize, Serialize};

use crate::metadata;

use super::{Backend, Result, Storage};

/// Attributes identifying the session item for one capture service.
fn attributes(url: &url::Url) -> HashMap<String, String> {
    HashMap::from([
        (format!("{}.kind", *metadata::CLIENT_NAME), "session".to_owned()),
        (format!("{}.url", *metadata::CLIENT_NAME), super::entry_key(url)),
    ])
}

/// Keeps the session in the freedesktop Secret Service, one item per capture
/// service.
pub(crate) struct SecretService {
    keyring: oo7::Keyring,
    attributes: HashMap<String, String>,
}

impl SecretService {
    pub(crate) async fn new(url: &url::Url) -> Result<Self> {
        Ok(Self {
            keyring: oo7::Keyring::new().await?,
            attributes: attributes(url),
        })
    }

    fn query(&self) -> HashMap<&str, &str> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect()
    }

    async fn lookup(&self) -> Result<Option<oo7::Item>> {
        Ok(self.keyring.search_items(self.query()).await?.into_iter().next())
    }
}

impl Backend for SecretService {
    fn name(&self) -> &'static str {
        "the secret service"
    }

    fn is_persistent(&self) -> bool {
        true
    }
}

#[async_trait]
impl<T: for<'de> Deserialize<'de> + Send + Serialize + Sync> Storage<T> for SecretService {
    async fn get(&mut self) -> Result<Option<T>> {
        match self.lookup().await? {
            Some(item) => Ok(Some(serde_json::from_slice(&item.secret().await?)?)),
            None => Ok(None),
        }
    }

    async fn update(&mut self, data: &T) -> Result<()> {
        let secret = SecretVec::new(serde_json::to_vec(data)?);
        self.keyring
            .create_item(
                &format!("{} session", *metadata::CLIENT_DISPLAY_NAME),
                self.query(),
                secret.expose_secret(),
                true,
            )
            .await?;
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        if let Some(item) = self.lookup().await? {
            item.delete().await?;
        }
        Ok(())
    }
}
