// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use secrecy::{ExposeSecret as _, SecretVec};
use security_framework::os::macos::{
    keychain::{SecKeychain, SecPreferencesDomain},
    keychain_item::SecKeychainItem,
    passwords::SecKeychainItemPassword,
};
use serde::{Deserialize, Serialize};

use crate::metadata;

use super::{Backend, Result, Storage};

// errSecItemNotFound
const ITEM_NOT_FOUND: i32 = -25300_i32;

/// Keeps the session as a generic password in the user's login keychain. The
/// service is this client and the account is the capture service it talks to,
/// so sessions for different services never collide.
pub(crate) struct Keychain {
    delegate: SecKeychain,
    service: String,
    account: String,
}

impl Keychain {
    pub(crate) fn new(url: &url::Url) -> Result<Self> {
        Ok(Self {
            delegate: SecKeychain::default_for_domain(SecPreferencesDomain::User)?,
            service: format!("{} session", *metadata::CLIENT_DISPLAY_NAME),
            account: super::entry_key(url),
        })
    }

    fn lookup(&self) -> Result<Option<(SecKeychainItemPassword, SecKeychainItem)>> {
        match self
            .delegate
            .find_generic_password(&self.service, &self.account)
        {
            Ok(found) => Ok(Some(found)),
            Err(err) if err.code() == ITEM_NOT_FOUND => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

impl Backend for Keychain {
    fn name(&self) -> &'static str {
        "the keychain"
    }

    fn is_persistent(&self) -> bool {
        true
    }
}

#[async_trait]
impl<T: for<'de> Deserialize<'de> + Send + Serialize + Sync> Storage<T> for Keychain {
    async fn get(&mut self) -> Result<Option<T>> {
        self.lookup()?
            .map(|(password, _)| serde_json::from_slice(&password))
            .transpose()
            .map_err(Into::into)
    }

    async fn update(&mut self, data: &T) -> Result<()> {
        let secret = SecretVec::new(serde_json::to_vec(data)?);
        self.delegate
            .set_generic_password(&self.service, &self.account, secret.expose_secret())?;
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        if let Some((_, item)) = self.lookup()? {
            item.delete();
        }
        Ok(())
    }
}
