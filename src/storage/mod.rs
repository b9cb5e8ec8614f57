// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

mod file;
#[cfg(feature = "keychain")]
mod keychain;
mod memory;
#[cfg(feature = "secret-service")]
mod secret_service;

use async_trait::async_trait;

use crate::error;

pub(crate) use file::File;
#[cfg(feature = "keychain")]
pub(crate) use keychain::Keychain;
pub(crate) use memory::Memory;
#[cfg(feature = "secret-service")]
pub(crate) use secret_service::SecretService;

pub(crate) type Result<T> = std::result::Result<T, error::Storage>;

/// The key under which a service's session is filed in a shared store. Query,
/// fragment and trailing slashes do not change which service is meant.
// LINT: Only the keyring backends file sessions under a key.
#[cfg_attr(not(any(feature = "keychain", feature = "secret-service")), allow(dead_code))]
pub(crate) fn entry_key(url: &url::Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.as_str().trim_end_matches('/').to_owned()
}

/// What a backend tells the user about where credentials end up.
pub(crate) trait Backend {
    /// Short human-readable name, e.g. "the keychain".
    fn name(&self) -> &'static str;

    /// Whether the value outlives the process.
    fn is_persistent(&self) -> bool;
}

impl<T: Backend + ?Sized> Backend for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn is_persistent(&self) -> bool {
        (**self).is_persistent()
    }
}

/// A slot holding at most one value. Writing replaces whatever was there
/// before, and clearing an empty slot is not an error.
#[async_trait]
pub(crate) trait Storage<T>: Send + Sync + Backend {
    async fn get(&mut self) -> Result<Option<T>>;
    async fn update(&mut self, data: &T) -> Result<()>;
    async fn clear(&mut self) -> Result<()>;
}

#[async_trait]
impl<Tn: Sync, T: Storage<Tn> + ?Sized> Storage<Tn> for Box<T> {
    async fn get(&mut self) -> Result<Option<Tn>> {
        (**self).get().await
    }

    async fn update(&mut self, data: &Tn) -> Result<()> {
        (**self).update(data).await
    }

    async fn clear(&mut self) -> Result<()> {
        (**self).clear().await
    }
}
