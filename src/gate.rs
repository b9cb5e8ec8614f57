// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use log::warn;
use reqwest::{
    header::{self, HeaderMap, HeaderValue},
    RequestBuilder,
};

use crate::{
    credentials::{AuthToken, CredentialStore},
    error::{self, Result},
};

const X_REQUESTED_WITH: &str = "x-requested-with";

/// Decorates every outbound request with the credentials currently held by
/// the [`CredentialStore`].
///
/// Headers are rebuilt from the store for each request, so a logout between
/// two calls is seen by the second one.
#[derive(Clone)]
pub(crate) struct SessionGate {
    credentials: CredentialStore,
    strict: bool,
}

impl SessionGate {
    /// With `strict` unset, requests go out even without a token and the
    /// service gets to reject them. With it set, such requests are refused
    /// locally.
    pub(crate) const fn new(credentials: CredentialStore, strict: bool) -> Self {
        Self {
            credentials,
            strict,
        }
    }

    pub(crate) const fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    async fn token(&self) -> Option<AuthToken> {
        match self.credentials.current_token().await {
            Ok(token) => token,
            Err(e) => {
                warn!("Treating the session as logged out: {}", e);
                None
            }
        }
    }

    fn check(&self, token: Option<&AuthToken>) -> Result<()> {
        match token {
            Some(_) => Ok(()),
            None if self.strict => Err(error::Error::NotAuthenticated),
            None => {
                warn!("No credentials are stored; sending the request unauthenticated");
                Ok(())
            }
        }
    }

    fn headers(token: Option<&AuthToken>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(X_REQUESTED_WITH, HeaderValue::from_static("XMLHttpRequest"));

        if let Some(token) = token {
            match HeaderValue::from_str(&format!("Basic {}", token.expose())) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    let _ = headers.insert(header::AUTHORIZATION, value);
                }
                Err(_) => warn!("Stored token cannot be sent as a header; ignoring it"),
            }
        }

        headers
    }

    /// The header set for a request about to be sent, from a single read of
    /// the store. Never reuse the result for a later request.
    pub(crate) async fn authorized_headers(&self) -> Result<HeaderMap> {
        let token = self.token().await;
        self.check(token.as_ref())?;
        Ok(Self::headers(token.as_ref()))
    }

    /// Reports whether a token is held. Only fails in strict mode.
    pub(crate) async fn ensure_authenticated(&self) -> Result<bool> {
        let token = self.token().await;
        self.check(token.as_ref())?;
        Ok(token.is_some())
    }

    pub(crate) async fn authorize(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        Ok(req.headers(self.authorized_headers().await?))
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::credentials::tests::Unavailable;

    fn password() -> SecretString {
        SecretString::new("secret".to_owned())
    }

    #[tokio::test]
    async fn headers_carry_basic_token() -> Result<()> {
        let gate = SessionGate::new(CredentialStore::in_memory(), false);
        let _ = gate.credentials().set_credentials("alice", &password()).await?;

        let headers = gate.authorized_headers().await?;
        assert_eq!(
            headers.get(header::AUTHORIZATION),
            Some(&HeaderValue::from_static("Basic YWxpY2U6c2VjcmV0"))
        );
        assert_eq!(
            headers.get("X-Requested-With"),
            Some(&HeaderValue::from_static("XMLHttpRequest"))
        );
        assert!(headers[header::AUTHORIZATION].is_sensitive());
        Ok(())
    }

    #[tokio::test]
    async fn headers_are_not_cached_across_logout() -> Result<()> {
        let gate = SessionGate::new(CredentialStore::in_memory(), false);
        let _ = gate.credentials().set_credentials("alice", &password()).await?;

        let before = gate.authorized_headers().await?;
        gate.credentials().clear().await?;
        let after = gate.authorized_headers().await?;

        assert_ne!(before, after);
        assert!(after.get(header::AUTHORIZATION).is_none());
        Ok(())
    }

    #[tokio::test]
    async fn permissive_gate_lets_unauthenticated_calls_through() -> Result<()> {
        let gate = SessionGate::new(CredentialStore::in_memory(), false);
        assert!(!gate.ensure_authenticated().await?);

        let _ = gate.credentials().set_credentials("alice", &password()).await?;
        assert!(gate.ensure_authenticated().await?);
        Ok(())
    }

    #[tokio::test]
    async fn strict_gate_refuses_without_token() -> Result<()> {
        let gate = SessionGate::new(CredentialStore::in_memory(), true);
        assert!(matches!(
            gate.ensure_authenticated().await,
            Err(error::Error::NotAuthenticated)
        ));

        let _ = gate.credentials().set_credentials("alice", &password()).await?;
        assert!(gate.ensure_authenticated().await?);
        Ok(())
    }

    #[tokio::test]
    async fn strict_gate_builds_no_headers_without_token() -> Result<()> {
        let gate = SessionGate::new(CredentialStore::in_memory(), true);
        assert!(matches!(
            gate.authorized_headers().await,
            Err(error::Error::NotAuthenticated)
        ));

        let _ = gate.credentials().set_credentials("alice", &password()).await?;
        assert!(gate
            .authorized_headers()
            .await?
            .contains_key(header::AUTHORIZATION));
        Ok(())
    }

    #[tokio::test]
    async fn unavailable_storage_counts_as_logged_out() -> Result<()> {
        let permissive = SessionGate::new(CredentialStore::new(Box::new(Unavailable)), false);
        assert!(matches!(permissive.ensure_authenticated().await, Ok(false)));
        assert!(permissive
            .authorized_headers()
            .await?
            .get(header::AUTHORIZATION)
            .is_none());

        let strict = SessionGate::new(CredentialStore::new(Box::new(Unavailable)), true);
        assert!(matches!(
            strict.ensure_authenticated().await,
            Err(error::Error::NotAuthenticated)
        ));
        Ok(())
    }
}
