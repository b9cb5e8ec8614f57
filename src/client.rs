// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{RequestBuilder, Response};
use secrecy::SecretString;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use url::Url;

use crate::{
    error::{self, Result},
    credentials::CredentialStore,
    gate::SessionGate,
    metadata,
    model::{
        CaptureFinishParams, CaptureStartParams, CaptureStatus, CaptureSummary, Mapping,
        TestStatus, UploadStatus,
    },
};

/// Everything a [`CaptureClient`] needs to know about where and how to talk to
/// the service.
#[derive(Clone, Debug)]
pub(crate) struct Config {
    /// The service root, e.g. `http://localhost:1357/api`.
    pub(crate) url: Url,
    /// Refuse to send requests while logged out instead of letting the
    /// service reject them.
    pub(crate) strict: bool,
    /// Per-request deadline. Without one, requests wait as long as the
    /// transport lets them.
    pub(crate) timeout: Option<Duration>,
}

/// Whatever can produce status snapshots for the poller.
#[async_trait]
pub(crate) trait StatusSource: Send + Sync {
    async fn fetch_status(&self) -> Result<CaptureStatus>;
}

#[async_trait]
impl<T: StatusSource + ?Sized> StatusSource for Box<T> {
    async fn fetch_status(&self) -> Result<CaptureStatus> {
        (**self).fetch_status().await
    }
}

#[derive(Clone, Debug)]
struct Endpoints {
    root: Url,
    captures: Url,
    start: Url,
    record: Url,
    stop: Url,
    finish: Url,
    cancel: Url,
    uploads: Url,
}

impl Endpoints {
    fn new(root: &Url) -> Result<Self> {
        if !matches!(root.scheme(), "http" | "https") || root.cannot_be_a_base() {
            return Err(error::Error::InvalidUrl(root.clone()));
        }

        let mut root = root.clone();
        root.set_query(None);
        root.set_fragment(None);
        if let Ok(mut segments) = root.path_segments_mut() {
            let _ = segments.pop_if_empty();
        }

        let under = |tail: &[&str]| -> Result<Url> {
            let mut url = root.clone();
            let _ = url
                .path_segments_mut()
                .map_err(|()| error::Error::InvalidUrl(root.clone()))?
                .extend(tail);
            Ok(url)
        };

        Ok(Self {
            captures: under(&["captures"])?,
            start: under(&["captures", "start"])?,
            record: under(&["captures", "record"])?,
            stop: under(&["captures", "stop"])?,
            finish: under(&["captures", "finish"])?,
            cancel: under(&["captures", "cancel"])?,
            uploads: under(&["captures", "upload"])?,
            root,
        })
    }

    fn capture(&self, id: &str) -> Url {
        let mut url = self.captures.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            let _ = segments.push(id);
        }
        url
    }

    fn upload(&self, id: &str) -> Url {
        let mut url = self.uploads.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            let _ = segments.push(id);
        }
        url
    }
}

/// Drives the remote capture lifecycle.
///
/// The client keeps no capture state of its own: lifecycle calls are sent as
/// asked, without retries or local validation, and [`CaptureClient::get_status`]
/// is the only way to learn what the service made of them.
#[derive(Clone)]
pub(crate) struct CaptureClient {
    http: reqwest::Client,
    endpoints: Endpoints,
    gate: SessionGate,
}

impl CaptureClient {
    pub(crate) fn new(config: &Config, credentials: CredentialStore) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(metadata::USER_AGENT.as_str());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build().map_err(error::Error::Client)?,
            endpoints: Endpoints::new(&config.url)?,
            gate: SessionGate::new(credentials, config.strict),
        })
    }

    pub(crate) const fn gate(&self) -> &SessionGate {
        &self.gate
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response> {
        let resp = self
            .gate
            .authorize(req)
            .await?
            .send()
            .await
            .map_err(error::Error::ServiceUnreachable)?;

        let status = resp.status();
        debug!("{} responded with {}", resp.url(), status);
        if status.is_success() {
            Ok(resp)
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(error::Error::RequestRejected { status, body })
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        Ok(self
            .send(self.http.get(url.clone()))
            .await?
            .json::<T>()
            .await?)
    }

    async fn post<B: Serialize + Sync + ?Sized>(&self, url: &Url, body: &B) -> Result<Value> {
        let resp = self.send(self.http.post(url.clone()).json(body)).await?;
        Ok(Self::acknowledgment(&resp.bytes().await?))
    }

    /// Whatever the service answered with. Bodies that are not JSON come back
    /// as a string so an accepted call is never reported as failed.
    fn acknowledgment(bytes: &[u8]) -> Value {
        if bytes.is_empty() {
            return Value::Null;
        }
        serde_json::from_slice(bytes).unwrap_or_else(|e| {
            debug!("Acknowledgment is not JSON ({}); keeping it as text", e);
            Value::String(String::from_utf8_lossy(bytes).into_owned())
        })
    }

    /// Stores the credentials and then checks them against the service root.
    /// If the check fails for any reason the credentials are dropped again.
    ///
    /// Between the two steps the credentials are already in use, so anything
    /// sent concurrently may be rejected.
    pub(crate) async fn login(&self, username: &str, password: &SecretString) -> Result<()> {
        let _ = self
            .gate
            .credentials()
            .set_credentials(username, password)
            .await?;

        info!("Checking credentials for {} with {}", username, self.endpoints.root);
        let probe = self.send(self.http.get(self.endpoints.root.clone())).await;
        if let Err(e) = probe {
            if let Err(clear_err) = self.gate.credentials().clear().await {
                warn!("Could not roll back rejected credentials: {}", clear_err);
            }

            return Err(match e {
                error::Error::RequestRejected { status, .. } => {
                    warn!("Login was rejected with status {}", status);
                    error::Error::AuthenticationFailed
                }
                other => other,
            });
        }

        info!("Logged in as {}", username);
        Ok(())
    }

    /// Forgets the stored credentials. The service is not told.
    pub(crate) async fn logout(&self) -> Result<()> {
        self.gate.credentials().clear().await
    }

    pub(crate) async fn get_status(&self) -> Result<CaptureStatus> {
        self.get(&self.endpoints.root).await
    }

    pub(crate) async fn start_capture(&self, params: &CaptureStartParams) -> Result<Value> {
        info!("Starting capture of {} / {}", params.feature, params.scenario);
        self.post(&self.endpoints.start, params).await
    }

    pub(crate) async fn record_capture(&self) -> Result<Value> {
        self.post(&self.endpoints.record, &serde_json::json!({})).await
    }

    pub(crate) async fn stop_capture(&self) -> Result<Value> {
        self.post(&self.endpoints.stop, &serde_json::json!({})).await
    }

    pub(crate) async fn finish_capture(&self, outcome: TestStatus) -> Result<Value> {
        info!("Finishing capture with outcome {}", outcome);
        self.post(
            &self.endpoints.finish,
            &CaptureFinishParams {
                test_status: outcome,
            },
        )
        .await
    }

    pub(crate) async fn cancel_capture(&self) -> Result<Value> {
        self.post(&self.endpoints.cancel, &serde_json::json!({})).await
    }

    pub(crate) async fn list_captures(&self) -> Result<Vec<CaptureSummary>> {
        self.get(&self.endpoints.captures).await
    }

    /// The full record of one capture, as the service keeps it.
    pub(crate) async fn get_capture(&self, id: &str) -> Result<Mapping> {
        self.get(&self.endpoints.capture(id)).await
    }

    pub(crate) async fn delete_capture(&self, id: &str) -> Result<()> {
        info!("Deleting capture {}", id);
        let _ = self
            .send(self.http.delete(self.endpoints.capture(id)))
            .await?;
        Ok(())
    }

    /// Queues a capture for upload and returns the state of every upload.
    pub(crate) async fn upload_capture(&self, id: &str) -> Result<Vec<UploadStatus>> {
        info!("Queueing capture {} for upload", id);
        Ok(self
            .send(self.http.post(self.endpoints.upload(id)))
            .await?
            .json()
            .await?)
    }

    pub(crate) async fn upload_status(&self) -> Result<Vec<UploadStatus>> {
        self.get(&self.endpoints.uploads).await
    }
}

#[async_trait]
impl StatusSource for CaptureClient {
    async fn fetch_status(&self) -> Result<CaptureStatus> {
        self.get_status().await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use reqwest::StatusCode;
    use serde_json::json;
    use wiremock::{
        matchers::{body_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::model::CaptureState;

    const ALICE: &str = "Basic YWxpY2U6c2VjcmV0";

    fn secret() -> SecretString {
        SecretString::new("secret".to_owned())
    }

    fn client_for(uri: &str, strict: bool) -> Result<CaptureClient> {
        let config = Config {
            url: Url::parse(&format!("{uri}/api")).map_err(|_| error::Error::Command)?,
            strict,
            timeout: Some(Duration::from_secs(5)),
        };
        CaptureClient::new(&config, CredentialStore::in_memory())
    }

    /// An address nothing is listening on.
    fn closed_port() -> Result<String> {
        let port = std::net::TcpListener::bind("127.0.0.1:0")?
            .local_addr()?
            .port();
        Ok(format!("http://127.0.0.1:{port}"))
    }

    fn root_with_state(state: &str, test_status: Option<&str>) -> Value {
        let mut capture = json!({ "state": state });
        if let Some(test_status) = test_status {
            capture["testStatus"] = test_status.into();
        }
        json!({
            "info": { "uptimeSeconds": 1 },
            "defaults": {},
            "captureStatus": capture,
            "uploads": {},
        })
    }

    /// Mounts the service root (reporting `state`) and every lifecycle
    /// endpoint, all requiring Alice's credentials.
    async fn serve(server: &MockServer, state: &str, test_status: Option<&str>) {
        server.reset().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .and(header("Authorization", ALICE))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(root_with_state(state, test_status)),
            )
            .mount(server)
            .await;
        for action in ["start", "record", "stop", "cancel"] {
            Mock::given(method("POST"))
                .and(path(format!("/api/captures/{action}")))
                .and(header("Authorization", ALICE))
                .and(header("X-Requested-With", "XMLHttpRequest"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "state": action })))
                .mount(server)
                .await;
        }
        Mock::given(method("POST"))
            .and(path("/api/captures/finish"))
            .and(header("Authorization", ALICE))
            .and(body_json(json!({ "testStatus": "pass" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "state": "finished" })))
            .mount(server)
            .await;
    }

    #[test]
    fn endpoints_hang_off_the_service_root() -> Result<(), Box<dyn std::error::Error>> {
        let endpoints = Endpoints::new(&Url::parse("http://localhost:1357/api/?x=1")?)?;
        assert_eq!(endpoints.root.as_str(), "http://localhost:1357/api");
        assert_eq!(
            endpoints.start.as_str(),
            "http://localhost:1357/api/captures/start"
        );
        assert_eq!(
            endpoints.captures.as_str(),
            "http://localhost:1357/api/captures"
        );

        assert!(matches!(
            Endpoints::new(&Url::parse("file:///tmp/api")?),
            Err(error::Error::InvalidUrl(_))
        ));
        assert!(matches!(
            Endpoints::new(&Url::parse("mailto:someone@example.com")?),
            Err(error::Error::InvalidUrl(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn full_capture_lifecycle() -> Result<()> {
        let server = MockServer::start().await;
        let client = client_for(&server.uri(), false)?;

        serve(&server, "idle", None).await;
        client.login("alice", &secret()).await?;
        assert!(client.gate().credentials().current_token().await?.is_some());

        serve(&server, "started", None).await;
        let params = CaptureStartParams {
            categories: BTreeMap::from([
                ("organisation".to_owned(), "Google".to_owned()),
                ("product".to_owned(), "Train Search".to_owned()),
            ]),
            feature: "Advanced Search".to_owned(),
            scenario: "Search in London".to_owned(),
            record: false,
            ..CaptureStartParams::default()
        };
        assert_eq!(client.start_capture(&params).await?, json!({ "state": "start" }));
        assert_eq!(client.get_status().await?.state, CaptureState::Started);

        serve(&server, "recording", None).await;
        let _ = client.record_capture().await?;
        assert_eq!(client.get_status().await?.state, CaptureState::Recording);

        serve(&server, "stopped", None).await;
        let _ = client.stop_capture().await?;
        assert_eq!(client.get_status().await?.state, CaptureState::Stopped);

        serve(&server, "finished", Some("pass")).await;
        let _ = client.finish_capture(TestStatus::Pass).await?;
        assert_eq!(
            client.get_status().await?.state,
            CaptureState::Finished(Some(TestStatus::Pass))
        );
        Ok(())
    }

    #[tokio::test]
    async fn start_body_matches_the_service_contract() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/captures/start"))
            .and(body_json(json!({
                "categories": { "organisation": "Google", "product": "Train Search" },
                "feature": "Advanced Search",
                "scenario": "Search in London",
                "record": "true",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), false)?;
        let ack = client
            .start_capture(&CaptureStartParams {
                categories: BTreeMap::from([
                    ("organisation".to_owned(), "Google".to_owned()),
                    ("product".to_owned(), "Train Search".to_owned()),
                ]),
                feature: "Advanced Search".to_owned(),
                scenario: "Search in London".to_owned(),
                record: true,
                ..CaptureStartParams::default()
            })
            .await?;
        assert_eq!(ack, Value::Null);
        Ok(())
    }

    #[tokio::test]
    async fn rejected_login_rolls_back_credentials() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), false)?;
        assert!(matches!(
            client.login("u", &secret()).await,
            Err(error::Error::AuthenticationFailed)
        ));
        assert_eq!(client.gate().credentials().current_token().await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_login_rolls_back_credentials() -> Result<()> {
        let uri = closed_port()?;

        let client = client_for(&uri, false)?;
        assert!(matches!(
            client.login("alice", &secret()).await,
            Err(error::Error::ServiceUnreachable(_))
        ));
        assert_eq!(client.gate().credentials().current_token().await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_status_keeps_credentials() -> Result<()> {
        let uri = closed_port()?;

        let client = client_for(&uri, false)?;
        let token = client
            .gate()
            .credentials()
            .set_credentials("alice", &secret())
            .await?;
        assert!(matches!(
            client.get_status().await,
            Err(error::Error::ServiceUnreachable(_))
        ));
        assert_eq!(
            client.gate().credentials().current_token().await?,
            Some(token)
        );
        Ok(())
    }

    #[tokio::test]
    async fn logged_out_calls_still_reach_the_service() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/captures/start"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), false)?;
        match client.start_capture(&CaptureStartParams::default()).await {
            Err(error::Error::RequestRejected { status, body }) => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(body, "Unauthorized");
            }
            other => panic!("expected a rejection, got {other:?}"),
        }

        let requests = server.received_requests().await.unwrap_or_default();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].headers.get("authorization").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn strict_config_refuses_logged_out_calls() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), true)?;
        assert!(matches!(
            client.start_capture(&CaptureStartParams::default()).await,
            Err(error::Error::NotAuthenticated)
        ));
        assert!(matches!(
            client.finish_capture(TestStatus::Fail).await,
            Err(error::Error::NotAuthenticated)
        ));
        assert!(server
            .received_requests()
            .await
            .unwrap_or_default()
            .is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn plain_text_acknowledgment_is_not_a_failure() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/captures/record"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), false)?;
        assert_eq!(client.record_capture().await?, json!("OK"));
        Ok(())
    }

    #[tokio::test]
    async fn shows_one_capture() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/captures/2018-01-30_12-43-24_abcdef"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "2018-01-30_12-43-24_abcdef",
                "feature": "Advanced Search",
                "format": "avi",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), false)?;
        let capture = client.get_capture("2018-01-30_12-43-24_abcdef").await?;
        assert_eq!(capture["feature"], "Advanced Search");
        assert_eq!(capture["format"], "avi");
        Ok(())
    }

    #[tokio::test]
    async fn deletes_a_capture() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/captures/abc"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), false)?;
        client.delete_capture("abc").await?;
        match client.delete_capture("missing").await {
            Err(error::Error::RequestRejected { status, .. }) => {
                assert_eq!(status, StatusCode::NOT_FOUND);
            }
            other => panic!("expected a rejection, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn capture_ids_are_a_single_path_segment() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/captures/a%2Fb"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), false)?;
        client.delete_capture("a/b").await?;
        Ok(())
    }

    #[tokio::test]
    async fn uploads_a_capture_and_reports_uploads() -> Result<()> {
        let server = MockServer::start().await;
        let uploads = json!([
            { "id": "abc", "state": "queued", "total": 2048, "transferred": 0 },
            { "id": "def", "state": "finished", "url": "https://videofirst.io/upload" },
        ]);
        Mock::given(method("POST"))
            .and(path("/api/captures/upload/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(uploads.clone()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/captures/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(uploads))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), false)?;
        let queued = client.upload_capture("abc").await?;
        assert_eq!(queued.len(), 2);
        assert_eq!(queued[0].id.as_deref(), Some("abc"));
        assert_eq!(queued[0].state.as_deref(), Some("queued"));
        assert_eq!(queued[0].total, Some(2048));

        let status = client.upload_status().await?;
        assert_eq!(status[1].state.as_deref(), Some("finished"));
        assert_eq!(status[1].rest["url"], "https://videofirst.io/upload");
        Ok(())
    }

    #[tokio::test]
    async fn out_of_order_calls_surface_the_service_rejection() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/captures/stop"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string("Capture is not recording"),
            )
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), false)?;
        let _ = client
            .gate()
            .credentials()
            .set_credentials("alice", &secret())
            .await?;
        match client.stop_capture().await {
            Err(error::Error::RequestRejected { status, body }) => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(body, "Capture is not recording");
            }
            other => panic!("expected a rejection, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn logout_is_local_only() -> Result<()> {
        let server = MockServer::start().await;
        serve(&server, "idle", None).await;

        let client = client_for(&server.uri(), false)?;
        client.login("alice", &secret()).await?;
        let before = server.received_requests().await.unwrap_or_default().len();

        client.logout().await?;
        assert_eq!(client.gate().credentials().current_token().await?, None);
        assert_eq!(
            server.received_requests().await.unwrap_or_default().len(),
            before
        );
        Ok(())
    }

    #[tokio::test]
    async fn lists_captures() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/captures"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "a", "feature": "Search", "testStatus": "pass" },
                { "id": "b", "feature": "Login" },
            ])))
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), false)?;
        let captures = client.list_captures().await?;
        assert_eq!(captures.len(), 2);
        assert_eq!(captures[0].test_status.as_deref(), Some("pass"));
        assert_eq!(captures[1].feature.as_deref(), Some("Login"));
        Ok(())
    }

    #[tokio::test]
    async fn garbage_status_is_a_decode_error() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), false)?;
        assert!(matches!(
            client.get_status().await,
            Err(error::Error::Decode(_))
        ));
        Ok(())
    }
}
