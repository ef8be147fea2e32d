use crate::api::PhotoRemote;
use crate::models::{
    InstanceConfig, RemotePhoto, Session, SessionRequest, SessionResponse, UploadReceipt,
};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::{StatusCode, Url};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::RwLock;
use std::time::Duration;

/// Overall timeout for every call except the health probe (large uploads)
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(30);

/// The server keeps sessions for 60 minutes; we only trust them for 50.
const SESSION_LIFETIME_MINUTES: i64 = 50;
/// A token this close to expiry is replaced before use.
const SESSION_REFRESH_MARGIN_MINUTES: i64 = 5;

const SESSION_HEADER: &str = "X-Session-ID";
const USER_AGENT: &str = "photo-sync/0.1.0";

/// Error type for remote operations
///
/// Never leaves this crate through [`PhotoRemote`]; it is logged and turned
/// into a sentinel.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No session token available")]
    NotAuthenticated,
    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),
}

/// Client for one remote deployment.
///
/// The cached session is shared by every concurrent caller. Two callers that
/// both see a stale token will both re-authenticate; the last one wins.
pub struct RemoteClient {
    base_url: Url,
    username: String,
    password: String,
    http: reqwest::Client,
    session: RwLock<Option<Session>>,
}

impl RemoteClient {
    /// Create a client. Does not touch the network.
    pub fn new(config: InstanceConfig) -> Result<Self, ClientError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(config.base_url));
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .tcp_keepalive(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            base_url,
            username: config.username,
            password: config.password,
            http,
            session: RwLock::new(None),
        })
    }

    /// Base URL extended by `segments`, each percent-encoded as one path
    /// segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Like `expect_ok`, but a 401 also drops the cached session so the next
    /// call authenticates again
    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        if response.status() == StatusCode::UNAUTHORIZED {
            log::warn!("Session rejected by {}, discarding it", self.base_url);
            self.store_session(None);
        }
        expect_ok(response).await
    }

    fn cached_session(&self) -> Option<Session> {
        match self.session.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn store_session(&self, session: Option<Session>) {
        match self.session.write() {
            Ok(mut guard) => *guard = session,
            Err(poisoned) => *poisoned.into_inner() = session,
        }
    }

    fn session_is_fresh(session: &Session) -> bool {
        Utc::now() < session.expires_at - ChronoDuration::minutes(SESSION_REFRESH_MARGIN_MINUTES)
    }

    /// Token for an authenticated call, authenticating first if needed
    async fn session_token(&self) -> Result<String, ClientError> {
        if !self.ensure_session().await {
            return Err(ClientError::NotAuthenticated);
        }
        self.cached_session()
            .map(|s| s.token)
            .ok_or(ClientError::NotAuthenticated)
    }

    async fn try_authenticate(&self) -> Result<Session, ClientError> {
        let response = self
            .http
            .post(self.endpoint(&["api", "v1", "session"])?)
            .json(&SessionRequest {
                username: &self.username,
                password: &self.password,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body = response.json::<SessionResponse>().await?;
        Ok(Session {
            token: body.id,
            expires_at: Utc::now() + ChronoDuration::minutes(SESSION_LIFETIME_MINUTES),
        })
    }

    async fn try_upload(&self, path: &Path, filename: &str) -> Result<UploadReceipt, ClientError> {
        let token = self.session_token().await?;
        let data = tokio::fs::read(path).await?;

        let part = reqwest::multipart::Part::bytes(data).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("files", part);

        let response = self
            .http
            .post(self.endpoint(&["api", "v1", "upload", filename])?)
            .header(SESSION_HEADER, token)
            .multipart(form)
            .send()
            .await?;

        Ok(self.check(response).await?.json::<UploadReceipt>().await?)
    }

    async fn try_search(
        &self,
        query: &str,
        count: u32,
        offset: u32,
    ) -> Result<Vec<RemotePhoto>, ClientError> {
        let token = self.session_token().await?;
        let response = self
            .http
            .get(self.endpoint(&["api", "v1", "photos"])?)
            .query(&[
                ("q", query.to_string()),
                ("count", count.to_string()),
                ("offset", offset.to_string()),
            ])
            .header(SESSION_HEADER, token)
            .send()
            .await?;

        Ok(self.check(response).await?.json::<Vec<RemotePhoto>>().await?)
    }

    async fn try_metadata(&self, uuid: &str) -> Result<Map<String, Value>, ClientError> {
        let token = self.session_token().await?;
        let response = self
            .http
            .get(self.endpoint(&["api", "v1", "photos", uuid])?)
            .header(SESSION_HEADER, token)
            .send()
            .await?;

        Ok(self
            .check(response)
            .await?
            .json::<Map<String, Value>>()
            .await?)
    }

    async fn try_health(&self) -> Result<(), ClientError> {
        let response = self
            .http
            .get(self.endpoint(&["api", "v1", "status"])?)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await?;
        expect_ok(response).await.map(|_| ())
    }

    async fn try_trigger_indexing(&self) -> Result<(), ClientError> {
        let token = self.session_token().await?;
        let response = self
            .http
            .post(self.endpoint(&["api", "v1", "index"])?)
            .header(SESSION_HEADER, token)
            .send()
            .await?;
        self.check(response).await.map(|_| ())
    }
}

async fn status_error(response: reqwest::Response) -> ClientError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ClientError::Status { status, body }
}

async fn expect_ok(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    if response.status() == StatusCode::OK {
        Ok(response)
    } else {
        Err(status_error(response).await)
    }
}

#[async_trait]
impl PhotoRemote for RemoteClient {
    async fn authenticate(&self) -> bool {
        match self.try_authenticate().await {
            Ok(session) => {
                self.store_session(Some(session));
                log::info!("Remote authentication successful: {}", self.base_url);
                true
            }
            Err(e) => {
                log::error!("Remote authentication failed for {}: {}", self.base_url, e);
                false
            }
        }
    }

    async fn ensure_session(&self) -> bool {
        if let Some(session) = self.cached_session() {
            if Self::session_is_fresh(&session) {
                log::debug!("Reusing cached session for {}", self.base_url);
                return true;
            }
        }
        self.authenticate().await
    }

    async fn upload_photo(&self, path: &Path, filename: &str) -> Option<UploadReceipt> {
        match self.try_upload(path, filename).await {
            Ok(receipt) => {
                log::info!("Photo uploaded successfully: {}", filename);
                Some(receipt)
            }
            Err(e) => {
                log::error!("Photo upload failed for {}: {}", filename, e);
                None
            }
        }
    }

    async fn search_photos(
        &self,
        query: &str,
        count: u32,
        offset: u32,
    ) -> Option<Vec<RemotePhoto>> {
        match self.try_search(query, count, offset).await {
            Ok(photos) => {
                log::info!("Photo search successful: {} results", photos.len());
                Some(photos)
            }
            Err(e) => {
                log::error!("Photo search failed: {}", e);
                None
            }
        }
    }

    async fn get_photo_metadata(&self, uuid: &str) -> Option<Map<String, Value>> {
        match self.try_metadata(uuid).await {
            Ok(metadata) => {
                log::debug!("Photo metadata retrieved: {}", uuid);
                Some(metadata)
            }
            Err(e) => {
                log::error!("Photo metadata retrieval failed for {}: {}", uuid, e);
                None
            }
        }
    }

    async fn health_check(&self) -> bool {
        match self.try_health().await {
            Ok(()) => true,
            Err(e) => {
                log::error!("Health check failed for {}: {}", self.base_url, e);
                false
            }
        }
    }

    async fn trigger_indexing(&self) -> bool {
        match self.try_trigger_indexing().await {
            Ok(()) => {
                log::info!("Indexing triggered on {}", self.base_url);
                true
            }
            Err(e) => {
                log::error!("Indexing trigger failed for {}: {}", self.base_url, e);
                false
            }
        }
    }
}
