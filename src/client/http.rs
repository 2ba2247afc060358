//! HTTP implementation of [`Backend`].

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::{Backend, CheckTarget};
use crate::data::service::decode_records;
use crate::data::{ServiceDraft, ServiceRecord};
use crate::error::{ClientError, Result};

/// Name of the session cookie issued by `POST /api/login`.
pub const SESSION_COOKIE: &str = "pacs_session";

/// Header carrying a static API token.
const TOKEN_HEADER: &str = "X-Auth-Token";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Credentials {
    None,
    /// Static token from configuration.
    Token(String),
    /// Session id issued by the backend at login.
    Session(String),
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    latency_ms: Vec<f64>,
}

/// A backend reached over HTTP.
///
/// Every request carries an explicit timeout so a hung backend cannot stall
/// a refresh indefinitely.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use svcwatch::client::{Backend, HttpBackend};
///
/// let backend = HttpBackend::new("http://localhost:8080", Duration::from_secs(10)).unwrap();
/// assert_eq!(backend.description(), "http://localhost:8080/");
/// assert!(!backend.is_authenticated());
/// ```
#[derive(Debug)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    description: String,
    credentials: RwLock<Credentials>,
}

impl HttpBackend {
    /// Create a backend for the given base URL.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::Transport(format!("invalid base URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Transport(format!("invalid base URL {}", base_url)));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("svcwatch/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            description: base_url.to_string(),
            base_url,
            credentials: RwLock::new(Credentials::None),
        })
    }

    /// Use a static token (sent as `X-Auth-Token`) instead of a login session.
    pub fn with_token(self, token: impl Into<String>) -> Self {
        self.set_credentials(Credentials::Token(token.into()));
        self
    }

    fn set_credentials(&self, credentials: Credentials) {
        if let Ok(mut guard) = self.credentials.write() {
            *guard = credentials;
        }
    }

    fn credentials(&self) -> Credentials {
        self.credentials
            .read()
            .map(|guard| guard.clone())
            .unwrap_or(Credentials::None)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Transport(format!("invalid base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.credentials() {
            Credentials::None => request,
            Credentials::Token(token) => request.header(TOKEN_HEADER, token),
            Credentials::Session(session) => {
                request.header(COOKIE, format!("{}={}", SESSION_COOKIE, session))
            }
        }
    }

    /// Map non-success responses onto the error taxonomy.
    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .or_else(|| v.get("message"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or(body);

        Err(match status {
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            _ => ClientError::Status {
                code: status.as_u16(),
                message,
            },
        })
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.authorize(request).send().await?;
        Self::check_status(response).await
    }
}

/// Extract the session id from `Set-Cookie` headers.
fn session_from(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next())
        .filter_map(|pair| pair.trim().strip_prefix(SESSION_COOKIE))
        .filter_map(|rest| rest.strip_prefix('='))
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_services(&self) -> Result<Vec<ServiceRecord>> {
        let url = self.endpoint(&["api", "services"])?;
        let response = self.send(self.client.get(url)).await?;
        let values: Vec<serde_json::Value> = response.json().await?;
        Ok(decode_records(values))
    }

    async fn get_service(&self, id: &str) -> Result<ServiceRecord> {
        let url = self.endpoint(&["api", "services", id])?;
        let response = self.send(self.client.get(url)).await?;
        Ok(response.json().await?)
    }

    async fn upsert_service(&self, draft: &ServiceDraft) -> Result<()> {
        let url = self.endpoint(&["api", "services"])?;
        self.send(self.client.post(url).json(draft)).await?;
        debug!("Saved service {}", draft.id);
        Ok(())
    }

    async fn delete_service(&self, id: &str) -> Result<()> {
        let url = self.endpoint(&["api", "services", id])?;
        self.send(self.client.delete(url)).await?;
        debug!("Deleted service {}", id);
        Ok(())
    }

    async fn trigger_check(&self, target: &CheckTarget) -> Result<()> {
        let url = match target {
            CheckTarget::All => self.endpoint(&["api", "check"])?,
            CheckTarget::One(id) => self.endpoint(&["api", "check", id])?,
        };
        self.send(self.client.post(url)).await?;
        debug!("Check requested for {}", target);
        Ok(())
    }

    async fn history(&self, id: &str) -> Result<Vec<f64>> {
        let url = self.endpoint(&["api", "history", id])?;
        let response = self.send(self.client.get(url)).await?;
        let history: HistoryResponse = response.json().await?;
        Ok(history.latency_ms)
    }

    async fn login(&self, password: &str) -> Result<()> {
        let url = self.endpoint(&["api", "login"])?;
        let response = self
            .client
            .post(url)
            .json(&json!({ "password": password }))
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let session = session_from(&response)
            .ok_or_else(|| ClientError::Decode("login response carried no session cookie".into()))?;
        self.set_credentials(Credentials::Session(session));
        info!("Logged in to {}", self.description);
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        let had_session = matches!(self.credentials(), Credentials::Session(_));
        let result = if had_session {
            let url = self.endpoint(&["api", "logout"])?;
            self.send(self.client.post(url)).await.map(|_| ())
        } else {
            Ok(())
        };
        self.set_credentials(Credentials::None);
        info!("Logged out of {}", self.description);
        result
    }

    fn is_authenticated(&self) -> bool {
        self.credentials() != Credentials::None
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> HttpBackend {
        HttpBackend::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    fn sample_services() -> serde_json::Value {
        json!([
            {
                "id": "api",
                "name": "API",
                "host": "api.example.com",
                "last_status": "up",
                "last_latency_ms": 120
            },
            {
                "id": "db",
                "name": "Database",
                "host": "db.example.com",
                "port": 5432,
                "last_status": "down",
                "last_error": "tcp:TimeoutError"
            }
        ])
    }

    #[tokio::test]
    async fn test_list_services_sends_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/services"))
            .and(header("X-Auth-Token", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_services()))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend(&server).with_token("secret");
        assert!(backend.is_authenticated());

        let services = backend.list_services().await.unwrap();
        assert_eq!(services.len(), 2);
        assert_eq!(services[1].port, Some(5432));
        assert_eq!(services[1].last_error.as_deref(), Some("tcp:TimeoutError"));
    }

    #[tokio::test]
    async fn test_list_services_skips_unreadable_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/services"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "a", "name": "A", "host": "a.local" },
                { "id": "b", "name": "B", "host": "b.local", "port": "8080" },
                { "id": "c", "name": "C", "host": "c.local", "port": 99999 },
                { "id": "d", "name": 42, "host": "d.local" }
            ])))
            .mount(&server)
            .await;

        let services = backend(&server).list_services().await.unwrap();
        let ids: Vec<&str> = services.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(services[1].port, Some(8080));
        assert_eq!(services[2].port, None);
    }

    #[tokio::test]
    async fn test_get_service_encodes_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/services/my%20api"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "my api",
                "name": "my api",
                "host": "h"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let record = backend(&server).get_service("my api").await.unwrap();
        assert_eq!(record.id, "my api");
    }

    #[tokio::test]
    async fn test_get_missing_service_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/services/nope"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"error": "Service not found"})),
            )
            .mount(&server)
            .await;

        let err = backend(&server).get_service("nope").await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound(ref m) if m == "Service not found"));
    }

    #[tokio::test]
    async fn test_upsert_posts_draft() {
        let server = MockServer::start().await;
        let draft = ServiceRecord::new("web", "Web", "web.local").to_draft();
        Mock::given(method("POST"))
            .and(path("/api/services"))
            .and(body_json(json!({
                "id": "web",
                "name": "Web",
                "host": "web.local",
                "protocol": "https",
                "path": "/",
                "active": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "web"})))
            .expect(1)
            .mount(&server)
            .await;

        backend(&server).upsert_service(&draft).await.unwrap();
    }

    #[tokio::test]
    async fn test_upsert_failure_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/services"))
            .respond_with(ResponseTemplate::new(500).set_body_string("disk full"))
            .mount(&server)
            .await;

        let draft = ServiceRecord::new("web", "Web", "web.local").to_draft();
        let err = backend(&server).upsert_service(&draft).await.unwrap_err();
        match err {
            ClientError::Status { code, message } => {
                assert_eq!(code, 500);
                assert_eq!(message, "disk full");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_and_checks() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/services/web"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": "web"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/check"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"started": true})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/check/web"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"started": true})))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend(&server);
        backend.delete_service("web").await.unwrap();
        backend.trigger_check(&CheckTarget::All).await.unwrap();
        backend
            .trigger_check(&CheckTarget::One("web".into()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_history() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/history/api"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "api", "latency_ms": [10, 20, 15]})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/history/empty"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "empty"})))
            .mount(&server)
            .await;

        let backend = backend(&server);
        assert_eq!(backend.history("api").await.unwrap(), vec![10.0, 20.0, 15.0]);
        assert!(backend.history("empty").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_login_stores_session_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .and(body_json(json!({"password": "hunter2"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(
                        "Set-Cookie",
                        "pacs_session=abc123; HttpOnly; SameSite=Strict; Max-Age=86400",
                    )
                    .set_body_json(json!({"success": true})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/services"))
            .and(header("Cookie", "pacs_session=abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/logout"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend(&server);
        backend.login("hunter2").await.unwrap();
        assert!(backend.is_authenticated());
        assert!(backend.list_services().await.unwrap().is_empty());

        backend.logout().await.unwrap();
        assert!(!backend.is_authenticated());
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"success": false, "message": "Invalid password"})),
            )
            .mount(&server)
            .await;

        let backend = backend(&server);
        let err = backend.login("wrong").await.unwrap_err();
        assert!(matches!(err, ClientError::Unauthorized));
        assert!(!backend.is_authenticated());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        // Port 9 (discard) on localhost is expected to refuse connections
        let backend = HttpBackend::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = backend.list_services().await.unwrap_err();
        assert!(!err.is_rejection());
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(HttpBackend::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_endpoint_keeps_base_prefix() {
        let backend =
            HttpBackend::new("http://example.com/monitor/", Duration::from_secs(1)).unwrap();
        let url = backend.endpoint(&["api", "services"]).unwrap();
        assert_eq!(url.as_str(), "http://example.com/monitor/api/services");
    }
}
