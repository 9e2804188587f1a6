///! API client for the console backend

use anyhow::Result;
use arkdash_common::auth::{CsrfToken, AUTH_TOKEN_HEADER, CSRF_HEADER};
use arkdash_common::EndpointManager;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Error body returned by the backend
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub message: String,
}

impl ApiError {
    pub fn user_message(&self) -> String {
        match self.status {
            401 => "Your session has expired. Please log in again.".to_string(),
            403 => "You don't have permission to perform this action.".to_string(),
            404 => "The requested resource was not found.".to_string(),
            409 if self.message.contains("already exists") => {
                "A resource with this name already exists.".to_string()
            }
            _ if !self.message.is_empty() => self.message.clone(),
            _ => self.error.clone(),
        }
    }
}

/// CSRF action a mutating request is authorised for
#[derive(Debug, Clone, Copy)]
pub struct Csrf<'a> {
    pub tenant: &'a str,
    pub action: &'a str,
}

impl<'a> Csrf<'a> {
    pub fn new(tenant: &'a str, action: &'a str) -> Self {
        Self { tenant, action }
    }
}

pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            token: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn set_token(&self, token: String) {
        let mut t = self.token.write().await;
        *t = Some(token);
    }

    pub async fn get_token(&self) -> Option<String> {
        let t = self.token.read().await;
        t.clone()
    }

    pub async fn clear_token(&self) {
        let mut t = self.token.write().await;
        *t = None;
    }

    /// Absolute URL of a backend path such as `api/v1/node`
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Build request with the session token header
    async fn build_request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = self.url(path);
        tracing::debug!(%method, %url, "request");
        let mut request = self.client.request(method, &url);

        if let Some(token) = self.get_token().await {
            request = request.header(AUTH_TOKEN_HEADER, token);
        }

        request
    }

    /// Build a request carrying a CSRF token when one is required
    async fn guarded_request(
        &self,
        method: reqwest::Method,
        path: &str,
        csrf: Option<Csrf<'_>>,
    ) -> Result<reqwest::RequestBuilder> {
        let request = self.build_request(method, path).await;
        match csrf {
            Some(csrf) => {
                let token = self.csrf_token(csrf).await?;
                Ok(request.header(CSRF_HEADER, token))
            }
            None => Ok(request),
        }
    }

    /// Fetch the CSRF token for one action
    pub async fn csrf_token(&self, csrf: Csrf<'_>) -> Result<String> {
        let path = EndpointManager::csrf_token(csrf.tenant, csrf.action);
        let token: CsrfToken = self.get(&path).await?;
        Ok(token.token)
    }

    async fn send(request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            let parsed = serde_json::from_str::<ApiError>(&error_text)
                .ok()
                .filter(|e| !e.message.is_empty() || !e.error.is_empty());
            if let Some(mut error) = parsed {
                error.status = status.as_u16();
                anyhow::bail!("API request failed: {} - {}", status, error.user_message());
            }
            anyhow::bail!("API request failed: {} - {}", status, error_text);
        }

        Ok(response)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = Self::send(self.build_request(reqwest::Method::GET, path).await).await?;
        let data = response.json().await?;
        Ok(data)
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
        csrf: Option<Csrf<'_>>,
    ) -> Result<T> {
        let request = self.guarded_request(reqwest::Method::POST, path, csrf).await?;
        let response = Self::send(request.json(body)).await?;
        let data = response.json().await?;
        Ok(data)
    }

    pub async fn post_empty<B: Serialize>(&self, path: &str, body: &B, csrf: Option<Csrf<'_>>) -> Result<()> {
        let request = self.guarded_request(reqwest::Method::POST, path, csrf).await?;
        Self::send(request.json(body)).await?;
        Ok(())
    }

    pub async fn put_empty<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        query: &[(&str, String)],
        csrf: Option<Csrf<'_>>,
    ) -> Result<()> {
        let request = self.guarded_request(reqwest::Method::PUT, path, csrf).await?;
        Self::send(request.query(query).json(body)).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str, csrf: Option<Csrf<'_>>) -> Result<()> {
        let request = self.guarded_request(reqwest::Method::DELETE, path, csrf).await?;
        Self::send(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Local backend answering each connection with the next canned response.
    /// Resolves to the lowercased text of every request it received.
    async fn backend(responses: Vec<(u16, &'static str)>) -> (ApiClient, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().await.unwrap();
                requests.push(read_request(&mut stream).await);

                let reply = format!(
                    "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                stream.write_all(reply.as_bytes()).await.unwrap();
                stream.shutdown().await.unwrap();
            }
            requests
        });

        let api = ApiClient {
            base_url: format!("http://{}", addr),
            client: reqwest::Client::builder().no_proxy().build().unwrap(),
            token: Arc::new(RwLock::new(None)),
        };
        (api, handle)
    }

    async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
        let mut data = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&data).to_lowercase();
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if data.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&data).to_lowercase()
    }

    #[test]
    fn test_url_joining() {
        let api = ApiClient::new("http://localhost:9090/");
        assert_eq!(api.url("api/v1/node"), "http://localhost:9090/api/v1/node");
        assert_eq!(api.url("/api/v1/node"), "http://localhost:9090/api/v1/node");
    }

    #[tokio::test]
    async fn test_token_header() {
        let api = ApiClient::new("http://localhost:9090");
        api.set_token("abc.def".to_string()).await;

        let request = api
            .build_request(reqwest::Method::GET, "api/v1/tenants/acme/pod/default")
            .await
            .build()
            .unwrap();

        assert_eq!(request.url().as_str(), "http://localhost:9090/api/v1/tenants/acme/pod/default");
        assert_eq!(request.headers().get(AUTH_TOKEN_HEADER).unwrap(), "abc.def");
    }

    #[tokio::test]
    async fn test_no_token_after_clear() {
        let api = ApiClient::new("http://localhost:9090");
        api.set_token("abc".to_string()).await;
        api.clear_token().await;

        let request = api
            .build_request(reqwest::Method::DELETE, "api/v1/node/n1")
            .await
            .build()
            .unwrap();
        assert!(request.headers().get(AUTH_TOKEN_HEADER).is_none());
        assert_eq!(request.method(), reqwest::Method::DELETE);
    }

    #[test]
    fn test_api_error_messages() {
        let error: ApiError =
            serde_json::from_str(r#"{"status": 404, "error": "NotFound", "message": "pods \"x\" not found"}"#)
                .unwrap();
        assert_eq!(error.user_message(), "The requested resource was not found.");

        let error: ApiError =
            serde_json::from_str(r#"{"status": 409, "message": "namespace already exists"}"#).unwrap();
        assert_eq!(error.user_message(), "A resource with this name already exists.");

        let error: ApiError = serde_json::from_str(r#"{"status": 500, "error": "Internal"}"#).unwrap();
        assert_eq!(error.user_message(), "Internal");
    }

    #[tokio::test]
    async fn test_guarded_post_sends_fetched_csrf_token() {
        let (api, handle) = backend(vec![(200, r#"{"token":"tok-42"}"#), (200, "{}")]).await;
        api.set_token("jwe".to_string()).await;

        api.post_empty(
            "api/v1/namespace",
            &serde_json::json!({"name": "team-a"}),
            Some(Csrf::new("acme", "namespace")),
        )
        .await
        .unwrap();

        let requests = handle.await.unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].starts_with("get /api/v1/tenants/acme/csrftoken/namespace "));
        assert!(requests[0].contains("jwetoken: jwe"));
        assert!(requests[1].starts_with("post /api/v1/namespace "));
        assert!(requests[1].contains("x-csrf-token: tok-42"));
        assert!(requests[1].contains(r#"{"name":"team-a"}"#));
    }

    #[tokio::test]
    async fn test_failed_csrf_fetch_stops_request() {
        let (api, handle) = backend(vec![(403, r#"{"status":403,"error":"Forbidden"}"#)]).await;

        let error = api
            .delete("api/v1/tenants/acme/_raw/pod/namespace/ns1/name/p1", Some(Csrf::new("acme", "pod")))
            .await
            .unwrap_err();
        assert!(error.to_string().contains("403"));

        let requests = handle.await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].contains("/csrftoken/pod"));
    }

    #[tokio::test]
    async fn test_error_body_rendered_for_user() {
        let (api, handle) = backend(vec![
            (404, r#"{"status":404,"error":"NotFound","message":"pods \"x\" not found"}"#),
            (500, "backend exploded"),
        ])
        .await;

        let error = api.get::<Value>("api/v1/tenants/acme/pod/ns1/x").await.unwrap_err();
        let message = error.to_string();
        assert!(message.starts_with("API request failed: 404"));
        assert!(message.ends_with("The requested resource was not found."));

        let error = api.get::<Value>("api/v1/node").await.unwrap_err();
        assert!(error.to_string().ends_with("- backend exploded"));

        handle.await.unwrap();
    }
}
