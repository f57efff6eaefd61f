//! HTTP transport on reqwest
//!
//! Handles the two login schemes of Jazz servers: the form challenge
//! (signalled by the `x-com-ibm-team-repository-web-auth-msg` header) and
//! basic authentication (a `401` carrying `www-authenticate`). Session
//! cookies are kept by the client's cookie store.

use super::{Response, Transport};
use crate::config::ClientConfig;
use crate::document::{Document, MediaType};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, WWW_AUTHENTICATE};
use reqwest::{Client, Method, StatusCode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use url::Url;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

const AUTH_MSG_HEADER: &str = "x-com-ibm-team-repository-web-auth-msg";
const AUTH_REQUIRED: &str = "authrequired";
const LOGIN_PATH: &str = "jts/j_security_check";

/// Sanitize response body for logging
/// Truncates long responses and drops control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.chars().count() > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control(), "")
}

/// Transport talking to a Jazz server over HTTPS
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    user: String,
    password: String,
    basic_auth: AtomicBool,
}

impl HttpTransport {
    /// Create a new transport for the configured server
    pub fn new(config: &ClientConfig, password: &str) -> Result<Self> {
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .with_context(|| format!("Invalid base URL \"{}\"", config.base_url))?;

        let client = Client::builder()
            .user_agent(concat!("jazz-client/", env!("CARGO_PKG_VERSION")))
            .cookie_store(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            user: config.user.clone(),
            password: password.to_string(),
            basic_auth: AtomicBool::new(false),
        })
    }

    /// Resolve a request URL against the server root.
    pub fn build_url(&self, url: &str) -> Result<Url> {
        if url.starts_with("http:") || url.starts_with("https:") {
            Url::parse(url).with_context(|| format!("Invalid URL \"{url}\""))
        } else {
            self.base_url
                .join(url)
                .with_context(|| format!("Invalid relative URL \"{url}\""))
        }
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        content_type: &str,
        body: Option<Vec<u8>>,
        configuration: Option<&str>,
    ) -> Result<reqwest::Response> {
        let url = self.build_url(url)?;
        let request = RawRequest {
            content_type,
            configuration,
        };
        let response = self
            .send_raw(method.clone(), url.clone(), &request, body.clone(), true)
            .await?;

        // form challenge
        if let Some(auth_msg) = header(&response, AUTH_MSG_HEADER) {
            if auth_msg != AUTH_REQUIRED {
                bail!("server authentication error: {}", auth_msg);
            }
            tracing::debug!("Login to {} as {} (form challenge)", self.base_url, self.user);

            let mut login = self.base_url.join(LOGIN_PATH)?;
            login
                .query_pairs_mut()
                .append_pair("j_username", &self.user)
                .append_pair("j_password", &self.password);
            let login_response = self
                .send_raw(Method::GET, login, &request, None, false)
                .await?;
            if let Some(auth_msg) = header(&login_response, AUTH_MSG_HEADER) {
                bail!("server authentication failed: {}", auth_msg);
            }

            return self.send_raw(method, url, &request, body, true).await;
        }

        // basic auth
        if response.status() == StatusCode::UNAUTHORIZED
            && response.headers().contains_key(WWW_AUTHENTICATE)
        {
            tracing::debug!("Login to {} as {} (basic auth)", self.base_url, self.user);
            self.basic_auth.store(true, Ordering::Relaxed);

            let response = self.send_raw(method, url, &request, body, true).await?;
            if response.status() == StatusCode::UNAUTHORIZED {
                bail!("server authentication failed");
            }
            return Ok(response);
        }

        if response.status() == StatusCode::UNAUTHORIZED {
            bail!("unknown auth method");
        }
        Ok(response)
    }

    async fn send_raw(
        &self,
        method: Method,
        url: Url,
        raw: &RawRequest<'_>,
        body: Option<Vec<u8>>,
        log: bool,
    ) -> Result<reqwest::Response> {
        if log {
            tracing::debug!("{} {}", method, url);
        }

        let mut request = self
            .client
            .request(method, url)
            .header(ACCEPT, raw.content_type)
            .header(CONTENT_TYPE, raw.content_type)
            .header("OSLC-Core-Version", "2.0");

        if let Some(configuration) = raw.configuration {
            request = request.header("Configuration-Context", configuration);
        }
        if self.basic_auth.load(Ordering::Relaxed) {
            request = request.basic_auth(&self.user, Some(&self.password));
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        request.send().await.context("Failed to send request")
    }
}

/// Headers that stay the same across the login round trip
struct RawRequest<'a> {
    content_type: &'a str,
    configuration: Option<&'a str>,
}

fn header(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(
        &self,
        url: &str,
        accept: MediaType,
        configuration: Option<&str>,
    ) -> crate::Result<Response> {
        let response = self
            .send(Method::GET, url, accept.as_str(), None, configuration)
            .await?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
        }

        // error pages are often HTML; keep the status and drop the body
        let document = match Document::parse(&body, accept) {
            Ok(document) => document,
            Err(_) if !status.is_success() => Document::Empty,
            Err(e) => return Err(e),
        };

        Ok(Response::new(status.as_u16(), document))
    }

    async fn put(
        &self,
        url: &str,
        content_type: &str,
        body: Vec<u8>,
        configuration: Option<&str>,
    ) -> crate::Result<u16> {
        let response = self
            .send(Method::PUT, url, content_type, Some(body), configuration)
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
        }
        Ok(status.as_u16())
    }
}
