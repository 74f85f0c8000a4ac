//! Connected Systems REST API Client
//!
//! HTTP client bound to one sensor hub's API root.

use base64::Engine;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::error::{ApiError, ApiResult};
use super::resource_types::ResourceType;
use crate::models::ResourceCollection;

/// Default API root on an OpenSensorHub node
pub const DEFAULT_API_ROOT: &str = "sensorhub/api";

/// Transport protocol of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl Protocol {
    /// WebSocket scheme matching this protocol
    pub fn ws_scheme(&self) -> &'static str {
        match self {
            Protocol::Http => "ws",
            Protocol::Https => "wss",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::Https => write!(f, "https"),
        }
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            other => Err(format!("unsupported protocol '{}'", other)),
        }
    }
}

/// HTTP Basic credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// `base64(username:password)`, the value after `Basic ` in an Authorization header
    pub fn basic_token(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", self.username, self.password))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Configuration for the REST client
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub protocol: Protocol,
    pub address: String,
    pub port: u16,
    /// API root path below the server (e.g., "sensorhub/api")
    pub api_root: String,
    pub credentials: Option<Credentials>,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::Http,
            address: "localhost".to_string(),
            port: 8181,
            api_root: DEFAULT_API_ROOT.to_string(),
            credentials: None,
            request_timeout_ms: 10_000,
        }
    }
}

/// REST helper for one Connected Systems endpoint
#[derive(Debug, Clone)]
pub struct ApiHelper {
    client: Client,
    config: ApiConfig,
}

impl ApiConfig {
    /// Address as it appears in a URL authority, IPv6 literals bracketed
    pub fn host(&self) -> String {
        if self.address.contains(':') && !self.address.starts_with('[') {
            format!("[{}]", self.address)
        } else {
            self.address.clone()
        }
    }
}

impl ApiHelper {
    /// Create a new client with the given configuration
    pub fn new(config: ApiConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// `protocol://address:port`
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.config.protocol, self.config.host(), self.config.port)
    }

    /// `protocol://address:port/<api_root>`
    pub fn api_root_url(&self) -> String {
        format!("{}/{}", self.base_url(), self.config.api_root.trim_matches('/'))
    }

    /// URL of a collection or item, optionally nested under a parent resource
    pub fn resource_url(
        &self,
        res_type: ResourceType,
        res_id: Option<&str>,
        parent: Option<(ResourceType, &str)>,
    ) -> String {
        let mut url = self.api_root_url();
        if let Some((parent_type, parent_id)) = parent {
            url.push('/');
            url.push_str(parent_type.path_segment());
            url.push('/');
            url.push_str(parent_id);
        }
        url.push('/');
        url.push_str(res_type.path_segment());
        if let Some(id) = res_id {
            url.push('/');
            url.push_str(id);
        }
        url
    }

    /// Fetch one page of a collection
    pub async fn list<T: DeserializeOwned>(
        &self,
        res_type: ResourceType,
        parent: Option<(ResourceType, &str)>,
        query: &[(&str, String)],
    ) -> ApiResult<ResourceCollection<T>> {
        let url = self.resource_url(res_type, None, parent);
        let (_, page) = self.get_page(&url, query).await?;
        Ok(page)
    }

    /// Fetch every page of a collection, following `rel: "next"` links
    pub async fn list_all<T: DeserializeOwned>(
        &self,
        res_type: ResourceType,
        parent: Option<(ResourceType, &str)>,
        query: &[(&str, String)],
    ) -> ApiResult<Vec<T>> {
        let url = self.resource_url(res_type, None, parent);
        let (mut page_url, mut page) = self.get_page::<T>(&url, query).await?;
        let mut items = Vec::new();
        let mut visited = vec![page_url.clone()];

        loop {
            let next = page.next_link().map(|href| resolve_link(&page_url, href)).transpose()?;
            items.append(&mut page.items);

            match next {
                Some(href) if !visited.contains(&href) => {
                    tracing::debug!(url = %href, fetched = items.len(), "Following next page");
                    visited.push(href.clone());
                    (page_url, page) = self.get_page(href.as_str(), &[]).await?;
                }
                _ => break,
            }
        }

        Ok(items)
    }

    /// Fetch a single resource by id
    pub async fn retrieve<T: DeserializeOwned>(&self, res_type: ResourceType, res_id: &str) -> ApiResult<T> {
        let url = self.resource_url(res_type, Some(res_id), None);
        let response = self.send(self.request(reqwest::Method::GET, &url)).await?;
        Ok(response.json().await?)
    }

    /// Create a resource and return the server-assigned id from `Location`
    pub async fn create<B: Serialize + ?Sized>(
        &self,
        res_type: ResourceType,
        body: &B,
        content_type: &str,
        parent: Option<(ResourceType, &str)>,
    ) -> ApiResult<String> {
        let url = self.resource_url(res_type, None, parent);
        let payload = serde_json::to_vec(body)?;

        let builder = self
            .request(reqwest::Method::POST, &url)
            .header(CONTENT_TYPE, content_type)
            .body(payload);
        let response = self.send(builder).await?;

        let id = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|loc| loc.trim_end_matches('/').rsplit('/').next())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or(ApiError::MissingLocation)?;

        tracing::debug!(resource = %res_type, id = %id, "Created resource");
        Ok(id)
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> ApiResult<(Url, ResourceCollection<T>)> {
        let builder = self.request(reqwest::Method::GET, url).query(query);
        let response = self.send(builder).await?;
        let page_url = response.url().clone();
        Ok((page_url, response.json().await?))
    }

    fn request(&self, method: reqwest::Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.config.credentials {
            Some(c) => builder.basic_auth(&c.username, Some(&c.password)),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> ApiResult<Response> {
        let response = builder.send().await.map_err(ApiError::from_send)?;

        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(ApiError::Status {
                status: status.as_u16(),
                message: text,
            })
        }
    }
}

/// Resolve a `links[].href` against the URL of the page it came from
fn resolve_link(page_url: &Url, href: &str) -> ApiResult<Url> {
    page_url.join(href).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", href, e)))
}
