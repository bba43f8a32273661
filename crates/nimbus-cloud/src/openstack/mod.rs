//! OpenStack / Rackspace client and services
//!
//! One [`OpenStackClient`] authenticates against Keystone v2, caches the
//! token plus service catalog, and hands out endpoint-resolved requests to
//! the service wrappers in the submodules.

pub mod autoscale;
pub mod balancer;
pub mod compute;
pub mod database;
pub mod dns;
pub mod queue;
pub mod storage;

pub use autoscale::{AutoScale, GroupConfig, GroupState};
pub use balancer::{BalancerState, CreateBalancerRequest, LoadBalancer, LoadBalancers};
pub use compute::OpenStackNodes;
pub use database::{CloudDatabases, DatabaseInstance, DatabaseState};
pub use dns::{CloudDns, DnsRecord, DnsZone, JobStatus};
pub use queue::{CloudQueues, QueuedMessage};
pub use storage::{Container, ObjectSummary, SwiftStorage};

use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::provider::ProviderKind;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, info};

const DEFAULT_IDENTITY: &str = "https://identity.api.rackspacecloud.com/v2.0";

/// Authenticated OpenStack client with a cached token and service catalog
pub struct OpenStackClient {
    identity_endpoint: String,
    creds: Credentials,
    region: Option<String>,
    http_client: reqwest::Client,
    session: RwLock<Option<Session>>,
}

#[derive(Debug, Clone)]
struct Session {
    token: String,
    catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogEntry {
    #[serde(rename = "type")]
    service_type: String,
    #[serde(default)]
    endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogEndpoint {
    #[serde(default)]
    region: Option<String>,
    #[serde(rename = "publicURL")]
    public_url: String,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    access: Access,
}

#[derive(Debug, Deserialize)]
struct Access {
    token: TokenInfo,
    #[serde(default, rename = "serviceCatalog")]
    service_catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    id: String,
}

impl OpenStackClient {
    /// Create a client; authentication happens lazily on first use
    pub fn new(identity_endpoint: Option<String>, creds: Credentials, region: Option<String>) -> Self {
        Self {
            identity_endpoint: identity_endpoint
                .unwrap_or_else(|| DEFAULT_IDENTITY.to_string()),
            creds,
            region,
            http_client: reqwest::Client::new(),
            session: RwLock::new(None),
        }
    }

    /// Region this client prefers when resolving catalog endpoints
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    async fn authenticate(&self) -> Result<Session> {
        let username = self.creds.require("username")?;

        let auth = if let Some(api_key) = self.creds.get("api_key") {
            json!({
                "auth": {
                    "RAX-KSKEY:apiKeyCredentials": {
                        "username": username,
                        "apiKey": api_key,
                    }
                }
            })
        } else {
            let password = self.creds.require("password")?;
            let mut auth = json!({
                "auth": {
                    "passwordCredentials": {
                        "username": username,
                        "password": password,
                    }
                }
            });
            if let Some(tenant) = self.creds.get("tenant") {
                auth["auth"]["tenantName"] = json!(tenant);
            }
            auth
        };

        let url = format!("{}/tokens", self.identity_endpoint.trim_end_matches('/'));
        debug!("Authenticating against {}", url);

        let response = self.http_client.post(&url).json(&auth).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::auth(format!("identity returned {}: {}", status, body)));
        }

        let parsed: AuthResponse = response.json().await?;
        info!("Authenticated with identity service");

        Ok(Session {
            token: parsed.access.token.id,
            catalog: parsed.access.service_catalog,
        })
    }

    async fn session(&self) -> Result<Session> {
        {
            let cached = self.session.read().await;
            if let Some(session) = cached.as_ref() {
                return Ok(session.clone());
            }
        }

        let fresh = self.authenticate().await?;
        let mut cached = self.session.write().await;
        *cached = Some(fresh.clone());
        Ok(fresh)
    }

    async fn invalidate(&self) {
        let mut cached = self.session.write().await;
        *cached = None;
    }

    /// Resolve a service endpoint from the catalog
    pub async fn endpoint(&self, service_type: &str) -> Result<String> {
        let session = self.session().await?;
        Self::endpoint_from_catalog(&session.catalog, service_type, self.region.as_deref())
    }

    fn endpoint_from_catalog(
        catalog: &[CatalogEntry],
        service_type: &str,
        region: Option<&str>,
    ) -> Result<String> {
        let entry = catalog
            .iter()
            .find(|entry| entry.service_type == service_type)
            .ok_or_else(|| {
                Error::api(
                    ProviderKind::Rackspace,
                    format!("service '{}' not in catalog", service_type),
                )
            })?;

        let endpoint = match region {
            Some(region) => entry
                .endpoints
                .iter()
                .find(|ep| ep.region.as_deref() == Some(region))
                .or_else(|| entry.endpoints.first()),
            None => entry.endpoints.first(),
        };

        endpoint
            .map(|ep| ep.public_url.trim_end_matches('/').to_string())
            .ok_or_else(|| {
                Error::api(
                    ProviderKind::Rackspace,
                    format!("service '{}' has no endpoints", service_type),
                )
            })
    }

    /// Issue a request against a catalog service.
    ///
    /// Re-authenticates once when the cached token has expired.
    pub(crate) async fn request(
        &self,
        method: Method,
        service_type: &str,
        path: &str,
        body: Option<&serde_json::Value>,
        headers: &[(&str, String)],
    ) -> Result<reqwest::Response> {
        for attempt in 0..2 {
            let session = self.session().await?;
            let base =
                Self::endpoint_from_catalog(&session.catalog, service_type, self.region.as_deref())?;
            let url = format!("{}{}", base, path);

            let mut builder = self
                .http_client
                .request(method.clone(), &url)
                .header("X-Auth-Token", &session.token);
            for (name, value) in headers {
                builder = builder.header(*name, value.as_str());
            }
            if let Some(body) = body {
                builder = builder.json(body);
            }

            let response = builder.send().await?;
            if response.status() == StatusCode::UNAUTHORIZED && attempt == 0 {
                debug!("Token expired, re-authenticating");
                self.invalidate().await;
                continue;
            }
            return Ok(response);
        }

        unreachable!("request loop always returns within two attempts")
    }

    /// Upload a raw object body (Swift uploads are not JSON)
    pub(crate) async fn put_raw(
        &self,
        service_type: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<reqwest::Response> {
        for attempt in 0..2 {
            let session = self.session().await?;
            let base =
                Self::endpoint_from_catalog(&session.catalog, service_type, self.region.as_deref())?;
            let url = format!("{}{}", base, path);

            let mut builder = self
                .http_client
                .put(&url)
                .header("X-Auth-Token", &session.token)
                .body(bytes.clone());
            if let Some(content_type) = content_type {
                builder = builder.header("Content-Type", content_type);
            }

            let response = builder.send().await?;
            if response.status() == StatusCode::UNAUTHORIZED && attempt == 0 {
                self.invalidate().await;
                continue;
            }
            return Ok(response);
        }

        unreachable!("request loop always returns within two attempts")
    }

    /// Convert an unexpected response into an API error
    pub(crate) async fn expect_success(
        response: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::api(
            ProviderKind::Rackspace,
            format!("{}: {} {}", context, status, body),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<CatalogEntry> {
        serde_json::from_str(
            r#"[
                {
                    "type": "compute",
                    "name": "cloudServersOpenStack",
                    "endpoints": [
                        { "region": "DFW", "publicURL": "https://dfw.servers.example.com/v2/123" },
                        { "region": "ORD", "publicURL": "https://ord.servers.example.com/v2/123" }
                    ]
                },
                {
                    "type": "rax:dns",
                    "endpoints": [ { "publicURL": "https://dns.example.com/v1.0/123" } ]
                }
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint_region_selection() {
        let url =
            OpenStackClient::endpoint_from_catalog(&catalog(), "compute", Some("ORD")).unwrap();
        assert_eq!(url, "https://ord.servers.example.com/v2/123");

        // Unknown region falls back to the first endpoint.
        let url =
            OpenStackClient::endpoint_from_catalog(&catalog(), "compute", Some("SYD")).unwrap();
        assert_eq!(url, "https://dfw.servers.example.com/v2/123");
    }

    #[test]
    fn test_endpoint_missing_service() {
        let err = OpenStackClient::endpoint_from_catalog(&catalog(), "rax:queues", None)
            .unwrap_err();
        assert!(err.to_string().contains("not in catalog"));
    }

    #[test]
    fn test_auth_response_parse() {
        let raw = r#"{
            "access": {
                "token": { "id": "abc123", "expires": "2024-03-02T00:00:00Z" },
                "serviceCatalog": [
                    { "type": "compute", "endpoints": [ { "publicURL": "https://x" } ] }
                ]
            }
        }"#;

        let parsed: AuthResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.access.token.id, "abc123");
        assert_eq!(parsed.access.service_catalog.len(), 1);
    }
}
