//! Object storage (Swift) service

use super::OpenStackClient;
use crate::error::Result;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

const SERVICE: &str = "object-store";

/// A storage container
#[derive(Debug, Clone, Deserialize)]
pub struct Container {
    /// Container name
    pub name: String,
    /// Number of objects in the container
    #[serde(default)]
    pub count: u64,
    /// Total bytes stored
    #[serde(default)]
    pub bytes: u64,
}

/// Summary of a stored object
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectSummary {
    /// Object name
    pub name: String,
    /// Object size in bytes
    #[serde(default)]
    pub bytes: u64,
    /// Last modification time, as reported
    #[serde(default)]
    pub last_modified: Option<String>,
    /// Stored content type
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Swift object storage client
pub struct SwiftStorage {
    client: Arc<OpenStackClient>,
}

impl SwiftStorage {
    /// Create a service client
    pub fn new(client: Arc<OpenStackClient>) -> Self {
        Self { client }
    }

    /// Create the container if it does not already exist
    pub async fn ensure_container(&self, name: &str) -> Result<()> {
        debug!("Ensuring container: {}", name);

        let response = self
            .client
            .request(Method::PUT, SERVICE, &format!("/{}", name), None, &[])
            .await?;
        OpenStackClient::expect_success(response, "container.put").await?;

        Ok(())
    }

    /// List all containers
    pub async fn list_containers(&self) -> Result<Vec<Container>> {
        let response = self
            .client
            .request(Method::GET, SERVICE, "/?format=json", None, &[])
            .await?;
        let response = OpenStackClient::expect_success(response, "containers.list").await?;

        Ok(response.json().await?)
    }

    /// Upload an object
    pub async fn upload_object(
        &self,
        container: &str,
        name: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<()> {
        info!("Uploading object {}/{} ({} bytes)", container, name, bytes.len());

        let path = format!("/{}/{}", container, name);
        let response = self
            .client
            .put_raw(SERVICE, &path, bytes, content_type)
            .await?;
        OpenStackClient::expect_success(response, "object.put").await?;

        Ok(())
    }

    /// List objects in a container; `None` when the container does not exist
    pub async fn list_objects(&self, container: &str) -> Result<Option<Vec<ObjectSummary>>> {
        let path = format!("/{}?format=json", container);
        let response = self
            .client
            .request(Method::GET, SERVICE, &path, None, &[])
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = OpenStackClient::expect_success(response, "objects.list").await?;
        Ok(Some(response.json().await?))
    }

    /// Delete an object
    pub async fn delete_object(&self, container: &str, name: &str) -> Result<()> {
        debug!("Deleting object {}/{}", container, name);

        let path = format!("/{}/{}", container, name);
        let response = self
            .client
            .request(Method::DELETE, SERVICE, &path, None, &[])
            .await?;
        OpenStackClient::expect_success(response, "object.delete").await?;

        Ok(())
    }

    /// Delete an empty container
    pub async fn delete_container(&self, name: &str) -> Result<()> {
        debug!("Deleting container {}", name);

        let response = self
            .client
            .request(Method::DELETE, SERVICE, &format!("/{}", name), None, &[])
            .await?;
        OpenStackClient::expect_success(response, "container.delete").await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_listing_deserialization() {
        let raw = r#"[
            { "name": "report.txt", "bytes": 1024, "last_modified": "2024-03-01T10:00:00",
              "content_type": "text/plain" },
            { "name": "logo.png", "bytes": 20480 }
        ]"#;

        let objects: Vec<ObjectSummary> = serde_json::from_str(raw).unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].name, "report.txt");
        assert_eq!(objects[0].bytes, 1024);
        assert_eq!(objects[1].content_type, None);
    }

    #[test]
    fn test_container_deserialization() {
        let raw = r#"[ { "name": "backups", "count": 3, "bytes": 4096 } ]"#;
        let containers: Vec<Container> = serde_json::from_str(raw).unwrap();
        assert_eq!(containers[0].name, "backups");
        assert_eq!(containers[0].count, 3);
    }
}
