//! Provider configuration and factory
//!
//! A [`ProviderConfig`] is an explicit description of which provider to talk
//! to and where; [`build_provider`] turns one into a ready client handle.
//! There is no global registry or injection container - callers own their
//! config and the handle it produces.

use crate::aws::AwsNodes;
use crate::credentials::load_credentials;
use crate::dimensiondata::DimensionDataNodes;
use crate::error::{Error, Result};
use crate::gce::GceNodes;
use crate::local::LocalProvider;
use crate::openstack::{OpenStackClient, OpenStackNodes};
use crate::provider::{NodeProvider, ProviderKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

/// Configuration for building one provider client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Which provider to build
    pub kind: ProviderKind,

    /// Region/zone preference
    #[serde(default)]
    pub region: Option<String>,

    /// Project / tenant / organization identifier, where the provider
    /// needs one (GCE project, Dimension Data org)
    #[serde(default)]
    pub project: Option<String>,

    /// GCE zone
    #[serde(default)]
    pub zone: Option<String>,

    /// API endpoint override (identity URL for OpenStack, base URL for
    /// Dimension Data)
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl ProviderConfig {
    /// Create a config for a provider with everything else defaulted
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            region: None,
            project: None,
            zone: None,
            endpoint: None,
        }
    }

    /// Set region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set project/tenant/organization
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Set endpoint override
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Load configuration from a YAML file
    pub async fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(Error::config(format!("no such file: {}", path.display())));
        }

        let content = fs::read_to_string(path).await?;
        let config: ProviderConfig = serde_yaml::from_str(&content)?;

        Ok(config)
    }

    /// Load configuration for a provider from the default location
    /// (`~/.nimbus/config.yaml`), falling back to a bare config.
    pub async fn load_default(kind: ProviderKind) -> Result<Self> {
        if let Ok(home) = std::env::var("HOME") {
            let path = PathBuf::from(home).join(".nimbus/config.yaml");
            if path.exists() {
                let config = Self::load_from_file(&path).await?;
                if config.kind == kind {
                    return Ok(config);
                }
            }
        }

        Ok(Self::new(kind))
    }
}

/// Build a provider client from a configuration struct.
///
/// Credentials are resolved through [`crate::credentials::load_credentials`]
/// (environment first, then file) as part of construction.
pub async fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn NodeProvider>> {
    match config.kind {
        ProviderKind::Aws => {
            let provider = match &config.region {
                Some(region) => AwsNodes::with_region(region.clone()).await?,
                None => AwsNodes::new().await?,
            };
            Ok(Arc::new(provider))
        }
        ProviderKind::Gce => {
            let creds = load_credentials(ProviderKind::Gce).await?;
            let project = config
                .project
                .clone()
                .or_else(|| creds.get("project_id").map(String::from))
                .ok_or_else(|| Error::config("GCE requires a project id"))?;
            let zone = config
                .zone
                .clone()
                .unwrap_or_else(|| "us-central1-a".to_string());
            let token = creds.require("access_token")?.to_string();

            Ok(Arc::new(GceNodes::new(project, zone, token)))
        }
        ProviderKind::Rackspace => {
            let creds = load_credentials(ProviderKind::Rackspace).await?;
            let client = OpenStackClient::new(config.endpoint.clone(), creds, config.region.clone());
            Ok(Arc::new(OpenStackNodes::new(Arc::new(client))))
        }
        ProviderKind::DimensionData => {
            let creds = load_credentials(ProviderKind::DimensionData).await?;
            let org = config
                .project
                .clone()
                .ok_or_else(|| Error::config("Dimension Data requires an organization id"))?;

            Ok(Arc::new(DimensionDataNodes::new(
                config.endpoint.clone(),
                org,
                creds,
            )?))
        }
        ProviderKind::Local => Ok(Arc::new(LocalProvider::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_yaml_round_trip() {
        let config = ProviderConfig::new(ProviderKind::Rackspace)
            .with_region("DFW")
            .with_endpoint("https://identity.example.com/v2.0");

        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: ProviderConfig = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(parsed.kind, ProviderKind::Rackspace);
        assert_eq!(parsed.region.as_deref(), Some("DFW"));
        assert_eq!(
            parsed.endpoint.as_deref(),
            Some("https://identity.example.com/v2.0")
        );
    }

    #[test]
    fn test_config_yaml_defaults() {
        let parsed: ProviderConfig = serde_yaml::from_str("kind: aws\n").unwrap();
        assert_eq!(parsed.kind, ProviderKind::Aws);
        assert!(parsed.region.is_none());
        assert!(parsed.endpoint.is_none());
    }

    #[tokio::test]
    async fn test_build_local_provider() {
        let config = ProviderConfig::new(ProviderKind::Local);
        let provider = build_provider(&config).await.unwrap();
        assert_eq!(provider.kind(), ProviderKind::Local);
    }
}
