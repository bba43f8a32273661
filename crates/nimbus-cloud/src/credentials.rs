//! Provider credential loading
//!
//! Resolution order is environment first, then the provider's conventional
//! credentials file. Values are kept as an opaque field map so each provider
//! client pulls out what it needs.

use crate::error::{Error, Result};
use crate::provider::ProviderKind;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

/// Loaded credentials for one provider
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Provider these credentials belong to
    pub provider: ProviderKind,

    /// Credential fields (keys are provider-specific)
    fields: HashMap<String, String>,

    /// Whether the values came from the environment
    pub from_env: bool,
}

impl Credentials {
    /// Create empty credentials for a provider
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            fields: HashMap::new(),
            from_env: false,
        }
    }

    /// Add a field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Mark as environment-sourced
    pub fn from_environment(mut self) -> Self {
        self.from_env = true;
        self
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Get a field value or fail
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| {
            Error::credentials_not_found(format!("{} (missing field '{}')", self.provider, key))
        })
    }
}

/// Resolve credentials for a provider: environment first, then file.
pub async fn load_credentials(provider: ProviderKind) -> Result<Credentials> {
    if let Some(creds) = from_environment(provider) {
        debug!(provider = %provider, "Loaded credentials from environment");
        return Ok(creds);
    }

    if let Some(creds) = from_file(provider).await? {
        debug!(provider = %provider, "Loaded credentials from file");
        return Ok(creds);
    }

    Err(Error::credentials_not_found(provider.to_string()))
}

fn from_environment(provider: ProviderKind) -> Option<Credentials> {
    match provider {
        ProviderKind::Aws => {
            let access = env::var("AWS_ACCESS_KEY_ID").ok()?;
            let secret = env::var("AWS_SECRET_ACCESS_KEY").ok()?;

            let mut creds = Credentials::new(provider)
                .with_field("access_key_id", access)
                .with_field("secret_access_key", secret)
                .from_environment();

            if let Ok(token) = env::var("AWS_SESSION_TOKEN") {
                creds = creds.with_field("session_token", token);
            }
            if let Ok(region) = env::var("AWS_DEFAULT_REGION").or_else(|_| env::var("AWS_REGION")) {
                creds = creds.with_field("region", region);
            }

            Some(creds)
        }
        ProviderKind::Gce => {
            let token = env::var("GCE_ACCESS_TOKEN").ok()?;
            let mut creds = Credentials::new(provider)
                .with_field("access_token", token)
                .from_environment();

            if let Ok(project) = env::var("GCE_PROJECT_ID") {
                creds = creds.with_field("project_id", project);
            }

            Some(creds)
        }
        ProviderKind::Rackspace => {
            let username = env::var("OS_USERNAME").ok()?;
            let mut creds = Credentials::new(provider)
                .with_field("username", username)
                .from_environment();

            if let Ok(api_key) = env::var("OS_API_KEY") {
                creds = creds.with_field("api_key", api_key);
            } else if let Ok(password) = env::var("OS_PASSWORD") {
                creds = creds.with_field("password", password);
            } else {
                return None;
            }

            if let Ok(tenant) = env::var("OS_TENANT_NAME") {
                creds = creds.with_field("tenant", tenant);
            }

            Some(creds)
        }
        ProviderKind::DimensionData => {
            let username = env::var("DIMENSIONDATA_USER").ok()?;
            let password = env::var("DIMENSIONDATA_PASSWORD").ok()?;

            Some(
                Credentials::new(provider)
                    .with_field("username", username)
                    .with_field("password", password)
                    .from_environment(),
            )
        }
        // The local provider never authenticates.
        ProviderKind::Local => Some(Credentials::new(provider)),
    }
}

async fn from_file(provider: ProviderKind) -> Result<Option<Credentials>> {
    match provider {
        ProviderKind::Aws => aws_shared_credentials().await,
        _ => Ok(None),
    }
}

/// Parse the `[default]` profile of the AWS shared credentials file.
async fn aws_shared_credentials() -> Result<Option<Credentials>> {
    let path = aws_credentials_path();
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&path).await?;

    let mut access_key = None;
    let mut secret_key = None;
    let mut region = None;
    let mut in_default = false;

    for line in content.lines() {
        let line = line.trim();

        if line.starts_with('[') {
            in_default = line == "[default]";
            continue;
        }

        if in_default && line.contains('=') {
            if let Some((key, value)) = line.split_once('=') {
                match key.trim() {
                    "aws_access_key_id" => access_key = Some(value.trim().to_string()),
                    "aws_secret_access_key" => secret_key = Some(value.trim().to_string()),
                    "region" => region = Some(value.trim().to_string()),
                    _ => {}
                }
            }
        }
    }

    match (access_key, secret_key) {
        (Some(access), Some(secret)) => {
            let mut creds = Credentials::new(ProviderKind::Aws)
                .with_field("access_key_id", access)
                .with_field("secret_access_key", secret);

            if let Some(r) = region {
                creds = creds.with_field("region", r);
            }

            Ok(Some(creds))
        }
        _ => Ok(None),
    }
}

fn aws_credentials_path() -> PathBuf {
    if let Ok(path) = env::var("AWS_SHARED_CREDENTIALS_FILE") {
        PathBuf::from(path)
    } else {
        let home = env::var("HOME").unwrap_or_else(|_| "/root".to_string());
        PathBuf::from(home).join(".aws").join("credentials")
    }
}
