//! Cloud DNS service
//!
//! DNS writes are asynchronous: the API acknowledges with a job id, and the
//! job must be polled to completion before the change is live.

use super::OpenStackClient;
use crate::error::Result;
use nimbus_core::{PollOutcome, PollPolicy, Waiter};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

const SERVICE: &str = "rax:dns";

/// Status of an asynchronous DNS job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Job accepted but not started
    Initialized,
    /// Job queued
    Pending,
    /// Job executing
    Running,
    /// Job finished successfully
    Completed,
    /// Job failed
    Error,
    /// Provider reported a status this library does not model
    Unknown,
}

impl JobStatus {
    fn from_api(status: &str) -> Self {
        match status {
            "INITIALIZED" => JobStatus::Initialized,
            "PENDING" => JobStatus::Pending,
            "RUNNING" => JobStatus::Running,
            "COMPLETED" => JobStatus::Completed,
            "ERROR" => JobStatus::Error,
            _ => JobStatus::Unknown,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Initialized => write!(f, "initialized"),
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Error => write!(f, "error"),
            JobStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// An accepted asynchronous job
#[derive(Debug, Clone, Deserialize)]
pub struct DnsJob {
    /// Job identifier for status polling
    #[serde(rename = "jobId")]
    pub job_id: String,
    /// Status at acceptance time
    #[serde(default, rename = "status")]
    status_raw: Option<String>,
}

impl DnsJob {
    /// Status at acceptance time
    pub fn status(&self) -> JobStatus {
        self.status_raw
            .as_deref()
            .map(JobStatus::from_api)
            .unwrap_or(JobStatus::Unknown)
    }
}

/// A DNS zone (domain)
#[derive(Debug, Clone, Deserialize)]
pub struct DnsZone {
    /// Zone id
    pub id: u64,
    /// Zone name
    pub name: String,
    /// Contact email
    #[serde(default, rename = "emailAddress")]
    pub email: Option<String>,
}

/// A DNS record
#[derive(Debug, Clone, Deserialize)]
pub struct DnsRecord {
    /// Record id, assigned by the provider
    #[serde(default)]
    pub id: Option<String>,
    /// Record name
    pub name: String,
    /// Record type (A, AAAA, CNAME, MX, ...)
    #[serde(rename = "type")]
    pub record_type: String,
    /// Record data (e.g. the IP for an A record)
    pub data: String,
    /// TTL in seconds
    #[serde(default)]
    pub ttl: u32,
}

#[derive(Debug, Deserialize)]
struct ZoneListEnvelope {
    #[serde(default)]
    domains: Vec<DnsZone>,
}

#[derive(Debug, Deserialize)]
struct RecordListEnvelope {
    #[serde(default)]
    records: Vec<DnsRecord>,
}

#[derive(Debug, Deserialize)]
struct JobStatusEnvelope {
    #[serde(default)]
    status: Option<String>,
}

/// Cloud DNS service client
pub struct CloudDns {
    client: Arc<OpenStackClient>,
}

impl CloudDns {
    /// Create a service client
    pub fn new(client: Arc<OpenStackClient>) -> Self {
        Self { client }
    }

    /// Create a zone; returns the async job to poll
    pub async fn create_zone(&self, name: &str, email: &str) -> Result<DnsJob> {
        info!("Creating DNS zone: {}", name);

        let body = json!({
            "domains": [{
                "name": name,
                "emailAddress": email,
                "ttl": 3600,
            }]
        });

        let response = self
            .client
            .request(Method::POST, SERVICE, "/domains", Some(&body), &[])
            .await?;
        let response = OpenStackClient::expect_success(response, "domains.create").await?;

        Ok(response.json().await?)
    }

    /// Find a zone by exact name
    pub async fn find_zone(&self, name: &str) -> Result<Option<DnsZone>> {
        debug!("Looking up DNS zone: {}", name);

        let path = format!("/domains?name={}", name);
        let response = self
            .client
            .request(Method::GET, SERVICE, &path, None, &[])
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = OpenStackClient::expect_success(response, "domains.list").await?;
        let envelope: ZoneListEnvelope = response.json().await?;

        Ok(envelope.domains.into_iter().find(|zone| zone.name == name))
    }

    /// Add a record to a zone; returns the async job to poll
    pub async fn add_record(
        &self,
        zone_id: u64,
        name: &str,
        record_type: &str,
        data: &str,
        ttl: u32,
    ) -> Result<DnsJob> {
        info!("Adding {} record {} -> {}", record_type, name, data);

        let body = json!({
            "records": [{
                "name": name,
                "type": record_type,
                "data": data,
                "ttl": ttl,
            }]
        });

        let path = format!("/domains/{}/records", zone_id);
        let response = self
            .client
            .request(Method::POST, SERVICE, &path, Some(&body), &[])
            .await?;
        let response = OpenStackClient::expect_success(response, "records.create").await?;

        Ok(response.json().await?)
    }

    /// List records in a zone
    pub async fn list_records(&self, zone_id: u64) -> Result<Vec<DnsRecord>> {
        let path = format!("/domains/{}/records", zone_id);
        let response = self
            .client
            .request(Method::GET, SERVICE, &path, None, &[])
            .await?;
        let response = OpenStackClient::expect_success(response, "records.list").await?;

        let envelope: RecordListEnvelope = response.json().await?;
        Ok(envelope.records)
    }

    /// Observe a job's current status
    pub async fn job_status(&self, job_id: &str) -> Result<Option<JobStatus>> {
        let path = format!("/status/{}?showDetails=true", job_id);
        let response = self
            .client
            .request(Method::GET, SERVICE, &path, None, &[])
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = OpenStackClient::expect_success(response, "status.get").await?;
        let envelope: JobStatusEnvelope = response.json().await?;

        Ok(Some(
            envelope
                .status
                .as_deref()
                .map(JobStatus::from_api)
                .unwrap_or(JobStatus::Unknown),
        ))
    }

    /// Wait until a job completes or fails
    pub async fn wait_for_job(
        &self,
        job_id: &str,
        policy: &PollPolicy,
    ) -> Result<PollOutcome<JobStatus>> {
        let waiter = Waiter::new(policy.clone())
            .with_match_state(JobStatus::Completed)
            .with_fail_state(JobStatus::Error);

        Ok(waiter.run(|| self.job_status(job_id)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_from_api() {
        assert_eq!(JobStatus::from_api("RUNNING"), JobStatus::Running);
        assert_eq!(JobStatus::from_api("COMPLETED"), JobStatus::Completed);
        assert_eq!(JobStatus::from_api("ERROR"), JobStatus::Error);
        assert_eq!(JobStatus::from_api("???"), JobStatus::Unknown);
    }

    #[test]
    fn test_job_deserialization() {
        let raw = r#"{ "jobId": "852a1e4a-41f2", "status": "RUNNING",
                       "callbackUrl": "https://dns.example.com/status/852a1e4a-41f2" }"#;
        let job: DnsJob = serde_json::from_str(raw).unwrap();
        assert_eq!(job.job_id, "852a1e4a-41f2");
        assert_eq!(job.status(), JobStatus::Running);
    }

    #[test]
    fn test_zone_list_deserialization() {
        let raw = r#"{ "domains": [
            { "id": 2725233, "name": "example.com", "emailAddress": "ops@example.com" }
        ] }"#;
        let envelope: ZoneListEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.domains[0].id, 2725233);
        assert_eq!(envelope.domains[0].name, "example.com");
    }
}
