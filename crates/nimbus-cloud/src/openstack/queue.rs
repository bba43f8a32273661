//! Cloud queues service
//!
//! Every request carries a stable `Client-ID` header; the queueing API uses
//! it to tell producers and consumers apart.

use super::OpenStackClient;
use crate::error::Result;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

const SERVICE: &str = "rax:queues";

/// A message claimed from a queue
#[derive(Debug, Clone, Deserialize)]
pub struct QueuedMessage {
    /// Message location, used for acknowledgement
    pub href: String,
    /// Remaining time-to-live in seconds
    #[serde(default)]
    pub ttl: u32,
    /// Seconds since the message was posted
    #[serde(default)]
    pub age: u32,
    /// Message body
    pub body: serde_json::Value,
}

/// Cloud queues service client
pub struct CloudQueues {
    client: Arc<OpenStackClient>,
    client_id: String,
}

impl CloudQueues {
    /// Create a service client with a fresh client id
    pub fn new(client: Arc<OpenStackClient>) -> Self {
        Self {
            client,
            client_id: Uuid::new_v4().to_string(),
        }
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        vec![("Client-ID", self.client_id.clone())]
    }

    /// Create a queue; creating an existing queue is a no-op
    pub async fn create_queue(&self, name: &str) -> Result<()> {
        info!("Creating queue: {}", name);

        let response = self
            .client
            .request(
                Method::PUT,
                SERVICE,
                &format!("/queues/{}", name),
                None,
                &self.headers(),
            )
            .await?;
        OpenStackClient::expect_success(response, "queues.create").await?;

        Ok(())
    }

    /// Check whether a queue exists
    pub async fn queue_exists(&self, name: &str) -> Result<bool> {
        let response = self
            .client
            .request(
                Method::GET,
                SERVICE,
                &format!("/queues/{}/stats", name),
                None,
                &self.headers(),
            )
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        OpenStackClient::expect_success(response, "queues.stats").await?;
        Ok(true)
    }

    /// Post a message with the given time-to-live
    pub async fn post_message(
        &self,
        queue: &str,
        body: serde_json::Value,
        ttl: u32,
    ) -> Result<()> {
        debug!("Posting message to {}", queue);

        let payload = json!([ { "ttl": ttl, "body": body } ]);
        let response = self
            .client
            .request(
                Method::POST,
                SERVICE,
                &format!("/queues/{}/messages", queue),
                Some(&payload),
                &self.headers(),
            )
            .await?;
        OpenStackClient::expect_success(response, "messages.post").await?;

        Ok(())
    }

    /// Claim up to `limit` messages for exclusive processing
    pub async fn claim_messages(
        &self,
        queue: &str,
        ttl: u32,
        grace: u32,
        limit: u32,
    ) -> Result<Vec<QueuedMessage>> {
        debug!("Claiming up to {} messages from {}", limit, queue);

        let payload = json!({ "ttl": ttl, "grace": grace });
        let path = format!("/queues/{}/claims?limit={}", queue, limit);
        let response = self
            .client
            .request(Method::POST, SERVICE, &path, Some(&payload), &self.headers())
            .await?;

        // An empty queue yields 204 with no body.
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }

        let response = OpenStackClient::expect_success(response, "claims.create").await?;
        Ok(response.json().await?)
    }

    /// Acknowledge a claimed message by deleting it
    pub async fn delete_message(&self, message: &QueuedMessage) -> Result<()> {
        debug!("Deleting message {}", message.href);

        // The href is already service-relative (including claim id).
        let response = self
            .client
            .request(Method::DELETE, SERVICE, &message.href, None, &self.headers())
            .await?;
        OpenStackClient::expect_success(response, "messages.delete").await?;

        Ok(())
    }

    /// Delete a queue
    pub async fn delete_queue(&self, name: &str) -> Result<()> {
        info!("Deleting queue: {}", name);

        let response = self
            .client
            .request(
                Method::DELETE,
                SERVICE,
                &format!("/queues/{}", name),
                None,
                &self.headers(),
            )
            .await?;
        OpenStackClient::expect_success(response, "queues.delete").await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claimed_message_deserialization() {
        let raw = r#"[
            {
                "href": "/v1/queues/demo/messages/51db6f78c508f17ddc924357?claim_id=51db7067821e727dc24df754",
                "ttl": 300,
                "age": 57,
                "body": { "event": "node.created", "id": "n-123" }
            }
        ]"#;

        let messages: Vec<QueuedMessage> = serde_json::from_str(raw).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].ttl, 300);
        assert_eq!(messages[0].body["event"], "node.created");
        assert!(messages[0].href.contains("claim_id"));
    }
}
