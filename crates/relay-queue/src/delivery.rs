//! Outbound transport for webhook jobs

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::error::DeliveryError;
use crate::job::WebhookJob;

/// Performs one delivery attempt for a job
#[async_trait]
pub trait Deliverer: Send + Sync {
    async fn deliver(&self, job: &WebhookJob) -> Result<(), DeliveryError>;
}

/// HTTP POST delivery with a bounded request timeout.
///
/// Any 2xx response counts as delivered.
#[derive(Debug, Clone)]
pub struct HttpDeliverer {
    client: Client,
    timeout: Duration,
}

impl HttpDeliverer {
    pub fn new(timeout: Duration) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("relay/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DeliveryError::Request(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    /// Caller-supplied headers first, then the JSON content type on top.
    fn build_headers(job: &WebhookJob) -> Result<HeaderMap, DeliveryError> {
        let mut headers = HeaderMap::with_capacity(job.headers.len() + 1);
        for (name, value) in &job.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| DeliveryError::InvalidHeader(name.clone()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| DeliveryError::InvalidHeader(name.to_string()))?;
            headers.insert(name, value);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn classify(&self, err: reqwest::Error) -> DeliveryError {
        if err.is_timeout() {
            DeliveryError::Timeout(self.timeout)
        } else if err.is_connect() {
            DeliveryError::Network(err.to_string())
        } else {
            DeliveryError::Request(err.to_string())
        }
    }
}

#[async_trait]
impl Deliverer for HttpDeliverer {
    async fn deliver(&self, job: &WebhookJob) -> Result<(), DeliveryError> {
        let headers = Self::build_headers(job)?;
        let body = serde_json::to_vec(&job.payload)
            .map_err(|e| DeliveryError::Request(e.to_string()))?;

        let response = self
            .client
            .post(&job.url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        debug!(
            job_id = %job.id,
            url = %job.url,
            status = status.as_u16(),
            "Webhook response received"
        );

        if status.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Status(status.as_u16()))
        }
    }
}
