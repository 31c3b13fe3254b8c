//! HTTP-polling [`ProofSource`]: asks a configured attestation/prover
//! endpoint for a proof of a request key, the same "poll, 404 means not
//! ready yet, 429 means back off" shape the teacher's Iris attestation
//! provider uses for Circle's API.

use alloy_primitives::hex;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, trace};

use crate::error::{RelayerError, Result};
use crate::traits::ProofSource;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ProofStatus {
    Complete,
    Pending,
}

#[derive(Debug, Deserialize)]
struct ProofResponse {
    status: ProofStatus,
    #[serde(default)]
    proof: Option<alloy_primitives::Bytes>,
}

/// Polls `{base_url}/{hex(request)}` for a proof. Suitable for both Polymer's
/// prover endpoint and Wormhole's guardian spy once fronted by a compatible
/// HTTP API; collectors don't know or care which.
#[derive(Debug, Clone)]
pub struct HttpProofSource {
    base_url: String,
    client: Client,
}

impl HttpProofSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::new(),
        }
    }

    fn request_url(&self, request: &[u8]) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), hex::encode(request))
    }
}

#[async_trait]
impl ProofSource for HttpProofSource {
    #[instrument(skip(self, request))]
    async fn fetch_proof(&self, request: &[u8]) -> Result<Option<Vec<u8>>> {
        let url = self.request_url(request);
        trace!(url, "requesting proof");

        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!("proof not found yet");
            return Ok(None);
        }

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(RelayerError::RateLimitExceeded {
                retry_after_seconds: retry_after,
            });
        }

        let response = response
            .error_for_status()
            .map_err(RelayerError::Network)?;

        let parsed: ProofResponse = response.json().await?;
        match parsed.status {
            ProofStatus::Complete => Ok(parsed.proof.map(|b| b.to_vec())),
            ProofStatus::Pending => Ok(None),
        }
    }
}
