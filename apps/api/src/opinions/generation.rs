//! Generation Client: one bounded, retried call to the text provider.
//!
//! Each attempt is wrapped in a timeout. A transient failure gets exactly one
//! more attempt after a fixed backoff; policy, quota and rejected failures are
//! returned immediately. Dropping the returned future drops the in-flight
//! provider call with it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::llm_client::{ProviderError, TextProvider};
use crate::models::student::{GenerationRequest, RawResponse};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const RETRY_BACKOFF: Duration = Duration::from_millis(500);
/// One initial attempt plus one retry.
const MAX_ATTEMPTS: u32 = 2;

#[derive(Clone)]
pub struct GenerationClient {
    provider: Arc<dyn TextProvider>,
    timeout: Duration,
}

impl GenerationClient {
    pub fn new(provider: Arc<dyn TextProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub async fn generate(&self, request: &GenerationRequest) -> Result<RawResponse, ProviderError> {
        let mut attempt = 1;
        loop {
            let started = Instant::now();
            let result = self.attempt(request).await;
            let latency_ms = started.elapsed().as_millis();

            match result {
                Ok(text) => {
                    info!(
                        "Generation attempt {} on {} succeeded in {}ms ({} chars)",
                        attempt,
                        request.model,
                        latency_ms,
                        text.chars().count()
                    );
                    return Ok(RawResponse {
                        text,
                        model: request.model.clone(),
                        attempts: attempt,
                    });
                }
                Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                    warn!(
                        "Generation attempt {} on {} failed after {}ms: {}. Retrying in {}ms",
                        attempt,
                        request.model,
                        latency_ms,
                        e,
                        RETRY_BACKOFF.as_millis()
                    );
                    tokio::time::sleep(RETRY_BACKOFF).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(
                        "Generation attempt {} on {} failed after {}ms: {}",
                        attempt, request.model, latency_ms, e
                    );
                    return Err(e);
                }
            }
        }
    }

    async fn attempt(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let call = self.provider.generate_text(
            &request.model,
            &request.prompt,
            request.target_length,
        );
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::transient(format!(
                "no response within {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}
