//! # Embeddings Provider
//!
//! Generates vector embeddings by calling an external, OpenAI-compatible
//! embeddings API. The HTTP call is wrapped in the retry policy, and every
//! successful call is recorded in the cost ledger — this is the pattern any
//! other paid-API client in the workspace follows.

use crate::errors::ApiFailure;
use crate::ledger::CostLedger;
use crate::retry::RetryPolicy;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Serialize, Debug)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize, Debug)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
    usage: Option<EmbeddingUsage>,
}

#[derive(Deserialize, Debug)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Deserialize, Debug)]
struct EmbeddingUsage {
    prompt_tokens: u64,
}

/// Generates a vector embedding for `input`.
///
/// Transient provider failures (rate limits, timeouts, overload) are
/// retried under `retry`; the terminal form of any failure is
/// [`ApiFailure`]. The call's token usage lands in `ledger` under the
/// `"embedding"` operation.
pub async fn generate_embedding(
    api_url: &str,
    model: &str,
    input: &str,
    api_key: Option<&str>,
    retry: &RetryPolicy,
    ledger: &CostLedger,
) -> Result<Vec<f32>, ApiFailure> {
    let client = ReqwestClient::new();

    let response: EmbeddingResponse = retry
        .run(|| async {
            let request_body = EmbeddingRequest { model, input };
            debug!(payload = ?request_body, "--> Sending request to embeddings API");

            let mut request_builder = client.post(api_url).json(&request_body);
            if let Some(key) = api_key {
                request_builder = request_builder.bearer_auth(key);
            }

            let response = request_builder.send().await.map_err(|e| e.to_string())?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_default();
                return Err(format!("{status}: {error_text}"));
            }

            response
                .json::<EmbeddingResponse>()
                .await
                .map_err(|e| e.to_string())
        })
        .await?;

    // Some compatible servers omit usage; estimate from word count so the
    // call is still metered.
    let input_tokens = response
        .usage
        .map(|u| u.prompt_tokens)
        .unwrap_or_else(|| input.split_whitespace().count() as u64);
    ledger.record_call("embedding", model, input_tokens, 0);

    response
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| ApiFailure("embeddings API returned no embeddings".to_string()))
}
