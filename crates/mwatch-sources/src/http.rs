//! Shared HTTP plumbing for the adapters.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::error::SourceError;
use crate::types::SourcesConfig;

/// Longest upstream error body kept in a [`SourceError::Api`].
const ERROR_BODY_LIMIT: usize = 300;

/// Build the client all adapters share.
///
/// # Errors
///
/// Returns [`SourceError::Http`] if the TLS backend cannot be initialised.
pub fn build_client(config: &SourcesConfig) -> Result<reqwest::Client, SourceError> {
    let client = reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()?;
    Ok(client)
}

/// Send `request` and return the body, turning non-2xx replies into
/// [`SourceError::Api`].
pub(crate) async fn send_text(
    request: reqwest::RequestBuilder,
    source_id: &'static str,
) -> Result<String, SourceError> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(SourceError::Api {
            source_id,
            status: status.as_u16(),
            body: body.chars().take(ERROR_BODY_LIMIT).collect(),
        });
    }
    Ok(body)
}

/// Like [`send_text`], then decode the body as JSON.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    source_id: &'static str,
) -> Result<T, SourceError> {
    let body = send_text(request, source_id).await?;
    serde_json::from_str(&body).map_err(|e| SourceError::Parse {
        source_id,
        reason: e.to_string(),
    })
}
