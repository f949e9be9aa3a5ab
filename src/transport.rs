//! Upload of a recorded utterance to the assistant service

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::multipart::Form;

use crate::platform::Platform;
use crate::{Config, Error, Result};

/// Persona prompt sent alongside every utterance
pub const ASSISTANT_CONTEXT: &str = "You are a friendly, upbeat voice assistant. \
Listen to the user's question and answer in a warm, conversational tone. \
Keep replies short, two or three sentences, because they are spoken aloud. \
Do not use markdown, lists or emoji.";

/// Path appended to the endpoint base
pub const TALK_PATH: &str = "/talk";

/// Reply audio type requested from the service
pub const REPLY_MIME: &str = "audio/mpeg";

/// Client for the `/talk` endpoint
pub struct TransportClient {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl TransportClient {
    /// Create a client from configuration
    ///
    /// A missing endpoint is accepted here and reported on [`TransportClient::send`].
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    /// Full URL of the talk endpoint
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if no endpoint is configured or it is blank
    pub fn talk_url(&self) -> Result<String> {
        let base = self
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|base| !base.is_empty())
            .ok_or_else(|| Error::Config("assistant endpoint not configured".to_string()))?;

        Ok(format!("{}{TALK_PATH}", base.trim_end_matches('/')))
    }

    /// Upload the recording at `uri` and return the reply audio
    ///
    /// The endpoint is checked before the recording is read or any request is made.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` without an endpoint, `Error::Transport` for a
    /// non-success status, or the read/HTTP error that stopped the upload
    pub async fn send(&self, platform: &dyn Platform, uri: &str) -> Result<Vec<u8>> {
        let url = self.talk_url()?;

        let form = Form::new()
            .part("file", platform.audio_part(uri).await?)
            .text("context", ASSISTANT_CONTEXT);

        tracing::debug!(url = %url, uri, "uploading recording");

        let response = self
            .client
            .post(&url)
            .header(ACCEPT, REPLY_MIME)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Transport {
                status: status.as_u16(),
                body,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.starts_with("audio/") {
            tracing::warn!(content_type = %content_type, "reply is not declared as audio");
        }

        let audio = response.bytes().await?;
        tracing::info!(bytes = audio.len(), "reply received");
        Ok(audio.to_vec())
    }
}
