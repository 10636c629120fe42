//! Network engine speaking to an HTTP synthesis endpoint.

use super::{describe_body, fill_template, SpeechEngine, TransportResponse};
use crate::descriptors::EngineConfig;
use crate::error::{VoxError, VoxResult};
use crate::params::ResolvedParams;
use crate::stream::ChunkSink;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// HTTP method of a request template
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET without a body
    #[default]
    Get,
    /// POST with the rendered body
    Post,
}

/// Request template with `{{text}}`, `{{rate}}`, `{{pitch}}`, `{{volume}}`
/// placeholders.
///
/// Text is URL-encoded in `url` and inserted verbatim in `body`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpRequestTemplate {
    /// Endpoint URL
    pub url: String,
    /// Request method
    pub method: HttpMethod,
    /// Body template for POST requests
    pub body: Option<String>,
    /// Extra request headers
    pub headers: BTreeMap<String, String>,
}

/// Engine backed by an HTTP endpoint
#[derive(Debug)]
pub struct HttpEngine {
    config: EngineConfig,
    request: HttpRequestTemplate,
    timeout: Duration,
    user_agent: String,
    client: Option<reqwest::Client>,
}

impl HttpEngine {
    /// Create an engine; the HTTP client is built in `on_load`
    #[must_use]
    pub fn new(config: EngineConfig, request: HttpRequestTemplate) -> Self {
        Self {
            config,
            request,
            timeout: Duration::from_secs(30),
            user_agent: format!("voxbridge/{}", crate::VERSION),
            client: None,
        }
    }

    /// Set the per-request timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent header
    #[must_use]
    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Request template in use
    #[must_use]
    pub const fn request(&self) -> &HttpRequestTemplate {
        &self.request
    }

    fn client(&self) -> VoxResult<&reqwest::Client> {
        self.client
            .as_ref()
            .ok_or_else(|| VoxError::lifecycle("HTTP engine used before on_load"))
    }

    /// Render the URL and optional body for one utterance
    fn render(&self, text: &str, params: &ResolvedParams) -> (String, Option<String>) {
        let text = self.config.speech_rule.apply(text);
        let url = fill_template(&self.request.url, &urlencoding::encode(&text), params);
        let body = match self.request.method {
            HttpMethod::Get => None,
            HttpMethod::Post => self
                .request
                .body
                .as_deref()
                .map(|template| fill_template(template, &text, params)),
        };
        (url, body)
    }

    async fn send(&self, text: &str, params: &ResolvedParams) -> VoxResult<reqwest::Response> {
        let client = self.client()?;
        let (url, body) = self.render(text, params);
        debug!("HTTP engine requesting {}", url);

        let mut builder = match self.request.method {
            HttpMethod::Get => client.get(&url),
            HttpMethod::Post => client.post(&url),
        };
        for (name, value) in &self.request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        Ok(builder.send().await?)
    }

    async fn server_error(response: reqwest::Response) -> VoxError {
        let status = response.status().as_u16();
        let body = response.bytes().await.ok();
        warn!("HTTP engine got status {}", status);
        VoxError::server(status, describe_body(body.as_deref()))
    }
}

#[async_trait]
impl SpeechEngine for HttpEngine {
    fn type_tag(&self) -> &'static str {
        "http"
    }

    fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn on_load(&mut self) -> VoxResult<()> {
        if self.client.is_some() {
            return Ok(());
        }
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.clone())
            .build()?;
        self.client = Some(client);
        info!("HTTP engine loaded for {}", self.request.url);
        Ok(())
    }

    async fn on_destroy(&mut self) {
        self.client = None;
    }

    async fn synthesize_buffer(&self, text: &str, params: &ResolvedParams) -> VoxResult<Bytes> {
        let response = self.send(text, params).await?;
        if !response.status().is_success() {
            return Err(Self::server_error(response).await);
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(VoxError::empty_audio("endpoint returned an empty body"));
        }
        debug!("HTTP engine received {} bytes", audio.len());
        Ok(audio)
    }

    async fn synthesize_stream(
        &self,
        text: &str,
        params: &ResolvedParams,
        chunk_size_hint: usize,
        sink: &mut ChunkSink,
    ) -> VoxResult<()> {
        let response = self.send(text, params).await?;
        if !response.status().is_success() {
            return Err(Self::server_error(response).await);
        }

        let mut frames = response.bytes_stream();
        while let Some(frame) = frames.next().await {
            let frame = frame?;
            if chunk_size_hint == 0 || frame.len() <= chunk_size_hint {
                sink.send(frame).await?;
                continue;
            }
            let mut offset = 0;
            while offset < frame.len() {
                let end = (offset + chunk_size_hint).min(frame.len());
                sink.send(frame.slice(offset..end)).await?;
                offset = end;
            }
        }
        debug!("HTTP engine streamed {} chunks", sink.chunks_sent());
        Ok(())
    }

    async fn fetch_response(
        &self,
        text: &str,
        params: &ResolvedParams,
    ) -> VoxResult<TransportResponse> {
        let response = self.send(text, params).await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;

        Ok(TransportResponse {
            status,
            body: (!body.is_empty()).then_some(body),
            content_type,
        })
    }
}
