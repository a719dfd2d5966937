// Moonshot chat client (HTTP direct, no SDK)

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use super::api::{ChatCompletion, ChatCompletionRequest};
use super::convert::{chunk_to_chat_response, completion_to_response, create_request, RoleCache};
use crate::config::{MoonshotConfig, StreamConfig};
use crate::error::{LlmError, Result};
use crate::prompt::{ChatOptions, Prompt};
use crate::response::ChatResponse;
use crate::streaming::aggregate_sse_body;
use crate::traits::{ChatModel, ChatResponseStream};

pub const DEFAULT_BASE_URL: &str = "https://api.moonshot.cn";
pub const DEFAULT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Moonshot chat client.
///
/// Streaming calls emit one [`ChatResponse`] per window: plain content
/// fragments arrive one by one, a streamed tool call arrives once, fully
/// reassembled.
#[derive(Debug, Clone)]
pub struct MoonshotClient {
    http_client: reqwest::Client,
    base_url: String,
    completions_path: String,
    default_options: ChatOptions,
    stream_config: StreamConfig,
}

impl MoonshotClient {
    /// Client with default endpoint and options
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::builder().api_key(api_key).build()
    }

    pub fn builder() -> MoonshotClientBuilder {
        MoonshotClientBuilder::default()
    }

    /// Client from a loaded provider section
    pub fn from_config(config: MoonshotConfig, stream_config: StreamConfig) -> Result<Self> {
        let mut builder = Self::builder()
            .api_key(config.api_key)
            .stream_config(stream_config);
        if let Some(base_url) = config.base_url {
            builder = builder.base_url(base_url);
        }
        if let Some(path) = config.completions_path {
            builder = builder.completions_path(path);
        }
        if let Some(model) = config.model {
            builder = builder.default_options(ChatOptions::new().model(model));
        }
        builder.build()
    }

    pub fn completions_url(&self) -> String {
        format!("{}{}", self.base_url, self.completions_path)
    }

    pub fn stream_config(&self) -> &StreamConfig {
        &self.stream_config
    }

    /// Non-streaming call; token usage is added to `previous`'s usage.
    pub async fn call_with_previous(
        &self,
        prompt: Prompt,
        previous: Option<&ChatResponse>,
    ) -> Result<ChatResponse> {
        let request = create_request(&prompt, &self.default_options, false)?;
        let response = self.send(&request).await?;

        let completion: ChatCompletion = response.json().await?;
        tracing::debug!(
            id = ?completion.id,
            choices = completion.choices.len(),
            "chat completion received"
        );
        Ok(completion_to_response(completion, previous))
    }

    /// Streaming call; every window's usage is added to `previous`'s usage.
    pub async fn stream_with_previous(
        &self,
        prompt: Prompt,
        previous: Option<ChatResponse>,
    ) -> Result<ChatResponseStream> {
        let request = create_request(&prompt, &self.default_options, true)?;
        let response = self.send(&request).await?;

        let mut windows = aggregate_sse_body(
            response.bytes_stream(),
            self.stream_config.incomplete_tool_call,
        );

        Ok(Box::pin(async_stream::stream! {
            let mut roles = RoleCache::new();
            while let Some(window) = windows.next().await {
                yield window
                    .map(|chunk| chunk_to_chat_response(chunk, &mut roles, previous.as_ref()));
            }
        }))
    }

    async fn send(&self, request: &ChatCompletionRequest) -> Result<reqwest::Response> {
        let url = self.completions_url();
        tracing::debug!(
            %url,
            model = %request.model,
            stream = request.stream,
            messages = request.messages.len(),
            "sending chat completion request"
        );

        let response = self.http_client.post(&url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "moonshot API error");
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatModel for MoonshotClient {
    async fn call(&self, prompt: Prompt) -> Result<ChatResponse> {
        self.call_with_previous(prompt, None).await
    }

    async fn stream(&self, prompt: Prompt) -> Result<ChatResponseStream> {
        self.stream_with_previous(prompt, None).await
    }

    fn default_options(&self) -> ChatOptions {
        self.default_options.clone()
    }
}

/// Builder for MoonshotClient
#[derive(Default)]
pub struct MoonshotClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    completions_path: Option<String>,
    default_options: Option<ChatOptions>,
    stream_config: StreamConfig,
}

impl MoonshotClientBuilder {
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Scheme and host, e.g. "https://api.moonshot.cn"
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn completions_path(mut self, path: impl Into<String>) -> Self {
        self.completions_path = Some(path.into());
        self
    }

    pub fn default_options(mut self, options: ChatOptions) -> Self {
        self.default_options = Some(options);
        self
    }

    pub fn stream_config(mut self, stream_config: StreamConfig) -> Self {
        self.stream_config = stream_config;
        self
    }

    pub fn build(self) -> Result<MoonshotClient> {
        let api_key = self
            .api_key
            .filter(|key| !key.is_empty())
            .ok_or_else(|| LlmError::InvalidRequest("API key is required".to_string()))?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let completions_path = self
            .completions_path
            .unwrap_or_else(|| DEFAULT_COMPLETIONS_PATH.to_string());
        let completions_path = if completions_path.starts_with('/') {
            completions_path
        } else {
            format!("/{completions_path}")
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| LlmError::InvalidHeader(e.to_string()))?,
        );

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(MoonshotClient {
            http_client,
            base_url,
            completions_path,
            default_options: self.default_options.unwrap_or_default(),
            stream_config: self.stream_config,
        })
    }
}
