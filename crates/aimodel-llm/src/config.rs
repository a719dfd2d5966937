// Configuration layer for provider-agnostic chat model creation

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::streaming::IncompleteToolCallPolicy;
use crate::traits::ChatModel;

/// Type of LLM provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    #[default]
    Moonshot,
}

/// Configuration for the Moonshot provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoonshotConfig {
    pub api_key: String,
    /// Defaults to https://api.moonshot.cn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Defaults to /v1/chat/completions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completions_path: Option<String>,
    /// Default model for calls that do not name one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl MoonshotConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            completions_path: None,
            model: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_completions_path(mut self, path: impl Into<String>) -> Self {
        self.completions_path = Some(path.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Streaming behaviour shared by every provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    #[serde(default)]
    pub incomplete_tool_call: IncompleteToolCallPolicy,
}

/// Provider-specific configuration details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderDetails {
    Moonshot(MoonshotConfig),
}

/// Complete provider configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(flatten)]
    pub details: ProviderDetails,
    #[serde(default)]
    pub stream: StreamConfig,
}

impl ProviderConfig {
    pub fn moonshot(api_key: impl Into<String>) -> Self {
        Self::from_moonshot(MoonshotConfig::new(api_key))
    }

    pub fn from_moonshot(config: MoonshotConfig) -> Self {
        Self {
            details: ProviderDetails::Moonshot(config),
            stream: StreamConfig::default(),
        }
    }

    pub fn with_stream(mut self, stream: StreamConfig) -> Self {
        self.stream = stream;
        self
    }

    pub fn provider_type(&self) -> ProviderType {
        match self.details {
            ProviderDetails::Moonshot(_) => ProviderType::Moonshot,
        }
    }

    /// Load the `[provider]` table from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. AIMODEL_PROVIDER__* environment variables,
    ///    e.g. AIMODEL_PROVIDER__API_KEY or AIMODEL_PROVIDER__STREAM__INCOMPLETE_TOOL_CALL
    pub fn load() -> Result<Self> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let config = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("AIMODEL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::from_loaded(config)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = ConfigLoader::builder()
            .add_source(File::from(path.as_ref()))
            .build()?;

        Self::from_loaded(config)
    }

    fn from_loaded(config: ConfigLoader) -> Result<Self> {
        let provider: ProviderConfig = config.get("provider")?;
        let ProviderDetails::Moonshot(moonshot) = &provider.details;
        if moonshot.api_key.is_empty() {
            let message = "provider.api_key must not be empty".to_string();
            return Err(ConfigError::Message(message).into());
        }
        Ok(provider)
    }
}

/// Factory for creating chat models from configuration
pub struct ClientFactory;

impl ClientFactory {
    pub fn create_chat_model(config: ProviderConfig) -> Result<Arc<dyn ChatModel>> {
        match config.details {
            ProviderDetails::Moonshot(moonshot_config) => {
                let client =
                    crate::moonshot::MoonshotClient::from_config(moonshot_config, config.stream)?;
                Ok(Arc::new(client))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_toml(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("aimodel-config-")
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_moonshot_config() {
        let config = ProviderConfig::moonshot("test-key");
        assert_eq!(config.provider_type(), ProviderType::Moonshot);
        assert_eq!(config.stream.incomplete_tool_call, IncompleteToolCallPolicy::Drop);
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = ProviderConfig::from_moonshot(
            MoonshotConfig::new("test-key")
                .with_base_url("http://localhost:9000")
                .with_model("moonshot-v1-32k"),
        )
        .with_stream(StreamConfig {
            incomplete_tool_call: IncompleteToolCallPolicy::Error,
        });

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains(r#""type":"moonshot""#));
        let deserialized: ProviderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_from_file() {
        let file = write_toml(
            r#"
[provider]
type = "moonshot"
api_key = "sk-file"
completions_path = "/v1/chat/completions"

[provider.stream]
incomplete_tool_call = "error"
"#,
        );
        let config = ProviderConfig::from_file(file.path()).unwrap();

        let ProviderDetails::Moonshot(moonshot) = &config.details;
        assert_eq!(moonshot.api_key, "sk-file");
        assert_eq!(moonshot.base_url, None);
        assert_eq!(config.stream.incomplete_tool_call, IncompleteToolCallPolicy::Error);
    }

    #[test]
    fn test_from_file_rejects_empty_key() {
        let file = write_toml(
            r#"
[provider]
type = "moonshot"
api_key = ""
"#,
        );
        assert!(matches!(
            ProviderConfig::from_file(file.path()),
            Err(crate::error::LlmError::Config(_))
        ));
    }

    #[test]
    fn test_factory_creates_moonshot_model() {
        let config = ProviderConfig::from_moonshot(
            MoonshotConfig::new("sk-test").with_model("moonshot-v1-128k"),
        );
        let model = ClientFactory::create_chat_model(config).unwrap();
        assert_eq!(model.default_options().model.as_deref(), Some("moonshot-v1-128k"));
    }
}
