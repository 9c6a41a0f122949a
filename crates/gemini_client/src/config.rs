use serde::{Deserialize, Serialize};

/// Client configuration, read from `config.toml` and overridden by
/// environment variables. The API key is required; everything else has a
/// default.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeminiConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aligning_model: Option<String>,
}

const CONFIG_FILE_PATH: &str = "config.toml";

pub const DEFAULT_TARGET_MODEL: &str = "gemini-2.5-pro";
pub const DEFAULT_ALIGNING_MODEL: &str = "gemini-2.5-flash";

impl GeminiConfig {
    pub fn new() -> Self {
        let mut config = GeminiConfig::default();

        if std::path::Path::new(CONFIG_FILE_PATH).exists() {
            if let Ok(content) = std::fs::read_to_string(CONFIG_FILE_PATH) {
                if let Ok(file_config) = toml::from_str::<GeminiConfig>(&content) {
                    config = file_config;
                }
            }
        }

        // Environment variables win over the config file
        if let Ok(api_key) = std::env::var("GEMINI_API_KEY") {
            config.api_key = Some(api_key);
        }
        if let Ok(base_url) = std::env::var("GEMINI_BASE_URL") {
            config.base_url = Some(base_url);
        }
        if let Ok(model) = std::env::var("TARGET_MODEL") {
            config.target_model = Some(model);
        }
        if let Ok(model) = std::env::var("ALIGNING_MODEL") {
            config.aligning_model = Some(model);
        }
        config
    }

    pub fn target_model(&self) -> &str {
        self.target_model.as_deref().unwrap_or(DEFAULT_TARGET_MODEL)
    }

    pub fn aligning_model(&self) -> &str {
        self.aligning_model
            .as_deref()
            .unwrap_or(DEFAULT_ALIGNING_MODEL)
    }
}
