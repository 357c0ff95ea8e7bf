use serde::{Deserialize, Serialize};

use super::state::UiTheme;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub advisor: AdvisorConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AdvisorConfig {
    pub model: String,
    pub endpoint: String,
    pub api_key_env: String,
    pub timeout_secs: Option<u64>,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct UiConfig {
    pub theme: UiTheme,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_document_yields_defaults() {
        let config: Config = serde_json::from_str("{}").expect("parse");
        assert_eq!(config, Config::default());
        assert_eq!(config.advisor.model, DEFAULT_MODEL);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"advisor":{"model":"gemini-2.0-flash"},"ui":{"theme":"mono"}}"#)
                .expect("parse");
        assert_eq!(config.advisor.model, "gemini-2.0-flash");
        assert_eq!(config.advisor.api_key_env, DEFAULT_API_KEY_ENV);
        assert_eq!(config.ui.theme, UiTheme::Mono);
    }
}
