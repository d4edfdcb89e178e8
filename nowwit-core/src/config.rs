use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable holding the model-access credential.
pub const API_KEY_ENV: &str = "FLOCK_API_KEY";

/// Environment variable overriding `[model].model`.
pub const MODEL_ENV: &str = "FLOCK_MODEL";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NowwitConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub collection: CollectionConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.flock.io/v1".to_string(),
            model: "qwen3-30b-a3b-instruct-2507".to_string(),
            max_tokens: 512,
            temperature: 0.9,
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClientConfig {
    pub server_url: String,
    pub timeout_seconds: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8787".to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CollectionConfig {
    pub store_path: String,
    pub daily_limit: u32,
    pub questions: Vec<String>,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            store_path: "~/.nowwit/collection.json".to_string(),
            daily_limit: crate::quota::DEFAULT_DAILY_LIMIT,
            questions: crate::questions::DEFAULT_QUESTIONS
                .iter()
                .map(|q| q.to_string())
                .collect(),
        }
    }
}

impl CollectionConfig {
    /// Store path with `~` and `$VARS` expanded.
    pub fn resolved_store_path(&self) -> PathBuf {
        expand_path(&self.store_path)
    }
}

pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(p) => PathBuf::from(p.into_owned()),
        Err(e) => {
            tracing::warn!(path = raw, error = %e, "Path expansion failed, using it verbatim");
            PathBuf::from(raw)
        }
    }
}

impl NowwitConfig {
    /// Load from a TOML file (optional) layered under `NOWWIT__SECTION__KEY`
    /// environment variables.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("NOWWIT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let mut cfg: Self = s.try_deserialize()?;
        cfg.apply_model_override(std::env::var(MODEL_ENV).ok());
        Ok(cfg)
    }

    /// Parse a TOML document without consulting the environment.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    fn apply_model_override(&mut self, model: Option<String>) {
        if let Some(m) = model.filter(|m| !m.trim().is_empty()) {
            self.model.model = m;
        }
    }

    /// The model credential, if configured and non-empty.
    pub fn api_key() -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let cfg = NowwitConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.http.port, 8787);
        assert_eq!(cfg.model.max_tokens, 512);
        assert!((cfg.model.temperature - 0.9).abs() < f32::EPSILON);
        assert_eq!(cfg.collection.daily_limit, 5);
        assert_eq!(cfg.collection.questions.len(), 5);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let cfg = NowwitConfig::from_toml_str(
            r#"
            [model]
            model = "custom-model"

            [collection]
            daily_limit = 3
            questions = ["하나", "둘"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.model.model, "custom-model");
        assert_eq!(cfg.model.base_url, "https://api.flock.io/v1");
        assert_eq!(cfg.collection.daily_limit, 3);
        assert_eq!(cfg.collection.questions, vec!["하나", "둘"]);
        assert_eq!(cfg.collection.store_path, "~/.nowwit/collection.json");
    }

    #[test]
    fn test_model_override_ignores_blank() {
        let mut cfg = NowwitConfig::default();
        cfg.apply_model_override(Some("  ".to_string()));
        assert_eq!(cfg.model.model, "qwen3-30b-a3b-instruct-2507");
        cfg.apply_model_override(Some("other".to_string()));
        assert_eq!(cfg.model.model, "other");
    }

    #[test]
    fn test_load_missing_file_is_not_an_error() {
        let cfg = NowwitConfig::load("/nonexistent/nowwit-test-config");
        assert!(cfg.is_ok());
    }

    #[test]
    fn test_expand_path_leaves_plain_paths() {
        assert_eq!(expand_path("/tmp/cards.json"), PathBuf::from("/tmp/cards.json"));
    }
}
