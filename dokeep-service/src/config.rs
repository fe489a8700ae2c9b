use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ServiceError, ServiceResult};

/// Service configuration, read once at startup.
///
/// Sources, later ones winning: `config.toml` in the working directory (optional),
/// then `DOKEEP__<SECTION>__<KEY>` environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub services: ServicesConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the SQLite database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Root for uploaded files and thumbnails
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,
}

impl StorageConfig {
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("dokeep.db")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            uploads_dir: default_uploads_dir(),
        }
    }
}

/// Size limits
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_bytes: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_size_bytes: default_max_upload_size(),
        }
    }
}

/// Which ingestion strategy the gateway uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineShape {
    /// OCR, prediction and analysis run inside the upload request
    #[default]
    Synchronous,
    /// The upload is queued and the processing service reports back later
    Asynchronous,
}

/// Ingestion pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub shape: PipelineShape,

    /// When false, tag prediction and LLM analysis are skipped
    #[serde(default = "default_ai_enabled")]
    pub ai_enabled: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            shape: PipelineShape::default(),
            ai_enabled: default_ai_enabled(),
        }
    }
}

/// Where the backing services are reachable from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentMode {
    /// Services run on the same host
    #[default]
    Local,
    /// Services are addressed by their internal (container network) names
    #[serde(alias = "docker")]
    Internal,
}

/// Built-in hosts of one backing service
struct DefaultUrls {
    internal: &'static str,
    local: &'static str,
}

const PROCESSING_URLS: DefaultUrls = DefaultUrls {
    internal: "http://dokeep-service:8000",
    local: "http://localhost:8000",
};

const LLM_URLS: DefaultUrls = DefaultUrls {
    internal: "http://llm-service:8001",
    local: "http://localhost:8001",
};

/// Base URLs of one backing service. Unset URLs fall back to the
/// service's built-in hosts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceEndpoint {
    /// Explicit URL; overrides the deployment-mode choice when set
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub internal_url: Option<String>,

    #[serde(default)]
    pub local_url: Option<String>,
}

impl ServiceEndpoint {
    /// Resolve the base URL for a deployment mode, without a trailing slash
    fn resolve(&self, mode: DeploymentMode, defaults: &DefaultUrls) -> String {
        let url = match (&self.base_url, mode) {
            (Some(url), _) => url.as_str(),
            (None, DeploymentMode::Internal) => {
                self.internal_url.as_deref().unwrap_or(defaults.internal)
            }
            (None, DeploymentMode::Local) => self.local_url.as_deref().unwrap_or(defaults.local),
        };
        url.trim_end_matches('/').to_string()
    }
}

/// Per-stage request timeouts
#[derive(Debug, Clone, Deserialize)]
pub struct StageTimeouts {
    #[serde(default = "default_process_timeout_secs")]
    pub process_secs: u64,

    #[serde(default = "default_predict_timeout_secs")]
    pub predict_secs: u64,

    #[serde(default = "default_analyze_timeout_secs")]
    pub analyze_secs: u64,

    #[serde(default = "default_train_timeout_secs")]
    pub train_secs: u64,
}

impl StageTimeouts {
    pub fn process(&self) -> Duration {
        Duration::from_secs(self.process_secs)
    }

    pub fn predict(&self) -> Duration {
        Duration::from_secs(self.predict_secs)
    }

    pub fn analyze(&self) -> Duration {
        Duration::from_secs(self.analyze_secs)
    }

    pub fn train(&self) -> Duration {
        Duration::from_secs(self.train_secs)
    }
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            process_secs: default_process_timeout_secs(),
            predict_secs: default_predict_timeout_secs(),
            analyze_secs: default_analyze_timeout_secs(),
            train_secs: default_train_timeout_secs(),
        }
    }
}

/// External service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServicesConfig {
    #[serde(default)]
    pub deployment_mode: DeploymentMode,

    /// OCR, thumbnail, tag prediction and training service
    #[serde(default)]
    pub processing: ServiceEndpoint,

    /// LLM analysis service
    #[serde(default)]
    pub llm: ServiceEndpoint,

    #[serde(default)]
    pub timeouts: StageTimeouts,
}

impl ServicesConfig {
    pub fn processing_url(&self) -> String {
        self.processing.resolve(self.deployment_mode, &PROCESSING_URLS)
    }

    pub fn llm_url(&self) -> String {
        self.llm.resolve(self.deployment_mode, &LLM_URLS)
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            deployment_mode: DeploymentMode::default(),
            processing: ServiceEndpoint::default(),
            llm: ServiceEndpoint::default(),
            timeouts: StageTimeouts::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from `config.toml` and `DOKEEP__*` environment variables
    pub fn load() -> ServiceResult<Self> {
        Config::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("DOKEEP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ServiceError::Config {
                message: format!("Failed to build config: {}", e),
            })?
            .try_deserialize()
            .map_err(|e| ServiceError::Config {
                message: format!("Failed to deserialize config: {}", e),
            })
    }
}

// ==================== Default Value Functions ====================

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from("./uploads")
}

fn default_max_upload_size() -> u64 {
    10 * 1024 * 1024
}

fn default_ai_enabled() -> bool {
    true
}

fn default_process_timeout_secs() -> u64 {
    300
}

fn default_predict_timeout_secs() -> u64 {
    300
}

fn default_analyze_timeout_secs() -> u64 {
    600
}

fn default_train_timeout_secs() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(toml: &str) -> ServiceConfig {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_empty_source_uses_defaults() {
        let config = from_toml("");

        assert_eq!(config.server.port, 8081);
        assert_eq!(config.pipeline.shape, PipelineShape::Synchronous);
        assert!(config.pipeline.ai_enabled);
        assert_eq!(config.services.deployment_mode, DeploymentMode::Local);
        assert_eq!(config.services.processing_url(), "http://localhost:8000");
        assert_eq!(config.services.llm_url(), "http://localhost:8001");
        assert_eq!(config.services.timeouts.analyze(), Duration::from_secs(600));
        assert_eq!(
            config.storage.database_path(),
            PathBuf::from("./data/dokeep.db")
        );
    }

    #[test]
    fn test_internal_mode_selects_internal_hosts() {
        let config = from_toml(
            r#"
            [services]
            deployment_mode = "docker"
            "#,
        );

        assert_eq!(config.services.deployment_mode, DeploymentMode::Internal);
        assert_eq!(
            config.services.processing_url(),
            "http://dokeep-service:8000"
        );
        assert_eq!(config.services.llm_url(), "http://llm-service:8001");
    }

    #[test]
    fn test_explicit_base_url_overrides_mode() {
        let config = from_toml(
            r#"
            [pipeline]
            shape = "asynchronous"

            [services]
            deployment_mode = "internal"

            [services.processing]
            base_url = "http://ocr.example.test:9000/"
            "#,
        );

        assert_eq!(config.pipeline.shape, PipelineShape::Asynchronous);
        assert_eq!(
            config.services.processing_url(),
            "http://ocr.example.test:9000"
        );
        // Untouched endpoint keeps its defaults
        assert_eq!(config.services.llm_url(), "http://llm-service:8001");
    }

    #[test]
    fn test_base_url_from_environment_alone() {
        let config: ServiceConfig = Config::builder()
            .add_source(
                Environment::with_prefix("DOKEEP")
                    .separator("__")
                    .source(Some(
                        [(
                            "DOKEEP__SERVICES__PROCESSING__BASE_URL".to_string(),
                            "http://ocr.internal:9000".to_string(),
                        )]
                        .into_iter()
                        .collect(),
                    )),
            )
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.services.processing_url(), "http://ocr.internal:9000");
        assert_eq!(config.services.llm_url(), "http://localhost:8001");
    }

    #[test]
    fn test_partial_endpoint_keeps_other_default_host() {
        let config = from_toml(
            r#"
            [services]
            deployment_mode = "internal"

            [services.llm]
            local_url = "http://127.0.0.1:7001"
            "#,
        );

        assert_eq!(config.services.llm_url(), "http://llm-service:8001");
    }
}
