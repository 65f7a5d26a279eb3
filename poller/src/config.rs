use anyhow::{Context, Result, anyhow, ensure};
use aws_config::BehaviorVersion;
use aws_config::environment::EnvironmentVariableCredentialsProvider;
use aws_credential_types::{Credentials, provider::SharedCredentialsProvider};
use aws_sdk_sqs as sqs;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;

use crate::poll::PollSettings;

/// Picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "sqs-poller.toml";
pub const ENV_PREFIX: &str = "SQS_POLLER";
pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    Local,
    #[default]
    Aws,
}

/// Where the SQS client gets its credentials from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Dummy `test`/`test` keys for LocalStack or any explicit endpoint.
    Static,
    /// AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY / AWS_SESSION_TOKEN.
    Environment,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub mode: RuntimeMode,
    pub region: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            mode: RuntimeMode::Aws,
            region: DEFAULT_REGION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SqsConfig {
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub runtime: RuntimeConfig,
    pub sqs: SqsConfig,
    pub recv: PollSettings,
}

impl AppConfig {
    /// Load and MERGE:
    ///  - built-in defaults
    ///  - config file (`config_path`, or `sqs-poller.toml` if present)
    ///  - environment (SQS_POLLER_* with "__" nesting)  — highest precedence
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        builder = match config_path {
            Some(path) => {
                if !Path::new(path).exists() {
                    return Err(anyhow!(
                        "Config not found at '{}'. Create it (e.g. copy config.example.toml) or drop --config.",
                        path
                    ));
                }
                builder.add_source(File::with_name(path))
            }
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        // Environment overrides (e.g., SQS_POLLER_RUNTIME__REGION=eu-west-1)
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        Self::from_builder(builder)
    }

    /// Parse a TOML document on its own, without file or environment layers.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Self::from_builder(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let cfg = builder.build().context("building merged config")?;
        let out: AppConfig = cfg.try_deserialize().context("deserializing AppConfig")?;
        Ok(out)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.runtime.region.trim().is_empty(),
            "runtime.region must not be empty"
        );
        self.recv.validate().context("invalid [recv] settings")
    }

    /// An explicit endpoint implies LocalStack even when `mode = "aws"`.
    pub fn credential_source(&self) -> CredentialSource {
        if matches!(self.runtime.mode, RuntimeMode::Local) || self.sqs.endpoint_url.is_some() {
            CredentialSource::Static
        } else {
            CredentialSource::Environment
        }
    }
}

pub async fn build_sqs_client(cfg: &AppConfig) -> Result<sqs::Client> {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(aws_config::Region::new(cfg.runtime.region.clone()));

    loader = match cfg.credential_source() {
        CredentialSource::Static => {
            let creds = Credentials::new("test", "test", None, None, "localstack");
            loader.credentials_provider(SharedCredentialsProvider::new(creds))
        }
        CredentialSource::Environment => {
            loader.credentials_provider(EnvironmentVariableCredentialsProvider::new())
        }
    };

    let shared_cfg = loader.load().await;

    let mut b = sqs::config::Builder::from(&shared_cfg);
    if let Some(ep) = &cfg.sqs.endpoint_url {
        b = b.endpoint_url(ep.clone());
    }
    Ok(sqs::Client::from_conf(b.build()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poll::ErrorPolicy;
    use std::io::Write;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = AppConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.runtime.region, "us-east-1");
        assert_eq!(cfg.recv.max_messages, 10);
        assert_eq!(cfg.recv.visibility_timeout_secs, 15);
        assert_eq!(cfg.recv.wait_time_secs, 20);
        assert!(cfg.recv.delete_after_read);
        assert_eq!(cfg.recv.on_error, ErrorPolicy::FailFast);
        cfg.validate().unwrap();
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [runtime]
            mode = "local"

            [sqs]
            endpoint_url = "http://localhost:4566"

            [recv]
            visibility_timeout_secs = 10
            on_error = "degrade-to-message"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.runtime.mode, RuntimeMode::Local);
        assert_eq!(cfg.runtime.region, DEFAULT_REGION);
        assert_eq!(cfg.sqs.endpoint_url.as_deref(), Some("http://localhost:4566"));
        assert_eq!(cfg.recv.visibility_timeout_secs, 10);
        assert_eq!(cfg.recv.wait_time_secs, 20);
        assert_eq!(cfg.recv.on_error, ErrorPolicy::DegradeToMessage);
        assert_eq!(cfg.credential_source(), CredentialSource::Static);
    }

    #[test]
    fn unknown_error_policy_is_rejected() {
        let err = AppConfig::from_toml_str("[recv]\non_error = \"ignore\"\n").unwrap_err();
        assert!(format!("{err:#}").contains("deserializing AppConfig"));
    }

    #[test]
    fn invalid_batch_size_fails_validation() {
        let cfg = AppConfig::from_toml_str("[recv]\nmax_messages = 25\n").unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(format!("{err:#}").contains("max_messages"));
    }

    #[test]
    fn blank_region_fails_validation() {
        let cfg = AppConfig::from_toml_str("[runtime]\nregion = \" \"\n").unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn explicit_config_path_must_exist() {
        let err = AppConfig::load(Some("/nonexistent/sqs-poller.toml")).unwrap_err();
        assert!(err.to_string().contains("Config not found"));
    }

    #[test]
    fn explicit_config_file_is_read() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[recv]\nwait_time_secs = 5\ndelete_after_read = false").unwrap();

        let cfg = AppConfig::load(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(cfg.recv.wait_time_secs, 5);
        assert!(!cfg.recv.delete_after_read);
    }

    #[test]
    fn aws_mode_without_endpoint_uses_real_credentials() {
        assert_eq!(
            AppConfig::default().credential_source(),
            CredentialSource::Environment
        );
    }

    #[test]
    fn endpoint_in_aws_mode_switches_to_static_credentials() {
        let cfg = AppConfig::from_toml_str(
            "[runtime]\nmode = \"aws\"\n[sqs]\nendpoint_url = \"http://localhost:4566\"\n",
        )
        .unwrap();
        assert_eq!(cfg.runtime.mode, RuntimeMode::Aws);
        assert_eq!(cfg.credential_source(), CredentialSource::Static);
    }

    #[tokio::test]
    async fn client_targets_configured_region() {
        let cfg = AppConfig::from_toml_str(
            "[runtime]\nregion = \"eu-west-1\"\n[sqs]\nendpoint_url = \"http://localhost:4566\"\n",
        )
        .unwrap();

        let client = build_sqs_client(&cfg).await.unwrap();
        assert_eq!(
            client.config().region().map(ToString::to_string),
            Some("eu-west-1".to_string())
        );
    }
}
