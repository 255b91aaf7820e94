use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{ensure, Context};
use tb_core::core::{
    validate_tuned_model_id, ApiKey, Credential, CredentialProvider, Hyperparameters, PollPolicy,
};

use crate::config::{AppConfig, AuthMethodConfig, LogFormatConfig};
use crate::credentials::{CachedTokenProvider, OAuthRefresher, StaticCredential};
use crate::outbound::gemini::GeminiClient;

// ---------------------------------------------------------------------------
// AuthSettings: credential source resolved from config and environment
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub enum AuthSettings {
    ApiKey {
        key: Option<ApiKey>,
        /// Where the key was expected to come from, for error messages.
        source: String,
    },
    OAuth {
        token_file: PathBuf,
    },
}

// ---------------------------------------------------------------------------
// RuntimeConfig: fully validated runtime configuration
// ---------------------------------------------------------------------------

pub struct RuntimeConfig {
    /// Base URL including the API version, without a trailing slash.
    pub api_base: String,
    pub request_timeout: Duration,
    pub auth: AuthSettings,
    pub base_model: Option<String>,
    pub display_name: Option<String>,
    pub hyperparameters: Hyperparameters,
    pub poll_policy: PollPolicy,
    pub log_level: String,
    pub log_format: LogFormatConfig,
}

impl RuntimeConfig {
    /// Builds the credential provider; fails when the API key is missing.
    pub fn credential_provider(&self) -> Result<Arc<dyn CredentialProvider>, anyhow::Error> {
        match &self.auth {
            AuthSettings::ApiKey { key: Some(key), .. } => Ok(Arc::new(StaticCredential::new(
                Credential::ApiKey(key.clone()),
            ))),
            AuthSettings::ApiKey { key: None, source } => {
                anyhow::bail!("no API key configured: set {source} or [auth] api_key")
            }
            AuthSettings::OAuth { token_file } => {
                let refresher = OAuthRefresher::new(self.request_timeout)
                    .context("failed to build OAuth HTTP client")?;
                Ok(Arc::new(CachedTokenProvider::new(token_file.clone(), refresher)))
            }
        }
    }

    pub fn gemini_client(&self) -> Result<GeminiClient, anyhow::Error> {
        let credentials = self.credential_provider()?;
        GeminiClient::new(self.api_base.clone(), self.request_timeout, credentials)
            .context("failed to build HTTP client")
    }
}

// ---------------------------------------------------------------------------
// into_runtime: converts raw AppConfig into validated RuntimeConfig
// ---------------------------------------------------------------------------

pub fn into_runtime(config: AppConfig) -> Result<RuntimeConfig, anyhow::Error> {
    into_runtime_with_env(config, |name| std::env::var(name).ok())
}

pub fn into_runtime_with_env(
    config: AppConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<RuntimeConfig, anyhow::Error> {
    let base_url = config.gemini.base_url.trim_end_matches('/');
    ensure!(
        base_url.starts_with("http://") || base_url.starts_with("https://"),
        "gemini.base_url must be an http(s) URL, got {:?}",
        config.gemini.base_url
    );
    let api_version = config.gemini.api_version.trim_matches('/');
    ensure!(!api_version.is_empty(), "gemini.api_version must not be empty");
    ensure!(
        config.gemini.request_timeout_secs > 0,
        "gemini.request_timeout_secs must be > 0"
    );

    let hyperparameters = Hyperparameters {
        epoch_count: config.tuning.epoch_count,
        batch_size: config.tuning.batch_size,
        learning_rate: config.tuning.learning_rate,
    };
    hyperparameters.validate()?;

    ensure!(
        config.tuning.poll_interval_secs > 0,
        "tuning.poll_interval_secs must be > 0"
    );
    let poll_policy = PollPolicy::new(Duration::from_secs(config.tuning.poll_interval_secs))
        .with_max_attempts(config.tuning.max_poll_attempts);

    let auth = match config.auth.method {
        AuthMethodConfig::ApiKey => {
            let key = config
                .auth
                .api_key
                .filter(|k| !k.trim().is_empty())
                .or_else(|| env(&config.auth.api_key_env).filter(|k| !k.trim().is_empty()))
                .map(ApiKey::new);
            AuthSettings::ApiKey {
                key,
                source: config.auth.api_key_env,
            }
        }
        AuthMethodConfig::Oauth => {
            ensure!(
                !config.auth.token_file.as_os_str().is_empty(),
                "auth.token_file is required for oauth"
            );
            AuthSettings::OAuth {
                token_file: config.auth.token_file,
            }
        }
    };

    ensure!(
        tracing_subscriber::EnvFilter::try_new(&config.logging.level).is_ok(),
        "invalid logging.level: {:?}",
        config.logging.level
    );

    Ok(RuntimeConfig {
        api_base: format!("{base_url}/{api_version}"),
        request_timeout: Duration::from_secs(config.gemini.request_timeout_secs),
        auth,
        base_model: config.tuning.base_model,
        display_name: config.tuning.display_name,
        hyperparameters,
        poll_policy,
        log_level: config.logging.level,
        log_format: config.logging.format,
    })
}

/// Checks a user-supplied tuned model id before any network call.
pub fn check_tuned_model_id(id: &str) -> Result<(), anyhow::Error> {
    validate_tuned_model_id(id)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
