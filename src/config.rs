//! Configuration for the e-sign vendor connection.
//!
//! All behaviour is controlled through [`EsignConfig`], built via its
//! [`EsignConfigBuilder`]. The three credentials (`HOST`, `APP_ID`,
//! `APP_SECRET`) are required; everything else has a default matching the
//! vendor's documented processing times.
//!
//! The config is loaded once at startup and shared read-only (`Arc`) by every
//! tool invocation.

use crate::error::EsignError;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the vendor API base URL.
pub const ENV_HOST: &str = "HOST";
/// Environment variable holding the application id.
pub const ENV_APP_ID: &str = "APP_ID";
/// Environment variable holding the application secret.
pub const ENV_APP_SECRET: &str = "APP_SECRET";

/// Production Open API host.
pub const PRODUCTION_HOST: &str = "https://openapi.esign.cn";
/// Sandbox Open API host.
pub const SANDBOX_HOST: &str = "https://smlopenapi.esign.cn";

/// Connection and pipeline settings.
///
/// # Example
/// ```rust
/// use esign_mcp::EsignConfig;
///
/// let config = EsignConfig::builder()
///     .host("https://smlopenapi.esign.cn")
///     .app_id("7438000000")
///     .app_secret("s3cret")
///     .poll_max_attempts(10)
///     .build()
///     .unwrap();
/// assert_eq!(config.poll_max_attempts, 10);
/// ```
#[derive(Clone)]
pub struct EsignConfig {
    /// Vendor API base URL, without trailing slash.
    pub host: String,

    /// Application id sent as `X-Tsign-Open-App-Id`.
    pub app_id: String,

    /// Shared secret keying the request HMAC. Never logged.
    pub app_secret: String,

    /// Maximum file status polls before giving up. Default: 30.
    pub poll_max_attempts: u32,

    /// Fixed wait between file status polls. Default: 2000 ms.
    ///
    /// Conversion of office documents to PDF typically completes in a few
    /// seconds; 30 × 2 s gives the vendor a full minute.
    pub poll_interval: Duration,

    /// Download timeout for remote file references in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Directory receiving downloaded scratch files. Default: the OS temp dir.
    pub scratch_dir: PathBuf,

    /// `User-Agent` header sent with every signed request.
    pub user_agent: String,
}

impl fmt::Debug for EsignConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EsignConfig")
            .field("host", &self.host)
            .field("app_id", &self.app_id)
            .field("app_secret", &"<redacted>")
            .field("poll_max_attempts", &self.poll_max_attempts)
            .field("poll_interval", &self.poll_interval)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("scratch_dir", &self.scratch_dir)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl EsignConfig {
    /// Create a new builder with all defaults and no credentials.
    pub fn builder() -> EsignConfigBuilder {
        EsignConfigBuilder::default()
    }

    /// Load credentials from `HOST`, `APP_ID` and `APP_SECRET`.
    pub fn from_env() -> Result<EsignConfig, EsignError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load credentials through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<EsignConfig, EsignError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::builder().credentials_from(lookup).build()
    }
}

/// Builder for [`EsignConfig`].
#[derive(Debug, Clone)]
pub struct EsignConfigBuilder {
    host: Option<String>,
    app_id: Option<String>,
    app_secret: Option<String>,
    poll_max_attempts: u32,
    poll_interval: Duration,
    download_timeout_secs: u64,
    scratch_dir: Option<PathBuf>,
    user_agent: String,
}

impl Default for EsignConfigBuilder {
    fn default() -> Self {
        Self {
            host: None,
            app_id: None,
            app_secret: None,
            poll_max_attempts: 30,
            poll_interval: Duration::from_millis(2000),
            download_timeout_secs: 120,
            scratch_dir: None,
            user_agent: format!("esign-mcp-rust/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl EsignConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    pub fn app_secret(mut self, secret: impl Into<String>) -> Self {
        self.app_secret = Some(secret.into());
        self
    }

    /// Fill any credential not yet set from `lookup`.
    pub fn credentials_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.host.is_none() {
            self.host = lookup(ENV_HOST);
        }
        if self.app_id.is_none() {
            self.app_id = lookup(ENV_APP_ID);
        }
        if self.app_secret.is_none() {
            self.app_secret = lookup(ENV_APP_SECRET);
        }
        self
    }

    pub fn poll_max_attempts(mut self, n: u32) -> Self {
        self.poll_max_attempts = n.max(1);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.download_timeout_secs = secs;
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    /// Build the configuration.
    ///
    /// Fails with [`EsignError::ConfigurationMissing`] naming exactly the
    /// credentials that are unset or blank, in `HOST`, `APP_ID`,
    /// `APP_SECRET` order.
    pub fn build(self) -> Result<EsignConfig, EsignError> {
        let host = non_blank(self.host);
        let app_id = non_blank(self.app_id);
        let app_secret = non_blank(self.app_secret);

        let mut missing = Vec::new();
        if host.is_none() {
            missing.push(ENV_HOST);
        }
        if app_id.is_none() {
            missing.push(ENV_APP_ID);
        }
        if app_secret.is_none() {
            missing.push(ENV_APP_SECRET);
        }

        match (host, app_id, app_secret) {
            (Some(host), Some(app_id), Some(app_secret)) => Ok(EsignConfig {
                host: host.trim_end_matches('/').to_string(),
                app_id,
                app_secret,
                poll_max_attempts: self.poll_max_attempts,
                poll_interval: self.poll_interval,
                download_timeout_secs: self.download_timeout_secs,
                scratch_dir: self.scratch_dir.unwrap_or_else(std::env::temp_dir),
                user_agent: self.user_agent,
            }),
            _ => Err(EsignError::ConfigurationMissing { missing }),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Render the setup guidance shown instead of running a tool when
/// credentials are missing. Only the missing settings are mentioned.
pub fn missing_config_guidance(missing: &[&str]) -> String {
    let mut env_lines = Vec::new();
    let mut notes = Vec::new();

    for (i, name) in missing.iter().enumerate() {
        let (placeholder, note) = match *name {
            ENV_HOST => (
                "<Open API base URL>",
                format!(
                    "{name}: Open API base URL of the target environment\n   \
                     - sandbox:    {SANDBOX_HOST}\n   \
                     - production: {PRODUCTION_HOST}"
                ),
            ),
            ENV_APP_ID => (
                "<your application id>",
                format!("{name}: application id issued by the e-sign open platform"),
            ),
            ENV_APP_SECRET => (
                "<your application secret>",
                format!("{name}: application secret issued by the e-sign open platform"),
            ),
            other => ("<value>", other.to_string()),
        };
        env_lines.push(format!("        \"{name}\": \"{placeholder}\""));
        notes.push(format!("{}. {}", i + 1, note));
    }

    format!(
        "Configuration error: missing required settings {}\n\n\
         Add the following environment variables to your MCP client configuration:\n\
         {{\n  \"esign-mcp\": {{\n    \"command\": \"esign-mcp\",\n    \"env\": {{\n{}\n    }}\n  }}\n}}\n\n\
         Settings:\n{}\n\n\
         Note: sandbox and production credentials are not interchangeable; use the \
         application id and secret issued for the chosen environment.",
        missing.join(", "),
        env_lines.join(",\n"),
        notes.join("\n"),
    )
}
