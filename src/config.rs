use crate::error::{GitCorpusError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub walk: WalkConfig,
    pub output: OutputConfig,
    pub logging: LogConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout: u64,
    pub user_agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WalkConfig {
    /// Maximum number of requests in flight. 1 reproduces a strictly sequential walk.
    pub concurrency: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub framed: bool,
    pub compact: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    pub debug: bool,
    pub json: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            timeout: 30,
            user_agent: format!("gitcorpus/{}", env!("CARGO_PKG_VERSION")),
            token: None,
        }
    }
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            concurrency: num_cpus::get().clamp(2, 8),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            framed: true,
            compact: false,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(GitCorpusError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| GitCorpusError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| GitCorpusError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["gitcorpus.toml", ".gitcorpus.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref base_url) = cli_args.api_url {
            self.api.base_url = base_url.trim_end_matches('/').to_string();
        }

        if let Some(timeout) = cli_args.timeout {
            self.api.timeout = timeout;
        }

        if let Some(ref token) = cli_args.token {
            self.api.token = Some(token.clone());
        }

        if let Some(concurrency) = cli_args.concurrency {
            self.walk.concurrency = concurrency;
        }

        if let Some(framed) = cli_args.framed {
            self.output.framed = framed;
        }

        if let Some(compact) = cli_args.compact {
            self.output.compact = compact;
        }

        if cli_args.debug {
            self.logging.debug = true;
        }

        if let Some(json) = cli_args.json_logs {
            self.logging.json = json;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let base = url::Url::parse(&self.api.base_url).map_err(|e| GitCorpusError::Config {
            message: format!("Invalid API base URL '{}': {}", self.api.base_url, e),
        })?;

        if !matches!(base.scheme(), "http" | "https") {
            return Err(GitCorpusError::Config {
                message: format!("API base URL must use http or https: {}", self.api.base_url),
            });
        }

        if self.api.timeout == 0 {
            return Err(GitCorpusError::Config {
                message: "API timeout must be greater than 0".to_string(),
            });
        }

        if self.walk.concurrency == 0 {
            return Err(GitCorpusError::Config {
                message: "Walk concurrency must be greater than 0".to_string(),
            });
        }

        if self.api.user_agent.trim().is_empty() {
            return Err(GitCorpusError::Config {
                message: "User agent must not be empty".to_string(),
            });
        }

        Ok(())
    }

    pub fn api_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.api.timeout)
    }

    /// Configured token, falling back to `GITHUB_TOKEN`.
    pub fn resolve_token(&self) -> Option<String> {
        self.api
            .token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
            .filter(|t| !t.trim().is_empty())
    }

    pub fn create_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub api_url: Option<String>,
    pub timeout: Option<u64>,
    pub token: Option<String>,
    pub concurrency: Option<usize>,
    pub framed: Option<bool>,
    pub compact: Option<bool>,
    pub debug: bool,
    pub json_logs: Option<bool>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_url(mut self, api_url: Option<String>) -> Self {
        self.api_url = api_url;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<u64>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_concurrency(mut self, concurrency: Option<usize>) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_framed(mut self, framed: Option<bool>) -> Self {
        self.framed = framed;
        self
    }

    pub fn with_compact(mut self, compact: Option<bool>) -> Self {
        self.compact = compact;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_json_logs(mut self, json: Option<bool>) -> Self {
        self.json_logs = json;
        self
    }
}
