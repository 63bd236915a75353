use serde::Deserialize;
use std::fs;
use std::path::Path;

const ENV_CONFIG_PATH: &str = "CMV_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

const ENV_REDDIT_CLIENT_ID: &str = "REDDIT_CLIENT_ID";
const ENV_REDDIT_CLIENT_SECRET: &str = "REDDIT_CLIENT_SECRET";
const ENV_REDDIT_USERNAME: &str = "REDDIT_USERNAME";
const ENV_REDDIT_PASSWORD: &str = "REDDIT_PASSWORD";

fn default_subreddit() -> String {
    "changemyview".to_string()
}

fn default_user_agent() -> String {
    format!("rust:cmv-companion:{}", env!("CARGO_PKG_VERSION"))
}

fn default_fetch_cache_ttl_secs() -> u64 {
    3600
}

fn default_fetch_cooldown_secs() -> u64 {
    60
}

/// Companion tuning configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CompanionConfig {
    /// Subreddit to fetch threads from
    #[serde(default = "default_subreddit")]
    pub subreddit: String,
    /// Descriptive client identifier sent to the forum API
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// How long fetched listings stay cached, in seconds
    #[serde(default = "default_fetch_cache_ttl_secs")]
    pub fetch_cache_ttl_secs: u64,
    /// Minimum interval between fetches within one session, in seconds
    #[serde(default = "default_fetch_cooldown_secs")]
    pub fetch_cooldown_secs: u64,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            subreddit: default_subreddit(),
            user_agent: default_user_agent(),
            fetch_cache_ttl_secs: default_fetch_cache_ttl_secs(),
            fetch_cooldown_secs: default_fetch_cooldown_secs(),
        }
    }
}

/// Reddit account credentials, supplied out-of-band via environment
#[derive(Debug, Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

impl RedditCredentials {
    /// Load credentials from the environment. Returns `None` when any of
    /// them is missing; the service still starts, but forum calls fail
    /// with an auth error until they are provided.
    pub fn from_env() -> Option<Self> {
        Some(Self {
            client_id: std::env::var(ENV_REDDIT_CLIENT_ID).ok()?,
            client_secret: std::env::var(ENV_REDDIT_CLIENT_SECRET).ok()?,
            username: std::env::var(ENV_REDDIT_USERNAME).ok()?,
            password: std::env::var(ENV_REDDIT_PASSWORD).ok()?,
        })
    }
}

/// YAML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub companion: Option<CompanionConfig>,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub companion: CompanionConfig,
    pub reddit: Option<RedditCredentials>,
    pub port: u16,
    pub host: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            companion: CompanionConfig::default(),
            reddit: None,
            port: 8080,
            host: "127.0.0.1".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment and config file
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let config_path =
            std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let companion = Self::load_config_file(&config_path)
            .and_then(|cf| cf.companion)
            .unwrap_or_default();

        let reddit = RedditCredentials::from_env();
        if reddit.is_none() {
            tracing::warn!("Reddit credentials not fully configured, forum access disabled");
        }

        Self {
            companion,
            reddit,
            port,
            host,
        }
    }

    /// Load configuration from YAML file
    fn load_config_file(path: &str) -> Option<ConfigFile> {
        let path = Path::new(path);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return None;
        }

        match fs::read_to_string(path) {
            Ok(contents) => {
                // Handle empty file
                let contents = contents.trim();
                if contents.is_empty() {
                    tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
                    return Some(ConfigFile::default());
                }

                match serde_yaml::from_str(contents) {
                    Ok(config) => {
                        tracing::info!(path = %path.display(), "Loaded configuration from file");
                        Some(config)
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to parse config file, using defaults");
                        None
                    }
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read config file, using defaults");
                None
            }
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
