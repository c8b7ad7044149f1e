use serde::Deserialize;

/// Top-level server configuration, loaded from `outbreak.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub auth: AuthFileConfig,
    pub limits: LimitsConfig,
    pub sweep: SweepConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            auth: AuthFileConfig::default(),
            limits: LimitsConfig::default(),
            sweep: SweepConfig::default(),
        }
    }
}

/// Infrastructure limits (registry caps, buffer sizes, subscriber caps).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_users: usize,
    pub max_games: usize,
    pub max_players_per_game: usize,
    pub max_feed_items: usize,
    pub broadcast_capacity: usize,
    pub max_sse_subscribers: usize,
    /// Maximum length for user and game display names.
    pub max_name_length: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_users: 10_000,
            max_games: 50,
            max_players_per_game: 500,
            max_feed_items: 500,
            broadcast_capacity: 1024,
            max_sse_subscribers: 100,
            max_name_length: 128,
        }
    }
}

/// Background sweep configuration. Games are also swept on demand when
/// viewed, so the interval just bounds how stale an unwatched game can get.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub interval_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

/// Auth section of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthFileConfig {
    /// Bearer token for administrator endpoints. None = auth disabled.
    pub admin_token: Option<String>,
}

impl ServerConfig {
    /// Validate configuration, logging warnings for issues.
    pub fn validate(&self) {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            tracing::error!(
                addr = %self.listen_addr,
                "listen_addr is not a valid socket address"
            );
            std::process::exit(1);
        }

        if self.auth.admin_token.is_none() {
            tracing::warn!(
                "no admin_token configured — administrator endpoints are unauthenticated"
            );
        }

        if self.limits.max_users == 0 {
            tracing::error!("limits.max_users must be > 0");
            std::process::exit(1);
        }
        if self.limits.max_games == 0 {
            tracing::error!("limits.max_games must be > 0");
            std::process::exit(1);
        }
        if self.limits.max_players_per_game == 0 {
            tracing::error!("limits.max_players_per_game must be > 0");
            std::process::exit(1);
        }
        if self.limits.max_feed_items == 0 {
            tracing::error!("limits.max_feed_items must be > 0");
            std::process::exit(1);
        }
        if self.limits.broadcast_capacity == 0 {
            tracing::error!("limits.broadcast_capacity must be > 0");
            std::process::exit(1);
        }
        if self.limits.max_sse_subscribers == 0 {
            tracing::error!("limits.max_sse_subscribers must be > 0");
            std::process::exit(1);
        }
        if self.limits.max_name_length == 0 {
            tracing::error!("limits.max_name_length must be > 0");
            std::process::exit(1);
        }
        if self.sweep.interval_secs == 0 {
            tracing::error!("sweep.interval_secs must be > 0");
            std::process::exit(1);
        }
    }

    /// Load config from `outbreak.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("outbreak.toml") {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from outbreak.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse outbreak.toml: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No outbreak.toml found, using defaults");
                ServerConfig::default()
            },
        };

        // Environment variable overrides
        if let Ok(addr) = std::env::var("OUTBREAK_LISTEN_ADDR")
            && !addr.is_empty()
        {
            config.listen_addr = addr;
        }
        if let Ok(token) = std::env::var("OUTBREAK_ADMIN_TOKEN")
            && !token.is_empty()
        {
            config.auth.admin_token = Some(token);
        }
        if let Ok(val) = std::env::var("OUTBREAK_MAX_GAMES")
            && let Ok(n) = val.parse::<usize>()
        {
            config.limits.max_games = n;
        }
        if let Ok(val) = std::env::var("OUTBREAK_MAX_FEED_ITEMS")
            && let Ok(n) = val.parse::<usize>()
        {
            config.limits.max_feed_items = n;
        }
        if let Ok(val) = std::env::var("OUTBREAK_MAX_SSE_SUBSCRIBERS")
            && let Ok(n) = val.parse::<usize>()
        {
            config.limits.max_sse_subscribers = n;
        }
        if let Ok(val) = std::env::var("OUTBREAK_SWEEP_INTERVAL_SECS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.sweep.interval_secs = n;
        }

        config
    }
}
