//! Server configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub arena: ArenaConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
}

/// A configuration value the engine cannot run with.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("arena dimensions must be positive, got {width}x{height}")]
    NonPositiveArena { width: f32, height: f32 },
    #[error("min_size ({min}) must be positive and not exceed max_size ({max})")]
    InvalidSizeRange { min: f32, max: f32 },
    #[error("arena {width}x{height} cannot fit a player of size {max_size}")]
    ArenaTooSmall { width: f32, height: f32, max_size: f32 },
    #[error("growth_rate must be non-negative, got {0}")]
    NegativeGrowthRate(f32),
    #[error("eat_radius must be non-negative, got {0}")]
    NegativeEatRadius(f32),
    #[error("proximity_multiplier must lie in (0, 1), got {0}")]
    InvalidProximityMultiplier(f32),
    #[error("max_name_length must be at least 1")]
    ZeroNameLength,
    #[error("chat history_limit must be at least 1")]
    EmptyChatHistory,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Path::new("config.toml");
        let mut config: Self = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents)?
        } else {
            info!("No config.toml found, creating default config");
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            default_config
        };

        if let Ok(secret) = std::env::var("JWT_SECRET") {
            config.identity.secret = secret;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the values the engine relies on for its invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let arena = &self.arena;
        if !(arena.width > 0.0 && arena.height > 0.0) {
            return Err(ConfigError::NonPositiveArena {
                width: arena.width,
                height: arena.height,
            });
        }
        if !(arena.min_size > 0.0 && arena.min_size <= arena.max_size) {
            return Err(ConfigError::InvalidSizeRange {
                min: arena.min_size,
                max: arena.max_size,
            });
        }
        // The clamp interval [r, dim - r] must be non-empty at the largest radius.
        if arena.max_size > arena.width || arena.max_size > arena.height {
            return Err(ConfigError::ArenaTooSmall {
                width: arena.width,
                height: arena.height,
                max_size: arena.max_size,
            });
        }
        if !(arena.growth_rate >= 0.0) {
            return Err(ConfigError::NegativeGrowthRate(arena.growth_rate));
        }
        if !(arena.eat_radius >= 0.0) {
            return Err(ConfigError::NegativeEatRadius(arena.eat_radius));
        }
        if !(arena.proximity_multiplier > 0.0 && arena.proximity_multiplier < 1.0) {
            return Err(ConfigError::InvalidProximityMultiplier(arena.proximity_multiplier));
        }
        if arena.max_name_length == 0 {
            return Err(ConfigError::ZeroNameLength);
        }
        if self.chat.history_limit == 0 {
            return Err(ConfigError::EmptyChatHistory);
        }
        Ok(())
    }
}

/// Server networking and general settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Connections per IP limit.
    #[serde(default = "default_ip_limit")]
    pub ip_limit: usize,
    /// Server name shown in logs.
    #[serde(default = "default_name")]
    pub name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            max_connections: default_max_connections(),
            ip_limit: default_ip_limit(),
            name: default_name(),
        }
    }
}

fn default_port() -> u16 {
    5000
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_max_connections() -> usize {
    100
}
fn default_ip_limit() -> usize {
    100
}
fn default_name() -> String {
    "Bubble Arena".to_string()
}

/// Arena geometry and growth rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArenaConfig {
    #[serde(default = "default_arena_width")]
    pub width: f32,
    #[serde(default = "default_arena_height")]
    pub height: f32,
    /// Size (diameter) of a player with score 0.
    #[serde(default = "default_min_size")]
    pub min_size: f32,
    /// Size cap.
    #[serde(default = "default_max_size")]
    pub max_size: f32,
    /// Size gained per score point.
    #[serde(default = "default_growth_rate")]
    pub growth_rate: f32,
    /// Food is eaten within this distance, regardless of player size.
    #[serde(default = "default_eat_radius")]
    pub eat_radius: f32,
    /// Fraction of the combined radii two players must be within to eat.
    #[serde(default = "default_proximity_multiplier")]
    pub proximity_multiplier: f32,
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: default_arena_width(),
            height: default_arena_height(),
            min_size: default_min_size(),
            max_size: default_max_size(),
            growth_rate: default_growth_rate(),
            eat_radius: default_eat_radius(),
            proximity_multiplier: default_proximity_multiplier(),
            max_name_length: default_max_name_length(),
        }
    }
}

fn default_arena_width() -> f32 {
    1400.0
}
fn default_arena_height() -> f32 {
    600.0
}
fn default_min_size() -> f32 {
    56.0
}
fn default_max_size() -> f32 {
    200.0
}
fn default_growth_rate() -> f32 {
    2.0
}
fn default_eat_radius() -> f32 {
    20.0
}
fn default_proximity_multiplier() -> f32 {
    0.8
}
fn default_max_name_length() -> usize {
    30
}

/// Chat configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatConfig {
    /// Number of messages retained and rebroadcast.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Larger payloads are dropped.
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            max_message_bytes: default_max_message_bytes(),
        }
    }
}

fn default_history_limit() -> usize {
    100
}
fn default_max_message_bytes() -> usize {
    1024
}

/// Identity service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentityConfig {
    /// HS256 signing secret (`JWT_SECRET` overrides it).
    #[serde(default = "default_secret")]
    pub secret: String,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
    #[serde(default = "default_min_username_length")]
    pub min_username_length: usize,
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            secret: default_secret(),
            token_ttl_secs: default_token_ttl(),
            min_username_length: default_min_username_length(),
            min_password_length: default_min_password_length(),
        }
    }
}

fn default_secret() -> String {
    "dev_secret".to_string()
}
fn default_token_ttl() -> u64 {
    7 * 24 * 60 * 60
}
fn default_min_username_length() -> usize {
    3
}
fn default_min_password_length() -> usize {
    4
}
