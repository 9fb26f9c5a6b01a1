use crate::orchestration::{PipelineSettings, DEFAULT_QUEUE_CAPACITY};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub dispatch_queue_capacity: usize,
    pub cache_max_age: Duration,
    pub leaderboard_top_n: usize,
    pub live_window_radius: u32,
    pub broadcast_buffer: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = parse_or(&env_map, "PORT", 8080u16, "must be a valid u16")?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let dispatch_queue_capacity = parse_or(
            &env_map,
            "DISPATCH_QUEUE_CAPACITY",
            DEFAULT_QUEUE_CAPACITY,
            "must be a positive integer",
        )?;
        if dispatch_queue_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "DISPATCH_QUEUE_CAPACITY".to_string(),
                "must be a positive integer".to_string(),
            ));
        }

        let cache_max_age_secs =
            parse_or(&env_map, "CACHE_MAX_AGE_SECS", 300u64, "must be a valid u64")?;
        let leaderboard_top_n =
            parse_or(&env_map, "LEADERBOARD_TOP_N", 10usize, "must be a valid usize")?;
        let live_window_radius =
            parse_or(&env_map, "LIVE_WINDOW_RADIUS", 5u32, "must be a valid u32")?;
        let broadcast_buffer =
            parse_or(&env_map, "BROADCAST_BUFFER", 256usize, "must be a valid usize")?;

        Ok(Config {
            port,
            database_path,
            dispatch_queue_capacity,
            cache_max_age: Duration::from_secs(cache_max_age_secs),
            leaderboard_top_n,
            live_window_radius,
            broadcast_buffer,
        })
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            cache_max_age: self.cache_max_age,
            top_n: self.leaderboard_top_n,
            window_radius: self.live_window_radius,
        }
    }
}

fn parse_or<T: FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: T,
    expectation: &str,
) -> Result<T, ConfigError> {
    match env_map.get(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), expectation.to_string())
        }),
        None => Ok(default),
    }
}
