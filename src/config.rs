use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub mail_api_url: String,
    pub mail_api_key: String,
    pub mail_from: String,
    pub operator_email: Option<String>,
    pub client_url: String,
    pub queue_max_attempts: u32,
    pub queue_poll_interval_ms: u64,
    pub upload_max_bytes: usize,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            openai_api_key: get_env("OPENAI_API_KEY")?,
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            mail_api_url: get_env("MAIL_API_URL")?,
            mail_api_key: get_env("MAIL_API_KEY")?,
            mail_from: get_env("MAIL_FROM")?,
            operator_email: env::var("OPERATOR_EMAIL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            client_url: get_env("CLIENT_URL")?,
            queue_max_attempts: get_env_parse_or("QUEUE_MAX_ATTEMPTS", 3)?,
            queue_poll_interval_ms: get_env_parse_or("QUEUE_POLL_INTERVAL_MS", 750)?,
            upload_max_bytes: get_env_parse_or("UPLOAD_MAX_BYTES", 5 * 1024 * 1024)?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
