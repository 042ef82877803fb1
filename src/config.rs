// config.rs
use std::env;

use crate::errors::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    MongoDb,
    Memory,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::MongoDb => "mongodb",
            StorageBackend::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,
    pub database_name: String,
    pub razorpay_key_id: String,
    pub razorpay_key_secret: String,
    pub razorpay_webhook_secret: String,
    pub razorpay_base_url: String,
    pub base_fare: i64,
    pub currency: String,
    pub smtp: Option<SmtpConfig>,
    pub port: u16,
    pub host: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let storage_backend = match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "mongodb".to_string())
            .to_lowercase()
            .as_str()
        {
            "mongodb" | "mongo" => StorageBackend::MongoDb,
            "memory" => StorageBackend::Memory,
            other => {
                return Err(AppError::configuration(format!(
                    "STORAGE_BACKEND must be 'mongodb' or 'memory', got '{}'",
                    other
                )))
            }
        };

        let database_url = env::var("DATABASE_URL").ok();
        if storage_backend == StorageBackend::MongoDb && database_url.is_none() {
            return Err(AppError::configuration("DATABASE_URL must be set"));
        }

        let razorpay_key_secret = required("RAZORPAY_KEY_SECRET")?;
        let razorpay_webhook_secret = env::var("RAZORPAY_WEBHOOK_SECRET")
            .unwrap_or_else(|_| razorpay_key_secret.clone());

        let base_fare: i64 = parse_or("BASE_FARE", 25)?;
        if base_fare <= 0 {
            return Err(AppError::configuration("BASE_FARE must be positive"));
        }

        Ok(AppConfig {
            storage_backend,
            database_url,
            database_name: env::var("DATABASE_NAME")
                .unwrap_or_else(|_| "bangalore-bus-system".to_string()),
            razorpay_key_id: required("RAZORPAY_KEY_ID")?,
            razorpay_key_secret,
            razorpay_webhook_secret,
            razorpay_base_url: env::var("RAZORPAY_BASE_URL")
                .unwrap_or_else(|_| "https://api.razorpay.com/v1".to_string()),
            base_fare,
            currency: env::var("CURRENCY").unwrap_or_else(|_| "INR".to_string()),
            smtp: smtp_from_env()?,
            port: parse_or("PORT", 5000)?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
        })
    }

    pub fn get_config_info(&self) -> serde_json::Value {
        serde_json::json!({
            "storage": self.storage_backend.as_str(),
            "database_name": self.database_name,
            "gateway_base_url": self.razorpay_base_url,
            "key_id_set": !self.razorpay_key_id.is_empty(),
            "separate_webhook_secret": self.razorpay_webhook_secret != self.razorpay_key_secret,
            "base_fare": self.base_fare,
            "currency": self.currency,
            "email_enabled": self.smtp.is_some(),
            "port": self.port,
            "host": self.host,
        })
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).map_err(|_| AppError::configuration(format!("{} must be set", key)))
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::configuration(format!("{} must be a number", key))),
        Err(_) => Ok(default),
    }
}

// Email is optional; all three credentials must be present to enable it.
fn smtp_from_env() -> Result<Option<SmtpConfig>> {
    let (host, username, password) = match (
        env::var("EMAIL_HOST"),
        env::var("EMAIL_USER"),
        env::var("EMAIL_PASS"),
    ) {
        (Ok(host), Ok(user), Ok(pass)) => (host, user, pass),
        _ => return Ok(None),
    };

    Ok(Some(SmtpConfig {
        port: parse_or("EMAIL_PORT", 587)?,
        from: env::var("EMAIL_FROM").unwrap_or_else(|_| username.clone()),
        host,
        username,
        password,
    }))
}

#[cfg(test)]
impl AppConfig {
    pub fn for_tests() -> Self {
        AppConfig {
            storage_backend: StorageBackend::Memory,
            database_url: None,
            database_name: "bus-test".to_string(),
            razorpay_key_id: "rzp_test_key".to_string(),
            razorpay_key_secret: "test_key_secret".to_string(),
            razorpay_webhook_secret: "test_webhook_secret".to_string(),
            razorpay_base_url: "http://localhost:0".to_string(),
            base_fare: 25,
            currency: "INR".to_string(),
            smtp: None,
            port: 0,
            host: "127.0.0.1".to_string(),
        }
    }
}
