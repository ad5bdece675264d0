use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use secrecy::SecretString;
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub s3: Option<S3Config>,
    pub smtp: Option<SmtpConfig>,
    pub app: AppConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: SecretString,
    pub bucket_name: String,
    pub region: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<SecretString>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub name: String,
    pub environment: Environment,
    pub static_dir: String,
    /// Root of the local upload backend when S3 is not configured.
    pub media_dir: String,
    /// Absolute origin used in emailed links, without a trailing slash.
    pub public_base_url: String,
    pub default_from_email: String,
    pub kaprodi_email: Option<String>,
    pub mentor_email: Option<String>,
    /// Prefix of the URL encoded into certificate QR codes.
    pub certificate_verify_base: String,
    pub session_ttl_hours: i64,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Server configuration
        let host = env::var("SERVER_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string())
            .parse::<IpAddr>()
            .context("Failed to parse SERVER_HOST")?;

        let port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .context("Failed to parse SERVER_PORT")?;

        // Database configuration
        let db_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let db_max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(val) => Some(val.parse().context("Failed to parse DATABASE_MAX_CONNECTIONS")?),
            Err(_) => Some(10),
        };
        let db_min_connections = match env::var("DATABASE_MIN_CONNECTIONS") {
            Ok(val) => Some(val.parse().context("Failed to parse DATABASE_MIN_CONNECTIONS")?),
            Err(_) => Some(1),
        };

        // S3 configuration (optional)
        let s3_config = if let Some(endpoint) = optional_var("S3_ENDPOINT") {
            let access_key_id = env::var("S3_ACCESS_KEY_ID")
                .context("S3_ACCESS_KEY_ID must be set when S3_ENDPOINT is provided")?;
            let secret_access_key = env::var("S3_SECRET_ACCESS_KEY")
                .context("S3_SECRET_ACCESS_KEY must be set when S3_ENDPOINT is provided")?;
            let bucket_name = env::var("S3_BUCKET_NAME")
                .context("S3_BUCKET_NAME must be set when S3_ENDPOINT is provided")?;

            Some(S3Config {
                endpoint: endpoint.trim_end_matches('/').to_string(),
                access_key_id,
                secret_access_key: SecretString::from(secret_access_key),
                bucket_name,
                region: optional_var("S3_REGION"),
            })
        } else {
            None
        };

        // SMTP configuration (optional)
        let smtp_config = match optional_var("SMTP_HOST") {
            Some(host) => {
                let port = env::var("SMTP_PORT")
                    .unwrap_or_else(|_| "587".to_string())
                    .parse::<u16>()
                    .context("Failed to parse SMTP_PORT")?;
                Some(SmtpConfig {
                    host,
                    port,
                    username: optional_var("SMTP_USERNAME"),
                    password: optional_var("SMTP_PASSWORD").map(SecretString::from),
                })
            }
            None => None,
        };

        // App configuration
        let environment = env::var("APP_ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string())
            .parse::<Environment>()
            .unwrap_or_default();

        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_string();

        let certificate_verify_base = env::var("CERTIFICATE_VERIFY_BASE")
            .unwrap_or_else(|_| format!("{public_base_url}/verify"))
            .trim_end_matches('/')
            .to_string();

        let session_ttl_hours = match env::var("SESSION_TTL_HOURS") {
            Ok(val) => val.parse().context("Failed to parse SESSION_TTL_HOURS")?,
            Err(_) => 12,
        };

        let max_upload_bytes = match env::var("MAX_UPLOAD_BYTES") {
            Ok(val) => val.parse().context("Failed to parse MAX_UPLOAD_BYTES")?,
            Err(_) => 5 * 1024 * 1024,
        };

        Ok(Config {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url: db_url,
                max_connections: db_max_connections,
                min_connections: db_min_connections,
            },
            s3: s3_config,
            smtp: smtp_config,
            app: AppConfig {
                name: env::var("APP_NAME").unwrap_or_else(|_| "Portal Coop".to_string()),
                environment,
                static_dir: env::var("STATIC_DIR").unwrap_or_else(|_| "static".to_string()),
                media_dir: env::var("MEDIA_DIR").unwrap_or_else(|_| "media".to_string()),
                public_base_url,
                default_from_email: env::var("DEFAULT_FROM_EMAIL")
                    .unwrap_or_else(|_| "noreply@coop.localhost".to_string()),
                kaprodi_email: optional_var("KAPRODI_EMAIL"),
                mentor_email: optional_var("MENTOR_EMAIL"),
                certificate_verify_base,
                session_ttl_hours,
                max_upload_bytes,
            },
        })
    }

    /// Development defaults around a given database URL, with local storage and no SMTP.
    pub fn local(database_url: &str) -> Self {
        Config {
            server: ServerConfig {
                host: IpAddr::from([127, 0, 0, 1]),
                port: 8000,
            },
            database: DatabaseConfig {
                url: database_url.to_string(),
                max_connections: Some(5),
                min_connections: Some(0),
            },
            s3: None,
            smtp: None,
            app: AppConfig {
                name: "Portal Coop".to_string(),
                environment: Environment::Development,
                static_dir: "static".to_string(),
                media_dir: "media".to_string(),
                public_base_url: "http://localhost:8000".to_string(),
                default_from_email: "noreply@coop.localhost".to_string(),
                kaprodi_email: None,
                mentor_email: None,
                certificate_verify_base: "http://localhost:8000/verify".to_string(),
                session_ttl_hours: 12,
                max_upload_bytes: 5 * 1024 * 1024,
            },
        }
    }

    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.host, self.server.port)
    }

    pub fn is_production(&self) -> bool {
        self.app.environment == Environment::Production
    }
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Environment::Production),
            "staging" => Ok(Environment::Staging),
            "development" => Ok(Environment::Development),
            _ => Err(format!("Unknown environment: {}", s)),
        }
    }
}

static CONFIG: OnceCell<Config> = OnceCell::new();

pub fn init() -> Result<&'static Config> {
    CONFIG.get_or_try_init(Config::from_env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "DATABASE_URL",
        "S3_ENDPOINT",
        "S3_ACCESS_KEY_ID",
        "S3_SECRET_ACCESS_KEY",
        "S3_BUCKET_NAME",
        "SMTP_HOST",
        "PUBLIC_BASE_URL",
        "CERTIFICATE_VERIFY_BASE",
        "APP_ENVIRONMENT",
    ];

    fn clear() {
        for key in KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn defaults_without_optional_collaborators() {
        clear();
        env::set_var("DATABASE_URL", "postgres://localhost/coop");
        env::set_var("PUBLIC_BASE_URL", "https://coop.example.ac.id/");

        let config = Config::from_env().unwrap();
        assert!(config.s3.is_none());
        assert!(config.smtp.is_none());
        assert_eq!(config.app.public_base_url, "https://coop.example.ac.id");
        assert_eq!(
            config.app.certificate_verify_base,
            "https://coop.example.ac.id/verify"
        );
        assert_eq!(config.app.max_upload_bytes, 5 * 1024 * 1024);
        assert_eq!(config.app.environment, Environment::Development);
        clear();
    }

    #[test]
    #[serial]
    fn partial_s3_configuration_is_an_error() {
        clear();
        env::set_var("DATABASE_URL", "postgres://localhost/coop");
        env::set_var("S3_ENDPOINT", "https://s3.example.test");
        assert!(Config::from_env().is_err());
        clear();
    }

    #[test]
    #[serial]
    fn missing_database_url_is_an_error() {
        clear();
        assert!(Config::from_env().is_err());
    }
}
