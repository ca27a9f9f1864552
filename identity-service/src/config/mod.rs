use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    /// Upper bound for each store-backed facade operation, in milliseconds.
    pub store_timeout_ms: u64,
    pub token: TokenConfig,
    pub resolver: ResolverConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Symmetric HS256 signing secret, shared with sibling services that
    /// verify access tokens.
    pub signing_secret: Secret<String>,
    pub issuer: String,
    pub audience: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Minimal permission set served when resolution fails on a display path.
    pub fallback_permissions: Vec<String>,
}

impl IdentityConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = IdentityConfig {
            environment,
            service_name: get_env("SERVICE_NAME", Some("identity-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            store_timeout_ms: get_env("STORE_TIMEOUT_MS", Some("5000"), is_prod)?
                .parse()
                .map_err(|e: std::num::ParseIntError| {
                    AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                })?,
            token: TokenConfig {
                signing_secret: Secret::new(get_env(
                    "TOKEN_SIGNING_SECRET",
                    Some("dev-signing-secret-not-for-production"),
                    is_prod,
                )?),
                issuer: get_env("TOKEN_ISSUER", Some("siteworks-identity"), is_prod)?,
                audience: get_env("TOKEN_AUDIENCE", Some("siteworks-api"), is_prod)?,
                access_token_ttl_minutes: get_env("TOKEN_ACCESS_TTL_MINUTES", Some("60"), is_prod)?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                    })?,
                refresh_token_ttl_days: get_env("TOKEN_REFRESH_TTL_DAYS", Some("30"), is_prod)?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                    })?,
            },
            resolver: ResolverConfig {
                fallback_permissions: get_env("FALLBACK_PERMISSIONS", Some("user.view"), is_prod)?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.token.access_token_ttl_minutes <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "TOKEN_ACCESS_TTL_MINUTES must be positive"
            )));
        }

        if self.token.refresh_token_ttl_days <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "TOKEN_REFRESH_TTL_DAYS must be positive"
            )));
        }

        if self.store_timeout_ms == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "STORE_TIMEOUT_MS must be positive"
            )));
        }

        if self.environment == Environment::Prod
            && self.token.signing_secret.expose_secret().len() < 32
        {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "TOKEN_SIGNING_SECRET must be at least 32 bytes in production"
            )));
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
