use std::str::FromStr;

use anyhow::{bail, Context};
use jsonwebtoken::Algorithm;
use rand::{distributions::Alphanumeric, Rng};

/// Access tokens live for exactly one hour.
pub const ACCESS_TOKEN_TTL_MINUTES: i64 = 60;

const DEFAULT_DATABASE_URL: &str = "sqlite://hola_api.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => bail!("unknown APP_ENV {other:?}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests need not touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV") {
            Some(v) => v.parse()?,
            None => Environment::Production,
        };

        let secret = match lookup("JWT_SECRET").filter(|s| !s.trim().is_empty()) {
            Some(s) => s,
            None if environment == Environment::Development => {
                tracing::warn!(
                    "JWT_SECRET not set; generated an ephemeral development secret, tokens will not survive a restart"
                );
                ephemeral_secret()
            }
            None => bail!("JWT_SECRET must be set when APP_ENV is not development"),
        };

        let algorithm = match lookup("JWT_ALGORITHM") {
            Some(v) => Algorithm::from_str(v.trim())
                .with_context(|| format!("invalid JWT_ALGORITHM {v:?}"))?,
            None => Algorithm::HS256,
        };
        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            bail!("JWT_ALGORITHM must be one of HS256, HS384, HS512");
        }

        let port = match lookup("PORT").or_else(|| lookup("APP_PORT")) {
            Some(v) => v
                .trim()
                .parse::<u16>()
                .with_context(|| format!("invalid PORT {v:?}"))?,
            None => 5000,
        };

        let jwt = JwtConfig {
            secret,
            algorithm,
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "hola-api".into()),
            audience: lookup("JWT_AUDIENCE").unwrap_or_else(|| "hola-api-users".into()),
            ttl_minutes: ACCESS_TOKEN_TTL_MINUTES,
        };

        Ok(Self {
            environment,
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            jwt,
        })
    }
}

fn ephemeral_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}
