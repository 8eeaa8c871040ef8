use std::sync::Arc;

use sqlx::SqlitePool;

use crate::{config::AppConfig, db};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = db::connect(&config.database_url).await?;
        db::migrate(&db).await?;
        Ok(Self::from_parts(db, config))
    }

    pub fn from_parts(db: SqlitePool, config: Arc<AppConfig>) -> Self {
        Self { db, config }
    }

    #[cfg(test)]
    pub async fn for_tests() -> Self {
        use crate::config::{Environment, JwtConfig, ACCESS_TOKEN_TTL_MINUTES};

        let db = db::connect_in_memory().await.expect("in-memory db");
        let config = Arc::new(AppConfig {
            environment: Environment::Development,
            database_url: "sqlite::memory:".into(),
            host: "127.0.0.1".into(),
            port: 0,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                algorithm: jsonwebtoken::Algorithm::HS256,
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: ACCESS_TOKEN_TTL_MINUTES,
            },
        });
        Self::from_parts(db, config)
    }
}
