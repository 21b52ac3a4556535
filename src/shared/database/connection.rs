use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;
use crate::shared::config::AppConfig;

// 데이터베이스 연결 풀
// Database connection pool for PostgreSQL (지갑/트랜잭션의 유일한 원본)
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    // 데이터베이스 연결 생성
    // Create database connection
    pub async fn new(config: &AppConfig) -> Result<Self> {
        info!(
            max_connections = config.database_max_connections,
            acquire_timeout_secs = config.database_acquire_timeout_secs,
            "Connecting to database"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(Duration::from_secs(config.database_acquire_timeout_secs))
            .connect(&config.database_url)
            .await
            .context("Failed to connect to database")?;

        info!("Database connection pool established");
        Ok(Self { pool })
    }

    // 연결 풀 반환
    // Get connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // 테이블 생성 (초기화) - 마이그레이션 실행
    // migrations/ 폴더의 모든 .sql 파일을 순서대로 실행
    pub async fn initialize(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(self.pool())
            .await
            .context("Failed to run database migrations")?;

        info!("Database migrations completed");
        Ok(())
    }
}
