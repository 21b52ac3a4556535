use std::sync::Arc;
use anyhow::{Context, Result};
use axum::Router;
use axum::http::{HeaderValue, Method};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use wallet_ledger::routes::create_router;
use wallet_ledger::shared::cache::{
    BalanceCache, DisabledBalanceCache, InMemoryBalanceCache, RedisBalanceCache,
};
use wallet_ledger::shared::config::{AppConfig, CacheBackend};
use wallet_ledger::shared::database::{Database, PgWalletRepository};
use wallet_ledger::shared::services::AppState;
use wallet_ledger::domains::wallet::services::{WalletService, WalletServiceConfig};

// Import models for OpenAPI schema
use wallet_ledger::domains::wallet::models::*;

// OpenAPI 스키마 정의: Swagger 문서 자동 생성
#[derive(OpenApi)]
#[openapi(
    paths(
        wallet_ledger::domains::wallet::handlers::wallet_handler::create_wallet,
        wallet_ledger::domains::wallet::handlers::wallet_handler::get_balance,
        wallet_ledger::domains::wallet::handlers::wallet_handler::create_transaction,
        wallet_ledger::domains::wallet::handlers::wallet_handler::cancel_transaction,
        wallet_ledger::domains::wallet::handlers::wallet_handler::get_transactions,
        wallet_ledger::domains::wallet::handlers::wallet_handler::get_transaction_by_reference
    ),
    components(schemas(
        Wallet,
        CreateWalletRequest,
        CreateWalletResponse,
        WalletBalanceResponse,
        BalanceSnapshot,
        TransactionType,
        TransactionStatus,
        Transaction,
        MutationRequest,
        CancelRequest,
        TransactionOutcome,
        TransactionHistory
    )),
    tags(
        (name = "Wallets", description = "Player wallet balance and transaction endpoints")
    ),
    info(
        title = "Wallet Ledger API",
        description = "Player wallet balances with optimistic concurrency and idempotent transactions",
        version = "1.0.0"
    )
)]
struct ApiDoc;

/// 설정된 백엔드로 잔액 캐시 생성
/// Redis에 연결할 수 없으면 캐시 없이 시작한다 (캐시 장애는 치명적이지 않음)
async fn build_cache(config: &AppConfig) -> Arc<dyn BalanceCache> {
    match config.cache_backend {
        CacheBackend::Redis => match RedisBalanceCache::connect(&config.redis_url).await {
            Ok(cache) => {
                if !cache.is_available().await {
                    warn!("Redis did not answer PING; continuing, reads fall back to the database");
                }
                Arc::new(cache)
            }
            Err(e) => {
                warn!(error = %e, "Redis unavailable at startup; balance cache disabled");
                Arc::new(DisabledBalanceCache)
            }
        },
        CacheBackend::Memory => {
            info!("Using in-process balance cache");
            Arc::new(InMemoryBalanceCache::new())
        }
        CacheBackend::None => {
            info!("Balance cache disabled by configuration");
            Arc::new(DisabledBalanceCache)
        }
    }
}

fn build_cors(config: &AppConfig) -> Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::header::ACCEPT,
        ]);

    Ok(match &config.cors_origin {
        Some(origin) => cors
            .allow_origin(
                origin
                    .parse::<HeaderValue>()
                    .with_context(|| format!("Invalid CORS_ORIGIN: {}", origin))?,
            )
            .allow_credentials(true),
        None => cors.allow_origin(Any),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 로깅
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. 설정
    let config = AppConfig::from_env();

    // 3. DB 연결 + 마이그레이션
    let db = Database::new(&config).await?;
    db.initialize().await?;

    // 4. 캐시, 저장소, 서비스 (요청 처리 전에 모두 생성)
    let cache = build_cache(&config).await;
    let repository = Arc::new(PgWalletRepository::new(db.pool().clone()));
    let wallet_service = WalletService::new(repository, cache.clone(), WalletServiceConfig::from(&config));

    // 5. AppState 생성
    let app_state = AppState::new(wallet_service);

    // Router 생성
    let app = Router::new()
        .merge(create_router())
        .merge(
            SwaggerUi::new("/api")
                .url("/api-docs/openapi.json", ApiDoc::openapi())
        )
        .layer(build_cors(&config)?)
        .with_state(app_state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    info!(
        addr = %config.bind_addr,
        cache_backend = cache.backend(),
        max_attempts = config.mutation_max_attempts,
        "Wallet ledger listening (Swagger UI at /api)"
    );

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
