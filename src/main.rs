//! Crypto Market Proxy Server
//!
//! REST API server that fronts the market-data API with key rotation,
//! response caching, activity logging and a feedback inbox.

use crypto_market_proxy::api::create_router;
use crypto_market_proxy::config::Config;
use crypto_market_proxy::db::DatabasePool;
use crypto_market_proxy::state::AppState;
use market_client::{ClientConfig, FileKeyStore, KeyRotator, MarketClient};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crypto_market_proxy::db::{
    ActionCount, ActivityLog, ActivityStats, DailyCount, Feedback, FeedbackStatus, IpCount,
};
use crypto_market_proxy::error::ErrorResponse;
use crypto_market_proxy::models::{
    ActivityLogsResponse, ActivityStatsResponse, AddKeyRequest, ClearLogsResult, CreatedId,
    FeedbackPage, FeedbackSubmission, HealthResponse, KeyInfo, MarketDataResponse,
    MessageResponse, Pagination, RemoveKeyRequest, StatsTimeframe, StatusUpdateRequest, TopCoin,
    TopMovers,
};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    paths(
        crypto_market_proxy::api::handlers::health_check,
        crypto_market_proxy::api::handlers::get_latest_listings,
        crypto_market_proxy::api::handlers::get_crypto_details,
        crypto_market_proxy::api::handlers::search_cryptocurrencies,
        crypto_market_proxy::api::handlers::get_historical_data,
        crypto_market_proxy::api::handlers::get_top_movers,
        crypto_market_proxy::api::handlers::get_top_fifty,
        crypto_market_proxy::api::activity::get_activity_logs,
        crypto_market_proxy::api::activity::get_activity_stats,
        crypto_market_proxy::api::activity::clear_old_logs,
        crypto_market_proxy::api::feedback::submit_feedback,
        crypto_market_proxy::api::feedback::list_feedback,
        crypto_market_proxy::api::feedback::update_feedback_status,
        crypto_market_proxy::api::feedback::delete_feedback,
        crypto_market_proxy::api::keys::add_api_key,
        crypto_market_proxy::api::keys::remove_api_key,
        crypto_market_proxy::api::keys::list_api_keys,
        crypto_market_proxy::api::keys::reset_api_key_usage,
    ),
    components(
        schemas(
            HealthResponse,
            MessageResponse,
            ErrorResponse,
            Pagination,
            MarketDataResponse,
            TopMovers,
            TopCoin,
            ActivityLog,
            ActivityLogsResponse,
            ActivityStats,
            ActionCount,
            DailyCount,
            IpCount,
            ActivityStatsResponse,
            StatsTimeframe,
            ClearLogsResult,
            Feedback,
            FeedbackStatus,
            FeedbackSubmission,
            FeedbackPage,
            CreatedId,
            StatusUpdateRequest,
            AddKeyRequest,
            RemoveKeyRequest,
            KeyInfo,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Crypto", description = "Market data proxied from the upstream API"),
        (name = "Activity", description = "Client activity log"),
        (name = "Feedback", description = "User feedback inbox"),
        (name = "Keys", description = "Upstream API key management"),
    ),
    info(
        title = "Crypto Market Proxy API",
        version = "0.1.0",
        description = "Caching proxy for cryptocurrency market data",
        license(name = "MIT"),
        contact(name = "Joaquin Bejar", email = "jb@taunais.com")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Initialize tracing
    let default_filter = format!("{},tower_http=debug", config.log_level.0);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Upstream client with key rotation
    let key_store = Arc::new(FileKeyStore::new(
        config.upstream.keys_file.clone(),
        config.upstream.api_key.clone(),
    ));
    let rotator = Arc::new(KeyRotator::new(key_store));
    let market = MarketClient::new(
        ClientConfig {
            base_url: config.upstream.base_url.clone(),
            timeout: config.upstream.timeout(),
        },
        Arc::clone(&rotator),
    )?;
    info!(
        "Using {} upstream API key(s) from {}",
        rotator.list_keys().len(),
        config.upstream.keys_file.display()
    );

    // Create application state
    let state = match config.database.url.clone() {
        Some(url) => {
            let db = DatabasePool::new(&url, &config.database).await?;
            db.run_migrations().await?;
            info!("Database connected and migrations applied");
            AppState::with_database(config.clone(), market, &db)
        }
        None => {
            warn!("DATABASE_URL not set, activity and feedback are kept in memory");
            AppState::new(config.clone(), market)
        }
    };
    let state = Arc::new(state);

    // Periodic key usage reset
    if let Some(period) = config.upstream.key_reset_interval() {
        let rotator = Arc::clone(&rotator);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                match rotator.spawn_blocking(KeyRotator::reset_usage).await {
                    Ok(()) => info!("Scheduled API key usage reset completed"),
                    Err(e) => warn!("Scheduled API key usage reset failed: {}", e),
                }
            }
        });
    }

    let host = config.server.host.clone();
    let port = config.server.port;

    info!("Starting Crypto Market Proxy on {}:{}", host, port);
    info!(
        "Swagger UI available at http://{}:{}/swagger-ui/",
        host, port
    );

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the router
    let app = create_router(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start the server
    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
