use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use viva_reconciler::api::{self, AppState};
use viva_reconciler::config::AppConfig;
use viva_reconciler::database::memory::{InMemoryOrderStore, InMemorySettingsStore};
use viva_reconciler::database::order_repository::OrderStore;
use viva_reconciler::database::settings_repository::SettingsStore;
use viva_reconciler::health::HealthChecker;
use viva_reconciler::logging::{init_tracing, mask_identifier};
use viva_reconciler::payments::provider::ProcessorClient;
use viva_reconciler::payments::VivaClient;
use viva_reconciler::services::{
    CallbackDispatcher, GatewayStatus, NotificationHandler, OrderCorrelator, PaymentInitiator,
    RefundInitiator, ReturnHandler,
};

type Stores = (Arc<dyn OrderStore>, Arc<dyn SettingsStore>, HealthChecker);

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

fn in_memory_stores(health: HealthChecker) -> Stores {
    let orders: Arc<dyn OrderStore> = Arc::new(InMemoryOrderStore::new());
    let settings: Arc<dyn SettingsStore> = Arc::new(InMemorySettingsStore::new());
    (orders, settings, health)
}

#[cfg(feature = "database")]
async fn open_stores(config: &AppConfig, health: HealthChecker) -> anyhow::Result<Stores> {
    use viva_reconciler::database::order_repository::PgOrderRepository;
    use viva_reconciler::database::settings_repository::PgSettingsRepository;
    use viva_reconciler::database::{init_pool_from_config, run_migrations};

    let Some(database) = &config.database else {
        info!("⏭️  No database configured, using in-memory stores");
        return Ok(in_memory_stores(health));
    };

    info!("📊 Initializing database connection pool...");
    let pool = init_pool_from_config(database).await.map_err(|e| {
        error!("Failed to initialize database pool: {}", e);
        e
    })?;
    run_migrations(&pool).await?;
    info!(
        max_connections = pool.options().get_max_connections(),
        "✅ Database connection pool initialized"
    );

    let orders: Arc<dyn OrderStore> = Arc::new(PgOrderRepository::new(pool.clone()));
    let settings: Arc<dyn SettingsStore> = Arc::new(PgSettingsRepository::new(pool.clone()));
    Ok((orders, settings, health.with_database(pool)))
}

#[cfg(not(feature = "database"))]
async fn open_stores(config: &AppConfig, health: HealthChecker) -> anyhow::Result<Stores> {
    if config.database.is_some() {
        warn!("DATABASE_URL is ignored: built without the `database` feature");
    }
    Ok(in_memory_stores(health))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    init_tracing(&config.logging);
    config.validate()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        sandbox = config.gateway.sandbox,
        endpoint = %config.gateway.endpoint(),
        "🚀 Starting Viva Wallet reconciliation service"
    );

    if config.gateway.has_credentials() {
        info!(
            merchant_id = %mask_identifier(&config.gateway.merchant_id),
            "Viva credentials loaded"
        );
    } else {
        warn!("Viva credentials are not configured; outbound calls will be rejected");
    }
    if config.skip_externals {
        info!("⏭️  Skipping database initialization (SKIP_EXTERNALS=true)");
    }

    let health = HealthChecker::new(config.gateway.has_credentials());
    let (orders, settings, health) = open_stores(&config, health).await?;

    let client: Arc<dyn ProcessorClient> = Arc::new(VivaClient::from_gateway(&config.gateway)?);

    let correlator = OrderCorrelator::new(orders.clone());
    let returns = Arc::new(ReturnHandler::new(correlator));
    let notifications = Arc::new(NotificationHandler::new(
        orders.clone(),
        settings.clone(),
        client.clone(),
    ));

    let state = AppState {
        dispatcher: Arc::new(CallbackDispatcher::new(
            returns,
            notifications,
            config.storefront.clone(),
        )),
        initiator: Arc::new(PaymentInitiator::new(
            orders.clone(),
            client.clone(),
            config.gateway.source_code.clone(),
            config.gateway.allow_non_eur,
        )),
        refunds: Arc::new(RefundInitiator::new(orders.clone(), client.clone())),
        gateway: Arc::new(GatewayStatus::new(config.gateway.clone(), settings, client)),
        health,
    };

    let app = api::router(state);
    info!("✅ Routes configured");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("❌ Failed to bind to address {}: {}", addr, e);
        e
    })?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");
    Ok(())
}
