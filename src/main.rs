use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use order_fulfillment::api::{self, AppState};
use order_fulfillment::config::{Config, StoreBackend};
use order_fulfillment::domain::access::{Role, StoreAccessGate};
use order_fulfillment::domain::shipment::PepperedCodeGenerator;
use order_fulfillment::metrics::Metrics;
use order_fulfillment::service::FulfillmentService;
use order_fulfillment::store::{MemoryStore, PgStore, Store};
use order_fulfillment::utils::{retry_on_transient, RetryConfig};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO, override with RUST_LOG
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_fulfillment=debug")),
        )
        .init();

    let config = Config::from_env().context("invalid configuration")?;

    tracing::info!(
        environment = %config.environment,
        store = %config.store_backend,
        "🚀 Starting order fulfillment service"
    );

    let store = open_store(&config).await?;

    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    let codes = Arc::new(PepperedCodeGenerator::new(config.shipment_code_pepper.clone()));
    let service = Arc::new(FulfillmentService::new(store.clone(), codes, metrics));
    let gate = Arc::new(StoreAccessGate::new(store));
    let state = web::Data::new(AppState::new(service, gate));

    let bind = (config.http_host.clone(), config.http_port);
    tracing::info!("🌐 Listening on http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || App::new().app_data(state.clone()).configure(api::configure))
        .bind(bind)?
        .run()
        .await?;

    tracing::info!("👋 Shutdown complete");
    Ok(())
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn Store>> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .clone()
                .context("DATABASE_URL must be set")?;
            let max_connections = config.db_max_connections;

            tracing::info!("Connecting to PostgreSQL...");
            let pool = retry_on_transient(RetryConfig::connect(), "db_connect", |_attempt| {
                let url = url.clone();
                async move {
                    PgPoolOptions::new()
                        .max_connections(max_connections)
                        .connect(&url)
                        .await
                }
            })
            .await
            .into_result()
            .context("failed to connect to PostgreSQL")?;

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("failed to run migrations")?;
            tracing::info!("✅ Database ready");

            Ok(Arc::new(PgStore::new(pool)))
        }
        StoreBackend::Memory => {
            let store = MemoryStore::new();
            if config.is_development() {
                seed_demo(&store).await;
            }
            Ok(Arc::new(store))
        }
    }
}

/// Demo users and products for the in-memory backend.
async fn seed_demo(store: &MemoryStore) {
    let customer = store.seed_user(Role::Customer).await;
    let admin = store.seed_user(Role::Admin).await;
    let driver = store.seed_user(Role::Driver).await;
    let widget = store.seed_product("Widget", Decimal::new(1000, 2), 25, true).await;
    let gadget = store.seed_product("Gadget", Decimal::new(4999, 2), 5, true).await;

    tracing::info!(
        customer = %customer,
        admin = %admin,
        driver = %driver,
        widget = %widget,
        gadget = %gadget,
        "🧪 Seeded in-memory demo data"
    );
}
