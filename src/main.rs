use backoffice_rust::{
    create_pool, ensure_schema, router, AppConfig, DocumentStore, MemoryDocumentStore,
    PgDocumentStore, Services, StoreBackend,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;

    // Local timestamps, same layout as the rest of our services
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_max_level(config.tracing_level())
        .with_target(true)
        .with_level(true)
        .init();

    info!("Starting server with config: {:?}", config);

    let store: Arc<dyn DocumentStore> = match config.store.backend {
        StoreBackend::Postgres => {
            let pool = create_pool(&config.database).await?;
            ensure_schema(&pool).await?;
            info!("Database pool created");
            Arc::new(PgDocumentStore::new(pool))
        }
        StoreBackend::Memory => {
            info!("Using in-memory document store; data is lost on shutdown");
            Arc::new(MemoryDocumentStore::new())
        }
    };

    let app = router(Services::new(store)).layer(ServiceBuilder::new());

    let addr = config.listen_addr();
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  /api/clients, /api/invoices, /api/quotations  - records");
    info!("  /api/delivery-orders                          - saved delivery orders");
    info!("  /api/delivery-drafts                          - delivery order wizard");
    info!("  /api/settings, /api/lookups/*                 - company settings and lookups");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
