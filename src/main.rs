//! ChowBuddy WhatsApp Commerce Bot
//!
//! Main application entry point

use std::sync::Arc;

use tracing::info;

use ChowBuddy::{
    config::Settings,
    dispatch::{EventDispatcher, PaymentReconciler, ReconcileManager},
    services::ServiceFactory,
    storage::postgres::{create_pool, run_migrations, PgOrderStore, PgSessionStore},
    storage::{OrderStore, SessionStore},
    utils::logging,
    webhook::{self, WebhookState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;
    settings.validate()?;

    // Initialize logging
    logging::init_logging(&settings.logging)?;

    info!("Starting ChowBuddy commerce bot...");

    // Initialize database connection
    info!("Connecting to database...");
    let pool = create_pool(&settings.database).await?;
    run_migrations(&pool).await?;

    // Initialize stores
    let sessions: Arc<dyn SessionStore> = Arc::new(PgSessionStore::new(pool.clone()));
    let orders: Arc<dyn OrderStore> = Arc::new(PgOrderStore::new(pool));

    // Initialize external service adapters
    info!("Initializing services...");
    let redis_client = redis::Client::open(settings.redis.url.clone())?;
    let services = ServiceFactory::new(&settings, redis_client)?;

    // Wire the dispatcher
    let dispatcher = Arc::new(EventDispatcher::new(
        sessions,
        orders.clone(),
        services.clone(),
        settings.shop.clone(),
        settings.dispatch.clone(),
    ));

    // Start the payment reconciliation sweep
    let reconciler = PaymentReconciler::new(
        dispatcher.clone(),
        orders,
        services.payments.clone(),
        &settings.payment,
    );
    let mut reconcile_manager = ReconcileManager::new(reconciler, &settings.dispatch);
    reconcile_manager.start();

    info!("ChowBuddy is ready!");

    // Serve the webhook endpoints until shutdown
    let state = WebhookState::new(dispatcher, &settings);
    webhook::serve(state, &settings.server.host, settings.server.port).await?;

    reconcile_manager.stop();
    info!("ChowBuddy has been shut down.");

    Ok(())
}
