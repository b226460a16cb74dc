//! # Council Hours Notification Worker
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/councilhours MAIL_TRANSPORT=log cargo run -p councilhours-worker
//! ```

use anyhow::Context;
use councilhours_shared::db::{migrations, pool};
use councilhours_worker::{
    config::WorkerConfig,
    dispatcher::{Dispatcher, DispatcherConfig},
    mailer,
    queue::NotificationQueue,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "councilhours_worker=debug,councilhours_shared=info".into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env().context("Failed to load configuration")?;
    init_tracing(config.log_json);

    tracing::info!(
        "Council Hours Worker v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let db = pool::create_pool(pool::DatabaseConfig {
        url: config.database_url.clone(),
        max_connections: 5,
        ..Default::default()
    })
    .await
    .context("Failed to connect to database")?;

    migrations::run_migrations(&db)
        .await
        .context("Failed to run database migrations")?;

    let queue = NotificationQueue::with_limits(db.clone(), config.batch_size, config.max_attempts)
        .with_lease(config.lease);
    match queue.pending_count().await {
        Ok(pending) => tracing::info!(pending, "Notification backlog"),
        Err(e) => tracing::warn!(error = %e, "Could not count pending notifications"),
    }

    let dispatcher = Dispatcher::new(
        queue,
        mailer::from_transport(&config.transport),
        DispatcherConfig {
            poll_interval: config.poll_interval,
            from_address: config.from_address.clone(),
        },
    );

    let token = dispatcher.shutdown_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received, finishing current batch..."),
            Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
        }
        token.cancel();
    });

    dispatcher.run().await?;

    pool::close_pool(db).await;
    Ok(())
}
