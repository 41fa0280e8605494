use logbook::config::AppConfig;
use logbook::error::AppError;
use logbook::routes::create_router;
use logbook::services::{
    insight::InsightService,
    storage::{open_store, StorageService},
};
use logbook::state::AppState;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = AppConfig::from_env()?;

    let store = open_store(&config.storage).await?;
    let storage = StorageService::new(store);
    let insight = InsightService::from_config(&config)?;

    let state = AppState::load(config.clone(), storage, insight).await;

    let app = create_router(state);

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,logbook=debug".into());

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
