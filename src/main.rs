use dotenvy::dotenv;
use snafu::ResultExt as _;
use tokio::net::TcpListener;

use tv_backend::api;
use tv_backend::config::Config;
use tv_backend::database::Database;
use tv_backend::error::{
    ApplicationError, BindAddressSnafu, ConnectDatabaseSnafu, WebServerSnafu,
};
use tv_backend::logger;

#[tokio::main]
async fn main() -> Result<(), ApplicationError> {
    dotenv().ok();

    let config = Config::from_env()?;

    let _guard = logger::init(&config)?;

    let database = Database::connect(&config.database)
        .await
        .context(ConnectDatabaseSnafu)?;

    let app = api::create_app(&config, database);
    let router = api::create_router(app);

    let listener = TcpListener::bind(config.host)
        .await
        .context(BindAddressSnafu {
            address: config.host,
        })?;

    tracing::info!(address = %config.host, "listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context(WebServerSnafu)
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }

    tracing::info!("shutting down");
}
