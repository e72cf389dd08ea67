use botbridge_connector::{BotClient, DirectLineClient};
use botbridge_conversation::ReplyCollector;
use botbridge_server::{
    app::{self, AppState},
    config::ServerConfig,
    relay::Relay,
};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CONFIGURATION_HINT: &str = "Update the bot configuration and start again.";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(report) => {
            tracing::error!(error = %report, "invalid configuration");
            eprintln!("{CONFIGURATION_HINT}");
            return ExitCode::SUCCESS;
        }
    };
    tracing::info!(bot_name = %config.bot_name, "Loaded configuration");

    let client = match DirectLineClient::new(&config.direct_line, config.token_source()) {
        Ok(client) => client,
        Err(report) => {
            tracing::error!(error = %report, "failed to build bot connector client");
            return ExitCode::FAILURE;
        }
    };
    let client: Arc<dyn BotClient> = Arc::new(client);

    let relay = Relay::new(
        client,
        ReplyCollector::new(config.bot_name.clone(), config.poll.clone()),
        config.end_conversation.clone(),
    );
    let app = app::router(Arc::new(AppState::new(relay)));

    let listener = match tokio::net::TcpListener::bind(&config.listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %config.listen_addr, error = %e, "failed to bind to address");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("listening on http://{}", config.listen_addr);

    if let Err(e) = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server error");
        return ExitCode::FAILURE;
    }

    tracing::info!("server stopped");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
