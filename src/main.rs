//! chat-widget server binary.
//!
//! Serves the widget API under `/api`. Without an OpenAI key (development
//! only) the mock provider and moderator answer instead.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use chat_widget::adapters::ai::{MockAIProvider, MockModerator, OpenAIModerator, OpenAIProvider};
use chat_widget::adapters::http::{api_router, WidgetAppState};
use chat_widget::adapters::rate_limiter::InMemoryRateLimiter;
use chat_widget::application::WidgetService;
use chat_widget::config::{AppConfig, ServerConfig};
use chat_widget::ports::{AIProvider, Moderator};

/// How often closed rate limit windows are dropped.
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    init_tracing(&config.server);
    config.validate().context("validating configuration")?;

    let (ai, moderator) = model_adapters(&config)?;
    let definition = config.widget.load_definition()?;
    tracing::info!(
        search_fields = definition.search_data.len(),
        threshold = config.widget.match_threshold,
        "widget definition loaded"
    );

    let service = WidgetService::new(ai, moderator, definition.profile, config.widget.threshold()?);
    let limiter = Arc::new(InMemoryRateLimiter::new());
    let settings = config.http_settings();
    let app = api_router(
        WidgetAppState::new(Arc::new(service)),
        limiter.clone(),
        &settings,
    );

    let shutdown = CancellationToken::new();
    if let Some(quota) = settings.rate_limit {
        let token = shutdown.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(PRUNE_INTERVAL);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => limiter.prune(quota).await,
                }
            }
        });
    }

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!(%addr, environment = ?config.server.environment, "chat-widget listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown))
    .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// JSON logs in production, human-readable otherwise. `RUST_LOG` wins over
/// the configured level.
fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if server.is_production() {
        builder.json().init();
    } else {
        builder.pretty().init();
    }
}

fn model_adapters(config: &AppConfig) -> anyhow::Result<(Arc<dyn AIProvider>, Arc<dyn Moderator>)> {
    match (config.ai.completion_config(), config.ai.moderation_config()) {
        (Some(completion), Some(moderation)) => {
            let ai = OpenAIProvider::new(completion).context("building OpenAI provider")?;
            let moderator = OpenAIModerator::new(moderation).context("building OpenAI moderator")?;
            Ok((Arc::new(ai), Arc::new(moderator)))
        }
        _ => {
            tracing::warn!("no OpenAI key configured, using mock model adapters");
            Ok((Arc::new(MockAIProvider::new()), Arc::new(MockModerator::new())))
        }
    }
}

async fn shutdown_signal(token: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
    tracing::info!("shutdown requested");
    token.cancel();
}
