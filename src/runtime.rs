use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use crate::clients::mcp_client::McpSession;
use crate::config::Settings;
use crate::error::SchedulerError;
use crate::handlers::http;
use crate::service::openai_service::{LlmClient, OpenAIService};
use crate::service::scheduler::SchedulerContext;
use crate::service::time_service::TimeNormalizer;

/// Starts the tool server and wires the scheduler's collaborators.
///
/// The caller owns the returned session and must shut it down.
pub async fn start_session(settings: &Settings) -> Result<(Arc<McpSession>, SchedulerContext), SchedulerError> {
    let session = Arc::new(McpSession::connect(&settings.mcp_command, &settings.mcp_args).await?);

    let llm: Option<Arc<dyn LlmClient>> = match &settings.llm_api_key {
        Some(key) => Some(Arc::new(OpenAIService::new(
            key.clone(),
            settings.llm_model.clone(),
            settings.llm_base_url.clone(),
        ))),
        None => {
            warn!("LLM_API_KEY not set; scheduling requests will be rejected");
            None
        }
    };

    let ctx = SchedulerContext {
        session: session.clone(),
        llm,
        normalizer: TimeNormalizer::new(settings.timezone),
        calendar_id: settings.calendar_id.clone(),
        timeout: settings.request_timeout,
    };
    Ok((session, ctx))
}

pub async fn run_api(settings: Settings) -> Result<(), SchedulerError> {
    let (session, ctx) = start_session(&settings).await?;
    let addr = SocketAddr::from(([127, 0, 0, 1], settings.http_port));
    info!(%addr, timezone = %settings.timezone, "scheduler listening");

    let routes = http::routes(Arc::new(ctx));
    tokio::select! {
        _ = warp::serve(routes).run(addr) => {}
        _ = shutdown_requested(tokio::signal::ctrl_c()) => info!("shutting down"),
    }

    session.shutdown().await;
    Ok(())
}

/// Resolves when `signal` fires. Never resolves if the listener could not be installed.
async fn shutdown_requested<S>(signal: S)
where
    S: Future<Output = io::Result<()>>,
{
    if let Err(err) = signal.await {
        warn!(error = %err, "failed to listen for shutdown signal; serving until killed");
        std::future::pending::<()>().await;
    }
}
