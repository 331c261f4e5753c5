use std::convert::Infallible;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use warp::Filter;

use crate::models::calendar::ScheduleRequest;
use crate::service::scheduler::{Scheduler, SchedulerContext};

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    session_active: bool,
}

pub fn routes(
    ctx: Arc<SchedulerContext>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(health_handler);

    let schedule = warp::path("schedule")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(with_context(ctx))
        .and_then(schedule_handler);

    health.or(schedule)
}

fn with_context(
    ctx: Arc<SchedulerContext>,
) -> impl Filter<Extract = (Arc<SchedulerContext>,), Error = Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}

async fn health_handler(ctx: Arc<SchedulerContext>) -> Result<impl warp::Reply, Infallible> {
    let session_active = ctx.session.is_active();
    Ok(warp::reply::json(&HealthResponse {
        status: if session_active { "healthy" } else { "unhealthy" },
        session_active,
    }))
}

async fn schedule_handler(
    request: ScheduleRequest,
    ctx: Arc<SchedulerContext>,
) -> Result<impl warp::Reply, Infallible> {
    info!(
        start = %request.start_time,
        end = %request.end_time,
        events = request.events_to_schedule.len(),
        "schedule request received"
    );
    let result = Scheduler::schedule_complete(&ctx, &request).await;
    Ok(warp::reply::json(&result.to_response()))
}
