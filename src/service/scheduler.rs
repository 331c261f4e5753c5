use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::error::SchedulerError;
use crate::models::calendar::{ScheduleRequest, SchedulingResult};
use crate::service::calendar_context::CalendarContextFetcher;
use crate::service::event_committer::EventCommitter;
use crate::service::openai_service::LlmClient;
use crate::service::schedule_proposer::ScheduleProposer;
use crate::service::time_service::TimeNormalizer;
use crate::service::tool_session::ToolSession;

/// Collaborators borrowed by one scheduling call.
///
/// Built by the hosting runtime, which also owns the session lifecycle.
#[derive(Clone)]
pub struct SchedulerContext {
    pub session: Arc<dyn ToolSession>,
    pub llm: Option<Arc<dyn LlmClient>>,
    pub normalizer: TimeNormalizer,
    pub calendar_id: String,
    pub timeout: Duration,
}

pub struct Scheduler;

impl Scheduler {
    /// Fetch context, ask the model for placements, then create them.
    pub async fn schedule_complete(ctx: &SchedulerContext, request: &ScheduleRequest) -> SchedulingResult {
        let span = info_span!("schedule", request_id = %Uuid::new_v4());
        Self::run(ctx, request).instrument(span).await
    }

    async fn run(ctx: &SchedulerContext, request: &ScheduleRequest) -> SchedulingResult {
        let Some(llm) = ctx.llm.as_deref() else {
            let err = SchedulerError::Config(
                "language model client not initialized; check LLM_API_KEY".to_string(),
            );
            warn!(error = %err, "scheduling unavailable");
            return SchedulingResult::failed(err.to_string());
        };

        if let Err(err) = validate(request) {
            warn!(error = %err, "rejecting scheduling request");
            return SchedulingResult::failed(err.to_string());
        }

        let fetcher = CalendarContextFetcher::new(ctx.session.as_ref(), ctx.normalizer, ctx.timeout);
        let context = match fetcher
            .fetch(&request.start_time, &request.end_time, &request.account_id)
            .await
        {
            Ok(context) => context,
            Err(err) => {
                warn!(error = %err, "failed to get scheduling context");
                return SchedulingResult::failed(err.to_string());
            }
        };

        let proposer = ScheduleProposer::new(llm, ctx.normalizer, ctx.timeout);
        let proposals = match proposer
            .propose(
                &context.window,
                &context.existing_events,
                &request.events_to_schedule,
                &request.user_prompt,
            )
            .await
        {
            Ok(proposals) => proposals,
            Err(err) => {
                warn!(error = %err, "failed to generate schedule");
                return SchedulingResult::failed(err.to_string());
            }
        };

        let committer = EventCommitter::new(
            ctx.session.as_ref(),
            ctx.normalizer,
            &ctx.calendar_id,
            ctx.timeout,
        );
        match committer.commit(&proposals, &request.account_id).await {
            Ok(created) => {
                info!(created = created.len(), "scheduling completed");
                SchedulingResult::Scheduled {
                    message: format!(
                        "Scheduling completed! Generated and created {} events in your calendar.",
                        created.len()
                    ),
                    events_created: created,
                    existing_events_considered: context.existing_events,
                }
            }
            Err(failure) => {
                warn!(
                    created = failure.created.len(),
                    proposed = proposals.len(),
                    error = %failure.error,
                    "event creation failed part way"
                );
                SchedulingResult::Failed {
                    error: format!(
                        "Events were generated but creation failed after {} of {}: {}",
                        failure.created.len(),
                        proposals.len(),
                        failure.error
                    ),
                    generated_events: Some(proposals),
                    events_created: failure.created,
                }
            }
        }
    }
}

fn validate(request: &ScheduleRequest) -> Result<(), SchedulerError> {
    if request.start_time.trim().is_empty() || request.end_time.trim().is_empty() {
        return Err(SchedulerError::InvalidInput(
            "start_time and end_time are required".to_string(),
        ));
    }
    if request.events_to_schedule.is_empty() {
        return Err(SchedulerError::InvalidInput(
            "events_to_schedule must not be empty".to_string(),
        ));
    }
    for event in &request.events_to_schedule {
        if event.summary.trim().is_empty() {
            return Err(SchedulerError::InvalidInput(
                "every event needs a summary".to_string(),
            ));
        }
        if event.duration_minutes <= 0 {
            return Err(SchedulerError::InvalidInput(format!(
                "event '{}' needs a positive duration_minutes",
                event.summary
            )));
        }
    }
    Ok(())
}
