use std::time::Duration;

use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::error::SchedulerError;
use crate::models::calendar::{CreatedEvent, ProposedEvent};
use crate::service::time_service::TimeNormalizer;
use crate::service::tool_session::{ToolSession, bounded};

pub const CREATE_EVENT_TOOL: &str = "create_calendar_event";

/// Commit stopped early. Events in `created` stay in the calendar.
#[derive(Debug, Clone)]
pub struct CommitFailure {
    pub created: Vec<CreatedEvent>,
    pub error: SchedulerError,
}

pub struct EventCommitter<'a> {
    session: &'a dyn ToolSession,
    normalizer: TimeNormalizer,
    calendar_id: &'a str,
    timeout: Duration,
}

impl<'a> EventCommitter<'a> {
    pub fn new(
        session: &'a dyn ToolSession,
        normalizer: TimeNormalizer,
        calendar_id: &'a str,
        timeout: Duration,
    ) -> Self {
        Self {
            session,
            normalizer,
            calendar_id,
            timeout,
        }
    }

    /// Creates the events one at a time, in order, stopping at the first failure.
    pub async fn commit(
        &self,
        events: &[ProposedEvent],
        account_id: &str,
    ) -> Result<Vec<CreatedEvent>, CommitFailure> {
        let total = events.len();
        info!(total, "creating calendar events");
        let mut created = Vec::with_capacity(total);

        for (idx, event) in events.iter().enumerate() {
            info!(position = idx + 1, total, summary = %event.summary, "creating event");
            match self.create_one(event, account_id).await {
                Ok(done) => created.push(done),
                Err(error) => {
                    warn!(position = idx + 1, error = %error, "event creation failed");
                    return Err(CommitFailure { created, error });
                }
            }
        }

        info!(created = created.len(), "all events created");
        Ok(created)
    }

    async fn create_one(&self, event: &ProposedEvent, account_id: &str) -> Result<CreatedEvent, SchedulerError> {
        let start = self.parse_time(&event.summary, "start_time", &event.start_time)?;
        let end = self.parse_time(&event.summary, "end_time", &event.end_time)?;

        let mut arguments = Map::new();
        arguments.insert("summary".to_string(), json!(event.summary));
        arguments.insert("start_time".to_string(), json!(self.normalizer.format_iso(&start)));
        arguments.insert("end_time".to_string(), json!(self.normalizer.format_iso(&end)));
        arguments.insert("__calendar_id__".to_string(), json!(self.calendar_id));
        if !account_id.is_empty() {
            arguments.insert("__user_id__".to_string(), json!(account_id));
        }

        let result = bounded(
            self.timeout,
            CREATE_EVENT_TOOL,
            self.session.call_tool(CREATE_EVENT_TOOL, Value::Object(arguments)),
        )
        .await?;
        if result.is_error {
            return Err(SchedulerError::Tool {
                tool: CREATE_EVENT_TOOL.to_string(),
                message: result.first_text().unwrap_or("Unknown error").to_string(),
            });
        }

        Ok(CreatedEvent {
            summary: event.summary.clone(),
            start,
            end,
        })
    }

    fn parse_time(
        &self,
        summary: &str,
        field: &str,
        text: &str,
    ) -> Result<chrono::DateTime<chrono_tz::Tz>, SchedulerError> {
        self.normalizer.parse(text).ok_or_else(|| {
            SchedulerError::InvalidInput(format!(
                "event '{}' has unreadable {} '{}'",
                summary, field, text
            ))
        })
    }
}
