use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use crate::error::{Result, SchedulerError};
use crate::models::calendar::{ExistingEvent, TimeRange, TimeWindow};
use crate::service::time_service::TimeNormalizer;
use crate::service::tool_session::{ToolSession, bounded};

pub const LIST_EVENTS_TOOL: &str = "get_calendar_events";

/// What the calendar looked like when the scheduling decision was made.
#[derive(Debug, Clone)]
pub struct SchedulingContext {
    pub window: TimeWindow,
    pub existing_events: Vec<ExistingEvent>,
    pub time_range: TimeRange,
    pub calendar_access_working: bool,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    start: Option<RawEventTime>,
    #[serde(default)]
    end: Option<RawEventTime>,
}

#[derive(Debug, Deserialize)]
struct RawEventTime {
    #[serde(default, rename = "dateTime")]
    date_time: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

impl RawEventTime {
    fn value(&self) -> Option<&str> {
        self.date_time.as_deref().or(self.date.as_deref())
    }
}

pub struct CalendarContextFetcher<'a> {
    session: &'a dyn ToolSession,
    normalizer: TimeNormalizer,
    timeout: Duration,
}

impl<'a> CalendarContextFetcher<'a> {
    pub fn new(session: &'a dyn ToolSession, normalizer: TimeNormalizer, timeout: Duration) -> Self {
        Self {
            session,
            normalizer,
            timeout,
        }
    }

    pub async fn fetch(&self, start: &str, end: &str, account_id: &str) -> Result<SchedulingContext> {
        let window = self.parse_window(start, end)?;
        let time_min = self.normalizer.format_iso(&window.start());
        let time_max = self.normalizer.format_iso(&window.end());
        info!(start = %time_min, end = %time_max, "fetching calendar events");

        self.ensure_listing_available().await?;

        let mut arguments = Map::new();
        arguments.insert("time_min".to_string(), json!(time_min));
        arguments.insert("time_max".to_string(), json!(time_max));
        if !account_id.is_empty() {
            arguments.insert("__user_id__".to_string(), json!(account_id));
        }

        let result = bounded(
            self.timeout,
            LIST_EVENTS_TOOL,
            self.session.call_tool(LIST_EVENTS_TOOL, Value::Object(arguments)),
        )
        .await?;
        if result.is_error {
            return Err(SchedulerError::Tool {
                tool: LIST_EVENTS_TOOL.to_string(),
                message: result.first_text().unwrap_or("Unknown error").to_string(),
            });
        }

        let raw_events: Vec<Value> = result.texts().flat_map(decode_event_list).collect();
        if raw_events.is_empty() {
            info!("no events retrieved from calendar");
        }

        let existing_events: Vec<ExistingEvent> = raw_events
            .into_iter()
            .enumerate()
            .filter_map(|(idx, raw)| self.reduce_event(idx + 1, raw))
            .collect();

        Ok(SchedulingContext {
            time_range: TimeRange {
                start: self.normalizer.format_minutes(&window.start()),
                end: self.normalizer.format_minutes(&window.end()),
            },
            window,
            existing_events,
            calendar_access_working: true,
        })
    }

    fn parse_window(&self, start: &str, end: &str) -> Result<TimeWindow> {
        let (Some(start_dt), Some(end_dt)) = (self.normalizer.parse(start), self.normalizer.parse(end))
        else {
            warn!(start, end, "invalid scheduling window");
            return Err(SchedulerError::InvalidInput(format!(
                "Invalid time format: start_time='{}', end_time='{}'",
                start, end
            )));
        };
        TimeWindow::new(start_dt, end_dt).ok_or_else(|| {
            SchedulerError::InvalidInput(format!(
                "end_time '{}' must be after start_time '{}'",
                end, start
            ))
        })
    }

    async fn ensure_listing_available(&self) -> Result<()> {
        match bounded(self.timeout, "tools/list", self.session.list_tools()).await {
            Ok(tools) => {
                if tools.iter().any(|tool| tool.name == LIST_EVENTS_TOOL) {
                    Ok(())
                } else {
                    Err(SchedulerError::CapabilityUnavailable {
                        tool: LIST_EVENTS_TOOL.to_string(),
                    })
                }
            }
            Err(err) => {
                // Availability is unknown; let the call itself decide.
                warn!(error = %err, "could not list available tools");
                Ok(())
            }
        }
    }

    fn reduce_event(&self, position: usize, raw: Value) -> Option<ExistingEvent> {
        let event: RawEvent = match serde_json::from_value(raw) {
            Ok(event) => event,
            Err(err) => {
                warn!(position, error = %err, "skipping undecodable event");
                return None;
            }
        };
        let start = event.start.as_ref().and_then(RawEventTime::value);
        let end = event.end.as_ref().and_then(RawEventTime::value);
        let (Some(start), Some(end)) = (start, end) else {
            warn!(position, "skipping event with missing start/end time data");
            return None;
        };
        let (Some(start), Some(end)) = (self.normalizer.parse(start), self.normalizer.parse(end)) else {
            warn!(position, start, end, "skipping event with unreadable times");
            return None;
        };
        let summary = event.summary.unwrap_or_else(|| "Event".to_string());
        debug!(position, summary = %summary, "existing event");
        Some(ExistingEvent {
            summary,
            start,
            end,
        })
    }
}

// Text payloads are either a bare array of events or an object with `items`.
fn decode_event_list(text: &str) -> Vec<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => items,
        Ok(Value::Object(mut object)) => match object.remove("items") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        Ok(_) => Vec::new(),
        Err(err) => {
            debug!(error = %err, "ignoring non-JSON content from calendar");
            Vec::new()
        }
    }
}
