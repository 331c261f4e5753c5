use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize, Serializer};

const MINUTE_FORMAT: &str = "%Y-%m-%d %H:%M";

fn minute_format<S: Serializer>(value: &DateTime<Tz>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.format(MINUTE_FORMAT).to_string())
}

fn iso_format<S: Serializer>(value: &DateTime<Tz>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_rfc3339())
}

/// Bounds of a scheduling attempt. `start` is always before `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Tz>,
    end: DateTime<Tz>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Tz>, end: DateTime<Tz>) -> Option<Self> {
        if start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    pub fn start(&self) -> DateTime<Tz> {
        self.start
    }

    pub fn end(&self) -> DateTime<Tz> {
        self.end
    }
}

/// Window bounds rendered at minute precision, echoed back with the context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

/// Snapshot of a booking that already exists in the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExistingEvent {
    pub summary: String,
    #[serde(rename = "start_time", serialize_with = "minute_format")]
    pub start: DateTime<Tz>,
    #[serde(rename = "end_time", serialize_with = "minute_format")]
    pub end: DateTime<Tz>,
}

/// An event the caller wants placed somewhere in the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRequest {
    pub summary: String,
    pub duration_minutes: i64,
}

/// A placement suggested by the language model, times still as emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedEvent {
    pub summary: String,
    pub start_time: String,
    pub end_time: String,
}

/// Confirmation that an event was written to the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedEvent {
    pub summary: String,
    #[serde(rename = "start_time", serialize_with = "iso_format")]
    pub start: DateTime<Tz>,
    #[serde(rename = "end_time", serialize_with = "iso_format")]
    pub end: DateTime<Tz>,
}

/// Caller-facing scheduling request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleRequest {
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(default)]
    pub events_to_schedule: Vec<EventRequest>,
    #[serde(default)]
    pub user_prompt: String,
    #[serde(default, alias = "__user_id__")]
    pub account_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchedulingResult {
    Scheduled {
        message: String,
        events_created: Vec<CreatedEvent>,
        existing_events_considered: Vec<ExistingEvent>,
    },
    Failed {
        error: String,
        /// Proposal that was being committed when the failure happened.
        generated_events: Option<Vec<ProposedEvent>>,
        /// Events written before the failure. They are not rolled back.
        events_created: Vec<CreatedEvent>,
    },
}

impl SchedulingResult {
    pub fn failed(error: impl Into<String>) -> Self {
        SchedulingResult::Failed {
            error: error.into(),
            generated_events: None,
            events_created: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SchedulingResult::Scheduled { .. })
    }

    pub fn to_response(&self) -> SchedulingResponse {
        match self {
            SchedulingResult::Scheduled {
                message,
                events_created,
                existing_events_considered,
            } => SchedulingResponse {
                success: true,
                message: Some(message.clone()),
                events_created: Some(events_created.clone()),
                existing_events_considered: Some(existing_events_considered.clone()),
                generated_events: None,
                error: None,
            },
            SchedulingResult::Failed {
                error,
                generated_events,
                events_created,
            } => SchedulingResponse {
                success: false,
                message: None,
                events_created: if events_created.is_empty() {
                    None
                } else {
                    Some(events_created.clone())
                },
                existing_events_considered: None,
                generated_events: generated_events.clone(),
                error: Some(error.clone()),
            },
        }
    }
}

/// Wire shape of a [`SchedulingResult`].
#[derive(Debug, Clone, Serialize)]
pub struct SchedulingResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events_created: Option<Vec<CreatedEvent>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_events_considered: Option<Vec<ExistingEvent>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_events: Option<Vec<ProposedEvent>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
