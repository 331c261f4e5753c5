#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use workspaceScheduler::error::{Result, SchedulerError};
use workspaceScheduler::models::calendar::{EventRequest, ScheduleRequest};
use workspaceScheduler::models::tool::{ToolCallResult, ToolInfo};
use workspaceScheduler::service::openai_service::LlmClient;
use workspaceScheduler::service::scheduler::SchedulerContext;
use workspaceScheduler::service::time_service::TimeNormalizer;
use workspaceScheduler::service::tool_session::ToolSession;

pub struct FakeCalendar {
    tools: Vec<String>,
    listing: String,
    failing_create: Option<usize>,
    pub list_tool_calls: AtomicUsize,
    pub calls: Mutex<Vec<(String, Value)>>,
}

impl FakeCalendar {
    pub fn with_events(listing: &str) -> Self {
        Self {
            tools: vec![
                "get_calendar_events".to_string(),
                "create_calendar_event".to_string(),
            ],
            listing: listing.to_string(),
            failing_create: None,
            list_tool_calls: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::with_events("[]")
    }

    pub fn without_listing_tool(mut self) -> Self {
        self.tools.retain(|t| t != "get_calendar_events");
        self
    }

    pub fn failing_create_at(mut self, nth: usize) -> Self {
        self.failing_create = Some(nth);
        self
    }

    pub fn total_calls(&self) -> usize {
        self.list_tool_calls.load(Ordering::SeqCst) + self.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, tool: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == tool)
            .map(|(_, args)| args.clone())
            .collect()
    }
}

#[async_trait]
impl ToolSession for FakeCalendar {
    async fn list_tools(&self) -> Result<Vec<ToolInfo>> {
        self.list_tool_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .tools
            .iter()
            .map(|name| ToolInfo {
                name: name.clone(),
                description: None,
                input_schema: None,
            })
            .collect())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallResult> {
        let mut calls = self.calls.lock().unwrap();
        calls.push((name.to_string(), arguments));
        match name {
            "get_calendar_events" => Ok(ToolCallResult::text(self.listing.clone())),
            "create_calendar_event" => {
                let nth = calls.iter().filter(|(n, _)| n == name).count();
                if self.failing_create == Some(nth) {
                    Ok(ToolCallResult::error("Calendar API quota exceeded"))
                } else {
                    Ok(ToolCallResult::text("Event created"))
                }
            }
            other => Err(SchedulerError::Session(format!("unknown tool {}", other))),
        }
    }
}

pub struct FakeLlm {
    reply: String,
    pub prompts: Mutex<Vec<(String, f32)>>,
}

impl FakeLlm {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for FakeLlm {
    async fn generate(
        &self,
        prompt: &str,
        temperature: f32,
    ) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>> {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), temperature));
        Ok(self.reply.clone())
    }
}

pub fn context(calendar: Arc<FakeCalendar>, llm: Option<Arc<FakeLlm>>) -> SchedulerContext {
    SchedulerContext {
        session: calendar,
        llm: llm.map(|l| l as Arc<dyn LlmClient>),
        normalizer: TimeNormalizer::new(chrono_tz::America::New_York),
        calendar_id: "primary".to_string(),
        timeout: Duration::from_secs(5),
    }
}

pub fn workday_request(events: &[(&str, i64)]) -> ScheduleRequest {
    ScheduleRequest {
        start_time: "2024-01-15T09:00".to_string(),
        end_time: "2024-01-15T17:00".to_string(),
        events_to_schedule: events
            .iter()
            .map(|(summary, minutes)| EventRequest {
                summary: summary.to_string(),
                duration_minutes: *minutes,
            })
            .collect(),
        user_prompt: "Find time for these today".to_string(),
        account_id: "me@example.com".to_string(),
    }
}
