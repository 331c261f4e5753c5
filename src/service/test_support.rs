//! Fakes shared by the service unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, SchedulerError};
use crate::models::tool::{ToolCallResult, ToolInfo};
use crate::service::openai_service::LlmClient;
use crate::service::tool_session::ToolSession;

pub struct FakeSession {
    tools: Vec<String>,
    listing: ToolCallResult,
    failing_create: Option<(usize, String)>,
    listing_tools_fails: bool,
    active: bool,
    pub list_tool_calls: AtomicUsize,
    pub calls: Mutex<Vec<(String, Value)>>,
}

impl FakeSession {
    pub fn new(tools: &[&str]) -> Self {
        Self {
            tools: tools.iter().map(|t| t.to_string()).collect(),
            listing: ToolCallResult::text("[]"),
            failing_create: None,
            listing_tools_fails: false,
            active: true,
            list_tool_calls: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calendar() -> Self {
        Self::new(&["get_calendar_events", "create_calendar_event"])
    }

    pub fn with_listing(mut self, listing: ToolCallResult) -> Self {
        self.listing = listing;
        self
    }

    /// Makes the `nth` (1-based) create call report an error.
    pub fn failing_create_at(mut self, nth: usize, message: &str) -> Self {
        self.failing_create = Some((nth, message.to_string()));
        self
    }

    /// Makes `tools/list` fail while tool calls keep working.
    pub fn failing_tool_list(mut self) -> Self {
        self.listing_tools_fails = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
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
impl ToolSession for FakeSession {
    async fn list_tools(&self) -> Result<Vec<ToolInfo>> {
        self.list_tool_calls.fetch_add(1, Ordering::SeqCst);
        if self.listing_tools_fails {
            return Err(SchedulerError::Session("tools/list not supported".to_string()));
        }
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
            "get_calendar_events" => Ok(self.listing.clone()),
            "create_calendar_event" => {
                let nth = calls.iter().filter(|(n, _)| n == name).count();
                match &self.failing_create {
                    Some((fail_at, message)) if *fail_at == nth => {
                        Ok(ToolCallResult::error(message.clone()))
                    }
                    _ => Ok(ToolCallResult::text("Event created")),
                }
            }
            other => Err(SchedulerError::Session(format!("unknown tool {}", other))),
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

pub struct FakeLlm {
    response: std::result::Result<String, String>,
    pub prompts: Mutex<Vec<(String, f32)>>,
}

impl FakeLlm {
    pub fn replying(body: &str) -> Self {
        Self {
            response: Ok(body.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: &str) -> Self {
        Self {
            response: Err(error.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
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
        match &self.response {
            Ok(body) => Ok(body.clone()),
            Err(err) => Err(err.clone().into()),
        }
    }
}
