use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Result, SchedulerError};
use crate::models::calendar::{EventRequest, ExistingEvent, ProposedEvent, TimeWindow};
use crate::service::openai_service::LlmClient;
use crate::service::time_service::TimeNormalizer;
use crate::service::tool_session::bounded;

/// Scheduling output must be reproducible.
pub const SCHEDULING_TEMPERATURE: f32 = 0.0;

const EXCERPT_CHARS: usize = 200;
const REQUIRED_KEYS: [&str; 3] = ["summary", "start_time", "end_time"];

pub struct ScheduleProposer<'a> {
    llm: &'a dyn LlmClient,
    normalizer: TimeNormalizer,
    timeout: Duration,
}

impl<'a> ScheduleProposer<'a> {
    pub fn new(llm: &'a dyn LlmClient, normalizer: TimeNormalizer, timeout: Duration) -> Self {
        Self {
            llm,
            normalizer,
            timeout,
        }
    }

    pub async fn propose(
        &self,
        window: &TimeWindow,
        existing: &[ExistingEvent],
        requests: &[EventRequest],
        user_text: &str,
    ) -> Result<Vec<ProposedEvent>> {
        let prompt = self.build_prompt(window, existing, requests, user_text);
        debug!(prompt_len = prompt.len(), existing = existing.len(), "requesting schedule");

        let generation = async {
            self.llm
                .generate(&prompt, SCHEDULING_TEMPERATURE)
                .await
                .map_err(|e| SchedulerError::Llm(e.to_string()))
        };
        let raw = bounded(self.timeout, "schedule generation", generation).await?;
        let proposals = extract_proposals(&raw)?;
        info!(count = proposals.len(), "language model proposed events");
        Ok(proposals)
    }

    pub fn build_prompt(
        &self,
        window: &TimeWindow,
        existing: &[ExistingEvent],
        requests: &[EventRequest],
        user_text: &str,
    ) -> String {
        let existing_json =
            serde_json::to_string_pretty(existing).unwrap_or_else(|_| "[]".to_string());
        let requests_json =
            serde_json::to_string_pretty(requests).unwrap_or_else(|_| "[]".to_string());

        format!(
            "You are a scheduling assistant. Schedule the given events within the specified time range.\n\
             \n\
             USER REQUEST: {user_text}\n\
             \n\
             CONSTRAINTS:\n\
             - Time range: {start} to {end} ({zone})\n\
             - CRITICAL: Avoid conflicts with existing events listed below\n\
             - Follow any specific requirements from the user request\n\
             - Use YYYY-MM-DD HH:MM format for times (24-hour format)\n\
             \n\
             EXISTING EVENTS TO AVOID (DO NOT SCHEDULE OVERLAPPING TIMES):\n\
             {existing_json}\n\
             \n\
             EVENTS TO SCHEDULE:\n\
             {requests_json}\n\
             \n\
             REQUIRED OUTPUT FORMAT - Return ONLY this JSON array with no other text:\n\
             [\n  {{\n    \"summary\": \"Event title\",\n    \"start_time\": \"YYYY-MM-DD HH:MM\",\n    \"end_time\": \"YYYY-MM-DD HH:MM\"\n  }}\n]\n\
             \n\
             Schedule all {count} events avoiding any overlap with existing events. \
             Return ONLY the JSON array, no other text, no explanation, no markdown.",
            user_text = user_text,
            start = self.normalizer.format_minutes(&window.start()),
            end = self.normalizer.format_minutes(&window.end()),
            zone = self.normalizer.zone().name(),
            existing_json = existing_json,
            requests_json = requests_json,
            count = requests.len(),
        )
    }
}

/// Pulls the proposed events out of a raw model reply.
pub fn extract_proposals(raw: &str) -> Result<Vec<ProposedEvent>> {
    let raw = raw.trim();
    let cleaned = strip_code_fence(raw);
    let candidate = match (cleaned.find('['), cleaned.rfind(']')) {
        (Some(open), Some(close)) if open < close => &cleaned[open..=close],
        _ => cleaned,
    };

    let parsed: Value = serde_json::from_str(candidate).map_err(|e| {
        warn!(error = %e, "model reply is not JSON");
        generation_error("Language model returned invalid JSON", raw)
    })?;
    let Value::Array(items) = parsed else {
        return Err(generation_error("Language model did not return a JSON array", raw));
    };

    let mut proposals = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        match to_proposal(&item) {
            Some(proposal) => proposals.push(proposal),
            None => warn!(position = idx + 1, item = %item, "dropping malformed proposal"),
        }
    }

    if proposals.is_empty() {
        return Err(generation_error("No valid events generated by language model", raw));
    }
    Ok(proposals)
}

fn to_proposal(item: &Value) -> Option<ProposedEvent> {
    let object = item.as_object()?;
    let mut fields = REQUIRED_KEYS
        .iter()
        .map(|key| object.get(*key).and_then(Value::as_str).map(str::to_string));
    Some(ProposedEvent {
        summary: fields.next()??,
        start_time: fields.next()??,
        end_time: fields.next()??,
    })
}

fn strip_code_fence(text: &str) -> &str {
    let inner = if let Some((_, rest)) = text.split_once("```json") {
        rest
    } else if let Some((_, rest)) = text.split_once("```") {
        rest
    } else {
        return text;
    };
    inner.split("```").next().unwrap_or(inner).trim()
}

fn generation_error(reason: &str, raw: &str) -> SchedulerError {
    let mut excerpt: String = raw.chars().take(EXCERPT_CHARS).collect();
    if raw.chars().count() > EXCERPT_CHARS {
        excerpt.push_str("...");
    }
    SchedulerError::Generation {
        reason: reason.to_string(),
        excerpt,
    }
}
