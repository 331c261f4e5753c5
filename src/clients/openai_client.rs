use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const SYSTEM_MESSAGE: &str = "You are a strict JSON scheduling engine. You read scheduling \
    instructions and reply ONLY with the JSON requested, with no markdown, no backticks, and \
    no extra text.";

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

/// Endpoint and model used for chat completions.
#[derive(Debug, Clone)]
pub struct ChatTarget {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
}

pub async fn query_openai(
    client: &reqwest::Client,
    target: &ChatTarget,
    prompt: &str,
    temperature: f32,
) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let request = OpenAIRequest {
        model: target.model.clone(),
        messages: vec![
            OpenAIMessage {
                role: "system".to_string(),
                content: SYSTEM_MESSAGE.to_string(),
            },
            OpenAIMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            },
        ],
        max_tokens: 1500,
        temperature,
    };

    let url = format!("{}/chat/completions", target.base_url.trim_end_matches('/'));
    debug!(url = %url, model = %target.model, temperature, "sending chat completion");
    let response = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", target.api_key))
        .header("Content-Type", "application/json")
        .json(&request)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        warn!(status = %status, body = %text, "chat completion rejected");
        return Err(format!("Request failed with status {}", status).into());
    }

    let parsed: OpenAIResponse = serde_json::from_str(&text)
        .map_err(|e| format!("Failed to parse JSON: {}\nRaw body: {}", e, text))?;

    match parsed.choices.into_iter().next().and_then(|c| c.message.content) {
        Some(content) => Ok(content),
        None => {
            warn!(body = %text, "no choices in chat completion");
            Err("No response from language model".to_string().into())
        }
    }
}
