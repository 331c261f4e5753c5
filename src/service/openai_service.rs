use async_trait::async_trait;

use crate::clients::openai_client::{self, ChatTarget};

/// Text generation backend used by the scheduler.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        temperature: f32,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

pub struct OpenAIService {
    target: ChatTarget,
    http: reqwest::Client,
}

impl OpenAIService {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            target: ChatTarget {
                base_url,
                model,
                api_key,
            },
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmClient for OpenAIService {
    async fn generate(
        &self,
        prompt: &str,
        temperature: f32,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        openai_client::query_openai(&self.http, &self.target, prompt, temperature).await
    }
}
