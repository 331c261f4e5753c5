use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, SchedulerError};
use crate::models::tool::{ToolCallResult, ToolInfo};

/// A live channel to the tool-protocol server hosting the calendar tools.
///
/// Owned by the hosting runtime; scheduling code only borrows it.
#[async_trait]
pub trait ToolSession: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolInfo>>;

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallResult>;

    /// False once the session has been shut down or can no longer be trusted.
    fn is_active(&self) -> bool {
        true
    }
}

/// Runs `call` under a deadline, turning expiry into [`SchedulerError::Timeout`].
pub async fn bounded<T, F>(limit: Duration, operation: &str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(SchedulerError::Timeout {
            seconds: limit.as_secs(),
            operation: operation.to_string(),
        }),
    }
}
