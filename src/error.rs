//! Error types shared by the scheduling pipeline.

/// Failure raised by a scheduling stage or one of its collaborators.
///
/// Every variant renders to the human-readable text that ends up in the
/// `error` field of a scheduling response.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchedulerError {
    /// Missing or malformed configuration, including an unconfigured LLM.
    #[error("configuration error: {0}")]
    Config(String),

    /// The tool session does not advertise a required tool.
    #[error("{tool} tool not available in tool session")]
    CapabilityUnavailable { tool: String },

    /// Caller-supplied data failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The language model produced output that could not be used.
    #[error("{reason}. Response: {excerpt}")]
    Generation { reason: String, excerpt: String },

    /// The language model call itself failed.
    #[error("language model request failed: {0}")]
    Llm(String),

    /// A tool call completed but reported an error.
    #[error("tool `{tool}` failed: {message}")]
    Tool { tool: String, message: String },

    /// Transport or protocol failure on the tool session.
    #[error("tool session error: {0}")]
    Session(String),

    /// An external call did not finish in time.
    #[error("timeout after {seconds}s: {operation}")]
    Timeout { seconds: u64, operation: String },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
