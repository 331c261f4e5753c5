use std::collections::HashMap;
use std::env;
use std::fs;
use std::time::Duration;

use chrono_tz::Tz;

use crate::error::SchedulerError;

const DEFAULT_TIMEZONE: &str = "America/New_York";
const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MCP_COMMAND: &str = "uvx";
const DEFAULT_MCP_ARGS: &str = "mcp-gsuite --gauth-file .gauth.json --accounts-file .accounts.json --credentials-dir credentials";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_HTTP_PORT: u16 = 8080;

/// `KEY=VALUE` pairs read from the file named by `CONFIG_FILE`.
#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self, SchedulerError> {
        let content = fs::read_to_string(path)
            .map_err(|e| SchedulerError::Config(format!("cannot read {}: {}", path, e)))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, SchedulerError> {
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(SchedulerError::Config(format!(
                    "Invalid config line {}: {}",
                    idx + 1,
                    line
                )));
            };
            let value = value.trim();
            let unquoted = ['"', '\'']
                .iter()
                .find_map(|q| value.strip_prefix(*q).and_then(|v| v.strip_suffix(*q)))
                .unwrap_or(value);
            values.insert(key.trim().to_string(), unquoted.to_string());
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    /// File value first, then the process environment.
    pub fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).or_else(|| env::var(key).ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Api,
    Cli,
}

/// Typed settings for the scheduler and the collaborators it talks to.
#[derive(Debug, Clone)]
pub struct Settings {
    pub run_mode: RunMode,
    /// `None` leaves the language model unconfigured; scheduling then fails per call.
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    pub llm_base_url: String,
    pub timezone: Tz,
    pub request_timeout: Duration,
    pub mcp_command: String,
    pub mcp_args: Vec<String>,
    pub calendar_id: String,
    pub http_port: u16,
}

impl Settings {
    pub fn load<F>(lookup: F) -> Result<Self, SchedulerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let run_mode = match get("RUN_MODE").as_deref() {
            None | Some("api") => RunMode::Api,
            Some("cli") => RunMode::Cli,
            Some(other) => {
                return Err(SchedulerError::Config(format!("Invalid run mode {}", other)));
            }
        };

        let timezone_name = get("SCHEDULER_TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone: Tz = timezone_name
            .parse()
            .map_err(|_| SchedulerError::Config(format!("unknown timezone {}", timezone_name)))?;

        let timeout_secs = match get("REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| SchedulerError::Config(format!("invalid REQUEST_TIMEOUT_SECS {}", raw)))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let http_port = match get("HTTP_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| SchedulerError::Config(format!("invalid HTTP_PORT {}", raw)))?,
            None => DEFAULT_HTTP_PORT,
        };

        let mcp_args = get("MCP_ARGS")
            .unwrap_or_else(|| DEFAULT_MCP_ARGS.to_string())
            .split_whitespace()
            .map(str::to_string)
            .collect();

        Ok(Self {
            run_mode,
            llm_api_key: get("LLM_API_KEY"),
            llm_model: get("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            llm_base_url: get("LLM_BASE_URL").unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            timezone,
            request_timeout: Duration::from_secs(timeout_secs),
            mcp_command: get("MCP_COMMAND").unwrap_or_else(|| DEFAULT_MCP_COMMAND.to_string()),
            mcp_args,
            calendar_id: get("CALENDAR_ID").unwrap_or_else(|| "primary".to_string()),
            http_port,
        })
    }
}
