use clap::{Parser, Subcommand};
use inquire::Text;

use crate::config::Settings;
use crate::error::SchedulerError;
use crate::models::calendar::{EventRequest, ScheduleRequest};
use crate::runtime;
use crate::service::scheduler::Scheduler;

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Schedule events inside a window and create them in the calendar.
    Schedule {
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        /// `Summary=minutes`, repeatable.
        #[arg(long = "event", value_parser = parse_event_request, required = true)]
        events: Vec<EventRequest>,
        #[arg(long, default_value = "")]
        prompt: String,
        #[arg(long, default_value = "")]
        account: String,
    },
    /// Ask for the scheduling request interactively.
    SchedulePrompt {},
}

pub async fn cli(settings: Settings) -> Result<(), SchedulerError> {
    let cli = Cli::parse();
    let request = match cli.command {
        Commands::Schedule {
            start,
            end,
            events,
            prompt,
            account,
        } => ScheduleRequest {
            start_time: start,
            end_time: end,
            events_to_schedule: events,
            user_prompt: prompt,
            account_id: account,
        },
        Commands::SchedulePrompt {} => prompt_request()?,
    };

    let (session, ctx) = runtime::start_session(&settings).await?;
    let result = Scheduler::schedule_complete(&ctx, &request).await;
    session.shutdown().await;

    let rendered = serde_json::to_string_pretty(&result.to_response())
        .map_err(|e| SchedulerError::InvalidInput(e.to_string()))?;
    println!("{}", rendered);
    Ok(())
}

fn prompt_request() -> Result<ScheduleRequest, SchedulerError> {
    let ask = |message: &str| {
        Text::new(message)
            .prompt()
            .map_err(|e| SchedulerError::InvalidInput(format!("no answer for '{}': {}", message, e)))
    };
    let user_prompt = ask("What should be scheduled?")?;
    let start_time = ask("Window start (e.g. 2024-01-15T09:00):")?;
    let end_time = ask("Window end (e.g. 2024-01-15T17:00):")?;
    let raw_events = ask("Events as Summary=minutes, separated by ';':")?;
    let events_to_schedule = raw_events
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_event_request)
        .collect::<Result<Vec<_>, _>>()
        .map_err(SchedulerError::InvalidInput)?;
    let account_id = ask("Account email (blank for default):")?;

    Ok(ScheduleRequest {
        start_time,
        end_time,
        events_to_schedule,
        user_prompt,
        account_id,
    })
}

fn parse_event_request(raw: &str) -> Result<EventRequest, String> {
    let (summary, minutes) = raw
        .rsplit_once('=')
        .ok_or_else(|| format!("expected Summary=minutes, got '{}'", raw))?;
    let summary = summary.trim();
    if summary.is_empty() {
        return Err(format!("missing summary in '{}'", raw));
    }
    let duration_minutes = minutes
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|m| *m > 0)
        .ok_or_else(|| format!("duration must be a positive number of minutes in '{}'", raw))?;
    Ok(EventRequest {
        summary: summary.to_string(),
        duration_minutes,
    })
}
