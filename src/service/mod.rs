pub mod calendar_context;
pub mod event_committer;
pub mod openai_service;
pub mod schedule_proposer;
pub mod scheduler;
pub mod time_service;
pub mod tool_session;

#[cfg(test)]
pub(crate) mod test_support;
