pub mod job_run_queries;
pub mod notification_queries;
pub mod trend_queries;
pub mod user_preferences_queries;
