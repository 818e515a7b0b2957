pub mod ai_response_parser;
pub mod analysis_cache;
pub mod change_detector;
pub mod chat_service;
pub mod job_scheduler_service;
pub mod llm_service;
pub mod notification_composer;
pub mod notification_service;
pub mod significance;
pub mod trend_service;
pub mod user_preference_service;
