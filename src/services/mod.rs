pub mod ai_service;
pub mod alert_service;
pub mod analytics_service;
pub mod attempt_service;
pub mod audio_store;
pub mod evaluation_service;
pub mod feedback_parser;
pub mod preference_service;
pub mod prompts;
pub mod question_selector;
pub mod score_service;
pub mod session_service;
