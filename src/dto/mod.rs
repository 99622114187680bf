pub mod feedback_dto;
pub mod preferences_dto;
pub mod session_dto;
