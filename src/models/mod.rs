pub mod attempt;
pub mod preferences;
pub mod question;
pub mod session;
