pub mod profile_service;
pub mod user_service;
