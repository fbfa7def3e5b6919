pub mod patient;
pub mod user;
pub mod user_permission;
