pub mod chat;
pub mod classify;
pub mod health;
pub mod note;
pub mod parse_plan;
pub mod plan;
pub mod profile;
