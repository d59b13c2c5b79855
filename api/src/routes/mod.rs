pub mod classify;
pub mod health;
pub mod notes;
pub mod plans;
pub mod profile;
pub mod turn;
pub mod workout_plan;
