pub mod checklist;
pub mod error;
pub mod generation;
pub mod intent;
pub mod mode;
pub mod normalize;
pub mod notes;
pub mod orchestrator;
pub mod plan;
pub mod profile;
pub mod prompts;
