use std::sync::Arc;

use sqlx::PgPool;
use trener_core::generation::Generator;
use trener_core::notes::NoteStore;
use trener_core::orchestrator::OrchestratorConfig;

use crate::config::AppConfig;
use crate::sessions::SessionStore;
use crate::store::PgNoteStore;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub notes: PgNoteStore,
    pub generator: Arc<dyn Generator>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn note_store(&self) -> &dyn NoteStore {
        &self.notes
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            attempt_timeout: self.config.turn_timeout,
        }
    }
}
