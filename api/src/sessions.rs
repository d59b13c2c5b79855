use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use trener_core::mode::{ModeHint, ModeResolution, SessionContext};

/// Sessions untouched for this long are forgotten.
pub const SESSION_IDLE_TTL: Duration = Duration::from_secs(12 * 60 * 60);

#[derive(Debug, Clone, Copy)]
struct Entry {
    context: SessionContext,
    touched: Instant,
}

/// Sticky mode per user, held in process memory until it goes idle.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Entry>>,
    idle_ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_ttl(SESSION_IDLE_TTL)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_ttl,
        }
    }

    pub async fn mode(&self, user_id: &str) -> Option<ModeHint> {
        self.sessions
            .lock()
            .await
            .get(user_id)
            .filter(|entry| entry.touched.elapsed() < self.idle_ttl)
            .and_then(|entry| entry.context.mode)
    }

    /// Remember a mode the user chose explicitly.
    pub async fn select(&self, user_id: &str, mode: ModeHint) {
        self.update(user_id, |context| context.select(mode)).await;
    }

    /// Remember the mode a turn resolved, when its classification was confident.
    pub async fn observe(&self, user_id: &str, resolution: &ModeResolution) {
        self.update(user_id, |context| context.observe(resolution)).await;
    }

    async fn update(&self, user_id: &str, change: impl FnOnce(&mut SessionContext)) {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, entry| now.duration_since(entry.touched) < self.idle_ttl);

        let entry = sessions.entry(user_id.to_string()).or_insert(Entry {
            context: SessionContext::default(),
            touched: now,
        });
        change(&mut entry.context);
        entry.touched = now;
    }
}

#[cfg(test)]
mod tests {
    use trener_core::mode::resolve_mode;

    use super::*;

    #[tokio::test]
    async fn confident_mode_sticks_until_another_is_confident() {
        let sessions = SessionStore::new();
        assert_eq!(sessions.mode("u1").await, None);

        sessions
            .observe("u1", &resolve_mode("на обед гречка с курицей", None, false))
            .await;
        assert_eq!(sessions.mode("u1").await, Some(ModeHint::Meals));

        sessions.observe("u1", &resolve_mode("hello there", None, false)).await;
        assert_eq!(sessions.mode("u1").await, Some(ModeHint::Meals));
        assert_eq!(sessions.mode("u2").await, None);
    }

    #[tokio::test]
    async fn explicit_selection_is_remembered() {
        let sessions = SessionStore::new();
        sessions.select("u1", ModeHint::Plan).await;
        assert_eq!(sessions.mode("u1").await, Some(ModeHint::Plan));
    }

    #[tokio::test]
    async fn idle_sessions_expire_and_are_evicted() {
        let sessions = SessionStore::with_idle_ttl(Duration::ZERO);
        sessions.select("u1", ModeHint::Meals).await;
        assert_eq!(sessions.mode("u1").await, None);

        sessions.select("u2", ModeHint::Sets).await;
        assert!(!sessions.sessions.lock().await.contains_key("u1"));
    }
}
