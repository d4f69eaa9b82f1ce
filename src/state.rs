//! Application state: the content catalog, the generation client, and the
//! live sessions (one `SessionController` per session id).
//!
//! Each session sits behind its own mutex. Handlers lock it only for a
//! synchronous transition and never across a generation call, so a snapshot
//! can be read while a call is in flight.
//!
//! HTTP sessions expire after `SESSION_IDLE_SECS` without a request; a
//! background sweeper drops them. WebSocket sessions live exactly as long as
//! their connection. `MAX_SESSIONS` caps the registry as a whole.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::config::load_agent_config_from_env;
use crate::error::ApiError;
use crate::generation::GenerationClient;
use crate::schema::SchemaError;
use crate::session::SessionController;

pub type SessionHandle = Arc<Mutex<SessionController>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionLimits {
    pub idle_ttl: Duration,
    pub max_live: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self { idle_ttl: Duration::from_secs(30 * 60), max_live: 10_000 }
    }
}

impl SessionLimits {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            idle_ttl: env_parse::<u64>("SESSION_IDLE_SECS").map(Duration::from_secs).unwrap_or(d.idle_ttl),
            max_live: env_parse::<usize>("MAX_SESSIONS").unwrap_or(d.max_live),
        }
    }

    /// How often the sweeper runs: a quarter of the idle window, 1 s to 60 s.
    fn sweep_period(&self) -> Duration {
        (self.idle_ttl / 4).clamp(Duration::from_secs(1), Duration::from_secs(60))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(target: "careersim_backend", key, value = %raw, "Ignoring unparsable setting");
            None
        }
    }
}

/// Who owns a session's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionScope {
    /// Created by `POST /session`; expires when idle.
    Http,
    /// Bound to one WebSocket; removed on disconnect, never swept.
    Connection,
}

struct SessionEntry {
    handle: SessionHandle,
    scope: SessionScope,
    last_seen: Instant,
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub generator: GenerationClient,
    pub limits: SessionLimits,
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
}

impl AppState {
    /// Build state from env: load config, build the catalog, init the generation client.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Result<Self, SchemaError> {
        // Load TOML config if provided (prompts + catalog overrides).
        let cfg = load_agent_config_from_env().unwrap_or_default();

        let catalog = Catalog::builtin_with(cfg.roles);
        for role in catalog.roles() {
            info!(target: "careersim_backend", id = %role.id, challenges = role.challenges.len(), "Catalog role loaded");
        }

        let generator = GenerationClient::from_env(cfg.prompts)?;
        let limits = SessionLimits::from_env();
        info!(target: "careersim_backend", idle_secs = limits.idle_ttl.as_secs(), max_live = limits.max_live, "Session limits");
        Ok(Self::with_parts(catalog, generator).with_limits(limits))
    }

    pub fn with_parts(catalog: Catalog, generator: GenerationClient) -> Self {
        Self {
            catalog: Arc::new(catalog),
            generator,
            limits: SessionLimits::default(),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_limits(mut self, limits: SessionLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Register a fresh, unauthenticated session. At capacity, idle HTTP
    /// sessions are swept first; if that frees nothing the request is refused.
    #[instrument(level = "debug", skip(self))]
    pub async fn create_session(&self, scope: SessionScope) -> Result<(String, SessionHandle), ApiError> {
        let id = Uuid::new_v4().to_string();
        let handle = Arc::new(Mutex::new(SessionController::new(self.catalog.clone())));
        let now = Instant::now();

        let (expired, live) = {
            let mut sessions = self.sessions.write().await;
            let expired = if sessions.len() >= self.limits.max_live {
                take_expired(&mut sessions, now, self.limits.idle_ttl)
            } else {
                Vec::new()
            };
            if sessions.len() >= self.limits.max_live {
                (expired, None)
            } else {
                sessions.insert(id.clone(), SessionEntry { handle: handle.clone(), scope, last_seen: now });
                (expired, Some(sessions.len()))
            }
        };
        retire(expired, "expired").await;

        match live {
            Some(live) => {
                info!(target: "session", session_id = %id, ?scope, live, "Session created");
                Ok((id, handle))
            }
            None => {
                warn!(target: "session", max_live = self.limits.max_live, "Session limit reached");
                Err(ApiError::SessionLimit(self.limits.max_live))
            }
        }
    }

    /// Look up a session and mark it as used.
    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn get_session(&self, id: &str) -> Option<SessionHandle> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(id)?;
        entry.last_seen = Instant::now();
        Some(entry.handle.clone())
    }

    /// Drop a session. A call still in flight keeps its own handle and its
    /// result lands on a controller nobody can reach any more.
    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn remove_session(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id);
        match removed {
            Some(entry) => {
                retire(vec![(id.to_string(), entry.handle)], "removed").await;
                true
            }
            None => false,
        }
    }

    /// Drop HTTP sessions unused for at least the idle window as of `now`.
    pub async fn sweep_idle(&self, now: Instant) -> usize {
        let expired = {
            let mut sessions = self.sessions.write().await;
            take_expired(&mut sessions, now, self.limits.idle_ttl)
        };
        let count = expired.len();
        retire(expired, "expired").await;
        count
    }

    pub async fn live_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }
}

fn take_expired(
    sessions: &mut HashMap<String, SessionEntry>,
    now: Instant,
    idle_ttl: Duration,
) -> Vec<(String, SessionHandle)> {
    let ids: Vec<String> = sessions
        .iter()
        .filter(|(_, e)| e.scope == SessionScope::Http && now.saturating_duration_since(e.last_seen) >= idle_ttl)
        .map(|(id, _)| id.clone())
        .collect();
    ids.into_iter()
        .filter_map(|id| sessions.remove(&id).map(|e| (id, e.handle)))
        .collect()
}

/// Log out dropped sessions so any in-flight reply is discarded.
async fn retire(dropped: Vec<(String, SessionHandle)>, reason: &'static str) {
    for (id, handle) in dropped {
        handle.lock().await.logout();
        info!(target: "session", session_id = %id, reason, "Session dropped");
    }
}

/// Periodically expire idle HTTP sessions for the life of the process.
pub fn spawn_session_sweeper(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(state.limits.sweep_period());
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            let swept = state.sweep_idle(Instant::now()).await;
            if swept > 0 {
                let live = state.live_sessions().await;
                info!(target: "session", swept, live, "Idle sessions expired");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::testing::{client, ScriptedBackend};

    fn state(limits: SessionLimits) -> AppState {
        AppState::with_parts(Catalog::default(), client(ScriptedBackend::new(vec![]))).with_limits(limits)
    }

    const MINUTE: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn idle_http_sessions_expire_but_connections_stay() {
        let state = state(SessionLimits { idle_ttl: MINUTE, max_live: 10 });
        let (http_id, http) = state.create_session(SessionScope::Http).await.unwrap();
        let (ws_id, _) = state.create_session(SessionScope::Connection).await.unwrap();
        http.lock().await.login();

        assert_eq!(state.sweep_idle(Instant::now()).await, 0);
        assert_eq!(state.sweep_idle(Instant::now() + MINUTE).await, 1);

        assert!(state.get_session(&http_id).await.is_none());
        assert!(state.get_session(&ws_id).await.is_some());
        assert!(!http.lock().await.is_authenticated(), "dropped session is logged out");
    }

    #[tokio::test]
    async fn lookups_keep_a_session_alive() {
        let state = state(SessionLimits { idle_ttl: MINUTE, max_live: 10 });
        let (id, _) = state.create_session(SessionScope::Http).await.unwrap();
        let created = Instant::now();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(state.get_session(&id).await.is_some());

        // Idle window measured from creation has passed, but not from the lookup.
        assert_eq!(state.sweep_idle(created + MINUTE).await, 0);
        assert_eq!(state.live_sessions().await, 1);
    }

    #[tokio::test]
    async fn full_registry_refuses_then_reclaims_idle_sessions() {
        let state = state(SessionLimits { idle_ttl: Duration::from_millis(30), max_live: 2 });
        state.create_session(SessionScope::Http).await.unwrap();
        state.create_session(SessionScope::Connection).await.unwrap();

        let Err(err) = state.create_session(SessionScope::Http).await else { panic!("registry is full") };
        assert!(matches!(err, ApiError::SessionLimit(2)));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(state.create_session(SessionScope::Http).await.is_ok(), "idle HTTP session reclaimed");
        assert_eq!(state.live_sessions().await, 2);
    }

    #[test]
    fn sweep_period_is_bounded() {
        let quick = SessionLimits { idle_ttl: Duration::from_secs(2), max_live: 1 };
        assert_eq!(quick.sweep_period(), Duration::from_secs(1));
        assert_eq!(SessionLimits::default().sweep_period(), Duration::from_secs(60));
    }
}
