pub mod game;
mod sse;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock, watch};
use uuid::Uuid;

use crate::{auth::JwtVerifier, config::AppConfig, dao::game_store::GameStore, error::ServiceError};

pub use self::sse::SseHub;

pub type SharedState = Arc<AppState>;

const EVENTS_CAPACITY: usize = 64;

/// Central application state: storage handle, configuration, auth and event fan-out.
pub struct AppState {
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    degraded: watch::Sender<bool>,
    events: SseHub,
    roster_gates: DashMap<Uuid, Arc<Mutex<()>>>,
    config: AppConfig,
    verifier: JwtVerifier,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig, verifier: JwtVerifier) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            game_store: RwLock::new(None),
            degraded: degraded_tx,
            events: SseHub::new(EVENTS_CAPACITY),
            roster_gates: DashMap::new(),
            config,
            verifier,
        })
    }

    /// Obtain a handle to the current game store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        let guard = self.game_store.read().await;
        guard.as_ref().cloned()
    }

    /// Game store handle, or [`ServiceError::Degraded`] when none is reachable.
    pub async fn require_game_store(&self) -> Result<Arc<dyn GameStore>, ServiceError> {
        self.game_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new game store implementation and leave degraded mode.
    pub async fn set_game_store(&self, store: Arc<dyn GameStore>) {
        {
            let mut guard = self.game_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Broadcast hub feeding the `/sse/games` stream.
    pub fn events(&self) -> &SseHub {
        &self.events
    }

    /// Lock serialising roster writes of one game within this process.
    pub fn roster_gate(&self, game_id: Uuid) -> Arc<Mutex<()>> {
        self.roster_gates.entry(game_id).or_default().clone()
    }

    /// Forget the gate of `game_id` once no writer holds or awaits it.
    pub fn release_roster_gate(&self, game_id: Uuid) {
        self.roster_gates
            .remove_if(&game_id, |_, gate| Arc::strong_count(gate) == 1);
    }

    #[cfg(test)]
    pub(crate) fn roster_gate_count(&self) -> usize {
        self.roster_gates.len()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn verifier(&self) -> &JwtVerifier {
        &self.verifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> SharedState {
        AppState::new(AppConfig::default(), JwtVerifier::new(b"state-secret"))
    }

    #[test]
    fn released_gate_is_dropped_when_unused() {
        let state = state();
        let id = Uuid::new_v4();

        let gate = state.roster_gate(id);
        assert_eq!(state.roster_gate_count(), 1);
        drop(gate);

        state.release_roster_gate(id);
        assert_eq!(state.roster_gate_count(), 0);
    }

    #[test]
    fn gate_survives_release_while_another_writer_holds_it() {
        let state = state();
        let id = Uuid::new_v4();

        let first = state.roster_gate(id);
        let second = state.roster_gate(id);
        assert!(Arc::ptr_eq(&first, &second));
        drop(first);

        state.release_roster_gate(id);
        assert_eq!(state.roster_gate_count(), 1);
        assert!(Arc::ptr_eq(&second, &state.roster_gate(id)));
    }
}
