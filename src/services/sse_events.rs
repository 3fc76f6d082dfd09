use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        format_timestamp,
        sse::{GameChangedEvent, ServerEvent, SystemStatus},
    },
    state::{SharedState, game::Game},
};

const EVENT_GAME_CREATED: &str = "game.created";
const EVENT_GAME_UPDATED: &str = "game.updated";
const EVENT_SYSTEM_STATUS: &str = "system.status";

/// Announce a newly scheduled game.
pub fn broadcast_game_created(state: &SharedState, game: &Game) {
    send_event(state, EVENT_GAME_CREATED, &GameChangedEvent::from(game));
}

/// Announce a roster change so open pages can refresh occupancy.
pub fn broadcast_game_updated(state: &SharedState, game: &Game) {
    send_event(state, EVENT_GAME_UPDATED, &GameChangedEvent::from(game));
}

/// Forward degraded mode transitions to every connected client.
pub fn spawn_degraded_broadcaster(state: SharedState) {
    let mut watcher = state.degraded_watcher();
    tokio::spawn(async move {
        while watcher.changed().await.is_ok() {
            let degraded = *watcher.borrow_and_update();
            send_event(&state, EVENT_SYSTEM_STATUS, &SystemStatus { degraded });
        }
    });
}

fn send_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.events().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize SSE payload"),
    }
}

impl From<&Game> for GameChangedEvent {
    fn from(game: &Game) -> Self {
        Self {
            game_id: game.id,
            venue: game.venue.clone(),
            date: format_timestamp(game.date),
            max_players: game.max_players,
            participant_count: game.participants.len(),
            waiting_count: game.waiting_list.len(),
            version: game.version,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use time::macros::datetime;
    use tokio::time::timeout;
    use uuid::Uuid;

    use super::*;
    use crate::{auth::JwtVerifier, config::AppConfig, state::AppState};

    fn sample_game() -> Game {
        Game {
            id: Uuid::new_v4(),
            venue: "Five Arena".into(),
            date: datetime!(2026-11-03 19:00 UTC),
            max_players: 10,
            participants: Vec::new(),
            waiting_list: Vec::new(),
            created_at: datetime!(2026-10-17 08:00 UTC),
            version: 3,
        }
    }

    #[tokio::test]
    async fn game_updates_carry_occupancy_only() {
        let state = AppState::new(AppConfig::default(), JwtVerifier::new(b"secret"));
        let mut receiver = state.events().subscribe();

        let game = sample_game();
        broadcast_game_updated(&state, &game);

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some("game.updated"));
        let payload: serde_json::Value = serde_json::from_str(&event.data).unwrap();
        assert_eq!(payload["participant_count"], 0);
        assert_eq!(payload["version"], 3);
        assert!(payload.get("participants").is_none());
    }

    #[tokio::test]
    async fn degraded_transitions_are_broadcast() {
        let state = AppState::new(AppConfig::default(), JwtVerifier::new(b"secret"));
        let mut receiver = state.events().subscribe();
        spawn_degraded_broadcaster(state.clone());

        state.update_degraded(false).await;

        let event = timeout(Duration::from_secs(1), receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.event.as_deref(), Some("system.status"));
        assert_eq!(event.data, r#"{"degraded":false}"#);
    }
}
