//! Process-local game store, used when no database is configured and by the tests.

use std::{collections::HashMap, sync::Arc};

use futures::future::BoxFuture;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::{GameEntity, NewGameEntity, RosterEntity},
    storage::{StorageError, StorageResult},
};

/// Game store keeping every document in a shared hash map.
#[derive(Clone, Default)]
pub struct MemoryGameStore {
    games: Arc<RwLock<HashMap<Uuid, GameEntity>>>,
}

impl MemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GameStore for MemoryGameStore {
    fn create_game(&self, game: NewGameEntity) -> BoxFuture<'static, StorageResult<GameEntity>> {
        let games = self.games.clone();
        Box::pin(async move {
            let entity = game.into_entity(Uuid::new_v4());
            games.write().await.insert(entity.id, entity.clone());
            Ok(entity)
        })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let games = self.games.clone();
        Box::pin(async move { Ok(games.read().await.get(&id).cloned()) })
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let games = self.games.clone();
        Box::pin(async move { Ok(games.read().await.values().cloned().collect()) })
    }

    fn update_roster(
        &self,
        id: Uuid,
        expected_version: u64,
        roster: RosterEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let games = self.games.clone();
        Box::pin(async move {
            let mut guard = games.write().await;
            match guard.get_mut(&id) {
                Some(game) if game.version == expected_version => {
                    game.apply_roster(roster);
                    Ok(())
                }
                _ => Err(StorageError::conflict(id, expected_version)),
            }
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::dao::models::ParticipantEntity;

    fn new_game() -> NewGameEntity {
        NewGameEntity {
            venue: "Parc des Sports".into(),
            date: datetime!(2026-11-02 19:30 UTC),
            max_players: 10,
            created_at: datetime!(2026-10-17 09:00 UTC),
        }
    }

    fn roster_with(id: &str) -> RosterEntity {
        RosterEntity {
            participants: vec![ParticipantEntity {
                id: id.into(),
                name: id.to_uppercase(),
                whatsapp: None,
            }],
            waiting_list: Vec::new(),
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_starts_empty() {
        let store = MemoryGameStore::new();
        let created = store.create_game(new_game()).await.unwrap();

        assert_eq!(created.version, 0);
        assert!(created.participants.is_empty());
        assert!(created.waiting_list.is_empty());

        let found = store.find_game(created.id).await.unwrap();
        assert_eq!(found, Some(created));
    }

    #[tokio::test]
    async fn find_unknown_game_returns_none() {
        let store = MemoryGameStore::new();
        assert_eq!(store.find_game(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_with_current_version_bumps_it() {
        let store = MemoryGameStore::new();
        let created = store.create_game(new_game()).await.unwrap();

        store
            .update_roster(created.id, 0, roster_with("alice"))
            .await
            .unwrap();

        let stored = store.find_game(created.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.participants.len(), 1);
    }

    #[tokio::test]
    async fn stale_version_is_rejected() {
        let store = MemoryGameStore::new();
        let created = store.create_game(new_game()).await.unwrap();
        store
            .update_roster(created.id, 0, roster_with("alice"))
            .await
            .unwrap();

        let err = store
            .update_roster(created.id, 0, roster_with("bob"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict { expected: 0, .. }));

        let stored = store.find_game(created.id).await.unwrap().unwrap();
        assert_eq!(stored.participants[0].id, "alice");
    }

    #[tokio::test]
    async fn update_of_missing_game_conflicts() {
        let store = MemoryGameStore::new();
        let err = store
            .update_roster(Uuid::new_v4(), 0, roster_with("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict { .. }));
    }
}
