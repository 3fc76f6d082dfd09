#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{GameEntity, NewGameEntity, RosterEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the document store holding game records.
pub trait GameStore: Send + Sync {
    /// Persist a new game, letting the store allocate its identifier.
    fn create_game(&self, game: NewGameEntity) -> BoxFuture<'static, StorageResult<GameEntity>>;
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>>;
    /// Replace the roster of a game only if its stored version still equals
    /// `expected_version`, bumping the version on success.
    ///
    /// Returns [`StorageError::Conflict`](crate::dao::storage::StorageError::Conflict)
    /// when the version moved on or the game no longer exists.
    fn update_roster(
        &self,
        id: Uuid,
        expected_version: u64,
        roster: RosterEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
