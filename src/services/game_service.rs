//! Game lifecycle: scheduling, listing, and the join/cancel roster workflow.
//!
//! Roster changes are read-modify-write cycles against the store. Within this
//! process they are serialised per game; across processes the store's
//! versioned write rejects stale updates and the cycle is replayed.

use std::time::Duration;

use rand::Rng;
use time::OffsetDateTime;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    dao::{game_store::GameStore, models::NewGameEntity, storage::StorageError},
    dto::game::{
        CancelResponse, CreateGameRequest, GameDetails, GameListItem, JoinResponse,
        ListGamesQuery,
    },
    error::ServiceError,
    services::sse_events,
    state::{
        SharedState,
        game::{Game, RosterError},
    },
};

const RETRY_BASE_MS: u64 = 15;
const RETRY_JITTER_MS: u64 = 25;

/// Schedule a new game with empty rosters.
pub async fn create_game(
    state: &SharedState,
    admin: &AuthenticatedUser,
    request: CreateGameRequest,
) -> Result<GameDetails, ServiceError> {
    let venue = request.venue.trim();
    if venue.is_empty() {
        return Err(ServiceError::InvalidInput("venue must not be empty".into()));
    }

    let store = state.require_game_store().await?;
    let entity = store
        .create_game(NewGameEntity {
            venue: venue.to_owned(),
            date: request.date,
            max_players: request
                .max_players
                .unwrap_or_else(|| state.config().default_max_players()),
            created_at: OffsetDateTime::now_utc(),
        })
        .await?;

    let game = Game::from(entity);
    info!(
        game_id = %game.id,
        user_id = %admin.id,
        max_players = game.max_players,
        "game created"
    );
    sse_events::broadcast_game_created(state, &game);

    Ok(GameDetails::build(game, &admin.id, state.config()))
}

/// Fetch one game as seen by `viewer`.
pub async fn get_game(
    state: &SharedState,
    viewer: &AuthenticatedUser,
    id: Uuid,
) -> Result<GameDetails, ServiceError> {
    let game = load_game(state, id).await?;
    Ok(GameDetails::build(game, &viewer.id, state.config()))
}

/// List games by kick-off, earliest first.
pub async fn list_games(
    state: &SharedState,
    viewer: &AuthenticatedUser,
    query: ListGamesQuery,
) -> Result<Vec<GameListItem>, ServiceError> {
    let store = state.require_game_store().await?;
    let now = OffsetDateTime::now_utc();

    let mut games = store
        .list_games()
        .await?
        .into_iter()
        .map(Game::from)
        .filter(|game| !query.upcoming || game.date >= now)
        .collect::<Vec<_>>();
    games.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.created_at.cmp(&b.created_at)));

    Ok(games
        .iter()
        .map(|game| GameListItem::build(game, &viewer.id, state.config()))
        .collect())
}

/// Take a slot, or queue up when the game is full.
pub async fn join_game(
    state: &SharedState,
    user: &AuthenticatedUser,
    id: Uuid,
) -> Result<JoinResponse, ServiceError> {
    let participant = user.as_participant();
    let (game, outcome) =
        mutate_roster(state, id, &user.id, |game| game.join(participant.clone())).await?;
    Ok(JoinResponse::new(
        outcome,
        GameDetails::build(game, &user.id, state.config()),
    ))
}

/// Give up a slot (promoting the head of the waiting list) or leave the queue.
pub async fn cancel_participation(
    state: &SharedState,
    user: &AuthenticatedUser,
    id: Uuid,
) -> Result<CancelResponse, ServiceError> {
    let (game, outcome) = mutate_roster(state, id, &user.id, |game| game.cancel(&user.id)).await?;
    Ok(CancelResponse::new(
        outcome,
        GameDetails::build(game, &user.id, state.config()),
    ))
}

async fn load_game(state: &SharedState, id: Uuid) -> Result<Game, ServiceError> {
    let store = state.require_game_store().await?;
    store
        .find_game(id)
        .await?
        .map(Game::from)
        .ok_or_else(|| ServiceError::NotFound(format!("game `{id}` not found")))
}

/// Apply `rule` to a freshly read game and write the roster back, replaying
/// the whole cycle when another writer got there first.
async fn mutate_roster<T, F>(
    state: &SharedState,
    id: Uuid,
    user_id: &str,
    rule: F,
) -> Result<(Game, T), ServiceError>
where
    F: FnMut(&mut Game) -> Result<T, RosterError>,
{
    let store = state.require_game_store().await?;
    let gate = state.roster_gate(id);
    let result = {
        let _guard = gate.lock().await;
        write_roster(state, store.as_ref(), id, user_id, rule).await
    };
    drop(gate);
    state.release_roster_gate(id);
    result
}

async fn write_roster<T, F>(
    state: &SharedState,
    store: &dyn GameStore,
    id: Uuid,
    user_id: &str,
    mut rule: F,
) -> Result<(Game, T), ServiceError>
where
    F: FnMut(&mut Game) -> Result<T, RosterError>,
{
    let max_attempts = state.config().max_write_attempts();
    for attempt in 1..=max_attempts {
        let mut game = store
            .find_game(id)
            .await?
            .map(Game::from)
            .ok_or_else(|| ServiceError::NotFound(format!("game `{id}` not found")))?;

        let outcome = rule(&mut game)?;

        match store.update_roster(id, game.version, game.roster()).await {
            Ok(()) => {
                game.version += 1;
                info!(
                    game_id = %id,
                    user_id,
                    attempt,
                    participants = game.participants.len(),
                    waiting = game.waiting_list.len(),
                    "roster updated"
                );
                sse_events::broadcast_game_updated(state, &game);
                return Ok((game, outcome));
            }
            Err(err @ StorageError::Conflict { .. }) => {
                debug!(game_id = %id, user_id, attempt, error = %err, "roster write lost the race");
                if attempt < max_attempts {
                    sleep(retry_delay(attempt)).await;
                }
            }
            Err(err) => return Err(err.into()),
        }
    }

    warn!(
        game_id = %id,
        user_id,
        attempts = max_attempts,
        "giving up on contended roster write"
    );
    Err(ServiceError::Contended(id))
}

fn retry_delay(attempt: u32) -> Duration {
    let jitter = rand::rng().random_range(0..=RETRY_JITTER_MS);
    Duration::from_millis(RETRY_BASE_MS * u64::from(attempt) + jitter)
}
