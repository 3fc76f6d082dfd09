use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    dto::game::{CancelResponse, GameDetails, GameListItem, JoinResponse, ListGamesQuery},
    error::AppError,
    services::game_service,
    state::SharedState,
};

/// Routes available to any signed-in player.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games", get(list_games))
        .route("/games/{id}", get(get_game))
        .route("/games/{id}/join", post(join_game))
        .route("/games/{id}/cancel", post(cancel_participation))
}

/// List scheduled games sorted by kick-off.
#[utoipa::path(
    get,
    path = "/games",
    tag = "games",
    params(ListGamesQuery),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Games sorted by date", body = [GameListItem]),
        (status = 400, description = "Malformed query string"),
        (status = 401, description = "Missing or invalid token"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn list_games(
    State(state): State<SharedState>,
    user: AuthenticatedUser,
    query: Result<Query<ListGamesQuery>, QueryRejection>,
) -> Result<Json<Vec<GameListItem>>, AppError> {
    let Query(query) = query?;
    Ok(Json(game_service::list_games(&state, &user, query).await?))
}

/// Fetch a single game with its rosters.
#[utoipa::path(
    get,
    path = "/games/{id}",
    tag = "games",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Game details", body = GameDetails),
        (status = 400, description = "Malformed game identifier"),
        (status = 404, description = "No such game"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    user: AuthenticatedUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<GameDetails>, AppError> {
    let Path(id) = id?;
    Ok(Json(game_service::get_game(&state, &user, id).await?))
}

/// Join a game, landing on the waiting list once it is full.
#[utoipa::path(
    post,
    path = "/games/{id}/join",
    tag = "games",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Joined as participant or waiting", body = JoinResponse),
        (status = 400, description = "Malformed game identifier"),
        (status = 404, description = "No such game"),
        (status = 409, description = "Already registered, or the roster kept changing"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn join_game(
    State(state): State<SharedState>,
    user: AuthenticatedUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<JoinResponse>, AppError> {
    let Path(id) = id?;
    Ok(Json(game_service::join_game(&state, &user, id).await?))
}

/// Withdraw from a game or leave its waiting list.
#[utoipa::path(
    post,
    path = "/games/{id}/cancel",
    tag = "games",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Participation cancelled", body = CancelResponse),
        (status = 400, description = "Malformed game identifier"),
        (status = 404, description = "No such game"),
        (status = 409, description = "Not registered, or the roster kept changing"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn cancel_participation(
    State(state): State<SharedState>,
    user: AuthenticatedUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<CancelResponse>, AppError> {
    let Path(id) = id?;
    Ok(Json(
        game_service::cancel_participation(&state, &user, id).await?,
    ))
}
