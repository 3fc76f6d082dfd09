use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::post,
};
use validator::Validate;

use crate::{
    auth::AdminUser,
    dto::game::{CreateGameRequest, GameDetails},
    error::AppError,
    services::game_service,
    state::SharedState,
};

/// Game administration endpoints, restricted to tokens carrying the admin claim.
pub fn router() -> Router<SharedState> {
    Router::new().route("/admin/games", post(create_game))
}

/// Schedule a new game.
#[utoipa::path(
    post,
    path = "/admin/games",
    tag = "admin",
    request_body = CreateGameRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Game created", body = GameDetails),
        (status = 400, description = "Invalid venue, date or capacity"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not an admin"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    AdminUser(admin): AdminUser,
    payload: Result<Json<CreateGameRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<GameDetails>), AppError> {
    let Json(payload) = payload?;
    payload.validate()?;
    let details = game_service::create_game(&state, &admin, payload).await?;
    Ok((StatusCode::CREATED, Json(details)))
}
