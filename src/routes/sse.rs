use std::convert::Infallible;

use axum::{Router, extract::State, response::sse::Sse, routing::get};
use futures::Stream;
use tracing::info;

use crate::{services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/sse/games",
    tag = "sse",
    responses((
        status = 200,
        description = "Game occupancy and system status events",
        content_type = "text/event-stream",
        body = String
    ))
)]
/// Stream game creation, roster updates and degraded-mode changes.
pub async fn games_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let (receiver, handshake) = sse_service::subscribe_games(&state).await;
    info!("new game SSE connection");
    sse_service::to_sse_stream(receiver, handshake)
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse/games", get(games_stream))
}
