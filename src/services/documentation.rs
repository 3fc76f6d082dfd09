use utoipa::{
    Modify, OpenApi,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};

#[derive(OpenApi)]
/// Aggregated OpenAPI document for Matchday Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::games_stream,
        crate::routes::game::list_games,
        crate::routes::game::get_game,
        crate::routes::game::join_game,
        crate::routes::game::cancel_participation,
        crate::routes::admin::create_game,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::GameDetails,
            crate::dto::game::GameListItem,
            crate::dto::game::ParticipantView,
            crate::dto::game::WaitingEntryView,
            crate::dto::game::ViewerView,
            crate::dto::game::ViewerStatus,
            crate::dto::game::ViewerAction,
            crate::dto::game::JoinResponse,
            crate::dto::game::JoinStatus,
            crate::dto::game::CancelResponse,
            crate::dto::game::CancelStatus,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::GameChangedEvent,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "games", description = "Browsing games and managing participation"),
        (name = "admin", description = "Game scheduling for administrators"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` scheme referenced by the protected routes.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
