use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use time::OffsetDateTime;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::AppConfig,
    dto::{format_timestamp, validation::validate_venue},
    state::game::{CancelOutcome, Game, JoinOutcome, Membership, Participant},
};

/// Payload used by an admin to schedule a game.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateGameRequest {
    #[validate(custom(function = "validate_venue"))]
    pub venue: String,
    /// Kick-off as an RFC 3339 timestamp, e.g. `2026-11-03T19:00:00+01:00`.
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub date: OffsetDateTime,
    /// Capacity; the configured default applies when omitted.
    #[validate(range(min = 1))]
    #[serde(default)]
    pub max_players: Option<u32>,
}

/// Filters accepted by the game listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListGamesQuery {
    /// Only return games whose kick-off is still ahead.
    #[serde(default)]
    pub upcoming: bool,
}

/// Public projection of a roster entry.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParticipantView {
    pub id: String,
    pub name: String,
    pub whatsapp: Option<String>,
}

/// Waiting-list entry with its 1-based position.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WaitingEntryView {
    pub position: usize,
    pub id: String,
    pub name: String,
    pub whatsapp: Option<String>,
}

/// Where the caller stands in a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ViewerStatus {
    Participant,
    Waiting,
    NotRegistered,
}

/// Button the game page should offer to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ViewerAction {
    Join,
    JoinWaitingList,
    Cancel,
    LeaveWaitingList,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ViewerView {
    pub status: ViewerStatus,
    /// Present when the caller is on the waiting list.
    pub waiting_position: Option<usize>,
    pub action: ViewerAction,
}

/// Everything the game page renders.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameDetails {
    pub id: Uuid,
    pub venue: String,
    /// RFC 3339 kick-off time.
    pub date: String,
    /// Kick-off day rendered with the configured date format.
    pub date_label: String,
    /// Kick-off time rendered with the configured time format.
    pub time_label: String,
    pub max_players: u32,
    /// Current occupancy as `"participants/max"`.
    pub occupancy: String,
    pub is_full: bool,
    pub participants: Vec<ParticipantView>,
    pub waiting_list: Vec<WaitingEntryView>,
    pub created_at: String,
    pub version: u64,
    pub viewer: ViewerView,
}

/// Row of the games dashboard.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameListItem {
    pub id: Uuid,
    pub venue: String,
    pub date: String,
    pub date_label: String,
    pub time_label: String,
    pub max_players: u32,
    pub occupancy: String,
    pub waiting_count: usize,
    pub viewer_status: ViewerStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JoinStatus {
    Participant,
    WaitingList,
}

/// Response of `POST /games/{id}/join`.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct JoinResponse {
    pub outcome: JoinStatus,
    pub waiting_position: Option<usize>,
    pub message: String,
    pub game: GameDetails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CancelStatus {
    Withdrawn,
    LeftWaitingList,
}

/// Response of `POST /games/{id}/cancel`.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct CancelResponse {
    pub outcome: CancelStatus,
    /// Waiting player who took the freed slot.
    pub promoted: Option<ParticipantView>,
    pub message: String,
    pub game: GameDetails,
}

impl From<Participant> for ParticipantView {
    fn from(value: Participant) -> Self {
        Self {
            id: value.id,
            name: value.name,
            whatsapp: value.whatsapp,
        }
    }
}

impl ViewerView {
    fn for_user(game: &Game, user_id: &str) -> Self {
        match game.membership(user_id) {
            Some(Membership::Participant) => Self {
                status: ViewerStatus::Participant,
                waiting_position: None,
                action: ViewerAction::Cancel,
            },
            Some(Membership::Waiting(position)) => Self {
                status: ViewerStatus::Waiting,
                waiting_position: Some(position),
                action: ViewerAction::LeaveWaitingList,
            },
            None => Self {
                status: ViewerStatus::NotRegistered,
                waiting_position: None,
                action: if game.is_full() {
                    ViewerAction::JoinWaitingList
                } else {
                    ViewerAction::Join
                },
            },
        }
    }
}

fn occupancy(game: &Game) -> String {
    format!("{}/{}", game.occupancy(), game.max_players)
}

impl GameDetails {
    /// Project a game as seen by `viewer_id`.
    pub fn build(game: Game, viewer_id: &str, config: &AppConfig) -> Self {
        let viewer = ViewerView::for_user(&game, viewer_id);
        Self {
            id: game.id,
            date: format_timestamp(game.date),
            date_label: config.format_date(game.date),
            time_label: config.format_time(game.date),
            max_players: game.max_players,
            occupancy: occupancy(&game),
            is_full: game.is_full(),
            created_at: format_timestamp(game.created_at),
            version: game.version,
            viewer,
            waiting_list: game
                .waiting_list
                .into_iter()
                .enumerate()
                .map(|(index, entry)| WaitingEntryView {
                    position: index + 1,
                    id: entry.id,
                    name: entry.name,
                    whatsapp: entry.whatsapp,
                })
                .collect(),
            participants: game.participants.into_iter().map(Into::into).collect(),
            venue: game.venue,
        }
    }
}

impl GameListItem {
    pub fn build(game: &Game, viewer_id: &str, config: &AppConfig) -> Self {
        Self {
            id: game.id,
            venue: game.venue.clone(),
            date: format_timestamp(game.date),
            date_label: config.format_date(game.date),
            time_label: config.format_time(game.date),
            max_players: game.max_players,
            occupancy: occupancy(game),
            waiting_count: game.waiting_list.len(),
            viewer_status: ViewerView::for_user(game, viewer_id).status,
        }
    }
}

impl JoinResponse {
    pub fn new(outcome: JoinOutcome, game: GameDetails) -> Self {
        let (status, waiting_position, message) = match outcome {
            JoinOutcome::Participant => (
                JoinStatus::Participant,
                None,
                "Successfully joined the game!".to_string(),
            ),
            JoinOutcome::WaitingList(position) => (
                JoinStatus::WaitingList,
                Some(position),
                format!("Added to waiting list (position {position})"),
            ),
        };
        Self {
            outcome: status,
            waiting_position,
            message,
            game,
        }
    }
}

impl CancelResponse {
    pub fn new(outcome: CancelOutcome, game: GameDetails) -> Self {
        match outcome {
            CancelOutcome::Withdrawn { promoted } => Self {
                outcome: CancelStatus::Withdrawn,
                promoted: promoted.map(Into::into),
                message: "Successfully cancelled participation".into(),
                game,
            },
            CancelOutcome::LeftWaitingList => Self {
                outcome: CancelStatus::LeftWaitingList,
                promoted: None,
                message: "Removed from the waiting list".into(),
                game,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn player(id: &str) -> Participant {
        Participant {
            id: id.into(),
            name: format!("Player {id}"),
            whatsapp: None,
        }
    }

    fn full_game() -> Game {
        Game {
            id: Uuid::new_v4(),
            venue: "Terrain synthétique".into(),
            date: datetime!(2026-11-07 10:30 UTC),
            max_players: 2,
            participants: vec![player("a"), player("b")],
            waiting_list: vec![player("c"), player("d")],
            created_at: datetime!(2026-10-17 09:00 UTC),
            version: 4,
        }
    }

    #[test]
    fn details_number_waiting_list_from_one() {
        let details = GameDetails::build(full_game(), "d", &AppConfig::default());

        assert_eq!(details.occupancy, "2/2");
        assert!(details.is_full);
        let positions = details
            .waiting_list
            .iter()
            .map(|entry| (entry.position, entry.id.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(positions, [(1, "c"), (2, "d")]);
        assert_eq!(details.viewer.status, ViewerStatus::Waiting);
        assert_eq!(details.viewer.waiting_position, Some(2));
        assert_eq!(details.viewer.action, ViewerAction::LeaveWaitingList);
    }

    #[test]
    fn viewer_action_follows_membership_and_capacity() {
        let config = AppConfig::default();
        let details = GameDetails::build(full_game(), "a", &config);
        assert_eq!(details.viewer.action, ViewerAction::Cancel);

        let details = GameDetails::build(full_game(), "stranger", &config);
        assert_eq!(details.viewer.action, ViewerAction::JoinWaitingList);

        let mut open = full_game();
        open.participants.pop();
        let details = GameDetails::build(open, "stranger", &config);
        assert_eq!(details.viewer.action, ViewerAction::Join);
        assert_eq!(details.occupancy, "1/2");
    }

    #[test]
    fn details_render_date_and_time_labels() {
        let details = GameDetails::build(full_game(), "a", &AppConfig::default());
        assert_eq!(details.date, "2026-11-07T10:30:00Z");
        assert_eq!(details.date_label, "07/11/2026");
        assert_eq!(details.time_label, "10:30");
    }

    #[test]
    fn create_request_rejects_blank_venue_and_zero_capacity() {
        let request: CreateGameRequest = serde_json::from_str(
            r#"{"venue": "  ", "date": "2026-11-03T19:00:00+01:00", "max_players": 0}"#,
        )
        .unwrap();
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("venue"));
        assert!(fields.contains_key("max_players"));
    }

    #[test]
    fn create_request_accepts_missing_capacity() {
        let request: CreateGameRequest = serde_json::from_str(
            r#"{"venue": "Stade", "date": "2026-11-03T19:00:00+01:00"}"#,
        )
        .unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.max_players, None);
        assert_eq!(request.date, datetime!(2026-11-03 18:00 UTC));
    }

    #[test]
    fn create_request_accepts_large_capacity() {
        let request: CreateGameRequest = serde_json::from_str(
            r#"{"venue": "Stade", "date": "2026-11-03T19:00:00+01:00", "max_players": 250}"#,
        )
        .unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.max_players, Some(250));
    }

    #[test]
    fn create_request_rejects_unparseable_date() {
        let parsed = serde_json::from_str::<CreateGameRequest>(
            r#"{"venue": "Stade", "date": "next tuesday"}"#,
        );
        assert!(parsed.is_err());
    }
}
