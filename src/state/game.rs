//! In-memory game model and the roster rules applied by join and cancel.

use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::models::{GameEntity, ParticipantEntity, RosterEntity};

/// A user occupying a slot or a waiting position, frozen at join time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub whatsapp: Option<String>,
}

/// A scheduled game with its current roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    pub id: Uuid,
    pub venue: String,
    pub date: OffsetDateTime,
    pub max_players: u32,
    /// Confirmed players, in join order.
    pub participants: Vec<Participant>,
    /// FIFO queue of players waiting for a slot.
    pub waiting_list: Vec<Participant>,
    pub created_at: OffsetDateTime,
    /// Version of the stored document this game was read from.
    pub version: u64,
}

/// Where a user currently stands in a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Participant,
    /// 1-based position in the waiting list.
    Waiting(usize),
}

/// Result of a successful join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Participant,
    /// Joined the waiting list at this 1-based position.
    WaitingList(usize),
}

/// Result of a successful cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The user gave up their slot; the head of the waiting list took it, if any.
    Withdrawn { promoted: Option<Participant> },
    /// The user was only waiting and has been removed from the queue.
    LeftWaitingList,
}

/// Roster operations rejected by the current state of the game.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("user `{0}` already takes part in this game")]
    AlreadyParticipant(String),
    #[error("user `{user_id}` is already on the waiting list (position {position})")]
    AlreadyWaiting { user_id: String, position: usize },
    #[error("user `{0}` is neither participating nor waiting")]
    NotRegistered(String),
}

impl Game {
    pub fn occupancy(&self) -> usize {
        self.participants.len()
    }

    pub fn is_full(&self) -> bool {
        self.occupancy() >= self.max_players as usize
    }

    pub fn membership(&self, user_id: &str) -> Option<Membership> {
        if self.participants.iter().any(|p| p.id == user_id) {
            return Some(Membership::Participant);
        }
        self.waiting_list
            .iter()
            .position(|p| p.id == user_id)
            .map(|index| Membership::Waiting(index + 1))
    }

    /// Add a user to the participants while slots remain, otherwise to the tail of the waiting list.
    pub fn join(&mut self, participant: Participant) -> Result<JoinOutcome, RosterError> {
        match self.membership(&participant.id) {
            Some(Membership::Participant) => {
                return Err(RosterError::AlreadyParticipant(participant.id));
            }
            Some(Membership::Waiting(position)) => {
                return Err(RosterError::AlreadyWaiting {
                    user_id: participant.id,
                    position,
                });
            }
            None => {}
        }

        if self.is_full() {
            self.waiting_list.push(participant);
            Ok(JoinOutcome::WaitingList(self.waiting_list.len()))
        } else {
            self.participants.push(participant);
            Ok(JoinOutcome::Participant)
        }
    }

    /// Withdraw a user from the game.
    ///
    /// A participant frees their slot and the head of the waiting list is
    /// promoted into it. A waiting user simply leaves the queue.
    pub fn cancel(&mut self, user_id: &str) -> Result<CancelOutcome, RosterError> {
        match self.membership(user_id) {
            Some(Membership::Participant) => {
                self.participants.retain(|p| p.id != user_id);
                let promoted = self.promote_next();
                Ok(CancelOutcome::Withdrawn { promoted })
            }
            Some(Membership::Waiting(position)) => {
                self.waiting_list.remove(position - 1);
                Ok(CancelOutcome::LeftWaitingList)
            }
            None => Err(RosterError::NotRegistered(user_id.to_owned())),
        }
    }

    fn promote_next(&mut self) -> Option<Participant> {
        if self.waiting_list.is_empty() || self.is_full() {
            return None;
        }
        let promoted = self.waiting_list.remove(0);
        self.participants.push(promoted.clone());
        Some(promoted)
    }

    /// Lists to write back after a roster change.
    pub fn roster(&self) -> RosterEntity {
        RosterEntity {
            participants: self.participants.iter().cloned().map(Into::into).collect(),
            waiting_list: self.waiting_list.iter().cloned().map(Into::into).collect(),
        }
    }
}

impl From<ParticipantEntity> for Participant {
    fn from(value: ParticipantEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            whatsapp: value.whatsapp,
        }
    }
}

impl From<Participant> for ParticipantEntity {
    fn from(value: Participant) -> Self {
        Self {
            id: value.id,
            name: value.name,
            whatsapp: value.whatsapp,
        }
    }
}

impl From<GameEntity> for Game {
    fn from(entity: GameEntity) -> Self {
        Self {
            id: entity.id,
            venue: entity.venue,
            date: entity.date,
            max_players: entity.max_players,
            participants: entity.participants.into_iter().map(Into::into).collect(),
            waiting_list: entity.waiting_list.into_iter().map(Into::into).collect(),
            created_at: entity.created_at,
            version: entity.version,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use time::macros::datetime;

    use super::*;

    fn player(id: &str) -> Participant {
        Participant {
            id: id.into(),
            name: id.to_uppercase(),
            whatsapp: Some(format!("+33 6 {id}")),
        }
    }

    fn game(max_players: u32) -> Game {
        Game {
            id: Uuid::new_v4(),
            venue: "Gymnase Jean Jaurès".into(),
            date: datetime!(2026-11-03 19:00 UTC),
            max_players,
            participants: Vec::new(),
            waiting_list: Vec::new(),
            created_at: datetime!(2026-10-17 10:00 UTC),
            version: 0,
        }
    }

    fn ids(list: &[Participant]) -> Vec<&str> {
        list.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn join_below_capacity_takes_a_slot() {
        let mut game = game(2);
        assert_eq!(game.join(player("a")).unwrap(), JoinOutcome::Participant);
        assert_eq!(ids(&game.participants), ["a"]);
        assert!(game.waiting_list.is_empty());
    }

    #[test]
    fn join_at_capacity_goes_to_waiting_list() {
        let mut game = game(1);
        game.join(player("a")).unwrap();

        assert_eq!(game.join(player("b")).unwrap(), JoinOutcome::WaitingList(1));
        assert_eq!(game.join(player("c")).unwrap(), JoinOutcome::WaitingList(2));
        assert_eq!(ids(&game.participants), ["a"]);
        assert_eq!(ids(&game.waiting_list), ["b", "c"]);
    }

    #[test]
    fn joining_twice_is_rejected_in_either_list() {
        let mut game = game(1);
        game.join(player("a")).unwrap();
        game.join(player("b")).unwrap();

        assert_eq!(
            game.join(player("a")),
            Err(RosterError::AlreadyParticipant("a".into()))
        );
        assert_eq!(
            game.join(player("b")),
            Err(RosterError::AlreadyWaiting {
                user_id: "b".into(),
                position: 1
            })
        );
        assert_eq!(game.participants.len() + game.waiting_list.len(), 2);
    }

    #[test]
    fn cancel_without_waiting_list_only_removes_the_player() {
        let mut game = game(3);
        game.join(player("a")).unwrap();
        game.join(player("b")).unwrap();

        let outcome = game.cancel("a").unwrap();
        assert_eq!(outcome, CancelOutcome::Withdrawn { promoted: None });
        assert_eq!(ids(&game.participants), ["b"]);
        assert!(game.waiting_list.is_empty());
    }

    #[test]
    fn cancel_promotes_head_and_shifts_queue() {
        let mut game = game(2);
        for id in ["a", "b", "c", "d", "e"] {
            game.join(player(id)).unwrap();
        }

        let outcome = game.cancel("b").unwrap();
        assert_eq!(
            outcome,
            CancelOutcome::Withdrawn {
                promoted: Some(player("c"))
            }
        );
        assert_eq!(ids(&game.participants), ["a", "c"]);
        assert_eq!(ids(&game.waiting_list), ["d", "e"]);
        assert_eq!(game.membership("d"), Some(Membership::Waiting(1)));
        assert_eq!(game.membership("e"), Some(Membership::Waiting(2)));
    }

    #[test]
    fn capacity_two_scenario() {
        let mut game = game(2);
        game.join(player("a")).unwrap();
        assert_eq!(ids(&game.participants), ["a"]);
        game.join(player("b")).unwrap();
        assert_eq!(ids(&game.participants), ["a", "b"]);
        game.join(player("c")).unwrap();
        assert_eq!(ids(&game.participants), ["a", "b"]);
        assert_eq!(ids(&game.waiting_list), ["c"]);

        game.cancel("a").unwrap();
        assert_eq!(ids(&game.participants), ["b", "c"]);
        assert!(game.waiting_list.is_empty());
    }

    #[test]
    fn waiting_user_leaves_queue_without_promotion() {
        let mut game = game(1);
        for id in ["a", "b", "c"] {
            game.join(player(id)).unwrap();
        }

        assert_eq!(game.cancel("b").unwrap(), CancelOutcome::LeftWaitingList);
        assert_eq!(ids(&game.participants), ["a"]);
        assert_eq!(ids(&game.waiting_list), ["c"]);
    }

    #[test]
    fn cancel_by_stranger_is_rejected() {
        let mut game = game(1);
        game.join(player("a")).unwrap();
        assert_eq!(
            game.cancel("z"),
            Err(RosterError::NotRegistered("z".into()))
        );
        assert_eq!(ids(&game.participants), ["a"]);
    }

    #[test]
    fn ids_stay_unique_across_both_lists() {
        let mut game = game(3);
        let sequence = ["a", "b", "c", "d", "a", "e", "d", "b"];
        for id in sequence {
            let _ = game.join(player(id));
        }
        for id in ["b", "x", "d"] {
            let _ = game.cancel(id);
        }
        for id in sequence {
            let _ = game.join(player(id));
        }

        let all = game
            .participants
            .iter()
            .chain(game.waiting_list.iter())
            .map(|p| p.id.as_str())
            .collect::<Vec<_>>();
        let unique = all.iter().collect::<HashSet<_>>();
        assert_eq!(all.len(), unique.len());
        assert!(game.participants.len() <= game.max_players as usize);
    }

    #[test]
    fn roster_round_trips_snapshot_fields() {
        let mut game = game(2);
        game.join(player("a")).unwrap();
        let roster = game.roster();
        assert_eq!(roster.participants[0].name, "A");
        assert_eq!(roster.participants[0].whatsapp.as_deref(), Some("+33 6 a"));
    }
}
