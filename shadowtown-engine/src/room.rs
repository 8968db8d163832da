//! Persistent lobby/match container (spec.md §3 "Room").

use std::collections::HashMap;
use std::sync::Arc;

use shadowtown_types::PlayerSeat;
use shadowtown_types::Phase;
use shadowtown_types::RoomId;
use shadowtown_types::SessionId;
use shadowtown_types::Team;

use crate::consts::ROOM_CAPACITY_MAX;
use crate::error::EngineError;
use crate::player::Player;
use crate::setup::Setup;

/// Private-chat team kinds (spec.md §3 "Private chats"). Distinct from
/// [`Team`] because Mason/Cult/Spy are chat-only groupings, not win-teams.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ChatKind {
    Mafia,
    Triad,
    Mason,
    Cult,
    Spy,
}

impl ChatKind {
    pub fn win_team(self) -> Option<Team> {
        match self {
            ChatKind::Mafia => Some(Team::Mafia),
            ChatKind::Triad => Some(Team::Triad),
            ChatKind::Mason | ChatKind::Cult | ChatKind::Spy => None,
        }
    }
}

/// Public, redacted view of a room for lobby browsing (spec.md §4.1
/// `INITIAL_INFORMATION`, §4.3 "public room-status update").
#[derive(Clone, Debug)]
pub struct RoomSummary {
    pub id: RoomId,
    pub title: Arc<str>,
    pub occupants: usize,
    pub capacity: usize,
    pub has_password: bool,
    pub phase: Phase,
}

/// Persistent container for a lobby and, at most, one active game at a
/// time (spec.md §3 "Room").
pub struct Room {
    pub id: RoomId,
    pub title: Arc<str>,
    pub host: SessionId,
    pub capacity: usize,
    pub password: Option<Arc<str>>,
    pub phase: Phase,
    pub setup: Option<Setup>,
    pub occupants: Vec<SessionId>,
    pub players: Vec<Player>,
    pub chats: HashMap<ChatKind, Vec<PlayerSeat>>,
    pub day: usize,
    /// Players hanged this vote sub-loop, awaiting `POST_EXECUTION` reveal
    /// (spec.md §4.3 main loop).
    pub executed_today: Vec<PlayerSeat>,
    /// Jailors queued to jail their target in the evening hook (spec.md
    /// §4.3 "Evening hooks" item 4).
    pub jail_queue: Vec<(PlayerSeat, PlayerSeat)>,
    pub debug_mode: bool,
    /// Append-only record of this match's emitted events (spec.md §3
    /// "Transcript").
    pub transcript: crate::event::Transcript,
}

impl Room {
    pub fn new(id: RoomId, title: Arc<str>, host: SessionId, password: Option<Arc<str>>, debug_mode: bool) -> Self {
        Self {
            id,
            title,
            host,
            capacity: ROOM_CAPACITY_MAX,
            password,
            phase: Phase::Idle,
            setup: None,
            occupants: vec![host],
            players: Vec::new(),
            chats: HashMap::new(),
            day: 0,
            executed_today: Vec::new(),
            jail_queue: Vec::new(),
            debug_mode,
            transcript: crate::event::Transcript::default(),
        }
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            id: self.id,
            title: Arc::clone(&self.title),
            occupants: self.occupants.len(),
            capacity: self.capacity,
            has_password: self.password.is_some(),
            phase: self.phase,
        }
    }

    pub fn is_full(&self) -> bool {
        self.occupants.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.occupants.is_empty()
    }

    pub fn is_in_game(&self) -> bool {
        self.phase.is_in_game()
    }

    /// Seats a session that is not yet an occupant (spec.md §4.2 `ENTER`).
    pub fn enter(&mut self, session: SessionId) -> Result<(), EngineError> {
        if self.is_full() {
            return Err(EngineError::RoomFull(self.id));
        }
        if self.phase == Phase::Initiating {
            return Err(EngineError::GameInProgress);
        }
        self.occupants.push(session);
        Ok(())
    }

    /// Removes an occupant, transferring host if needed (spec.md §4.3
    /// "Leave semantics"). A seated-but-dead player leaves quietly; a
    /// seated, alive player is flagged a leaver for the night's SUICIDE
    /// priority instead of being removed from the occupant list.
    pub fn leave(&mut self, session: SessionId) {
        if let Some(player) = self.players.iter_mut().find(|p| p.session == session) {
            if player.is_alive() {
                player.leaver = true;
                return;
            }
        }

        self.occupants.retain(|s| *s != session);
        if self.host == session {
            if let Some(&next) = self.occupants.first() {
                self.host = next;
            }
        }
    }

    pub fn player_by_seat(&self, seat: PlayerSeat) -> Option<&Player> {
        self.players.iter().find(|p| p.seat == seat)
    }

    pub fn player_by_seat_mut(&mut self, seat: PlayerSeat) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.seat == seat)
    }

    pub fn player_by_session(&self, session: SessionId) -> Option<&Player> {
        self.players.iter().find(|p| p.session == session)
    }

    pub fn chat_members(&self, kind: ChatKind) -> &[PlayerSeat] {
        self.chats.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn add_to_chat(&mut self, kind: ChatKind, seat: PlayerSeat) {
        let members = self.chats.entry(kind).or_default();
        if !members.contains(&seat) {
            members.push(seat);
        }
    }

    pub fn remove_from_chat(&mut self, kind: ChatKind, seat: PlayerSeat) {
        if let Some(members) = self.chats.get_mut(&kind) {
            members.retain(|s| *s != seat);
        }
    }

    /// `team-kind`'s current intern: its first surviving member (spec.md §3
    /// "Private chats", "the chat's first member is the 'intern' ...
    /// until promotion").
    pub fn chat_intern(&self, kind: ChatKind) -> Option<PlayerSeat> {
        self.chat_members(kind)
            .iter()
            .copied()
            .find(|seat| self.player_by_seat(*seat).is_some_and(Player::is_alive))
    }

    pub fn living_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_alive())
    }

    pub fn reset_for_idle(&mut self) {
        self.phase = Phase::Idle;
        self.players.clear();
        self.chats.clear();
        self.day = 0;
        self.executed_today.clear();
        self.jail_queue.clear();
        self.transcript = crate::event::Transcript::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leave_while_alive_marks_leaver_instead_of_removing() {
        let mut room = Room::new(RoomId(1), Arc::from("room"), SessionId(0), None, true);
        room.players.push(Player::new(
            PlayerSeat(1),
            SessionId(0),
            Arc::from("p1"),
            crate::roles::RoleInstance::new(shadowtown_types::RoleId::Citizen, Default::default()),
        ));
        room.leave(SessionId(0));
        assert!(room.player_by_session(SessionId(0)).unwrap().leaver);
        assert!(room.occupants.contains(&SessionId(0)));
    }

    #[test]
    fn host_transfers_to_next_occupant_on_leave() {
        let mut room = Room::new(RoomId(1), Arc::from("room"), SessionId(0), None, true);
        room.occupants.push(SessionId(1));
        room.leave(SessionId(0));
        assert_eq!(room.host, SessionId(1));
    }

    #[test]
    fn chat_intern_is_first_living_member() {
        let mut room = Room::new(RoomId(1), Arc::from("room"), SessionId(0), None, true);
        room.players.push(Player::new(
            PlayerSeat(1),
            SessionId(0),
            Arc::from("p1"),
            crate::roles::RoleInstance::new(shadowtown_types::RoleId::Mafioso, Default::default()),
        ));
        room.add_to_chat(ChatKind::Mafia, PlayerSeat(1));
        assert_eq!(room.chat_intern(ChatKind::Mafia), Some(PlayerSeat(1)));
    }
}
