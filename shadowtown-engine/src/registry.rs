//! The `Server` singleton: connect/disconnect, room create/join/leave, and
//! lobby-wide broadcasts (spec.md §4.1 "Server & session registry").

use std::collections::HashMap;
use std::sync::Arc;

use shadowtown_types::ClientCommand;
use shadowtown_types::EventPayload;
use shadowtown_types::RoomId;
use shadowtown_types::SessionId;

use crate::error::EngineError;
use crate::room::Room;
use crate::session::Sink;
use crate::session::SessionRegistry;

/// Process-wide online set and room table, touched only from the single
/// control-plane task that owns it (spec.md §9 "Global state").
pub struct Server {
    sessions: SessionRegistry,
    rooms: HashMap<RoomId, Room>,
    next_room_id: u64,
    debug_mode: bool,
}

impl Server {
    pub fn new(debug_mode: bool) -> Self {
        Self {
            sessions: SessionRegistry::new(),
            rooms: HashMap::new(),
            next_room_id: 1,
            debug_mode,
        }
    }

    /// Creates a session, displacing any existing one for the same
    /// identity, and sends `INITIAL_INFORMATION` then broadcasts `CONNECT`
    /// (spec.md §4.1 `Connect`).
    pub fn connect(&mut self, identity: &str, sink: Arc<dyn Sink>) -> SessionId {
        let (id, _token, displaced) = self.sessions.connect(identity, sink);
        let _ = displaced;

        let session = self.sessions.get(id).expect("just connected");
        session.listen(
            EventPayload::InitialInformation {
                online: self.sessions.online_identities(),
                rooms: self.rooms.keys().copied().collect(),
                identity: Arc::from(identity),
            }
            .into(),
        );

        self.sessions.broadcast_except(id, EventPayload::Connect { identity: Arc::from(identity) }.into());
        id
    }

    /// Executes leave (if seated), removes from the online set, and
    /// broadcasts `DISCONNECT` (spec.md §4.1 `Disconnect`).
    pub fn disconnect(&mut self, id: SessionId) -> Result<(), EngineError> {
        if let Some(room_id) = self.sessions.get(id)?.room {
            self.leave_room(id, room_id);
        }
        let identity = self.sessions.disconnect(id)?;
        self.sessions.broadcast(EventPayload::Disconnect { identity }.into());
        Ok(())
    }

    /// Routes a parsed client command through its precondition checks
    /// (spec.md §4.2 "Message dispatcher").
    pub fn dispatch(&mut self, id: SessionId, command: ClientCommand) -> Result<(), EngineError> {
        match command {
            ClientCommand::Create { title, password } => self.create_room(id, title, password),
            ClientCommand::Enter { room } => self.enter_room(id, room),
            ClientCommand::Leave => {
                if let Some(room_id) = self.sessions.get(id)?.room {
                    self.leave_room(id, room_id);
                }
                Ok(())
            }
            ClientCommand::Message { .. } => {
                // Free-text/slash-command routing happens inside the
                // room's engine task once seated; the dispatcher's job
                // ends at precondition checks (spec.md §4.2).
                if self.sessions.get(id)?.room.is_none() {
                    return Err(EngineError::NotInRoom);
                }
                Ok(())
            }
            ClientCommand::Setup { title, formation, constraints, exclusion } => {
                self.apply_setup(id, title, formation, constraints, exclusion)
            }
        }
    }

    /// Builds and validates a [`Setup`](crate::setup::Setup) from the
    /// wire payload; on success replaces the room's setup and broadcasts
    /// `SETUP`, on malformation/invalidity notifies the submitter only
    /// (spec.md §4.2 `SETUP`).
    fn apply_setup(
        &mut self,
        id: SessionId,
        title: Arc<str>,
        formation: Vec<Arc<str>>,
        constraints: HashMap<Arc<str>, HashMap<Arc<str>, Arc<str>>>,
        exclusion: HashMap<Arc<str>, Vec<Arc<str>>>,
    ) -> Result<(), EngineError> {
        let room_id = self.sessions.get(id)?.room.ok_or(EngineError::NotInRoom)?;
        let room = self.rooms.get(&room_id).ok_or(EngineError::UnknownRoom(room_id))?;
        if room.host != id {
            return Err(EngineError::NotHost);
        }

        let inventor = Arc::clone(&self.sessions.get(id)?.identity);
        let raw = match crate::setup::wire::decode(Arc::clone(&title), inventor, formation, constraints, exclusion) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(room = ?room_id, %err, "setup payload rejected");
                return Err(err.into());
            }
        };
        let setup = match crate::setup::Setup::validate(raw) {
            Ok(setup) => setup,
            Err(err) => {
                tracing::warn!(room = ?room_id, %err, "setup rejected");
                return Err(err.into());
            }
        };

        let room = self.rooms.get_mut(&room_id).expect("checked above");
        room.setup = Some(setup);
        self.sessions
            .broadcast(EventPayload::DayEvent { text: Arc::from(format!("setup '{title}' submitted")) }.into());
        Ok(())
    }

    /// Host's `begin`: validates head-count against the room's setup,
    /// picks a concrete formation via `trial()`, and hands the room over
    /// for the caller to wrap in a [`crate::engine::RoomEngine`] and run
    /// (spec.md §4.2 `MESSAGE` "begin command", §4.5 `trial()`).
    pub fn begin(&mut self, id: SessionId) -> Result<(Room, Vec<shadowtown_types::RoleId>), EngineError> {
        let room_id = self.sessions.get(id)?.room.ok_or(EngineError::NotInRoom)?;
        {
            let room = self.rooms.get(&room_id).ok_or(EngineError::UnknownRoom(room_id))?;
            if room.host != id {
                return Err(EngineError::NotHost);
            }
            if room.phase != shadowtown_types::Phase::Idle {
                return Err(EngineError::GameInProgress);
            }
            let Some(setup) = room.setup.as_ref() else {
                tracing::error!(room = ?room_id, "begin: no setup submitted");
                return Err(EngineError::Invariant("no setup submitted".into()));
            };
            if room.occupants.len() != setup.formation.len() {
                tracing::error!(room = ?room_id, occupants = room.occupants.len(), formation = setup.formation.len(), "begin: occupant count does not match formation length");
                return Err(EngineError::Invariant("occupant count does not match formation length".into()));
            }
        }
        let mut room = self.rooms.remove(&room_id).expect("checked above");
        let formation = room.setup.as_ref().expect("checked above").trial(&mut rand::rng());
        room.phase = shadowtown_types::Phase::Initiating;
        Ok((room, formation))
    }

    fn create_room(&mut self, id: SessionId, title: Arc<str>, password: Option<Arc<str>>) -> Result<(), EngineError> {
        if self.sessions.get(id)?.room.is_some() {
            return Err(EngineError::AlreadyInRoom);
        }
        let room_id = RoomId(self.next_room_id);
        self.next_room_id += 1;
        let room = Room::new(room_id, Arc::clone(&title), id, password, self.debug_mode);
        self.rooms.insert(room_id, room);
        self.sessions.get_mut(id)?.room = Some(room_id);

        self.sessions.broadcast(EventPayload::NewRoom { room: room_id, title }.into());
        Ok(())
    }

    fn enter_room(&mut self, id: SessionId, room_id: RoomId) -> Result<(), EngineError> {
        if self.sessions.get(id)?.room.is_some() {
            return Err(EngineError::AlreadyInRoom);
        }
        let room = self.rooms.get_mut(&room_id).ok_or(EngineError::UnknownRoom(room_id))?;
        room.enter(id)?;
        self.sessions.get_mut(id)?.room = Some(room_id);

        let identity = Arc::clone(&self.sessions.get(id)?.identity);
        for &occupant in &room.occupants {
            if occupant != id {
                if let Ok(s) = self.sessions.get(occupant) {
                    s.listen(EventPayload::Enter { identity: Arc::clone(&identity) }.into());
                }
            }
        }
        Ok(())
    }

    fn leave_room(&mut self, id: SessionId, room_id: RoomId) {
        let Some(room) = self.rooms.get_mut(&room_id) else { return };
        room.leave(id);
        let empty = room.is_empty();
        if let Ok(session) = self.sessions.get_mut(id) {
            session.room = None;
        }
        if empty {
            self.rooms.remove(&room_id);
            self.sessions.broadcast(EventPayload::DeletedRoom { room: room_id }.into());
        }
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    pub fn room_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(&id)
    }

    pub fn take_room(&mut self, id: RoomId) -> Option<Room> {
        self.rooms.remove(&id)
    }

    pub fn put_room(&mut self, room: Room) {
        self.rooms.insert(room.id, room);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ChannelSink;

    fn sink() -> Arc<dyn Sink> {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        Arc::new(ChannelSink(tx))
    }

    #[test]
    fn connect_then_create_then_enter() {
        let mut server = Server::new(true);
        let host = server.connect("host", sink());
        let guest = server.connect("guest", sink());

        server
            .dispatch(host, ClientCommand::Create { title: Arc::from("room"), password: None })
            .unwrap();
        let room_id = server.sessions.get(host).unwrap().room.unwrap();

        server.dispatch(guest, ClientCommand::Enter { room: room_id }).unwrap();
        assert_eq!(server.room(room_id).unwrap().occupants.len(), 2);
    }

    #[test]
    fn create_while_already_in_room_errors() {
        let mut server = Server::new(true);
        let host = server.connect("host", sink());
        server
            .dispatch(host, ClientCommand::Create { title: Arc::from("a"), password: None })
            .unwrap();
        let result = server.dispatch(host, ClientCommand::Create { title: Arc::from("b"), password: None });
        assert!(matches!(result, Err(EngineError::AlreadyInRoom)));
    }

    #[test]
    fn leaving_empties_and_removes_room() {
        let mut server = Server::new(true);
        let host = server.connect("host", sink());
        server
            .dispatch(host, ClientCommand::Create { title: Arc::from("room"), password: None })
            .unwrap();
        let room_id = server.sessions.get(host).unwrap().room.unwrap();
        server.dispatch(host, ClientCommand::Leave).unwrap();
        assert!(server.room(room_id).is_none());
    }
}
