//! Connected-client bookkeeping (spec.md §3 "Session", §4.1).
//!
//! Mirrors the teacher's `client.rs`: a name/token-indexed table owned by
//! the single control-plane task (spec.md §5 "Global state").

use std::collections::HashMap;
use std::sync::Arc;

use shadowtown_types::Event;
use shadowtown_types::RoomId;
use shadowtown_types::SessionId;
use shadowtown_types::SessionToken;

use crate::error::EngineError;

/// The transport boundary: something that can hand an [`Event`] to a
/// connected client. A real transport layer implements this over a
/// WebSocket write half; tests use an in-memory channel.
pub trait Sink: Send + Sync {
    /// Deliver an event. Delivery failures on a disconnected sink are
    /// swallowed (spec.md §4.6) — implementations should not panic or
    /// propagate transport errors here.
    fn deliver(&self, event: Event);
}

/// A [`Sink`] backed by an unbounded channel, for tests and any embedder
/// happy to poll events out rather than push them over a socket.
pub struct ChannelSink(pub tokio::sync::mpsc::UnboundedSender<Event>);

impl Sink for ChannelSink {
    fn deliver(&self, event: Event) {
        // A closed receiver means the client disconnected; swallow per
        // spec.md §4.6.
        let _ = self.0.send(event);
    }
}

/// One connected client (spec.md §3 "Session").
pub(crate) struct Session {
    pub(crate) id: SessionId,
    pub(crate) identity: Arc<str>,
    pub(crate) sink: Arc<dyn Sink>,
    pub(crate) room: Option<RoomId>,
    pub(crate) connected: bool,
}

impl Session {
    pub(crate) fn listen(&self, event: Event) {
        if self.connected {
            self.sink.deliver(event);
        }
    }
}

/// Online-session registry, keyed by id, token, and identity (spec.md §4.1).
#[derive(Default)]
pub(crate) struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
    token_to_id: HashMap<SessionToken, SessionId>,
    identity_to_id: HashMap<Arc<str>, SessionId>,
    next_id: usize,
}

impl SessionRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Connects a new session for `identity`. If an existing session shares
    /// the identity, it is displaced: notified with `Event::Multiple` and
    /// marked disconnected, and the new session wins (spec.md §3 "Session"
    /// lifecycle, §4.1 `Connect`).
    pub(crate) fn connect(
        &mut self,
        identity: &str,
        sink: Arc<dyn Sink>,
    ) -> (SessionId, SessionToken, Option<SessionId>) {
        let displaced = self.identity_to_id.get(identity).copied();
        if let Some(old_id) = displaced {
            if let Some(old) = self.sessions.get(&old_id) {
                old.listen(shadowtown_types::EventPayload::Multiple.into());
            }
            if let Some(old) = self.sessions.get_mut(&old_id) {
                old.connected = false;
            }
        }

        let id = SessionId(self.next_id);
        self.next_id += 1;
        let token = SessionToken::new();
        let identity: Arc<str> = Arc::from(identity);

        self.sessions.insert(
            id,
            Session {
                id,
                identity: Arc::clone(&identity),
                sink,
                room: None,
                connected: true,
            },
        );
        self.token_to_id.insert(token, id);
        self.identity_to_id.insert(identity, id);

        (id, token, displaced)
    }

    pub(crate) fn auth(&self, token: SessionToken) -> Result<SessionId, EngineError> {
        self.token_to_id
            .get(&token)
            .copied()
            .ok_or(EngineError::InvalidSessionToken(token))
    }

    pub(crate) fn get(&self, id: SessionId) -> Result<&Session, EngineError> {
        self.sessions.get(&id).ok_or(EngineError::UnknownSession(id))
    }

    pub(crate) fn get_mut(&mut self, id: SessionId) -> Result<&mut Session, EngineError> {
        self.sessions
            .get_mut(&id)
            .ok_or(EngineError::UnknownSession(id))
    }

    pub(crate) fn disconnect(&mut self, id: SessionId) -> Result<Arc<str>, EngineError> {
        let session = self.get_mut(id)?;
        session.connected = false;
        let identity = Arc::clone(&session.identity);
        self.sessions.remove(&id);
        self.token_to_id.retain(|_, v| *v != id);
        if self.identity_to_id.get(&identity).copied() == Some(id) {
            self.identity_to_id.remove(&identity);
        }
        Ok(identity)
    }

    pub(crate) fn all_ids(&self) -> Vec<SessionId> {
        self.sessions.keys().copied().collect()
    }

    pub(crate) fn online_identities(&self) -> Vec<Arc<str>> {
        self.sessions.values().map(|s| Arc::clone(&s.identity)).collect()
    }

    pub(crate) fn broadcast(&self, event: Event) {
        for session in self.sessions.values() {
            session.listen(event.clone());
        }
    }

    pub(crate) fn broadcast_except(&self, except: SessionId, event: Event) {
        for session in self.sessions.values() {
            if session.id != except {
                session.listen(event.clone());
            }
        }
    }
}
