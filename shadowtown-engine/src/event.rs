//! Fan-out and recording (spec.md §4.6 "Event emitter and archival").

use std::sync::Arc;
use std::time::SystemTime;

use shadowtown_types::Event;
use shadowtown_types::EventPayload;
use shadowtown_types::PlayerSeat;

/// One recorded transcript row (spec.md §3 "Transcript",
/// `{type, content, from, to, time}`).
#[derive(Clone, Debug)]
pub struct TranscriptRow {
    pub payload: EventPayload,
    pub from: Option<PlayerSeat>,
    pub to: Vec<PlayerSeat>,
    pub time: SystemTime,
}

/// Append-only sequence of emitted events, captured per room while
/// `Phase != Idle` (spec.md §3 "Transcript").
#[derive(Default, Debug)]
pub struct Transcript {
    rows: Vec<TranscriptRow>,
}

impl Transcript {
    pub fn rows(&self) -> &[TranscriptRow] {
        &self.rows
    }

    pub fn record(&mut self, row: TranscriptRow) {
        self.rows.push(row);
    }
}

/// Something that can receive a finished event (spec.md §4.1 "Session";
/// kept separate from [`crate::session::Sink`] so the emitter doesn't need
/// to know about session lifetime, only delivery).
pub trait Recipient {
    fn deliver(&self, event: Event);
}

/// Emits an event to its recipients, recording it first when the room is
/// in-game and the event isn't marked `no-record` (spec.md §4.6 `emit`,
/// §5 ordering guarantee (c): transcript append precedes client delivery).
pub fn emit<R: Recipient>(
    transcript: Option<&mut Transcript>,
    recipients: &[(&R, PlayerSeat)],
    payload: EventPayload,
    from: Option<PlayerSeat>,
    no_record: bool,
) {
    if let Some(transcript) = transcript {
        if !no_record {
            transcript.record(TranscriptRow {
                payload: payload.clone(),
                from,
                to: recipients.iter().map(|(_, seat)| *seat).collect(),
                time: SystemTime::now(),
            });
        }
    }

    let event: Event = payload.into();
    for (recipient, _) in recipients {
        recipient.deliver(event.clone());
    }
}

/// Broadcasts to every session without recording — used for lobby-level
/// notices (CONNECT/DISCONNECT/NEW_ROOM/...) that never touch a match's
/// transcript (spec.md §4.1).
pub fn emit_untracked<R: Recipient>(recipients: &[&R], payload: EventPayload) {
    let event: Event = payload.into();
    for recipient in recipients {
        recipient.deliver(event.clone());
    }
}

pub fn error_event(reason: impl Into<Arc<str>>) -> EventPayload {
    EventPayload::Error { reason: reason.into() }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Spy(std::cell::RefCell<Vec<Event>>);
    impl Recipient for Spy {
        fn deliver(&self, event: Event) {
            self.0.borrow_mut().push(event);
        }
    }

    #[test]
    fn in_game_emit_records_before_delivering() {
        let mut transcript = Transcript::default();
        let spy = Spy(std::cell::RefCell::new(Vec::new()));
        emit(
            Some(&mut transcript),
            &[(&spy, PlayerSeat(1))],
            EventPayload::DayEvent { text: Arc::from("hi") },
            None,
            false,
        );
        assert_eq!(transcript.rows().len(), 1);
        assert_eq!(spy.0.borrow().len(), 1);
    }

    #[test]
    fn no_record_emit_skips_transcript() {
        let mut transcript = Transcript::default();
        let spy = Spy(std::cell::RefCell::new(Vec::new()));
        emit(
            Some(&mut transcript),
            &[(&spy, PlayerSeat(1))],
            EventPayload::Time { seconds_remaining: 5 },
            None,
            true,
        );
        assert!(transcript.rows().is_empty());
        assert_eq!(spy.0.borrow().len(), 1);
    }
}
