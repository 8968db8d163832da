//! Durable write-behind for finished matches (spec.md §4.6, §6
//! "Persistence (archival sink)").

use std::sync::Arc;

use shadowtown_types::RoomId;

use crate::event::TranscriptRow;
use crate::setup::Setup;

/// Everything needed to archive a finished match (spec.md §6
/// "GameMetadata" plus its transcript rows).
#[derive(Clone, Debug)]
pub struct GameData {
    pub room: RoomId,
    pub title: Arc<str>,
    pub has_password: bool,
    pub lineup: Vec<Arc<str>>,
    pub setup: Setup,
    pub transcript: Vec<TranscriptRow>,
}

/// Durable write-behind target for finished matches (spec.md §4.6). Writes
/// must not block the engine's release of the room to `IDLE`, so
/// implementations should hand off to a background task internally.
pub trait ArchivalSink: Send + Sync {
    /// Allocates a per-match id and stores metadata plus transcript rows.
    /// Failures are logged but never propagate back to the match (spec.md
    /// §7 "Archival failure").
    fn archive(&self, data: GameData);
}

/// In-memory archival sink for tests: records every [`GameData`] it's
/// handed instead of writing anywhere durable.
#[derive(Default)]
pub struct RecordingArchivalSink {
    recorded: std::sync::Mutex<Vec<GameData>>,
}

impl ArchivalSink for RecordingArchivalSink {
    fn archive(&self, data: GameData) {
        self.recorded.lock().expect("archival lock poisoned").push(data);
    }
}

impl RecordingArchivalSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.recorded.lock().expect("archival lock poisoned").len()
    }

    pub fn take(&self) -> Vec<GameData> {
        std::mem::take(&mut self.recorded.lock().expect("archival lock poisoned"))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::setup::RawSetup;
    use crate::setup::Setup as SetupType;
    use shadowtown_types::RoleId;

    #[test]
    fn recording_sink_accumulates_archives() {
        let sink = RecordingArchivalSink::new();
        let setup = SetupType::validate(RawSetup {
            title: Arc::from("t"),
            inventor: Arc::from("host"),
            formation: vec![
                crate::setup::Slot::Role(RoleId::Citizen),
                crate::setup::Slot::Role(RoleId::Doctor),
                crate::setup::Slot::Role(RoleId::Sheriff),
                crate::setup::Slot::Role(RoleId::Mafioso),
                crate::setup::Slot::Role(RoleId::Godfather),
            ],
            constraints: HashMap::new(),
            exclusion: Vec::new(),
        })
        .unwrap();
        sink.archive(GameData {
            room: RoomId(1),
            title: Arc::from("t"),
            has_password: false,
            lineup: vec![Arc::from("p1")],
            setup,
            transcript: Vec::new(),
        });
        assert_eq!(sink.count(), 1);
    }
}
