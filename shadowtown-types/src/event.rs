use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use crate::ids::PlayerSeat;
use crate::ids::RoomId;
use crate::ids::SessionId;
use crate::phase::Phase;
use crate::role::RoleId;
use crate::role::Team;

/// A vote cast during `VOTE_EXECUTION`, per spec.md §4.3.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum VoteChoice {
    Guilty,
    Innocent,
    Abstention,
}

impl VoteChoice {
    pub fn sign(self) -> i32 {
        match self {
            VoteChoice::Guilty => 1,
            VoteChoice::Innocent => -1,
            VoteChoice::Abstention => 0,
        }
    }
}

/// Wire-shaped ability-result payload tags (spec.md §4.4 "AbilityResult
/// structure").
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum AbilityResultType {
    Killed,
    Visit,
    Act,
    Healed,
    Converted,
    Jailed,
    Threatened,
    Bodyguarded,
    Attacked,
    Contacted,
    Notified,
    AlmostDied,
    Joined,
    Revealed,
    SecondTask,
    Blocked,
}

/// Server -> client event payloads (spec.md §6, non-exhaustive list made
/// concrete). `Event` carries content only; recipient computation and
/// transcript recording are the emitter's job (`shadowtown-engine::event`).
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum EventPayload {
    InitialInformation {
        online: Vec<Arc<str>>,
        rooms: Vec<RoomId>,
        identity: Arc<str>,
    },
    Connect {
        identity: Arc<str>,
    },
    Disconnect {
        identity: Arc<str>,
    },
    Multiple,
    NewRoom {
        room: RoomId,
        title: Arc<str>,
    },
    DeletedRoom {
        room: RoomId,
    },
    RoomStatus {
        room: RoomId,
        occupants: usize,
        capacity: usize,
        has_password: bool,
        phase: Phase,
    },
    Enter {
        identity: Arc<str>,
    },
    Leave {
        identity: Arc<str>,
    },
    Phase {
        phase: Phase,
        elected: Option<PlayerSeat>,
    },
    Time {
        seconds_remaining: u64,
    },
    Nickname {
        seat: PlayerSeat,
        nickname: Arc<str>,
    },
    NicknameConfirmed {
        nickname: Arc<str>,
    },
    Lineup {
        seats: Vec<(PlayerSeat, Arc<str>)>,
    },
    Employed {
        role: RoleId,
    },
    Teammates {
        team: Team,
        seats: Vec<PlayerSeat>,
    },
    Message {
        from: Option<PlayerSeat>,
        text: Arc<str>,
    },
    Pm {
        from: PlayerSeat,
        text: Arc<str>,
    },
    PmSent {
        to: PlayerSeat,
        text: Arc<str>,
    },
    Vote {
        voter: PlayerSeat,
        target: Option<PlayerSeat>,
    },
    VoteExecutionResult {
        totals: HashMap<PlayerSeat, i32>,
    },
    Visit {
        target: PlayerSeat,
    },
    Act,
    SecondVisit {
        target: PlayerSeat,
    },
    Suicide {
        seat: PlayerSeat,
    },
    AbilityResult {
        ty: AbilityResultType,
        by: Option<Arc<str>>,
        into: Option<RoleId>,
        result: Option<Arc<str>>,
    },
    Sound {
        name: Arc<str>,
    },
    Dead {
        seat: PlayerSeat,
    },
    IdentityReveal {
        seat: PlayerSeat,
        role: RoleId,
        cause_of_death: Vec<Arc<str>>,
    },
    NumberOfDead {
        word: Arc<str>,
    },
    DayEvent {
        text: Arc<str>,
    },
    Finish {
        main_winner: Option<Team>,
        winners: Vec<(PlayerSeat, RoleId)>,
    },
    BackToIdle,
    Error {
        reason: Arc<str>,
    },
    Blackmailed,
}

/// Minimal framing of an outgoing event: payload plus the enum tag a
/// transport layer would put in its `type` field.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Event {
    pub payload: EventPayload,
}

impl From<EventPayload> for Event {
    fn from(payload: EventPayload) -> Self {
        Event { payload }
    }
}
