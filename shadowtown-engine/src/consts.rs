//! Constants for the room engine (spec.md §3, §4.3).

use std::time::Duration;

use shadowtown_types::Phase;

/// Max printable characters in a room title (spec.md §3 "Room").
pub const ROOM_TITLE_MAX_LEN: usize = 16;
/// Max characters in a room password (spec.md §3 "Room").
pub const ROOM_PASSWORD_MAX_LEN: usize = 8;
/// Max seats in a room (spec.md §3 "Room").
pub const ROOM_CAPACITY_MAX: usize = 15;
/// Max chat-text length after sanitation (spec.md §6).
pub const MESSAGE_MAX_LEN: usize = 128;
/// Max nickname length (spec.md §3 "Player").
pub const NICKNAME_MAX_LEN: usize = 8;
/// Min/max formation length (spec.md §4.5).
pub const FORMATION_MIN_LEN: usize = 5;
pub const FORMATION_MAX_LEN: usize = 15;

/// Announcement points inside a countdown, in descending order (spec.md
/// §4.3 "Timer discipline").
pub const TIMER_ANNOUNCEMENTS_SECS: &[u64] = &[60, 30, 10, 5];

/// Named countdowns driving a match's phase loop (spec.md §4.3).
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Timer {
    NicknameSelection,
    Discussion,
    Vote,
    Election,
    Defense,
    VoteExecution,
    LastWords,
    Evening,
}

impl Timer {
    /// Production duration for this countdown.
    pub fn prod(self) -> Duration {
        Duration::from_secs(match self {
            Timer::NicknameSelection => 30,
            Timer::Discussion => 36,
            Timer::Vote => 120,
            Timer::Election => 5,
            Timer::Defense => 10,
            Timer::VoteExecution => 15,
            Timer::LastWords => 5,
            Timer::Evening => 36,
        })
    }

    /// Debug-mode duration, used by tests and local development so a full
    /// match doesn't take minutes to drive (spec.md §4.3's table).
    pub fn debug(self) -> Duration {
        Duration::from_secs(match self {
            Timer::NicknameSelection => 5,
            Timer::Discussion => 3,
            Timer::Vote => 3,
            Timer::Election => 3,
            Timer::Defense => 3,
            Timer::VoteExecution => 10,
            Timer::LastWords => 3,
            Timer::Evening => 3,
        })
    }

    pub fn duration(self, debug_mode: bool) -> Duration {
        if debug_mode { self.debug() } else { self.prod() }
    }
}

/// Pause between night resolution and day break, and between election and
/// defense/hanging (spec.md §4.3 pseudocode, "brief pause" / "sleep 5s").
pub const POST_NIGHT_PAUSE_PROD: Duration = Duration::from_secs(5);
pub const POST_NIGHT_PAUSE_DEBUG: Duration = Duration::from_secs(1);

/// Minimum surviving players below which the match is over regardless of
/// faction composition (spec.md §4.4 "Game-over rule").
pub const GAME_OVER_MIN_SURVIVORS: usize = 3;

pub fn death_announce_pause(debug_mode: bool) -> Duration {
    if debug_mode {
        Duration::from_millis(200)
    } else {
        Duration::from_secs(1)
    }
}

pub fn phase_public_name(phase: Phase) -> &'static str {
    match phase {
        Phase::Idle => "idle",
        Phase::Initiating => "initiating",
        Phase::NicknameSelection => "nickname_selection",
        Phase::Finishing => "finishing",
        Phase::Morning => "morning",
        Phase::Discussion => "discussion",
        Phase::Vote => "vote",
        Phase::Election => "election",
        Phase::Defense => "defense",
        Phase::VoteExecution => "vote_execution",
        Phase::LastWords => "last_words",
        Phase::PostExecution => "post_execution",
        Phase::Evening => "evening",
        Phase::Night => "night",
    }
}
