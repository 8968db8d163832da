use serde::Deserialize;
use serde::Serialize;

/// Room phase, per spec.md §3. `Idle` means "no game running"; every other
/// variant brackets an active match.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    Initiating,
    NicknameSelection,
    Finishing,
    Morning,
    Discussion,
    Vote,
    Election,
    Defense,
    VoteExecution,
    LastWords,
    PostExecution,
    Evening,
    Night,
}

impl Phase {
    pub fn is_in_game(self) -> bool {
        !matches!(self, Phase::Idle)
    }
}
