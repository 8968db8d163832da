//! In-game incarnation of a session's user for one match (spec.md §3
//! "Player").

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use bit_set::BitSet;
use shadowtown_types::PlayerSeat;
use shadowtown_types::RoleId;
use shadowtown_types::SessionId;
use shadowtown_types::VoteChoice;

use crate::roles::RoleInstance;

/// Why a player died (spec.md §3 "cause-of-death list"; an empty list means
/// alive). `Democracy` is the lynch/hanging cause — distinct from any
/// ability's `BY` tag since it has no acting player.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Cause {
    Killed(RoleId),
    Democracy,
    Suicide,
    Exposed,
}

/// Substitutions a Framer/Forger visit applies to this player's next
/// investigation result (spec.md §3 "frame data").
#[derive(Clone, Debug, Default)]
pub struct FrameData {
    pub role: Option<RoleId>,
    pub target: Option<PlayerSeat>,
}

/// Per-day bookkeeping cleared at the start of each cycle (spec.md §3
/// "per-day action record").
#[derive(Clone, Debug, Default)]
pub struct DayRecord {
    pub visit: Option<PlayerSeat>,
    pub visited_by: HashSet<PlayerSeat>,
    pub active: bool,
    pub healed_by: Vec<PlayerSeat>,
    pub bodyguarded_by: Vec<PlayerSeat>,
}

/// Voting state for the current trial (spec.md §3 "voting state").
#[derive(Clone, Debug, Default)]
pub struct VotingState {
    pub voted_to: Option<PlayerSeat>,
    pub voted_skip: bool,
    pub incoming_votes: u32,
    pub trial_choice: Option<VoteChoice>,
}

/// One seated participant in a running match (spec.md §3 "Player").
#[derive(Debug)]
pub struct Player {
    pub seat: PlayerSeat,
    pub session: SessionId,
    pub nickname: Arc<str>,
    /// Role switches push; earlier instances stay addressable so an
    /// identity reveal on a converted player can show what they started as
    /// (spec.md §3 "role-history stack").
    pub role_history: Vec<RoleInstance>,
    pub day_records: Vec<DayRecord>,
    /// Pushdown lists of this night's healers/bodyguards, popped one at a
    /// time as incoming attacks are resolved (spec.md §4.4 "Healing",
    /// "Bodyguarding").
    pub heal_stack: Vec<PlayerSeat>,
    pub bodyguard_stack: Vec<PlayerSeat>,
    pub crimes: BitSet,
    pub last_will: Arc<str>,
    pub jailed_by: Option<PlayerSeat>,
    /// Set by Witch's control or a Hiding visit's redirect (spec.md §3
    /// "controlled-by").
    pub controlled_by: Option<PlayerSeat>,
    /// Set by a Hiding visit: this player's own action is redirected onto
    /// `is_behind` instead (spec.md §3 "is-behind").
    pub is_behind: Option<PlayerSeat>,
    pub cause_of_death: Vec<Cause>,
    pub announced_dead: bool,
    pub voting: VotingState,
    pub frame: FrameData,
    pub blackmailed_on_day: Option<usize>,
    pub dead_sanitized: bool,
    /// Set when the owning Session disconnects mid-game (spec.md §4.6); the
    /// player stays seated and the engine continues around them.
    pub leaver: bool,
    /// Set by the evening hook when a Counsel's `goal_target` was executed
    /// and its `IF_FAIL` constraint is `SUICIDE` (spec.md §4.3 evening-hook
    /// item 3); resolved in the night's SUICIDE slot like `leaver`.
    pub suicide_queued: bool,
    /// Set by an Arsonist's oiling visit; cleared only when ignited.
    /// Persists across days unlike the rest of [`DayRecord`]'s scratch state
    /// (`original_source/roles.py` `Arsonist`'s `oiled` attribute).
    pub oiled: bool,
}

impl Player {
    pub fn new(seat: PlayerSeat, session: SessionId, nickname: Arc<str>, role: RoleInstance) -> Self {
        Self {
            seat,
            session,
            nickname,
            role_history: vec![role],
            day_records: vec![DayRecord::default()],
            heal_stack: Vec::new(),
            bodyguard_stack: Vec::new(),
            crimes: BitSet::new(),
            last_will: Arc::from(""),
            jailed_by: None,
            controlled_by: None,
            is_behind: None,
            cause_of_death: Vec::new(),
            announced_dead: false,
            voting: VotingState::default(),
            frame: FrameData::default(),
            blackmailed_on_day: None,
            dead_sanitized: false,
            leaver: false,
            suicide_queued: false,
            oiled: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.cause_of_death.is_empty()
    }

    pub fn role(&self) -> &RoleInstance {
        self.role_history.last().expect("role_history is never empty")
    }

    pub fn role_mut(&mut self) -> &mut RoleInstance {
        self.role_history.last_mut().expect("role_history is never empty")
    }

    /// Pushes a new role onto the history stack (spec.md §3 "Role",
    /// `Role.convert`). The prior role stays addressable for identity
    /// reveals.
    pub fn convert(&mut self, new_role: RoleInstance) {
        self.role_history.push(new_role);
    }

    pub fn original_role(&self) -> RoleId {
        self.role_history.first().expect("role_history is never empty").id
    }

    pub fn today(&self) -> &DayRecord {
        self.day_records.last().expect("day_records is never empty")
    }

    pub fn today_mut(&mut self) -> &mut DayRecord {
        self.day_records.last_mut().expect("day_records is never empty")
    }

    pub fn begin_day(&mut self) {
        self.day_records.push(DayRecord::default());
        self.heal_stack.clear();
        self.bodyguard_stack.clear();
        self.jailed_by = None;
        self.controlled_by = None;
        self.is_behind = None;
        self.frame = FrameData::default();
        self.voting = VotingState::default();
        self.role_mut().after_night_restore_convertable();
    }

    pub fn day_count(&self) -> usize {
        self.day_records.len()
    }

    pub fn kill(&mut self, cause: Cause) {
        self.cause_of_death.push(cause);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn citizen(seat: u8, session: usize) -> Player {
        Player::new(
            PlayerSeat(seat),
            SessionId(session),
            Arc::from("nick"),
            RoleInstance::new(RoleId::Citizen, HashMap::new()),
        )
    }

    #[test]
    fn new_player_is_alive_with_one_role_and_one_day_record() {
        let p = citizen(1, 0);
        assert!(p.is_alive());
        assert_eq!(p.role_history.len(), 1);
        assert_eq!(p.day_count(), 1);
    }

    #[test]
    fn convert_pushes_without_discarding_history() {
        let mut p = citizen(1, 0);
        p.convert(RoleInstance::new(RoleId::Executioner, HashMap::new()));
        assert_eq!(p.original_role(), RoleId::Citizen);
        assert_eq!(p.role().id, RoleId::Executioner);
        assert_eq!(p.role_history.len(), 2);
    }

    #[test]
    fn kill_marks_dead_and_preserves_cause() {
        let mut p = citizen(1, 0);
        assert!(p.is_alive());
        p.kill(Cause::Democracy);
        assert!(!p.is_alive());
        assert_eq!(p.cause_of_death, vec![Cause::Democracy]);
    }

    #[test]
    fn begin_day_clears_nightly_scratch_state() {
        let mut p = citizen(1, 0);
        p.jailed_by = Some(PlayerSeat(2));
        p.heal_stack.push(PlayerSeat(3));
        p.begin_day();
        assert!(p.jailed_by.is_none());
        assert!(p.heal_stack.is_empty());
        assert_eq!(p.day_count(), 2);
    }
}
