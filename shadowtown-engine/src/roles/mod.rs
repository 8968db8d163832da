//! The role and ability catalog (spec.md §3 "Role", §9 design note).
//!
//! Rather than a deep mixin hierarchy, behavior is composed from a small
//! set of capability flags looked up in a `const` [`RoleDescriptor`] table
//! (`catalog`), plus a handful of per-role special cases in
//! [`crate::night`] where the generic capability logic genuinely isn't
//! enough (Witch's redirect, a boss's recruit, Amnesiac's remember, ...).
//! `belongs_to(category)` from the original becomes `descriptor(id).has(Capability::X)`.

pub mod catalog;

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use shadowtown_types::Alignment;
use shadowtown_types::OffenseLevel;
use shadowtown_types::PlayerSeat;
use shadowtown_types::RoleId;
use shadowtown_types::Team;

pub use catalog::descriptor;

/// Capability mixins from spec.md §3 "Role taxonomy", flattened to bits so
/// a descriptor can combine any subset.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[repr(u32)]
pub enum Capability {
    Visiting = 1 << 0,
    ActiveOnly = 1 << 1,
    ActiveAndVisiting = 1 << 2,
    KillingVisiting = 1 << 3,
    Healing = 1 << 4,
    Blocking = 1 << 5,
    Hiding = 1 << 6,
    Threatening = 1 << 7,
    Sanitizing = 1 << 8,
    Framing = 1 << 9,
    Investigating = 1 << 10,
    Following = 1 << 11,
    Watching = 1 << 12,
    IdentityInvestigating = 1 << 13,
    Jailing = 1 << 14,
    Surviving = 1 << 15,
    Crying = 1 << 16,
    Boss = 1 << 17,
    /// Gains a `second_task` hook scheduled later in the night (spec.md
    /// §4.4, "Two roles [...] appear twice").
    SecondTask = 1 << 18,
    /// Converts another player's role (spec.md §4.4 item 9).
    Converting = 1 << 19,
    /// Converts its own role in-place (Amnesiac).
    SelfConverting = 1 << 20,
}

#[derive(Copy, Clone, Debug, Default)]
pub struct Capabilities(pub u32);

impl Capabilities {
    pub const fn of(caps: &[Capability]) -> Self {
        let mut bits = 0u32;
        let mut i = 0;
        while i < caps.len() {
            bits |= caps[i] as u32;
            i += 1;
        }
        Capabilities(bits)
    }

    pub fn has(self, cap: Capability) -> bool {
        self.0 & (cap as u32) != 0
    }
}

/// A role's team, alignment, and default numeric/behavioral makeup (spec.md
/// §3 "Role"). One entry per [`RoleId`], populated at module load by
/// [`catalog::TABLE`] (spec.md §9 "explicit registry populated at
/// startup").
#[derive(Copy, Clone, Debug)]
pub struct RoleDescriptor {
    pub id: RoleId,
    pub team: Team,
    pub alignment: Alignment,
    pub capabilities: Capabilities,
    pub offense: OffenseLevel,
    pub defense: OffenseLevel,
    pub blockable: bool,
    pub healable: bool,
    pub detection_immune: bool,
    pub convertable: bool,
    pub can_target_self: bool,
    pub for_dead: bool,
    pub votes: u32,
    /// `unique` roles (e.g. Jailor) cannot appear twice in a formation
    /// (spec.md §4.5).
    pub unique: bool,
    /// Whether the setup validator's slot pools may ever offer this role
    /// (spec.md §9 Open Question 5: Framer/Forger ship disabled).
    pub enabled: bool,
}

/// One concrete role attached to a [`crate::player::Player`]. Constraint
/// options are frozen at construction (spec.md §3 "Role"); `convertable`
/// and `rest_till_day` are the two fields that legitimately mutate across
/// a match (convertable is cleared/restored by Doctor/Bodyguard/MasonLeader
/// per spec.md §4.4 item 9; rest_till_day advances after an ability use).
#[derive(Clone, Debug)]
pub struct RoleInstance {
    pub id: RoleId,
    pub constraints: HashMap<Arc<str>, Arc<str>>,
    pub convertable: bool,
    base_convertable: bool,
    pub rest_till_day: usize,
    pub opportunity_remaining: Option<u32>,
    pub goal_target: HashSet<PlayerSeat>,
}

impl RoleInstance {
    pub fn new(id: RoleId, constraints: HashMap<Arc<str>, Arc<str>>) -> Self {
        let d = descriptor(id);
        Self {
            id,
            constraints,
            convertable: d.convertable,
            base_convertable: d.convertable,
            rest_till_day: 0,
            opportunity_remaining: None,
            goal_target: HashSet::new(),
        }
    }

    pub fn descriptor(&self) -> RoleDescriptor {
        descriptor(self.id)
    }

    pub fn team(&self) -> Team {
        self.descriptor().team
    }

    pub fn has(&self, cap: Capability) -> bool {
        self.descriptor().capabilities.has(cap)
    }

    /// Restore any temporarily overridden flags (spec.md §4.4 item 9,
    /// `after_night`).
    pub fn after_night_restore_convertable(&mut self) {
        self.convertable = self.base_convertable;
    }

    pub fn constraint(&self, key: &str) -> Option<&str> {
        self.constraints.get(key).map(|v| v.as_ref())
    }
}
