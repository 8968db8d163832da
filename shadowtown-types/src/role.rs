use serde::Deserialize;
use serde::Serialize;

/// Broad faction a role belongs to (spec.md §3 "Role taxonomy").
///
/// `Mason`, `Cult`, and `Spy` are the "virtual chat-only teams" spec.md
/// calls out: they group private-chat membership, not win-condition
/// evaluation (a Mason is still on Team Town for win purposes).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Team {
    Town,
    Mafia,
    Triad,
    Cult,
    NeutralBenign,
    NeutralEvil,
    /// Subset of `NeutralEvil` per spec.md §3.
    NeutralKilling,
}

/// Ability archetype (spec.md glossary).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Alignment {
    Killing,
    Government,
    Protective,
    Investigative,
    Power,
    Support,
    Deception,
    Benign,
    Evil,
}

/// Offense/defense strength, ordered `None < Basic < Strong < Absolute`
/// (spec.md §3).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum OffenseLevel {
    None,
    Basic,
    Strong,
    Absolute,
}

/// Every role name spec.md's component design and priority list (§4.4)
/// reference. Behavior is composed from capabilities in
/// `shadowtown-engine::roles`, not hand-written per variant (spec.md §9).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum RoleId {
    // Town
    Citizen,
    Doctor,
    Sheriff,
    Bodyguard,
    Veteran,
    Jailor,
    Vigilante,
    Escort,
    Lookout,
    Mayor,
    Marshall,
    Coroner,
    Investigator,
    Detective,
    Spy,
    // Mafia
    Godfather,
    Mafioso,
    Consort,
    Beguiler,
    Framer,
    Janitor,
    Consigliere,
    Blackmailer,
    Kidnapper,
    // Triad
    DragonHead,
    Enforcer,
    Liaison,
    Deceiver,
    Forger,
    IncenseMaster,
    Administrator,
    Silencer,
    Interrogator,
    // Cult
    Cultist,
    Agent,
    Vanguard,
    // Mason (chat-only team, town-aligned)
    Mason,
    MasonLeader,
    // Neutral killing
    SerialKiller,
    Arsonist,
    MassMurderer,
    // Neutral evil, non-killing
    Witch,
    Jester,
    Executioner,
    Scumbag,
    Judge,
    Auditor,
    // Neutral benign
    Survivor,
    Amnesiac,
    Counsel,
    // Hybrid (healing + conversion), team NeutralEvil
    WitchDoctor,
}
