//! The role registry: one [`RoleDescriptor`] per [`RoleId`], populated at
//! module load (spec.md §9 "explicit registry populated at startup").

use shadowtown_types::Alignment;
use shadowtown_types::OffenseLevel;
use shadowtown_types::RoleId;
use shadowtown_types::Team;

use super::Capabilities;
use super::Capability as C;
use super::RoleDescriptor;

const fn d(
    id: RoleId,
    team: Team,
    alignment: Alignment,
    capabilities: &[C],
    offense: OffenseLevel,
    defense: OffenseLevel,
) -> RoleDescriptor {
    RoleDescriptor {
        id,
        team,
        alignment,
        capabilities: Capabilities::of(capabilities),
        offense,
        defense,
        blockable: true,
        healable: true,
        detection_immune: false,
        convertable: true,
        can_target_self: false,
        for_dead: false,
        votes: 1,
        unique: false,
        enabled: true,
    }
}

const fn with_unique(mut r: RoleDescriptor) -> RoleDescriptor {
    r.unique = true;
    r
}

const fn with_immune(mut r: RoleDescriptor) -> RoleDescriptor {
    r.detection_immune = true;
    r
}

const fn with_self(mut r: RoleDescriptor) -> RoleDescriptor {
    r.can_target_self = true;
    r
}

const fn with_unblockable(mut r: RoleDescriptor) -> RoleDescriptor {
    r.blockable = false;
    r
}

const fn with_unhealable(mut r: RoleDescriptor) -> RoleDescriptor {
    r.healable = false;
    r
}

const fn with_disabled(mut r: RoleDescriptor) -> RoleDescriptor {
    r.enabled = false;
    r
}

const fn with_for_dead(mut r: RoleDescriptor) -> RoleDescriptor {
    r.for_dead = true;
    r
}

const fn with_votes(mut r: RoleDescriptor, votes: u32) -> RoleDescriptor {
    r.votes = votes;
    r
}

use OffenseLevel::Absolute;
use OffenseLevel::Basic;
use OffenseLevel::None as NoLevel;
use OffenseLevel::Strong;

/// The full descriptor table, one row per [`RoleId`] named in spec.md's
/// priority list (§4.4) and component design (§4.3). Ordering follows the
/// team groupings in `shadowtown_types::role::RoleId`.
pub const TABLE: &[RoleDescriptor] = &[
    // --- Town ---
    d(RoleId::Citizen, Team::Town, Alignment::Benign, &[C::ActiveOnly], NoLevel, NoLevel),
    d(RoleId::Doctor, Team::Town, Alignment::Protective, &[C::Visiting, C::Healing], NoLevel, NoLevel),
    d(RoleId::Sheriff, Team::Town, Alignment::Investigative, &[C::Visiting, C::Investigating], NoLevel, NoLevel),
    d(RoleId::Bodyguard, Team::Town, Alignment::Protective, &[C::Visiting, C::Threatening], NoLevel, NoLevel),
    with_unique(d(RoleId::Veteran, Team::Town, Alignment::Killing, &[C::ActiveOnly, C::KillingVisiting], Strong, NoLevel)),
    with_unique(d(RoleId::Jailor, Team::Town, Alignment::Government, &[C::Jailing, C::ActiveOnly], Absolute, NoLevel)),
    d(RoleId::Vigilante, Team::Town, Alignment::Killing, &[C::Visiting, C::KillingVisiting], Basic, NoLevel),
    d(RoleId::Escort, Team::Town, Alignment::Support, &[C::Visiting, C::Blocking], NoLevel, NoLevel),
    d(RoleId::Lookout, Team::Town, Alignment::Investigative, &[C::Visiting, C::Investigating, C::Watching], NoLevel, NoLevel),
    with_unique(with_self(d(RoleId::Mayor, Team::Town, Alignment::Power, &[C::ActiveOnly], NoLevel, NoLevel))),
    with_unique(d(RoleId::Marshall, Team::Town, Alignment::Power, &[C::ActiveOnly], NoLevel, NoLevel)),
    d(RoleId::Coroner, Team::Town, Alignment::Investigative, &[C::Visiting, C::Investigating], NoLevel, NoLevel),
    d(RoleId::Investigator, Team::Town, Alignment::Investigative, &[C::Visiting, C::Investigating, C::IdentityInvestigating], NoLevel, NoLevel),
    d(RoleId::Detective, Team::Town, Alignment::Investigative, &[C::Visiting, C::Investigating, C::Following], NoLevel, NoLevel),
    d(RoleId::Spy, Team::Town, Alignment::Investigative, &[C::Investigating, C::Following], NoLevel, NoLevel),
    // --- Mafia ---
    with_self(d(RoleId::Godfather, Team::Mafia, Alignment::Killing, &[C::Visiting, C::KillingVisiting, C::Boss, C::SecondTask, C::Converting], Basic, Basic)),
    d(RoleId::Mafioso, Team::Mafia, Alignment::Killing, &[C::Visiting, C::KillingVisiting], Basic, NoLevel),
    d(RoleId::Consort, Team::Mafia, Alignment::Support, &[C::Visiting, C::Blocking], NoLevel, NoLevel),
    with_disabled(d(RoleId::Beguiler, Team::Mafia, Alignment::Deception, &[C::Visiting, C::Hiding], NoLevel, NoLevel)),
    with_disabled(d(RoleId::Framer, Team::Mafia, Alignment::Deception, &[C::Visiting, C::Framing], NoLevel, NoLevel)),
    d(RoleId::Janitor, Team::Mafia, Alignment::Deception, &[C::Visiting, C::Sanitizing], NoLevel, NoLevel),
    d(RoleId::Consigliere, Team::Mafia, Alignment::Investigative, &[C::Visiting, C::Investigating, C::IdentityInvestigating], NoLevel, NoLevel),
    d(RoleId::Blackmailer, Team::Mafia, Alignment::Support, &[C::Visiting], NoLevel, NoLevel),
    d(RoleId::Kidnapper, Team::Mafia, Alignment::Government, &[C::Jailing, C::ActiveOnly], Basic, NoLevel),
    // --- Triad ---
    with_self(d(RoleId::DragonHead, Team::Triad, Alignment::Killing, &[C::Visiting, C::KillingVisiting, C::Boss, C::SecondTask, C::Converting], Basic, Basic)),
    d(RoleId::Enforcer, Team::Triad, Alignment::Killing, &[C::Visiting, C::KillingVisiting], Basic, NoLevel),
    d(RoleId::Liaison, Team::Triad, Alignment::Support, &[C::Visiting, C::Blocking], NoLevel, NoLevel),
    with_disabled(d(RoleId::Deceiver, Team::Triad, Alignment::Deception, &[C::Visiting, C::Hiding], NoLevel, NoLevel)),
    with_disabled(d(RoleId::Forger, Team::Triad, Alignment::Deception, &[C::Visiting, C::Framing], NoLevel, NoLevel)),
    d(RoleId::IncenseMaster, Team::Triad, Alignment::Deception, &[C::Visiting, C::Sanitizing], NoLevel, NoLevel),
    d(RoleId::Administrator, Team::Triad, Alignment::Investigative, &[C::Visiting, C::Investigating, C::IdentityInvestigating], NoLevel, NoLevel),
    d(RoleId::Silencer, Team::Triad, Alignment::Support, &[C::Visiting], NoLevel, NoLevel),
    d(RoleId::Interrogator, Team::Triad, Alignment::Government, &[C::Jailing, C::ActiveOnly], Basic, NoLevel),
    // --- Cult ---
    d(RoleId::Cultist, Team::Cult, Alignment::Evil, &[C::Visiting, C::Converting], NoLevel, NoLevel),
    d(RoleId::Agent, Team::Cult, Alignment::Investigative, &[C::Visiting, C::Investigating, C::IdentityInvestigating], NoLevel, NoLevel),
    d(RoleId::Vanguard, Team::Cult, Alignment::Protective, &[C::Visiting, C::Threatening], NoLevel, NoLevel),
    // --- Mason (chat-only team, Town-aligned) ---
    d(RoleId::Mason, Team::Town, Alignment::Power, &[C::ActiveOnly], NoLevel, NoLevel),
    with_unique(d(RoleId::MasonLeader, Team::Town, Alignment::Killing, &[C::Visiting, C::KillingVisiting, C::Boss, C::SecondTask, C::Converting], Basic, NoLevel)),
    // --- Neutral killing ---
    with_unhealable(d(RoleId::SerialKiller, Team::NeutralKilling, Alignment::Killing, &[C::Visiting, C::KillingVisiting], Basic, Basic)),
    with_self(d(RoleId::Arsonist, Team::NeutralKilling, Alignment::Killing, &[C::Visiting, C::ActiveAndVisiting, C::SecondTask], Absolute, Basic)),
    with_unblockable(d(RoleId::MassMurderer, Team::NeutralKilling, Alignment::Killing, &[C::Visiting, C::KillingVisiting], Strong, NoLevel)),
    // --- Neutral evil, non-killing ---
    with_unhealable(with_self(d(RoleId::Witch, Team::NeutralEvil, Alignment::Deception, &[C::Visiting, C::SecondTask], NoLevel, NoLevel))),
    d(RoleId::Jester, Team::NeutralEvil, Alignment::Evil, &[C::ActiveOnly], NoLevel, NoLevel),
    d(RoleId::Executioner, Team::NeutralEvil, Alignment::Evil, &[C::ActiveOnly], NoLevel, Basic),
    d(RoleId::Scumbag, Team::NeutralEvil, Alignment::Evil, &[C::ActiveOnly], NoLevel, NoLevel),
    d(RoleId::Judge, Team::NeutralEvil, Alignment::Power, &[C::ActiveOnly], NoLevel, NoLevel),
    d(RoleId::Auditor, Team::NeutralEvil, Alignment::Investigative, &[C::Visiting, C::Investigating, C::Converting], NoLevel, NoLevel),
    // --- Neutral benign ---
    with_immune(with_self(d(RoleId::Survivor, Team::NeutralBenign, Alignment::Benign, &[C::ActiveOnly, C::Surviving], NoLevel, NoLevel))),
    d(RoleId::Amnesiac, Team::NeutralBenign, Alignment::Benign, &[C::ActiveOnly, C::SelfConverting], NoLevel, NoLevel),
    with_unique(d(RoleId::Counsel, Team::NeutralBenign, Alignment::Investigative, &[C::Visiting, C::IdentityInvestigating], NoLevel, NoLevel)),
    // --- Hybrid ---
    d(RoleId::WitchDoctor, Team::NeutralEvil, Alignment::Deception, &[C::Visiting, C::Healing, C::SecondTask, C::Converting], NoLevel, NoLevel),
];

/// Looks up a role's descriptor by id. `TABLE` is a flat slice scanned
/// linearly; at ~50 entries this is cheaper than hashing and the table is
/// only ever read, never indexed in a hot loop larger than one night's
/// priority pass.
pub fn descriptor(id: RoleId) -> RoleDescriptor {
    *TABLE
        .iter()
        .find(|row| row.id == id)
        .unwrap_or_else(|| unreachable!("every RoleId has a TABLE entry: {id:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_role_id_has_a_descriptor() {
        // Exercise the lookup path for every catalog entry; a panic here
        // means a `RoleId` variant was added without a matching row.
        for row in TABLE {
            assert_eq!(descriptor(row.id).id, row.id);
        }
    }

    #[test]
    fn framer_and_forger_ship_disabled() {
        assert!(!descriptor(RoleId::Framer).enabled);
        assert!(!descriptor(RoleId::Forger).enabled);
        assert!(!descriptor(RoleId::Beguiler).enabled);
        assert!(!descriptor(RoleId::Deceiver).enabled);
    }
}
