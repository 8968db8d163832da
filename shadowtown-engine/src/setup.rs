//! Turns a client-supplied formation description into an immutable
//! [`Setup`], or rejects it (spec.md §4.5 "Setup validator").

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use rand::Rng;
use rand::seq::IndexedRandom;
use shadowtown_types::RoleId;
use shadowtown_types::Team;

use crate::consts::FORMATION_MAX_LEN;
use crate::consts::FORMATION_MIN_LEN;
use crate::error::SetupError;
use crate::roles::catalog;

/// One formation entry: a concrete role, or an abstract category (spec.md
/// §3 "Setup" — "either a specific role or an abstract category such as
/// 'any town', 'any killing'").
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Slot {
    Role(RoleId),
    Team(Team),
    Killing,
    Any,
}

/// What an exclusion entry forbids in a slot (spec.md §4.5 "each excluded
/// must be a known role, the token Killing, or a team name").
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Excluded {
    Role(RoleId),
    Killing,
    Team(Team),
}

/// One `exclusion` mapping entry (spec.md §3 "Setup").
#[derive(Clone, Debug)]
pub struct Exclusion {
    pub from: Slot,
    pub excluded: Excluded,
}

/// Validated, immutable game configuration (spec.md §3 "Setup").
#[derive(Clone, Debug)]
pub struct Setup {
    pub title: Arc<str>,
    pub inventor: Arc<str>,
    pub formation: Vec<Slot>,
    pub constraints: HashMap<usize, HashMap<Arc<str>, Arc<str>>>,
    pub exclusion: Vec<Exclusion>,
    /// Precomputed per-slot candidate pool (spec.md §4.5 `pool_per_slot`),
    /// kept alongside the formation so `trial()` never recomputes it.
    pools: Vec<Vec<RoleId>>,
}

/// A raw, unvalidated formation description as it would arrive over the
/// wire (spec.md §4.5, the validator's input contract).
#[derive(Clone, Debug)]
pub struct RawSetup {
    pub title: Arc<str>,
    pub inventor: Arc<str>,
    pub formation: Vec<Slot>,
    pub constraints: HashMap<usize, HashMap<Arc<str>, Arc<str>>>,
    pub exclusion: Vec<Exclusion>,
}

fn all_enabled_roles() -> impl Iterator<Item = RoleId> {
    catalog::TABLE.iter().filter(|d| d.enabled).map(|d| d.id)
}

fn team_of(role: RoleId) -> Team {
    catalog::descriptor(role).team
}

/// Factions a team's members fight (spec.md §4.5 "each team's `against()`
/// must intersect another team present as a certain slot"). Neutral-evil
/// non-killing roles have no opposing faction of their own; they ride along
/// on whichever side wins.
fn against(team: Team) -> &'static [Team] {
    match team {
        Team::Town => &[Team::Mafia, Team::Triad, Team::Cult, Team::NeutralKilling],
        Team::Mafia => &[Team::Town, Team::Triad, Team::Cult],
        Team::Triad => &[Team::Town, Team::Mafia, Team::Cult],
        Team::Cult => &[Team::Town, Team::Mafia, Team::Triad],
        Team::NeutralKilling => &[Team::Town, Team::Mafia, Team::Triad, Team::Cult],
        Team::NeutralBenign | Team::NeutralEvil => &[],
    }
}

impl Setup {
    /// Runs spec.md §4.5's fail-fast validation pipeline, distinguishing
    /// `SetupMalformed` (tampered/unknown vocabulary) from `SetupInvalid`
    /// (well-formed but unplayable).
    pub fn validate(raw: RawSetup) -> Result<Self, SetupError> {
        if raw.formation.len() < FORMATION_MIN_LEN || raw.formation.len() > FORMATION_MAX_LEN {
            return Err(SetupError::Invalid(format!(
                "formation length {} not in [{FORMATION_MIN_LEN}, {FORMATION_MAX_LEN}]",
                raw.formation.len()
            )));
        }

        for slot in &raw.formation {
            if let Slot::Role(role) = slot {
                if !catalog::TABLE.iter().any(|d| d.id == *role) {
                    return Err(SetupError::Malformed(format!("unknown role in formation: {role:?}")));
                }
            }
        }

        for (slot_idx, opts) in &raw.constraints {
            let Some(Slot::Role(role)) = raw.formation.get(*slot_idx) else {
                return Err(SetupError::Malformed(format!("constraint on unknown slot {slot_idx}")));
            };
            for (key, value) in opts {
                if !modifiable_constraints(*role).iter().any(|(k, vs)| *k == key.as_ref() && vs.contains(&value.as_ref())) {
                    return Err(SetupError::Malformed(format!(
                        "constraint {key}={value} not offered by {role:?}"
                    )));
                }
            }
        }

        for excl in &raw.exclusion {
            match excl.from {
                Slot::Role(_) | Slot::Team(_) | Slot::Killing => {}
                Slot::Any => {
                    if let Excluded::Role(_) = excl.excluded {
                    } else if !matches!(excl.excluded, Excluded::Team(_) | Excluded::Killing) {
                        return Err(SetupError::Malformed("exclusion 'excluded' must be a role, Killing, or a team when 'from' is Any".into()));
                    }
                }
            }
            if let Excluded::Role(role) = excl.excluded {
                if !catalog::TABLE.iter().any(|d| d.id == role) {
                    return Err(SetupError::Malformed(format!("unknown excluded role: {role:?}")));
                }
            }
        }

        let mut unique_seen = HashSet::new();
        for slot in &raw.formation {
            if let Slot::Role(role) = slot {
                if catalog::descriptor(*role).unique && !unique_seen.insert(*role) {
                    return Err(SetupError::Invalid(format!("unique role {role:?} appears twice in formation")));
                }
            }
        }

        let pools: Vec<Vec<RoleId>> = raw
            .formation
            .iter()
            .map(|slot| pool_for_slot(*slot, &raw.exclusion))
            .collect();
        if let Some(empty_idx) = pools.iter().position(|p| p.is_empty()) {
            return Err(SetupError::Invalid(format!("slot {empty_idx} has no eligible role")));
        }

        let definite_teams: HashSet<Team> = raw
            .formation
            .iter()
            .filter_map(|slot| match slot {
                Slot::Role(role) => Some(team_of(*role)),
                _ => None,
            })
            .collect();

        let mut competing = HashSet::new();
        for team in &definite_teams {
            for opp in against(*team) {
                if definite_teams.contains(opp) {
                    competing.insert(*team);
                    competing.insert(*opp);
                }
            }
        }
        if competing.len() < 2 {
            return Err(SetupError::Invalid("no opposing factions".into()));
        }

        let any_pool_has_spy = pools.iter().flatten().any(|r| *r == RoleId::Spy);
        if any_pool_has_spy && !definite_teams.contains(&Team::Mafia) && !definite_teams.contains(&Team::Triad) {
            return Err(SetupError::Invalid("Spy requires Mafia or Triad as a definite team".into()));
        }

        for (slot_idx, opts) in &raw.constraints {
            if let Some(Slot::Role(RoleId::Executioner)) = raw.formation.get(*slot_idx) {
                if opts.get("TARGET_IS_TOWN").map(|v| v.as_ref()) == Some("true") && !definite_teams.contains(&Team::Town) {
                    return Err(SetupError::Invalid("Executioner with TARGET_IS_TOWN requires Town in competitors".into()));
                }
            }
        }

        Ok(Setup {
            title: raw.title,
            inventor: raw.inventor,
            formation: raw.formation,
            constraints: raw.constraints,
            exclusion: raw.exclusion,
            pools,
        })
    }

    /// Picks one concrete role per slot by uniform-random choice from its
    /// pool (spec.md §4.5 `trial()`). Used both as a feasibility probe
    /// during validation and by the engine at game start.
    pub fn trial<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<RoleId> {
        self.pools
            .iter()
            .map(|pool| *pool.choose(rng).expect("validated pools are never empty"))
            .collect()
    }

    pub fn pool_for(&self, slot_idx: usize) -> &[RoleId] {
        &self.pools[slot_idx]
    }
}

/// A role's modifiable constraint options: `(key, allowed values)` pairs
/// (spec.md §4.5 "each constraint key/value must appear in that role's
/// `modifiable_constraints()` options"). Only a handful of roles expose any.
fn modifiable_constraints(role: RoleId) -> &'static [(&'static str, &'static [&'static str])] {
    match role {
        RoleId::Executioner => &[("TARGET_IS_TOWN", &["true", "false"])],
        RoleId::Survivor => &[("VEST_COUNT", &["0", "1", "2", "3", "4"])],
        _ => &[],
    }
}

/// Decodes the string-keyed wire shape of `ClientCommand::Setup` into a
/// [`RawSetup`] (spec.md §4.2 `SETUP`, §6). Tokens name a role, a team, or
/// the literals `"Killing"`/`"Any"`, matched against each enum's `Debug`
/// spelling the way `night.rs` decodes Amnesiac's remembered role.
pub mod wire {
    use std::collections::HashMap;
    use std::sync::Arc;

    use shadowtown_types::RoleId;
    use shadowtown_types::Team;

    use super::Exclusion;
    use super::Excluded;
    use super::RawSetup;
    use super::Slot;
    use crate::error::SetupError;
    use crate::roles::catalog;

    const TEAMS: &[Team] = &[
        Team::Town,
        Team::Mafia,
        Team::Triad,
        Team::Cult,
        Team::NeutralBenign,
        Team::NeutralEvil,
        Team::NeutralKilling,
    ];

    fn parse_team(token: &str) -> Option<Team> {
        TEAMS.iter().copied().find(|t| format!("{t:?}") == token)
    }

    fn parse_role(token: &str) -> Option<RoleId> {
        catalog::TABLE.iter().map(|d| d.id).find(|r| format!("{r:?}") == token)
    }

    fn parse_slot(token: &str) -> Result<Slot, SetupError> {
        match token {
            "Killing" => Ok(Slot::Killing),
            "Any" => Ok(Slot::Any),
            _ => parse_team(token)
                .map(Slot::Team)
                .or_else(|| parse_role(token).map(Slot::Role))
                .ok_or_else(|| SetupError::Malformed(format!("unrecognized formation token '{token}'"))),
        }
    }

    fn parse_excluded(token: &str) -> Result<Excluded, SetupError> {
        match token {
            "Killing" => Ok(Excluded::Killing),
            _ => parse_team(token)
                .map(Excluded::Team)
                .or_else(|| parse_role(token).map(Excluded::Role))
                .ok_or_else(|| SetupError::Malformed(format!("unrecognized exclusion token '{token}'"))),
        }
    }

    pub fn decode(
        title: Arc<str>,
        inventor: Arc<str>,
        formation: Vec<Arc<str>>,
        constraints: HashMap<Arc<str>, HashMap<Arc<str>, Arc<str>>>,
        exclusion: HashMap<Arc<str>, Vec<Arc<str>>>,
    ) -> Result<RawSetup, SetupError> {
        let formation = formation.iter().map(|t| parse_slot(t)).collect::<Result<Vec<_>, _>>()?;

        let mut parsed_constraints = HashMap::new();
        for (slot_idx, opts) in constraints {
            let idx: usize = slot_idx
                .parse()
                .map_err(|_| SetupError::Malformed(format!("constraint key '{slot_idx}' is not a slot index")))?;
            parsed_constraints.insert(idx, opts);
        }

        let mut parsed_exclusion = Vec::new();
        for (from_token, excluded_tokens) in exclusion {
            let from = parse_slot(&from_token)?;
            for excluded_token in excluded_tokens {
                parsed_exclusion.push(Exclusion { from, excluded: parse_excluded(&excluded_token)? });
            }
        }

        Ok(RawSetup { title, inventor, formation, constraints: parsed_constraints, exclusion: parsed_exclusion })
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn decodes_role_team_and_abstract_tokens() {
            let raw = decode(
                Arc::from("t"),
                Arc::from("host"),
                vec![Arc::from("Citizen"), Arc::from("Mafia"), Arc::from("Killing"), Arc::from("Any")],
                HashMap::new(),
                HashMap::new(),
            )
            .unwrap();
            assert_eq!(raw.formation[0], Slot::Role(RoleId::Citizen));
            assert_eq!(raw.formation[1], Slot::Team(Team::Mafia));
            assert_eq!(raw.formation[2], Slot::Killing);
            assert_eq!(raw.formation[3], Slot::Any);
        }

        #[test]
        fn rejects_unrecognized_token() {
            let result = decode(Arc::from("t"), Arc::from("host"), vec![Arc::from("Nonsense")], HashMap::new(), HashMap::new());
            assert!(matches!(result, Err(SetupError::Malformed(_))));
        }
    }
}

fn pool_for_slot(slot: Slot, exclusions: &[Exclusion]) -> Vec<RoleId> {
    let candidates: Vec<RoleId> = match slot {
        Slot::Role(role) => vec![role],
        Slot::Team(team) => all_enabled_roles().filter(|r| team_of(*r) == team).collect(),
        Slot::Killing => all_enabled_roles()
            .filter(|r| catalog::descriptor(*r).offense > shadowtown_types::OffenseLevel::None)
            .collect(),
        Slot::Any => all_enabled_roles().collect(),
    };

    candidates
        .into_iter()
        .filter(|role| !is_excluded(*role, slot, exclusions))
        .collect()
}

fn is_excluded(role: RoleId, slot: Slot, exclusions: &[Exclusion]) -> bool {
    exclusions.iter().any(|excl| {
        let from_matches = excl.from == slot || excl.from == Slot::Any;
        if !from_matches {
            return false;
        }
        match excl.excluded {
            Excluded::Role(excluded_role) => excluded_role == role,
            Excluded::Killing => catalog::descriptor(role).offense > shadowtown_types::OffenseLevel::None,
            Excluded::Team(team) => team_of(role) == team,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formation(roles: &[RoleId]) -> Vec<Slot> {
        roles.iter().copied().map(Slot::Role).collect()
    }

    #[test]
    fn rejects_formation_outside_size_bounds() {
        let raw = RawSetup {
            title: Arc::from("t"),
            inventor: Arc::from("host"),
            formation: formation(&[RoleId::Citizen, RoleId::Doctor]),
            constraints: HashMap::new(),
            exclusion: Vec::new(),
        };
        assert!(matches!(Setup::validate(raw), Err(SetupError::Invalid(_))));
    }

    #[test]
    fn rejects_duplicate_unique_role() {
        let raw = RawSetup {
            title: Arc::from("t"),
            inventor: Arc::from("host"),
            formation: formation(&[
                RoleId::Jailor,
                RoleId::Jailor,
                RoleId::Citizen,
                RoleId::Mafioso,
                RoleId::Godfather,
            ]),
            constraints: HashMap::new(),
            exclusion: Vec::new(),
        };
        assert!(matches!(Setup::validate(raw), Err(SetupError::Invalid(_))));
    }

    #[test]
    fn rejects_single_faction_formation() {
        let raw = RawSetup {
            title: Arc::from("t"),
            inventor: Arc::from("host"),
            formation: formation(&[
                RoleId::Citizen,
                RoleId::Doctor,
                RoleId::Sheriff,
                RoleId::Bodyguard,
                RoleId::Lookout,
            ]),
            constraints: HashMap::new(),
            exclusion: Vec::new(),
        };
        assert!(matches!(Setup::validate(raw), Err(SetupError::Invalid(_))));
    }

    #[test]
    fn accepts_two_faction_formation_and_trial_picks_within_pools() {
        let raw = RawSetup {
            title: Arc::from("t"),
            inventor: Arc::from("host"),
            formation: formation(&[
                RoleId::Citizen,
                RoleId::Doctor,
                RoleId::Sheriff,
                RoleId::Mafioso,
                RoleId::Godfather,
            ]),
            constraints: HashMap::new(),
            exclusion: Vec::new(),
        };
        let setup = Setup::validate(raw).expect("valid setup");
        let mut rng = rand::rng();
        let picked = setup.trial(&mut rng);
        assert_eq!(picked.len(), 5);
        for (idx, role) in picked.iter().enumerate() {
            assert!(setup.pool_for(idx).contains(role));
        }
    }

    /// Scenario 6 (spec.md §8): Executioner with `TARGET_IS_TOWN=true` but
    /// no Town slot in the formation is `SetupInvalid`.
    #[test]
    fn rejects_executioner_targeting_town_with_no_town_slot() {
        let mut constraints = HashMap::new();
        constraints.insert(0, HashMap::from([(Arc::from("TARGET_IS_TOWN"), Arc::from("true"))]));
        let raw = RawSetup {
            title: Arc::from("t"),
            inventor: Arc::from("host"),
            formation: formation(&[
                RoleId::Executioner,
                RoleId::Mafioso,
                RoleId::Godfather,
                RoleId::Enforcer,
                RoleId::DragonHead,
            ]),
            constraints,
            exclusion: Vec::new(),
        };
        assert!(matches!(Setup::validate(raw), Err(SetupError::Invalid(_))));
    }

    #[test]
    fn rejects_unknown_role_as_malformed() {
        let mut constraints = HashMap::new();
        constraints.insert(0, HashMap::from([(Arc::from("BOGUS"), Arc::from("true"))]));
        let raw = RawSetup {
            title: Arc::from("t"),
            inventor: Arc::from("host"),
            formation: formation(&[RoleId::Citizen, RoleId::Doctor, RoleId::Sheriff, RoleId::Mafioso, RoleId::Godfather]),
            constraints,
            exclusion: Vec::new(),
        };
        assert!(matches!(Setup::validate(raw), Err(SetupError::Malformed(_))));
    }
}
