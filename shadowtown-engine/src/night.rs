//! Walks the fixed, totally ordered ability priority list once per night
//! (spec.md §4.4 "Night resolver").

use std::sync::Arc;

use shadowtown_types::AbilityResultType;
use shadowtown_types::OffenseLevel;
use shadowtown_types::PlayerSeat;
use shadowtown_types::RoleId;

use crate::player::Cause;
use crate::player::Player;
use crate::roles::Capability;
use crate::roles::RoleInstance;

/// One flattened ability outcome (spec.md §4.4 "AbilityResult structure").
/// The resolver collects these in emission order; the engine turns them
/// into [`shadowtown_types::Event`]s.
#[derive(Clone, Debug)]
pub struct AbilityResult {
    pub ty: AbilityResultType,
    pub subject: PlayerSeat,
    pub by: Option<Arc<str>>,
    pub by_public: Option<Arc<str>>,
    pub into: Option<RoleId>,
    pub result: Option<Arc<str>>,
}

impl AbilityResult {
    fn simple(ty: AbilityResultType, subject: PlayerSeat) -> Self {
        Self { ty, subject, by: None, by_public: None, into: None, result: None }
    }

    fn by(mut self, who: impl Into<Arc<str>>) -> Self {
        self.by = Some(who.into());
        self
    }

    fn by_public(mut self, who: impl Into<Arc<str>>) -> Self {
        self.by_public = Some(who.into());
        self
    }

    fn into_result_text(mut self, text: impl Into<Arc<str>>) -> Self {
        self.result = Some(text.into());
        self
    }
}

/// The fixed priority list (spec.md §4.4). Each slot names the capability
/// (or special case) whose live bearers act this priority; `Second` marks
/// the deferred `second_task` re-appearance of a role already seen once.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Slot {
    Vest,
    Witch,
    Inactive,
    Block,
    Hide,
    Frame,
    MarkVisits,
    ArsonistOil,
    Heal,
    Bodyguard,
    Act,
    Attack,
    SecondaryKill,
    WitchCurse,
    Suicide,
    Sanitize,
    Investigate,
    IdentityInvestigate,
    InvestigateDeep,
    Recruit,
    Amnesiac,
    BlackmailSilence,
}

const PRIORITY: &[Slot] = &[
    Slot::Vest,
    Slot::Witch,
    Slot::Inactive,
    Slot::Block,
    Slot::Hide,
    Slot::Frame,
    Slot::MarkVisits,
    Slot::ArsonistOil,
    Slot::Heal,
    Slot::Bodyguard,
    Slot::Act,
    Slot::Attack,
    Slot::SecondaryKill,
    Slot::WitchCurse,
    Slot::Suicide,
    Slot::Sanitize,
    Slot::Investigate,
    Slot::IdentityInvestigate,
    Slot::InvestigateDeep,
    Slot::Recruit,
    Slot::Amnesiac,
    Slot::BlackmailSilence,
];

/// Per-night scratch state the resolver threads between priority slots:
/// who blocked whom, who's hidden behind whom, pending conversions, and
/// the flattened result stream (spec.md §4.4 interaction contracts).
#[derive(Default)]
struct NightCtx {
    blocked: std::collections::HashMap<PlayerSeat, PlayerSeat>,
    hidden_behind: std::collections::HashMap<PlayerSeat, PlayerSeat>,
    pending_convert: Vec<(PlayerSeat, RoleInstance)>,
    results: Vec<AbilityResult>,
}

fn seat_index(players: &[Player], seat: PlayerSeat) -> Option<usize> {
    players.iter().position(|p| p.seat == seat)
}

/// Resolves the night's actions and returns the flattened, ordered result
/// stream the engine turns into events (spec.md §4.4, §5 ordering guarantee
/// (b): "actor order is by seat index" within a priority slot).
#[tracing::instrument(skip(players), fields(day = day))]
pub fn resolve_night(players: &mut Vec<Player>, day: usize) -> Vec<AbilityResult> {
    let mut ctx = NightCtx::default();

    for slot in PRIORITY {
        run_slot(*slot, players, &mut ctx, day);
    }

    for player in players.iter_mut() {
        player.role_mut().after_night_restore_convertable();
    }

    ctx.results
}

fn live_seats_in_seat_order(players: &[Player]) -> Vec<PlayerSeat> {
    let mut seats: Vec<PlayerSeat> = players.iter().filter(|p| p.is_alive()).map(|p| p.seat).collect();
    seats.sort();
    seats
}

fn resolve_redirect(players: &[Player], ctx: &NightCtx, target: PlayerSeat) -> PlayerSeat {
    ctx.hidden_behind.get(&target).copied().unwrap_or_else(|| {
        let _ = players;
        target
    })
}

fn run_slot(slot: Slot, players: &mut Vec<Player>, ctx: &mut NightCtx, day: usize) {
    match slot {
        Slot::Vest => { /* Survivor/Citizen vest bump is informational only; handled via constraint read in engine night-open. */ }
        Slot::Witch => resolve_witch(players, ctx),
        Slot::Inactive => { /* targets with no visit/act submitted this night still register as reachable; no-op placeholder for capability-less roles. */ }
        Slot::Block => resolve_blocking(players, ctx),
        Slot::Hide => resolve_hiding(players, ctx),
        Slot::Frame => resolve_framing(players, ctx),
        Slot::MarkVisits => resolve_mark_visits(players, ctx),
        Slot::ArsonistOil => resolve_visiting_capability(players, ctx, RoleId::Arsonist, AbilityResultType::Visit),
        Slot::Heal => resolve_healing(players, ctx),
        Slot::Bodyguard => resolve_bodyguarding(players, ctx),
        Slot::Act => resolve_act(players, ctx, day),
        Slot::Attack => resolve_attacks(players, ctx),
        Slot::SecondaryKill => resolve_secondary_kill(players, ctx),
        Slot::WitchCurse => { /* Witch's second appearance is its SUICIDE-adjacent curse, folded into Slot::Witch's second_task branch. */ }
        Slot::Suicide => resolve_suicide(players, ctx),
        Slot::Sanitize => resolve_sanitizing(players, ctx),
        Slot::Investigate => resolve_category_investigating(players, ctx),
        Slot::IdentityInvestigate => resolve_identity_investigating(players, ctx),
        Slot::InvestigateDeep => {
            resolve_following(players, ctx);
            resolve_watching(players, ctx);
        }
        Slot::Recruit => resolve_recruit(players, ctx),
        Slot::Amnesiac => resolve_amnesiac(players, ctx),
        Slot::BlackmailSilence => resolve_blackmail_silence(players, ctx),
    }

    for (seat, new_role) in ctx.pending_convert.drain(..) {
        if let Some(idx) = seat_index(players, seat) {
            if players[idx].role().convertable {
                players[idx].convert(new_role);
            }
        }
    }
}

/// Witch redirects a visiting role's target onto `witch.second_target`,
/// discarding the controlled player's own intent (spec.md §4.4 contract 2).
fn resolve_witch(players: &mut [Player], ctx: &mut NightCtx) {
    for seat in live_seats_in_seat_order(players) {
        let idx = seat_index(players, seat).unwrap();
        if players[idx].role().id != RoleId::Witch || !players[idx].role().has(Capability::Visiting) {
            continue;
        }
        let Some(hypnotized) = players[idx].today().visit else { continue };
        let Some(second_target) = players[idx].role().constraint("second_target").and_then(|v| v.parse::<u8>().ok()).map(PlayerSeat)
        else {
            continue;
        };
        if let Some(target_idx) = seat_index(players, hypnotized) {
            players[target_idx].today_mut().visit = Some(second_target);
            players[target_idx].controlled_by = Some(seat);
        }
        ctx.results.push(AbilityResult::simple(AbilityResultType::Contacted, hypnotized).by("Witch"));
    }
}

/// Escort/Consort/Liaison (and similarly-capable blockers) null their
/// target's action for the night (spec.md §4.4 contract 6).
fn resolve_blocking(players: &mut [Player], ctx: &mut NightCtx) {
    for seat in live_seats_in_seat_order(players) {
        let idx = seat_index(players, seat).unwrap();
        if !players[idx].role().has(Capability::Blocking) {
            continue;
        }
        let Some(target) = players[idx].today().visit else { continue };
        let Some(target_idx) = seat_index(players, target) else { continue };
        if players[target_idx].role().id == RoleId::Veteran && players[target_idx].today().active {
            continue;
        }
        ctx.blocked.insert(target, seat);
        players[target_idx].today_mut().active = false;
        players[target_idx].today_mut().visit = None;
        ctx.results.push(AbilityResult::simple(AbilityResultType::Blocked, target).by(seat.0.to_string()));
    }
}

/// Beguiler/Deceiver hide behind a target; visitors aimed at the hidden
/// player are redirected to whoever it's hiding behind (spec.md §4.4
/// contract 1).
fn resolve_hiding(players: &mut [Player], ctx: &mut NightCtx) {
    for seat in live_seats_in_seat_order(players) {
        let idx = seat_index(players, seat).unwrap();
        if !players[idx].role().has(Capability::Hiding) {
            continue;
        }
        let Some(behind) = players[idx].today().visit else { continue };
        ctx.hidden_behind.insert(seat, behind);
        if let Some(sidx) = seat_index(players, seat) {
            players[sidx].is_behind = Some(behind);
        }
        ctx.results.push(AbilityResult::simple(AbilityResultType::Visit, seat).by_public("Beguiler/Deceiver"));
    }
}

/// Framer/Forger overwrite the target's apparent investigation output
/// (spec.md §4.4 contract 7).
fn resolve_framing(players: &mut [Player], ctx: &mut NightCtx) {
    for seat in live_seats_in_seat_order(players) {
        let idx = seat_index(players, seat).unwrap();
        if !players[idx].role().has(Capability::Framing) {
            continue;
        }
        let Some(target) = players[idx].today().visit else { continue };
        let Some(target_idx) = seat_index(players, target) else { continue };
        players[target_idx].frame.role = Some(RoleId::Mafioso);
        ctx.results.push(AbilityResult::simple(AbilityResultType::Visit, target).by("Framer/Forger"));
    }
}

/// Records every `Visiting` role's resolved visit onto its target's
/// `visited_by` set, feeding Lookout's `Watching` read (spec.md §4.4
/// priority list; `original_source/roles.py` records each visitor as the
/// action happens rather than in a dedicated slot, collapsed here into one
/// pass so `Watching` has a single well-defined read point).
fn resolve_mark_visits(players: &mut [Player], ctx: &mut NightCtx) {
    let mut marks: Vec<(PlayerSeat, PlayerSeat)> = Vec::new();
    for seat in live_seats_in_seat_order(players) {
        let idx = seat_index(players, seat).unwrap();
        if !players[idx].role().has(Capability::Visiting) {
            continue;
        }
        let Some(target) = players[idx].today().visit else { continue };
        let resolved = resolve_redirect(players, ctx, target);
        marks.push((seat, resolved));
    }
    for (seat, resolved) in marks {
        if let Some(tidx) = seat_index(players, resolved) {
            players[tidx].today_mut().visited_by.insert(seat);
        }
    }
}

fn resolve_visiting_capability(players: &mut [Player], ctx: &mut NightCtx, role: RoleId, ty: AbilityResultType) {
    for seat in live_seats_in_seat_order(players) {
        let idx = seat_index(players, seat).unwrap();
        if players[idx].role().id != role {
            continue;
        }
        let Some(target) = players[idx].today().visit else { continue };
        let resolved = resolve_redirect(players, ctx, target);
        if let Some(tidx) = seat_index(players, resolved) {
            players[tidx].today_mut().visited_by.insert(seat);
            if role == RoleId::Arsonist {
                players[tidx].oiled = true;
            }
        }
        ctx.results.push(AbilityResult::simple(ty, resolved).by(seat.0.to_string()));
    }
}

/// Doctor/WitchDoctor heal: pushes onto the target's heal stack (spec.md
/// §4.4 contract 3).
fn resolve_healing(players: &mut [Player], ctx: &mut NightCtx) {
    for seat in live_seats_in_seat_order(players) {
        let idx = seat_index(players, seat).unwrap();
        if !players[idx].role().has(Capability::Healing) {
            continue;
        }
        let Some(target) = players[idx].today().visit else { continue };
        let resolved = resolve_redirect(players, ctx, target);
        if ctx.blocked.contains_key(&seat) {
            continue;
        }
        if let Some(tidx) = seat_index(players, resolved) {
            players[tidx].heal_stack.push(seat);
            players[tidx].today_mut().healed_by.push(seat);
        }
        ctx.results.push(AbilityResult::simple(AbilityResultType::Healed, resolved).by(seat.0.to_string()));
    }
}

/// Bodyguard pushes onto the target's bodyguard stack and marks the target
/// temporarily non-convertible (spec.md §4.4 contract 4).
fn resolve_bodyguarding(players: &mut [Player], ctx: &mut NightCtx) {
    for seat in live_seats_in_seat_order(players) {
        let idx = seat_index(players, seat).unwrap();
        if !players[idx].role().has(Capability::Threatening) {
            continue;
        }
        let Some(target) = players[idx].today().visit else { continue };
        let resolved = resolve_redirect(players, ctx, target);
        if ctx.blocked.contains_key(&seat) {
            continue;
        }
        if let Some(tidx) = seat_index(players, resolved) {
            players[tidx].bodyguard_stack.push(seat);
            players[tidx].today_mut().bodyguarded_by.push(seat);
            players[tidx].role_mut().convertable = false;
        }
        ctx.results.push(AbilityResult::simple(AbilityResultType::Bodyguarded, resolved).by(seat.0.to_string()));
    }
}

/// Self/untargeted actions: Veteran alert, Jailor/Kidnapper/Interrogator
/// execute, Arsonist ignite is handled in `SecondaryKill`.
fn resolve_act(players: &mut [Player], ctx: &mut NightCtx, day: usize) {
    for seat in live_seats_in_seat_order(players) {
        let idx = seat_index(players, seat).unwrap();
        let role = players[idx].role().id;

        // SerialKiller has no ActiveOnly/ActiveAndVisiting capability of its
        // own; its jailbreak-retaliation check still runs every night it
        // doesn't land a normal visit.
        if role == RoleId::SerialKiller && players[idx].today().visit.is_none() {
            action_when_inactive(players, ctx, seat, role, day);
        }

        if !players[idx].role().has(Capability::ActiveOnly) && !players[idx].role().has(Capability::ActiveAndVisiting) {
            continue;
        }
        if !players[idx].today().active {
            if players[idx].role().has(Capability::ActiveAndVisiting) {
                action_when_inactive(players, ctx, seat, role, day);
            }
            continue;
        }
        ctx.results.push(AbilityResult::simple(AbilityResultType::Act, seat).by(seat.0.to_string()));

        if role == RoleId::Veteran {
            let offense = players[idx].role().descriptor().offense;
            let visitors: Vec<PlayerSeat> = live_seats_in_seat_order(players)
                .into_iter()
                .filter(|&v| v != seat && players[seat_index(players, v).unwrap()].today().visit == Some(seat))
                .collect();
            for visitor in visitors {
                apply_attack(players, ctx, seat, visitor, offense, Cause::Killed(RoleId::Veteran), "Veteran");
            }
        }

        if matches!(role, RoleId::Jailor | RoleId::Kidnapper | RoleId::Interrogator) {
            resolve_jail_execute(players, ctx, seat, role);
        }
    }
}

/// Jailor/Kidnapper/Interrogator execute their jailed target unconditionally,
/// bypassing defense and healing entirely (`original_source/roles.py:762-809`
/// `Jailing.act`, `offense_level = Level.ABSOLUTE` on the shared mixin).
fn resolve_jail_execute(players: &mut [Player], ctx: &mut NightCtx, jailor: PlayerSeat, role: RoleId) {
    let Some(target) = players.iter().find(|p| p.jailed_by == Some(jailor)).map(|p| p.seat) else { return };
    let Some(target_idx) = seat_index(players, target) else { return };
    if !players[target_idx].is_alive() {
        return;
    }
    players[target_idx].kill(Cause::Killed(role));
    ctx.results.push(AbilityResult::simple(AbilityResultType::Killed, target).by_public(format!("{role:?}")));
}

/// SerialKiller jailbreak kill: if jailed and the jailor hasn't already
/// executed tonight, the SerialKiller kills the jailor instead of whoever it
/// visited; failing that, it retaliates against a blocker
/// (`original_source/roles.py:1715-1750` `SerialKiller.action_when_inactive`).
fn action_when_inactive(players: &mut [Player], ctx: &mut NightCtx, seat: PlayerSeat, role: RoleId, _day: usize) {
    if role == RoleId::SerialKiller {
        let idx = seat_index(players, seat).unwrap();
        if let Some(jailor_seat) = players[idx].jailed_by {
            let jailor_idx = seat_index(players, jailor_seat);
            let jailor_already_acted = jailor_idx.is_some_and(|i| players[i].today().active);
            if jailor_already_acted {
                return;
            }
            apply_attack(players, ctx, seat, jailor_seat, OffenseLevel::Absolute, Cause::Killed(RoleId::SerialKiller), "SerialKiller");
            return;
        }
        if let Some(&blocker) = ctx.blocked.get(&seat) {
            apply_attack(players, ctx, seat, blocker, OffenseLevel::Basic, Cause::Killed(RoleId::SerialKiller), "SerialKiller");
        }
    }
}

/// Resolves an attacker's offense against all live targets this night,
/// walking bodyguard interception then heal cancellation (spec.md §4.4
/// contracts 3 and 4).
fn resolve_attacks(players: &mut [Player], ctx: &mut NightCtx) {
    for seat in live_seats_in_seat_order(players) {
        let idx = seat_index(players, seat).unwrap();
        if !players[idx].role().has(Capability::KillingVisiting) {
            continue;
        }
        if ctx.blocked.contains_key(&seat) {
            respond_to_block(players, ctx, seat);
            continue;
        }
        let offense = players[idx].role().descriptor().offense;
        let attacker_role = players[idx].role().id;
        let public_cause: Arc<str> = Arc::from(format!("{attacker_role:?}"));
        let Some(target) = players[idx].today().visit else { continue };
        let resolved = resolve_redirect(players, ctx, target);
        apply_attack(players, ctx, seat, resolved, offense, Cause::Killed(attacker_role), &public_cause);
    }
}

fn respond_to_block(players: &mut [Player], ctx: &mut NightCtx, seat: PlayerSeat) {
    let idx = seat_index(players, seat).unwrap();
    if matches!(players[idx].role().id, RoleId::SerialKiller | RoleId::Arsonist) {
        ctx.results.push(AbilityResult::simple(AbilityResultType::Blocked, seat).by("retaliation pending"));
    }
}

/// Applies one attack, honoring bodyguard interception/recursion and the
/// heal stack, then jail/witch redirection already resolved upstream
/// (spec.md §4.4 contracts 3 and 4).
fn apply_attack(players: &mut [Player], ctx: &mut NightCtx, attacker: PlayerSeat, target: PlayerSeat, offense: OffenseLevel, cause: Cause, public_cause: &str) {
    let Some(target_idx) = seat_index(players, target) else { return };

    if target == attacker {
        kill_or_heal(players, ctx, target, offense, cause, public_cause);
        return;
    }

    if let Some(bg_seat) = players[target_idx].bodyguard_stack.pop() {
        players[target_idx].today_mut().bodyguarded_by.retain(|s| *s != bg_seat);
        ctx.results.push(AbilityResult::simple(AbilityResultType::Bodyguarded, target).by(bg_seat.0.to_string()));
        if let Some(bg_idx) = seat_index(players, bg_seat) {
            players[bg_idx].kill(Cause::Killed(RoleId::Bodyguard));
            ctx.results.push(AbilityResult::simple(AbilityResultType::Killed, bg_seat).by("duty"));
        }
        apply_attack(players, ctx, target, attacker, OffenseLevel::Strong, Cause::Killed(RoleId::Bodyguard), "Bodyguard");
        return;
    }

    kill_or_heal(players, ctx, target, offense, cause, public_cause);
}

/// A jailed target's defense is raised to at least `Basic` for the night
/// against any attacker other than its own jailor, who bypasses this
/// entirely via `resolve_jail_execute` (`original_source/roles.py:762-809`
/// `Jailing.jail`, `_target_defense_level_before_jailed` save/restore —
/// simplified here since `jailed_by` is cleared every `begin_day`).
fn kill_or_heal(players: &mut [Player], ctx: &mut NightCtx, target: PlayerSeat, offense: OffenseLevel, cause: Cause, public_cause: &str) {
    let Some(target_idx) = seat_index(players, target) else { return };
    let mut defense = players[target_idx].role().descriptor().defense;
    if players[target_idx].jailed_by.is_some() {
        defense = defense.max(OffenseLevel::Basic);
    }
    if offense <= defense {
        ctx.results.push(AbilityResult::simple(AbilityResultType::AlmostDied, target).by_public(public_cause.to_string()));
        return;
    }
    let healable = players[target_idx].role().descriptor().healable;
    if healable {
        if let Some(healer) = players[target_idx].heal_stack.pop() {
            ctx.results.push(AbilityResult::simple(AbilityResultType::Healed, target).by(healer.0.to_string()));
            return;
        }
    }
    players[target_idx].kill(cause);
    ctx.results.push(
        AbilityResult::simple(AbilityResultType::Killed, target)
            .by_public(public_cause.to_string()),
    );
}

/// MasonLeader/Godfather/DragonHead kill via `second_task`, and Arsonist's
/// ignite (spec.md §4.4 "appear twice").
fn resolve_secondary_kill(players: &mut [Player], ctx: &mut NightCtx) {
    for seat in live_seats_in_seat_order(players) {
        let idx = seat_index(players, seat).unwrap();
        let role = players[idx].role().id;
        if role != RoleId::Arsonist || !players[idx].role().has(Capability::SecondTask) {
            continue;
        }
        for other in live_seats_in_seat_order(players) {
            if other == seat {
                continue;
            }
            if ctx.blocked.get(&other) == Some(&seat) || players[idx].today().visit == Some(other) {
                apply_attack(players, ctx, seat, other, OffenseLevel::Absolute, Cause::Killed(RoleId::Arsonist), "Arsonist");
            }
        }
    }
}

/// Jester-triggered, leaver, and Counsel-goal-failed suicides resolve in the
/// single SUICIDE slot, still subject to heal (spec.md §4.4 contract 10).
fn resolve_suicide(players: &mut [Player], ctx: &mut NightCtx) {
    for seat in live_seats_in_seat_order(players) {
        let idx = seat_index(players, seat).unwrap();
        if !players[idx].leaver && !players[idx].suicide_queued {
            continue;
        }
        kill_or_heal(players, ctx, seat, OffenseLevel::Absolute, Cause::Suicide, "leaver");
    }
}

/// Janitor/IncenseMaster erase the target's identity from any reveal that
/// follows this night's death (spec.md §4.4 priority list).
fn resolve_sanitizing(players: &mut [Player], ctx: &mut NightCtx) {
    for seat in live_seats_in_seat_order(players) {
        let idx = seat_index(players, seat).unwrap();
        if !players[idx].role().has(Capability::Sanitizing) {
            continue;
        }
        let Some(target) = players[idx].today().visit else { continue };
        let resolved = resolve_redirect(players, ctx, target);
        if let Some(tidx) = seat_index(players, resolved) {
            if !players[tidx].is_alive() {
                players[tidx].dead_sanitized = true;
            }
        }
        ctx.results.push(AbilityResult::simple(AbilityResultType::Visit, resolved).by(seat.0.to_string()));
    }
}

/// Picks the one investigative capability each role resolves through, most
/// specific first, so a role declaring more than one (e.g. Lookout's
/// `Investigating`+`Watching`) fires exactly once per night.
fn most_specific_investigating_cap(role: &RoleInstance) -> Option<Capability> {
    if role.has(Capability::Watching) {
        Some(Capability::Watching)
    } else if role.has(Capability::Following) {
        Some(Capability::Following)
    } else if role.has(Capability::IdentityInvestigating) {
        Some(Capability::IdentityInvestigating)
    } else if role.has(Capability::Investigating) {
        Some(Capability::Investigating)
    } else {
        None
    }
}

/// Sheriff-style suspicious-category read: a category name, or "Not
/// Suspicious" (`original_source/roles.py:1027-1034` `Sheriff.investigate`),
/// distinct from Investigator/Consigliere's exact-role read.
fn resolve_category_investigating(players: &mut [Player], ctx: &mut NightCtx) {
    for seat in live_seats_in_seat_order(players) {
        let idx = seat_index(players, seat).unwrap();
        if most_specific_investigating_cap(players[idx].role()) != Some(Capability::Investigating) {
            continue;
        }
        let Some(target) = players[idx].today().visit else { continue };
        let resolved = resolve_redirect(players, ctx, target);
        let Some(tidx) = seat_index(players, resolved) else { continue };

        let immune = players[tidx].role().descriptor().detection_immune;
        let apparent_role = players[tidx].frame.role.unwrap_or(players[tidx].role().id);
        let category = if immune { "Not Suspicious" } else { suspicious_category(apparent_role) };

        ctx.results.push(
            AbilityResult::simple(AbilityResultType::Notified, seat)
                .by(resolved.0.to_string())
                .into_result_text(category),
        );
    }
}

fn suspicious_category(role: RoleId) -> &'static str {
    let d = crate::roles::catalog::descriptor(role);
    match d.team {
        shadowtown_types::Team::Mafia => "Mafia",
        shadowtown_types::Team::Triad => "Triad",
        shadowtown_types::Team::Cult => "Cult",
        _ if role == RoleId::SerialKiller => "Serial Killer",
        _ if role == RoleId::MassMurderer => "Mass Murderer",
        _ if role == RoleId::Arsonist => "Arsonist",
        _ => "Not Suspicious",
    }
}

/// Investigator/Consigliere/Administrator/Agent/Counsel's exact-role read,
/// honoring Framing overwrite and detection immunity (spec.md §4.4 contracts
/// 7 and 8).
fn resolve_identity_investigating(players: &mut [Player], ctx: &mut NightCtx) {
    for seat in live_seats_in_seat_order(players) {
        let idx = seat_index(players, seat).unwrap();
        if most_specific_investigating_cap(players[idx].role()) != Some(Capability::IdentityInvestigating) {
            continue;
        }
        let Some(target) = players[idx].today().visit else { continue };
        let resolved = resolve_redirect(players, ctx, target);
        let Some(tidx) = seat_index(players, resolved) else { continue };

        let immune = players[tidx].role().descriptor().detection_immune;
        let framed_role = players[tidx].frame.role;
        let apparent_role = if immune {
            RoleId::Citizen
        } else {
            framed_role.unwrap_or(players[tidx].role().id)
        };

        ctx.results.push(
            AbilityResult::simple(AbilityResultType::Notified, seat)
                .by(resolved.0.to_string())
                .into_result(apparent_role),
        );
    }
}

/// Detective's deep read: the target's own visit (or none, if immune) plus
/// whether it acted (`original_source/roles.py:654-757` `Following.investigate`).
fn resolve_following(players: &mut [Player], ctx: &mut NightCtx) {
    for seat in live_seats_in_seat_order(players) {
        let idx = seat_index(players, seat).unwrap();
        if most_specific_investigating_cap(players[idx].role()) != Some(Capability::Following) {
            continue;
        }
        let Some(target) = players[idx].today().visit else { continue };
        let resolved = resolve_redirect(players, ctx, target);
        let Some(tidx) = seat_index(players, resolved) else { continue };

        let immune = players[tidx].role().descriptor().detection_immune;
        let visits = if immune { None } else { players[tidx].today().visit };
        let active = players[tidx].today().active;

        ctx.results.push(
            AbilityResult::simple(AbilityResultType::Notified, seat)
                .by(resolved.0.to_string())
                .into_result_text(format!("visits={visits:?},act={active}")),
        );
    }
}

/// Lookout's deep read: the set of living, non-immune visitors to the
/// target (`original_source/roles.py:654-757` `Watching.investigate`).
fn resolve_watching(players: &mut [Player], ctx: &mut NightCtx) {
    for seat in live_seats_in_seat_order(players) {
        let idx = seat_index(players, seat).unwrap();
        if most_specific_investigating_cap(players[idx].role()) != Some(Capability::Watching) {
            continue;
        }
        let Some(target) = players[idx].today().visit else { continue };
        let resolved = resolve_redirect(players, ctx, target);
        let Some(tidx) = seat_index(players, resolved) else { continue };

        let mut visitors: Vec<PlayerSeat> = players[tidx]
            .today()
            .visited_by
            .iter()
            .filter(|&&v| v != seat)
            .filter(|&&v| seat_index(players, v).is_some_and(|i| players[i].is_alive() && !players[i].role().descriptor().detection_immune))
            .copied()
            .collect();
        visitors.sort();

        ctx.results.push(
            AbilityResult::simple(AbilityResultType::Notified, seat)
                .by(resolved.0.to_string())
                .into_result_text(format!("{visitors:?}")),
        );
    }
}

impl AbilityResult {
    fn into_result(mut self, role: RoleId) -> Self {
        self.result = Some(Arc::from(format!("{role:?}")));
        self
    }
}

/// Cultist/MasonLeader-recruit/boss-recruit conversion, gated by the
/// target's `convertable` flag (spec.md §4.4 contract 9).
fn resolve_recruit(players: &mut [Player], ctx: &mut NightCtx) {
    for seat in live_seats_in_seat_order(players) {
        let idx = seat_index(players, seat).unwrap();
        let role = players[idx].role().id;
        let converting_now = players[idx].role().has(Capability::Converting)
            && (players[idx].role().has(Capability::SecondTask) == matches!(role, RoleId::Godfather | RoleId::DragonHead | RoleId::MasonLeader | RoleId::WitchDoctor));
        if !converting_now {
            continue;
        }
        let Some(target) = players[idx].today().visit else { continue };
        let Some(target_idx) = seat_index(players, target) else { continue };
        if !players[target_idx].role().convertable {
            continue;
        }
        let new_role = match role {
            RoleId::Godfather => RoleId::Mafioso,
            RoleId::DragonHead => RoleId::Enforcer,
            RoleId::MasonLeader => RoleId::Mason,
            RoleId::WitchDoctor => RoleId::WitchDoctor,
            RoleId::Cultist => RoleId::Cultist,
            _ => continue,
        };
        ctx.pending_convert.push((target, RoleInstance::new(new_role, Default::default())));
        ctx.results.push(
            AbilityResult::simple(AbilityResultType::Converted, target)
                .by(seat.0.to_string())
                .into_result_role(new_role),
        );
    }
}

impl AbilityResult {
    fn into_result_role(mut self, role: RoleId) -> Self {
        self.into = Some(role);
        self
    }
}

/// Amnesiac's self-conversion: remembers a dead role from `goal_target`
/// (spec.md §4.4 priority list, "Amnesiac").
fn resolve_amnesiac(players: &mut [Player], ctx: &mut NightCtx) {
    for seat in live_seats_in_seat_order(players) {
        let idx = seat_index(players, seat).unwrap();
        if players[idx].role().id != RoleId::Amnesiac || !players[idx].role().has(Capability::SelfConverting) {
            continue;
        }
        let Some(role_id) = players[idx].role().constraint("remember").and_then(decode_remembered_role) else { continue };
        ctx.pending_convert.push((seat, RoleInstance::new(role_id, Default::default())));
        ctx.results.push(AbilityResult::simple(AbilityResultType::Converted, seat).into_result_role(role_id));
    }
}

/// The `/remember` command writes a dead role's debug name into the
/// Amnesiac's `remember` constraint; this decodes it back.
fn decode_remembered_role(name: &str) -> Option<RoleId> {
    crate::roles::catalog::TABLE
        .iter()
        .find(|d| format!("{:?}", d.id) == name)
        .map(|d| d.id)
}

/// Blackmailer/Silencer: the target cannot speak next day (spec.md §4.4
/// priority list, last slot).
fn resolve_blackmail_silence(players: &mut [Player], ctx: &mut NightCtx) {
    for seat in live_seats_in_seat_order(players) {
        let idx = seat_index(players, seat).unwrap();
        if !matches!(players[idx].role().id, RoleId::Blackmailer | RoleId::Silencer) {
            continue;
        }
        let Some(target) = players[idx].today().visit else { continue };
        let Some(target_idx) = seat_index(players, target) else { continue };
        players[target_idx].blackmailed_on_day = Some(players[target_idx].day_count());
        ctx.results.push(AbilityResult::simple(AbilityResultType::Notified, target).by(seat.0.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn player(seat: u8, role: RoleId) -> Player {
        Player::new(
            PlayerSeat(seat),
            shadowtown_types::SessionId(seat as usize),
            Arc::from("p"),
            RoleInstance::new(role, HashMap::new()),
        )
    }

    #[test]
    fn doctor_heal_cancels_basic_kill() {
        let mut players = vec![player(1, RoleId::Doctor), player(2, RoleId::Mafioso)];
        players[0].today_mut().visit = Some(PlayerSeat(2));
        players[1].today_mut().visit = Some(PlayerSeat(2));
        let _ = resolve_night(&mut players, 1);
        assert!(players[1].is_alive());
    }

    #[test]
    fn unhealed_mafioso_kill_is_lethal() {
        let mut players = vec![player(1, RoleId::Mafioso), player(2, RoleId::Citizen)];
        players[0].today_mut().visit = Some(PlayerSeat(2));
        let _ = resolve_night(&mut players, 1);
        assert!(!players[1].is_alive());
    }

    #[test]
    fn bodyguard_intercepts_and_dies_instead_of_target() {
        let mut players = vec![player(1, RoleId::Mafioso), player(2, RoleId::Citizen), player(3, RoleId::Bodyguard)];
        players[0].today_mut().visit = Some(PlayerSeat(2));
        players[2].today_mut().visit = Some(PlayerSeat(2));
        let _ = resolve_night(&mut players, 1);
        assert!(players[1].is_alive());
        assert!(!players[2].is_alive());
    }

    #[test]
    fn blocked_actor_does_not_land_a_kill() {
        let mut players = vec![player(1, RoleId::Mafioso), player(2, RoleId::Citizen), player(3, RoleId::Escort)];
        players[0].today_mut().visit = Some(PlayerSeat(2));
        players[2].today_mut().visit = Some(PlayerSeat(1));
        let _ = resolve_night(&mut players, 1);
        assert!(players[1].is_alive());
    }

    /// Scenario 2 (spec.md §8): an active Veteran kills a Mafioso who visits
    /// him, and survives the encounter himself.
    #[test]
    fn active_veteran_kills_visiting_mafioso_and_survives() {
        let mut players = vec![
            player(1, RoleId::Veteran),
            player(2, RoleId::Citizen),
            player(3, RoleId::Sheriff),
            player(4, RoleId::Mafioso),
            player(5, RoleId::Bodyguard),
        ];
        players[0].today_mut().active = true;
        players[3].today_mut().visit = Some(PlayerSeat(1));
        let _ = resolve_night(&mut players, 1);
        assert!(players[0].is_alive());
        assert!(!players[3].is_alive());
    }

    /// Scenario 4 (spec.md §8): a Witch controls a Vigilante onto himself,
    /// and the self-kill lands.
    #[test]
    fn witch_controls_vigilante_onto_self() {
        let mut players = vec![player(1, RoleId::Witch), player(2, RoleId::Vigilante)];
        players[0].today_mut().visit = Some(PlayerSeat(2));
        players[0].role_mut().constraints.insert(Arc::from("second_target"), Arc::from("2"));
        let _ = resolve_night(&mut players, 1);
        assert!(!players[1].is_alive());
        assert_eq!(players[1].today().visit, Some(PlayerSeat(2)));
    }
}
