//! The per-room phase state machine (spec.md §4.3 "Room engine").
//!
//! One logical task per [`Room`](crate::room::Room): a channel-driven event
//! loop reading client-originated [`SlashCommand`]s off a command channel
//! and ticking its own timers, per spec.md §9 "Cooperative control flow".

use std::collections::HashMap;
use std::sync::Arc;

use rand::rng;
use rand::seq::SliceRandom;
use shadowtown_types::AbilityResultType;
use shadowtown_types::Event;
use shadowtown_types::EventPayload;
use shadowtown_types::Phase;
use shadowtown_types::PlayerSeat;
use shadowtown_types::RoleId;
use shadowtown_types::SessionId;
use shadowtown_types::SlashCommand;
use shadowtown_types::Team;
use shadowtown_types::VoteChoice;
use tokio::sync::mpsc;
use tokio::time::Duration;
use tokio::time::timeout;

use crate::archive::ArchivalSink;
use crate::archive::GameData;
use crate::consts::GAME_OVER_MIN_SURVIVORS;
use crate::consts::Timer;
use crate::consts::death_announce_pause;
use crate::night;
use crate::player::Cause;
use crate::player::Player;
use crate::room::ChatKind;
use crate::room::Room;
use crate::roles::Capability;
use crate::roles::RoleInstance;
use crate::roles::catalog;

/// One client-originated command routed to a room (spec.md §4.2
/// "Dispatch").
pub struct EngineCommand {
    pub session: SessionId,
    pub command: SlashCommand,
}

/// One outbound event bound for a specific session. The engine never talks
/// to a [`crate::session::Sink`] directly — it hands events to the
/// control-plane task over this channel (spec.md §9 "Global state", §5
/// "Shared-resource policy").
pub struct Outbound {
    pub session: SessionId,
    pub event: Event,
}

/// Drives one room's match to completion, then leaves it at `IDLE`
/// (spec.md §4.3 "States and transitions").
pub struct RoomEngine<A: ArchivalSink> {
    pub room: Room,
    commands: mpsc::UnboundedReceiver<EngineCommand>,
    outbox: mpsc::UnboundedSender<Outbound>,
    archival: Arc<A>,
}

impl<A: ArchivalSink> RoomEngine<A> {
    pub fn new(
        room: Room,
        commands: mpsc::UnboundedReceiver<EngineCommand>,
        outbox: mpsc::UnboundedSender<Outbound>,
        archival: Arc<A>,
    ) -> Self {
        Self { room, commands, outbox, archival }
    }

    fn send(&mut self, session: SessionId, payload: EventPayload) {
        self.record(&payload, None, &[session]);
        let _ = self.outbox.send(Outbound { session, event: payload.into() });
    }

    fn broadcast(&mut self, payload: EventPayload) {
        self.record(&payload, None, &self.room.occupants.clone());
        for &session in &self.room.occupants.clone() {
            let _ = self.outbox.send(Outbound { session, event: payload.clone().into() });
        }
    }

    /// Appends a transcript row while the room is in-game (spec.md §4.6
    /// `emit`, §5 ordering guarantee (c): transcript append precedes
    /// client delivery). Lobby-level notices sent while `Phase::Idle`
    /// naturally aren't recorded.
    fn record(&mut self, payload: &EventPayload, from: Option<PlayerSeat>, to_sessions: &[SessionId]) {
        if !self.room.is_in_game() {
            return;
        }
        let to = to_sessions
            .iter()
            .filter_map(|s| self.room.player_by_session(*s).map(|p| p.seat))
            .collect();
        self.room.transcript.record(crate::event::TranscriptRow {
            payload: payload.clone(),
            from,
            to,
            time: std::time::SystemTime::now(),
        });
    }

    #[tracing::instrument(skip(self), fields(room = ?self.room.id, phase = ?phase, elected = ?elected.map(|e| e.0)))]
    fn broadcast_phase(&mut self, phase: Phase, elected: Option<PlayerSeat>) {
        tracing::info!("phase transition");
        self.room.phase = phase;
        self.broadcast(EventPayload::Phase { phase, elected });
        let summary = self.room.summary();
        self.broadcast(EventPayload::RoomStatus {
            room: summary.id,
            occupants: summary.occupants,
            capacity: summary.capacity,
            has_password: summary.has_password,
            phase: summary.phase,
        });
    }

    /// Waits out a named countdown, broadcasting `TIME` at each
    /// announcement point (spec.md §4.3 "Timer discipline"), while still
    /// draining the command channel so in-phase input isn't lost.
    async fn wait_timer(&mut self, timer: Timer) {
        let total = timer.duration(self.room.debug_mode);
        self.wait_duration(total).await;
    }

    async fn wait_duration(&mut self, total: Duration) {
        let deadline = tokio::time::Instant::now() + total;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(remaining) => break,
                cmd = self.commands.recv() => {
                    if let Some(cmd) = cmd {
                        self.handle_command(cmd);
                    } else {
                        break;
                    }
                }
            }
        }
    }

    fn handle_command(&mut self, cmd: EngineCommand) {
        let Some(player) = self.room.player_by_session(cmd.session) else { return };
        let seat = player.seat;
        match cmd.command {
            SlashCommand::Vote { target } => self.cast_vote(seat, target),
            SlashCommand::Skip => self.cast_skip(seat),
            SlashCommand::Guilty => self.cast_trial(seat, VoteChoice::Guilty),
            SlashCommand::Innocent => self.cast_trial(seat, VoteChoice::Innocent),
            SlashCommand::Abstention => self.cast_trial(seat, VoteChoice::Abstention),
            SlashCommand::Visit { primary, secondary } => self.submit_visit(seat, primary, secondary),
            SlashCommand::Act => self.submit_act(seat),
            SlashCommand::Jail { target } => self.submit_jail(seat, target),
            SlashCommand::Suicide => {
                if let Some(p) = self.room.player_by_seat_mut(seat) {
                    p.leaver = true;
                }
            }
            SlashCommand::Nickname { name } => {
                if let Some(p) = self.room.player_by_seat_mut(seat) {
                    p.nickname = name.clone();
                }
                self.send(cmd.session, EventPayload::NicknameConfirmed { nickname: name });
            }
            _ => {}
        }
    }

    #[tracing::instrument(skip(self), fields(room = ?self.room.id, voter = voter.0, target = ?target.map(|t| t.0)))]
    fn cast_vote(&mut self, voter: PlayerSeat, target: Option<PlayerSeat>) {
        let Some(votes) = self.room.player_by_seat(voter).map(|p| p.role().descriptor().votes) else { return };
        if let Some(p) = self.room.player_by_seat_mut(voter) {
            p.voting.voted_to = target;
            p.voting.voted_skip = false;
        }
        self.broadcast(EventPayload::Vote { voter, target });
        let _ = votes;
    }

    fn cast_skip(&mut self, voter: PlayerSeat) {
        if let Some(p) = self.room.player_by_seat_mut(voter) {
            p.voting.voted_skip = true;
            p.voting.voted_to = None;
        }
        self.broadcast(EventPayload::Vote { voter, target: None });
    }

    fn cast_trial(&mut self, voter: PlayerSeat, choice: VoteChoice) {
        if let Some(p) = self.room.player_by_seat_mut(voter) {
            p.voting.trial_choice = Some(choice);
        }
    }

    fn submit_visit(&mut self, actor: PlayerSeat, primary: PlayerSeat, secondary: Option<PlayerSeat>) {
        if let Some(p) = self.room.player_by_seat_mut(actor) {
            if p.jailed_by.is_some() {
                return;
            }
            p.today_mut().visit = Some(primary);
            if p.role().id == RoleId::Witch {
                let value: Arc<str> = Arc::from(secondary.map(|s| s.0.to_string()).unwrap_or_default());
                p.role_mut().constraints.insert(Arc::from("second_target"), value);
            }
        }
    }

    fn submit_act(&mut self, actor: PlayerSeat) {
        if let Some(p) = self.room.player_by_seat_mut(actor) {
            if p.jailed_by.is_some() {
                return;
            }
            p.today_mut().active = true;
        }
    }

    fn submit_jail(&mut self, jailor: PlayerSeat, target: PlayerSeat) {
        self.room.jail_queue.push((jailor, target));
    }

    /// Drives the match from `INITIATING` to `BACK_TO_IDLE` and hands the
    /// now-idle room back to the caller, which puts it back in the
    /// registry (spec.md §4.3 "States and transitions").
    pub async fn run(mut self, formation: Vec<RoleId>) -> Room {
        self.room.phase = Phase::Initiating;
        self.broadcast_phase(Phase::Initiating, None);

        self.broadcast_phase(Phase::NicknameSelection, None);
        self.wait_timer(Timer::NicknameSelection).await;

        self.seat_players(formation);
        self.assign_goal_targets();
        self.broadcast_lineup();
        self.assign_chats();

        loop {
            self.broadcast_phase(Phase::Evening, None);
            self.run_evening_hooks();
            self.wait_timer(Timer::Evening).await;

            self.broadcast_phase(Phase::Night, None);
            let results = night::resolve_night(&mut self.room.players, self.room.day);
            self.emit_ability_results(&results);
            let post_night_pause = if self.room.debug_mode {
                crate::consts::POST_NIGHT_PAUSE_DEBUG
            } else {
                crate::consts::POST_NIGHT_PAUSE_PROD
            };
            self.wait_duration(post_night_pause).await;

            self.room.day += 1;
            for p in &mut self.room.players {
                p.begin_day();
            }

            self.broadcast_phase(Phase::Morning, None);
            self.announce_deaths().await;
            if self.game_over() {
                break;
            }

            self.broadcast_phase(Phase::Discussion, None);
            self.wait_timer(Timer::Discussion).await;

            self.vote_subloop().await;

            self.broadcast_phase(Phase::PostExecution, None);
            self.reveal_executed();
            self.room.executed_today.clear();

            if self.game_over() {
                break;
            }
        }

        self.broadcast_phase(Phase::Finishing, None);
        self.finish_game();

        let game_data = GameData {
            room: self.room.id,
            title: Arc::clone(&self.room.title),
            has_password: self.room.password.is_some(),
            lineup: self.room.players.iter().map(|p| Arc::clone(&p.nickname)).collect(),
            setup: self.room.setup.clone().expect("a match always has a validated setup"),
            transcript: self.room.transcript.rows().to_vec(),
        };
        // The sink's own contract (spec.md §4.6 "Archival failure") is that
        // failures are logged but never propagate back to the match; guard
        // against a misbehaving implementation panicking the room task.
        if let Err(payload) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| self.archival.archive(game_data))) {
            let reason = payload.downcast_ref::<&str>().map(|s| s.to_string()).unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(room = ?self.room.id, reason, "archival sink panicked");
        }

        self.room.reset_for_idle();
        self.broadcast(EventPayload::BackToIdle);
        self.room
    }

    fn seat_players(&mut self, formation: Vec<RoleId>) {
        let mut rng = rng();
        let mut sessions = self.room.occupants.clone();
        if !self.room.debug_mode {
            sessions.shuffle(&mut rng);
        }
        for (i, (session, role)) in sessions.into_iter().zip(formation).enumerate() {
            let seat = PlayerSeat((i + 1) as u8);
            let nickname = Arc::from(format!("p{}", i + 1));
            self.room.players.push(Player::new(seat, session, nickname, RoleInstance::new(role, Default::default())));
            self.send(session, EventPayload::Employed { role });
        }
    }

    /// Picks each Executioner's and Counsel's `goal_target` from the rest of
    /// the lineup (`original_source/roles.py:865-889` `Executioner.set_goal_target`,
    /// `:1090-1123` `Counsel.set_goal_target` — simplified to one target
    /// each rather than the original's weighted/repeated sampling; see
    /// DESIGN.md).
    fn assign_goal_targets(&mut self) {
        let mut rng = rng();
        let seats: Vec<PlayerSeat> = self.room.players.iter().map(|p| p.seat).collect();
        for i in 0..self.room.players.len() {
            let self_seat = self.room.players[i].seat;
            let role = self.room.players[i].role().id;
            let pool: Vec<PlayerSeat> = match role {
                RoleId::Executioner => {
                    let town_only = self.room.players[i].role().constraint("TARGET_IS_TOWN").map(|v| v != "false").unwrap_or(true);
                    seats
                        .iter()
                        .copied()
                        .filter(|&s| s != self_seat)
                        .filter(|&s| !town_only || self.room.player_by_seat(s).is_some_and(|p| p.role().team() == Team::Town))
                        .collect()
                }
                RoleId::Counsel => seats.iter().copied().filter(|&s| s != self_seat).collect(),
                _ => continue,
            };
            if let Some(&target) = pool.choose(&mut rng) {
                self.room.players[i].role_mut().goal_target.insert(target);
            }
        }
    }

    fn broadcast_lineup(&mut self) {
        let seats: Vec<(PlayerSeat, Arc<str>)> = self.room.players.iter().map(|p| (p.seat, Arc::clone(&p.nickname))).collect();
        self.broadcast(EventPayload::Lineup { seats });
    }

    fn assign_chats(&mut self) {
        let assignments: Vec<(PlayerSeat, ChatKind)> = self
            .room
            .players
            .iter()
            .filter_map(|p| chat_for_role(p.role().id).map(|kind| (p.seat, kind)))
            .collect();
        for (seat, kind) in assignments {
            self.room.add_to_chat(kind, seat);
        }
        for kind in [ChatKind::Mafia, ChatKind::Triad, ChatKind::Mason, ChatKind::Cult, ChatKind::Spy] {
            let members = self.room.chat_members(kind).to_vec();
            if members.len() > 1 {
                for &seat in &members {
                    self.send(
                        self.room.player_by_seat(seat).unwrap().session,
                        EventPayload::Teammates { team: kind.win_team().unwrap_or(Team::Town), seats: members.clone() },
                    );
                }
            }
        }
    }

    /// Promotion, Counsel suicide-queueing, jail queue, and informational
    /// emits, in order (spec.md §4.3 "Evening hooks (pre-night)";
    /// `original_source/game.py:1137-1197` `trigger_evening_events`).
    fn run_evening_hooks(&mut self) {
        self.promote_boss_or_intern(ChatKind::Mafia, RoleId::Godfather, RoleId::Mafioso);
        self.promote_boss_or_intern(ChatKind::Triad, RoleId::DragonHead, RoleId::Enforcer);
        self.resolve_counsel_suicides();

        if self.room.executed_today.is_empty() {
            let mut jail_queue = std::mem::take(&mut self.room.jail_queue);
            jail_queue.sort_by_key(|(jailor, _)| jailor.0);
            let mut already_jailed: std::collections::HashSet<PlayerSeat> = std::collections::HashSet::new();
            for (jailor, target) in jail_queue {
                if already_jailed.contains(&target) {
                    continue;
                }
                if let Some(p) = self.room.player_by_seat_mut(target) {
                    p.jailed_by = Some(jailor);
                    already_jailed.insert(target);
                }
            }
        }

        self.emit_evening_informational();
    }

    /// Queues a living Counsel for suicide once its `goal_target` has been
    /// executed and its `IF_FAIL` constraint is `SUICIDE` (the default),
    /// per spec.md §4.3 evening-hook item 3.
    fn resolve_counsel_suicides(&mut self) {
        let executed: std::collections::HashSet<PlayerSeat> = self.room.executed_today.iter().copied().collect();
        for p in &mut self.room.players {
            if p.role().id != RoleId::Counsel || !p.is_alive() {
                continue;
            }
            if !p.role().goal_target.iter().any(|t| executed.contains(t)) {
                continue;
            }
            if p.role().constraint("IF_FAIL").unwrap_or("SUICIDE") == "SUICIDE" {
                p.suicide_queued = true;
            }
        }
    }

    /// Sends Survivors the set of currently-living roles, Amnesiacs the
    /// pool of non-unique dead roles they could remember, and Arsonists the
    /// set of currently-oiled living players (spec.md §4.3 evening-hook item
    /// 5; `original_source/game.py:1137-1197`).
    fn emit_evening_informational(&mut self) {
        let mut remaining_roles: Vec<RoleId> = self.room.living_players().map(|p| p.role().id).collect();
        remaining_roles.sort();
        remaining_roles.dedup();
        let remaining_text: Arc<str> = Arc::from(remaining_roles.iter().map(|r| format!("{r:?}")).collect::<Vec<_>>().join(","));

        let mut dead_pool: Vec<RoleId> = self
            .room
            .players
            .iter()
            .filter(|p| !p.is_alive() && !catalog::descriptor(p.role().id).unique)
            .map(|p| p.role().id)
            .collect();
        dead_pool.sort();
        dead_pool.dedup();
        let pool_text: Arc<str> = Arc::from(dead_pool.iter().map(|r| format!("{r:?}")).collect::<Vec<_>>().join(","));

        let mut oiled_seats: Vec<PlayerSeat> = self.room.living_players().filter(|p| p.oiled).map(|p| p.seat).collect();
        oiled_seats.sort();
        let oiled_text: Arc<str> = Arc::from(oiled_seats.iter().map(|s| s.0.to_string()).collect::<Vec<_>>().join(","));

        let survivor_sessions: Vec<SessionId> =
            self.room.living_players().filter(|p| p.role().id == RoleId::Survivor).map(|p| p.session).collect();
        for session in survivor_sessions {
            self.send(session, EventPayload::AbilityResult { ty: AbilityResultType::Notified, by: None, into: None, result: Some(Arc::clone(&remaining_text)) });
        }

        let amnesiac_sessions: Vec<SessionId> =
            self.room.living_players().filter(|p| p.role().id == RoleId::Amnesiac).map(|p| p.session).collect();
        for session in amnesiac_sessions {
            self.send(session, EventPayload::AbilityResult { ty: AbilityResultType::Notified, by: None, into: None, result: Some(Arc::clone(&pool_text)) });
        }

        let arsonist_sessions: Vec<SessionId> =
            self.room.living_players().filter(|p| p.role().id == RoleId::Arsonist).map(|p| p.session).collect();
        for session in arsonist_sessions {
            self.send(session, EventPayload::AbilityResult { ty: AbilityResultType::Notified, by: None, into: None, result: Some(Arc::clone(&oiled_text)) });
        }
    }

    fn promote_boss_or_intern(&mut self, chat: ChatKind, boss: RoleId, intern: RoleId) {
        let has_boss = self.room.chat_members(chat).iter().any(|s| {
            self.room.player_by_seat(*s).is_some_and(|p| p.is_alive() && p.role().id == boss)
        });
        if has_boss {
            return;
        }
        let promotable = self.room.chat_members(chat).iter().copied().find(|s| {
            self.room.player_by_seat(*s).is_some_and(|p| {
                p.is_alive() && p.role().has(Capability::IdentityInvestigating) && p.role().constraint("PROMOTED").is_some()
            })
        });
        let candidate = promotable.or_else(|| self.room.chat_intern(chat));
        if let Some(seat) = candidate {
            if let Some(p) = self.room.player_by_seat_mut(seat) {
                let constraints = p.role().constraints.clone();
                p.convert(RoleInstance::new(boss, constraints));
            }
            let _ = intern;
        }
    }

    fn emit_ability_results(&mut self, results: &[night::AbilityResult]) {
        for result in results {
            let Some(session) = self.room.player_by_seat(result.subject).map(|p| p.session) else { continue };
            self.send(
                session,
                EventPayload::AbilityResult {
                    ty: result.ty,
                    by: result.by_public.clone().or_else(|| result.by.clone()),
                    into: result.into,
                    result: result.result.clone(),
                },
            );
        }
    }

    async fn announce_deaths(&mut self) {
        let freshly_dead: Vec<PlayerSeat> = self
            .room
            .players
            .iter()
            .filter(|p| !p.is_alive() && !p.announced_dead)
            .map(|p| p.seat)
            .collect();
        for seat in &freshly_dead {
            self.broadcast(EventPayload::Dead { seat: *seat });
            if let Some(p) = self.room.player_by_seat(*seat) {
                if !p.dead_sanitized {
                    let role = p.role_history.first().map(|r| r.id).unwrap_or(p.role().id);
                    self.broadcast(EventPayload::IdentityReveal {
                        seat: *seat,
                        role,
                        cause_of_death: p.cause_of_death.iter().map(|c| Arc::from(format!("{c:?}"))).collect(),
                    });
                }
            }
            if let Some(p) = self.room.player_by_seat_mut(*seat) {
                p.announced_dead = true;
            }
            self.wait_duration(death_announce_pause(self.room.debug_mode)).await;
        }
    }

    /// Runs the vote sub-loop (spec.md §4.3 main loop, "vote subloop").
    async fn vote_subloop(&mut self) {
        let marshall_quota = self
            .room
            .living_players()
            .find(|p| p.role().id == RoleId::Marshall)
            .and_then(|p| p.role().constraint("QUOTA_PER_LYNCH").and_then(|v| v.parse::<usize>().ok()));
        let in_lynch = marshall_quota.is_some();

        loop {
            self.reset_voting_state();
            self.broadcast_phase(Phase::Vote, None);
            let remaining = Timer::Vote.duration(self.room.debug_mode);

            let elected = match timeout(remaining, self.wait_for_election()).await {
                Ok(Some(seat)) => seat,
                Ok(None) | Err(_) => break,
            };

            self.broadcast_phase(Phase::Election, Some(elected));
            self.wait_timer(Timer::Election).await;

            let hang = if in_lynch {
                true
            } else {
                self.broadcast_phase(Phase::Defense, None);
                self.wait_timer(Timer::Defense).await;
                self.broadcast_phase(Phase::VoteExecution, None);
                self.wait_timer(Timer::VoteExecution).await;
                let sum = self.tally_trial();
                if sum > 0 {
                    self.broadcast(EventPayload::VoteExecutionResult { totals: self.trial_totals() });
                    self.broadcast_phase(Phase::LastWords, None);
                    self.wait_timer(Timer::LastWords).await;
                }
                sum > 0
            };

            if hang {
                self.hang(elected);
                let quota_reached = marshall_quota.map(|q| self.room.executed_today.len() >= q).unwrap_or(true);
                if !in_lynch || quota_reached {
                    break;
                }
            } else {
                break;
            }
        }
    }

    fn reset_voting_state(&mut self) {
        for p in &mut self.room.players {
            p.voting = Default::default();
        }
    }

    /// Waits for the election signal: either `skip_votes` or some target's
    /// `voted_count` exceeds half the remaining ballots (spec.md §4.3
    /// "Voting rules"). Drains commands while waiting.
    async fn wait_for_election(&mut self) -> Option<PlayerSeat> {
        loop {
            let Some(cmd) = self.commands.recv().await else { return None };
            self.handle_command(cmd);

            let total_ballots: u32 = self.room.living_players().map(|p| p.role().descriptor().votes).sum();
            let skip_votes: u32 = self
                .room
                .living_players()
                .filter(|p| p.voting.voted_skip)
                .map(|p| p.role().descriptor().votes)
                .sum();
            if skip_votes > total_ballots / 2 {
                return None;
            }

            let mut totals: HashMap<PlayerSeat, u32> = HashMap::new();
            for p in self.room.living_players() {
                if let Some(target) = p.voting.voted_to {
                    *totals.entry(target).or_default() += p.role().descriptor().votes;
                }
            }
            if let Some((&seat, _)) = totals.iter().max_by_key(|(_, count)| **count) {
                if *totals.get(&seat).unwrap() > total_ballots / 2 {
                    return Some(seat);
                }
            }
        }
    }

    fn tally_trial(&self) -> i32 {
        self.room
            .living_players()
            .filter_map(|p| p.voting.trial_choice.map(|c| c.sign() * p.role().descriptor().votes as i32))
            .sum()
    }

    fn trial_totals(&self) -> HashMap<PlayerSeat, i32> {
        self.room
            .living_players()
            .filter_map(|p| p.voting.trial_choice.map(|c| (p.seat, c.sign() * p.role().descriptor().votes as i32)))
            .collect()
    }

    fn hang(&mut self, seat: PlayerSeat) {
        if let Some(p) = self.room.player_by_seat_mut(seat) {
            p.kill(Cause::Democracy);
        }
        self.room.executed_today.push(seat);
    }

    fn reveal_executed(&mut self) {
        let seats = self.room.executed_today.clone();
        for seat in seats {
            if let Some(p) = self.room.player_by_seat(seat) {
                let role = p.role().id;
                self.broadcast(EventPayload::IdentityReveal { seat, role, cause_of_death: vec![Arc::from("DEMOCRACY")] });
            }
        }
    }

    /// Sequential, independent priority checks mirroring
    /// `original_source/game.py:1086-1111` `game_over()` exactly: whichever
    /// bucket (Town > Mafia > Triad > Cult > neutral-killing) is non-empty
    /// first decides the outcome; later buckets are never inspected once an
    /// earlier one matches.
    fn game_over(&self) -> bool {
        let living: Vec<&Player> = self.room.living_players().collect();
        if living.len() < GAME_OVER_MIN_SURVIVORS {
            return true;
        }
        let town = living.iter().any(|p| p.role().team() == Team::Town);
        let mafia = living.iter().any(|p| p.role().team() == Team::Mafia);
        let triad = living.iter().any(|p| p.role().team() == Team::Triad);
        let cult = living.iter().any(|p| p.role().team() == Team::Cult);
        let neutral_evil = living.iter().any(|p| p.role().team() == Team::NeutralEvil);
        let nk_roles: std::collections::HashSet<RoleId> =
            living.iter().filter(|p| p.role().team() == Team::NeutralKilling).map(|p| p.role().id).collect();

        if town {
            return !mafia && !triad && !cult && !neutral_evil && nk_roles.is_empty();
        }
        if mafia {
            return !triad && !cult && nk_roles.is_empty();
        }
        if triad {
            return !cult && nk_roles.is_empty();
        }
        if cult {
            return nk_roles.is_empty();
        }
        if !nk_roles.is_empty() {
            return nk_roles.len() < 3;
        }
        true
    }

    /// Assigns winners per spec.md §4.3.finish "Winner assignment
    /// (finish_game)"; translated from `original_source/game.py:986-1060`
    /// `finish_game()`.
    fn finish_game(&mut self) {
        let living: Vec<&Player> = self.room.living_players().collect();
        let citizen_tie = living.len() == 2 && living.iter().any(|p| p.role().id == RoleId::Citizen);

        const NK_PRIORITY: [RoleId; 3] = [RoleId::Arsonist, RoleId::SerialKiller, RoleId::MassMurderer];
        const TEAM_PRIORITY: [Team; 4] = [Team::Triad, Team::Mafia, Team::Cult, Team::Town];

        let mut main_winner: Option<Team> = None;
        let mut nk_role_winner: Option<RoleId> = None;

        if citizen_tie {
            main_winner = Some(Team::Town);
        } else if let Some(role) = NK_PRIORITY.into_iter().find(|&r| living.iter().any(|p| p.role().id == r)) {
            main_winner = Some(Team::NeutralKilling);
            nk_role_winner = Some(role);
        } else if let Some(team) = TEAM_PRIORITY.into_iter().find(|&t| living.iter().any(|p| p.role().team() == t)) {
            main_winner = Some(team);
        }

        let mut winners = Vec::new();
        for p in &self.room.players {
            let is_team_winner = if let Some(role) = nk_role_winner {
                p.is_alive() && p.role().id == role
            } else {
                main_winner.is_some_and(|team| p.role().team() == team)
            };
            let is_neutral_evil_winner = p.is_alive()
                && matches!(
                    p.role().id,
                    RoleId::Judge | RoleId::Witch | RoleId::Jester | RoleId::Executioner | RoleId::Scumbag | RoleId::Auditor
                );
            let is_benign_winner = p.is_alive() && matches!(p.role().id, RoleId::Survivor | RoleId::Amnesiac);
            if is_team_winner || is_neutral_evil_winner || is_benign_winner {
                winners.push((p.seat, p.role().id));
            }
        }

        // Executioner wins posthumously relative to its goal_target: the
        // Executioner itself must be alive, and the target must have been
        // lynched (game.py:1053-1057).
        for p in &self.room.players {
            if p.role().id != RoleId::Executioner || !p.is_alive() {
                continue;
            }
            let Some(&goal_seat) = p.role().goal_target.iter().next() else { continue };
            let target_was_lynched = self
                .room
                .players
                .iter()
                .any(|q| q.seat == goal_seat && q.cause_of_death.contains(&Cause::Democracy));
            if target_was_lynched && !winners.iter().any(|&(s, _)| s == p.seat) {
                winners.push((p.seat, p.role().id));
            }
        }

        self.broadcast(EventPayload::Finish { main_winner, winners });
    }
}

fn chat_for_role(role: RoleId) -> Option<ChatKind> {
    match catalog::descriptor(role).team {
        Team::Mafia => Some(ChatKind::Mafia),
        Team::Triad => Some(ChatKind::Triad),
        Team::Cult => Some(ChatKind::Cult),
        _ if role == RoleId::Mason || role == RoleId::MasonLeader => Some(ChatKind::Mason),
        _ if role == RoleId::Spy => Some(ChatKind::Spy),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::RecordingArchivalSink;
    use shadowtown_types::RoomId;

    fn marshall_room(quota: &str) -> Room {
        let mut room = Room::new(RoomId(1), Arc::from("room"), SessionId(1), None, true);
        room.occupants = (1..=8u8).map(|i| SessionId(i as usize)).collect();
        room.phase = Phase::Night;
        for i in 1..=8u8 {
            let (role, constraints) = if i == 1 {
                (RoleId::Marshall, HashMap::from([(Arc::from("QUOTA_PER_LYNCH"), Arc::from(quota))]))
            } else {
                (RoleId::Citizen, HashMap::new())
            };
            room.players.push(Player::new(
                PlayerSeat(i),
                SessionId(i as usize),
                Arc::from(format!("p{i}")),
                RoleInstance::new(role, constraints),
            ));
        }
        room
    }

    /// Scenario 5 (spec.md §8): a Marshall's two-lynch quota hangs two
    /// players in one vote sub-loop, skipping DEFENSE/VOTE_EXECUTION for
    /// both.
    #[tokio::test(start_paused = true)]
    async fn marshall_quota_hangs_two_in_one_subloop() {
        let room = marshall_room("2");
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (out_tx, _out_rx) = mpsc::unbounded_channel();
        let archival = Arc::new(RecordingArchivalSink::new());
        let mut engine = RoomEngine::new(room, cmd_rx, out_tx, archival);

        for voter in [2u8, 3, 4, 5, 6] {
            cmd_tx
                .send(EngineCommand {
                    session: SessionId(voter as usize),
                    command: SlashCommand::Vote { target: Some(PlayerSeat(7)) },
                })
                .unwrap();
        }
        for voter in [1u8, 2, 3, 5, 6] {
            cmd_tx
                .send(EngineCommand {
                    session: SessionId(voter as usize),
                    command: SlashCommand::Vote { target: Some(PlayerSeat(4)) },
                })
                .unwrap();
        }

        engine.vote_subloop().await;

        assert_eq!(engine.room.executed_today.len(), 2);
        assert!(engine.room.executed_today.contains(&PlayerSeat(7)));
        assert!(engine.room.executed_today.contains(&PlayerSeat(4)));
    }

    /// P8/P10: a minimal all-Town match runs `INITIATING` through
    /// `BACK_TO_IDLE` with every in-game emit mirrored in the transcript,
    /// ending the loop at the first single-team check after night one.
    #[tokio::test(start_paused = true)]
    async fn minimal_match_reaches_back_to_idle_with_recorded_transcript() {
        let room = Room::new(RoomId(1), Arc::from("room"), SessionId(1), None, true);
        let (_cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let archival = Arc::new(RecordingArchivalSink::new());
        let mut engine = RoomEngine::new(room, cmd_rx, out_tx, archival.clone());
        engine.room.occupants = (1..=5u8).map(|i| SessionId(i as usize)).collect();
        engine.room.setup = Some(
            crate::setup::Setup::validate(crate::setup::RawSetup {
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
            .unwrap(),
        );

        let formation = vec![RoleId::Citizen, RoleId::Citizen, RoleId::Citizen, RoleId::Citizen, RoleId::Citizen];
        let idle_room = engine.run(formation).await;

        assert_eq!(idle_room.phase, Phase::Idle);
        assert!(idle_room.players.is_empty());
        assert_eq!(archival.count(), 1);
        assert!(!archival.take()[0].transcript.is_empty());

        let mut saw_phase_event = false;
        while let Ok(out) = out_rx.try_recv() {
            if matches!(out.event.payload, EventPayload::Phase { .. }) {
                saw_phase_event = true;
            }
        }
        assert!(saw_phase_event);
    }
}
