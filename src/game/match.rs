//! Match reducer and the client frame loop

use std::time::Instant;

use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::app::session::{ActionError, LocalAction, Role};
use crate::app::state::ClientState;
use crate::console::ConsoleCommand;
use crate::util::time::frame_duration;
use crate::ws::handler::NetEvent;
use crate::ws::protocol::{ClientMsg, Score, ServerMsg, Team};

use super::latency::LatencyGrade;
use super::prediction::PredictionSystem;
use super::reconcile::Reconciler;
use super::view::{EntityView, FrameView, Notice, Renderer};

/// What a handler wants done outside the state: messages to send and
/// notifications to show
#[derive(Debug, Default, PartialEq)]
pub struct Effects {
    pub outbound: Vec<ClientMsg>,
    pub notices: Vec<Notice>,
}

impl Effects {
    fn send(&mut self, msg: ClientMsg) {
        self.outbound.push(msg);
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    fn rejected(err: ActionError) -> Self {
        Self {
            outbound: Vec::new(),
            notices: vec![Notice::Error(err.to_string())],
        }
    }
}

fn team_label(team: Team) -> String {
    team.as_str().to_uppercase()
}

fn score_line(score: &Score) -> String {
    format!("{} - {}", score.red, score.blue)
}

/// Apply one transport event to the state
pub fn apply_event(state: &mut ClientState, event: NetEvent, now: Instant) -> Effects {
    let mut effects = Effects::default();

    match event {
        NetEvent::Connected => {
            state.session.connected = true;
            effects.notify(Notice::Info("Connected to server".to_string()));
            effects.outbound.extend(state.session.join_messages());
        }
        NetEvent::Disconnected { reason } => {
            // No resync: keep whatever we had on screen
            state.session.connected = false;
            warn!(reason = %reason, "Disconnected from server");
            effects.notify(Notice::Error(format!("Disconnected from server: {}", reason)));
        }
        NetEvent::Message(msg) => apply_server_msg(state, msg, now, &mut effects),
    }

    effects
}

fn apply_server_msg(state: &mut ClientState, msg: ServerMsg, now: Instant, effects: &mut Effects) {
    match msg {
        ServerMsg::JoinedGame { player_id } => {
            info!(player_id = %player_id, "Identity assigned");
            state.session.player_id = Some(player_id);
        }

        ServerMsg::RoomCreated { room_id } => {
            info!(room_id = %room_id, "Room created");
            state.session.room = Some(room_id.clone());
            state.session.role = Role::Host;
            effects.notify(Notice::Info(format!("Room created: {}", room_id)));
        }

        ServerMsg::RoomJoined {
            room_id,
            players,
            teams,
            is_host,
        } => {
            info!(room_id = %room_id, players = players.len(), is_host, "Joined room");
            state.session.room = Some(room_id.clone());
            state.session.role = Role::from_is_host(is_host);
            state.session.teams = teams;
            state
                .world
                .load_players(&players, state.session.player_id.as_deref());
            effects.notify(Notice::Info(format!("Joined room {}", room_id)));
        }

        ServerMsg::RosterChanged {
            players,
            teams,
            joined_name,
        } => {
            let local_id = state.session.player_id.as_deref();
            if let Some(players) = &players {
                state.world.refresh_roster(players, local_id);
            }
            if let Some(local) = state.world.local.as_mut() {
                if let Some(team) = teams.team_of(&local.id) {
                    local.team = team;
                }
            }
            for remote in state.world.remotes.values_mut() {
                if let Some(team) = teams.team_of(&remote.id) {
                    remote.team = team;
                }
            }
            state.session.teams = teams;
            if let Some(name) = joined_name {
                effects.notify(Notice::system(format!("{} joined the room", name)));
            }
        }

        ServerMsg::PlayerLeft { player_id } => {
            let name = state
                .world
                .remove(&player_id)
                .or_else(|| state.session.teams.name_of(&player_id).map(str::to_string))
                .unwrap_or_else(|| player_id.clone());
            state.session.teams.remove(&player_id);
            debug!(player_id = %player_id, "Player left");
            effects.notify(Notice::system(format!("{} left the room", name)));
        }

        ServerMsg::HostChanged { host_id } => {
            let is_us = state.session.player_id.as_deref() == Some(host_id.as_str());
            state.session.role = Role::from_is_host(is_us);
            if is_us {
                info!("Promoted to host");
                effects.notify(Notice::Info("You are now the host".to_string()));
            }
        }

        ServerMsg::SettingsUpdated {
            starting_team,
            duration,
        } => {
            state.session.settings.starting_team = starting_team;
            state.session.settings.duration = duration;
        }

        ServerMsg::MatchStarted {
            ball,
            players,
            score,
            kickoff_team,
        } => {
            state
                .world
                .load_players(&players, state.session.player_id.as_deref());
            state.world.ball = Some(ball);
            state.world.score = score;
            state.game_active = true;
            state.sampler.reset();
            state.latency.reset();
            state.snapshot_stats.reset();

            // Without a kickoff team from the server the countdown stays silent
            state.kickoff.begin(kickoff_team, now);
            info!(players = players.len(), kickoff_team = ?kickoff_team, "Match started");

            effects.send(state.geometry.to_msg());
            effects.notify(Notice::system(
                "Game started! Use WASD or arrow keys to move. SPACE to shoot.",
            ));
        }

        ServerMsg::StateSnapshot {
            players,
            ball,
            score,
        } => {
            if !state.game_active {
                trace!("Snapshot outside a match discarded");
                return;
            }
            if let Some(rtt) = state.latency.on_snapshot(now) {
                trace!(rtt_ms = rtt.as_millis() as u64, "Latency sample");
            }
            let report = Reconciler::apply(&mut state.world, &players, ball, score);
            state.snapshot_stats.record(report);
            if let Some(local) = &state.world.local {
                trace!(error = local.prediction_error(), "Prediction error");
            }
        }

        ServerMsg::GoalScored {
            team,
            scorer_id,
            score,
        } => {
            if !state.game_active {
                debug!("Goal outside a match discarded");
                return;
            }
            state.world.score = score;
            state.kickoff.begin(team.opponent(), now);

            let scorer = scorer_id
                .as_deref()
                .and_then(|id| state.world.name_of(id))
                .map(str::to_string);
            info!(team = %team, scorer = ?scorer, red = score.red, blue = score.blue, "Goal");

            let text = match scorer {
                Some(name) => format!(
                    "GOAL! {} scored for {} team! ({})",
                    name,
                    team_label(team),
                    score_line(&score)
                ),
                None => format!("GOAL for {} team! ({})", team_label(team), score_line(&score)),
            };
            effects.notify(Notice::system(text));
        }

        ServerMsg::KickoffComplete => {
            if !state.kickoff.confirm_live() {
                debug!(phase = ?state.kickoff.phase(), "Unexpected kickoff-complete ignored");
                return;
            }
            if let Some(team) = state.kickoff.team() {
                effects.notify(Notice::system(format!(
                    "Ball ready to play! Only {} team can touch the ball.",
                    team_label(team)
                )));
            }
        }

        ServerMsg::RestrictionLifted => {
            if !state.kickoff.lift_restriction() {
                debug!(phase = ?state.kickoff.phase(), "Unexpected restriction-lifted ignored");
                return;
            }
            effects.notify(Notice::system("Ball in play!"));
        }

        ServerMsg::MatchEnded { score } => {
            state.world.score = score;
            state.game_active = false;
            state.kickoff.stop();
            state.keys.clear();

            let stats = &state.snapshot_stats;
            info!(
                red = score.red,
                blue = score.blue,
                snapshots = stats.total_snapshots,
                ignored_entries = stats.ignored_entries,
                avg_players = stats.avg_players_per_snapshot,
                latency_samples = state.latency.sample_count(),
                "Match ended"
            );

            let text = match score.leader() {
                Some(team) => format!(
                    "Game over! {} team wins {}!",
                    team_label(team),
                    score_line(&score)
                ),
                None => format!("Game over! It's a draw {}!", score_line(&score)),
            };
            effects.notify(Notice::system(text));
        }

        ServerMsg::ChatMessage { sender, text } => {
            effects.notify(Notice::Chat { sender, text });
        }

        ServerMsg::Error { message } => {
            warn!(message = %message, "Server error");
            effects.notify(Notice::Error(message));
        }
    }
}

/// Validate and plan a local action. Rejected actions leave the state alone
/// and send nothing.
pub fn apply_action(state: &mut ClientState, action: LocalAction) -> Effects {
    if !state.session.connected {
        return Effects::rejected(ActionError::NotConnected);
    }

    let outbound = match state.session.plan(&action) {
        Ok(msgs) => msgs,
        Err(e) => {
            debug!(action = ?action, error = %e, "Action rejected");
            return Effects::rejected(e);
        }
    };

    let mut effects = Effects::default();
    match action {
        LocalAction::Chat(_) if !state.chat_limiter.check() => {
            return Effects::rejected(ActionError::ChatRateLimited);
        }
        LocalAction::UpdateSettings(settings) => {
            state.session.settings = settings;
        }
        LocalAction::LeaveMatch => {
            state.reset_for_menu();
            effects.notify(Notice::Info("Left the room".to_string()));
        }
        _ => {}
    }

    effects.outbound = outbound;
    effects
}

/// One fixed-rate frame: sample intent, predict, drive the countdown clock.
/// Does nothing outside a match.
pub fn frame(state: &mut ClientState, now: Instant) -> Effects {
    let mut effects = Effects::default();
    if !state.game_active {
        return effects;
    }

    let playing = state
        .world
        .local
        .as_ref()
        .is_some_and(|local| local.team.is_playing());

    if playing && state.session.connected {
        if let Some(intent) = state.sampler.sample(&state.keys) {
            effects.send(ClientMsg::PlayerInput(intent));
            state.latency.record_emission(now);
        }
    }

    if let Some(local) = state.world.local.as_mut() {
        // Predict with what the server was told, not what is held right now
        PredictionSystem::step(local, &state.sampler.last_sent());
    }

    if state.kickoff.poll_elapsed(now, state.session.role) {
        info!(team = ?state.kickoff.team(), "Countdown elapsed, notifying server");
        effects.send(ClientMsg::CountdownElapsed);
    }

    effects
}

/// Everything the renderer needs for this instant. Spectators are not drawn.
pub fn frame_view(state: &ClientState, now: Instant) -> FrameView {
    let mut entities: Vec<EntityView> = state
        .world
        .remotes
        .values()
        .filter(|r| r.team.is_playing())
        .map(|r| EntityView {
            id: r.id.clone(),
            name: r.name.clone(),
            team: r.team,
            x: r.x,
            y: r.y,
            vx: r.vx,
            vy: r.vy,
            radius: r.radius,
            is_local: false,
        })
        .collect();

    if let Some(local) = state.world.local.as_ref().filter(|l| l.team.is_playing()) {
        entities.push(EntityView {
            id: local.id.clone(),
            name: local.name.clone(),
            team: local.team,
            x: local.x,
            y: local.y,
            vx: local.vx,
            vy: local.vy,
            radius: local.radius,
            is_local: true,
        });
    }
    entities.sort_by(|a, b| a.id.cmp(&b.id));

    let latency_ms = state.latency.latest_millis();
    FrameView {
        entities,
        ball: state.world.ball,
        score: state.world.score,
        kickoff: state.kickoff.view(now),
        latency_ms,
        latency_grade: latency_ms.map(LatencyGrade::from_millis),
        shooting: state.keys.intent().shoot,
    }
}

/// Owns the client state and multiplexes frames, network and console
pub struct GameClient<R: Renderer> {
    state: ClientState,
    events: mpsc::Receiver<NetEvent>,
    outbound: mpsc::Sender<ClientMsg>,
    commands: mpsc::Receiver<ConsoleCommand>,
    renderer: R,
}

impl<R: Renderer> GameClient<R> {
    pub fn new(
        state: ClientState,
        events: mpsc::Receiver<NetEvent>,
        outbound: mpsc::Sender<ClientMsg>,
        commands: mpsc::Receiver<ConsoleCommand>,
        renderer: R,
    ) -> Self {
        Self {
            state,
            events,
            outbound,
            commands,
            renderer,
        }
    }

    /// Run until the transport closes or the user quits. Returns the final
    /// state.
    pub async fn run(mut self) -> ClientState {
        let mut frame_interval = interval(frame_duration());
        frame_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut console_open = true;

        loop {
            tokio::select! {
                // Frame, then network, then console
                biased;

                _ = frame_interval.tick() => {
                    let now = Instant::now();
                    let effects = frame(&mut self.state, now);
                    self.dispatch(effects).await;
                    if self.state.game_active {
                        let view = frame_view(&self.state, now);
                        self.renderer.draw(&view);
                    }
                }

                event = self.events.recv() => match event {
                    Some(event) => {
                        let effects = apply_event(&mut self.state, event, Instant::now());
                        self.dispatch(effects).await;
                    }
                    None => {
                        info!("Transport closed");
                        break;
                    }
                },

                command = self.commands.recv(), if console_open => match command {
                    Some(ConsoleCommand::Quit) => {
                        self.quit().await;
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        debug!("Console closed");
                        console_open = false;
                    }
                },
            }
        }

        self.state
    }

    async fn handle_command(&mut self, command: ConsoleCommand) {
        match command {
            ConsoleCommand::Press(code) => self.state.keys.press(&code),
            ConsoleCommand::Release(code) => self.state.keys.release(&code),
            ConsoleCommand::Action(action) => {
                let effects = apply_action(&mut self.state, action);
                self.dispatch(effects).await;
            }
            ConsoleCommand::Quit => self.quit().await,
        }
    }

    /// Leave the room politely if we are in one
    async fn quit(&mut self) {
        info!("Quitting");
        if self.state.session.connected && self.state.session.in_room() {
            self.send(ClientMsg::LeaveMatch).await;
        }
    }

    async fn dispatch(&mut self, effects: Effects) {
        for notice in &effects.notices {
            self.renderer.notify(notice);
        }
        for msg in effects.outbound {
            self.send(msg).await;
        }
    }

    async fn send(&mut self, msg: ClientMsg) {
        let kind = msg.kind();
        if self.outbound.send(msg).await.is_err() {
            warn!(kind, "Outbound channel closed, message dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::session::{JoinTarget, MatchSettings, Session};
    use crate::app::state::FieldGeometry;
    use crate::game::kickoff::KickoffPhase;
    use crate::ws::protocol::{BallState, InputIntent, PlayerInfo, PlayerSnapshot};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn player(id: &str, team: Team, x: f32, y: f32) -> PlayerInfo {
        PlayerInfo {
            id: id.to_string(),
            name: id.to_uppercase(),
            team,
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            radius: 15.0,
        }
    }

    fn ball() -> BallState {
        BallState {
            x: 600.0,
            y: 360.0,
            vx: 0.0,
            vy: 0.0,
            radius: 10.0,
        }
    }

    fn state_in_room(role: Role) -> ClientState {
        let mut session = Session::new("Me", JoinTarget::Create, MatchSettings::default());
        session.connected = true;
        session.player_id = Some("me".to_string());
        session.room = Some("ROOM".to_string());
        session.role = role;
        ClientState::new(session, FieldGeometry::default())
    }

    fn msg(state: &mut ClientState, msg: ServerMsg, now: Instant) -> Effects {
        apply_event(state, NetEvent::Message(msg), now)
    }

    fn start_match(state: &mut ClientState, kickoff_team: Option<Team>, now: Instant) -> Effects {
        let players = HashMap::from([
            ("me".to_string(), player("me", Team::Red, 100.0, 100.0)),
            ("bo".to_string(), player("bo", Team::Blue, 900.0, 300.0)),
        ]);
        msg(
            state,
            ServerMsg::MatchStarted {
                ball: ball(),
                players,
                score: Score::default(),
                kickoff_team,
            },
            now,
        )
    }

    fn count_elapsed(effects: &Effects) -> usize {
        effects
            .outbound
            .iter()
            .filter(|m| **m == ClientMsg::CountdownElapsed)
            .count()
    }

    fn run_frames(state: &mut ClientState, from: Instant, until_ms: u64) -> usize {
        let mut sent = 0;
        let mut t = 0;
        while t <= until_ms {
            sent += count_elapsed(&frame(state, from + Duration::from_millis(t)));
            t += 16;
        }
        sent
    }

    #[test]
    fn test_connect_sends_join_messages() {
        let mut state = state_in_room(Role::Guest);
        state.session.connected = false;
        let effects = apply_event(&mut state, NetEvent::Connected, Instant::now());
        assert!(state.session.connected);
        assert_eq!(
            effects.outbound,
            vec![
                ClientMsg::JoinWithName { name: "Me".into() },
                ClientMsg::CreateRoom
            ]
        );
    }

    #[test]
    fn test_match_start_sends_geometry_and_counts_down() {
        let mut state = state_in_room(Role::Host);
        let t0 = Instant::now();
        let effects = start_match(&mut state, Some(Team::Red), t0);

        assert!(state.game_active);
        assert!(matches!(
            effects.outbound.as_slice(),
            [ClientMsg::DisplayGeometry { .. }]
        ));
        assert_eq!(state.kickoff.phase(), KickoffPhase::CountdownRunning);
        assert_eq!(frame_view(&state, t0).kickoff.text, Some("3"));
        assert_eq!(
            frame_view(&state, t0 + Duration::from_millis(3500)).kickoff.text,
            Some("GO!")
        );
    }

    #[test]
    fn test_host_notifies_countdown_once() {
        let mut state = state_in_room(Role::Host);
        let t0 = Instant::now();
        start_match(&mut state, Some(Team::Red), t0);

        assert_eq!(run_frames(&mut state, t0, 3984), 0);
        assert_eq!(run_frames(&mut state, t0, 8000), 1);
        assert_eq!(run_frames(&mut state, t0, 12000), 0);
    }

    #[test]
    fn test_guest_never_notifies_countdown() {
        let mut state = state_in_room(Role::Guest);
        let t0 = Instant::now();
        start_match(&mut state, Some(Team::Red), t0);
        assert_eq!(run_frames(&mut state, t0, 6000), 0);
    }

    #[test]
    fn test_missing_kickoff_team_stays_silent() {
        let mut state = state_in_room(Role::Host);
        state.session.settings.starting_team = Team::Blue;
        let t0 = Instant::now();
        start_match(&mut state, None, t0);

        assert_eq!(state.kickoff.team(), None);
        assert_eq!(frame_view(&state, t0).kickoff.text, None);
        assert_eq!(run_frames(&mut state, t0, 4100), 0);
    }

    #[test]
    fn test_goal_flips_kickoff_and_rearms_notice() {
        let mut state = state_in_room(Role::Host);
        let t0 = Instant::now();
        start_match(&mut state, Some(Team::Red), t0);
        assert_eq!(run_frames(&mut state, t0, 4100), 1);

        msg(&mut state, ServerMsg::KickoffComplete, t0 + Duration::from_millis(4200));
        msg(&mut state, ServerMsg::RestrictionLifted, t0 + Duration::from_millis(5000));
        assert_eq!(state.kickoff.phase(), KickoffPhase::LiveFree);

        let t1 = t0 + Duration::from_secs(20);
        let effects = msg(
            &mut state,
            ServerMsg::GoalScored {
                team: Team::Red,
                scorer_id: Some("me".into()),
                score: Score { red: 1, blue: 0 },
            },
            t1,
        );
        assert_eq!(state.kickoff.phase(), KickoffPhase::CountdownRunning);
        assert_eq!(state.kickoff.team(), Some(Team::Blue));
        assert_eq!(state.world.score, Score { red: 1, blue: 0 });
        assert_eq!(
            effects.notices,
            vec![Notice::system("GOAL! ME scored for RED team! (1 - 0)")]
        );

        assert_eq!(run_frames(&mut state, t1, 4100), 1);
    }

    #[test]
    fn test_kickoff_complete_out_of_order_is_ignored() {
        let mut state = state_in_room(Role::Guest);
        let effects = msg(&mut state, ServerMsg::RestrictionLifted, Instant::now());
        assert!(effects.notices.is_empty());
        assert_eq!(state.kickoff.phase(), KickoffPhase::Inactive);

        let t0 = Instant::now();
        start_match(&mut state, Some(Team::Red), t0);
        msg(&mut state, ServerMsg::RestrictionLifted, t0);
        assert_eq!(state.kickoff.phase(), KickoffPhase::CountdownRunning);

        let effects = msg(&mut state, ServerMsg::KickoffComplete, t0);
        assert_eq!(state.kickoff.phase(), KickoffPhase::LiveRestricted);
        assert_eq!(
            effects.notices,
            vec![Notice::system(
                "Ball ready to play! Only RED team can touch the ball."
            )]
        );
    }

    #[test]
    fn test_snapshot_keeps_predicted_local_position() {
        let mut state = state_in_room(Role::Guest);
        let t0 = Instant::now();
        start_match(&mut state, Some(Team::Red), t0);

        let players = HashMap::from([
            ("me".to_string(), PlayerSnapshot { x: 140.0, y: 100.0, vx: 1.0, vy: 0.0 }),
            ("bo".to_string(), PlayerSnapshot { x: 880.0, y: 310.0, vx: 0.0, vy: 0.0 }),
            ("ghost".to_string(), PlayerSnapshot { x: 1.0, y: 1.0, vx: 0.0, vy: 0.0 }),
        ]);
        msg(
            &mut state,
            ServerMsg::StateSnapshot {
                players,
                ball: ball(),
                score: Score::default(),
            },
            t0,
        );

        let local = state.world.local.as_ref().unwrap();
        assert_eq!((local.x, local.y), (100.0, 100.0));
        assert_eq!((local.server_x, local.server_y), (140.0, 100.0));
        assert_eq!(state.world.remotes["bo"].x, 880.0);
        assert_eq!(state.snapshot_stats.ignored_entries, 1);

        // Prediction then pulls the displayed position toward the target
        frame(&mut state, t0);
        let local = state.world.local.as_ref().unwrap();
        assert!(local.x > 100.0 && local.x < 140.0);
    }

    fn local_snapshot(x: f32) -> ServerMsg {
        ServerMsg::StateSnapshot {
            players: HashMap::from([
                ("me".to_string(), PlayerSnapshot { x, y: 100.0, vx: 0.0, vy: 0.0 }),
                ("bo".to_string(), PlayerSnapshot { x: 900.0, y: 300.0, vx: 0.0, vy: 0.0 }),
            ]),
            ball: ball(),
            score: Score::default(),
        }
    }

    #[test]
    fn test_frame_and_snapshot_order_independent() {
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_millis(50);

        let mut snapshot_first = state_in_room(Role::Guest);
        let mut frame_first = state_in_room(Role::Guest);
        for state in [&mut snapshot_first, &mut frame_first] {
            start_match(state, Some(Team::Red), t0);
            frame(state, t0);
            msg(state, local_snapshot(100.0), t0 + Duration::from_millis(10));
            state.keys.press("KeyD");
        }

        msg(&mut snapshot_first, local_snapshot(140.0), t1);
        let a = frame(&mut snapshot_first, t1);

        let b = frame(&mut frame_first, t1);
        msg(&mut frame_first, local_snapshot(140.0), t1);

        assert_eq!(a.outbound, b.outbound);

        // A trailing snapshot confirms whatever is still pending
        let t2 = t1 + Duration::from_millis(30);
        for state in [&mut snapshot_first, &mut frame_first] {
            msg(state, local_snapshot(140.0), t2);

            let local = state.world.local.as_ref().unwrap();
            assert_eq!((local.server_x, local.server_y), (140.0, 100.0));
            // Convex blend of the stepped position and an authoritative target
            assert!(local.x >= 100.0 && local.x <= 140.0, "x = {}", local.x);
            assert!((local.y - 100.0).abs() < 1e-4);

            // One sample per emission: initial intent and the key press
            assert_eq!(state.latency.sample_count(), 2);
        }
    }

    #[test]
    fn test_prediction_uses_sent_intent() {
        let mut state = state_in_room(Role::Guest);
        let t0 = Instant::now();
        start_match(&mut state, Some(Team::Red), t0);

        // Held but never sent: the server does not know, so neither do we
        state.session.connected = false;
        state.keys.press("KeyD");
        assert!(frame(&mut state, t0).outbound.is_empty());
        assert!((state.world.local.as_ref().unwrap().x - 100.0).abs() < 1e-4);

        state.session.connected = true;
        let sent = frame(&mut state, t0);
        assert_eq!(state.sampler.last_sent(), state.keys.intent());
        assert!(matches!(
            sent.outbound.as_slice(),
            [ClientMsg::PlayerInput(InputIntent { right: true, .. })]
        ));
        assert!(state.world.local.as_ref().unwrap().x > 100.0);
    }

    #[test]
    fn test_snapshot_after_match_end_discarded() {
        let mut state = state_in_room(Role::Guest);
        let t0 = Instant::now();
        start_match(&mut state, Some(Team::Red), t0);
        msg(
            &mut state,
            ServerMsg::MatchEnded {
                score: Score { red: 2, blue: 1 },
            },
            t0,
        );
        assert!(!state.game_active);
        assert_eq!(state.kickoff.phase(), KickoffPhase::Inactive);

        msg(
            &mut state,
            ServerMsg::StateSnapshot {
                players: HashMap::new(),
                ball: BallState { x: 1.0, ..ball() },
                score: Score { red: 9, blue: 9 },
            },
            t0,
        );
        assert_eq!(state.world.score, Score { red: 2, blue: 1 });
        assert!(frame(&mut state, t0).outbound.is_empty());
    }

    #[test]
    fn test_input_emitted_on_change_and_latency_measured() {
        let mut state = state_in_room(Role::Guest);
        let t0 = Instant::now();
        start_match(&mut state, Some(Team::Red), t0);

        // First frame of a match always emits
        let first = frame(&mut state, t0);
        assert_eq!(
            first.outbound,
            vec![ClientMsg::PlayerInput(InputIntent::default())]
        );
        assert!(frame(&mut state, t0).outbound.is_empty());

        state.keys.press("KeyD");
        let moved = frame(&mut state, t0 + Duration::from_millis(16));
        assert!(matches!(
            moved.outbound.as_slice(),
            [ClientMsg::PlayerInput(InputIntent { right: true, .. })]
        ));

        msg(
            &mut state,
            ServerMsg::StateSnapshot {
                players: HashMap::new(),
                ball: ball(),
                score: Score::default(),
            },
            t0 + Duration::from_millis(86),
        );
        let view = frame_view(&state, t0);
        assert_eq!(view.latency_ms, Some(70));
        assert_eq!(view.latency_grade, Some(LatencyGrade::Good));
    }

    #[test]
    fn test_spectator_sends_no_input() {
        let mut state = state_in_room(Role::Guest);
        let t0 = Instant::now();
        start_match(&mut state, Some(Team::Red), t0);
        if let Some(local) = state.world.local.as_mut() {
            local.team = Team::Spectator;
        }
        state.keys.press("KeyW");
        assert!(frame(&mut state, t0).outbound.is_empty());
        assert!(frame_view(&state, t0).entities.iter().all(|e| !e.is_local));
    }

    #[test]
    fn test_guest_start_rejected_without_sending() {
        let mut state = state_in_room(Role::Guest);
        let effects = apply_action(&mut state, LocalAction::StartMatch);
        assert!(effects.outbound.is_empty());
        assert_eq!(
            effects.notices,
            vec![Notice::Error("Only the host can start the game".into())]
        );
    }

    #[test]
    fn test_actions_need_connection() {
        let mut state = state_in_room(Role::Host);
        state.session.connected = false;
        let effects = apply_action(&mut state, LocalAction::StartMatch);
        assert!(effects.outbound.is_empty());
        assert_eq!(effects.notices.len(), 1);
    }

    #[test]
    fn test_leave_resets_to_menu() {
        let mut state = state_in_room(Role::Host);
        start_match(&mut state, Some(Team::Red), Instant::now());
        let effects = apply_action(&mut state, LocalAction::LeaveMatch);
        assert_eq!(effects.outbound, vec![ClientMsg::LeaveMatch]);
        assert!(!state.session.in_room());
        assert!(!state.game_active);
        assert!(state.world.local.is_none());
        assert_eq!(state.session.player_id.as_deref(), Some("me"));
    }

    #[test]
    fn test_disconnect_keeps_state() {
        let mut state = state_in_room(Role::Host);
        start_match(&mut state, Some(Team::Red), Instant::now());
        let effects = apply_event(
            &mut state,
            NetEvent::Disconnected {
                reason: "connection lost".into(),
            },
            Instant::now(),
        );
        assert!(!state.session.connected);
        assert!(state.game_active);
        assert!(state.world.local.is_some());
        assert!(matches!(effects.notices.as_slice(), [Notice::Error(_)]));
    }

    #[test]
    fn test_host_changed_promotes() {
        let mut state = state_in_room(Role::Guest);
        let effects = msg(
            &mut state,
            ServerMsg::HostChanged {
                host_id: "me".into(),
            },
            Instant::now(),
        );
        assert!(state.session.is_host());
        assert_eq!(
            effects.notices,
            vec![Notice::Info("You are now the host".into())]
        );
    }

    #[test]
    fn test_match_end_announces_result() {
        let mut state = state_in_room(Role::Guest);
        start_match(&mut state, Some(Team::Red), Instant::now());
        let effects = msg(
            &mut state,
            ServerMsg::MatchEnded {
                score: Score { red: 1, blue: 3 },
            },
            Instant::now(),
        );
        assert_eq!(
            effects.notices,
            vec![Notice::system("Game over! BLUE team wins 1 - 3!")]
        );
    }

    #[derive(Default, Clone)]
    struct RecordingRenderer {
        notices: Arc<Mutex<Vec<Notice>>>,
    }

    impl Renderer for RecordingRenderer {
        fn draw(&mut self, _frame: &FrameView) {}

        fn notify(&mut self, notice: &Notice) {
            self.notices.lock().unwrap().push(notice.clone());
        }
    }

    #[test]
    fn test_client_loop_joins_and_stops_on_close() {
        tokio_test::block_on(async {
            let (event_tx, event_rx) = mpsc::channel(16);
            let (out_tx, mut out_rx) = mpsc::channel(16);
            let (_cmd_tx, cmd_rx) = mpsc::channel(16);

            let session = Session::new("Me", JoinTarget::Code("ABCD".into()), MatchSettings::default());
            let state = ClientState::new(session, FieldGeometry::default());

            event_tx.send(NetEvent::Connected).await.unwrap();
            event_tx
                .send(NetEvent::Message(ServerMsg::JoinedGame {
                    player_id: "me".into(),
                }))
                .await
                .unwrap();
            drop(event_tx);

            let renderer = RecordingRenderer::default();
            let client = GameClient::new(state, event_rx, out_tx, cmd_rx, renderer.clone());
            let state = client.run().await;

            assert_eq!(state.session.player_id.as_deref(), Some("me"));
            assert_eq!(
                renderer.notices.lock().unwrap().as_slice(),
                &[Notice::Info("Connected to server".into())]
            );
            assert_eq!(
                out_rx.recv().await,
                Some(ClientMsg::JoinWithName { name: "Me".into() })
            );
            assert_eq!(
                out_rx.recv().await,
                Some(ClientMsg::JoinRoom { code: "ABCD".into() })
            );
        });
    }

    #[test]
    fn test_client_loop_quit_leaves_room() {
        tokio_test::block_on(async {
            let (event_tx, event_rx) = mpsc::channel(16);
            let (out_tx, mut out_rx) = mpsc::channel(16);
            let (cmd_tx, cmd_rx) = mpsc::channel(16);

            let mut state = state_in_room(Role::Guest);
            state.session.connected = false;

            event_tx.send(NetEvent::Connected).await.unwrap();
            cmd_tx.send(ConsoleCommand::Quit).await.unwrap();

            let client = GameClient::new(state, event_rx, out_tx, cmd_rx, RecordingRenderer::default());
            let _state = client.run().await;
            drop(event_tx);

            let mut sent = Vec::new();
            while let Ok(msg) = out_rx.try_recv() {
                sent.push(msg);
            }
            assert_eq!(sent.last(), Some(&ClientMsg::LeaveMatch));
        });
    }
}
