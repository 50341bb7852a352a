//! Kickoff state machine: countdown, restricted restart, free play
//!
//! The authority drives every phase change except the countdown itself,
//! which is timed locally. When the countdown runs out the host tells the
//! authority once; all clients then wait for `kickoff-complete` before
//! showing the restricted phase.

use std::time::{Duration, Instant};

use crate::app::session::Role;
use crate::ws::protocol::Team;

/// Full countdown ritual
pub const COUNTDOWN_TOTAL: Duration = Duration::from_millis(4000);
/// Length of each of the "3", "2", "1", "GO!" phases
pub const COUNTDOWN_STEP: Duration = Duration::from_millis(1000);

const COUNTDOWN_TEXT: [&str; 4] = ["3", "2", "1", "GO!"];

/// Kickoff phase without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KickoffPhase {
    Inactive,
    CountdownRunning,
    LiveRestricted,
    LiveFree,
}

/// Countdown-elapsed notice latch, one per countdown episode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElapsedNotice {
    Armed,
    Sent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum KickoffState {
    Inactive,
    CountdownRunning {
        team: Option<Team>,
        started_at: Instant,
        notice: ElapsedNotice,
    },
    LiveRestricted {
        team: Option<Team>,
    },
    LiveFree,
}

/// What the renderer needs about the kickoff at one instant
#[derive(Debug, Clone, PartialEq)]
pub struct KickoffView {
    pub phase: KickoffPhase,
    /// "3", "2", "1" or "GO!" while counting down
    pub text: Option<&'static str>,
    pub team: Option<Team>,
}

/// Text shown for a given elapsed time; `None` once the countdown is over.
pub fn countdown_text(elapsed: Duration) -> Option<&'static str> {
    if elapsed >= COUNTDOWN_TOTAL {
        return None;
    }
    let step = (elapsed.as_millis() / COUNTDOWN_STEP.as_millis()) as usize;
    COUNTDOWN_TEXT.get(step).copied()
}

#[derive(Debug, Clone)]
pub struct Kickoff {
    state: KickoffState,
}

impl Kickoff {
    pub fn new() -> Self {
        Self {
            state: KickoffState::Inactive,
        }
    }

    pub fn phase(&self) -> KickoffPhase {
        match self.state {
            KickoffState::Inactive => KickoffPhase::Inactive,
            KickoffState::CountdownRunning { .. } => KickoffPhase::CountdownRunning,
            KickoffState::LiveRestricted { .. } => KickoffPhase::LiveRestricted,
            KickoffState::LiveFree => KickoffPhase::LiveFree,
        }
    }

    pub fn team(&self) -> Option<Team> {
        match self.state {
            KickoffState::CountdownRunning { team, .. } | KickoffState::LiveRestricted { team } => {
                team
            }
            _ => None,
        }
    }

    /// Enter a fresh countdown episode (match start or goal). Valid from any
    /// phase; the start instant is taken at entry and the notice re-armed.
    pub fn begin(&mut self, team: Option<Team>, now: Instant) {
        self.state = KickoffState::CountdownRunning {
            team: team.filter(|t| t.is_playing()),
            started_at: now,
            notice: ElapsedNotice::Armed,
        };
    }

    /// Authority confirmed the countdown. Only valid while counting down.
    pub fn confirm_live(&mut self) -> bool {
        match self.state {
            KickoffState::CountdownRunning { team, .. } => {
                self.state = KickoffState::LiveRestricted { team };
                true
            }
            _ => false,
        }
    }

    /// Authority lifted the kickoff restriction. Only valid while restricted.
    pub fn lift_restriction(&mut self) -> bool {
        match self.state {
            KickoffState::LiveRestricted { .. } => {
                self.state = KickoffState::LiveFree;
                true
            }
            _ => false,
        }
    }

    /// Match over
    pub fn stop(&mut self) {
        self.state = KickoffState::Inactive;
    }

    /// Drive the countdown clock. Returns true exactly once per episode, for
    /// the host only, when the countdown has run out and a kickoff team is
    /// known; the caller then notifies the authority.
    pub fn poll_elapsed(&mut self, now: Instant, role: Role) -> bool {
        if let KickoffState::CountdownRunning {
            team: Some(_),
            started_at,
            notice,
        } = &mut self.state
        {
            if role == Role::Host
                && *notice == ElapsedNotice::Armed
                && now.saturating_duration_since(*started_at) >= COUNTDOWN_TOTAL
            {
                *notice = ElapsedNotice::Sent;
                return true;
            }
        }
        false
    }

    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        match self.state {
            KickoffState::CountdownRunning { started_at, .. } => {
                Some(now.saturating_duration_since(started_at))
            }
            _ => None,
        }
    }

    /// Pure function of phase and elapsed time
    pub fn view(&self, now: Instant) -> KickoffView {
        let team = self.team();
        KickoffView {
            phase: self.phase(),
            // No countdown text without a kickoff team
            text: team.and(self.elapsed(now)).and_then(countdown_text),
            team,
        }
    }
}

impl Default for Kickoff {
    fn default() -> Self {
        Self::new()
    }
}
