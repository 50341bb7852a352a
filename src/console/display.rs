//! Renderer that reports what changed on screen through the log

use tracing::{debug, info, trace, warn};

use crate::game::kickoff::KickoffPhase;
use crate::game::latency::LatencyGrade;
use crate::game::view::{FrameView, Notice, Renderer};
use crate::util::time::FRAME_TPS;
use crate::ws::protocol::Score;

/// Logs kickoff, score and latency changes instead of drawing every frame
#[derive(Debug, Default)]
pub struct LogRenderer {
    frames: u64,
    phase: Option<KickoffPhase>,
    countdown: Option<&'static str>,
    score: Option<Score>,
    grade: Option<LatencyGrade>,
    shooting: bool,
}

impl LogRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for LogRenderer {
    fn draw(&mut self, frame: &FrameView) {
        self.frames += 1;

        let kickoff = &frame.kickoff;
        if self.phase != Some(kickoff.phase) {
            info!(phase = ?kickoff.phase, team = ?kickoff.team, frame = self.frames, "Kickoff");
            self.phase = Some(kickoff.phase);
        }
        if let Some(text) = kickoff.text.filter(|t| self.countdown != Some(*t)) {
            info!(team = ?kickoff.team, "{}", text);
        }
        self.countdown = kickoff.text;

        if self.score != Some(frame.score) {
            info!(red = frame.score.red, blue = frame.score.blue, "Score");
            self.score = Some(frame.score);
        }

        if frame.latency_grade.is_some() && self.grade != frame.latency_grade {
            info!(latency_ms = ?frame.latency_ms, grade = ?frame.latency_grade, "Latency");
            self.grade = frame.latency_grade;
        }

        if frame.shooting != self.shooting {
            debug!(shooting = frame.shooting, "Action key");
            self.shooting = frame.shooting;
        }

        // Positions once a second
        if self.frames % u64::from(FRAME_TPS) == 1 {
            if let Some(ball) = &frame.ball {
                debug!(x = ball.x, y = ball.y, vx = ball.vx, vy = ball.vy, "Ball");
            }
            for e in &frame.entities {
                trace!(
                    id = %e.id,
                    name = %e.name,
                    team = %e.team,
                    x = e.x,
                    y = e.y,
                    vx = e.vx,
                    vy = e.vy,
                    radius = e.radius,
                    local = e.is_local,
                    "Player"
                );
            }
        }
    }

    fn notify(&mut self, notice: &Notice) {
        match notice {
            Notice::Info(text) => info!("{}", text),
            Notice::Error(text) => warn!("{}", text),
            Notice::Chat { sender, text } => info!(sender = %sender, "{}", text),
        }
    }
}
