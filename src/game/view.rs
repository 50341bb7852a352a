//! Per-frame snapshot of what should be on screen

use crate::ws::protocol::{BallState, PlayerId, Score, Team};

use super::kickoff::KickoffView;
use super::latency::LatencyGrade;

#[derive(Debug, Clone, PartialEq)]
pub struct EntityView {
    pub id: PlayerId,
    pub name: String,
    pub team: Team,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub radius: f32,
    pub is_local: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameView {
    /// Players on the field (spectators excluded)
    pub entities: Vec<EntityView>,
    pub ball: Option<BallState>,
    pub score: Score,
    pub kickoff: KickoffView,
    pub latency_ms: Option<u64>,
    pub latency_grade: Option<LatencyGrade>,
    /// Local player is holding the action key
    pub shooting: bool,
}

/// User-visible notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
    /// Chat line; system announcements use the sender "System"
    Chat { sender: String, text: String },
}

impl Notice {
    pub fn system(text: impl Into<String>) -> Self {
        Notice::Chat {
            sender: "System".to_string(),
            text: text.into(),
        }
    }
}

/// Display surface. Implementations draw; they never mutate game state.
pub trait Renderer {
    fn draw(&mut self, frame: &FrameView);

    fn notify(&mut self, notice: &Notice);
}
