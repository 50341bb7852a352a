//! Client state container, owned by the frame scheduler

use crate::config::Config;
use crate::game::entity::World;
use crate::game::input::{InputSampler, KeyState};
use crate::game::kickoff::Kickoff;
use crate::game::latency::LatencyEstimator;
use crate::game::reconcile::SnapshotStats;
use crate::util::rate_limit::ChatRateLimiter;
use crate::ws::protocol::ClientMsg;

use super::session::{JoinTarget, MatchSettings, Session};

pub const FENCE_WIDTH: f32 = 45.0;
pub const GOAL_WIDTH: f32 = 100.0;

/// Field size reported to the server when a match starts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldGeometry {
    pub width: f32,
    pub height: f32,
}

impl FieldGeometry {
    pub fn to_msg(self) -> ClientMsg {
        ClientMsg::DisplayGeometry {
            width: self.width,
            height: self.height,
            fence_width: FENCE_WIDTH,
            goal_width: GOAL_WIDTH,
        }
    }
}

impl Default for FieldGeometry {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 720.0,
        }
    }
}

/// All mutable client state. Exactly one owner at a time; handlers receive
/// it by `&mut`.
#[derive(Debug)]
pub struct ClientState {
    pub session: Session,
    pub world: World,
    pub kickoff: Kickoff,
    pub keys: KeyState,
    pub sampler: InputSampler,
    pub latency: LatencyEstimator,
    pub snapshot_stats: SnapshotStats,
    pub chat_limiter: ChatRateLimiter,
    pub geometry: FieldGeometry,
    pub game_active: bool,
}

impl ClientState {
    pub fn new(session: Session, geometry: FieldGeometry) -> Self {
        Self {
            session,
            world: World::new(),
            kickoff: Kickoff::new(),
            keys: KeyState::new(),
            sampler: InputSampler::new(),
            latency: LatencyEstimator::new(),
            snapshot_stats: SnapshotStats::default(),
            chat_limiter: ChatRateLimiter::new(),
            geometry,
            game_active: false,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let join_target = match &config.room_code {
            Some(code) => JoinTarget::Code(code.clone()),
            None => JoinTarget::Create,
        };
        let settings = MatchSettings {
            starting_team: config.starting_team,
            duration: config.game_duration,
        };
        let geometry = FieldGeometry {
            width: config.field_width,
            height: config.field_height,
        };
        Self::new(
            Session::new(config.player_name.clone(), join_target, settings),
            geometry,
        )
    }

    /// Back to the main menu: keep name and identity, drop room and match
    pub fn reset_for_menu(&mut self) {
        self.session.leave_room();
        self.world.clear();
        self.kickoff.stop();
        self.keys.clear();
        self.sampler.reset();
        self.latency.reset();
        self.snapshot_stats.reset();
        self.game_active = false;
    }
}
