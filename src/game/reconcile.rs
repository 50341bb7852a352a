//! Applying authoritative snapshots to local state

use std::collections::HashMap;

use tracing::trace;

use crate::ws::protocol::{BallState, PlayerId, PlayerSnapshot, Score};

use super::entity::World;

/// Outcome of applying one snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Player entries matched to a known entity
    pub applied: usize,
    /// Player entries referencing an unknown id
    pub ignored: usize,
}

/// Merges snapshots into the world
pub struct Reconciler;

impl Reconciler {
    /// Remote players and the ball are overwritten. For the local player only
    /// the authoritative target moves; the displayed position is left to
    /// prediction. Unknown ids are skipped.
    pub fn apply(
        world: &mut World,
        players: &HashMap<PlayerId, PlayerSnapshot>,
        ball: BallState,
        score: Score,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for (id, snap) in players {
            if let Some(local) = world.local.as_mut().filter(|l| &l.id == id) {
                local.server_x = snap.x;
                local.server_y = snap.y;
                local.vx = snap.vx;
                local.vy = snap.vy;
                report.applied += 1;
            } else if let Some(remote) = world.remotes.get_mut(id) {
                remote.overwrite(snap);
                report.applied += 1;
            } else {
                trace!(player_id = %id, "Snapshot entry for unknown player ignored");
                report.ignored += 1;
            }
        }

        world.ball = Some(ball);
        world.score = score;

        report
    }
}

/// Snapshot statistics for one match
#[derive(Debug, Default)]
pub struct SnapshotStats {
    pub total_snapshots: u64,
    pub ignored_entries: u64,
    pub avg_players_per_snapshot: f32,
}

impl SnapshotStats {
    pub fn record(&mut self, report: ReconcileReport) {
        self.total_snapshots += 1;
        self.ignored_entries += report.ignored as u64;

        // Running average
        let n = self.total_snapshots as f32;
        self.avg_players_per_snapshot =
            self.avg_players_per_snapshot * ((n - 1.0) / n) + (report.applied as f32 / n);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::{PlayerInfo, Team};

    fn info(id: &str, x: f32, y: f32) -> PlayerInfo {
        PlayerInfo {
            id: id.to_string(),
            name: id.to_string(),
            team: Team::Red,
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            radius: 15.0,
        }
    }

    fn world_with(local: &str, remotes: &[&str]) -> World {
        let mut players: HashMap<PlayerId, PlayerInfo> = HashMap::new();
        players.insert(local.to_string(), info(local, 100.0, 100.0));
        for id in remotes {
            players.insert(id.to_string(), info(id, 0.0, 0.0));
        }
        let mut world = World::new();
        world.load_players(&players, Some(local));
        world
    }

    fn snap(x: f32, y: f32) -> PlayerSnapshot {
        PlayerSnapshot { x, y, vx: 1.0, vy: -1.0 }
    }

    fn ball() -> BallState {
        BallState {
            x: 300.0,
            y: 200.0,
            vx: 3.0,
            vy: 0.0,
            radius: 10.0,
        }
    }

    #[test]
    fn test_local_only_moves_target() {
        let mut world = world_with("me", &["other"]);
        let mut players = HashMap::new();
        players.insert("me".to_string(), snap(150.0, 90.0));

        Reconciler::apply(&mut world, &players, ball(), Score::default());

        let local = world.local.as_ref().unwrap();
        assert_eq!((local.x, local.y), (100.0, 100.0));
        assert_eq!((local.server_x, local.server_y), (150.0, 90.0));
        assert_eq!((local.vx, local.vy), (1.0, -1.0));
    }

    #[test]
    fn test_remote_and_ball_overwritten() {
        let mut world = world_with("me", &["other"]);
        let mut players = HashMap::new();
        players.insert("other".to_string(), snap(42.0, 24.0));
        let score = Score { red: 2, blue: 1 };

        let report = Reconciler::apply(&mut world, &players, ball(), score);

        let other = &world.remotes["other"];
        assert_eq!((other.x, other.y), (42.0, 24.0));
        assert_eq!(world.ball, Some(ball()));
        assert_eq!(world.score, score);
        assert_eq!(report, ReconcileReport { applied: 1, ignored: 0 });
    }

    #[test]
    fn test_unknown_id_ignored() {
        let mut world = world_with("me", &[]);
        let mut players = HashMap::new();
        players.insert("ghost".to_string(), snap(1.0, 1.0));

        let report = Reconciler::apply(&mut world, &players, ball(), Score::default());

        assert_eq!(report.ignored, 1);
        assert!(!world.remotes.contains_key("ghost"));
        assert!(world.local.as_ref().is_some_and(|l| l.id == "me"));
    }

    #[test]
    fn test_stats_running_average() {
        let mut stats = SnapshotStats::default();
        stats.record(ReconcileReport { applied: 2, ignored: 0 });
        stats.record(ReconcileReport { applied: 4, ignored: 1 });
        assert_eq!(stats.total_snapshots, 2);
        assert_eq!(stats.ignored_entries, 1);
        assert!((stats.avg_players_per_snapshot - 3.0).abs() < 1e-5);
    }
}
