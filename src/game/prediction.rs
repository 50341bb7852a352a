//! Local player prediction and blend toward the authoritative position

use crate::ws::protocol::InputIntent;

use super::entity::LocalPlayerState;

/// Distance moved per frame along the intent direction
pub const PREDICTION_STEP: f32 = 2.0;

/// Fraction of the gap to the authoritative position closed every frame
pub const BLEND_FACTOR: f32 = 0.2;

/// Prediction system for the local player
pub struct PredictionSystem;

impl PredictionSystem {
    /// Unit-or-axis direction from intent. Diagonals are normalized.
    pub fn direction(intent: &InputIntent) -> (f32, f32) {
        let dx = intent.right as i8 - intent.left as i8;
        let dy = intent.down as i8 - intent.up as i8;
        let (mut dx, mut dy) = (dx as f32, dy as f32);

        if dx != 0.0 && dy != 0.0 {
            let length = (dx * dx + dy * dy).sqrt();
            dx /= length;
            dy /= length;
        }

        (dx, dy)
    }

    /// Convex blend of displayed toward authoritative
    pub fn blend(displayed: f32, authoritative: f32) -> f32 {
        displayed * (1.0 - BLEND_FACTOR) + authoritative * BLEND_FACTOR
    }

    /// Advance one frame: step along intent, then blend toward the server position
    pub fn step(player: &mut LocalPlayerState, intent: &InputIntent) {
        if !player.team.is_playing() {
            return;
        }

        let (dx, dy) = Self::direction(intent);
        player.x += dx * PREDICTION_STEP;
        player.y += dy * PREDICTION_STEP;

        player.x = Self::blend(player.x, player.server_x);
        player.y = Self::blend(player.y, player.server_y);
    }
}
