//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Server-assigned player identifier
pub type PlayerId = String;

/// Default player radius when the server omits it
pub const PLAYER_RADIUS: f32 = 15.0;
/// Default ball radius when the server omits it
pub const BALL_RADIUS: f32 = 10.0;

/// Team a player belongs to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Red,
    Blue,
    #[default]
    Spectator,
}

/// Unrecognized team name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown team '{0}'")]
pub struct ParseTeamError(pub String);

impl Team {
    /// The other playing team. Spectators have no opponent.
    pub fn opponent(self) -> Option<Team> {
        match self {
            Team::Red => Some(Team::Blue),
            Team::Blue => Some(Team::Red),
            Team::Spectator => None,
        }
    }

    pub fn is_playing(self) -> bool {
        !matches!(self, Team::Spectator)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Team::Red => "red",
            Team::Blue => "blue",
            Team::Spectator => "spectator",
        }
    }
}

impl std::str::FromStr for Team {
    type Err = ParseTeamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "red" => Ok(Team::Red),
            "blue" => Ok(Team::Blue),
            "spectator" | "spec" => Ok(Team::Spectator),
            other => Err(ParseTeamError(other.to_string())),
        }
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directional and action intent of the local player
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputIntent {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub shoot: bool,
}

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMsg {
    /// Register the display name for this connection
    JoinWithName { name: String },

    /// Create a new room (the creator becomes host)
    CreateRoom,

    /// Join an existing room by code
    JoinRoom { code: String },

    /// Move self to another team
    ChangeTeam { team: Team },

    /// Move any player to a team (host only)
    #[serde(rename_all = "camelCase")]
    MovePlayer { target_id: PlayerId, team: Team },

    /// Change match settings (host only)
    #[serde(rename_all = "camelCase")]
    UpdateSettings {
        starting_team: Team,
        /// Match duration in minutes
        duration: u32,
    },

    /// Start the match (host only)
    StartMatch,

    /// Leave the current room/match
    LeaveMatch,

    /// Intent changed since the last emission
    PlayerInput(InputIntent),

    /// Chat line
    ChatMessage { text: String },

    /// Kickoff countdown ran out locally (host only, once per countdown)
    CountdownElapsed,

    /// Local field geometry, so the server can scale its field
    #[serde(rename_all = "camelCase")]
    DisplayGeometry {
        width: f32,
        height: f32,
        fence_width: f32,
        goal_width: f32,
    },
}

impl ClientMsg {
    /// Wire name, used for logging
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMsg::JoinWithName { .. } => "join-with-name",
            ClientMsg::CreateRoom => "create-room",
            ClientMsg::JoinRoom { .. } => "join-room",
            ClientMsg::ChangeTeam { .. } => "change-team",
            ClientMsg::MovePlayer { .. } => "move-player",
            ClientMsg::UpdateSettings { .. } => "update-settings",
            ClientMsg::StartMatch => "start-match",
            ClientMsg::LeaveMatch => "leave-match",
            ClientMsg::PlayerInput(_) => "player-input",
            ClientMsg::ChatMessage { .. } => "chat-message",
            ClientMsg::CountdownElapsed => "countdown-elapsed",
            ClientMsg::DisplayGeometry { .. } => "display-geometry",
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMsg {
    /// Identity assigned to this connection
    #[serde(rename_all = "camelCase")]
    JoinedGame { player_id: PlayerId },

    /// Room created on our request
    #[serde(rename_all = "camelCase")]
    RoomCreated { room_id: String },

    /// Entered a room
    #[serde(rename_all = "camelCase")]
    RoomJoined {
        room_id: String,
        players: HashMap<PlayerId, PlayerInfo>,
        teams: Teams,
        is_host: bool,
    },

    /// Players or team assignments changed
    #[serde(rename_all = "camelCase")]
    RosterChanged {
        #[serde(default)]
        players: Option<HashMap<PlayerId, PlayerInfo>>,
        teams: Teams,
        /// Display name of a newly joined player, if that caused the change
        #[serde(default)]
        joined_name: Option<String>,
    },

    /// A player left the room
    #[serde(rename_all = "camelCase")]
    PlayerLeft { player_id: PlayerId },

    /// Host role moved to another player
    #[serde(rename_all = "camelCase")]
    HostChanged { host_id: PlayerId },

    /// Match settings changed
    #[serde(rename_all = "camelCase")]
    SettingsUpdated { starting_team: Team, duration: u32 },

    /// Match has started
    #[serde(rename_all = "camelCase")]
    MatchStarted {
        ball: BallState,
        players: HashMap<PlayerId, PlayerInfo>,
        score: Score,
        #[serde(default)]
        kickoff_team: Option<Team>,
    },

    /// Authoritative game state (sent at the server tick rate)
    StateSnapshot {
        players: HashMap<PlayerId, PlayerSnapshot>,
        ball: BallState,
        score: Score,
    },

    /// A goal was scored; a new kickoff begins
    #[serde(rename_all = "camelCase")]
    GoalScored {
        team: Team,
        #[serde(default)]
        scorer_id: Option<PlayerId>,
        score: Score,
    },

    /// Authority confirmed the countdown; ball is live for the kickoff team
    KickoffComplete,

    /// Kickoff restriction lifted (first legal touch)
    RestrictionLifted,

    /// Match has ended
    MatchEnded { score: Score },

    /// Chat line from a player or the system
    ChatMessage { sender: String, text: String },

    /// Error message
    Error { message: String },
}

/// Player entry as sent on room join and match start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub team: Team,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub vx: f32,
    #[serde(default)]
    pub vy: f32,
    #[serde(default = "default_player_radius")]
    pub radius: f32,
}

fn default_player_radius() -> f32 {
    PLAYER_RADIUS
}

/// Player state in a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub vx: f32,
    #[serde(default)]
    pub vy: f32,
}

/// Ball state (always authoritative)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallState {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub vx: f32,
    #[serde(default)]
    pub vy: f32,
    #[serde(default = "default_ball_radius")]
    pub radius: f32,
}

fn default_ball_radius() -> f32 {
    BALL_RADIUS
}

/// Match score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub red: u32,
    pub blue: u32,
}

impl Score {
    pub fn leader(&self) -> Option<Team> {
        match self.red.cmp(&self.blue) {
            std::cmp::Ordering::Greater => Some(Team::Red),
            std::cmp::Ordering::Less => Some(Team::Blue),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Roster entry in a team list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: PlayerId,
    pub name: String,
}

/// Team lists as maintained by the server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teams {
    #[serde(default)]
    pub red: Vec<RosterEntry>,
    #[serde(default)]
    pub blue: Vec<RosterEntry>,
    #[serde(default)]
    pub spectator: Vec<RosterEntry>,
}

impl Teams {
    /// Drop a player from every list
    pub fn remove(&mut self, id: &str) {
        for list in [&mut self.red, &mut self.blue, &mut self.spectator] {
            list.retain(|p| p.id != id);
        }
    }

    /// Display name as listed in the roster
    pub fn name_of(&self, id: &str) -> Option<&str> {
        [&self.red, &self.blue, &self.spectator]
            .into_iter()
            .flatten()
            .find(|p| p.id == id)
            .map(|p| p.name.as_str())
    }

    /// Team the player is listed under
    pub fn team_of(&self, id: &str) -> Option<Team> {
        [
            (Team::Red, &self.red),
            (Team::Blue, &self.blue),
            (Team::Spectator, &self.spectator),
        ]
        .into_iter()
        .find(|(_, list)| list.iter().any(|p| p.id == id))
        .map(|(team, _)| team)
    }
}
