//! Session context: who we are, which room, which role

use crate::ws::protocol::{ClientMsg, PlayerId, Team, Teams};

/// Role of this client in the room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Session authority: may change settings, move players and start matches
    Host,
    Guest,
}

impl Role {
    pub fn from_is_host(is_host: bool) -> Self {
        if is_host {
            Self::Host
        } else {
            Self::Guest
        }
    }
}

/// Match settings chosen by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSettings {
    pub starting_team: Team,
    /// Match duration in minutes
    pub duration: u32,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            starting_team: Team::Red,
            duration: 5,
        }
    }
}

/// Room to enter once connected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinTarget {
    Create,
    Code(String),
}

/// Actions the local user can request
#[derive(Debug, Clone, PartialEq)]
pub enum LocalAction {
    CreateRoom,
    JoinRoom(String),
    ChangeTeam(Team),
    MovePlayer { target: PlayerId, team: Team },
    UpdateSettings(MatchSettings),
    StartMatch,
    LeaveMatch,
    Chat(String),
}

/// Rejected local actions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("Only the host can {0}")]
    NotHost(&'static str),

    #[error("Not connected to server")]
    NotConnected,

    #[error("Not in a room")]
    NotInRoom,

    #[error("Please enter a valid room code")]
    EmptyRoomCode,

    #[error("Starting team must be red or blue")]
    InvalidStartingTeam,

    #[error("Chat message is empty")]
    EmptyChat,

    #[error("Sending chat too fast")]
    ChatRateLimited,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub name: String,
    pub player_id: Option<PlayerId>,
    pub room: Option<String>,
    pub role: Role,
    pub teams: Teams,
    pub settings: MatchSettings,
    pub join_target: JoinTarget,
    pub connected: bool,
}

impl Session {
    pub fn new(name: impl Into<String>, join_target: JoinTarget, settings: MatchSettings) -> Self {
        Self {
            name: name.into(),
            player_id: None,
            room: None,
            role: Role::Guest,
            teams: Teams::default(),
            settings,
            join_target,
            connected: false,
        }
    }

    pub fn is_host(&self) -> bool {
        self.role == Role::Host
    }

    pub fn in_room(&self) -> bool {
        self.room.is_some()
    }

    /// Messages that introduce us and enter the configured room
    pub fn join_messages(&self) -> Vec<ClientMsg> {
        let enter = match &self.join_target {
            JoinTarget::Create => ClientMsg::CreateRoom,
            JoinTarget::Code(code) => ClientMsg::JoinRoom { code: code.clone() },
        };
        vec![
            ClientMsg::JoinWithName {
                name: self.name.clone(),
            },
            enter,
        ]
    }

    /// Validate an action against the current role and room, producing the
    /// messages to send. Does not mutate the session.
    pub fn plan(&self, action: &LocalAction) -> Result<Vec<ClientMsg>, ActionError> {
        match action {
            LocalAction::CreateRoom => Ok(vec![ClientMsg::CreateRoom]),

            LocalAction::JoinRoom(code) => {
                let code = code.trim().to_uppercase();
                if code.is_empty() {
                    return Err(ActionError::EmptyRoomCode);
                }
                Ok(vec![ClientMsg::JoinRoom { code }])
            }

            LocalAction::ChangeTeam(team) => {
                self.require_room()?;
                Ok(vec![ClientMsg::ChangeTeam { team: *team }])
            }

            LocalAction::MovePlayer { target, team } => {
                self.require_room()?;
                if self.is_host() {
                    Ok(vec![ClientMsg::MovePlayer {
                        target_id: target.clone(),
                        team: *team,
                    }])
                } else if self.player_id.as_deref() == Some(target.as_str()) {
                    // Guests may only move themselves
                    Ok(vec![ClientMsg::ChangeTeam { team: *team }])
                } else {
                    Err(ActionError::NotHost("move other players"))
                }
            }

            LocalAction::UpdateSettings(settings) => {
                self.require_room()?;
                self.require_host("change settings")?;
                if !settings.starting_team.is_playing() {
                    return Err(ActionError::InvalidStartingTeam);
                }
                Ok(vec![settings_msg(settings)])
            }

            LocalAction::StartMatch => {
                self.require_room()?;
                self.require_host("start the game")?;
                Ok(vec![settings_msg(&self.settings), ClientMsg::StartMatch])
            }

            LocalAction::LeaveMatch => {
                self.require_room()?;
                Ok(vec![ClientMsg::LeaveMatch])
            }

            LocalAction::Chat(text) => {
                self.require_room()?;
                let text = text.trim();
                if text.is_empty() {
                    return Err(ActionError::EmptyChat);
                }
                Ok(vec![ClientMsg::ChatMessage {
                    text: text.to_string(),
                }])
            }
        }
    }

    fn require_room(&self) -> Result<(), ActionError> {
        if self.in_room() {
            Ok(())
        } else {
            Err(ActionError::NotInRoom)
        }
    }

    fn require_host(&self, what: &'static str) -> Result<(), ActionError> {
        if self.is_host() {
            Ok(())
        } else {
            Err(ActionError::NotHost(what))
        }
    }

    /// Leave the room, keeping name and identity
    pub fn leave_room(&mut self) {
        self.room = None;
        self.role = Role::Guest;
        self.teams = Teams::default();
    }
}

fn settings_msg(settings: &MatchSettings) -> ClientMsg {
    ClientMsg::UpdateSettings {
        starting_team: settings.starting_team,
        duration: settings.duration,
    }
}
