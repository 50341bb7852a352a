//! Entity state held by the client

use std::collections::HashMap;

use crate::ws::protocol::{BallState, PlayerId, PlayerInfo, PlayerSnapshot, Score, Team};

/// The local player (predicted)
#[derive(Debug, Clone, PartialEq)]
pub struct LocalPlayerState {
    pub id: PlayerId,
    pub name: String,
    pub team: Team,

    // Displayed position, moved by prediction
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,

    // Last authoritative position, blend target for prediction
    pub server_x: f32,
    pub server_y: f32,

    pub radius: f32,
}

impl LocalPlayerState {
    /// Start from an authoritative entry: displayed and target coincide
    pub fn from_info(info: &PlayerInfo) -> Self {
        Self {
            id: info.id.clone(),
            name: info.name.clone(),
            team: info.team,
            x: info.x,
            y: info.y,
            vx: info.vx,
            vy: info.vy,
            server_x: info.x,
            server_y: info.y,
            radius: info.radius,
        }
    }

    /// Refresh identity fields from a roster entry, keeping the predicted position
    pub fn refresh_identity(&mut self, info: &PlayerInfo) {
        self.name = info.name.clone();
        self.team = info.team;
        self.radius = info.radius;
    }

    /// Distance between displayed and authoritative position
    pub fn prediction_error(&self) -> f32 {
        let dx = self.x - self.server_x;
        let dy = self.y - self.server_y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Any player other than the local one (never predicted)
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEntityState {
    pub id: PlayerId,
    pub name: String,
    pub team: Team,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub radius: f32,
}

impl RemoteEntityState {
    pub fn from_info(info: &PlayerInfo) -> Self {
        Self {
            id: info.id.clone(),
            name: info.name.clone(),
            team: info.team,
            x: info.x,
            y: info.y,
            vx: info.vx,
            vy: info.vy,
            radius: info.radius,
        }
    }

    /// Overwrite motion with the reported values
    pub fn overwrite(&mut self, snap: &PlayerSnapshot) {
        self.x = snap.x;
        self.y = snap.y;
        self.vx = snap.vx;
        self.vy = snap.vy;
    }
}

/// Every entity the client knows about for the current room
#[derive(Debug, Clone, Default)]
pub struct World {
    pub local: Option<LocalPlayerState>,
    pub remotes: HashMap<PlayerId, RemoteEntityState>,
    pub ball: Option<BallState>,
    pub score: Score,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all players from an authoritative listing. The local player
    /// starts with displayed and target positions equal.
    pub fn load_players(&mut self, players: &HashMap<PlayerId, PlayerInfo>, local_id: Option<&str>) {
        self.local = None;
        self.remotes.clear();
        for (id, info) in players {
            if Some(id.as_str()) == local_id {
                self.local = Some(LocalPlayerState::from_info(info));
            } else {
                self.remotes.insert(id.clone(), RemoteEntityState::from_info(info));
            }
        }
    }

    /// Roster update while a match may be running: names and teams change,
    /// positions of known players are left to snapshots.
    pub fn refresh_roster(&mut self, players: &HashMap<PlayerId, PlayerInfo>, local_id: Option<&str>) {
        self.remotes.retain(|id, _| players.contains_key(id));
        for (id, info) in players {
            if Some(id.as_str()) == local_id {
                match self.local.as_mut() {
                    Some(local) => local.refresh_identity(info),
                    None => self.local = Some(LocalPlayerState::from_info(info)),
                }
            } else {
                self.remotes
                    .entry(id.clone())
                    .and_modify(|remote| {
                        remote.name = info.name.clone();
                        remote.team = info.team;
                        remote.radius = info.radius;
                    })
                    .or_insert_with(|| RemoteEntityState::from_info(info));
            }
        }
        if self
            .local
            .as_ref()
            .is_some_and(|local| !players.contains_key(&local.id))
        {
            self.local = None;
        }
    }

    /// Forget a player who left
    pub fn remove(&mut self, id: &str) -> Option<String> {
        if self.local.as_ref().is_some_and(|l| l.id == id) {
            return self.local.take().map(|l| l.name);
        }
        self.remotes.remove(id).map(|r| r.name)
    }

    pub fn name_of(&self, id: &str) -> Option<&str> {
        match &self.local {
            Some(local) if local.id == id => Some(local.name.as_str()),
            _ => self.remotes.get(id).map(|r| r.name.as_str()),
        }
    }

    /// Team of a player, local or remote
    pub fn team_of(&self, id: &str) -> Option<Team> {
        match &self.local {
            Some(local) if local.id == id => Some(local.team),
            _ => self.remotes.get(id).map(|r| r.team),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
