//! Line-oriented console input

use std::io::{self, BufRead};
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::app::session::{LocalAction, MatchSettings};
use crate::game::input::is_bound;
use crate::ws::protocol::{ParseTeamError, Team};

/// One parsed console line
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    /// `+KeyCode`
    Press(String),
    /// `-KeyCode`
    Release(String),
    Action(LocalAction),
    Quit,
}

/// Console parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command: /{0}")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Invalid team: {0}")]
    InvalidTeam(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),
}

/// Parse a console line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    // Only bound key codes toggle keys; "+1" or "-gg" are chat
    if let Some(code) = line.strip_prefix('+').filter(|c| is_bound(c.trim())) {
        return Ok(Some(ConsoleCommand::Press(code.trim().to_string())));
    }
    if let Some(code) = line.strip_prefix('-').filter(|c| is_bound(c.trim())) {
        return Ok(Some(ConsoleCommand::Release(code.trim().to_string())));
    }

    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(ConsoleCommand::Action(LocalAction::Chat(line.to_string()))));
    };

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default().to_ascii_lowercase();
    let args: Vec<&str> = parts.collect();

    let action = match (name.as_str(), args.as_slice()) {
        ("quit" | "exit", _) => return Ok(Some(ConsoleCommand::Quit)),
        ("create", _) => LocalAction::CreateRoom,
        ("join", [code]) => LocalAction::JoinRoom(code.to_string()),
        ("join", _) => return Err(CommandError::Usage("/join <code>")),
        ("team", [team]) => LocalAction::ChangeTeam(parse_team(team)?),
        ("team", _) => return Err(CommandError::Usage("/team <red|blue|spectator>")),
        ("move", [target, team]) => LocalAction::MovePlayer {
            target: target.to_string(),
            team: parse_team(team)?,
        },
        ("move", _) => return Err(CommandError::Usage("/move <player-id> <team>")),
        ("settings", [team, minutes]) => LocalAction::UpdateSettings(MatchSettings {
            starting_team: parse_team(team)?,
            duration: minutes
                .parse()
                .map_err(|_| CommandError::InvalidNumber(minutes.to_string()))?,
        }),
        ("settings", _) => return Err(CommandError::Usage("/settings <red|blue> <minutes>")),
        ("start", _) => LocalAction::StartMatch,
        ("leave", _) => LocalAction::LeaveMatch,
        (other, _) => return Err(CommandError::Unknown(other.to_string())),
    };

    Ok(Some(ConsoleCommand::Action(action)))
}

fn parse_team(s: &str) -> Result<Team, CommandError> {
    s.parse()
        .map_err(|e: ParseTeamError| CommandError::InvalidTeam(e.0))
}

/// Forward parsed lines until EOF, `/quit`, or the loop hangs up
fn forward_lines<R: BufRead>(reader: R, tx: &mpsc::Sender<ConsoleCommand>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to read console input");
                return;
            }
        };
        match parse_line(&line) {
            Ok(Some(command)) => {
                let quit = command == ConsoleCommand::Quit;
                if tx.blocking_send(command).is_err() || quit {
                    return;
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Console"),
        }
    }
    debug!("Console input closed");
}

/// Read stdin on its own OS thread. A blocking stdin read cannot be
/// cancelled, so it must stay off the runtime or shutdown waits for Enter.
pub fn spawn_stdin_reader(tx: mpsc::Sender<ConsoleCommand>) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("console-stdin".to_string())
        .spawn(move || forward_lines(io::stdin().lock(), &tx))
}
