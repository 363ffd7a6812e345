//! Interactive commands entered at the client prompt.

use thiserror::Error;

/// MIDI controller number of the sustain pedal.
pub const SUSTAIN_PEDAL: u8 = 64;

/// Default velocity of `/note` without an explicit value.
pub const DEFAULT_VELOCITY: f64 = 0.5;

/// A user request, produced by the prompt and executed by the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Note { note: u8, velocity: f64 },
    Off { note: u8 },
    Pedal { value: f64 },
    Move { x: f64, y: f64 },
    Name(String),
    Color(String),
    Join(String),
    Who,
    Quit,
    Chat(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCommandError {
    #[error("unknown command '/{0}'")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}

impl Command {
    /// Parse one prompt line. Lines without a leading `/` are chat.
    pub fn parse(line: &str) -> Result<Self, ParseCommandError> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Command::Chat(line.to_string()));
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        match name {
            "note" => match args.as_slice() {
                [note] => Ok(Command::Note {
                    note: parse_note(note, "/note <0-127> [velocity]")?,
                    velocity: DEFAULT_VELOCITY,
                }),
                [note, velocity] => Ok(Command::Note {
                    note: parse_note(note, "/note <0-127> [velocity]")?,
                    velocity: parse_unit(velocity, "/note <0-127> [velocity 0-1]")?,
                }),
                _ => Err(ParseCommandError::Usage("/note <0-127> [velocity]")),
            },
            "off" => match args.as_slice() {
                [note] => Ok(Command::Off {
                    note: parse_note(note, "/off <0-127>")?,
                }),
                _ => Err(ParseCommandError::Usage("/off <0-127>")),
            },
            "pedal" => match args.as_slice() {
                [value] => Ok(Command::Pedal {
                    value: parse_unit(value, "/pedal <0-1>")?,
                }),
                _ => Err(ParseCommandError::Usage("/pedal <0-1>")),
            },
            "move" => match args.as_slice() {
                [x, y] => Ok(Command::Move {
                    x: parse_coordinate(x)?,
                    y: parse_coordinate(y)?,
                }),
                _ => Err(ParseCommandError::Usage("/move <x> <y>")),
            },
            "name" if !args.is_empty() => Ok(Command::Name(args.join(" "))),
            "name" => Err(ParseCommandError::Usage("/name <display name>")),
            "color" => match args.as_slice() {
                [color] => Ok(Command::Color(color.to_string())),
                _ => Err(ParseCommandError::Usage("/color <#rrggbb>")),
            },
            "join" => match args.as_slice() {
                [room] => Ok(Command::Join(room.to_string())),
                _ => Err(ParseCommandError::Usage("/join <room>")),
            },
            "who" => Ok(Command::Who),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(ParseCommandError::Unknown(other.to_string())),
        }
    }
}

fn parse_note(raw: &str, usage: &'static str) -> Result<u8, ParseCommandError> {
    raw.parse::<u8>()
        .ok()
        .filter(|n| *n <= 127)
        .ok_or(ParseCommandError::Usage(usage))
}

fn parse_unit(raw: &str, usage: &'static str) -> Result<f64, ParseCommandError> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| (0.0..=1.0).contains(v))
        .ok_or(ParseCommandError::Usage(usage))
}

fn parse_coordinate(raw: &str) -> Result<f64, ParseCommandError> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or(ParseCommandError::Usage("/move <x> <y>"))
}
