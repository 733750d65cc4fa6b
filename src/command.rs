//! View commands: the operations a user can trigger on a display's view.
//!
//! Commands have a compact text form used by the command line and scripts:
//! plain names such as `zoom-in` or `rotate-left`, `aspect=X,Y,Z`, and the
//! switches `scale=on`, `box=off`, `parallel=on`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::view::{Display, ViewHandler};

/// Error parsing a view command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown view command '{0}'")]
    Unknown(String),

    #[error("Invalid argument '{value}' for '{command}'")]
    InvalidArgument { command: String, value: String },
}

/// One view operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewCommand {
    ZoomIn,
    ZoomOut,
    RotateClockwise,
    RotateCounterclockwise,
    RotateLeft,
    RotateRight,
    RotateUp,
    RotateDown,
    PanLeft,
    PanRight,
    PanUp,
    PanDown,
    Reset,
    GuessAspect,
    Aspect(f64, f64, f64),
    Scale(bool),
    BoundingBox(bool),
    Parallel(bool),
}

impl ViewCommand {
    /// Commands that take no argument, with their names.
    const SIMPLE: &'static [(&'static str, ViewCommand)] = &[
        ("zoom-in", ViewCommand::ZoomIn),
        ("zoom-out", ViewCommand::ZoomOut),
        ("rotate-clockwise", ViewCommand::RotateClockwise),
        ("rotate-counterclockwise", ViewCommand::RotateCounterclockwise),
        ("rotate-left", ViewCommand::RotateLeft),
        ("rotate-right", ViewCommand::RotateRight),
        ("rotate-up", ViewCommand::RotateUp),
        ("rotate-down", ViewCommand::RotateDown),
        ("pan-left", ViewCommand::PanLeft),
        ("pan-right", ViewCommand::PanRight),
        ("pan-up", ViewCommand::PanUp),
        ("pan-down", ViewCommand::PanDown),
        ("reset", ViewCommand::Reset),
        ("guess-aspect", ViewCommand::GuessAspect),
    ];

    /// Run the command against a handler.
    pub fn apply<D: Display>(&self, handler: &mut ViewHandler<D>) {
        log::debug!("Applying view command {}", self);
        match *self {
            ViewCommand::ZoomIn => handler.zoom_in(),
            ViewCommand::ZoomOut => handler.zoom_out(),
            ViewCommand::RotateClockwise => handler.rotate_clockwise(),
            ViewCommand::RotateCounterclockwise => handler.rotate_counterclockwise(),
            ViewCommand::RotateLeft => handler.rotate_left(),
            ViewCommand::RotateRight => handler.rotate_right(),
            ViewCommand::RotateUp => handler.rotate_up(),
            ViewCommand::RotateDown => handler.rotate_down(),
            ViewCommand::PanLeft => handler.pan_left(),
            ViewCommand::PanRight => handler.pan_right(),
            ViewCommand::PanUp => handler.pan_up(),
            ViewCommand::PanDown => handler.pan_down(),
            ViewCommand::Reset => handler.reset(),
            ViewCommand::GuessAspect => handler.guess_aspect(),
            ViewCommand::Aspect(x, y, z) => handler.set_aspect(x, y, z),
            ViewCommand::Scale(on) => handler.toggle_scale(on),
            ViewCommand::BoundingBox(on) => handler.toggle_bounding_box(on),
            ViewCommand::Parallel(on) => handler.toggle_parallel(on),
        }
    }
}

fn switch(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

fn parse_switch(command: &str, value: &str) -> Result<bool, CommandError> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(CommandError::InvalidArgument {
            command: command.to_string(),
            value: value.to_string(),
        }),
    }
}

impl FromStr for ViewCommand {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some((name, value)) = s.split_once('=') else {
            return Self::SIMPLE
                .iter()
                .find(|(n, _)| *n == s)
                .map(|(_, c)| *c)
                .ok_or_else(|| CommandError::Unknown(s.to_string()));
        };

        let (name, value) = (name.trim(), value.trim());
        match name {
            "scale" => Ok(ViewCommand::Scale(parse_switch(name, value)?)),
            "box" => Ok(ViewCommand::BoundingBox(parse_switch(name, value)?)),
            "parallel" => Ok(ViewCommand::Parallel(parse_switch(name, value)?)),
            "aspect" => {
                let invalid = || CommandError::InvalidArgument {
                    command: name.to_string(),
                    value: value.to_string(),
                };
                let parts = value
                    .split(',')
                    .map(|p| p.trim().parse::<f64>().map_err(|_| invalid()))
                    .collect::<Result<Vec<_>, _>>()?;
                match parts[..] {
                    [x, y, z] => Ok(ViewCommand::Aspect(x, y, z)),
                    _ => Err(invalid()),
                }
            }
            _ => Err(CommandError::Unknown(s.to_string())),
        }
    }
}

impl fmt::Display for ViewCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ViewCommand::Aspect(x, y, z) => write!(f, "aspect={},{},{}", x, y, z),
            ViewCommand::Scale(on) => write!(f, "scale={}", switch(on)),
            ViewCommand::BoundingBox(on) => write!(f, "box={}", switch(on)),
            ViewCommand::Parallel(on) => write!(f, "parallel={}", switch(on)),
            simple => {
                let name = Self::SIMPLE
                    .iter()
                    .find(|(_, c)| *c == simple)
                    .map_or("?", |(n, _)| *n);
                f.write_str(name)
            }
        }
    }
}
