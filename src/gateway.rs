// Tilt Guard: Command Gateway
//
// Entry point for the remote command interface. The only thing a command can
// do is pick the operating mode; the sensor loops react on their next poll.
//
// Command lines follow the mbed RPC convention:
//
//   /MODESelect/run 2
//
// A bare `MODESelect 2` is accepted as well.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::events::Mode;
use crate::mode::ModeController;

pub const RPC_MODE_SELECT: &str = "MODESelect";

pub const STATUS_GUI: &str = "UI MODE";
pub const STATUS_DETECTION: &str = "DETECTION MODE";
pub const STATUS_SAFE: &str = "SAFE MODE";

#[derive(Debug, Clone)]
pub struct CommandGateway {
    mode: Arc<ModeController>,
}

impl CommandGateway {
    pub fn new(mode: Arc<ModeController>) -> Self {
        Self { mode }
    }

    /// 1 selects GUI, 2 selects DETECTION, any other value falls back to IDLE.
    pub fn handle(&self, value: i64) -> &'static str {
        let (mode, status) = match value {
            1 => (Mode::Gui, STATUS_GUI),
            2 => (Mode::Detection, STATUS_DETECTION),
            _ => (Mode::Idle, STATUS_SAFE),
        };
        let prev = self.mode.set(mode);
        log::info!("MODESelect({}): {} -> {}", value, prev, mode);
        status
    }

    /// Parse and execute one command line.
    ///
    /// An argument that is not an integer is treated as 0, so it lands in
    /// safe mode like any other unrecognised value.
    pub fn handle_line(&self, line: &str) -> Result<&'static str> {
        let (name, arg) = parse_rpc(line).ok_or_else(|| Error::UnknownCommand(line.trim().to_string()))?;
        if name != RPC_MODE_SELECT {
            return Err(Error::UnknownCommand(name.to_string()));
        }
        let value = arg.and_then(|a| a.parse::<i64>().ok()).unwrap_or(0);
        Ok(self.handle(value))
    }
}

/// Split a command line into function name and first argument.
fn parse_rpc(line: &str) -> Option<(&str, Option<&str>)> {
    let mut words = line.split_whitespace();
    let head = words.next()?;
    let arg = words.next();

    let name = match head.strip_prefix('/') {
        Some(path) => {
            let mut parts = path.split('/');
            let name = parts.next()?;
            match parts.next() {
                Some("run") | None => name,
                Some(_) => return None,
            }
        }
        None => head,
    };
    (!name.is_empty()).then_some((name, arg))
}
