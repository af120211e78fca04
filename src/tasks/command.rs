// Tilt Guard: Command & Button Tasks
//
// The command task reads RPC lines from the serial link and answers each
// with the gateway's status string. The button task turns a debounced press
// into a threshold report on the publish queue.

use std::io::{BufRead, Write};
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::gateway::CommandGateway;
use crate::input::{ButtonInput, ButtonLine};
use crate::tasks::publish::PublishQueue;

/// Serve commands until `input` reaches end of stream.
pub fn command_task<R: BufRead, W: Write>(
    gateway: &CommandGateway,
    input: R,
    mut output: W,
) -> std::io::Result<()> {
    log::info!("Command task started");

    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match gateway.handle_line(&line) {
            Ok(status) => writeln!(output, "{}", status)?,
            Err(e) => {
                log::warn!("Rejected command {:?}: {}", line.trim(), e);
                writeln!(output, "ERROR: {}", e)?;
            }
        }
        output.flush()?;
    }

    log::info!("Command stream closed");
    Ok(())
}

pub struct ButtonTask<L> {
    button: ButtonInput<L>,
    queue: PublishQueue,
}

impl<L: ButtonLine> ButtonTask<L> {
    pub fn new(button: ButtonInput<L>, queue: PublishQueue) -> Self {
        Self { button, queue }
    }

    /// Returns `true` if a press was queued on this poll.
    pub fn poll_at(&mut self, now: Instant) -> Result<bool> {
        if !self.button.poll_at(now) {
            return Ok(false);
        }
        log::info!("Button pressed, requesting threshold report");
        self.queue.request_threshold_report()?;
        Ok(true)
    }

    /// Returns once the publish task has gone away.
    pub fn run(mut self, interval: Duration) {
        log::info!("Button task started");
        loop {
            let tick_start = Instant::now();
            match self.poll_at(tick_start) {
                Ok(_) => {}
                Err(e) if e.is_transient() => log::warn!("Button: {}", e),
                Err(e) => {
                    log::error!("Button task stopping: {}", e);
                    return;
                }
            }
            super::sleep_remaining(tick_start, interval);
        }
    }
}
