use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::Sender;
use std::thread;

use tracing::{debug, info, warn};

use super::protocol::{BackendMessage, Call};
use super::{Backend, BackendError, CallId};
use crate::event::Event;

/// Backend running as a child process speaking JSON lines on stdio.
pub struct ProcessBackend {
  child: Child,
  stdin: ChildStdin,
  next_id: u64,
}

impl ProcessBackend {
  /// Spawns `command_line` (split on whitespace) and starts forwarding its
  /// output to the event loop through `tx`.
  pub fn spawn(command_line: &str, tx: Sender<Event>) -> Result<Self, BackendError> {
    let mut parts = command_line.split_whitespace();
    let program = parts.next().ok_or(BackendError::EmptyCommand)?;

    let mut child = Command::new(program)
      .args(parts)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()
      .map_err(|source| BackendError::Spawn { command: command_line.to_string(), source })?;

    let stdin = child.stdin.take().ok_or(BackendError::Disconnected)?;
    let stdout = child.stdout.take().ok_or(BackendError::Disconnected)?;

    if let Some(stderr) = child.stderr.take() {
      thread::spawn(move || {
        for line in BufReader::new(stderr).lines().map_while(Result::ok) {
          debug!(event = "backend.stderr", %line);
        }
      });
    }

    thread::spawn(move || {
      for line in BufReader::new(stdout).lines() {
        let line = match line {
          Ok(l) => l,
          Err(e) => {
            warn!(event = "backend.read_failed", error = %e);
            break;
          }
        };
        if line.trim().is_empty() {
          continue;
        }
        match serde_json::from_str::<BackendMessage>(&line) {
          Ok(msg) => {
            if tx.send(Event::Backend(msg)).is_err() {
              return;
            }
          }
          Err(e) => warn!(event = "backend.undecodable_line", error = %e, %line),
        }
      }
      let _ = tx.send(Event::BackendExited);
    });

    info!(event = "backend.spawned", command = command_line, pid = child.id());
    Ok(Self { child, stdin, next_id: 0 })
  }
}

impl Backend for ProcessBackend {
  fn invoke(&mut self, call: Call) -> Result<CallId, BackendError> {
    self.next_id += 1;
    let id = self.next_id;
    let line = call
      .encode(id)
      .map_err(|source| BackendError::Encode { call: call.name(), source })?;
    writeln!(self.stdin, "{line}").map_err(|e| match e.kind() {
      std::io::ErrorKind::BrokenPipe => BackendError::Disconnected,
      _ => BackendError::Io(e),
    })?;
    self.stdin.flush()?;
    debug!(event = "backend.call", id, command = call.name());
    Ok(CallId(id))
  }
}

impl Drop for ProcessBackend {
  fn drop(&mut self) {
    let _ = self.child.kill();
    let _ = self.child.wait();
  }
}
