//! The unit of work carried through the pipeline.

use crate::error::SendError;
use crate::queue::Prioritized;

use std::fmt;
use std::path::{Path, PathBuf};

/// What the worker should do with a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
  /// Append the payload to the target file.
  Log,
  /// Terminate the worker loop.
  Stop,
}

/// An immutable unit of queued work: either an append request or a stop directive.
///
/// Payload and target path are owned copies, so a producer's buffers may be
/// reused as soon as the message has been built.
#[derive(Clone, PartialEq, Eq)]
pub struct Message {
  command: Command,
  payload: Vec<u8>,
  target_path: Option<PathBuf>,
  priority: u32,
}

impl Message {
  /// Builds a LOG message, copying `data` and `target_path`.
  ///
  /// Allocation is fallible: if the copy cannot be reserved the call returns
  /// [`SendError::OutOfMemory`] instead of aborting the process.
  pub fn log(data: &[u8], target_path: &Path, priority: u32) -> Result<Self, SendError> {
    let mut payload = Vec::new();
    payload
      .try_reserve_exact(data.len())
      .map_err(|_| SendError::OutOfMemory {
        requested: data.len(),
      })?;
    payload.extend_from_slice(data);

    let raw_path = target_path.as_os_str();
    let mut path = PathBuf::new();
    path
      .try_reserve_exact(raw_path.len())
      .map_err(|_| SendError::OutOfMemory {
        requested: raw_path.len(),
      })?;
    path.push(target_path);

    Ok(Self {
      command: Command::Log,
      payload,
      target_path: Some(path),
      priority,
    })
  }

  /// Builds a STOP directive.
  pub fn stop(priority: u32) -> Self {
    Self {
      command: Command::Stop,
      payload: Vec::new(),
      target_path: None,
      priority,
    }
  }

  pub fn command(&self) -> Command {
    self.command
  }

  pub fn is_stop(&self) -> bool {
    self.command == Command::Stop
  }

  /// The bytes to append. Empty for STOP.
  pub fn payload(&self) -> &[u8] {
    &self.payload
  }

  /// Byte length of the payload, independent of any terminating character.
  pub fn len(&self) -> usize {
    self.payload.len()
  }

  pub fn is_empty(&self) -> bool {
    self.payload.is_empty()
  }

  /// The file the payload is appended to. `None` for STOP.
  pub fn target_path(&self) -> Option<&Path> {
    self.target_path.as_deref()
  }

  pub fn priority(&self) -> u32 {
    self.priority
  }

  /// Consumes the message, returning the payload buffer.
  pub fn into_payload(self) -> Vec<u8> {
    self.payload
  }
}

impl Prioritized for Message {
  #[inline]
  fn priority(&self) -> u32 {
    self.priority
  }
}

impl fmt::Debug for Message {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Message")
      .field("command", &self.command)
      .field("len", &self.payload.len())
      .field("target_path", &self.target_path)
      .field("priority", &self.priority)
      .finish()
  }
}
