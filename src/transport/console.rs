//! Terminal transport drawing notices on stderr.

use std::io::{IsTerminal, Write};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{HandleSequence, MessageHandle, Transport};
use crate::error::TransportError;

/// ANSI: return to column 0 and clear the line.
const CLEAR_LINE: &str = "\r\x1b[2K";

/// Draws progress notices on stderr, erasing them on retract.
///
/// On a terminal the notice is drawn without a newline and cleared in
/// place. Otherwise it is written as a plain line and retract is a no-op.
#[derive(Debug)]
pub struct ConsoleTransport {
    handles: HandleSequence,
    interactive: bool,
    current: Mutex<Option<MessageHandle>>,
}

impl ConsoleTransport {
    /// Creates a transport, detecting whether stderr is a terminal.
    #[must_use]
    pub fn new() -> Self {
        Self::with_interactive(std::io::stderr().is_terminal())
    }

    /// Creates a transport with explicit terminal handling.
    #[must_use]
    pub fn with_interactive(interactive: bool) -> Self {
        Self {
            handles: HandleSequence::default(),
            interactive,
            current: Mutex::new(None),
        }
    }

    fn lock_current(&self) -> Result<std::sync::MutexGuard<'_, Option<MessageHandle>>, TransportError> {
        self.current.lock().map_err(|_| TransportError {
            message: "console state poisoned".to_string(),
        })
    }
}

impl Default for ConsoleTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn send(&self, text: &str) -> Result<MessageHandle, TransportError> {
        let handle = self.handles.next();
        let mut stderr = std::io::stderr().lock();
        if self.interactive {
            write!(stderr, "{CLEAR_LINE}{text}")?;
            *self.lock_current()? = Some(handle);
        } else {
            writeln!(stderr, "{text}")?;
        }
        stderr.flush()?;
        Ok(handle)
    }

    async fn retract(&self, handle: MessageHandle) -> Result<(), TransportError> {
        if !self.interactive {
            return Ok(());
        }
        let mut current = self.lock_current()?;
        if *current == Some(handle) {
            let mut stderr = std::io::stderr().lock();
            write!(stderr, "{CLEAR_LINE}")?;
            stderr.flush()?;
            *current = None;
        }
        Ok(())
    }
}
