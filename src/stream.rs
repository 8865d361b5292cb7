//! Reading raw chunks from the agent's output pipes.

use crate::process::SyncSenderWrapper;
use serde_json::Value;
use std::io::{BufRead, BufReader, Read};

/// Reads the agent's stdout as JSON lines.
pub struct StreamReader<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> StreamReader<R> {
    /// Creates a new stream reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    /// Reads the stream and forwards each JSON line to the channel, in order.
    ///
    /// Lines are read as bytes, so a line that is not valid UTF-8 is skipped
    /// like any other non-JSON output instead of ending the stream.
    pub fn read_to_channel(mut self, sender: &SyncSenderWrapper) {
        let mut line = Vec::new();
        loop {
            line.clear();
            match self.reader.read_until(b'\n', &mut line) {
                Ok(0) => break,
                Ok(_) => {
                    let trimmed = line.trim_ascii();
                    if trimmed.is_empty() {
                        continue;
                    }
                    if !Self::parse_and_send(trimmed, sender) {
                        return;
                    }
                }
                Err(e) => {
                    log::warn!("stopped reading agent output: {e}");
                    break;
                }
            }
        }
    }

    /// Returns false once the receiving side has gone away.
    fn parse_and_send(line: &[u8], sender: &SyncSenderWrapper) -> bool {
        match serde_json::from_slice::<Value>(line) {
            Ok(json) => sender.send(json).is_ok(),
            Err(e) => {
                log::debug!(
                    "skipping non-JSON agent output ({e}): {}",
                    String::from_utf8_lossy(line)
                );
                true
            }
        }
    }
}

/// Logs the agent's stderr line by line.
pub fn read_stderr<S: Read>(reader: S) {
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(line.trim_ascii());
                if !text.is_empty() {
                    log::warn!("agent stderr: {text}");
                }
            }
        }
    }
}
