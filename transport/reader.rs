// Request framing: turn raw pipe reads into newline-terminated request lines
use crate::error::{Result, TransportError};
use crate::fifo::ATOMIC_WRITE_LIMIT;
use crate::traits::Transport;
use tracing::warn;

/// Unterminated data kept by `LineAccumulator` before it is discarded
pub const MAX_PENDING: usize = 4 * ATOMIC_WRITE_LIMIT;

/// Read one batch of requests from a short-lived per-client pipe.
///
/// Performs a single read of at most `ATOMIC_WRITE_LIMIT` bytes. A request
/// split across two reads is not reassembled; clients send their whole batch
/// in one atomic write.
pub fn read_requests<T: Transport + ?Sized>(transport: &mut T) -> Result<Vec<String>> {
    let mut buf = vec![0u8; ATOMIC_WRITE_LIMIT];
    let n = transport.receive(&mut buf)?;
    if n == 0 {
        return Err(TransportError::PeerClosed);
    }
    Ok(split_requests(&buf[..n]))
}

/// Decode up to the first NUL, split on newlines and drop empty lines
/// (including the one after the final newline).
pub fn split_requests(data: &[u8]) -> Vec<String> {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end])
        .split('\n')
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Line framing for the long-lived control pipe, where a line may arrive
/// across several reads.
#[derive(Debug, Default)]
pub struct LineAccumulator {
    pending: Vec<u8>,
    // Set after an overflow; input is dropped up to the next newline
    discarding: bool,
}

impl LineAccumulator {
    pub fn new() -> Self {
        LineAccumulator::default()
    }

    /// Bytes received after the last complete line
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Append `data` and return every line it completed
    pub fn push(&mut self, mut data: &[u8]) -> Vec<String> {
        if self.discarding {
            match data.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    data = &data[pos + 1..];
                    self.discarding = false;
                }
                None => return Vec::new(),
            }
        }
        self.pending.extend_from_slice(data);

        let mut lines = Vec::new();
        let mut offset = 0;
        while let Some(pos) = self.pending[offset..].iter().position(|&b| b == b'\n') {
            let line = &self.pending[offset..offset + pos];
            if !line.is_empty() {
                lines.push(String::from_utf8_lossy(line).into_owned());
            }
            offset += pos + 1;
        }

        if offset > 0 {
            self.pending.drain(..offset);
        }

        if self.pending.len() > MAX_PENDING {
            warn!(bytes = self.pending.len(), "Discarding unterminated input");
            self.pending.clear();
            self.discarding = true;
        }

        lines
    }

    /// One blocking read from `transport`; returns the lines it completed,
    /// possibly none.
    pub fn read_from<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<Vec<String>> {
        let mut buf = vec![0u8; ATOMIC_WRITE_LIMIT];
        let n = transport.receive(&mut buf)?;
        if n == 0 {
            return Err(TransportError::PeerClosed);
        }
        Ok(self.push(&buf[..n]))
    }
}
