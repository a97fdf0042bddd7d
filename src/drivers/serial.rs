use std::io::Read;
use std::time::Duration;

use log::info;
use serialport::SerialPort;

use crate::drivers::error::PipelineError;
use crate::drivers::source::{LinePoll, LineSource};

/// Read timeout for one poll of the port. Short enough that the reader stays
/// responsive to shutdown, long enough not to spin between packets.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

const CHUNK_SIZE: usize = 256;

/// Line-oriented session over a serial device.
///
/// Bytes accumulate in `pending` until a `\n` arrives; carriage returns are
/// stripped so CRLF firmware output parses the same as LF. A read timeout is
/// not an error, it just means the device is quiet right now.
pub struct SerialLineSource {
    port_name: String,
    port: Box<dyn SerialPort>,
    pending: Vec<u8>,
}

impl SerialLineSource {
    /// Opens the port, or fails pipeline startup; nothing can run without its
    /// byte source. The port is released again when the session drops.
    pub fn connect(port_name: &str, baud_rate: u32) -> Result<Self, PipelineError> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(READ_TIMEOUT)
            .open()?;
        info!("opened {port_name} at {baud_rate} baud");
        Ok(Self {
            port_name: port_name.to_string(),
            port,
            pending: Vec::new(),
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

/// Pops the first complete line out of `pending`, if one has arrived.
fn take_line(pending: &mut Vec<u8>) -> Option<String> {
    let newline = pending.iter().position(|&b| b == b'\n')?;
    let mut raw: Vec<u8> = pending.drain(..=newline).collect();
    raw.pop();
    if raw.last() == Some(&b'\r') {
        raw.pop();
    }
    Some(String::from_utf8_lossy(&raw).into_owned())
}

impl LineSource for SerialLineSource {
    fn next_line(&mut self) -> Result<LinePoll, PipelineError> {
        loop {
            if let Some(line) = take_line(&mut self.pending) {
                return Ok(LinePoll::Line(line));
            }
            let mut chunk = [0u8; CHUNK_SIZE];
            match self.port.read(&mut chunk) {
                // Some platforms report an elapsed timeout as a zero-length
                // read; either way the device is just quiet.
                Ok(0) => return Ok(LinePoll::Empty),
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(err) if err.kind() == std::io::ErrorKind::TimedOut => {
                    return Ok(LinePoll::Empty)
                }
                Err(err) => return Err(PipelineError::SourceRead(err)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_complete_lines_and_strips_cr() {
        let mut pending = b"1 2 3 4 5 6\r\n0.1 0.2".to_vec();
        assert_eq!(take_line(&mut pending).as_deref(), Some("1 2 3 4 5 6"));
        assert_eq!(pending, b"0.1 0.2");
    }

    #[test]
    fn partial_lines_stay_buffered() {
        let mut pending = b"1 2 3".to_vec();
        assert_eq!(take_line(&mut pending), None);
        pending.extend_from_slice(b" 4 5 6\n");
        assert_eq!(take_line(&mut pending).as_deref(), Some("1 2 3 4 5 6"));
        assert!(pending.is_empty());
    }

    #[test]
    fn consecutive_newlines_yield_empty_lines() {
        let mut pending = b"\n\nx\n".to_vec();
        assert_eq!(take_line(&mut pending).as_deref(), Some(""));
        assert_eq!(take_line(&mut pending).as_deref(), Some(""));
        assert_eq!(take_line(&mut pending).as_deref(), Some("x"));
        assert_eq!(take_line(&mut pending), None);
    }
}
