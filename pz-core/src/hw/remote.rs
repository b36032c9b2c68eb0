//! GPIO line-daemon client
//!
//! Talks to a separate GPIO server over a Unix socket, one JSON request per
//! line. The server owns the chip; this process only asks it to request,
//! release and write lines on its behalf.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use pz_protocol::{GpioCommand, GpioRequestEnvelope, GpioResponse, MAX_GPIO_MESSAGE_SIZE};

use crate::constants::timing::GPIO_CLIENT_TIMEOUT;
use crate::data::Level;
use crate::error::{PinzoneError, Result};

use super::client::{Direction, LineClient};

struct Connection {
    writer: UnixStream,
    reader: BufReader<UnixStream>,
}

impl Connection {
    fn open(socket_path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(socket_path).map_err(|e| {
            PinzoneError::DaemonConnection(format!(
                "Failed to connect to GPIO daemon at {:?}: {}",
                socket_path, e
            ))
        })?;

        let reader_stream = stream.try_clone().map_err(|e| {
            PinzoneError::DaemonConnection(format!("Failed to clone GPIO daemon socket: {}", e))
        })?;

        stream.set_read_timeout(Some(GPIO_CLIENT_TIMEOUT))?;
        stream.set_write_timeout(Some(GPIO_CLIENT_TIMEOUT))?;
        reader_stream.set_read_timeout(Some(GPIO_CLIENT_TIMEOUT))?;

        Ok(Self {
            writer: stream,
            reader: BufReader::new(reader_stream),
        })
    }
}

/// Client for the GPIO line daemon
pub struct GpioDaemonClient {
    socket_path: PathBuf,
    client_id: String,
    conn: Option<Connection>,
}

impl GpioDaemonClient {
    /// Create a client; the connection is opened lazily on first use
    pub fn new(socket_path: impl Into<PathBuf>, client_id: impl Into<String>) -> Self {
        Self {
            socket_path: socket_path.into(),
            client_id: client_id.into(),
            conn: None,
        }
    }

    /// Send a command and return the daemon's answer (success or not)
    pub fn send(&mut self, command: GpioCommand) -> Result<GpioResponse> {
        self.send_with_retry(command, true)
    }

    fn send_with_retry(
        &mut self,
        command: GpioCommand,
        allow_retry: bool,
    ) -> Result<GpioResponse> {
        command.validate().map_err(PinzoneError::IpcProtocol)?;

        let request_id = pz_protocol::generate_request_id();
        let envelope =
            GpioRequestEnvelope::with_id(command.clone(), self.client_id.as_str(), request_id);

        let mut json = serde_json::to_vec(&envelope)?;
        json.push(b'\n');
        if json.len() > MAX_GPIO_MESSAGE_SIZE {
            return Err(PinzoneError::MessageTooLarge {
                size: json.len(),
                max_size: MAX_GPIO_MESSAGE_SIZE,
            });
        }

        if self.conn.is_none() {
            self.conn = Some(Connection::open(&self.socket_path)?);
        }

        // Only a request that never left is safe to resend; the daemon may
        // have applied one whose answer was lost.
        if let Err(e) = self.write_request(&json) {
            self.conn = None;
            if !allow_retry {
                return Err(e);
            }
            debug!("GPIO daemon connection stale ({}), reconnecting", e);
            return self.send_with_retry(command, false);
        }

        match self.read_response() {
            Ok(buf) => self.parse_response(&buf, request_id),
            Err(e) => {
                self.conn = None;
                Err(e)
            }
        }
    }

    fn connection(&mut self) -> Result<&mut Connection> {
        self.conn
            .as_mut()
            .ok_or_else(|| PinzoneError::DaemonConnection("not connected".into()))
    }

    fn write_request(&mut self, json: &[u8]) -> Result<()> {
        self.connection()?
            .writer
            .write_all(json)
            .map_err(|e| PinzoneError::DaemonConnection(format!("Failed to send request: {}", e)))
    }

    fn read_response(&mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(256);
        self.connection()?
            .reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| {
                PinzoneError::DaemonConnection(format!("Failed to read response: {}", e))
            })?;

        if buf.is_empty() {
            return Err(PinzoneError::DaemonConnection("GPIO daemon closed connection".into()));
        }
        Ok(buf)
    }

    fn parse_response(&mut self, mut buf: &[u8], request_id: u64) -> Result<GpioResponse> {
        if buf.len() > MAX_GPIO_MESSAGE_SIZE {
            self.conn = None;
            return Err(PinzoneError::MessageTooLarge {
                size: buf.len(),
                max_size: MAX_GPIO_MESSAGE_SIZE,
            });
        }

        if let Some((b'\n', rest)) = buf.split_last() {
            buf = rest;
        }

        let response: GpioResponse = serde_json::from_slice(buf)
            .map_err(|e| PinzoneError::IpcProtocol(format!("Failed to parse response: {}", e)))?;

        if response.id != request_id {
            // Out of sync; drop the connection so the next call starts clean
            self.conn = None;
            return Err(PinzoneError::IpcProtocol(format!(
                "Response ID mismatch: expected {}, got {}",
                request_id, response.id
            )));
        }

        Ok(response)
    }
}

fn refusal(response: &GpioResponse) -> String {
    response
        .message
        .clone()
        .unwrap_or_else(|| "refused by GPIO daemon".to_string())
}

impl LineClient for GpioDaemonClient {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn request_line(&mut self, line: u32, direction: Direction) -> Result<()> {
        let response = self
            .send(GpioCommand::RequestPin { line, direction })
            .map_err(|e| PinzoneError::LineRequest { line, reason: e.to_string() })?;
        if !response.success {
            return Err(PinzoneError::LineRequest { line, reason: refusal(&response) });
        }
        Ok(())
    }

    fn release_line(&mut self, line: u32) -> Result<()> {
        let response = self
            .send(GpioCommand::ReleasePin { line })
            .map_err(|e| PinzoneError::LineRelease { line, reason: e.to_string() })?;
        if !response.success {
            warn!("GPIO daemon refused release of GPIO{}: {}", line, refusal(&response));
            return Err(PinzoneError::LineRelease { line, reason: refusal(&response) });
        }
        Ok(())
    }

    fn write_line(&mut self, line: u32, level: Level) -> Result<()> {
        let response = self
            .send(GpioCommand::WritePin { line, value: level.as_u8() })
            .map_err(|e| PinzoneError::LineWrite { line, reason: e.to_string() })?;
        if !response.success {
            return Err(PinzoneError::LineWrite { line, reason: refusal(&response) });
        }
        Ok(())
    }
}
