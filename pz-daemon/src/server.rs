//! Unix Socket Server
//!
//! Serves the control protocol: zone changes from the scheduler and settings
//! requests from the settings page.
//!
//! # Limits
//! - Maximum concurrent connections
//! - Read/write timeouts per message
//! - Maximum message size, enforced before buffering a whole line
//!
//! Every controller call runs on the blocking pool. A zone change waits for
//! startup to finish and must not stall the accept loop while it does.

use std::future::Future;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::time::timeout;
use tracing::{debug, error, info, trace, warn};

use pz_core::constants::daemon::{MAX_CONNECTIONS, SOCKET_MODE};
use pz_core::{Controller, LineClient};
use pz_protocol::{
    Request, RequestEnvelope, Response, ResponseData, ResponseEnvelope, MAX_MESSAGE_SIZE,
};

/// Read timeout per message
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Write timeout per message
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

static ACTIVE_CONNECTIONS: AtomicUsize = AtomicUsize::new(0);

async fn read_line_bounded<R: tokio::io::AsyncBufRead + Unpin>(
    reader: &mut R,
    out: &mut Vec<u8>,
    max_len: usize,
) -> std::io::Result<usize> {
    out.clear();

    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(0);
        }

        let (take_len, found_newline) = match available.iter().position(|b| *b == b'\n') {
            Some(pos) => (pos + 1, true),
            None => (available.len(), false),
        };

        let remaining = max_len.saturating_sub(out.len());
        if take_len > remaining {
            let consume_len = remaining.min(available.len());
            reader.consume(consume_len);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "Message too large"));
        }

        out.extend_from_slice(&available[..take_len]);
        reader.consume(take_len);

        if found_newline {
            return Ok(out.len());
        }
    }
}

/// Bind the control socket, refusing to replace anything but an old socket
fn bind(socket_path: &Path) -> std::io::Result<UnixListener> {
    if let Ok(metadata) = socket_path.symlink_metadata() {
        if metadata.file_type().is_symlink() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "Socket path is a symlink - refusing to replace it",
            ));
        }
        std::fs::remove_file(socket_path)?;
        debug!("Removed stale socket {:?}", socket_path);
    }

    let listener = UnixListener::bind(socket_path)?;
    std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(SOCKET_MODE))?;
    Ok(listener)
}

/// Accept connections until `shutdown` resolves
pub async fn run_server<C, F>(
    socket_path: &Path,
    controller: Arc<Controller<C>>,
    shutdown: F,
) -> std::io::Result<()>
where
    C: LineClient + 'static,
    F: Future<Output = ()>,
{
    let listener = bind(socket_path)?;
    info!("Listening on {:?} (mode {:o}, max_conn={})", socket_path, SOCKET_MODE, MAX_CONNECTIONS);

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let current = ACTIVE_CONNECTIONS.load(Ordering::SeqCst);
                        if current >= MAX_CONNECTIONS {
                            warn!(
                                "Connection limit reached ({}), rejecting new connection",
                                current
                            );
                            drop(stream);
                            continue;
                        }

                        ACTIVE_CONNECTIONS.fetch_add(1, Ordering::SeqCst);
                        let controller = Arc::clone(&controller);
                        tokio::spawn(async move {
                            handle_client(stream, controller).await;
                            ACTIVE_CONNECTIONS.fetch_sub(1, Ordering::SeqCst);
                        });
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                    }
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown requested, closing control socket");
                break;
            }
        }
    }

    let _ = std::fs::remove_file(socket_path);
    Ok(())
}

async fn handle_client<C: LineClient + 'static>(
    stream: UnixStream,
    controller: Arc<Controller<C>>,
) {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line: Vec<u8> = Vec::with_capacity(1024);
    let mut request_count: u64 = 0;

    loop {
        let read = read_line_bounded(&mut reader, &mut line, MAX_MESSAGE_SIZE);
        match timeout(READ_TIMEOUT, read).await {
            Ok(Ok(0)) => {
                debug!("Client disconnected after {} request(s)", request_count);
                break;
            }
            Ok(Ok(n)) => {
                request_count += 1;
                trace!("Request #{}: {} bytes", request_count, n);

                let response = match std::str::from_utf8(&line) {
                    Ok(text) => process_request(text, &controller).await,
                    Err(_) => {
                        let response =
                            ResponseEnvelope::new(0, Response::error("Invalid request encoding"));
                        let _ = send_response(&mut writer, &response).await;
                        break;
                    }
                };

                if send_response(&mut writer, &response).await.is_err() {
                    break;
                }
            }
            Ok(Err(e)) => {
                if e.kind() == std::io::ErrorKind::InvalidData {
                    warn!("Message too large (>{} bytes), closing connection", MAX_MESSAGE_SIZE);
                    let response = ResponseEnvelope::new(0, Response::error("Message too large"));
                    let _ = send_response(&mut writer, &response).await;
                } else {
                    error!("Read error: {}", e);
                }
                break;
            }
            Err(_) => {
                debug!("Read timeout, closing connection");
                break;
            }
        }
    }
}

async fn send_response(
    writer: &mut tokio::net::unix::OwnedWriteHalf,
    response: &ResponseEnvelope,
) -> Result<(), ()> {
    let json = serde_json::to_string(response).unwrap_or_else(|_| {
        r#"{"id":0,"status":"error","message":"Serialization error"}"#.to_string()
    });

    let write_result = timeout(WRITE_TIMEOUT, async {
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        Ok::<_, std::io::Error>(())
    })
    .await;

    match write_result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            error!("Write error: {}", e);
            Err(())
        }
        Err(_) => {
            error!("Write timeout");
            Err(())
        }
    }
}

async fn process_request<C: LineClient + 'static>(
    line: &str,
    controller: &Arc<Controller<C>>,
) -> ResponseEnvelope {
    let envelope: RequestEnvelope = match serde_json::from_str(line.trim()) {
        Ok(e) => e,
        Err(e) => {
            debug!("Invalid request JSON: {}", e);
            return ResponseEnvelope::new(0, Response::error("Invalid request format"));
        }
    };

    let request_id = envelope.id;
    let request = envelope.request;

    if let Err(e) = request.validate() {
        warn!("Rejected {} (id={}): {}", request.type_name(), request_id, e);
        return ResponseEnvelope::new(request_id, Response::error(e));
    }

    debug!("Processing {} (id={})", request.type_name(), request_id);

    let controller = Arc::clone(controller);
    let response = match tokio::task::spawn_blocking(move || dispatch(request, &controller)).await {
        Ok(response) => response,
        Err(e) => {
            error!("Request handler failed: {}", e);
            Response::error("Internal error")
        }
    };

    ResponseEnvelope::new(request_id, response)
}

/// Run one request against the controller (blocking)
fn dispatch<C: LineClient + 'static>(
    request: Request,
    controller: &Arc<Controller<C>>,
) -> Response {
    match request {
        Request::Ping => Response::ok(ResponseData::string("pong".into())),

        Request::Version => Response::ok(ResponseData::string(env!("CARGO_PKG_VERSION").into())),

        Request::ZoneChange { stations } => {
            let report = controller.zone_change(stations);
            Response::ok(ResponseData::switched(report.summary()))
        }

        Request::GetSettings => Response::ok(ResponseData::settings(controller.settings_view())),

        Request::UpdateSettings { form } => match controller.apply_settings(&form) {
            Ok(outcome) => Response::ok(ResponseData::updated(outcome)),
            Err(e) => {
                if e.is_validation() {
                    info!("Settings rejected: {}", e);
                } else {
                    error!("Settings update failed: {}", e);
                }
                Response::error(e.to_string())
            }
        },

        Request::GetStatus => Response::ok(ResponseData::status(controller.status())),

        Request::Reinit => match controller.init_lines() {
            Ok(()) => Response::ok(ResponseData::status(controller.status())),
            Err(e) => {
                error!("Line init failed: {}", e);
                Response::error(e.to_string())
            }
        },
    }
}
