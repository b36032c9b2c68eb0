use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global request ID counter for correlation
static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Maximum message size for IPC (64KB, a full settings form fits comfortably)
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Maximum message size on the GPIO line-daemon socket
pub const MAX_GPIO_MESSAGE_SIZE: usize = 8 * 1024;

/// Highest physical header pin number
pub const MAX_PHYSICAL_PIN: u8 = 40;

/// Upper bound on stations accepted in a single zone change
pub const MAX_STATIONS: usize = 256;

/// Upper bound on a single free-text note
pub const MAX_NOTES_LEN: usize = 256;

/// Upper bound on the number of fields in a settings form
const MAX_FORM_FIELDS: usize = 3 * MAX_PHYSICAL_PIN as usize + 8;

/// Highest hardware line number accepted on the wire
const MAX_LINE_NUMBER: u32 = 4096;

const FORM_FIELD_PREFIXES: &[&str] = &["notes_", "enable_", "order_"];

/// Generate a unique request ID for correlation
pub fn generate_request_id() -> u64 {
    REQUEST_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

// ============================================================================
// GPIO line-daemon protocol (spoken by the remote backend)
// ============================================================================

/// Line direction requested from the GPIO daemon
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    In,
    Out,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "cmd", content = "data", rename_all = "snake_case")]
pub enum GpioCommand {
    RequestPin { line: u32, direction: Direction },
    ReleasePin { line: u32 },
    WritePin { line: u32, value: u8 },
}

impl GpioCommand {
    pub fn line(&self) -> u32 {
        match self {
            GpioCommand::RequestPin { line, .. }
            | GpioCommand::ReleasePin { line }
            | GpioCommand::WritePin { line, .. } => *line,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_line(self.line())?;
        if let GpioCommand::WritePin { value, .. } = self {
            if *value > 1 {
                return Err(format!("Invalid line value {} (must be 0 or 1)", value));
            }
        }
        Ok(())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            GpioCommand::RequestPin { .. } => "request_pin",
            GpioCommand::ReleasePin { .. } => "release_pin",
            GpioCommand::WritePin { .. } => "write_pin",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpioRequestEnvelope {
    pub id: u64,
    /// Identifies the owner of requested lines to the GPIO daemon
    pub client_id: String,
    #[serde(flatten)]
    pub command: GpioCommand,
}

impl GpioRequestEnvelope {
    pub fn with_id(command: GpioCommand, client_id: impl Into<String>, id: u64) -> Self {
        Self {
            id,
            client_id: client_id.into(),
            command,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GpioResponse {
    pub id: u64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl GpioResponse {
    pub fn ok(id: u64) -> Self {
        Self { id, success: true, message: None }
    }

    pub fn failed(id: u64, message: impl Into<String>) -> Self {
        Self { id, success: false, message: Some(message.into()) }
    }
}

// ============================================================================
// Control protocol (spoken by the host application to pinzoned)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Unique request ID for correlation and debugging
    pub id: u64,
    /// The actual request
    #[serde(flatten)]
    pub request: Request,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "data", rename_all = "snake_case")]
pub enum Request {
    Ping,
    Version,
    /// The scheduler changed zone state; `stations[s]` is "station s commanded on"
    ZoneChange { stations: Vec<bool> },
    GetSettings,
    /// Raw settings form (`notes_i`, `enable_i`, `order_i`, `active`)
    UpdateSettings { form: BTreeMap<String, String> },
    GetStatus,
    /// Re-run line initialization (caller-driven retry after a request failure)
    Reinit,
}

impl Request {
    /// Validate request parameters before sending to daemon
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Request::Ping | Request::Version | Request::GetSettings
            | Request::GetStatus | Request::Reinit => Ok(()),

            Request::ZoneChange { stations } => {
                if stations.len() > MAX_STATIONS {
                    return Err(format!(
                        "Too many stations: {} (max {})",
                        stations.len(),
                        MAX_STATIONS
                    ));
                }
                Ok(())
            }

            Request::UpdateSettings { form } => validate_settings_form(form),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Request::Ping => "Ping",
            Request::Version => "Version",
            Request::ZoneChange { .. } => "ZoneChange",
            Request::GetSettings => "GetSettings",
            Request::UpdateSettings { .. } => "UpdateSettings",
            Request::GetStatus => "GetStatus",
            Request::Reinit => "Reinit",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Request ID this response corresponds to
    pub id: u64,
    /// The actual response
    #[serde(flatten)]
    pub response: Response,
}

impl ResponseEnvelope {
    pub fn new(id: u64, response: Response) -> Self {
        Self { id, response }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum Response {
    #[serde(rename = "ok")]
    Ok(ResponseData),
    #[serde(rename = "error")]
    Error { message: String },
}

impl Response {
    pub fn ok(data: ResponseData) -> Self {
        Response::Ok(data)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Response::Error { message: message.into() }
    }
}

/// Response data; at most one field is populated per request type
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<SettingsView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub switch: Option<SwitchSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<UpdateOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DaemonStatus>,
}

impl ResponseData {
    pub fn none() -> Self { Self::default() }
    pub fn string(v: String) -> Self { Self { value: Some(v), ..Self::default() } }
    pub fn settings(s: SettingsView) -> Self { Self { settings: Some(s), ..Self::default() } }
    pub fn switched(s: SwitchSummary) -> Self { Self { switch: Some(s), ..Self::default() } }
    pub fn updated(u: UpdateOutcome) -> Self { Self { update: Some(u), ..Self::default() } }
    pub fn status(s: DaemonStatus) -> Self { Self { status: Some(s), ..Self::default() } }
}

/// One row of the settings page, covering every physical header pin
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PinRow {
    pub pin: u8,
    pub label: String,
    pub gpio_capable: bool,
    /// Hardware line, absent when the platform has none for this pin
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub notes: String,
    pub enabled: bool,
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SettingsView {
    /// "high" or "low"
    pub active: String,
    pub pins: Vec<PinRow>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub changed: bool,
    pub reinit: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SwitchSummary {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DaemonStatus {
    pub config_loaded: bool,
    pub lines_ready: bool,
    pub held_lines: Vec<u32>,
    pub backend: String,
}

// ============================================================================
// Validation
// ============================================================================

pub fn validate_line(line: u32) -> Result<(), String> {
    if line == 0 || line > MAX_LINE_NUMBER {
        return Err(format!("Line number out of range: {} (1-{})", line, MAX_LINE_NUMBER));
    }
    Ok(())
}

/// Shape-only checks; semantic validation happens in the reconciler
pub fn validate_settings_form(form: &BTreeMap<String, String>) -> Result<(), String> {
    if form.len() > MAX_FORM_FIELDS {
        return Err(format!("Too many form fields: {} (max {})", form.len(), MAX_FORM_FIELDS));
    }

    for (key, value) in form {
        if key == "active" {
            continue;
        }

        let index = FORM_FIELD_PREFIXES
            .iter()
            .find_map(|prefix| key.strip_prefix(prefix))
            .ok_or_else(|| format!("Unknown form field: {}", key))?;

        match index.parse::<u8>() {
            Ok(i) if (1..=MAX_PHYSICAL_PIN).contains(&i) => {}
            _ => {
                return Err(format!(
                    "Form field {} does not name a pin 1-{}",
                    key, MAX_PHYSICAL_PIN
                ))
            }
        }

        if value.len() > MAX_NOTES_LEN {
            return Err(format!(
                "Form field {} too long ({} bytes, max {})",
                key,
                value.len(),
                MAX_NOTES_LEN
            ));
        }
        if value.contains('\0') {
            return Err(format!("Form field {} contains a null byte", key));
        }
    }

    Ok(())
}
