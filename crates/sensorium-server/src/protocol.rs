//! Wire protocol for client sessions.
//!
//! Every client→server message is one JSON object carrying a `"type"` tag:
//!
//! ```json
//! { "type": "sensor_data", "payload": { "timestamp"?, "temperature",
//!   "humidity", "light", "sensor_id"? } }
//! { "type": "get_all_data" }
//! ```
//!
//! One complete message per transport read — there is no length prefix or
//! delimiter, so framing is a correctness precondition on senders, not
//! something the receiver enforces.
//!
//! Replies are short fixed status strings for ingestion, or the full record
//! array (JSON) for `get_all_data`. The JSON codec itself (serde_json) is a
//! black box here; this module owns the mapping from codec failures to the
//! decode-error taxonomy and its reply strings.

use serde::Deserialize;

use sensorium_core::record::{SensorRecord, current_timestamp, normalize_timestamp};

/// Sensor id stored when the client omits one.
pub const UNKNOWN_SENSOR_ID: &str = "unknown";

/// Acknowledgement for a stored reading.
pub const REPLY_ACK: &str = "ok: data received";
/// Reply to a payload that is not well-formed JSON.
pub const REPLY_MALFORMED: &str = "error: invalid json payload";
/// Reply to a well-formed message whose `type` tag is not recognized.
pub const REPLY_UNKNOWN_TYPE: &str = "error: unknown message type";
/// Reply when the server itself fails to produce a response.
pub const REPLY_INTERNAL: &str = "error: internal server error";
/// Reply sent before closing a connection refused by the admission policy.
pub const REPLY_BUSY: &str = "error: server busy";

/// A decoded client request.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// One sensor reading to ingest.
    SensorData { payload: IngestPayload },
    /// Request for the full record log.
    GetAllData,
}

/// Ingestion payload as it arrives on the wire. The three metrics are
/// required; timestamp and sensor id are defaulted server-side.
#[derive(Debug, Deserialize)]
pub struct IngestPayload {
    #[serde(default)]
    pub timestamp: Option<String>,
    pub temperature: f64,
    pub humidity: f64,
    pub light: f64,
    #[serde(default)]
    pub sensor_id: Option<String>,
}

impl IngestPayload {
    /// Build the record that will be stored: timestamp normalized to the
    /// canonical format (or defaulted to now), sensor id defaulted to
    /// [`UNKNOWN_SENSOR_ID`].
    pub fn into_record(self) -> Result<SensorRecord, DecodeError> {
        let timestamp = match self.timestamp {
            Some(raw) => normalize_timestamp(&raw).ok_or_else(|| {
                DecodeError::InvalidField(format!("timestamp: not an RFC 3339 datetime: {raw}"))
            })?,
            None => current_timestamp(),
        };
        Ok(SensorRecord {
            timestamp,
            temperature: self.temperature,
            humidity: self.humidity,
            light: self.light,
            sensor_id: self.sensor_id.unwrap_or_else(|| UNKNOWN_SENSOR_ID.to_string()),
        })
    }
}

/// Why an inbound message could not be turned into a request.
///
/// All variants are recovered locally: the handler sends the reply and keeps
/// the connection open for further messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Not well-formed JSON at all.
    Malformed,
    /// Well-formed, but the `type` tag is not one of ours.
    UnknownType,
    /// A required field is absent (the name is reported to the client).
    MissingField(String),
    /// A field is present but unusable (wrong type, unparseable timestamp).
    InvalidField(String),
}

impl DecodeError {
    /// The fixed reply text for this error.
    pub fn reply(&self) -> String {
        match self {
            Self::Malformed => REPLY_MALFORMED.to_string(),
            Self::UnknownType => REPLY_UNKNOWN_TYPE.to_string(),
            Self::MissingField(field) => {
                format!("error: incomplete data, missing field: {field}")
            }
            Self::InvalidField(detail) => format!("error: invalid field: {detail}"),
        }
    }

    fn from_json(e: &serde_json::Error) -> Self {
        use serde_json::error::Category;
        match e.classify() {
            Category::Syntax | Category::Eof | Category::Io => Self::Malformed,
            Category::Data => {
                let msg = e.to_string();
                if msg.starts_with("unknown variant") {
                    Self::UnknownType
                } else if let Some(rest) = msg.strip_prefix("missing field `") {
                    let field = rest.split('`').next().unwrap_or("?");
                    Self::MissingField(field.to_string())
                } else {
                    // Strip serde_json's position suffix; the client gets the
                    // type mismatch itself, not our parser coordinates.
                    let detail = msg.split(" at line").next().unwrap_or(&msg);
                    Self::InvalidField(detail.to_string())
                }
            }
        }
    }
}

/// Decode one raw message into a [`ClientMessage`].
pub fn decode_message(raw: &str) -> Result<ClientMessage, DecodeError> {
    serde_json::from_str(raw).map_err(|e| DecodeError::from_json(&e))
}
