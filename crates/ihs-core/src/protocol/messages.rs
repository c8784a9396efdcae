//! Broadcast-protocol message types.
//!
//! Every datagram carries a [`BroadcastHeader`] followed by one body message,
//! both protobuf-encoded (proto2 semantics: every field is optional and an
//! explicitly set default value is still written to the wire).  Only the
//! messages involved in device authorization are modelled here; the others
//! are recognised by [`MessageType`] so they can be routed or ignored.

use std::fmt;

// ── Message type codes ────────────────────────────────────────────────────────

/// All message type codes carried in [`BroadcastHeader::msg_type`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum MessageType {
    Discovery = 0,
    Status = 1,
    Offline = 2,
    DeviceAuthorizationRequest = 3,
    DeviceAuthorizationResponse = 4,
    DeviceStreamingRequest = 5,
    DeviceStreamingResponse = 6,
    DeviceProofRequest = 7,
    DeviceProofResponse = 8,
    DeviceAuthorizationCancelRequest = 9,
    DeviceStreamingCancelRequest = 10,
    ClientIdDeconflict = 11,
    StreamTransportSignal = 12,
    StreamingProgress = 13,
}

// ── Header ────────────────────────────────────────────────────────────────────

/// Header prepended to every broadcast-protocol body.
#[derive(Clone, PartialEq, prost::Message)]
pub struct BroadcastHeader {
    /// Identifier of the sending device.
    #[prost(uint64, optional, tag = "1")]
    pub client_id: Option<u64>,
    /// Raw [`MessageType`] of the body.
    #[prost(enumeration = "MessageType", optional, tag = "2")]
    pub msg_type: Option<i32>,
    /// Random value identifying one run of the sending process.
    #[prost(uint64, optional, tag = "3")]
    pub instance_id: Option<u64>,
}

impl BroadcastHeader {
    /// Builds a header for a message of type `kind`.
    pub fn for_message(kind: MessageType, client_id: u64, instance_id: u64) -> Self {
        Self {
            client_id: Some(client_id),
            msg_type: Some(kind as i32),
            instance_id: Some(instance_id),
        }
    }

    /// Returns the decoded message type, or `None` when the field is absent
    /// or carries a value this client does not know.
    pub fn kind(&self) -> Option<MessageType> {
        self.msg_type.and_then(|raw| MessageType::try_from(raw).ok())
    }
}

// ── Authorization request ─────────────────────────────────────────────────────

/// DEVICE_AUTHORIZATION_REQUEST (3): sent by the client on every retry tick.
#[derive(Clone, PartialEq, prost::Message)]
pub struct DeviceAuthorizationRequest {
    /// Device token, sent in clear.
    #[prost(bytes = "vec", optional, tag = "1")]
    pub device_token: Option<Vec<u8>>,
    /// Display name of the requesting device.
    #[prost(string, optional, tag = "2")]
    pub device_name: Option<String>,
    /// RSA-encrypted, serialized [`KeyEscrowTicket`].
    #[prost(bytes = "vec", optional, tag = "3")]
    pub encrypted_request: Option<Vec<u8>>,
}

/// Plaintext escrow ticket, serialized and encrypted into
/// [`DeviceAuthorizationRequest::encrypted_request`].
///
/// Fields 4 and 7–9 belong to the schema but are never set by this client.
#[derive(Clone, PartialEq, prost::Message)]
pub struct KeyEscrowTicket {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub password: Option<Vec<u8>>,
    #[prost(uint64, optional, tag = "2")]
    pub identifier: Option<u64>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub payload: Option<Vec<u8>>,
    #[prost(uint32, optional, tag = "4")]
    pub timestamp: Option<u32>,
    #[prost(int32, optional, tag = "5")]
    pub usage: Option<i32>,
    #[prost(string, optional, tag = "6")]
    pub device_name: Option<String>,
    #[prost(string, optional, tag = "7")]
    pub device_model: Option<String>,
    #[prost(string, optional, tag = "8")]
    pub device_serial: Option<String>,
    #[prost(uint32, optional, tag = "9")]
    pub device_provisioning_id: Option<u32>,
}

// ── Authorization response ────────────────────────────────────────────────────

/// DEVICE_AUTHORIZATION_RESPONSE (4): the host's verdict on a request.
#[derive(Clone, PartialEq, prost::Message)]
pub struct DeviceAuthorizationResponse {
    /// Raw [`AuthorizationResult`] code.
    #[prost(int32, optional, tag = "1")]
    pub result: Option<i32>,
    /// Account the device was authorized for (success only).
    #[prost(fixed64, optional, tag = "2")]
    pub steamid: Option<u64>,
}

impl DeviceAuthorizationResponse {
    /// Returns the result code; an absent field means the first enum value,
    /// [`AuthorizationResult::Success`], as proto2 defaults dictate.
    pub fn outcome(&self) -> AuthorizationResult {
        AuthorizationResult::from(self.result.unwrap_or(0))
    }

    /// Returns the account identifier, or 0 when the host did not send one.
    pub fn account_id(&self) -> u64 {
        self.steamid.unwrap_or(0)
    }
}

/// Result codes a host may return for an authorization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthorizationResult {
    Success,
    /// The PIN was wrong or the user rejected the device on the host.
    Denied,
    NotLoggedIn,
    Offline,
    Busy,
    /// The host is still waiting for the user; keep retrying.
    InProgress,
    TimedOut,
    Failed,
    Canceled,
    /// A code this client does not know.
    Unknown(i32),
}

impl AuthorizationResult {
    /// Returns the wire value of this result.
    pub fn code(self) -> i32 {
        match self {
            AuthorizationResult::Success => 0,
            AuthorizationResult::Denied => 1,
            AuthorizationResult::NotLoggedIn => 2,
            AuthorizationResult::Offline => 3,
            AuthorizationResult::Busy => 4,
            AuthorizationResult::InProgress => 5,
            AuthorizationResult::TimedOut => 6,
            AuthorizationResult::Failed => 7,
            AuthorizationResult::Canceled => 8,
            AuthorizationResult::Unknown(code) => code,
        }
    }
}

impl From<i32> for AuthorizationResult {
    fn from(value: i32) -> Self {
        match value {
            0 => AuthorizationResult::Success,
            1 => AuthorizationResult::Denied,
            2 => AuthorizationResult::NotLoggedIn,
            3 => AuthorizationResult::Offline,
            4 => AuthorizationResult::Busy,
            5 => AuthorizationResult::InProgress,
            6 => AuthorizationResult::TimedOut,
            7 => AuthorizationResult::Failed,
            8 => AuthorizationResult::Canceled,
            other => AuthorizationResult::Unknown(other),
        }
    }
}

impl fmt::Display for AuthorizationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthorizationResult::Success => f.write_str("success"),
            AuthorizationResult::Denied => f.write_str("denied"),
            AuthorizationResult::NotLoggedIn => f.write_str("host not logged in"),
            AuthorizationResult::Offline => f.write_str("host offline"),
            AuthorizationResult::Busy => f.write_str("host busy"),
            AuthorizationResult::InProgress => f.write_str("in progress"),
            AuthorizationResult::TimedOut => f.write_str("timed out"),
            AuthorizationResult::Failed => f.write_str("failed"),
            AuthorizationResult::Canceled => f.write_str("canceled"),
            AuthorizationResult::Unknown(code) => write!(f, "unknown result {code}"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
