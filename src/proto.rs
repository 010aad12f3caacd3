//! # Wire Format
//!
//! Typed records for every payload the fleet puts on the wire, plus the
//! JSON codec boundary. All payloads are compact JSON objects; encoding
//! and decoding go through [`encode`] and [`decode`] so the rest of the
//! crate never touches serialization details.
//!
//! Wire envelopes:
//! - discovery announce: `{"nodeId","type","ip","mac","version","capabilities"}`
//! - status: `{"nodeId","status","timestamp","ip","rssi","heap"}`
//! - will: `{"nodeId","status","reason"}`
//! - heartbeat: `{"nodeId","timestamp","heap"}`
//! - command: `{"from","command","params","timestamp"}`
//! - firmware notice: `{"version","url","timestamp"}`

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::error::ProtoError;

/// Longest node identifier accepted on the wire.
pub const MAX_NODE_ID_LEN: usize = 32;
/// Longest zone identifier accepted on the wire.
pub const MAX_ZONE_LEN: usize = 32;
/// Dotted-quad IPv4 text.
pub const MAX_ADDR_LEN: usize = 16;
/// Colon-separated EUI-48 text.
pub const MAX_HWADDR_LEN: usize = 17;
/// Semver-ish firmware version text.
pub const MAX_VERSION_LEN: usize = 16;
/// Firmware download URL.
pub const MAX_URL_LEN: usize = 128;
/// Free-form status word ("online", "offline", ...).
pub const MAX_STATUS_LEN: usize = 16;

const MAX_COMMAND_LEN: usize = 24;

/// Owned node identifier, sized for the wire limit.
pub type NodeId = String<MAX_NODE_ID_LEN>;

/// Delivery guarantee requested from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum QoS {
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

/// What kind of node is announcing itself.
///
/// Encoded as a bare integer on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum NodeRole {
    Coordinator = 0,
    Fixture = 1,
    Gateway = 2,
    Sensor = 3,
}

impl From<NodeRole> for u8 {
    fn from(role: NodeRole) -> u8 {
        role as u8
    }
}

impl TryFrom<u8> for NodeRole {
    type Error = ProtoError;

    fn try_from(value: u8) -> Result<Self, ProtoError> {
        match value {
            0 => Ok(NodeRole::Coordinator),
            1 => Ok(NodeRole::Fixture),
            2 => Ok(NodeRole::Gateway),
            3 => Ok(NodeRole::Sensor),
            _ => Err(ProtoError::Malformed),
        }
    }
}

/// Feature flags a node advertises in its discovery announce.
///
/// The set is closed: both ends of the fleet compile against the same
/// list, and fields absent on the wire decode as `false`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Capabilities {
    #[serde(default)]
    pub ota: bool,
    #[serde(default)]
    pub telemetry: bool,
    #[serde(default)]
    pub commands: bool,
    #[serde(default)]
    pub dimming: bool,
    #[serde(default)]
    pub current_sensor: bool,
    #[serde(default)]
    pub light_sensor: bool,
    #[serde(default)]
    pub auto_mode: bool,
}

/// Self-description a node broadcasts on the discovery topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryAnnounce {
    #[serde(rename = "nodeId")]
    pub node_id: NodeId,
    #[serde(rename = "type")]
    pub role: NodeRole,
    #[serde(default)]
    pub ip: String<MAX_ADDR_LEN>,
    #[serde(default)]
    pub mac: String<MAX_HWADDR_LEN>,
    #[serde(default)]
    pub version: String<MAX_VERSION_LEN>,
    #[serde(default)]
    pub capabilities: Capabilities,
}

/// Retained presence record published on a node's status topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    #[serde(rename = "nodeId")]
    pub node_id: NodeId,
    pub status: String<MAX_STATUS_LEN>,
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default)]
    pub ip: String<MAX_ADDR_LEN>,
    #[serde(default)]
    pub rssi: i16,
    #[serde(default)]
    pub heap: u32,
}

/// Payload the broker publishes for us if the session dies uncleanly.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct WillMessage<'a> {
    #[serde(rename = "nodeId")]
    pub node_id: &'a str,
    pub status: &'a str,
    pub reason: &'a str,
}

/// Lightweight liveness beacon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    #[serde(rename = "nodeId")]
    pub node_id: NodeId,
    pub timestamp: u64,
    #[serde(default)]
    pub heap: u32,
}

/// Retained firmware availability notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtaNotice {
    pub version: String<MAX_VERSION_LEN>,
    pub url: String<MAX_URL_LEN>,
    #[serde(default)]
    pub timestamp: u64,
}

/// Generic outbound command envelope. Most callers go through
/// [`encode_command`]; this is public for firmware that extends the
/// vocabulary with its own parameter types.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Envelope<'a, P> {
    pub from: &'a str,
    pub command: &'a str,
    pub params: P,
    pub timestamp: u64,
}

/// The closed command vocabulary of the fleet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Turn the light on, optionally at a given brightness.
    On { brightness: u8 },
    Off,
    Toggle,
    SetBrightness { brightness: u8 },
    /// Move the node to another zone. Takes effect on the next boot or
    /// when the firmware re-subscribes.
    SetZone { zone: String<MAX_ZONE_LEN> },
    /// Configure the autonomous on/off schedule. Times are HHMM.
    SetAuto { enabled: bool, on_time: u16, off_time: u16 },
    GetStatus,
    GetTelemetry,
    Restart,
    FactoryReset,
    AllOn,
    AllOff,
    /// Ask the node to fetch and flash the given firmware version.
    OtaUpdate { version: String<MAX_VERSION_LEN> },
}

impl Command {
    /// Wire name of the command verb.
    pub fn name(&self) -> &'static str {
        match self {
            Command::On { .. } => "on",
            Command::Off => "off",
            Command::Toggle => "toggle",
            Command::SetBrightness { .. } => "set_brightness",
            Command::SetZone { .. } => "set_zone",
            Command::SetAuto { .. } => "set_auto",
            Command::GetStatus => "get_status",
            Command::GetTelemetry => "get_telemetry",
            Command::Restart => "restart",
            Command::FactoryReset => "factory_reset",
            Command::AllOn => "all_on",
            Command::AllOff => "all_off",
            Command::OtaUpdate { .. } => "ota_update",
        }
    }
}

/// A decoded inbound command with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingCommand {
    pub from: NodeId,
    pub command: Command,
    pub timestamp: u64,
}

#[derive(Serialize)]
struct NoParams {}

#[derive(Serialize)]
struct BrightnessParams {
    brightness: u8,
}

#[derive(Serialize)]
struct ZoneParams<'a> {
    zone: &'a str,
}

#[derive(Serialize)]
struct AutoParams {
    enabled: bool,
    on_time: u16,
    off_time: u16,
}

#[derive(Serialize)]
struct VersionParams<'a> {
    version: &'a str,
}

// Superset of every command's parameters. serde-json-core cannot drive
// an internally tagged enum, so the frame is decoded loose and mapped
// to `Command` by hand.
#[derive(Debug, Default, Deserialize)]
struct RawParams {
    #[serde(default)]
    brightness: Option<u8>,
    #[serde(default)]
    zone: Option<String<MAX_ZONE_LEN>>,
    #[serde(default)]
    enabled: Option<bool>,
    #[serde(default)]
    on_time: Option<u16>,
    #[serde(default)]
    off_time: Option<u16>,
    #[serde(default)]
    version: Option<String<MAX_VERSION_LEN>>,
}

#[derive(Deserialize)]
struct CommandFrame {
    #[serde(default)]
    from: NodeId,
    command: String<MAX_COMMAND_LEN>,
    #[serde(default)]
    params: RawParams,
    #[serde(default)]
    timestamp: u64,
}

/// Encodes any wire record into `buf`, returning the encoded length.
pub fn encode<T: Serialize>(value: &T, buf: &mut [u8]) -> Result<usize, ProtoError> {
    serde_json_core::to_slice(value, buf).map_err(|_| ProtoError::BufferTooSmall)
}

/// Decodes one wire record from `payload`. Unknown fields are skipped.
pub fn decode<'a, T: Deserialize<'a>>(payload: &'a [u8]) -> Result<T, ProtoError> {
    serde_json_core::from_slice(payload)
        .map(|(value, _)| value)
        .map_err(|_| ProtoError::Malformed)
}

/// Encodes `command` into a full envelope with sender and timestamp.
pub fn encode_command(
    from: &str,
    command: &Command,
    timestamp: u64,
    buf: &mut [u8],
) -> Result<usize, ProtoError> {
    let name = command.name();
    match command {
        Command::On { brightness } | Command::SetBrightness { brightness } => encode(
            &Envelope {
                from,
                command: name,
                params: BrightnessParams { brightness: *brightness },
                timestamp,
            },
            buf,
        ),
        Command::SetZone { zone } => encode(
            &Envelope {
                from,
                command: name,
                params: ZoneParams { zone: zone.as_str() },
                timestamp,
            },
            buf,
        ),
        Command::SetAuto { enabled, on_time, off_time } => encode(
            &Envelope {
                from,
                command: name,
                params: AutoParams {
                    enabled: *enabled,
                    on_time: *on_time,
                    off_time: *off_time,
                },
                timestamp,
            },
            buf,
        ),
        Command::OtaUpdate { version } => encode(
            &Envelope {
                from,
                command: name,
                params: VersionParams { version: version.as_str() },
                timestamp,
            },
            buf,
        ),
        _ => encode(
            &Envelope { from, command: name, params: NoParams {}, timestamp },
            buf,
        ),
    }
}

/// Decodes an inbound command envelope and maps it onto the vocabulary.
///
/// Omitted optional parameters take the fleet-wide defaults: `on` lights
/// at full brightness, `set_auto` falls back to the 18:00/06:00 schedule.
pub fn decode_command(payload: &[u8]) -> Result<IncomingCommand, ProtoError> {
    let frame: CommandFrame = decode(payload)?;
    let p = frame.params;
    let command = match frame.command.as_str() {
        "on" => Command::On { brightness: p.brightness.unwrap_or(100) },
        "off" => Command::Off,
        "toggle" => Command::Toggle,
        "set_brightness" => Command::SetBrightness {
            brightness: p.brightness.ok_or(ProtoError::Malformed)?,
        },
        "set_zone" => Command::SetZone { zone: p.zone.ok_or(ProtoError::Malformed)? },
        "set_auto" => Command::SetAuto {
            enabled: p.enabled.ok_or(ProtoError::Malformed)?,
            on_time: p.on_time.unwrap_or(1800),
            off_time: p.off_time.unwrap_or(600),
        },
        "get_status" => Command::GetStatus,
        "get_telemetry" => Command::GetTelemetry,
        "restart" => Command::Restart,
        "factory_reset" => Command::FactoryReset,
        "all_on" => Command::AllOn,
        "all_off" => Command::AllOff,
        "ota_update" => Command::OtaUpdate {
            version: p.version.ok_or(ProtoError::Malformed)?,
        },
        _ => return Err(ProtoError::UnknownCommand),
    };
    Ok(IncomingCommand { from: frame.from, command, timestamp: frame.timestamp })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s<const N: usize>(text: &str) -> String<N> {
        let mut out = String::new();
        out.push_str(text).unwrap();
        out
    }

    fn encoded(payload: &[u8]) -> &str {
        core::str::from_utf8(payload).unwrap()
    }

    // ===== ENCODING =====

    #[test]
    fn will_message_encodes_the_offline_record() {
        let will = WillMessage {
            node_id: "LUM_7",
            status: "offline",
            reason: "connection_lost",
        };
        let mut buf = [0u8; 128];
        let n = encode(&will, &mut buf).unwrap();
        assert_eq!(
            encoded(&buf[..n]),
            r#"{"nodeId":"LUM_7","status":"offline","reason":"connection_lost"}"#
        );
    }

    #[test]
    fn status_update_encodes_all_fields_in_order() {
        let status = StatusUpdate {
            node_id: s("LUM_7"),
            status: s("online"),
            timestamp: 1500,
            ip: s("192.168.1.50"),
            rssi: -67,
            heap: 24000,
        };
        let mut buf = [0u8; 256];
        let n = encode(&status, &mut buf).unwrap();
        assert_eq!(
            encoded(&buf[..n]),
            r#"{"nodeId":"LUM_7","status":"online","timestamp":1500,"ip":"192.168.1.50","rssi":-67,"heap":24000}"#
        );
    }

    #[test]
    fn heartbeat_encodes_compact() {
        let hb = Heartbeat { node_id: s("LUM_7"), timestamp: 30000, heap: 21000 };
        let mut buf = [0u8; 128];
        let n = encode(&hb, &mut buf).unwrap();
        assert_eq!(
            encoded(&buf[..n]),
            r#"{"nodeId":"LUM_7","timestamp":30000,"heap":21000}"#
        );
    }

    #[test]
    fn discovery_announce_encodes_role_as_integer() {
        let announce = DiscoveryAnnounce {
            node_id: s("CENTRAL"),
            role: NodeRole::Coordinator,
            ip: s("192.168.1.10"),
            mac: s("AA:BB:CC:DD:EE:FF"),
            version: s("0.7.0"),
            capabilities: Capabilities {
                ota: true,
                telemetry: true,
                commands: true,
                ..Capabilities::default()
            },
        };
        let mut buf = [0u8; 512];
        let n = encode(&announce, &mut buf).unwrap();
        let text = encoded(&buf[..n]);
        assert!(text.starts_with(r#"{"nodeId":"CENTRAL","type":0,"#), "got {}", text);
        assert!(text.contains(r#""capabilities":{"ota":true,"telemetry":true"#));
    }

    #[test]
    fn command_envelope_carries_sender_and_timestamp() {
        let mut buf = [0u8; 256];
        let n = encode_command("CENTRAL", &Command::On { brightness: 80 }, 42, &mut buf).unwrap();
        assert_eq!(
            encoded(&buf[..n]),
            r#"{"from":"CENTRAL","command":"on","params":{"brightness":80},"timestamp":42}"#
        );
    }

    #[test]
    fn parameterless_command_sends_empty_params() {
        let mut buf = [0u8; 256];
        let n = encode_command("CENTRAL", &Command::Off, 42, &mut buf).unwrap();
        assert_eq!(
            encoded(&buf[..n]),
            r#"{"from":"CENTRAL","command":"off","params":{},"timestamp":42}"#
        );
    }

    #[test]
    fn encode_reports_exhausted_buffer() {
        let mut buf = [0u8; 8];
        let result = encode_command("CENTRAL", &Command::Off, 42, &mut buf);
        assert_eq!(result, Err(ProtoError::BufferTooSmall));
    }

    // ===== DECODING =====

    #[test]
    fn on_defaults_to_full_brightness() {
        let payload = br#"{"from":"CENTRAL","command":"on","params":{},"timestamp":10}"#;
        let cmd = decode_command(payload).unwrap();
        assert_eq!(cmd.command, Command::On { brightness: 100 });
        assert_eq!(cmd.from.as_str(), "CENTRAL");
        assert_eq!(cmd.timestamp, 10);
    }

    #[test]
    fn on_with_missing_params_object_still_decodes() {
        let payload = br#"{"from":"CENTRAL","command":"on"}"#;
        let cmd = decode_command(payload).unwrap();
        assert_eq!(cmd.command, Command::On { brightness: 100 });
        assert_eq!(cmd.timestamp, 0);
    }

    #[test]
    fn set_brightness_requires_its_parameter() {
        let payload = br#"{"from":"CENTRAL","command":"set_brightness","params":{}}"#;
        assert_eq!(decode_command(payload), Err(ProtoError::Malformed));

        let payload = br#"{"from":"CENTRAL","command":"set_brightness","params":{"brightness":35}}"#;
        let cmd = decode_command(payload).unwrap();
        assert_eq!(cmd.command, Command::SetBrightness { brightness: 35 });
    }

    #[test]
    fn set_auto_falls_back_to_default_schedule() {
        let payload = br#"{"from":"CENTRAL","command":"set_auto","params":{"enabled":true}}"#;
        let cmd = decode_command(payload).unwrap();
        assert_eq!(
            cmd.command,
            Command::SetAuto { enabled: true, on_time: 1800, off_time: 600 }
        );
    }

    #[test]
    fn set_zone_carries_the_zone_name() {
        let payload = br#"{"from":"CENTRAL","command":"set_zone","params":{"zone":"plaza_norte"}}"#;
        let cmd = decode_command(payload).unwrap();
        assert_eq!(cmd.command, Command::SetZone { zone: s("plaza_norte") });
    }

    #[test]
    fn unknown_verb_is_distinguished_from_malformed_json() {
        let payload = br#"{"from":"CENTRAL","command":"jump","params":{}}"#;
        assert_eq!(decode_command(payload), Err(ProtoError::UnknownCommand));

        assert_eq!(decode_command(b"not json at all"), Err(ProtoError::Malformed));
        assert_eq!(decode_command(br#"{"params":{}}"#), Err(ProtoError::Malformed));
    }

    #[test]
    fn ota_update_round_trips() {
        let command = Command::OtaUpdate { version: s("0.8.1") };
        let mut buf = [0u8; 256];
        let n = encode_command("CENTRAL", &command, 99, &mut buf).unwrap();
        let cmd = decode_command(&buf[..n]).unwrap();
        assert_eq!(cmd.command, command);
        assert_eq!(cmd.from.as_str(), "CENTRAL");
    }

    #[test]
    fn discovery_decode_skips_unknown_fields() {
        let payload = br#"{"nodeId":"LUM_9","type":1,"ip":"192.168.1.60","mac":"AA:BB:CC:DD:EE:01","version":"0.7.0","capabilities":{"dimming":true,"telemetry":true},"rssi":-70}"#;
        let announce: DiscoveryAnnounce = decode(payload).unwrap();
        assert_eq!(announce.node_id.as_str(), "LUM_9");
        assert_eq!(announce.role, NodeRole::Fixture);
        assert!(announce.capabilities.dimming);
        assert!(announce.capabilities.telemetry);
        assert!(!announce.capabilities.ota);
    }

    #[test]
    fn discovery_decode_rejects_out_of_range_role() {
        let payload = br#"{"nodeId":"LUM_9","type":7}"#;
        let result: Result<DiscoveryAnnounce, _> = decode(payload);
        assert_eq!(result, Err(ProtoError::Malformed));
    }

    #[test]
    fn ota_notice_round_trips() {
        let notice = OtaNotice {
            version: s("0.8.0"),
            url: s("http://192.168.1.10/fw/0.8.0.bin"),
            timestamp: 777,
        };
        let mut buf = [0u8; 256];
        let n = encode(&notice, &mut buf).unwrap();
        let back: OtaNotice = decode(&buf[..n]).unwrap();
        assert_eq!(back, notice);
    }
}
