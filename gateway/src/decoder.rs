use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Error as JsonError, Value};
use std::{
    error::Error as StdError,
    fmt::{Display, Formatter, Result as FmtResult},
};
use strata_models::{
    gateway::{Dispatch, UnknownDispatch},
    presence::StatusUpdate,
};

pub mod opcode {
    pub const DISPATCH: u8 = 0;
    pub const HEARTBEAT: u8 = 1;
    pub const IDENTIFY: u8 = 2;
    pub const STATUS_UPDATE: u8 = 3;
    pub const VOICE_STATE_UPDATE: u8 = 4;
    pub const RESUME: u8 = 6;
    pub const RECONNECT: u8 = 7;
    pub const REQUEST_GUILD_MEMBERS: u8 = 8;
    pub const INVALID_SESSION: u8 = 9;
    pub const HELLO: u8 = 10;
    pub const HEARTBEAT_ACK: u8 = 11;
}

/// A gateway frame as it appears on the wire.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Envelope {
    pub op: u8,
    /// Event name, only set for dispatches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
    /// Sequence number, only set for dispatches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    #[serde(default)]
    pub d: Value,
}

impl Envelope {
    pub fn dispatch(name: impl Into<String>, sequence: u64, payload: Value) -> Self {
        Self {
            op: opcode::DISPATCH,
            t: Some(name.into()),
            s: Some(sequence),
            d: payload,
        }
    }

    /// Wraps an outgoing status update.
    pub fn status_update(update: &StatusUpdate) -> Result<Self, JsonError> {
        Ok(Self {
            op: opcode::STATUS_UPDATE,
            t: None,
            s: None,
            d: serde_json::to_value(update)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum GatewayEvent {
    Dispatch {
        sequence: Option<u64>,
        dispatch: Dispatch,
    },
    Heartbeat,
    Reconnect,
    InvalidSession {
        resumable: bool,
    },
    Hello {
        heartbeat_interval: u64,
    },
    HeartbeatAck,
    /// Opcodes that only matter to the connection itself.
    Other {
        op: u8,
        payload: Value,
    },
}

/// An envelope whose payload doesn't match the shape its event name promises.
#[derive(Debug)]
pub struct DecodeError {
    event: Option<String>,
    payload: Value,
    source: Option<JsonError>,
}

impl DecodeError {
    /// The event the payload was meant for. `None` when the envelope itself was malformed.
    pub fn event(&self) -> Option<&str> {
        self.event.as_deref()
    }

    pub const fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn into_parts(self) -> (Option<String>, Value, Option<JsonError>) {
        (self.event, self.payload, self.source)
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match (&self.event, &self.source) {
            (Some(event), Some(source)) => write!(f, "invalid {} payload: {}", event, source),
            (Some(event), None) => write!(f, "invalid {} payload", event),
            (None, Some(source)) => write!(f, "malformed envelope: {}", source),
            (None, None) => f.write_str("malformed envelope: dispatch without an event name"),
        }
    }
}

impl StdError for DecodeError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source as &(dyn StdError + 'static))
    }
}

#[derive(Deserialize)]
struct Hello {
    heartbeat_interval: u64,
}

fn from_payload<T: DeserializeOwned>(event: &str, payload: Value) -> Result<T, DecodeError> {
    T::deserialize(&payload).map_err(|source| DecodeError {
        event: Some(event.to_owned()),
        payload,
        source: Some(source),
    })
}

/// Turns an envelope into a typed event. Dispatch names this crate doesn't model come
/// back as [`Dispatch::Unknown`] rather than an error.
pub fn decode(envelope: Envelope) -> Result<GatewayEvent, DecodeError> {
    let Envelope { op, t, s, d } = envelope;
    match op {
        opcode::DISPATCH => match t {
            Some(name) => Ok(GatewayEvent::Dispatch {
                sequence: s,
                dispatch: decode_dispatch(&name, d)?,
            }),
            None => Err(DecodeError {
                event: None,
                payload: d,
                source: None,
            }),
        },
        opcode::HEARTBEAT => Ok(GatewayEvent::Heartbeat),
        opcode::RECONNECT => Ok(GatewayEvent::Reconnect),
        opcode::INVALID_SESSION => Ok(GatewayEvent::InvalidSession {
            resumable: d.as_bool().unwrap_or_default(),
        }),
        opcode::HELLO => {
            let hello = from_payload::<Hello>("HELLO", d)?;
            Ok(GatewayEvent::Hello {
                heartbeat_interval: hello.heartbeat_interval,
            })
        }
        opcode::HEARTBEAT_ACK => Ok(GatewayEvent::HeartbeatAck),
        op => Ok(GatewayEvent::Other { op, payload: d }),
    }
}

pub fn decode_dispatch(name: &str, payload: Value) -> Result<Dispatch, DecodeError> {
    let dispatch = match name {
        "CHANNEL_CREATE" => Dispatch::ChannelCreate(from_payload(name, payload)?),
        "CHANNEL_DELETE" => Dispatch::ChannelDelete(from_payload(name, payload)?),
        "CHANNEL_UPDATE" => Dispatch::ChannelUpdate(from_payload(name, payload)?),
        "GUILD_CREATE" => Dispatch::GuildCreate(Box::new(from_payload(name, payload)?)),
        "GUILD_DELETE" => Dispatch::GuildDelete(from_payload(name, payload)?),
        "GUILD_EMOJIS_UPDATE" => Dispatch::GuildEmojisUpdate(from_payload(name, payload)?),
        "GUILD_UPDATE" => Dispatch::GuildUpdate(from_payload(name, payload)?),
        "GUILD_MEMBER_ADD" => Dispatch::MemberAdd(Box::new(from_payload(name, payload)?)),
        "GUILD_MEMBERS_CHUNK" => Dispatch::MemberChunk(from_payload(name, payload)?),
        "GUILD_MEMBER_REMOVE" => Dispatch::MemberRemove(from_payload(name, payload)?),
        "GUILD_MEMBER_UPDATE" => Dispatch::MemberUpdate(Box::new(from_payload(name, payload)?)),
        "GUILD_ROLE_CREATE" => Dispatch::RoleCreate(from_payload(name, payload)?),
        "GUILD_ROLE_DELETE" => Dispatch::RoleDelete(from_payload(name, payload)?),
        "GUILD_ROLE_UPDATE" => Dispatch::RoleUpdate(from_payload(name, payload)?),
        "PRESENCE_UPDATE" => Dispatch::PresenceUpdate(Box::new(from_payload(name, payload)?)),
        "READY" => Dispatch::Ready(Box::new(from_payload(name, payload)?)),
        "USER_UPDATE" => Dispatch::UserUpdate(from_payload(name, payload)?),
        "VOICE_STATE_UPDATE" => {
            Dispatch::VoiceStateUpdate(Box::new(from_payload(name, payload)?))
        }
        _ => Dispatch::Unknown(UnknownDispatch {
            name: name.to_owned(),
            payload,
        }),
    };
    Ok(dispatch)
}

/// Parses raw frame bytes and decodes them.
pub fn decode_slice(bytes: &[u8]) -> Result<GatewayEvent, DecodeError> {
    let envelope = serde_json::from_slice::<Envelope>(bytes).map_err(|source| DecodeError {
        event: None,
        payload: Value::String(String::from_utf8_lossy(bytes).into_owned()),
        source: Some(source),
    })?;
    decode(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_models::{
        id::{GuildId, RoleId},
        presence::{Activity, Presence},
    };

    #[test]
    fn unknown_dispatches_pass_through() {
        let payload = json!({ "channel_id": "1", "user_id": 2, "nested": { "x": [1, 2] } });
        let event = decode(Envelope::dispatch("TYPING_START", 5, payload.clone())).unwrap();
        match event {
            GatewayEvent::Dispatch {
                sequence: Some(5),
                dispatch: Dispatch::Unknown(unknown),
            } => {
                assert_eq!(unknown.name, "TYPING_START");
                assert_eq!(unknown.payload, payload);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn known_dispatch_with_bad_payload_is_an_error() {
        let payload = json!({ "guild_id": "1" });
        let err = decode_dispatch("GUILD_ROLE_DELETE", payload.clone()).unwrap_err();
        assert_eq!(err.event(), Some("GUILD_ROLE_DELETE"));
        assert_eq!(err.payload(), &payload);
        assert!(err.to_string().starts_with("invalid GUILD_ROLE_DELETE payload"));
        assert!(StdError::source(&err).is_some());
    }

    #[test]
    fn ids_decode_from_strings_and_numbers() {
        let from_string =
            decode_dispatch("GUILD_ROLE_DELETE", json!({ "guild_id": "1", "role_id": "2" }))
                .unwrap();
        let from_number =
            decode_dispatch("GUILD_ROLE_DELETE", json!({ "guild_id": 1, "role_id": 2 })).unwrap();
        assert_eq!(from_string, from_number);
        match from_number {
            Dispatch::RoleDelete(delete) => {
                assert_eq!(delete.guild_id, GuildId::new(1));
                assert_eq!(delete.role_id, RoleId::new(2));
            }
            other => panic!("unexpected dispatch {:?}", other),
        }
    }

    #[test]
    fn dispatch_without_name_is_malformed() {
        let err = decode(Envelope {
            op: opcode::DISPATCH,
            t: None,
            s: Some(1),
            d: json!({}),
        })
        .unwrap_err();
        assert_eq!(err.event(), None);
    }

    #[test]
    fn control_opcodes() {
        let hello = decode(Envelope {
            op: opcode::HELLO,
            t: None,
            s: None,
            d: json!({ "heartbeat_interval": 41250 }),
        })
        .unwrap();
        assert_eq!(
            hello,
            GatewayEvent::Hello {
                heartbeat_interval: 41250
            }
        );

        let invalid = decode(Envelope {
            op: opcode::INVALID_SESSION,
            t: None,
            s: None,
            d: json!(true),
        })
        .unwrap();
        assert_eq!(invalid, GatewayEvent::InvalidSession { resumable: true });

        let other = decode(Envelope {
            op: 42,
            t: None,
            s: None,
            d: json!([1]),
        })
        .unwrap();
        assert_eq!(
            other,
            GatewayEvent::Other {
                op: 42,
                payload: json!([1])
            }
        );
    }

    #[test]
    fn raw_frames() {
        let event = decode_slice(br#"{"op":11}"#).unwrap();
        assert_eq!(event, GatewayEvent::HeartbeatAck);

        let err = decode_slice(b"not json").unwrap_err();
        assert_eq!(err.event(), None);
        assert_eq!(err.payload(), &json!("not json"));
    }

    #[test]
    fn status_update_envelope_omits_absent_fields() {
        let envelope = Envelope::status_update(&Presence::idle().as_status_update()).unwrap();
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({ "op": 3, "d": { "status": "idle" } })
        );

        let envelope = Envelope::status_update(
            &Presence::online_with(Activity::streaming("live", "https://twitch.tv/x"))
                .as_status_update(),
        )
        .unwrap();
        assert_eq!(
            envelope.d,
            json!({
                "status": "online",
                "game": { "name": "live", "type": 1, "url": "https://twitch.tv/x" }
            })
        );
    }
}
