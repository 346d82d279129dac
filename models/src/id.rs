use chrono::{DateTime, TimeZone, Utc};
use serde::{
    de::{Error as DeError, Unexpected, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Milliseconds between the unix epoch and the first second of 2015, the epoch identifiers count from.
pub const ID_EPOCH: u64 = 1_420_070_400_000;

/// Accepts an unsigned 64-bit integer sent either as a JSON number or as a JSON string.
/// Large identifiers are sent as strings while some payloads still carry plain numbers.
pub(crate) struct LenientU64Visitor;

impl<'de> Visitor<'de> for LenientU64Visitor {
    type Value = u64;

    fn expecting(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("an unsigned integer or a string containing one")
    }

    fn visit_u64<E: DeError>(self, v: u64) -> Result<Self::Value, E> {
        Ok(v)
    }

    fn visit_i64<E: DeError>(self, v: i64) -> Result<Self::Value, E> {
        u64::try_from(v).map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
    }

    fn visit_str<E: DeError>(self, v: &str) -> Result<Self::Value, E> {
        v.parse()
            .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
    }
}

pub(crate) fn deserialize_lenient_u64<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    d.deserialize_any(LenientU64Visitor)
}

macro_rules! id {
    ($($(#[$attr:meta])* $name:ident;)*) => {
        $(
            $(#[$attr])*
            #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
            pub struct $name(pub u64);

            impl $name {
                pub const fn new(n: u64) -> Self {
                    Self(n)
                }

                pub const fn get(self) -> u64 {
                    self.0
                }

                /// The creation time encoded in the upper bits of the identifier.
                pub fn timestamp(self) -> Option<DateTime<Utc>> {
                    let millis = (self.0 >> 22) + ID_EPOCH;
                    Utc.timestamp_millis_opt(millis as i64).single()
                }
            }

            impl Display for $name {
                fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
                    Display::fmt(&self.0, f)
                }
            }

            impl From<u64> for $name {
                fn from(n: u64) -> Self {
                    Self(n)
                }
            }

            impl<'de> Deserialize<'de> for $name {
                fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                    deserialize_lenient_u64(d).map(Self)
                }
            }

            impl Serialize for $name {
                fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                    s.collect_str(&self.0)
                }
            }
        )*
    };
}

id! {
    ChannelId;
    EmojiId;
    GuildId;
    RoleId;
    UserId;
}
