use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    channel::{ChannelCreate, ChannelDelete, ChannelUpdate},
    guild::{
        GuildCreate, GuildDelete, GuildEmojisUpdate, GuildUpdate, MemberAdd, MemberChunk,
        MemberRemove, MemberUpdate, RoleCreate, RoleDelete, RoleUpdate, UnavailableGuild,
    },
    presence::PresenceUpdate,
    user::User,
    voice::VoiceStateUpdate,
};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Ready {
    #[serde(rename = "v", default)]
    pub version: u8,
    pub user: User,
    #[serde(default)]
    pub guilds: Vec<UnavailableGuild>,
    #[serde(default)]
    pub session_id: String,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct UserUpdate(pub User);

/// A dispatch this library has no model for, kept exactly as received.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnknownDispatch {
    pub name: String,
    pub payload: Value,
}

/// Every dispatch the gateway can deliver.
#[derive(Clone, Debug, PartialEq)]
pub enum Dispatch {
    ChannelCreate(ChannelCreate),
    ChannelDelete(ChannelDelete),
    ChannelUpdate(ChannelUpdate),
    GuildCreate(Box<GuildCreate>),
    GuildDelete(GuildDelete),
    GuildEmojisUpdate(GuildEmojisUpdate),
    GuildUpdate(GuildUpdate),
    MemberAdd(Box<MemberAdd>),
    MemberChunk(MemberChunk),
    MemberRemove(MemberRemove),
    MemberUpdate(Box<MemberUpdate>),
    PresenceUpdate(Box<PresenceUpdate>),
    Ready(Box<Ready>),
    RoleCreate(RoleCreate),
    RoleDelete(RoleDelete),
    RoleUpdate(RoleUpdate),
    UserUpdate(UserUpdate),
    VoiceStateUpdate(Box<VoiceStateUpdate>),
    Unknown(UnknownDispatch),
}

impl Dispatch {
    /// The event name as it appears on the wire.
    pub fn name(&self) -> &str {
        match self {
            Self::ChannelCreate(_) => "CHANNEL_CREATE",
            Self::ChannelDelete(_) => "CHANNEL_DELETE",
            Self::ChannelUpdate(_) => "CHANNEL_UPDATE",
            Self::GuildCreate(_) => "GUILD_CREATE",
            Self::GuildDelete(_) => "GUILD_DELETE",
            Self::GuildEmojisUpdate(_) => "GUILD_EMOJIS_UPDATE",
            Self::GuildUpdate(_) => "GUILD_UPDATE",
            Self::MemberAdd(_) => "GUILD_MEMBER_ADD",
            Self::MemberChunk(_) => "GUILD_MEMBERS_CHUNK",
            Self::MemberRemove(_) => "GUILD_MEMBER_REMOVE",
            Self::MemberUpdate(_) => "GUILD_MEMBER_UPDATE",
            Self::PresenceUpdate(_) => "PRESENCE_UPDATE",
            Self::Ready(_) => "READY",
            Self::RoleCreate(_) => "GUILD_ROLE_CREATE",
            Self::RoleDelete(_) => "GUILD_ROLE_DELETE",
            Self::RoleUpdate(_) => "GUILD_ROLE_UPDATE",
            Self::UserUpdate(_) => "USER_UPDATE",
            Self::VoiceStateUpdate(_) => "VOICE_STATE_UPDATE",
            Self::Unknown(unknown) => &unknown.name,
        }
    }

    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}
