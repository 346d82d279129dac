use serde::{Deserialize, Serialize};

use crate::{
    id::{GuildId, RoleId},
    patch::Patch,
    presence::PresenceUpdate,
    user::User,
};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Member {
    pub user: User,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<RoleId>,
    #[serde(default)]
    pub joined_at: Option<String>,
    #[serde(default)]
    pub deaf: bool,
    #[serde(default)]
    pub mute: bool,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MemberAdd {
    pub guild_id: GuildId,
    #[serde(flatten)]
    pub member: Member,
}

/// Only the fields that changed are present, apart from the user.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MemberUpdate {
    pub guild_id: GuildId,
    pub user: User,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub nick: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub roles: Patch<Vec<RoleId>>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub joined_at: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub deaf: Patch<bool>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub mute: Patch<bool>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MemberRemove {
    pub guild_id: GuildId,
    pub user: User,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct MemberChunk {
    pub guild_id: GuildId,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub presences: Vec<PresenceUpdate>,
    #[serde(default)]
    pub chunk_index: u32,
    #[serde(default)]
    pub chunk_count: u32,
}
