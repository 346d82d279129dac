use serde::{Deserialize, Serialize};

use crate::id::{ChannelId, GuildId, UserId};

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct VoiceState {
    /// Missing inside guild snapshots, where the guild is implied.
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    /// `None` once the user has left voice.
    #[serde(default)]
    pub channel_id: Option<ChannelId>,
    pub user_id: UserId,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub deaf: bool,
    #[serde(default)]
    pub mute: bool,
    #[serde(default)]
    pub self_deaf: bool,
    #[serde(default)]
    pub self_mute: bool,
    #[serde(default)]
    pub suppress: bool,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct VoiceStateUpdate(pub VoiceState);
