use strata_models::id::{ChannelId, GuildId, UserId};

/// Only users connected to a voice channel have a cached voice state.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CachedVoiceState {
    pub guild_id: GuildId,
    pub user_id: UserId,
    pub channel_id: ChannelId,
    pub session_id: String,
    pub deaf: bool,
    pub mute: bool,
    pub self_deaf: bool,
    pub self_mute: bool,
    pub suppress: bool,
}
