use strata_models::{
    channel::{Channel, ChannelType},
    id::{ChannelId, GuildId},
};

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CachedChannel {
    pub id: ChannelId,
    pub guild_id: Option<GuildId>,
    pub kind: ChannelType,
    pub name: Option<String>,
    pub position: i64,
    /// Kept as sent. Use `Cache::channel_parent` to resolve it, which ignores
    /// parents that are missing or aren't categories.
    pub parent_id: Option<ChannelId>,
    pub topic: Option<String>,
    pub nsfw: bool,
}

impl CachedChannel {
    pub(crate) fn from_channel(channel: Channel, guild_id: Option<GuildId>) -> Self {
        Self {
            id: channel.id,
            guild_id: guild_id.or(channel.guild_id),
            kind: channel.kind,
            name: channel.name,
            position: channel.position.unwrap_or_default(),
            parent_id: channel.parent_id,
            topic: channel.topic,
            nsfw: channel.nsfw,
        }
    }
}
