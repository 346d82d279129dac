use std::sync::Arc;
use strata_models::{
    gateway::UnknownDispatch,
    id::{ChannelId, GuildId, RoleId, UserId},
    user::User,
};

use crate::{
    CachedChannel, CachedEmoji, CachedGuild, CachedMember, CachedPresence, CachedRole,
    CachedVoiceState, GuildSnapshot,
};

/// What changed in the cache as the result of a single dispatch. Events that remove
/// or change an entity carry the value the cache held before, since the cache no
/// longer has it.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    Ready {
        user: Arc<User>,
        guilds: Vec<GuildId>,
        session_id: String,
    },
    CurrentUserUpdated {
        old: Option<Arc<User>>,
        new: Arc<User>,
    },
    GuildAvailable {
        guild: Arc<CachedGuild>,
        /// The guild had been marked unavailable, so this ends an outage rather than a join.
        recovered: bool,
    },
    GuildUnavailable {
        guild_id: GuildId,
        /// Set for outages, unset when the guild was left or deleted.
        unavailable: bool,
        prior: Option<Box<GuildSnapshot>>,
    },
    GuildUpdated {
        old: Arc<CachedGuild>,
        new: Arc<CachedGuild>,
    },
    ChannelCreated {
        channel: Arc<CachedChannel>,
    },
    ChannelUpdated {
        old: Option<Arc<CachedChannel>>,
        new: Arc<CachedChannel>,
    },
    ChannelDeleted {
        channel_id: ChannelId,
        guild_id: Option<GuildId>,
        channel: Option<Arc<CachedChannel>>,
        /// Channels that sat under the deleted category and lost their parent.
        orphaned: Vec<ChannelId>,
    },
    RoleCreated {
        role: Arc<CachedRole>,
    },
    RoleUpdated {
        old: Option<Arc<CachedRole>>,
        new: Arc<CachedRole>,
    },
    RoleDeleted {
        guild_id: GuildId,
        role_id: RoleId,
        role: Option<Arc<CachedRole>>,
    },
    MemberAdded {
        member: Arc<CachedMember>,
    },
    MemberUpdated {
        old: Option<Arc<CachedMember>>,
        new: Arc<CachedMember>,
    },
    MemberRemoved {
        guild_id: GuildId,
        user: User,
        member: Option<Arc<CachedMember>>,
    },
    MembersChunk {
        guild_id: GuildId,
        members: usize,
        presences: usize,
        chunk_index: u32,
        chunk_count: u32,
    },
    PresenceUpdated {
        guild_id: GuildId,
        user_id: UserId,
        old: Option<Arc<CachedPresence>>,
        new: Arc<CachedPresence>,
    },
    EmojisUpdated {
        guild_id: GuildId,
        emojis: Vec<Arc<CachedEmoji>>,
        added: Vec<Arc<CachedEmoji>>,
        removed: Vec<Arc<CachedEmoji>>,
        /// Pairs of (old, new) for emojis that kept their id.
        changed: Vec<(Arc<CachedEmoji>, Arc<CachedEmoji>)>,
    },
    VoiceStateUpdated {
        guild_id: GuildId,
        user_id: UserId,
        old: Option<Arc<CachedVoiceState>>,
        /// `None` when the user left voice.
        new: Option<Arc<CachedVoiceState>>,
    },
    Unknown(UnknownDispatch),
}

impl DomainEvent {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "ready",
            Self::CurrentUserUpdated { .. } => "current-user-updated",
            Self::GuildAvailable { .. } => "guild-available",
            Self::GuildUnavailable { .. } => "guild-unavailable",
            Self::GuildUpdated { .. } => "guild-updated",
            Self::ChannelCreated { .. } => "channel-created",
            Self::ChannelUpdated { .. } => "channel-updated",
            Self::ChannelDeleted { .. } => "channel-deleted",
            Self::RoleCreated { .. } => "role-created",
            Self::RoleUpdated { .. } => "role-updated",
            Self::RoleDeleted { .. } => "role-deleted",
            Self::MemberAdded { .. } => "member-added",
            Self::MemberUpdated { .. } => "member-updated",
            Self::MemberRemoved { .. } => "member-removed",
            Self::MembersChunk { .. } => "members-chunk",
            Self::PresenceUpdated { .. } => "presence-updated",
            Self::EmojisUpdated { .. } => "emoji-set-updated",
            Self::VoiceStateUpdated { .. } => "voice-state-updated",
            Self::Unknown(_) => "unknown",
        }
    }

    /// The guild the event belongs to, if any.
    pub fn guild_id(&self) -> Option<GuildId> {
        match self {
            Self::Ready { .. } | Self::CurrentUserUpdated { .. } | Self::Unknown(_) => None,
            Self::GuildAvailable { guild, .. } => Some(guild.id),
            Self::GuildUpdated { new, .. } => Some(new.id),
            Self::ChannelCreated { channel } => channel.guild_id,
            Self::ChannelUpdated { new, .. } => new.guild_id,
            Self::ChannelDeleted { guild_id, .. } => *guild_id,
            Self::RoleCreated { role } => Some(role.guild_id),
            Self::RoleUpdated { new, .. } => Some(new.guild_id),
            Self::MemberAdded { member } => Some(member.guild_id),
            Self::MemberUpdated { new, .. } => Some(new.guild_id),
            Self::GuildUnavailable { guild_id, .. }
            | Self::RoleDeleted { guild_id, .. }
            | Self::MemberRemoved { guild_id, .. }
            | Self::MembersChunk { guild_id, .. }
            | Self::PresenceUpdated { guild_id, .. }
            | Self::EmojisUpdated { guild_id, .. }
            | Self::VoiceStateUpdated { guild_id, .. } => Some(*guild_id),
        }
    }
}
