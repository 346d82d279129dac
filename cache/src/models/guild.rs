use std::sync::Arc;
use strata_models::id::{GuildId, UserId};

use super::{
    channel::CachedChannel, emoji::CachedEmoji, member::CachedMember, presence::CachedPresence,
    role::CachedRole, voice::CachedVoiceState,
};

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CachedGuild {
    pub id: GuildId,
    pub name: String,
    pub owner_id: UserId,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub member_count: u64,
}

/// Everything the cache held for a guild at the moment it was removed.
#[derive(Debug, Clone)]
pub struct GuildSnapshot {
    pub guild: Arc<CachedGuild>,
    /// Ordered by position, then id.
    pub channels: Vec<Arc<CachedChannel>>,
    /// Ordered by position, then id.
    pub roles: Vec<Arc<CachedRole>>,
    pub emojis: Vec<Arc<CachedEmoji>>,
    pub members: Vec<Arc<CachedMember>>,
    pub presences: Vec<Arc<CachedPresence>>,
    pub voice_states: Vec<Arc<CachedVoiceState>>,
}
