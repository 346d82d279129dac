#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_possible_wrap,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::implicit_hasher,
    clippy::missing_panics_doc,
    clippy::explicit_deref_methods
)]

mod domain;
mod event;
mod models;

use dashmap::{mapref::entry::Entry, DashMap, DashSet};
use std::{
    collections::HashSet,
    error::Error as StdError,
    fmt::{Display, Formatter, Result as FmtResult},
    hash::Hash,
    sync::{Arc, Mutex, PoisonError},
};
use strata_models::{
    channel::ChannelUpdate,
    guild::{Emoji, Guild, GuildUpdate, Member, MemberUpdate},
    id::{ChannelId, EmojiId, GuildId, RoleId, UserId},
    presence::{Presence, PresenceUpdate},
    stats::GatewayStats,
    user::User,
    voice::VoiceState,
};
use tracing::debug;

pub use domain::DomainEvent;
pub use event::UpdateCache;
pub use models::{
    channel::CachedChannel,
    emoji::CachedEmoji,
    guild::{CachedGuild, GuildSnapshot},
    member::CachedMember,
    presence::CachedPresence,
    role::CachedRole,
    voice::CachedVoiceState,
};

/// Add an element to the structure that maps the guild ids to the set of the resource they hold.
/// Nothing is added when the guild has no index, so resources never point at unknown guilds.
fn upsert_guild_item<K: Eq + Hash, V: Eq + Hash>(map: &DashMap<K, HashSet<V>>, k: K, v: V) {
    match map.entry(k) {
        Entry::Occupied(e) if e.get().contains(&v) => {}
        Entry::Occupied(mut e) => {
            e.get_mut().insert(v);
        }
        Entry::Vacant(_) => {}
    }
}

fn remove_guild_item<K: Eq + Hash, V: Eq + Hash>(map: &DashMap<K, HashSet<V>>, k: &K, v: &V) {
    if let Some(mut items) = map.get_mut(k) {
        items.remove(v);
    }
}

/// Add or replace an element that maps the resource ids to their respective structures.
/// Returns the stored value along with the one it replaced.
fn upsert_item<K: Eq + Hash, V: PartialEq>(
    map: &DashMap<K, Arc<V>>,
    k: K,
    v: V,
) -> (Arc<V>, Option<Arc<V>>) {
    match map.entry(k) {
        Entry::Occupied(e) if **e.get() == v => {
            let current = Arc::clone(e.get());
            (Arc::clone(&current), Some(current))
        }
        Entry::Occupied(mut e) => {
            let v = Arc::new(v);
            let old = e.insert(Arc::clone(&v));
            (v, Some(old))
        }
        Entry::Vacant(e) => {
            let v = Arc::new(v);
            e.insert(Arc::clone(&v));
            (v, None)
        }
    }
}

/// Identifies a single cached entity.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum EntityKey {
    Guild(GuildId),
    Channel(ChannelId),
    Role(RoleId),
    Emoji(EmojiId),
    Member(GuildId, UserId),
    Presence(GuildId, UserId),
    VoiceState(GuildId, UserId),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Entity {
    Guild(Arc<CachedGuild>),
    Channel(Arc<CachedChannel>),
    Role(Arc<CachedRole>),
    Emoji(Arc<CachedEmoji>),
    Member(Arc<CachedMember>),
    Presence(Arc<CachedPresence>),
    VoiceState(Arc<CachedVoiceState>),
}

impl Entity {
    pub fn key(&self) -> EntityKey {
        match self {
            Self::Guild(g) => EntityKey::Guild(g.id),
            Self::Channel(c) => EntityKey::Channel(c.id),
            Self::Role(r) => EntityKey::Role(r.id),
            Self::Emoji(e) => EntityKey::Emoji(e.id),
            Self::Member(m) => EntityKey::Member(m.guild_id, m.user.id),
            Self::Presence(p) => EntityKey::Presence(p.guild_id, p.user_id),
            Self::VoiceState(v) => EntityKey::VoiceState(v.guild_id, v.user_id),
        }
    }
}

/// A dispatch that could not be applied. The cache is left as it was.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CacheError {
    /// The entity refers to another entity the cache doesn't hold.
    InconsistentReference { entity: EntityKey, missing: EntityKey },
    /// A guild scoped dispatch arrived without its guild id.
    MissingGuildId { event: &'static str },
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            CacheError::InconsistentReference { entity, missing } => {
                write!(f, "{:?} references {:?}, which is not cached", entity, missing)
            }
            CacheError::MissingGuildId { event } => write!(f, "{} arrived without a guild id", event),
        }
    }
}

impl StdError for CacheError {}

pub struct CacheRef {
    channels: DashMap<ChannelId, Arc<CachedChannel>>,
    emojis: DashMap<EmojiId, Arc<CachedEmoji>>,
    guilds: DashMap<GuildId, Arc<CachedGuild>>,
    members: DashMap<(GuildId, UserId), Arc<CachedMember>>,
    presences: DashMap<(GuildId, UserId), Arc<CachedPresence>>,
    roles: DashMap<RoleId, Arc<CachedRole>>,
    voice_states: DashMap<(GuildId, UserId), Arc<CachedVoiceState>>,

    guild_channels: DashMap<GuildId, HashSet<ChannelId>>,
    guild_emojis: DashMap<GuildId, HashSet<EmojiId>>,
    guild_members: DashMap<GuildId, HashSet<UserId>>,
    guild_presences: DashMap<GuildId, HashSet<UserId>>,
    guild_roles: DashMap<GuildId, HashSet<RoleId>>,
    guild_voice_states: DashMap<GuildId, HashSet<UserId>>,
    unavailable_guilds: DashSet<GuildId>,

    current_user: Mutex<Option<Arc<User>>>,

    stats: Arc<GatewayStats>,
}

/// An wrapper around the actual structure that hold all the cache fields allowing this to be sent across multiple threads.
///
/// Every value is handed out as an `Arc` snapshot. Updates replace the `Arc` (or copy it
/// on write) while holding the shard lock, so a reader sees either the old or the new
/// value and never a partially applied one.
#[derive(Clone)]
pub struct Cache(Arc<CacheRef>);

impl Cache {
    #[must_use]
    pub fn new(stats: Arc<GatewayStats>) -> Self {
        Self(Arc::new(CacheRef {
            channels: DashMap::new(),
            emojis: DashMap::new(),
            guilds: DashMap::new(),
            members: DashMap::new(),
            presences: DashMap::new(),
            roles: DashMap::new(),
            voice_states: DashMap::new(),
            guild_channels: DashMap::new(),
            guild_emojis: DashMap::new(),
            guild_members: DashMap::new(),
            guild_presences: DashMap::new(),
            guild_roles: DashMap::new(),
            guild_voice_states: DashMap::new(),
            unavailable_guilds: DashSet::new(),
            current_user: Mutex::new(None),
            stats,
        }))
    }

    pub fn stats(&self) -> &Arc<GatewayStats> {
        &self.0.stats
    }

    /// Returns the user the connection is logged in as
    pub fn current_user(&self) -> Option<Arc<User>> {
        self.0
            .current_user
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Get an immutable reference to the guild struct
    pub fn guild(&self, guild_id: GuildId) -> Option<Arc<CachedGuild>> {
        self.0.guilds.get(&guild_id).map(|g| Arc::clone(g.value()))
    }

    /// Get a list of all guild ids inside the cache
    pub fn guilds(&self) -> Vec<GuildId> {
        self.0.guilds.iter().map(|g| *g.key()).collect()
    }

    pub fn is_unavailable(&self, guild_id: GuildId) -> bool {
        self.0.unavailable_guilds.contains(&guild_id)
    }

    pub fn unavailable_guilds(&self) -> Vec<GuildId> {
        self.0.unavailable_guilds.iter().map(|g| *g).collect()
    }

    /// Get a immutable reference to a channel
    pub fn channel(&self, channel_id: ChannelId) -> Option<Arc<CachedChannel>> {
        self.0
            .channels
            .get(&channel_id)
            .map(|c| Arc::clone(c.value()))
    }

    /// Get the channel ids of a guild, ordered by position
    pub fn channels(&self, guild_id: GuildId) -> Vec<ChannelId> {
        self.guild_channels(guild_id).iter().map(|c| c.id).collect()
    }

    /// Get all channels of a guild, ordered by position
    pub fn guild_channels(&self, guild_id: GuildId) -> Vec<Arc<CachedChannel>> {
        let ids = self
            .0
            .guild_channels
            .get(&guild_id)
            .map_or_else(HashSet::new, |gc| gc.value().clone());
        let mut channels = ids
            .into_iter()
            .filter_map(|id| self.channel(id))
            .collect::<Vec<_>>();
        channels.sort_by_key(|c| (c.position, c.id));
        channels
    }

    /// Resolve the category a channel sits under. A parent that is missing or isn't a category counts as no parent.
    pub fn channel_parent(&self, channel_id: ChannelId) -> Option<Arc<CachedChannel>> {
        let parent_id = self.channel(channel_id)?.parent_id?;
        self.channel(parent_id).filter(|p| p.kind.is_category())
    }

    /// Get the channels residing in a category, ordered by position
    pub fn category_channels(&self, category_id: ChannelId) -> Vec<Arc<CachedChannel>> {
        match self.channel(category_id) {
            Some(category) if category.kind.is_category() => category
                .guild_id
                .map(|guild_id| {
                    self.guild_channels(guild_id)
                        .into_iter()
                        .filter(|c| c.parent_id == Some(category_id))
                        .collect()
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Get an immutable reference of a certain role
    pub fn role(&self, role_id: RoleId) -> Option<Arc<CachedRole>> {
        self.0.roles.get(&role_id).map(|r| Arc::clone(r.value()))
    }

    /// Get a list of all role ids inside a guild
    pub fn roles(&self, guild_id: GuildId) -> HashSet<RoleId> {
        self.0
            .guild_roles
            .get(&guild_id)
            .map_or_else(HashSet::new, |gr| gr.value().clone())
    }

    /// Get all roles of a guild, lowest rank first
    pub fn guild_roles(&self, guild_id: GuildId) -> Vec<Arc<CachedRole>> {
        let mut roles = self
            .roles(guild_id)
            .into_iter()
            .filter_map(|id| self.role(id))
            .collect::<Vec<_>>();
        roles.sort_by_key(|r| (r.position, r.id));
        roles
    }

    /// Get an immutable reference to a certain user in a certain guild
    pub fn member(&self, guild_id: GuildId, user_id: UserId) -> Option<Arc<CachedMember>> {
        self.0
            .members
            .get(&(guild_id, user_id))
            .map(|m| Arc::clone(m.value()))
    }

    /// Get a list of all member ids inside a guild
    pub fn members(&self, guild_id: GuildId) -> HashSet<UserId> {
        self.0
            .guild_members
            .get(&guild_id)
            .map_or_else(HashSet::new, |g| g.value().clone())
    }

    /// Get the membercount of a guild. Returns 0 if the guild is not present inside the cache
    pub fn member_count(&self, guild_id: GuildId) -> u64 {
        self.0
            .guilds
            .get(&guild_id)
            .map_or(0, |g| g.member_count)
    }

    pub fn presence(&self, guild_id: GuildId, user_id: UserId) -> Option<Arc<CachedPresence>> {
        self.0
            .presences
            .get(&(guild_id, user_id))
            .map(|p| Arc::clone(p.value()))
    }

    pub fn guild_presences(&self, guild_id: GuildId) -> Vec<Arc<CachedPresence>> {
        self.0
            .guild_presences
            .get(&guild_id)
            .map_or_else(HashSet::new, |g| g.value().clone())
            .into_iter()
            .filter_map(|user_id| self.presence(guild_id, user_id))
            .collect()
    }

    pub fn voice_state(&self, guild_id: GuildId, user_id: UserId) -> Option<Arc<CachedVoiceState>> {
        self.0
            .voice_states
            .get(&(guild_id, user_id))
            .map(|v| Arc::clone(v.value()))
    }

    pub fn guild_voice_states(&self, guild_id: GuildId) -> Vec<Arc<CachedVoiceState>> {
        self.0
            .guild_voice_states
            .get(&guild_id)
            .map_or_else(HashSet::new, |g| g.value().clone())
            .into_iter()
            .filter_map(|user_id| self.voice_state(guild_id, user_id))
            .collect()
    }

    pub fn emoji(&self, emoji_id: EmojiId) -> Option<Arc<CachedEmoji>> {
        self.0.emojis.get(&emoji_id).map(|e| Arc::clone(e.value()))
    }

    /// Get all custom emojis of a guild, ordered by id
    pub fn guild_emojis(&self, guild_id: GuildId) -> Vec<Arc<CachedEmoji>> {
        let mut emojis = self
            .0
            .guild_emojis
            .get(&guild_id)
            .map_or_else(HashSet::new, |g| g.value().clone())
            .into_iter()
            .filter_map(|id| self.emoji(id))
            .collect::<Vec<_>>();
        emojis.sort_by_key(|e| e.id);
        emojis
    }

    /// Update a resource inside a cache
    pub fn update<T: UpdateCache>(&self, value: &T) -> Result<DomainEvent, CacheError> {
        value.update(self)
    }

    pub fn get(&self, key: EntityKey) -> Option<Entity> {
        match key {
            EntityKey::Guild(id) => self.guild(id).map(Entity::Guild),
            EntityKey::Channel(id) => self.channel(id).map(Entity::Channel),
            EntityKey::Role(id) => self.role(id).map(Entity::Role),
            EntityKey::Emoji(id) => self.emoji(id).map(Entity::Emoji),
            EntityKey::Member(g, u) => self.member(g, u).map(Entity::Member),
            EntityKey::Presence(g, u) => self.presence(g, u).map(Entity::Presence),
            EntityKey::VoiceState(g, u) => self.voice_state(g, u).map(Entity::VoiceState),
        }
    }

    /// Insert an entity, replacing whatever was stored under its key. Entities that belong
    /// to a guild are refused while the guild isn't cached.
    pub fn upsert(&self, entity: Entity) -> Result<Option<Entity>, CacheError> {
        let key = entity.key();
        let old = match entity {
            Entity::Guild(guild) => {
                let guild_id = guild.id;
                let member_count = guild.member_count as i64;
                let old = self.0.guilds.insert(guild_id, guild);
                let members = &self.0.stats.resource_counts.members;
                match &old {
                    Some(old) => members.add(member_count - old.member_count as i64),
                    None => {
                        self.create_guild_indexes(guild_id);
                        self.0.stats.resource_counts.guilds.inc();
                        members.add(member_count);
                    }
                }
                old.map(Entity::Guild)
            }
            Entity::Channel(channel) => {
                if let Some(guild_id) = channel.guild_id {
                    self.require_guild(guild_id, key)?;
                    upsert_guild_item(&self.0.guild_channels, guild_id, channel.id);
                }
                let (channel_id, guild_id) = (channel.id, channel.guild_id);
                let old = self.0.channels.insert(channel_id, channel);
                if let Some(moved_from) = old.as_ref().and_then(|c| c.guild_id) {
                    if Some(moved_from) != guild_id {
                        remove_guild_item(&self.0.guild_channels, &moved_from, &channel_id);
                    }
                }
                old.map(Entity::Channel)
            }
            Entity::Role(role) => {
                self.require_guild(role.guild_id, key)?;
                upsert_guild_item(&self.0.guild_roles, role.guild_id, role.id);
                let (role_id, guild_id) = (role.id, role.guild_id);
                let old = self.0.roles.insert(role_id, role);
                if let Some(old) = old.as_ref().filter(|r| r.guild_id != guild_id) {
                    remove_guild_item(&self.0.guild_roles, &old.guild_id, &role_id);
                }
                old.map(Entity::Role)
            }
            Entity::Emoji(emoji) => {
                self.require_guild(emoji.guild_id, key)?;
                upsert_guild_item(&self.0.guild_emojis, emoji.guild_id, emoji.id);
                let (emoji_id, guild_id) = (emoji.id, emoji.guild_id);
                let old = self.0.emojis.insert(emoji_id, emoji);
                if let Some(old) = old.as_ref().filter(|e| e.guild_id != guild_id) {
                    remove_guild_item(&self.0.guild_emojis, &old.guild_id, &emoji_id);
                }
                old.map(Entity::Emoji)
            }
            Entity::Member(member) => {
                let guild_id = member.guild_id;
                self.require_guild(guild_id, key)?;
                upsert_guild_item(&self.0.guild_members, guild_id, member.user.id);
                self.0
                    .members
                    .insert((guild_id, member.user.id), member)
                    .map(Entity::Member)
            }
            Entity::Presence(presence) => {
                let guild_id = presence.guild_id;
                self.require_guild(guild_id, key)?;
                upsert_guild_item(&self.0.guild_presences, guild_id, presence.user_id);
                self.0
                    .presences
                    .insert((guild_id, presence.user_id), presence)
                    .map(Entity::Presence)
            }
            Entity::VoiceState(state) => {
                let guild_id = state.guild_id;
                self.require_guild(guild_id, key)?;
                upsert_guild_item(&self.0.guild_voice_states, guild_id, state.user_id);
                self.0
                    .voice_states
                    .insert((guild_id, state.user_id), state)
                    .map(Entity::VoiceState)
            }
        };
        Ok(old)
    }

    /// Remove an entity and return it. Removing a guild removes everything that belongs to it.
    pub fn remove(&self, key: EntityKey) -> Option<Entity> {
        match key {
            EntityKey::Guild(id) => self.remove_guild(id).map(|s| Entity::Guild(s.guild)),
            EntityKey::Channel(id) => self.delete_channel(id).map(|(c, _)| Entity::Channel(c)),
            EntityKey::Role(id) => {
                let guild_id = self.role(id)?.guild_id;
                self.delete_role(guild_id, id).map(Entity::Role)
            }
            EntityKey::Emoji(id) => {
                let (_, emoji) = self.0.emojis.remove(&id)?;
                remove_guild_item(&self.0.guild_emojis, &emoji.guild_id, &id);
                Some(Entity::Emoji(emoji))
            }
            EntityKey::Member(g, u) => {
                let (_, member) = self.0.members.remove(&(g, u))?;
                remove_guild_item(&self.0.guild_members, &g, &u);
                Some(Entity::Member(member))
            }
            EntityKey::Presence(g, u) => {
                let (_, presence) = self.0.presences.remove(&(g, u))?;
                remove_guild_item(&self.0.guild_presences, &g, &u);
                Some(Entity::Presence(presence))
            }
            EntityKey::VoiceState(g, u) => {
                let (_, state) = self.0.voice_states.remove(&(g, u))?;
                remove_guild_item(&self.0.guild_voice_states, &g, &u);
                Some(Entity::VoiceState(state))
            }
        }
    }

    /// The entities that depend on the given one: everything a guild holds, or the channels
    /// under a category.
    pub fn children_of(&self, parent: EntityKey) -> Vec<EntityKey> {
        match parent {
            EntityKey::Guild(guild_id) => {
                let mut children = Vec::new();
                children.extend(self.channels(guild_id).into_iter().map(EntityKey::Channel));
                children.extend(
                    self.guild_roles(guild_id)
                        .iter()
                        .map(|r| EntityKey::Role(r.id)),
                );
                children.extend(
                    self.guild_emojis(guild_id)
                        .iter()
                        .map(|e| EntityKey::Emoji(e.id)),
                );
                children.extend(
                    self.members(guild_id)
                        .into_iter()
                        .map(|u| EntityKey::Member(guild_id, u)),
                );
                children.extend(
                    self.guild_presences(guild_id)
                        .iter()
                        .map(|p| EntityKey::Presence(guild_id, p.user_id)),
                );
                children.extend(
                    self.guild_voice_states(guild_id)
                        .iter()
                        .map(|v| EntityKey::VoiceState(guild_id, v.user_id)),
                );
                children
            }
            EntityKey::Channel(channel_id) => self
                .category_channels(channel_id)
                .iter()
                .map(|c| EntityKey::Channel(c.id))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Remove a guild along with all of its channels, roles, emojis, members, presences and
    /// voice states. Returns what was removed so callers can still see the old state.
    pub fn remove_guild(&self, guild_id: GuildId) -> Option<GuildSnapshot> {
        let guild = self.0.guilds.remove(&guild_id).map(|(_, g)| g);

        let mut channels = take_index(&self.0.guild_channels, guild_id)
            .into_iter()
            .filter_map(|id| self.0.channels.remove(&id).map(|(_, c)| c))
            .collect::<Vec<_>>();
        channels.sort_by_key(|c| (c.position, c.id));
        let mut roles = take_index(&self.0.guild_roles, guild_id)
            .into_iter()
            .filter_map(|id| self.0.roles.remove(&id).map(|(_, r)| r))
            .collect::<Vec<_>>();
        roles.sort_by_key(|r| (r.position, r.id));
        let mut emojis = take_index(&self.0.guild_emojis, guild_id)
            .into_iter()
            .filter_map(|id| self.0.emojis.remove(&id).map(|(_, e)| e))
            .collect::<Vec<_>>();
        emojis.sort_by_key(|e| e.id);
        let members = take_index(&self.0.guild_members, guild_id)
            .into_iter()
            .filter_map(|id| self.0.members.remove(&(guild_id, id)).map(|(_, m)| m))
            .collect();
        let presences = take_index(&self.0.guild_presences, guild_id)
            .into_iter()
            .filter_map(|id| self.0.presences.remove(&(guild_id, id)).map(|(_, p)| p))
            .collect();
        let voice_states = take_index(&self.0.guild_voice_states, guild_id)
            .into_iter()
            .filter_map(|id| self.0.voice_states.remove(&(guild_id, id)).map(|(_, v)| v))
            .collect();

        let guild = guild?;
        self.0.stats.resource_counts.guilds.dec();
        self.0
            .stats
            .resource_counts
            .members
            .sub(guild.member_count as i64);

        Some(GuildSnapshot {
            guild,
            channels,
            roles,
            emojis,
            members,
            presences,
            voice_states,
        })
    }

    /// Drop every cached entity, e.g. before rebuilding from a fresh session.
    pub fn clear(&self) {
        self.0.channels.clear();
        self.0.emojis.clear();
        self.0.guilds.clear();
        self.0.members.clear();
        self.0.presences.clear();
        self.0.roles.clear();
        self.0.voice_states.clear();
        self.0.guild_channels.clear();
        self.0.guild_emojis.clear();
        self.0.guild_members.clear();
        self.0.guild_presences.clear();
        self.0.guild_roles.clear();
        self.0.guild_voice_states.clear();
        self.0.unavailable_guilds.clear();
        self.0.stats.resource_counts.guilds.set(0);
        self.0.stats.resource_counts.members.set(0);
        *self
            .0
            .current_user
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn require_guild(&self, guild_id: GuildId, entity: EntityKey) -> Result<(), CacheError> {
        if self.0.guilds.contains_key(&guild_id) {
            Ok(())
        } else {
            Err(CacheError::InconsistentReference {
                entity,
                missing: EntityKey::Guild(guild_id),
            })
        }
    }

    /// Makes sure every per-guild index exists, leaving the ones already there alone.
    fn create_guild_indexes(&self, guild_id: GuildId) {
        self.0.guild_channels.entry(guild_id).or_default();
        self.0.guild_emojis.entry(guild_id).or_default();
        self.0.guild_members.entry(guild_id).or_default();
        self.0.guild_presences.entry(guild_id).or_default();
        self.0.guild_roles.entry(guild_id).or_default();
        self.0.guild_voice_states.entry(guild_id).or_default();
    }

    fn cache_current_user(&self, user: User) -> (Option<Arc<User>>, Arc<User>) {
        let mut current = self
            .0
            .current_user
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let user = Arc::new(user);
        let old = current.replace(Arc::clone(&user));
        (old, user)
    }

    fn mark_unavailable(&self, guild_id: GuildId) {
        self.0.unavailable_guilds.insert(guild_id);
    }

    /// Caches a guild snapshot, replacing anything previously cached for it.
    /// Returns the guild and whether it had been marked unavailable.
    ///
    /// Entities present in both the old and the new state are swapped in place and the
    /// ones the snapshot no longer lists are dropped last, so a cached guild never goes
    /// missing for readers while it is replaced.
    fn cache_guild(&self, guild: Guild) -> (Arc<CachedGuild>, bool) {
        let guild_id = guild.id;
        let recovered = self.0.unavailable_guilds.remove(&guild_id).is_some();

        let cached = Arc::new(CachedGuild {
            id: guild_id,
            name: guild.name,
            owner_id: guild.owner_id,
            icon: guild.icon,
            description: guild.description,
            member_count: guild.member_count.unwrap_or(guild.members.len() as u64),
        });
        let old = self.0.guilds.insert(guild_id, Arc::clone(&cached));
        let members_gauge = &self.0.stats.resource_counts.members;
        match &old {
            Some(old) => members_gauge.add(cached.member_count as i64 - old.member_count as i64),
            None => {
                self.0.stats.resource_counts.guilds.inc();
                members_gauge.add(cached.member_count as i64);
            }
        }
        self.create_guild_indexes(guild_id);

        let channels = guild.channels.iter().map(|c| c.id).collect::<HashSet<_>>();
        for channel in guild.channels {
            self.cache_channel(CachedChannel::from_channel(channel, Some(guild_id)));
        }
        let roles = guild.roles.iter().map(|r| r.id).collect::<HashSet<_>>();
        for role in guild.roles {
            self.cache_role(CachedRole::from_role(role, guild_id));
        }
        let emojis = guild
            .emojis
            .into_iter()
            .filter_map(|e| cached_emoji(guild_id, e))
            .collect::<Vec<_>>();
        let emoji_ids = emojis.iter().map(|e| e.id).collect::<HashSet<_>>();
        for emoji in emojis {
            self.cache_emoji(emoji);
        }
        let members = guild.members.iter().map(|m| m.user.id).collect::<HashSet<_>>();
        for member in guild.members {
            self.cache_member(guild_id, member);
        }
        let presences = guild.presences.iter().map(|p| p.user.id).collect::<HashSet<_>>();
        for update in &guild.presences {
            let mut presence = Presence::default();
            presence.merge(update.status.clone(), update.activity.clone());
            self.store_presence(guild_id, update.user.id, presence);
        }
        let voice_states = guild
            .voice_states
            .iter()
            .filter(|v| v.channel_id.is_some())
            .map(|v| v.user_id)
            .collect::<HashSet<_>>();
        for state in guild.voice_states {
            self.cache_voice_state(guild_id, state);
        }

        let stale = retain_index(&self.0.guild_channels, &self.0.channels, guild_id, channels, |id| id)
            + retain_index(&self.0.guild_roles, &self.0.roles, guild_id, roles, |id| id)
            + retain_index(&self.0.guild_emojis, &self.0.emojis, guild_id, emoji_ids, |id| id)
            + retain_index(&self.0.guild_members, &self.0.members, guild_id, members, |id| {
                (guild_id, id)
            })
            + retain_index(&self.0.guild_presences, &self.0.presences, guild_id, presences, |id| {
                (guild_id, id)
            })
            + retain_index(
                &self.0.guild_voice_states,
                &self.0.voice_states,
                guild_id,
                voice_states,
                |id| (guild_id, id),
            );
        if old.is_some() {
            debug!(guild = ?guild_id, stale, "Replaced the cached state of a guild");
        }
        (cached, recovered)
    }

    fn merge_guild(&self, update: &GuildUpdate) -> Option<(Arc<CachedGuild>, Arc<CachedGuild>)> {
        let mut guild = self.0.guilds.get_mut(&update.id)?;
        let old = Arc::clone(&guild);
        let cached = Arc::make_mut(&mut guild);
        update.name.clone().apply(&mut cached.name);
        update.owner_id.clone().apply(&mut cached.owner_id);
        update.icon.clone().apply_nullable(&mut cached.icon);
        update.description.clone().apply_nullable(&mut cached.description);
        Some((old, Arc::clone(&guild)))
    }

    fn adjust_member_count(&self, guild_id: GuildId, joined: bool) {
        if let Some(mut guild) = self.0.guilds.get_mut(&guild_id) {
            let guild = Arc::make_mut(&mut guild);
            if joined {
                guild.member_count += 1;
                self.0.stats.resource_counts.members.inc();
            } else if guild.member_count > 0 {
                guild.member_count -= 1;
                self.0.stats.resource_counts.members.dec();
            }
        }
    }

    fn cache_channel(&self, channel: CachedChannel) -> (Arc<CachedChannel>, Option<Arc<CachedChannel>>) {
        if let Some(guild_id) = channel.guild_id {
            upsert_guild_item(&self.0.guild_channels, guild_id, channel.id);
        }
        upsert_item(&self.0.channels, channel.id, channel)
    }

    fn merge_channel(
        &self,
        update: &ChannelUpdate,
    ) -> Option<(Arc<CachedChannel>, Arc<CachedChannel>)> {
        let mut channel = self.0.channels.get_mut(&update.id)?;
        let old = Arc::clone(&channel);
        let cached = Arc::make_mut(&mut channel);
        update.kind.clone().apply(&mut cached.kind);
        update.name.clone().apply_nullable(&mut cached.name);
        update.position.clone().apply(&mut cached.position);
        update.parent_id.clone().apply_nullable(&mut cached.parent_id);
        update.topic.clone().apply_nullable(&mut cached.topic);
        update.nsfw.clone().apply(&mut cached.nsfw);
        Some((old, Arc::clone(&channel)))
    }

    /// Removes a channel. Channels under a removed category stay cached without a parent.
    fn delete_channel(&self, channel_id: ChannelId) -> Option<(Arc<CachedChannel>, Vec<ChannelId>)> {
        let children = self.category_channels(channel_id);
        let (_, channel) = self.0.channels.remove(&channel_id)?;
        if let Some(guild_id) = channel.guild_id {
            remove_guild_item(&self.0.guild_channels, &guild_id, &channel_id);
        }

        let mut orphaned = Vec::with_capacity(children.len());
        for child in children {
            if let Some(mut child) = self.0.channels.get_mut(&child.id) {
                Arc::make_mut(&mut child).parent_id = None;
                orphaned.push(child.id);
            }
        }
        Some((channel, orphaned))
    }

    fn cache_role(&self, role: CachedRole) -> (Arc<CachedRole>, Option<Arc<CachedRole>>) {
        upsert_guild_item(&self.0.guild_roles, role.guild_id, role.id);
        upsert_item(&self.0.roles, role.id, role)
    }

    /// Removes a role of a guild and takes it off every member that had it.
    fn delete_role(&self, guild_id: GuildId, role_id: RoleId) -> Option<Arc<CachedRole>> {
        let belongs = self
            .0
            .roles
            .get(&role_id)
            .map_or(false, |r| r.guild_id == guild_id);
        if !belongs {
            return None;
        }
        let (_, role) = self.0.roles.remove(&role_id)?;
        remove_guild_item(&self.0.guild_roles, &guild_id, &role_id);

        for user_id in self.members(guild_id) {
            if let Some(mut member) = self.0.members.get_mut(&(guild_id, user_id)) {
                if member.roles.contains(&role_id) {
                    Arc::make_mut(&mut member).roles.retain(|r| *r != role_id);
                }
            }
        }
        Some(role)
    }

    fn cache_emoji(&self, emoji: CachedEmoji) -> (Arc<CachedEmoji>, Option<Arc<CachedEmoji>>) {
        upsert_guild_item(&self.0.guild_emojis, emoji.guild_id, emoji.id);
        upsert_item(&self.0.emojis, emoji.id, emoji)
    }

    /// Swaps the emoji set of a guild for a new one, returning the stored set and the
    /// difference to the old one.
    fn replace_emojis(&self, guild_id: GuildId, emojis: &[Emoji]) -> EmojiDiff {
        let incoming = emojis
            .iter()
            .filter_map(|e| cached_emoji(guild_id, e.clone()))
            .collect::<Vec<_>>();
        let new_ids = incoming.iter().map(|e| e.id).collect::<HashSet<_>>();
        let old_ids = self
            .0
            .guild_emojis
            .get(&guild_id)
            .map_or_else(HashSet::new, |e| e.value().clone());

        let mut diff = EmojiDiff::default();
        for id in old_ids.difference(&new_ids) {
            if let Some((_, emoji)) = self.0.emojis.remove(id) {
                diff.removed.push(emoji);
            }
        }
        for emoji in incoming {
            let (new, old) = upsert_item(&self.0.emojis, emoji.id, emoji);
            match old {
                None => diff.added.push(Arc::clone(&new)),
                Some(old) if !Arc::ptr_eq(&old, &new) => diff.changed.push((old, Arc::clone(&new))),
                Some(_) => {}
            }
            diff.emojis.push(new);
        }
        self.0.guild_emojis.insert(guild_id, new_ids);
        diff.removed.sort_by_key(|e| e.id);
        diff
    }

    fn cache_member(
        &self,
        guild_id: GuildId,
        member: Member,
    ) -> (Arc<CachedMember>, Option<Arc<CachedMember>>) {
        let key = (guild_id, member.user.id);
        match self.0.members.get(&key) {
            Some(m) if **m == member => {
                let current = Arc::clone(&m);
                return (Arc::clone(&current), Some(current));
            }
            _ => {}
        }

        let cached = CachedMember {
            guild_id,
            user: Arc::new(member.user),
            nick: member.nick,
            roles: member.roles,
            joined_at: member.joined_at,
            deaf: member.deaf,
            mute: member.mute,
        };
        upsert_guild_item(&self.0.guild_members, guild_id, cached.user.id);
        upsert_item(&self.0.members, key, cached)
    }

    /// Applies a partial member update. A member the cache hasn't seen yet is created from
    /// the update without touching `member_count`: the update is not a join, and the count
    /// the guild reported already includes members that were never chunked in.
    fn merge_member(&self, update: &MemberUpdate) -> (Arc<CachedMember>, Option<Arc<CachedMember>>) {
        let guild_id = update.guild_id;
        let key = (guild_id, update.user.id);
        if let Some(mut member) = self.0.members.get_mut(&key) {
            let old = Arc::clone(&member);
            let cached = Arc::make_mut(&mut member);
            if *cached.user != update.user {
                cached.user = Arc::new(update.user.clone());
            }
            update.nick.clone().apply_nullable(&mut cached.nick);
            update.roles.clone().apply(&mut cached.roles);
            update.joined_at.clone().apply_nullable(&mut cached.joined_at);
            update.deaf.clone().apply(&mut cached.deaf);
            update.mute.clone().apply(&mut cached.mute);
            return (Arc::clone(&member), Some(old));
        }

        let cached = CachedMember {
            guild_id,
            user: Arc::new(update.user.clone()),
            nick: update.nick.value().cloned(),
            roles: update.roles.value().cloned().unwrap_or_default(),
            joined_at: update.joined_at.value().cloned(),
            deaf: update.deaf.value().copied().unwrap_or_default(),
            mute: update.mute.value().copied().unwrap_or_default(),
        };
        upsert_guild_item(&self.0.guild_members, guild_id, update.user.id);
        upsert_item(&self.0.members, key, cached)
    }

    /// Removes a member together with its presence.
    fn remove_member(&self, guild_id: GuildId, user_id: UserId) -> Option<Arc<CachedMember>> {
        if self.0.presences.remove(&(guild_id, user_id)).is_some() {
            remove_guild_item(&self.0.guild_presences, &guild_id, &user_id);
        }
        let (_, member) = self.0.members.remove(&(guild_id, user_id))?;
        remove_guild_item(&self.0.guild_members, &guild_id, &user_id);
        Some(member)
    }

    /// Merges a partial presence into the cached one. Users seen for the first time start
    /// out invisible without an activity.
    fn merge_presence(
        &self,
        guild_id: GuildId,
        update: &PresenceUpdate,
    ) -> (Option<Arc<CachedPresence>>, Arc<CachedPresence>) {
        let user_id = update.user.id;
        let old = self.presence(guild_id, user_id);
        let mut presence = old
            .as_ref()
            .map_or_else(Presence::default, |p| p.presence.clone());
        presence.merge(update.status.clone(), update.activity.clone());
        (old, self.store_presence(guild_id, user_id, presence))
    }

    fn store_presence(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        presence: Presence,
    ) -> Arc<CachedPresence> {
        upsert_guild_item(&self.0.guild_presences, guild_id, user_id);
        let (new, _) = upsert_item(
            &self.0.presences,
            (guild_id, user_id),
            CachedPresence {
                guild_id,
                user_id,
                presence,
            },
        );
        new
    }

    /// Stores a voice state, or drops it when the user is no longer in a channel.
    fn cache_voice_state(
        &self,
        guild_id: GuildId,
        state: VoiceState,
    ) -> (Option<Arc<CachedVoiceState>>, Option<Arc<CachedVoiceState>>) {
        let key = (guild_id, state.user_id);
        if let Some(channel_id) = state.channel_id {
            let cached = CachedVoiceState {
                guild_id,
                user_id: state.user_id,
                channel_id,
                session_id: state.session_id,
                deaf: state.deaf,
                mute: state.mute,
                self_deaf: state.self_deaf,
                self_mute: state.self_mute,
                suppress: state.suppress,
            };
            upsert_guild_item(&self.0.guild_voice_states, guild_id, state.user_id);
            let (new, old) = upsert_item(&self.0.voice_states, key, cached);
            (old, Some(new))
        } else {
            let old = self.0.voice_states.remove(&key).map(|(_, v)| v);
            remove_guild_item(&self.0.guild_voice_states, &guild_id, &state.user_id);
            (old, None)
        }
    }
}

#[derive(Default)]
struct EmojiDiff {
    emojis: Vec<Arc<CachedEmoji>>,
    added: Vec<Arc<CachedEmoji>>,
    removed: Vec<Arc<CachedEmoji>>,
    changed: Vec<(Arc<CachedEmoji>, Arc<CachedEmoji>)>,
}

/// Drops the entities a guild index lists but `keep` doesn't, then stores `keep` as the index.
/// Returns how many entities were dropped.
fn retain_index<I, K, V>(
    index: &DashMap<GuildId, HashSet<I>>,
    entities: &DashMap<K, Arc<V>>,
    guild_id: GuildId,
    keep: HashSet<I>,
    key: impl Fn(I) -> K,
) -> usize
where
    I: Copy + Eq + Hash,
    K: Eq + Hash,
{
    let previous = index
        .get(&guild_id)
        .map_or_else(HashSet::new, |ids| ids.value().clone());
    let mut dropped = 0;
    for id in previous.difference(&keep) {
        if entities.remove(&key(*id)).is_some() {
            dropped += 1;
        }
    }
    index.insert(guild_id, keep);
    dropped
}

fn take_index<V: Eq + Hash>(map: &DashMap<GuildId, HashSet<V>>, guild_id: GuildId) -> HashSet<V> {
    map.remove(&guild_id).map(|(_, ids)| ids).unwrap_or_default()
}

fn cached_emoji(guild_id: GuildId, emoji: Emoji) -> Option<CachedEmoji> {
    Some(CachedEmoji {
        id: emoji.id?,
        guild_id,
        name: emoji.name,
        roles: emoji.roles,
        animated: emoji.animated,
        managed: emoji.managed,
        require_colons: emoji.require_colons,
        available: emoji.available,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_models::{channel::ChannelType, guild::GuildCreate, patch::Patch};

    pub(crate) fn cache() -> Cache {
        Cache::new(Arc::new(GatewayStats::new(0).unwrap()))
    }

    pub(crate) fn guild_create(value: serde_json::Value) -> GuildCreate {
        serde_json::from_value(value).unwrap()
    }

    fn sample_guild() -> GuildCreate {
        guild_create(json!({
            "id": "1",
            "name": "Test",
            "owner_id": "100",
            "member_count": 2,
            "channels": [
                { "id": "10", "type": 4, "name": "Info", "position": 0 },
                { "id": "11", "type": 0, "name": "rules", "position": 1, "parent_id": "10" },
                { "id": "12", "type": 2, "name": "Lounge", "position": 2 }
            ],
            "roles": [
                { "id": "1", "name": "@everyone", "permissions": "0", "position": 0 },
                { "id": "20", "name": "Mod", "permissions": 8, "position": 1 }
            ],
            "emojis": [{ "id": "30", "name": "blob" }],
            "members": [
                { "user": { "id": "100", "username": "owner" }, "roles": ["20"] },
                { "user": { "id": "101", "username": "guest" }, "roles": [] }
            ],
            "presences": [{ "user": { "id": "100" }, "status": "online" }],
            "voice_states": [{ "user_id": "101", "channel_id": "12", "session_id": "s" }]
        }))
    }

    #[test]
    fn snapshot_is_indexed() {
        let c = cache();
        c.update(&sample_guild()).unwrap();
        let guild_id = GuildId::new(1);

        assert_eq!(
            c.channels(guild_id),
            vec![ChannelId::new(10), ChannelId::new(11), ChannelId::new(12)]
        );
        assert_eq!(c.roles(guild_id).len(), 2);
        assert_eq!(c.members(guild_id).len(), 2);
        assert_eq!(c.member_count(guild_id), 2);
        assert_eq!(c.guild_emojis(guild_id).len(), 1);
        assert!(c.presence(guild_id, UserId::new(100)).is_some());
        assert_eq!(
            c.voice_state(guild_id, UserId::new(101)).map(|v| v.channel_id),
            Some(ChannelId::new(12))
        );
        assert_eq!(c.stats().resource_counts.guilds.get(), 1);
        assert_eq!(c.stats().resource_counts.members.get(), 2);
    }

    #[test]
    fn parents_resolve_only_to_categories() {
        let c = cache();
        c.update(&sample_guild()).unwrap();
        assert_eq!(
            c.channel_parent(ChannelId::new(11)).map(|p| p.id),
            Some(ChannelId::new(10))
        );

        let bogus = CachedChannel {
            id: ChannelId::new(13),
            guild_id: Some(GuildId::new(1)),
            kind: ChannelType::GuildText,
            name: None,
            position: 3,
            parent_id: Some(ChannelId::new(12)),
            topic: None,
            nsfw: false,
        };
        c.upsert(Entity::Channel(Arc::new(bogus))).unwrap();
        assert!(c.channel_parent(ChannelId::new(13)).is_none());
        assert!(c.category_channels(ChannelId::new(12)).is_empty());
    }

    #[test]
    fn children_of_guild_and_category() {
        let c = cache();
        c.update(&sample_guild()).unwrap();
        let guild_id = GuildId::new(1);

        let children = c.children_of(EntityKey::Guild(guild_id));
        assert!(children.contains(&EntityKey::Channel(ChannelId::new(11))));
        assert!(children.contains(&EntityKey::Role(RoleId::new(20))));
        assert!(children.contains(&EntityKey::Emoji(EmojiId::new(30))));
        assert!(children.contains(&EntityKey::Member(guild_id, UserId::new(101))));
        assert!(children.contains(&EntityKey::Presence(guild_id, UserId::new(100))));
        assert!(children.contains(&EntityKey::VoiceState(guild_id, UserId::new(101))));
        assert_eq!(children.len(), 3 + 2 + 1 + 2 + 1 + 1);

        assert_eq!(
            c.children_of(EntityKey::Channel(ChannelId::new(10))),
            vec![EntityKey::Channel(ChannelId::new(11))]
        );
        assert!(c.children_of(EntityKey::Channel(ChannelId::new(11))).is_empty());
    }

    #[test]
    fn generic_remove_returns_value_and_cascades() {
        let c = cache();
        c.update(&sample_guild()).unwrap();

        let removed = c.remove(EntityKey::Role(RoleId::new(20)));
        assert!(matches!(removed, Some(Entity::Role(r)) if r.name == "Mod"));
        assert!(c.remove(EntityKey::Role(RoleId::new(20))).is_none());

        let removed = c.remove(EntityKey::Guild(GuildId::new(1)));
        assert!(matches!(removed, Some(Entity::Guild(g)) if g.name == "Test"));
        assert!(c.channel(ChannelId::new(10)).is_none());
        assert!(c.member(GuildId::new(1), UserId::new(100)).is_none());
        assert!(c.emoji(EmojiId::new(30)).is_none());
        assert_eq!(c.stats().resource_counts.guilds.get(), 0);
    }

    #[test]
    fn upsert_refuses_entities_of_unknown_guilds() {
        let c = cache();
        let role = CachedRole {
            id: RoleId::new(5),
            guild_id: GuildId::new(9),
            name: String::from("Lost"),
            position: 0,
            permissions: strata_models::guild::Permissions::empty(),
            color: 0,
            hoist: false,
            managed: false,
            mentionable: false,
        };
        let err = c.upsert(Entity::Role(Arc::new(role))).unwrap_err();
        assert_eq!(
            err,
            CacheError::InconsistentReference {
                entity: EntityKey::Role(RoleId::new(5)),
                missing: EntityKey::Guild(GuildId::new(9)),
            }
        );
        assert!(c.role(RoleId::new(5)).is_none());
    }

    #[test]
    fn upsert_returns_previous_value() {
        let c = cache();
        let guild = CachedGuild {
            id: GuildId::new(3),
            name: String::from("a"),
            owner_id: UserId::new(1),
            icon: None,
            description: None,
            member_count: 0,
        };
        assert!(c.upsert(Entity::Guild(Arc::new(guild.clone()))).unwrap().is_none());
        let renamed = CachedGuild {
            name: String::from("b"),
            ..guild
        };
        let old = c.upsert(Entity::Guild(Arc::new(renamed))).unwrap();
        assert!(matches!(old, Some(Entity::Guild(g)) if g.name == "a"));
        assert_eq!(c.guild(GuildId::new(3)).unwrap().name, "b");
    }

    #[test]
    fn clear_drops_everything() {
        let c = cache();
        c.update(&sample_guild()).unwrap();
        c.clear();
        assert!(c.guilds().is_empty());
        assert!(c.channel(ChannelId::new(10)).is_none());
        assert!(c.members(GuildId::new(1)).is_empty());
        assert_eq!(c.stats().resource_counts.members.get(), 0);
    }

    #[test]
    fn readers_never_see_torn_guilds() {
        let c = cache();
        c.update(&guild_create(
            json!({ "id": "1", "name": "a", "owner_id": "1" }),
        ))
        .unwrap();
        let guild_id = GuildId::new(1);

        let writer = {
            let c = c.clone();
            std::thread::spawn(move || {
                for i in 0..2_000_u32 {
                    let (name, owner) = if i % 2 == 0 { ("b", 2) } else { ("a", 1) };
                    c.update(&GuildUpdate {
                        id: guild_id,
                        name: Patch::Value(String::from(name)),
                        owner_id: Patch::Value(UserId::new(owner)),
                        icon: Patch::Absent,
                        description: Patch::Absent,
                    })
                    .unwrap();
                }
            })
        };
        let readers = (0..4)
            .map(|_| {
                let c = c.clone();
                std::thread::spawn(move || {
                    for _ in 0..2_000 {
                        let guild = c.guild(guild_id).unwrap();
                        let pair = (guild.name.as_str(), guild.owner_id.get());
                        assert!(pair == ("a", 1) || pair == ("b", 2), "torn read: {:?}", pair);
                    }
                })
            })
            .collect::<Vec<_>>();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }

    #[test]
    fn guild_stays_visible_while_snapshotted_again() {
        let c = cache();
        c.update(&sample_guild()).unwrap();
        let guild_id = GuildId::new(1);
        let done = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let readers = (0..4)
            .map(|_| {
                let c = c.clone();
                let done = Arc::clone(&done);
                std::thread::spawn(move || {
                    while !done.load(std::sync::atomic::Ordering::Acquire) {
                        assert!(c.guild(guild_id).is_some(), "guild went missing");
                        assert!(c.channel(ChannelId::new(10)).is_some(), "channel went missing");
                        assert!(c.member(guild_id, UserId::new(100)).is_some(), "member went missing");
                    }
                })
            })
            .collect::<Vec<_>>();

        let snapshot = sample_guild();
        for _ in 0..2_000 {
            c.update(&snapshot).unwrap();
        }
        done.store(true, std::sync::atomic::Ordering::Release);
        for reader in readers {
            reader.join().unwrap();
        }

        assert_eq!(c.channels(guild_id).len(), 3);
        assert_eq!(c.stats().resource_counts.guilds.get(), 1);
        assert_eq!(c.stats().resource_counts.members.get(), 2);
    }

    #[test]
    fn upsert_keeps_gauges_and_indexes_in_step() {
        let c = cache();
        c.update(&sample_guild()).unwrap();
        c.update(&guild_create(
            json!({ "id": "2", "name": "Other", "owner_id": "100", "member_count": 7 }),
        ))
        .unwrap();
        assert_eq!(c.stats().resource_counts.members.get(), 9);

        let grown = CachedGuild {
            member_count: 12,
            ..(*c.guild(GuildId::new(2)).unwrap()).clone()
        };
        c.upsert(Entity::Guild(Arc::new(grown))).unwrap();
        assert_eq!(c.stats().resource_counts.members.get(), 14);
        c.remove(EntityKey::Guild(GuildId::new(2)));
        assert_eq!(c.stats().resource_counts.members.get(), 2);

        c.update(&guild_create(
            json!({ "id": "2", "name": "Other", "owner_id": "100" }),
        ))
        .unwrap();
        let moved = CachedChannel {
            guild_id: Some(GuildId::new(2)),
            ..(*c.channel(ChannelId::new(12)).unwrap()).clone()
        };
        c.upsert(Entity::Channel(Arc::new(moved))).unwrap();
        assert_eq!(c.channels(GuildId::new(1)), vec![ChannelId::new(10), ChannelId::new(11)]);
        assert_eq!(c.channels(GuildId::new(2)), vec![ChannelId::new(12)]);

        c.remove(EntityKey::Guild(GuildId::new(1)));
        assert!(c.channel(ChannelId::new(12)).is_some());
    }
}
