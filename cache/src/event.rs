use std::ops::Deref;
use strata_models::{
    channel::{ChannelCreate, ChannelDelete, ChannelUpdate},
    gateway::{Dispatch, Ready, UserUpdate},
    guild::{
        GuildCreate, GuildDelete, GuildEmojisUpdate, GuildUpdate, MemberAdd, MemberChunk,
        MemberRemove, MemberUpdate, RoleCreate, RoleDelete, RoleUpdate,
    },
    presence::PresenceUpdate,
    voice::VoiceStateUpdate,
};
use tracing::{debug, info};

use super::{Cache, CacheError, CachedChannel, CachedRole, DomainEvent, EntityKey};

pub trait UpdateCache {
    fn update(&self, cache: &Cache) -> Result<DomainEvent, CacheError>;
}

impl UpdateCache for Dispatch {
    fn update(&self, c: &Cache) -> Result<DomainEvent, CacheError> {
        use Dispatch::{
            ChannelCreate, ChannelDelete, ChannelUpdate, GuildCreate, GuildDelete,
            GuildEmojisUpdate, GuildUpdate, MemberAdd, MemberChunk, MemberRemove, MemberUpdate,
            PresenceUpdate, Ready, RoleCreate, RoleDelete, RoleUpdate, Unknown, UserUpdate,
            VoiceStateUpdate,
        };

        match self {
            ChannelCreate(v) => c.update(v),
            ChannelDelete(v) => c.update(v),
            ChannelUpdate(v) => c.update(v),
            GuildCreate(v) => c.update(v.deref()),
            GuildDelete(v) => c.update(v),
            GuildEmojisUpdate(v) => c.update(v),
            GuildUpdate(v) => c.update(v),
            MemberAdd(v) => c.update(v.deref()),
            MemberChunk(v) => c.update(v),
            MemberRemove(v) => c.update(v),
            MemberUpdate(v) => c.update(v.deref()),
            PresenceUpdate(v) => c.update(v.deref()),
            Ready(v) => c.update(v.deref()),
            RoleCreate(v) => c.update(v),
            RoleDelete(v) => c.update(v),
            RoleUpdate(v) => c.update(v),
            UserUpdate(v) => c.update(v),
            VoiceStateUpdate(v) => c.update(v.deref()),
            Unknown(v) => {
                debug!(event = %v.name, "Passing through an unrecognized dispatch");
                Ok(DomainEvent::Unknown(v.clone()))
            }
        }
    }
}

impl UpdateCache for Ready {
    fn update(&self, c: &Cache) -> Result<DomainEvent, CacheError> {
        let (_, user) = c.cache_current_user(self.user.clone());

        // Whatever was cached for these guilds predates the session. They are filled
        // in again as their snapshots arrive.
        let mut guilds = Vec::with_capacity(self.guilds.len());
        for guild in &self.guilds {
            if c.remove_guild(guild.id).is_some() {
                debug!(guild = ?guild.id, "Dropping guild state from the previous session");
            }
            c.mark_unavailable(guild.id);
            guilds.push(guild.id);
        }

        info!(user = %user.tag(), guilds = guilds.len(), "Session ready");
        Ok(DomainEvent::Ready {
            user,
            guilds,
            session_id: self.session_id.clone(),
        })
    }
}

impl UpdateCache for UserUpdate {
    fn update(&self, c: &Cache) -> Result<DomainEvent, CacheError> {
        let (old, new) = c.cache_current_user(self.0.clone());
        Ok(DomainEvent::CurrentUserUpdated { old, new })
    }
}

impl UpdateCache for GuildCreate {
    fn update(&self, c: &Cache) -> Result<DomainEvent, CacheError> {
        let guild_id = self.0.id;
        if self.0.unavailable {
            let prior = c.remove_guild(guild_id);
            c.mark_unavailable(guild_id);
            info!(guild = ?guild_id, "Guild is unavailable");
            return Ok(DomainEvent::GuildUnavailable {
                guild_id,
                unavailable: true,
                prior: prior.map(Box::new),
            });
        }

        let (guild, recovered) = c.cache_guild(self.0.clone());
        info!(guild = ?guild_id, recovered, "Guild available");
        Ok(DomainEvent::GuildAvailable { guild, recovered })
    }
}

impl UpdateCache for GuildDelete {
    fn update(&self, c: &Cache) -> Result<DomainEvent, CacheError> {
        let prior = c.remove_guild(self.id);
        if self.unavailable {
            c.mark_unavailable(self.id);
            info!(guild = ?self.id, "Guild became unavailable");
        } else {
            c.0.unavailable_guilds.remove(&self.id);
            info!(guild = ?self.id, "Guild removed");
        }

        Ok(DomainEvent::GuildUnavailable {
            guild_id: self.id,
            unavailable: self.unavailable,
            prior: prior.map(Box::new),
        })
    }
}

impl UpdateCache for GuildUpdate {
    fn update(&self, c: &Cache) -> Result<DomainEvent, CacheError> {
        let key = EntityKey::Guild(self.id);
        let (old, new) = c
            .merge_guild(self)
            .ok_or(CacheError::InconsistentReference {
                entity: key,
                missing: key,
            })?;
        Ok(DomainEvent::GuildUpdated { old, new })
    }
}

impl UpdateCache for ChannelCreate {
    fn update(&self, c: &Cache) -> Result<DomainEvent, CacheError> {
        let channel = CachedChannel::from_channel(self.0.clone(), None);
        if let Some(guild_id) = channel.guild_id {
            c.require_guild(guild_id, EntityKey::Channel(channel.id))?;
        }
        let (channel, _) = c.cache_channel(channel);
        Ok(DomainEvent::ChannelCreated { channel })
    }
}

impl UpdateCache for ChannelUpdate {
    fn update(&self, c: &Cache) -> Result<DomainEvent, CacheError> {
        let key = EntityKey::Channel(self.id);
        if let Some(guild_id) = self.guild_id {
            c.require_guild(guild_id, key)?;
        }
        if let Some((old, new)) = c.merge_channel(self) {
            return Ok(DomainEvent::ChannelUpdated {
                old: Some(old),
                new,
            });
        }

        // A channel we haven't seen can only be cached once we know what kind it is.
        let kind = *self.kind.value().ok_or(CacheError::InconsistentReference {
            entity: key,
            missing: key,
        })?;
        let channel = CachedChannel {
            id: self.id,
            guild_id: self.guild_id,
            kind,
            name: self.name.value().cloned(),
            position: self.position.value().copied().unwrap_or_default(),
            parent_id: self.parent_id.value().copied(),
            topic: self.topic.value().cloned(),
            nsfw: self.nsfw.value().copied().unwrap_or_default(),
        };
        let (new, _) = c.cache_channel(channel);
        Ok(DomainEvent::ChannelUpdated { old: None, new })
    }
}

impl UpdateCache for ChannelDelete {
    fn update(&self, c: &Cache) -> Result<DomainEvent, CacheError> {
        let channel_id = self.0.id;
        let (channel, orphaned) = match c.delete_channel(channel_id) {
            Some((channel, orphaned)) => (Some(channel), orphaned),
            None => {
                debug!(channel = ?channel_id, "Deleted channel was not cached");
                (None, Vec::new())
            }
        };
        Ok(DomainEvent::ChannelDeleted {
            channel_id,
            guild_id: self
                .0
                .guild_id
                .or_else(|| channel.as_ref().and_then(|c| c.guild_id)),
            channel,
            orphaned,
        })
    }
}

impl UpdateCache for RoleCreate {
    fn update(&self, c: &Cache) -> Result<DomainEvent, CacheError> {
        c.require_guild(self.guild_id, EntityKey::Role(self.role.id))?;
        let (role, _) = c.cache_role(CachedRole::from_role(self.role.clone(), self.guild_id));
        Ok(DomainEvent::RoleCreated { role })
    }
}

impl UpdateCache for RoleUpdate {
    fn update(&self, c: &Cache) -> Result<DomainEvent, CacheError> {
        c.require_guild(self.guild_id, EntityKey::Role(self.role.id))?;
        let (new, old) = c.cache_role(CachedRole::from_role(self.role.clone(), self.guild_id));
        Ok(DomainEvent::RoleUpdated { old, new })
    }
}

impl UpdateCache for RoleDelete {
    fn update(&self, c: &Cache) -> Result<DomainEvent, CacheError> {
        let role = c.delete_role(self.guild_id, self.role_id);
        if role.is_none() {
            debug!(guild = ?self.guild_id, role = ?self.role_id, "Deleted role was not cached");
        }
        Ok(DomainEvent::RoleDeleted {
            guild_id: self.guild_id,
            role_id: self.role_id,
            role,
        })
    }
}

impl UpdateCache for MemberAdd {
    fn update(&self, c: &Cache) -> Result<DomainEvent, CacheError> {
        let key = EntityKey::Member(self.guild_id, self.member.user.id);
        c.require_guild(self.guild_id, key)?;
        let (member, old) = c.cache_member(self.guild_id, self.member.clone());
        if old.is_none() {
            c.adjust_member_count(self.guild_id, true);
        }
        Ok(DomainEvent::MemberAdded { member })
    }
}

impl UpdateCache for MemberUpdate {
    fn update(&self, c: &Cache) -> Result<DomainEvent, CacheError> {
        c.require_guild(self.guild_id, EntityKey::Member(self.guild_id, self.user.id))?;
        let (new, old) = c.merge_member(self);
        Ok(DomainEvent::MemberUpdated { old, new })
    }
}

impl UpdateCache for MemberRemove {
    fn update(&self, c: &Cache) -> Result<DomainEvent, CacheError> {
        let member = c.remove_member(self.guild_id, self.user.id);
        if member.is_some() {
            c.adjust_member_count(self.guild_id, false);
        }
        Ok(DomainEvent::MemberRemoved {
            guild_id: self.guild_id,
            user: self.user.clone(),
            member,
        })
    }
}

impl UpdateCache for MemberChunk {
    fn update(&self, c: &Cache) -> Result<DomainEvent, CacheError> {
        c.require_guild(self.guild_id, EntityKey::Guild(self.guild_id))?;
        info!(
            guild = ?self.guild_id,
            index = self.chunk_index,
            count = self.chunk_count,
            "Member chunk received"
        );

        for member in &self.members {
            c.cache_member(self.guild_id, member.clone());
        }
        for presence in &self.presences {
            c.merge_presence(self.guild_id, presence);
        }

        Ok(DomainEvent::MembersChunk {
            guild_id: self.guild_id,
            members: self.members.len(),
            presences: self.presences.len(),
            chunk_index: self.chunk_index,
            chunk_count: self.chunk_count,
        })
    }
}

impl UpdateCache for PresenceUpdate {
    fn update(&self, c: &Cache) -> Result<DomainEvent, CacheError> {
        let guild_id = self.guild_id.ok_or(CacheError::MissingGuildId {
            event: "PRESENCE_UPDATE",
        })?;
        c.require_guild(guild_id, EntityKey::Presence(guild_id, self.user.id))?;
        let (old, new) = c.merge_presence(guild_id, self);
        Ok(DomainEvent::PresenceUpdated {
            guild_id,
            user_id: self.user.id,
            old,
            new,
        })
    }
}

impl UpdateCache for GuildEmojisUpdate {
    fn update(&self, c: &Cache) -> Result<DomainEvent, CacheError> {
        c.require_guild(self.guild_id, EntityKey::Guild(self.guild_id))?;
        let diff = c.replace_emojis(self.guild_id, &self.emojis);
        Ok(DomainEvent::EmojisUpdated {
            guild_id: self.guild_id,
            emojis: diff.emojis,
            added: diff.added,
            removed: diff.removed,
            changed: diff.changed,
        })
    }
}

impl UpdateCache for VoiceStateUpdate {
    fn update(&self, c: &Cache) -> Result<DomainEvent, CacheError> {
        let guild_id = self.0.guild_id.ok_or(CacheError::MissingGuildId {
            event: "VOICE_STATE_UPDATE",
        })?;
        c.require_guild(guild_id, EntityKey::VoiceState(guild_id, self.0.user_id))?;
        let (old, new) = c.cache_voice_state(guild_id, self.0.clone());
        Ok(DomainEvent::VoiceStateUpdated {
            guild_id,
            user_id: self.0.user_id,
            old,
            new,
        })
    }
}
