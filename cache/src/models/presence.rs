use strata_models::{
    id::{GuildId, UserId},
    presence::{Activity, Presence, Status},
};

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CachedPresence {
    pub guild_id: GuildId,
    pub user_id: UserId,
    pub presence: Presence,
}

impl CachedPresence {
    pub const fn status(&self) -> Status {
        self.presence.status
    }

    pub const fn activity(&self) -> Option<&Activity> {
        self.presence.activity.as_ref()
    }
}
