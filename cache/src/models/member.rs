use std::sync::Arc;
use strata_models::{
    guild::Member,
    id::{GuildId, RoleId},
    user::User,
};

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CachedMember {
    pub guild_id: GuildId,
    pub user: Arc<User>,
    pub nick: Option<String>,
    pub roles: Vec<RoleId>,
    pub joined_at: Option<String>,
    pub deaf: bool,
    pub mute: bool,
}

impl CachedMember {
    /// The nickname if one is set, the username otherwise.
    pub fn display_name(&self) -> &str {
        self.nick.as_deref().unwrap_or(&self.user.username)
    }
}

impl PartialEq<Member> for CachedMember {
    fn eq(&self, other: &Member) -> bool {
        (&self.nick, &self.roles, &self.joined_at, self.deaf, self.mute)
            == (&other.nick, &other.roles, &other.joined_at, other.deaf, other.mute)
            && *self.user == other.user
    }
}
