use strata_models::id::{EmojiId, GuildId, RoleId};

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CachedEmoji {
    pub id: EmojiId,
    pub guild_id: GuildId,
    pub name: Option<String>,
    pub roles: Vec<RoleId>,
    pub animated: bool,
    pub managed: bool,
    pub require_colons: bool,
    pub available: bool,
}
