use strata_models::{
    guild::{Permissions, Role},
    id::{GuildId, RoleId},
};

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CachedRole {
    pub id: RoleId,
    pub guild_id: GuildId,
    pub name: String,
    pub position: i64,
    pub permissions: Permissions,
    pub color: u32,
    pub hoist: bool,
    pub managed: bool,
    pub mentionable: bool,
}

impl CachedRole {
    pub(crate) fn from_role(role: Role, guild_id: GuildId) -> Self {
        Self {
            id: role.id,
            guild_id,
            name: role.name,
            position: role.position,
            permissions: role.permissions,
            color: role.color,
            hoist: role.hoist,
            managed: role.managed,
            mentionable: role.mentionable,
        }
    }

    /// The `@everyone` role shares its id with the guild.
    pub const fn is_everyone(&self) -> bool {
        self.id.get() == self.guild_id.get()
    }
}
