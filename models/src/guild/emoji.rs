use serde::{Deserialize, Serialize};

use crate::id::{EmojiId, GuildId, RoleId};

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Emoji {
    /// Unicode emojis have no id and are never cached.
    #[serde(default)]
    pub id: Option<EmojiId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Vec<RoleId>,
    #[serde(default)]
    pub animated: bool,
    #[serde(default)]
    pub managed: bool,
    #[serde(default)]
    pub require_colons: bool,
    #[serde(default = "available")]
    pub available: bool,
}

const fn available() -> bool {
    true
}

/// The complete emoji list of a guild. It replaces whatever was known before.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GuildEmojisUpdate {
    pub guild_id: GuildId,
    #[serde(default)]
    pub emojis: Vec<Emoji>,
}
