use serde::{Deserialize, Serialize};

use crate::id::{ChannelId, GuildId};

/// An invite, identified by its code. Invites are looked up or acted on one at a
/// time and are never part of the cached state.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Invite {
    pub code: String,
    /// Human readable alternative to the code, when the invite has one.
    #[serde(default, rename = "xkcdpass")]
    pub xkcd_pass: Option<String>,
}

impl Invite {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            xkcd_pass: None,
        }
    }

    /// Accepts either a bare code or an invite link and keeps the last path segment.
    pub fn from_link(link: &str) -> Option<Self> {
        let code = link.trim().trim_end_matches('/').rsplit('/').next()?;
        if code.is_empty() || code.contains(':') {
            return None;
        }
        Some(Self::new(code))
    }
}

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct InviteGuild {
    pub id: GuildId,
    pub name: String,
}

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct InviteChannel {
    pub id: ChannelId,
    #[serde(default)]
    pub name: Option<String>,
}

/// What an invite resolves to: the guild it leads to and the channel it was created from.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct InviteDetails {
    pub code: String,
    #[serde(default, rename = "xkcdpass")]
    pub xkcd_pass: Option<String>,
    pub guild: InviteGuild,
    pub channel: InviteChannel,
}

impl InviteDetails {
    pub fn invite(&self) -> Invite {
        Invite {
            code: self.code.clone(),
            xkcd_pass: self.xkcd_pass.clone(),
        }
    }
}
