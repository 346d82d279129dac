mod emoji;
mod member;
mod role;

use serde::{Deserialize, Serialize};

use crate::{
    channel::Channel,
    id::{GuildId, UserId},
    patch::Patch,
    presence::PresenceUpdate,
    voice::VoiceState,
};

pub use emoji::*;
pub use member::*;
pub use role::*;

/// The full description of a guild sent when it becomes available.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Guild {
    pub id: GuildId,
    #[serde(default)]
    pub name: String,
    pub owner_id: UserId,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub member_count: Option<u64>,
    #[serde(default)]
    pub unavailable: bool,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub emojis: Vec<Emoji>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub presences: Vec<PresenceUpdate>,
    #[serde(default)]
    pub voice_states: Vec<VoiceState>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GuildCreate(pub Guild);

/// Only the fields that changed are present.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GuildUpdate {
    pub id: GuildId,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub name: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub owner_id: Patch<UserId>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub icon: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub description: Patch<String>,
}

/// Sent when the guild is removed or goes through an outage. `unavailable` is only
/// set for outages.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GuildDelete {
    pub id: GuildId,
    #[serde(default)]
    pub unavailable: bool,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct UnavailableGuild {
    pub id: GuildId,
    #[serde(default)]
    pub unavailable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelType;
    use serde_json::json;

    #[test]
    fn snapshot_decodes_nested_entities() {
        let guild: GuildCreate = serde_json::from_value(json!({
            "id": "1",
            "name": "Test",
            "owner_id": 5,
            "member_count": 2,
            "channels": [
                { "id": "10", "type": 4, "name": "Info" },
                { "id": 11, "type": 0, "name": "rules", "parent_id": "10" }
            ],
            "roles": [{ "id": "1", "name": "@everyone", "permissions": "104324673", "position": 0 }],
            "members": [{ "user": { "id": "5", "username": "owner" }, "roles": [] }],
            "presences": [{ "user": { "id": "5" }, "status": "online" }],
            "voice_states": [{ "user_id": "5", "channel_id": "12", "session_id": "abc" }]
        }))
        .unwrap();
        let guild = guild.0;
        assert_eq!(guild.id, GuildId::new(1));
        assert_eq!(guild.owner_id, UserId::new(5));
        assert_eq!(guild.channels[0].kind, ChannelType::GuildCategory);
        assert_eq!(guild.channels[1].parent_id.map(|c| c.get()), Some(10));
        assert_eq!(guild.roles.len(), 1);
        assert_eq!(guild.members.len(), 1);
        assert_eq!(guild.presences.len(), 1);
        assert_eq!(guild.voice_states[0].guild_id, None);
    }

    #[test]
    fn delete_distinguishes_outage() {
        let removed: GuildDelete = serde_json::from_value(json!({ "id": "1" })).unwrap();
        let outage: GuildDelete =
            serde_json::from_value(json!({ "id": "1", "unavailable": true })).unwrap();
        assert!(!removed.unavailable);
        assert!(outage.unavailable);
    }
}
