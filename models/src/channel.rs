use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    id::{ChannelId, GuildId},
    patch::Patch,
};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ChannelType {
    GuildText,
    Private,
    GuildVoice,
    Group,
    GuildCategory,
    GuildNews,
    GuildStore,
    GuildStageVoice,
    Unknown(u8),
}

impl ChannelType {
    pub const fn is_category(self) -> bool {
        matches!(self, Self::GuildCategory)
    }

    /// Whether channels of this kind can sit under a category.
    pub const fn is_categorizable(self) -> bool {
        matches!(
            self,
            Self::GuildText
                | Self::GuildVoice
                | Self::GuildNews
                | Self::GuildStore
                | Self::GuildStageVoice
        )
    }
}

impl From<u8> for ChannelType {
    fn from(n: u8) -> Self {
        match n {
            0 => Self::GuildText,
            1 => Self::Private,
            2 => Self::GuildVoice,
            3 => Self::Group,
            4 => Self::GuildCategory,
            5 => Self::GuildNews,
            6 => Self::GuildStore,
            13 => Self::GuildStageVoice,
            other => Self::Unknown(other),
        }
    }
}

impl From<ChannelType> for u8 {
    fn from(kind: ChannelType) -> Self {
        match kind {
            ChannelType::GuildText => 0,
            ChannelType::Private => 1,
            ChannelType::GuildVoice => 2,
            ChannelType::Group => 3,
            ChannelType::GuildCategory => 4,
            ChannelType::GuildNews => 5,
            ChannelType::GuildStore => 6,
            ChannelType::GuildStageVoice => 13,
            ChannelType::Unknown(other) => other,
        }
    }
}

impl<'de> Deserialize<'de> for ChannelType {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        u8::deserialize(d).map(Self::from)
    }
}

impl Serialize for ChannelType {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u8((*self).into())
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Channel {
    pub id: ChannelId,
    #[serde(rename = "type")]
    pub kind: ChannelType,
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub parent_id: Option<ChannelId>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub nsfw: bool,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ChannelCreate(pub Channel);

/// Only the fields that changed are present.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ChannelUpdate {
    pub id: ChannelId,
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    #[serde(default, rename = "type", skip_serializing_if = "Patch::is_absent")]
    pub kind: Patch<ChannelType>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub name: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub position: Patch<i64>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub parent_id: Patch<ChannelId>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub topic: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub nsfw: Patch<bool>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ChannelDelete(pub Channel);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_channel_types_survive() {
        let channel: Channel = serde_json::from_value(json!({
            "id": "10",
            "type": 99,
            "guild_id": "1"
        }))
        .unwrap();
        assert_eq!(channel.kind, ChannelType::Unknown(99));
        assert_eq!(serde_json::to_value(channel.kind).unwrap(), json!(99));
    }

    #[test]
    fn update_keeps_null_and_absent_apart() {
        let update: ChannelUpdate = serde_json::from_value(json!({
            "id": 10,
            "parent_id": null,
            "name": "general"
        }))
        .unwrap();
        assert!(update.parent_id.is_null());
        assert!(update.topic.is_absent());
        assert_eq!(update.name, Patch::Value(String::from("general")));
    }
}
