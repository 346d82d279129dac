use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::{id::GuildId, patch::Patch, user::PartialUser};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Status {
    #[serde(rename = "online")]
    Online,
    #[serde(rename = "idle")]
    Idle,
    #[serde(rename = "dnd")]
    DoNotDisturb,
    /// Others see an invisible user as offline, so both spellings land here.
    #[serde(rename = "invisible", alias = "offline")]
    Invisible,
}

impl Status {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Idle => "idle",
            Self::DoNotDisturb => "dnd",
            Self::Invisible => "invisible",
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::Invisible
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Deserialize_repr, Eq, Hash, PartialEq, Serialize_repr)]
#[repr(u8)]
pub enum ActivityType {
    Game = 0,
    Streaming = 1,
    Listening = 2,
    Watching = 3,
    Custom = 4,
    Competing = 5,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct ActivityTimestamps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<u64>,
}

impl ActivityTimestamps {
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start.and_then(millis_to_time)
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end.and_then(millis_to_time)
    }
}

fn millis_to_time(millis: u64) -> Option<DateTime<Utc>> {
    let millis = i64::try_from(millis).ok()?;
    Utc.timestamp_millis_opt(millis).single()
}

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Activity {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<ActivityTimestamps>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl Activity {
    fn new(name: impl Into<String>, kind: ActivityType) -> Self {
        Self {
            name: name.into(),
            kind,
            url: None,
            timestamps: None,
            state: None,
        }
    }

    pub fn playing(name: impl Into<String>) -> Self {
        Self::new(name, ActivityType::Game)
    }

    pub fn streaming(name: impl Into<String>, url: impl Into<String>) -> Self {
        let mut activity = Self::new(name, ActivityType::Streaming);
        activity.url = Some(url.into());
        activity
    }

    pub fn listening(name: impl Into<String>) -> Self {
        Self::new(name, ActivityType::Listening)
    }

    pub fn watching(name: impl Into<String>) -> Self {
        Self::new(name, ActivityType::Watching)
    }

    /// The stream url, only meaningful for streaming activities.
    pub fn streaming_url(&self) -> Option<&str> {
        match self.kind {
            ActivityType::Streaming => self.url.as_deref(),
            _ => None,
        }
    }

    /// Custom statuses carry no timing information.
    pub fn timestamps(&self) -> Option<&ActivityTimestamps> {
        match self.kind {
            ActivityType::Custom => None,
            _ => self.timestamps.as_ref(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Presence {
    pub status: Status,
    pub activity: Option<Activity>,
}

impl Presence {
    pub const fn new(status: Status, activity: Option<Activity>) -> Self {
        Self { status, activity }
    }

    pub const fn online() -> Self {
        Self::new(Status::Online, None)
    }

    pub const fn online_with(activity: Activity) -> Self {
        Self::new(Status::Online, Some(activity))
    }

    pub const fn idle() -> Self {
        Self::new(Status::Idle, None)
    }

    pub const fn idle_with(activity: Activity) -> Self {
        Self::new(Status::Idle, Some(activity))
    }

    pub const fn do_not_disturb() -> Self {
        Self::new(Status::DoNotDisturb, None)
    }

    pub const fn do_not_disturb_with(activity: Activity) -> Self {
        Self::new(Status::DoNotDisturb, Some(activity))
    }

    pub const fn invisible() -> Self {
        Self::new(Status::Invisible, None)
    }

    /// Merges a partial presence update. Returns whether anything changed.
    pub fn merge(&mut self, status: Patch<Status>, activity: Patch<Activity>) -> bool {
        let status_changed = status.apply(&mut self.status);
        let activity_changed = activity.apply_nullable(&mut self.activity);
        status_changed || activity_changed
    }

    /// Shapes the presence as an outgoing status update.
    pub fn as_status_update(&self) -> StatusUpdate {
        let game = self.activity.as_ref().map(|activity| Game {
            name: activity.name.clone(),
            kind: activity.kind,
            url: activity.streaming_url().map(ToOwned::to_owned),
        });

        StatusUpdate {
            game,
            status: self.status,
        }
    }
}

/// The outgoing request for changing the current user's status. Fields absent
/// from the presence are left out rather than sent as `null`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct StatusUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game: Option<Game>,
    pub status: Status,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Game {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Presence change of a single user in a guild. Only the fields that changed are
/// present. Older payloads name the activity `game`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PresenceUpdate {
    pub user: PartialUser,
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub status: Patch<Status>,
    #[serde(default, alias = "game", skip_serializing_if = "Patch::is_absent")]
    pub activity: Patch<Activity>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn offline_is_invisible() {
        let status: Status = serde_json::from_value(json!("offline")).unwrap();
        assert_eq!(status, Status::Invisible);
        assert_eq!(serde_json::to_value(status).unwrap(), json!("invisible"));
        assert_eq!(Status::DoNotDisturb.to_string(), "dnd");
    }

    #[test]
    fn status_update_omits_absent_fields() {
        let update = Presence::idle().as_status_update();
        assert_eq!(serde_json::to_value(update).unwrap(), json!({ "status": "idle" }));

        let update = Presence::online_with(Activity::playing("Chess")).as_status_update();
        assert_eq!(
            serde_json::to_value(update).unwrap(),
            json!({ "game": { "name": "Chess", "type": 0 }, "status": "online" })
        );
    }

    #[test]
    fn status_update_keeps_stream_url() {
        let activity = Activity::streaming("Speedrun", "https://twitch.tv/someone");
        let update = Presence::do_not_disturb_with(activity).as_status_update();
        assert_eq!(
            serde_json::to_value(update).unwrap(),
            json!({
                "game": { "name": "Speedrun", "type": 1, "url": "https://twitch.tv/someone" },
                "status": "dnd"
            })
        );
    }

    #[test]
    fn url_only_meaningful_when_streaming() {
        let mut activity = Activity::watching("a film");
        activity.url = Some(String::from("https://example.com"));
        assert_eq!(activity.streaming_url(), None);
        let update = Presence::online_with(activity).as_status_update();
        assert_eq!(update.game.and_then(|g| g.url), None);
    }

    #[test]
    fn custom_activities_hide_timestamps() {
        let activity: Activity = serde_json::from_value(json!({
            "name": "Custom Status",
            "type": 4,
            "state": "brb",
            "timestamps": { "start": 1_600_000_000_000_u64 }
        }))
        .unwrap();
        assert!(activity.timestamps().is_none());

        let game: Activity = serde_json::from_value(json!({
            "name": "Chess",
            "type": 0,
            "timestamps": { "start": 1_600_000_000_000_u64 }
        }))
        .unwrap();
        let start = game.timestamps().and_then(ActivityTimestamps::start_time).unwrap();
        assert_eq!(start.timestamp(), 1_600_000_000);
    }

    #[test]
    fn empty_activity_is_not_no_activity() {
        let mut presence = Presence::online_with(Activity::playing(""));
        assert!(presence.activity.is_some());
        presence.merge(Patch::Absent, Patch::Null);
        assert!(presence.activity.is_none());
    }

    #[test]
    fn presence_update_reads_legacy_game_field() {
        let update: PresenceUpdate = serde_json::from_value(json!({
            "user": { "id": "1" },
            "guild_id": "2",
            "game": null
        }))
        .unwrap();
        assert!(update.status.is_absent());
        assert!(update.activity.is_null());
    }
}
