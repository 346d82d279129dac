use serde::{Deserialize, Serialize};

use crate::id::UserId;

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

/// Some payloads (presences, member removals) only guarantee the user id.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct PartialUser {
    pub id: UserId,
}

impl User {
    /// `name#1234` for accounts that still carry a discriminator, the bare name otherwise.
    pub fn tag(&self) -> String {
        match self.discriminator.as_deref() {
            Some(d) if d != "0" => format!("{}#{}", self.username, d),
            _ => self.username.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tag() {
        let user: User = serde_json::from_value(json!({
            "id": "1",
            "username": "wumpus",
            "discriminator": "0001"
        }))
        .unwrap();
        assert_eq!(user.tag(), "wumpus#0001");

        let migrated: User =
            serde_json::from_value(json!({ "id": 2, "username": "nelly", "discriminator": "0" }))
                .unwrap();
        assert_eq!(migrated.tag(), "nelly");
    }
}
