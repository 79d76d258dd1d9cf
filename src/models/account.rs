//! Account model
//!
//! Accounts come from the hosted auth service; profiles are the matching
//! rows of the public `users` table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::RecordId;

/// Account role.
///
/// Only artists may upload artworks and open the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    /// Plain user (enthusiast)
    #[default]
    User,
    /// Artist - can upload and manage artworks
    Artist,
}

impl Role {
    /// Numeric code stored in the account metadata at sign-up
    pub fn metadata_code(self) -> u8 {
        match self {
            Role::User => 1,
            Role::Artist => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Role::User),
            2 => Some(Role::Artist),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Artist => write!(f, "artist"),
        }
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" | "enthusiast" | "1" => Ok(Role::User),
            "artist" | "2" => Ok(Role::Artist),
            _ => Err(anyhow::anyhow!("Invalid role: {}", s)),
        }
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Code(i64),
            Name(String),
        }

        // Unknown values are plain users; the backend owns the real policy.
        Ok(match Option::<Raw>::deserialize(deserializer)? {
            Some(Raw::Code(code)) => Role::from_code(code).unwrap_or_default(),
            Some(Raw::Name(name)) => name.parse().unwrap_or_default(),
            None => Role::User,
        })
    }
}

/// The signed-in account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: RecordId,
    pub email: String,
    /// Display name from the profile metadata
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub role: Role,
}

/// Background colours the header cycles through for avatar placeholders
pub const AVATAR_PALETTE_SIZE: usize = 8;

impl Account {
    pub fn is_artist(&self) -> bool {
        self.role == Role::Artist
    }

    /// Name shown in the header: profile name, then email, then "User"
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .or_else(|| Some(self.email.as_str()).filter(|e| !e.is_empty()))
            .unwrap_or("User")
    }

    /// Uppercased first letter of the display name
    pub fn initial(&self) -> String {
        self.display_name()
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_else(|| "U".to_string())
    }

    /// Palette slot for the placeholder avatar, keyed on the initial
    pub fn avatar_palette_index(&self) -> usize {
        let code = self.initial().chars().next().map(|c| c as usize).unwrap_or(0);
        code % AVATAR_PALETTE_SIZE
    }

    /// Avatar URL if it is usable as an image source
    pub fn avatar(&self) -> Option<&str> {
        validated_avatar_url(self.avatar_url.as_deref())
    }
}

/// Reject avatar values that would render as a broken image.
pub fn validated_avatar_url(raw: Option<&str>) -> Option<&str> {
    let url = raw?.trim();
    if url.is_empty() || url == "null" || url == "undefined" || !url.starts_with("http") {
        return None;
    }
    Some(url)
}

/// Row of the public `users` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: RecordId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn is_artist(&self) -> bool {
        self.role == Role::Artist
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("User")
    }
}

/// User fields joined onto artworks, comments, likes and notifications
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(default)]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl UserSummary {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("Anonymous")
    }
}
