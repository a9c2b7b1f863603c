use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, str::FromStr};
use uuid::Uuid;

/// A submitted meme. `cluster_id` is derived from the perceptual hash, so
/// near-duplicate images share a cluster.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Meme {
    #[serde(rename = "id")]
    pub meme_id: Uuid,
    pub image_url: String,
    pub perceptual_hash: String,
    pub cluster_id: String,
    pub created_at: DateTime<Utc>,
    pub like_count: u64,
    pub share_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Like,
    Dislike,
    Skip,
}

impl VoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteKind::Like => "like",
            VoteKind::Dislike => "dislike",
            VoteKind::Skip => "skip",
        }
    }
}

impl fmt::Display for VoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "like" => Ok(VoteKind::Like),
            "dislike" => Ok(VoteKind::Dislike),
            "skip" => Ok(VoteKind::Skip),
            other => Err(format!(
                "unknown swipe action '{}', expected one of like, dislike, skip",
                other
            )),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Vote {
    pub vote_id: Uuid,
    pub user_id: String,
    pub meme_id: Uuid,
    pub vote_type: VoteKind,
    pub cluster_id: String,
    pub created_at: DateTime<Utc>,
}

/// One entry of the append-only feed history.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ShownRecord {
    pub user_id: String,
    pub meme_id: Uuid,
    pub cluster_id: String,
    pub shown_at: DateTime<Utc>,
}

/// Per-request snapshot of how often each cluster was recently shown to and
/// disliked by a user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserLimits {
    /// Times shown in the trailing 24 hours, by cluster.
    pub shown_last_day: HashMap<String, u64>,
    /// All-time dislikes, by cluster.
    pub disliked: HashMap<String, u64>,
}

impl UserLimits {
    pub fn dislikes_for(&self, cluster_id: &str) -> u64 {
        self.disliked.get(cluster_id).copied().unwrap_or(0)
    }

    pub fn shown_recently(&self, cluster_id: &str) -> u64 {
        self.shown_last_day.get(cluster_id).copied().unwrap_or(0)
    }
}

// --- Request payloads ---

#[derive(Deserialize, Debug, Clone)]
pub struct CreateMemeRequest {
    pub image_url: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SwipeRequest {
    pub user_id: String,
    pub meme_id: String,
    pub action: String,
}

// --- Timestamp helpers ---

/// Fixed-width RFC 3339 in UTC, so string order matches time order in storage keys.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses a stored timestamp. Offsets are normalized to UTC and timestamps
/// without an offset are taken to already be UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(aware) = DateTime::parse_from_rfc3339(raw) {
        return Some(aware.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
