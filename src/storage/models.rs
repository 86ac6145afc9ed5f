//! Record types persisted in the data directory.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use strum::{AsRefStr, Display, EnumString};

/// Identity fields captured the first time a user is seen
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(with = "timestamp")]
    pub added: DateTime<Utc>,
}

/// Parses an RFC3339 timestamp, or a zone-less one read as local time.
///
/// Older record files were written with naive local timestamps such as
/// `2024-05-01T12:00:00.123456`.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => Ok(parsed.with_timezone(&Utc)),
        Err(rfc_err) => {
            let naive = raw.parse::<NaiveDateTime>().map_err(|_| rfc_err)?;
            Ok(Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|local| local.with_timezone(&Utc))
                .unwrap_or_else(|| naive.and_utc()))
        }
    }
}

/// Serde adapter for timestamp fields, lenient on read via [`parse_timestamp`]
pub(crate) mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

/// End of a ban. Serialized as an RFC3339 timestamp or the string `permanent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanExpiry {
    Permanent,
    At(DateTime<Utc>),
}

impl BanExpiry {
    /// True once `now` is at or after the expiry instant
    pub fn has_expired(&self, now: DateTime<Utc>) -> bool {
        match self {
            BanExpiry::Permanent => false,
            BanExpiry::At(until) => now >= *until,
        }
    }

    /// True when this ban ends no earlier than `other`
    pub fn outlasts(&self, other: &BanExpiry) -> bool {
        match (self, other) {
            (BanExpiry::Permanent, _) => true,
            (BanExpiry::At(_), BanExpiry::Permanent) => false,
            (BanExpiry::At(mine), BanExpiry::At(theirs)) => mine >= theirs,
        }
    }
}

impl fmt::Display for BanExpiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BanExpiry::Permanent => write!(f, "permanent"),
            BanExpiry::At(until) => write!(f, "{}", until.to_rfc3339()),
        }
    }
}

impl TryFrom<String> for BanExpiry {
    type Error = chrono::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "permanent" {
            return Ok(BanExpiry::Permanent);
        }
        parse_timestamp(&value).map(BanExpiry::At)
    }
}

impl Serialize for BanExpiry {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for BanExpiry {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        BanExpiry::try_from(raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BanRecord {
    pub until: BanExpiry,
    pub reason: String,
}

/// Who issued a warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WarnSource {
    Auto,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarnEntry {
    #[serde(with = "timestamp")]
    pub time: DateTime<Utc>,
    pub reason: String,
    pub source: WarnSource,
}

/// One line of a user's audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(with = "timestamp")]
    pub time: DateTime<Utc>,
    pub event: String,
    #[serde(default)]
    pub note: String,
}

/// What was sent for a cached URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
    Both,
}

impl MediaKind {
    /// Whether a cached entry of this kind can answer a request for `wanted`
    pub fn satisfies(self, wanted: MediaKind) -> bool {
        self == MediaKind::Both || self == wanted
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub file: PathBuf,
    #[serde(rename = "type", alias = "kind")]
    pub kind: MediaKind,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(with = "timestamp")]
    pub time: DateTime<Utc>,
}

/// Aggregate delivery counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    #[serde(default)]
    pub downloads: u64,
    #[serde(default)]
    pub audio: u64,
    #[serde(default)]
    pub video: u64,
    /// Per-user delivery counts
    #[serde(default)]
    pub users: BTreeMap<i64, u64>,
}

impl Stats {
    pub fn record(&mut self, user_id: i64, kind: MediaKind) {
        self.downloads += 1;
        match kind {
            MediaKind::Audio => self.audio += 1,
            MediaKind::Video => self.video += 1,
            MediaKind::Both => {}
        }
        *self.users.entry(user_id).or_insert(0) += 1;
    }
}

pub type AdminTable = BTreeMap<i64, u8>;
pub type BanTable = BTreeMap<i64, BanRecord>;
pub type WarnTable = BTreeMap<i64, Vec<WarnEntry>>;
pub type HistoryTable = BTreeMap<i64, Vec<HistoryEntry>>;
pub type CacheTable = BTreeMap<String, CacheEntry>;
pub type UserTable = BTreeMap<i64, UserRecord>;
