//! Data model shared across the index, query engine, and HTTP boundary.
//!
//! Rather than the dynamic, partially-shaped records the original app
//! passes around, every record here has all fields present — optional text
//! is represented as an empty string rather than an absent key (spec.md §9).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
    Team,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Document,
    Code,
    Image,
    Pdf,
    Archive,
    Audio,
    Video,
    Other,
}

impl FileType {
    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Document => "document",
            FileType::Code => "code",
            FileType::Image => "image",
            FileType::Pdf => "pdf",
            FileType::Archive => "archive",
            FileType::Audio => "audio",
            FileType::Video => "video",
            FileType::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "document" => Some(FileType::Document),
            "code" => Some(FileType::Code),
            "image" => Some(FileType::Image),
            "pdf" => Some(FileType::Pdf),
            "archive" => Some(FileType::Archive),
            "audio" => Some(FileType::Audio),
            "video" => Some(FileType::Video),
            "other" => Some(FileType::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewerHint {
    Markdown,
    Code,
    Text,
    Image,
    Pdf,
    Binary,
}

/// A named root directory and metadata bundle (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Space {
    pub id: u64,
    pub name: String,
    pub description: String,
    /// Canonicalized absolute filesystem root.
    pub root_path: String,
    pub visibility: Visibility,
    pub owner_id: String,
    pub document_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Space {
    pub fn visible_to(&self, user_id: &str) -> bool {
        self.owner_id == user_id
            || matches!(self.visibility, Visibility::Public | Visibility::Team)
    }
}

/// Produced by the filesystem walker (C2). Transient — never persisted.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub space_id: u64,
    pub relative_path: String,
    pub absolute_path: std::path::PathBuf,
    pub size_bytes: u64,
    pub modified_at: DateTime<Utc>,
    pub extension: String,
    pub file_type: FileType,
}

impl FileRecord {
    pub fn doc_key(&self) -> String {
        doc_key(self.space_id, &self.relative_path)
    }
}

pub fn doc_key(space_id: u64, relative_path: &str) -> String {
    format!("{space_id}:{relative_path}")
}

/// One indexed document's metadata (stored in C4 alongside its postings).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub doc_key: String,
    pub space_id: u64,
    pub space_name: String,
    pub title: String,
    pub relative_path: String,
    pub tags: Vec<String>,
    pub body: String,
    pub file_type: FileType,
    pub viewer: ViewerHint,
    pub size_bytes: u64,
    pub modified_at: DateTime<Utc>,
}

/// A (token, docKey) posting: which fields the token occurred in, and a
/// weight derived from per-field occurrence counts (spec.md §4.4).
#[derive(Debug, Clone)]
pub struct Posting {
    pub doc_key: String,
    pub field_mask: u8,
    /// Per-field occurrence count, indexed by `Field::index()`.
    pub field_counts: [u32; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Tags,
    Path,
    Body,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Title, Field::Tags, Field::Path, Field::Body];

    pub fn index(self) -> usize {
        match self {
            Field::Title => 0,
            Field::Tags => 1,
            Field::Path => 2,
            Field::Body => 3,
        }
    }

    pub fn bit(self) -> u8 {
        1 << self.index()
    }

    /// Field weight per spec.md §4.4's table.
    pub fn weight(self) -> f64 {
        match self {
            Field::Title => 3.0,
            Field::Tags => 2.0,
            Field::Path => 2.0,
            Field::Body => 1.0,
        }
    }
}

/// Per-user starred/recent activity (spec.md §3/§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub space_name: String,
    pub path: String,
    pub title: String,
    pub visited_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarEntry {
    pub space_name: String,
    pub path: String,
    pub title: String,
    pub starred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserActivity {
    pub recent: Vec<ActivityEntry>,
    pub starred: Vec<StarEntry>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Grid,
    Details,
    Cards,
}

impl ViewMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "grid" => Some(ViewMode::Grid),
            "details" => Some(ViewMode::Details),
            "cards" => Some(ViewMode::Cards),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub bio: String,
    pub location: String,
    pub timezone: String,
    pub email_notifications: bool,
    pub dark_mode: bool,
    pub default_language: String,
    /// spaceId -> (folderPath -> viewMode)
    pub folder_view_preferences: std::collections::HashMap<String, std::collections::HashMap<String, ViewMode>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiSettings {
    pub provider: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub endpoint: Option<String>,
    pub enabled: bool,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            provider: String::new(),
            api_key: String::new(),
            model: String::new(),
            temperature: 0.7,
            max_tokens: 1024,
            endpoint: None,
            enabled: false,
        }
    }
}

impl AiSettings {
    /// Masks the stored key, leaking at most the last four characters.
    pub fn masked_api_key(&self) -> String {
        mask_secret(&self.api_key)
    }

    /// Applied when a client submits settings containing a previously-masked
    /// key: preserve the stored key instead of overwriting it with bullets.
    pub fn apply_update(&mut self, incoming: AiSettingsUpdate) {
        self.provider = incoming.provider;
        if let Some(key) = incoming.api_key {
            if !looks_masked(&key) {
                self.api_key = key;
            }
        }
        self.model = incoming.model;
        self.temperature = incoming.temperature;
        self.max_tokens = incoming.max_tokens;
        self.endpoint = incoming.endpoint;
        self.enabled = incoming.enabled;
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSettingsUpdate {
    pub provider: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub enabled: bool,
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    1024
}

/// Replace all but the last four characters of `secret` with bullets.
pub fn mask_secret(secret: &str) -> String {
    let len = secret.chars().count();
    if len <= 4 {
        return "\u{2022}".repeat(len);
    }
    let tail: String = secret.chars().skip(len - 4).collect();
    format!("{}{}", "\u{2022}".repeat(len - 4), tail)
}

/// A write-side value is "masked" (and thus should not overwrite the stored
/// secret) if it consists solely of the bullet character followed by at
/// most four trailing non-bullet characters — i.e. it is exactly the shape
/// `mask_secret` produces.
fn looks_masked(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    let bullet_prefix = value.chars().take_while(|&c| c == '\u{2022}').count();
    bullet_prefix > 0 && value.chars().count() - bullet_prefix <= 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_all_but_last_four() {
        let masked = mask_secret("sk-abcdefgh1234");
        assert!(masked.ends_with("1234"));
        assert_eq!(masked.chars().filter(|&c| c != '\u{2022}').count(), 4);
    }

    #[test]
    fn short_secret_fully_masked() {
        assert_eq!(mask_secret("ab"), "\u{2022}\u{2022}");
    }

    #[test]
    fn detects_masked_roundtrip() {
        let masked = mask_secret("sk-abcdefgh1234");
        assert!(looks_masked(&masked));
        assert!(!looks_masked("sk-abcdefgh1234"));
    }
}
