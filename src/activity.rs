//! C7 Activity & Preference Store (spec.md §4.7): per-user recent/starred
//! lists, folder view preferences, and AI settings, persisted through the
//! `DataManager` boundary on every write.

use crate::datamanager::DataManager;
use crate::error::AppResult;
use crate::model::{
    AiSettings, AiSettingsUpdate, ActivityEntry, StarEntry, UserActivity, UserPreferences, ViewMode,
};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;

type ActivityMap = DashMap<String, UserActivity>;
type PreferencesMap = DashMap<String, UserPreferences>;
type AiSettingsMap = DashMap<String, AiSettings>;

fn activity_collection(user_id: &str) -> String {
    format!("userActivity_{user_id}")
}

fn preferences_collection(user_id: &str) -> String {
    format!("userPreferences_{user_id}")
}

fn ai_settings_collection(user_id: &str) -> String {
    format!("aiSettings_{user_id}")
}

/// Holds every user's activity/preferences/AI settings in memory, lazily
/// loaded per user and persisted to their own collection after each
/// mutation (spec.md §6: `userActivity_<userId>`, `userPreferences_<userId>`,
/// `aiSettings_<userId>`).
pub struct ActivityStore {
    recent_list_cap: usize,
    activity: ActivityMap,
    preferences: PreferencesMap,
    ai_settings: AiSettingsMap,
    data_manager: Arc<dyn DataManager>,
}

impl ActivityStore {
    pub fn new(data_manager: Arc<dyn DataManager>, recent_list_cap: usize) -> AppResult<Self> {
        Ok(Self {
            recent_list_cap,
            activity: DashMap::new(),
            preferences: DashMap::new(),
            ai_settings: DashMap::new(),
            data_manager,
        })
    }

    fn load_activity(&self, user_id: &str) -> AppResult<UserActivity> {
        if let Some(entry) = self.activity.get(user_id) {
            return Ok(entry.value().clone());
        }
        let loaded: UserActivity = self.data_manager.read_collection(&activity_collection(user_id))?.unwrap_or_default();
        self.activity.insert(user_id.to_string(), loaded.clone());
        Ok(loaded)
    }

    fn persist_activity(&self, user_id: &str) -> AppResult<()> {
        let snapshot = self.activity.get(user_id).map(|e| e.value().clone()).unwrap_or_default();
        self.data_manager.write_collection(&activity_collection(user_id), &snapshot)
    }

    fn load_preferences(&self, user_id: &str) -> AppResult<UserPreferences> {
        if let Some(entry) = self.preferences.get(user_id) {
            return Ok(entry.value().clone());
        }
        let loaded: UserPreferences =
            self.data_manager.read_collection(&preferences_collection(user_id))?.unwrap_or_default();
        self.preferences.insert(user_id.to_string(), loaded.clone());
        Ok(loaded)
    }

    fn persist_preferences(&self, user_id: &str) -> AppResult<()> {
        let snapshot = self.preferences.get(user_id).map(|e| e.value().clone()).unwrap_or_default();
        self.data_manager.write_collection(&preferences_collection(user_id), &snapshot)
    }

    fn load_ai_settings(&self, user_id: &str) -> AppResult<AiSettings> {
        if let Some(entry) = self.ai_settings.get(user_id) {
            return Ok(entry.value().clone());
        }
        let loaded: AiSettings =
            self.data_manager.read_collection(&ai_settings_collection(user_id))?.unwrap_or_default();
        self.ai_settings.insert(user_id.to_string(), loaded.clone());
        Ok(loaded)
    }

    fn persist_ai_settings(&self, user_id: &str) -> AppResult<()> {
        let snapshot = self.ai_settings.get(user_id).map(|e| e.value().clone()).unwrap_or_default();
        self.data_manager.write_collection(&ai_settings_collection(user_id), &snapshot)
    }

    /// Record a visit, de-duplicating by (spaceName, path) and keeping at
    /// most `recent_list_cap` entries, most recent first (spec.md §4.7).
    pub fn record_visit(&self, user_id: &str, space_name: &str, path: &str, title: &str) -> AppResult<()> {
        let mut activity = self.load_activity(user_id)?;
        activity.recent.retain(|e| !(e.space_name == space_name && e.path == path));
        activity.recent.insert(
            0,
            ActivityEntry {
                space_name: space_name.to_string(),
                path: path.to_string(),
                title: title.to_string(),
                visited_at: Utc::now(),
            },
        );
        activity.recent.truncate(self.recent_list_cap);
        activity.updated_at = Some(Utc::now());
        self.activity.insert(user_id.to_string(), activity);
        self.persist_activity(user_id)
    }

    /// Toggle a star; idempotent per (spaceName, path) — starring an already
    /// starred document un-stars it (spec.md §4.7).
    pub fn toggle_star(&self, user_id: &str, space_name: &str, path: &str, title: &str) -> AppResult<bool> {
        let mut activity = self.load_activity(user_id)?;
        let existing = activity.starred.iter().position(|s| s.space_name == space_name && s.path == path);
        let now_starred = match existing {
            Some(idx) => {
                activity.starred.remove(idx);
                false
            }
            None => {
                activity.starred.push(StarEntry {
                    space_name: space_name.to_string(),
                    path: path.to_string(),
                    title: title.to_string(),
                    starred_at: Utc::now(),
                });
                true
            }
        };
        activity.updated_at = Some(Utc::now());
        self.activity.insert(user_id.to_string(), activity);
        self.persist_activity(user_id)?;
        Ok(now_starred)
    }

    pub fn get_activity(&self, user_id: &str) -> UserActivity {
        self.load_activity(user_id).unwrap_or_default()
    }

    pub fn set_folder_view(&self, user_id: &str, space_id: &str, folder_path: &str, mode: ViewMode) -> AppResult<()> {
        let mut prefs = self.load_preferences(user_id)?;
        prefs
            .folder_view_preferences
            .entry(space_id.to_string())
            .or_default()
            .insert(folder_path.to_string(), mode);
        self.preferences.insert(user_id.to_string(), prefs);
        self.persist_preferences(user_id)
    }

    pub fn get_folder_views(&self, user_id: &str, space_id: &str) -> std::collections::HashMap<String, ViewMode> {
        self.load_preferences(user_id)
            .ok()
            .and_then(|p| p.folder_view_preferences.get(space_id).cloned())
            .unwrap_or_default()
    }

    pub fn get_preferences(&self, user_id: &str) -> UserPreferences {
        self.load_preferences(user_id).unwrap_or_default()
    }

    pub fn update_preferences(&self, user_id: &str, update: UserPreferences) -> AppResult<()> {
        self.preferences.insert(user_id.to_string(), update);
        self.persist_preferences(user_id)
    }

    pub fn get_ai_settings(&self, user_id: &str) -> AiSettings {
        self.load_ai_settings(user_id).unwrap_or_default()
    }

    pub fn set_ai_settings(&self, user_id: &str, update: AiSettingsUpdate) -> AppResult<AiSettings> {
        let mut settings = self.load_ai_settings(user_id)?;
        settings.apply_update(update);
        self.ai_settings.insert(user_id.to_string(), settings.clone());
        self.persist_ai_settings(user_id)?;
        Ok(settings)
    }
}
