//! SettingsManager: DB-backed settings with defaults and env migration.

use veda_db::Database;

use super::defaults::DEFAULT_SETTINGS;
use super::validation::validate_setting;
use super::{SettingInfo, SettingType};

/// Wraps [`Database`] to provide high-level settings operations.
pub struct SettingsManager {
    db: Database,
}

impl SettingsManager {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Get a setting value. Falls back to default if not in DB.
    pub fn get_setting(&self, key: &str) -> Result<String, anyhow::Error> {
        if let Some(val) = self.db.get_setting(key)? {
            return Ok(val);
        }
        if let Some(def) = DEFAULT_SETTINGS.get(key) {
            return Ok(def.default.to_string());
        }
        anyhow::bail!("setting not found: {key}");
    }

    /// Set a setting value with validation.
    pub fn set_setting(&self, key: &str, value: &str) -> Result<(), anyhow::Error> {
        let def = DEFAULT_SETTINGS
            .get(key)
            .ok_or_else(|| anyhow::anyhow!("unknown setting key: {key}"))?;

        validate_setting(key, value)
            .map_err(|e| anyhow::anyhow!("validation error for {key}: {e}"))?;

        let type_str = if def.secret { "secret" } else { "normal" };
        self.db.set_setting(key, value, type_str)?;
        Ok(())
    }

    /// List all known settings, filling in defaults for missing keys.
    pub fn get_all_settings(&self) -> Result<Vec<SettingInfo>, anyhow::Error> {
        let stored: std::collections::HashMap<String, String> =
            self.db.get_all_settings()?.into_iter().collect();

        let mut result = Vec::new();
        for (key, def) in DEFAULT_SETTINGS.iter() {
            let value = stored
                .get(*key)
                .cloned()
                .unwrap_or_else(|| def.default.to_string());
            result.push(SettingInfo {
                key: key.to_string(),
                has_value: !value.is_empty(),
                value: if def.secret { String::new() } else { value },
                setting_type: if def.secret {
                    SettingType::Secret
                } else {
                    SettingType::Normal
                },
                required: def.required,
                description: def.description.to_string(),
            });
        }
        result.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(result)
    }

    /// Write default values for settings that have no DB row yet.
    pub fn initialize_defaults(&self) -> Result<(), anyhow::Error> {
        for (key, def) in DEFAULT_SETTINGS.iter() {
            if def.default.is_empty() {
                continue;
            }
            if self.db.get_setting(key)?.is_none() {
                let type_str = if def.secret { "secret" } else { "normal" };
                self.db.set_setting(key, def.default, type_str)?;
            }
        }
        Ok(())
    }

    /// One-time copy of matching environment variables into the DB.
    /// Existing DB values always win.
    pub fn migrate_from_env(&self) -> Result<(), anyhow::Error> {
        let mut migrated = 0u32;
        for (key, def) in DEFAULT_SETTINGS.iter() {
            if self.db.get_setting(key)?.is_some() {
                continue;
            }
            let Ok(value) = std::env::var(key) else {
                continue;
            };
            if value.is_empty() {
                continue;
            }
            if let Err(e) = validate_setting(key, &value) {
                tracing::warn!("Ignoring invalid {key} from environment: {e}");
                continue;
            }
            let type_str = if def.secret { "secret" } else { "normal" };
            self.db.set_setting(key, &value, type_str)?;
            migrated += 1;
        }
        if migrated > 0 {
            tracing::info!("Migrated {migrated} settings from environment");
        }
        Ok(())
    }

    /// Keys of required settings that still have no value.
    pub fn missing_required_settings(&self) -> Result<Vec<String>, anyhow::Error> {
        let mut missing = Vec::new();
        for (key, def) in DEFAULT_SETTINGS.iter() {
            if !def.required {
                continue;
            }
            let value = self.get_setting(key)?;
            if value.is_empty() {
                missing.push(key.to_string());
            }
        }
        missing.sort();
        Ok(missing)
    }
}
