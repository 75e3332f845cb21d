//! Runtime application configuration loaded from DB + environment overrides.

use super::manager::SettingsManager;

/// Runtime configuration populated from the settings DB.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub offline_languages: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.vedamatch.app".into(),
            api_token: None,
            offline_languages: vec!["ru".into(), "en".into()],
        }
    }
}

impl AppConfig {
    /// Load configuration from the settings manager (DB-first, env overrides).
    pub fn load(sm: &SettingsManager) -> Result<Self, anyhow::Error> {
        let mut config = Self::default();
        config.reload(sm)?;
        Ok(config)
    }

    /// Re-read all values from the settings manager.
    pub fn reload(&mut self, sm: &SettingsManager) -> Result<(), anyhow::Error> {
        let mut api_base_url = sm.get_setting("LIBRARY_API_URL")?;
        if let Ok(v) = std::env::var("LIBRARY_API_URL") {
            if !v.is_empty() {
                api_base_url = v;
            }
        }

        let api_token = sm
            .get_setting("LIBRARY_API_TOKEN")
            .ok()
            .filter(|v| !v.is_empty());

        let languages_raw = sm.get_setting("OFFLINE_LANGUAGES")?;
        let offline_languages = parse_languages(&languages_raw);

        self.api_base_url = api_base_url;
        self.api_token = api_token;
        if !offline_languages.is_empty() {
            self.offline_languages = offline_languages;
        }
        Ok(())
    }
}

fn parse_languages(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
