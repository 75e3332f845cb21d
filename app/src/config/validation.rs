//! Setting value validation.

/// Validate a setting value. Returns `Ok(())` if valid, or an error message.
pub fn validate_setting(key: &str, value: &str) -> Result<(), String> {
    match key {
        "LIBRARY_API_URL" => {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                return Err("must be an http(s) URL".into());
            }
        }
        "OFFLINE_LANGUAGES" => {
            if value.trim().is_empty() {
                return Err("must list at least one language".into());
            }
            for lang in value.split(',') {
                let lang = lang.trim();
                if lang.is_empty() || !lang.chars().all(|c| c.is_ascii_lowercase()) {
                    return Err(format!("invalid language code: '{lang}'"));
                }
            }
        }
        _ => {}
    }
    Ok(())
}
