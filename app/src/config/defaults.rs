//! All setting definitions with their default values.

use std::collections::HashMap;
use std::sync::LazyLock;

type DefTuple = (&'static str, &'static str, bool, bool, &'static str);

// (key, default, secret, required, description)
const DEFS: &[DefTuple] = &[
    (
        "LIBRARY_API_URL",
        "https://api.vedamatch.app",
        false,
        true,
        "Base URL of the scripture library API",
    ),
    (
        "LIBRARY_API_TOKEN",
        "",
        true,
        false,
        "Bearer token attached to library API requests",
    ),
    (
        "OFFLINE_LANGUAGES",
        "ru,en",
        false,
        false,
        "Comma-separated language codes downloaded by offline save",
    ),
    (
        "LOG_FILTER",
        "info",
        false,
        false,
        "Tracing filter directive for the log subscriber",
    ),
];

/// A single setting definition.
#[derive(Debug, Clone)]
pub struct SettingDef {
    pub key: &'static str,
    pub default: &'static str,
    pub secret: bool,
    pub required: bool,
    pub description: &'static str,
}

/// Global setting definitions indexed by key.
pub static DEFAULT_SETTINGS: LazyLock<HashMap<&'static str, SettingDef>> = LazyLock::new(|| {
    DEFS.iter()
        .map(|&(key, default, secret, required, description)| {
            (
                key,
                SettingDef {
                    key,
                    default,
                    secret,
                    required,
                    description,
                },
            )
        })
        .collect()
});
