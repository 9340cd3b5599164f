//! All setting definitions with their default values.

use std::collections::HashMap;
use std::sync::LazyLock;

type DefTuple = (&'static str, &'static str, &'static str);

const DEFS: &[DefTuple] = &[
    ("SERVER_PORT", "8080", "HTTP listen port"),
    ("MAX_PREVIEW_WIDTH", "1024", "Maximum preview width in pixels"),
    ("PREVIEW_QUALITY", "90", "JPEG quality of previews (1-100)"),
    ("FINAL_JPEG_QUALITY", "95", "JPEG quality of final files when the output format is JPEG"),
    ("RENDER_TIMEOUT_SECS", "30", "Upper bound for a single decode or render"),
    ("THROTTLE_MS", "300", "Minimum interval between mutating requests per session (0 disables)"),
    ("MAX_UPLOAD_MB", "20", "Upload body limit in MiB"),
    ("FILENAME_PREFIX", "pyro", "Prefix of delivered file names"),
];

/// A single setting definition.
#[derive(Debug, Clone)]
pub struct SettingDef {
    pub key: &'static str,
    pub default: &'static str,
    pub description: &'static str,
}

/// Global setting definitions indexed by key.
pub static DEFAULT_SETTINGS: LazyLock<HashMap<&'static str, SettingDef>> = LazyLock::new(|| {
    DEFS.iter()
        .map(|&(key, default, description)| {
            (
                key,
                SettingDef {
                    key,
                    default,
                    description,
                },
            )
        })
        .collect()
});

/// Get the default value for a setting key, or `None` if not defined.
pub fn get_default(key: &str) -> Option<&'static str> {
    DEFAULT_SETTINGS.get(key).map(|d| d.default)
}
