//! Runtime application configuration loaded from the environment.

use std::time::Duration;

use pyro_pipeline::{FinalOptions, PreviewOptions};

use super::defaults::get_default;
use super::validation::validate_setting;

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub max_preview_width: u32,
    pub preview_quality: u8,
    pub final_jpeg_quality: u8,
    pub render_timeout: Duration,
    pub throttle: Duration,
    pub max_upload_bytes: usize,
    pub filename_prefix: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: 8080,
            max_preview_width: 1024,
            preview_quality: 90,
            final_jpeg_quality: 95,
            render_timeout: Duration::from_secs(30),
            throttle: Duration::from_millis(300),
            max_upload_bytes: 20 * 1024 * 1024,
            filename_prefix: "pyro".into(),
        }
    }
}

impl AppConfig {
    /// Load configuration from process environment variables.
    pub fn load() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Missing keys take their
    /// default; invalid values are logged and replaced by the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let g = |key: &str| -> String {
            let default = get_default(key).unwrap_or_default();
            match lookup(key) {
                Some(v) if !v.trim().is_empty() => {
                    let v = v.trim().to_string();
                    match validate_setting(key, &v) {
                        Ok(()) => v,
                        Err(e) => {
                            tracing::warn!(key, value = %v, "Invalid setting ({e}), using default {default}");
                            default.to_string()
                        }
                    }
                }
                _ => default.to_string(),
            }
        };

        let defaults = Self::default();
        Self {
            server_port: parse_u16(&g("SERVER_PORT"), defaults.server_port),
            max_preview_width: parse_u32(&g("MAX_PREVIEW_WIDTH"), defaults.max_preview_width),
            preview_quality: parse_u8(&g("PREVIEW_QUALITY"), defaults.preview_quality),
            final_jpeg_quality: parse_u8(&g("FINAL_JPEG_QUALITY"), defaults.final_jpeg_quality),
            render_timeout: Duration::from_secs(u64::from(parse_u32(&g("RENDER_TIMEOUT_SECS"), 30))),
            throttle: Duration::from_millis(u64::from(parse_u32(&g("THROTTLE_MS"), 300))),
            max_upload_bytes: parse_u32(&g("MAX_UPLOAD_MB"), 20) as usize * 1024 * 1024,
            filename_prefix: {
                let p = g("FILENAME_PREFIX");
                if p.is_empty() { defaults.filename_prefix } else { p }
            },
        }
    }

    pub fn preview_options(&self) -> PreviewOptions {
        PreviewOptions {
            max_width: self.max_preview_width,
            quality: self.preview_quality,
        }
    }

    pub fn final_options(&self) -> FinalOptions {
        FinalOptions {
            jpeg_quality: self.final_jpeg_quality,
            filename_prefix: self.filename_prefix.clone(),
        }
    }
}

fn parse_u8(s: &str, default: u8) -> u8 {
    if s.is_empty() {
        return default;
    }
    s.parse().unwrap_or(default)
}

fn parse_u16(s: &str, default: u16) -> u16 {
    if s.is_empty() {
        return default;
    }
    s.parse().unwrap_or(default)
}

fn parse_u32(s: &str, default: u32) -> u32 {
    if s.is_empty() {
        return default;
    }
    s.parse().unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let cfg = from_pairs(&[]);
        let d = AppConfig::default();
        assert_eq!(cfg.server_port, d.server_port);
        assert_eq!(cfg.max_preview_width, 1024);
        assert_eq!(cfg.preview_quality, 90);
        assert_eq!(cfg.final_jpeg_quality, 95);
        assert_eq!(cfg.render_timeout, Duration::from_secs(30));
        assert_eq!(cfg.throttle, Duration::from_millis(300));
        assert_eq!(cfg.max_upload_bytes, 20 * 1024 * 1024);
        assert_eq!(cfg.filename_prefix, "pyro");
    }

    #[test]
    fn valid_values_are_used() {
        let cfg = from_pairs(&[
            ("SERVER_PORT", "9000"),
            ("MAX_PREVIEW_WIDTH", " 512 "),
            ("THROTTLE_MS", "0"),
            ("MAX_UPLOAD_MB", "5"),
            ("FILENAME_PREFIX", "burn"),
        ]);
        assert_eq!(cfg.server_port, 9000);
        assert_eq!(cfg.max_preview_width, 512);
        assert_eq!(cfg.throttle, Duration::ZERO);
        assert_eq!(cfg.max_upload_bytes, 5 * 1024 * 1024);
        assert_eq!(cfg.final_options().filename_prefix, "burn");
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let cfg = from_pairs(&[
            ("PREVIEW_QUALITY", "250"),
            ("RENDER_TIMEOUT_SECS", "soon"),
            ("FILENAME_PREFIX", "a/b"),
        ]);
        assert_eq!(cfg.preview_quality, 90);
        assert_eq!(cfg.render_timeout, Duration::from_secs(30));
        assert_eq!(cfg.filename_prefix, "pyro");
    }

    #[test]
    fn options_follow_config() {
        let cfg = from_pairs(&[("MAX_PREVIEW_WIDTH", "640"), ("PREVIEW_QUALITY", "70")]);
        let opts = cfg.preview_options();
        assert_eq!((opts.max_width, opts.quality), (640, 70));
        assert_eq!(cfg.final_options().jpeg_quality, 95);
    }
}
