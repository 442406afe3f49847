// ============================================================================
// Persisted bucket-fill defaults (`key=value` settings file)
// ============================================================================

use std::path::PathBuf;

use image::Rgba;

use crate::components::tools::{FillMode, FillProperties, ReferenceMode};

const SETTINGS_FILE: &str = "rasterfill_settings.cfg";

/// Default bucket settings remembered between runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FillSettings {
    pub properties: FillProperties,
    /// Straight-alpha RGBA.
    pub bucket_color: Rgba<u8>,
}

impl Default for FillSettings {
    fn default() -> Self {
        Self {
            properties: FillProperties::default(),
            bucket_color: Rgba([0, 0, 0, 255]),
        }
    }
}

impl FillSettings {
    /// Where the settings file lives. `RASTERFILL_CONFIG` overrides the
    /// per-OS location.
    pub fn settings_path() -> Option<PathBuf> {
        if let Ok(custom) = std::env::var("RASTERFILL_CONFIG")
            && !custom.trim().is_empty()
        {
            return Some(PathBuf::from(custom));
        }
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
                .ok()?;
            return Some(config_dir.join("rasterfill").join(SETTINGS_FILE));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            return Some(PathBuf::from(appdata).join("rasterfill").join(SETTINGS_FILE));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("rasterfill")
                    .join(SETTINGS_FILE),
            );
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join(SETTINGS_FILE)))
        }
    }

    /// Format a colour as "r,g,b,a".
    pub fn color_to_str(c: Rgba<u8>) -> String {
        format!("{},{},{},{}", c[0], c[1], c[2], c[3])
    }

    /// Parse "r,g,b,a" (or "r,g,b", taken as opaque).
    pub fn str_to_color(s: &str) -> Option<Rgba<u8>> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 3 && parts.len() != 4 {
            return None;
        }
        let r = parts[0].trim().parse::<u8>().ok()?;
        let g = parts[1].trim().parse::<u8>().ok()?;
        let b = parts[2].trim().parse::<u8>().ok()?;
        let a = match parts.get(3) {
            Some(a) => a.trim().parse::<u8>().ok()?,
            None => 255,
        };
        Some(Rgba([r, g, b, a]))
    }

    pub fn to_config_string(&self) -> String {
        let p = &self.properties;
        format!(
            "tolerance={}\n\
             tolerance_enabled={}\n\
             expand={}\n\
             expand_enabled={}\n\
             reference_mode={}\n\
             fill_mode={}\n\
             bucket_color={}\n",
            p.tolerance,
            p.tolerance_enabled,
            p.expand,
            p.expand_enabled,
            p.reference_mode.to_config_str(),
            p.fill_mode.to_config_str(),
            Self::color_to_str(self.bucket_color),
        )
    }

    /// Parse a settings file body. Unknown keys are ignored and bad values
    /// keep their defaults.
    pub fn from_config_str(content: &str) -> Self {
        let mut s = Self::default();
        let p = &mut s.properties;
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let val = val.trim();
            match key.trim() {
                "tolerance" => {
                    if let Ok(v) = val.parse() {
                        p.tolerance = v;
                    }
                }
                "tolerance_enabled" => {
                    if let Ok(v) = val.parse() {
                        p.tolerance_enabled = v;
                    }
                }
                "expand" => {
                    if let Ok(v) = val.parse() {
                        p.expand = v;
                    }
                }
                "expand_enabled" => {
                    if let Ok(v) = val.parse() {
                        p.expand_enabled = v;
                    }
                }
                "reference_mode" => {
                    if let Some(v) = ReferenceMode::from_config_str(val) {
                        p.reference_mode = v;
                    }
                }
                "fill_mode" => {
                    if let Some(v) = FillMode::from_config_str(val) {
                        p.fill_mode = v;
                    }
                }
                "bucket_color" => {
                    if let Some(c) = Self::str_to_color(val) {
                        s.bucket_color = c;
                    }
                }
                _ => {}
            }
        }
        s
    }

    /// Load from disk, falling back to defaults when the file is missing.
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        let Ok(content) = std::fs::read_to_string(&path) else { return Self::default() };
        Self::from_config_str(&content)
    }

    /// Write to disk, creating the settings directory if needed.
    pub fn save(&self) -> std::io::Result<PathBuf> {
        let path = Self::settings_path().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "no settings directory")
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, self.to_config_string())?;
        crate::log_info!("Saved fill settings to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_string_round_trips() {
        let settings = FillSettings {
            properties: FillProperties {
                tolerance: 7,
                tolerance_enabled: false,
                expand: 5,
                expand_enabled: true,
                reference_mode: ReferenceMode::AllVisibleLayers,
                fill_mode: FillMode::Behind,
            },
            bucket_color: Rgba([1, 2, 3, 4]),
        };
        let text = settings.to_config_string();
        assert!(text.contains("fill_mode=behind\n"));
        assert_eq!(FillSettings::from_config_str(&text), settings);
    }

    #[test]
    fn bad_and_unknown_keys_keep_defaults() {
        let parsed = FillSettings::from_config_str(
            "# comment\n\
             tolerance=lots\n\
             expand = 9\n\
             fill_mode=sideways\n\
             bucket_color=1,2\n\
             theme=dark\n\
             garbage line\n",
        );
        let defaults = FillSettings::default();
        assert_eq!(parsed.properties.tolerance, defaults.properties.tolerance);
        assert_eq!(parsed.properties.expand, 9);
        assert_eq!(parsed.properties.fill_mode, FillMode::Over);
        assert_eq!(parsed.bucket_color, defaults.bucket_color);
    }

    #[test]
    fn color_strings() {
        assert_eq!(FillSettings::str_to_color("255, 0, 10"), Some(Rgba([255, 0, 10, 255])));
        assert_eq!(FillSettings::str_to_color("1,2,3,4"), Some(Rgba([1, 2, 3, 4])));
        assert_eq!(FillSettings::str_to_color("1,2,300,4"), None);
        assert_eq!(FillSettings::color_to_str(Rgba([9, 8, 7, 6])), "9,8,7,6");
    }
}
