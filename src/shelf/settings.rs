use crate::error::{Result, ShelfError};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const SETTINGS_FILENAME: &str = "settings.json";
pub const DEFAULT_THEME: &str = "light";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// A named palette used by the terminal output.
#[derive(Debug, Clone)]
pub struct ThemeSpec {
    pub id: &'static str,
    pub description: &'static str,
    pub accent: Rgb,
    pub heading: Rgb,
    pub muted: Rgb,
    pub success: Rgb,
    pub warning: Rgb,
}

fn rgb(hex: &str) -> Rgb {
    parse_hex_color(hex).unwrap_or(Rgb { r: 0, g: 0, b: 0 })
}

pub static THEMES: Lazy<Vec<ThemeSpec>> = Lazy::new(|| {
    vec![
        ThemeSpec {
            id: "light",
            description: "Blue accents on a light terminal",
            accent: rgb("#1976D2"),
            heading: rgb("#0D47A1"),
            muted: rgb("#757575"),
            success: rgb("#2E7D32"),
            warning: rgb("#E65100"),
        },
        ThemeSpec {
            id: "dark",
            description: "Soft colors for dark terminals",
            accent: rgb("#90CAF9"),
            heading: rgb("#E3F2FD"),
            muted: rgb("#9E9E9E"),
            success: rgb("#A5D6A7"),
            warning: rgb("#FFCC80"),
        },
        ThemeSpec {
            id: "sepia",
            description: "Warm browns, like old paper",
            accent: rgb("#8D6E63"),
            heading: rgb("#5D4037"),
            muted: rgb("#A1887F"),
            success: rgb("#7C8B3A"),
            warning: rgb("#BF5B04"),
        },
        ThemeSpec {
            id: "ocean",
            description: "Teals and deep blues",
            accent: rgb("#00897B"),
            heading: rgb("#006064"),
            muted: rgb("#78909C"),
            success: rgb("#26A69A"),
            warning: rgb("#FF7043"),
        },
    ]
});

pub fn theme(id: &str) -> Option<&'static ThemeSpec> {
    THEMES.iter().find(|t| t.id == id)
}

/// Parses `#RRGGBB` (the leading `#` is optional).
pub fn parse_hex_color(raw: &str) -> Option<Rgb> {
    let hex = raw.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Rgb {
        r: channel(0)?,
        g: channel(2)?,
        b: channel(4)?,
    })
}

/// UI settings, stored in `settings.json` in the data directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default = "default_theme")]
    pub theme: String,
}

fn default_theme() -> String {
    DEFAULT_THEME.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: default_theme(),
        }
    }
}

impl Settings {
    /// Missing, corrupt or unknown settings fall back to the defaults.
    pub fn load<P: AsRef<Path>>(dir: P) -> Self {
        let path = dir.as_ref().join(SETTINGS_FILENAME);
        if !path.exists() {
            return Self::default();
        }

        let parsed = fs::read_to_string(&path)
            .map_err(ShelfError::Io)
            .and_then(|content| {
                serde_json::from_str::<Settings>(&content).map_err(ShelfError::Serialization)
            });
        let mut settings = match parsed {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Ignoring unreadable settings file: {}", e);
                return Self::default();
            }
        };
        if theme(&settings.theme).is_none() {
            log::warn!("Unknown theme '{}', using '{}'", settings.theme, DEFAULT_THEME);
            settings.theme = default_theme();
        }
        settings
    }

    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(ShelfError::Io)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(ShelfError::Serialization)?;
        fs::write(dir.join(SETTINGS_FILENAME), content).map_err(ShelfError::Io)?;
        Ok(())
    }

    pub fn set_theme(&mut self, id: &str) -> Result<()> {
        let id = id.trim().to_lowercase();
        if theme(&id).is_none() {
            let known: Vec<&str> = THEMES.iter().map(|t| t.id).collect();
            return Err(ShelfError::Api(format!(
                "Unknown theme '{}'. Available: {}",
                id,
                known.join(", ")
            )));
        }
        self.theme = id;
        Ok(())
    }

    pub fn theme_spec(&self) -> &'static ThemeSpec {
        theme(&self.theme).unwrap_or(&THEMES[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_default() {
        let dir = tempdir().unwrap();
        assert_eq!(Settings::load(dir.path()), Settings::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let mut settings = Settings::default();
        settings.set_theme("Dark").unwrap();
        settings.save(dir.path()).unwrap();

        let loaded = Settings::load(dir.path());
        assert_eq!(loaded.theme, "dark");
        assert_eq!(loaded.theme_spec().id, "dark");
    }

    #[test]
    fn test_corrupt_or_unknown_falls_back() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILENAME), "{{{").unwrap();
        assert_eq!(Settings::load(dir.path()).theme, DEFAULT_THEME);

        fs::write(dir.path().join(SETTINGS_FILENAME), r#"{"theme": "neon"}"#).unwrap();
        assert_eq!(Settings::load(dir.path()).theme, DEFAULT_THEME);
    }

    #[test]
    fn test_set_theme_rejects_unknown() {
        let mut settings = Settings::default();
        assert!(settings.set_theme("neon").is_err());
        assert_eq!(settings.theme, DEFAULT_THEME);
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#2196F3"), Some(Rgb { r: 0x21, g: 0x96, b: 0xF3 }));
        assert_eq!(parse_hex_color("ff0000"), Some(Rgb { r: 255, g: 0, b: 0 }));
        assert_eq!(parse_hex_color("#12345"), None);
        assert_eq!(parse_hex_color("#GG0000"), None);
    }

    #[test]
    fn test_every_theme_parses() {
        for spec in THEMES.iter() {
            assert_ne!(spec.accent, Rgb { r: 0, g: 0, b: 0 }, "{}", spec.id);
        }
    }
}
