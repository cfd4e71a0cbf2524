//! Color themes shared by the reader and the deck app

use std::fmt;

use chrono::{Local, Timelike};
use serde::{Deserialize, Serialize};

/// A concrete color scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's theme choice; `Auto` follows the environment and the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Auto,
    Dark,
    Light,
}

/// Night is 19:00 through 06:59 local time
pub fn is_night(hour: u32) -> bool {
    hour >= 19 || hour < 7
}

impl ThemeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemeMode::Auto => "auto",
            ThemeMode::Dark => "dark",
            ThemeMode::Light => "light",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "auto" => Some(ThemeMode::Auto),
            "dark" => Some(ThemeMode::Dark),
            "light" => Some(ThemeMode::Light),
            _ => None,
        }
    }

    /// Resolve against an explicit environment preference and local hour
    pub fn resolve(self, prefers_dark: bool, hour: u32) -> Theme {
        match self {
            ThemeMode::Dark => Theme::Dark,
            ThemeMode::Light => Theme::Light,
            ThemeMode::Auto if prefers_dark || is_night(hour) => Theme::Dark,
            ThemeMode::Auto => Theme::Light,
        }
    }

    /// Resolve using the current local time
    pub fn resolve_now(self, prefers_dark: bool) -> Theme {
        self.resolve(prefers_dark, Local::now().hour())
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_follows_clock_and_preference() {
        assert_eq!(ThemeMode::Auto.resolve(false, 12), Theme::Light);
        assert_eq!(ThemeMode::Auto.resolve(false, 19), Theme::Dark);
        assert_eq!(ThemeMode::Auto.resolve(false, 6), Theme::Dark);
        assert_eq!(ThemeMode::Auto.resolve(false, 7), Theme::Light);
        assert_eq!(ThemeMode::Auto.resolve(true, 12), Theme::Dark);
    }

    #[test]
    fn test_explicit_modes_ignore_environment() {
        assert_eq!(ThemeMode::Light.resolve(true, 23), Theme::Light);
        assert_eq!(ThemeMode::Dark.resolve(false, 12), Theme::Dark);
    }

    #[test]
    fn test_parse() {
        assert_eq!(ThemeMode::parse("light"), Some(ThemeMode::Light));
        assert_eq!(ThemeMode::parse("sepia"), None);
        assert_eq!(serde_json::to_string(&Theme::Dark).unwrap(), r#""dark""#);
    }
}
