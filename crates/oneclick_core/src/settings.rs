use std::fmt;

use crate::BackendEndpoints;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-wide preferences, loaded once at start and saved on change.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Settings {
    pub username: Option<String>,
    pub theme: Theme,
    pub backend: BackendEndpoints,
}
