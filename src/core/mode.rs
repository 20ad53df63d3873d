//! Runtime mode, from the `HOTSHELL_ENV` environment variable.
//!
//! Production-labeled runs never activate the live-patch runtime's in-place
//! update machinery; everything else counts as development.

use std::sync::OnceLock;

/// Development vs production gating for the live-patch runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Development,
    Production,
}

impl Mode {
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    /// Parse from the environment variable's value.
    fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some("production") => Self::Production,
            _ => Self::Development,
        }
    }
}

/// Current mode, read from `HOTSHELL_ENV` once.
pub fn mode() -> Mode {
    static MODE: OnceLock<Mode> = OnceLock::new();
    *MODE.get_or_init(|| {
        let value = std::env::var("HOTSHELL_ENV").ok();
        Mode::from_env_value(value.as_deref())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!(Mode::from_env_value(None), Mode::Development);
        assert_eq!(Mode::from_env_value(Some("development")), Mode::Development);
        assert_eq!(Mode::from_env_value(Some("production")), Mode::Production);
        // Unknown labels fall back to development (dev tool default)
        assert_eq!(Mode::from_env_value(Some("staging")), Mode::Development);
    }
}
