//! # Output Configuration
//!
//! Controls how the installer's user-facing lines look. Logging goes through
//! `log`; this module only covers the lines printed to stdout, such as the
//! final status line.
//!
//! The following flags and environment variables are respected:
//! - `--color=never|always|auto`
//! - `NO_COLOR` disables colors when set (https://no-color.org/)
//! - `CLICOLOR=0` disables colors
//! - `CLICOLOR_FORCE=1` forces colors even when stdout is not a TTY
//! - `TERM=dumb` disables colors
//!
//! ```
//! use sdss_install::output::{emoji, OutputConfig};
//!
//! let config = OutputConfig::from_env_and_flag("never");
//! assert_eq!(emoji(&config, "✅", "[OK]"), "[OK]");
//! ```

use std::env;

use console::style;

/// Output configuration for colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used.
    pub use_color: bool,
}

impl OutputConfig {
    /// Build the configuration from the `--color` flag and the environment.
    ///
    /// `always` and `never` override the environment; anything else detects
    /// support from the variables above and the terminal.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // Presence alone disables colors, even if empty
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// `emoji_str` when colors are enabled, otherwise `plain`.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// Render the final status line of a run, e.g. `✅ Done!`.
pub fn format_status(config: &OutputConfig, success: bool, line: &str) -> String {
    if !config.use_color {
        return line.to_string();
    }
    if success {
        format!("{} {}", emoji(config, "✅", ""), style(line).green().bold().force_styling(true))
    } else {
        format!("{} {}", emoji(config, "❌", ""), style(line).red().bold().force_styling(true))
    }
}
