//! User settings and preferences for mdr
//!
//! This module defines the `Settings` struct that holds all user-configurable
//! options, with serde support for JSON persistence.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Theme Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Available color themes for the rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Parse a theme name, falling back to `Light` for anything unknown.
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "dark" => Theme::Dark,
            _ => Theme::Light,
        }
    }

    /// Get a display label for the theme.
    pub fn label(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Palette Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Content color palette.
///
/// - `Theme`: use whatever the theme defines
/// - `Light` / `Dark`: force light or dark content colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Palette {
    Theme,
    #[default]
    Light,
    Dark,
}

impl Palette {
    /// Parse a palette name, falling back to `Light` for anything unknown.
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "theme" => Palette::Theme,
            "dark" => Palette::Dark,
            _ => Palette::Light,
        }
    }

    /// Get the label used in the `palette-<mode>` body class.
    pub fn label(&self) -> &'static str {
        match self {
            Palette::Theme => "theme",
            Palette::Light => "light",
            Palette::Dark => "dark",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Search Highlight Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Colors available for search markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HighlightColor {
    #[default]
    Yellow,
    Green,
    Blue,
    Orange,
    Purple,
}

impl HighlightColor {
    /// Parse a color name, falling back to `Yellow` for anything unknown.
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "green" => HighlightColor::Green,
            "blue" => HighlightColor::Blue,
            "orange" => HighlightColor::Orange,
            "purple" => HighlightColor::Purple,
            _ => HighlightColor::Yellow,
        }
    }

    /// Get all available colors.
    pub fn all() -> &'static [HighlightColor] {
        &[
            HighlightColor::Yellow,
            HighlightColor::Green,
            HighlightColor::Blue,
            HighlightColor::Orange,
            HighlightColor::Purple,
        ]
    }

    /// CSS colors as (marker fill, current marker fill).
    pub fn css_colors(&self) -> (&'static str, &'static str) {
        match self {
            HighlightColor::Yellow => ("#fff3a3", "#ffc400"),
            HighlightColor::Green => ("#c8f7c5", "#3fb950"),
            HighlightColor::Blue => ("#cfe5ff", "#388bfd"),
            HighlightColor::Orange => ("#ffd8b0", "#fb8500"),
            HighlightColor::Purple => ("#e6d5ff", "#a371f7"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Main Settings Struct
// ─────────────────────────────────────────────────────────────────────────────

/// User preferences and application settings.
///
/// This struct is serialized to JSON and persisted to the user's config directory.
/// All fields have sensible defaults via the `Default` trait and `#[serde(default)]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // ─────────────────────────────────────────────────────────────────────────
    // Appearance
    // ─────────────────────────────────────────────────────────────────────────
    /// Color theme for the rendered page
    pub theme: Theme,

    /// Content palette override
    pub palette: Palette,

    /// Font scale in percent
    pub font_scale: u16,

    /// User stylesheet from the themes directory, `"default"` for none
    pub css_theme: String,

    // ─────────────────────────────────────────────────────────────────────────
    // Preview Behavior
    // ─────────────────────────────────────────────────────────────────────────
    /// Re-render automatically when the open file changes on disk
    pub auto_reload: bool,

    /// Largest file (in MB) the previewer will open
    pub max_file_size_mb: u64,

    // ─────────────────────────────────────────────────────────────────────────
    // Search
    // ─────────────────────────────────────────────────────────────────────────
    /// Whether in-document search is case-sensitive
    pub search_case_sensitive: bool,

    /// Marker color for search matches
    pub search_highlight_color: HighlightColor,

    /// Delay after the last keystroke before a query is run
    pub search_debounce_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // Appearance
            theme: Theme::default(),
            palette: Palette::default(),
            font_scale: 100,
            css_theme: crate::theme::DEFAULT_CSS_THEME.to_string(),

            // Preview Behavior
            auto_reload: true,
            max_file_size_mb: 5,

            // Search
            search_case_sensitive: false,
            search_highlight_color: HighlightColor::default(),
            search_debounce_ms: 300,
        }
    }
}

impl Settings {
    // ─────────────────────────────────────────────────────────────────────────
    // Validation Constants and Sanitization
    // ─────────────────────────────────────────────────────────────────────────

    /// Minimum allowed font scale.
    pub const MIN_FONT_SCALE: u16 = crate::theme::MIN_FONT_SCALE;
    /// Maximum allowed font scale.
    pub const MAX_FONT_SCALE: u16 = crate::theme::MAX_FONT_SCALE;
    /// Minimum allowed search debounce.
    pub const MIN_DEBOUNCE_MS: u64 = 50;
    /// Maximum allowed search debounce.
    pub const MAX_DEBOUNCE_MS: u64 = 2000;
    /// Minimum allowed file size limit.
    pub const MIN_FILE_SIZE_MB: u64 = 1;
    /// Maximum allowed file size limit.
    pub const MAX_FILE_SIZE_MB: u64 = 100;

    /// Clamp all values into their valid ranges.
    pub fn sanitize(&mut self) {
        self.font_scale = self
            .font_scale
            .clamp(Self::MIN_FONT_SCALE, Self::MAX_FONT_SCALE);

        self.search_debounce_ms = self
            .search_debounce_ms
            .clamp(Self::MIN_DEBOUNCE_MS, Self::MAX_DEBOUNCE_MS);

        self.max_file_size_mb = self
            .max_file_size_mb
            .clamp(Self::MIN_FILE_SIZE_MB, Self::MAX_FILE_SIZE_MB);

        self.css_theme = crate::theme::normalize_theme_name(&self.css_theme);
    }

    /// Parse settings from JSON and sanitize the result.
    pub fn from_json_sanitized(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.sanitize();
        Ok(settings)
    }

    /// File size limit in bytes.
    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }

    /// Search debounce as a `Duration`.
    pub fn search_debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.search_debounce_ms)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
